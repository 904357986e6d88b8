//! Random access to a seekable zstd stream.
//!
//! [`SeekableReader`] materializes any byte range of the decompressed
//! stream by resolving the enclosing frame in the seek table,
//! decompressing only that frame, and slicing. Two access modes are
//! exposed:
//!
//! - [`read_at`](SeekableReader::read_at) is positional and takes `&self`;
//!   it is safe to call from multiple threads when the underlying
//!   environment supports positional reads (see
//!   [`PositionalSource`](crate::env::PositionalSource)).
//! - [`std::io::Read`] and [`std::io::Seek`] are sequential and mutate an
//!   internal cursor, so they must not be called concurrently.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::trace;
use xxhash_rust::xxh64::xxh64;

use crate::env::{ReadEnvironment, SeekableSource};
use crate::error::{Error, Result};
use crate::format::MAX_DECODER_FRAME_SIZE;
use crate::table::{FrameEntry, SeekTable};

/// The single cache slot holding the most recently decompressed frame.
/// Replaced wholesale under the reader's mutex; readers copy out of a
/// cloned handle so the slot can be replaced while a copy is in flight.
#[derive(Debug)]
struct CachedFrame {
    decomp_offset: u64,
    data: Arc<[u8]>,
}

/// A reader giving random access to the decompressed contents of a
/// seekable zstd stream.
#[derive(Debug)]
pub struct SeekableReader<E> {
    env: E,
    table: SeekTable,
    max_frame_size: u64,
    offset: u64,
    closed: AtomicBool,
    cache: Mutex<Option<CachedFrame>>,
}

impl<R> SeekableReader<SeekableSource<R>>
where
    R: std::io::Read + std::io::Seek,
{
    /// Start building a reader over a seekable byte source.
    ///
    /// The source is wrapped in the fallback seek-and-read environment; use
    /// [`SeekableReaderBuilder::from_environment`] with a
    /// [`PositionalSource`](crate::env::PositionalSource) (or a custom
    /// environment) for concurrency-safe positional access.
    pub fn builder(source: R) -> SeekableReaderBuilder<SeekableSource<R>> {
        SeekableReaderBuilder::from_environment(SeekableSource::new(source))
    }
}

impl<E> SeekableReader<E>
where
    E: ReadEnvironment,
{
    /// Total size of the decompressed stream.
    pub fn size(&self) -> u64 {
        self.table.size()
    }

    /// Number of frames in the stream.
    pub fn num_frames(&self) -> usize {
        self.table.num_frames()
    }

    /// Read decompressed bytes starting at absolute offset `offset`,
    /// without touching the sequential cursor.
    ///
    /// Either fills `dst` completely, or returns a short count because the
    /// end of the stream was reached. This method takes `&self` and is safe
    /// to call concurrently if the environment's frame reads are.
    pub fn read_at(&self, dst: &mut [u8], offset: u64) -> Result<usize> {
        let mut filled = 0;
        while filled < dst.len() {
            let n = self.read_frame_chunk(&mut dst[filled..], offset + filled as u64)?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }

    /// Close the reader, dropping the index and the cached frame.
    /// Idempotent; subsequent reads fail.
    pub fn close(&mut self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.table.clear();
            *self.cache.lock().expect("frame cache lock poisoned") = None;
        }
    }

    /// Read up to one frame's worth of bytes at `offset` into `dst`.
    /// Returns 0 only at (or past) the end of the stream, or for an empty
    /// `dst`.
    fn read_frame_chunk(&self, dst: &mut [u8], offset: u64) -> Result<usize> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::ReaderClosed);
        }
        if dst.is_empty() || offset >= self.table.size() {
            return Ok(0);
        }

        let entry = self
            .table
            .find_by_decomp_offset(offset)
            .ok_or(Error::IndexLookup { offset })?;
        if offset < entry.decomp_offset || offset > entry.decomp_end() {
            return Err(Error::OutOfBounds {
                offset,
                start: entry.decomp_offset,
                end: entry.decomp_end(),
            });
        }

        let data = self.cached_or_fetch(entry)?;

        let within = (offset - entry.decomp_offset) as usize;
        let n = (data.len() - within).min(dst.len());
        dst[..n].copy_from_slice(&data[within..within + n]);

        trace!(
            frame = entry.id,
            offset_within_frame = within,
            len = n,
            "copied decompressed chunk"
        );
        Ok(n)
    }

    /// Return the decompressed body of `entry`, from the cache slot when it
    /// matches, otherwise by fetching and decompressing the frame.
    fn cached_or_fetch(&self, entry: &FrameEntry) -> Result<Arc<[u8]>> {
        {
            let cache = self.cache.lock().expect("frame cache lock poisoned");
            if let Some(cached) = cache.as_ref() {
                if cached.decomp_offset == entry.decomp_offset
                    && cached.data.len() == entry.decomp_size as usize
                {
                    return Ok(Arc::clone(&cached.data));
                }
            }
        }

        if u64::from(entry.comp_size) > self.max_frame_size {
            return Err(Error::OversizeFrame {
                len: u64::from(entry.comp_size),
                max: self.max_frame_size,
            });
        }

        let src = self.env.get_frame(entry)?;
        if src.len() != entry.comp_size as usize {
            return Err(Error::ShortCompressed {
                expected: entry.comp_size,
                actual: src.len(),
            });
        }

        let decompressed = zstd::decode_all(&src[..]).map_err(|source| Error::Decompress {
            offset: entry.comp_offset,
            source,
        })?;
        if decompressed.len() != entry.decomp_size as usize {
            return Err(Error::DecompressedSize {
                expected: entry.decomp_size,
                actual: decompressed.len(),
            });
        }

        if self.table.has_checksums() {
            let actual = (xxh64(&decompressed, 0) & 0xFFFF_FFFF) as u32;
            if actual != entry.checksum {
                return Err(Error::Checksum {
                    id: entry.id,
                    expected: entry.checksum,
                    actual,
                });
            }
        }

        let data: Arc<[u8]> = decompressed.into();
        *self.cache.lock().expect("frame cache lock poisoned") = Some(CachedFrame {
            decomp_offset: entry.decomp_offset,
            data: Arc::clone(&data),
        });
        Ok(data)
    }
}

impl<E> std::io::Read for SeekableReader<E>
where
    E: ReadEnvironment,
{
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.read_frame_chunk(buf, self.offset)?;
        if n == 0 && !buf.is_empty() {
            // End of stream: clamp the cursor rather than leaving it past
            // the last readable offset.
            self.offset = self.table.size();
        } else {
            self.offset += n as u64;
        }
        Ok(n)
    }
}

impl<E> std::io::Seek for SeekableReader<E>
where
    E: ReadEnvironment,
{
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        let position = match pos {
            std::io::SeekFrom::Start(offset) => i128::from(offset),
            std::io::SeekFrom::Current(delta) => i128::from(self.offset) + i128::from(delta),
            std::io::SeekFrom::End(delta) => i128::from(self.table.size()) + i128::from(delta),
        };

        if position < 0 {
            return Err(Error::NegativeOffset { position }.into());
        }
        // Seeking past the end is allowed; the next sequential read
        // signals end of stream.
        self.offset = u64::try_from(position).map_err(|_| Error::InvalidSeek { position })?;
        Ok(self.offset)
    }
}

/// Builder for [`SeekableReader`].
pub struct SeekableReaderBuilder<E> {
    env: E,
    max_frame_size: u64,
}

impl<E> SeekableReaderBuilder<E>
where
    E: ReadEnvironment,
{
    /// Start building a reader over a custom [`ReadEnvironment`].
    pub fn from_environment(env: E) -> Self {
        Self {
            env,
            max_frame_size: MAX_DECODER_FRAME_SIZE,
        }
    }

    /// Override the ceiling applied to the seek-table frame and to each
    /// compressed frame before allocating for them. Defaults to 128 MiB.
    pub fn with_max_frame_size(mut self, max_frame_size: u64) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    /// Read the seek table and build the reader.
    pub fn build(self) -> Result<SeekableReader<E>> {
        let table = SeekTable::read_from(&self.env, self.max_frame_size)?;

        Ok(SeekableReader {
            env: self.env,
            table,
            max_frame_size: self.max_frame_size,
            offset: 0,
            closed: AtomicBool::new(false),
            cache: Mutex::new(None),
        })
    }
}
