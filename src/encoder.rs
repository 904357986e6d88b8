//! The byte-oriented compression side: one zstd frame in, compressed bytes
//! out, with the seek table accrued in memory. [`SeekableEncoder`] is
//! useful where wrapping a byte sink is not desirable; the
//! [`SeekableWriter`](crate::writer::SeekableWriter) drives the same logic
//! through a [`WriteEnvironment`](crate::env::WriteEnvironment).

use tracing::debug;
use xxhash_rust::xxh64::xxh64;

use crate::error::{Error, Result};
use crate::format::{create_skippable_frame, SeekTableEntry, SeekTableFooter, SEEK_TABLE_TAG};

/// Compress `src` as one frame at `level`, returning the compressed bytes
/// together with the seek-table entry describing them.
pub(crate) fn encode_frame(level: i32, src: &[u8]) -> Result<(Vec<u8>, SeekTableEntry)> {
    if src.len() > u32::MAX as usize {
        return Err(Error::OversizeFrame {
            len: src.len() as u64,
            max: u64::from(u32::MAX),
        });
    }

    let dst = zstd::encode_all(src, level)?;
    if dst.len() > u32::MAX as usize {
        return Err(Error::OversizeFrame {
            len: dst.len() as u64,
            max: u64::from(u32::MAX),
        });
    }

    let entry = SeekTableEntry {
        comp_size: dst.len() as u32,
        decomp_size: src.len() as u32,
        checksum: (xxh64(src, 0) & 0xFFFF_FFFF) as u32,
    };
    Ok((dst, entry))
}

/// Byte-oriented encoder for the seekable format.
///
/// Each [`encode`](Self::encode) call maps one input buffer to one zstd
/// frame and appends an entry to the in-memory seek table;
/// [`end_stream`](Self::end_stream) serializes that table as the closing
/// skippable frame. Concatenating every `encode` output followed by the
/// `end_stream` output yields a complete seekable stream.
///
/// Entries always carry checksums, so the emitted footer always has the
/// checksum flag set.
pub struct SeekableEncoder {
    level: i32,
    entries: Vec<SeekTableEntry>,
}

impl SeekableEncoder {
    /// Create an encoder compressing at the given zstd level. Level 0 uses
    /// zstd's default.
    pub fn new(level: i32) -> Self {
        Self {
            level,
            entries: vec![],
        }
    }

    pub(crate) fn level(&self) -> i32 {
        self.level
    }

    pub(crate) fn entries_mut(&mut self) -> &mut Vec<SeekTableEntry> {
        &mut self.entries
    }

    /// Compress `src` as a single frame, append its entry to the seek
    /// table, and return the compressed bytes. An empty `src` produces an
    /// empty output and no entry.
    pub fn encode(&mut self, src: &[u8]) -> Result<Vec<u8>> {
        if src.is_empty() {
            return Ok(Vec::new());
        }

        let (dst, entry) = encode_frame(self.level, src)?;
        debug!(
            comp_size = entry.comp_size,
            decomp_size = entry.decomp_size,
            checksum = entry.checksum,
            "appending frame"
        );
        self.entries.push(entry);
        Ok(dst)
    }

    /// Serialize the accrued seek table as a skippable frame. A stream with
    /// no frames still yields a well-formed table with a frame count of
    /// zero.
    pub fn end_stream(&self) -> Result<Vec<u8>> {
        let num_frames = u32::try_from(self.entries.len()).map_err(|_| Error::OversizeFrame {
            len: self.entries.len() as u64,
            max: u64::from(u32::MAX),
        })?;

        let mut payload = Vec::with_capacity(
            self.entries.len() * SeekTableEntry::SIZE_WITH_CHECKSUM
                + crate::format::SEEK_TABLE_FOOTER_SIZE,
        );
        for entry in &self.entries {
            payload.extend_from_slice(&entry.encode());
        }
        payload.extend_from_slice(&SeekTableFooter::new(num_frames, true).encode());

        create_skippable_frame(SEEK_TABLE_TAG, &payload)
    }
}
