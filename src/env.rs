//! The narrow I/O surfaces the codec consumes, plus default adapters over
//! ordinary byte sources and sinks.
//!
//! The reader only ever touches its byte source through
//! [`ReadEnvironment`], and the writer through [`WriteEnvironment`], so
//! either can be layered over non-file backends (content-addressed blob
//! stores, network fetchers) by supplying a custom implementation.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::format::SEEK_TABLE_FOOTER_SIZE;
use crate::table::FrameEntry;

/// Capabilities the reader needs from its byte source.
pub trait ReadEnvironment {
    /// Return a buffer whose last 9 bytes are the seek-table footer; for a
    /// stream-backed environment, the last 9 bytes of the stream.
    fn read_footer(&self) -> Result<Vec<u8>>;

    /// Return the last `len` bytes of the stream: the complete seek-table
    /// skippable frame, including its magic number and size fields.
    fn read_skip_frame(&self, len: u64) -> Result<Vec<u8>>;

    /// Return the compressed body of the frame described by `entry`:
    /// `entry.comp_size` bytes starting at `entry.comp_offset`.
    fn get_frame(&self, entry: &FrameEntry) -> Result<Vec<u8>>;
}

/// Capabilities the writer needs from its byte sink.
pub trait WriteEnvironment {
    /// Called with each compressed frame, in stream order.
    fn write_frame(&mut self, buf: &[u8]) -> Result<usize>;

    /// Called once, on close, with the serialized seek-table skippable frame.
    fn write_seek_table(&mut self, buf: &[u8]) -> Result<usize>;
}

/// A byte source that can be read at arbitrary offsets without moving any
/// cursor. This is what makes concurrent positional reads safe.
pub trait ReadAt {
    /// Read into `buf` starting at `offset`, returning the number of bytes
    /// read. A return of 0 means there is nothing at or past `offset`.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;

    /// Read at `offset` until `buf` is full or the source is exhausted,
    /// returning the number of bytes read.
    fn read_full_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_at(&mut buf[filled..], offset + filled as u64)?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }
}

#[cfg(unix)]
impl ReadAt for std::fs::File {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::unix::fs::FileExt::read_at(self, buf, offset)
    }
}

#[cfg(windows)]
impl ReadAt for std::fs::File {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::windows::fs::FileExt::seek_read(self, buf, offset)
    }
}

impl ReadAt for &[u8] {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let Ok(offset) = usize::try_from(offset) else {
            return Ok(0);
        };
        if offset >= self.len() {
            return Ok(0);
        }
        let n = (self.len() - offset).min(buf.len());
        buf[..n].copy_from_slice(&self[offset..offset + n]);
        Ok(n)
    }
}

/// The concurrency-safe default read environment: every operation is a
/// positional read, so no shared cursor is ever altered.
pub struct PositionalSource<R> {
    source: R,
    len: u64,
}

impl<R: ReadAt> PositionalSource<R> {
    /// Wrap a positional source whose total length is `len` bytes.
    pub fn new(source: R, len: u64) -> Self {
        Self { source, len }
    }
}

impl PositionalSource<std::fs::File> {
    /// Wrap an open file, taking its current length as the stream length.
    pub fn open(file: std::fs::File) -> io::Result<Self> {
        let len = file.metadata()?.len();
        Ok(Self { source: file, len })
    }
}

impl<R: ReadAt> ReadEnvironment for PositionalSource<R> {
    fn read_footer(&self) -> Result<Vec<u8>> {
        let footer_size = SEEK_TABLE_FOOTER_SIZE as u64;
        if self.len < footer_size {
            return Err(Error::FooterLength {
                len: self.len as usize,
            });
        }

        let mut buf = vec![0; SEEK_TABLE_FOOTER_SIZE];
        let n = self.source.read_full_at(&mut buf, self.len - footer_size)?;
        if n < buf.len() {
            return Err(Error::Io(io::ErrorKind::UnexpectedEof.into()));
        }
        Ok(buf)
    }

    fn read_skip_frame(&self, len: u64) -> Result<Vec<u8>> {
        if len > self.len {
            return Err(Error::Io(io::ErrorKind::UnexpectedEof.into()));
        }

        let mut buf = vec![0; usize::try_from(len).map_err(|_| io::Error::from(io::ErrorKind::UnexpectedEof))?];
        let n = self.source.read_full_at(&mut buf, self.len - len)?;
        if n < buf.len() {
            return Err(Error::Io(io::ErrorKind::UnexpectedEof.into()));
        }
        Ok(buf)
    }

    fn get_frame(&self, entry: &FrameEntry) -> Result<Vec<u8>> {
        let mut buf = vec![0; entry.comp_size as usize];
        let n = self.source.read_full_at(&mut buf, entry.comp_offset)?;
        // Tolerate a short source here; the reader compares the returned
        // length against the seek table and reports the mismatch.
        buf.truncate(n);
        Ok(buf)
    }
}

/// The fallback read environment over any `Read + Seek` source. Each
/// operation acquires the shared cursor, seeks, and reads, so positional
/// reads through this environment may race with user seeks on the same
/// source; prefer [`PositionalSource`] where the source supports it.
#[derive(Debug)]
pub struct SeekableSource<R> {
    source: Mutex<R>,
}

impl<R: Read + Seek> SeekableSource<R> {
    /// Wrap a seekable byte source.
    pub fn new(source: R) -> Self {
        Self {
            source: Mutex::new(source),
        }
    }
}

impl<R: Read + Seek> ReadEnvironment for SeekableSource<R> {
    fn read_footer(&self) -> Result<Vec<u8>> {
        let mut source = self.source.lock().expect("source lock poisoned");
        source.seek(SeekFrom::End(-(SEEK_TABLE_FOOTER_SIZE as i64)))?;

        let mut buf = vec![0; SEEK_TABLE_FOOTER_SIZE];
        source.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn read_skip_frame(&self, len: u64) -> Result<Vec<u8>> {
        let offset = i64::try_from(len).map_err(|_| io::Error::from(io::ErrorKind::UnexpectedEof))?;

        let mut source = self.source.lock().expect("source lock poisoned");
        source.seek(SeekFrom::End(-offset))?;

        let mut buf = vec![0; len as usize];
        source.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn get_frame(&self, entry: &FrameEntry) -> Result<Vec<u8>> {
        let mut source = self.source.lock().expect("source lock poisoned");
        source.seek(SeekFrom::Start(entry.comp_offset))?;

        let mut buf = vec![0; entry.comp_size as usize];
        source.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// The default write environment: frames and the seek table go straight to
/// the wrapped sink.
pub struct WriteSink<W> {
    sink: W,
}

impl<W: Write> WriteSink<W> {
    /// Wrap a byte sink.
    pub fn new(sink: W) -> Self {
        Self { sink }
    }
}

impl<W: Write> WriteEnvironment for WriteSink<W> {
    fn write_frame(&mut self, buf: &[u8]) -> Result<usize> {
        self.sink.write_all(buf)?;
        Ok(buf.len())
    }

    fn write_seek_table(&mut self, buf: &[u8]) -> Result<usize> {
        self.sink.write_all(buf)?;
        Ok(buf.len())
    }
}
