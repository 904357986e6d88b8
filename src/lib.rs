//! Seekable zstd streams: random access to compressed data.
//!
//! A seekable stream cuts its payload into independently-compressed zstd
//! frames and appends a final [skippable frame](format::create_skippable_frame)
//! holding a seek table. Any byte range of the decompressed payload can
//! then be materialized by decompressing only the frames that cover it. A
//! standard zstd decompressor, given the whole stream, skips the table and
//! reconstructs the full payload, so the format stays wire-compatible with
//! plain zstd.
//!
//! # Components
//!
//! - [`SeekableWriter`]: one frame per write, serial or
//!   [ordered-concurrent](SeekableWriter::write_many)
//! - [`SeekableReader`]: positional and sequential random access
//! - [`SeekableEncoder`] / [`SeekableDecoder`]: the same logic over raw
//!   in-memory buffers, for callers that bring their own I/O
//! - [`env`]: the pluggable byte-source/sink traits everything above is
//!   built on
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//! use zstd_seekable::{SeekableReader, SeekableWriter};
//!
//! # fn main() -> zstd_seekable::Result<()> {
//! let mut stream = Vec::new();
//! let mut writer = SeekableWriter::builder(&mut stream).build();
//! writer.write(b"Hello")?;
//! writer.write(b" World!")?;
//! writer.close()?;
//! drop(writer);
//!
//! let reader = SeekableReader::builder(Cursor::new(&stream[..])).build()?;
//! let mut buf = [0; 4];
//! reader.read_at(&mut buf, 1)?;
//! assert_eq!(&buf, b"ello");
//! # Ok(())
//! # }
//! ```

mod concurrent;
pub mod decoder;
pub mod encoder;
pub mod env;
pub mod error;
pub mod format;
pub mod reader;
pub mod table;
pub mod writer;

pub use concurrent::WriteManyOptions;
pub use decoder::SeekableDecoder;
pub use encoder::SeekableEncoder;
pub use error::{Error, Result};
pub use reader::SeekableReader;
pub use table::{FrameEntry, SeekTable};
pub use writer::SeekableWriter;
