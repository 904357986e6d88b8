//! Error and `Result` types for seekable stream operations.

use std::io;
use thiserror::Error;

/// A convenience `Result` type for seekable stream operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for reading and writing seekable zstd streams.
#[derive(Debug, Error)]
pub enum Error {
    /// The seek-table footer buffer was not exactly 9 bytes.
    #[error("footer length mismatch: {len} vs 9")]
    FooterLength {
        /// Length of the buffer handed to the footer parser.
        len: usize,
    },

    /// The footer's seekable magic number did not match `0x8F92EAB1`.
    #[error("footer magic mismatch: {magic:#010x}")]
    FooterMagic {
        /// The magic number found in the footer.
        magic: u32,
    },

    /// Reserved bits 2-6 of the seek-table descriptor byte were set.
    #[error("unsupported seek-table descriptor: {descriptor:#010b}")]
    ReservedDescriptor {
        /// The offending descriptor byte.
        descriptor: u8,
    },

    /// A seek-table entry buffer was shorter than the minimal 8-byte stride.
    #[error("entry length mismatch: {len} vs 8")]
    EntryLength {
        /// Length of the buffer handed to the entry parser.
        len: usize,
    },

    /// The seek-table entry area is not a whole number of entries.
    #[error("seek table size {len} is not a multiple of {entry_size}")]
    TableLength {
        /// Length of the entry area in bytes.
        len: usize,
        /// Entry stride derived from the footer descriptor.
        entry_size: usize,
    },

    /// The seek-table skippable frame did not start with `0x184D2A5E`.
    #[error("skippable frame magic mismatch: {magic:#010x}")]
    SkippableMagic {
        /// The magic number found at the start of the skippable frame.
        magic: u32,
    },

    /// The skippable frame's size field contradicts the frame itself.
    #[error("skippable frame size mismatch: expected {expected}, actual {actual}")]
    SkippableFrameSize {
        /// Size implied by the footer's frame count.
        expected: u64,
        /// Size recorded in the frame header.
        actual: u64,
    },

    /// The buffer holding the seek-table skippable frame is too small.
    #[error("skippable frame is too small: {len}")]
    SkippableFrameLength {
        /// Length of the buffer returned by the environment.
        len: usize,
    },

    /// A skippable-frame tag outside `0x0..=0xF` was requested.
    #[error("requested tag ({tag:#x}) > 0xf")]
    BadTag {
        /// The rejected tag.
        tag: u32,
    },

    /// A frame, payload, or entry count exceeds what the format can record.
    #[error("frame is too big for seekable format: {len} > {max}")]
    OversizeFrame {
        /// The offending length or count.
        len: u64,
        /// The applicable ceiling.
        max: u64,
    },

    /// `write_many` was asked to run with zero workers.
    #[error("concurrency must be positive: {concurrency}")]
    BadConcurrency {
        /// The rejected concurrency value.
        concurrency: usize,
    },

    /// No index entry covers the requested uncompressed offset.
    #[error("failed to get frame by offset: {offset}")]
    IndexLookup {
        /// The unresolvable offset.
        offset: u64,
    },

    /// The resolved entry does not actually cover the requested offset.
    #[error("offset outside of frame bounds: {offset}: min: {start}, max: {end}")]
    OutOfBounds {
        /// The requested offset.
        offset: u64,
        /// First uncompressed offset of the resolved frame.
        start: u64,
        /// One past the last uncompressed offset of the resolved frame.
        end: u64,
    },

    /// The xxh64-low-32 checksum of a decompressed frame did not match.
    #[error("checksum verification failed at frame {id}: expected {expected:#010x}, actual {actual:#010x}")]
    Checksum {
        /// Id of the frame that failed verification.
        id: i64,
        /// Checksum recorded in the seek table.
        expected: u32,
        /// Checksum computed over the decompressed bytes.
        actual: u32,
    },

    /// The environment returned fewer compressed bytes than the entry declares.
    #[error("compressed size does not match index: expected {expected}, actual {actual}")]
    ShortCompressed {
        /// Compressed size recorded in the seek table.
        expected: u32,
        /// Number of bytes the environment produced.
        actual: usize,
    },

    /// A frame decompressed to a different length than the entry declares.
    #[error("decompressed size does not match index: expected {expected}, actual {actual}")]
    DecompressedSize {
        /// Decompressed size recorded in the seek table.
        expected: u32,
        /// Actual decompressed length.
        actual: usize,
    },

    /// The zstd decompressor rejected a frame body.
    #[error("failed to decompress frame at {offset}")]
    Decompress {
        /// Compressed-stream offset of the rejected frame.
        offset: u64,
        /// The underlying decoder error.
        #[source]
        source: io::Error,
    },

    /// The sink accepted fewer bytes than were offered.
    #[error("partial write: {written} out of {expected}")]
    PartialWrite {
        /// Number of bytes the environment reported written.
        written: usize,
        /// Number of bytes offered.
        expected: usize,
    },

    /// A seek produced a negative absolute position.
    #[error("offset before the start of the stream: {position}")]
    NegativeOffset {
        /// The computed absolute position.
        position: i128,
    },

    /// A seek overflowed the addressable range.
    #[error("invalid seek to offset: {position}")]
    InvalidSeek {
        /// The computed absolute position.
        position: i128,
    },

    /// The reader was used after `close`.
    #[error("reader is closed")]
    ReaderClosed,

    /// The write pipeline was cancelled before completing.
    #[error("write pipeline cancelled")]
    Cancelled,

    /// The frame source callback failed.
    #[error("frame source failed")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// An underlying I/O operation failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(err) => err,
            Error::NegativeOffset { .. } | Error::InvalidSeek { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
            err => io::Error::other(err),
        }
    }
}
