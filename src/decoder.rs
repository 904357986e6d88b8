//! The byte-oriented index side: answer offset and id queries from
//! seek-table bytes alone, without a byte source.

use crate::env::ReadEnvironment;
use crate::error::Result;
use crate::format::MAX_DECODER_FRAME_SIZE;
use crate::table::{FrameEntry, SeekTable};

/// An environment over a caller-supplied seek-table buffer. Both footer and
/// skip-frame reads hand back the buffer itself.
struct SeekTableBytes<'a> {
    buf: &'a [u8],
}

impl ReadEnvironment for SeekTableBytes<'_> {
    fn read_footer(&self) -> Result<Vec<u8>> {
        Ok(self.buf.to_vec())
    }

    fn read_skip_frame(&self, _len: u64) -> Result<Vec<u8>> {
        Ok(self.buf.to_vec())
    }

    fn get_frame(&self, _entry: &FrameEntry) -> Result<Vec<u8>> {
        unreachable!("a seek-table decoder holds no frame data")
    }
}

/// Byte-oriented decoder for the seekable format.
///
/// Built from the bytes of a seek-table skippable frame, as produced by
/// [`SeekableEncoder::end_stream`](crate::encoder::SeekableEncoder::end_stream)
/// or cut from the tail of a seekable stream, it answers index queries
/// without touching frame data. It is immutable and can be shared across
/// threads freely.
pub struct SeekableDecoder {
    table: SeekTable,
}

impl SeekableDecoder {
    /// Parse and validate `seek_table`, which must be exactly the
    /// seek-table skippable frame (magic number and size field included).
    pub fn new(seek_table: &[u8]) -> Result<Self> {
        let env = SeekTableBytes { buf: seek_table };
        let table = SeekTable::read_from(&env, MAX_DECODER_FRAME_SIZE)?;
        Ok(Self { table })
    }

    /// The size of the decompressed stream.
    pub fn size(&self) -> u64 {
        self.table.size()
    }

    /// The number of frames in the stream.
    pub fn num_frames(&self) -> usize {
        self.table.num_frames()
    }

    /// The frame covering the decompressed offset `offset`, or `None` when
    /// `offset` is at or past the end of the stream.
    pub fn get_by_offset(&self, offset: u64) -> Option<FrameEntry> {
        self.table.find_by_decomp_offset(offset).copied()
    }

    /// The frame with sequence number `id`, or `None` when `id` is
    /// negative or at or past the frame count.
    pub fn get_by_id(&self, id: i64) -> Option<FrameEntry> {
        self.table.get(id).copied()
    }
}
