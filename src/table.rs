//! The in-memory index built from a stream's seek table.
//!
//! [`SeekTable`] is constructed once when a reader or decoder opens a
//! stream and is immutable afterwards, so any number of threads may consult
//! it without locking. Lookups resolve an uncompressed offset to the frame
//! covering it with a binary search over entries ordered by decompressed
//! offset.

use tracing::debug;

use crate::env::ReadEnvironment;
use crate::error::{Error, Result};
use crate::format::{
    SeekTableEntry, SeekTableFooter, SEEK_TABLE_FOOTER_SIZE, SEEK_TABLE_TAG,
    SKIPPABLE_FRAME_MAGIC, SKIPPABLE_HEADER_SIZE,
};

/// The post-processed view of one seek-table entry, with the stream
/// offsets accumulated while the table was parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameEntry {
    /// Sequence number of the frame in the stream, starting at 0.
    pub id: i64,
    /// Byte offset of the frame within the compressed stream.
    pub comp_offset: u64,
    /// Offset of the frame's first byte within the decompressed stream.
    pub decomp_offset: u64,
    /// Compressed size of the frame.
    pub comp_size: u32,
    /// Decompressed size of the frame.
    pub decomp_size: u32,
    /// Lower 32 bits of the xxh64 hash of the decompressed frame body.
    /// Only meaningful when the stream's checksum flag is set.
    pub checksum: u32,
}

impl FrameEntry {
    /// Offset one past the frame's last byte in the decompressed stream.
    pub fn decomp_end(&self) -> u64 {
        self.decomp_offset + u64::from(self.decomp_size)
    }
}

/// An ordered, immutable index of every frame in a seekable stream.
#[derive(Debug, Clone)]
pub struct SeekTable {
    entries: Vec<FrameEntry>,
    checksums: bool,
}

impl SeekTable {
    /// Read and validate a seek table through a [`ReadEnvironment`].
    ///
    /// This parses the footer from the last 9 bytes, derives the entry
    /// stride from the descriptor's checksum flag, fetches the whole
    /// seek-table skippable frame, validates its magic number and size
    /// field, and accumulates the compressed/decompressed offsets of each
    /// entry in order. Seek tables larger than `max_frame_size` are refused
    /// before any allocation is made for them.
    pub fn read_from(env: &impl ReadEnvironment, max_frame_size: u64) -> Result<Self> {
        let buf = env.read_footer()?;
        if buf.len() < SEEK_TABLE_FOOTER_SIZE {
            return Err(Error::FooterLength { len: buf.len() });
        }
        let footer = SeekTableFooter::decode(&buf[buf.len() - SEEK_TABLE_FOOTER_SIZE..])?;

        let entry_size = footer.entry_size();
        let skip_frame_len = (SKIPPABLE_HEADER_SIZE + SEEK_TABLE_FOOTER_SIZE) as u64
            + entry_size as u64 * u64::from(footer.num_frames);
        if skip_frame_len > max_frame_size {
            return Err(Error::OversizeFrame {
                len: skip_frame_len,
                max: max_frame_size,
            });
        }

        let buf = env.read_skip_frame(skip_frame_len)?;
        if buf.len() < SKIPPABLE_HEADER_SIZE + SEEK_TABLE_FOOTER_SIZE {
            return Err(Error::SkippableFrameLength { len: buf.len() });
        }

        let magic = u32::from_le_bytes(buf[0..4].try_into().expect("slice is 4 bytes"));
        if magic != SKIPPABLE_FRAME_MAGIC | SEEK_TABLE_TAG {
            return Err(Error::SkippableMagic { magic });
        }

        let frame_size = u64::from(u32::from_le_bytes(
            buf[4..8].try_into().expect("slice is 4 bytes"),
        ));
        let expected = (buf.len() - SKIPPABLE_HEADER_SIZE) as u64;
        if frame_size != expected {
            return Err(Error::SkippableFrameSize {
                expected,
                actual: frame_size,
            });
        }

        let entry_area = &buf[SKIPPABLE_HEADER_SIZE..buf.len() - SEEK_TABLE_FOOTER_SIZE];
        if entry_area.len() % entry_size != 0 {
            return Err(Error::TableLength {
                len: entry_area.len(),
                entry_size,
            });
        }

        let mut entries = Vec::with_capacity(entry_area.len() / entry_size);
        let mut comp_offset = 0u64;
        let mut decomp_offset = 0u64;
        for (id, raw) in entry_area.chunks_exact(entry_size).enumerate() {
            let entry = SeekTableEntry::decode(raw)?;
            entries.push(FrameEntry {
                id: id as i64,
                comp_offset,
                decomp_offset,
                comp_size: entry.comp_size,
                decomp_size: entry.decomp_size,
                checksum: entry.checksum,
            });
            comp_offset += u64::from(entry.comp_size);
            decomp_offset += u64::from(entry.decomp_size);
        }

        debug!(
            num_frames = entries.len(),
            checksums = footer.checksum_flag,
            size = decomp_offset,
            "loaded seek table"
        );

        Ok(Self {
            entries,
            checksums: footer.checksum_flag,
        })
    }

    /// The number of frames in the table.
    pub fn num_frames(&self) -> usize {
        self.entries.len()
    }

    /// Total size of the decompressed stream; one past the last readable
    /// offset.
    pub fn size(&self) -> u64 {
        self.entries.last().map_or(0, FrameEntry::decomp_end)
    }

    /// Whether entries carry verifiable checksums.
    pub fn has_checksums(&self) -> bool {
        self.checksums
    }

    /// Find the frame covering decompressed offset `offset`: the greatest
    /// entry whose decompressed offset is at or before it. Returns `None`
    /// when `offset` is at or past the end of the stream (including the
    /// empty stream).
    ///
    /// Taking the greatest matching entry means interior zero-length
    /// frames, which share their decompressed offset with a successor, are
    /// skipped in favor of the frame that actually holds data.
    pub fn find_by_decomp_offset(&self, offset: u64) -> Option<&FrameEntry> {
        if offset >= self.size() {
            return None;
        }

        let following = self.entries.partition_point(|e| e.decomp_offset <= offset);
        if following == 0 {
            return None;
        }
        Some(&self.entries[following - 1])
    }

    /// Look up a frame by its sequence number. Returns `None` for negative
    /// or out-of-range ids.
    pub fn get(&self, id: i64) -> Option<&FrameEntry> {
        let id = usize::try_from(id).ok()?;
        self.entries.get(id)
    }

    pub(crate) fn clear(&mut self) {
        self.entries = vec![];
    }
}
