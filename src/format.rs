//! Wire-level pieces of the [zstd seekable format]: the seek-table footer,
//! the per-frame seek-table entries, and skippable-frame construction.
//!
//! The overall stream is a sequence of ordinary zstd frames followed by one
//! skippable frame carrying the seek table:
//!
//! | `Skippable_Magic_Number` | `Frame_Size` | `[Seek_Table_Entries]` | `Seek_Table_Footer` |
//! |--------------------------|--------------|------------------------|---------------------|
//! | 4 bytes                  | 4 bytes      | 8-12 bytes each        | 9 bytes             |
//!
//! All multi-byte fields are little-endian.
//!
//! [zstd seekable format]: https://github.com/facebook/zstd/tree/dev/contrib/seekable_format

use crate::error::{Error, Result};

/// Base magic number of zstd skippable frames (`0x184D2A50..=0x184D2A5F`).
pub const SKIPPABLE_FRAME_MAGIC: u32 = 0x184D_2A50;

/// Magic number closing the seek-table footer.
pub const SEEKABLE_MAGIC_NUMBER: u32 = 0x8F92_EAB1;

/// Skippable-frame tag used for the seek table (`0x184D2A5E`).
pub const SEEK_TABLE_TAG: u32 = 0xE;

/// Size of the seek-table footer in bytes.
pub const SEEK_TABLE_FOOTER_SIZE: usize = 9;

/// Size of a skippable-frame header (magic number plus frame size) in bytes.
pub const SKIPPABLE_HEADER_SIZE: usize = 8;

/// Ceiling applied to the seek-table frame and to any single compressed
/// frame before buffers are allocated for them, so a crafted stream cannot
/// ask the decoder for an absurd allocation.
pub const MAX_DECODER_FRAME_SIZE: u64 = 128 << 20;

/// The seek-table footer.
///
/// | `Number_Of_Frames` | `Seek_Table_Descriptor` | `Seekable_Magic_Number` |
/// |--------------------|-------------------------|-------------------------|
/// | 4 bytes            | 1 byte                  | 4 bytes                 |
///
/// The descriptor is a bitfield: bit 7 is the checksum flag, bits 2-6 are
/// reserved and must be zero, bits 0-1 are unused and are ignored on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekTableFooter {
    /// The number of frames in the stream, not counting the seek table itself.
    pub num_frames: u32,
    /// Whether each seek-table entry carries a 4-byte xxh64-low-32 checksum
    /// of its frame's uncompressed data.
    pub checksum_flag: bool,
}

impl SeekTableFooter {
    /// Create a footer for `num_frames` frames.
    pub fn new(num_frames: u32, checksum_flag: bool) -> Self {
        Self {
            num_frames,
            checksum_flag,
        }
    }

    /// Serialize the footer into its fixed 9-byte form.
    pub fn encode(&self) -> [u8; SEEK_TABLE_FOOTER_SIZE] {
        let mut dst = [0; SEEK_TABLE_FOOTER_SIZE];
        dst[0..4].copy_from_slice(&self.num_frames.to_le_bytes());
        if self.checksum_flag {
            dst[4] |= 1 << 7;
        }
        dst[5..9].copy_from_slice(&SEEKABLE_MAGIC_NUMBER.to_le_bytes());
        dst
    }

    /// Parse a footer from exactly 9 bytes.
    ///
    /// Rejects buffers of any other length, non-zero reserved descriptor
    /// bits, and a mismatched magic number. The unused descriptor bits 0-1
    /// are ignored.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() != SEEK_TABLE_FOOTER_SIZE {
            return Err(Error::FooterLength { len: buf.len() });
        }

        let magic = u32::from_le_bytes(buf[5..9].try_into().expect("slice is 4 bytes"));
        if magic != SEEKABLE_MAGIC_NUMBER {
            return Err(Error::FooterMagic { magic });
        }

        let descriptor = buf[4];
        if descriptor & 0b0111_1100 != 0 {
            return Err(Error::ReservedDescriptor { descriptor });
        }

        Ok(Self {
            num_frames: u32::from_le_bytes(buf[0..4].try_into().expect("slice is 4 bytes")),
            checksum_flag: descriptor & (1 << 7) != 0,
        })
    }

    /// Size in bytes of each seek-table entry, as implied by the checksum flag.
    pub fn entry_size(&self) -> usize {
        if self.checksum_flag {
            SeekTableEntry::SIZE_WITH_CHECKSUM
        } else {
            SeekTableEntry::SIZE
        }
    }
}

/// One element of the seek table, describing a single zstd frame.
///
/// | `Compressed_Size` | `Decompressed_Size` | `[Checksum]` |
/// |-------------------|---------------------|--------------|
/// | 4 bytes           | 4 bytes             | 4 bytes      |
///
/// The checksum field is only present on the wire when the footer's
/// checksum flag is set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeekTableEntry {
    /// The compressed size of the frame.
    pub comp_size: u32,
    /// The size of the decompressed data contained in the frame. Zero for
    /// skippable or otherwise empty frames.
    pub decomp_size: u32,
    /// The least significant 32 bits of the xxh64 digest of the
    /// decompressed data. Only meaningful when the footer's checksum flag
    /// is set.
    pub checksum: u32,
}

impl SeekTableEntry {
    /// On-disk size of an entry without a checksum.
    pub const SIZE: usize = 8;

    /// On-disk size of an entry with a checksum.
    pub const SIZE_WITH_CHECKSUM: usize = 12;

    /// Serialize the entry in its full 12-byte checksummed form.
    pub fn encode(&self) -> [u8; Self::SIZE_WITH_CHECKSUM] {
        let mut dst = [0; Self::SIZE_WITH_CHECKSUM];
        dst[0..4].copy_from_slice(&self.comp_size.to_le_bytes());
        dst[4..8].copy_from_slice(&self.decomp_size.to_le_bytes());
        dst[8..12].copy_from_slice(&self.checksum.to_le_bytes());
        dst
    }

    /// Parse an entry from at least 8 bytes. The checksum is read only when
    /// 12 or more bytes are available; the caller chooses the stride from
    /// the footer's checksum flag.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(Error::EntryLength { len: buf.len() });
        }

        let checksum = if buf.len() >= Self::SIZE_WITH_CHECKSUM {
            u32::from_le_bytes(buf[8..12].try_into().expect("slice is 4 bytes"))
        } else {
            0
        };

        Ok(Self {
            comp_size: u32::from_le_bytes(buf[0..4].try_into().expect("slice is 4 bytes")),
            decomp_size: u32::from_le_bytes(buf[4..8].try_into().expect("slice is 4 bytes")),
            checksum,
        })
    }
}

/// Wrap `payload` in a zstd skippable frame with the given tag.
///
/// | `Magic_Number` | `Frame_Size` | `User_Data` |
/// |:--------------:|:------------:|:-----------:|
/// |   4 bytes      |  4 bytes     |   n bytes   |
///
/// Any tag from `0x0` to `0xF` selects one of the sixteen skippable magic
/// numbers; larger tags are rejected. Payloads larger than `u32::MAX` bytes
/// cannot be represented and are rejected. An empty payload produces an
/// empty output.
pub fn create_skippable_frame(tag: u32, payload: &[u8]) -> Result<Vec<u8>> {
    if tag > 0xF {
        return Err(Error::BadTag { tag });
    }

    if payload.is_empty() {
        return Ok(Vec::new());
    }

    let len = u32::try_from(payload.len()).map_err(|_| Error::OversizeFrame {
        len: payload.len() as u64,
        max: u64::from(u32::MAX),
    })?;

    let mut dst = Vec::with_capacity(SKIPPABLE_HEADER_SIZE + payload.len());
    dst.extend_from_slice(&(SKIPPABLE_FRAME_MAGIC | tag).to_le_bytes());
    dst.extend_from_slice(&len.to_le_bytes());
    dst.extend_from_slice(payload);
    Ok(dst)
}
