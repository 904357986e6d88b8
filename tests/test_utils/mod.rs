#![allow(dead_code)]

use proptest::prelude::*;
use zstd_seekable::SeekableWriter;

pub type Data = easy_hex::Hex<Vec<u8>>;

pub const MAX_FRAME_LENGTH: usize = 200;
pub const MAX_FRAME_COUNT: usize = 8;
pub const MIN_ZSTD_LEVEL: i32 = -3;
pub const MAX_ZSTD_LEVEL: i32 = 15;

/// The decompressed contents of the reference streams below.
pub const SOURCE_STRING: &[u8] = b"testtest2";

/// A reference stream holding `"test"` and `"test2"` as two frames, with
/// seek-table checksums.
pub const CHECKSUM_STREAM: &[u8] = &[
    // frame 0
    0x28, 0xb5, 0x2f, 0xfd, 0x04, 0x00, 0x21, 0x00, 0x00, // "test"
    0x74, 0x65, 0x73, 0x74, 0x39, 0x81, 0x67, 0xdb, // frame 1
    0x28, 0xb5, 0x2f, 0xfd, 0x04, 0x00, 0x29, 0x00, 0x00, // "test2"
    0x74, 0x65, 0x73, 0x74, 0x32, 0x87, 0xeb, 0x11, 0x71, // skippable frame header
    0x5e, 0x2a, 0x4d, 0x18, 0x21, 0x00, 0x00, 0x00, // seek table entries
    0x11, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x39, 0x81, 0x67, 0xdb, //
    0x12, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00, 0x87, 0xeb, 0x11, 0x71, // footer
    0x02, 0x00, 0x00, 0x00, 0x80, 0xb1, 0xea, 0x92, 0x8f,
];

/// The same two frames without seek-table checksums (8-byte entries,
/// descriptor byte zero).
pub const NO_CHECKSUM_STREAM: &[u8] = &[
    // frame 0
    0x28, 0xb5, 0x2f, 0xfd, 0x04, 0x00, 0x21, 0x00, 0x00, // "test"
    0x74, 0x65, 0x73, 0x74, 0x39, 0x81, 0x67, 0xdb, // frame 1
    0x28, 0xb5, 0x2f, 0xfd, 0x04, 0x00, 0x29, 0x00, 0x00, // "test2"
    0x74, 0x65, 0x73, 0x74, 0x32, 0x87, 0xeb, 0x11, 0x71, // skippable frame header
    0x5e, 0x2a, 0x4d, 0x18, 0x19, 0x00, 0x00, 0x00, // seek table entries
    0x11, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, //
    0x12, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00, // footer
    0x02, 0x00, 0x00, 0x00, 0x00, 0xb1, 0xea, 0x92, 0x8f,
];

/// Write `frames` as a finalized seekable stream at the given level.
pub fn build_stream(frames: &[&[u8]], level: i32) -> Vec<u8> {
    let mut stream = Vec::new();
    let mut writer = SeekableWriter::builder(&mut stream)
        .with_compression_level(level)
        .build();
    for frame in frames {
        writer.write(frame).unwrap();
    }
    writer.close().unwrap();
    drop(writer);
    stream
}

pub type SourceResult = std::result::Result<Option<Vec<u8>>, Box<dyn std::error::Error + Send + Sync>>;

/// A frame source draining a fixed list of frames.
pub fn frame_source(frames: Vec<Vec<u8>>) -> impl FnMut() -> SourceResult {
    let mut frames = frames.into_iter();
    move || Ok(frames.next())
}

/// Deterministic pseudo-random frames for order-equivalence tests.
pub fn generated_frames(count: usize) -> Vec<Vec<u8>> {
    let mut state = 0x9e37_79b9_7f4a_7c15u64;
    let mut step = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };

    (0..count)
        .map(|_| {
            let len = (step() % 300 + 1) as usize;
            (0..len).map(|_| step() as u8).collect()
        })
        .collect()
}

pub fn arb_zstd_level() -> impl Strategy<Value = i32> {
    MIN_ZSTD_LEVEL..=MAX_ZSTD_LEVEL
}

pub fn arb_frame() -> impl Strategy<Value = Data> {
    prop::collection::vec(any::<u8>(), 0..=MAX_FRAME_LENGTH).prop_map(easy_hex::Hex)
}

pub fn arb_frames() -> impl Strategy<Value = Vec<Data>> {
    prop::collection::vec(arb_frame(), 0..=MAX_FRAME_COUNT)
}

/// Frames together with a range `a..b` of the concatenated payload.
pub fn arb_frames_with_range() -> impl Strategy<Value = (Vec<Data>, usize, usize)> {
    arb_frames()
        .prop_flat_map(|frames| {
            let len: usize = frames.iter().map(|frame| frame.len()).sum();
            (Just(frames), 0..=len)
        })
        .prop_flat_map(|(frames, start)| {
            let len: usize = frames.iter().map(|frame| frame.len()).sum();
            (Just(frames), Just(start), start..=len)
        })
}

/// Concatenate the payloads of `frames`.
pub fn concat(frames: &[Data]) -> Vec<u8> {
    frames
        .iter()
        .flat_map(|frame| frame.iter())
        .copied()
        .collect()
}
