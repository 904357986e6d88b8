use easy_hex::Hex;
use pretty_assertions::assert_eq;
use zstd_seekable::{SeekableDecoder, SeekableEncoder, SeekableReader};

mod test_utils;

#[test]
fn test_encoder_decoder_round_trip() {
    let mut encoder = SeekableEncoder::new(1);

    let frame_1 = encoder.encode(b"test").unwrap();
    let frame_2 = encoder.encode(b"test2").unwrap();
    let seek_table = encoder.end_stream().unwrap();

    // A plain zstd decoder sees a legal concatenation of frames.
    let mut combined = frame_1.clone();
    combined.extend_from_slice(&frame_2);
    let decoded = zstd::decode_all(&combined[..]).unwrap();
    assert_eq!(Hex(&decoded[..]), Hex(test_utils::SOURCE_STRING));

    // The seek-table bytes alone reconstruct the index.
    let decoder = SeekableDecoder::new(&seek_table).unwrap();
    assert_eq!(decoder.size(), 9);
    assert_eq!(decoder.num_frames(), 2);

    let first = decoder.get_by_id(0).unwrap();
    assert_eq!(first.comp_offset, 0);
    assert_eq!(first.decomp_offset, 0);
    assert_eq!(first.comp_size as usize, frame_1.len());
    assert_eq!(first.decomp_size, 4);

    let second = decoder.get_by_id(1).unwrap();
    assert_eq!(second.comp_offset as usize, frame_1.len());
    assert_eq!(second.decomp_offset, 4);
    assert_eq!(second.decomp_size, 5);
}

#[test]
fn test_decoder_offset_queries() {
    let decoder = decoder_for_source_string();

    assert_eq!(decoder.get_by_offset(0).unwrap().id, 0);
    assert_eq!(decoder.get_by_offset(3).unwrap().id, 0);
    assert_eq!(decoder.get_by_offset(4).unwrap().id, 1);
    assert_eq!(decoder.get_by_offset(8).unwrap().id, 1);
    assert!(decoder.get_by_offset(9).is_none());
    assert!(decoder.get_by_offset(1000).is_none());
}

#[test]
fn test_decoder_id_queries() {
    let decoder = decoder_for_source_string();

    assert!(decoder.get_by_id(-1).is_none());
    assert!(decoder.get_by_id(2).is_none());
    assert_eq!(decoder.get_by_id(1).unwrap().decomp_offset, 4);
}

#[test]
fn test_decoder_from_stream_tail() {
    // The seek table cut from the tail of a finished stream parses the
    // same as one returned by `end_stream`.
    let table_len = 8 + 2 * 12 + 9;
    let seek_table = &test_utils::CHECKSUM_STREAM[test_utils::CHECKSUM_STREAM.len() - table_len..];

    let decoder = SeekableDecoder::new(seek_table).unwrap();
    assert_eq!(decoder.size(), 9);
    assert_eq!(decoder.num_frames(), 2);
    assert_eq!(decoder.get_by_offset(4).unwrap().comp_offset, 17);
}

#[test]
fn test_encoder_empty_input() {
    let mut encoder = SeekableEncoder::new(1);

    assert_eq!(encoder.encode(b"").unwrap(), Vec::<u8>::new());

    let seek_table = encoder.end_stream().unwrap();
    let decoder = SeekableDecoder::new(&seek_table).unwrap();
    assert_eq!(decoder.num_frames(), 0);
    assert_eq!(decoder.size(), 0);
}

#[test]
fn test_encoder_output_matches_writer() {
    let frames: [&[u8]; 3] = [b"alpha", b"beta", b"gamma"];

    let mut encoder = SeekableEncoder::new(3);
    let mut assembled = Vec::new();
    for frame in frames {
        assembled.extend_from_slice(&encoder.encode(frame).unwrap());
    }
    assembled.extend_from_slice(&encoder.end_stream().unwrap());

    let stream = test_utils::build_stream(&frames, 3);
    assert_eq!(Hex(&assembled[..]), Hex(&stream[..]));

    // And the assembled stream is fully readable.
    let reader = SeekableReader::builder(std::io::Cursor::new(&assembled[..]))
        .build()
        .unwrap();
    let mut buf = [0; 9];
    assert_eq!(reader.read_at(&mut buf, 3).unwrap(), 9);
    assert_eq!(&buf, b"habetagam");
}

fn decoder_for_source_string() -> SeekableDecoder {
    let mut encoder = SeekableEncoder::new(1);
    encoder.encode(b"test").unwrap();
    encoder.encode(b"test2").unwrap();
    SeekableDecoder::new(&encoder.end_stream().unwrap()).unwrap()
}
