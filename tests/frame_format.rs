//! Frame-level round-trips and corruption handling.

use std::io::{Cursor, Read};

use lz4_codec::framed::{
    decompress_frame, decompress_frame_into, CompressionError, CompressionSettings,
    DecompressionError, LZ4FrameReader,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn compress_with(settings: &CompressionSettings, data: &[u8]) -> Vec<u8> {
    settings.compress_to_vec(data).unwrap()
}

fn mixed_data(len: usize, seed: u64) -> Vec<u8> {
    // alternating compressible text and seeded noise
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(len);
    while data.len() < len {
        if rng.gen_bool(0.5) {
            data.extend_from_slice(b"the quick brown fox jumps over the lazy dog ");
        } else {
            let mut noise = [0u8; 48];
            rng.fill(&mut noise[..]);
            data.extend_from_slice(&noise);
        }
    }
    data.truncate(len);
    data
}

fn random_data(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; len];
    rng.fill(&mut data[..]);
    data
}

#[test]
fn ab_pattern_scenario() {
    let mut settings = CompressionSettings::default();
    settings
        .block_size(65536)
        .independent_blocks(true)
        .content_checksum(false);

    let frame = compress_with(&settings, b"ABABABABAB");
    assert_eq!(decompress_frame(frame.as_slice()).unwrap(), b"ABABABABAB");
}

#[test]
fn default_settings_roundtrip() {
    let data = mixed_data(1_000_000, 7);
    let frame = compress_with(&CompressionSettings::default(), &data);
    assert_eq!(decompress_frame(frame.as_slice()).unwrap(), data);
}

#[test]
fn empty_input() {
    for &checksummed in &[false, true] {
        let mut settings = CompressionSettings::default();
        settings.content_checksum(checksummed);
        let frame = compress_with(&settings, b"");
        assert_eq!(decompress_frame(frame.as_slice()).unwrap(), b"");
    }
}

#[test]
fn deterministic_output() {
    let data = mixed_data(200_000, 21);
    let a = compress_with(&CompressionSettings::default(), &data);
    let b = compress_with(&CompressionSettings::default(), &data);
    assert_eq!(a, b);
}

#[test]
fn multi_block_independent() {
    let data = mixed_data(300_000, 3);
    let mut settings = CompressionSettings::default();
    settings.block_size(65536);
    let frame = compress_with(&settings, &data);
    assert_eq!(decompress_frame(frame.as_slice()).unwrap(), data);
}

#[test]
fn multi_block_dependent() {
    let data = mixed_data(300_000, 4);
    let mut settings = CompressionSettings::default();
    settings.block_size(65536).independent_blocks(false);
    let frame = compress_with(&settings, &data);
    assert_eq!(decompress_frame(frame.as_slice()).unwrap(), data);
}

#[test]
fn incompressible_blocks_are_stored() {
    let data = random_data(200_000, 5);
    let mut settings = CompressionSettings::default();
    settings.block_size(65536);
    let frame = compress_with(&settings, &data);

    // stored blocks keep the frame close to the input size: header + per-block
    // length prefixes + end-mark + content checksum only
    assert!(frame.len() < data.len() + 64);
    assert_eq!(decompress_frame(frame.as_slice()).unwrap(), data);
}

#[test]
fn content_size_recorded_and_verified() {
    let data = mixed_data(150_000, 6);

    let mut frame = Vec::new();
    CompressionSettings::default()
        .compress_with_size(Cursor::new(&data), &mut frame)
        .unwrap();

    let reader = LZ4FrameReader::new(frame.as_slice()).unwrap();
    assert_eq!(reader.frame_size(), Some(data.len() as u64));
    assert_eq!(decompress_frame(frame.as_slice()).unwrap(), data);
}

#[test]
fn lying_content_size_detected() {
    let data = mixed_data(10_000, 8);
    let mut frame = Vec::new();
    CompressionSettings::default()
        .compress_with_size_unchecked(data.as_slice(), &mut frame, data.len() as u64 + 1)
        .unwrap();

    match decompress_frame(frame.as_slice()) {
        Err(DecompressionError::ContentSizeMismatch { expected, actual }) => {
            assert_eq!(expected, data.len() as u64 + 1);
            assert_eq!(actual, data.len() as u64);
        }
        other => panic!("expected a content size mismatch, got {:?}", other.map(|v| v.len())),
    }
}

#[test]
fn single_byte_corruption_is_detected() {
    let data = mixed_data(400, 9);
    let mut settings = CompressionSettings::default();
    settings.content_checksum(true);
    let frame = compress_with(&settings, &data);

    for index in 0..frame.len() {
        let mut corrupted = frame.clone();
        corrupted[index] ^= 0x01;
        assert!(
            decompress_frame(corrupted.as_slice()).is_err(),
            "flipping byte {} went undetected",
            index
        );
    }
}

#[test]
fn header_corruption_rejected_before_blocks() {
    let frame = compress_with(&CompressionSettings::default(), b"some honest data");

    // FLG byte: flip the block-independence bit (keeps version/reserved valid)
    let mut corrupted = frame.clone();
    corrupted[4] ^= 0x20;
    match LZ4FrameReader::new(corrupted.as_slice()) {
        Err(DecompressionError::HeaderChecksumFail) => {}
        other => panic!("expected header checksum failure, got {:?}", other.err()),
    }

    // BD byte: move to another valid block-size class
    let mut corrupted = frame;
    corrupted[5] ^= 0x10;
    match LZ4FrameReader::new(corrupted.as_slice()) {
        Err(DecompressionError::HeaderChecksumFail) => {}
        other => panic!("expected header checksum failure, got {:?}", other.err()),
    }
}

#[test]
fn wrong_magic_rejected() {
    let frame = compress_with(&CompressionSettings::default(), b"data");
    let mut corrupted = frame;
    corrupted[0] ^= 0xFF;
    match LZ4FrameReader::new(corrupted.as_slice()) {
        Err(DecompressionError::WrongMagic(_)) => {}
        other => panic!("expected wrong magic, got {:?}", other.err()),
    }
}

#[test]
fn truncated_frames_rejected() {
    let data = mixed_data(10_000, 10);
    let frame = compress_with(&CompressionSettings::default(), &data);

    for &keep in &[0usize, 3, 5, 6, 10, frame.len() / 2, frame.len() - 1] {
        assert!(
            decompress_frame(&frame[..keep]).is_err(),
            "truncation to {} bytes went undetected",
            keep
        );
    }
}

#[test]
fn block_checksums_roundtrip_and_detect_corruption() {
    let data = mixed_data(5_000, 11);
    let mut settings = CompressionSettings::default();
    settings.block_checksums(true).content_checksum(false);
    let frame = compress_with(&settings, &data);
    assert_eq!(decompress_frame(frame.as_slice()).unwrap(), data);

    // first block payload starts right after the 7-byte header and the
    // 4-byte block length prefix
    let mut corrupted = frame;
    corrupted[11] ^= 0x01;
    match decompress_frame(corrupted.as_slice()) {
        Err(DecompressionError::BlockChecksumFail) => {}
        other => panic!("expected block checksum failure, got {:?}", other.map(|v| v.len())),
    }
}

#[test]
fn dictionary_id_travels_in_the_header() {
    let mut settings = CompressionSettings::default();
    settings.dictionary_id(Some(0xDEAD_BEEF));
    let frame = compress_with(&settings, b"dictionary-less data");

    let reader = LZ4FrameReader::new(frame.as_slice()).unwrap();
    assert_eq!(reader.dictionary_id(), Some(0xDEAD_BEEF));
    assert_eq!(
        decompress_frame(frame.as_slice()).unwrap(),
        b"dictionary-less data"
    );
}

#[test]
fn block_size_rounds_up_to_canonical_class() {
    let mut settings = CompressionSettings::default();
    settings.block_size(100_000);
    let frame = compress_with(&settings, b"tiny");

    let reader = LZ4FrameReader::new(frame.as_slice()).unwrap();
    assert_eq!(reader.block_size(), 256 * 1024);
}

#[test]
fn unrepresentable_block_sizes_rejected() {
    let mut oversized = CompressionSettings::default();
    oversized.block_size(8 * 1024 * 1024);
    match oversized.compress_to_vec(b"data") {
        Err(CompressionError::InvalidBlockSize) => {}
        other => panic!("expected invalid block size, got {:?}", other.map(|v| v.len())),
    }

    let mut zero = CompressionSettings::default();
    zero.block_size(0);
    assert!(zero.compress_to_vec(b"data").is_err());
}

#[test]
fn output_buffer_reuse_appends() {
    let first = compress_with(&CompressionSettings::default(), b"first frame ");
    let second = compress_with(&CompressionSettings::default(), b"second frame");

    let mut output = Vec::new();
    decompress_frame_into(first.as_slice(), &mut output).unwrap();
    decompress_frame_into(second.as_slice(), &mut output).unwrap();
    assert_eq!(output, b"first frame second frame");
}

#[test]
fn io_reader_streams_the_frame() {
    let data = mixed_data(100_000, 12);
    let mut settings = CompressionSettings::default();
    settings.block_size(65536);
    let frame = compress_with(&settings, &data);

    let mut streamed = Vec::new();
    LZ4FrameReader::new(frame.as_slice())
        .unwrap()
        .into_read()
        .read_to_end(&mut streamed)
        .unwrap();
    assert_eq!(streamed, data);
}
