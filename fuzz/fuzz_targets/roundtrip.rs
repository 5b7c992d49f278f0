#![no_main]
use libfuzzer_sys::fuzz_target;
use lz4_codec::framed::{decompress_frame, CompressionSettings};

fuzz_target!(|data: &[u8]| {
    let frame = CompressionSettings::default()
        .compress_to_vec(data)
        .expect("compressing in-memory data cannot fail");
    let roundtripped = decompress_frame(frame.as_slice()).expect("own frames always decode");
    assert_eq!(roundtripped, data);
});
