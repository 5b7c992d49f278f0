#![no_main]
use libfuzzer_sys::fuzz_target;
use lz4_codec::framed::LZ4FrameReader;
use std::io::{Cursor, Read};

fuzz_target!(|data: &[u8]| {
    // random bytes are rarely a valid frame; all we care about is that
    // nothing panics on the way to the error
    if let Ok(reader) = LZ4FrameReader::new(Cursor::new(data)) {
        let mut output = Vec::new();
        let _ = reader.into_read().read_to_end(&mut output);
    }
});
