#![no_main]
use libfuzzer_sys::fuzz_target;
use node_field::{decode::decode_value, encode::encode_value};

fuzz_target!(|data: &[u8]| {
    if let Ok(val) = decode_value(data) {
        // Decoding only accepts canonical input, so re-encoding must reproduce it.
        assert_eq!(encode_value(&val), data);
    }
});
