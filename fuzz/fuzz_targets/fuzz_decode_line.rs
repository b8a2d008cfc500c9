#![no_main]
use libfuzzer_sys::fuzz_target;
use std::time::Instant;

fuzz_target!(|data: &[u8]| {
    let line = String::from_utf8_lossy(data);
    if let Ok(sample) = coinbank_core::decode_weight(&line, Instant::now()) {
        assert!(sample.value_g.is_finite() && sample.value_g >= 0.0);
    }
});
