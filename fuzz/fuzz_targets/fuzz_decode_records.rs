#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Some(records) = provider_index::storage::fuzz_decode_records_bytes(data) {
        assert!(records
            .iter()
            .all(|r| !r.name().trim().is_empty() && !r.services().trim().is_empty()));
    }
});
