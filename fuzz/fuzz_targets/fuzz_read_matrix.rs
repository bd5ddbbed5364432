#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Some(matrix) = provider_index::storage::fuzz_read_matrix_bytes(data) {
        assert_eq!(matrix.as_slice().len(), matrix.rows() * matrix.dimension());
        assert!(matrix.as_slice().iter().all(|x| x.is_finite()));
    }
});
