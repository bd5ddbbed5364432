//! Signed feature-hashing encoder.
//!
//! Each lowercase alphanumeric token is hashed with FNV-1a; the low bits pick
//! a bucket and the top bit picks the sign. The bucket counts are then
//! L2-normalized, so the cosine similarity of two texts grows with their
//! shared vocabulary.
//!
//! ```text
//! "Utility assistance" → ["utility", "assistance"] → ±1 per bucket → normalize
//! ```

use crate::error::Result;
use crate::types::Embedding;

use super::TextEncoder;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Deterministic, model-free text encoder.
///
/// Text without any alphanumeric token encodes to the zero vector.
#[derive(Clone, Debug)]
pub struct HashingEncoder {
    dimension: usize,
}

impl HashingEncoder {
    /// Creates an encoder producing vectors of `dimension` components.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl TextEncoder for HashingEncoder {
    fn encode(&self, text: &str) -> Result<Embedding> {
        let mut vector = vec![0.0f32; self.dimension];
        if self.dimension == 0 {
            return Ok(vector);
        }

        for token in tokens(text) {
            let hash = fnv1a_hash(token.as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        l2_normalize_in_place(&mut vector);
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn fnv1a_hash(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn l2_normalize_in_place(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
