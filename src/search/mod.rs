//! Similarity search over a published snapshot.
//!
//! Search is an exhaustive cosine scan: every row of the matrix is scored
//! against the query vector, results are ordered by non-increasing score,
//! and ties keep their original record order. The scan reads one immutable
//! [`Snapshot`], so concurrent inserts never affect an in-flight search.

mod similarity;

pub use similarity::cosine;

use tracing::debug;

use crate::encoder::{encode_checked, TextEncoder};
use crate::error::{Result, ValidationError};
use crate::index::Snapshot;
use crate::types::ProviderRecord;

/// A single ranked hit.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchResult {
    /// The matching record.
    pub provider: ProviderRecord,

    /// Cosine similarity between the query and the record, in `[-1, 1]`.
    ///
    /// Zero when either vector has zero norm.
    pub similarity: f32,
}

/// Ranks the records of `snapshot` against `query`.
///
/// Validation happens before the encoder is called, so an invalid request
/// costs no inference.
///
/// # Errors
///
/// - `InvalidArgument` if the snapshot is empty or `top_n` is outside
///   `1..=N`
/// - `Encoding` if the encoder fails or returns an unusable vector
pub fn search(
    snapshot: &Snapshot,
    encoder: &dyn TextEncoder,
    query: &str,
    top_n: i64,
) -> Result<Vec<SearchResult>> {
    let top_n = validate_request(snapshot, top_n)?;
    let query_vector = encode_checked(encoder, query)?;
    Ok(rank(snapshot, &query_vector, top_n))
}

/// Checks a request against the snapshot and returns `top_n` as a count.
///
/// Any query text is accepted. One with no tokens encodes to the zero
/// vector and scores 0 against every row.
fn validate_request(
    snapshot: &Snapshot,
    top_n: i64,
) -> std::result::Result<usize, ValidationError> {
    let available = snapshot.len();
    if available == 0 {
        return Err(ValidationError::EmptyIndex);
    }
    match usize::try_from(top_n) {
        Ok(n) if (1..=available).contains(&n) => Ok(n),
        _ => Err(ValidationError::top_n_out_of_range(top_n, available)),
    }
}

/// Scores every row against `query_vector` and returns the best `top_n`.
///
/// Pure function of its arguments. `top_n` larger than the snapshot is
/// clamped; callers going through [`search`] never pass one.
pub fn rank(snapshot: &Snapshot, query_vector: &[f32], top_n: usize) -> Vec<SearchResult> {
    let mut scored: Vec<(usize, f32)> = snapshot
        .matrix()
        .iter_rows()
        .map(|row| cosine(query_vector, row))
        .enumerate()
        .collect();

    // Stable: equal scores keep ascending record order.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(top_n);

    debug!(
        candidates = snapshot.len(),
        returned = scored.len(),
        "Ranked snapshot"
    );

    let records = snapshot.records();
    scored
        .into_iter()
        .map(|(i, similarity)| SearchResult {
            provider: records[i].clone(),
            similarity,
        })
        .collect()
}
