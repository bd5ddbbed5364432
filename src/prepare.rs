//! Offline preparation of the embedding matrix.
//!
//! The record list is the source of truth. [`rebuild`] re-encodes every
//! record and rewrites both artifacts, which is how a data directory is
//! first brought into a loadable state or migrated to a new encoder.

use std::path::Path;

use tracing::{info, instrument};

use crate::config::Config;
use crate::encoder::{create_encoder, encode_batch_checked, TextEncoder};
use crate::error::{ProviderIndexError, Result};
use crate::index::Snapshot;
use crate::storage::{FileStore, ProviderStore};
use crate::types::{EmbeddingMatrix, ProviderRecord};

/// Encodes `records` in one batch and pairs them into a snapshot.
///
/// # Errors
///
/// Returns `Encoding` if the encoder fails or returns an unusable vector.
pub fn build_snapshot(records: Vec<ProviderRecord>, encoder: &dyn TextEncoder) -> Result<Snapshot> {
    let texts: Vec<String> = records.iter().map(ProviderRecord::embedding_text).collect();
    let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let vectors = encode_batch_checked(encoder, &text_refs)?;

    let matrix = EmbeddingMatrix::from_rows(encoder.dimension(), &vectors)
        .map_err(|e| ProviderIndexError::encoding(e.to_string()))?;
    Ok(Snapshot::new(records, matrix)?)
}

/// Builds a snapshot from `records` and saves it through `store`.
///
/// # Errors
///
/// Returns `Encoding` or `Storage` errors from the respective step.
pub fn seed(
    store: &dyn ProviderStore,
    encoder: &dyn TextEncoder,
    records: Vec<ProviderRecord>,
) -> Result<Snapshot> {
    let snapshot = build_snapshot(records, encoder)?;
    store.save(&snapshot)?;
    Ok(snapshot)
}

/// Re-encodes the record list in `data_dir` and rewrites the matrix.
///
/// Only the record list has to exist beforehand. Returns the number of
/// records encoded.
///
/// # Errors
///
/// - `Config` if `config` is invalid
/// - `Startup` if the record list is missing or malformed
/// - `Encoding` or `Storage` from the rebuild itself
#[instrument(skip(data_dir, config), fields(data_dir = %data_dir.as_ref().display()))]
pub fn rebuild(data_dir: impl AsRef<Path>, config: &Config) -> Result<usize> {
    config
        .validate()
        .map_err(|e| ProviderIndexError::config(e.to_string()))?;

    let store = FileStore::new(data_dir.as_ref(), config);
    let records = store.load_records()?;
    let encoder = create_encoder(config)?;

    let snapshot = seed(&store, encoder.as_ref(), records)?;
    info!(
        records = snapshot.len(),
        dimension = snapshot.dimension(),
        "Rebuilt embedding matrix"
    );
    Ok(snapshot.len())
}
