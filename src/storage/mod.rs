//! Storage layer abstractions for the provider index.
//!
//! The persistent store holds two positionally aligned artifacts: the record
//! list and the embedding matrix. This module provides a trait over that
//! pair so different backends can be used (the file store in production,
//! failure-injecting doubles in tests).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ProviderIndex                            │
//! │                         │                                    │
//! │                         ▼                                    │
//! │              ┌─────────────────────┐                        │
//! │              │   ProviderStore     │  ← Trait               │
//! │              └─────────────────────┘                        │
//! │                    ▲         ▲                              │
//! │                    │         │                              │
//! │         ┌─────────┴─┐   ┌───┴─────────┐                    │
//! │         │ FileStore │   │ test doubles│                    │
//! │         └───────────┘   └─────────────┘                    │
//! │     providers.json +                                        │
//! │     embeddings.npy                                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod file;
pub(crate) mod npy;
pub(crate) mod schema;

pub use file::FileStore;

use std::path::Path;

use crate::error::Result;
use crate::index::Snapshot;
use crate::types::{EmbeddingMatrix, ProviderRecord};

/// Durable, paired storage of the record list and embedding matrix.
///
/// # Contract
///
/// - `load` fails with `StartupFailure` if either artifact is missing,
///   unreadable, malformed, or if their entry counts differ.
/// - `save` fails with `StorageFailure` on any I/O error, and on failure
///   neither artifact's committed content changes.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`. The index never calls `save`
/// concurrently with itself; the update coordinator serializes writers.
pub trait ProviderStore: Send + Sync {
    /// Loads the persisted snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ProviderIndexError::Startup` if the artifacts cannot form
    /// a consistent snapshot.
    fn load(&self) -> Result<Snapshot>;

    /// Persists a snapshot, replacing the committed artifacts.
    ///
    /// # Errors
    ///
    /// Returns `ProviderIndexError::Storage` on any write failure.
    fn save(&self, snapshot: &Snapshot) -> Result<()>;

    /// Directory holding the artifacts, if the backend has one.
    fn location(&self) -> Option<&Path>;
}

/// Entry point for the `.npy` reader fuzz target.
#[doc(hidden)]
pub fn fuzz_read_matrix_bytes(data: &[u8]) -> Option<EmbeddingMatrix> {
    npy::read_matrix(data).ok()
}

/// Entry point for the record list decoder fuzz target.
#[doc(hidden)]
pub fn fuzz_decode_records_bytes(data: &[u8]) -> Option<Vec<ProviderRecord>> {
    schema::decode_records(data).ok()
}
