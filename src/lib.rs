//! # provider-index
//!
//! Embedded semantic search over a small catalogue of service providers.
//!
//! Each provider is a `{name, services}` record paired with an embedding of
//! `name + ". " + services`. The index answers top-N cosine similarity
//! queries and accepts online inserts that are persisted before they become
//! visible.
//!
//! ## Quick Start
//!
//! ```rust
//! use provider_index::{prepare, Config, FileStore, HashingEncoder, ProviderIndex, ProviderRecord};
//!
//! # fn main() -> provider_index::Result<()> {
//! let dir = tempfile::tempdir().unwrap();
//! let config = Config::default();
//!
//! // Seed the data directory once
//! prepare::seed(
//!     &FileStore::new(dir.path(), &config),
//!     &HashingEncoder::new(config.dimension()),
//!     vec![ProviderRecord::new("Helping Hands", "Food pantry")?],
//! )?;
//!
//! let index = ProviderIndex::open(dir.path(), config)?;
//! index.insert("Test Org", "Utility assistance")?;
//!
//! let hits = index.search("utility assistance", 2)?;
//! assert_eq!(hits[0].provider.name(), "Test Org");
//!
//! index.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Key Concepts
//!
//! ### Snapshot
//!
//! A **snapshot** is an immutable pairing of the record list and its
//! embedding matrix. Searches read one snapshot; inserts build a new one
//! and publish it with a single atomic pointer swap.
//!
//! ### Persistence
//!
//! The record list (`providers.json`) and matrix (`embeddings.npy`) live
//! side by side in a data directory. An insert is published only after both
//! have been replaced; a failed write leaves them and the index untouched.
//!
//! ### Encoders
//!
//! - **Hashing** (default): deterministic feature hashing, no model files
//! - **Builtin**: ONNX sentence transformer (requires `builtin-embeddings` feature)
//!
//! ## Features
//!
//! - `builtin-embeddings` - Enable built-in ONNX embedding generation
//!
//! ## Thread Safety
//!
//! `ProviderIndex` is `Send + Sync` and can be shared across threads using
//! `Arc`. Searches never block; inserts are serialized among themselves.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

// ============================================================================
// Module declarations
// ============================================================================

mod config;
mod db;
mod error;
mod types;

pub mod api;
pub mod coordinator;
pub mod encoder;
pub mod index;
pub mod prepare;
pub mod search;
pub mod storage;

// ============================================================================
// Public API re-exports
// ============================================================================

// Main interface
pub use db::ProviderIndex;

// Configuration
pub use config::{
    Config, EmbeddingDimension, EncoderProvider, SyncMode, DEFAULT_EMBEDDINGS_FILE,
    DEFAULT_PROVIDERS_FILE, DEFAULT_TOP_N,
};

// Error handling
pub use error::{ProviderIndexError, Result, StartupError, StorageError, ValidationError};

// Core types
pub use types::{Embedding, EmbeddingMatrix, ProviderRecord, EMBEDDING_TEXT_SEPARATOR};

// Index, search, and insert
pub use coordinator::UpdateCoordinator;
pub use index::{Index, Snapshot};
pub use search::SearchResult;

// Encoders and storage (for advanced users)
pub use encoder::{HashingEncoder, TextEncoder};
pub use storage::{FileStore, ProviderStore};

// Wire types
pub use api::{
    ErrorResponse, InsertRequest, InsertResponse, ProviderPayload, SearchRequest, SearchResponse,
    SearchResultPayload,
};

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Convenient imports for common usage.
///
/// ```rust
/// use provider_index::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{Config, EmbeddingDimension, SyncMode};
    pub use crate::db::ProviderIndex;
    pub use crate::error::{ProviderIndexError, Result};
    pub use crate::search::SearchResult;
    pub use crate::types::ProviderRecord;
}
