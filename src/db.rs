//! ProviderIndex main struct and lifecycle operations.
//!
//! The [`ProviderIndex`] struct is the primary interface. It wires the
//! persistent store, the text encoder, the published snapshot, and the
//! insert coordinator together and provides methods for:
//!
//! - Opening and closing the index
//! - Similarity search
//! - Inserting new providers
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use provider_index::{Config, ProviderIndex};
//!
//! // Both artifacts must already exist in ./data
//! let index = ProviderIndex::open("./data", Config::default())?;
//!
//! index.insert("Test Org", "Utility assistance")?;
//! for hit in index.search("utility assistance", 3)? {
//!     println!("{} {:.3}", hit.provider.name(), hit.similarity);
//! }
//!
//! index.close()?;
//! ```
//!
//! # Thread Safety
//!
//! `ProviderIndex` is `Send + Sync` and can be shared across threads using
//! `Arc`. Searches are lock-free; inserts are serialized among themselves
//! and never block searches.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! let index = Arc::new(ProviderIndex::open("./data", Config::default())?);
//!
//! let reader = Arc::clone(&index);
//! std::thread::spawn(move || reader.search("food pantry", 3));
//! ```

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::coordinator::UpdateCoordinator;
use crate::encoder::{create_encoder, TextEncoder};
use crate::error::{ProviderIndexError, Result, StartupError};
use crate::index::{Index, Snapshot};
use crate::search::{self, SearchResult};
use crate::storage::{FileStore, ProviderStore};
use crate::types::ProviderRecord;

/// The semantic provider index handle.
///
/// Create an instance with [`ProviderIndex::open()`] and close it with
/// [`ProviderIndex::close()`]. There is no way to obtain a handle that has
/// not loaded its artifacts, so every method operates on a ready index.
pub struct ProviderIndex {
    /// Currently published snapshot.
    index: Index,

    /// Serializes inserts.
    coordinator: UpdateCoordinator,

    /// Durable mirror of the published snapshot.
    store: Box<dyn ProviderStore>,

    /// Encodes queries and inserted records.
    encoder: Box<dyn TextEncoder>,

    /// Configuration used to open this index.
    config: Config,
}

impl std::fmt::Debug for ProviderIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderIndex")
            .field("config", &self.config)
            .field("location", &self.store.location())
            .field("records", &self.len())
            .field("dimension", &self.dimension())
            .finish_non_exhaustive()
    }
}

impl ProviderIndex {
    /// Opens the index stored in `data_dir`.
    ///
    /// Both artifacts must already exist and agree with each other; use
    /// [`prepare::rebuild`](crate::prepare::rebuild) to create the matrix
    /// from a record list.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration is invalid (see [`Config::validate`])
    /// - The encoder cannot be created
    /// - Either artifact is missing, unreadable, or malformed
    /// - The record count and matrix row count differ
    /// - The stored dimension differs from the encoder's
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use provider_index::{Config, EmbeddingDimension, ProviderIndex};
    ///
    /// let index = ProviderIndex::open("./data", Config {
    ///     embedding_dimension: EmbeddingDimension::D768,
    ///     ..Default::default()
    /// })?;
    /// ```
    #[instrument(skip(data_dir, config), fields(data_dir = %data_dir.as_ref().display()))]
    pub fn open(data_dir: impl AsRef<Path>, config: Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| ProviderIndexError::config(e.to_string()))?;

        info!("Opening provider index");

        let encoder = create_encoder(&config)?;
        let store = FileStore::new(data_dir.as_ref(), &config);

        Self::open_with(Box::new(store), encoder, config)
    }

    /// Opens an index over an arbitrary store and encoder.
    ///
    /// # Errors
    ///
    /// Same as [`open`](Self::open), minus the file-specific cases the
    /// store does not have.
    pub fn open_with(
        store: Box<dyn ProviderStore>,
        encoder: Box<dyn TextEncoder>,
        config: Config,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| ProviderIndexError::config(e.to_string()))?;

        let snapshot = store.load()?;
        if snapshot.dimension() != encoder.dimension() {
            return Err(StartupError::DimensionMismatch {
                expected: encoder.dimension(),
                found: snapshot.dimension(),
            }
            .into());
        }

        info!(
            records = snapshot.len(),
            dimension = snapshot.dimension(),
            "Provider index ready"
        );

        Ok(Self {
            index: Index::new(snapshot),
            coordinator: UpdateCoordinator::new(),
            store,
            encoder,
            config,
        })
    }

    /// Closes the index.
    ///
    /// Every successful insert is already durable, so there is nothing to
    /// flush; this consumes the handle so it cannot be used afterward.
    ///
    /// # Errors
    ///
    /// Currently always returns `Ok(())`.
    #[instrument(skip(self))]
    pub fn close(self) -> Result<()> {
        info!(records = self.len(), "Closing provider index");
        Ok(())
    }

    /// Returns the `top_n` records most similar to `query`.
    ///
    /// Reads the published snapshot once; a concurrent insert is either
    /// fully visible or not visible at all.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for an empty index or `top_n` outside `1..=len()`
    /// - `Encoding` if the query cannot be encoded
    pub fn search(&self, query: &str, top_n: i64) -> Result<Vec<SearchResult>> {
        let snapshot = self.index.current_snapshot();
        debug!(query_len = query.len(), top_n, records = snapshot.len(), "Search");
        search::search(&snapshot, self.encoder.as_ref(), query, top_n)
    }

    /// Adds a provider and makes it searchable.
    ///
    /// Returns once the record is durable and published.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if either field is blank
    /// - `Encoding` if the record text cannot be encoded
    /// - `Storage` if the artifacts cannot be written; the index is unchanged
    pub fn insert(&self, name: &str, services: &str) -> Result<ProviderRecord> {
        self.coordinator.insert(
            &self.index,
            self.store.as_ref(),
            self.encoder.as_ref(),
            name,
            services,
        )
    }

    /// Returns the currently published snapshot.
    #[inline]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.index.current_snapshot()
    }

    /// Number of records currently published.
    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if no records are published.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Embedding dimension of the encoder and stored matrix.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.encoder.dimension()
    }

    /// Returns a reference to the configuration.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingDimension;
    use crate::encoder::HashingEncoder;
    use crate::prepare;
    use tempfile::tempdir;

    fn seeded_dir(config: &Config) -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path(), config);
        let encoder = HashingEncoder::new(config.dimension());
        let records = vec![
            ProviderRecord::new("Helping Hands", "Food pantry").unwrap(),
            ProviderRecord::new("Legal Aid", "Tenant rights").unwrap(),
        ];
        prepare::seed(&store, &encoder, records).unwrap();
        dir
    }

    #[test]
    fn test_open_seeded_directory() {
        let dir = seeded_dir(&Config::default());

        let index = ProviderIndex::open(dir.path(), Config::default()).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.dimension(), 384);
        index.close().unwrap();
    }

    #[test]
    fn test_open_empty_directory_refuses() {
        let dir = tempdir().unwrap();
        let err = ProviderIndex::open(dir.path(), Config::default()).unwrap_err();
        assert!(err.is_startup());
    }

    #[test]
    fn test_config_validation() {
        let dir = seeded_dir(&Config::default());
        let invalid = Config {
            default_top_n: 0,
            ..Default::default()
        };

        let err = ProviderIndex::open(dir.path(), invalid).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_dimension_mismatch() {
        let dir = seeded_dir(&Config::default());

        let err = ProviderIndex::open(
            dir.path(),
            Config {
                embedding_dimension: EmbeddingDimension::D768,
                ..Default::default()
            },
        )
        .unwrap_err();

        assert!(matches!(
            err,
            ProviderIndexError::Startup(StartupError::DimensionMismatch {
                expected: 768,
                found: 384
            })
        ));
    }

    #[test]
    fn test_insert_then_reopen() {
        let dir = seeded_dir(&Config::default());

        let index = ProviderIndex::open(dir.path(), Config::default()).unwrap();
        index.insert("Test Org", "Utility assistance").unwrap();
        assert_eq!(index.len(), 3);
        index.close().unwrap();

        let index = ProviderIndex::open(dir.path(), Config::default()).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.snapshot().records()[2].name(), "Test Org");
    }

    #[test]
    fn test_provider_index_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ProviderIndex>();
    }
}
