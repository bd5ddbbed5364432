//! Serialized copy-on-write inserts.
//!
//! An insert never mutates the published snapshot. It builds a new one from
//! the current base, persists it, and only then swaps it in:
//!
//! ```text
//! validate ─ encode ─┬─ lock ─ base = current ─ next = base + row ─ save ─ publish ─┬─ unlock
//!   (no lock held)   │                                             │               │
//!                    │                                        fail ▼               │
//!                    │                                  unlock, base stays published
//! ```
//!
//! Validation and encoding run before the lock is taken so a slow encoder
//! does not hold up other writers. Searches never take the lock.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, instrument, warn};

use crate::encoder::{encode_checked, TextEncoder};
use crate::error::{ProviderIndexError, Result};
use crate::index::Index;
use crate::storage::ProviderStore;
use crate::types::ProviderRecord;

/// Single-writer gate for inserts.
#[derive(Debug, Default)]
pub struct UpdateCoordinator {
    write_lock: Mutex<()>,
}

impl UpdateCoordinator {
    /// Creates a coordinator with no writer holding the lock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record, persists both artifacts, and publishes the result.
    ///
    /// On any error the published snapshot is unchanged. On a storage
    /// error the store has also rolled back, so the committed artifacts
    /// match the pre-insert state.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if either field is blank
    /// - `Encoding` if the encoder fails or returns an unusable vector
    /// - `Storage` if persisting the new snapshot fails
    #[instrument(
        skip_all,
        fields(name_len = name.len(), services_len = services.len())
    )]
    pub fn insert(
        &self,
        index: &Index,
        store: &dyn ProviderStore,
        encoder: &dyn TextEncoder,
        name: &str,
        services: &str,
    ) -> Result<ProviderRecord> {
        let record = ProviderRecord::new(name, services)?;
        let vector = encode_checked(encoder, &record.embedding_text())?;

        // A panicked writer never published, so the guarded state is still sound.
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let base = index.current_snapshot();
        let next = base
            .append(record.clone(), &vector)
            .map_err(|e| ProviderIndexError::encoding(e.to_string()))?;

        if let Err(e) = store.save(&next) {
            warn!(error = %e, records = base.len(), "Insert not committed");
            return Err(e);
        }

        let total = next.len();
        index.publish(Arc::new(next));
        info!(records = total, "Insert committed");

        Ok(record)
    }
}
