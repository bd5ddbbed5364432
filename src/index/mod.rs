//! The published snapshot handle.
//!
//! [`Index`] owns exactly one current [`Snapshot`] behind an atomically
//! swappable pointer:
//!
//! ```text
//!   readers ──load()──▶ ┌──────────────────┐
//!                       │ ArcSwap<Snapshot>│ ◀──store()── UpdateCoordinator
//!   readers ──load()──▶ └──────────────────┘              (one writer at a time)
//!                                │
//!                       Arc<Snapshot> (immutable)
//! ```
//!
//! Reads take no lock and never wait for writers. A reader holding an
//! `Arc<Snapshot>` keeps that version alive even after a newer one is
//! published, so it always sees one version in full.
//!
//! An `Index` can only be built from a loaded snapshot, so there is no
//! uninitialized state to observe: a process that fails to load never gets
//! an `Index` to serve from.

mod snapshot;

pub use snapshot::Snapshot;

use std::sync::Arc;

use arc_swap::ArcSwap;

/// Holder of the currently published snapshot.
#[derive(Debug)]
pub struct Index {
    current: ArcSwap<Snapshot>,
}

impl Index {
    /// Creates an index publishing `snapshot`.
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(snapshot),
        }
    }

    /// Returns the currently published snapshot. O(1), lock-free.
    #[inline]
    pub fn current_snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Replaces the published snapshot with a single pointer swap.
    ///
    /// Callers must serialize publishes; see
    /// [`UpdateCoordinator`](crate::coordinator::UpdateCoordinator).
    pub(crate) fn publish(&self, snapshot: Arc<Snapshot>) {
        self.current.store(snapshot);
    }

    /// Number of records in the published snapshot.
    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    /// Returns true if the published snapshot has no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
