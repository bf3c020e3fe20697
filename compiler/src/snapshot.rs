//! The schema snapshot (spec.md §3.2 Lifecycle, §5): "an immutable view
//! of the schema catalog seen by one compilation." A snapshot wraps a
//! frozen [`ql_catalog::Catalog`] behind an `Arc` so many concurrent
//! compilations can share it by reference, plus an epoch number so a
//! `CacheKey` can tell two snapshots apart without comparing the whole
//! catalog (spec.md §5: "epoch/snapshot numbering serializes readers vs.
//! writers").

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ql_catalog::Catalog;

static NEXT_EPOCH: AtomicU64 = AtomicU64::new(0);

/// An immutable, shareable schema catalog plus the epoch it was minted at.
/// "A schema-changing DDL produces a *new* snapshot; compilations started
/// against the old snapshot run to completion against the old snapshot"
/// (spec.md §5) — callers get this by constructing a new `Snapshot` and
/// handing old `Arc` clones time to drain naturally.
#[derive(Clone)]
pub struct Snapshot {
    catalog: Arc<Catalog>,
    epoch: u64,
}

impl Snapshot {
    /// Mints a fresh snapshot with the next epoch number. Each call
    /// represents one committed schema change (spec.md §3.2 Lifecycle).
    pub fn new(catalog: Catalog) -> Self {
        let epoch = NEXT_EPOCH.fetch_add(1, Ordering::Relaxed);
        Snapshot { catalog: Arc::new(catalog), epoch }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot").field("epoch", &self.epoch).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ql_catalog::CatalogBuilder;

    #[test]
    fn each_new_snapshot_gets_a_strictly_later_epoch() {
        let first = Snapshot::new(CatalogBuilder::new().build().unwrap());
        let second = Snapshot::new(CatalogBuilder::new().build().unwrap());
        assert!(second.epoch() > first.epoch());
    }

    #[test]
    fn cloning_a_snapshot_shares_the_same_epoch_and_catalog() {
        let snap = Snapshot::new(CatalogBuilder::new().build().unwrap());
        let clone = snap.clone();
        assert_eq!(snap.epoch(), clone.epoch());
        assert!(std::ptr::eq(snap.catalog(), clone.catalog()), "clone must share the underlying Arc, not deep-copy the catalog");
    }
}
