//! `CacheKey` (spec.md §4.4's "the selected mode is part of the compile
//! cache key", generalized per SPEC_FULL.md C.5): source text, schema
//! epoch, and `CompileOptions` together identify one compilation well
//! enough for a caller to memoize `compile` across repeated calls. The
//! compiler itself never caches — compilation stays a pure function of
//! its inputs (spec.md §5) — this type only exists for callers who want
//! to build that cache themselves.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::options::CompileOptions;
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    source_hash: u64,
    schema_epoch: u64,
    options: CompileOptions,
}

impl CacheKey {
    pub fn new(source: &str, snapshot: &Snapshot, options: &CompileOptions) -> Self {
        let mut hasher = FxHasher::default();
        source.hash(&mut hasher);
        CacheKey { source_hash: hasher.finish(), schema_epoch: snapshot.epoch(), options: options.clone() }
    }

    pub fn source_hash(&self) -> u64 {
        self.source_hash
    }

    pub fn schema_epoch(&self) -> u64 {
        self.schema_epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ql_catalog::CatalogBuilder;

    #[test]
    fn differing_scoping_mode_yields_differing_keys() {
        let snapshot = Snapshot::new(CatalogBuilder::new().build().unwrap());
        let legacy = CompileOptions::builder().simple_scoping(false).build();
        let simple = CompileOptions::builder().simple_scoping(true).build();
        let a = CacheKey::new("select 1", &snapshot, &legacy);
        let b = CacheKey::new("select 1", &snapshot, &simple);
        assert_ne!(a, b, "the scoping mode must be part of the cache key");
    }

    #[test]
    fn identical_inputs_yield_identical_keys() {
        let snapshot = Snapshot::new(CatalogBuilder::new().build().unwrap());
        let opts = CompileOptions::builder().build();
        let a = CacheKey::new("select 1", &snapshot, &opts);
        let b = CacheKey::new("select 1", &snapshot, &opts);
        assert_eq!(a, b);
    }
}
