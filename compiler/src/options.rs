//! `CompileOptions` (spec.md §6.1): the input struct every `compile` call
//! takes alongside the schema snapshot and source text. Compilation is "a
//! pure function from `(schema_snapshot, source_text, compile_options) ->
//! Plan`" (spec.md §5), so this struct carries no behavior of its own —
//! every field here is read, never mutated, by the pipeline.

use std::collections::BTreeMap;

use ql_catalog::{Catalog, DEFAULT_MODULE};
use ql_ir::ScopingMode;

/// How a top-level result is serialized for the wire (spec.md §6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum OutputFormat {
    #[default]
    Binary,
    Json,
    JsonElements,
    None,
}

/// §6.1's `options` bag, plus the `simple_scoping`/`warn_old_scoping`
/// settings of §6.4. `module_aliases` uses a `BTreeMap` rather than a
/// `HashMap` so `CompileOptions` can derive `Hash`/`Eq` for use as (part
/// of) a [`crate::cache::CacheKey`] (spec.md §4.4: "the selected mode is
/// part of the compile cache key").
#[derive(Debug, Clone, PartialEq, Eq, Hash, bon::Builder, serde::Serialize, serde::Deserialize)]
pub struct CompileOptions {
    #[builder(default)]
    pub json_mode: bool,
    #[builder(default)]
    pub output_format: OutputFormat,
    #[builder(default)]
    pub expect_one: bool,
    #[builder(default)]
    pub implicit_limit: Option<i64>,
    #[builder(default)]
    pub inline_typeids: bool,
    #[builder(default)]
    pub inline_typenames: bool,
    #[builder(default)]
    pub inline_objectids: bool,
    #[builder(default = DEFAULT_MODULE.to_string())]
    pub default_module: String,
    #[builder(default)]
    pub module_aliases: BTreeMap<String, String>,
    /// `⊥` (the `None` case) defers to [`Catalog::simple_scoping_future`]
    /// (spec.md §6.4's resolution table).
    #[builder(default)]
    pub simple_scoping: Option<bool>,
    #[builder(default)]
    pub warn_old_scoping: bool,
}

impl CompileOptions {
    /// Resolves §6.4's scoping-configuration table for *this query*: "if
    /// the setting is `⊥`, fall back to whether the future is present;
    /// otherwise the setting wins for query scoping". Schema-expression
    /// scoping (aliases, computed pointers) always follows
    /// `catalog.simple_scoping_future()` directly regardless of this
    /// per-query override — see DESIGN.md for why this implementation
    /// applies one resolved mode uniformly within a single compilation
    /// rather than running two concurrently active scope stacks.
    pub fn query_scoping_mode(&self, catalog: &Catalog) -> ScopingMode {
        let simple = self.simple_scoping.unwrap_or_else(|| catalog.simple_scoping_future());
        if simple {
            ScopingMode::Simple
        } else {
            ScopingMode::Legacy
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ql_catalog::CatalogBuilder;

    fn empty_catalog() -> Catalog {
        CatalogBuilder::new().build().unwrap()
    }

    #[test]
    fn unset_setting_falls_back_to_schema_future() {
        let plain = empty_catalog();
        let with_future = CatalogBuilder::new().with_simple_scoping_future(true).build().unwrap();
        let opts = CompileOptions::builder().build();
        assert_eq!(opts.query_scoping_mode(&plain), ScopingMode::Legacy);
        assert_eq!(opts.query_scoping_mode(&with_future), ScopingMode::Simple);
    }

    #[test]
    fn explicit_setting_overrides_schema_future() {
        let with_future = CatalogBuilder::new().with_simple_scoping_future(true).build().unwrap();
        let opts = CompileOptions::builder().simple_scoping(false).build();
        assert_eq!(opts.query_scoping_mode(&with_future), ScopingMode::Legacy);
    }
}
