//! `ScalarType` (spec.md §3.2): base scalars, `enum<…>` types, user-derived
//! scalars, and `sequence`.

use crate::entity::ScalarId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarKind {
    /// One of the fixed base scalars (`str`, `int64`, …); `name` is the
    /// spelling used in source and SQL lowering tables.
    Base,
    /// `scalar type Foo extending Bar` with no enum body.
    Derived { extending: ScalarId },
    /// `scalar type Color extending enum<Red, Green, Blue>` or the bare
    /// `enum<…>` literal type form.
    Enum { extending: Option<ScalarId>, values: Vec<String> },
    Sequence,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarType {
    pub id: ScalarId,
    pub module: String,
    pub name: String,
    pub kind: ScalarKind,
}

impl ScalarType {
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.module, self.name)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self.name.as_str(),
            "int16" | "int32" | "int64" | "float32" | "float64" | "bigint" | "decimal"
        ) && matches!(self.kind, ScalarKind::Base)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.name.as_str(), "int16" | "int32" | "int64" | "bigint") && matches!(self.kind, ScalarKind::Base)
    }
}

/// The fixed base scalar names enumerated by spec.md §3.2. Every catalog
/// carries these pre-interned under the `std` module before any SDL is
/// processed.
pub const BASE_SCALAR_NAMES: &[&str] = &[
    "str",
    "int16",
    "int32",
    "int64",
    "float32",
    "float64",
    "bigint",
    "decimal",
    "bool",
    "bytes",
    "uuid",
    "json",
    "datetime",
    "local_datetime",
    "duration",
    "local_date",
    "local_time",
];
