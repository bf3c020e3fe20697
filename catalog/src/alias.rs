//! `Alias` and `Global` (spec.md §3.2).

use crate::entity::{AliasId, GlobalId, TypeRef};
use crate::object::DeferredExpr;

/// A named expression evaluated lazily; its resulting type and cardinality
/// are inferred from `expr` the first time the IR builder binds it, not
/// stored here (the catalog is frozen before any expression has a scope to
/// bind against — spec.md §4.3).
#[derive(Debug, Clone)]
pub struct Alias {
    pub id: AliasId,
    pub module: String,
    pub name: String,
    pub expr: DeferredExpr,
}

impl Alias {
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.module, self.name)
    }
}

#[derive(Debug, Clone)]
pub struct Global {
    pub id: GlobalId,
    pub module: String,
    pub name: String,
    pub ty: TypeRef,
    pub default: Option<DeferredExpr>,
}

impl Global {
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.module, self.name)
    }
}
