//! `Index` and `Constraint` (spec.md §3.2).

use crate::entity::{ConstraintId, FunctionId, IndexId, ObjectId};
use crate::object::DeferredExpr;

/// "An expression with optional `except` filter; indexes are inherited and
/// specialized" (spec.md §3.2).
#[derive(Debug, Clone)]
pub struct Index {
    pub id: IndexId,
    pub owner: ObjectId,
    pub expr: DeferredExpr,
    pub except: Option<DeferredExpr>,
    /// The index this one specializes by inheritance, if any.
    pub specializes: Option<IndexId>,
}

/// "A named check with expression, subject expression, error message, and
/// delegation flag" (spec.md §3.2). `check` resolves either to a
/// user-defined constraint function (`constraint_fn`) or is inlined from
/// the declaration's own argument expressions when no named constraint
/// function applies.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub id: ConstraintId,
    pub owner: ObjectId,
    pub name: String,
    pub constraint_fn: Option<FunctionId>,
    pub args: Vec<DeferredExpr>,
    pub subject: Option<DeferredExpr>,
    pub message: Option<String>,
    pub delegated: bool,
}
