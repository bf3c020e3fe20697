//! `ObjectType` and `Pointer` (spec.md §3.2).

use crate::entity::{AccessPolicyId, ConstraintId, IndexId, ObjectId, PointerId, TriggerId, TypeRef};
use ql_parser::ast::{Cardinality, TargetDeletePolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Property,
    Link,
}

/// An unbound expression deferred until the IR builder has a scope to bind
/// it against (spec.md §4.3: "For each derived pointer... defer expression
/// binding until the IR builder has constructed a scope").
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredExpr {
    pub source_text: String,
    pub span: diagnostics::Span,
}

#[derive(Debug, Clone)]
pub struct Pointer {
    pub id: PointerId,
    pub owner: ObjectId,
    pub name: String,
    pub kind: PointerKind,
    /// `None` for a `Link` target resolved to an `ObjectId` (see
    /// `link_target`); scalar/collection properties carry their target
    /// here instead.
    pub target: TypeRef,
    pub cardinality: Cardinality,
    pub required: bool,
    pub readonly: bool,
    pub default: Option<DeferredExpr>,
    pub computed: Option<DeferredExpr>,
    pub on_target_delete: Option<TargetDeletePolicy>,
    pub on_source_delete: Option<TargetDeletePolicy>,
    /// The pointer this one overrides by inheritance, if any (spec.md §3.2
    /// invariant 3: "overrides must be covariant in target type and
    /// non-widening in cardinality").
    pub overrides: Option<PointerId>,
    /// Own link properties, for `Link` pointers only.
    pub link_properties: Vec<PointerId>,
    pub constraints: Vec<ConstraintId>,
    pub indexes: Vec<IndexId>,
    /// True if this pointer was declared directly on `owner`, as opposed
    /// to being an inherited (non-overriding) copy reachable through
    /// `owner`'s linearization.
    pub is_own: bool,
}

impl Pointer {
    pub fn link_target(&self) -> Option<ObjectId> {
        match (self.kind, self.target) {
            (PointerKind::Link, TypeRef::Object(id)) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObjectType {
    pub id: ObjectId,
    pub module: String,
    pub name: String,
    pub is_abstract: bool,
    /// Direct bases as declared (`extending A, B`), before linearization.
    pub bases: Vec<ObjectId>,
    /// C3-linearized method-resolution order, `self` first, most-derived
    /// to least-derived (spec.md §3.2 invariant 2).
    pub mro: Vec<ObjectId>,
    /// Pointers declared directly on this type (`is_own == true` on each).
    pub own_pointers: Vec<PointerId>,
    pub constraints: Vec<ConstraintId>,
    pub indexes: Vec<IndexId>,
    pub access_policies: Vec<AccessPolicyId>,
    pub triggers: Vec<TriggerId>,
}

impl ObjectType {
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.module, self.name)
    }

    /// Is `self` the same type as, or transitively extends, `other`
    /// (used for `[is T]` intersections and backlink supertype checks).
    pub fn is_subtype_of(&self, other: ObjectId) -> bool {
        self.mro.contains(&other)
    }
}
