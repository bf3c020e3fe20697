//! `AccessPolicy` and `Trigger` (spec.md §3.2: ObjectType "carries access
//! policies, triggers, indexes, and constraints"). Both are catalog
//! metadata only, carried the same way `Index`/`Constraint` are: the
//! compiler records them on the owning `ObjectType` but neither phase N
//! nor phase I nor the generator enforces or lowers them (spec.md §1
//! excludes authentication/role management, and runtime policy
//! enforcement is the backend's job — spec.md §6.5 lists
//! `AccessPolicyError` only as a wire-level error category the backend
//! may raise, which `interpret_backend_error` maps back).

use crate::entity::{AccessPolicyId, ObjectId, TriggerId};
use crate::object::DeferredExpr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicyEffect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessAction {
    Select,
    Insert,
    UpdateRead,
    UpdateWrite,
    Delete,
}

#[derive(Debug, Clone)]
pub struct AccessPolicy {
    pub id: AccessPolicyId,
    pub owner: ObjectId,
    pub name: String,
    pub effect: AccessPolicyEffect,
    pub actions: Vec<AccessAction>,
    pub using: DeferredExpr,
    pub when: Option<DeferredExpr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone)]
pub struct Trigger {
    pub id: TriggerId,
    pub owner: ObjectId,
    pub name: String,
    pub events: Vec<TriggerEvent>,
    pub when: Option<DeferredExpr>,
    pub do_expr: DeferredExpr,
}
