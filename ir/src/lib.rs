//! Phases N and I (spec.md §4.4, §4.5), combined into one traversal per
//! spec.md §2's explicit permission: "Name resolution and IR building are
//! tightly coupled and share a mutable scope stack; they may be
//! implemented as a single traversal."
//!
//! [`builder::IrBuilder`] drives the traversal; [`node::Arena`] owns the
//! resulting nodes; [`scope::ScopeStack`] is the shared mutable state the
//! two merged phases read and write as they go; [`cardinality::Cardinality`]
//! is the four-element lattice of spec.md §3.3.

pub mod builder;
pub mod cardinality;
pub mod node;
pub mod scope;

pub use builder::{BuildConfig, IrBuilder, IrProgram, LiteralValue, StatementIr};
pub use cardinality::Cardinality;
pub use node::{
    Arena, IndirectionKind, InsertField, IrNode, IrType, NodeId, NodeKind, OrderItem, SetRefEntity, ShapeAttr,
    UnlessConflict, UpdateAssignOp, UpdateField,
};
pub use scope::{BindingKey, LocalBinding, LocalId, ScopeKind, ScopePath, ScopeStack, ScopingMode};
