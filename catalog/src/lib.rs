//! Phase S (spec.md §3.2, §4.3): the in-memory schema catalog.
//!
//! A [`Catalog`] is built once per compiler instance from a sequence of
//! committed SDL declarations and is immutable afterward (spec.md §3.2
//! Lifecycle, §5). [`CatalogBuilder`] performs the multi-pass
//! construction (forward-reference resolution, C3 linearization,
//! override/overload validation) described in spec.md §4.3.

mod alias;
mod builder;
mod catalog;
mod collection;
mod constraint;
mod entity;
mod function;
mod inheritance;
mod object;
mod policy;
mod scalar;
mod std_lib;

pub use alias::{Alias, Global};
pub use builder::{empty_collection_interner, CatalogBuilder};
pub use catalog::{Catalog, OverloadResolution, DEFAULT_MODULE, STD_MODULE};
pub use collection::{CollectionInterner, CollectionShape, CollectionType};
pub use constraint::{Constraint, Index};
pub use entity::{
    AccessPolicyId, AliasId, CastId, CollectionId, ConstraintId, EntityRef, FunctionId, GlobalId, IndexId, ObjectId,
    OperatorId, PointerId, ScalarId, TriggerId, TypeRef,
};
pub use policy::{AccessAction, AccessPolicy, AccessPolicyEffect, Trigger, TriggerEvent};
pub use function::{Cast, Function, Operator, OperatorKind, Param, ParamPositionKind, SqlLowering};
pub use object::{DeferredExpr, ObjectType, Pointer, PointerKind};
pub use scalar::{ScalarKind, ScalarType, BASE_SCALAR_NAMES};

pub use ql_parser::ast::{ParamModifier, ReturnModifier, Volatility};
