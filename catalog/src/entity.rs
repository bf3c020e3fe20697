//! Schema entities are stored as small integer ids into per-kind arenas
//! (spec.md §9: "never use back-pointers; every cross-reference is an
//! `EntityId`"), never behind `Rc`/`RefCell`.

use std::fmt;

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

entity_id!(ScalarId);
entity_id!(ObjectId);
entity_id!(PointerId);
entity_id!(AliasId);
entity_id!(GlobalId);
entity_id!(FunctionId);
entity_id!(OperatorId);
entity_id!(CastId);
entity_id!(IndexId);
entity_id!(ConstraintId);
entity_id!(CollectionId);
entity_id!(AccessPolicyId);
entity_id!(TriggerId);

/// Every schema entity resolves to one of these (spec.md §3.2: "Entities
/// form a closed variant set").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Scalar(ScalarId),
    Object(ObjectId),
    Alias(AliasId),
    Global(GlobalId),
    Function(FunctionId),
    Operator(OperatorId),
    Cast(CastId),
    Collection(CollectionId),
}

/// A type an IR node or catalog member can be typed with: either a named
/// scalar/object entity, or a structural collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Scalar(ScalarId),
    Object(ObjectId),
    Collection(CollectionId),
}

impl TypeRef {
    pub fn as_object(self) -> Option<ObjectId> {
        match self {
            TypeRef::Object(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_scalar(self) -> Option<ScalarId> {
        match self {
            TypeRef::Scalar(id) => Some(id),
            _ => None,
        }
    }
}
