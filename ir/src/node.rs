//! The IR arena (spec.md §3.3): "a directed acyclic graph of set
//! expressions." Nodes are owned by a single [`Arena`] per compilation and
//! referenced by the small-integer [`NodeId`], never by back-pointer,
//! matching the catalog's entity-arena convention.

use crate::cardinality::Cardinality;
use crate::scope::{BindingKey, ScopePath};
use diagnostics::Span;
use ql_catalog::{CastId, FunctionId, ObjectId, OperatorId, PointerId, TypeRef};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId#{}", self.0)
    }
}

/// A node's type: either a reference into the catalog, or a structural
/// shape for ad-hoc values the catalog never stores (spec.md glossary:
/// "Free object: an ad-hoc object value with named fields, not stored in
/// the catalog"; `group`'s `{key, grouping, elements}` result is the same
/// shape of thing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrType {
    Catalog(TypeRef),
    FreeObject(Vec<(String, IrType)>),
}

impl IrType {
    pub fn as_catalog(&self) -> Option<TypeRef> {
        match self {
            IrType::Catalog(t) => Some(*t),
            IrType::FreeObject(_) => None,
        }
    }
}

/// One shape element's resolved attribute, attached to a `Shape` node
/// (spec.md §4.5: "records the element's type/cardinality as an attribute
/// of the output").
#[derive(Debug, Clone)]
pub struct ShapeAttr {
    pub name: String,
    pub value: NodeId,
    pub ty: IrType,
    pub cardinality: Cardinality,
}

#[derive(Debug, Clone)]
pub struct InsertField {
    pub pointer: PointerId,
    pub value: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateAssignOp {
    Assign,
    Add,
    Sub,
}

#[derive(Debug, Clone)]
pub struct UpdateField {
    pub pointer: PointerId,
    pub op: UpdateAssignOp,
    pub value: NodeId,
}

#[derive(Debug, Clone)]
pub struct OrderItem {
    pub expr: NodeId,
    pub descending: bool,
}

#[derive(Debug, Clone)]
pub struct UnlessConflict {
    pub on: Option<PointerId>,
    pub else_expr: Option<NodeId>,
}

/// Core node variants (spec.md §3.3).
#[derive(Debug, Clone)]
pub enum NodeKind {
    Literal(crate::builder::LiteralValue),
    Param { name: String, optional: bool },
    /// A reference to a schema entity (object type, alias, global) or a
    /// local binding (`with`-alias, `for`-iterator variable, shape
    /// subject).
    SetRef { entity: SetRefEntity },
    PathStep { source: NodeId, pointer: PointerId },
    /// `base.<ptr[is T]`; `candidates` is every pointer definition the
    /// backlink enumerates (spec.md §4.5), already filtered to those
    /// targeting a supertype of `base`'s type and intersected with `T`.
    Backlink { source: NodeId, candidates: Vec<PointerId>, intersect: Option<ObjectId> },
    FuncCall { overload: FunctionId, args: Vec<NodeId>, named_args: Vec<(String, NodeId)> },
    OpCall { overload: OperatorId, args: Vec<NodeId> },
    Cast { cast: CastId, target: TypeRef, expr: NodeId },
    /// A `<T>uuid_expr` object cast (spec.md §4.5: "yielding a `SetRef`
    /// filtered to `.id = <uuid>…`").
    UuidObjectCast { target: ObjectId, uuid_expr: NodeId },
    TypeIntersection { expr: NodeId, ty: ObjectId },
    Shape { subject: NodeId, elements: Vec<ShapeAttr> },
    InsertStmt { target: ObjectId, fields: Vec<InsertField>, unless_conflict: Option<UnlessConflict> },
    UpdateStmt { subject: NodeId, filter: Option<NodeId>, fields: Vec<UpdateField> },
    DeleteStmt { subject: NodeId, filter: Option<NodeId>, order_by: Vec<OrderItem>, offset: Option<NodeId>, limit: Option<NodeId> },
    SelectStmt { subject: NodeId, filter: Option<NodeId>, order_by: Vec<OrderItem>, offset: Option<NodeId>, limit: Option<NodeId> },
    For { iterator: NodeId, is_union: bool, body: NodeId },
    Group { subject: NodeId, using: Vec<(String, NodeId)>, by: Vec<String> },
    WithBinding { value: NodeId, body: NodeId },
    IfElse { condition: NodeId, then_branch: NodeId, else_branch: NodeId },
    Coalesce { lhs: NodeId, rhs: NodeId },
    TupleCtor { elements: Vec<(Option<String>, NodeId)> },
    ArrayCtor { elements: Vec<NodeId> },
    RangeCtor { lower: Option<NodeId>, upper: Option<NodeId>, inc_lower: bool, inc_upper: bool },
    FreeObject { fields: Vec<(String, NodeId)> },
    /// `{1, 2, 3}`-style set constructor; not a node of its own in spec.md's
    /// variant list, but every literal-value scenario in §8 needs one and
    /// it behaves exactly like `ArrayCtor` cardinality-wise except it
    /// yields `Many` rather than a collection type.
    SetCtor { elements: Vec<NodeId> },
    Indirection { base: NodeId, index: IndirectionKind },
    Detached { expr: NodeId },
}

#[derive(Debug, Clone)]
pub enum IndirectionKind {
    Index(NodeId),
    Slice(Option<NodeId>, Option<NodeId>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetRefEntity {
    Object(ObjectId),
    Alias(ql_catalog::AliasId),
    Global(ql_catalog::GlobalId),
    /// A local binding introduced by `with`, `for`, or a shape's implicit
    /// `.` subject; the node it refers to is tracked by the scope stack,
    /// not the catalog.
    Local(crate::scope::LocalId),
}

#[derive(Debug, Clone)]
pub struct IrNode {
    pub kind: NodeKind,
    pub ty: IrType,
    pub cardinality: Cardinality,
    pub scope: ScopePath,
    pub binding_key: Option<BindingKey>,
    pub span: Span,
}

/// Owns every [`IrNode`] built during one compilation (spec.md §5:
/// "scratch arenas are per-compilation").
#[derive(Debug, Default)]
pub struct Arena {
    nodes: Vec<IrNode>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: IrNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: NodeId) -> &IrNode {
        &self.nodes[id.index()]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut IrNode {
        &mut self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &IrNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i as u32), n))
    }
}
