//! The AST (spec.md §3.1): "an immutable tree of tagged nodes... every
//! node carries a source span." Node names below follow the spec's tag
//! list (`Select`, `Insert`, `Update`, `Delete`, `For`, `Group`, `With`,
//! `FunctionCall`, `Op`, `Path`, `Shape`, `ShapeElement`, `TypeCast`,
//! `TypeIntersection`, `Tuple`, `Array`, `Range`, `Literal`, `Parameter`,
//! `DDL*`, `SDL*`).

use diagnostics::Span;

/// A qualified or short name: `module::name` or `name`.
#[derive(Debug, Clone, PartialEq)]
pub struct QualName {
    pub module: Option<String>,
    pub name: String,
    pub span: Span,
}

impl QualName {
    pub fn short(name: impl Into<String>, span: Span) -> Self {
        QualName { module: None, name: name.into(), span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int64(i64),
    Float64(f64),
    BigInt(String),
    Decimal(String),
    Str(String),
    Bytes(Vec<u8>),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiteralExpr {
    pub value: Literal,
    pub span: Span,
}

/// `select {1, 2, 3}` style set constructor. Not itself named in spec.md's
/// AST tag list, but required to express the set-constructor syntax used
/// throughout §8's literal-value scenarios; kept alongside `Literal` as a
/// structural sibling rather than folded into it.
#[derive(Debug, Clone, PartialEq)]
pub struct SetCtorExpr {
    pub elements: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentExpr {
    pub name: QualName,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterExpr {
    pub name: String,
    pub type_annotation: Option<TypeExpr>,
    pub optional: bool,
    pub span: Span,
}

/// `base.ptr` — a single forward path step (spec.md glossary: "Path").
#[derive(Debug, Clone, PartialEq)]
pub struct PathStepExpr {
    pub base: Box<Expr>,
    pub pointer: String,
    pub span: Span,
}

/// `base.<ptr[is T]` — reverse traversal (spec.md glossary: "Backlink").
#[derive(Debug, Clone, PartialEq)]
pub struct BacklinkExpr {
    pub base: Box<Expr>,
    pub pointer: String,
    pub intersect: Option<TypeExpr>,
    pub span: Span,
}

/// `expr[is T]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeIntersectionExpr {
    pub base: Box<Expr>,
    pub ty: TypeExpr,
    pub span: Span,
}

/// `<T>expr` / `<optional T>expr`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeCastExpr {
    pub target: TypeExpr,
    pub expr: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Named(QualName),
    Array(Box<TypeExpr>),
    Tuple(Vec<(Option<String>, TypeExpr)>),
    Range(Box<TypeExpr>),
    Multirange(Box<TypeExpr>),
    Optional(Box<TypeExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TupleExpr {
    pub elements: Vec<(Option<String>, Expr)>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayExpr {
    pub elements: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeExpr {
    pub lower: Option<Box<Expr>>,
    pub upper: Option<Box<Expr>>,
    pub inc_lower: bool,
    pub inc_upper: bool,
    pub span: Span,
}

/// An indexing/slicing postfix, `expr[i]` / `expr[a:b]`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndirectionExpr {
    pub base: Box<Expr>,
    pub index: IndirectionKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndirectionKind {
    Index(Box<Expr>),
    Slice(Option<Box<Expr>>, Option<Box<Expr>>),
}

/// `detached expr`.
#[derive(Debug, Clone, PartialEq)]
pub struct DetachedExpr {
    pub expr: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    Distinct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Union,
    Or,
    And,
    Eq,
    NotEq,
    QEq,
    QNotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Like,
    NotLike,
    Ilike,
    NotIlike,
    In,
    NotIn,
    Is,
    IsNot,
    Add,
    Sub,
    Concat,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Coalesce,
    Pow,
}

/// `Op` (spec.md §3.1): unary, binary, or the ternary `if … then … else …`
/// folds into [`IfElseExpr`] instead, since it has its own shape (subject,
/// condition, alternative) rather than a flat operand list.
#[derive(Debug, Clone, PartialEq)]
pub enum OpExpr {
    Unary { op: UnaryOp, operand: Box<Expr>, span: Span },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr>, span: Span },
}

impl OpExpr {
    pub fn span(&self) -> Span {
        match self {
            OpExpr::Unary { span, .. } => *span,
            OpExpr::Binary { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCallExpr {
    pub name: QualName,
    pub args: Vec<Expr>,
    pub named_args: Vec<(String, Expr)>,
    pub span: Span,
}

/// One element of a [`ShapeExpr`] (spec.md §4.2): a pointer name, a
/// polymorphic-fetched pointer, a filtered/ordered nested shape, or a
/// computed element.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeElement {
    pub name: String,
    pub type_filter: Option<TypeExpr>,
    pub computed_expr: Option<Expr>,
    pub nested_shape: Option<ShapeExpr>,
    pub filter: Option<Expr>,
    pub order_by: Vec<OrderItem>,
    pub offset: Option<Expr>,
    pub limit: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeExpr {
    pub subject: Option<Box<Expr>>,
    pub elements: Vec<ShapeElement>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub expr: Expr,
    pub order: SortOrder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectExpr {
    pub subject: Expr,
    pub filter: Option<Expr>,
    pub order_by: Vec<OrderItem>,
    pub offset: Option<Expr>,
    pub limit: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertShapeElement {
    pub name: String,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnlessConflict {
    pub on: Option<Expr>,
    pub else_expr: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertExpr {
    pub type_name: QualName,
    pub elements: Vec<InsertShapeElement>,
    pub unless_conflict: Option<UnlessConflict>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSetElement {
    pub name: String,
    pub op: AssignOp,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateExpr {
    pub subject: Expr,
    pub filter: Option<Expr>,
    pub set: Vec<UpdateSetElement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteExpr {
    pub subject: Expr,
    pub filter: Option<Expr>,
    pub order_by: Vec<OrderItem>,
    pub offset: Option<Expr>,
    pub limit: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForExpr {
    pub iterator_name: String,
    pub iterator: Expr,
    pub is_union: bool,
    pub body: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupExpr {
    pub subject: Expr,
    pub using: Vec<(String, Expr)>,
    pub by: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithBinding {
    pub name: String,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithExpr {
    pub module: Option<String>,
    pub module_aliases: Vec<(String, String)>,
    pub bindings: Vec<WithBinding>,
    pub body: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfElseExpr {
    pub condition: Expr,
    pub then_branch: Expr,
    pub else_branch: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FreeObjectField {
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FreeObjectExpr {
    pub fields: Vec<FreeObjectField>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(LiteralExpr),
    SetCtor(SetCtorExpr),
    Ident(IdentExpr),
    Parameter(ParameterExpr),
    PathStep(PathStepExpr),
    Backlink(BacklinkExpr),
    TypeIntersection(TypeIntersectionExpr),
    TypeCast(TypeCastExpr),
    Shape(ShapeExpr),
    FunctionCall(FunctionCallExpr),
    Op(OpExpr),
    Tuple(TupleExpr),
    Array(ArrayExpr),
    Range(RangeExpr),
    Indirection(IndirectionExpr),
    Detached(DetachedExpr),
    Select(Box<SelectExpr>),
    Insert(Box<InsertExpr>),
    Update(Box<UpdateExpr>),
    Delete(Box<DeleteExpr>),
    For(Box<ForExpr>),
    Group(Box<GroupExpr>),
    With(Box<WithExpr>),
    IfElse(Box<IfElseExpr>),
    FreeObject(FreeObjectExpr),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(e) => e.span,
            Expr::SetCtor(e) => e.span,
            Expr::Ident(e) => e.name.span,
            Expr::Parameter(e) => e.span,
            Expr::PathStep(e) => e.span,
            Expr::Backlink(e) => e.span,
            Expr::TypeIntersection(e) => e.span,
            Expr::TypeCast(e) => e.span,
            Expr::Shape(e) => e.span,
            Expr::FunctionCall(e) => e.span,
            Expr::Op(e) => e.span(),
            Expr::Tuple(e) => e.span,
            Expr::Array(e) => e.span,
            Expr::Range(e) => e.span,
            Expr::Indirection(e) => e.span,
            Expr::Detached(e) => e.span,
            Expr::Select(e) => e.span,
            Expr::Insert(e) => e.span,
            Expr::Update(e) => e.span,
            Expr::Delete(e) => e.span,
            Expr::For(e) => e.span,
            Expr::Group(e) => e.span,
            Expr::With(e) => e.span,
            Expr::IfElse(e) => e.span,
            Expr::FreeObject(e) => e.span,
        }
    }
}

// ---- Transaction control, CONFIGURE, ANALYZE (spec.md §4.2) ----

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    RepeatableRead,
    Serializable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransactionStmt {
    Start { isolation: Option<IsolationLevel>, span: Span },
    Commit { span: Span },
    Rollback { span: Span },
    Declare { savepoint: String, span: Span },
    Release { savepoint: String, span: Span },
    RollbackTo { savepoint: String, span: Span },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigureStmt {
    pub scope: String,
    pub setting: String,
    pub value: Expr,
    pub span: Span,
}

// ---- DDL / SDL (spec.md §3.1, §4.3) ----

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetDeletePolicy {
    Restrict,
    DeleteSource,
    Allow,
    DeferredRestrict,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SdlIndexDecl {
    pub expr: Expr,
    pub except: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SdlConstraintDecl {
    pub name: QualName,
    pub args: Vec<Expr>,
    pub subject: Option<Expr>,
    pub message: Option<String>,
    pub delegated: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SdlPointerDecl {
    pub kind: SdlPointerKind,
    pub name: String,
    pub target: Option<TypeExpr>,
    pub cardinality: Cardinality,
    pub required: bool,
    pub readonly: bool,
    pub default: Option<Expr>,
    pub computed: Option<Expr>,
    pub on_target_delete: Option<TargetDeletePolicy>,
    pub on_source_delete: Option<TargetDeletePolicy>,
    pub constraints: Vec<SdlConstraintDecl>,
    pub link_properties: Vec<SdlPointerDecl>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdlPointerKind {
    Property,
    Link,
}

/// `allow` or `deny` (spec.md §3.2: ObjectType "carries access policies").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicyEffect {
    Allow,
    Deny,
}

/// One of the DML actions an access policy governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessAction {
    Select,
    Insert,
    UpdateRead,
    UpdateWrite,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SdlAccessPolicyDecl {
    pub name: String,
    pub effect: AccessPolicyEffect,
    pub actions: Vec<AccessAction>,
    pub using: Expr,
    pub when: Option<Expr>,
    pub span: Span,
}

/// One of the DML events a trigger fires after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SdlTriggerDecl {
    pub name: String,
    pub events: Vec<TriggerEvent>,
    pub when: Option<Expr>,
    pub do_expr: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SdlObjectType {
    pub name: QualName,
    pub is_abstract: bool,
    pub bases: Vec<QualName>,
    pub pointers: Vec<SdlPointerDecl>,
    pub constraints: Vec<SdlConstraintDecl>,
    pub indexes: Vec<SdlIndexDecl>,
    pub access_policies: Vec<SdlAccessPolicyDecl>,
    pub triggers: Vec<SdlTriggerDecl>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SdlScalarType {
    pub name: QualName,
    pub extending: Option<QualName>,
    pub enum_values: Vec<String>,
    pub constraints: Vec<SdlConstraintDecl>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SdlAlias {
    pub name: QualName,
    pub expr: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SdlGlobal {
    pub name: QualName,
    pub ty: TypeExpr,
    pub default: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Volatility {
    Immutable,
    Stable,
    Volatile,
    Modifying,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamModifier {
    Optional,
    Required,
    SetOf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SdlFunctionParam {
    pub name: String,
    pub ty: TypeExpr,
    pub modifier: ParamModifier,
    pub variadic: bool,
    pub named_only: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnModifier {
    SetOfType,
    OptionalType,
    SingletonType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SdlFunction {
    pub name: QualName,
    pub params: Vec<SdlFunctionParam>,
    pub return_type: TypeExpr,
    pub return_modifier: ReturnModifier,
    pub volatility: Volatility,
    pub sql_lowering: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SdlDeclaration {
    ScalarType(SdlScalarType),
    ObjectType(SdlObjectType),
    Alias(SdlAlias),
    Global(SdlGlobal),
    Function(SdlFunction),
}

/// A DDL command's syntax is recognized (`create|alter|drop <subject> …`)
/// but its application to a live schema snapshot is explicitly out of
/// scope (spec.md §1: "migration diffing" is an external collaborator);
/// the command is kept as an opaque, parsed-but-uninterpreted node so the
/// `DDL*` AST tag family spec.md §3.1 names is still represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DdlVerb {
    Create,
    Alter,
    Drop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DdlCommand {
    pub verb: DdlVerb,
    pub subject_kind: String,
    pub subject: QualName,
    pub body_span: Span,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Query(Expr),
    Sdl(SdlDeclaration),
    Ddl(DdlCommand),
    Transaction(TransactionStmt),
    Configure(ConfigureStmt),
    Analyze(Box<Statement>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub statements: Vec<Statement>,
}
