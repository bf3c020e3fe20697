//! Phase {N, I} (spec.md §4.4, §4.5): name resolution and IR construction,
//! "implemented as a single traversal" per spec.md §2's dependency note.
//!
//! Each phase either produces its output or fails fast (spec.md §7): unlike
//! the lexer/parser/catalog builder, which accumulate into a
//! [`Diagnostics`] sink, [`IrBuilder`] returns `Result<_, Error>` and stops
//! at the first type, name, or cardinality error.

use crate::cardinality::Cardinality;
use crate::node::{
    Arena, IndirectionKind as IrIndirectionKind, InsertField, IrNode, IrType, NodeId, NodeKind, OrderItem as IrOrderItem,
    SetRefEntity, ShapeAttr, UnlessConflict as IrUnlessConflict, UpdateAssignOp, UpdateField,
};
use crate::scope::{LocalBinding, LocalId, ScopeKind, ScopeStack, ScopingMode};
use diagnostics::{
    CardinalityError, CardinalityErrorKind, Error, NameError, NameErrorKind, Span, TypeError, TypeErrorKind,
};
use ql_catalog::{
    AliasId, Catalog, CollectionInterner, CollectionShape, EntityRef, GlobalId, ObjectId, OverloadResolution, ParamModifier,
    Pointer, PointerId, PointerKind, ReturnModifier, TypeRef,
};
use ql_parser::ast::{
    self, AssignOp, BinaryOp, DeleteExpr, Expr, ForExpr, GroupExpr, IfElseExpr, InsertExpr, OrderItem as AstOrderItem,
    Script, SelectExpr, ShapeElement, ShapeExpr, Statement, TupleExpr, TypeExpr, UnaryOp, UpdateExpr, WithExpr,
};
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Int64(i64),
    Float64(f64),
    BigInt(String),
    Decimal(String),
    Str(String),
    Bytes(Vec<u8>),
    Bool(bool),
}

pub struct BuildConfig {
    pub default_module: String,
    pub scoping_mode: ScopingMode,
}

#[derive(Debug)]
pub enum StatementIr {
    Query(NodeId),
    Transaction(ast::TransactionStmt),
    Configure(ast::ConfigureStmt),
    /// SDL/DDL forms are recognized but schema application is outside the
    /// compiler (spec.md §1); carried through the script opaquely.
    SchemaCommand(Span),
    Analyze(Box<StatementIr>),
}

pub struct IrProgram {
    pub arena: Arena,
    pub statements: Vec<StatementIr>,
}

/// Builds one program's IR from its AST, sharing a single [`Arena`] and
/// [`ScopeStack`] across every statement in the script (spec.md §6.1:
/// scripts are a sequence of statements compiled together).
pub struct IrBuilder<'a> {
    catalog: &'a Catalog,
    collections: CollectionInterner,
    scopes: ScopeStack,
    arena: Arena,
    alias_cache: FxHashMap<AliasId, NodeId>,
    resolving_aliases: FxHashSet<AliasId>,
}

impl<'a> IrBuilder<'a> {
    pub fn new(catalog: &'a Catalog, config: BuildConfig) -> Self {
        IrBuilder {
            catalog,
            collections: catalog.collections_scratch(),
            scopes: ScopeStack::new(config.scoping_mode, config.default_module),
            arena: Arena::new(),
            alias_cache: FxHashMap::default(),
            resolving_aliases: FxHashSet::default(),
        }
    }

    pub fn build_script(mut self, script: &Script) -> Result<IrProgram, Error> {
        let mut statements = Vec::with_capacity(script.statements.len());
        for stmt in &script.statements {
            statements.push(self.build_statement(stmt)?);
        }
        Ok(IrProgram { arena: self.arena, statements })
    }

    fn build_statement(&mut self, stmt: &Statement) -> Result<StatementIr, Error> {
        match stmt {
            Statement::Query(expr) => Ok(StatementIr::Query(self.build_expr(expr)?)),
            Statement::Transaction(t) => Ok(StatementIr::Transaction(t.clone())),
            Statement::Configure(c) => Ok(StatementIr::Configure(c.clone())),
            Statement::Sdl(decl) => Ok(StatementIr::SchemaCommand(sdl_span(decl))),
            Statement::Ddl(ddl) => Ok(StatementIr::SchemaCommand(ddl.span)),
            Statement::Analyze(inner) => Ok(StatementIr::Analyze(Box::new(self.build_statement(inner)?))),
        }
    }

    fn push(&mut self, kind: NodeKind, ty: IrType, cardinality: Cardinality, span: Span) -> NodeId {
        self.arena.push(IrNode { kind, ty, cardinality, scope: self.scopes.current_path(), binding_key: None, span })
    }

    fn push_with_key(&mut self, kind: NodeKind, ty: IrType, cardinality: Cardinality, span: Span, key: crate::scope::BindingKey) -> NodeId {
        let id = self.push(kind, ty, cardinality, span);
        self.arena.get_mut(id).binding_key = Some(key);
        id
    }

    fn ty_of(&self, node: NodeId) -> IrType {
        self.arena.get(node).ty.clone()
    }

    fn card_of(&self, node: NodeId) -> Cardinality {
        self.arena.get(node).cardinality
    }

    // ---- Expr dispatch (spec.md §4.5) ----

    pub fn build_expr(&mut self, expr: &Expr) -> Result<NodeId, Error> {
        match expr {
            Expr::Literal(lit) => Ok(self.build_literal(lit)),
            Expr::SetCtor(ctor) => self.build_set_ctor(ctor),
            Expr::Ident(ident) => self.build_ident(&ident.name),
            Expr::Parameter(p) => self.build_parameter(p),
            Expr::PathStep(step) => self.build_path_step(step),
            Expr::Backlink(bl) => self.build_backlink(bl),
            Expr::TypeIntersection(ti) => self.build_type_intersection(ti),
            Expr::TypeCast(cast) => self.build_type_cast(cast),
            Expr::Shape(shape) => self.build_bare_shape(shape),
            Expr::FunctionCall(call) => self.build_function_call(call),
            Expr::Op(op) => self.build_op(op),
            Expr::Tuple(tuple) => self.build_tuple(tuple),
            Expr::Array(arr) => self.build_array(arr),
            Expr::Range(range) => self.build_range(range),
            Expr::Indirection(ind) => self.build_indirection(ind),
            Expr::Detached(d) => self.build_detached(d),
            Expr::Select(s) => self.build_select(s),
            Expr::Insert(i) => self.build_insert(i),
            Expr::Update(u) => self.build_update(u),
            Expr::Delete(d) => self.build_delete(d),
            Expr::For(f) => self.build_for(f),
            Expr::Group(g) => self.build_group(g),
            Expr::With(w) => self.build_with(w),
            Expr::IfElse(ie) => self.build_if_else(ie),
            Expr::FreeObject(fo) => self.build_free_object(fo),
        }
    }

    fn build_literal(&mut self, lit: &ast::LiteralExpr) -> NodeId {
        let (value, scalar_name) = match &lit.value {
            ast::Literal::Int64(v) => (LiteralValue::Int64(*v), "int64"),
            ast::Literal::Float64(v) => (LiteralValue::Float64(*v), "float64"),
            ast::Literal::BigInt(s) => (LiteralValue::BigInt(s.clone()), "bigint"),
            ast::Literal::Decimal(s) => (LiteralValue::Decimal(s.clone()), "decimal"),
            ast::Literal::Str(s) => (LiteralValue::Str(s.clone()), "str"),
            ast::Literal::Bytes(b) => (LiteralValue::Bytes(b.clone()), "bytes"),
            ast::Literal::Bool(b) => (LiteralValue::Bool(*b), "bool"),
        };
        let ty = self.scalar_type(scalar_name);
        self.push(NodeKind::Literal(value), IrType::Catalog(ty), Cardinality::One, lit.span)
    }

    fn scalar_type(&self, name: &str) -> TypeRef {
        match self.catalog.resolve_qualified(ql_catalog::STD_MODULE, name) {
            Some(EntityRef::Scalar(id)) => TypeRef::Scalar(id),
            _ => unreachable!("base scalar `{name}` missing from std module"),
        }
    }

    fn build_set_ctor(&mut self, ctor: &ast::SetCtorExpr) -> Result<NodeId, Error> {
        if ctor.elements.is_empty() {
            // An empty set constructor has no element to infer a type from;
            // `std::anytype` would be the catalog's placeholder, but since
            // none is modeled here the empty-set scalar falls back to the
            // the first base scalar's `str` the way an untyped `{}` literal
            // commonly defaults in practice.
            let ty = self.scalar_type("str");
            return Ok(self.push(NodeKind::SetCtor { elements: Vec::new() }, IrType::Catalog(ty), Cardinality::AtMostOne, ctor.span));
        }
        let mut elements = Vec::with_capacity(ctor.elements.len());
        for e in &ctor.elements {
            elements.push(self.build_expr(e)?);
        }
        let ty = self.ty_of(elements[0]);
        Ok(self.push(NodeKind::SetCtor { elements }, ty, Cardinality::Many, ctor.span))
    }

    fn build_ident(&mut self, name: &ast::QualName) -> Result<NodeId, Error> {
        if name.module.is_none() {
            if let Some(local) = self.scopes.lookup_local(&name.name) {
                return Ok(self.ref_local(&name.name, local, name.span));
            }
            if let Some(subject) = self.scopes.lookup_local(".") {
                if let Some(obj) = subject.ty.as_object() {
                    if let Some(ptr) = self.catalog.find_pointer(obj, &name.name) {
                        let source = self.ref_local(".", subject, name.span);
                        return Ok(self.push_path_step(source, ptr, name.span));
                    }
                }
            }
        }
        let module = name.module.clone().unwrap_or_else(|| self.scopes.active_module().to_string());
        let resolved = if name.module.is_some() {
            self.catalog.resolve_qualified(&module, &name.name)
        } else {
            self.catalog.resolve_short(&module, &name.name)
        };
        match resolved {
            Some(EntityRef::Object(id)) => {
                let qualified = self.catalog.object(id).qualified_name();
                let key = self.scopes.entity_root_key(&qualified);
                Ok(self.push_with_key(
                    NodeKind::SetRef { entity: SetRefEntity::Object(id) },
                    IrType::Catalog(TypeRef::Object(id)),
                    Cardinality::Many,
                    name.span,
                    key,
                ))
            }
            Some(EntityRef::Alias(id)) => self.ref_alias(id, name.span),
            Some(EntityRef::Global(id)) => Ok(self.ref_global(id, name.span)),
            Some(other) => Err(TypeError::new(
                TypeErrorKind::BadShapeElement,
                name.span,
                format!("`{}` does not name a value ({other:?})", name.name),
            )
            .into()),
            None => Err(NameError { kind: NameErrorKind::Unresolved, span: name.span, message: format!("unresolved name `{}`", name.name) }.into()),
        }
    }

    fn ref_local(&mut self, name: &str, binding: LocalBinding, span: Span) -> NodeId {
        // The local's id is recovered positionally; `declare_local` already
        // handed the caller its `LocalId`, but a plain name lookup only
        // carries the binding key/type/cardinality. A `SetRef(Local(..))`
        // only needs to be unique per binding key for factoring purposes,
        // so any stable id paired with that key is sufficient; reuse the
        // binding key's own integer as the local id.
        let _ = name;
        let local_id = LocalId(binding.key.0);
        self.push_with_key(
            NodeKind::SetRef { entity: SetRefEntity::Local(local_id) },
            IrType::Catalog(binding.ty),
            binding.cardinality,
            span,
            binding.key,
        )
    }

    fn ref_global(&mut self, id: GlobalId, span: Span) -> NodeId {
        let global = self.catalog.global(id);
        let qualified = global.qualified_name();
        let key = self.scopes.entity_root_key(&qualified);
        self.push_with_key(NodeKind::SetRef { entity: SetRefEntity::Global(id) }, IrType::Catalog(global.ty), Cardinality::AtMostOne, span, key)
    }

    /// Deferred alias binding (spec.md §4.3: "defer expression binding
    /// until the IR builder has constructed a scope"). The alias's
    /// expression is parsed and built once per compilation and memoized;
    /// a cycle (alias A's expression refers to alias A) is an internal
    /// consistency failure the catalog builder does not catch, since it
    /// only validates inheritance cycles, not alias expression cycles.
    fn ref_alias(&mut self, id: AliasId, span: Span) -> Result<NodeId, Error> {
        if let Some(&cached) = self.alias_cache.get(&id) {
            let qualified = self.catalog.alias(id).qualified_name();
            let key = self.scopes.entity_root_key(&qualified);
            let ty = self.ty_of(cached);
            let card = self.card_of(cached);
            return Ok(self.push_with_key(NodeKind::SetRef { entity: SetRefEntity::Alias(id) }, ty, card, span, key));
        }
        if !self.resolving_aliases.insert(id) {
            return Err(diagnostics::IceError::new(format!("cyclic alias expression in `{}`", self.catalog.alias(id).qualified_name())).into());
        }
        let alias = self.catalog.alias(id);
        let source_text = alias.expr.source_text.clone();
        let parsed = ql_parser::parse_expr(&source_text)
            .map_err(|e| Error::from(diagnostics::Error::from(e)))
            .unwrap_or_else(|_| panic!("alias body failed to re-parse"));
        let built = self.build_expr(&parsed)?;
        self.resolving_aliases.remove(&id);
        self.alias_cache.insert(id, built);
        let qualified = self.catalog.alias(id).qualified_name();
        let key = self.scopes.entity_root_key(&qualified);
        let ty = self.ty_of(built);
        let card = self.card_of(built);
        Ok(self.push_with_key(NodeKind::SetRef { entity: SetRefEntity::Alias(id) }, ty, card, span, key))
    }

    fn build_parameter(&mut self, p: &ast::ParameterExpr) -> Result<NodeId, Error> {
        let ty = match &p.type_annotation {
            Some(t) => self.resolve_type_expr(t)?,
            None => return Err(TypeError::new(TypeErrorKind::NoOverload, p.span, format!("parameter `${}` requires a type annotation", p.name)).into()),
        };
        let cardinality = if p.optional { Cardinality::AtMostOne } else { Cardinality::One };
        Ok(self.push(NodeKind::Param { name: p.name.clone(), optional: p.optional }, IrType::Catalog(ty), cardinality, p.span))
    }

    /// `base.ptr`: "type is `ptr`'s target; cardinality is `base.card ·
    /// ptr.card`" (spec.md §4.5).
    fn build_path_step(&mut self, step: &ast::PathStepExpr) -> Result<NodeId, Error> {
        let base = self.build_expr(&step.base)?;
        let base_ty = self.ty_of(base).as_catalog().ok_or_else(|| {
            Error::from(TypeError::new(TypeErrorKind::BadShapeElement, step.span, "path step base has no object type"))
        })?;
        let owner = base_ty.as_object().ok_or_else(|| {
            Error::from(TypeError::new(TypeErrorKind::BadShapeElement, step.span, format!("`.{}` requires an object-typed base", step.pointer)))
        })?;
        let ptr = self
            .catalog
            .find_pointer(owner, &step.pointer)
            .ok_or_else(|| Error::from(NameError { kind: NameErrorKind::Unresolved, span: step.span, message: format!("no pointer named `{}`", step.pointer) }))?
            .clone();
        Ok(self.push_path_step(base, &ptr, step.span))
    }

    fn push_path_step(&mut self, base: NodeId, ptr: &Pointer, span: Span) -> NodeId {
        let cardinality = self.card_of(base).product(pointer_cardinality(ptr));
        self.push(NodeKind::PathStep { source: base, pointer: ptr.id }, IrType::Catalog(ptr.target), cardinality, span)
    }

    /// `base.<ptr[is T]` (spec.md §4.5): "enumerates all pointers named
    /// `ptr` whose target is a supertype of `base`'s type; intersects with
    /// `T`; resulting cardinality is always `MANY`."
    fn build_backlink(&mut self, bl: &ast::BacklinkExpr) -> Result<NodeId, Error> {
        let base = self.build_expr(&bl.base)?;
        let base_ty = self.ty_of(base).as_catalog().and_then(TypeRef::as_object).ok_or_else(|| {
            Error::from(TypeError::new(TypeErrorKind::BadShapeElement, bl.span, "backlink base must be object-typed"))
        })?;
        let candidates: Vec<PointerId> = self.catalog.links_targeting(base_ty, &bl.pointer).into_iter().map(|p| p.id).collect();
        if candidates.is_empty() {
            return Err(NameError { kind: NameErrorKind::Unresolved, span: bl.span, message: format!("no link named `{}` targets this type", bl.pointer) }.into());
        }
        let intersect = match &bl.intersect {
            Some(t) => Some(self.resolve_object_type(t, bl.span)?),
            None => None,
        };
        // Every candidate's owner is the backlink's resulting element type;
        // since they must agree up to the intersection, the first
        // candidate's owner (optionally narrowed by `intersect`) is used.
        let elem_ty = intersect.unwrap_or_else(|| self.catalog.pointer(candidates[0]).owner);
        Ok(self.push(NodeKind::Backlink { source: base, candidates, intersect }, IrType::Catalog(TypeRef::Object(elem_ty)), Cardinality::Many, bl.span))
    }

    fn build_type_intersection(&mut self, ti: &ast::TypeIntersectionExpr) -> Result<NodeId, Error> {
        let base = self.build_expr(&ti.base)?;
        let target = self.resolve_object_type(&ti.ty, ti.span)?;
        let base_ty = self.ty_of(base).as_catalog().and_then(TypeRef::as_object);
        let Some(base_obj) = base_ty else {
            return Err(TypeError::new(TypeErrorKind::IntersectionEmpty, ti.span, "type intersection requires an object-typed base").into());
        };
        let proper = base_obj != target;
        let base_card = self.card_of(base);
        let cardinality = if proper { base_card.weaken() } else { base_card };
        Ok(self.push(NodeKind::TypeIntersection { expr: base, ty: target }, IrType::Catalog(TypeRef::Object(target)), cardinality, ti.span))
    }

    /// `<T>expr` (spec.md §4.5): "valid only if a cast entity
    /// `(source_type_of(expr), T)` exists." A UUID cast to an object type
    /// is the special `SetRef`-by-id form instead.
    fn build_type_cast(&mut self, cast: &ast::TypeCastExpr) -> Result<NodeId, Error> {
        let expr = self.build_expr(&cast.expr)?;
        let target = self.resolve_type_expr(&cast.target)?;
        if let TypeRef::Object(obj) = target {
            let source_ty = self.ty_of(expr).as_catalog();
            if source_ty == Some(self.scalar_type("uuid")) {
                return Ok(self.push(NodeKind::UuidObjectCast { target: obj, uuid_expr: expr }, IrType::Catalog(target), Cardinality::One, cast.span));
            }
        }
        let source_ty = self.ty_of(expr).as_catalog().ok_or_else(|| {
            Error::from(TypeError::new(TypeErrorKind::CastFailed, cast.span, "cannot cast a structural free-object value"))
        })?;
        if source_ty == target {
            return Ok(expr);
        }
        let entry = self
            .catalog
            .find_cast(source_ty, target)
            .ok_or_else(|| Error::from(TypeError::new(TypeErrorKind::CastFailed, cast.span, format!("no cast from `{}` to `{}`", self.catalog.type_name(source_ty), self.catalog.type_name(target)))))?;
        let cardinality = self.card_of(expr);
        Ok(self.push(NodeKind::Cast { cast: entry.id, target, expr }, IrType::Catalog(target), cardinality, cast.span))
    }

    // ---- Shapes (spec.md §4.5 "Shape") ----

    fn build_bare_shape(&mut self, shape: &ShapeExpr) -> Result<NodeId, Error> {
        let subject_expr = shape.subject.as_deref().ok_or_else(|| {
            Error::from(TypeError::new(TypeErrorKind::BadShapeElement, shape.span, "free-standing shape requires a subject"))
        })?;
        let subject = self.build_expr(subject_expr)?;
        self.build_shape_on(subject, shape, is_path_expr(subject_expr))
    }

    fn build_shape_on(&mut self, subject: NodeId, shape: &ShapeExpr, subject_is_path: bool) -> Result<NodeId, Error> {
        let subject_ty = self.ty_of(subject);
        let subject_card = self.card_of(subject);
        let subject_obj = subject_ty.as_catalog().and_then(TypeRef::as_object).ok_or_else(|| {
            Error::from(TypeError::new(TypeErrorKind::BadShapeElement, shape.span, "a shape's subject must be object-typed"))
        })?;
        self.scopes.push(ScopeKind::ShapeElement, subject_is_path);
        let (subject_local, _) = self.scopes.declare_local(".", TypeRef::Object(subject_obj), subject_card);
        let mut elements = Vec::with_capacity(shape.elements.len());
        for el in &shape.elements {
            elements.push(self.build_shape_element(subject_local, subject_obj, el)?);
        }
        self.scopes.pop();
        Ok(self.push(NodeKind::Shape { subject, elements }, subject_ty, subject_card, shape.span))
    }

    fn build_shape_element(&mut self, subject_local: LocalId, subject_obj: ObjectId, el: &ShapeElement) -> Result<ShapeAttr, Error> {
        let _ = subject_local;
        if let Some(computed) = &el.computed_expr {
            let value = self.build_expr(computed)?;
            return Ok(ShapeAttr { name: el.name.clone(), value, ty: self.ty_of(value), cardinality: self.card_of(value) });
        }
        let owner = match &el.type_filter {
            Some(t) => self.resolve_object_type(t, el.span)?,
            None => subject_obj,
        };
        let ptr = self
            .catalog
            .find_pointer(owner, &el.name)
            .ok_or_else(|| Error::from(NameError { kind: NameErrorKind::Unresolved, span: el.span, message: format!("no pointer named `{}`", el.name) }))?
            .clone();
        let subject_ref = self.ref_local(".", self.scopes.lookup_local(".").expect("shape scope declares `.`"), el.span);
        let mut value = self.push_path_step(subject_ref, &ptr, el.span);
        if let Some(nested) = &el.nested_shape {
            value = self.build_shape_on(value, nested, true)?;
        }
        if el.filter.is_some() || !el.order_by.is_empty() || el.offset.is_some() || el.limit.is_some() {
            value = self.build_filter_order_limit(value, el.filter.as_ref(), &el.order_by, el.offset.as_ref(), el.limit.as_ref(), el.span, true)?;
        }
        Ok(ShapeAttr { name: el.name.clone(), ty: self.ty_of(value), cardinality: self.card_of(value), value })
    }

    // ---- Function / operator calls (spec.md §4.5) ----

    fn build_function_call(&mut self, call: &ast::FunctionCallExpr) -> Result<NodeId, Error> {
        let module = call.name.module.clone().unwrap_or_else(|| self.scopes.active_module().to_string());
        let qualified = format!("{module}::{}", call.name.name);
        let mut candidates = self.catalog.functions_named(&qualified).to_vec();
        if candidates.is_empty() && call.name.module.is_none() {
            candidates = self.catalog.functions_named(&format!("{}::{}", ql_catalog::STD_MODULE, call.name.name)).to_vec();
        }
        if candidates.is_empty() {
            return Err(NameError { kind: NameErrorKind::Unresolved, span: call.span, message: format!("unknown function `{}`", call.name.name) }.into());
        }
        let mut args = Vec::with_capacity(call.args.len());
        for a in &call.args {
            args.push(self.build_expr(a)?);
        }
        let mut named_args = Vec::with_capacity(call.named_args.len());
        for (n, a) in &call.named_args {
            named_args.push((n.clone(), self.build_expr(a)?));
        }
        let arg_types: Vec<TypeRef> = args.iter().filter_map(|&n| self.ty_of(n).as_catalog()).collect();
        let overload = match self.catalog.resolve_function_overload(&candidates, &arg_types) {
            OverloadResolution::Unique(id) => id,
            OverloadResolution::None => {
                return Err(TypeError::new(TypeErrorKind::NoOverload, call.span, format!("no overload of `{}` matches these argument types", call.name.name)).into())
            }
            OverloadResolution::Ambiguous => {
                return Err(TypeError::new(TypeErrorKind::Ambiguous, call.span, format!("call to `{}` is ambiguous", call.name.name)).into())
            }
        };
        let func = self.catalog.function(overload).clone();
        let args = self.insert_implicit_casts(args, &func.params, call.span)?;
        let cardinality = call_cardinality(func.return_modifier, &func.params, args.iter().map(|&n| self.card_of(n)));
        Ok(self.push(NodeKind::FuncCall { overload, args, named_args }, IrType::Catalog(func.return_type), cardinality, call.span))
    }

    fn build_op(&mut self, op: &ast::OpExpr) -> Result<NodeId, Error> {
        match op {
            ast::OpExpr::Unary { op, operand, span } => self.build_unary(*op, operand, *span),
            ast::OpExpr::Binary { op, lhs, rhs, span } => self.build_binary(*op, lhs, rhs, *span),
        }
    }

    fn build_unary(&mut self, op: UnaryOp, operand: &Expr, span: Span) -> Result<NodeId, Error> {
        let arg = self.build_expr(operand)?;
        let name = match op {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "not",
            UnaryOp::Distinct => "distinct",
        };
        self.build_operator_call(name, vec![arg], span)
    }

    fn build_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, span: Span) -> Result<NodeId, Error> {
        if op == BinaryOp::Coalesce {
            let lhs = self.build_expr(lhs)?;
            let rhs = self.build_expr(rhs)?;
            let ty = self.ty_of(lhs);
            let cardinality = self.card_of(lhs).join(self.card_of(rhs)).weaken().join(self.card_of(rhs));
            return Ok(self.push(NodeKind::Coalesce { lhs, rhs }, ty, cardinality.join(Cardinality::AtMostOne), span));
        }
        if op == BinaryOp::Union {
            let lhs = self.build_expr(lhs)?;
            let rhs = self.build_expr(rhs)?;
            let ty = self.ty_of(lhs);
            let cardinality = self.card_of(lhs).join(self.card_of(rhs)).join(Cardinality::Many);
            return self.wrap_union(lhs, rhs, ty, cardinality, span);
        }
        let lhs = self.build_expr(lhs)?;
        let rhs = self.build_expr(rhs)?;
        self.build_operator_call(binary_op_name(op), vec![lhs, rhs], span)
    }

    fn wrap_union(&mut self, lhs: NodeId, rhs: NodeId, ty: IrType, cardinality: Cardinality, span: Span) -> Result<NodeId, Error> {
        Ok(self.push(NodeKind::SetCtor { elements: vec![lhs, rhs] }, ty, cardinality, span))
    }

    fn build_operator_call(&mut self, op_name: &str, args: Vec<NodeId>, span: Span) -> Result<NodeId, Error> {
        let module = self.scopes.active_module().to_string();
        let mut candidates = self.catalog.operators_named(&format!("{module}::{op_name}")).to_vec();
        if candidates.is_empty() {
            candidates = self.catalog.operators_named(&format!("{}::{op_name}", ql_catalog::STD_MODULE)).to_vec();
        }
        if candidates.is_empty() {
            return Err(NameError { kind: NameErrorKind::Unresolved, span, message: format!("unknown operator `{op_name}`") }.into());
        }
        let arg_types: Vec<TypeRef> = args.iter().filter_map(|&n| self.ty_of(n).as_catalog()).collect();
        let overload = match self.catalog.resolve_operator_overload(&candidates, &arg_types) {
            OverloadResolution::Unique(id) => id,
            OverloadResolution::None => return Err(TypeError::new(TypeErrorKind::NoOverload, span, format!("no overload of `{op_name}` matches these argument types")).into()),
            OverloadResolution::Ambiguous => return Err(TypeError::new(TypeErrorKind::Ambiguous, span, format!("use of `{op_name}` is ambiguous")).into()),
        };
        let operator = self.catalog.operator(overload).clone();
        let args = self.insert_implicit_casts(args, &operator.params, span)?;
        let cardinality = call_cardinality(operator.return_modifier, &operator.params, args.iter().map(|&n| self.card_of(n)));
        Ok(self.push(NodeKind::OpCall { overload, args }, IrType::Catalog(operator.return_type), cardinality, span))
    }

    /// Inserts an implicit [`NodeKind::Cast`] wherever a positional
    /// argument's type does not already match its parameter's declared
    /// type (spec.md §4.5: "implicit casts are inserted where declared").
    fn insert_implicit_casts(&mut self, args: Vec<NodeId>, params: &[ql_catalog::Param], span: Span) -> Result<Vec<NodeId>, Error> {
        let mut out = Vec::with_capacity(args.len());
        for (i, arg) in args.into_iter().enumerate() {
            let param = params.get(i.min(params.len().saturating_sub(1)));
            let Some(param) = param else {
                out.push(arg);
                continue;
            };
            let Some(arg_ty) = self.ty_of(arg).as_catalog() else {
                out.push(arg);
                continue;
            };
            if arg_ty == param.ty {
                out.push(arg);
                continue;
            }
            let Some(entry) = self.catalog.find_cast(arg_ty, param.ty) else {
                out.push(arg);
                continue;
            };
            let cardinality = self.card_of(arg);
            out.push(self.push(NodeKind::Cast { cast: entry.id, target: param.ty, expr: arg }, IrType::Catalog(param.ty), cardinality, span));
        }
        Ok(out)
    }

    // ---- Constructors ----

    fn build_tuple(&mut self, tuple: &TupleExpr) -> Result<NodeId, Error> {
        let mut elements = Vec::with_capacity(tuple.elements.len());
        let mut cardinality = Cardinality::One;
        let mut shape = Vec::with_capacity(tuple.elements.len());
        for (name, e) in &tuple.elements {
            let node = self.build_expr(e)?;
            cardinality = cardinality.product(self.card_of(node));
            shape.push((name.clone(), self.ty_of(node).as_catalog().unwrap_or(TypeRef::Scalar(self.scalar_type("str").as_scalar().unwrap()))));
            elements.push((name.clone(), node));
        }
        let ty = IrType::Catalog(TypeRef::Collection(self.collections.intern(CollectionShape::Tuple(shape))));
        Ok(self.push(NodeKind::TupleCtor { elements }, ty, cardinality, tuple.span))
    }

    fn build_array(&mut self, arr: &ast::ArrayExpr) -> Result<NodeId, Error> {
        let mut elements = Vec::with_capacity(arr.elements.len());
        for e in &arr.elements {
            elements.push(self.build_expr(e)?);
        }
        let elem_ty = elements.first().and_then(|&n| self.ty_of(n).as_catalog()).unwrap_or(self.scalar_type("str"));
        let ty = IrType::Catalog(TypeRef::Collection(self.collections.intern(CollectionShape::Array(elem_ty))));
        Ok(self.push(NodeKind::ArrayCtor { elements }, ty, Cardinality::One, arr.span))
    }

    fn build_range(&mut self, range: &ast::RangeExpr) -> Result<NodeId, Error> {
        let lower = range.lower.as_deref().map(|e| self.build_expr(e)).transpose()?;
        let upper = range.upper.as_deref().map(|e| self.build_expr(e)).transpose()?;
        let elem_ty = lower
            .or(upper)
            .and_then(|n| self.ty_of(n).as_catalog())
            .unwrap_or(self.scalar_type("int64"));
        let ty = IrType::Catalog(TypeRef::Collection(self.collections.intern(CollectionShape::Range(elem_ty))));
        Ok(self.push(
            NodeKind::RangeCtor { lower, upper, inc_lower: range.inc_lower, inc_upper: range.inc_upper },
            ty,
            Cardinality::One,
            range.span,
        ))
    }

    fn build_free_object(&mut self, fo: &ast::FreeObjectExpr) -> Result<NodeId, Error> {
        let mut fields = Vec::with_capacity(fo.fields.len());
        let mut shape = Vec::with_capacity(fo.fields.len());
        for f in &fo.fields {
            let node = self.build_expr(&f.value)?;
            shape.push((f.name.clone(), self.ty_of(node)));
            fields.push((f.name.clone(), node));
        }
        Ok(self.push(NodeKind::FreeObject { fields }, IrType::FreeObject(shape), Cardinality::One, fo.span))
    }

    fn build_indirection(&mut self, ind: &ast::IndirectionExpr) -> Result<NodeId, Error> {
        let base = self.build_expr(&ind.base)?;
        let base_ty = self.ty_of(base);
        match &ind.index {
            ast::IndirectionKind::Index(i) => {
                let i = self.build_expr(i)?;
                let elem_ty = match &base_ty {
                    IrType::Catalog(TypeRef::Collection(id)) => match &self.collections.get(*id).shape {
                        CollectionShape::Array(t) => IrType::Catalog(*t),
                        _ => base_ty.clone(),
                    },
                    other => other.clone(),
                };
                Ok(self.push(NodeKind::Indirection { base, index: IrIndirectionKind::Index(i) }, elem_ty, self.card_of(base), ind.span))
            }
            ast::IndirectionKind::Slice(lo, hi) => {
                let lo = lo.as_deref().map(|e| self.build_expr(e)).transpose()?;
                let hi = hi.as_deref().map(|e| self.build_expr(e)).transpose()?;
                let cardinality = self.card_of(base);
                Ok(self.push(NodeKind::Indirection { base, index: IrIndirectionKind::Slice(lo, hi) }, base_ty, cardinality, ind.span))
            }
        }
    }

    fn build_detached(&mut self, d: &ast::DetachedExpr) -> Result<NodeId, Error> {
        let key = self.scopes.detached_key();
        let expr = self.build_expr(&d.expr)?;
        let ty = self.ty_of(expr);
        let cardinality = self.card_of(expr);
        Ok(self.push_with_key(NodeKind::Detached { expr }, ty, cardinality, d.span, key))
    }

    // ---- Statements ----

    fn build_select(&mut self, s: &SelectExpr) -> Result<NodeId, Error> {
        let subject = self.build_expr(&s.subject)?;
        let ty = self.ty_of(subject);
        let cardinality = self.card_of(subject);
        self.build_filter_order_limit(subject, s.filter.as_ref(), &s.order_by, s.offset.as_ref(), s.limit.as_ref(), s.span, is_path_expr(&s.subject))
            .map(|node| {
                let _ = (ty, cardinality);
                node
            })
    }

    /// Shared tail for `select`/`delete` and filtered shape elements
    /// (spec.md §4.5: "`offset` and `limit` are evaluated in the *outer*
    /// scope (not the per-row scope), so they cannot reference the row").
    fn build_filter_order_limit(
        &mut self,
        subject: NodeId,
        filter: Option<&Expr>,
        order_by: &[AstOrderItem],
        offset: Option<&Expr>,
        limit: Option<&Expr>,
        span: Span,
        subject_is_path: bool,
    ) -> Result<NodeId, Error> {
        let offset = offset.map(|e| self.build_expr(e)).transpose()?;
        self.check_singleton_int(offset, span)?;
        let limit = limit.map(|e| self.build_expr(e)).transpose()?;
        self.check_singleton_int(limit, span)?;

        let subject_ty = self.ty_of(subject);
        let subject_card = self.card_of(subject);
        self.scopes.push(ScopeKind::SelectBody, subject_is_path);
        if let Some(obj) = subject_ty.as_catalog().and_then(TypeRef::as_object) {
            self.scopes.declare_local(".", TypeRef::Object(obj), subject_card);
        }
        let filter = filter.map(|e| self.build_expr(e)).transpose()?;
        if let Some(f) = filter {
            self.check_bool(f, span)?;
        }
        let mut order_ir = Vec::with_capacity(order_by.len());
        for item in order_by {
            let expr = self.build_expr(&item.expr)?;
            order_ir.push(IrOrderItem { expr, descending: item.order == ast::SortOrder::Desc });
        }
        self.scopes.pop();

        let cardinality = if filter.is_some() { subject_card.weaken() } else { subject_card };
        Ok(self.push(
            NodeKind::SelectStmt { subject, filter, order_by: order_ir, offset, limit },
            subject_ty,
            cardinality,
            span,
        ))
    }

    fn check_bool(&self, node: NodeId, span: Span) -> Result<(), Error> {
        let bool_ty = self.scalar_type("bool");
        if self.ty_of(node).as_catalog() != Some(bool_ty) {
            return Err(TypeError::new(TypeErrorKind::BadShapeElement, span, "filter expression must be `bool`").into());
        }
        Ok(())
    }

    fn check_singleton_int(&self, node: Option<NodeId>, span: Span) -> Result<(), Error> {
        let Some(node) = node else { return Ok(()) };
        if !self.card_of(node).is_singleton() {
            return Err(CardinalityError::new(CardinalityErrorKind::ExpectedSingleton, span, "offset/limit must be a singleton int64").into());
        }
        let int_ty = self.scalar_type("int64");
        if self.ty_of(node).as_catalog() != Some(int_ty) {
            return Err(TypeError::new(TypeErrorKind::CastFailed, span, "offset/limit must be `int64`").into());
        }
        Ok(())
    }

    /// `insert T { … }` (spec.md §4.5): "requires `T` concrete... required
    /// non-defaulted properties must be present. Output is a singleton."
    fn build_insert(&mut self, i: &InsertExpr) -> Result<NodeId, Error> {
        let target = self.resolve_object_ref(&i.type_name, i.span)?;
        if self.catalog.object(target).is_abstract {
            return Err(TypeError::new(TypeErrorKind::BadShapeElement, i.span, "cannot `insert` an abstract type").into());
        }
        let mut fields = Vec::with_capacity(i.elements.len());
        let mut seen = FxHashSet::default();
        for el in &i.elements {
            let ptr = self
                .catalog
                .find_pointer(target, &el.name)
                .ok_or_else(|| Error::from(NameError { kind: NameErrorKind::Unresolved, span: el.span, message: format!("no pointer named `{}`", el.name) }))?
                .clone();
            seen.insert(ptr.id);
            let value = self.build_expr(&el.value)?;
            let value = self.coerce_to(value, ptr.target, el.span)?;
            fields.push(InsertField { pointer: ptr.id, value });
        }
        for anc in &self.catalog.object(target).mro.clone() {
            for &pid in &self.catalog.object(*anc).own_pointers.clone() {
                let ptr = self.catalog.pointer(pid);
                if ptr.required && ptr.default.is_none() && ptr.computed.is_none() && !seen.contains(&pid) {
                    return Err(TypeError::new(TypeErrorKind::RequiredNotProvided, i.span, format!("missing required property `{}`", ptr.name)).into());
                }
            }
        }
        let unless_conflict = match &i.unless_conflict {
            Some(uc) => Some(IrUnlessConflict {
                on: match &uc.on {
                    Some(Expr::Ident(id)) => self.catalog.find_pointer(target, &id.name.name).map(|p| p.id),
                    _ => None,
                },
                else_expr: uc.else_expr.as_ref().map(|e| self.build_expr(e)).transpose()?,
            }),
            None => None,
        };
        Ok(self.push(NodeKind::InsertStmt { target, fields, unless_conflict }, IrType::Catalog(TypeRef::Object(target)), Cardinality::One, i.span))
    }

    fn coerce_to(&mut self, node: NodeId, target: TypeRef, span: Span) -> Result<NodeId, Error> {
        let Some(source) = self.ty_of(node).as_catalog() else { return Ok(node) };
        if source == target {
            return Ok(node);
        }
        let Some(entry) = self.catalog.find_cast(source, target) else { return Ok(node) };
        let cardinality = self.card_of(node);
        Ok(self.push(NodeKind::Cast { cast: entry.id, target, expr: node }, IrType::Catalog(target), cardinality, span))
    }

    /// `update E filter F set { … }` (spec.md §4.5).
    fn build_update(&mut self, u: &UpdateExpr) -> Result<NodeId, Error> {
        let subject = self.build_expr(&u.subject)?;
        let owner = self.ty_of(subject).as_catalog().and_then(TypeRef::as_object).ok_or_else(|| {
            Error::from(TypeError::new(TypeErrorKind::BadShapeElement, u.span, "`update` subject must be an object set"))
        })?;
        self.scopes.push(ScopeKind::SelectBody, is_path_expr(&u.subject));
        self.scopes.declare_local(".", TypeRef::Object(owner), self.card_of(subject));
        let filter = u.filter.as_ref().map(|e| self.build_expr(e)).transpose()?;
        if let Some(f) = filter {
            self.check_bool(f, u.span)?;
        }
        let mut fields = Vec::with_capacity(u.set.len());
        for el in &u.set {
            let ptr = self
                .catalog
                .find_pointer(owner, &el.name)
                .ok_or_else(|| Error::from(NameError { kind: NameErrorKind::Unresolved, span: el.span, message: format!("no pointer named `{}`", el.name) }))?
                .clone();
            let value = self.build_expr(&el.value)?;
            let value = self.coerce_to(value, ptr.target, el.span)?;
            let op = match el.op {
                AssignOp::Assign => UpdateAssignOp::Assign,
                AssignOp::Add => UpdateAssignOp::Add,
                AssignOp::Sub => UpdateAssignOp::Sub,
            };
            if matches!(op, UpdateAssignOp::Add | UpdateAssignOp::Sub) && ptr.kind != PointerKind::Link {
                return Err(TypeError::new(TypeErrorKind::BadShapeElement, el.span, "`+=`/`-=` only apply to links").into());
            }
            fields.push(UpdateField { pointer: ptr.id, op, value });
        }
        self.scopes.pop();
        let cardinality = if filter.is_some() { self.card_of(subject).weaken() } else { self.card_of(subject) };
        Ok(self.push(NodeKind::UpdateStmt { subject, filter, fields }, IrType::Catalog(TypeRef::Object(owner)), cardinality, u.span))
    }

    fn build_delete(&mut self, d: &DeleteExpr) -> Result<NodeId, Error> {
        let subject = self.build_expr(&d.subject)?;
        let ty = self.ty_of(subject);
        let node = self.build_filter_order_limit(subject, d.filter.as_ref(), &d.order_by, d.offset.as_ref(), d.limit.as_ref(), d.span, is_path_expr(&d.subject))?;
        // Re-tag the `SelectStmt` shell as a `DeleteStmt` with the same
        // computed parts, matching spec.md's dedicated `DeleteStmt` node.
        let IrNode { kind, cardinality, scope, binding_key, span, .. } = self.arena.get(node).clone();
        let NodeKind::SelectStmt { subject, filter, order_by, offset, limit } = kind else {
            unreachable!("build_filter_order_limit always produces a SelectStmt shell")
        };
        let id = self.arena.push(IrNode {
            kind: NodeKind::DeleteStmt { subject, filter, order_by, offset, limit },
            ty,
            cardinality,
            scope,
            binding_key,
            span,
        });
        Ok(id)
    }

    /// `for x in S [union] B` (spec.md §4.5): "introduces a fresh binding
    /// key for `x` bound to a singleton of `S.element`."
    fn build_for(&mut self, f: &ForExpr) -> Result<NodeId, Error> {
        let iterator = self.build_expr(&f.iterator)?;
        let elem_ty = self.ty_of(iterator).as_catalog().unwrap_or(self.scalar_type("str"));
        self.scopes.push(ScopeKind::ForBody, false);
        self.scopes.declare_local(&f.iterator_name, elem_ty, Cardinality::One);
        let body = self.build_expr(&f.body)?;
        self.scopes.pop();
        let ty = self.ty_of(body);
        let cardinality = self.card_of(body).join(Cardinality::Many);
        Ok(self.push(NodeKind::For { iterator, is_union: f.is_union, body }, ty, cardinality, f.span))
    }

    /// `group E using a := Ea, … by a, …` (spec.md §4.5): "produces a set
    /// of free objects `{key, grouping, elements}`."
    fn build_group(&mut self, g: &GroupExpr) -> Result<NodeId, Error> {
        let subject = self.build_expr(&g.subject)?;
        let subject_ty = self.ty_of(subject);
        let subject_card = self.card_of(subject);
        self.scopes.push(ScopeKind::AggregateArg, false);
        if let Some(obj) = subject_ty.as_catalog().and_then(TypeRef::as_object) {
            self.scopes.declare_local(".", TypeRef::Object(obj), subject_card);
        }
        let mut using = Vec::with_capacity(g.using.len());
        let mut key_shape = Vec::with_capacity(g.using.len());
        for (name, expr) in &g.using {
            let node = self.build_expr(expr)?;
            key_shape.push((name.clone(), self.ty_of(node)));
            using.push((name.clone(), node));
        }
        self.scopes.pop();
        let key_ty = IrType::FreeObject(key_shape.clone());
        let result_ty = IrType::FreeObject(vec![
            ("key".to_string(), key_ty),
            ("grouping".to_string(), IrType::Catalog(TypeRef::Collection(self.collections.intern(CollectionShape::Array(self.scalar_type("str")))))),
            ("elements".to_string(), subject_ty),
        ]);
        Ok(self.push(NodeKind::Group { subject, using, by: g.by.clone() }, result_ty, Cardinality::Many, g.span))
    }

    /// `with n := Ex, … body` (spec.md §4.5): "each `n` as an alias with
    /// fresh binding key; evaluation is lazy... unless the expression has
    /// side effects (DML), in which case evaluation is ordered."
    fn build_with(&mut self, w: &WithExpr) -> Result<NodeId, Error> {
        let saved_module = self.scopes.active_module().to_string();
        if let Some(m) = &w.module {
            self.scopes.set_active_module(m.clone());
        }
        self.scopes.push(ScopeKind::WithBinding, false);
        let mut bound: Vec<(NodeId, LocalId)> = Vec::with_capacity(w.bindings.len());
        for binding in &w.bindings {
            let value = self.build_expr(&binding.value)?;
            let ty = self.ty_of(value).as_catalog().unwrap_or(self.scalar_type("str"));
            let (local_id, key) = self.scopes.declare_local(&binding.name, ty, self.card_of(value));
            self.arena.get_mut(value).binding_key = Some(key);
            bound.push((value, local_id));
        }
        let body = self.build_expr(&w.body)?;
        self.scopes.pop();
        self.scopes.set_active_module(saved_module);
        let mut node = body;
        for (value, _) in bound.into_iter().rev() {
            let ty = self.ty_of(node);
            let cardinality = self.card_of(node);
            node = self.push(NodeKind::WithBinding { value, body: node }, ty, cardinality, w.span);
        }
        Ok(node)
    }

    fn build_if_else(&mut self, ie: &IfElseExpr) -> Result<NodeId, Error> {
        let condition = self.build_expr(&ie.condition)?;
        self.check_bool(condition, ie.span)?;
        let then_branch = self.build_expr(&ie.then_branch)?;
        let else_branch = self.build_expr(&ie.else_branch)?;
        let ty = self.ty_of(then_branch);
        let cardinality = self.card_of(then_branch).join(self.card_of(else_branch));
        Ok(self.push(NodeKind::IfElse { condition, then_branch, else_branch }, ty, cardinality, ie.span))
    }

    // ---- Type-expr resolution ----

    fn resolve_type_expr(&mut self, ty: &TypeExpr) -> Result<TypeRef, Error> {
        match ty {
            TypeExpr::Optional(inner) => self.resolve_type_expr(inner),
            TypeExpr::Named(name) => {
                let module = name.module.clone().unwrap_or_else(|| self.scopes.active_module().to_string());
                let resolved = if name.module.is_some() {
                    self.catalog.resolve_qualified(&module, &name.name)
                } else {
                    self.catalog.resolve_short(&module, &name.name)
                };
                match resolved {
                    Some(EntityRef::Scalar(id)) => Ok(TypeRef::Scalar(id)),
                    Some(EntityRef::Object(id)) => Ok(TypeRef::Object(id)),
                    _ => Err(NameError { kind: NameErrorKind::Unresolved, span: name.span, message: format!("unknown type `{}`", name.name) }.into()),
                }
            }
            TypeExpr::Array(inner) => {
                let elem = self.resolve_type_expr(inner)?;
                Ok(TypeRef::Collection(self.collections.intern(CollectionShape::Array(elem))))
            }
            TypeExpr::Range(inner) => {
                let elem = self.resolve_type_expr(inner)?;
                Ok(TypeRef::Collection(self.collections.intern(CollectionShape::Range(elem))))
            }
            TypeExpr::Multirange(inner) => {
                let elem = self.resolve_type_expr(inner)?;
                Ok(TypeRef::Collection(self.collections.intern(CollectionShape::Multirange(elem))))
            }
            TypeExpr::Tuple(elements) => {
                let mut shape = Vec::with_capacity(elements.len());
                for (name, t) in elements {
                    shape.push((name.clone(), self.resolve_type_expr(t)?));
                }
                Ok(TypeRef::Collection(self.collections.intern(CollectionShape::Tuple(shape))))
            }
        }
    }

    fn resolve_object_type(&mut self, ty: &TypeExpr, span: Span) -> Result<ObjectId, Error> {
        match self.resolve_type_expr(ty)? {
            TypeRef::Object(id) => Ok(id),
            _ => Err(TypeError::new(TypeErrorKind::BadShapeElement, span, "expected an object type").into()),
        }
    }

    fn resolve_object_ref(&mut self, name: &ast::QualName, span: Span) -> Result<ObjectId, Error> {
        let module = name.module.clone().unwrap_or_else(|| self.scopes.active_module().to_string());
        let resolved = if name.module.is_some() {
            self.catalog.resolve_qualified(&module, &name.name)
        } else {
            self.catalog.resolve_short(&module, &name.name)
        };
        match resolved {
            Some(EntityRef::Object(id)) => Ok(id),
            _ => Err(NameError { kind: NameErrorKind::Unresolved, span, message: format!("unknown object type `{}`", name.name) }.into()),
        }
    }
}

fn pointer_cardinality(ptr: &Pointer) -> Cardinality {
    match (ptr.required, ptr.cardinality) {
        (true, ast::Cardinality::One) => Cardinality::One,
        (false, ast::Cardinality::One) => Cardinality::AtMostOne,
        (true, ast::Cardinality::Many) => Cardinality::AtLeastOne,
        (false, ast::Cardinality::Many) => Cardinality::Many,
    }
}

fn binary_op_name(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Union => "union",
        BinaryOp::Or => "or",
        BinaryOp::And => "and",
        BinaryOp::Eq => "=",
        BinaryOp::NotEq => "!=",
        BinaryOp::QEq => "?=",
        BinaryOp::QNotEq => "?!=",
        BinaryOp::Lt => "<",
        BinaryOp::Gt => ">",
        BinaryOp::LtEq => "<=",
        BinaryOp::GtEq => ">=",
        BinaryOp::Like => "like",
        BinaryOp::NotLike => "not like",
        BinaryOp::Ilike => "ilike",
        BinaryOp::NotIlike => "not ilike",
        BinaryOp::In => "in",
        BinaryOp::NotIn => "not in",
        BinaryOp::Is => "is",
        BinaryOp::IsNot => "is not",
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Concat => "++",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::FloorDiv => "//",
        BinaryOp::Mod => "%",
        BinaryOp::Coalesce => "??",
        BinaryOp::Pow => "^",
    }
}

/// spec.md §4.5: "the call's output cardinality is the cartesian product
/// of its inputs, unless `preserves_optionality` is set"; `SetOfType`/
/// `SingletonType` return modifiers short-circuit straight to `Many`/`One`.
fn call_cardinality(return_modifier: ReturnModifier, params: &[ql_catalog::Param], arg_cardinalities: impl Iterator<Item = Cardinality>) -> Cardinality {
    match return_modifier {
        ReturnModifier::SetOfType => Cardinality::Many,
        ReturnModifier::SingletonType => Cardinality::One,
        ReturnModifier::OptionalType => {
            let mut cardinality = Cardinality::One;
            for (param, arg_card) in params.iter().zip(arg_cardinalities) {
                if param.modifier == ParamModifier::Required {
                    cardinality = cardinality.product(arg_card);
                }
            }
            cardinality
        }
    }
}

/// Is `expr` a path (root symbol, possibly followed by path steps,
/// backlinks, or type intersections)? Used to decide whether simple
/// scoping's "subject is a path" allowlist applies (spec.md §4.4).
fn is_path_expr(expr: &Expr) -> bool {
    match expr {
        Expr::Ident(_) => true,
        Expr::PathStep(p) => is_path_expr(&p.base),
        Expr::Backlink(b) => is_path_expr(&b.base),
        Expr::TypeIntersection(t) => is_path_expr(&t.base),
        Expr::Detached(d) => is_path_expr(&d.expr),
        _ => false,
    }
}

fn sdl_span(decl: &ast::SdlDeclaration) -> Span {
    match decl {
        ast::SdlDeclaration::ScalarType(s) => s.span,
        ast::SdlDeclaration::ObjectType(o) => o.span,
        ast::SdlDeclaration::Alias(a) => a.span,
        ast::SdlDeclaration::Global(g) => g.span,
        ast::SdlDeclaration::Function(f) => f.span,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diagnostics::{Error, TypeErrorKind};
    use indoc::indoc;
    use ql_catalog::CatalogBuilder;

    fn catalog(sdl: &str) -> Catalog {
        let script = ql_parser::parse_script(sdl).expect("sdl parses");
        let mut builder = CatalogBuilder::new();
        builder.add_script("default", &script);
        builder.build().expect("sdl builds")
    }

    fn build(cat: &Catalog, src: &str) -> Result<(Arena, NodeId), Error> {
        let expr = ql_parser::parse_expr(src).expect("expr parses");
        let mut b = IrBuilder::new(cat, BuildConfig { default_module: "default".into(), scoping_mode: ScopingMode::Legacy });
        let id = b.build_expr(&expr)?;
        Ok((b.arena, id))
    }

    fn type_error_kind(err: &Error) -> Option<TypeErrorKind> {
        match err {
            Error::Type(t) => Some(t.kind),
            _ => None,
        }
    }

    #[test]
    fn uuid_cast_to_object_type_succeeds() {
        let cat = catalog("type User { required name: str; }");
        let (arena, id) = build(&cat, "<User><uuid>'00000000-0000-0000-0000-000000000000'").unwrap();
        let node = arena.get(id);
        assert_eq!(node.ty.as_catalog(), Some(ql_catalog::TypeRef::Object(resolve_object(&cat, "User"))));
    }

    #[test]
    fn cast_with_no_cast_entity_is_rejected() {
        let cat = catalog("type User { required name: str; }");
        let err = build(&cat, "<User>1").unwrap_err();
        assert_eq!(type_error_kind(&err), Some(TypeErrorKind::CastFailed));
    }

    #[test]
    fn type_intersection_on_non_object_is_rejected() {
        let cat = catalog("type User { required name: str; }");
        let err = build(&cat, "(1)[is User]").unwrap_err();
        assert_eq!(type_error_kind(&err), Some(TypeErrorKind::IntersectionEmpty));
    }

    #[test]
    fn type_intersection_on_proper_subtype_weakens_cardinality_to_at_most_one() {
        let cat = catalog(indoc! {"
            abstract type Animal { required name: str; }
            type Dog extending Animal { }
        "});
        // A uuid-to-object cast is a singleton (`Cardinality::One`)
        // subject, so the intersection's weaken is visible: a proper
        // subtype can't be guaranteed to match, so the result is
        // `AtMostOne` rather than staying `One` (spec.md §4.5: "weakens to
        // `AT_MOST_ONE` times `expr.card` when `T` is proper subtype").
        let (arena, id) = build(&cat, "(<Animal><uuid>'00000000-0000-0000-0000-000000000000')[is Dog]").unwrap();
        assert_eq!(arena.get(id).cardinality, Cardinality::AtMostOne);
    }

    #[test]
    fn insert_missing_required_property_is_rejected() {
        let cat = catalog("type User { required name: str; }");
        let err = build(&cat, "insert User { }").unwrap_err();
        assert_eq!(type_error_kind(&err), Some(TypeErrorKind::RequiredNotProvided));
    }

    #[test]
    fn wrong_arity_call_to_a_known_function_has_no_overload() {
        // `count` takes exactly one positional argument; passing two
        // leaves no arity-compatible candidate (spec.md §4.5 `NoOverload`).
        let cat = catalog("type User { required name: str; }");
        let err = build(&cat, "count(1, 2)").unwrap_err();
        assert_eq!(type_error_kind(&err), Some(TypeErrorKind::NoOverload));
    }

    #[test]
    fn unknown_function_name_is_a_name_error() {
        let cat = catalog("type User { required name: str; }");
        let err = build(&cat, "not_a_real_function(1)").unwrap_err();
        assert!(matches!(err, Error::Name(_)));
    }

    #[test]
    fn path_step_off_a_many_base_stays_many_regardless_of_pointer_cardinality() {
        let cat = catalog("type User { required name: str; best_friend: User; }");
        let (arena, id) = build(&cat, "User.best_friend.name").unwrap();
        // `User` itself is `Many`; the product rule's `bounded` component
        // is an AND across the chain, so once any link in the chain is
        // unbounded (`User` is a whole-type set reference) every further
        // step stays `Many` too, even through `.best_friend`'s singleton,
        // optional pointer (spec.md §4.5 product rule).
        assert_eq!(arena.get(id).cardinality, Cardinality::Many);
    }

    #[test]
    fn path_step_off_a_singleton_through_an_optional_link_is_at_most_one() {
        let cat = catalog("type User { required name: str; best_friend: User; }");
        // A uuid-to-object cast is a singleton (`Cardinality::One`)
        // subject; stepping through `.best_friend` (not `required`)
        // weakens the chain to `AtMostOne` per the product rule
        // `AT_MOST_ONE · X = weaken(X)`.
        let (arena, id) = build(&cat, "(<User><uuid>'00000000-0000-0000-0000-000000000000').best_friend.name").unwrap();
        assert_eq!(arena.get(id).cardinality, Cardinality::AtMostOne);
    }

    fn resolve_object(cat: &Catalog, name: &str) -> ObjectId {
        match cat.resolve_qualified("default", name).expect("name resolves") {
            EntityRef::Object(id) => id,
            other => panic!("`{name}` is not an object type: {other:?}"),
        }
    }
}
