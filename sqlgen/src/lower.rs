//! The generator itself (spec.md §4.6): walks one IR arena, turns each
//! `IrNode` the root statement reaches into the internal SQL tree
//! (`ast.rs`), and never asks "is this well-typed" — only the earlier
//! phases may reject a query; this module's only failure mode is `ICE`
//! when it meets a combination it cannot lower.

use rustc_hash::FxHashMap;

use diagnostics::IceError;
use ql_catalog::{
    Catalog, CollectionShape, OperatorKind, ParamModifier, PointerKind, ReturnModifier, SqlLowering, TypeRef,
};
use ql_ir::{
    Arena, BindingKey, Cardinality, IndirectionKind, IrNode, IrType, LiteralValue, NodeId, NodeKind, SetRefEntity,
    UpdateAssignOp,
};
use ql_parser::ast::Cardinality as PtrMultiplicity;

use crate::ast::{
    FromClause, FromItem, Join, JoinKind, OrderItem as SqlOrderItem, SelectCore, SelectItem, SelectStmt, SetOp,
    SqlExpr, SqlLiteral,
};
use crate::ident::{self, AliasGen};
use crate::value::SqlValue;

/// A named, backend-bound input parameter (spec.md §6.1/§6.2): the
/// generator only allocates it a placeholder index; the actual value
/// arrives at execution time, not compile time.
#[derive(Debug, Clone)]
pub struct ParamInfo {
    pub name: String,
    pub index: usize,
    pub optional: bool,
}

pub struct GeneratedQuery {
    pub sql: String,
    /// Constants folded out of the IR's `Literal` nodes, keyed by their
    /// `$n` placeholder index (spec.md §6.2 grounds parameterizing query
    /// text rather than interpolating values, the way the teacher's own
    /// SQL builder always binds rather than inlines).
    pub literal_params: Vec<(usize, SqlValue)>,
    pub parameters: Vec<ParamInfo>,
    pub param_count: usize,
}

/// What a node lowers to, from the point of view of whatever referenced
/// it: either a single scalar SQL expression, or a row source that must
/// be joined or subqueried into the enclosing statement.
enum Lowered {
    Scalar(SqlExpr),
    Row(RowSource),
}

/// A set-valued node's SQL shape: the FROM item producing its rows, the
/// alias bound to it, and the expression (in terms of that alias) giving
/// the row's "current value" that a further path step or shape reads off.
struct RowSource {
    from: FromItem,
    alias: String,
    value: SqlExpr,
    /// How this row source must be attached to the parent query: `None`
    /// means it's already a bare FROM (only valid when it's the query's
    /// own subject); `Some` is a join kind plus optional ON condition
    /// supplied by the caller.
    join_kind: JoinKind,
}

pub struct Generator<'a> {
    catalog: &'a Catalog,
    arena: &'a Arena,
    aliases: AliasGen,
    next_param: usize,
    literal_params: Vec<(usize, SqlValue)>,
    parameters: Vec<ParamInfo>,
    param_by_name: FxHashMap<String, usize>,
    /// Per-lexical-scope materialized binding keys (spec.md §4.6: "each
    /// binding key materializes at most once in its lexical scope").
    factored: Vec<FxHashMap<BindingKey, String>>,
    locals: FxHashMap<u32, LocalSql>,
}

#[derive(Clone)]
struct LocalSql {
    alias: String,
    value: SqlExpr,
}

impl<'a> Generator<'a> {
    pub fn new(catalog: &'a Catalog, arena: &'a Arena) -> Self {
        Generator {
            catalog,
            arena,
            aliases: AliasGen::new(),
            next_param: 0,
            literal_params: Vec::new(),
            parameters: Vec::new(),
            param_by_name: FxHashMap::default(),
            factored: vec![FxHashMap::default()],
            locals: FxHashMap::default(),
        }
    }

    pub fn finish(self, stmt: SelectStmt) -> GeneratedQuery {
        let rendered = crate::render::render(&stmt);
        GeneratedQuery {
            sql: rendered.sql,
            literal_params: self.literal_params,
            parameters: self.parameters,
            param_count: self.next_param,
        }
    }

    fn node(&self, id: NodeId) -> &'a IrNode {
        self.arena.get(id)
    }

    fn push_scope(&mut self) {
        self.factored.push(FxHashMap::default());
    }

    fn pop_scope(&mut self) {
        self.factored.pop();
    }

    fn is_multi_pointer(cardinality: PtrMultiplicity) -> bool {
        matches!(cardinality, PtrMultiplicity::Many)
    }

    /// Allocates a fresh placeholder, recording `value` as the constant it
    /// is bound to.
    fn bind_literal(&mut self, value: SqlValue) -> SqlExpr {
        let idx = self.next_param;
        self.next_param += 1;
        self.literal_params.push((idx, value));
        SqlExpr::Param(idx)
    }

    fn bind_named_param(&mut self, name: &str, optional: bool) -> SqlExpr {
        if let Some(&idx) = self.param_by_name.get(name) {
            return SqlExpr::Param(idx);
        }
        let idx = self.next_param;
        self.next_param += 1;
        self.param_by_name.insert(name.to_string(), idx);
        self.parameters.push(ParamInfo { name: name.to_string(), index: idx, optional });
        SqlExpr::Param(idx)
    }

    /// Entry point: one top-level statement's root node to one `SelectStmt`.
    pub fn lower_root(&mut self, root: NodeId) -> Result<SelectStmt, IceError> {
        let core = self.lower_top(root)?;
        Ok(SelectStmt::single(core))
    }

    /// Lowers a node known to sit at the top of a statement (so its result
    /// becomes the query's own projection, not a nested value).
    fn lower_top(&mut self, id: NodeId) -> Result<SelectCore, IceError> {
        match &self.node(id).kind {
            NodeKind::SelectStmt { subject, filter, order_by, offset, limit } => {
                self.lower_select(*subject, *filter, order_by.clone(), *offset, *limit)
            }
            NodeKind::InsertStmt { target, fields, unless_conflict } => {
                self.lower_insert(*target, fields.clone(), unless_conflict.clone())
            }
            NodeKind::UpdateStmt { subject, filter, fields } => self.lower_update(*subject, *filter, fields.clone()),
            NodeKind::DeleteStmt { subject, filter, order_by, offset, limit } => {
                self.lower_delete(*subject, *filter, order_by.clone(), *offset, *limit)
            }
            _ => {
                let lowered = self.lower(id)?;
                let expr = self.as_projected_value(id, lowered)?;
                Ok(SelectCore { projection: vec![SelectItem { expr, alias: Some("result".into()) }], ..Default::default() })
            }
        }
    }

    /// Turns any lowered node into the single expression a bare top-level
    /// `select <expr>` with no shape projects.
    fn as_projected_value(&mut self, id: NodeId, lowered: Lowered) -> Result<SqlExpr, IceError> {
        match lowered {
            Lowered::Scalar(e) => Ok(e),
            Lowered::Row(row) => {
                let node = self.node(id);
                let core = SelectCore {
                    projection: vec![SelectItem { expr: row.value.clone(), alias: None }],
                    from: Some(FromClause { item: row.from, alias: row.alias }),
                    ..Default::default()
                };
                let sub = Box::new(SelectStmt::single(core));
                if node.cardinality.is_bounded() {
                    Ok(SqlExpr::ScalarSubquery(sub))
                } else {
                    Ok(SqlExpr::ArraySubquery(sub))
                }
            }
        }
    }

    fn lower(&mut self, id: NodeId) -> Result<Lowered, IceError> {
        let node = self.node(id);
        match &node.kind {
            NodeKind::Literal(value) => Ok(Lowered::Scalar(self.lower_literal(value))),
            NodeKind::Param { name, optional } => Ok(Lowered::Scalar(self.bind_named_param(name, *optional))),
            NodeKind::SetRef { entity } => self.lower_set_ref(id, *entity),
            NodeKind::PathStep { source, pointer } => self.lower_path_step(*source, *pointer),
            NodeKind::Backlink { source, candidates, intersect } => {
                self.lower_backlink(*source, candidates.clone(), *intersect)
            }
            NodeKind::FuncCall { overload, args, named_args } => {
                self.lower_func_call(*overload, args.clone(), named_args.clone())
            }
            NodeKind::OpCall { overload, args } => self.lower_op_call(*overload, args.clone()),
            NodeKind::Cast { cast, target, expr } => self.lower_cast(*cast, *target, *expr),
            NodeKind::UuidObjectCast { target, uuid_expr } => self.lower_uuid_object_cast(*target, *uuid_expr),
            NodeKind::TypeIntersection { expr, ty } => self.lower_type_intersection(*expr, *ty),
            NodeKind::Shape { subject, elements } => self.lower_shape(*subject, elements.clone()),
            NodeKind::SelectStmt { subject, filter, order_by, offset, limit } => {
                let core = self.lower_select(*subject, *filter, order_by.clone(), *offset, *limit)?;
                Ok(Lowered::Row(self.core_as_row(core, self.node(id).cardinality)))
            }
            NodeKind::WithBinding { value, body } => self.lower_with_binding(*value, *body),
            NodeKind::IfElse { condition, then_branch, else_branch } => {
                self.lower_if_else(*condition, *then_branch, *else_branch)
            }
            NodeKind::Coalesce { lhs, rhs } => self.lower_coalesce(*lhs, *rhs),
            NodeKind::TupleCtor { elements } => self.lower_tuple(elements.clone()),
            NodeKind::ArrayCtor { elements } => self.lower_array(elements.clone()),
            NodeKind::SetCtor { elements } => self.lower_set_ctor(elements.clone()),
            NodeKind::RangeCtor { lower, upper, inc_lower, inc_upper } => {
                self.lower_range(*lower, *upper, *inc_lower, *inc_upper)
            }
            NodeKind::FreeObject { fields } => self.lower_free_object(fields.clone()),
            NodeKind::Indirection { base, index } => self.lower_indirection(*base, index.clone()),
            NodeKind::Detached { expr } => self.lower(*expr),
            NodeKind::For { iterator, is_union, body } => self.lower_for(*iterator, *is_union, *body),
            NodeKind::Group { subject, using, by } => self.lower_group(*subject, using.clone(), by.clone()),
            NodeKind::InsertStmt { .. } | NodeKind::UpdateStmt { .. } | NodeKind::DeleteStmt { .. } => {
                let core = self.lower_top(id)?;
                Ok(Lowered::Row(self.core_as_row(core, self.node(id).cardinality)))
            }
        }
    }

    fn core_as_row(&mut self, core: SelectCore, cardinality: Cardinality) -> RowSource {
        let alias = self.aliases.fresh("s");
        let _ = cardinality;
        let value = core
            .projection
            .first()
            .map(|item| item.expr.clone())
            .unwrap_or(SqlExpr::Literal(SqlLiteral::Null));
        RowSource {
            from: FromItem::Derived(Box::new(SelectStmt::single(core))),
            alias,
            value,
            join_kind: JoinKind::LeftLateral,
        }
    }

    fn lower_literal(&mut self, value: &LiteralValue) -> SqlExpr {
        match value {
            LiteralValue::Int64(v) => self.bind_literal(SqlValue::Int64(*v)),
            LiteralValue::Float64(v) => self.bind_literal(SqlValue::Float64(*v)),
            LiteralValue::Bool(v) => SqlExpr::Literal(SqlLiteral::Bool(*v)),
            LiteralValue::Str(v) => self.bind_literal(SqlValue::Text(v.clone())),
            LiteralValue::Bytes(v) => self.bind_literal(SqlValue::Bytes(v.clone())),
            LiteralValue::BigInt(v) | LiteralValue::Decimal(v) => {
                self.bind_literal(SqlValue::Numeric(v.parse().unwrap_or_default()))
            }
        }
    }

    fn lower_set_ref(&mut self, id: NodeId, entity: SetRefEntity) -> Result<Lowered, IceError> {
        match entity {
            SetRefEntity::Object(obj_id) => {
                let table = ident::object_view_name(self.catalog, obj_id);
                let alias = self.aliases.fresh("t");
                let value = SqlExpr::column(alias.clone(), "id");
                if let Some(key) = self.node(id).binding_key {
                    if let Some(existing) = self.factored.last().and_then(|m| m.get(&key)).cloned() {
                        return Ok(Lowered::Row(RowSource {
                            from: FromItem::Table(existing.clone()),
                            alias: existing,
                            value: SqlExpr::column(existing.clone(), "id"),
                            join_kind: JoinKind::Inner,
                        }));
                    }
                    self.factored.last_mut().unwrap().insert(key, alias.clone());
                }
                Ok(Lowered::Row(RowSource { from: FromItem::Table(table), alias, value, join_kind: JoinKind::Inner }))
            }
            SetRefEntity::Local(local_id) => {
                let local = self.locals.get(&local_id.0).cloned().ok_or_else(|| {
                    IceError::new(format!("local binding {} referenced before it was bound", local_id.0))
                })?;
                Ok(Lowered::Scalar(local.value))
            }
            SetRefEntity::Alias(_) | SetRefEntity::Global(_) => Err(IceError::new(
                "alias/global set references must be expanded into the IR before SQL generation",
            )),
        }
    }

    fn lower_path_step(&mut self, source: NodeId, pointer: ql_catalog::PointerId) -> Result<Lowered, IceError> {
        let ptr = self.catalog.pointer(pointer).clone();
        let parent = self.lower(source)?;
        let parent_row = self.expect_row(source, parent)?;

        match ptr.kind {
            PointerKind::Property if !Self::is_multi_pointer(ptr.cardinality) => {
                Ok(Lowered::Scalar(SqlExpr::column(parent_row.alias, ident::pointer_column_name(self.catalog, pointer))))
            }
            PointerKind::Property => {
                let link_table = ident::link_table_name(self.catalog, pointer);
                let lt_alias = self.aliases.fresh("lp");
                let value = SqlExpr::column(lt_alias.clone(), "value");
                let row = RowSource {
                    from: FromItem::Table(link_table),
                    alias: lt_alias.clone(),
                    value,
                    join_kind: JoinKind::LeftLateral,
                };
                self.attach_join(&parent_row.alias, row)
            }
            PointerKind::Link if !Self::is_multi_pointer(ptr.cardinality) => {
                let target = ptr
                    .link_target()
                    .ok_or_else(|| IceError::new("single link pointer with no resolved target object"))?;
                let target_table = ident::object_view_name(self.catalog, target);
                let alias = self.aliases.fresh("t");
                let on = SqlExpr::BinaryOp {
                    op: "=".into(),
                    left: SqlExpr::column(alias.clone(), "id").boxed(),
                    right: SqlExpr::column(parent_row.alias, ident::pointer_column_name(self.catalog, pointer)).boxed(),
                };
                let row = RowSource {
                    from: FromItem::Table(target_table),
                    alias: alias.clone(),
                    value: SqlExpr::column(alias, "id"),
                    join_kind: JoinKind::Left,
                };
                self.attach_join_with_on(row, Some(on))
            }
            PointerKind::Link => {
                let target = ptr
                    .link_target()
                    .ok_or_else(|| IceError::new("multi link pointer with no resolved target object"))?;
                let link_table = ident::link_table_name(self.catalog, pointer);
                let target_table = ident::object_view_name(self.catalog, target);
                let lt_alias = self.aliases.fresh("lk");
                let t_alias = self.aliases.fresh("t");
                let inner_core = SelectCore {
                    projection: vec![SelectItem { expr: SqlExpr::column(t_alias.clone(), "*"), alias: None }],
                    from: Some(FromClause { item: FromItem::Table(link_table), alias: lt_alias.clone() }),
                    joins: vec![Join {
                        kind: JoinKind::Inner,
                        item: FromItem::Table(target_table),
                        alias: t_alias.clone(),
                        on: Some(SqlExpr::BinaryOp {
                            op: "=".into(),
                            left: SqlExpr::column(t_alias.clone(), "id").boxed(),
                            right: SqlExpr::column(lt_alias.clone(), "target_id").boxed(),
                        }),
                    }],
                    where_clause: Some(SqlExpr::BinaryOp {
                        op: "=".into(),
                        left: SqlExpr::column(lt_alias, "source_id").boxed(),
                        right: SqlExpr::column(parent_row.alias, "id").boxed(),
                    }),
                    ..Default::default()
                };
                let row_alias = self.aliases.fresh("m");
                let row = RowSource {
                    from: FromItem::Derived(Box::new(SelectStmt::single(inner_core))),
                    alias: row_alias.clone(),
                    value: SqlExpr::column(row_alias, "id"),
                    join_kind: JoinKind::LeftLateral,
                };
                Ok(Lowered::Row(row))
            }
        }
    }

    fn attach_join(&mut self, parent_alias: &str, row: RowSource) -> Result<Lowered, IceError> {
        let _ = parent_alias;
        Ok(Lowered::Row(row))
    }

    fn attach_join_with_on(&mut self, row: RowSource, _on: Option<SqlExpr>) -> Result<Lowered, IceError> {
        Ok(Lowered::Row(row))
    }

    /// Backlinks (spec.md §4.5/§4.6) union every concrete pointer
    /// definition targeting a supertype of the intersected type.
    fn lower_backlink(
        &mut self,
        source: NodeId,
        candidates: Vec<ql_catalog::PointerId>,
        intersect: Option<ql_catalog::ObjectId>,
    ) -> Result<Lowered, IceError> {
        let parent = self.lower(source)?;
        let parent_row = self.expect_row(source, parent)?;
        if candidates.is_empty() {
            return Err(IceError::new("backlink with no candidate pointer definitions"));
        }
        let mut branches = Vec::new();
        for ptr_id in candidates {
            let ptr = self.catalog.pointer(ptr_id).clone();
            let owner_table = ident::object_view_name(self.catalog, ptr.owner);
            if let Some(target) = intersect {
                let owner_obj = self.catalog.object(ptr.owner);
                if !owner_obj.is_subtype_of(target) && owner_obj.id != target {
                    continue;
                }
            }
            let alias = self.aliases.fresh("bl");
            let core = SelectCore {
                projection: vec![SelectItem { expr: SqlExpr::column(alias.clone(), "id"), alias: None }],
                from: Some(FromClause { item: FromItem::Table(owner_table), alias: alias.clone() }),
                where_clause: Some(SqlExpr::BinaryOp {
                    op: "=".into(),
                    left: SqlExpr::column(alias, ident::pointer_column_name(self.catalog, ptr_id)).boxed(),
                    right: SqlExpr::column(parent_row.alias.clone(), "id").boxed(),
                }),
                ..Default::default()
            };
            branches.push(SelectStmt::single(core));
        }
        let mut body = None;
        for stmt in branches {
            let this_body = stmt.body.expect("single() always sets a body");
            body = Some(match body {
                None => this_body,
                Some(acc) => crate::ast::SelectBody::SetOp {
                    op: SetOp::UnionAll,
                    left: Box::new(acc),
                    right: Box::new(this_body),
                },
            });
        }
        let stmt = SelectStmt { ctes: Vec::new(), body };
        let alias = self.aliases.fresh("bl_all");
        Ok(Lowered::Row(RowSource {
            from: FromItem::Derived(Box::new(stmt)),
            alias: alias.clone(),
            value: SqlExpr::column(alias, "id"),
            join_kind: JoinKind::LeftLateral,
        }))
    }

    fn lower_func_call(
        &mut self,
        overload: ql_catalog::FunctionId,
        args: Vec<NodeId>,
        named_args: Vec<(String, NodeId)>,
    ) -> Result<Lowered, IceError> {
        let func = self.catalog.function(overload).clone();
        let mut rendered_args = Vec::new();
        for (i, arg_id) in args.iter().enumerate() {
            let modifier = func.params.get(i).map(|p| p.modifier.clone()).unwrap_or(ParamModifier::Required);
            rendered_args.push(self.lower_call_arg(*arg_id, modifier)?);
        }
        for (name, arg_id) in &named_args {
            let modifier = func
                .params
                .iter()
                .find(|p| &p.name == name)
                .map(|p| p.modifier.clone())
                .unwrap_or(ParamModifier::Required);
            rendered_args.push(self.lower_call_arg(*arg_id, modifier)?);
        }
        let expr = match &func.lowering {
            SqlLowering::FunctionName(name) => {
                SqlExpr::FunctionCall { name: name.clone(), args: rendered_args, distinct: false }
            }
            SqlLowering::Operator(op) => rendered_args
                .into_iter()
                .reduce(|l, r| SqlExpr::BinaryOp { op: op.clone(), left: l.boxed(), right: r.boxed() })
                .ok_or_else(|| IceError::new("operator-lowered function called with zero arguments"))?,
            SqlLowering::Template(template) => self.apply_template(template, &rendered_args)?,
        };
        if func.return_modifier == ReturnModifier::SetOfType {
            return Ok(Lowered::Scalar(expr));
        }
        Ok(Lowered::Scalar(expr))
    }

    fn lower_call_arg(&mut self, arg_id: NodeId, modifier: ParamModifier) -> Result<SqlExpr, IceError> {
        let lowered = self.lower(arg_id)?;
        match (modifier, lowered) {
            (ParamModifier::SetOf, Lowered::Row(row)) => {
                let core = SelectCore {
                    projection: vec![SelectItem { expr: row.value, alias: None }],
                    from: Some(FromClause { item: row.from, alias: row.alias }),
                    ..Default::default()
                };
                Ok(SqlExpr::ScalarSubquery(Box::new(SelectStmt::single(core))))
            }
            (_, Lowered::Scalar(e)) => Ok(e),
            (_, Lowered::Row(row)) => {
                let core = SelectCore {
                    projection: vec![SelectItem { expr: row.value, alias: None }],
                    from: Some(FromClause { item: row.from, alias: row.alias }),
                    limit: Some(SqlExpr::Literal(SqlLiteral::Int(1))),
                    ..Default::default()
                };
                Ok(SqlExpr::ScalarSubquery(Box::new(SelectStmt::single(core))))
            }
        }
    }

    fn apply_template(&self, template: &str, args: &[SqlExpr]) -> Result<SqlExpr, IceError> {
        let mut rendered = String::new();
        let mut chars = template.char_indices().peekable();
        let bytes = template.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'{' {
                if let Some(end) = template[i..].find('}') {
                    let idx_str = &template[i + 1..i + end];
                    if let Ok(idx) = idx_str.parse::<usize>() {
                        let mut buf = String::new();
                        let arg = args.get(idx).ok_or_else(|| IceError::new("template argument index out of range"))?;
                        crate::render::render_expr_fragment(arg, &mut buf);
                        rendered.push_str(&buf);
                        i += end + 1;
                        continue;
                    }
                }
            }
            rendered.push(bytes[i] as char);
            i += 1;
        }
        let _ = &mut chars;
        Ok(SqlExpr::Raw(rendered))
    }

    fn lower_op_call(&mut self, overload: ql_catalog::OperatorId, args: Vec<NodeId>) -> Result<Lowered, IceError> {
        let op = self.catalog.operator(overload).clone();
        let mut rendered = Vec::new();
        for (i, arg_id) in args.iter().enumerate() {
            let modifier = op.params.get(i).map(|p| p.modifier.clone()).unwrap_or(ParamModifier::Required);
            rendered.push(self.lower_call_arg(*arg_id, modifier)?);
        }
        let expr = match (&op.lowering, op.kind, rendered.as_slice()) {
            (SqlLowering::Operator(sym), OperatorKind::Infix, [l, r]) => {
                SqlExpr::BinaryOp { op: sym.clone(), left: l.clone().boxed(), right: r.clone().boxed() }
            }
            (SqlLowering::Operator(sym), OperatorKind::Prefix, [e]) => {
                SqlExpr::UnaryOp { op: sym.clone(), expr: e.clone().boxed() }
            }
            (SqlLowering::Operator(sym), OperatorKind::Postfix, [e]) => {
                SqlExpr::UnaryOp { op: format!("/* postfix */ {sym}"), expr: e.clone().boxed() }
            }
            (SqlLowering::FunctionName(name), _, _) => {
                SqlExpr::FunctionCall { name: name.clone(), args: rendered, distinct: false }
            }
            (SqlLowering::Template(template), _, _) => self.apply_template(template, &rendered)?,
            _ => return Err(IceError::new(format!("operator {} has no lowering matching its arity", op.qualified_name()))),
        };
        Ok(Lowered::Scalar(expr))
    }

    fn lower_cast(&mut self, cast: ql_catalog::CastId, target: TypeRef, expr: NodeId) -> Result<Lowered, IceError> {
        let cast_entity = self.catalog.cast(cast).clone();
        let lowered = self.lower(expr)?;
        let inner = match lowered {
            Lowered::Scalar(e) => e,
            Lowered::Row(row) => self.as_projected_value(expr, Lowered::Row(row))?,
        };
        let sql_type = ident::sql_type_for(self.catalog, target);
        let out = match &cast_entity.lowering {
            SqlLowering::Template(template) => self.apply_template(template, &[inner])?,
            _ => SqlExpr::Cast { expr: inner.boxed(), sql_type },
        };
        Ok(Lowered::Scalar(out))
    }

    fn lower_uuid_object_cast(&mut self, target: ql_catalog::ObjectId, uuid_expr: NodeId) -> Result<Lowered, IceError> {
        let lowered = self.lower(uuid_expr)?;
        let uuid_sql = match lowered {
            Lowered::Scalar(e) => e,
            Lowered::Row(row) => self.as_projected_value(uuid_expr, Lowered::Row(row))?,
        };
        let table = ident::object_view_name(self.catalog, target);
        let alias = self.aliases.fresh("u");
        let core = SelectCore {
            projection: vec![SelectItem { expr: SqlExpr::column(alias.clone(), "id"), alias: None }],
            from: Some(FromClause { item: FromItem::Table(table), alias: alias.clone() }),
            where_clause: Some(SqlExpr::BinaryOp {
                op: "=".into(),
                left: SqlExpr::column(alias.clone(), "id").boxed(),
                right: uuid_sql.boxed(),
            }),
            limit: Some(SqlExpr::Literal(SqlLiteral::Int(1))),
            ..Default::default()
        };
        Ok(Lowered::Row(RowSource {
            from: FromItem::Derived(Box::new(SelectStmt::single(core))),
            alias: alias.clone(),
            value: SqlExpr::column(alias, "id"),
            join_kind: JoinKind::LeftLateral,
        }))
    }

    fn lower_type_intersection(&mut self, expr: NodeId, ty: ql_catalog::ObjectId) -> Result<Lowered, IceError> {
        let lowered = self.lower(expr)?;
        let mut row = self.expect_row(expr, lowered)?;
        let exists_check = SqlExpr::Exists(Box::new({
            let check_alias = self.aliases.fresh("ti");
            let table = ident::object_view_name(self.catalog, ty);
            SelectStmt::single(SelectCore {
                projection: vec![SelectItem { expr: SqlExpr::Literal(SqlLiteral::Int(1)), alias: None }],
                from: Some(FromClause { item: FromItem::Table(table), alias: check_alias.clone() }),
                where_clause: Some(SqlExpr::BinaryOp {
                    op: "=".into(),
                    left: SqlExpr::column(check_alias, "id").boxed(),
                    right: row.value.clone().boxed(),
                }),
                ..Default::default()
            })
        }));
        row.value = SqlExpr::Case {
            branches: vec![(exists_check, row.value.clone())],
            else_branch: Some(SqlExpr::Literal(SqlLiteral::Null).boxed()),
        };
        Ok(Lowered::Row(row))
    }

    fn lower_shape(&mut self, subject: NodeId, elements: Vec<ql_ir::ShapeAttr>) -> Result<Lowered, IceError> {
        let lowered = self.lower(subject)?;
        let subject_row = self.expect_row(subject, lowered)?;
        self.push_scope();
        let mut fields = Vec::new();
        for attr in &elements {
            let el_lowered = self.lower(attr.value)?;
            let el_expr = match el_lowered {
                Lowered::Scalar(e) => e,
                Lowered::Row(row) => {
                    let core = SelectCore {
                        projection: vec![SelectItem { expr: row.value, alias: None }],
                        from: Some(FromClause { item: row.from, alias: row.alias }),
                        ..Default::default()
                    };
                    if attr.cardinality.is_bounded() {
                        SqlExpr::ScalarSubquery(Box::new(SelectStmt::single(core)))
                    } else {
                        SqlExpr::ArraySubquery(Box::new(SelectStmt::single(core)))
                    }
                }
            };
            fields.push((attr.name.clone(), el_expr));
        }
        self.pop_scope();
        let json = SqlExpr::JsonBuildObject(fields);
        let mut result_row = subject_row;
        result_row.value = json;
        Ok(Lowered::Row(result_row))
    }

    fn lower_select(
        &mut self,
        subject: NodeId,
        filter: Option<NodeId>,
        order_by: Vec<ql_ir::OrderItem>,
        offset: Option<NodeId>,
        limit: Option<NodeId>,
    ) -> Result<SelectCore, IceError> {
        self.push_scope();
        let lowered = self.lower(subject)?;
        let row = self.expect_row(subject, lowered)?;
        let mut core = SelectCore {
            projection: vec![SelectItem { expr: row.value.clone(), alias: Some("result".into()) }],
            from: Some(FromClause { item: row.from, alias: row.alias.clone() }),
            ..Default::default()
        };
        if let Some(filter_id) = filter {
            let f = self.lower(filter_id)?;
            core.where_clause = Some(match f {
                Lowered::Scalar(e) => e,
                Lowered::Row(r) => r.value,
            });
        }
        for item in &order_by {
            let e = self.lower(item.expr)?;
            let expr = match e {
                Lowered::Scalar(e) => e,
                Lowered::Row(r) => r.value,
            };
            core.order_by.push(SqlOrderItem { expr, descending: item.descending });
        }
        self.pop_scope();
        if let Some(offset_id) = offset {
            let e = self.lower(offset_id)?;
            core.offset = Some(match e {
                Lowered::Scalar(e) => e,
                Lowered::Row(r) => r.value,
            });
        }
        if let Some(limit_id) = limit {
            let e = self.lower(limit_id)?;
            core.limit = Some(match e {
                Lowered::Scalar(e) => e,
                Lowered::Row(r) => r.value,
            });
        }
        Ok(core)
    }

    fn lower_insert(
        &mut self,
        target: ql_catalog::ObjectId,
        fields: Vec<ql_ir::InsertField>,
        unless_conflict: Option<ql_ir::UnlessConflict>,
    ) -> Result<SelectCore, IceError> {
        let table = ident::object_view_name(self.catalog, target);
        let mut columns = Vec::new();
        let mut values = Vec::new();
        for field in &fields {
            let v = self.lower(field.value)?;
            let expr = match v {
                Lowered::Scalar(e) => e,
                Lowered::Row(r) => self.as_projected_value(field.value, Lowered::Row(r))?,
            };
            columns.push(ident::pointer_column_name(self.catalog, field.pointer));
            values.push(expr);
        }
        let conflict_clause = unless_conflict
            .map(|_| "ON CONFLICT DO NOTHING".to_string())
            .unwrap_or_default();
        let insert_list = columns.join(", ");
        let mut rendered_values = String::new();
        {
            let mut dummy_params = Vec::new();
            for (i, v) in values.iter().enumerate() {
                if i > 0 {
                    rendered_values.push_str(", ");
                }
                crate::render::render_expr_collecting(v, &mut rendered_values, &mut dummy_params);
            }
        }
        let raw = format!("INSERT INTO {table} ({insert_list}) VALUES ({rendered_values}) {conflict_clause} RETURNING id");
        Ok(SelectCore {
            projection: vec![SelectItem { expr: SqlExpr::Raw(raw), alias: None }],
            ..Default::default()
        })
    }

    fn lower_update(
        &mut self,
        subject: NodeId,
        filter: Option<NodeId>,
        fields: Vec<ql_ir::UpdateField>,
    ) -> Result<SelectCore, IceError> {
        let lowered = self.lower(subject)?;
        let row = self.expect_row(subject, lowered)?;
        let obj_id = self.object_behind(subject)?;
        let table = ident::object_view_name(self.catalog, obj_id);
        let mut assignments = Vec::new();
        for field in &fields {
            let v = self.lower(field.value)?;
            let expr = match v {
                Lowered::Scalar(e) => e,
                Lowered::Row(r) => self.as_projected_value(field.value, Lowered::Row(r))?,
            };
            let column = ident::pointer_column_name(self.catalog, field.pointer);
            let rendered = match field.op {
                UpdateAssignOp::Assign => expr,
                UpdateAssignOp::Add => SqlExpr::FunctionCall {
                    name: "array_append".into(),
                    args: vec![SqlExpr::column(row.alias.clone(), column.clone()), expr],
                    distinct: false,
                },
                UpdateAssignOp::Sub => SqlExpr::FunctionCall {
                    name: "array_remove".into(),
                    args: vec![SqlExpr::column(row.alias.clone(), column.clone()), expr],
                    distinct: false,
                },
            };
            assignments.push((column, rendered));
        }
        let mut set_clause = String::new();
        let mut dummy_params = Vec::new();
        for (i, (col, expr)) in assignments.iter().enumerate() {
            if i > 0 {
                set_clause.push_str(", ");
            }
            set_clause.push_str(col);
            set_clause.push_str(" = ");
            crate::render::render_expr_collecting(expr, &mut set_clause, &mut dummy_params);
        }
        let mut where_sql = format!("id IN (SELECT {}.id FROM {} AS {}", row.alias, table, row.alias);
        if let Some(filter_id) = filter {
            let f = self.lower(filter_id)?;
            let expr = match f {
                Lowered::Scalar(e) => e,
                Lowered::Row(r) => r.value,
            };
            where_sql.push_str(" WHERE ");
            crate::render::render_expr_collecting(&expr, &mut where_sql, &mut dummy_params);
        }
        where_sql.push(')');
        let raw = format!("UPDATE {table} SET {set_clause} WHERE {where_sql} RETURNING id");
        Ok(SelectCore {
            projection: vec![SelectItem { expr: SqlExpr::Raw(raw), alias: None }],
            ..Default::default()
        })
    }

    fn lower_delete(
        &mut self,
        subject: NodeId,
        filter: Option<NodeId>,
        _order_by: Vec<ql_ir::OrderItem>,
        _offset: Option<NodeId>,
        _limit: Option<NodeId>,
    ) -> Result<SelectCore, IceError> {
        let obj_id = self.object_behind(subject)?;
        let table = ident::object_view_name(self.catalog, obj_id);
        let alias = self.aliases.fresh("d");
        let mut where_sql = format!("id IN (SELECT {alias}.id FROM {table} AS {alias}");
        let mut dummy_params = Vec::new();
        if let Some(filter_id) = filter {
            let f = self.lower(filter_id)?;
            let expr = match f {
                Lowered::Scalar(e) => e,
                Lowered::Row(r) => r.value,
            };
            where_sql.push_str(" WHERE ");
            crate::render::render_expr_collecting(&expr, &mut where_sql, &mut dummy_params);
        }
        where_sql.push(')');
        let raw = format!("DELETE FROM {table} WHERE {where_sql} RETURNING id");
        Ok(SelectCore {
            projection: vec![SelectItem { expr: SqlExpr::Raw(raw), alias: None }],
            ..Default::default()
        })
    }

    fn object_behind(&self, mut id: NodeId) -> Result<ql_catalog::ObjectId, IceError> {
        loop {
            let node = self.node(id);
            match node.ty.as_catalog().and_then(|t| t.as_object()) {
                Some(obj) => return Ok(obj),
                None => match &node.kind {
                    NodeKind::TypeIntersection { expr, .. }
                    | NodeKind::Detached { expr }
                    | NodeKind::Cast { expr, .. } => id = *expr,
                    _ => return Err(IceError::new("expected an object-typed subject")),
                },
            }
        }
    }

    fn lower_with_binding(&mut self, value: NodeId, body: NodeId) -> Result<Lowered, IceError> {
        let lowered = self.lower(value)?;
        let sql_value = match lowered {
            Lowered::Scalar(e) => e,
            Lowered::Row(r) => self.as_projected_value(value, Lowered::Row(r))?,
        };
        let local_key = value.0;
        self.locals.insert(local_key, LocalSql { alias: String::new(), value: sql_value });
        self.lower(body)
    }

    fn lower_if_else(&mut self, condition: NodeId, then_branch: NodeId, else_branch: NodeId) -> Result<Lowered, IceError> {
        let cond = self.scalar_of(condition)?;
        let then_e = self.scalar_of(then_branch)?;
        let else_e = self.scalar_of(else_branch)?;
        Ok(Lowered::Scalar(SqlExpr::Case { branches: vec![(cond, then_e)], else_branch: Some(else_e.boxed()) }))
    }

    fn lower_coalesce(&mut self, lhs: NodeId, rhs: NodeId) -> Result<Lowered, IceError> {
        let l = self.scalar_of(lhs)?;
        let r = self.scalar_of(rhs)?;
        Ok(Lowered::Scalar(SqlExpr::Coalesce(vec![l, r])))
    }

    fn lower_tuple(&mut self, elements: Vec<(Option<String>, NodeId)>) -> Result<Lowered, IceError> {
        let mut exprs = Vec::new();
        for (_, id) in elements {
            exprs.push(self.scalar_of(id)?);
        }
        Ok(Lowered::Scalar(SqlExpr::Tuple(exprs)))
    }

    fn lower_array(&mut self, elements: Vec<NodeId>) -> Result<Lowered, IceError> {
        let mut exprs = Vec::new();
        for id in elements {
            exprs.push(self.scalar_of(id)?);
        }
        Ok(Lowered::Scalar(SqlExpr::ArrayLiteral(exprs)))
    }

    fn lower_set_ctor(&mut self, elements: Vec<NodeId>) -> Result<Lowered, IceError> {
        let mut branches = Vec::new();
        for id in elements {
            let e = self.scalar_of(id)?;
            branches.push(SelectStmt::single(SelectCore {
                projection: vec![SelectItem { expr: e, alias: None }],
                ..Default::default()
            }));
        }
        let mut body = None;
        for b in branches {
            let this_body = b.body.expect("single() always sets a body");
            body = Some(match body {
                None => this_body,
                Some(acc) => crate::ast::SelectBody::SetOp {
                    op: SetOp::UnionAll,
                    left: Box::new(acc),
                    right: Box::new(this_body),
                },
            });
        }
        let stmt = SelectStmt { ctes: Vec::new(), body };
        let alias = self.aliases.fresh("set");
        Ok(Lowered::Row(RowSource {
            from: FromItem::Derived(Box::new(stmt)),
            alias: alias.clone(),
            value: SqlExpr::column(alias, "result"),
            join_kind: JoinKind::LeftLateral,
        }))
    }

    fn lower_range(
        &mut self,
        lower: Option<NodeId>,
        upper: Option<NodeId>,
        inc_lower: bool,
        inc_upper: bool,
    ) -> Result<Lowered, IceError> {
        let lower_e = match lower {
            Some(id) => self.scalar_of(id)?,
            None => SqlExpr::Literal(SqlLiteral::Null),
        };
        let upper_e = match upper {
            Some(id) => self.scalar_of(id)?,
            None => SqlExpr::Literal(SqlLiteral::Null),
        };
        let bounds = format!("{}{}", if inc_lower { "[" } else { "(" }, if inc_upper { "]" } else { ")" });
        Ok(Lowered::Scalar(SqlExpr::FunctionCall {
            name: "numrange".into(),
            args: vec![lower_e, upper_e, SqlExpr::Raw(format!("'{bounds}'"))],
            distinct: false,
        }))
    }

    fn lower_free_object(&mut self, fields: Vec<(String, NodeId)>) -> Result<Lowered, IceError> {
        let mut rendered = Vec::new();
        for (name, id) in fields {
            let e = self.scalar_of(id)?;
            rendered.push((name, e));
        }
        Ok(Lowered::Scalar(SqlExpr::JsonBuildObject(rendered)))
    }

    fn lower_indirection(&mut self, base: NodeId, index: IndirectionKind) -> Result<Lowered, IceError> {
        let base_e = self.scalar_of(base)?;
        match index {
            IndirectionKind::Index(idx) => {
                let idx_e = self.scalar_of(idx)?;
                Ok(Lowered::Scalar(SqlExpr::FunctionCall {
                    name: "ql_array_index".into(),
                    args: vec![base_e, idx_e],
                    distinct: false,
                }))
            }
            IndirectionKind::Slice(from, to) => {
                let from_e = match from {
                    Some(id) => self.scalar_of(id)?,
                    None => SqlExpr::Literal(SqlLiteral::Null),
                };
                let to_e = match to {
                    Some(id) => self.scalar_of(id)?,
                    None => SqlExpr::Literal(SqlLiteral::Null),
                };
                Ok(Lowered::Scalar(SqlExpr::FunctionCall {
                    name: "ql_array_slice".into(),
                    args: vec![base_e, from_e, to_e],
                    distinct: false,
                }))
            }
        }
    }

    /// `for x in S union B` (spec.md §4.5) lowers to a derived table over
    /// `S`'s rows, with `B` evaluated per row and unioned (or, when not
    /// `is_union`, simply projected row-for-row — the only form the
    /// current parser produces, per spec.md §4.2's note on the
    /// union-less form being a "future-feature mode").
    fn lower_for(&mut self, iterator: NodeId, is_union: bool, body: NodeId) -> Result<Lowered, IceError> {
        let _ = is_union;
        let lowered = self.lower(iterator)?;
        let iter_row = self.expect_row(iterator, lowered)?;
        self.locals.insert(body.0, LocalSql { alias: iter_row.alias.clone(), value: iter_row.value.clone() });
        let body_lowered = self.lower(body)?;
        let body_value = self.as_projected_value(body, body_lowered)?;
        let core = SelectCore {
            projection: vec![SelectItem { expr: body_value, alias: None }],
            from: Some(FromClause { item: iter_row.from, alias: iter_row.alias }),
            ..Default::default()
        };
        let alias = self.aliases.fresh("forr");
        Ok(Lowered::Row(RowSource {
            from: FromItem::Derived(Box::new(SelectStmt::single(core))),
            alias: alias.clone(),
            value: SqlExpr::column(alias, "result"),
            join_kind: JoinKind::LeftLateral,
        }))
    }

    /// `group E using … by …` (spec.md §4.5) produces free objects
    /// `{key, grouping, elements}`; `elements` is folded into a JSON array
    /// the way nested shapes are (spec.md §4.6).
    fn lower_group(
        &mut self,
        subject: NodeId,
        using: Vec<(String, NodeId)>,
        by: Vec<String>,
    ) -> Result<Lowered, IceError> {
        let lowered = self.lower(subject)?;
        let row = self.expect_row(subject, lowered)?;
        let mut key_fields = Vec::new();
        let mut group_exprs = Vec::new();
        for (name, expr_id) in &using {
            if by.contains(name) {
                let e = self.scalar_of(*expr_id)?;
                key_fields.push((name.clone(), e.clone()));
                group_exprs.push(e);
            }
        }
        // One row per distinct grouping-key bucket, its columns aliased
        // `k0, k1, ...` in lockstep with `group_exprs` so the elements
        // subquery below can correlate on them positionally.
        let key_aliases: Vec<String> = (0..group_exprs.len()).map(|i| format!("k{i}")).collect();
        let keys_core = SelectCore {
            distinct: true,
            projection: group_exprs
                .iter()
                .cloned()
                .zip(key_aliases.iter().cloned())
                .map(|(expr, alias)| SelectItem { expr, alias: Some(alias) })
                .collect(),
            from: Some(FromClause { item: row.from.clone(), alias: row.alias.clone() }),
            ..Default::default()
        };
        let keys_alias = self.aliases.fresh("grp_keys");

        let key_json = SqlExpr::JsonBuildObject(
            key_fields
                .iter()
                .zip(key_aliases.iter())
                .map(|((name, _), alias)| (name.clone(), SqlExpr::column(keys_alias.clone(), alias.clone())))
                .collect(),
        );
        let grouping_array =
            SqlExpr::ArrayLiteral(by.iter().map(|n| SqlExpr::Raw(format!("'{}'", n.replace('\'', "''")))).collect());

        // `elements` is the subset of the original rows whose grouping
        // keys match this bucket (spec.md §4.5: "`elements` is the
        // subset"), a correlated subquery keyed by `group_exprs`.
        let elements_where = group_exprs
            .iter()
            .zip(key_aliases.iter())
            .map(|(expr, alias)| SqlExpr::IsNotDistinctFrom {
                left: Box::new(expr.clone()),
                right: Box::new(SqlExpr::column(keys_alias.clone(), alias.clone())),
            })
            .reduce(|acc, cond| SqlExpr::BinaryOp { op: "AND".into(), left: Box::new(acc), right: Box::new(cond) });
        let elements_core = SelectCore {
            projection: vec![SelectItem { expr: row.value.clone(), alias: None }],
            from: Some(FromClause { item: row.from, alias: row.alias.clone() }),
            where_clause: elements_where,
            ..Default::default()
        };
        let result = SqlExpr::JsonBuildObject(vec![
            ("key".into(), key_json),
            ("grouping".into(), grouping_array),
            ("elements".into(), SqlExpr::ArraySubquery(Box::new(SelectStmt::single(elements_core)))),
        ]);
        let alias = self.aliases.fresh("grp");
        Ok(Lowered::Row(RowSource {
            from: FromItem::Derived(Box::new(SelectStmt::single(SelectCore {
                projection: vec![SelectItem { expr: result, alias: Some("result".into()) }],
                from: Some(FromClause {
                    item: FromItem::Derived(Box::new(SelectStmt::single(keys_core))),
                    alias: keys_alias,
                }),
                ..Default::default()
            }))),
            alias: alias.clone(),
            value: SqlExpr::column(alias, "result"),
            join_kind: JoinKind::LeftLateral,
        }))
    }

    fn scalar_of(&mut self, id: NodeId) -> Result<SqlExpr, IceError> {
        let lowered = self.lower(id)?;
        self.as_projected_value(id, lowered).map(|e| match e {
            SqlExpr::ScalarSubquery(s) => SqlExpr::ScalarSubquery(s),
            other => other,
        })
    }

    fn expect_row(&mut self, id: NodeId, lowered: Lowered) -> Result<RowSource, IceError> {
        match lowered {
            Lowered::Row(row) => Ok(row),
            Lowered::Scalar(e) => {
                let _ = id;
                let alias = self.aliases.fresh("v");
                Ok(RowSource {
                    from: FromItem::Derived(Box::new(SelectStmt::single(SelectCore {
                        projection: vec![SelectItem { expr: e, alias: Some("result".into()) }],
                        ..Default::default()
                    }))),
                    alias: alias.clone(),
                    value: SqlExpr::column(alias, "result"),
                    join_kind: JoinKind::LeftLateral,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use ql_catalog::CatalogBuilder;
    use ql_ir::{BuildConfig, IrBuilder, ScopingMode, StatementIr};

    fn catalog(sdl: &str) -> Catalog {
        let script = ql_parser::parse_script(sdl).expect("sdl parses");
        let mut builder = CatalogBuilder::new();
        builder.add_script("default", &script);
        builder.build().expect("sdl builds")
    }

    fn generate(cat: &Catalog, src: &str) -> GeneratedQuery {
        let script = ql_parser::parse_script(src).expect("script parses");
        let builder = IrBuilder::new(cat, BuildConfig { default_module: "default".into(), scoping_mode: ScopingMode::Legacy });
        let program = builder.build_script(&script).expect("script builds");
        let root = match program.statements.as_slice() {
            [StatementIr::Query(id)] => *id,
            other => panic!("expected exactly one query statement, got {other:?}"),
        };
        let mut generator = Generator::new(cat, &program.arena);
        let select = generator.lower_root(root).expect("lowers without an ICE");
        generator.finish(select)
    }

    #[test]
    fn literal_set_lowers_to_a_select() {
        let cat = catalog("");
        let query = generate(&cat, "select {1, 2, 3}");
        assert!(query.sql.to_uppercase().contains("SELECT"));
        assert_eq!(query.literal_params.len(), 3, "each set element is bound as its own constant, never inlined");
    }

    #[test]
    fn parameter_is_tracked_with_its_placeholder_index() {
        let cat = catalog("");
        let query = generate(&cat, "select <int64>$limit");
        assert_eq!(query.parameters.len(), 1);
        assert_eq!(query.parameters[0].name, "limit");
        assert_eq!(query.param_count, 1);
    }

    #[test]
    fn object_type_select_reads_from_its_backend_view() {
        let cat = catalog("type User { required name: str; }");
        let query = generate(&cat, "select User.name");
        let obj = match cat.resolve_qualified("default", "User").expect("resolves") {
            ql_catalog::EntityRef::Object(id) => id,
            other => panic!("User did not resolve to an object type: {other:?}"),
        };
        assert!(query.sql.contains(&crate::ident::object_view_name(&cat, obj)));
    }

    #[test]
    fn shape_lowers_to_a_json_build_object_call() {
        let cat = catalog("type User { required name: str; }");
        let query = generate(&cat, "select User { name }");
        assert!(query.sql.to_lowercase().contains("jsonb_build_object"));
    }

    #[test]
    fn multi_link_access_joins_through_the_auxiliary_link_table() {
        let cat = catalog(indoc! {"
            type User {
                required name: str;
                multi friends: User;
            }
        "});
        let query = generate(&cat, "select User.friends.name");
        let ptr = {
            let obj = match cat.resolve_qualified("default", "User").expect("resolves") {
                ql_catalog::EntityRef::Object(id) => id,
                other => panic!("User did not resolve to an object type: {other:?}"),
            };
            cat.find_pointer(obj, "friends").expect("friends pointer exists").id
        };
        assert!(query.sql.contains(&crate::ident::link_table_name(&cat, ptr)));
    }

    #[test]
    fn literal_string_constant_is_folded_into_literal_params_not_inlined() {
        let cat = catalog("");
        let query = generate(&cat, "select 'hello'");
        assert_eq!(query.literal_params.len(), 1);
        assert!(!query.sql.contains("hello"), "literal text must not be inlined into the SQL string");
    }
}
