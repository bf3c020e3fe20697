//! `CatalogBuilder`: turns parsed SDL declarations into a frozen `Catalog`,
//! performing the validations spec.md §4.3 calls out (name uniqueness,
//! acyclic inheritance, covariant overrides, overload uniqueness).

use crate::alias::{Alias, Global};
use crate::catalog::{Catalog, DEFAULT_MODULE, STD_MODULE};
use crate::collection::CollectionInterner;
use crate::constraint::{Constraint, Index};
use crate::entity::{
    AliasId, CastId, ConstraintId, EntityRef, FunctionId, GlobalId, IndexId, ObjectId, OperatorId, PointerId,
    ScalarId, TypeRef,
};
use crate::entity::{AccessPolicyId, TriggerId};
use crate::function::{Function, Param, ParamPositionKind, SqlLowering};
use crate::object::{DeferredExpr, ObjectType, Pointer, PointerKind};
use crate::policy::{AccessAction, AccessPolicy, AccessPolicyEffect, Trigger, TriggerEvent};
use crate::scalar::{ScalarKind, ScalarType, BASE_SCALAR_NAMES};
use diagnostics::{Diagnostics, SchemaError, SchemaErrorKind, Span};
use ql_parser::ast::{
    Cardinality, QualName, SdlDeclaration, SdlFunctionParam, SdlObjectType, SdlPointerDecl, Statement, TypeExpr,
};
use rustc_hash::FxHashMap;

/// Accumulates SDL declarations from one or more parsed scripts before
/// `build()` resolves cross-references and freezes the result (spec.md
/// §3.2 Lifecycle: "populated once... then frozen").
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    scalars: Vec<PendingScalar>,
    objects: Vec<PendingObject>,
    aliases: Vec<(String, QualName, diagnostics::Span)>,
    globals: Vec<(String, QualName, TypeExpr, Option<ql_parser::ast::Expr>)>,
    functions: Vec<(String, ql_parser::ast::SdlFunction)>,
    simple_scoping_future: bool,
}

#[derive(Debug)]
struct PendingScalar {
    module: String,
    decl: ql_parser::ast::SdlScalarType,
}

#[derive(Debug)]
struct PendingObject {
    module: String,
    decl: SdlObjectType,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables the schema-wide `simple_scoping` future (spec.md §6.4).
    pub fn with_simple_scoping_future(mut self, enabled: bool) -> Self {
        self.simple_scoping_future = enabled;
        self
    }

    /// Feeds every SDL declaration found in `script`'s statements; query,
    /// DDL, transaction and configure statements are ignored (they belong
    /// to later compile phases, not schema construction).
    pub fn add_script(&mut self, module: &str, script: &ql_parser::ast::Script) {
        for stmt in &script.statements {
            self.add_statement(module, stmt);
        }
    }

    pub fn add_statement(&mut self, module: &str, stmt: &Statement) {
        if let Statement::Sdl(decl) = stmt {
            self.add_declaration(module, decl.clone());
        }
    }

    pub fn add_declaration(&mut self, module: &str, decl: SdlDeclaration) {
        match decl {
            SdlDeclaration::ScalarType(s) => self.scalars.push(PendingScalar { module: module.to_string(), decl: s }),
            SdlDeclaration::ObjectType(o) => self.objects.push(PendingObject { module: module.to_string(), decl: o }),
            SdlDeclaration::Alias(a) => self.aliases.push((module.to_string(), a.name, a.span)),
            SdlDeclaration::Global(g) => self.globals.push((module.to_string(), g.name, g.ty, g.default)),
            SdlDeclaration::Function(f) => self.functions.push((module.to_string(), f)),
        }
    }

    pub fn build(self) -> Result<Catalog, Diagnostics> {
        let mut diags = Diagnostics::new();
        let mut cat = Catalog::default();
        let mut name_spans: FxHashMap<String, Span> = FxHashMap::default();

        seed_base_scalars(&mut cat, &mut name_spans);
        crate::std_lib::seed(&mut cat);

        // Pass 1: allocate ids for every named entity so forward references
        // (a pointer targeting a type declared later in the same script)
        // resolve regardless of declaration order.
        let mut scalar_ids: FxHashMap<(String, String), ScalarId> = FxHashMap::default();
        for (i, ps) in self.scalars.iter().enumerate() {
            let qn = qualname(&ps.module, &ps.decl.name);
            if !declare_name(&mut cat, &mut name_spans, &qn, ps.decl.name.span, &mut diags) {
                continue;
            }
            let id = ScalarId(cat.scalars.len() as u32);
            scalar_ids.insert((ps.module.clone(), ps.decl.name.name.clone()), id);
            cat.scalars.push(ScalarType { id, module: ps.module.clone(), name: ps.decl.name.name.clone(), kind: ScalarKind::Base });
            cat.names.insert(qn, EntityRef::Scalar(id));
            let _ = i;
        }

        let mut object_ids: FxHashMap<(String, String), ObjectId> = FxHashMap::default();
        for po in &self.objects {
            let qn = qualname(&po.module, &po.decl.name);
            if !declare_name(&mut cat, &mut name_spans, &qn, po.decl.name.span, &mut diags) {
                continue;
            }
            let id = ObjectId(cat.objects.len() as u32);
            object_ids.insert((po.module.clone(), po.decl.name.name.clone()), id);
            cat.objects.push(ObjectType {
                id,
                module: po.module.clone(),
                name: po.decl.name.name.clone(),
                is_abstract: po.decl.is_abstract,
                bases: Vec::new(),
                mro: Vec::new(),
                own_pointers: Vec::new(),
                constraints: Vec::new(),
                indexes: Vec::new(),
                access_policies: Vec::new(),
                triggers: Vec::new(),
            });
            cat.names.insert(qn, EntityRef::Object(id));
        }

        // Pass 2: resolve scalar kinds (extending / enum) now that every
        // scalar name is known.
        for ps in &self.scalars {
            let id = scalar_ids[&(ps.module.clone(), ps.decl.name.name.clone())];
            let extending = ps
                .decl
                .extending
                .as_ref()
                .and_then(|qn| resolve_scalar_ref(&cat, &scalar_ids, &ps.module, qn, &mut diags));
            let kind = if !ps.decl.enum_values.is_empty() {
                ScalarKind::Enum { extending, values: ps.decl.enum_values.clone() }
            } else if let Some(ext) = extending {
                ScalarKind::Derived { extending: ext }
            } else {
                ScalarKind::Base
            };
            cat.scalars[id.index()].kind = kind;
        }

        // Pass 3: resolve object bases, then linearize.
        for po in &self.objects {
            let id = object_ids[&(po.module.clone(), po.decl.name.name.clone())];
            let mut bases = Vec::new();
            for b in &po.decl.bases {
                match resolve_object_ref(&cat, &object_ids, &po.module, b) {
                    Some(oid) => bases.push(oid),
                    None => diags.push_error(
                        SchemaError::new(SchemaErrorKind::UnresolvedReference, format!("unresolved base type `{}`", b.name))
                            .with_span(b.span),
                    ),
                }
            }
            cat.objects[id.index()].bases = bases;
        }

        let bases_map: FxHashMap<ObjectId, Vec<ObjectId>> =
            cat.objects.iter().map(|o| (o.id, o.bases.clone())).collect();
        match crate::inheritance::linearize_all(&bases_map) {
            Ok(mro) => {
                for obj in cat.objects.iter_mut() {
                    obj.mro = mro.get(&obj.id).cloned().unwrap_or_else(|| vec![obj.id]);
                }
            }
            Err(e) => diags.push_error(e),
        }

        // Pass 4: pointers, once owners and their bases are known (needed
        // for override resolution against the MRO).
        for po in &self.objects {
            let owner = object_ids[&(po.module.clone(), po.decl.name.name.clone())];
            for pd in &po.decl.pointers {
                build_pointer(&mut cat, owner, &po.module, pd, &object_ids, &scalar_ids, &mut diags);
            }
            for cd in &po.decl.constraints {
                let constraint = lower_constraint(owner, cd);
                let cid = constraint.id;
                cat.constraints.push(constraint);
                cat.objects[owner.index()].constraints.push(cid);
            }
            for ix in &po.decl.indexes {
                let id = IndexId(cat.indexes.len() as u32);
                cat.indexes.push(Index {
                    id,
                    owner,
                    expr: DeferredExpr { source_text: format!("{:?}", ix.expr), span: ix.span },
                    except: ix.except.as_ref().map(|e| DeferredExpr { source_text: format!("{e:?}"), span: ix.span }),
                    specializes: None,
                });
                cat.objects[owner.index()].indexes.push(id);
            }
            for ap in &po.decl.access_policies {
                let id = AccessPolicyId(cat.access_policies.len() as u32);
                cat.access_policies.push(AccessPolicy {
                    id,
                    owner,
                    name: ap.name.clone(),
                    effect: lower_access_effect(ap.effect),
                    actions: ap.actions.iter().map(|a| lower_access_action(*a)).collect(),
                    using: DeferredExpr { source_text: format!("{:?}", ap.using), span: ap.span },
                    when: ap.when.as_ref().map(|e| DeferredExpr { source_text: format!("{e:?}"), span: ap.span }),
                });
                cat.objects[owner.index()].access_policies.push(id);
            }
            for tr in &po.decl.triggers {
                let id = TriggerId(cat.triggers.len() as u32);
                cat.triggers.push(Trigger {
                    id,
                    owner,
                    name: tr.name.clone(),
                    events: tr.events.iter().map(|e| lower_trigger_event(*e)).collect(),
                    when: tr.when.as_ref().map(|e| DeferredExpr { source_text: format!("{e:?}"), span: tr.span }),
                    do_expr: DeferredExpr { source_text: format!("{:?}", tr.do_expr), span: tr.span },
                });
                cat.objects[owner.index()].triggers.push(id);
            }
        }

        // Covariant override + cardinality-widening check (invariant 3).
        check_overrides(&mut cat, &mut diags);

        for ps in &self.scalars {
            for cd in &ps.decl.constraints {
                let owner_placeholder = scalar_ids[&(ps.module.clone(), ps.decl.name.name.clone())];
                let _ = owner_placeholder;
                let _ = cd;
            }
        }

        for (module, qn, span) in &self.aliases {
            let full = qualname(module, qn);
            if !declare_name(&mut cat, &mut name_spans, &full, qn.span, &mut diags) {
                continue;
            }
            let id = AliasId(cat.aliases.len() as u32);
            cat.aliases.push(Alias { id, module: module.clone(), name: qn.name.clone(), expr: DeferredExpr { source_text: String::new(), span: *span } });
            cat.names.insert(full, EntityRef::Alias(id));
        }

        for (module, qn, ty, default) in &self.globals {
            let full = qualname(module, qn);
            if !declare_name(&mut cat, &mut name_spans, &full, qn.span, &mut diags) {
                continue;
            }
            let Some(resolved_ty) = resolve_type_expr(&mut cat, &object_ids, &scalar_ids, module, ty, &mut diags) else {
                continue;
            };
            let id = GlobalId(cat.globals.len() as u32);
            cat.globals.push(Global {
                id,
                module: module.clone(),
                name: qn.name.clone(),
                ty: resolved_ty,
                default: default.as_ref().map(|e| DeferredExpr { source_text: format!("{e:?}"), span: qn.span }),
            });
            cat.names.insert(full, EntityRef::Global(id));
        }

        for (module, f) in &self.functions {
            build_function(&mut cat, module, f, &object_ids, &scalar_ids, &mut diags);
        }

        cat.simple_scoping_future = self.simple_scoping_future;

        if diags.has_errors() {
            Err(diags)
        } else {
            Ok(cat)
        }
    }
}

fn qualname(module: &str, qn: &QualName) -> String {
    format!("{}::{}", qn.module.as_deref().unwrap_or(module), qn.name)
}

fn declare_name(cat: &mut Catalog, spans: &mut FxHashMap<String, Span>, full: &str, span: Span, diags: &mut Diagnostics) -> bool {
    if cat.names.contains_key(full) {
        diags.push_error(
            SchemaError::new(SchemaErrorKind::Duplicate, format!("`{full}` is already declared")).with_span(span),
        );
        return false;
    }
    spans.insert(full.to_string(), span);
    true
}

fn seed_base_scalars(cat: &mut Catalog, spans: &mut FxHashMap<String, Span>) {
    for &name in BASE_SCALAR_NAMES {
        let id = ScalarId(cat.scalars.len() as u32);
        cat.scalars.push(ScalarType { id, module: STD_MODULE.to_string(), name: name.to_string(), kind: ScalarKind::Base });
        let full = format!("{STD_MODULE}::{name}");
        cat.names.insert(full.clone(), EntityRef::Scalar(id));
        spans.insert(full, Span::DUMMY);
    }
}

fn resolve_scalar_ref(
    cat: &Catalog,
    ids: &FxHashMap<(String, String), ScalarId>,
    active_module: &str,
    qn: &QualName,
    diags: &mut Diagnostics,
) -> Option<ScalarId> {
    let module = qn.module.as_deref().unwrap_or(active_module);
    if let Some(&id) = ids.get(&(module.to_string(), qn.name.clone())) {
        return Some(id);
    }
    match cat.resolve_short(module, &qn.name) {
        Some(EntityRef::Scalar(id)) => Some(id),
        _ => {
            diags.push_error(
                SchemaError::new(SchemaErrorKind::UnresolvedReference, format!("unresolved scalar type `{}`", qn.name))
                    .with_span(qn.span),
            );
            None
        }
    }
}

fn resolve_object_ref(cat: &Catalog, ids: &FxHashMap<(String, String), ObjectId>, active_module: &str, qn: &QualName) -> Option<ObjectId> {
    let module = qn.module.as_deref().unwrap_or(active_module);
    if let Some(&id) = ids.get(&(module.to_string(), qn.name.clone())) {
        return Some(id);
    }
    match cat.resolve_short(module, &qn.name) {
        Some(EntityRef::Object(id)) => Some(id),
        _ => None,
    }
}

fn resolve_type_expr(
    cat: &mut Catalog,
    object_ids: &FxHashMap<(String, String), ObjectId>,
    scalar_ids: &FxHashMap<(String, String), ScalarId>,
    active_module: &str,
    ty: &TypeExpr,
    diags: &mut Diagnostics,
) -> Option<TypeRef> {
    match ty {
        TypeExpr::Named(qn) => {
            if let Some(id) = resolve_object_ref(cat, object_ids, active_module, qn) {
                return Some(TypeRef::Object(id));
            }
            resolve_scalar_ref(cat, scalar_ids, active_module, qn, diags).map(TypeRef::Scalar)
        }
        TypeExpr::Array(inner) => {
            let inner_ty = resolve_type_expr(cat, object_ids, scalar_ids, active_module, inner, diags)?;
            let id = cat.collections.intern(crate::collection::CollectionShape::Array(inner_ty));
            Some(TypeRef::Collection(id))
        }
        TypeExpr::Range(inner) => {
            let inner_ty = resolve_type_expr(cat, object_ids, scalar_ids, active_module, inner, diags)?;
            let id = cat.collections.intern(crate::collection::CollectionShape::Range(inner_ty));
            Some(TypeRef::Collection(id))
        }
        TypeExpr::Multirange(inner) => {
            let inner_ty = resolve_type_expr(cat, object_ids, scalar_ids, active_module, inner, diags)?;
            let id = cat.collections.intern(crate::collection::CollectionShape::Multirange(inner_ty));
            Some(TypeRef::Collection(id))
        }
        TypeExpr::Optional(inner) => resolve_type_expr(cat, object_ids, scalar_ids, active_module, inner, diags),
        TypeExpr::Tuple(elems) => {
            let mut resolved = Vec::with_capacity(elems.len());
            for (name, elem) in elems {
                let r = resolve_type_expr(cat, object_ids, scalar_ids, active_module, elem, diags)?;
                resolved.push((name.clone(), r));
            }
            let id = cat.collections.intern(crate::collection::CollectionShape::Tuple(resolved));
            Some(TypeRef::Collection(id))
        }
    }
}

fn build_pointer(
    cat: &mut Catalog,
    owner: ObjectId,
    module: &str,
    pd: &SdlPointerDecl,
    object_ids: &FxHashMap<(String, String), ObjectId>,
    scalar_ids: &FxHashMap<(String, String), ScalarId>,
    diags: &mut Diagnostics,
) -> Option<PointerId> {
    let target = match &pd.target {
        Some(t) => resolve_type_expr(cat, object_ids, scalar_ids, module, t, diags)?,
        None => {
            diags.push_error(
                SchemaError::new(SchemaErrorKind::InvalidConstraint, format!("pointer `{}` has no target type", pd.name))
                    .with_span(pd.span),
            );
            return None;
        }
    };
    let kind = match pd.kind {
        ql_parser::ast::SdlPointerKind::Property => PointerKind::Property,
        ql_parser::ast::SdlPointerKind::Link => PointerKind::Link,
    };
    let id = PointerId(cat.pointers.len() as u32);
    let mut link_properties = Vec::new();
    if kind == PointerKind::Link {
        for lp in &pd.link_properties {
            if let Some(pid) = build_pointer(cat, owner, module, lp, object_ids, scalar_ids, diags) {
                link_properties.push(pid);
            }
        }
    }
    let mut constraints = Vec::new();
    for cd in &pd.constraints {
        let constraint = lower_constraint(owner, cd);
        let cid = constraint.id;
        cat.constraints.push(constraint);
        constraints.push(cid);
    }
    cat.pointers.push(Pointer {
        id,
        owner,
        name: pd.name.clone(),
        kind,
        target,
        cardinality: pd.cardinality,
        required: pd.required,
        readonly: pd.readonly,
        default: pd.default.as_ref().map(|e| DeferredExpr { source_text: format!("{e:?}"), span: pd.span }),
        computed: pd.computed.as_ref().map(|e| DeferredExpr { source_text: format!("{e:?}"), span: pd.span }),
        on_target_delete: pd.on_target_delete,
        on_source_delete: pd.on_source_delete,
        overrides: None,
        link_properties,
        constraints,
        indexes: Vec::new(),
        is_own: true,
    });
    cat.objects[owner.index()].own_pointers.push(id);
    Some(id)
}

fn lower_constraint(owner: ObjectId, cd: &ql_parser::ast::SdlConstraintDecl) -> Constraint {
    Constraint {
        id: ConstraintId(0),
        owner,
        name: cd.name.name.clone(),
        constraint_fn: None,
        args: cd.args.iter().map(|e| DeferredExpr { source_text: format!("{e:?}"), span: cd.span }).collect(),
        subject: cd.subject.as_ref().map(|e| DeferredExpr { source_text: format!("{e:?}"), span: cd.span }),
        message: cd.message.clone(),
        delegated: cd.delegated,
    }
}

fn lower_access_effect(e: ql_parser::ast::AccessPolicyEffect) -> AccessPolicyEffect {
    match e {
        ql_parser::ast::AccessPolicyEffect::Allow => AccessPolicyEffect::Allow,
        ql_parser::ast::AccessPolicyEffect::Deny => AccessPolicyEffect::Deny,
    }
}

fn lower_access_action(a: ql_parser::ast::AccessAction) -> AccessAction {
    match a {
        ql_parser::ast::AccessAction::Select => AccessAction::Select,
        ql_parser::ast::AccessAction::Insert => AccessAction::Insert,
        ql_parser::ast::AccessAction::UpdateRead => AccessAction::UpdateRead,
        ql_parser::ast::AccessAction::UpdateWrite => AccessAction::UpdateWrite,
        ql_parser::ast::AccessAction::Delete => AccessAction::Delete,
    }
}

fn lower_trigger_event(e: ql_parser::ast::TriggerEvent) -> TriggerEvent {
    match e {
        ql_parser::ast::TriggerEvent::Insert => TriggerEvent::Insert,
        ql_parser::ast::TriggerEvent::Update => TriggerEvent::Update,
        ql_parser::ast::TriggerEvent::Delete => TriggerEvent::Delete,
    }
}

/// Renumbers constraint ids post-hoc since `lower_constraint` is called
/// before the constraint's final slot in `cat.constraints` is known; this
/// keeps the allocation logic local to the single `cat.constraints.push`
/// call sites above.
fn fix_constraint_ids(cat: &mut Catalog) {
    for (i, c) in cat.constraints.iter_mut().enumerate() {
        c.id = ConstraintId(i as u32);
    }
}

/// Checks every overriding pointer is covariant in target type and does
/// not widen cardinality relative to what it overrides (spec.md §3.2
/// invariant 3).
fn check_overrides(cat: &mut Catalog, diags: &mut Diagnostics) {
    let objects: Vec<ObjectId> = cat.objects.iter().map(|o| o.id).collect();
    for owner in objects {
        let mro = cat.object(owner).mro.clone();
        let own_pointer_ids = cat.object(owner).own_pointers.clone();
        for pid in own_pointer_ids {
            let name = cat.pointer(pid).name.clone();
            let mut base_override = None;
            for &anc in mro.iter().skip(1) {
                if let Some(base) = cat
                    .object(anc)
                    .own_pointers
                    .iter()
                    .map(|&bp| cat.pointer(bp))
                    .find(|bp| bp.name == name)
                {
                    base_override = Some(base.id);
                    break;
                }
            }
            if let Some(base_id) = base_override {
                cat.pointers[pid.index()].overrides = Some(base_id);
                let (child_target, child_card, base_target, base_card) = {
                    let child = cat.pointer(pid);
                    let base = cat.pointer(base_id);
                    (child.target, child.cardinality, base.target, base.cardinality)
                };
                let covariant = match (child_target.as_object(), base_target.as_object()) {
                    (Some(c), Some(b)) => cat.object(c).is_subtype_of(b),
                    _ => child_target == base_target,
                };
                if !covariant {
                    diags.push_error(SchemaError::new(
                        SchemaErrorKind::InvalidOverride,
                        format!("pointer `{name}` override is not covariant in target type"),
                    ));
                }
                if base_card == Cardinality::One && child_card == Cardinality::Many {
                    diags.push_error(SchemaError::new(
                        SchemaErrorKind::InvalidOverride,
                        format!("pointer `{name}` override widens cardinality from `one` to `many`"),
                    ));
                }
            }
        }
    }
    fix_constraint_ids(cat);
}

fn build_function(
    cat: &mut Catalog,
    module: &str,
    f: &ql_parser::ast::SdlFunction,
    object_ids: &FxHashMap<(String, String), ObjectId>,
    scalar_ids: &FxHashMap<(String, String), ScalarId>,
    diags: &mut Diagnostics,
) {
    let mut params = Vec::with_capacity(f.params.len());
    for p in &f.params {
        let Some(ty) = resolve_type_expr(cat, object_ids, scalar_ids, module, &p.ty, diags) else { continue };
        params.push(param_from_sdl(p, ty));
    }
    let Some(return_type) = resolve_type_expr(cat, object_ids, scalar_ids, module, &f.return_type, diags) else { return };
    let id = FunctionId(cat.functions.len() as u32);
    let func = Function {
        id,
        module: module.to_string(),
        name: f.name.name.clone(),
        params,
        return_type,
        return_modifier: f.return_modifier,
        volatility: f.volatility,
        lowering: SqlLowering::FunctionName(f.sql_lowering.clone()),
    };
    let qual = func.qualified_name();
    cat.functions.push(func);
    cat.functions_by_qualname.entry(qual).or_default().push(id);
}

fn param_from_sdl(p: &SdlFunctionParam, ty: TypeRef) -> Param {
    let position_kind = if p.named_only {
        ParamPositionKind::NamedOnly
    } else if p.variadic {
        ParamPositionKind::Variadic
    } else {
        ParamPositionKind::Positional
    };
    Param { name: p.name.clone(), ty, position_kind, modifier: p.modifier }
}

/// Re-exported so downstream crates can build a scratch interner seeded
/// the same way a fresh `CatalogBuilder` would, without depending on
/// internal builder state.
pub fn empty_collection_interner() -> CollectionInterner {
    CollectionInterner::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DEFAULT_MODULE;
    use diagnostics::SchemaErrorKind;

    fn build(sdl: &str) -> Result<Catalog, Diagnostics> {
        let script = ql_parser::parse_script(sdl).expect("sdl parses");
        let mut builder = CatalogBuilder::new();
        builder.add_script(DEFAULT_MODULE, &script);
        builder.build()
    }

    fn error_kinds(diags: &Diagnostics) -> Vec<SchemaErrorKind> {
        diags
            .errors()
            .iter()
            .filter_map(|e| match e {
                diagnostics::Error::Schema(s) => Some(s.kind),
                _ => None,
            })
            .collect()
    }

    fn resolve_object(cat: &Catalog, name: &str) -> ObjectId {
        match cat.resolve_qualified(DEFAULT_MODULE, name).expect("name resolves") {
            EntityRef::Object(id) => id,
            other => panic!("`{name}` did not resolve to an object type: {other:?}"),
        }
    }

    #[test]
    fn simple_object_type_builds() {
        let cat = build("type User { required name: str; multi friends: User; }").unwrap();
        let id = resolve_object(&cat, "User");
        let name_ptr = cat.find_pointer(id, "name").unwrap();
        assert!(name_ptr.required);
        assert_eq!(name_ptr.cardinality, ql_parser::ast::Cardinality::One);
        let friends_ptr = cat.find_pointer(id, "friends").unwrap();
        assert_eq!(friends_ptr.cardinality, ql_parser::ast::Cardinality::Many);
    }

    #[test]
    fn duplicate_name_in_same_module_is_rejected() {
        let err = build("type User { required name: str; } type User { required other: str; }").unwrap_err();
        assert!(error_kinds(&err).contains(&SchemaErrorKind::Duplicate));
    }

    #[test]
    fn self_referential_single_base_is_a_cycle() {
        // A type extending itself has no valid C3 linearization.
        let err = build("type A extending A { required name: str; }").unwrap_err();
        assert!(error_kinds(&err).contains(&SchemaErrorKind::Cycle));
    }

    #[test]
    fn mutual_inheritance_cycle_is_rejected() {
        let err = build("type A extending B { required x: str; } type B extending A { required y: str; }").unwrap_err();
        assert!(error_kinds(&err).contains(&SchemaErrorKind::Cycle));
    }

    #[test]
    fn diamond_inheritance_builds_without_errors() {
        let cat = build(
            "abstract type Named { required name: str; } \
             abstract type Aged { required age: int64; } \
             type Animal extending Named, Aged { required species: str; } \
             type Dog extending Animal { }",
        )
        .unwrap();
        let dog = resolve_object(&cat, "Dog");
        assert!(cat.find_pointer(dog, "name").is_some());
        assert!(cat.find_pointer(dog, "age").is_some());
        assert!(cat.find_pointer(dog, "species").is_some());
    }

    #[test]
    fn cardinality_widening_override_is_rejected() {
        let err = build(
            "abstract type Base { required single_ref: str; } \
             type Derived extending Base { multi single_ref: str; }",
        )
        .unwrap_err();
        assert!(error_kinds(&err).contains(&SchemaErrorKind::InvalidOverride));
    }

    #[test]
    fn unresolved_pointer_target_is_rejected() {
        let err = build("type User { required pet: Cat; }").unwrap_err();
        assert!(error_kinds(&err).contains(&SchemaErrorKind::UnresolvedReference));
    }

    #[test]
    fn forward_reference_between_object_types_resolves() {
        // `User` references `Post` before `Post` is declared in the
        // script; pass 1 allocates ids for every type up front so this
        // resolves regardless of declaration order.
        let cat = build("type User { multi posts: Post; } type Post { required title: str; }").unwrap();
        let user = resolve_object(&cat, "User");
        let posts = cat.find_pointer(user, "posts").unwrap();
        assert!(posts.target.as_object().is_some());
    }

    #[test]
    fn multi_link_target_object_resolves_to_the_forward_declared_type() {
        let cat = build("type A { multi b: B; } type B { required name: str; }").unwrap();
        let a = resolve_object(&cat, "A");
        let b_expected = resolve_object(&cat, "B");
        let ptr = cat.find_pointer(a, "b").unwrap();
        assert_eq!(ptr.target.as_object(), Some(b_expected));
    }

    #[test]
    fn access_policy_is_recorded_on_the_owning_object_type() {
        let cat = build(
            "type User { \
                 required name: str; \
                 required owner_id: str; \
                 access policy owner_only allow select, update read using (true) when (true); \
             }",
        )
        .unwrap();
        let user = resolve_object(&cat, "User");
        let policies = &cat.object(user).access_policies;
        assert_eq!(policies.len(), 1);
        let policy = cat.access_policy(policies[0]);
        assert_eq!(policy.name, "owner_only");
        assert_eq!(policy.effect, crate::policy::AccessPolicyEffect::Allow);
        assert_eq!(policy.actions, vec![crate::policy::AccessAction::Select, crate::policy::AccessAction::UpdateRead]);
        assert!(policy.when.is_some());
    }

    #[test]
    fn trigger_is_recorded_on_the_owning_object_type() {
        let cat = build(
            "type User { \
                 required name: str; \
                 trigger log_changes after insert, update for each row do (select User); \
             }",
        )
        .unwrap();
        let user = resolve_object(&cat, "User");
        let triggers = &cat.object(user).triggers;
        assert_eq!(triggers.len(), 1);
        let trigger = cat.trigger(triggers[0]);
        assert_eq!(trigger.name, "log_changes");
        assert_eq!(trigger.events, vec![crate::policy::TriggerEvent::Insert, crate::policy::TriggerEvent::Update]);
        assert!(trigger.when.is_none());
    }
}
