//! Seeds the `std` module's built-in operators, functions, and casts
//! (spec.md §3.2: `Operator`, `Function`, `Cast` are catalog entities like
//! any user-declared one, each carrying "a lowering recipe... an SQL
//! function name, SQL operator, or an SQL template").
//!
//! spec.md's SDL grammar (§4.2, §4.3) gives a schema author a way to
//! declare scalars, object types, aliases, globals, and functions — but
//! no surface syntax for declaring an operator or a cast. Every query
//! still needs `=`, `+`, `and`, implicit `int64 -> float64` widening, and
//! so on to exist as catalog entities before overload resolution can find
//! them, so `std` seeds these once in code, the same way a connector's
//! capability table enumerates what a backend supports rather than
//! reading it from a user-authored file (grounded on psl-core's
//! connector/capability model).
//!
//! A handful of aggregate functions (`count`, `sum`, `array_agg`,
//! `exists`) are genuinely polymorphic over *any* input type, including
//! object types not yet known when `std` is seeded. The entity model has
//! no `anytype` parameter kind, so these lean on an existing
//! permissiveness in [`crate::catalog::resolve_overload`]'s cost function:
//! a mismatched argument/parameter type is never rejected outright, only
//! priced at cost 1 versus an exact match's cost 0. A single-overload
//! aggregate therefore always resolves regardless of its argument's real
//! type; its declared parameter type is a nominal placeholder
//! (`std::str`), not a constraint. This is a deliberate simplification,
//! not an oversight — the generator never type-checks (spec.md §4.6).

use crate::catalog::{Catalog, STD_MODULE};
use crate::collection::CollectionShape;
use crate::entity::{EntityRef, ScalarId, TypeRef};
use crate::function::{Cast, Function, Operator, OperatorKind, Param, ParamPositionKind, SqlLowering};
use ql_parser::ast::{ParamModifier, ReturnModifier, Volatility};

pub(crate) fn seed(cat: &mut Catalog) {
    seed_casts(cat);
    seed_operators(cat);
    seed_functions(cat);
}

fn scalar(cat: &Catalog, name: &str) -> ScalarId {
    match cat.resolve_qualified(STD_MODULE, name) {
        Some(EntityRef::Scalar(id)) => id,
        _ => unreachable!("base scalar `std::{name}` missing before std-lib seeding"),
    }
}

fn ty(cat: &Catalog, name: &str) -> TypeRef {
    TypeRef::Scalar(scalar(cat, name))
}

fn required(name: &str, t: TypeRef) -> Param {
    Param { name: name.to_string(), ty: t, position_kind: ParamPositionKind::Positional, modifier: ParamModifier::Required }
}

fn set_of(name: &str, t: TypeRef) -> Param {
    Param { name: name.to_string(), ty: t, position_kind: ParamPositionKind::Positional, modifier: ParamModifier::SetOf }
}

/// Postgres type token used in cast templates. Duplicated (deliberately,
/// not shared) in `sqlgen`'s column-type mapping: the catalog's copy
/// describes a cast's own lowering recipe, a Phase-S concern; `sqlgen`'s
/// copy describes how a *column* materializes, a Phase-G concern. Keeping
/// them as two small tables instead of one shared one avoids coupling the
/// two phases to a single "the backend's type system" abstraction spec.md
/// never asks for.
fn pg_type(scalar_name: &str) -> &'static str {
    match scalar_name {
        "int16" => "int2",
        "int32" => "int4",
        "int64" => "int8",
        "float32" => "float4",
        "float64" => "float8",
        "bigint" => "numeric",
        "decimal" => "numeric",
        "bool" => "bool",
        "bytes" => "bytea",
        "uuid" => "uuid",
        "json" => "jsonb",
        "datetime" => "timestamptz",
        "local_datetime" => "timestamp",
        "duration" => "interval",
        "local_date" => "date",
        "local_time" => "time",
        other => other,
    }
}

fn push_cast(cat: &mut Catalog, from: TypeRef, to: TypeRef, allow_implicit: bool, allow_assignment: bool, lowering: SqlLowering) {
    let id = crate::entity::CastId(cat.casts.len() as u32);
    cat.casts.push(Cast { id, from, to, allow_implicit, allow_assignment, lowering, volatility: Volatility::Immutable });
    cat.casts_by_pair.insert((from, to), id);
}

fn template_cast(target_scalar: &str) -> SqlLowering {
    SqlLowering::Template(format!("CAST({{0}} AS {})", pg_type(target_scalar)))
}

/// Numeric widenings and the two temporal casts spec.md §4.5/§9 calls out
/// by name (`int64 -> float64`, `date -> datetime`). The exact set of
/// implicit temporal casts is left open by spec.md §9 ("varies across
/// snapshots; implementers must pick and document") — decided in
/// DESIGN.md: `local_date -> datetime` is implicit (midnight UTC on that
/// date), `local_datetime -> datetime` is assignment-only (it has no zone
/// to promote from without the author's say-so).
fn seed_casts(cat: &mut Catalog) {
    let widenings: &[(&str, &str)] =
        &[("int16", "int32"), ("int16", "int64"), ("int32", "int64"), ("int16", "float32"), ("int32", "float64"), ("int64", "float64"), ("float32", "float64"), ("int64", "bigint"), ("int64", "decimal"), ("bigint", "decimal")];
    for &(from, to) in widenings {
        let (f, t) = (ty(cat, from), ty(cat, to));
        push_cast(cat, f, t, true, true, template_cast(to));
    }

    let local_date = ty(cat, "local_date");
    let datetime = ty(cat, "datetime");
    let local_datetime = ty(cat, "local_datetime");
    push_cast(cat, local_date, datetime, true, true, SqlLowering::Template("CAST({0} AS timestamptz)".to_string()));
    push_cast(cat, local_datetime, datetime, false, true, SqlLowering::Template("({0} AT TIME ZONE 'UTC')".to_string()));

    // Explicit-only conversions a query author reaches for with `<T>expr`
    // but that should never fire silently (spec.md §4.5: "implicit casts
    // are inserted where declared" — these simply never declare it).
    let explicit_only: &[(&str, &str)] = &[("decimal", "float64"), ("int64", "str"), ("str", "int64"), ("str", "uuid"), ("uuid", "str"), ("bool", "str")];
    for &(from, to) in explicit_only {
        let (f, t) = (ty(cat, from), ty(cat, to));
        push_cast(cat, f, t, false, false, template_cast(to));
    }
}

fn push_operator(cat: &mut Catalog, module: &str, name: &str, kind: OperatorKind, precedence: u8, params: Vec<Param>, return_type: TypeRef, return_modifier: ReturnModifier, volatility: Volatility, lowering: SqlLowering) {
    let id = crate::entity::OperatorId(cat.operators.len() as u32);
    let op = Operator { id, module: module.to_string(), name: name.to_string(), kind, precedence, params, return_type, return_modifier, volatility, lowering };
    let qual = format!("{}::{}", op.module, op.name);
    cat.operators.push(op);
    cat.operators_by_qualname.entry(qual).or_default().push(id);
}

/// Precedence classes mirroring the parser's low-to-high climb (spec.md
/// §4.2), used only so the catalog and parser agree on associativity
/// classes per spec.md's `Operator` field description; the parser itself
/// does not consult this table (it climbs on its own fixed ladder).
mod prec {
    pub const OR: u8 = 10;
    pub const AND: u8 = 11;
    pub const NOT: u8 = 12;
    pub const COMPARISON: u8 = 13;
    pub const LIKE: u8 = 15;
    pub const IN: u8 = 16;
    pub const IS: u8 = 17;
    pub const ADDITIVE: u8 = 18;
    pub const MULTIPLICATIVE: u8 = 19;
    pub const DISTINCT_UNARY: u8 = 21;
    pub const EXPONENT: u8 = 22;
}

fn seed_operators(cat: &mut Catalog) {
    let bool_t = ty(cat, "bool");
    push_operator(cat, STD_MODULE, "and", OperatorKind::Infix, prec::AND, vec![required("a", bool_t), required("b", bool_t)], bool_t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Operator("AND".into()));
    push_operator(cat, STD_MODULE, "or", OperatorKind::Infix, prec::OR, vec![required("a", bool_t), required("b", bool_t)], bool_t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Operator("OR".into()));
    push_operator(cat, STD_MODULE, "not", OperatorKind::Prefix, prec::NOT, vec![required("a", bool_t)], bool_t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Operator("NOT".into()));

    let numeric = ["int16", "int32", "int64", "float32", "float64", "bigint", "decimal"];
    for name in numeric {
        let t = ty(cat, name);
        push_operator(cat, STD_MODULE, "+", OperatorKind::Infix, prec::ADDITIVE, vec![required("a", t), required("b", t)], t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Operator("+".into()));
        push_operator(cat, STD_MODULE, "-", OperatorKind::Infix, prec::ADDITIVE, vec![required("a", t), required("b", t)], t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Operator("-".into()));
        push_operator(cat, STD_MODULE, "-", OperatorKind::Prefix, prec::DISTINCT_UNARY, vec![required("a", t)], t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Template("(-{0})".into()));
        push_operator(cat, STD_MODULE, "*", OperatorKind::Infix, prec::MULTIPLICATIVE, vec![required("a", t), required("b", t)], t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Operator("*".into()));
        push_operator(cat, STD_MODULE, "/", OperatorKind::Infix, prec::MULTIPLICATIVE, vec![required("a", t), required("b", t)], t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Operator("/".into()));
        push_operator(cat, STD_MODULE, "//", OperatorKind::Infix, prec::MULTIPLICATIVE, vec![required("a", t), required("b", t)], t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Template("floor(({0})::float8 / ({1})::float8)".into()));
        push_operator(cat, STD_MODULE, "^", OperatorKind::Infix, prec::EXPONENT, vec![required("a", t), required("b", t)], t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::FunctionName("power".into()));
        push_operator(cat, STD_MODULE, "distinct", OperatorKind::Prefix, prec::DISTINCT_UNARY, vec![required("a", t)], t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Template("DISTINCT {0}".into()));
    }
    for name in ["int16", "int32", "int64", "bigint", "decimal"] {
        let t = ty(cat, name);
        push_operator(cat, STD_MODULE, "%", OperatorKind::Infix, prec::MULTIPLICATIVE, vec![required("a", t), required("b", t)], t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Operator("%".into()));
    }

    let equality_all = ["int16", "int32", "int64", "float32", "float64", "bigint", "decimal", "str", "bool", "bytes", "uuid", "datetime", "local_datetime", "local_date", "local_time", "duration"];
    for name in equality_all {
        let t = ty(cat, name);
        push_operator(cat, STD_MODULE, "=", OperatorKind::Infix, prec::COMPARISON, vec![required("a", t), required("b", t)], bool_t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Operator("=".into()));
        push_operator(cat, STD_MODULE, "!=", OperatorKind::Infix, prec::COMPARISON, vec![required("a", t), required("b", t)], bool_t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Operator("<>".into()));
        push_operator(cat, STD_MODULE, "?=", OperatorKind::Infix, prec::COMPARISON, vec![required("a", t), required("b", t)], bool_t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Template("({0} IS NOT DISTINCT FROM {1})".into()));
        push_operator(cat, STD_MODULE, "?!=", OperatorKind::Infix, prec::COMPARISON, vec![required("a", t), required("b", t)], bool_t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Template("({0} IS DISTINCT FROM {1})".into()));
        // `is`/`is not` resolve to the same "not distinct from" semantics
        // as `?=`/`?!=` (spec.md §3.1 lists them among comparison
        // operators but §4.5 never defines them separately from equality;
        // decided in DESIGN.md rather than guessed silently).
        push_operator(cat, STD_MODULE, "is", OperatorKind::Infix, prec::IS, vec![required("a", t), required("b", t)], bool_t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Template("({0} IS NOT DISTINCT FROM {1})".into()));
        push_operator(cat, STD_MODULE, "is not", OperatorKind::Infix, prec::IS, vec![required("a", t), required("b", t)], bool_t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Template("({0} IS DISTINCT FROM {1})".into()));
    }
    let orderable = ["int16", "int32", "int64", "float32", "float64", "bigint", "decimal", "str", "datetime", "local_datetime", "local_date", "local_time", "duration"];
    for name in orderable {
        let t = ty(cat, name);
        push_operator(cat, STD_MODULE, "<", OperatorKind::Infix, prec::COMPARISON, vec![required("a", t), required("b", t)], bool_t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Operator("<".into()));
        push_operator(cat, STD_MODULE, ">", OperatorKind::Infix, prec::COMPARISON, vec![required("a", t), required("b", t)], bool_t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Operator(">".into()));
        push_operator(cat, STD_MODULE, "<=", OperatorKind::Infix, prec::COMPARISON, vec![required("a", t), required("b", t)], bool_t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Operator("<=".into()));
        push_operator(cat, STD_MODULE, ">=", OperatorKind::Infix, prec::COMPARISON, vec![required("a", t), required("b", t)], bool_t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Operator(">=".into()));
    }

    let str_t = ty(cat, "str");
    push_operator(cat, STD_MODULE, "like", OperatorKind::Infix, prec::LIKE, vec![required("a", str_t), required("b", str_t)], bool_t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Operator("LIKE".into()));
    push_operator(cat, STD_MODULE, "not like", OperatorKind::Infix, prec::LIKE, vec![required("a", str_t), required("b", str_t)], bool_t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Operator("NOT LIKE".into()));
    push_operator(cat, STD_MODULE, "ilike", OperatorKind::Infix, prec::LIKE, vec![required("a", str_t), required("b", str_t)], bool_t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Operator("ILIKE".into()));
    push_operator(cat, STD_MODULE, "not ilike", OperatorKind::Infix, prec::LIKE, vec![required("a", str_t), required("b", str_t)], bool_t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Operator("NOT ILIKE".into()));
    push_operator(cat, STD_MODULE, "++", OperatorKind::Infix, prec::ADDITIVE, vec![required("a", str_t), required("b", str_t)], str_t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Operator("||".into()));
    let bytes_t = ty(cat, "bytes");
    push_operator(cat, STD_MODULE, "++", OperatorKind::Infix, prec::ADDITIVE, vec![required("a", bytes_t), required("b", bytes_t)], bytes_t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Operator("||".into()));

    for elem in ["str", "int64"] {
        let elem_t = ty(cat, elem);
        let array_t = TypeRef::Collection(cat.collections.intern(CollectionShape::Array(elem_t)));
        push_operator(cat, STD_MODULE, "++", OperatorKind::Infix, prec::ADDITIVE, vec![required("a", array_t), required("b", array_t)], array_t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Operator("||".into()));
        push_operator(cat, STD_MODULE, "in", OperatorKind::Infix, prec::IN, vec![required("a", elem_t), required("b", array_t)], bool_t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Template("({0} = ANY({1}))".into()));
        push_operator(cat, STD_MODULE, "not in", OperatorKind::Infix, prec::IN, vec![required("a", elem_t), required("b", array_t)], bool_t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Template("(NOT ({0} = ANY({1})))".into()));
    }
}

fn push_function(cat: &mut Catalog, module: &str, name: &str, params: Vec<Param>, return_type: TypeRef, return_modifier: ReturnModifier, volatility: Volatility, lowering: SqlLowering) {
    let id = crate::entity::FunctionId(cat.functions.len() as u32);
    let func = Function { id, module: module.to_string(), name: name.to_string(), params, return_type, return_modifier, volatility, lowering };
    let qual = func.qualified_name();
    cat.functions.push(func);
    cat.functions_by_qualname.entry(qual).or_default().push(id);
}

fn seed_functions(cat: &mut Catalog) {
    let int64_t = ty(cat, "int64");
    let float64_t = ty(cat, "float64");
    let bool_t = ty(cat, "bool");
    let str_t = ty(cat, "str");
    let bytes_t = ty(cat, "bytes");
    // Nominal-placeholder-parameter aggregates (module doc comment above
    // explains why `std::str` stands in for a true `anytype`).
    push_function(cat, STD_MODULE, "count", vec![set_of("elements", str_t)], int64_t, ReturnModifier::SingletonType, Volatility::Immutable, SqlLowering::FunctionName("count".into()));
    push_function(cat, STD_MODULE, "sum", vec![set_of("elements", float64_t)], float64_t, ReturnModifier::SingletonType, Volatility::Immutable, SqlLowering::FunctionName("sum".into()));
    push_function(cat, STD_MODULE, "min", vec![set_of("elements", float64_t)], float64_t, ReturnModifier::SingletonType, Volatility::Immutable, SqlLowering::FunctionName("min".into()));
    push_function(cat, STD_MODULE, "max", vec![set_of("elements", float64_t)], float64_t, ReturnModifier::SingletonType, Volatility::Immutable, SqlLowering::FunctionName("max".into()));
    push_function(cat, STD_MODULE, "exists", vec![set_of("elements", str_t)], bool_t, ReturnModifier::SingletonType, Volatility::Immutable, SqlLowering::Template("(EXISTS ({0}))".into()));
    let array_str = TypeRef::Collection(cat.collections.intern(CollectionShape::Array(str_t)));
    push_function(cat, STD_MODULE, "array_agg", vec![set_of("elements", str_t)], array_str, ReturnModifier::SingletonType, Volatility::Immutable, SqlLowering::FunctionName("array_agg".into()));

    push_function(cat, STD_MODULE, "len", vec![required("value", str_t)], int64_t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::FunctionName("length".into()));
    push_function(cat, STD_MODULE, "len", vec![required("value", bytes_t)], int64_t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::FunctionName("octet_length".into()));
    push_function(cat, STD_MODULE, "contains", vec![required("haystack", str_t), required("needle", str_t)], bool_t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::Template("(position({1} in {0}) > 0)".into()));
    push_function(cat, STD_MODULE, "upper", vec![required("value", str_t)], str_t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::FunctionName("upper".into()));
    push_function(cat, STD_MODULE, "lower", vec![required("value", str_t)], str_t, ReturnModifier::OptionalType, Volatility::Immutable, SqlLowering::FunctionName("lower".into()));
    push_function(cat, STD_MODULE, "random", vec![], float64_t, ReturnModifier::SingletonType, Volatility::Volatile, SqlLowering::FunctionName("random".into()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::CatalogBuilder;
    use crate::catalog::OverloadResolution;

    fn catalog() -> Catalog {
        CatalogBuilder::new().build().expect("empty schema still seeds std")
    }

    #[test]
    fn equality_operator_resolves_for_int64() {
        let cat = catalog();
        let int64_t = ty(&cat, "int64");
        let candidates = cat.operators_named("std::=").to_vec();
        assert!(!candidates.is_empty());
        match cat.resolve_operator_overload(&candidates, &[int64_t, int64_t]) {
            OverloadResolution::Unique(id) => assert_eq!(cat.operator(id).return_type, ty(&cat, "bool")),
            OverloadResolution::None => panic!("std::= should resolve for (int64, int64)"),
            OverloadResolution::Ambiguous => panic!("std::= should not be ambiguous for (int64, int64)"),
        }
    }

    #[test]
    fn implicit_widening_int64_to_float64_exists() {
        let cat = catalog();
        let cast = cat.find_cast(ty(&cat, "int64"), ty(&cat, "float64")).expect("int64 -> float64 must be a cast entity");
        assert!(cast.allow_implicit, "spec.md §4.5 names this exact widening as implicit");
    }

    #[test]
    fn count_resolves_regardless_of_declared_placeholder_type() {
        let cat = catalog();
        let candidates = cat.functions_named("std::count").to_vec();
        let uuid_t = ty(&cat, "uuid");
        match cat.resolve_function_overload(&candidates, &[uuid_t]) {
            OverloadResolution::Unique(_) => {}
            _ => panic!("count() should resolve for any argument type via the permissive overload cost"),
        }
    }

    #[test]
    fn no_two_overloads_share_a_signature_modulo_cast_promotion() {
        // spec.md §3.2 invariant 5. A spot check on `=`: two distinct
        // scalar overloads must not tie when matched against one of their
        // own exact argument types (each exact match costs 0, every other
        // overload costs 1, so there is always a unique winner).
        let cat = catalog();
        let str_t = ty(&cat, "str");
        let candidates = cat.operators_named("std::=").to_vec();
        assert!(matches!(cat.resolve_operator_overload(&candidates, &[str_t, str_t]), OverloadResolution::Unique(_)));
    }
}
