use indoc::indoc;
use ql_catalog::{Catalog, CatalogBuilder};
use ql_compiler::{compile, compile_script, CancellationToken, CollectingWarningSink, CompileOptions, NullWarningSink, Snapshot};
use ql_ir::Cardinality;

fn catalog_from_sdl(sdl: &str) -> Catalog {
    let script = ql_parser::parse_script(sdl).expect("sdl parses");
    let mut builder = CatalogBuilder::new();
    builder.add_script("default", &script);
    builder.build().expect("sdl builds without diagnostics")
}

fn empty_snapshot() -> Snapshot {
    Snapshot::new(CatalogBuilder::new().build().unwrap())
}

fn user_friends_snapshot() -> Snapshot {
    Snapshot::new(catalog_from_sdl("type User { required name: str; multi friends: User; }"))
}

fn user_names_snapshot() -> Snapshot {
    Snapshot::new(catalog_from_sdl("type User { required first_name: str; required last_name: str; }"))
}

// Scenario 1: `select {1, 2, 3}` is a literal `int64` set.
#[test]
fn literal_set_compiles_to_many_int64() {
    let snap = empty_snapshot();
    let opts = CompileOptions::builder().build();
    let mut sink = NullWarningSink;
    let cancel = CancellationToken::new();
    let plan = compile(&snap, "select {1, 2, 3}", &opts, &mut sink, &cancel).expect("compiles");
    assert_eq!(plan.cardinality, Cardinality::Many);
    assert_eq!(plan.result_type.as_catalog().map(|ty| snap.catalog().type_name(ty)), Some("int64".to_string()));
    assert!(plan.sql.to_uppercase().contains("SELECT"));
}

// Scenario 2: concatenating two string sets is a cross product, not a zip,
// so compiling it is still `Many`-cardinality over `str`.
#[test]
fn string_concat_is_many_str() {
    let snap = empty_snapshot();
    let opts = CompileOptions::builder().build();
    let mut sink = NullWarningSink;
    let cancel = CancellationToken::new();
    let plan = compile(&snap, "select {'aaa', 'bbb'} ++ {'ccc', 'ddd'}", &opts, &mut sink, &cancel).expect("compiles");
    assert_eq!(plan.cardinality, Cardinality::Many);
    assert_eq!(plan.result_type.as_catalog().map(|ty| snap.catalog().type_name(ty)), Some("str".to_string()));
}

// Scenario 3: `User.friends.name` through a `multi` self-link stays `Many`
// even though each `User.friends` step is itself `multi`.
#[test]
fn path_through_multi_link_stays_many() {
    let snap = user_friends_snapshot();
    let opts = CompileOptions::builder().build();
    let mut sink = NullWarningSink;
    let cancel = CancellationToken::new();
    let plan = compile(&snap, "select User.friends.name", &opts, &mut sink, &cancel).expect("compiles");
    assert_eq!(plan.cardinality, Cardinality::Many);
    assert_eq!(plan.result_type.as_catalog().map(|ty| snap.catalog().type_name(ty)), Some("str".to_string()));
}

// Scenario 4: a shape with a computed `count(.friends)` attribute and an
// `order by` clause still compiles to a `Many`-cardinality plan (selecting
// from an unfiltered object type is itself a set).
#[test]
fn shape_with_aggregate_and_order_by_compiles() {
    let snap = user_friends_snapshot();
    let opts = CompileOptions::builder().build();
    let mut sink = NullWarningSink;
    let cancel = CancellationToken::new();
    let plan = compile(&snap, "select User { name, friend_count := count(.friends) } order by .name", &opts, &mut sink, &cancel).expect("compiles");
    assert_eq!(plan.cardinality, Cardinality::Many);
}

// Scenario 5: `for n in {...} union (insert User { name := n })` inserts
// one row per loop element and returns their ids, still `Many`.
#[test]
fn for_union_insert_compiles() {
    let snap = user_friends_snapshot();
    let opts = CompileOptions::builder().build();
    let mut sink = NullWarningSink;
    let cancel = CancellationToken::new();
    let plan = compile(&snap, "for n in {'x', 'y', 'z'} union (insert User { name := n })", &opts, &mut sink, &cancel).expect("compiles");
    assert_eq!(plan.cardinality, Cardinality::Many);
}

// Scenario 6: selecting a tuple of two independent properties off the same
// object type diverges between legacy and simple scoping, and is exactly
// the case `warn_old_scoping` exists to flag.
#[test]
fn tuple_scoping_diverges_between_legacy_and_simple() {
    let snap = user_names_snapshot();
    let cancel = CancellationToken::new();
    let source = "select (User.first_name, User.last_name)";

    let legacy_opts = CompileOptions::builder().simple_scoping(false).build();
    let mut sink = NullWarningSink;
    let legacy_plan = compile(&snap, source, &legacy_opts, &mut sink, &cancel).expect("compiles under legacy scoping");

    let simple_opts = CompileOptions::builder().simple_scoping(true).build();
    let simple_plan = compile(&snap, source, &simple_opts, &mut sink, &cancel).expect("compiles under simple scoping");

    assert_ne!(legacy_plan.sql, simple_plan.sql, "legacy and simple scoping must factor the path differently");
}

#[test]
fn warn_old_scoping_flags_the_divergent_tuple_query() {
    let snap = user_names_snapshot();
    let cancel = CancellationToken::new();
    let opts = CompileOptions::builder().simple_scoping(false).warn_old_scoping(true).build();
    let mut sink = CollectingWarningSink(Vec::new());
    let _plan = compile(&snap, "select (User.first_name, User.last_name)", &opts, &mut sink, &cancel).expect("compiles");
    assert!(!sink.0.is_empty(), "warn_old_scoping must flag a query whose meaning differs between scoping modes");
}

// spec.md §6.2: DDL and `configure` statements may not be parameterized.
#[test]
fn ddl_statements_reject_parameters() {
    let snap = empty_snapshot();
    let opts = CompileOptions::builder().build();
    let mut sink = NullWarningSink;
    let cancel = CancellationToken::new();
    let script = "create role Admin { grant := <str>$perm };";
    let result = compile_script(&snap, script, &opts, &mut sink, &cancel);
    assert!(result.is_err(), "a parameterized DDL body must be rejected");
}

#[test]
fn cancellation_is_observed_before_parsing() {
    let snap = empty_snapshot();
    let opts = CompileOptions::builder().build();
    let mut sink = NullWarningSink;
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = compile(&snap, "select 1", &opts, &mut sink, &cancel);
    assert!(result.is_err());
}

#[test]
fn script_compiles_multiple_statements_in_order() {
    let snap = user_friends_snapshot();
    let opts = CompileOptions::builder().build();
    let mut sink = NullWarningSink;
    let cancel = CancellationToken::new();
    let script = indoc! {"
        select User.name;
        select count(User.friends);
    "};
    let compiled = compile_script(&snap, script, &opts, &mut sink, &cancel).expect("compiles");
    assert_eq!(compiled.len(), 2);
}
