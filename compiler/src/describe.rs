//! `describe` (spec.md §6.1; shape per SPEC_FULL.md C.4): "produce an
//! input-type and output-type descriptor for binary protocol use." Each
//! descriptor is a tree mirroring the IR's shape/tuple/array nesting, with
//! every leaf carrying a catalog scalar or object reference — enough for a
//! downstream binary-protocol codec generator (out of scope here, per
//! spec.md §1) to walk without re-running the compiler.

use ql_catalog::{Catalog, TypeRef};
use ql_ir::{Arena, Cardinality, IrType, NodeId, NodeKind};

use crate::plan::Plan;

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    Scalar { name: String },
    Object { name: String },
    Array(Box<TypeDescriptor>),
    Tuple(Vec<(Option<String>, TypeDescriptor)>),
    Shape(Vec<(String, TypeDescriptor)>),
}

impl TypeDescriptor {
    fn from_ir_type(catalog: &Catalog, ty: &IrType) -> Self {
        match ty {
            IrType::Catalog(TypeRef::Object(id)) => TypeDescriptor::Object { name: catalog.object(*id).qualified_name() },
            IrType::Catalog(other) => TypeDescriptor::Scalar { name: catalog.type_name(*other) },
            IrType::FreeObject(fields) => {
                TypeDescriptor::Shape(fields.iter().map(|(name, ty)| (name.clone(), TypeDescriptor::from_ir_type(catalog, ty))).collect())
            }
        }
    }
}

/// Walks the node a root statement ultimately produces, preferring the
/// node's own shape/tuple structure over its bare catalog type when one
/// was built (spec.md §4.5: a `Shape` node "records the element's
/// type/cardinality as an attribute of the output").
fn describe_node(catalog: &Catalog, arena: &Arena, id: NodeId) -> TypeDescriptor {
    let node = arena.get(id);
    match &node.kind {
        NodeKind::Shape { elements, .. } => {
            TypeDescriptor::Shape(elements.iter().map(|attr| (attr.name.clone(), TypeDescriptor::from_ir_type(catalog, &attr.ty))).collect())
        }
        NodeKind::TupleCtor { elements } => {
            TypeDescriptor::Tuple(elements.iter().map(|(name, elem)| (name.clone(), describe_node(catalog, arena, *elem))).collect())
        }
        NodeKind::ArrayCtor { elements } | NodeKind::SetCtor { elements } => match elements.first() {
            Some(first) => TypeDescriptor::Array(Box::new(describe_node(catalog, arena, *first))),
            None => TypeDescriptor::from_ir_type(catalog, &node.ty),
        },
        _ => TypeDescriptor::from_ir_type(catalog, &node.ty),
    }
}

/// The input descriptor: one named shape element per declared parameter,
/// in the order they first appear in source.
fn describe_params(catalog: &Catalog, arena: &Arena) -> TypeDescriptor {
    let mut fields = Vec::new();
    for (_, node) in arena.iter() {
        if let NodeKind::Param { name, .. } = &node.kind {
            if fields.iter().any(|(n, _): &(String, _)| n == name) {
                continue;
            }
            fields.push((name.clone(), TypeDescriptor::from_ir_type(catalog, &node.ty)));
        }
    }
    TypeDescriptor::Shape(fields)
}

#[derive(Debug, Clone, PartialEq)]
pub struct DescribeResult {
    pub input: TypeDescriptor,
    pub output: TypeDescriptor,
}

/// `describe(plan)` (spec.md §6.1) needs the arena the plan's result type
/// was derived from to recover shape/tuple structure rather than just the
/// root's bare catalog type, so this takes the builder's arena alongside
/// the plan and its root node rather than `Plan` alone.
pub fn describe(catalog: &Catalog, arena: &Arena, root: NodeId, plan: &Plan) -> DescribeResult {
    let output = describe_node(catalog, arena, root);
    let input = describe_params(catalog, arena);
    debug_assert_eq!(plan.cardinality, arena.get(root).cardinality, "plan and arena root must agree on cardinality");
    DescribeResult { input, output }
}

/// A convenience check used by callers deciding whether `expect_one` is
/// satisfiable: true when the plan is statically guaranteed to return at
/// most one row.
pub fn is_singleton_shaped(cardinality: Cardinality) -> bool {
    cardinality.is_bounded()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ql_catalog::CatalogBuilder;
    use ql_ir::{BuildConfig, IrBuilder, ScopingMode, StatementIr};
    use ql_sqlgen::Generator;

    fn catalog(sdl: &str) -> Catalog {
        let script = ql_parser::parse_script(sdl).expect("sdl parses");
        let mut builder = CatalogBuilder::new();
        builder.add_script("default", &script);
        builder.build().expect("sdl builds")
    }

    fn describe_query(cat: &Catalog, src: &str) -> DescribeResult {
        let script = ql_parser::parse_script(src).expect("script parses");
        let builder = IrBuilder::new(cat, BuildConfig { default_module: "default".into(), scoping_mode: ScopingMode::Legacy });
        let program = builder.build_script(&script).expect("script builds");
        let root = match program.statements.as_slice() {
            [StatementIr::Query(id)] => *id,
            other => panic!("expected one query statement, got {other:?}"),
        };
        let mut generator = Generator::new(cat, &program.arena);
        let select = generator.lower_root(root).expect("lowers without an ICE");
        let generated = generator.finish(select);
        let node = program.arena.get(root);
        let plan = Plan::from_generated(generated, node.ty.clone(), node.cardinality, ScopingMode::Legacy);
        describe(cat, &program.arena, root, &plan)
    }

    #[test]
    fn shape_output_describes_each_named_element() {
        let cat = catalog("type User { required name: str; }");
        let result = describe_query(&cat, "select User { name }");
        match result.output {
            TypeDescriptor::Shape(fields) => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].0, "name");
                assert_eq!(fields[0].1, TypeDescriptor::Scalar { name: "std::str".into() });
            }
            other => panic!("expected a shape descriptor, got {other:?}"),
        }
    }

    #[test]
    fn bare_object_output_describes_as_an_object_type() {
        let cat = catalog("type User { required name: str; }");
        let result = describe_query(&cat, "select User");
        assert_eq!(result.output, TypeDescriptor::Object { name: "default::User".into() });
    }

    #[test]
    fn parameters_are_collected_once_per_distinct_name() {
        let cat = catalog("");
        let result = describe_query(&cat, "select (<int64>$n, <int64>$n, <str>$s)");
        match result.input {
            TypeDescriptor::Shape(fields) => {
                let names: Vec<&str> = fields.iter().map(|(n, _)| n.as_str()).collect();
                assert_eq!(names, vec!["n", "s"]);
            }
            other => panic!("expected a shape descriptor, got {other:?}"),
        }
    }

    #[test]
    fn is_singleton_shaped_matches_bounded_cardinalities() {
        assert!(is_singleton_shaped(Cardinality::One));
        assert!(is_singleton_shaped(Cardinality::AtMostOne));
        assert!(!is_singleton_shaped(Cardinality::Many));
        assert!(!is_singleton_shaped(Cardinality::AtLeastOne));
    }
}
