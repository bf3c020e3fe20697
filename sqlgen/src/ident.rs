//! Identifier quoting and naming conventions for the backend views and
//! derived tables the generator emits (spec.md §4.6).

use ql_catalog::{Catalog, ObjectId, PointerId};

/// Double-quotes an identifier, doubling any embedded `"` the way every
/// Postgres-flavored SQL builder in the teacher's stack does (quaint's own
/// quoting convention, which the retrieval pack only carries as a
/// manifest dependency, not source — this mirrors it rather than copies
/// it).
pub fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub fn qualified(schema: &str, name: &str) -> String {
    format!("{}.{}", quote(schema), quote(name))
}

/// The backend view name for an object type: `spec.md §4.6`, "every
/// ObjectType is materialized as a backend view." One view per module,
/// named after the type's own short name; the module becomes the SQL
/// schema.
pub fn object_view_name(catalog: &Catalog, id: ObjectId) -> String {
    let obj = catalog.object(id);
    qualified(&obj.module, &obj.name)
}

/// The auxiliary link table backing a `multi` pointer (spec.md §4.6:
/// "stored in an auxiliary table keyed by `(source_id, target_id)` plus
/// link-property columns"). Named after the owner and the pointer so two
/// same-named pointers on different owners don't collide.
pub fn link_table_name(catalog: &Catalog, id: PointerId) -> String {
    let ptr = catalog.pointer(id);
    let owner = catalog.object(ptr.owner);
    qualified(&owner.module, &format!("{}_{}_tbl", owner.name, ptr.name))
}

/// The column name a single-cardinality property/link occupies on its
/// owner's view.
pub fn pointer_column_name(catalog: &Catalog, id: PointerId) -> String {
    quote(&catalog.pointer(id).name)
}

/// A fresh SQL alias, distinct within one generation pass. The generator
/// hands out short, stable, deterministic names (`t0`, `t1`, …) rather than
/// anything derived from user identifiers, since shadowing/collisions in
/// nested correlated subqueries are otherwise hard to rule out statically.
pub struct AliasGen {
    next: u32,
}

impl AliasGen {
    pub fn new() -> Self {
        AliasGen { next: 0 }
    }

    pub fn fresh(&mut self, prefix: &str) -> String {
        let alias = format!("{prefix}{}", self.next);
        self.next += 1;
        alias
    }
}

impl Default for AliasGen {
    fn default() -> Self {
        Self::new()
    }
}
