//! Structural collection types, interned by structural identity (spec.md
//! §3.2 invariant 4: "two `array<int64>` references are the same entity").

use crate::entity::{CollectionId, TypeRef};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CollectionShape {
    Array(TypeRef),
    /// Tuple elements, with optional per-element names (named tuples vs.
    /// unnamed, spec.md §6.3).
    Tuple(Vec<(Option<String>, TypeRef)>),
    Range(TypeRef),
    Multirange(TypeRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionType {
    pub id: CollectionId,
    pub shape: CollectionShape,
}

/// Structural interner: looks up or creates a `CollectionId` for a given
/// shape, so two independently-constructed `array<int64>` type
/// expressions always resolve to the same id (spec.md §3.2 invariant 4).
///
/// The catalog owns the interner populated from schema declarations; the
/// IR builder clones it into a per-compilation scratch copy so structural
/// types that appear only in query syntax (e.g. an `<array<int64>>` cast
/// target with no matching schema-declared property) can still intern
/// without mutating the frozen catalog snapshot (spec.md §5).
#[derive(Debug, Default, Clone)]
pub struct CollectionInterner {
    by_shape: FxHashMap<CollectionShape, CollectionId>,
    entries: Vec<CollectionType>,
}

impl CollectionInterner {
    pub fn intern(&mut self, shape: CollectionShape) -> CollectionId {
        if let Some(&id) = self.by_shape.get(&shape) {
            return id;
        }
        let id = CollectionId(self.entries.len() as u32);
        self.entries.push(CollectionType { id, shape: shape.clone() });
        self.by_shape.insert(shape, id);
        id
    }

    pub fn get(&self, id: CollectionId) -> &CollectionType {
        &self.entries[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &CollectionType> {
        self.entries.iter()
    }
}
