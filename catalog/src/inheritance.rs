//! C3 linearization of the ObjectType inheritance graph (spec.md §3.2
//! invariant 2: "The inheritance graph for ObjectTypes and Pointers is
//! acyclic; linearization uses C3").

use crate::entity::ObjectId;
use diagnostics::{SchemaError, SchemaErrorKind};
use rustc_hash::FxHashMap;

/// Computes the C3 linearization for every type in `bases`, where
/// `bases[t]` lists `t`'s direct bases in declaration order. Returns each
/// type's full MRO (itself first, most-derived to least-derived).
pub fn linearize_all(bases: &FxHashMap<ObjectId, Vec<ObjectId>>) -> Result<FxHashMap<ObjectId, Vec<ObjectId>>, SchemaError> {
    let mut mro: FxHashMap<ObjectId, Vec<ObjectId>> = FxHashMap::default();
    let mut in_progress: Vec<ObjectId> = Vec::new();
    for &id in bases.keys() {
        linearize_one(id, bases, &mut mro, &mut in_progress)?;
    }
    Ok(mro)
}

fn linearize_one(
    id: ObjectId,
    bases: &FxHashMap<ObjectId, Vec<ObjectId>>,
    memo: &mut FxHashMap<ObjectId, Vec<ObjectId>>,
    in_progress: &mut Vec<ObjectId>,
) -> Result<Vec<ObjectId>, SchemaError> {
    if let Some(existing) = memo.get(&id) {
        return Ok(existing.clone());
    }
    if in_progress.contains(&id) {
        return Err(SchemaError::new(
            SchemaErrorKind::Cycle,
            format!("inheritance cycle involving {id}"),
        ));
    }
    in_progress.push(id);
    let direct_bases = bases.get(&id).cloned().unwrap_or_default();
    let mut sequences: Vec<Vec<ObjectId>> = Vec::new();
    for &base in &direct_bases {
        sequences.push(linearize_one(base, bases, memo, in_progress)?);
    }
    sequences.push(direct_bases.clone());
    let merged = c3_merge(sequences).map_err(|()| {
        SchemaError::new(
            SchemaErrorKind::Cycle,
            format!("inconsistent method resolution order for {id}"),
        )
    })?;
    let mut result = vec![id];
    result.extend(merged);
    in_progress.pop();
    memo.insert(id, result.clone());
    Ok(result)
}

fn c3_merge(mut sequences: Vec<Vec<ObjectId>>) -> Result<Vec<ObjectId>, ()> {
    let mut result = Vec::new();
    loop {
        sequences.retain(|s| !s.is_empty());
        if sequences.is_empty() {
            return Ok(result);
        }
        let mut chosen = None;
        'candidates: for seq in &sequences {
            let head = seq[0];
            for other in &sequences {
                if other[1..].contains(&head) {
                    continue 'candidates;
                }
            }
            chosen = Some(head);
            break;
        }
        let Some(head) = chosen else {
            return Err(());
        };
        result.push(head);
        for seq in sequences.iter_mut() {
            if let Some(pos) = seq.iter().position(|&x| x == head) {
                seq.remove(pos);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(n: u32) -> ObjectId {
        ObjectId(n)
    }

    #[test]
    fn linear_chain() {
        // C extends B extends A
        let mut bases = FxHashMap::default();
        bases.insert(oid(0), vec![]); // A
        bases.insert(oid(1), vec![oid(0)]); // B extends A
        bases.insert(oid(2), vec![oid(1)]); // C extends B
        let mro = linearize_all(&bases).unwrap();
        assert_eq!(mro[&oid(2)], vec![oid(2), oid(1), oid(0)]);
    }

    #[test]
    fn diamond_inheritance() {
        // D extends B, C; B extends A; C extends A
        let mut bases = FxHashMap::default();
        bases.insert(oid(0), vec![]); // A
        bases.insert(oid(1), vec![oid(0)]); // B
        bases.insert(oid(2), vec![oid(0)]); // C
        bases.insert(oid(3), vec![oid(1), oid(2)]); // D
        let mro = linearize_all(&bases).unwrap();
        assert_eq!(mro[&oid(3)], vec![oid(3), oid(1), oid(2), oid(0)]);
    }

    #[test]
    fn cycle_is_rejected() {
        let mut bases = FxHashMap::default();
        bases.insert(oid(0), vec![oid(1)]);
        bases.insert(oid(1), vec![oid(0)]);
        assert!(linearize_all(&bases).is_err());
    }
}
