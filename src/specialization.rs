//! Most-specific selection (spec §4.6): the partial order over applicable specializations, and
//! the fold that picks a winner or reports ambiguity/no-match.
//!
//! No direct teacher analog - the teacher's single-inheritance virtual dispatch never needs
//! overload resolution, since a class has exactly one applicable override per method. This module
//! implements the spec's partial order directly: `a ≻ b` iff every parameter of `a` is equal to or
//! narrower than the corresponding parameter of `b`, and at least one is strictly narrower.

use crate::class::ClassId;
use crate::lattice::Lattice;
use crate::registry::SpecId;

/// `true` iff `a` is strictly more specific than `b`: `a`'s declared class conforms into `b`'s in
/// every dimension, and strictly so in at least one.
pub fn is_more_specific(lattice: &Lattice, a: &[ClassId], b: &[ClassId]) -> bool {
    debug_assert_eq!(a.len(), b.len());
    let mut any_strict = false;
    for (&ai, &bi) in a.iter().zip(b) {
        if ai == bi {
            continue;
        }
        let Some(b_conforming) = lattice.conforming(bi) else {
            return false;
        };
        let Some(a_node) = lattice.node(ai) else {
            return false;
        };
        if !b_conforming.contains(a_node) {
            return false;
        }
        any_strict = true;
    }
    any_strict
}

/// The result of folding a set of applicable specializations down to a single winner.
#[derive(Debug, Eq, PartialEq)]
pub enum Selection {
    /// No registered specialization applies to this call at all.
    NotImplemented,
    /// Exactly one specialization is more specific than every other applicable one.
    Unique(SpecId),
    /// Two or more applicable specializations are incomparable; listed for diagnostics.
    Ambiguous(Vec<SpecId>),
}

/// Picks the most specific specialization among `applicable`, each given as its id plus its
/// tuple of declared virtual-parameter classes (spec §4.6 "best set").
///
/// A specialization survives into the best set iff no other applicable specialization is more
/// specific than it. Exactly one survivor is a clean win; more than one is ambiguous (they must
/// be pairwise incomparable, since a strict order among survivors would have eliminated one).
pub fn select_best(lattice: &Lattice, applicable: &[(SpecId, Vec<ClassId>)]) -> Selection {
    if applicable.is_empty() {
        return Selection::NotImplemented;
    }
    let mut survivors: Vec<SpecId> = Vec::new();
    for (i, (id, vp)) in applicable.iter().enumerate() {
        let dominated = applicable
            .iter()
            .enumerate()
            .any(|(j, (_, other_vp))| i != j && is_more_specific(lattice, other_vp, vp));
        if !dominated {
            survivors.push(*id);
        }
    }
    match survivors.len() {
        1 => Selection::Unique(survivors[0]),
        _ => Selection::Ambiguous(survivors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassTable;
    use crate::lattice::NodeSet0;

    fn single_dim_lattice() -> (ClassTable, Lattice, ClassId, ClassId, ClassId) {
        let mut classes = ClassTable::new();
        let animal = classes.register_class("Animal", &[]);
        let dog = classes.register_class("Dog", &[animal]);
        let pitbull = classes.register_class("Pitbull", &[dog]);
        let mut seeds = NodeSet0::new(classes.len());
        seeds.insert(animal);
        let lattice = Lattice::build(&classes, &seeds).unwrap();
        (classes, lattice, animal, dog, pitbull)
    }

    #[test]
    fn more_derived_single_dimension_wins() {
        let (_c, lattice, animal, dog, _pitbull) = single_dim_lattice();
        assert!(is_more_specific(&lattice, &[dog], &[animal]));
        assert!(!is_more_specific(&lattice, &[animal], &[dog]));
        assert!(!is_more_specific(&lattice, &[animal], &[animal]));
    }

    #[test]
    fn select_best_picks_the_most_derived_applicable() {
        let (_c, lattice, animal, dog, pitbull) = single_dim_lattice();
        let applicable = vec![
            (SpecId(0), vec![animal]),
            (SpecId(1), vec![dog]),
            (SpecId(2), vec![pitbull]),
        ];
        assert_eq!(select_best(&lattice, &applicable), Selection::Unique(SpecId(2)));
    }

    #[test]
    fn incomparable_specializations_are_ambiguous() {
        // A diamond: D <: B, C. A spec on B and a spec on C are both applicable to a D instance
        // and incomparable, since neither conforms into the other.
        let mut classes = ClassTable::new();
        let a = classes.register_class("A", &[]);
        let b = classes.register_class("B", &[a]);
        let c = classes.register_class("C", &[a]);
        let _d = classes.register_class("D", &[b, c]);
        let mut seeds = NodeSet0::new(classes.len());
        seeds.insert(a);
        let lattice = Lattice::build(&classes, &seeds).unwrap();

        let applicable = vec![(SpecId(0), vec![b]), (SpecId(1), vec![c])];
        match select_best(&lattice, &applicable) {
            Selection::Ambiguous(mut ids) => {
                ids.sort_by_key(|s| s.0);
                assert_eq!(ids, vec![SpecId(0), SpecId(1)]);
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn empty_applicable_set_is_not_implemented() {
        let (_c, lattice, _animal, _dog, _pitbull) = single_dim_lattice();
        assert_eq!(select_best(&lattice, &[]), Selection::NotImplemented);
    }
}
