//! Next-pointer linking (spec §4.8): for each specialization, the specialization a `next()` call
//! inside it should fall through to.
//!
//! "Next" is computed once per update, not per call: the specialization a given override falls
//! back to is the most specific specialization strictly less specific than itself, among all
//! specializations of the same method — the same override chain every call into that
//! specialization would see, since it's a property of the specialization's own declared
//! signature rather than of any one dynamic call's argument types. This reuses
//! [`crate::specialization`]'s partial order directly.

use crate::class::ClassId;
use crate::registry::SpecId;
use crate::specialization::{select_best, Selection};

/// Computes, for every specialization in `specs` (all specializations of one method), the id of
/// its `next()` target: `None` if no strictly-less-specific specialization of the method exists,
/// or if more than one incomparable candidate ties for next-most-specific.
pub fn link_next(
    lattice: &crate::lattice::Lattice,
    specs: &[(SpecId, Vec<ClassId>)],
) -> Vec<(SpecId, Option<SpecId>)> {
    specs
        .iter()
        .map(|(id, vp)| {
            let candidates: Vec<(SpecId, Vec<ClassId>)> = specs
                .iter()
                .filter(|(_, other_vp)| crate::specialization::is_more_specific(lattice, vp, other_vp))
                .cloned()
                .collect();
            let next = match select_best(lattice, &candidates) {
                Selection::Unique(winner) => Some(winner),
                _ => None,
            };
            (*id, next)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassTable;
    use crate::lattice::{Lattice, NodeSet0};

    #[test]
    fn chains_through_three_levels() {
        let mut classes = ClassTable::new();
        let vehicle = classes.register_class("Vehicle", &[]);
        let car = classes.register_class("Car", &[vehicle]);
        let inspector = classes.register_class("Inspector", &[]);
        let state_inspector = classes.register_class("StateInspector", &[inspector]);
        let mut seeds = NodeSet0::new(classes.len());
        seeds.insert(vehicle);
        seeds.insert(inspector);
        let lattice = Lattice::build(&classes, &seeds).unwrap();

        let specs = vec![
            (SpecId(0), vec![vehicle, inspector]),
            (SpecId(1), vec![car, inspector]),
            (SpecId(2), vec![car, state_inspector]),
        ];
        let links: std::collections::HashMap<SpecId, Option<SpecId>> =
            link_next(&lattice, &specs).into_iter().collect();
        assert_eq!(links[&SpecId(2)], Some(SpecId(1)));
        assert_eq!(links[&SpecId(1)], Some(SpecId(0)));
        assert_eq!(links[&SpecId(0)], None);
    }
}
