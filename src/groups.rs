//! Group finding (spec §4.5): classes that apply to exactly the same set of specializations, for
//! one virtual parameter position, can share a single column of the dispatch tensor.
//!
//! Grounded on `src/graph/collections.rs`'s `NodeSet` (a `bit_set::BitSet` keyed by small
//! integers) — [`SpecMask`] is the same idea, just keyed by specialization index instead of
//! [`crate::graph::NodeId`].

use crate::lattice::Lattice;
use crate::registry::SpecId;
use bit_set::BitSet;
use std::collections::HashMap;
use std::fmt;

/// Bitmask over specialization indices: bit `i` set means specialization `i` is applicable.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct SpecMask(BitSet);

impl SpecMask {
    pub fn empty() -> Self {
        SpecMask(BitSet::new())
    }

    pub fn insert(&mut self, spec: SpecId) {
        self.0.insert(spec.0 as usize);
    }

    pub fn contains(&self, spec: SpecId) -> bool {
        self.0.contains(spec.0 as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Bitwise AND: specializations applicable in every dimension of a multi-virtual call.
    pub fn intersect(&self, other: &SpecMask) -> SpecMask {
        let mut result = self.0.clone();
        result.intersect_with(&other.0);
        SpecMask(result)
    }
}

impl fmt::Debug for SpecMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.iter()).finish()
    }
}

/// One column group for a virtual parameter dimension: the specializations applicable to every
/// member class, and the member classes themselves (by lattice [`crate::graph::NodeId`] index,
/// reusing `usize` to avoid a circular import with `graph`).
#[derive(Debug)]
pub struct Group {
    pub mask: SpecMask,
    pub members: Vec<usize>,
}

/// Partitions every concrete (non-interface) class conforming to `dimension_root` by identical
/// applicability mask across `specs_at_dimension`, where each entry is a specialization's id
/// together with the vp class (at this dimension) it was declared against.
///
/// Concrete classes conform to a specialization's declared vp class iff the declared class's
/// conforming set contains them; equivalently, iff the specialization's declared node lies on
/// the layered path from the dimension root down to the class. We compute membership directly
/// from [`Lattice::conforming`] on each declared vp class, which already encodes exactly that.
pub fn find_groups(
    lattice: &Lattice,
    classes: &crate::class::ClassTable,
    dimension_root: crate::class::ClassId,
    specs_at_dimension: &[(SpecId, crate::class::ClassId)],
) -> Vec<Group> {
    let Some(root_conforming) = lattice.conforming(dimension_root) else {
        return Vec::new();
    };

    let mut mask_of: HashMap<usize, SpecMask> = HashMap::new();
    for node in root_conforming.iter() {
        mask_of.insert(node.0, SpecMask::empty());
    }

    for &(spec_id, vp_class) in specs_at_dimension {
        let Some(applicable) = lattice.conforming(vp_class) else {
            continue;
        };
        for node in applicable.iter() {
            if let Some(mask) = mask_of.get_mut(&node.0) {
                mask.insert(spec_id);
            }
        }
    }

    // Group index assignment must be deterministic (spec §4.5 "Group iteration order is
    // deterministic (insertion order)"): it's baked directly into the published dispatch tensor.
    // `root_conforming.iter()` walks its bitset in ascending node-id order, which is itself fixed
    // by registration order, so scanning it here - rather than a `HashMap`'s iteration order -
    // gives every group a reproducible index run to run.
    let mut groups: Vec<(SpecMask, Vec<usize>)> = Vec::new();
    for node in root_conforming.iter() {
        let class = lattice.class_of(node);
        if classes.is_interface(class) {
            continue;
        }
        let mask = mask_of.remove(&node.0).unwrap_or_else(SpecMask::empty);
        match groups.iter_mut().find(|(m, _)| *m == mask) {
            Some((_, members)) => members.push(node.0),
            None => groups.push((mask, vec![node.0])),
        }
    }

    groups.into_iter().map(|(mask, members)| Group { mask, members }).collect()
}
