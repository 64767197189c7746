//! Slot allocation (spec §4.3).
//!
//! Grounded on `virtuals/construct.rs::populate_tree_methods`, which recursively propagates an
//! accumulator down a single-inheritance tree. Here the lattice isn't a tree (interfaces give
//! diamonds), and propagation must reach both ancestors and descendants, so it's a connected-
//! component flood fill over the undirected view of the graph rather than a tree recursion.

use crate::graph::{NodeId, NodeSet};
use crate::lattice::Lattice;
use crate::registry::MethodId;

/// Per-class bookkeeping produced by slot allocation: the next free slot and the first slot
/// actually used by this class (`None` if the class never took one).
#[derive(Debug, Default)]
pub struct SlotTable {
    next_slot: Vec<u32>,
    first_used_slot: Vec<Option<u32>>,
}

impl SlotTable {
    fn new(capacity: usize) -> Self {
        Self {
            next_slot: vec![0; capacity],
            first_used_slot: vec![None; capacity],
        }
    }

    pub fn next_slot(&self, node: NodeId) -> u32 {
        self.next_slot[node.0]
    }

    pub fn first_used_slot(&self, node: NodeId) -> Option<u32> {
        self.first_used_slot[node.0]
    }

    /// Number of Words this class's mtbl needs, or 0 if it never used a slot.
    pub fn mtbl_len(&self, node: NodeId) -> u32 {
        match self.first_used_slot(node) {
            Some(first) => self.next_slot(node) - first,
            None => 0,
        }
    }
}

/// Allocates slots for every (method, virtual-parameter-index) appearance, returning the slot
/// assigned to each appearance plus the resulting per-class [`SlotTable`].
///
/// `appearances` lists, per lattice node, the `(method, param index)` pairs whose declared
/// virtual-parameter class is exactly that node — i.e. only classes directly named as a virtual
/// parameter of some method get an appearance; this is what seeds slot demand, and propagation
/// spreads the reservation out to every class that could actually receive a value there.
pub fn allocate_slots(
    lattice: &Lattice,
    appearances: &[(NodeId, Vec<(MethodId, usize)>)],
) -> (SlotTable, Vec<Vec<u32>>, Vec<usize> /* arities, for sizing */) {
    let capacity = lattice.graph.capacity();
    let mut table = SlotTable::new(capacity);

    // method_slots[method.0][param index] = assigned slot
    let method_count = appearances
        .iter()
        .flat_map(|(_, xs)| xs.iter().map(|(m, _)| m.0 as usize + 1))
        .max()
        .unwrap_or(0);
    let mut method_slots: Vec<Vec<u32>> = vec![vec![]; method_count];
    let arities = vec![0usize; method_count]; // filled by caller; kept here only for API symmetry

    for &node in &lattice.layered {
        let Some((_, params)) = appearances.iter().find(|(n, _)| *n == node) else {
            continue;
        };
        for &(method, index) in params {
            // `propagate` below reserves the slot at `node` itself (it's the first stack entry),
            // so don't bump `next_slot`/`first_used_slot` here too - that would make the
            // debug_assert in `propagate` see an already-advanced cursor for the origin.
            let slot = table.next_slot[node.0];
            let row = &mut method_slots[method.0 as usize];
            if row.len() <= index {
                row.resize(index + 1, 0);
            }
            row[index] = slot;

            propagate(lattice, node, slot, &mut table);
        }
    }

    (table, method_slots, arities)
}

/// Reserves `slot` across the whole conformance-connected component around `origin`: a DFS that
/// treats direct-base and direct-derived edges as undirected, so classes that only ever meet at
/// a shared descendant still end up with disjoint slot rows.
fn propagate(lattice: &Lattice, origin: NodeId, slot: u32, table: &mut SlotTable) {
    let mut visited = NodeSet::with_capacity_for(&lattice.graph);
    let mut stack = vec![origin];
    while let Some(node) = stack.pop() {
        if !visited.insert(node) {
            continue;
        }
        debug_assert!(slot >= table.next_slot[node.0]);
        table.next_slot[node.0] = slot + 1;
        if table.first_used_slot[node.0].is_none() {
            table.first_used_slot[node.0] = Some(slot);
        }
        for &succ in &lattice.graph[node].successors {
            stack.push(succ);
        }
        for &pred in &lattice.graph[node].predecessors {
            stack.push(pred);
        }
    }
}
