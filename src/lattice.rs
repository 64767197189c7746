//! Class registry and conforming sets (spec §4.1), and deterministic layering (spec §4.2).
//!
//! Grounded on `virtuals/construct.rs`'s `construct_inheritance_tree`/`index_tree`: build a
//! [`Graph`] over the classes that matter for this update, then walk it deterministically.
//! Unlike the teacher (single Java inheritance, exactly one root), this lattice can have
//! multiple roots and diamond-shaped multiple inheritance through interfaces, so layering uses
//! general topological sort instead of a single recursive tree descent.

use crate::class::{ClassId, ClassTable};
use crate::error::UpdateError;
use crate::graph::{Graph, NodeId, NodeMap, NodeSet};
use itertools::Itertools;
use std::collections::HashMap;

/// The sublattice of [`ClassTable`] that participates in this update's methods/specializations,
/// plus everything computed from it: direct-base/derived edges, a deterministic topological
/// layering, and per-node conforming sets.
pub struct Lattice {
    /// Nodes are participant [`ClassId`]s; edges run direct-base -> direct-derived.
    pub graph: Graph<ClassId>,
    pub node_of: HashMap<ClassId, NodeId>,
    /// Bases-before-derived order, ties broken by class name (spec §4.2).
    pub layered: Vec<NodeId>,
    conforming: NodeMap<NodeSet>,
}

impl Lattice {
    /// `seeds` are every [`ClassId`] that appears as a method's or specialization's virtual
    /// parameter type (spec §4.1 "Seeding"). Scooping and edge construction happen here too.
    pub fn build(classes: &ClassTable, seeds: &NodeSet0) -> Result<Lattice, UpdateError> {
        // Scooping: `ClassTable` hands out ids in registration order, and a class's bases must
        // already hold ids by the time it's registered (`register_class` takes `&[ClassId]`), so
        // iterating ids in increasing order is already a valid base-before-derived traversal.
        // That lets "a class participates iff it's seeded or some direct base participates" be
        // computed in a single forward pass, rather than the two-phase seed-then-expand the spec
        // prose suggests.
        let mut participates = vec![false; classes.len()];
        for id in classes.iter() {
            participates[id.index()] = seeds.contains(id.index())
                || classes
                    .bases(id)
                    .iter()
                    .any(|&base| participates[base.index()]);
        }

        let mut graph = Graph::new();
        let mut node_of = HashMap::new();
        for id in classes.iter() {
            if participates[id.index()] {
                let node = graph.add_node(id);
                node_of.insert(id, node);
            }
        }

        // Edges: a base becomes a direct-base edge only if it is itself registered.
        for (&class, &node) in &node_of {
            for &base in classes.bases(class) {
                if let Some(&base_node) = node_of.get(&base) {
                    graph.add_edge(base_node, node);
                }
            }
        }

        let layered = layer(&graph, classes)?;
        let conforming = conforming_sets(&graph, &layered);

        Ok(Lattice {
            graph,
            node_of,
            layered,
            conforming,
        })
    }

    /// The conforming set of `class`: itself plus every transitive subclass (spec §4.1).
    /// Returns `None` if `class` didn't participate in this update.
    pub fn conforming(&self, class: ClassId) -> Option<&NodeSet> {
        let node = *self.node_of.get(&class)?;
        self.conforming.get(node)
    }

    pub fn node(&self, class: ClassId) -> Option<NodeId> {
        self.node_of.get(&class).copied()
    }

    pub fn class_of(&self, node: NodeId) -> ClassId {
        self.graph[node].value
    }
}

/// Minimal seed set: which [`ClassId`]s (by raw index) are directly named as a virtual parameter
/// somewhere. Kept distinct from [`NodeSet`] (which indexes by [`NodeId`]) because seeding happens
/// before any [`Graph`] exists.
pub struct NodeSet0 {
    bits: Vec<bool>,
}

impl NodeSet0 {
    pub fn new(capacity: usize) -> Self {
        Self {
            bits: vec![false; capacity],
        }
    }

    pub fn insert(&mut self, id: ClassId) {
        if id.index() >= self.bits.len() {
            self.bits.resize(id.index() + 1, false);
        }
        self.bits[id.index()] = true;
    }

    fn contains(&self, index: usize) -> bool {
        self.bits.get(index).copied().unwrap_or(false)
    }
}

/// Bases-before-derived layering with a deterministic, name-sorted tie-break (spec §4.2).
fn layer(graph: &Graph<ClassId>, classes: &ClassTable) -> Result<Vec<NodeId>, UpdateError> {
    let mut remaining_in_degree: NodeMap<usize> =
        graph.iter().map(|n| (n.id, n.in_degree())).collect();
    let mut layered = Vec::with_capacity(graph.len());
    let mut pending: Vec<NodeId> = graph
        .iter()
        .filter(|n| n.in_degree() == 0)
        .map(|n| n.id)
        .collect();

    while !pending.is_empty() {
        // Deterministic tie-break: sort the ready set by class name.
        pending.sort_by_key(|&id| classes.name(graph[id].value).clone());
        let mut next_pending = Vec::new();
        for node in pending.drain(..) {
            layered.push(node);
            for &succ in &graph[node].successors {
                let remaining = remaining_in_degree.get(succ).copied().unwrap();
                if remaining == 1 {
                    next_pending.push(succ);
                } else {
                    remaining_in_degree.insert(succ, remaining - 1);
                }
            }
        }
        pending = next_pending;
    }

    if layered.len() != graph.len() {
        return Err(UpdateError::LatticeCycle);
    }
    Ok(layered)
}

/// Conforming sets, computed in reverse topological order (spec §4.1): `conforming(C) = {C} ∪
/// ⋃ conforming(D)` for every direct-derived `D`.
fn conforming_sets(graph: &Graph<ClassId>, layered: &[NodeId]) -> NodeMap<NodeSet> {
    let mut sets = NodeMap::with_capacity_for(graph);
    for &node in layered.iter().rev() {
        let mut set = NodeSet::with_capacity_for(graph);
        set.insert(node);
        for &succ in &graph[node].successors {
            let succ_set = sets.get(succ).expect("derived already processed");
            set.union_with(succ_set);
        }
        sets.insert(node, set);
    }
    sets
}

/// Formats a lattice as Graphviz DOT for the `ommctl --graph` option, labelling nodes by class
/// name instead of raw [`ClassId`] (spec §4.11/§6 "Diagnostic surface").
pub fn lattice_as_dot(lattice: &Lattice, classes: &ClassTable) -> String {
    let named = lattice.graph.map(|_, &id| classes.name(id).to_string());
    named.as_dot(&crate::graph::DotOptions {
        omit_node_ids: true,
        omit_branch_ids: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes_diamond() -> (ClassTable, ClassId, ClassId, ClassId, ClassId) {
        let mut t = ClassTable::new();
        let a = t.register_class("A", &[]);
        let b = t.register_class("B", &[a]);
        let c = t.register_class("C", &[a]);
        let d = t.register_class("D", &[b, c]);
        (t, a, b, c, d)
    }

    #[test]
    fn layers_bases_before_derived() {
        let (classes, a, b, c, d) = classes_diamond();
        let mut seeds = NodeSet0::new(classes.len());
        seeds.insert(a);
        let lattice = Lattice::build(&classes, &seeds).unwrap();
        let positions: HashMap<ClassId, usize> = lattice
            .layered
            .iter()
            .enumerate()
            .map(|(i, &n)| (lattice.class_of(n), i))
            .collect();
        assert!(positions[&a] < positions[&b]);
        assert!(positions[&a] < positions[&c]);
        assert!(positions[&b] < positions[&d]);
        assert!(positions[&c] < positions[&d]);
    }

    #[test]
    fn conforming_set_includes_diamond_descendant_once() {
        let (classes, a, _b, _c, d) = classes_diamond();
        let mut seeds = NodeSet0::new(classes.len());
        seeds.insert(a);
        let lattice = Lattice::build(&classes, &seeds).unwrap();
        let conforming_a = lattice.conforming(a).unwrap();
        assert!(conforming_a.contains(lattice.node(d).unwrap()));
        assert_eq!(conforming_a.len(), 4);
    }

    #[test]
    fn unseeded_classes_are_dropped() {
        let mut classes = ClassTable::new();
        let a = classes.register_class("A", &[]);
        let _unrelated = classes.register_class("Unrelated", &[]);
        let mut seeds = NodeSet0::new(classes.len());
        seeds.insert(a);
        let lattice = Lattice::build(&classes, &seeds).unwrap();
        assert_eq!(lattice.graph.len(), 1);
    }

    #[test]
    fn cycle_is_rejected() {
        // Cycles can't be built through the public ClassTable API (bases must already have ids),
        // so construct one directly against the graph/layer() pair to exercise the error path.
        let mut classes = ClassTable::new();
        let a = classes.register_class("A", &[]);
        let b = classes.register_class("B", &[a]);
        let mut graph = Graph::new();
        let na = graph.add_node(a);
        let nb = graph.add_node(b);
        graph.add_edge(na, nb);
        graph.add_edge(nb, na);
        let result = layer(&graph, &classes);
        assert_eq!(result, Err(UpdateError::LatticeCycle));
    }
}
