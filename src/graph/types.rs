use std::mem::take;
use std::{fmt, ops};

#[inline]
pub fn remove_element<T: PartialEq + Copy>(vec: &mut Vec<T>, value: T) {
    let index = vec.iter().position(|&x| x == value).expect("Not found");
    vec.remove(index);
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NodeId(pub(crate) usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Node<T> {
    pub id: NodeId,
    pub value: T,
    pub predecessors: Vec<NodeId>, // Incoming (direct bases, for our inheritance graphs)
    pub successors: Vec<NodeId>,   // Outgoing (direct derived)
}

impl<T> Node<T> {
    #[inline]
    pub fn in_degree(&self) -> usize {
        self.predecessors.len()
    }

    #[inline]
    pub fn out_degree(&self) -> usize {
        self.successors.len()
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Graph<T> {
    // Nodes are deleted infrequently, so store deletions as `None` tombstones.
    // This gives us constant time lookup by NodeId.
    nodes: Vec<Option<Node<T>>>,
    pub entry: Option<NodeId>,
}

impl<T> Default for Graph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ops::Index<NodeId> for Graph<T> {
    type Output = Node<T>;

    fn index(&self, index: NodeId) -> &Self::Output {
        self.nodes[index.0].as_ref().expect("Not found")
    }
}

impl<T> ops::IndexMut<NodeId> for Graph<T> {
    fn index_mut(&mut self, index: NodeId) -> &mut Self::Output {
        self.nodes[index.0].as_mut().expect("Not found")
    }
}

impl<T> IntoIterator for Graph<T> {
    type Item = Node<T>;
    type IntoIter = std::iter::FilterMap<
        std::vec::IntoIter<Option<Node<T>>>,
        fn(Option<Node<T>>) -> Option<Node<T>>,
    >;

    fn into_iter(self) -> Self::IntoIter {
        // Filter out deleted nodes
        self.nodes.into_iter().filter_map(|x| x)
    }
}

impl<T> Graph<T> {
    pub fn new() -> Self {
        Self {
            nodes: vec![],
            entry: None,
        }
    }

    pub fn add_node(&mut self, value: T) -> NodeId {
        let id = NodeId(self.nodes.len());
        let node = Node {
            id,
            value,
            predecessors: vec![],
            successors: vec![],
        };
        self.nodes.push(Some(node));

        // Set as entrypoint if this is the first inserted node
        self.entry.get_or_insert(id);

        id
    }

    pub fn add_edge(&mut self, source: NodeId, target: NodeId) {
        self[source].successors.push(target);
        self[target].predecessors.push(source);
    }

    pub fn remove_node(&mut self, id: NodeId) {
        // take() node leaving None as tombstone
        let node = self.nodes[id.0].take().expect("Not found");
        // Remove node as successor from all predecessors
        for pred in node.predecessors {
            if pred != id {
                remove_element(&mut self[pred].successors, id);
            }
        }
        // Remove node as predecessor from all successors
        for succ in node.successors {
            if succ != id {
                remove_element(&mut self[succ].predecessors, id);
            }
        }
    }

    pub fn remove_all_successors(&mut self, source: NodeId) {
        for succ in take(&mut self[source].successors) {
            remove_element(&mut self[succ].predecessors, source);
        }
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Node<T>> {
        // Filter out deleted nodes
        self.nodes.iter().filter_map(Option::as_ref)
    }

    #[inline]
    pub fn iter_id(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.iter().map(|x| &x.id).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of [`NodeId`] slots ever allocated, including tombstoned (removed) nodes.
    ///
    /// Used to pre-size [`NodeSet`](super::NodeSet) without reallocating as nodes are visited,
    /// since `NodeId`s remain valid indices forever.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    pub fn map<U, F: Fn(NodeId, &T) -> U>(&self, f: F) -> Graph<U> {
        let nodes = self
            .nodes
            .iter()
            .map(|maybe_node| {
                maybe_node.as_ref().map(|node| Node {
                    id: node.id,
                    value: f(node.id, &node.value),
                    predecessors: node.predecessors.clone(),
                    successors: node.successors.clone(),
                })
            })
            .collect();
        Graph {
            nodes,
            entry: self.entry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;

    fn fixture_chain() -> (Graph<usize>, (NodeId, NodeId, NodeId)) {
        let mut g = Graph::new();
        let n1 = g.add_node(1);
        let n2 = g.add_node(2);
        let n3 = g.add_node(3);
        g.add_edge(n1, n2);
        g.add_edge(n2, n3);
        (g, (n1, n2, n3))
    }

    #[test]
    fn test_add_nodes_edges() {
        let (g, (n1, n2, n3)) = fixture_chain();
        assert_eq!(g.len(), 3);
        assert_eq!(g[n2].predecessors, vec![n1]);
        assert_eq!(g[n2].successors, vec![n3]);
        assert_eq!(g.iter().map(|x| x.value).collect_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn test_remove_node() {
        let (mut g, (n1, n2, n3)) = fixture_chain();
        g.remove_node(n2);
        assert_eq!(g.len(), 2);
        assert_eq!(g[n1].successors, vec![]);
        assert_eq!(g[n3].predecessors, vec![]);
        assert_eq!(g.capacity(), 3);
    }

    #[test]
    fn test_remove_all_successors() {
        let (mut g, (n1, n2, _n3)) = fixture_chain();
        g.remove_all_successors(n1);
        assert_eq!(g[n1].successors, vec![]);
        assert_eq!(g[n2].predecessors, vec![]);
    }

    #[test]
    fn test_diamond() {
        // A <: B, A <: C, B <: D, C <: D (diamond inheritance)
        let mut g = Graph::new();
        let a = g.add_node("A");
        let b = g.add_node("B");
        let c = g.add_node("C");
        let d = g.add_node("D");
        g.add_edge(a, b);
        g.add_edge(a, c);
        g.add_edge(b, d);
        g.add_edge(c, d);
        assert_eq!(g[d].predecessors.len(), 2);
        assert_eq!(g[a].out_degree(), 2);
    }
}
