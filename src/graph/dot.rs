use crate::graph::Graph;
use itertools::Itertools;
use std::fmt::Debug;

#[derive(Default)]
pub struct DotOptions {
    /// Hide node IDs (including which node is the entrypoint) from the output
    pub omit_node_ids: bool,
    /// Hide branch indices from the output
    pub omit_branch_ids: bool,
}

impl<T: Debug> Graph<T> {
    /// Converts graph to the [Graphviz DOT Language] for visualisation and debugging.
    ///
    /// See [`DotOptions`] for output format options.
    ///
    /// [Graphviz DOT Language]: https://graphviz.org/doc/info/lang.html
    pub fn as_dot(&self, opts: &DotOptions) -> String {
        const FONT_NAME: &str = "fontname=\"Menlo\"";
        const FONT_SIZE: &str = "fontsize=\"12\"";

        // Build iterator for output separated by newlines
        let lines = self.iter().flat_map(|node| {
            // Build label for this node, optionally containing the node ID
            let label = if opts.omit_node_ids {
                format!("{value:?}", value = node.value)
            } else {
                // If we're including node IDs and this is the entrypoint, mark it with an "*"
                let entry = match self.entry {
                    Some(id) if id == node.id => "*",
                    _ => "",
                };
                format!("{id}{entry}\\n{value:?}", id = node.id, value = node.value)
            };
            // Build full, styled DOT string for this node
            let node_string = format!(
                "  {id} [label=\"{label}\",shape=\"box\",{FONT_NAME},{FONT_SIZE}];",
                id = node.id
            );

            // Only show branch indices if this node has more than 1 outgoing edge
            let single_successor = node.out_degree() == 1;
            // Build iterator for all edges' outputs
            let edge_strings = node
                .successors
                .iter()
                .enumerate()
                .map(move |(branch, target)| {
                    // Build label for this edge, only including the branch ID if more than 1
                    // outgoing and not omitting
                    let label = if opts.omit_branch_ids || single_successor {
                        String::new()
                    } else {
                        format!("{branch}")
                    };
                    // Build full, styled DOT string for this edge
                    format!(
                        "  {id} -> {target} [label=\"{label}\",{FONT_NAME},{FONT_SIZE}];",
                        id = node.id
                    )
                });

            // Output node string followed by all edges' strings
            std::iter::once(node_string).chain(edge_strings)
        });
        // Join lines with newlines characters
        let lines = lines.format("\n");

        format!("digraph {{\n{lines}\n}}\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    fn fixture_cyclic() -> Graph<usize> {
        let mut g = Graph::new();
        let n1 = g.add_node(1);
        let n2 = g.add_node(2);
        g.add_edge(n1, n1);
        g.add_edge(n1, n2);
        g.add_edge(n2, n1);
        g
    }

    #[test]
    fn as_dot() {
        let g = fixture_cyclic();
        let dot = g.as_dot(&DotOptions::default());
        assert_eq!(
            dot,
            "digraph {
  0 [label=\"0*\\n1\",shape=\"box\",fontname=\"Menlo\",fontsize=\"12\"];
  0 -> 0 [label=\"0\",fontname=\"Menlo\",fontsize=\"12\"];
  0 -> 1 [label=\"1\",fontname=\"Menlo\",fontsize=\"12\"];
  1 [label=\"1\\n2\",shape=\"box\",fontname=\"Menlo\",fontsize=\"12\"];
  1 -> 0 [label=\"\",fontname=\"Menlo\",fontsize=\"12\"];
}
"
        );
    }

    #[test]
    fn as_dot_omit_node_ids() {
        let g = fixture_cyclic();
        let dot = g.as_dot(&DotOptions {
            omit_node_ids: true,
            ..DotOptions::default()
        });
        assert!(dot.contains("[label=\"1\",shape"));
        assert!(!dot.contains("0*"));
    }

    #[test]
    fn as_dot_omit_branch_ids() {
        let g = fixture_cyclic();
        let dot = g.as_dot(&DotOptions {
            omit_branch_ids: true,
            ..DotOptions::default()
        });
        assert!(dot.contains("0 -> 0 [label=\"\""));
    }
}
