//! Cross-assembly reference graph (spec §3 "Cross-assembly graph"), used when multiple
//! scan targets are analyzed together to see which mods/plugins reference one another.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArtifactRole {
    Unknown,
    Mod,
    Plugin,
    UserLib,
    Patcher,
    ExternalReference,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossAssemblyNode {
    pub path: String,
    pub assembly_name: String,
    pub content_hash: String,
    pub role: ArtifactRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossAssemblyEdge {
    pub from: usize,
    pub to: usize,
}

/// Arena-indexed graph: nodes are stored in a flat `Vec` and edges reference them by
/// index, matching the "no cyclic ownership" design note (spec §9). Self-edges and
/// duplicate edges are rejected at insertion time rather than filtered afterward.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrossAssemblyGraph {
    pub nodes: Vec<CrossAssemblyNode>,
    pub edges: Vec<CrossAssemblyEdge>,
    #[serde(skip)]
    seen_edges: HashSet<(usize, usize)>,
}

impl CrossAssemblyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: CrossAssemblyNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn find_node_by_assembly_name(&self, assembly_name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.assembly_name == assembly_name)
    }

    /// Adds a reference edge `from -> to`. No-ops on self-edges; deduplicates so that two
    /// references to the same target assembly at different versions still produce a
    /// single edge (spec §8 scenario 10).
    pub fn add_reference_edge(&mut self, from: usize, to: usize) {
        if from == to {
            return;
        }
        if self.seen_edges.insert((from, to)) {
            self.edges.push(CrossAssemblyEdge { from, to });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str) -> CrossAssemblyNode {
        CrossAssemblyNode {
            path: format!("{name}.dll"),
            assembly_name: name.to_string(),
            content_hash: "deadbeef".to_string(),
            role: ArtifactRole::Mod,
        }
    }

    #[test]
    fn self_edges_are_rejected() {
        let mut g = CrossAssemblyGraph::new();
        let a = g.add_node(node("A"));
        g.add_reference_edge(a, a);
        assert!(g.edges.is_empty());
    }

    #[test]
    fn duplicate_reference_edges_collapse_to_one() {
        let mut g = CrossAssemblyGraph::new();
        let a = g.add_node(node("A"));
        let b = g.add_node(node("B"));
        g.add_reference_edge(a, b);
        g.add_reference_edge(a, b);
        assert_eq!(g.edges.len(), 1);
    }

    #[test]
    fn c_not_in_target_set_has_no_outgoing_edge() {
        // A -> B -> C, C never scanned as its own node.
        let mut g = CrossAssemblyGraph::new();
        let a = g.add_node(node("A"));
        let b = g.add_node(node("B"));
        g.add_reference_edge(a, b);
        assert_eq!(g.nodes.len(), 2);
        assert_eq!(g.edges.len(), 1);
    }
}
