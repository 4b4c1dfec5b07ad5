//! Cross-assembly reference graph builder (spec §8 scenario 10). Consumes every module in
//! one multi-target scan and wires up direct assembly-reference edges between scanned
//! targets only; a reference to something outside the target set gets a visible
//! `ExternalReference` placeholder node but no edge, since we never open it to know what
//! it in turn references (spec §1 Non-goals: "cross-assembly whole-program analysis
//! beyond direct assembly-reference graph construction").

use modscan_core::cil::Module;
use modscan_core::cross_assembly::{ArtifactRole, CrossAssemblyGraph, CrossAssemblyNode};

/// One scanned target handed to the graph builder: its on-disk path, a content hash
/// (computed by the caller over the raw assembly bytes), and the parsed module.
pub struct ScannedAssembly<'a> {
    pub path: String,
    pub content_hash: String,
    pub module: &'a Module,
}

pub fn build_cross_assembly_graph(targets: &[ScannedAssembly<'_>]) -> CrossAssemblyGraph {
    let mut graph = CrossAssemblyGraph::new();

    for target in targets {
        graph.add_node(CrossAssemblyNode {
            path: target.path.clone(),
            assembly_name: target.module.assembly_name.clone(),
            content_hash: target.content_hash.clone(),
            role: ArtifactRole::Mod,
        });
    }

    for target in targets {
        let Some(from) = graph.find_node_by_assembly_name(&target.module.assembly_name) else { continue };
        for reference in &target.module.assembly_references {
            let to = graph.find_node_by_assembly_name(reference).unwrap_or_else(|| {
                graph.add_node(CrossAssemblyNode {
                    path: String::new(),
                    assembly_name: reference.clone(),
                    content_hash: String::new(),
                    role: ArtifactRole::ExternalReference,
                })
            });
            let is_in_target_set = targets.iter().any(|t| &t.module.assembly_name == reference);
            if is_in_target_set {
                graph.add_reference_edge(from, to);
            }
        }
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use modscan_core::testkit::ModuleBuilderKit;

    #[test]
    fn references_outside_the_target_set_get_a_placeholder_node_but_no_edge() {
        let module_a = ModuleBuilderKit::new("A").with_assembly_reference("B").build();
        let module_b = ModuleBuilderKit::new("B").with_assembly_reference("C").build();

        let targets = vec![
            ScannedAssembly { path: "A.dll".into(), content_hash: "hash-a".into(), module: &module_a },
            ScannedAssembly { path: "B.dll".into(), content_hash: "hash-b".into(), module: &module_b },
        ];

        let graph = build_cross_assembly_graph(&targets);
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 1);

        let a = graph.find_node_by_assembly_name("A").unwrap();
        let b = graph.find_node_by_assembly_name("B").unwrap();
        assert!(graph.edges.iter().any(|e| e.from == a && e.to == b));

        let c = graph.find_node_by_assembly_name("C").unwrap();
        assert!(!graph.edges.iter().any(|e| e.to == c));
        assert_eq!(graph.nodes[c].role, ArtifactRole::ExternalReference);
    }

    #[test]
    fn duplicate_references_with_different_casing_collapse_via_exact_name_match() {
        let module_a = ModuleBuilderKit::new("A")
            .with_assembly_reference("B")
            .with_assembly_reference("B")
            .build();
        let module_b = ModuleBuilderKit::new("B").build();
        let targets = vec![
            ScannedAssembly { path: "A.dll".into(), content_hash: "h".into(), module: &module_a },
            ScannedAssembly { path: "B.dll".into(), content_hash: "h2".into(), module: &module_b },
        ];
        let graph = build_cross_assembly_graph(&targets);
        assert_eq!(graph.edges.len(), 1);
    }
}
