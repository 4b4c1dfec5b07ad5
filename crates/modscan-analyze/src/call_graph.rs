//! Call-graph builder (spec §4.5). Records every caller→callee edge involving a method
//! reference resolvable to something in the scanned module, and holds P/Invoke
//! declarations pending until the per-type walk completes, at which point
//! `build_call_chain_findings` traces each one back to the nearest entry point.
//!
//! Arena-style: nodes are addressed by method-key string rather than owned references
//! (spec §9 "use arena-style storage... rather than owned references"), reset at the start
//! of each scan by constructing a fresh `CallGraphBuilder`.

use std::collections::{HashMap, VecDeque};

use modscan_core::cil::{MethodDef, MethodRef, Module};
use modscan_core::{CallChain, CallChainNode, CallChainNodeKind, EntryPointProvider, Finding, Severity};
use modscan_rules::rules::dll_import::{classify_native_library, DllImportRule};
use modscan_rules::RuleMeta;

use crate::snippet;

struct PendingDeclaration {
    native_library: String,
    severity: Severity,
}

/// A node key for a P/Invoke declaration that has no namespace of its own — keyed by its
/// `DeclaringType::Method` qualified name, distinct from a `MethodDef::method_key()`.
fn pinvoke_node_key(method_ref: &MethodRef) -> String {
    method_ref.qualified_name()
}

#[derive(Default)]
pub struct CallGraphBuilder {
    /// caller method key -> callee node keys (either a `MethodDef::method_key()` or a
    /// pinvoke node key), recorded in discovery order.
    edges: Vec<(String, String)>,
    pending_declarations: HashMap<String, PendingDeclaration>,
}

impl CallGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every P/Invoke declaration in the module as a pending suspicious
    /// declaration (spec §2 step 3: "register P/Invoke declarations without emitting
    /// findings yet").
    pub fn register_pinvoke_declarations(&mut self, module: &Module) {
        for decl in &module.pinvoke_declarations {
            let key = pinvoke_node_key(&decl.method);
            let severity = classify_native_library(&decl.native_library);
            self.pending_declarations.insert(key, PendingDeclaration { native_library: decl.native_library.clone(), severity });
        }
    }

    /// Records a caller→callee edge if `method_ref` resolves to something tracked in this
    /// graph: either a method defined in the scanned module, or a pending P/Invoke
    /// declaration.
    pub fn record_call(&mut self, caller: &MethodDef, method_ref: &MethodRef) {
        let pinvoke_key = pinvoke_node_key(method_ref);
        if self.pending_declarations.contains_key(&pinvoke_key) {
            self.edges.push((caller.method_key(), pinvoke_key));
        }
    }

    /// Method keys that directly call a pending P/Invoke declaration — consulted by the
    /// deep-behavior orchestrator's native-interop correlator, which has no other way to
    /// see `DllImportRule` fire (it never runs as an ordinary call-site rule).
    pub fn direct_pinvoke_callers(&self) -> std::collections::HashSet<String> {
        self.edges
            .iter()
            .filter(|(_, callee)| self.pending_declarations.contains_key(callee))
            .map(|(caller, _)| caller.clone())
            .collect()
    }

    /// Traces each pending declaration that was actually called back to the nearest entry
    /// point (spec §4.5), emitting one consolidated `CallChain` finding per distinct
    /// entry-point path. Declarations with no recorded caller are never emitted — "held
    /// pending" forever, per spec.
    pub fn build_call_chain_findings(&self, entry_points: &dyn EntryPointProvider, method_index: &HashMap<String, &MethodDef>) -> Vec<Finding> {
        let mut reverse: HashMap<&str, Vec<&str>> = HashMap::new();
        for (caller, callee) in &self.edges {
            reverse.entry(callee.as_str()).or_default().push(caller.as_str());
        }

        let mut findings = Vec::new();
        let mut declaration_keys: Vec<&String> = self.pending_declarations.keys().collect();
        declaration_keys.sort();

        for decl_key in declaration_keys {
            let decl = &self.pending_declarations[decl_key];
            let Some(direct_callers) = reverse.get(decl_key.as_str()) else {
                continue;
            };
            if direct_callers.is_empty() {
                continue;
            }

            let paths = shortest_paths_to_entry_points(decl_key, &reverse, entry_points, method_index);
            if paths.is_empty() {
                // No entry point reachable: anchor on the lexicographically first direct
                // caller, per spec §4.5 tie-break "use the declaring method itself as the
                // entry-point anchor".
                let mut callers = direct_callers.clone();
                callers.sort_unstable();
                let anchor = callers[0];
                findings.push(build_chain_finding(&[anchor.to_string(), decl_key.clone()], decl, method_index));
                continue;
            }

            for path in paths {
                findings.push(build_chain_finding(&path, decl, method_index));
            }
        }

        findings
    }
}

/// BFS over the reverse call graph from `sink` looking for every distinct entry-point
/// method reachable, keeping the shortest path found to each (spec §4.5 "if multiple
/// entry points reach the same sink, emit one chain per distinct entry-point path").
fn shortest_paths_to_entry_points(
    sink: &str,
    reverse: &HashMap<&str, Vec<&str>>,
    entry_points: &dyn EntryPointProvider,
    method_index: &HashMap<String, &MethodDef>,
) -> Vec<Vec<String>> {
    let mut visited: HashMap<&str, Option<&str>> = HashMap::new();
    visited.insert(sink, None);
    let mut queue = VecDeque::new();
    queue.push_back(sink);

    let mut found_entry_points = Vec::new();

    while let Some(node) = queue.pop_front() {
        let Some(callers) = reverse.get(node) else { continue };
        let mut callers = callers.clone();
        callers.sort_unstable();
        for caller in callers {
            if visited.contains_key(caller) {
                continue;
            }
            visited.insert(caller, Some(node));
            let is_entry = method_index.get(caller).map(|m| entry_points.is_entry_point(m)).unwrap_or(false);
            if is_entry {
                found_entry_points.push(caller);
            } else {
                queue.push_back(caller);
            }
        }
    }

    found_entry_points.sort_unstable();
    found_entry_points
        .into_iter()
        .map(|entry| {
            let mut path = vec![entry.to_string()];
            let mut current = entry;
            while let Some(Some(next)) = visited.get(current) {
                path.push((*next).to_string());
                current = next;
            }
            path
        })
        .collect()
}

fn build_chain_finding(path: &[String], decl: &PendingDeclaration, method_index: &HashMap<String, &MethodDef>) -> Finding {
    let mut nodes = Vec::with_capacity(path.len());
    let mut snippets = Vec::new();

    for (i, key) in path.iter().enumerate() {
        let kind = if i == 0 {
            CallChainNodeKind::EntryPoint
        } else if i == path.len() - 1 {
            CallChainNodeKind::SuspiciousDeclaration
        } else {
            CallChainNodeKind::IntermediateCall
        };

        let mut node = CallChainNode::new(kind, key.clone());
        if let Some(method) = method_index.get(key) {
            if !method.instructions.is_empty() {
                let snippet = snippet::render_window(&method.instructions, 0, method.instructions.len());
                node = node.with_snippet(snippet.clone());
                snippets.push(snippet);
            }
        }
        nodes.push(node);
    }

    let description = format!(
        "P/Invoke into {} reachable from entry point via chain: {}",
        decl.native_library,
        path.join(" -> ")
    );
    let mut chain = CallChain::new(DllImportRule.rule_id(), decl.severity, nodes);
    if !snippets.is_empty() {
        chain.combined_snippet = Some(snippet::combine(&snippets));
    }
    Finding::new(DllImportRule.rule_id(), description, decl.severity, path.last().cloned().unwrap_or_default()).with_call_chain(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use modscan_core::testkit::{MethodBuilder, ModuleBuilderKit, TypeBuilder};
    use modscan_core::DefaultEntryPointProvider;

    fn index_of<'a>(module: &'a modscan_core::cil::Module) -> HashMap<String, &'a MethodDef> {
        let mut index = HashMap::new();
        for t in &module.types {
            for m in &t.methods {
                index.insert(m.method_key(), m);
            }
        }
        index
    }

    #[test]
    fn chain_from_entry_point_to_pinvoke_declaration_is_well_formed() {
        let module = ModuleBuilderKit::new("Mod")
            .with_type(
                TypeBuilder::new("Mod", "Plugin")
                    .method(MethodBuilder::new("Awake").call("Mod.Plugin", "Helper", "Mod").ret())
                    .method(MethodBuilder::new("Helper").call("Mod.Native", "RunShellcode", "Mod").ret())
                    .build(),
            )
            .with_pinvoke("Mod.Native", "RunShellcode", "kernel32.dll", "RunShellcode")
            .build();

        let mut graph = CallGraphBuilder::new();
        graph.register_pinvoke_declarations(&module);
        for t in &module.types {
            for m in &t.methods {
                for instr in &m.instructions {
                    if let Some(method_ref) = instr.as_method_ref() {
                        graph.record_call(m, method_ref);
                    }
                }
            }
        }

        let index = index_of(&module);
        let provider = DefaultEntryPointProvider;
        let findings = graph.build_call_chain_findings(&provider, &index);

        assert_eq!(findings.len(), 1);
        let chain = findings[0].call_chain.as_ref().unwrap();
        assert!(chain.is_well_formed());
        assert_eq!(chain.severity, Severity::High);
    }

    #[test]
    fn declaration_with_no_caller_is_never_emitted() {
        let module = ModuleBuilderKit::new("Mod")
            .with_type(TypeBuilder::new("Mod", "Plugin").method(MethodBuilder::new("Awake").ret()).build())
            .with_pinvoke("Mod.Native", "RunShellcode", "kernel32.dll", "RunShellcode")
            .build();

        let mut graph = CallGraphBuilder::new();
        graph.register_pinvoke_declarations(&module);
        let index = index_of(&module);
        let provider = DefaultEntryPointProvider;
        assert!(graph.build_call_chain_findings(&provider, &index).is_empty());
    }
}
