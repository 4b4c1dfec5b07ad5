//! Per-method source/transform/sink tracking and cross-method chain continuation
//! (spec §4.6 "Data-flow analyzer").
//!
//! Phase A walks one method looking for call sites that match a fixed classification
//! table, approximates data flow via local-variable aliasing (the value produced by a
//! call site is attributed to whatever local it's immediately stored into), and also
//! admits "sequential proximity" candidates for call sites that never touch a local.
//! Phase B extends a chain whose last node is a method-boundary Sink into the callee's
//! own recorded operations, up to a configured depth.

use std::collections::HashMap;

use modscan_core::cil::MethodDef;
use modscan_core::{DataFlowChain, DataFlowNode, DataFlowNodeKind, DataFlowPattern};

use crate::snippet;

/// Proximity window for "Source/Transform followed by a Sink" candidates that never
/// share a local variable (spec §4.6: "within 100 instructions").
const PROXIMITY_WINDOW: usize = 100;

/// One entry in the fixed classification table (spec §4.6 "a fixed table into
/// Source/Transform/Sink with a human-readable operation name and data description").
struct Classification {
    declaring_type: &'static str,
    name: &'static str,
    kind: DataFlowNodeKind,
    operation: &'static str,
    data_description: &'static str,
}

const TABLE: &[Classification] = &[
    Classification { declaring_type: "System.Net.WebClient", name: "DownloadData", kind: DataFlowNodeKind::Source, operation: "HTTP download", data_description: "remote response bytes" },
    Classification { declaring_type: "System.Net.WebClient", name: "DownloadString", kind: DataFlowNodeKind::Source, operation: "HTTP download", data_description: "remote response text" },
    Classification { declaring_type: "System.Net.Http.HttpClient", name: "GetByteArrayAsync", kind: DataFlowNodeKind::Source, operation: "HTTP download", data_description: "remote response bytes" },
    Classification { declaring_type: "System.Net.Http.HttpClient", name: "GetStringAsync", kind: DataFlowNodeKind::Source, operation: "HTTP download", data_description: "remote response text" },
    Classification { declaring_type: "System.IO.File", name: "ReadAllBytes", kind: DataFlowNodeKind::Source, operation: "file read", data_description: "local file bytes" },
    Classification { declaring_type: "System.IO.File", name: "ReadAllText", kind: DataFlowNodeKind::Source, operation: "file read", data_description: "local file text" },
    Classification { declaring_type: "System.Reflection.Assembly", name: "GetManifestResourceStream", kind: DataFlowNodeKind::Source, operation: "manifest-resource read", data_description: "embedded resource bytes" },
    Classification { declaring_type: "Microsoft.Win32.Registry", name: "GetValue", kind: DataFlowNodeKind::Source, operation: "registry read", data_description: "registry value" },
    Classification { declaring_type: "System.Convert", name: "FromBase64String", kind: DataFlowNodeKind::Transform, operation: "base64 decode", data_description: "decoded bytes" },
    Classification { declaring_type: "System.Text.Encoding", name: "GetString", kind: DataFlowNodeKind::Transform, operation: "byte-to-string decode", data_description: "decoded text" },
    Classification { declaring_type: "System.Security.Cryptography.AesManaged", name: "CreateDecryptor", kind: DataFlowNodeKind::Transform, operation: "AES decrypt", data_description: "decrypted bytes" },
    Classification { declaring_type: "System.Diagnostics.Process", name: "Start", kind: DataFlowNodeKind::Sink, operation: "process start", data_description: "executed as a process" },
    Classification { declaring_type: "System.Reflection.Assembly", name: "Load", kind: DataFlowNodeKind::Sink, operation: "assembly load", data_description: "loaded as a managed assembly" },
    Classification { declaring_type: "System.Reflection.MethodInfo", name: "Invoke", kind: DataFlowNodeKind::Sink, operation: "reflective invoke", data_description: "invoked reflectively" },
    Classification { declaring_type: "System.IO.File", name: "WriteAllBytes", kind: DataFlowNodeKind::Sink, operation: "file write", data_description: "written to disk" },
    Classification { declaring_type: "Microsoft.Win32.Registry", name: "SetValue", kind: DataFlowNodeKind::Sink, operation: "registry write", data_description: "written to the registry" },
    Classification { declaring_type: "System.Net.WebClient", name: "UploadData", kind: DataFlowNodeKind::Sink, operation: "HTTP upload", data_description: "sent over the network" },
    Classification { declaring_type: "System.Net.Http.HttpClient", name: "PostAsync", kind: DataFlowNodeKind::Sink, operation: "HTTP upload", data_description: "sent over the network" },
];

fn classify_call(declaring_type: &str, name: &str) -> Option<&'static Classification> {
    TABLE.iter().find(|c| c.declaring_type == declaring_type && c.name == name)
}

struct Operation {
    index: usize,
    node: DataFlowNode,
    stored_local: Option<u16>,
}

fn collect_operations(method: &MethodDef) -> Vec<Operation> {
    let method_key = method.method_key();
    let mut operations = Vec::new();

    for (index, instr) in method.instructions.iter().enumerate() {
        let Some(method_ref) = instr.as_method_ref() else { continue };
        let Some(class) = classify_call(&method_ref.declaring_type, &method_ref.name) else { continue };

        let node = DataFlowNode::new(class.kind, method_key.clone(), instr.offset, class.operation, class.data_description)
            .with_snippet_if_available(&method.instructions, index);

        let stored_local = method.instructions.get(index + 1).and_then(modscan_core::il_helpers::try_get_stored_local_index);

        operations.push(Operation { index, node, stored_local });
    }

    operations
}

trait WithSnippetIfAvailable {
    fn with_snippet_if_available(self, instructions: &[modscan_core::cil::Instruction], index: usize) -> Self;
}

impl WithSnippetIfAvailable for DataFlowNode {
    fn with_snippet_if_available(mut self, instructions: &[modscan_core::cil::Instruction], index: usize) -> Self {
        self.code_snippet = Some(snippet::render_default_window(instructions, index));
        self
    }
}

fn recognize_pattern(nodes: &[DataFlowNode]) -> DataFlowPattern {
    let has = |op: &str| nodes.iter().any(|n| n.operation == op);
    let has_kind_op = |kind: DataFlowNodeKind, op: &str| nodes.iter().any(|n| n.node_type == kind && n.operation == op);

    let has_network_source = has_kind_op(DataFlowNodeKind::Source, "HTTP download");
    let has_file_source = has_kind_op(DataFlowNodeKind::Source, "file read");
    let has_registry_source = has_kind_op(DataFlowNodeKind::Source, "registry read");
    let has_network_sink = has_kind_op(DataFlowNodeKind::Sink, "HTTP upload");
    let has_file_write_sink = has("file write");
    let has_process_sink = has("process start");
    let has_assembly_load_sink = has("assembly load");
    let has_registry_sink = has("registry write");
    let has_transform = nodes.iter().any(|n| n.node_type == DataFlowNodeKind::Transform);

    if has_network_source && has_file_write_sink && has_process_sink {
        DataFlowPattern::DownloadAndExecute
    } else if (has_file_source || has_registry_source) && has_network_sink {
        if has_file_source {
            DataFlowPattern::CredentialTheft
        } else {
            DataFlowPattern::DataExfiltration
        }
    } else if (has_network_source || has_file_source) && has_assembly_load_sink {
        DataFlowPattern::DynamicCodeLoading
    } else if has_transform && has_registry_sink {
        DataFlowPattern::ObfuscatedPersistence
    } else if has_network_source && !has_process_sink && !has_file_write_sink && !has_assembly_load_sink && !has_registry_sink {
        DataFlowPattern::RemoteConfigLoad
    } else {
        DataFlowPattern::Unknown
    }
}

fn confidence_for(nodes: &[DataFlowNode]) -> f64 {
    let mut confidence: f64 = 0.7;
    if nodes.len() > 2 {
        confidence += 0.1;
    }
    let kinds_present = [DataFlowNodeKind::Source, DataFlowNodeKind::Transform, DataFlowNodeKind::Sink]
        .iter()
        .filter(|k| nodes.iter().any(|n| n.node_type == **k))
        .count();
    if kinds_present == 3 {
        confidence += 0.1;
    }
    confidence.min(1.0)
}

fn build_chain(method_location: String, nodes: Vec<DataFlowNode>) -> Option<DataFlowChain> {
    let pattern = recognize_pattern(&nodes);
    if !pattern.is_reportable() {
        return None;
    }
    let confidence = confidence_for(&nodes);
    Some(DataFlowChain::new(pattern, method_location, nodes).with_confidence(confidence))
}

/// Phase A: builds every candidate chain for one method (spec §4.6). Local-alias groups
/// are keyed by local index and must contain ≥2 operations with both a (Source or
/// Transform) and a Sink; proximity candidates are admitted only when they recognize to
/// a reportable pattern.
pub fn analyze_method_data_flow(method: &MethodDef) -> Vec<DataFlowChain> {
    let operations = collect_operations(method);
    let method_location = method.method_key();
    let mut chains = Vec::new();

    let mut by_local: HashMap<u16, Vec<usize>> = HashMap::new();
    for (op_index, op) in operations.iter().enumerate() {
        if let Some(local) = op.stored_local {
            by_local.entry(local).or_default().push(op_index);
        }
    }

    let mut consumed: Vec<bool> = vec![false; operations.len()];

    for group in by_local.values() {
        if group.len() < 2 {
            continue;
        }
        let nodes: Vec<DataFlowNode> = group.iter().map(|&i| operations[i].node.clone()).collect();
        let has_producer = nodes.iter().any(|n| matches!(n.node_type, DataFlowNodeKind::Source | DataFlowNodeKind::Transform));
        let has_sink = nodes.iter().any(|n| n.node_type == DataFlowNodeKind::Sink);
        if !has_producer || !has_sink {
            continue;
        }
        if let Some(chain) = build_chain(method_location.clone(), nodes) {
            chains.push(chain);
            for &i in group {
                consumed[i] = true;
            }
        }
    }

    for i in 0..operations.len() {
        if consumed[i] {
            continue;
        }
        if !matches!(operations[i].node.node_type, DataFlowNodeKind::Source | DataFlowNodeKind::Transform) {
            continue;
        }

        let mut group_indices = vec![i];
        for j in (i + 1)..operations.len() {
            if consumed[j] {
                continue;
            }
            if operations[j].index - operations[i].index > PROXIMITY_WINDOW {
                break;
            }
            group_indices.push(j);
        }
        if group_indices.len() < 2 {
            continue;
        }

        let nodes: Vec<DataFlowNode> = group_indices.iter().map(|&idx| operations[idx].node.clone()).collect();
        if !nodes.iter().any(|n| n.node_type == DataFlowNodeKind::Sink) {
            continue;
        }
        if let Some(chain) = build_chain(method_location.clone(), nodes) {
            chains.push(chain);
            for idx in group_indices {
                consumed[idx] = true;
            }
        }
    }

    chains
}

/// Phase B: when a chain's final node is a method-boundary Sink whose callee is a known
/// local method, splice that callee's own chains' nodes onto this one (spec §4.6
/// "continue the chain into that method's recorded operations, up to a configured
/// depth").
pub fn extend_cross_method(
    chain: DataFlowChain,
    method_chains_by_key: &HashMap<String, Vec<DataFlowChain>>,
    max_depth: usize,
) -> DataFlowChain {
    extend_cross_method_inner(chain, method_chains_by_key, max_depth, &mut vec![])
}

fn extend_cross_method_inner(
    mut chain: DataFlowChain,
    method_chains_by_key: &HashMap<String, Vec<DataFlowChain>>,
    remaining_depth: usize,
    involved: &mut Vec<String>,
) -> DataFlowChain {
    if remaining_depth == 0 {
        return chain;
    }
    let Some(last) = chain.nodes.last() else { return chain };
    if !last.is_method_boundary {
        return chain;
    }
    let Some(callee_key) = last.target_method_key.clone() else { return chain };
    let Some(callee_chains) = method_chains_by_key.get(&callee_key) else { return chain };
    let Some(first_callee_chain) = callee_chains.first() else { return chain };

    involved.push(chain.method_location.clone());
    involved.push(callee_key.clone());
    chain.nodes.extend(first_callee_chain.nodes.clone());
    chain = chain.as_cross_method(involved.clone());
    extend_cross_method_inner(chain, method_chains_by_key, remaining_depth - 1, involved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use modscan_core::testkit::{MethodBuilder, TypeBuilder};

    fn single_method(type_def: modscan_core::cil::TypeDef) -> MethodDef {
        type_def.methods.into_iter().next().unwrap()
    }

    #[test]
    fn download_then_write_then_start_is_download_and_execute() {
        let type_def = TypeBuilder::new("N", "T")
            .method(
                MethodBuilder::new("Run")
                    .call("System.Net.WebClient", "DownloadData", "System")
                    .stloc(0)
                    .ldloc(0)
                    .call("System.IO.File", "WriteAllBytes", "System")
                    .call("System.Diagnostics.Process", "Start", "System")
                    .ret(),
            )
            .build();
        let method = single_method(type_def);
        let chains = analyze_method_data_flow(&method);
        assert!(chains.iter().any(|c| c.pattern == DataFlowPattern::DownloadAndExecute));
        assert!(chains.iter().all(|c| c.severity == modscan_core::Severity::Critical || c.pattern.is_reportable()));
    }

    #[test]
    fn lone_source_with_no_sink_produces_no_chain() {
        let type_def = TypeBuilder::new("N", "T")
            .method(MethodBuilder::new("Run").call("System.IO.File", "ReadAllBytes", "System").ret())
            .build();
        let method = single_method(type_def);
        assert!(analyze_method_data_flow(&method).is_empty());
    }
}
