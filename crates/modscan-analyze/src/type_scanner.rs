//! Per-type orchestration (spec §2 step 4: "for each type, scan methods..."). Walks a
//! type's methods in declaration order, then its property/event accessor methods,
//! threading the shared call-graph builder and signal tracker through every method scan.

use std::collections::HashMap;

use modscan_core::cil::TypeDef;
use modscan_core::{DataFlowChain, Finding, ScanConfig, SignalSet};
use modscan_rules::RuleSet;

use crate::call_graph::CallGraphBuilder;
use crate::method_scanner::scan_method;
use crate::property_event_scanner::accessor_methods;
use crate::signal_tracker::SignalTracker;

pub struct TypeScanOutcome {
    pub findings: Vec<Finding>,
    /// Phase-A data-flow chains keyed by the method they were found in, so Phase B can
    /// later splice a caller's chain into a callee's once the whole module is scanned.
    pub data_flow_chains_by_method: HashMap<String, Vec<DataFlowChain>>,
    /// Each scanned method's own transient signal set, keyed by method key, for the
    /// deep-behavior orchestrator's method-scoped seed check (spec §4.7).
    pub method_signals_by_method: HashMap<String, SignalSet>,
}

pub fn scan_type(
    type_def: &TypeDef,
    is_system_type: bool,
    config: &ScanConfig,
    rules: &RuleSet,
    call_graph: &mut CallGraphBuilder,
    signal_tracker: &SignalTracker,
) -> TypeScanOutcome {
    let type_key = type_def.full_name();
    let mut findings = Vec::new();
    let mut data_flow_chains_by_method = HashMap::new();
    let mut method_signals_by_method = HashMap::new();

    for method in &type_def.methods {
        let outcome = scan_method(method, &type_key, is_system_type, config, rules, call_graph, signal_tracker);
        findings.extend(outcome.findings);
        if !outcome.data_flow_chains.is_empty() {
            data_flow_chains_by_method.insert(method.method_key(), outcome.data_flow_chains);
        }
        method_signals_by_method.insert(method.method_key(), outcome.method_signals);
    }

    for method in accessor_methods(type_def, config) {
        let outcome = scan_method(method, &type_key, is_system_type, config, rules, call_graph, signal_tracker);
        findings.extend(outcome.findings);
        if !outcome.data_flow_chains.is_empty() {
            data_flow_chains_by_method.insert(method.method_key(), outcome.data_flow_chains);
        }
        method_signals_by_method.insert(method.method_key(), outcome.method_signals);
    }

    TypeScanOutcome { findings, data_flow_chains_by_method, method_signals_by_method }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modscan_core::testkit::{MethodBuilder, TypeBuilder};

    #[test]
    fn system_type_suppresses_findings_but_still_records_signals() {
        let type_def = TypeBuilder::new("System.IO", "File")
            .assembly_scope("System")
            .method(MethodBuilder::new("Copy").call("System.Diagnostics.Process", "Start", "System").ret())
            .build();

        let rules = modscan_rules::default_rules();
        let config = ScanConfig::default();
        let mut graph = CallGraphBuilder::new();
        let tracker = SignalTracker::new();

        let outcome = scan_type(&type_def, true, &config, &rules, &mut graph, &tracker);
        assert!(outcome.findings.is_empty());
        assert!(tracker.type_signals("System.IO.File").is_some());
    }
}
