//! Per-method orchestration (spec §2 step 4: "for each type, scan methods... property
//! accessors, event handlers; simultaneously feed a call-graph and a data-flow
//! analyzer"). Thin glue between [`crate::instruction_analyzer`] and the per-type loop in
//! [`crate::type_scanner`] — folds a method's signals into its type, feeds the call graph,
//! and runs Phase A of the data-flow analyzer.

use modscan_core::{DataFlowChain, Finding, ScanConfig, SignalSet};
use modscan_rules::RuleSet;

use modscan_core::cil::MethodDef;

use crate::call_graph::CallGraphBuilder;
use crate::data_flow;
use crate::instruction_analyzer::analyze_method;
use crate::signal_tracker::SignalTracker;

pub struct MethodScanOutcome {
    pub findings: Vec<Finding>,
    pub data_flow_chains: Vec<DataFlowChain>,
    /// This method's own transient signals, handed back alongside the type-level fold so
    /// the deep-behavior orchestrator can test method-scoped seed rules (spec §4.7)
    /// without re-deriving them from the type's aggregate.
    pub method_signals: SignalSet,
}

/// Scans one method body: the instruction analyzer's per-instruction rule dispatch, then
/// Phase A of the data-flow analyzer, then folds this method's transient signals into its
/// declaring type's persistent signals.
pub fn scan_method(
    method: &MethodDef,
    type_key: &str,
    is_system_type: bool,
    config: &ScanConfig,
    rules: &RuleSet,
    call_graph: &mut CallGraphBuilder,
    signal_tracker: &SignalTracker,
) -> MethodScanOutcome {
    let type_signals = signal_tracker.type_signals(type_key);
    let outcome = analyze_method(method, is_system_type, type_signals.as_ref(), config, rules, call_graph);

    signal_tracker.fold_method_into_type(type_key, &outcome.method_signals);

    let data_flow_chains = if is_system_type { Vec::new() } else { data_flow::analyze_method_data_flow(method) };

    MethodScanOutcome { findings: outcome.findings, data_flow_chains, method_signals: outcome.method_signals }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modscan_core::testkit::{MethodBuilder, TypeBuilder};

    #[test]
    fn scanning_a_method_folds_its_signals_into_the_type() {
        let type_def = TypeBuilder::new("N", "T")
            .method(MethodBuilder::new("Launch").ldstr("calc.exe").call("System.Diagnostics.Process", "Start", "System").ret())
            .build();
        let method = type_def.methods.into_iter().next().unwrap();

        let rules = modscan_rules::default_rules();
        let config = ScanConfig::default();
        let mut graph = CallGraphBuilder::new();
        let tracker = SignalTracker::new();

        let outcome = scan_method(&method, "N.T", false, &config, &rules, &mut graph, &tracker);
        assert!(!outcome.findings.is_empty());
        assert!(tracker.type_signals("N.T").is_some());
    }
}
