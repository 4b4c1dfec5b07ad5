//! Top-level assembly scanner (spec §4.8). Orchestrates phases 1-4 from spec §2: open the
//! module via the metadata reader, scan assembly metadata, register P/Invoke
//! declarations, then walk every type's methods/accessors while feeding the call-graph
//! and data-flow builders; followed by post-analysis refinement, the optional deep pass,
//! and consolidated call-chain/data-flow finding construction.

use std::collections::HashMap;
use std::path::Path;

use modscan_core::cil::Module;
use modscan_core::{DataFlowChain, DefaultEntryPointProvider, EntryPointProvider, Finding, ScanConfig, ScanError, Severity};
use modscan_rules::RuleSet;

use crate::call_graph::CallGraphBuilder;
use crate::data_flow;
use crate::deep;
use crate::metadata_scanner;
use crate::pinvoke_scanner;
use crate::signal_tracker::SignalTracker;
use crate::type_scanner::scan_type;

/// External collaborator (spec §6 "Metadata reader"): supplies a parsed [`Module`] for a
/// path or byte stream. The scanner never writes to what this returns.
pub trait MetadataReader: Send + Sync {
    fn read_path(&self, path: &Path) -> modscan_core::Result<Module>;
    fn read_bytes(&self, bytes: &[u8], virtual_path: Option<&str>) -> modscan_core::Result<Module>;
}

pub struct ScanResult {
    pub findings: Vec<Finding>,
    pub call_chains: Vec<modscan_core::CallChain>,
    pub data_flows: Vec<DataFlowChain>,
}

pub struct AssemblyScanner {
    reader: Box<dyn MetadataReader>,
    entry_points: Box<dyn EntryPointProvider>,
}

impl AssemblyScanner {
    pub fn new(reader: Box<dyn MetadataReader>) -> Self {
        Self { reader, entry_points: Box::new(DefaultEntryPointProvider) }
    }

    pub fn with_entry_point_provider(mut self, provider: Box<dyn EntryPointProvider>) -> Self {
        self.entry_points = provider;
        self
    }

    /// Parses a module without scanning it, for callers building a cross-assembly
    /// reference graph (spec §8 scenario 10) over a target set rather than scanning each
    /// assembly in isolation.
    pub fn read_module(&self, path: &str) -> modscan_core::Result<Module> {
        self.reader.read_path(Path::new(path))
    }

    pub fn scan_path(&self, path: &str, config: &ScanConfig, rules: &RuleSet) -> modscan_core::Result<ScanResult> {
        if path.is_empty() {
            return Err(ScanError::InvalidInput("path must not be empty".into()));
        }
        if !Path::new(path).exists() {
            return Err(ScanError::NotFound(path.to_string()));
        }
        match self.reader.read_path(Path::new(path)) {
            Ok(module) => Ok(self.scan_module(&module, config, rules)),
            Err(ScanError::MalformedAssembly(detail)) => Ok(malformed_result(&detail)),
            Err(other) => Err(other),
        }
    }

    pub fn scan_bytes(&self, bytes: &[u8], virtual_path: Option<&str>, config: &ScanConfig, rules: &RuleSet) -> modscan_core::Result<ScanResult> {
        if bytes.is_empty() {
            return Err(ScanError::InvalidInput("byte stream must not be empty".into()));
        }
        match self.reader.read_bytes(bytes, virtual_path) {
            Ok(module) => Ok(self.scan_module(&module, config, rules)),
            Err(ScanError::MalformedAssembly(detail)) => Ok(malformed_result(&detail)),
            Err(other) => Err(other),
        }
    }

    /// Scans an already-parsed module directly (used by the scenario test suite, which
    /// builds modules with [`modscan_core::testkit`] rather than reading real bytes).
    pub fn scan_module(&self, module: &Module, config: &ScanConfig, rules: &RuleSet) -> ScanResult {
        let mut call_graph = CallGraphBuilder::new();
        let signal_tracker = SignalTracker::new();

        pinvoke_scanner::register_pinvoke_declarations(module, &mut call_graph);

        let mut findings = metadata_scanner::scan_assembly_metadata(module, config, rules);
        let mut findings_by_method: HashMap<String, Vec<Finding>> = HashMap::new();
        let mut method_signals_by_key: HashMap<String, modscan_core::SignalSet> = HashMap::new();
        let mut data_flow_chains_by_method: HashMap<String, Vec<DataFlowChain>> = HashMap::new();

        let mut type_signals_by_key: HashMap<String, modscan_core::SignalSet> = HashMap::new();

        for type_def in &module.types {
            let is_system_type = modscan_rules::classification::is_system_assembly(&type_def.assembly_scope);
            let outcome = scan_type(type_def, is_system_type, config, rules, &mut call_graph, &signal_tracker);
            findings.extend(outcome.findings.clone());
            for f in outcome.findings {
                findings_by_method.entry(method_key_of(&f)).or_default().push(f);
            }
            data_flow_chains_by_method.extend(outcome.data_flow_chains_by_method);
            method_signals_by_key.extend(outcome.method_signals_by_method);
        }

        for type_def in &module.types {
            let type_key = type_def.full_name();
            if let Some(signals) = signal_tracker.type_signals(&type_key) {
                type_signals_by_key.insert(type_key, signals);
            }
        }

        findings.extend(run_post_analysis_refiners(module, &findings, rules));

        let native_interop_callers = call_graph.direct_pinvoke_callers();
        findings.extend(deep::run_deep_analysis(
            module,
            &findings_by_method,
            &method_signals_by_key,
            &type_signals_by_key,
            &native_interop_callers,
            &config.deep_analysis,
        ));

        let mut method_index = HashMap::new();
        for type_def in &module.types {
            for method in &type_def.methods {
                method_index.insert(method.method_key(), method);
            }
        }
        let call_chain_findings = call_graph.build_call_chain_findings(self.entry_points.as_ref(), &method_index);
        let call_chains: Vec<modscan_core::CallChain> = call_chain_findings.iter().filter_map(|f| f.call_chain.clone()).collect();

        let data_flows = finalize_data_flows(data_flow_chains_by_method);

        findings.extend(call_chain_findings);

        let (findings, data_flows) = dedupe_and_filter(findings, data_flows);

        ScanResult { findings, call_chains, data_flows }
    }
}

fn method_key_of(finding: &Finding) -> String {
    finding.location.rsplit_once(':').map(|(key, _)| key.to_string()).unwrap_or_else(|| finding.location.clone())
}

/// Bound on Phase B's caller-into-callee splicing (spec §4.6 "up to a configured depth").
const CROSS_METHOD_CHAIN_DEPTH: usize = 3;

fn finalize_data_flows(by_method: HashMap<String, Vec<DataFlowChain>>) -> Vec<DataFlowChain> {
    let mut keys: Vec<&String> = by_method.keys().collect();
    keys.sort();
    let mut flows = Vec::new();
    for key in keys {
        for chain in &by_method[key] {
            flows.push(data_flow::extend_cross_method(chain.clone(), &by_method, CROSS_METHOD_CHAIN_DEPTH));
        }
    }
    flows
}

fn run_post_analysis_refiners(module: &Module, existing_findings: &[Finding], rules: &RuleSet) -> Vec<Finding> {
    let mut additional = Vec::new();
    for refiner in &rules.post_analysis_refiners {
        additional.extend(refiner.post_analysis_refine(module, existing_findings));
    }
    additional
}

fn malformed_result(detail: &str) -> ScanResult {
    let finding = modscan_core::malformed_assembly_finding(detail);
    ScanResult { findings: vec![finding], call_chains: Vec::new(), data_flows: Vec::new() }
}

/// Deterministic ordering (spec §4.8, §9): per-method findings in IL-offset order
/// (already true from the ordered walk), then post-analysis/deep findings in analyzer
/// registration order (already true by construction), with consolidated call-chain
/// findings last (already appended last above). This pass only removes exact duplicate
/// `(rule_id, location, description)` tuples and the malformed-assembly informational
/// finding when something else was found (spec §7: "an empty assembly is a non-result,
/// not a warning").
fn dedupe_and_filter(findings: Vec<Finding>, data_flows: Vec<DataFlowChain>) -> (Vec<Finding>, Vec<DataFlowChain>) {
    let mut seen = std::collections::HashSet::new();
    let mut deduped = Vec::with_capacity(findings.len());
    for finding in findings {
        let key = (finding.rule_id.clone(), finding.location.clone(), finding.description.clone());
        if seen.insert(key) {
            deduped.push(finding);
        }
    }

    if deduped.len() > 1 {
        deduped.retain(|f| !(f.rule_id == modscan_core::finding::MALFORMED_ASSEMBLY_RULE_ID && f.severity == Severity::Low));
    }

    (deduped, data_flows)
}
