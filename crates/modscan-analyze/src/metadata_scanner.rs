//! Assembly-metadata scanning (spec §2 control-flow step 2: "scan assembly metadata
//! attributes"). Dispatches every registered [`modscan_rules::AssemblyMetadataRule`]
//! against the module once, gated by `detect_assembly_metadata`.

use modscan_core::cil::Module;
use modscan_core::{Finding, ScanConfig};
use modscan_rules::RuleSet;

pub fn scan_assembly_metadata(module: &Module, config: &ScanConfig, rules: &RuleSet) -> Vec<Finding> {
    if !config.detect_assembly_metadata {
        return Vec::new();
    }
    let mut findings = Vec::new();
    for rule in &rules.assembly_metadata_rules {
        findings.extend(rule.analyze_assembly_metadata(module));
    }
    findings
}
