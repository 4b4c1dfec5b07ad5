//! Rule registry (spec §2 "Rule registry & rule interface", §9 design note "No dynamic
//! metaprogramming: rule registration is a static list constructed by a factory").
//!
//! A [`RuleSet`] is an ordered, immutable collection of rule trait objects, partitioned
//! by capability so the analyzer never has to downcast. [`default_rules`] is the
//! canonical 19-rule set; callers needing a reduced set (unknown-rule-id filtering in
//! config, spec §7 `InvalidInput`) build their own `RuleSet` by hand.

use std::sync::Arc;

use crate::rule::{AssemblyMetadataRule, CallSiteRule, InstructionSequenceRule, PostAnalysisRefiner, RuleMeta, StringLiteralRule};
use crate::rules;

#[derive(Clone, Default)]
pub struct RuleSet {
    pub call_site_rules: Vec<Arc<dyn CallSiteRule>>,
    pub instruction_sequence_rules: Vec<Arc<dyn InstructionSequenceRule>>,
    pub string_literal_rules: Vec<Arc<dyn StringLiteralRule>>,
    pub assembly_metadata_rules: Vec<Arc<dyn AssemblyMetadataRule>>,
    pub post_analysis_refiners: Vec<Arc<dyn PostAnalysisRefiner>>,
    /// Rules consulted by name from a specific component (e.g. `DllImportRule` from the
    /// call-graph builder) rather than dispatched uniformly by the instruction analyzer.
    pub metadata_only_rules: Vec<Arc<dyn RuleMeta>>,
}

impl RuleSet {
    pub fn known_rule_ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<&'static str> = Vec::new();
        ids.extend(self.call_site_rules.iter().map(|r| r.rule_id()));
        ids.extend(self.instruction_sequence_rules.iter().map(|r| r.rule_id()));
        ids.extend(self.string_literal_rules.iter().map(|r| r.rule_id()));
        ids.extend(self.assembly_metadata_rules.iter().map(|r| r.rule_id()));
        ids.extend(self.post_analysis_refiners.iter().map(|r| r.rule_id()));
        ids.extend(self.metadata_only_rules.iter().map(|r| r.rule_id()));
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// The canonical default rule set (spec §2: "a canonical default set of 17-20 rules").
pub fn default_rules() -> RuleSet {
    let mut set = RuleSet::default();

    let encoded_string = Arc::new(rules::encoded_string::EncodedStringRule);
    set.string_literal_rules.push(encoded_string.clone());

    let process_start = Arc::new(rules::process_start::ProcessStartRule);
    set.call_site_rules.push(process_start);

    let reflection = Arc::new(rules::reflection::ReflectionInvokeRule);
    set.call_site_rules.push(reflection);

    let com_reflection = Arc::new(rules::com_reflection::ComReflectionAttackRule);
    set.instruction_sequence_rules.push(com_reflection);

    let data_infiltration = Arc::new(rules::data_infiltration::DataInfiltrationRule);
    set.call_site_rules.push(data_infiltration);

    let data_exfiltration = Arc::new(rules::data_exfiltration::DataExfiltrationRule);
    set.call_site_rules.push(data_exfiltration);

    let obfuscated_reflective = Arc::new(rules::obfuscated_reflective_execution::ObfuscatedReflectiveExecutionRule);
    set.instruction_sequence_rules.push(obfuscated_reflective);

    let registry_persistence = Arc::new(rules::registry_persistence::RegistryPersistenceRule);
    set.call_site_rules.push(registry_persistence);

    let dll_import = Arc::new(rules::dll_import::DllImportRule);
    set.metadata_only_rules.push(dll_import);

    let assembly_dynamic_load = Arc::new(rules::assembly_dynamic_load::AssemblyDynamicLoadRule);
    set.call_site_rules.push(assembly_dynamic_load);

    let environment_path = Arc::new(rules::environment_path::EnvironmentPathRule);
    set.call_site_rules.push(environment_path);

    let encoded_pipeline = Arc::new(rules::encoded_string_pipeline::EncodedStringPipelineRule);
    set.instruction_sequence_rules.push(encoded_pipeline);

    let network_call = Arc::new(rules::network_call::NetworkCallRule);
    set.call_site_rules.push(network_call);

    let file_write = Arc::new(rules::file_write::FileWriteRule);
    set.call_site_rules.push(file_write);

    let exception_handler = Arc::new(rules::exception_handler::ExceptionHandlerRule);
    set.instruction_sequence_rules.push(exception_handler);

    let local_variable = Arc::new(rules::local_variable::LocalVariableRule);
    set.instruction_sequence_rules.push(local_variable);

    let assembly_metadata = Arc::new(rules::assembly_metadata::AssemblyMetadataAttributeRule);
    set.assembly_metadata_rules.push(assembly_metadata);

    let script_host = Arc::new(rules::script_host_launch::ScriptHostLaunchRule);
    set.call_site_rules.push(script_host);

    let embedded_resource = Arc::new(rules::embedded_resource::EmbeddedResourcePayloadRule);
    set.post_analysis_refiners.push(embedded_resource);

    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rule_set_has_nineteen_distinct_ids() {
        let set = default_rules();
        let ids = set.known_rule_ids();
        assert_eq!(ids.len(), 19, "{ids:?}");
    }
}
