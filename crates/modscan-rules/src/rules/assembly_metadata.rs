//! Assembly-metadata attribute rule (spec §4.1 `analyze_assembly_metadata`, §4.3 encoded
//! string rule's note "Critical if found in assembly-metadata attribute").

use modscan_core::cil::Module;
use modscan_core::{Finding, Severity};

use crate::classification::contains_dangerous_substring;
use crate::rule::{AssemblyMetadataRule, RuleMeta};
use crate::rules::encoded_string::decode_candidate;

pub const RULE_ID: &str = "AssemblyMetadataAttributeRule";
const PSEUDO_LOCATION: &str = "Assembly metadata";

pub struct AssemblyMetadataAttributeRule;

impl RuleMeta for AssemblyMetadataAttributeRule {
    fn rule_id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Assembly-level custom attribute argument carries an encoded or dangerous payload"
    }

    fn default_severity(&self) -> Severity {
        Severity::Critical
    }
}

impl AssemblyMetadataRule for AssemblyMetadataAttributeRule {
    fn analyze_assembly_metadata(&self, module: &Module) -> Vec<Finding> {
        let mut findings = Vec::new();
        for attribute in &module.custom_attributes {
            for arg in &attribute.string_args {
                if contains_dangerous_substring(arg) {
                    findings.push(Finding::new(
                        RULE_ID,
                        format!("Assembly attribute {} carries a dangerous literal: \"{arg}\"", attribute.type_name),
                        Severity::Critical,
                        PSEUDO_LOCATION,
                    ));
                    continue;
                }
                if let Some(decoded) = decode_candidate(arg) {
                    if contains_dangerous_substring(&decoded) {
                        findings.push(Finding::new(
                            RULE_ID,
                            format!("Assembly attribute {} decodes to a dangerous payload: \"{decoded}\"", attribute.type_name),
                            Severity::Critical,
                            PSEUDO_LOCATION,
                        ));
                    }
                }
            }
        }
        findings
    }
}
