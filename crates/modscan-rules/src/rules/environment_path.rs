//! Environment/path-manipulation rule (spec §4.3 classification table: `Environment`,
//! `Path` access).

use modscan_core::cil::MethodRef;
use modscan_core::{il_helpers, Finding, Severity};

use crate::classification::uses_sensitive_folder;
use crate::rule::{CallSiteContext, CallSiteRule, RuleMeta};

pub const RULE_ID: &str = "EnvironmentPathManipulationRule";

pub struct EnvironmentPathRule;

impl RuleMeta for EnvironmentPathRule {
    fn rule_id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Environment variable modification or path construction targeting a sensitive folder"
    }

    fn default_severity(&self) -> Severity {
        Severity::Low
    }
}

impl CallSiteRule for EnvironmentPathRule {
    fn is_suspicious(&self, method_ref: &MethodRef) -> bool {
        (method_ref.declaring_type == "System.Environment" && matches!(method_ref.name.as_str(), "SetEnvironmentVariable" | "GetFolderPath"))
            || (method_ref.declaring_type == "System.IO.Path" && method_ref.name == "Combine")
    }

    fn analyze_contextual_pattern(&self, ctx: &CallSiteContext<'_>) -> Vec<Finding> {
        let offset = ctx.method.instructions.get(ctx.call_index).map(|i| i.offset).unwrap_or(0);
        let location = format!("{}:{}", ctx.method.method_key(), offset);

        if ctx.method_ref.name == "SetEnvironmentVariable" {
            return vec![Finding::new(RULE_ID, "Environment variable modified at runtime", Severity::Medium, location)];
        }

        let literal = il_helpers::try_resolve_preceding_string_literal(&ctx.method.instructions, ctx.call_index);
        let sensitive = literal.map(uses_sensitive_folder).unwrap_or(false);
        if !sensitive {
            return Vec::new();
        }

        vec![Finding::new(
            RULE_ID,
            format!("Path construction targeting a sensitive staging folder ({})", literal.unwrap_or("<unknown/non-literal>")),
            Severity::High,
            location,
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_suspicious_matches_environment_and_path_apis() {
        let rule = EnvironmentPathRule;
        assert!(rule.is_suspicious(&MethodRef::new("System.Environment", "SetEnvironmentVariable", "System")));
        assert!(rule.is_suspicious(&MethodRef::new("System.IO.Path", "Combine", "System")));
        assert!(!rule.is_suspicious(&MethodRef::new("System.IO.Path", "GetExtension", "System")));
    }
}
