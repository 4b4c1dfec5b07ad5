//! Registry persistence rule (spec §4.3, scenario 4).

use modscan_core::cil::MethodRef;
use modscan_core::{il_helpers, Finding, Severity};

use crate::rule::{CallSiteContext, CallSiteRule, RuleMeta};

pub const RULE_ID: &str = "RegistryPersistenceRule";

const RUN_KEY_MARKERS: &[&str] = &[
    "\\run",
    "\\runonce",
    "currentversion\\run",
    "\\winlogon",
];

pub struct RegistryPersistenceRule;

impl RuleMeta for RegistryPersistenceRule {
    fn rule_id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Registry write to a known autorun/persistence key"
    }

    fn default_severity(&self) -> Severity {
        Severity::Medium
    }
}

impl CallSiteRule for RegistryPersistenceRule {
    fn is_suspicious(&self, method_ref: &MethodRef) -> bool {
        (method_ref.declaring_type == "Microsoft.Win32.Registry" || method_ref.declaring_type == "Microsoft.Win32.RegistryKey") && method_ref.name == "SetValue"
    }

    fn analyze_contextual_pattern(&self, ctx: &CallSiteContext<'_>) -> Vec<Finding> {
        let key_path = il_helpers::try_resolve_preceding_string_literal(&ctx.method.instructions, ctx.call_index);
        let is_run_key = key_path.map(|k| {
            let lower = k.to_ascii_lowercase();
            RUN_KEY_MARKERS.iter().any(|m| lower.contains(m))
        }).unwrap_or(false);

        let severity = if is_run_key { Severity::Critical } else { Severity::Medium };
        let offset = ctx.method.instructions.get(ctx.call_index).map(|i| i.offset).unwrap_or(0);
        let location = format!("{}:{}", ctx.method.method_key(), offset);
        let description = format!(
            "Registry.SetValue(\"{}\")",
            key_path.unwrap_or("<unknown/non-literal>")
        );

        vec![Finding::new(RULE_ID, description, severity, location)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_suspicious_matches_registry_set_value() {
        let rule = RegistryPersistenceRule;
        assert!(rule.is_suspicious(&MethodRef::new("Microsoft.Win32.Registry", "SetValue", "System")));
        assert!(!rule.is_suspicious(&MethodRef::new("Microsoft.Win32.Registry", "GetValue", "System")));
    }
}
