//! File-write rule (spec §4.3 classification table: `File`/`FileStream` writes).

use modscan_core::cil::MethodRef;
use modscan_core::{il_helpers, Finding, Severity};

use crate::classification::uses_sensitive_folder;
use crate::rule::{CallSiteContext, CallSiteRule, RuleMeta};

pub const RULE_ID: &str = "FileWriteRule";

pub struct FileWriteRule;

impl RuleMeta for FileWriteRule {
    fn rule_id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "File write, optionally targeting a sensitive staging folder"
    }

    fn default_severity(&self) -> Severity {
        Severity::Low
    }
}

impl CallSiteRule for FileWriteRule {
    fn is_suspicious(&self, method_ref: &MethodRef) -> bool {
        (method_ref.declaring_type == "System.IO.File" && matches!(method_ref.name.as_str(), "WriteAllBytes" | "WriteAllText" | "Create"))
            || (method_ref.declaring_type == "System.IO.FileStream" && method_ref.name == ".ctor")
    }

    fn analyze_contextual_pattern(&self, ctx: &CallSiteContext<'_>) -> Vec<Finding> {
        let path = il_helpers::try_resolve_preceding_string_literal(&ctx.method.instructions, ctx.call_index);
        let sensitive = path.map(uses_sensitive_folder).unwrap_or(false);
        let severity = if sensitive { Severity::High } else { Severity::Low };

        let offset = ctx.method.instructions.get(ctx.call_index).map(|i| i.offset).unwrap_or(0);
        let location = format!("{}:{}", ctx.method.method_key(), offset);
        let description = format!(
            "File write to {}{}",
            path.unwrap_or("<unknown/non-literal>"),
            if sensitive { " (sensitive staging folder)" } else { "" }
        );

        vec![Finding::new(RULE_ID, description, severity, location)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_suspicious_matches_file_write_apis() {
        let rule = FileWriteRule;
        assert!(rule.is_suspicious(&MethodRef::new("System.IO.File", "WriteAllBytes", "System")));
        assert!(!rule.is_suspicious(&MethodRef::new("System.IO.File", "ReadAllBytes", "System")));
    }
}
