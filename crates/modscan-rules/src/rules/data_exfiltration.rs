//! Data-exfiltration rule: HTTP POST/upload with a URL literal (spec §4.3, companion to
//! [`crate::rules::data_infiltration`]).

use modscan_core::cil::MethodRef;
use modscan_core::{il_helpers, Finding, Severity};

use crate::classification::{classify_host, host_of, HostClass};
use crate::rule::{CallSiteContext, CallSiteRule, RuleMeta};

pub const RULE_ID: &str = "DataExfiltrationRule";

const POST_LIKE: &[(&str, &str)] = &[
    ("System.Net.WebClient", "UploadString"),
    ("System.Net.WebClient", "UploadData"),
    ("System.Net.Http.HttpClient", "PostAsync"),
];

pub struct DataExfiltrationRule;

impl RuleMeta for DataExfiltrationRule {
    fn rule_id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "HTTP POST/upload request to a URL resolved from a string literal"
    }

    fn default_severity(&self) -> Severity {
        Severity::Medium
    }
}

impl CallSiteRule for DataExfiltrationRule {
    fn is_suspicious(&self, method_ref: &MethodRef) -> bool {
        POST_LIKE.iter().any(|(t, n)| method_ref.declaring_type == *t && method_ref.name == *n)
    }

    fn analyze_contextual_pattern(&self, ctx: &CallSiteContext<'_>) -> Vec<Finding> {
        let Some(url) = il_helpers::try_resolve_preceding_string_literal(&ctx.method.instructions, ctx.call_index) else {
            return Vec::new();
        };
        let Some(host) = host_of(url) else { return Vec::new() };

        let severity = match classify_host(host) {
            HostClass::Suspicious => Severity::Critical,
            HostClass::Unknown => Severity::High,
            HostClass::SafeKnown => Severity::Medium,
        };

        let offset = ctx.method.instructions.get(ctx.call_index).map(|i| i.offset).unwrap_or(0);
        let location = format!("{}:{}", ctx.method.method_key(), offset);
        let description = format!("Outbound HTTP upload to {url}");

        vec![Finding::new(RULE_ID, description, severity, location)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_suspicious_only_for_post_like_verbs() {
        let rule = DataExfiltrationRule;
        assert!(rule.is_suspicious(&MethodRef::new("System.Net.Http.HttpClient", "PostAsync", "System")));
        assert!(!rule.is_suspicious(&MethodRef::new("System.Net.Http.HttpClient", "GetAsync", "System")));
    }
}
