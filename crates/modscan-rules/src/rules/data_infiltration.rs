//! Data-infiltration rule: HTTP GET with a URL literal (spec §4.3). POST/upload verbs
//! are handled by [`crate::rules::data_exfiltration`].

use modscan_core::cil::MethodRef;
use modscan_core::{il_helpers, Finding, Severity};

use crate::classification::{classify_host, host_of, HostClass};
use crate::rule::{CallSiteContext, CallSiteRule, RuleMeta};

pub const RULE_ID: &str = "DataInfiltrationRule";

const GET_LIKE: &[(&str, &str)] = &[
    ("System.Net.WebClient", "DownloadString"),
    ("System.Net.WebClient", "DownloadData"),
    ("System.Net.WebClient", "DownloadFile"),
    ("System.Net.Http.HttpClient", "GetAsync"),
    ("System.Net.Http.HttpClient", "GetStringAsync"),
];

pub struct DataInfiltrationRule;

impl RuleMeta for DataInfiltrationRule {
    fn rule_id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "HTTP GET/download request to a URL resolved from a string literal"
    }

    fn default_severity(&self) -> Severity {
        Severity::Low
    }
}

impl CallSiteRule for DataInfiltrationRule {
    fn is_suspicious(&self, method_ref: &MethodRef) -> bool {
        GET_LIKE.iter().any(|(t, n)| method_ref.declaring_type == *t && method_ref.name == *n)
    }

    fn analyze_contextual_pattern(&self, ctx: &CallSiteContext<'_>) -> Vec<Finding> {
        let Some(url) = il_helpers::try_resolve_preceding_string_literal(&ctx.method.instructions, ctx.call_index) else {
            return Vec::new();
        };
        let Some(host) = host_of(url) else { return Vec::new() };

        let (severity, label) = match classify_host(host) {
            HostClass::Suspicious => (Severity::High, "a known paste/tunnel-sharing or bare-IP host"),
            HostClass::SafeKnown => (Severity::Low, "a known package/distribution host"),
            HostClass::Unknown => (Severity::Medium, "an unrecognized host"),
        };

        let offset = ctx.method.instructions.get(ctx.call_index).map(|i| i.offset).unwrap_or(0);
        let location = format!("{}:{}", ctx.method.method_key(), offset);
        let description = format!("HTTP download from {url} ({label})");

        vec![Finding::new(RULE_ID, description, severity, location)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_suspicious_only_for_get_like_verbs() {
        let rule = DataInfiltrationRule;
        assert!(rule.is_suspicious(&MethodRef::new("System.Net.WebClient", "DownloadString", "System")));
        assert!(!rule.is_suspicious(&MethodRef::new("System.Net.WebClient", "UploadString", "System")));
    }
}
