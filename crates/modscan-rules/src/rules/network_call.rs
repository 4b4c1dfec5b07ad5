//! Network-call classification rule (spec §2 component table). Covers network APIs not
//! already specifically handled by [`crate::rules::data_infiltration`] /
//! [`crate::rules::data_exfiltration`] (raw sockets, generic `HttpClient.SendAsync`).

use modscan_core::cil::MethodRef;
use modscan_core::{il_helpers, Finding, Severity};

use crate::classification::{classify_host, host_of, HostClass};
use crate::rule::{CallSiteContext, CallSiteRule, RuleMeta};

pub const RULE_ID: &str = "NetworkCallRule";

const GENERIC_NETWORK_APIS: &[(&str, &str)] = &[
    ("System.Net.Sockets.TcpClient", "Connect"),
    ("System.Net.Sockets.Socket", "Connect"),
    ("System.Net.Sockets.UdpClient", "Connect"),
    ("System.Net.Http.HttpClient", "SendAsync"),
];

pub struct NetworkCallRule;

impl RuleMeta for NetworkCallRule {
    fn rule_id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Raw socket or generic HTTP network call"
    }

    fn default_severity(&self) -> Severity {
        Severity::Low
    }
}

impl CallSiteRule for NetworkCallRule {
    fn is_suspicious(&self, method_ref: &MethodRef) -> bool {
        GENERIC_NETWORK_APIS.iter().any(|(t, n)| method_ref.declaring_type == *t && method_ref.name == *n)
    }

    fn analyze_contextual_pattern(&self, ctx: &CallSiteContext<'_>) -> Vec<Finding> {
        let offset = ctx.method.instructions.get(ctx.call_index).map(|i| i.offset).unwrap_or(0);
        let location = format!("{}:{}", ctx.method.method_key(), offset);

        match il_helpers::try_resolve_preceding_string_literal(&ctx.method.instructions, ctx.call_index).and_then(host_of) {
            Some(host) => {
                let severity = match classify_host(host) {
                    HostClass::Suspicious => Severity::High,
                    HostClass::SafeKnown => Severity::Low,
                    HostClass::Unknown => Severity::Medium,
                };
                vec![Finding::new(RULE_ID, format!("Network connection to {host}"), severity, location)]
            }
            None => vec![Finding::new(RULE_ID, "Network connection established, target unresolved", Severity::Medium, location)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_suspicious_matches_generic_network_apis() {
        let rule = NetworkCallRule;
        assert!(rule.is_suspicious(&MethodRef::new("System.Net.Sockets.TcpClient", "Connect", "System")));
        assert!(!rule.is_suspicious(&MethodRef::new("System.Net.WebClient", "DownloadString", "System")));
    }
}
