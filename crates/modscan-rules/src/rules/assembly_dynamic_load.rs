//! Assembly dynamic-load rule (spec §4.3 classification table, §4.7
//! `DeepDynamicLoadCorrelation` seed).

use modscan_core::cil::MethodRef;
use modscan_core::{Finding, Severity, SignalBits};

use crate::rule::{CallSiteContext, CallSiteRule, RuleMeta};

pub const RULE_ID: &str = "AssemblyDynamicLoadRule";

pub struct AssemblyDynamicLoadRule;

impl RuleMeta for AssemblyDynamicLoadRule {
    fn rule_id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Dynamic assembly load via Assembly.Load/LoadFrom/LoadFile"
    }

    fn default_severity(&self) -> Severity {
        Severity::Medium
    }
}

impl CallSiteRule for AssemblyDynamicLoadRule {
    fn is_suspicious(&self, method_ref: &MethodRef) -> bool {
        method_ref.declaring_type == "System.Reflection.Assembly" && matches!(method_ref.name.as_str(), "Load" | "LoadFrom" | "LoadFile")
    }

    fn analyze_contextual_pattern(&self, ctx: &CallSiteContext<'_>) -> Vec<Finding> {
        let from_encoded_or_network = ctx.method_signals.has(SignalBits::HAS_BASE64) || ctx.method_signals.has(SignalBits::HAS_NETWORK_CALL);
        let severity = if from_encoded_or_network { Severity::High } else { self.default_severity() };

        let offset = ctx.method.instructions.get(ctx.call_index).map(|i| i.offset).unwrap_or(0);
        let location = format!("{}:{}", ctx.method.method_key(), offset);
        let description = format!("{}({})", ctx.method_ref.qualified_name(), "byte[] or path");

        vec![Finding::new(RULE_ID, description, severity, location)]
    }
}
