//! Reflection-invoke rule (spec §4.3, scenario 9). Gated by the companion-finding
//! requirement unless the call is preceded by an obfuscated API-resolution pattern.

use modscan_core::cil::{MethodRef, Opcode};
use modscan_core::{Finding, Severity};

use crate::rule::{CallSiteContext, CallSiteRule, RuleMeta};

pub const RULE_ID: &str = "ReflectionInvokeRule";

const OBFUSCATED_WINDOW: usize = 20;
const MIN_CONSECUTIVE_INT_LOADS: usize = 3;

pub struct ReflectionInvokeRule;

impl RuleMeta for ReflectionInvokeRule {
    fn rule_id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "MethodInfo.Invoke / MethodBase.Invoke reflective call"
    }

    fn default_severity(&self) -> Severity {
        Severity::Medium
    }

    fn requires_companion_finding(&self) -> bool {
        true
    }
}

/// True if the window preceding `call_index` contains a run of ≥3 consecutive `ldc.i4`
/// instructions — spec §4.3's heuristic for obfuscated reflection-target resolution
/// (e.g. building a method-table index from integer arithmetic rather than a literal).
fn has_obfuscated_resolution_pattern(method: &modscan_core::cil::MethodDef, call_index: usize) -> bool {
    let start = call_index.saturating_sub(OBFUSCATED_WINDOW);
    let preceding = &method.instructions[start..call_index];
    let mut run = 0usize;
    for instr in preceding {
        if instr.opcode == Opcode::LdcI4 {
            run += 1;
            if run >= MIN_CONSECUTIVE_INT_LOADS {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

impl CallSiteRule for ReflectionInvokeRule {
    fn is_suspicious(&self, method_ref: &MethodRef) -> bool {
        matches!(
            (method_ref.declaring_type.as_str(), method_ref.name.as_str()),
            ("System.Reflection.MethodInfo", "Invoke") | ("System.Reflection.MethodBase", "Invoke")
        )
    }

    fn analyze_contextual_pattern(&self, ctx: &CallSiteContext<'_>) -> Vec<Finding> {
        let bypass = has_obfuscated_resolution_pattern(ctx.method, ctx.call_index);
        let offset = ctx.method.instructions.get(ctx.call_index).map(|i| i.offset).unwrap_or(0);
        let location = format!("{}:{}", ctx.method.method_key(), offset);
        let severity = if bypass { Severity::High } else { self.default_severity() };
        let mut finding = Finding::new(RULE_ID, "Reflective method invocation via MethodInfo/MethodBase.Invoke", severity, location);
        if bypass {
            finding = finding.with_bypass_companion_check(true).with_risk_score(90);
        }
        vec![finding]
    }
}
