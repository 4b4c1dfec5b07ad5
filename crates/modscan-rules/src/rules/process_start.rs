//! Process.Start contextual rule (spec §4.3, scenarios 2 and 7).

use modscan_core::{il_helpers, Finding, Severity};

use crate::classification::{has_suspicious_argument_marker, is_known_safe_tool, is_lolbin};
use crate::rule::{CallSiteContext, CallSiteRule, RuleMeta};

pub const RULE_ID: &str = "ProcessStartRule";

const EVASION_SETTERS: &[&str] = &["set_UseShellExecute", "set_CreateNoWindow", "set_WindowStyle", "set_WorkingDirectory"];

pub struct ProcessStartRule;

impl RuleMeta for ProcessStartRule {
    fn rule_id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Process.Start invocation with a resolvable target and/or evasion flags"
    }

    fn default_severity(&self) -> Severity {
        Severity::Medium
    }
}

/// Returns up to `max` string literals pushed before the call, nearest to the call site
/// last, in the order they were pushed — so `target` (the filename argument) lands at
/// index 0 and later-pushed arguments follow it, matching `Process.Start(fileName, args)`.
fn preceding_string_literals<'a>(ctx: &CallSiteContext<'a>, max: usize) -> Vec<&'a str> {
    let start = ctx.call_index.saturating_sub(il_helpers::DEFAULT_CONTEXT_WINDOW);
    let literals: Vec<&'a str> = ctx.method.instructions[start..ctx.call_index].iter().filter_map(|i| i.as_string_literal()).collect();
    let keep_from = literals.len().saturating_sub(max);
    literals[keep_from..].to_vec()
}

fn has_evasion_flags(ctx: &CallSiteContext<'_>) -> bool {
    let window = il_helpers::window(&ctx.method.instructions, ctx.call_index, il_helpers::DEFAULT_CONTEXT_WINDOW);
    window.iter().filter_map(|i| i.as_method_ref()).any(|m| EVASION_SETTERS.contains(&m.name.as_str()))
}

fn originates_from_current_process_restart(ctx: &CallSiteContext<'_>) -> bool {
    let window = il_helpers::window(&ctx.method.instructions, ctx.call_index, il_helpers::DEFAULT_CONTEXT_WINDOW);
    window.iter().filter_map(|i| i.as_method_ref()).any(|m| m.name == "GetCurrentProcess")
}

impl CallSiteRule for ProcessStartRule {
    fn is_suspicious(&self, method_ref: &modscan_core::cil::MethodRef) -> bool {
        method_ref.declaring_type == "System.Diagnostics.Process" && method_ref.name == "Start"
    }

    fn should_suppress_finding(&self, ctx: &CallSiteContext<'_>) -> bool {
        if originates_from_current_process_restart(ctx) {
            return true;
        }
        // explorer.exe launched with at most one plain path argument (no concatenation
        // feeding it) is the benign "open this folder" pattern; anything beyond that
        // falls through to the normal severity analysis.
        let literals = preceding_string_literals(ctx, 2);
        matches!(literals.as_slice(), [target] | [target, _] if target.eq_ignore_ascii_case("explorer.exe"))
    }

    fn analyze_contextual_pattern(&self, ctx: &CallSiteContext<'_>) -> Vec<Finding> {
        let literals = preceding_string_literals(ctx, 2);
        let target = literals.first().copied().unwrap_or("<unknown/non-literal>");
        let args = literals.get(1).copied().unwrap_or("");
        let evasion = has_evasion_flags(ctx);
        let suspicious_args = has_suspicious_argument_marker(args);

        // calc.exe has no legitimate purpose in mod code and is the canonical
        // proof-of-arbitrary-code-execution target; treat it as maximal suspicion on its
        // own, same bucket as a LOLBin launched with evasion/suspicious args.
        let is_poc_payload_target = target.eq_ignore_ascii_case("calc.exe");

        let severity = if is_poc_payload_target || (is_lolbin(target) && (evasion || suspicious_args)) {
            Severity::Critical
        } else if is_lolbin(target) {
            Severity::High
        } else if is_known_safe_tool(target) {
            Severity::Low
        } else if evasion {
            Severity::High
        } else if !args.is_empty() {
            Severity::Medium
        } else {
            Severity::Medium
        };

        let offset = ctx.method.instructions.get(ctx.call_index).map(|i| i.offset).unwrap_or(0);
        let location = format!("{}:{}", ctx.method.method_key(), offset);
        let description = format!("Process.Start(\"{target}\") invocation{}", if evasion { " with shell-execute evasion flags set" } else { "" });

        vec![Finding::new(RULE_ID, description, severity, location)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modscan_core::cil::MethodRef;

    #[test]
    fn is_suspicious_matches_process_start_only() {
        let rule = ProcessStartRule;
        assert!(rule.is_suspicious(&MethodRef::new("System.Diagnostics.Process", "Start", "System")));
        assert!(!rule.is_suspicious(&MethodRef::new("System.Diagnostics.Process", "Kill", "System")));
    }

    #[test]
    fn calc_exe_target_forces_critical_regardless_of_lolbin_status() {
        use modscan_core::cil::{Instruction, Opcode, Operand};

        let instructions = vec![
            Instruction::new(0, Opcode::Ldstr, Operand::String("calc.exe".into())),
            Instruction::new(1, Opcode::Call, Operand::Method(MethodRef::new("System.Diagnostics.Process", "Start", "System"))),
        ];
        let method = modscan_core::cil::MethodDef {
            name: "Launch".into(),
            declaring_type: "Plugin".into(),
            namespace: "Game".into(),
            is_static: true,
            instructions,
            locals: Vec::new(),
            exception_handlers: Vec::new(),
        };
        let config = modscan_core::ScanConfig::default();
        let method_signals = modscan_core::SignalSet::new();
        let ctx = CallSiteContext {
            method: &method,
            call_index: 1,
            method_ref: &MethodRef::new("System.Diagnostics.Process", "Start", "System"),
            method_signals: &method_signals,
            type_signals: None,
            config: &config,
        };

        let rule = ProcessStartRule;
        assert!(!rule.should_suppress_finding(&ctx));
        let findings = rule.analyze_contextual_pattern(&ctx);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
    }

    fn call_site<'a>(
        method: &'a modscan_core::cil::MethodDef,
        call_index: usize,
        config: &'a modscan_core::ScanConfig,
        signals: &'a modscan_core::SignalSet,
    ) -> CallSiteContext<'a> {
        CallSiteContext {
            method,
            call_index,
            method_ref: &MethodRef::new("System.Diagnostics.Process", "Start", "System"),
            method_signals: signals,
            type_signals: None,
            config,
        }
    }

    #[test]
    fn explorer_exe_with_single_path_argument_is_suppressed() {
        use modscan_core::cil::{Instruction, MethodDef, Opcode, Operand};

        let instructions = vec![
            Instruction::new(0, Opcode::Ldstr, Operand::String("explorer.exe".into())),
            Instruction::new(1, Opcode::Ldstr, Operand::String("C:\\Users\\Public\\Documents".into())),
            Instruction::new(2, Opcode::Call, Operand::Method(MethodRef::new("System.Diagnostics.Process", "Start", "System"))),
        ];
        let method = MethodDef {
            name: "OpenFolder".into(),
            declaring_type: "Plugin".into(),
            namespace: "Game".into(),
            is_static: true,
            instructions,
            locals: Vec::new(),
            exception_handlers: Vec::new(),
        };
        let config = modscan_core::ScanConfig::default();
        let signals = modscan_core::SignalSet::new();
        let ctx = call_site(&method, 2, &config, &signals);

        assert!(ProcessStartRule.should_suppress_finding(&ctx));
    }

    #[test]
    fn target_and_args_are_not_swapped_for_a_two_literal_call() {
        use modscan_core::cil::{Instruction, MethodDef, Opcode, Operand};

        // Process.Start(fileName, arguments): fileName is pushed first.
        let instructions = vec![
            Instruction::new(0, Opcode::Ldstr, Operand::String("powershell.exe".into())),
            Instruction::new(1, Opcode::Ldstr, Operand::String("-enc payload".into())),
            Instruction::new(2, Opcode::Call, Operand::Method(MethodRef::new("System.Diagnostics.Process", "Start", "System"))),
        ];
        let method = MethodDef {
            name: "Launch".into(),
            declaring_type: "Plugin".into(),
            namespace: "Game".into(),
            is_static: true,
            instructions,
            locals: Vec::new(),
            exception_handlers: Vec::new(),
        };
        let config = modscan_core::ScanConfig::default();
        let signals = modscan_core::SignalSet::new();
        let ctx = call_site(&method, 2, &config, &signals);

        assert!(!ProcessStartRule.should_suppress_finding(&ctx));
        let findings = ProcessStartRule.analyze_contextual_pattern(&ctx);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert!(findings[0].description.contains("powershell.exe"));
    }
}
