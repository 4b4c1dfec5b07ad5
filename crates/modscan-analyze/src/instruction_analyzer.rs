//! Core per-method visitor (spec §4.2 "Instruction analyzer"). Walks a method's
//! instruction sequence exactly once in IL order, dispatching string-literal rules at
//! string loads and call-site rules at resolvable call/callvirt/newobj instructions, then
//! running the instruction-sequence rules once over the whole body. Findings are
//! collected in the order they are discovered, matching spec §4.8's determinism
//! requirement for the ordered walk.

use modscan_core::cil::MethodDef;
use modscan_core::{Finding, ScanConfig, Severity, SignalSet};
use modscan_rules::rule::CallSiteContext;
use modscan_rules::RuleSet;

use crate::call_graph::CallGraphBuilder;
use crate::reflection_detector::companion_gate_satisfied;
use crate::snippet;
use modscan_rules::classification;

/// Result of walking one method: its findings (in discovery order) and the signal set
/// folded into the declaring type afterward (spec §4.4).
pub struct MethodAnalysisOutcome {
    pub findings: Vec<Finding>,
    pub method_signals: SignalSet,
}

/// Walks `method` once. `is_system_type` suppresses call-site findings produced *inside*
/// this method's own body when the method's declaring type itself originates from a
/// BCL/system assembly (spec §4.2 "system-assembly suppression": "only the user-code
/// caller emits findings") — signals and call-graph edges are still recorded so the
/// caller's own dispatch (which sees this method as the callee) behaves normally.
pub fn analyze_method(
    method: &MethodDef,
    is_system_type: bool,
    type_signals: Option<&SignalSet>,
    config: &ScanConfig,
    rules: &RuleSet,
    call_graph: &mut CallGraphBuilder,
) -> MethodAnalysisOutcome {
    let mut findings = Vec::new();
    let mut method_signals = SignalSet::new();

    for index in 0..method.instructions.len() {
        let instr = &method.instructions[index];

        if instr.is_string_load() {
            if let Some(literal) = instr.as_string_literal() {
                for rule in &rules.string_literal_rules {
                    findings.extend(rule.analyze_string_literal(literal, method, index, config));
                }
            }
            continue;
        }

        if !instr.opcode.is_call_like() {
            continue;
        }
        let Some(method_ref) = instr.as_method_ref() else {
            continue;
        };

        if let Some(signal) = classification::classify(method_ref) {
            method_signals.set(signal);
        }
        call_graph.record_call(method, method_ref);

        if is_system_type {
            continue;
        }

        let ctx = CallSiteContext {
            method,
            call_index: index,
            method_ref,
            method_signals: &method_signals,
            type_signals,
            config,
        };

        for rule in &rules.call_site_rules {
            if !rule.is_suspicious(method_ref) {
                continue;
            }
            if rule.should_suppress_finding(&ctx) {
                continue;
            }
            let mut emitted = rule.analyze_contextual_pattern(&ctx);
            emitted.retain(|f| companion_gate_satisfied(rule.rule_id(), rule.requires_companion_finding(), f, &method_signals, type_signals));
            if emitted.is_empty() {
                continue;
            }
            for finding in &mut emitted {
                if finding.code_snippet.is_none() {
                    finding.code_snippet = Some(snippet::render_default_window(&method.instructions, index));
                }
            }
            method_signals.record_rule_fired(rule.rule_id());
            findings.extend(emitted);
        }
    }

    if !is_system_type {
        for rule in &rules.instruction_sequence_rules {
            if rule.rule_id() == modscan_rules::rules::exception_handler::RULE_ID && !config.analyze_exception_handlers {
                continue;
            }
            if rule.rule_id() == modscan_rules::rules::local_variable::RULE_ID && !config.analyze_local_variables {
                continue;
            }
            let emitted = rule.analyze_instructions(method, &method_signals);
            if emitted.is_empty() {
                continue;
            }
            method_signals.record_rule_fired(rule.rule_id());
            findings.extend(emitted);
        }
    }

    apply_multi_signal_escalation(&mut findings, &method_signals, config);

    MethodAnalysisOutcome { findings, method_signals }
}

/// Spec §3 derived predicates (`is_high_risk_combination`, `is_critical_combination`):
/// when several severe signals compound in one method, bump the method's own findings up
/// to at least High/Critical respectively. Gated by `enable_multi_signal_detection`.
fn apply_multi_signal_escalation(findings: &mut [Finding], signals: &SignalSet, config: &ScanConfig) {
    if !config.enable_multi_signal_detection {
        return;
    }
    let floor = if signals.is_critical_combination() {
        Some(Severity::Critical)
    } else if signals.is_high_risk_combination() {
        Some(Severity::High)
    } else {
        None
    };
    let Some(floor) = floor else { return };
    for finding in findings.iter_mut() {
        if finding.severity < floor {
            finding.severity = floor;
        }
    }
}
