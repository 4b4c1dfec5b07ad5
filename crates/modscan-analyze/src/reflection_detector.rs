//! Companion-condition evaluation for gated rules (spec §2 "Reflection detector":
//! "specialized recognition of reflection-invocation patterns and companion conditions").
//!
//! Reflection-style findings (`ReflectionInvokeRule`, and any future rule marking
//! `requires_companion_finding`) are the primary consumer of the companion-finding gate,
//! but the gate itself is generic: per spec §3 "Type signals", a companion signal fired by
//! a *sibling* method of the same declaring type must also satisfy the gate, not only a
//! signal fired earlier in the same method. This module is the one place that checks both
//! scopes so the instruction analyzer's dispatch loop stays a plain fold.

use modscan_core::{Finding, SignalSet};

/// True if `finding` is allowed to be emitted under the companion-finding gate (spec §4.1):
/// either the rule doesn't require a companion, the finding already carries
/// `bypass_companion_check` (set internally by the rule when its own risk score is high
/// enough), or some *other* rule has already fired in this method or in a sibling method of
/// the same declaring type.
pub fn companion_gate_satisfied(
    rule_id: &str,
    requires_companion_finding: bool,
    finding: &Finding,
    method_signals: &SignalSet,
    type_signals: Option<&SignalSet>,
) -> bool {
    if !requires_companion_finding {
        return true;
    }
    if finding.bypass_companion_check {
        return true;
    }
    if method_signals.has_other_fired_rule(rule_id) {
        return true;
    }
    type_signals.is_some_and(|signals| signals.has_other_fired_rule(rule_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use modscan_core::Severity;
    use modscan_rules::rules::reflection::ReflectionInvokeRule;
    use modscan_rules::RuleMeta;

    #[test]
    fn gate_is_satisfied_by_a_sibling_methods_fired_rule() {
        let rule = ReflectionInvokeRule;
        let finding = Finding::new(rule.rule_id(), "reflective invoke", Severity::Medium, "Mod.T.M:0");
        let method_signals = SignalSet::new();

        let mut type_signals = SignalSet::new();
        type_signals.record_rule_fired("EncodedStringRule");

        assert!(companion_gate_satisfied(
            rule.rule_id(),
            rule.requires_companion_finding(),
            &finding,
            &method_signals,
            Some(&type_signals)
        ));
    }

    #[test]
    fn gate_rejects_when_no_companion_anywhere() {
        let rule = ReflectionInvokeRule;
        let finding = Finding::new(rule.rule_id(), "reflective invoke", Severity::Medium, "Mod.T.M:0");
        let method_signals = SignalSet::new();
        assert!(!companion_gate_satisfied(rule.rule_id(), rule.requires_companion_finding(), &finding, &method_signals, None));
    }

    #[test]
    fn bypass_flag_always_satisfies_the_gate() {
        let rule = ReflectionInvokeRule;
        let finding = Finding::new(rule.rule_id(), "reflective invoke", Severity::High, "Mod.T.M:0").with_bypass_companion_check(true);
        assert!(companion_gate_satisfied(rule.rule_id(), rule.requires_companion_finding(), &finding, &SignalSet::new(), None));
    }
}
