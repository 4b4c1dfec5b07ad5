//! Per-method and per-type signal aggregation (spec §3 "Method signals" / "Type signals",
//! §4.4 "Signal tracker").
//!
//! Signals are a fixed-width bitmap plus a small string set of rule ids that have fired.
//! Bits only get set, never cleared — a method's signal set is monotonic for the
//! lifetime of its scan, and a type's signal set is monotonic for the lifetime of the
//! assembly scan (spec §4.4 invariant).

use bitflags::bitflags;
use std::collections::BTreeSet;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SignalBits: u32 {
        const HAS_BASE64                              = 1 << 0;
        const HAS_PROCESS_LIKE_CALL                    = 1 << 1;
        const HAS_NETWORK_CALL                         = 1 << 2;
        const HAS_FILE_WRITE                           = 1 << 3;
        const USES_SENSITIVE_FOLDER                    = 1 << 4;
        const HAS_SUSPICIOUS_REFLECTION                = 1 << 5;
        const HAS_ENCODED_STRINGS                      = 1 << 6;
        const HAS_PATH_MANIPULATION                    = 1 << 7;
        const HAS_ENVIRONMENT_VARIABLE_MODIFICATION    = 1 << 8;
        const HAS_SUSPICIOUS_EXCEPTION_HANDLING        = 1 << 9;
        const HAS_SUSPICIOUS_LOCAL_VARIABLES           = 1 << 10;
        const HAS_REGISTRY_WRITE                       = 1 << 11;
        const HAS_DYNAMIC_ASSEMBLY_LOAD                = 1 << 12;
        const HAS_NATIVE_INTEROP                       = 1 << 13;
        const HAS_SCRIPT_HOST_LAUNCH                   = 1 << 14;
    }
}

/// A per-method (or, folded, per-type) signal set: the boolean facts observed during
/// scanning plus the rule ids that fired. `Default` is the empty/unset state.
#[derive(Debug, Clone, Default)]
pub struct SignalSet {
    bits: SignalBits,
    fired_rules: BTreeSet<String>,
}

impl SignalSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, bit: SignalBits) {
        self.bits.insert(bit);
    }

    pub fn has(&self, bit: SignalBits) -> bool {
        self.bits.contains(bit)
    }

    pub fn record_rule_fired(&mut self, rule_id: &str) {
        self.fired_rules.insert(rule_id.to_string());
    }

    pub fn rule_fired(&self, rule_id: &str) -> bool {
        self.fired_rules.contains(rule_id)
    }

    /// True if any rule other than `rule_id` has already fired in this set — the
    /// companion-finding gate's test (spec §4.1).
    pub fn has_other_fired_rule(&self, rule_id: &str) -> bool {
        self.fired_rules.iter().any(|r| r != rule_id)
    }

    pub fn fired_rule_count(&self) -> usize {
        self.fired_rules.len()
    }

    /// Fold another signal set into this one. Used to merge a method's transient signals
    /// into its declaring type's persistent signals on method-scan completion (§4.4).
    pub fn merge(&mut self, other: &SignalSet) {
        self.bits.insert(other.bits);
        for rule in &other.fired_rules {
            self.fired_rules.insert(rule.clone());
        }
    }

    /// `sensitive folder + network`, or `network + reflection`, or similar two-signal
    /// combinations that individually are plausible but together indicate a download/run
    /// or exfiltration pattern (spec §3).
    pub fn is_high_risk_combination(&self) -> bool {
        let pairs: &[(SignalBits, SignalBits)] = &[
            (SignalBits::USES_SENSITIVE_FOLDER, SignalBits::HAS_NETWORK_CALL),
            (SignalBits::HAS_NETWORK_CALL, SignalBits::HAS_SUSPICIOUS_REFLECTION),
            (SignalBits::HAS_NETWORK_CALL, SignalBits::HAS_FILE_WRITE),
            (SignalBits::HAS_BASE64, SignalBits::HAS_SUSPICIOUS_REFLECTION),
            (SignalBits::HAS_DYNAMIC_ASSEMBLY_LOAD, SignalBits::HAS_NETWORK_CALL),
        ];
        pairs.iter().any(|(a, b)| self.has(*a) && self.has(*b))
    }

    /// Three or more severe signals present at once.
    pub fn is_critical_combination(&self) -> bool {
        let severe = [
            SignalBits::HAS_PROCESS_LIKE_CALL,
            SignalBits::HAS_NETWORK_CALL,
            SignalBits::HAS_FILE_WRITE,
            SignalBits::HAS_SUSPICIOUS_REFLECTION,
            SignalBits::HAS_DYNAMIC_ASSEMBLY_LOAD,
            SignalBits::HAS_NATIVE_INTEROP,
            SignalBits::HAS_REGISTRY_WRITE,
            SignalBits::HAS_ENCODED_STRINGS,
        ];
        severe.iter().filter(|b| self.has(**b)).count() >= 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signals_are_monotonic_under_merge() {
        let mut a = SignalSet::new();
        a.set(SignalBits::HAS_BASE64);
        let mut b = SignalSet::new();
        b.set(SignalBits::HAS_NETWORK_CALL);
        a.merge(&b);
        assert!(a.has(SignalBits::HAS_BASE64));
        assert!(a.has(SignalBits::HAS_NETWORK_CALL));
    }

    #[test]
    fn companion_gate_requires_a_different_rule() {
        let mut s = SignalSet::new();
        s.record_rule_fired("Base64EncodedStringRule");
        assert!(s.has_other_fired_rule("ReflectionInvokeRule"));
        assert!(!s.has_other_fired_rule("Base64EncodedStringRule"));
    }

    #[test]
    fn high_risk_and_critical_combinations() {
        let mut s = SignalSet::new();
        s.set(SignalBits::USES_SENSITIVE_FOLDER);
        s.set(SignalBits::HAS_NETWORK_CALL);
        assert!(s.is_high_risk_combination());
        assert!(!s.is_critical_combination());

        s.set(SignalBits::HAS_FILE_WRITE);
        assert!(s.is_critical_combination());
    }
}
