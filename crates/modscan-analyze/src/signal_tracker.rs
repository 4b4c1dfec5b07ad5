//! Per-type signal ownership (spec §4.4 "Signal tracker"). A method's signals are
//! transient for the scan of that one method; once the method finishes, its triggered
//! bits and fired-rule set are folded into the signals owned by its declaring type, keyed
//! by the type's fully-qualified name. Folding is monotonic — a type's signal set only
//! ever grows across the methods scanned into it.
//!
//! Backed by `DashMap` so a future per-type-parallel scan (spec §5: "may parallelize per-
//! type method scans... if the signal tracker... partitioned per worker and merged
//! deterministically") can share one tracker without an external lock; a single-threaded
//! scan pays only the uncontended-lock cost of the map's internal sharding.

use dashmap::DashMap;
use rustc_hash::FxBuildHasher;

use modscan_core::SignalSet;

#[derive(Default)]
pub struct SignalTracker {
    type_signals: DashMap<String, SignalSet, FxBuildHasher>,
}

impl SignalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a just-scanned method's signals into its declaring type's aggregate
    /// (spec §4.4, §3 "Type signals").
    pub fn fold_method_into_type(&self, type_key: &str, method_signals: &SignalSet) {
        self.type_signals.entry(type_key.to_string()).or_default().merge(method_signals);
    }

    /// A snapshot of the type's signals as observed so far. Returns `None` if no method of
    /// this type has been folded in yet.
    pub fn type_signals(&self, type_key: &str) -> Option<SignalSet> {
        self.type_signals.get(type_key).map(|entry| entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modscan_core::SignalBits;

    #[test]
    fn sibling_methods_fold_into_a_shared_type_signal_set() {
        let tracker = SignalTracker::new();

        let mut base64_method = SignalSet::new();
        base64_method.set(SignalBits::HAS_BASE64);
        tracker.fold_method_into_type("Mod.Payload", &base64_method);

        let mut reflection_method = SignalSet::new();
        reflection_method.set(SignalBits::HAS_SUSPICIOUS_REFLECTION);
        tracker.fold_method_into_type("Mod.Payload", &reflection_method);

        let combined = tracker.type_signals("Mod.Payload").unwrap();
        assert!(combined.has(SignalBits::HAS_BASE64));
        assert!(combined.has(SignalBits::HAS_SUSPICIOUS_REFLECTION));
    }

    #[test]
    fn unseen_type_has_no_signals_yet() {
        let tracker = SignalTracker::new();
        assert!(tracker.type_signals("Mod.Untouched").is_none());
    }
}
