//! Deep-behavior second pass (spec §4.7). Decides which methods qualify for re-analysis,
//! bounds the work by a per-assembly method cap and a per-method wall-clock budget, and
//! runs every enabled correlator over each qualifying method.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use modscan_core::cil::{Module, TypeDef};
use modscan_core::{DeepAnalysisConfig, Finding, SignalSet};

use super::correlators::{self, MethodDeepContext};

/// Rules whose firing in a method (or its declaring type, or its namespace) makes that
/// method eligible for a deep pass (spec §4.7: "any enabled seed rule fired in that
/// method, the type, or its namespace").
const SEED_RULES: &[&str] = &[
    "EncodedStringRule",
    "EncodedStringPipelineRule",
    "AssemblyDynamicLoadRule",
    "ScriptHostLaunchRule",
    "ProcessStartRule",
    "ReflectionInvokeRule",
    "ObfuscatedReflectiveExecutionRule",
    "RegistryPersistenceRule",
];

fn any_seed_fired(signals: &SignalSet) -> bool {
    SEED_RULES.iter().any(|id| signals.rule_fired(id))
}

struct EligibleMethod<'a> {
    method: &'a modscan_core::cil::MethodDef,
    method_key: String,
}

fn collect_eligible_methods<'a>(
    module: &'a Module,
    method_signals_by_key: &HashMap<String, SignalSet>,
    type_signals_by_key: &HashMap<String, SignalSet>,
) -> Vec<EligibleMethod<'a>> {
    let mut eligible = Vec::new();
    for type_def in &module.types {
        let type_key = type_def.full_name();
        let type_qualifies = type_signals_by_key.get(&type_key).is_some_and(any_seed_fired);
        let namespace_qualifies = type_signals_by_key
            .iter()
            .filter(|(key, _)| key.starts_with(&format!("{}.", type_def.namespace)))
            .any(|(_, signals)| any_seed_fired(signals));

        for method in method_iter(type_def) {
            let method_key = method.method_key();
            let method_qualifies = method_signals_by_key.get(&method_key).is_some_and(any_seed_fired);
            if method_qualifies || type_qualifies || namespace_qualifies {
                eligible.push(EligibleMethod { method, method_key });
            }
        }
    }
    eligible
}

fn method_iter(type_def: &TypeDef) -> impl Iterator<Item = &modscan_core::cil::MethodDef> {
    type_def.methods.iter().chain(type_def.properties.iter().map(|p| &p.method)).chain(
        type_def
            .events
            .iter()
            .flat_map(|e| e.add_method.iter().chain(e.remove_method.iter())),
    )
}

/// Runs every enabled correlator over every method eligible for a deep pass, bounded by
/// `max_deep_methods_per_assembly` and `max_analysis_time_ms_per_method` (spec §4.7, §5
/// "on budget exhaustion, remaining deep work is skipped, not errored").
pub fn run_deep_analysis(
    module: &Module,
    findings_by_method: &HashMap<String, Vec<Finding>>,
    method_signals_by_key: &HashMap<String, SignalSet>,
    type_signals_by_key: &HashMap<String, SignalSet>,
    native_interop_callers: &HashSet<String>,
    config: &DeepAnalysisConfig,
) -> Vec<Finding> {
    if !config.enable {
        return Vec::new();
    }

    let mut eligible = collect_eligible_methods(module, method_signals_by_key, type_signals_by_key);
    if config.deep_scan_only_flagged_methods {
        eligible.retain(|m| findings_by_method.get(&m.method_key).is_some_and(|f| !f.is_empty()));
    }
    eligible.truncate(config.max_deep_methods_per_assembly);

    let empty_findings: Vec<Finding> = Vec::new();
    let empty_signals = SignalSet::new();
    let budget = std::time::Duration::from_millis(config.max_analysis_time_ms_per_method);
    let mut findings = Vec::new();

    for entry in &eligible {
        let started = Instant::now();
        let ctx = MethodDeepContext {
            method: entry.method,
            findings: findings_by_method.get(&entry.method_key).unwrap_or(&empty_findings),
            signals: method_signals_by_key.get(&entry.method_key).unwrap_or(&empty_signals),
            native_interop_callers,
        };

        for correlator in correlator_fns() {
            if started.elapsed() > budget {
                break;
            }
            if let Some(finding) = correlator(&ctx, config) {
                findings.push(finding);
            }
        }
    }

    findings
}

type CorrelatorFn = fn(&MethodDeepContext, &DeepAnalysisConfig) -> Option<Finding>;

fn correlator_fns() -> [CorrelatorFn; 7] {
    [
        correlators::deep_string_decode_flow,
        correlators::deep_execution_chain,
        correlators::deep_resource_payload,
        correlators::deep_dynamic_load_correlation,
        correlators::deep_native_interop_correlation,
        correlators::deep_script_host_launch,
        correlators::deep_environment_pivot,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use modscan_core::testkit::{MethodBuilder, TypeBuilder};
    use modscan_core::Finding as F;

    #[test]
    fn disabled_config_runs_nothing() {
        let type_def = TypeBuilder::new("N", "T").method(MethodBuilder::new("M").ret()).build();
        let module = modscan_core::testkit::ModuleBuilderKit::new("Mod").with_type(type_def).build();
        let config = DeepAnalysisConfig::default();
        let out = run_deep_analysis(&module, &HashMap::new(), &HashMap::new(), &HashMap::new(), &HashSet::new(), &config);
        assert!(out.is_empty());
    }

    #[test]
    fn execution_chain_seed_produces_a_deep_finding() {
        let type_def = TypeBuilder::new("N", "T")
            .method(
                MethodBuilder::new("M")
                    .call("System.Net.WebClient", "DownloadData", "System")
                    .call("System.IO.File", "WriteAllBytes", "System")
                    .call("System.Diagnostics.Process", "Start", "System")
                    .ret(),
            )
            .build();
        let method_key = type_def.methods[0].method_key();
        let module = modscan_core::testkit::ModuleBuilderKit::new("Mod").with_type(type_def).build();

        let mut signals = SignalSet::new();
        signals.set(modscan_core::SignalBits::HAS_NETWORK_CALL);
        signals.set(modscan_core::SignalBits::HAS_FILE_WRITE);
        signals.set(modscan_core::SignalBits::HAS_PROCESS_LIKE_CALL);
        signals.record_rule_fired("NetworkCallRule");
        signals.record_rule_fired("FileWriteRule");
        signals.record_rule_fired("ProcessStartRule");

        let mut method_signals = HashMap::new();
        method_signals.insert(method_key.clone(), signals);

        let mut findings_by_method = HashMap::new();
        findings_by_method.insert(
            method_key,
            vec![F::new("ProcessStartRule", "Process.Start(...)", modscan_core::Severity::High, "loc")],
        );

        let mut config = DeepAnalysisConfig::default();
        config.enable = true;
        config.deep_scan_only_flagged_methods = false;

        let out = run_deep_analysis(&module, &findings_by_method, &method_signals, &HashMap::new(), &HashSet::new(), &config);
        assert!(out.iter().any(|f| f.rule_id == "DeepExecutionChain" && f.severity == modscan_core::Severity::Critical));
    }
}
