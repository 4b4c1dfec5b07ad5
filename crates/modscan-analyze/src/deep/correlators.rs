//! The seven named correlation analyzers (spec §4.7). Each looks at the finding set and
//! signal bitmap already produced for one method and decides whether a compound pattern
//! warrants a synthetic "deep" finding no single rule would have emitted alone.

use std::collections::HashSet;

use modscan_core::cil::MethodDef;
use modscan_core::{DeepAnalysisConfig, Finding, Severity, SignalBits, SignalSet};

pub struct MethodDeepContext<'a> {
    pub method: &'a MethodDef,
    pub findings: &'a [Finding],
    pub signals: &'a SignalSet,
    /// Method keys that directly call a pending P/Invoke declaration, supplied by the
    /// call-graph builder — `DllImportRule` never fires at an ordinary call site, so
    /// native-interop correlation has to consult this instead of the fired-rule set.
    pub native_interop_callers: &'a HashSet<String>,
}

fn fired_any(ctx: &MethodDeepContext, rule_ids: &[&str]) -> bool {
    rule_ids.iter().any(|id| ctx.signals.rule_fired(id))
}

/// Spec §4.7 suppression: "no genuine correlated base finding (severity ≥ High from a
/// specified seed-rule set) exists" when `require_correlated_base_finding` is set.
fn has_qualifying_base_finding(ctx: &MethodDeepContext, seed_rule_ids: &[&str]) -> bool {
    ctx.findings.iter().any(|f| seed_rule_ids.contains(&f.rule_id.as_str()) && f.severity >= Severity::High)
}

fn location(ctx: &MethodDeepContext) -> String {
    format!("{}:{}", ctx.method.method_key(), ctx.method.max_offset())
}

fn finish(rule_id: &'static str, description: String, severity: Severity, ctx: &MethodDeepContext, config: &DeepAnalysisConfig, seeds: &[&str]) -> Option<Finding> {
    if config.require_correlated_base_finding && !has_qualifying_base_finding(ctx, seeds) {
        return None;
    }
    Some(Finding::new(rule_id, description, severity, location(ctx)).with_risk_score(severity_risk_score(severity)))
}

fn severity_risk_score(severity: Severity) -> i32 {
    match severity {
        Severity::Critical => 95,
        Severity::High => 75,
        Severity::Medium => 50,
        Severity::Low => 20,
    }
}

const DECODE_RULES: &[&str] = &["EncodedStringRule", "EncodedStringPipelineRule"];
const EXECUTION_SINK_RULES: &[&str] = &["ReflectionInvokeRule", "AssemblyDynamicLoadRule", "ProcessStartRule", "ObfuscatedReflectiveExecutionRule"];

pub fn deep_string_decode_flow(ctx: &MethodDeepContext, config: &DeepAnalysisConfig) -> Option<Finding> {
    if !config.enable_string_decode_flow {
        return None;
    }
    if !fired_any(ctx, DECODE_RULES) || !fired_any(ctx, EXECUTION_SINK_RULES) {
        return None;
    }
    let seeds: Vec<&str> = DECODE_RULES.iter().chain(EXECUTION_SINK_RULES.iter()).copied().collect();
    finish(
        "DeepStringDecodeFlow",
        "Encoded/obfuscated string decoded and then fed into an execution or dynamic-load sink".into(),
        Severity::High,
        ctx,
        config,
        &seeds,
    )
}

pub fn deep_execution_chain(ctx: &MethodDeepContext, config: &DeepAnalysisConfig) -> Option<Finding> {
    if !config.enable_execution_chain {
        return None;
    }
    let signals = ctx.signals;
    if !(signals.has(SignalBits::HAS_NETWORK_CALL) && signals.has(SignalBits::HAS_FILE_WRITE) && signals.has(SignalBits::HAS_PROCESS_LIKE_CALL)) {
        return None;
    }
    finish(
        "DeepExecutionChain",
        "Network download, file write, and process start all present in one method".into(),
        Severity::Critical,
        ctx,
        config,
        &["NetworkCallRule", "FileWriteRule", "ProcessStartRule"],
    )
}

pub fn deep_resource_payload(ctx: &MethodDeepContext, config: &DeepAnalysisConfig) -> Option<Finding> {
    if !config.enable_resource_payload {
        return None;
    }
    let reads_manifest_resource = ctx
        .method
        .instructions
        .iter()
        .filter_map(|i| i.as_method_ref())
        .any(|m| m.declaring_type == "System.Reflection.Assembly" && m.name == "GetManifestResourceStream");
    if !reads_manifest_resource {
        return None;
    }
    let has_crypto_or_base64 = ctx.signals.has(SignalBits::HAS_BASE64)
        || ctx
            .method
            .instructions
            .iter()
            .filter_map(|i| i.as_method_ref())
            .any(|m| m.declaring_type.starts_with("System.Security.Cryptography"));
    if !has_crypto_or_base64 || !ctx.signals.has(SignalBits::HAS_DYNAMIC_ASSEMBLY_LOAD) {
        return None;
    }
    finish(
        "DeepResourcePayload",
        "Embedded resource decoded and loaded as an assembly".into(),
        Severity::High,
        ctx,
        config,
        &["AssemblyDynamicLoadRule"],
    )
}

const FOLLOWUP_SINK_RULES: &[&str] = &["ReflectionInvokeRule", "EncodedStringRule", "EncodedStringPipelineRule", "ProcessStartRule", "ScriptHostLaunchRule"];

pub fn deep_dynamic_load_correlation(ctx: &MethodDeepContext, config: &DeepAnalysisConfig) -> Option<Finding> {
    if !config.enable_dynamic_load_correlation {
        return None;
    }
    if !ctx.signals.rule_fired("AssemblyDynamicLoadRule") || !fired_any(ctx, FOLLOWUP_SINK_RULES) {
        return None;
    }
    let is_process_or_shell = ctx.signals.rule_fired("ProcessStartRule") || ctx.signals.rule_fired("ScriptHostLaunchRule");
    let severity = if is_process_or_shell { Severity::Critical } else { Severity::High };
    let mut seeds = vec!["AssemblyDynamicLoadRule"];
    seeds.extend(FOLLOWUP_SINK_RULES);
    finish(
        "DeepDynamicLoadCorrelation",
        "Dynamic assembly load followed by a reflective or execution sink".into(),
        severity,
        ctx,
        config,
        &seeds,
    )
}

pub fn deep_native_interop_correlation(ctx: &MethodDeepContext, config: &DeepAnalysisConfig) -> Option<Finding> {
    if !config.enable_native_interop_correlation {
        return None;
    }
    if !ctx.native_interop_callers.contains(&ctx.method.method_key()) {
        return None;
    }
    let is_process_or_shell = ctx.signals.rule_fired("ProcessStartRule") || ctx.signals.rule_fired("ScriptHostLaunchRule");
    let is_dynamic_or_persistence =
        ctx.signals.rule_fired("AssemblyDynamicLoadRule") || ctx.signals.has(SignalBits::HAS_DYNAMIC_ASSEMBLY_LOAD) || ctx.signals.rule_fired("RegistryPersistenceRule");
    if !(is_process_or_shell || is_dynamic_or_persistence) {
        return None;
    }
    let severity = if is_process_or_shell { Severity::Critical } else { Severity::High };
    finish(
        "DeepNativeInteropCorrelation",
        "P/Invoke call site also reachable from process/shell or persistence behavior".into(),
        severity,
        ctx,
        config,
        &["ProcessStartRule", "ScriptHostLaunchRule", "AssemblyDynamicLoadRule", "RegistryPersistenceRule"],
    )
}

pub fn deep_script_host_launch(ctx: &MethodDeepContext, config: &DeepAnalysisConfig) -> Option<Finding> {
    if !config.enable_script_host_launch {
        return None;
    }
    if !ctx.signals.rule_fired("ScriptHostLaunchRule") {
        return None;
    }
    let corroborated = ctx.signals.has(SignalBits::HAS_NETWORK_CALL) || ctx.signals.has(SignalBits::HAS_BASE64);
    if !corroborated {
        return None;
    }
    finish(
        "DeepScriptHostLaunch",
        "Script-host launch corroborated by a network download or encoded payload in the same method".into(),
        Severity::Critical,
        ctx,
        config,
        &["ScriptHostLaunchRule"],
    )
}

pub fn deep_environment_pivot(ctx: &MethodDeepContext, config: &DeepAnalysisConfig) -> Option<Finding> {
    if !config.enable_environment_pivot {
        return None;
    }
    let has_environment_signal = ctx.signals.has(SignalBits::HAS_ENVIRONMENT_VARIABLE_MODIFICATION) || ctx.signals.has(SignalBits::HAS_PATH_MANIPULATION);
    if !has_environment_signal {
        return None;
    }
    let has_followup_sink = ctx.signals.rule_fired("ProcessStartRule") || ctx.signals.rule_fired("RegistryPersistenceRule");
    if !has_followup_sink {
        return None;
    }
    let severity = if ctx.signals.rule_fired("ProcessStartRule") { Severity::Critical } else { Severity::High };
    finish(
        "DeepEnvironmentPivot",
        "Environment/path manipulation used to pivot into a process start or persistence write".into(),
        severity,
        ctx,
        config,
        &["ProcessStartRule", "RegistryPersistenceRule"],
    )
}
