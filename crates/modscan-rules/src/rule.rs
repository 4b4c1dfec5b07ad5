//! Rule capability set (spec §3 "Rule", §4.1, §9 design note "replace interface default
//! methods with a capability set"). Rather than one fat trait with seven near-empty
//! default methods, each analysis capability is its own trait; a concrete rule implements
//! only the ones it actually performs, plus the uniform [`RuleMeta`] every rule carries.

use modscan_core::cil::{MethodDef, MethodRef, Module};
use modscan_core::{DeveloperGuidance, Finding, ScanConfig, Severity, SignalSet};

/// Identity and bookkeeping every rule exposes regardless of which capabilities it
/// implements (spec §3: "every rule exposes `rule_id`, `description`, `severity`,
/// `requires_companion_finding`, optional `developer_guidance`").
pub trait RuleMeta: Send + Sync {
    fn rule_id(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn default_severity(&self) -> Severity;

    /// Spec §4.1 companion-finding gate. Most rules stand on their own evidence.
    fn requires_companion_finding(&self) -> bool {
        false
    }

    fn developer_guidance(&self) -> Option<DeveloperGuidance> {
        None
    }
}

/// Context handed to a [`CallSiteRule`] at one resolved call/callvirt/newobj instruction
/// (spec §4.1 `analyze_contextual_pattern`/`should_suppress_finding` parameters).
pub struct CallSiteContext<'a> {
    pub method: &'a MethodDef,
    pub call_index: usize,
    pub method_ref: &'a MethodRef,
    pub method_signals: &'a SignalSet,
    pub type_signals: Option<&'a SignalSet>,
    pub config: &'a ScanConfig,
}

/// Rules that classify and react to individual call sites: `is_suspicious`,
/// `should_suppress_finding`, `analyze_contextual_pattern` (spec §4.1, §4.2 step 2).
pub trait CallSiteRule: RuleMeta {
    /// Pure, cheap, total classification — spec §4.1: "return false on null/undecidable
    /// input... idempotent, referentially transparent."
    fn is_suspicious(&self, method_ref: &MethodRef) -> bool;

    /// Veto gate consulted before a proposed finding is emitted.
    fn should_suppress_finding(&self, _ctx: &CallSiteContext<'_>) -> bool {
        false
    }

    fn analyze_contextual_pattern(&self, ctx: &CallSiteContext<'_>) -> Vec<Finding>;
}

/// Rules that scan a method's full instruction sequence once, after the call-site pass
/// (spec §4.2 step 3: "holistic pattern matching").
pub trait InstructionSequenceRule: RuleMeta {
    fn analyze_instructions(&self, method: &MethodDef, method_signals: &SignalSet) -> Vec<Finding>;
}

/// Rules invoked once per string-load instruction (spec §4.1 `analyze_string_literal`).
pub trait StringLiteralRule: RuleMeta {
    fn analyze_string_literal(
        &self,
        literal: &str,
        method: &MethodDef,
        instruction_index: usize,
        config: &ScanConfig,
    ) -> Vec<Finding>;
}

/// Rules invoked once per assembly against module-level metadata (spec §4.1
/// `analyze_assembly_metadata`).
pub trait AssemblyMetadataRule: RuleMeta {
    fn analyze_assembly_metadata(&self, module: &Module) -> Vec<Finding>;
}

/// Rules consulted after every method in the module has been walked (spec §4.1
/// `post_analysis_refine`). Per the Open Question resolution in DESIGN.md, a refiner may
/// only add findings and may override severity on findings carrying its own `rule_id` —
/// never remove or touch another rule's finding.
pub trait PostAnalysisRefiner: RuleMeta {
    fn post_analysis_refine(&self, module: &Module, existing_findings: &[Finding]) -> Vec<Finding>;

    fn override_severity(&self, _finding: &Finding) -> Option<Severity> {
        None
    }
}
