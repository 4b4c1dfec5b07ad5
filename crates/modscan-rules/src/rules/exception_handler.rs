//! Exception-handler suspicious-catch rule (spec §2 "Local-variable & exception-handler
//! analyzers" secondary pass). Flags a broad catch (no type, or `System.Exception`)
//! wrapped tightly around a risky operation — a common way to swallow the failure of a
//! download/execute attempt without surfacing it to the user.

use modscan_core::cil::{ExceptionHandlerKind, MethodDef};
use modscan_core::{Finding, Severity, SignalSet};

use crate::rule::{InstructionSequenceRule, RuleMeta};

pub const RULE_ID: &str = "SuspiciousExceptionHandlingRule";

const RISKY_CALL_TYPES: &[&str] = &[
    "System.Diagnostics.Process",
    "System.Reflection.Assembly",
    "System.Reflection.MethodInfo",
    "System.Reflection.MethodBase",
    "System.Net.WebClient",
    "System.Net.Http.HttpClient",
    "Microsoft.Win32.Registry",
];

/// A handler body this short is almost certainly `catch { }` or a single log statement —
/// not real recovery logic.
const SWALLOW_HANDLER_MAX_INSTRUCTIONS: u32 = 3;

pub struct ExceptionHandlerRule;

impl RuleMeta for ExceptionHandlerRule {
    fn rule_id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Broad catch block tightly wrapping a risky operation, likely swallowing its failure"
    }

    fn default_severity(&self) -> Severity {
        Severity::Medium
    }
}

fn try_region_has_risky_call(method: &MethodDef, try_start: u32, try_end: u32) -> bool {
    method
        .instructions
        .iter()
        .filter(|i| i.offset >= try_start && i.offset < try_end)
        .filter_map(|i| i.as_method_ref())
        .any(|m| RISKY_CALL_TYPES.contains(&m.declaring_type.as_str()))
}

fn is_broad_catch_type(catch_type: &Option<String>) -> bool {
    match catch_type {
        None => true,
        Some(t) => t == "System.Exception" || t == "System.Object",
    }
}

impl InstructionSequenceRule for ExceptionHandlerRule {
    fn analyze_instructions(&self, method: &MethodDef, _method_signals: &SignalSet) -> Vec<Finding> {
        let mut findings = Vec::new();
        for handler in &method.exception_handlers {
            if handler.kind != ExceptionHandlerKind::Catch {
                continue;
            }
            if !is_broad_catch_type(&handler.catch_type) {
                continue;
            }
            let handler_len = handler.handler_end.saturating_sub(handler.handler_start);
            if handler_len > SWALLOW_HANDLER_MAX_INSTRUCTIONS {
                continue;
            }
            if !try_region_has_risky_call(method, handler.try_start, handler.try_end) {
                continue;
            }
            let location = format!("{}:{}", method.method_key(), handler.try_start);
            findings.push(Finding::new(
                RULE_ID,
                "Risky operation wrapped in a broad catch block with little or no handler body",
                Severity::Medium,
                location,
            ));
        }
        findings
    }
}
