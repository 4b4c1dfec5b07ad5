//! Script-host launch rule (spec §4.7 `DeepScriptHostLaunch` seed). Narrower than
//! [`crate::rules::process_start`]: fires only when a script-host LOLBin is launched
//! *with a script-file argument* (`.vbs`/`.js`/`.ps1`/`.bat`/`.hta`), the shape that
//! distinguishes "launch a script" from an ordinary PowerShell command line.

use modscan_core::cil::MethodRef;
use modscan_core::{il_helpers, Finding, Severity};

use crate::rule::{CallSiteContext, CallSiteRule, RuleMeta};

pub const RULE_ID: &str = "ScriptHostLaunchRule";

const SCRIPT_HOSTS: &[&str] = &["wscript.exe", "cscript.exe", "mshta.exe", "powershell.exe"];
const SCRIPT_EXTENSIONS: &[&str] = &[".vbs", ".js", ".ps1", ".bat", ".hta"];

pub struct ScriptHostLaunchRule;

impl RuleMeta for ScriptHostLaunchRule {
    fn rule_id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Script-host LOLBin launched with an external script-file argument"
    }

    fn default_severity(&self) -> Severity {
        Severity::High
    }
}

impl CallSiteRule for ScriptHostLaunchRule {
    fn is_suspicious(&self, method_ref: &MethodRef) -> bool {
        method_ref.declaring_type == "System.Diagnostics.Process" && method_ref.name == "Start"
    }

    fn should_suppress_finding(&self, ctx: &CallSiteContext<'_>) -> bool {
        let window = il_helpers::window(&ctx.method.instructions, ctx.call_index, il_helpers::DEFAULT_CONTEXT_WINDOW);
        let literals: Vec<&str> = window.iter().filter_map(|i| i.as_string_literal()).collect();
        let has_script_host = literals.iter().any(|l| SCRIPT_HOSTS.iter().any(|h| l.eq_ignore_ascii_case(h)));
        let has_script_arg = literals.iter().any(|l| {
            let lower = l.to_ascii_lowercase();
            SCRIPT_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
        });
        !(has_script_host && has_script_arg)
    }

    fn analyze_contextual_pattern(&self, ctx: &CallSiteContext<'_>) -> Vec<Finding> {
        let window = il_helpers::window(&ctx.method.instructions, ctx.call_index, il_helpers::DEFAULT_CONTEXT_WINDOW);
        let literals: Vec<&str> = window.iter().filter_map(|i| i.as_string_literal()).collect();
        let host = literals.iter().find(|l| SCRIPT_HOSTS.iter().any(|h| l.eq_ignore_ascii_case(h))).copied().unwrap_or("<unknown/non-literal>");
        let script = literals
            .iter()
            .find(|l| SCRIPT_EXTENSIONS.iter().any(|ext| l.to_ascii_lowercase().ends_with(ext)))
            .copied()
            .unwrap_or("<unknown/non-literal>");

        let offset = ctx.method.instructions.get(ctx.call_index).map(|i| i.offset).unwrap_or(0);
        let location = format!("{}:{}", ctx.method.method_key(), offset);
        let description = format!("{host} launched with script file {script}");

        vec![Finding::new(RULE_ID, description, Severity::High, location)]
    }
}
