//! COM-reflection attack rule (spec §4.3, scenario 8). Single-pass signal collection
//! over the whole method, then a severity decision tree distinguishing late-bound COM
//! invocation (`Type.InvokeMember`) from ordinary reflection (`MethodInfo.Invoke`).

use modscan_core::cil::MethodDef;
use modscan_core::{Finding, Severity, SignalSet};

use crate::rule::{InstructionSequenceRule, RuleMeta};

pub const RULE_ID: &str = "ComReflectionAttackRule";

const CRITICAL_PROGID_MARKERS: &[&str] = &["shell.application", "schedule.service", "mmc20.application", "shell", "wscript"];
const HIGH_RISK_PROGIDS: &[&str] = &["scripting.filesystemobject", "adodb.stream", "msxml2.xmlhttp", "winhttp"];
const COMMAND_MARKERS: &[&str] = &["cmd.exe", "powershell", "wscript.exe", "mshta", "shellexecute"];

pub struct ComReflectionAttackRule;

impl RuleMeta for ComReflectionAttackRule {
    fn rule_id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Late-bound COM object creation and invocation via ProgID/CLSID"
    }

    fn default_severity(&self) -> Severity {
        Severity::High
    }
}

#[derive(Default)]
struct Observations {
    get_type_from_progid: bool,
    get_type_from_clsid: bool,
    activator_create_instance: bool,
    type_invoke_member: bool,
    marshal_get_active_object: bool,
    progid_literals: Vec<String>,
    command_strings: Vec<String>,
}

fn observe(method: &MethodDef) -> Observations {
    let mut obs = Observations::default();
    for instr in &method.instructions {
        if let Some(literal) = instr.as_string_literal() {
            let lower = literal.to_ascii_lowercase();
            if CRITICAL_PROGID_MARKERS.iter().any(|m| lower.contains(m)) || HIGH_RISK_PROGIDS.contains(&lower.as_str()) {
                obs.progid_literals.push(lower.clone());
            }
            if COMMAND_MARKERS.iter().any(|m| lower.contains(m)) {
                obs.command_strings.push(lower);
            }
        }
        let Some(method_ref) = instr.as_method_ref() else { continue };
        match (method_ref.declaring_type.as_str(), method_ref.name.as_str()) {
            ("System.Type", "GetTypeFromProgID") => obs.get_type_from_progid = true,
            ("System.Type", "GetTypeFromCLSID") => obs.get_type_from_clsid = true,
            ("System.Activator", "CreateInstance") => obs.activator_create_instance = true,
            ("System.Type", "InvokeMember") => obs.type_invoke_member = true,
            ("System.Runtime.InteropServices.Marshal", "GetActiveObject") => obs.marshal_get_active_object = true,
            _ => {}
        }
    }
    obs
}

impl InstructionSequenceRule for ComReflectionAttackRule {
    fn analyze_instructions(&self, method: &MethodDef, _method_signals: &SignalSet) -> Vec<Finding> {
        let obs = observe(method);
        let any_com_activity = obs.get_type_from_progid || obs.get_type_from_clsid || obs.marshal_get_active_object;
        if !any_com_activity {
            return Vec::new();
        }

        let has_critical_progid = obs.progid_literals.iter().any(|p| CRITICAL_PROGID_MARKERS.iter().any(|m| p.contains(m)));
        let has_high_risk_progid = obs.progid_literals.iter().any(|p| HIGH_RISK_PROGIDS.contains(&p.as_str()));

        let severity = if has_critical_progid {
            Severity::Critical
        } else if obs.get_type_from_progid && obs.type_invoke_member {
            Severity::Critical
        } else if obs.get_type_from_progid && !obs.command_strings.is_empty() {
            Severity::Critical
        } else if has_high_risk_progid {
            Severity::High
        } else if (obs.get_type_from_progid || obs.get_type_from_clsid) && obs.activator_create_instance {
            Severity::High
        } else if obs.marshal_get_active_object && !obs.command_strings.is_empty() {
            Severity::High
        } else {
            Severity::Medium
        };

        let location = format!("{}:{}", method.method_key(), method.max_offset());
        let description = if obs.get_type_from_progid && obs.type_invoke_member {
            "Late-bound COM invocation via Type.InvokeMember following GetTypeFromProgID — the COM attack primitive, distinct from ordinary reflection".to_string()
        } else {
            "COM object creation via ProgID/CLSID with invocation indicators".to_string()
        };

        vec![Finding::new(RULE_ID, description, severity, location)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modscan_core::cil::{Instruction, MethodRef, Opcode, Operand};

    fn method_with(instructions: Vec<Instruction>) -> MethodDef {
        MethodDef {
            name: "M".into(),
            declaring_type: "T".into(),
            namespace: "N".into(),
            is_static: true,
            instructions,
            locals: Vec::new(),
            exception_handlers: Vec::new(),
        }
    }

    #[test]
    fn full_shell_application_chain_is_critical() {
        let instrs = vec![
            Instruction::new(0, Opcode::Ldstr, Operand::String("Shell.Application".into())),
            Instruction::new(1, Opcode::Call, Operand::Method(MethodRef::new("System.Type", "GetTypeFromProgID", "System"))),
            Instruction::new(2, Opcode::Call, Operand::Method(MethodRef::new("System.Activator", "CreateInstance", "System"))),
            Instruction::new(3, Opcode::Ldstr, Operand::String("ShellExecute".into())),
            Instruction::new(4, Opcode::Callvirt, Operand::Method(MethodRef::new("System.Type", "InvokeMember", "System"))),
        ];
        let method = method_with(instrs);
        let findings = ComReflectionAttackRule.analyze_instructions(&method, &SignalSet::new());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
    }

    #[test]
    fn no_com_activity_produces_no_finding() {
        let method = method_with(vec![Instruction::new(0, Opcode::Ret, Operand::None)]);
        assert!(ComReflectionAttackRule.analyze_instructions(&method, &SignalSet::new()).is_empty());
    }
}
