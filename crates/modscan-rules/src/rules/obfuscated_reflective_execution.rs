//! Obfuscated reflective execution rule (spec §4.3, scenario 6). Scores three axes —
//! decode, sink, danger — from the method's instruction sequence and pre-computed
//! signals, then applies weighted thresholds. Constants here are explicitly called out
//! in spec §9 as initial values, not tuned law.

use modscan_core::cil::{MethodDef, Opcode};
use modscan_core::{Finding, Severity, SignalBits, SignalSet};

use crate::classification::{contains_dangerous_substring, is_lolbin};
use crate::rule::{InstructionSequenceRule, RuleMeta};
use crate::rules::encoded_string::decode_candidate;

pub const RULE_ID: &str = "ObfuscatedReflectiveExecutionRule";

const DECODE_THRESHOLD: i32 = 25;
const SINK_THRESHOLD: i32 = 35;
const TOTAL_THRESHOLD: i32 = 70;
const REFLECTION_SINK_DANGER_FLOOR: i32 = 10;
const REFLECTION_SINK_DECODE_FLOOR: i32 = 45;
const CRITICAL_TOTAL_THRESHOLD: i32 = 90;

pub struct ObfuscatedReflectiveExecutionRule;

impl RuleMeta for ObfuscatedReflectiveExecutionRule {
    fn rule_id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Weighted obfuscation/decode + execution-sink + danger-pivot score crosses the reflective-execution threshold"
    }

    fn default_severity(&self) -> Severity {
        Severity::High
    }
}

struct Scores {
    decode: i32,
    sink: i32,
    danger: i32,
    strong_decode_primitive: bool,
    execution_sink: bool,
}

fn score(method: &MethodDef, signals: &SignalSet) -> Scores {
    let mut decode = 0;
    let mut sink = 0;
    let mut danger = 0;
    let mut strong_decode_primitive = false;

    if signals.has(SignalBits::HAS_BASE64) {
        decode += 20;
        strong_decode_primitive = true;
    }

    let mut saw_select = false;
    let mut saw_decodable_literal = false;
    let mut saw_conv_u2 = false;
    for instr in &method.instructions {
        if let Some(m) = instr.as_method_ref() {
            match (m.declaring_type.as_str(), m.name.as_str()) {
                ("System.Int32", "Parse") => {
                    decode += 15;
                    strong_decode_primitive = true;
                }
                ("System.Text.Encoding", "GetString") => {
                    decode += 15;
                    strong_decode_primitive = true;
                }
                (t, "Select") if t.starts_with("System.Linq") || t.starts_with("System.Collections") => {
                    saw_select = true;
                }
                _ => {}
            }
        }
        if instr.opcode == Opcode::ConvU2 {
            saw_conv_u2 = true;
        }
        if let Some(literal) = instr.as_string_literal() {
            if is_lolbin(literal) || contains_dangerous_substring(literal) {
                danger += 15;
            }
            if decode_candidate(literal).is_some() {
                saw_decodable_literal = true;
            }
        }
    }
    if saw_select {
        decode += 10;
        strong_decode_primitive = true;
    }
    // A numeric-tokenized literal feeding Int32.Parse and reassembled char-by-char via
    // conv.u2 is the same decode idiom as an explicit FromBase64String call, just spelled
    // out by hand; weight it the same as a strong decode primitive.
    if saw_decodable_literal && saw_conv_u2 {
        decode += 10;
        strong_decode_primitive = true;
    }

    if signals.has(SignalBits::HAS_DYNAMIC_ASSEMBLY_LOAD) {
        sink += 20;
    }
    if signals.has(SignalBits::HAS_SUSPICIOUS_REFLECTION) {
        sink += 20;
    }
    if signals.has(SignalBits::HAS_PROCESS_LIKE_CALL) {
        sink += 25;
    }

    if signals.has(SignalBits::HAS_NETWORK_CALL) {
        danger += 10;
    }
    if signals.has(SignalBits::HAS_FILE_WRITE) {
        danger += 10;
    }

    let execution_sink = signals.has(SignalBits::HAS_DYNAMIC_ASSEMBLY_LOAD) || signals.has(SignalBits::HAS_PROCESS_LIKE_CALL);

    Scores { decode, sink, danger, strong_decode_primitive, execution_sink }
}

impl InstructionSequenceRule for ObfuscatedReflectiveExecutionRule {
    fn analyze_instructions(&self, method: &MethodDef, method_signals: &SignalSet) -> Vec<Finding> {
        let s = score(method, method_signals);
        let total = s.decode + s.sink + s.danger;

        if !s.strong_decode_primitive || s.decode < DECODE_THRESHOLD || s.sink < SINK_THRESHOLD || total < TOTAL_THRESHOLD {
            return Vec::new();
        }

        if !s.execution_sink {
            // Reflection-only sink: require a corroborating danger/decode floor.
            let corroborated = s.danger >= REFLECTION_SINK_DANGER_FLOOR || s.decode >= REFLECTION_SINK_DECODE_FLOOR;
            if !corroborated {
                return Vec::new();
            }
        }

        let severity = if total >= CRITICAL_TOTAL_THRESHOLD && s.execution_sink && s.danger >= REFLECTION_SINK_DANGER_FLOOR {
            Severity::Critical
        } else {
            Severity::High
        };

        let location = format!("{}:{}", method.method_key(), method.max_offset());
        let description = format!(
            "obfuscation/decode chain feeding a reflective execution sink (decode={}, sink={}, danger={}, total={total})",
            s.decode, s.sink, s.danger
        );

        vec![Finding::new(RULE_ID, description, severity, location).with_risk_score(total.min(100))]
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
    fn full_scenario_six_chain_is_critical() {
        let instrs = vec![
            Instruction::new(0, Opcode::Ldstr, Operand::String("112-111-119-101-114-115-104-101-108-108-46-101-120-101".into())),
            Instruction::new(1, Opcode::Call, Operand::Method(MethodRef::new("System.Int32", "Parse", "System"))),
            Instruction::new(2, Opcode::ConvU2, Operand::None),
            Instruction::new(3, Opcode::Call, Operand::Method(MethodRef::new("System.Reflection.Assembly", "Load", "System"))),
            Instruction::new(4, Opcode::Call, Operand::Method(MethodRef::new("System.Reflection.MethodInfo", "Invoke", "System"))),
            Instruction::new(5, Opcode::Ldstr, Operand::String("powershell.exe".into())),
            Instruction::new(6, Opcode::Ldstr, Operand::String("-ep bypass -enc payload".into())),
            Instruction::new(7, Opcode::Call, Operand::Method(MethodRef::new("System.Diagnostics.Process", "Start", "System"))),
        ];
        let method = method_with(instrs);
        // No HAS_BASE64 here: the decode score comes entirely from the numeric-tokenized
        // literal plus the Int32.Parse/conv.u2 pair above, matching what the full pipeline
        // would produce without a FromBase64String call anywhere in the method.
        let mut signals = SignalSet::new();
        signals.set(SignalBits::HAS_DYNAMIC_ASSEMBLY_LOAD);
        signals.set(SignalBits::HAS_SUSPICIOUS_REFLECTION);
        signals.set(SignalBits::HAS_PROCESS_LIKE_CALL);

        let findings = ObfuscatedReflectiveExecutionRule.analyze_instructions(&method, &signals);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert!(findings[0].risk_score.unwrap() >= 90);
        assert!(findings[0].description.contains("obfuscation/decode"));
    }

    #[test]
    fn low_scores_produce_no_finding() {
        let method = method_with(vec![Instruction::new(0, Opcode::Ret, Operand::None)]);
        assert!(ObfuscatedReflectiveExecutionRule.analyze_instructions(&method, &SignalSet::new()).is_empty());
    }
}
