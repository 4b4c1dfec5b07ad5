//! Encoded-string pipeline rule (spec §4.3, scenario 5): `Int32.Parse → conv.u2 →
//! Enumerable.Select<string,char> → String.Concat<char>`, in that exact order.
//! Reordering (e.g. Concat before Select) must not match.

use modscan_core::cil::{MethodDef, Opcode};
use modscan_core::{Finding, Severity, SignalSet};

use crate::rule::{InstructionSequenceRule, RuleMeta};

pub const RULE_ID: &str = "EncodedStringPipelineRule";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Stage {
    SeekParse,
    SeekConv,
    SeekSelect,
    SeekConcat,
    Matched,
}

fn matches_pipeline(method: &MethodDef) -> bool {
    let mut stage = Stage::SeekParse;
    for instr in &method.instructions {
        match stage {
            Stage::SeekParse => {
                if let Some(m) = instr.as_method_ref() {
                    if m.declaring_type == "System.Int32" && m.name == "Parse" {
                        stage = Stage::SeekConv;
                    }
                }
            }
            Stage::SeekConv => {
                if instr.opcode == Opcode::ConvU2 {
                    stage = Stage::SeekSelect;
                }
            }
            Stage::SeekSelect => {
                if let Some(m) = instr.as_method_ref() {
                    if m.name == "Select" {
                        stage = Stage::SeekConcat;
                    }
                }
            }
            Stage::SeekConcat => {
                if let Some(m) = instr.as_method_ref() {
                    if m.declaring_type == "System.String" && m.name == "Concat" {
                        stage = Stage::Matched;
                        break;
                    }
                }
            }
            Stage::Matched => break,
        }
    }
    stage == Stage::Matched
}

pub struct EncodedStringPipelineRule;

impl RuleMeta for EncodedStringPipelineRule {
    fn rule_id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Int32.Parse -> conv.u2 -> Select<char> -> String.Concat character-reconstruction pipeline"
    }

    fn default_severity(&self) -> Severity {
        Severity::High
    }
}

impl InstructionSequenceRule for EncodedStringPipelineRule {
    fn analyze_instructions(&self, method: &MethodDef, _method_signals: &SignalSet) -> Vec<Finding> {
        if !matches_pipeline(method) {
            return Vec::new();
        }
        let location = format!("{}:{}", method.method_key(), method.max_offset());
        vec![Finding::new(
            RULE_ID,
            "Character-reconstruction pipeline (Int32.Parse/conv.u2/Select/Concat) typical of obfuscated string decoding",
            Severity::High,
            location,
        )]
    }
}
