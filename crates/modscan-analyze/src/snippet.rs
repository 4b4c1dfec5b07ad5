//! Windowed IL text rendering (spec §2 "Code-snippet builder"). Turns a slice of
//! instructions into a readable mnemonic dump with the triggering offset marked, used to
//! populate `Finding::code_snippet` and the nodes of consolidated call chains.

use modscan_core::cil::{Instruction, Operand};
use modscan_core::il_helpers;

fn operand_repr(operand: &Operand) -> String {
    match operand {
        Operand::None => String::new(),
        Operand::Int32(v) => v.to_string(),
        Operand::Int64(v) => v.to_string(),
        Operand::String(s) => format!("{s:?}"),
        Operand::Method(m) => m.qualified_name(),
        Operand::Type(t) => t.clone(),
        Operand::Local(idx) => format!("V_{idx}"),
        Operand::Arg(idx) => format!("A_{idx}"),
        Operand::Unresolved => "<unknown/non-literal>".to_string(),
    }
}

fn render_line(instr: &Instruction, highlight: bool) -> String {
    let marker = if highlight { ">" } else { " " };
    let operand = operand_repr(&instr.operand);
    if operand.is_empty() {
        format!("{marker} IL_{:04x}: {}", instr.offset, instr.opcode.mnemonic())
    } else {
        format!("{marker} IL_{:04x}: {} {}", instr.offset, instr.opcode.mnemonic(), operand)
    }
}

/// Renders the `±radius` window around `index`, marking the instruction at `index` with
/// a leading `>`.
pub fn render_window(instructions: &[Instruction], index: usize, radius: usize) -> String {
    let start = index.saturating_sub(radius);
    let window = il_helpers::window(instructions, index, radius);
    window
        .iter()
        .enumerate()
        .map(|(i, instr)| render_line(instr, start + i == index))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders the default ±10-instruction window used by contextual-pattern rules.
pub fn render_default_window(instructions: &[Instruction], index: usize) -> String {
    render_window(instructions, index, il_helpers::DEFAULT_CONTEXT_WINDOW)
}

/// Joins several already-rendered snippets into one combined call-chain snippet
/// (spec §4.5 "a combined code snippet").
pub fn combine(snippets: &[String]) -> String {
    snippets.join("\n---\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use modscan_core::cil::{MethodRef, Opcode};

    #[test]
    fn marks_the_triggering_instruction() {
        let instrs = vec![
            Instruction::new(0, Opcode::Ldstr, Operand::String("calc.exe".into())),
            Instruction::new(1, Opcode::Call, Operand::Method(MethodRef::new("System.Diagnostics.Process", "Start", "System"))),
        ];
        let rendered = render_window(&instrs, 1, 10);
        assert!(rendered.contains("> IL_0001: call System.Diagnostics.Process::Start"));
        assert!(rendered.contains("  IL_0000: ldstr \"calc.exe\""));
    }

    #[test]
    fn unresolved_operand_renders_as_unknown() {
        let instrs = vec![Instruction::new(0, Opcode::Ldloc, Operand::Unresolved)];
        assert!(render_window(&instrs, 0, 2).contains("<unknown/non-literal>"));
    }
}
