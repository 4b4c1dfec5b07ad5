//! IL-instruction helpers (spec §2 "IL-instruction helpers", §4.2 "windowing and literal
//! resolution"). Pure functions over an instruction slice; no mutable state, shared by
//! both the rule engine and the instruction analyzer so rules can resolve their own
//! contextual windows without reaching back into analyzer internals.

use crate::cil::{Instruction, Opcode, Operand};

/// Default window radius around a call site that contextual-pattern rules get to walk
/// (spec §4.2: "a bounded window (default ±10 instructions)").
pub const DEFAULT_CONTEXT_WINDOW: usize = 10;

/// Slice of `instructions` spanning `[index - radius, index + radius]`, clamped to the
/// method body's bounds.
pub fn window(instructions: &[Instruction], index: usize, radius: usize) -> &[Instruction] {
    let start = index.saturating_sub(radius);
    let end = (index + radius + 1).min(instructions.len());
    &instructions[start..end]
}

/// Walks backward from `index` looking for the literal `i32` most recently pushed to the
/// stack, stopping at the first call/branch/pop that would invalidate a naive trace.
/// Returns `None` (`<unknown/non-literal>`) rather than guessing.
pub fn try_resolve_int32_literal(instructions: &[Instruction], index: usize) -> Option<i32> {
    for instr in instructions[..index].iter().rev() {
        match &instr.opcode {
            Opcode::LdcI4 => return instr.as_int32(),
            Opcode::Nop => continue,
            _ => return None,
        }
    }
    None
}

/// Walks backward from `index` looking for the nearest string literal pushed to the
/// stack (used by rules that need "the argument just before this call").
pub fn try_resolve_preceding_string_literal(instructions: &[Instruction], index: usize) -> Option<&str> {
    instructions[..index]
        .iter()
        .rev()
        .find_map(|i| i.as_string_literal())
}

pub fn try_get_local_index(instr: &Instruction) -> Option<u16> {
    match (&instr.opcode, &instr.operand) {
        (Opcode::Ldloc, Operand::Local(idx)) => Some(*idx),
        _ => None,
    }
}

pub fn try_get_stored_local_index(instr: &Instruction) -> Option<u16> {
    match (&instr.opcode, &instr.operand) {
        (Opcode::Stloc, Operand::Local(idx)) => Some(*idx),
        _ => None,
    }
}

pub fn try_get_argument_index(instr: &Instruction) -> Option<u16> {
    match (&instr.opcode, &instr.operand) {
        (Opcode::Ldarg, Operand::Arg(idx)) => Some(*idx),
        _ => None,
    }
}

/// Coarse stack-delta estimate for a single opcode, used by the instruction analyzer to
/// maintain a logical call-site index without a full verifier-grade stack simulation.
pub fn stack_delta(opcode: &Opcode) -> i32 {
    match opcode {
        Opcode::Nop | Opcode::Ret | Opcode::Br | Opcode::Leave => 0,
        Opcode::Ldstr | Opcode::LdcI4 | Opcode::LdcI8 | Opcode::Ldloc | Opcode::Ldarg
        | Opcode::Dup | Opcode::Ldsfld => 1,
        Opcode::Stloc | Opcode::Starg | Opcode::Pop | Opcode::Brtrue | Opcode::Brfalse
        | Opcode::Stsfld | Opcode::Throw => -1,
        Opcode::ConvU2 | Opcode::ConvI4 | Opcode::Box | Opcode::Castclass | Opcode::Isinst => 0,
        Opcode::Ldfld => 0,
        Opcode::Stfld => -2,
        // Calls vary by arity/return; callers that need precision track arity out of band.
        Opcode::Call | Opcode::Callvirt | Opcode::Newobj => 0,
        Opcode::Other(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cil::MethodRef;

    fn instr(offset: u32, opcode: Opcode, operand: Operand) -> Instruction {
        Instruction::new(offset, opcode, operand)
    }

    #[test]
    fn resolves_integer_literal_immediately_preceding() {
        let instrs = vec![
            instr(0, Opcode::LdcI4, Operand::Int32(42)),
            instr(
                1,
                Opcode::Call,
                Operand::Method(MethodRef::new("T", "M", "A")),
            ),
        ];
        assert_eq!(try_resolve_int32_literal(&instrs, 1), Some(42));
    }

    #[test]
    fn unresolved_when_intervening_call_breaks_the_trace() {
        let instrs = vec![
            instr(0, Opcode::LdcI4, Operand::Int32(42)),
            instr(1, Opcode::Call, Operand::Method(MethodRef::new("T", "M", "A"))),
            instr(2, Opcode::Call, Operand::Method(MethodRef::new("T", "N", "A"))),
        ];
        assert_eq!(try_resolve_int32_literal(&instrs, 2), None);
    }

    #[test]
    fn window_clamps_to_method_bounds() {
        let instrs: Vec<Instruction> = (0..5)
            .map(|i| instr(i, Opcode::Nop, Operand::None))
            .collect();
        let w = window(&instrs, 0, 10);
        assert_eq!(w.len(), 5);
    }
}
