use crate::bytecode::ir::Instruction;
use crate::lang::value::Value;

// =============================================================================
// Disassembly - human-readable tape listings
// =============================================================================

/// Render a tape one instruction per line: a zero-padded position, the
/// mnemonic, the operands, and the provenance comment after a tab when
/// one was recorded.
pub fn disassemble(tape: &[Instruction]) -> String {
    let mut lines = Vec::with_capacity(tape.len());

    for (position, instruction) in tape.iter().enumerate() {
        let mut line = format!("{:05} {}", position, instruction.op.mnemonic());

        for operand in &instruction.operands {
            line.push(' ');
            line.push_str(&operand.to_string());
        }

        if let Some(comment) = &instruction.comment {
            line.push('\t');
            line.push_str(comment);
        }

        lines.push(line);
    }

    lines.join("\n")
}

/// Render the constant pool one constant per line, in pool order.
/// Function constants expand into their own listing between rules.
pub fn constants_listing(constants: &[Value]) -> String {
    let mut lines = Vec::with_capacity(constants.len());

    for constant in constants {
        match constant {
            Value::Function(function) => {
                lines.push("-----".to_string());
                lines.push(disassemble(&function.tape));
                lines.push("-----".to_string());
            }
            other => lines.push(other.to_string()),
        }
    }

    lines.join("\n")
}
