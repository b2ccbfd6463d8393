use crate::bytecode::ir::{Bytecode, Instruction};
use crate::bytecode::op::Op;
use crate::lang::value::Value;
use std::fmt;

// =============================================================================
// Text assembly
// =============================================================================
//
// A program in text form, one item per line:
//
//   .int 7            append an int constant to the pool
//   .float 2.5        append a float constant
//   .str some text    append a string constant (verbatim after the space)
//   .bool true        append a bool constant
//   push 0            an instruction: lowercase mnemonic + decimal operands
//
// Blank lines are skipped. Assembled instructions keep their source line
// as the debug comment, so listings show where each instruction came from.

// =============================================================================
// AsmError
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum AsmError {
    UnknownMnemonic {
        line: usize,
        text: String,
    },
    UnknownDirective {
        line: usize,
        text: String,
    },
    WrongOperandCount {
        line: usize,
        op: Op,
        expected: usize,
        got: usize,
    },
    /// A token that should have been a number (or `true`/`false`) was not.
    BadOperand {
        line: usize,
        text: String,
        expected: &'static str,
    },
}

impl AsmError {
    pub fn unknown_mnemonic(line: usize, text: &str) -> Self {
        AsmError::UnknownMnemonic {
            line,
            text: text.to_string(),
        }
    }

    pub fn unknown_directive(line: usize, text: &str) -> Self {
        AsmError::UnknownDirective {
            line,
            text: text.to_string(),
        }
    }

    pub fn wrong_operand_count(line: usize, op: Op, expected: usize, got: usize) -> Self {
        AsmError::WrongOperandCount {
            line,
            op,
            expected,
            got,
        }
    }

    pub fn bad_operand(line: usize, text: &str, expected: &'static str) -> Self {
        AsmError::BadOperand {
            line,
            text: text.to_string(),
            expected,
        }
    }
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmError::UnknownMnemonic { line, text } => {
                write!(f, "asm error: line {}: unknown mnemonic {:?}", line, text)?;
                write!(f, "\n  hint: mnemonics are lowercase, like push or add_int")
            }
            AsmError::UnknownDirective { line, text } => {
                write!(f, "asm error: line {}: unknown directive .{}", line, text)?;
                write!(f, "\n  hint: constants are .int, .float, .str or .bool")
            }
            AsmError::WrongOperandCount {
                line,
                op,
                expected,
                got,
            } => {
                write!(
                    f,
                    "asm error: line {}: {} takes {} operands, got {}",
                    line,
                    op.mnemonic().to_lowercase(),
                    expected,
                    got
                )
            }
            AsmError::BadOperand {
                line,
                text,
                expected,
            } => {
                write!(
                    f,
                    "asm error: line {}: cannot parse {:?} as {}",
                    line, text, expected
                )
            }
        }
    }
}

impl std::error::Error for AsmError {}

// =============================================================================
// Assembling
// =============================================================================

/// Assemble a text program into a tape and constant pool. Lines are
/// numbered from 1, blanks included, so errors point at the editor line.
pub fn assemble(source: &str) -> Result<Bytecode, AsmError> {
    let mut tape = Vec::new();
    let mut constants = Vec::new();

    for (index, raw) in source.lines().enumerate() {
        let number = index + 1;
        let line = raw.trim();

        if line.is_empty() {
            continue;
        }

        if let Some(directive) = line.strip_prefix('.') {
            constants.push(parse_directive(number, directive)?);
        } else {
            tape.push(parse_instruction(number, line)?);
        }
    }

    Ok(Bytecode::new(tape, constants))
}

fn parse_directive(number: usize, directive: &str) -> Result<Value, AsmError> {
    let (keyword, payload) = match directive.split_once(' ') {
        Some((keyword, payload)) => (keyword, payload),
        None => (directive, ""),
    };

    match keyword {
        // 32-bit range, matching what the binary format can carry
        "int" => payload
            .trim()
            .parse::<i32>()
            .map(|value| Value::Int(value as i64))
            .map_err(|_| AsmError::bad_operand(number, payload.trim(), "an int")),
        "float" => payload
            .trim()
            .parse::<f32>()
            .map(Value::Float)
            .map_err(|_| AsmError::bad_operand(number, payload.trim(), "a float")),
        "str" => Ok(Value::Str(payload.to_string())),
        "bool" => match payload.trim() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            other => Err(AsmError::bad_operand(number, other, "a bool")),
        },
        _ => Err(AsmError::unknown_directive(number, keyword)),
    }
}

fn parse_instruction(number: usize, line: &str) -> Result<Instruction, AsmError> {
    let (mnemonic, rest) = match line.split_once(char::is_whitespace) {
        Some((mnemonic, rest)) => (mnemonic, rest),
        None => (line, ""),
    };

    let op = Op::from_mnemonic(mnemonic)
        .ok_or_else(|| AsmError::unknown_mnemonic(number, mnemonic))?;

    let mut operands = Vec::with_capacity(op.operand_count());
    for token in rest.split_whitespace() {
        let operand = token
            .parse::<u16>()
            .map_err(|_| AsmError::bad_operand(number, token, "an operand"))?;
        operands.push(operand as usize);
    }

    if operands.len() != op.operand_count() {
        return Err(AsmError::wrong_operand_count(
            number,
            op,
            op.operand_count(),
            operands.len(),
        ));
    }

    Ok(Instruction::new(op, operands).with_comment(line))
}
