use crate::bytecode::Op;
use crate::lang::value::Value;

/// One bytecode instruction: an opcode plus its integer operands.
///
/// The comment is debug-only provenance (the assembler stores the source
/// line there); it never affects execution or encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub op: Op,
    pub operands: Vec<usize>,
    pub comment: Option<String>,
}

impl Instruction {
    pub fn new(op: Op, operands: Vec<usize>) -> Self {
        Instruction {
            op,
            operands,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// A complete compiled program: the top-level tape and the constant pool
/// shared by it and every function constant inside the pool.
#[derive(Debug, Clone, PartialEq)]
pub struct Bytecode {
    pub tape: Vec<Instruction>,
    pub constants: Vec<Value>,
}

impl Bytecode {
    pub fn new(tape: Vec<Instruction>, constants: Vec<Value>) -> Self {
        Bytecode { tape, constants }
    }
}
