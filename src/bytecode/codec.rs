use crate::bytecode::ir::{Bytecode, Instruction};
use crate::bytecode::op::Op;
use crate::lang::value::{Function, Value};
use std::fmt;
use std::rc::Rc;

// =============================================================================
// Binary program format
// =============================================================================
//
// Layout, all multi-byte integers big-endian:
//
//   "FENCY"                     magic
//   u8                          format version
//   u16                         constant count
//   constants                   tag byte + payload each
//   u32                         instruction section length in bytes
//   instructions                op byte + u16 per encoded operand
//
// Function constants nest their own instruction encoding behind a u16
// byte length; their constants live in the shared pool, so nothing else
// is nested.

pub const MAGIC: &[u8; 5] = b"FENCY";
pub const VERSION: u8 = 1;

const TAG_NONE: u8 = 0;
const TAG_INT: u8 = 1;
const TAG_FLOAT: u8 = 2;
const TAG_STRING: u8 = 3;
const TAG_BOOL: u8 = 4;
const TAG_FUNCTION: u8 = 5;

// =============================================================================
// CodecError
// =============================================================================

/// Produced when a byte stream cannot be read back as a program, or a
/// program holds values the format cannot carry.
#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    /// The stream does not start with the magic bytes.
    BadMagic { found: Vec<u8> },
    /// The stream is a program but from a different format version.
    UnsupportedVersion { found: u8 },
    /// A constant carries a tag byte outside the known set.
    UnknownConstantTag { tag: u8 },
    /// An instruction byte maps to no opcode.
    UnknownOpcode { byte: u8 },
    /// The constant pool holds a value with no serialized form.
    UnsupportedConstant { type_name: &'static str },
    /// An instruction is missing an operand its opcode requires.
    MissingOperand { op: Op },
    /// A count, length or operand is too large for its wire field.
    TooLarge {
        what: &'static str,
        value: usize,
        max: usize,
    },
    /// The stream ended in the middle of a section.
    UnexpectedEof { section: &'static str },
}

impl CodecError {
    pub fn bad_magic(found: &[u8]) -> Self {
        CodecError::BadMagic {
            found: found.to_vec(),
        }
    }

    pub fn too_large(what: &'static str, value: usize, max: usize) -> Self {
        CodecError::TooLarge { what, value, max }
    }

    pub fn unexpected_eof(section: &'static str) -> Self {
        CodecError::UnexpectedEof { section }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::BadMagic { found } => {
                write!(f, "codec error: bad magic bytes {:?}", found)?;
                write!(f, "\n  hint: is this a compiled program file?")
            }
            CodecError::UnsupportedVersion { found } => {
                write!(f, "codec error: unsupported format version {}", found)?;
                write!(f, "\n  hint: this build reads version {}", VERSION)
            }
            CodecError::UnknownConstantTag { tag } => {
                write!(f, "codec error: unknown constant tag {}", tag)
            }
            CodecError::UnknownOpcode { byte } => {
                write!(f, "codec error: unknown opcode byte {}", byte)
            }
            CodecError::UnsupportedConstant { type_name } => {
                write!(f, "codec error: cannot serialize a {} constant", type_name)
            }
            CodecError::MissingOperand { op } => {
                write!(f, "codec error: {} is missing an operand", op)
            }
            CodecError::TooLarge { what, value, max } => {
                write!(
                    f,
                    "codec error: {} {} exceeds the format limit of {}",
                    what, value, max
                )
            }
            CodecError::UnexpectedEof { section } => {
                write!(f, "codec error: unexpected end of data in {}", section)
            }
        }
    }
}

impl std::error::Error for CodecError {}

// =============================================================================
// Encoding
// =============================================================================

/// Serialize a program into the binary format.
pub fn encode(bytecode: &Bytecode) -> Result<Vec<u8>, CodecError> {
    let mut buffer = Vec::new();

    buffer.extend_from_slice(MAGIC);
    buffer.push(VERSION);

    encode_constants(&mut buffer, &bytecode.constants)?;

    let tape = encode_tape(&bytecode.tape)?;
    buffer.extend_from_slice(&(tape.len() as u32).to_be_bytes());
    buffer.extend_from_slice(&tape);

    Ok(buffer)
}

/// Counts, lengths and operands travel as u16; anything larger has no
/// wire form and must be refused rather than truncated.
fn fit_u16(what: &'static str, value: usize) -> Result<u16, CodecError> {
    u16::try_from(value).map_err(|_| CodecError::too_large(what, value, u16::MAX as usize))
}

fn encode_constants(buffer: &mut Vec<u8>, constants: &[Value]) -> Result<(), CodecError> {
    buffer.extend_from_slice(&fit_u16("constant count", constants.len())?.to_be_bytes());

    for constant in constants {
        match constant {
            Value::Null => buffer.push(TAG_NONE),
            Value::Int(value) => {
                buffer.push(TAG_INT);
                buffer.extend_from_slice(&(*value as u32).to_be_bytes());
            }
            Value::Float(value) => {
                buffer.push(TAG_FLOAT);
                buffer.extend_from_slice(&value.to_bits().to_be_bytes());
            }
            Value::Str(value) => {
                buffer.push(TAG_STRING);
                buffer.extend_from_slice(&fit_u16("string length", value.len())?.to_be_bytes());
                buffer.extend_from_slice(value.as_bytes());
            }
            Value::Bool(value) => {
                buffer.push(TAG_BOOL);
                buffer.push(*value as u8);
            }
            Value::Function(function) => {
                let tape = encode_tape(&function.tape)?;
                buffer.push(TAG_FUNCTION);
                buffer.extend_from_slice(&fit_u16("function length", tape.len())?.to_be_bytes());
                buffer.extend_from_slice(&tape);
            }
            other => {
                return Err(CodecError::UnsupportedConstant {
                    type_name: other.type_name(),
                });
            }
        }
    }

    Ok(())
}

/// Serialize a tape on its own, without header or constants. Operands past
/// each opcode's wire count are dropped; ARRAY, HASH and BUILTIN encode
/// without any.
pub fn encode_tape(tape: &[Instruction]) -> Result<Vec<u8>, CodecError> {
    let mut buffer = Vec::new();

    for instruction in tape {
        buffer.push(instruction.op as u8);
        for slot in 0..instruction.op.encoded_operand_count() {
            let operand = instruction
                .operands
                .get(slot)
                .copied()
                .ok_or(CodecError::MissingOperand {
                    op: instruction.op,
                })?;
            buffer.extend_from_slice(&fit_u16("operand", operand)?.to_be_bytes());
        }
    }

    Ok(buffer)
}

// =============================================================================
// Decoding
// =============================================================================

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Reader { data, pos: 0 }
    }

    fn done(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take(&mut self, count: usize, section: &'static str) -> Result<&'a [u8], CodecError> {
        let end = self.pos + count;
        if end > self.data.len() {
            return Err(CodecError::unexpected_eof(section));
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn byte(&mut self, section: &'static str) -> Result<u8, CodecError> {
        Ok(self.take(1, section)?[0])
    }

    fn u16(&mut self, section: &'static str) -> Result<u16, CodecError> {
        let bytes = self.take(2, section)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self, section: &'static str) -> Result<u32, CodecError> {
        let bytes = self.take(4, section)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

/// Read a serialized program back into a runnable form.
pub fn decode(data: &[u8]) -> Result<Bytecode, CodecError> {
    let mut reader = Reader::new(data);

    let magic = reader.take(MAGIC.len(), "magic")?;
    if magic != MAGIC {
        return Err(CodecError::bad_magic(magic));
    }

    let version = reader.byte("version")?;
    if version != VERSION {
        return Err(CodecError::UnsupportedVersion { found: version });
    }

    let constants = decode_constants(&mut reader)?;

    let tape_length = reader.u32("instruction length")? as usize;
    let tape_bytes = reader.take(tape_length, "instructions")?;
    let tape = decode_tape(tape_bytes)?;

    Ok(Bytecode::new(tape, constants))
}

fn decode_constants(reader: &mut Reader) -> Result<Vec<Value>, CodecError> {
    let count = reader.u16("constant count")?;
    let mut constants = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let tag = reader.byte("constant tag")?;
        let value = match tag {
            TAG_NONE => Value::Null,
            TAG_INT => {
                // stored as 32 bits, sign restored on the way out
                let raw = reader.u32("int constant")?;
                Value::Int(raw as i32 as i64)
            }
            TAG_FLOAT => Value::Float(f32::from_bits(reader.u32("float constant")?)),
            TAG_STRING => {
                let length = reader.u16("string length")? as usize;
                let bytes = reader.take(length, "string constant")?;
                Value::Str(String::from_utf8_lossy(bytes).into_owned())
            }
            TAG_BOOL => Value::Bool(reader.byte("bool constant")? != 0),
            TAG_FUNCTION => {
                let length = reader.u16("function length")? as usize;
                let bytes = reader.take(length, "function constant")?;
                let tape = decode_tape(bytes)?;
                Value::Function(Rc::new(Function::new(tape)))
            }
            _ => return Err(CodecError::UnknownConstantTag { tag }),
        };
        constants.push(value);
    }

    Ok(constants)
}

/// Read a raw instruction section. The inverse of [`encode_tape`]: operands
/// the wire format drops stay dropped.
pub fn decode_tape(data: &[u8]) -> Result<Vec<Instruction>, CodecError> {
    let mut reader = Reader::new(data);
    let mut tape = Vec::new();

    while !reader.done() {
        let byte = reader.byte("opcode")?;
        let op = Op::from_byte(byte).ok_or(CodecError::UnknownOpcode { byte })?;

        let mut operands = Vec::with_capacity(op.encoded_operand_count());
        for _ in 0..op.encoded_operand_count() {
            operands.push(reader.u16("operand")? as usize);
        }

        tape.push(Instruction::new(op, operands));
    }

    Ok(tape)
}
