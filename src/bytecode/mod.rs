pub mod codec;
pub mod compile_error;
pub mod disasm;
pub mod emit;
pub mod ir;
pub mod op;
pub mod stack_check_error;
pub mod symbols;

pub use compile_error::CompileError;
pub use emit::Emitter;
pub use ir::{Bytecode, Instruction};
pub use op::Op;
