use crate::bytecode::op::Op;

#[derive(Debug)]
pub struct RuntimeError {
    pub message: String,
    pub call_stack: Vec<String>,
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "runtime error: {}", self.message)?;

        if !self.call_stack.is_empty() {
            write!(f, "\n  call stack:")?;

            for (i, frame) in self.call_stack.iter().rev().enumerate() {
                write!(f, "\n    {}: {}", i, frame)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {}

impl RuntimeError {
    pub fn new(msg: &str) -> Self {
        RuntimeError {
            message: msg.to_string(),
            call_stack: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: &str) -> Self {
        self.call_stack.push(context.to_string());
        self
    }
}

// =============================================================================
// Error constructors
// =============================================================================

pub fn stack_underflow(op: Op) -> RuntimeError {
    RuntimeError::new(&format!("stack underflow in {}", op))
}

pub fn stack_overflow(capacity: usize) -> RuntimeError {
    RuntimeError::new(&format!("stack size limit exceeded ({})", capacity))
}

pub fn frame_overflow(capacity: usize) -> RuntimeError {
    RuntimeError::new(&format!(
        "call depth limit exceeded ({}) - possible infinite recursion",
        capacity
    ))
}

pub fn type_error(op: Op, expected: &str, got: &str) -> RuntimeError {
    RuntimeError::new(&format!(
        "type error: {} expected {}, got {}",
        op, expected, got
    ))
}

pub fn division_by_zero(op: Op) -> RuntimeError {
    RuntimeError::new(&format!("division by zero in {}", op))
}

pub fn index_out_of_bounds(index: i64, length: usize) -> RuntimeError {
    RuntimeError::new(&format!(
        "index {} out of bounds for length {}",
        index, length
    ))
}

pub fn unhashable_key(type_name: &str) -> RuntimeError {
    RuntimeError::new(&format!("cannot use a {} as a hash key", type_name))
}

pub fn undefined_global(index: usize) -> RuntimeError {
    RuntimeError::new(&format!("undefined global slot {}", index))
}

pub fn undefined_local(index: usize) -> RuntimeError {
    RuntimeError::new(&format!("undefined local slot {}", index))
}

pub fn undefined_free(index: usize) -> RuntimeError {
    RuntimeError::new(&format!("undefined free slot {}", index))
}

pub fn not_callable(type_name: &str) -> RuntimeError {
    RuntimeError::new(&format!("cannot call a {}", type_name))
}

pub fn wrong_arity(name: &str, expected: usize, got: usize) -> RuntimeError {
    RuntimeError::new(&format!(
        "{} takes {} arguments, got {}",
        name, expected, got
    ))
}

pub fn missing_operand(op: Op) -> RuntimeError {
    RuntimeError::new(&format!("{} is missing an operand", op))
}

pub fn unknown_builtin(id: usize) -> RuntimeError {
    RuntimeError::new(&format!("unknown builtin id {}", id))
}

pub fn constant_out_of_bounds(index: usize, count: usize) -> RuntimeError {
    RuntimeError::new(&format!(
        "constant index {} out of bounds for pool of {}",
        index, count
    ))
}
