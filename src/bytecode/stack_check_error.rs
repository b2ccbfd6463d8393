use crate::bytecode::ir::Instruction;
use crate::bytecode::op::Op;

#[derive(Debug)]
pub struct StackCheckError {
    pub message: String,
}

impl std::fmt::Display for StackCheckError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stack-check error: {}", self.message)
    }
}

impl std::error::Error for StackCheckError {}

impl StackCheckError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Returns (pops, pushes) for an instruction, or None if the effect is
/// dynamic and the scan has to stop.
fn effect(instruction: &Instruction) -> Option<(i32, i32)> {
    use Op::*;

    let operand = || instruction.operands.first().copied();

    Some(match instruction.op {
        Push => (0, 1),

        AddInt | SubInt | MulInt | DivInt => (2, 1),
        LtInt | LteInt | GtInt | GteInt => (2, 1),
        AddFloat | SubFloat | MulFloat | DivFloat => (2, 1),
        LtFloat | LteFloat | GtFloat | GteFloat => (2, 1),
        AndBool | OrBool | Eq | Neq | AddString => (2, 1),
        ToFloat => (1, 1),

        Jump => (0, 0),
        JumpFalse => (1, 0),
        Return => (0, 0),
        ReturnValue => (1, 0),

        StoreGlobal | StoreLocal => (1, 0),
        LoadGlobal | LoadLocal | LoadFree | Builtin => (0, 1),

        Array => (operand()? as i32, 1),
        Hash => (2 * operand()? as i32, 1),
        Closure => (*instruction.operands.get(1)? as i32, 1),

        Index | Access => (2, 1),
        Class => (1, 1),

        // a call's result depends on the callee
        Call => return None,
    })
}

/// Check stack effects with a given initial stack height.
///
/// This is a linear scan that does not follow jump targets, so it gives
/// basic validation rather than full control-flow analysis. The scan
/// stops at the first instruction with a dynamic effect.
pub fn check_tape_with_initial(
    tape: &[Instruction],
    initial_height: i32,
) -> Result<(), StackCheckError> {
    let mut height = initial_height;

    for (ip, instruction) in tape.iter().enumerate() {
        match effect(instruction) {
            Some((pops, pushes)) => {
                height -= pops;
                if height < 0 {
                    return Err(StackCheckError::new(format!(
                        "stack underflow at ip={}, op={}, needed {} items",
                        ip, instruction.op, pops
                    )));
                }
                height += pushes;
            }
            None => return Ok(()),
        }
    }

    Ok(())
}

/// Check stack effects starting from an empty stack.
pub fn check_tape(tape: &[Instruction]) -> Result<(), StackCheckError> {
    check_tape_with_initial(tape, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ins(op: Op, operands: Vec<usize>) -> Instruction {
        Instruction::new(op, operands)
    }

    #[test]
    fn test_balanced_arithmetic() {
        let tape = vec![
            ins(Op::Push, vec![0]),
            ins(Op::Push, vec![1]),
            ins(Op::AddInt, vec![]),
        ];
        assert!(check_tape(&tape).is_ok());
    }

    #[test]
    fn test_underflow() {
        let tape = vec![ins(Op::AddInt, vec![])];
        let result = check_tape(&tape);
        assert!(result.is_err());
        assert!(result.unwrap_err().message.contains("underflow"));
    }

    #[test]
    fn test_store_then_load() {
        let tape = vec![
            ins(Op::Push, vec![0]),
            ins(Op::StoreGlobal, vec![0]),
            ins(Op::LoadGlobal, vec![0]),
        ];
        assert!(check_tape(&tape).is_ok());
    }

    #[test]
    fn test_store_without_value_underflows() {
        let tape = vec![ins(Op::StoreGlobal, vec![0])];
        assert!(check_tape(&tape).is_err());
    }

    #[test]
    fn test_jump_false_pops_condition() {
        let tape = vec![
            ins(Op::Push, vec![0]),
            ins(Op::JumpFalse, vec![4]),
            ins(Op::Push, vec![1]),
            ins(Op::Jump, vec![5]),
            ins(Op::Push, vec![2]),
        ];
        assert!(check_tape(&tape).is_ok());
    }

    #[test]
    fn test_jump_false_underflow() {
        let tape = vec![ins(Op::JumpFalse, vec![2])];
        assert!(check_tape(&tape).is_err());
    }

    #[test]
    fn test_array_pops_its_elements() {
        let short = vec![
            ins(Op::Push, vec![0]),
            ins(Op::Push, vec![1]),
            ins(Op::Array, vec![3]),
        ];
        assert!(check_tape(&short).is_err());

        let full = vec![
            ins(Op::Push, vec![0]),
            ins(Op::Push, vec![1]),
            ins(Op::Push, vec![2]),
            ins(Op::Array, vec![3]),
        ];
        assert!(check_tape(&full).is_ok());
    }

    #[test]
    fn test_hash_pops_two_per_pair() {
        let tape = vec![
            ins(Op::Push, vec![0]),
            ins(Op::Push, vec![1]),
            ins(Op::Hash, vec![2]),
        ];
        assert!(check_tape(&tape).is_err());
    }

    #[test]
    fn test_closure_pops_captures() {
        let tape = vec![
            ins(Op::Push, vec![0]),
            ins(Op::Closure, vec![0, 2]),
        ];
        assert!(check_tape(&tape).is_err());
    }

    #[test]
    fn test_class_needs_its_name() {
        assert!(check_tape(&[ins(Op::Class, vec![])]).is_err());

        let tape = vec![ins(Op::Push, vec![0]), ins(Op::Class, vec![])];
        assert!(check_tape(&tape).is_ok());
    }

    #[test]
    fn test_call_stops_analysis() {
        // past the call the height is unknown, so no verdict on ADD_INT
        let tape = vec![
            ins(Op::Push, vec![0]),
            ins(Op::LoadGlobal, vec![0]),
            ins(Op::Call, vec![1]),
            ins(Op::AddInt, vec![]),
        ];
        assert!(check_tape(&tape).is_ok());
    }

    #[test]
    fn test_initial_height_models_arguments() {
        // a one-argument function body may store its argument
        let tape = vec![ins(Op::StoreLocal, vec![0])];
        assert!(check_tape(&tape).is_err());
        assert!(check_tape_with_initial(&tape, 1).is_ok());
    }
}
