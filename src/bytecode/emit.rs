use crate::bytecode::compile_error::CompileError;
use crate::bytecode::ir::{Bytecode, Instruction};
use crate::bytecode::op::Op;
use crate::bytecode::symbols::{Symbol, SymbolScope, SymbolTable};
use crate::lang::value::{Function, Value};
use std::rc::Rc;

// =============================================================================
// Emitter - bytecode generation
// =============================================================================

/// Translates structured build calls into a flat instruction tape plus a
/// constant pool. The driver (parser, REPL, tests) makes one call per
/// language construct; the emitter wires jumps, variable storage and
/// closure capture.
///
/// Nested function bodies are compiled on the same emitter with the tape
/// swapped aside and a child symbol scope pushed, so every function in a
/// program shares one constant pool.
pub struct Emitter {
    tape: Vec<Instruction>,
    constants: Vec<Value>,
    symbols: SymbolTable,
}

impl Emitter {
    pub fn new() -> Self {
        Emitter {
            tape: Vec::new(),
            constants: Vec::new(),
            symbols: SymbolTable::new(),
        }
    }

    /// Append an instruction and return its tape position.
    pub fn emit(&mut self, op: Op, operands: Vec<usize>) -> usize {
        self.tape.push(Instruction::new(op, operands));
        self.tape.len() - 1
    }

    /// Append a value to the constant pool and return its index.
    pub fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    /// Finish the compilation and hand over the program.
    pub fn bytecode(self) -> Bytecode {
        Bytecode::new(self.tape, self.constants)
    }

    // =========================================================================
    // Literals
    // =========================================================================

    pub fn push_int(&mut self, value: i64) {
        let index = self.add_constant(Value::Int(value));
        self.emit(Op::Push, vec![index]);
    }

    pub fn push_float(&mut self, value: f32) {
        let index = self.add_constant(Value::Float(value));
        self.emit(Op::Push, vec![index]);
    }

    pub fn push_bool(&mut self, value: bool) {
        let index = self.add_constant(Value::Bool(value));
        self.emit(Op::Push, vec![index]);
    }

    pub fn push_string(&mut self, value: &str) {
        let index = self.add_constant(Value::Str(value.to_string()));
        self.emit(Op::Push, vec![index]);
    }

    // =========================================================================
    // Operators
    // =========================================================================

    pub fn add_int(&mut self) {
        self.emit(Op::AddInt, vec![]);
    }
    pub fn sub_int(&mut self) {
        self.emit(Op::SubInt, vec![]);
    }
    pub fn mul_int(&mut self) {
        self.emit(Op::MulInt, vec![]);
    }
    pub fn div_int(&mut self) {
        self.emit(Op::DivInt, vec![]);
    }

    pub fn lt_int(&mut self) {
        self.emit(Op::LtInt, vec![]);
    }
    pub fn lte_int(&mut self) {
        self.emit(Op::LteInt, vec![]);
    }
    pub fn gt_int(&mut self) {
        self.emit(Op::GtInt, vec![]);
    }
    pub fn gte_int(&mut self) {
        self.emit(Op::GteInt, vec![]);
    }

    pub fn add_float(&mut self) {
        self.emit(Op::AddFloat, vec![]);
    }
    pub fn sub_float(&mut self) {
        self.emit(Op::SubFloat, vec![]);
    }
    pub fn mul_float(&mut self) {
        self.emit(Op::MulFloat, vec![]);
    }
    pub fn div_float(&mut self) {
        self.emit(Op::DivFloat, vec![]);
    }

    pub fn lt_float(&mut self) {
        self.emit(Op::LtFloat, vec![]);
    }
    pub fn lte_float(&mut self) {
        self.emit(Op::LteFloat, vec![]);
    }
    pub fn gt_float(&mut self) {
        self.emit(Op::GtFloat, vec![]);
    }
    pub fn gte_float(&mut self) {
        self.emit(Op::GteFloat, vec![]);
    }

    pub fn and_bool(&mut self) {
        self.emit(Op::AndBool, vec![]);
    }
    pub fn or_bool(&mut self) {
        self.emit(Op::OrBool, vec![]);
    }

    pub fn eq(&mut self) {
        self.emit(Op::Eq, vec![]);
    }
    pub fn neq(&mut self) {
        self.emit(Op::Neq, vec![]);
    }

    pub fn add_string(&mut self) {
        self.emit(Op::AddString, vec![]);
    }

    pub fn to_float(&mut self) {
        self.emit(Op::ToFloat, vec![]);
    }

    // =========================================================================
    // Control flow
    // =========================================================================

    /// Emit a two-armed conditional. The condition must leave a Bool on the
    /// stack; exactly one of the branches runs.
    pub fn if_else<C, T, E>(
        &mut self,
        condition: C,
        consequence: T,
        alternative: E,
    ) -> Result<(), CompileError>
    where
        C: FnOnce(&mut Emitter) -> Result<(), CompileError>,
        T: FnOnce(&mut Emitter) -> Result<(), CompileError>,
        E: FnOnce(&mut Emitter) -> Result<(), CompileError>,
    {
        condition(self)?;
        let cond_jump = self.emit(Op::JumpFalse, vec![0]);

        consequence(self)?;
        let end_jump = self.emit(Op::Jump, vec![0]);

        self.patch(cond_jump)?;

        alternative(self)?;
        self.patch(end_jump)?;

        Ok(())
    }

    /// Emit a conditional without an else arm.
    pub fn if_then<C, T>(&mut self, condition: C, consequence: T) -> Result<(), CompileError>
    where
        C: FnOnce(&mut Emitter) -> Result<(), CompileError>,
        T: FnOnce(&mut Emitter) -> Result<(), CompileError>,
    {
        condition(self)?;
        let cond_jump = self.emit(Op::JumpFalse, vec![0]);

        consequence(self)?;
        self.patch(cond_jump)?;

        Ok(())
    }

    /// Rewrite the operand of the jump at `position` to aim at the current
    /// end of the tape. Refuses to touch anything that is not a jump.
    pub fn patch(&mut self, position: usize) -> Result<(), CompileError> {
        let target = self.tape.len();
        let ins = self.tape.get_mut(position).ok_or_else(|| {
            CompileError::internal(format!("patch position {} is past the tape", position))
        })?;

        if ins.op != Op::Jump && ins.op != Op::JumpFalse {
            return Err(CompileError::patch_not_jump(position, ins.op));
        }

        ins.operands = vec![target];
        Ok(())
    }

    pub fn ret(&mut self) {
        self.emit(Op::Return, vec![]);
    }

    pub fn ret_value(&mut self) {
        self.emit(Op::ReturnValue, vec![]);
    }

    pub fn call(&mut self, argc: usize) {
        self.emit(Op::Call, vec![argc]);
    }

    // =========================================================================
    // Variables
    // =========================================================================

    /// Define-or-reuse `name` in the current scope and emit the matching
    /// store. The value to store must already be on the stack.
    pub fn store(&mut self, name: &str) -> Result<(), CompileError> {
        let symbol = self.symbols.define(name);
        match symbol.scope {
            SymbolScope::Global => {
                self.emit(Op::StoreGlobal, vec![symbol.index]);
                Ok(())
            }
            SymbolScope::Local => {
                self.emit(Op::StoreLocal, vec![symbol.index]);
                Ok(())
            }
            SymbolScope::Free | SymbolScope::Builtin => {
                Err(CompileError::cannot_assign(name, symbol.scope))
            }
        }
    }

    /// Resolve `name` and emit the load for wherever it lives. Capturing
    /// happens inside the symbol table as a side effect of resolution.
    pub fn load(&mut self, name: &str) -> Result<(), CompileError> {
        let symbol = self
            .symbols
            .resolve(name)
            .ok_or_else(|| CompileError::unresolved(name))?;
        self.emit_load(&symbol);
        Ok(())
    }

    fn emit_load(&mut self, symbol: &Symbol) {
        match symbol.scope {
            SymbolScope::Global => self.emit(Op::LoadGlobal, vec![symbol.index]),
            SymbolScope::Local => self.emit(Op::LoadLocal, vec![symbol.index]),
            SymbolScope::Free => self.emit(Op::LoadFree, vec![symbol.index]),
            SymbolScope::Builtin => self.emit(Op::Builtin, vec![symbol.index]),
        };
    }

    // =========================================================================
    // Functions and closures
    // =========================================================================

    /// Compile an anonymous function and emit the code that builds its
    /// closure: one load per captured outer symbol, in capture order, then
    /// CLOSURE with the function's constant index and the capture count.
    pub fn lambda<F>(&mut self, params: &[&str], body: F) -> Result<(), CompileError>
    where
        F: FnOnce(&mut Emitter) -> Result<(), CompileError>,
    {
        self.symbols.push_scope();
        for param in params {
            self.symbols.define(param);
        }

        let enclosing_tape = std::mem::take(&mut self.tape);
        let body_result = body(self);
        let fn_tape = std::mem::replace(&mut self.tape, enclosing_tape);

        let free = self.symbols.free_symbols().to_vec();
        self.symbols.pop_scope();
        body_result?;

        let fn_index = self.add_constant(Value::Function(Rc::new(Function::new(fn_tape))));

        for symbol in &free {
            self.emit_load(symbol);
        }
        self.emit(Op::Closure, vec![fn_index, free.len()]);

        Ok(())
    }

    /// A named function is a lambda whose closure is stored under `name`
    /// in the enclosing scope. The name only becomes resolvable after the
    /// body is compiled, so bodies cannot refer to themselves.
    pub fn function<F>(&mut self, name: &str, params: &[&str], body: F) -> Result<(), CompileError>
    where
        F: FnOnce(&mut Emitter) -> Result<(), CompileError>,
    {
        self.lambda(params, body)?;
        self.store(name)
    }

    // =========================================================================
    // Containers and classes
    // =========================================================================

    /// Collect the top `count` stack values into an array.
    pub fn array(&mut self, count: usize) {
        self.emit(Op::Array, vec![count]);
    }

    /// Collect `pairs` key/value pairs (key pushed before value) into a hash.
    pub fn hash(&mut self, pairs: usize) {
        self.emit(Op::Hash, vec![pairs]);
    }

    pub fn index(&mut self) {
        self.emit(Op::Index, vec![]);
    }

    pub fn access(&mut self) {
        self.emit(Op::Access, vec![]);
    }

    pub fn class(&mut self, name: &str) {
        self.push_string(name);
        self.emit(Op::Class, vec![]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Test helpers
    // =========================================================================

    fn ins(op: Op, operands: Vec<usize>) -> Instruction {
        Instruction::new(op, operands)
    }

    fn func_const(tape: Vec<Instruction>) -> Value {
        Value::Function(Rc::new(Function::new(tape)))
    }

    fn check(emitter: Emitter, expected_tape: Vec<Instruction>, expected_constants: Vec<Value>) {
        let bytecode = emitter.bytecode();
        assert_eq!(
            bytecode.constants, expected_constants,
            "constant pool mismatch"
        );
        assert_eq!(bytecode.tape, expected_tape, "tape mismatch");
    }

    // =========================================================================
    // Literals and operators
    // =========================================================================

    #[test]
    fn test_push_int() {
        let mut e = Emitter::new();
        e.push_int(1);

        check(
            e,
            vec![ins(Op::Push, vec![0])],
            vec![Value::Int(1)],
        );
    }

    #[test]
    fn test_push_appends_constants_in_order() {
        let mut e = Emitter::new();
        e.push_int(1);
        e.push_int(222);
        e.push_int(1);

        check(
            e,
            vec![
                ins(Op::Push, vec![0]),
                ins(Op::Push, vec![1]),
                ins(Op::Push, vec![2]),
            ],
            vec![Value::Int(1), Value::Int(222), Value::Int(1)],
        );
    }

    #[test]
    fn test_push_float_bool_string() {
        let mut e = Emitter::new();
        e.push_float(1.0);
        e.push_bool(true);
        e.push_string("string");

        check(
            e,
            vec![
                ins(Op::Push, vec![0]),
                ins(Op::Push, vec![1]),
                ins(Op::Push, vec![2]),
            ],
            vec![
                Value::Float(1.0),
                Value::Bool(true),
                Value::Str("string".to_string()),
            ],
        );
    }

    #[test]
    fn test_add_int() {
        let mut e = Emitter::new();
        e.push_int(1);
        e.push_int(2);
        e.add_int();

        check(
            e,
            vec![
                ins(Op::Push, vec![0]),
                ins(Op::Push, vec![1]),
                ins(Op::AddInt, vec![]),
            ],
            vec![Value::Int(1), Value::Int(2)],
        );
    }

    #[test]
    fn test_operator_opcodes() {
        let mut e = Emitter::new();
        e.sub_int();
        e.mul_int();
        e.div_int();
        e.lt_int();
        e.lte_int();
        e.gt_int();
        e.gte_int();
        e.add_float();
        e.sub_float();
        e.mul_float();
        e.div_float();
        e.lt_float();
        e.lte_float();
        e.gt_float();
        e.gte_float();
        e.and_bool();
        e.or_bool();
        e.eq();
        e.neq();
        e.add_string();
        e.to_float();

        let expected = vec![
            Op::SubInt,
            Op::MulInt,
            Op::DivInt,
            Op::LtInt,
            Op::LteInt,
            Op::GtInt,
            Op::GteInt,
            Op::AddFloat,
            Op::SubFloat,
            Op::MulFloat,
            Op::DivFloat,
            Op::LtFloat,
            Op::LteFloat,
            Op::GtFloat,
            Op::GteFloat,
            Op::AndBool,
            Op::OrBool,
            Op::Eq,
            Op::Neq,
            Op::AddString,
            Op::ToFloat,
        ];

        let tape: Vec<Op> = e.bytecode().tape.iter().map(|i| i.op).collect();
        assert_eq!(tape, expected);
    }

    // =========================================================================
    // Control flow
    // =========================================================================

    #[test]
    fn test_if_else_layout() {
        let mut e = Emitter::new();
        e.if_else(
            |e| {
                e.push_int(1);
                e.push_int(2);
                e.lt_int();
                Ok(())
            },
            |e| {
                e.push_int(10);
                Ok(())
            },
            |e| {
                e.push_int(20);
                Ok(())
            },
        )
        .unwrap();

        check(
            e,
            vec![
                ins(Op::Push, vec![0]),       // 00000
                ins(Op::Push, vec![1]),       // 00001
                ins(Op::LtInt, vec![]),       // 00002
                ins(Op::JumpFalse, vec![6]),  // 00003
                ins(Op::Push, vec![2]),       // 00004 consequence
                ins(Op::Jump, vec![7]),       // 00005
                ins(Op::Push, vec![3]),       // 00006 alternative
            ],
            vec![
                Value::Int(1),
                Value::Int(2),
                Value::Int(10),
                Value::Int(20),
            ],
        );
    }

    #[test]
    fn test_if_then_layout() {
        let mut e = Emitter::new();
        e.if_then(
            |e| {
                e.push_bool(true);
                Ok(())
            },
            |e| {
                e.push_int(42);
                Ok(())
            },
        )
        .unwrap();

        check(
            e,
            vec![
                ins(Op::Push, vec![0]),
                ins(Op::JumpFalse, vec![3]),
                ins(Op::Push, vec![1]),
            ],
            vec![Value::Bool(true), Value::Int(42)],
        );
    }

    #[test]
    fn test_patch_rejects_non_jump() {
        let mut e = Emitter::new();
        let position = e.emit(Op::AddInt, vec![]);

        let err = e.patch(position).unwrap_err();
        assert!(matches!(err, CompileError::PatchTargetNotJump { .. }));
        assert!(err.to_string().contains("not a jump"));
    }

    #[test]
    fn test_patch_rejects_out_of_range() {
        let mut e = Emitter::new();
        let err = e.patch(3).unwrap_err();
        assert!(matches!(err, CompileError::Internal(_)));
    }

    #[test]
    fn test_return_ops() {
        let mut e = Emitter::new();
        e.ret();
        e.ret_value();
        e.call(0);

        check(
            e,
            vec![
                ins(Op::Return, vec![]),
                ins(Op::ReturnValue, vec![]),
                ins(Op::Call, vec![0]),
            ],
            vec![],
        );
    }

    // =========================================================================
    // Variables
    // =========================================================================

    #[test]
    fn test_globals() {
        let mut e = Emitter::new();
        e.push_int(2);
        e.store("x").unwrap();
        e.load("x").unwrap();

        e.push_string("pspiagicw");
        e.store("name").unwrap();
        e.load("name").unwrap();

        check(
            e,
            vec![
                ins(Op::Push, vec![0]),
                ins(Op::StoreGlobal, vec![0]),
                ins(Op::LoadGlobal, vec![0]),
                ins(Op::Push, vec![1]),
                ins(Op::StoreGlobal, vec![1]),
                ins(Op::LoadGlobal, vec![1]),
            ],
            vec![Value::Int(2), Value::Str("pspiagicw".to_string())],
        );
    }

    #[test]
    fn test_load_unresolved_fails() {
        let mut e = Emitter::new();
        let err = e.load("nothing").unwrap_err();

        assert!(matches!(err, CompileError::UnresolvedSymbol { .. }));
        assert!(err.to_string().contains("nothing"));
    }

    #[test]
    fn test_store_builtin_fails() {
        let mut e = Emitter::new();
        e.push_int(1);
        let err = e.store("print").unwrap_err();

        assert!(matches!(err, CompileError::CannotAssign { .. }));
    }

    #[test]
    fn test_load_builtin_emits_id() {
        let mut e = Emitter::new();
        e.load("print").unwrap();

        check(e, vec![ins(Op::Builtin, vec![1])], vec![]);
    }

    // =========================================================================
    // Functions and closures
    // =========================================================================

    #[test]
    fn test_function_simple() {
        let mut e = Emitter::new();
        e.function("test", &[], |e| {
            e.push_int(2);
            Ok(())
        })
        .unwrap();
        e.load("test").unwrap();
        e.call(0);

        check(
            e,
            vec![
                ins(Op::Closure, vec![1, 0]),
                ins(Op::StoreGlobal, vec![0]),
                ins(Op::LoadGlobal, vec![0]),
                ins(Op::Call, vec![0]),
            ],
            vec![
                Value::Int(2),
                func_const(vec![ins(Op::Push, vec![0])]),
            ],
        );
    }

    #[test]
    fn test_function_with_args() {
        let mut e = Emitter::new();
        e.function("add", &["x", "y"], |e| {
            e.load("x")?;
            e.load("y")?;
            e.add_int();
            e.store("z")?;
            e.load("z")?;
            e.ret_value();
            Ok(())
        })
        .unwrap();

        check(
            e,
            vec![
                ins(Op::Closure, vec![0, 0]),
                ins(Op::StoreGlobal, vec![0]),
            ],
            vec![func_const(vec![
                ins(Op::LoadLocal, vec![0]),
                ins(Op::LoadLocal, vec![1]),
                ins(Op::AddInt, vec![]),
                ins(Op::StoreLocal, vec![2]),
                ins(Op::LoadLocal, vec![2]),
                ins(Op::ReturnValue, vec![]),
            ])],
        );
    }

    #[test]
    fn test_lambda() {
        let mut e = Emitter::new();
        e.lambda(&[], |e| {
            e.push_int(1);
            Ok(())
        })
        .unwrap();

        check(
            e,
            vec![ins(Op::Closure, vec![1, 0])],
            vec![
                Value::Int(1),
                func_const(vec![ins(Op::Push, vec![0])]),
            ],
        );
    }

    #[test]
    fn test_closure_captures_outer_local() {
        let mut e = Emitter::new();
        e.lambda(&["a"], |e| {
            e.lambda(&["b"], |e| {
                e.load("a")?;
                e.load("b")?;
                e.add_int();
                e.ret_value();
                Ok(())
            })?;
            e.ret();
            Ok(())
        })
        .unwrap();

        check(
            e,
            vec![ins(Op::Closure, vec![1, 0])],
            vec![
                func_const(vec![
                    ins(Op::LoadFree, vec![0]),
                    ins(Op::LoadLocal, vec![0]),
                    ins(Op::AddInt, vec![]),
                    ins(Op::ReturnValue, vec![]),
                ]),
                func_const(vec![
                    ins(Op::LoadLocal, vec![0]),
                    ins(Op::Closure, vec![0, 1]),
                    ins(Op::Return, vec![]),
                ]),
            ],
        );
    }

    #[test]
    fn test_closure_threads_captures_through_levels() {
        let mut e = Emitter::new();
        e.lambda(&["a"], |e| {
            e.lambda(&["b"], |e| {
                e.lambda(&["c"], |e| {
                    e.load("a")?;
                    e.load("b")?;
                    e.add_int();
                    e.load("c")?;
                    e.add_int();
                    e.ret_value();
                    Ok(())
                })?;
                e.ret_value();
                Ok(())
            })?;
            e.ret_value();
            Ok(())
        })
        .unwrap();

        check(
            e,
            vec![ins(Op::Closure, vec![2, 0])],
            vec![
                func_const(vec![
                    ins(Op::LoadFree, vec![0]),
                    ins(Op::LoadFree, vec![1]),
                    ins(Op::AddInt, vec![]),
                    ins(Op::LoadLocal, vec![0]),
                    ins(Op::AddInt, vec![]),
                    ins(Op::ReturnValue, vec![]),
                ]),
                func_const(vec![
                    ins(Op::LoadFree, vec![0]),
                    ins(Op::LoadLocal, vec![0]),
                    ins(Op::Closure, vec![0, 2]),
                    ins(Op::ReturnValue, vec![]),
                ]),
                func_const(vec![
                    ins(Op::LoadLocal, vec![0]),
                    ins(Op::Closure, vec![1, 1]),
                    ins(Op::ReturnValue, vec![]),
                ]),
            ],
        );
    }

    #[test]
    fn test_closure_mixes_globals_frees_and_locals() {
        let mut e = Emitter::new();
        e.push_int(55);
        e.store("global").unwrap();
        e.lambda(&[], |e| {
            e.push_int(66);
            e.store("a")?;
            e.lambda(&[], |e| {
                e.push_int(77);
                e.store("b")?;
                e.lambda(&[], |e| {
                    e.push_int(88);
                    e.store("c")?;
                    e.load("global")?;
                    e.load("a")?;
                    e.add_int();
                    e.load("b")?;
                    e.add_int();
                    e.load("c")?;
                    e.add_int();
                    e.ret_value();
                    Ok(())
                })?;
                e.ret_value();
                Ok(())
            })?;
            e.ret_value();
            Ok(())
        })
        .unwrap();

        check(
            e,
            vec![
                ins(Op::Push, vec![0]),
                ins(Op::StoreGlobal, vec![0]),
                ins(Op::Closure, vec![6, 0]),
            ],
            vec![
                Value::Int(55),
                Value::Int(66),
                Value::Int(77),
                Value::Int(88),
                func_const(vec![
                    ins(Op::Push, vec![3]),
                    ins(Op::StoreLocal, vec![0]),
                    ins(Op::LoadGlobal, vec![0]),
                    ins(Op::LoadFree, vec![0]),
                    ins(Op::AddInt, vec![]),
                    ins(Op::LoadFree, vec![1]),
                    ins(Op::AddInt, vec![]),
                    ins(Op::LoadLocal, vec![0]),
                    ins(Op::AddInt, vec![]),
                    ins(Op::ReturnValue, vec![]),
                ]),
                func_const(vec![
                    ins(Op::Push, vec![2]),
                    ins(Op::StoreLocal, vec![0]),
                    ins(Op::LoadFree, vec![0]),
                    ins(Op::LoadLocal, vec![0]),
                    ins(Op::Closure, vec![4, 2]),
                    ins(Op::ReturnValue, vec![]),
                ]),
                func_const(vec![
                    ins(Op::Push, vec![1]),
                    ins(Op::StoreLocal, vec![0]),
                    ins(Op::LoadLocal, vec![0]),
                    ins(Op::Closure, vec![5, 1]),
                    ins(Op::ReturnValue, vec![]),
                ]),
            ],
        );
    }

    #[test]
    fn test_function_body_cannot_see_its_own_name() {
        let mut e = Emitter::new();
        let err = e
            .function("loop", &["x"], |e| {
                e.load("loop")?;
                e.call(0);
                Ok(())
            })
            .unwrap_err();

        assert!(matches!(err, CompileError::UnresolvedSymbol { .. }));
        assert!(err.to_string().contains("loop"));
    }

    #[test]
    fn test_body_error_leaves_enclosing_tape_intact() {
        let mut e = Emitter::new();
        e.push_int(1);

        let result = e.lambda(&[], |e| {
            e.push_int(2);
            e.load("missing")?;
            Ok(())
        });
        assert!(result.is_err());

        // the enclosing tape was restored; emission can continue
        e.push_int(3);
        let bytecode = e.bytecode();
        assert_eq!(bytecode.tape[0], ins(Op::Push, vec![0]));
        assert_eq!(bytecode.tape[1].op, Op::Push);
    }

    // =========================================================================
    // Containers and classes
    // =========================================================================

    #[test]
    fn test_arrays() {
        let mut e = Emitter::new();
        e.push_int(2);
        e.push_int(3);
        e.array(2);

        check(
            e,
            vec![
                ins(Op::Push, vec![0]),
                ins(Op::Push, vec![1]),
                ins(Op::Array, vec![2]),
            ],
            vec![Value::Int(2), Value::Int(3)],
        );
    }

    #[test]
    fn test_hashes() {
        let mut e = Emitter::new();
        e.push_string("pspiagicw");
        e.push_int(20);
        e.push_string("torvalds");
        e.push_int(100);
        e.push_string("stallman");
        e.push_int(80);
        e.hash(3);

        check(
            e,
            vec![
                ins(Op::Push, vec![0]),
                ins(Op::Push, vec![1]),
                ins(Op::Push, vec![2]),
                ins(Op::Push, vec![3]),
                ins(Op::Push, vec![4]),
                ins(Op::Push, vec![5]),
                ins(Op::Hash, vec![3]),
            ],
            vec![
                Value::Str("pspiagicw".to_string()),
                Value::Int(20),
                Value::Str("torvalds".to_string()),
                Value::Int(100),
                Value::Str("stallman".to_string()),
                Value::Int(80),
            ],
        );
    }

    #[test]
    fn test_index() {
        let mut e = Emitter::new();
        e.push_int(2);
        e.push_int(3);
        e.array(2);
        e.push_int(2);
        e.index();

        check(
            e,
            vec![
                ins(Op::Push, vec![0]),
                ins(Op::Push, vec![1]),
                ins(Op::Array, vec![2]),
                ins(Op::Push, vec![2]),
                ins(Op::Index, vec![]),
            ],
            vec![Value::Int(2), Value::Int(3), Value::Int(2)],
        );
    }

    #[test]
    fn test_to_float() {
        let mut e = Emitter::new();
        e.push_int(3);
        e.to_float();

        check(
            e,
            vec![ins(Op::Push, vec![0]), ins(Op::ToFloat, vec![])],
            vec![Value::Int(3)],
        );
    }

    #[test]
    fn test_class() {
        let mut e = Emitter::new();
        e.class("Something");

        check(
            e,
            vec![ins(Op::Push, vec![0]), ins(Op::Class, vec![])],
            vec![Value::Str("Something".to_string())],
        );
    }
}
