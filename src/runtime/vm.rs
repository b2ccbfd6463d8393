use crate::bytecode::ir::{Bytecode, Instruction};
use crate::bytecode::op::Op;
use crate::lang::value::{Closure, Function, HashKey, Value};
use crate::runtime::builtins::{self, Builtin};
use crate::runtime::runtime_error::{
    RuntimeError, constant_out_of_bounds, division_by_zero, frame_overflow, index_out_of_bounds,
    missing_operand, not_callable, stack_overflow, stack_underflow, type_error, undefined_free,
    undefined_global, undefined_local, unhashable_key, unknown_builtin, wrong_arity,
};
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct VmConfig {
    pub stack_capacity: usize,
    pub frame_capacity: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            stack_capacity: 2048,
            frame_capacity: 1024,
        }
    }
}

/// One activation record. `ip` is signed so a fresh frame can sit one
/// step before its first instruction and take the shared post-increment.
struct Frame {
    closure: Rc<Closure>,
    ip: i64,
    locals: Vec<Value>,
    base: usize,
}

pub struct Vm {
    stack: Vec<Value>,
    globals: Vec<Value>,
    frames: Vec<Frame>,
    config: VmConfig,
}

impl Vm {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        let stack = Vec::with_capacity(config.stack_capacity);
        Vm {
            stack,
            globals: Vec::new(),
            frames: Vec::new(),
            config,
        }
    }

    /// Top of the operand stack, if any.
    pub fn peek(&self) -> Option<&Value> {
        self.stack.last()
    }

    #[allow(dead_code)]
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    /// Execute a program to completion. Globals and leftover stack values
    /// survive across calls; the frame stack starts fresh each time.
    pub fn run(&mut self, bytecode: &Bytecode) -> Result<(), RuntimeError> {
        let root = Rc::new(Closure {
            func: Rc::new(Function::new(bytecode.tape.clone())),
            free: Vec::new(),
        });

        self.frames.clear();
        self.frames.push(Frame {
            closure: root,
            ip: 0,
            locals: Vec::new(),
            base: 0,
        });

        self.dispatch(&bytecode.constants)
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    fn dispatch(&mut self, constants: &[Value]) -> Result<(), RuntimeError> {
        loop {
            let (closure, ip) = {
                let frame = self.frame()?;
                (Rc::clone(&frame.closure), frame.ip)
            };
            let tape = &closure.func.tape;

            if ip < 0 || ip as usize >= tape.len() {
                // only the root frame may fall off the end of its tape
                if self.frames.len() == 1 {
                    return Ok(());
                }
                return Err(RuntimeError::new("function body ended without a return"));
            }

            let instruction = &tape[ip as usize];
            self.execute(instruction, constants)
                .map_err(|e| e.with_context(&format!("{} at {:05}", instruction.op, ip)))?;

            self.frame_mut()?.ip += 1;
        }
    }

    fn execute(
        &mut self,
        instruction: &Instruction,
        constants: &[Value],
    ) -> Result<(), RuntimeError> {
        match instruction.op {
            Op::Push => {
                let index = self.operand(instruction, 0)?;
                let value = constants
                    .get(index)
                    .cloned()
                    .ok_or_else(|| constant_out_of_bounds(index, constants.len()))?;
                self.push(value)?;
            }

            // integer arithmetic, two's-complement wrap on overflow
            Op::AddInt => {
                let b = self.pop_int(Op::AddInt)?;
                let a = self.pop_int(Op::AddInt)?;
                self.push(Value::Int(a.wrapping_add(b)))?;
            }
            Op::SubInt => {
                let b = self.pop_int(Op::SubInt)?;
                let a = self.pop_int(Op::SubInt)?;
                self.push(Value::Int(a.wrapping_sub(b)))?;
            }
            Op::MulInt => {
                let b = self.pop_int(Op::MulInt)?;
                let a = self.pop_int(Op::MulInt)?;
                self.push(Value::Int(a.wrapping_mul(b)))?;
            }
            Op::DivInt => {
                let b = self.pop_int(Op::DivInt)?;
                let a = self.pop_int(Op::DivInt)?;
                if b == 0 {
                    return Err(division_by_zero(Op::DivInt));
                }
                self.push(Value::Int(a.wrapping_div(b)))?;
            }

            // integer comparisons
            Op::LtInt => {
                let b = self.pop_int(Op::LtInt)?;
                let a = self.pop_int(Op::LtInt)?;
                self.push(Value::Bool(a < b))?;
            }
            Op::LteInt => {
                let b = self.pop_int(Op::LteInt)?;
                let a = self.pop_int(Op::LteInt)?;
                self.push(Value::Bool(a <= b))?;
            }
            Op::GtInt => {
                let b = self.pop_int(Op::GtInt)?;
                let a = self.pop_int(Op::GtInt)?;
                self.push(Value::Bool(a > b))?;
            }
            Op::GteInt => {
                let b = self.pop_int(Op::GteInt)?;
                let a = self.pop_int(Op::GteInt)?;
                self.push(Value::Bool(a >= b))?;
            }

            // float arithmetic, division follows IEEE so zero gives infinity
            Op::AddFloat => {
                let b = self.pop_float(Op::AddFloat)?;
                let a = self.pop_float(Op::AddFloat)?;
                self.push(Value::Float(a + b))?;
            }
            Op::SubFloat => {
                let b = self.pop_float(Op::SubFloat)?;
                let a = self.pop_float(Op::SubFloat)?;
                self.push(Value::Float(a - b))?;
            }
            Op::MulFloat => {
                let b = self.pop_float(Op::MulFloat)?;
                let a = self.pop_float(Op::MulFloat)?;
                self.push(Value::Float(a * b))?;
            }
            Op::DivFloat => {
                let b = self.pop_float(Op::DivFloat)?;
                let a = self.pop_float(Op::DivFloat)?;
                self.push(Value::Float(a / b))?;
            }

            // float comparisons
            Op::LtFloat => {
                let b = self.pop_float(Op::LtFloat)?;
                let a = self.pop_float(Op::LtFloat)?;
                self.push(Value::Bool(a < b))?;
            }
            Op::LteFloat => {
                let b = self.pop_float(Op::LteFloat)?;
                let a = self.pop_float(Op::LteFloat)?;
                self.push(Value::Bool(a <= b))?;
            }
            Op::GtFloat => {
                let b = self.pop_float(Op::GtFloat)?;
                let a = self.pop_float(Op::GtFloat)?;
                self.push(Value::Bool(a > b))?;
            }
            Op::GteFloat => {
                let b = self.pop_float(Op::GteFloat)?;
                let a = self.pop_float(Op::GteFloat)?;
                self.push(Value::Bool(a >= b))?;
            }

            // boolean logic
            Op::AndBool => {
                let b = self.pop_bool(Op::AndBool)?;
                let a = self.pop_bool(Op::AndBool)?;
                self.push(Value::Bool(a && b))?;
            }
            Op::OrBool => {
                let b = self.pop_bool(Op::OrBool)?;
                let a = self.pop_bool(Op::OrBool)?;
                self.push(Value::Bool(a || b))?;
            }

            // equality is structural and never a type error
            Op::Eq => {
                let b = self.pop(Op::Eq)?;
                let a = self.pop(Op::Eq)?;
                self.push(Value::Bool(a == b))?;
            }
            Op::Neq => {
                let b = self.pop(Op::Neq)?;
                let a = self.pop(Op::Neq)?;
                self.push(Value::Bool(a != b))?;
            }

            Op::AddString => {
                let b = self.pop_string(Op::AddString)?;
                let a = self.pop_string(Op::AddString)?;
                self.push(Value::Str(a + &b))?;
            }

            Op::ToFloat => match self.pop(Op::ToFloat)? {
                Value::Int(n) => self.push(Value::Float(n as f32))?,
                Value::Float(x) => self.push(Value::Float(x))?,
                other => return Err(type_error(Op::ToFloat, "int", other.type_name())),
            },

            // control flow
            Op::Jump => {
                let target = self.operand(instruction, 0)?;
                self.frame_mut()?.ip = target as i64 - 1;
            }
            Op::JumpFalse => {
                let target = self.operand(instruction, 0)?;
                let condition = self.pop_bool(Op::JumpFalse)?;
                if !condition {
                    self.frame_mut()?.ip = target as i64 - 1;
                }
            }
            Op::Call => {
                let argc = self.operand(instruction, 0)?;
                self.call(argc)?;
            }
            Op::Return => {
                if self.frames.len() == 1 {
                    return Err(RuntimeError::new("return outside a function"));
                }
                let frame = self.pop_frame()?;
                self.stack.truncate(frame.base);
            }
            Op::ReturnValue => {
                if self.frames.len() == 1 {
                    return Err(RuntimeError::new("return outside a function"));
                }
                let value = self.pop(Op::ReturnValue)?;
                let frame = self.pop_frame()?;
                self.stack.truncate(frame.base);
                self.push(value)?;
            }

            // variables
            Op::StoreGlobal => {
                let slot = self.operand(instruction, 0)?;
                let value = self.pop(Op::StoreGlobal)?;
                if slot >= self.globals.len() {
                    self.globals.resize(slot + 1, Value::Null);
                }
                self.globals[slot] = value;
            }
            Op::LoadGlobal => {
                let slot = self.operand(instruction, 0)?;
                let value = self
                    .globals
                    .get(slot)
                    .cloned()
                    .ok_or_else(|| undefined_global(slot))?;
                self.push(value)?;
            }
            Op::StoreLocal => {
                let slot = self.operand(instruction, 0)?;
                let value = self.pop(Op::StoreLocal)?;
                let frame = self.frame_mut()?;
                if slot >= frame.locals.len() {
                    frame.locals.resize(slot + 1, Value::Null);
                }
                frame.locals[slot] = value;
            }
            Op::LoadLocal => {
                let slot = self.operand(instruction, 0)?;
                let value = self
                    .frame()?
                    .locals
                    .get(slot)
                    .cloned()
                    .ok_or_else(|| undefined_local(slot))?;
                self.push(value)?;
            }
            Op::LoadFree => {
                let slot = self.operand(instruction, 0)?;
                let value = self
                    .frame()?
                    .closure
                    .free
                    .get(slot)
                    .cloned()
                    .ok_or_else(|| undefined_free(slot))?;
                self.push(value)?;
            }

            // closures
            Op::Closure => {
                let index = self.operand(instruction, 0)?;
                let capture_count = self.operand(instruction, 1)?;

                let func = match constants.get(index) {
                    Some(Value::Function(func)) => Rc::clone(func),
                    Some(other) => {
                        return Err(type_error(Op::Closure, "function", other.type_name()));
                    }
                    None => return Err(constant_out_of_bounds(index, constants.len())),
                };

                let free = self.drain_top(capture_count, Op::Closure)?;
                self.push(Value::Closure(Rc::new(Closure { func, free })))?;
            }

            // containers
            Op::Array => {
                let count = self.operand(instruction, 0)?;
                let items = self.drain_top(count, Op::Array)?;
                self.push(Value::Array(items))?;
            }
            Op::Hash => {
                let pairs = self.operand(instruction, 0)?;
                let items = self.drain_top(pairs * 2, Op::Hash)?;

                let mut entries = HashMap::with_capacity(pairs);
                for pair in items.chunks(2) {
                    let key = HashKey::from_value(&pair[0])
                        .ok_or_else(|| unhashable_key(pair[0].type_name()))?;
                    entries.insert(key, pair[1].clone());
                }
                self.push(Value::Hash(entries))?;
            }
            Op::Index => {
                let index = self.pop_int(Op::Index)?;
                match self.pop(Op::Index)? {
                    Value::Array(items) => {
                        if index < 0 || index as usize >= items.len() {
                            return Err(index_out_of_bounds(index, items.len()));
                        }
                        self.push(items[index as usize].clone())?;
                    }
                    other => return Err(type_error(Op::Index, "array", other.type_name())),
                }
            }
            Op::Access => {
                let key = self.pop(Op::Access)?;
                match self.pop(Op::Access)? {
                    Value::Hash(entries) => {
                        let key = HashKey::from_value(&key)
                            .ok_or_else(|| unhashable_key(key.type_name()))?;
                        let value = entries.get(&key).cloned().unwrap_or(Value::Null);
                        self.push(value)?;
                    }
                    Value::Instance { fields, .. } => match key {
                        Value::Str(name) => {
                            let value = fields.get(&name).cloned().unwrap_or(Value::Null);
                            self.push(value)?;
                        }
                        other => {
                            return Err(type_error(Op::Access, "string", other.type_name()));
                        }
                    },
                    other => {
                        return Err(type_error(Op::Access, "hash or instance", other.type_name()));
                    }
                }
            }

            // builtins and classes
            Op::Builtin => {
                let id = self.operand(instruction, 0)?;
                let builtin = builtins::lookup(id).ok_or_else(|| unknown_builtin(id))?;
                self.push(Value::Builtin(builtin))?;
            }
            Op::Class => {
                let name = self.pop_string(Op::Class)?;
                self.push(Value::Class(name))?;
            }
        }

        Ok(())
    }

    // =========================================================================
    // Calls
    // =========================================================================

    fn call(&mut self, argc: usize) -> Result<(), RuntimeError> {
        match self.pop(Op::Call)? {
            Value::Closure(closure) => self.call_closure(closure, argc),
            Value::Builtin(builtin) => self.call_builtin(builtin, argc),
            other => Err(not_callable(other.type_name())),
        }
    }

    /// Arguments become the first locals of the new frame, in push order.
    fn call_closure(&mut self, closure: Rc<Closure>, argc: usize) -> Result<(), RuntimeError> {
        if self.frames.len() >= self.config.frame_capacity {
            return Err(frame_overflow(self.config.frame_capacity));
        }

        let locals = self.drain_top(argc, Op::Call)?;
        let base = self.stack.len();

        self.frames.push(Frame {
            closure,
            ip: -1,
            locals,
            base,
        });
        Ok(())
    }

    /// Builtins run outside the frame machinery. A Null result is
    /// swallowed so statement-like builtins leave the stack clean.
    fn call_builtin(&mut self, builtin: &'static Builtin, argc: usize) -> Result<(), RuntimeError> {
        if argc != builtin.arity {
            return Err(wrong_arity(builtin.name, builtin.arity, argc));
        }

        let args = self.drain_top(argc, Op::Call)?;
        let result = (builtin.func)(&args)?;

        if result != Value::Null {
            self.push(result)?;
        }
        Ok(())
    }

    // =========================================================================
    // Stack and frame helpers
    // =========================================================================

    fn frame(&self) -> Result<&Frame, RuntimeError> {
        self.frames
            .last()
            .ok_or_else(|| RuntimeError::new("no active frame"))
    }

    fn frame_mut(&mut self) -> Result<&mut Frame, RuntimeError> {
        self.frames
            .last_mut()
            .ok_or_else(|| RuntimeError::new("no active frame"))
    }

    fn pop_frame(&mut self) -> Result<Frame, RuntimeError> {
        self.frames
            .pop()
            .ok_or_else(|| RuntimeError::new("no active frame"))
    }

    fn operand(&self, instruction: &Instruction, slot: usize) -> Result<usize, RuntimeError> {
        instruction
            .operands
            .get(slot)
            .copied()
            .ok_or_else(|| missing_operand(instruction.op))
    }

    fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        if self.stack.len() >= self.config.stack_capacity {
            return Err(stack_overflow(self.config.stack_capacity));
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self, op: Op) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or_else(|| stack_underflow(op))
    }

    fn pop_int(&mut self, op: Op) -> Result<i64, RuntimeError> {
        match self.pop(op)? {
            Value::Int(n) => Ok(n),
            other => Err(type_error(op, "int", other.type_name())),
        }
    }

    fn pop_float(&mut self, op: Op) -> Result<f32, RuntimeError> {
        match self.pop(op)? {
            Value::Float(x) => Ok(x),
            other => Err(type_error(op, "float", other.type_name())),
        }
    }

    fn pop_bool(&mut self, op: Op) -> Result<bool, RuntimeError> {
        match self.pop(op)? {
            Value::Bool(b) => Ok(b),
            other => Err(type_error(op, "bool", other.type_name())),
        }
    }

    fn pop_string(&mut self, op: Op) -> Result<String, RuntimeError> {
        match self.pop(op)? {
            Value::Str(s) => Ok(s),
            other => Err(type_error(op, "string", other.type_name())),
        }
    }

    /// Remove the top `count` values, preserving their push order.
    fn drain_top(&mut self, count: usize, op: Op) -> Result<Vec<Value>, RuntimeError> {
        if self.stack.len() < count {
            return Err(stack_underflow(op));
        }
        let start = self.stack.len() - count;
        Ok(self.stack.drain(start..).collect())
    }
}
