use crate::bytecode::ir::Instruction;
use crate::runtime::builtins::Builtin;
use std::collections::HashMap;
use std::rc::Rc;

/// A compiled function body: nothing but its instruction tape.
///
/// Parameter and local bookkeeping lives in the emitter's symbol table;
/// by the time a function reaches the runtime it is only code.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub tape: Vec<Instruction>,
}

impl Function {
    pub fn new(tape: Vec<Instruction>) -> Self {
        Function { tape }
    }
}

/// A function bundled with the values captured for its free variables.
///
/// Captures are copied in at construction time; slot `i` is read by
/// `LOAD_FREE i` inside the function body.
#[derive(Debug, Clone, PartialEq)]
pub struct Closure {
    pub func: Rc<Function>,
    pub free: Vec<Value>,
}

/// Key type for hash values. Only these variants may key a hash;
/// using any other value as a key is a runtime error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    Int(i64),
    Bool(bool),
    Str(String),
}

impl HashKey {
    /// Convert a runtime value into a hash key, if it is hashable.
    pub fn from_value(value: &Value) -> Option<HashKey> {
        match value {
            Value::Int(n) => Some(HashKey::Int(*n)),
            Value::Bool(b) => Some(HashKey::Bool(*b)),
            Value::Str(s) => Some(HashKey::Str(s.clone())),
            _ => None,
        }
    }
}

impl std::fmt::Display for HashKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashKey::Int(n) => write!(f, "{}", n),
            HashKey::Bool(b) => write!(f, "{}", b),
            HashKey::Str(s) => write!(f, "{}", s),
        }
    }
}

/// Runtime value. These are the only data that exist on the operand
/// stack, in the constant pool, in globals and in closure captures.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 64-bit signed integer. The codec stores only the low 32 bits.
    Int(i64),

    /// 32-bit floating-point number, matching the encoded width.
    Float(f32),

    /// Boolean value.
    Bool(bool),

    /// UTF-8 string value.
    Str(String),

    /// Compiled function body, as found in the constant pool.
    Function(Rc<Function>),

    /// Function plus captured free variables.
    Closure(Rc<Closure>),

    /// Ordered collection built by the ARRAY opcode.
    Array(Vec<Value>),

    /// Key/value mapping built by the HASH opcode.
    Hash(HashMap<HashKey, Value>),

    /// A class, carrying nothing but its name.
    Class(String),

    /// An instance of a class with string-keyed fields.
    Instance {
        class: String,
        fields: HashMap<String, Value>,
    },

    /// Native function from the builtin registry.
    Builtin(&'static Builtin),

    Null,
}

impl Value {
    /// Short type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Function(_) => "function",
            Value::Closure(_) => "closure",
            Value::Array(_) => "array",
            Value::Hash(_) => "hash",
            Value::Class(_) => "class",
            Value::Instance { .. } => "instance",
            Value::Builtin(_) => "builtin",
            Value::Null => "null",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{}", s),
            Value::Function(func) => write!(f, "<function {} ops>", func.tape.len()),
            Value::Closure(c) => write!(f, "<closure {} captured>", c.free.len()),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Hash(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Class(name) => write!(f, "<class {}>", name),
            Value::Instance { class, .. } => write!(f, "<instance of {}>", class),
            Value::Builtin(b) => write!(f, "<builtin {}>", b.name),
            Value::Null => write!(f, "null"),
        }
    }
}
