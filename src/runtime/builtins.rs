use crate::lang::value::Value;
use crate::runtime::runtime_error::RuntimeError;

// =============================================================================
// Builtin registry
// =============================================================================

pub type BuiltinFn = fn(&[Value]) -> Result<Value, RuntimeError>;

/// A native function callable from bytecode. The id doubles as the
/// operand of the BUILTIN opcode and as the symbol index the emitter
/// records; the caller checks arity before invoking.
#[derive(Debug)]
pub struct Builtin {
    pub name: &'static str,
    pub id: usize,
    pub arity: usize,
    pub func: BuiltinFn,
}

impl PartialEq for Builtin {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

// id zero stays unassigned so a zeroed operand never names a builtin
static BUILTINS: [Builtin; 4] = [
    Builtin {
        name: "print",
        id: 1,
        arity: 1,
        func: print,
    },
    Builtin {
        name: "stri",
        id: 2,
        arity: 1,
        func: stri,
    },
    Builtin {
        name: "len",
        id: 3,
        arity: 1,
        func: len,
    },
    Builtin {
        name: "push",
        id: 4,
        arity: 2,
        func: push,
    },
];

pub fn all() -> &'static [Builtin] {
    &BUILTINS
}

pub fn lookup(id: usize) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|builtin| builtin.id == id)
}

// =============================================================================
// Implementations
// =============================================================================

/// Write the argument's display form to stdout, followed by a newline.
fn print(args: &[Value]) -> Result<Value, RuntimeError> {
    println!("{}", args[0]);
    Ok(Value::Null)
}

/// Convert any value to its display string.
fn stri(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Str(args[0].to_string()))
}

/// Byte length of a string.
fn len(args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Str(s) => Ok(Value::Int(s.len() as i64)),
        other => Err(RuntimeError::new(&format!(
            "len expects a string, got {}",
            other.type_name()
        ))),
    }
}

/// Append a value to an array, yielding the extended array.
fn push(args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Array(items) => {
            let mut extended = items.clone();
            extended.push(args[1].clone());
            Ok(Value::Array(extended))
        }
        other => Err(RuntimeError::new(&format!(
            "push expects an array, got {}",
            other.type_name()
        ))),
    }
}
