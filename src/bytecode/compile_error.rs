use crate::bytecode::op::Op;
use crate::bytecode::symbols::SymbolScope;

/// Errors raised while emitting bytecode. All of them are fatal to the
/// current compilation; no partial tape is usable after one.
#[derive(Debug, Clone)]
pub enum CompileError {
    /// A name that resolves nowhere in the scope chain.
    UnresolvedSymbol { name: String },
    /// A store against a name that cannot be assigned (builtins, captures).
    CannotAssign { name: String, scope: &'static str },
    /// A patch aimed at an instruction that is not a jump.
    PatchTargetNotJump { position: usize, found: Op },
    /// Emitter-internal invariant violation.
    Internal(String),
}

impl CompileError {
    /// Error for a load of a name that is defined nowhere.
    pub fn unresolved(name: &str) -> Self {
        CompileError::UnresolvedSymbol {
            name: name.to_string(),
        }
    }

    /// Error for a store against a builtin or captured binding.
    pub fn cannot_assign(name: &str, scope: SymbolScope) -> Self {
        CompileError::CannotAssign {
            name: name.to_string(),
            scope: scope.name(),
        }
    }

    /// Error for patching an instruction that is not a jump.
    pub fn patch_not_jump(position: usize, found: Op) -> Self {
        CompileError::PatchTargetNotJump { position, found }
    }

    /// Create an internal emitter error.
    pub fn internal(msg: impl Into<String>) -> Self {
        CompileError::Internal(msg.into())
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::UnresolvedSymbol { name } => {
                write!(f, "compile error: unresolved symbol '{}'", name)?;
                write!(
                    f,
                    "\n  hint: the name must be defined before it is loaded"
                )
            }
            CompileError::CannotAssign { name, scope } => {
                write!(
                    f,
                    "compile error: cannot assign to {} '{}'",
                    scope, name
                )?;
                write!(
                    f,
                    "\n  hint: only globals and locals are assignment targets"
                )
            }
            CompileError::PatchTargetNotJump { position, found } => {
                write!(
                    f,
                    "compile error: patch target at {:05} is {}, not a jump",
                    position, found
                )
            }
            CompileError::Internal(msg) => {
                write!(f, "compile error: internal error: {}", msg)
            }
        }
    }
}

impl std::error::Error for CompileError {}
