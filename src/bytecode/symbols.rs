use crate::runtime::builtins;
use std::collections::HashMap;

// =============================================================================
// Symbols - scope and closure resolution
// =============================================================================

/// Where a resolved name lives at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolScope {
    /// Slot in the VM's global map. Defined at the root scope.
    Global,
    /// Slot in the current frame's locals.
    Local,
    /// Slot in the current closure's capture array.
    Free,
    /// Entry in the native builtin registry; the index is the builtin id.
    Builtin,
}

impl SymbolScope {
    pub fn name(self) -> &'static str {
        match self {
            SymbolScope::Global => "global",
            SymbolScope::Local => "local",
            SymbolScope::Free => "free",
            SymbolScope::Builtin => "builtin",
        }
    }
}

/// A name bound to a storage location.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub index: usize,
    pub scope: SymbolScope,
}

type ScopeId = usize;

#[derive(Debug)]
struct Scope {
    outer: Option<ScopeId>,
    store: HashMap<String, Symbol>,
    next_index: usize,
    free: Vec<Symbol>,
}

impl Scope {
    fn new(outer: Option<ScopeId>) -> Self {
        Scope {
            outer,
            store: HashMap::new(),
            next_index: 0,
            free: Vec::new(),
        }
    }
}

/// Hierarchical symbol table with free-variable discovery.
///
/// Scopes live in an arena and refer to their parents by index, so the
/// resolve walk can mutate any scope on the path without borrow conflicts.
/// The root scope carries the builtin registrations; builtins never consume
/// variable indices.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    current: ScopeId,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = SymbolTable {
            scopes: vec![Scope::new(None)],
            current: 0,
        };
        for builtin in builtins::all() {
            table.define_builtin(builtin.name, builtin.id);
        }
        table
    }

    /// Enter a fresh scope for a function body.
    pub fn push_scope(&mut self) {
        let id = self.scopes.len();
        self.scopes.push(Scope::new(Some(self.current)));
        self.current = id;
    }

    /// Leave the current scope, returning to its parent. The scope's free
    /// list must already have been consumed by the caller. Popping the
    /// root scope is a bug in the driver.
    pub fn pop_scope(&mut self) {
        let outer = self.scopes[self.current]
            .outer
            .expect("cannot pop the root scope");
        self.current = outer;
    }

    pub fn is_root(&self) -> bool {
        self.scopes[self.current].outer.is_none()
    }

    /// Bind `name` in the current scope, or return the existing binding if
    /// the current scope already has one. Re-declaration aliases the first
    /// binding rather than shadowing it.
    pub fn define(&mut self, name: &str) -> Symbol {
        if let Some(existing) = self.scopes[self.current].store.get(name) {
            return existing.clone();
        }

        let scope = if self.is_root() {
            SymbolScope::Global
        } else {
            SymbolScope::Local
        };
        let symbol = Symbol {
            name: name.to_string(),
            index: self.scopes[self.current].next_index,
            scope,
        };
        self.scopes[self.current].next_index += 1;
        self.scopes[self.current]
            .store
            .insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Register a native function in the current scope. Builtin bindings
    /// carry the builtin id as their index and never bump the counter.
    pub fn define_builtin(&mut self, name: &str, id: usize) {
        let symbol = Symbol {
            name: name.to_string(),
            index: id,
            scope: SymbolScope::Builtin,
        };
        self.scopes[self.current]
            .store
            .insert(name.to_string(), symbol);
    }

    /// Resolve `name` against the current scope chain. Globals and builtins
    /// pass through unchanged; anything else found in an enclosing scope is
    /// captured into the current scope's free list, with every intermediate
    /// scope on the path capturing it in turn.
    pub fn resolve(&mut self, name: &str) -> Option<Symbol> {
        self.resolve_in(self.current, name)
    }

    fn resolve_in(&mut self, scope: ScopeId, name: &str) -> Option<Symbol> {
        if let Some(symbol) = self.scopes[scope].store.get(name) {
            return Some(symbol.clone());
        }

        let outer = self.scopes[scope].outer?;
        let symbol = self.resolve_in(outer, name)?;

        match symbol.scope {
            SymbolScope::Global | SymbolScope::Builtin => Some(symbol),
            _ => Some(self.define_free(scope, symbol)),
        }
    }

    fn define_free(&mut self, scope: ScopeId, original: Symbol) -> Symbol {
        let name = original.name.clone();
        self.scopes[scope].free.push(original);

        let symbol = Symbol {
            name: name.clone(),
            index: self.scopes[scope].free.len() - 1,
            scope: SymbolScope::Free,
        };
        self.scopes[scope].store.insert(name, symbol.clone());
        symbol
    }

    /// The symbols captured by the current scope, in capture order. Each
    /// entry is the symbol *as seen from the enclosing scope*; the emitter
    /// loads them there before building the closure.
    pub fn free_symbols(&self) -> &[Symbol] {
        &self.scopes[self.current].free
    }
}
