//! Lexical scopes (spec.md §3 "AST Scope") as an arena owned by one
//! [`walker::walk`] call.
//!
//! Scopes are allocated in a flat `Vec` rather than as a graph of `Rc`
//! pointers: their lifetime ends with the walk and the parent links are
//! plain indices, so cycles are structurally impossible (spec.md §9,
//! "Scope as linked outer references... allocate scopes in an arena owned
//! by the walker").

pub mod walker;

pub use walker::{walk, Flow, Visitor};

use std::collections::HashMap;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ScopeId(usize);

/// The declaration a binding came from, identified by its byte range in the
/// owning file. Byte ranges are unique per node within one parsed tree, so
/// this doubles as the "object identity" spec.md §4.4.2 needs to
/// distinguish "declared by the comm-clause's own statement" from "declared
/// inside the clause body".
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DeclRef {
    pub start: usize,
    pub end: usize,
}

/// What kind of declaration a [`Binding`] came from. Patch-Unused (spec.md
/// §4.4.2) never patches a type declaration — `; _ = T` for an unused local
/// `type T int` isn't valid Go, unlike `; _ = x` for a value.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BindingKind {
    Value,
    Type,
}

#[derive(Clone, Debug)]
pub struct Binding {
    pub name: String,
    pub decl: DeclRef,
    pub kind: BindingKind,
}

struct ScopeData {
    outer: Option<ScopeId>,
    bindings: HashMap<String, Binding>,
}

/// Owns every scope created during one walk.
pub struct ScopeArena {
    scopes: Vec<ScopeData>,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    pub fn new_scope(&mut self, outer: Option<ScopeId>) -> ScopeId {
        self.scopes.push(ScopeData { outer, bindings: HashMap::new() });
        ScopeId(self.scopes.len() - 1)
    }

    /// Inserts a binding. A name of `_` is never inserted (spec.md §4.3
    /// "Name handling"). Callers are responsible for skipping a top-level
    /// `init` function binding themselves (only top-level function
    /// declarations need that rule, so it isn't universal to every insert).
    pub fn insert(&mut self, scope: ScopeId, name: &str, decl: DeclRef, kind: BindingKind) {
        if name == "_" {
            return;
        }
        self.scopes[scope.0]
            .bindings
            .insert(name.to_string(), Binding { name: name.to_string(), decl, kind });
    }

    pub fn outer(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope.0].outer
    }

    /// Walks outer scopes until a binding for `name` is found.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Binding> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(binding) = self.scopes[id.0].bindings.get(name) {
                return Some(binding);
            }
            current = self.scopes[id.0].outer;
        }
        None
    }

    /// Every binding declared directly in `scope` (not its outers).
    pub fn bindings(&self, scope: ScopeId) -> impl Iterator<Item = &Binding> {
        self.scopes[scope.0].bindings.values()
    }
}

impl Default for ScopeArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_outer_chain() {
        let mut arena = ScopeArena::new();
        let outer = arena.new_scope(None);
        arena.insert(outer, "x", DeclRef { start: 0, end: 1 }, BindingKind::Value);
        let inner = arena.new_scope(Some(outer));
        assert!(arena.lookup(inner, "x").is_some());
        assert!(arena.lookup(outer, "y").is_none());
    }

    #[test]
    fn blank_identifier_never_inserted() {
        let mut arena = ScopeArena::new();
        let s = arena.new_scope(None);
        arena.insert(s, "_", DeclRef { start: 0, end: 1 }, BindingKind::Value);
        assert!(arena.lookup(s, "_").is_none());
    }

    #[test]
    fn inner_binding_shadows_outer() {
        let mut arena = ScopeArena::new();
        let outer = arena.new_scope(None);
        arena.insert(outer, "x", DeclRef { start: 0, end: 1 }, BindingKind::Value);
        let inner = arena.new_scope(Some(outer));
        arena.insert(inner, "x", DeclRef { start: 10, end: 11 }, BindingKind::Value);
        assert_eq!(arena.lookup(inner, "x").unwrap().decl.start, 10);
        assert_eq!(arena.lookup(outer, "x").unwrap().decl.start, 0);
    }
}
