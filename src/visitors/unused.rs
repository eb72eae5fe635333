//! Unused-Finder and Patch-Unused (spec.md §4.4.1, §4.4.2): finds bindings
//! and imports that never get referenced, and emits the patch that silences
//! the compiler error each one would otherwise cause.
//!
//! The two are kept as one [`Visitor`] impl rather than two separate passes —
//! [`UnusedFinder::exit_scope`] computes the patch for a binding the moment
//! it knows that binding is unused, since by then it also still has the
//! `parent_node` it needs to pick the right policy row. Splitting them would
//! mean re-deriving that parent later from just a `DeclRef`.

use crate::goast::{self, kind};
use crate::patch::{Patch, PatchBatch, ParsedFile, Pos};
use crate::resolver::{ImportResolver, ImportSpec};
use crate::scope::{Binding, BindingKind, Flow, ScopeArena, ScopeId, Visitor};
use std::collections::HashSet;
use tree_sitter::Node;

type Range = (usize, usize);

pub struct UnusedFinder {
    used: HashSet<Range>,
    irrelevant: HashSet<Range>,
    used_imports: HashSet<String>,
    patches: PatchBatch,
}

impl UnusedFinder {
    pub fn new() -> Self {
        Self {
            used: HashSet::new(),
            irrelevant: HashSet::new(),
            used_imports: HashSet::new(),
            patches: PatchBatch::new(),
        }
    }

    pub fn used_imports(&self) -> &HashSet<String> {
        &self.used_imports
    }

    pub fn into_patch_batch(self) -> PatchBatch {
        self.patches
    }

    fn emit_unused_patch(&mut self, binding: &Binding, parent: Node<'_>) {
        // An unused local type declaration is never patched, regardless of
        // where it closes: `; _ = T` for a type name isn't valid Go, unlike
        // the same idiom for a value.
        if binding.kind == BindingKind::Type {
            return;
        }
        match parent.kind() {
            // spec.md §4.4.2: top-level var/const/type and function/method
            // parameters are never patched — either the compiler doesn't
            // flag them or, for exported package-level bindings, flagging
            // them isn't this tool's job.
            "source_file" | kind::FUNCTION_DECLARATION | kind::METHOD_DECLARATION | kind::FUNC_LITERAL => {}

            kind::IF_STATEMENT => {
                if let Some(block) = parent.child_by_field_name("consequence") {
                    self.insert_stmt(block.start_byte() + 1, &binding.name);
                }
            }
            kind::FOR_STATEMENT => {
                if let Some(block) = parent.child_by_field_name("body") {
                    self.insert_stmt(block.start_byte() + 1, &binding.name);
                }
            }
            kind::EXPRESSION_SWITCH_STATEMENT | kind::TYPE_SWITCH_STATEMENT => {
                let cases = case_nodes(parent);
                if cases.is_empty() {
                    if let Some(pos) = open_brace_end(parent) {
                        self.patches.push(Patch::Insert {
                            pos,
                            text: format!(" default: _ = {};", binding.name),
                        });
                    }
                } else if let Some(pos) = colon_end(cases[0]) {
                    self.insert_stmt(pos, &binding.name);
                }
            }
            kind::COMMUNICATION_CASE => {
                // spec.md §4.4.2's parent-identity edge case: a binding
                // declared by the clause's own `communication` statement
                // gets patched right after the clause's `:`; one declared by
                // a statement inside the clause body is patched like any
                // other local — at its own declaration's end.
                let declared_by_clause = parent
                    .child_by_field_name("communication")
                    .map(|c| c.start_byte() == binding.decl.start && c.end_byte() == binding.decl.end)
                    .unwrap_or(false);
                if declared_by_clause {
                    if let Some(pos) = colon_end(parent) {
                        self.insert_stmt(pos, &binding.name);
                    }
                } else {
                    self.insert_at_decl_end(binding);
                }
            }
            _ => self.insert_at_decl_end(binding),
        }
    }

    fn insert_stmt(&mut self, pos: Pos, name: &str) {
        self.patches.push(Patch::Insert { pos, text: format!(" _ = {name};") });
    }

    fn insert_at_decl_end(&mut self, binding: &Binding) {
        self.patches.push(Patch::Insert {
            pos: binding.decl.end,
            text: format!("; _ = {}", binding.name),
        });
    }
}

impl Default for UnusedFinder {
    fn default() -> Self {
        Self::new()
    }
}

impl Visitor for UnusedFinder {
    fn visit_expr(&mut self, scopes: &ScopeArena, scope: ScopeId, node: Node<'_>, file: &ParsedFile) -> Flow {
        match node.kind() {
            kind::SELECTOR_EXPRESSION => {
                if let Some(field) = node.child_by_field_name("field") {
                    self.irrelevant.insert((field.start_byte(), field.end_byte()));
                }
            }
            kind::KEYED_ELEMENT => {
                if let Some(key) = node.child_by_field_name("key") {
                    if key.kind() == kind::IDENTIFIER {
                        self.irrelevant.insert((key.start_byte(), key.end_byte()));
                    }
                }
            }
            kind::IDENTIFIER => {
                let range = (node.start_byte(), node.end_byte());
                if self.irrelevant.contains(&range) {
                    return Flow::Descend;
                }
                let name = goast::text(file, node);
                match scopes.lookup(scope, name) {
                    Some(binding) => {
                        self.used.insert((binding.decl.start, binding.decl.end));
                    }
                    None => {
                        self.used_imports.insert(name.to_string());
                    }
                }
            }
            _ => {}
        }
        Flow::Descend
    }

    fn exit_scope(
        &mut self,
        scopes: &ScopeArena,
        scope: ScopeId,
        parent_node: Node<'_>,
        _is_innermost_at_this_level: bool,
        _file: &ParsedFile,
    ) {
        let unused: Vec<Binding> = scopes
            .bindings(scope)
            .filter(|b| !self.used.contains(&(b.decl.start, b.decl.end)))
            .cloned()
            .collect();
        for binding in &unused {
            self.emit_unused_patch(binding, parent_node);
        }
    }
}

fn case_nodes<'t>(switch_node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = switch_node.walk();
    switch_node
        .named_children(&mut cursor)
        .filter(|c| matches!(c.kind(), kind::EXPRESSION_CASE | kind::DEFAULT_CASE | kind::TYPE_CASE))
        .collect()
}

/// The byte just after a node's own literal `:` child, if it has one.
fn colon_end(node: Node<'_>) -> Option<Pos> {
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            if child.kind() == ":" {
                return Some(child.end_byte());
            }
        }
    }
    None
}

/// The byte just after a node's own literal `{` child, if it has one. Used
/// for switch/select nodes, whose case list isn't wrapped in a `block` node.
fn open_brace_end(node: Node<'_>) -> Option<Pos> {
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            if child.kind() == "{" {
                return Some(child.end_byte());
            }
        }
    }
    None
}

/// Patches every unused import (spec.md §4.4.1's "exiting the file scope"
/// step, and §4.4.2's import row). Run once, after the walk, with the
/// visitor's accumulated [`UnusedFinder::used_imports`].
pub fn patch_unused_imports(
    batch: &mut PatchBatch,
    file: &ParsedFile,
    resolver: &ImportResolver,
    used_imports: &HashSet<String>,
) {
    for (spec, node) in goast::import_specs(file, file.tree().root_node()) {
        // Dot imports rebind their package's exports directly into file scope,
        // which a bare CST gives us no compiler-grade way to resolve; a dot
        // import is therefore never flagged unused, only ever skipped, same
        // as blank imports.
        if spec.is_blank() || spec.is_dot() {
            continue;
        }
        let name = resolver.get_name_or_guess(&spec);
        if used_imports.contains(&name) {
            continue;
        }
        patch_unused_import(batch, &spec, node);
    }
}

fn patch_unused_import(batch: &mut PatchBatch, spec: &ImportSpec, node: Node<'_>) {
    match node.child_by_field_name("name") {
        Some(alias) => {
            batch.push(Patch::Replace { start: alias.start_byte(), end: alias.end_byte(), text: "_".into() });
        }
        None => {
            if let Some(path) = node.child_by_field_name("path") {
                batch.push(Patch::Insert { pos: path.start_byte(), text: "_ ".into() });
            }
        }
    }
    let _ = spec;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::walk;

    fn run(src: &[u8]) -> PatchBatch {
        let file = ParsedFile::parse_bytes("a.go".into(), src.to_vec()).unwrap();
        let mut visitor = UnusedFinder::new();
        walk(&file, &mut visitor);
        visitor.into_patch_batch()
    }

    #[test]
    fn unused_local_var_is_patched_at_decl_end() {
        let batch = run(b"package p\n\nfunc f() {\n\tx := 1\n}\n");
        assert!(!batch.is_empty());
    }

    #[test]
    fn used_local_var_is_not_patched() {
        let batch = run(b"package p\n\nfunc f() {\n\tx := 1\n\t_ = x\n}\n");
        // `_ = x` itself is a statement whose rhs is `x`: used.
        let any_decl_end_patch = batch.iter().any(|p| matches!(p, Patch::Insert { text, .. } if text.contains("_ = x")));
        assert!(!any_decl_end_patch);
    }

    #[test]
    fn unused_for_loop_binding_patches_inside_body_block() {
        let batch = run(b"package p\n\nfunc f() {\n\tfor i := 0; i < 1; i++ {\n\t}\n}\n");
        // `i` is used by the condition/post, so no patch is expected here;
        // this just exercises the for-statement code path without panics.
        let _ = batch;
    }

    #[test]
    fn function_parameters_are_never_patched() {
        let batch = run(b"package p\n\nfunc f(unused int) {\n}\n");
        assert!(batch.is_empty());
    }

    #[test]
    fn unused_local_type_declaration_is_never_patched() {
        let batch = run(b"package p\n\nfunc f() {\n\ttype unused int\n}\n");
        assert!(batch.is_empty());
    }
}
