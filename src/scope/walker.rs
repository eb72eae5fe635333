//! The Scope Walker (spec.md §4.3): drives a [`Visitor`] over a
//! [`ParsedFile`] while maintaining the lexical scope chain the source
//! language's own specification dictates.
//!
//! Every construct that introduces a scope follows the same shape: open a
//! scope, recurse, and close it. Constructs that can introduce a *chain* of
//! scopes within one block (`:=`, `var`, `const` at statement level, each of
//! which must be invisible to the statements before it but visible to the
//! ones after — spec.md's "Short variable declaration" rule) are handled by
//! [`Walker::walk_block`], which threads a "current scope" cursor through
//! the block's statement list and hands the whole resulting chain back to
//! its caller to close in one [`Walker::close_scopes`] burst, alongside
//! whatever scope the caller itself opened (e.g. an `if`'s init scope). This
//! is what produces the "several scopes close at one syntactic point"
//! bursts spec.md §4.3 describes, with `is_innermost_at_this_level` true
//! only for the first call of each burst.

use crate::goast::kind;
use crate::patch::ParsedFile;
use crate::scope::{BindingKind, DeclRef, ScopeArena, ScopeId};
use tree_sitter::Node;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Flow {
    Descend,
    Stop,
}

/// Callback bundle driven by the walker (spec.md §4.3).
///
/// Default methods all descend; a visitor overrides only what it needs.
/// Unlike the original's functional "returns a new visitor" style, these
/// take `&mut self` — idiomatic Rust mutation in place removes the need for
/// the copy-on-write vector spec.md §3/§9 describes as a performance device
/// for the original's immutable-return style (see
/// [`crate::visitors::multi::MultiVisitor`] for where that simplification is
/// recorded).
pub trait Visitor {
    fn visit_expr(
        &mut self,
        _scopes: &ScopeArena,
        _scope: ScopeId,
        _node: Node<'_>,
        _file: &ParsedFile,
    ) -> Flow {
        Flow::Descend
    }

    fn visit_stmt(
        &mut self,
        _scopes: &ScopeArena,
        _scope: ScopeId,
        _node: Node<'_>,
        _file: &ParsedFile,
    ) -> Flow {
        Flow::Descend
    }

    fn visit_decl(
        &mut self,
        _scopes: &ScopeArena,
        _scope: ScopeId,
        _node: Node<'_>,
        _file: &ParsedFile,
    ) -> Flow {
        Flow::Descend
    }

    fn exit_scope(
        &mut self,
        _scopes: &ScopeArena,
        _scope: ScopeId,
        _parent_node: Node<'_>,
        _is_innermost_at_this_level: bool,
        _file: &ParsedFile,
    ) {
    }
}

pub fn walk(file: &ParsedFile, visitor: &mut dyn Visitor) {
    let mut w = Walker { file, visitor, scopes: ScopeArena::new() };
    let root = file.tree().root_node();
    let file_scope = w.scopes.new_scope(None);
    w.walk_top_level(file_scope, root);
    w.close_scopes(vec![file_scope], root);
}

struct Walker<'v, 'f> {
    file: &'f ParsedFile,
    visitor: &'v mut dyn Visitor,
    scopes: ScopeArena,
}

fn decl_ref(node: Node<'_>) -> DeclRef {
    DeclRef { start: node.start_byte(), end: node.end_byte() }
}

impl<'v, 'f> Walker<'v, 'f> {
    /// Closes `chain` innermost-first (the order it was built in — callers
    /// push in creation order and this function closes from the back), all
    /// attributed to one `parent_node`, matching spec.md's "several scopes
    /// close at one syntactic point" burst semantics.
    fn close_scopes(&mut self, mut chain: Vec<ScopeId>, parent_node: Node<'_>) {
        chain.reverse();
        for (i, scope) in chain.into_iter().enumerate() {
            self.visitor.exit_scope(&self.scopes, scope, parent_node, i == 0, self.file);
        }
    }

    fn walk_top_level(&mut self, file_scope: ScopeId, root: Node<'f>) {
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            match child.kind() {
                kind::PACKAGE_CLAUSE | kind::COMMENT => {}
                kind::IMPORT_DECLARATION => {
                    self.visitor.visit_decl(&self.scopes, file_scope, child, self.file);
                }
                kind::FUNCTION_DECLARATION | kind::METHOD_DECLARATION => {
                    self.walk_function(file_scope, child, true);
                }
                kind::VAR_DECLARATION | kind::CONST_DECLARATION | kind::TYPE_DECLARATION => {
                    self.walk_decl_with_specs(file_scope, child);
                }
                _ => {
                    self.visitor.visit_decl(&self.scopes, file_scope, child, self.file);
                }
            }
        }
    }

    fn walk_function(&mut self, parent_scope: ScopeId, node: Node<'f>, top_level: bool) {
        if self.visitor.visit_decl(&self.scopes, parent_scope, node, self.file) == Flow::Stop {
            return;
        }
        if let Some(name) = node.child_by_field_name("name") {
            let name_text = crate::goast::text(self.file, name);
            if !(top_level && name_text == "init") {
                self.scopes.insert(parent_scope, name_text, decl_ref(node), BindingKind::Value);
            }
        }

        let func_scope = self.scopes.new_scope(Some(parent_scope));
        if let Some(receiver) = node.child_by_field_name("receiver") {
            self.insert_params(func_scope, receiver);
        }
        if let Some(params) = node.child_by_field_name("parameters") {
            self.insert_params(func_scope, params);
        }
        if let Some(result) = node.child_by_field_name("result") {
            if result.kind() == kind::PARAMETER_LIST {
                self.insert_params(func_scope, result);
            }
        }

        // The body's own block-chain closes attributed to the body block
        // itself (same as any other bare block), so an unused local falls
        // into Patch-Unused's "any other" catch-all rather than its
        // "function argument field" no-patch row. Only the param/receiver/
        // result scope is attributed to the function node.
        if let Some(body) = node.child_by_field_name("body") {
            let body_chain = self.walk_block(func_scope, body);
            self.close_scopes(body_chain, body);
        }
        self.close_scopes(vec![func_scope], node);
    }

    fn insert_params(&mut self, scope: ScopeId, param_list: Node<'f>) {
        let mut cursor = param_list.walk();
        for param in param_list.named_children(&mut cursor) {
            if param.kind() != kind::PARAMETER_DECLARATION {
                continue;
            }
            let mut name_cursor = param.walk();
            for name in param.children_by_field_name("name", &mut name_cursor) {
                let n = crate::goast::text(self.file, name);
                self.scopes.insert(scope, n, decl_ref(param), BindingKind::Value);
            }
        }
    }

    /// Top-level (or block-level) `var`/`const`/`type` declaration: binds
    /// each declared name and visits any initializer expressions.
    fn walk_decl_with_specs(&mut self, scope: ScopeId, decl_node: Node<'f>) -> Vec<(String, DeclRef, BindingKind)> {
        if self.visitor.visit_decl(&self.scopes, scope, decl_node, self.file) == Flow::Stop {
            return vec![];
        }
        let mut decls = Vec::new();
        let mut cursor = decl_node.walk();
        for spec in decl_node.named_children(&mut cursor) {
            if !matches!(spec.kind(), kind::VAR_SPEC | kind::CONST_SPEC) {
                // type_spec and others: bind the declared "name" field if present.
                if let Some(name) = spec.child_by_field_name("name") {
                    decls.push((crate::goast::text(self.file, name).to_string(), decl_ref(spec), BindingKind::Type));
                }
                continue;
            }
            let mut name_cursor = spec.walk();
            for name in spec.children_by_field_name("name", &mut name_cursor) {
                decls.push((crate::goast::text(self.file, name).to_string(), decl_ref(spec), BindingKind::Value));
            }
            if let Some(value) = spec.child_by_field_name("value") {
                self.walk_expr_list(scope, value);
            }
        }
        decls
    }

    fn walk_expr_list(&mut self, scope: ScopeId, node: Node<'f>) {
        if node.is_named() {
            self.walk_expr(scope, node);
        }
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.walk_expr(scope, child);
        }
    }

    /// Processes one block's statement list, threading the "current scope"
    /// cursor through declaring statements. Returns the full chain of
    /// scopes created (block's own initial scope first, in creation order —
    /// callers push this directly into [`Walker::close_scopes`], which
    /// reverses it).
    fn walk_block(&mut self, parent_scope: ScopeId, block: Node<'f>) -> Vec<ScopeId> {
        let block_scope = self.scopes.new_scope(Some(parent_scope));
        let mut chain = vec![block_scope];
        let mut current = block_scope;
        let mut cursor = block.walk();
        for stmt in block.named_children(&mut cursor) {
            if stmt.kind() == kind::COMMENT {
                continue;
            }
            if let Some(new_scope) = self.walk_stmt(current, stmt) {
                current = new_scope;
                chain.push(new_scope);
            }
        }
        chain
    }

    /// Visits one statement. If it declares new bindings visible to later
    /// siblings (`:=`, `var`, `const`, `type`), returns the new chained
    /// scope holding them; otherwise `None`.
    fn walk_stmt(&mut self, scope: ScopeId, node: Node<'f>) -> Option<ScopeId> {
        match node.kind() {
            kind::SHORT_VAR_DECLARATION => {
                if self.visitor.visit_stmt(&self.scopes, scope, node, self.file) == Flow::Stop {
                    return None;
                }
                if let Some(right) = node.child_by_field_name("right") {
                    self.walk_expr_list(scope, right);
                }
                let new_scope = self.scopes.new_scope(Some(scope));
                if let Some(left) = node.child_by_field_name("left") {
                    let mut cursor = left.walk();
                    for id in left.named_children(&mut cursor) {
                        if id.kind() == kind::IDENTIFIER {
                            self.scopes.insert(new_scope, crate::goast::text(self.file, id), decl_ref(node), BindingKind::Value);
                        }
                    }
                }
                Some(new_scope)
            }
            kind::VAR_DECLARATION | kind::CONST_DECLARATION | kind::TYPE_DECLARATION => {
                let decls = self.walk_decl_with_specs(scope, node);
                if decls.is_empty() {
                    return None;
                }
                let new_scope = self.scopes.new_scope(Some(scope));
                for (name, decl, kind) in decls {
                    self.scopes.insert(new_scope, &name, decl, kind);
                }
                Some(new_scope)
            }
            kind::IF_STATEMENT => {
                self.walk_if(scope, node);
                None
            }
            kind::FOR_STATEMENT => {
                self.walk_for(scope, node);
                None
            }
            kind::EXPRESSION_SWITCH_STATEMENT => {
                self.walk_switch(scope, node, false);
                None
            }
            kind::TYPE_SWITCH_STATEMENT => {
                self.walk_switch(scope, node, true);
                None
            }
            kind::SELECT_STATEMENT => {
                self.walk_select(scope, node);
                None
            }
            kind::BLOCK => {
                let inner = self.walk_block(scope, node);
                self.close_scopes(inner, node);
                None
            }
            kind::LABELED_STATEMENT => {
                if let Some(inner) = node.named_child(node.named_child_count().saturating_sub(1)) {
                    self.walk_stmt(scope, inner);
                }
                None
            }
            kind::ASSIGNMENT_STATEMENT => {
                self.walk_assignment(scope, node);
                None
            }
            _ => {
                if self.visitor.visit_stmt(&self.scopes, scope, node, self.file) == Flow::Stop {
                    return None;
                }
                self.walk_children_as_exprs(scope, node);
                None
            }
        }
    }

    fn walk_assignment(&mut self, scope: ScopeId, node: Node<'f>) {
        if self.visitor.visit_stmt(&self.scopes, scope, node, self.file) == Flow::Stop {
            return;
        }
        // spec.md §4.3: rhs before lhs only for `:=`; ordinary `=` visits
        // lhs then rhs. `short_var_declaration` is a distinct node kind
        // here, so `assignment_statement` always takes the `=`-style order.
        if let Some(left) = node.child_by_field_name("left") {
            self.walk_expr_list(scope, left);
        }
        if let Some(right) = node.child_by_field_name("right") {
            self.walk_expr_list(scope, right);
        }
    }

    fn walk_if(&mut self, parent_scope: ScopeId, node: Node<'f>) {
        if self.visitor.visit_stmt(&self.scopes, parent_scope, node, self.file) == Flow::Stop {
            return;
        }
        let init_scope = self.scopes.new_scope(Some(parent_scope));
        if let Some(init) = node.child_by_field_name("initializer") {
            self.bind_simple_stmt(init_scope, init);
        }
        if let Some(cond) = node.child_by_field_name("condition") {
            self.walk_expr(init_scope, cond);
        }

        let mut combined = Vec::new();
        if let Some(consequence) = node.child_by_field_name("consequence") {
            combined = self.walk_block(init_scope, consequence);
        }

        if let Some(alternative) = node.child_by_field_name("alternative") {
            self.close_scopes(combined, node);
            combined = if alternative.kind() == kind::IF_STATEMENT {
                self.walk_if(init_scope, alternative);
                Vec::new()
            } else {
                self.walk_block(init_scope, alternative)
            };
        }

        combined.push(init_scope);
        self.close_scopes(combined, node);
    }

    fn walk_for(&mut self, parent_scope: ScopeId, node: Node<'f>) {
        if self.visitor.visit_stmt(&self.scopes, parent_scope, node, self.file) == Flow::Stop {
            return;
        }
        let loop_scope = self.scopes.new_scope(Some(parent_scope));
        if let Some(clause) = node.child_by_field_name("clause") {
            match clause.kind() {
                kind::FOR_CLAUSE => {
                    if let Some(init) = clause.child_by_field_name("initializer") {
                        self.bind_simple_stmt(loop_scope, init);
                    }
                    if let Some(cond) = clause.child_by_field_name("condition") {
                        self.walk_expr(loop_scope, cond);
                    }
                    if let Some(update) = clause.child_by_field_name("update") {
                        self.walk_stmt(loop_scope, update);
                    }
                }
                kind::RANGE_CLAUSE => {
                    let is_define = crate::goast::text(self.file, clause).contains(":=");
                    if is_define {
                        if let Some(left) = clause.child_by_field_name("left") {
                            let mut cursor = left.walk();
                            for id in left.named_children(&mut cursor) {
                                if id.kind() == kind::IDENTIFIER {
                                    self.scopes.insert(
                                        loop_scope,
                                        crate::goast::text(self.file, id),
                                        decl_ref(clause),
                                        BindingKind::Value,
                                    );
                                }
                            }
                        }
                    }
                    // spec.md §4.3: range's expr is walked before the body,
                    // in the new (`:=`) scope.
                    if let Some(right) = clause.child_by_field_name("right") {
                        self.walk_expr(loop_scope, right);
                    }
                    if !is_define {
                        if let Some(left) = clause.child_by_field_name("left") {
                            self.walk_expr_list(loop_scope, left);
                        }
                    }
                }
                // a bare boolean condition with no init/post (`for cond { }`).
                _ => self.walk_expr(loop_scope, clause),
            }
        }

        let mut combined = vec![];
        if let Some(body) = node.child_by_field_name("body") {
            combined = self.walk_block(loop_scope, body);
        }
        combined.push(loop_scope);
        self.close_scopes(combined, node);
    }

    /// Extracts and binds the declaration an `if`/`for` init clause or a
    /// `select` comm-clause statement makes (only `:=` introduces a new
    /// name; assignment/expression statements don't).
    fn bind_simple_stmt(&mut self, scope: ScopeId, node: Node<'f>) {
        match node.kind() {
            kind::SHORT_VAR_DECLARATION => {
                if let Some(right) = node.child_by_field_name("right") {
                    self.walk_expr_list(scope, right);
                }
                if let Some(left) = node.child_by_field_name("left") {
                    let mut cursor = left.walk();
                    for id in left.named_children(&mut cursor) {
                        if id.kind() == kind::IDENTIFIER {
                            self.scopes.insert(scope, crate::goast::text(self.file, id), decl_ref(node), BindingKind::Value);
                        }
                    }
                }
            }
            _ => self.walk_stmt(scope, node).map(|_| ()).unwrap_or(()),
        }
    }

    fn walk_switch(&mut self, parent_scope: ScopeId, node: Node<'f>, is_type_switch: bool) {
        if self.visitor.visit_stmt(&self.scopes, parent_scope, node, self.file) == Flow::Stop {
            return;
        }
        let switch_scope = self.scopes.new_scope(Some(parent_scope));
        if let Some(init) = node.child_by_field_name("initializer") {
            self.bind_simple_stmt(switch_scope, init);
        }
        if is_type_switch {
            if let Some(guard) = find_child_of_kind(node, kind::TYPE_SWITCH_GUARD) {
                if let Some(name) = guard.child_by_field_name("name") {
                    self.scopes.insert(switch_scope, crate::goast::text(self.file, name), decl_ref(guard), BindingKind::Value);
                }
                if let Some(value) = guard.child_by_field_name("value") {
                    self.walk_expr(switch_scope, value);
                }
            }
        } else if let Some(value) = node.child_by_field_name("value") {
            self.walk_expr(switch_scope, value);
        }

        let body_scope = self.scopes.new_scope(Some(switch_scope));
        let cases: Vec<Node<'f>> = {
            let mut cursor = node.walk();
            node.named_children(&mut cursor)
                .filter(|c| matches!(c.kind(), kind::EXPRESSION_CASE | kind::DEFAULT_CASE | kind::TYPE_CASE))
                .collect()
        };

        if cases.is_empty() {
            self.close_scopes(vec![body_scope, switch_scope], node);
            return;
        }

        for (i, case_node) in cases.iter().enumerate() {
            self.visitor.visit_stmt(&self.scopes, body_scope, *case_node, self.file);
            let case_scope = self.scopes.new_scope(Some(body_scope));
            let chain = self.walk_case_statements(case_scope, *case_node);
            let mut combined = chain;
            combined.push(case_scope);
            // Attributed to the case clause itself — Patch-Unused needs the
            // clause's own text (to insert right after its `:`), not the
            // outer switch's.
            self.close_scopes(combined, *case_node);
            if i + 1 == cases.len() {
                self.close_scopes(vec![body_scope, switch_scope], node);
            }
        }
    }

    fn walk_select(&mut self, parent_scope: ScopeId, node: Node<'f>) {
        if self.visitor.visit_stmt(&self.scopes, parent_scope, node, self.file) == Flow::Stop {
            return;
        }
        let body_scope = self.scopes.new_scope(Some(parent_scope));
        let cases: Vec<Node<'f>> = {
            let mut cursor = node.walk();
            node.named_children(&mut cursor)
                .filter(|c| c.kind() == kind::COMMUNICATION_CASE)
                .collect()
        };

        if cases.is_empty() {
            self.close_scopes(vec![body_scope], node);
            return;
        }

        for (i, case_node) in cases.iter().enumerate() {
            self.visitor.visit_stmt(&self.scopes, body_scope, *case_node, self.file);
            let comm_scope = self.scopes.new_scope(Some(body_scope));
            if let Some(comm) = case_node.child_by_field_name("communication") {
                self.bind_simple_stmt(comm_scope, comm);
            }
            let chain = self.walk_case_statements(comm_scope, *case_node);
            let mut combined = chain;
            combined.push(comm_scope);
            // Parent is the comm-clause itself (spec.md §4.4.2's "Parent
            // identity edge case"): Patch-Unused distinguishes "declared by
            // the clause's own statement" from "declared in the clause
            // body" by comparing a binding's declaration range against the
            // clause's `communication` node, which it can only do if it's
            // handed the clause, not the outer `select`.
            self.close_scopes(combined, *case_node);
            if i + 1 == cases.len() {
                self.close_scopes(vec![body_scope], node);
            }
        }
    }

    /// Runs the block-chain logic over a case/comm-clause's trailing
    /// statement list (everything after the `:`), mirroring
    /// [`Walker::walk_block`] but without an extra wrapping scope — the
    /// case's own scope (created by the caller) plays that role.
    fn walk_case_statements(&mut self, case_scope: ScopeId, case_node: Node<'f>) -> Vec<ScopeId> {
        let mut chain = Vec::new();
        let mut current = case_scope;
        let mut cursor = case_node.walk();
        for child in case_node.named_children(&mut cursor) {
            if matches!(
                child.kind(),
                "expression_list" | "type_case" | kind::COMMENT
            ) {
                continue;
            }
            // Skip the clause's own leading value/type/communication node —
            // those were already handled by the caller.
            if Some(child) == case_node.child_by_field_name("value")
                || Some(child) == case_node.child_by_field_name("communication")
            {
                continue;
            }
            if let Some(new_scope) = self.walk_stmt(current, child) {
                current = new_scope;
                chain.push(new_scope);
            }
        }
        chain
    }

    fn walk_children_as_exprs(&mut self, scope: ScopeId, node: Node<'f>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.walk_expr(scope, child);
        }
    }

    fn walk_expr(&mut self, scope: ScopeId, node: Node<'f>) {
        if node.kind() == kind::COMMENT {
            return;
        }
        if node.kind() == kind::FUNC_LITERAL {
            self.walk_func_literal(scope, node);
            return;
        }
        if node.kind() == kind::SELECTOR_EXPRESSION {
            self.walk_selector(scope, node);
            return;
        }
        if node.kind() == kind::KEYED_ELEMENT {
            self.walk_keyed_element(scope, node);
            return;
        }
        if self.visitor.visit_expr(&self.scopes, scope, node, self.file) == Flow::Stop {
            return;
        }
        self.walk_children_as_exprs(scope, node);
    }

    fn walk_func_literal(&mut self, parent_scope: ScopeId, node: Node<'f>) {
        if self.visitor.visit_expr(&self.scopes, parent_scope, node, self.file) == Flow::Stop {
            return;
        }
        let func_scope = self.scopes.new_scope(Some(parent_scope));
        if let Some(params) = node.child_by_field_name("parameters") {
            self.insert_params(func_scope, params);
        }
        if let Some(result) = node.child_by_field_name("result") {
            if result.kind() == kind::PARAMETER_LIST {
                self.insert_params(func_scope, result);
            }
        }
        if let Some(body) = node.child_by_field_name("body") {
            let body_chain = self.walk_block(func_scope, body);
            self.close_scopes(body_chain, body);
        }
        self.close_scopes(vec![func_scope], node);
    }

    /// `X.Sel`: visits `X` normally, always; visits `Sel` too unless the
    /// visitor opted out by returning [`Flow::Stop`] for the selector node
    /// itself (spec.md §4.3's special case). The Unused-Finder additionally
    /// tracks `Sel`'s byte range in its own "irrelevant" set (spec.md
    /// §4.4.1) so it is never double-counted even when a visitor does
    /// descend into it.
    fn walk_selector(&mut self, scope: ScopeId, node: Node<'f>) {
        let flow = self.visitor.visit_expr(&self.scopes, scope, node, self.file);
        if let Some(operand) = node.child_by_field_name("operand") {
            self.walk_expr(scope, operand);
        }
        if flow == Flow::Descend {
            if let Some(field) = node.child_by_field_name("field") {
                self.walk_expr(scope, field);
            }
        }
    }

    fn walk_keyed_element(&mut self, scope: ScopeId, node: Node<'f>) {
        if self.visitor.visit_expr(&self.scopes, scope, node, self.file) == Flow::Stop {
            return;
        }
        if let Some(key) = node.child_by_field_name("key") {
            self.walk_expr(scope, key);
        }
        if let Some(value) = node.child_by_field_name("value") {
            self.walk_expr(scope, value);
        }
    }
}

fn find_child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).find(|c| c.kind() == kind)
}
