//! Short-Error-Transform (spec.md §4.4.4): rewrites calls to a pseudo-builtin
//! (`must` by default) that wraps a `(T, error)`-returning expression, into
//! the usual `v, err := expr; if err != nil { panic(err) }` Go idiom.
//!
//! The five patterns spec.md lists share two primitives: replacing the call
//! itself (either with its own argument's text, or with a generated
//! placeholder name) and accumulating an error-guard somewhere — inline
//! after a statement, or into a synthetic top-level `init()` when the call
//! had no enclosing function to guard inline. [`MustTransform::handled`]
//! exists solely so a call already rewritten by a statement-shape pattern
//! (2 or 3, or top-level pattern 1) isn't rewritten a second time when the
//! walk's generic expression dispatch reaches it.

use crate::goast::{self, kind};
use crate::patch::{Patch, PatchBatch, ParsedFile, Pos};
use crate::scope::{Flow, ScopeArena, ScopeId, Visitor};
use std::collections::HashSet;
use std::path::PathBuf;
use tree_sitter::Node;

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub filename: PathBuf,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}: {}", self.filename.display(), self.line, self.column, self.message)
    }
}

pub struct MustTransform {
    builtin: String,
    handled: HashSet<(usize, usize)>,
    taken: HashSet<String>,
    patches: PatchBatch,
    diagnostics: Vec<Diagnostic>,
    after_imports: Pos,
    existing_init_body_start: Option<Pos>,
    accumulated_guards: Vec<String>,
    current_stmt_start: Pos,
    current_top_level_start: Pos,
}

impl MustTransform {
    pub fn new(file: &ParsedFile, builtin_name: impl Into<String>) -> Self {
        let builtin = builtin_name.into();
        let root = file.tree().root_node();
        let mut existing_init_body_start = None;
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            if child.kind() == kind::FUNCTION_DECLARATION {
                if let Some(name) = child.child_by_field_name("name") {
                    if goast::text(file, name) == "init" {
                        if let Some(body) = child.child_by_field_name("body") {
                            existing_init_body_start = Some(body.start_byte() + 1);
                        }
                    }
                }
            }
        }
        Self {
            builtin,
            handled: HashSet::new(),
            taken: HashSet::new(),
            patches: PatchBatch::new(),
            diagnostics: Vec::new(),
            after_imports: file.after_imports(),
            existing_init_body_start,
            accumulated_guards: Vec::new(),
            current_stmt_start: 0,
            current_top_level_start: 0,
        }
    }

    /// Consumes the visitor, flushing any accumulated `init()` guards, and
    /// returns the patches plus any diagnostics collected along the way.
    pub fn into_parts(mut self) -> (PatchBatch, Vec<Diagnostic>) {
        self.flush_init();
        (self.patches, self.diagnostics)
    }

    fn flush_init(&mut self) {
        if self.accumulated_guards.is_empty() {
            return;
        }
        let guards = self.accumulated_guards.join(" ");
        match self.existing_init_body_start {
            Some(pos) => self.patches.push(Patch::Insert { pos, text: format!(" {guards}") }),
            None => self.patches.push(Patch::Insert {
                pos: self.after_imports,
                text: format!("\n\nfunc init() {{ {guards} }}\n"),
            }),
        }
    }

    fn temp_var(&mut self, scopes: &ScopeArena, scope: ScopeId, stem: &str) -> String {
        for n in 0..10_000u32 {
            let candidate = format!("{stem}{n}");
            if !self.taken.contains(&candidate) && scopes.lookup(scope, &candidate).is_none() {
                self.taken.insert(candidate.clone());
                return candidate;
            }
        }
        panic!("temp_var: exhausted 10000 candidates for stem {stem:?}");
    }

    fn as_must_call<'t>(&self, node: Node<'t>, file: &ParsedFile) -> Option<(Node<'t>, Node<'t>)> {
        if node.kind() != kind::CALL_EXPRESSION {
            return None;
        }
        let function = node.child_by_field_name("function")?;
        if function.kind() != kind::IDENTIFIER || goast::text(file, function) != self.builtin {
            return None;
        }
        let arguments = node.child_by_field_name("arguments")?;
        Some((node, arguments))
    }

    /// Validates arity, reporting and returning `None` on a non-single-arg
    /// call (spec.md's "`must` called with ≠ 1 argument" diagnostic).
    fn must_call_arg<'t>(&mut self, call: Node<'t>, args: Node<'t>, file: &ParsedFile) -> Option<Node<'t>> {
        let named: Vec<Node<'t>> = {
            let mut cursor = args.walk();
            args.named_children(&mut cursor).collect()
        };
        if named.len() != 1 {
            let (line, column) = file.line_col(call.start_byte());
            self.diagnostics.push(Diagnostic {
                filename: file.filename().to_path_buf(),
                line,
                column,
                message: format!("{}() takes exactly one argument, got {}", self.builtin, named.len()),
            });
            return None;
        }
        Some(named[0])
    }

    fn replace_must_prefix_with_open_paren(&mut self, call: Node<'_>, args: Node<'_>) {
        self.patches.push(Patch::Replace {
            start: call.start_byte(),
            end: args.start_byte() + 1,
            text: "(".to_string(),
        });
    }

    fn replace_call_with(&mut self, call: Node<'_>, text: String) {
        self.patches.push(Patch::Replace { start: call.start_byte(), end: call.end_byte(), text });
    }

    /// Pattern 1: `var x, y, z = must(expr)` at top level.
    fn handle_top_level_var(&mut self, scopes: &ScopeArena, scope: ScopeId, node: Node<'_>, file: &ParsedFile) {
        let mut cursor = node.walk();
        let specs: Vec<Node> = node.named_children(&mut cursor).collect();
        for spec in specs {
            if spec.kind() != kind::VAR_SPEC {
                continue;
            }
            let Some(value) = spec.child_by_field_name("value") else { continue };
            let values: Vec<Node> = {
                let mut c = value.walk();
                value.named_children(&mut c).collect()
            };
            if values.len() != 1 {
                continue;
            }
            let Some((call, args)) = self.as_must_call(values[0], file) else { continue };
            let Some(arg) = self.must_call_arg(call, args, file) else {
                self.handled.insert((call.start_byte(), call.end_byte()));
                continue;
            };
            self.handled.insert((call.start_byte(), call.end_byte()));
            let arg_text = goast::text(file, arg).to_string();
            self.replace_call_with(call, arg_text);

            let err_name = self.temp_var(scopes, scope, "tlderr");
            let mut name_cursor = spec.walk();
            if let Some(last_name) = spec.children_by_field_name("name", &mut name_cursor).last() {
                self.patches.push(Patch::Insert { pos: last_name.end_byte(), text: format!(", {err_name}") });
            }
            self.accumulated_guards.push(format!("if {err_name} != nil {{ panic({err_name}) }}"));
        }
    }

    /// Pattern 2: `x := must(expr)` / `x, y := must(expr)`.
    fn handle_short_var_decl(&mut self, scopes: &ScopeArena, scope: ScopeId, node: Node<'_>, file: &ParsedFile) {
        let Some(right) = node.child_by_field_name("right") else { return };
        let values: Vec<Node> = {
            let mut c = right.walk();
            right.named_children(&mut c).collect()
        };
        if values.len() != 1 {
            return;
        }
        let Some((call, args)) = self.as_must_call(values[0], file) else { return };
        let Some(_arg) = self.must_call_arg(call, args, file) else {
            self.handled.insert((call.start_byte(), call.end_byte()));
            return;
        };
        self.handled.insert((call.start_byte(), call.end_byte()));
        self.replace_must_prefix_with_open_paren(call, args);

        let err_name = self.temp_var(scopes, scope, "err");
        if let Some(left) = node.child_by_field_name("left") {
            self.patches.push(Patch::Insert { pos: left.end_byte(), text: format!(", {err_name}") });
        }
        self.patches.push(Patch::Insert {
            pos: node.end_byte(),
            text: format!("; if {err_name} != nil {{ panic({err_name}) }};"),
        });
    }

    /// Pattern 3: `x = must(expr)` (plain assignment, not `:=`).
    fn handle_assignment(&mut self, scopes: &ScopeArena, scope: ScopeId, node: Node<'_>, file: &ParsedFile) {
        let Some(left) = node.child_by_field_name("left") else { return };
        let Some(right) = node.child_by_field_name("right") else { return };
        let values: Vec<Node> = {
            let mut c = right.walk();
            right.named_children(&mut c).collect()
        };
        if values.len() != 1 {
            return;
        }
        let Some((call, args)) = self.as_must_call(values[0], file) else { return };
        let Some(arg) = self.must_call_arg(call, args, file) else {
            self.handled.insert((call.start_byte(), call.end_byte()));
            return;
        };
        self.handled.insert((call.start_byte(), call.end_byte()));

        let target_count = {
            let mut c = left.walk();
            left.named_children(&mut c).count().max(1)
        };
        let mut tmp_names = Vec::with_capacity(target_count);
        for _ in 0..target_count {
            tmp_names.push(self.temp_var(scopes, scope, "tmp"));
        }
        let err_name = self.temp_var(scopes, scope, "err");
        let arg_text = goast::text(file, arg).to_string();
        let tmp_list = tmp_names.join(", ");
        let decl_text = format!(
            "{tmp_list}, {err_name} := {arg_text}; if {err_name} != nil {{ panic({err_name}) }}; "
        );
        self.patches.push(Patch::Insert { pos: node.start_byte(), text: decl_text });
        self.replace_call_with(call, tmp_list);
    }

    /// `must(...)` used directly as an expression-statement: its result is
    /// discarded, which spec.md calls out as its own diagnostic rather than
    /// silently dropping the call.
    fn handle_expression_statement(&mut self, node: Node<'_>, file: &ParsedFile) {
        let Some(inner) = node.named_child(0) else { return };
        let Some((call, _args)) = self.as_must_call(inner, file) else { return };
        let (line, column) = file.line_col(call.start_byte());
        self.diagnostics.push(Diagnostic {
            filename: file.filename().to_path_buf(),
            line,
            column,
            message: format!("{}() result discarded in expression statement", self.builtin),
        });
        self.handled.insert((call.start_byte(), call.end_byte()));
    }
}

impl Visitor for MustTransform {
    fn visit_decl(&mut self, scopes: &ScopeArena, scope: ScopeId, node: Node<'_>, file: &ParsedFile) -> Flow {
        if scopes.outer(scope).is_none() {
            self.current_top_level_start = node.start_byte();
            if node.kind() == kind::VAR_DECLARATION {
                self.handle_top_level_var(scopes, scope, node, file);
            }
        }
        Flow::Descend
    }

    fn visit_stmt(&mut self, scopes: &ScopeArena, scope: ScopeId, node: Node<'_>, file: &ParsedFile) -> Flow {
        self.current_stmt_start = node.start_byte();
        match node.kind() {
            kind::SHORT_VAR_DECLARATION => self.handle_short_var_decl(scopes, scope, node, file),
            kind::ASSIGNMENT_STATEMENT => self.handle_assignment(scopes, scope, node, file),
            kind::EXPRESSION_STATEMENT => self.handle_expression_statement(node, file),
            _ => {}
        }
        Flow::Descend
    }

    fn visit_expr(&mut self, scopes: &ScopeArena, scope: ScopeId, node: Node<'_>, file: &ParsedFile) -> Flow {
        let Some((call, args)) = self.as_must_call(node, file) else { return Flow::Descend };
        if self.handled.contains(&(call.start_byte(), call.end_byte())) {
            return Flow::Descend;
        }
        let Some(arg) = self.must_call_arg(call, args, file) else {
            self.handled.insert((call.start_byte(), call.end_byte()));
            return Flow::Descend;
        };
        self.handled.insert((call.start_byte(), call.end_byte()));
        let arg_text = goast::text(file, arg).to_string();

        if scopes.outer(scope).is_none() {
            // Pattern 5: top-level expression position (e.g. nested inside
            // another top-level declaration's initializer).
            let tmp = self.temp_var(scopes, scope, "tmp");
            let err = self.temp_var(scopes, scope, "err");
            self.patches.push(Patch::Insert {
                pos: self.current_top_level_start,
                text: format!("var {tmp}, {err} = {arg_text}\n\n"),
            });
            self.accumulated_guards.push(format!("if {err} != nil {{ panic({err}) }}"));
            self.replace_call_with(call, tmp);
        } else {
            // Pattern 4: expression position inside a function body.
            let tmp = self.temp_var(scopes, scope, "tmp");
            let err = self.temp_var(scopes, scope, "err");
            self.patches.push(Patch::Insert {
                pos: self.current_stmt_start,
                text: format!("var {tmp}, {err} = {arg_text}; if {err} != nil {{ panic({err}) }}; "),
            });
            self.replace_call_with(call, tmp);
        }
        Flow::Descend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::walk;

    fn run(src: &[u8]) -> (PatchBatch, Vec<Diagnostic>) {
        let file = ParsedFile::parse_bytes("a.go".into(), src.to_vec()).unwrap();
        let mut visitor = MustTransform::new(&file, "must");
        walk(&file, &mut visitor);
        visitor.into_parts()
    }

    #[test]
    fn short_var_decl_pattern_rewrites_must_prefix() {
        let (batch, diags) = run(b"package p\n\nfunc f() {\n\tx := must(open())\n}\n");
        assert!(diags.is_empty());
        let rewrote_prefix = batch.iter().any(|p| matches!(p, Patch::Replace { text, .. } if text == "("));
        assert!(rewrote_prefix);
    }

    #[test]
    fn wrong_arity_is_reported_and_not_rewritten() {
        let (batch, diags) = run(b"package p\n\nfunc f() {\n\tx := must(a, b)\n}\n");
        assert_eq!(diags.len(), 1);
        assert!(batch.is_empty());
    }

    #[test]
    fn discarded_result_as_statement_is_reported() {
        let (_batch, diags) = run(b"package p\n\nfunc f() {\n\tmust(open())\n}\n");
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn top_level_var_pattern_accumulates_init_guard() {
        let (batch, diags) = run(b"package p\n\nvar f = must(open())\n");
        assert!(diags.is_empty());
        let has_init = batch.iter().any(|p| matches!(p, Patch::Insert { text, .. } if text.contains("func init()")));
        assert!(has_init);
    }
}
