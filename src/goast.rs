//! Shared `tree-sitter-go` node-kind constants and small helpers used by
//! both [`crate::scope::walker`] and [`crate::visitors`].
//!
//! Centralizing the grammar's node-kind strings here means a grammar
//! version bump only needs auditing in one place.

use crate::patch::ParsedFile;
use crate::resolver::ImportSpec;
use tree_sitter::Node;

pub mod kind {
    pub const PACKAGE_CLAUSE: &str = "package_clause";
    pub const IMPORT_DECLARATION: &str = "import_declaration";
    pub const IMPORT_SPEC: &str = "import_spec";
    pub const IMPORT_SPEC_LIST: &str = "import_spec_list";
    pub const FUNCTION_DECLARATION: &str = "function_declaration";
    pub const METHOD_DECLARATION: &str = "method_declaration";
    pub const FUNC_LITERAL: &str = "func_literal";
    pub const PARAMETER_LIST: &str = "parameter_list";
    pub const PARAMETER_DECLARATION: &str = "parameter_declaration";
    pub const BLOCK: &str = "block";
    pub const SHORT_VAR_DECLARATION: &str = "short_var_declaration";
    pub const VAR_DECLARATION: &str = "var_declaration";
    pub const CONST_DECLARATION: &str = "const_declaration";
    pub const VAR_SPEC: &str = "var_spec";
    pub const CONST_SPEC: &str = "const_spec";
    pub const TYPE_DECLARATION: &str = "type_declaration";
    pub const IF_STATEMENT: &str = "if_statement";
    pub const FOR_STATEMENT: &str = "for_statement";
    pub const FOR_CLAUSE: &str = "for_clause";
    pub const RANGE_CLAUSE: &str = "range_clause";
    pub const EXPRESSION_SWITCH_STATEMENT: &str = "expression_switch_statement";
    pub const TYPE_SWITCH_STATEMENT: &str = "type_switch_statement";
    pub const TYPE_SWITCH_GUARD: &str = "type_switch_guard";
    pub const EXPRESSION_CASE: &str = "expression_case";
    pub const DEFAULT_CASE: &str = "default_case";
    pub const TYPE_CASE: &str = "type_case";
    pub const SELECT_STATEMENT: &str = "select_statement";
    pub const COMMUNICATION_CASE: &str = "communication_case";
    pub const ASSIGNMENT_STATEMENT: &str = "assignment_statement";
    pub const SEND_STATEMENT: &str = "send_statement";
    pub const RETURN_STATEMENT: &str = "return_statement";
    pub const EXPRESSION_STATEMENT: &str = "expression_statement";
    pub const LABELED_STATEMENT: &str = "labeled_statement";
    pub const CALL_EXPRESSION: &str = "call_expression";
    pub const SELECTOR_EXPRESSION: &str = "selector_expression";
    pub const IDENTIFIER: &str = "identifier";
    pub const FIELD_IDENTIFIER: &str = "field_identifier";
    pub const PACKAGE_IDENTIFIER: &str = "package_identifier";
    pub const KEYED_ELEMENT: &str = "keyed_element";
    pub const COMMENT: &str = "comment";
    pub const INTERPRETED_STRING_LITERAL: &str = "interpreted_string_literal";
}

pub fn text<'a>(file: &'a ParsedFile, node: Node<'_>) -> &'a str {
    file.text(node.start_byte(), node.end_byte())
}

/// Strips the surrounding double quotes from an import path literal.
pub fn unquote(s: &str) -> String {
    s.trim_matches('"').to_string()
}

/// Every `import` spec in the file's top-level `import_declaration`s, in
/// source order, paired with its tree-sitter node (so callers can locate
/// it for patching).
pub fn import_specs<'t>(file: &ParsedFile, root: Node<'t>) -> Vec<(ImportSpec, Node<'t>)> {
    let mut out = Vec::new();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if child.kind() != kind::IMPORT_DECLARATION {
            continue;
        }
        let mut inner = child.walk();
        for grandchild in child.named_children(&mut inner) {
            collect_import_spec(file, grandchild, &mut out);
        }
    }
    out
}

fn collect_import_spec<'t>(
    file: &ParsedFile,
    node: Node<'t>,
    out: &mut Vec<(ImportSpec, Node<'t>)>,
) {
    match node.kind() {
        kind::IMPORT_SPEC => {
            let path_node = node.child_by_field_name("path");
            let Some(path_node) = path_node else { return };
            let path = unquote(text(file, path_node));
            let alias = node
                .child_by_field_name("name")
                .map(|n| text(file, n).to_string());
            out.push((ImportSpec { path, alias }, node));
        }
        kind::IMPORT_SPEC_LIST => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                collect_import_spec(file, child, out);
            }
        }
        _ => {}
    }
}
