use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tree_sitter::{Parser, Tree};

/// A parsed Go source file (spec.md §3 "Parsed File"): `(package_name,
/// filename, ast_root, position_table, original_bytes)`.
///
/// `ast_root` is a `tree-sitter` concrete syntax tree rather than a
/// semantic AST; [`crate::scope`] is what reconstructs the lexical-scope
/// table spec.md assumes is handed to us for free. `position_table` is
/// implicit: tree-sitter nodes carry byte offsets directly, and
/// [`ParsedFile::line_col`] derives `(line, column)` from those offsets on
/// demand rather than maintaining a separate table.
pub struct ParsedFile {
    filename: PathBuf,
    original_bytes: Vec<u8>,
    tree: Tree,
    /// Byte offsets of the start of each line, for `line_col` lookups.
    line_starts: Vec<usize>,
}

impl ParsedFile {
    /// Reads `filename` from disk and parses it with `tree-sitter-go`.
    ///
    /// Invariant upheld: `original_bytes` is exactly the content the parser
    /// consumed (we read once, and hand tree-sitter the same buffer).
    pub fn parse(filename: impl AsRef<Path>) -> Result<Self> {
        let filename = filename.as_ref().to_path_buf();
        let original_bytes =
            std::fs::read(&filename).map_err(|e| Error::io(e, filename.clone()))?;
        Self::parse_bytes(filename, original_bytes)
    }

    pub fn parse_bytes(filename: PathBuf, original_bytes: Vec<u8>) -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .expect("tree-sitter-go grammar failed to load");
        let tree = parser.parse(&original_bytes, None).ok_or_else(|| {
            Error::parse(filename.clone(), "tree-sitter produced no tree (parser timed out?)")
        })?;
        if tree.root_node().has_error() {
            debug!(file = %filename.display(), "parsed tree contains error nodes; proceeding best-effort");
        }
        let line_starts = compute_line_starts(&original_bytes);
        Ok(Self { filename, original_bytes, tree, line_starts })
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    pub fn original_bytes(&self) -> &[u8] {
        &self.original_bytes
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn source_text(&self) -> &str {
        std::str::from_utf8(&self.original_bytes).unwrap_or_default()
    }

    /// The package name declared by this file's `package` clause, or `""` if
    /// the file failed to produce one (malformed input).
    pub fn package_name(&self) -> &str {
        let root = self.tree.root_node();
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            if child.kind() == "package_clause" {
                if let Some(ident) = child.child_by_field_name("name") {
                    return self.text(ident.start_byte(), ident.end_byte());
                }
            }
        }
        ""
    }

    pub fn text(&self, start: usize, end: usize) -> &str {
        std::str::from_utf8(&self.original_bytes[start..end]).unwrap_or_default()
    }

    pub fn slice(&self, start: usize, end: usize) -> &[u8] {
        &self.original_bytes[start..end]
    }

    /// `(line, column)`, both 1-based, for a byte offset.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => (line + 1, 1),
            Err(line) => {
                let line_start = self.line_starts[line - 1];
                (line, offset - line_start + 1)
            }
        }
    }

    /// The full span to render for "the whole file" (spec.md §4.1): covers
    /// leading `//` comments above `package` as well as the root node, so
    /// they are never dropped.
    pub fn all_span(&self) -> (usize, usize) {
        let root = self.tree.root_node();
        (0, root.end_byte().max(self.original_bytes.len()))
    }

    /// Byte offset immediately after the `package NAME` clause — where
    /// auto-imports and the `must`-transform's top-level `init()` get
    /// inserted.
    pub fn after_package_clause(&self) -> usize {
        let root = self.tree.root_node();
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            if child.kind() == "package_clause" {
                return child.end_byte();
            }
        }
        0
    }

    /// Byte offset immediately after the last top-level `import_declaration`,
    /// or [`after_package_clause`](Self::after_package_clause) if there are
    /// none.
    pub fn after_imports(&self) -> usize {
        let root = self.tree.root_node();
        let mut cursor = root.walk();
        let mut pos = self.after_package_clause();
        for child in root.children(&mut cursor) {
            if child.kind() == "import_declaration" {
                pos = child.end_byte();
            }
        }
        pos
    }
}

fn compute_line_starts(bytes: &[u8]) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'\n' {
            starts.push(i + 1);
        }
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_package_name() {
        let f = ParsedFile::parse_bytes(
            "a.go".into(),
            b"package main\n\nfunc main() {}\n".to_vec(),
        )
        .unwrap();
        assert_eq!(f.package_name(), "main");
    }

    #[test]
    fn line_col_round_trips() {
        let f = ParsedFile::parse_bytes("a.go".into(), b"abc\ndef\nghi".to_vec()).unwrap();
        assert_eq!(f.line_col(0), (1, 1));
        assert_eq!(f.line_col(4), (2, 1));
        assert_eq!(f.line_col(9), (3, 2));
    }

    #[test]
    fn after_imports_skips_past_import_block() {
        let f = ParsedFile::parse_bytes(
            "a.go".into(),
            b"package p\n\nimport (\n\t\"fmt\"\n)\n\nfunc f() {}\n".to_vec(),
        )
        .unwrap();
        let pos = f.after_imports();
        assert!(f.text(0, pos).contains("import"));
        assert!(!f.text(pos, f.original_bytes().len()).contains("import"));
    }
}
