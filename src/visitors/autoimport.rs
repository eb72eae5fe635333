//! Auto-Importer (spec.md §4.4.3): inserts an import for any identifier that
//! reads like a package reference to a standard-library package not already
//! imported, as long as the package name is unambiguous.

use crate::goast::{self, kind};
use crate::patch::{Patch, PatchBatch, ParsedFile, Pos};
use crate::resolver::{stdlib, ImportResolver};
use crate::scope::{Flow, ScopeArena, ScopeId, Visitor};
use std::collections::HashSet;
use tree_sitter::Node;

pub struct AutoImporter {
    available: HashSet<String>,
    irrelevant: HashSet<(usize, usize)>,
    insert_pos: Pos,
    patches: PatchBatch,
}

impl AutoImporter {
    /// `insert_pos` is the byte offset just after the `package NAME` clause
    /// (spec.md's "insertion position immediately after the package clause").
    pub fn new(file: &ParsedFile, resolver: &ImportResolver) -> Self {
        let root = file.tree().root_node();
        let mut available = HashSet::new();
        for (spec, _) in goast::import_specs(file, root) {
            if spec.is_blank() || spec.is_dot() {
                continue;
            }
            available.insert(resolver.get_name_or_guess(&spec));
        }
        Self {
            available,
            irrelevant: HashSet::new(),
            insert_pos: file.after_package_clause(),
            patches: PatchBatch::new(),
        }
    }

    pub fn into_patch_batch(self) -> PatchBatch {
        self.patches
    }
}

impl Visitor for AutoImporter {
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
                if scopes.lookup(scope, name).is_some() || self.available.contains(name) {
                    return Flow::Descend;
                }
                if let Some(path) = stdlib::unambiguous_import_for_name(name) {
                    self.patches.push(Patch::Insert {
                        pos: self.insert_pos,
                        text: format!("; import \"{path}\""),
                    });
                    self.available.insert(name.to_string());
                }
            }
            _ => {}
        }
        Flow::Descend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::walk;

    #[test]
    fn unresolved_unambiguous_identifier_gets_imported() {
        let file = ParsedFile::parse_bytes(
            "a.go".into(),
            b"package p\n\nfunc f() {\n\tfmt.Println(\"hi\")\n}\n".to_vec(),
        )
        .unwrap();
        let resolver = ImportResolver::new(vec![]);
        let mut visitor = AutoImporter::new(&file, &resolver);
        walk(&file, &mut visitor);
        let batch = visitor.into_patch_batch();
        let found = batch
            .iter()
            .any(|p| matches!(p, Patch::Insert { text, .. } if text.contains("\"fmt\"")));
        assert!(found);
    }

    #[test]
    fn already_imported_package_is_not_reimported() {
        let file = ParsedFile::parse_bytes(
            "a.go".into(),
            b"package p\n\nimport \"fmt\"\n\nfunc f() {\n\tfmt.Println(\"hi\")\n}\n".to_vec(),
        )
        .unwrap();
        let resolver = ImportResolver::new(vec![]);
        let mut visitor = AutoImporter::new(&file, &resolver);
        walk(&file, &mut visitor);
        assert!(visitor.into_patch_batch().is_empty());
    }

    #[test]
    fn ambiguous_name_is_never_auto_imported() {
        let file = ParsedFile::parse_bytes(
            "a.go".into(),
            b"package p\n\nfunc f() {\n\trand.Intn(1)\n}\n".to_vec(),
        )
        .unwrap();
        let resolver = ImportResolver::new(vec![]);
        let mut visitor = AutoImporter::new(&file, &resolver);
        walk(&file, &mut visitor);
        assert!(visitor.into_patch_batch().is_empty());
    }
}
