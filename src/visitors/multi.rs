//! Multi-Visitor composition (spec.md §4.4.5): runs several [`Visitor`]s
//! over one traversal.
//!
//! spec.md's original describes a copy-on-write vector of children, each
//! dispatch producing a new vector slot so children can evolve without
//! aliasing one another — a device for an immutable-return visitor style.
//! Since [`Visitor`] here takes `&mut self` (spec.md §9 explicitly allows
//! this simplification), composition only needs a `Vec<Box<dyn Visitor>>`
//! dispatched in order; each child mutates its own state and nothing else's.

use crate::patch::ParsedFile;
use crate::scope::{Flow, ScopeArena, ScopeId, Visitor};
use tree_sitter::Node;

pub struct MultiVisitor {
    children: Vec<Box<dyn Visitor>>,
}

impl MultiVisitor {
    pub fn new(children: Vec<Box<dyn Visitor>>) -> Self {
        Self { children }
    }

    pub fn into_children(self) -> Vec<Box<dyn Visitor>> {
        self.children
    }
}

/// `Descend` if any child still wants to; `Stop` only once every child has
/// asked to stop (spec.md: "if all children have stopped the multi-visitor
/// also stops").
fn combine(flows: impl Iterator<Item = Flow>) -> Flow {
    if flows.into_iter().any(|f| f == Flow::Descend) {
        Flow::Descend
    } else {
        Flow::Stop
    }
}

impl Visitor for MultiVisitor {
    fn visit_expr(&mut self, scopes: &ScopeArena, scope: ScopeId, node: Node<'_>, file: &ParsedFile) -> Flow {
        let flows: Vec<Flow> =
            self.children.iter_mut().map(|c| c.visit_expr(scopes, scope, node, file)).collect();
        combine(flows.into_iter())
    }

    fn visit_stmt(&mut self, scopes: &ScopeArena, scope: ScopeId, node: Node<'_>, file: &ParsedFile) -> Flow {
        let flows: Vec<Flow> =
            self.children.iter_mut().map(|c| c.visit_stmt(scopes, scope, node, file)).collect();
        combine(flows.into_iter())
    }

    fn visit_decl(&mut self, scopes: &ScopeArena, scope: ScopeId, node: Node<'_>, file: &ParsedFile) -> Flow {
        let flows: Vec<Flow> =
            self.children.iter_mut().map(|c| c.visit_decl(scopes, scope, node, file)).collect();
        combine(flows.into_iter())
    }

    fn exit_scope(
        &mut self,
        scopes: &ScopeArena,
        scope: ScopeId,
        parent_node: Node<'_>,
        is_innermost_at_this_level: bool,
        file: &ParsedFile,
    ) {
        for child in &mut self.children {
            child.exit_scope(scopes, scope, parent_node, is_innermost_at_this_level, file);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::walk;
    use crate::visitors::unused::UnusedFinder;

    #[test]
    fn composes_without_panicking() {
        let file = ParsedFile::parse_bytes(
            "a.go".into(),
            b"package p\n\nfunc f() {\n\tx := 1\n}\n".to_vec(),
        )
        .unwrap();
        let mut multi = MultiVisitor::new(vec![Box::new(UnusedFinder::new()), Box::new(UnusedFinder::new())]);
        walk(&file, &mut multi);
    }
}
