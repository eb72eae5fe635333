//! The patch engine (spec.md §4.1): byte-exact, order-preserving textual edits
//! over a [`ParsedFile`](file::ParsedFile).
//!
//! Every visitor in [`crate::visitors`] only ever produces [`Patch`] values; it
//! never mutates source bytes directly. This is what lets
//! [`crate::visitors::multi::MultiVisitor`] compose multiple independent
//! passes over one traversal without one visitor's edits corrupting another's
//! byte offsets — patches are applied in a single pass at the very end.

mod file;

pub use file::ParsedFile;

use std::io::{self, Write};

/// A byte offset into a single [`ParsedFile`]'s original bytes.
///
/// spec.md's Source Position is file-set-wide and convertible to
/// `(filename, offset, line, column)`; since every patch batch in this crate
/// is scoped to one file at a time, we keep the file-set indirection implicit
/// and let [`ParsedFile`] do the offset -> (line, column) conversion on
/// demand (see [`ParsedFile::line_col`]).
pub type Pos = usize;

/// A single declarative edit, per spec.md §3.
#[derive(Debug, Clone)]
pub enum Patch {
    /// Insert `text` immediately before `pos`. Zero-width.
    Insert { pos: Pos, text: String },
    /// Replace bytes `[start, end)` with `text`. `Insert` is the degenerate
    /// case `start == end`.
    Replace { start: Pos, end: Pos, text: String },
    /// At `pos`, emit the re-patched textual form of the original bytes
    /// spanning `[node_start, node_end)` of the *same* file, recursively
    /// applying any outer-batch patches that fall strictly inside that range.
    InsertNode { pos: Pos, node_start: Pos, node_end: Pos },
}

impl Patch {
    pub fn start(&self) -> Pos {
        match *self {
            Patch::Insert { pos, .. } => pos,
            Patch::Replace { start, .. } => start,
            Patch::InsertNode { pos, .. } => pos,
        }
    }

    /// The end of the range this patch *consumes* from the original stream.
    /// `Insert` and `InsertNode` are zero-width: they don't skip any original
    /// bytes, they just splice text in before `pos`.
    pub fn consumed_end(&self) -> Pos {
        match *self {
            Patch::Insert { pos, .. } => pos,
            Patch::Replace { end, .. } => end,
            Patch::InsertNode { pos, .. } => pos,
        }
    }

    fn is_exact_delete_of(&self, start: Pos, end: Pos) -> bool {
        matches!(self, Patch::Replace { start: s, end: e, text } if *s == start && *e == end && text.is_empty())
    }
}

/// An insertion-ordered batch of patches for one [`ParsedFile`].
///
/// Applying a batch stable-sorts by `(start, insertion_index)`: multiple
/// zero-width inserts at the same position come out in the order the visitor
/// produced them (spec.md §3, Testable Property 2 and 9).
#[derive(Debug, Clone, Default)]
pub struct PatchBatch {
    patches: Vec<Patch>,
}

impl PatchBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, patch: Patch) {
        self.patches.push(patch);
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Patch> {
        self.patches.iter()
    }

    /// Adds `patch` unless it overlaps an existing patch in the batch
    /// (spec.md §4.1, `append_no_contradict`). Used when the import-path
    /// rewriter must not fight a visitor that already rewrote the same
    /// import literal.
    ///
    /// Idempotent: adding the exact same patch twice is a no-op the second
    /// time, since the first occurrence already overlaps it.
    pub fn append_no_contradict(&mut self, patch: Patch) {
        let (new_start, new_end) = (patch.start(), patch.consumed_end());
        let overlaps = self.patches.iter().any(|existing| {
            let (s, e) = (existing.start(), existing.consumed_end());
            ranges_overlap(s, e, new_start, new_end)
        });
        if !overlaps {
            self.patches.push(patch);
        }
    }

    /// Stable sort by `(start, original_insertion_index)`.
    fn sorted(&self) -> Vec<(usize, &Patch)> {
        let mut indexed: Vec<(usize, &Patch)> = self.patches.iter().enumerate().collect();
        indexed.sort_by_key(|(idx, patch)| (patch.start(), *idx));
        indexed
    }

    fn patches_in_range<'a>(&'a self, start: Pos, end: Pos) -> PatchBatch {
        let mut out = PatchBatch::new();
        for patch in &self.patches {
            if patch.start() >= start && patch.start() <= end {
                out.push(patch.clone());
            }
        }
        out
    }
}

fn ranges_overlap(a_start: Pos, a_end: Pos, b_start: Pos, b_end: Pos) -> bool {
    // zero-width ranges (inserts) only "overlap" an existing patch if they
    // land exactly at a point that patch also touches; two inserts at the
    // same point are allowed to coexist (that's how multiple `; import "x"`
    // lines stack up), so overlap requires a genuine non-empty intersection
    // or an identical zero-width point.
    if a_start == a_end && b_start == b_end {
        return false; // zero-width inserts never contradict each other
    }
    a_start < b_end && b_start < a_end
}

/// Writes the original bytes spanning `[start, end)`. No transformation.
pub fn fprint<W: Write>(writer: &mut W, original_bytes: &[u8], start: Pos, end: Pos) -> io::Result<()> {
    writer.write_all(&original_bytes[start..end])
}

/// Writes `[start, end)` with `batch` applied; patches whose `start` lies
/// outside `[start, end]` are silently skipped, so a sub-tree can be
/// rendered independently (spec.md §4.1).
pub fn fprint_patched<W: Write>(
    writer: &mut W,
    original_bytes: &[u8],
    start: Pos,
    end: Pos,
    batch: &PatchBatch,
) -> io::Result<()> {
    let relevant = batch.patches_in_range(start, end);
    let mut prev = start;
    for (_, patch) in relevant.sorted() {
        if patch.start() < prev {
            // An earlier patch already consumed past this one's start; skip
            // to honor "avoiding overlaps is the visitor's responsibility".
            continue;
        }
        fprint(writer, original_bytes, prev, patch.start())?;
        match patch {
            Patch::Insert { text, .. } => {
                writer.write_all(text.as_bytes())?;
            }
            Patch::Replace { text, .. } => {
                writer.write_all(text.as_bytes())?;
            }
            Patch::InsertNode { node_start, node_end, .. } => {
                let inner = PatchBatch {
                    patches: batch
                        .patches
                        .iter()
                        .filter(|p| {
                            p.start() >= *node_start
                                && p.consumed_end() <= *node_end
                                && !p.is_exact_delete_of(*node_start, *node_end)
                        })
                        .cloned()
                        .collect(),
                };
                fprint_patched(writer, original_bytes, *node_start, *node_end, &inner)?;
            }
        }
        prev = patch.consumed_end().max(prev);
    }
    if prev < end {
        fprint(writer, original_bytes, prev, end)?;
    }
    Ok(())
}

/// Renders the whole file: original bytes outside patched ranges, patch text
/// inside them, with leading comments above `package` preserved (handled by
/// [`ParsedFile::all_span`] including the comment-bearing prefix).
pub fn render_file(parsed: &file::ParsedFile, batch: &PatchBatch) -> io::Result<Vec<u8>> {
    let (start, end) = parsed.all_span();
    let mut out = Vec::with_capacity(parsed.original_bytes().len() + 64);
    fprint_patched(&mut out, parsed.original_bytes(), start, end, batch)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(src: &[u8], patches: Vec<Patch>) -> String {
        let mut batch = PatchBatch::new();
        for p in patches {
            batch.push(p);
        }
        let mut out = Vec::new();
        fprint_patched(&mut out, src, 0, src.len(), &batch).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn empty_batch_is_identity() {
        let src = b"package p\n\nfunc f() {}\n";
        assert_eq!(render(src, vec![]), String::from_utf8(src.to_vec()).unwrap());
    }

    #[test]
    fn single_insert() {
        let src = b"abcdef";
        let out = render(src, vec![Patch::Insert { pos: 3, text: "XYZ".into() }]);
        assert_eq!(out, "abcXYZdef");
    }

    #[test]
    fn multiple_zero_width_inserts_preserve_insertion_order() {
        let src = b"abc";
        let out = render(
            src,
            vec![
                Patch::Insert { pos: 1, text: "1".into() },
                Patch::Insert { pos: 1, text: "2".into() },
                Patch::Insert { pos: 1, text: "3".into() },
            ],
        );
        assert_eq!(out, "a123bc");
    }

    #[test]
    fn replace_range() {
        let src = b"hello world";
        let out = render(src, vec![Patch::Replace { start: 6, end: 11, text: "rust".into() }]);
        assert_eq!(out, "hello rust");
    }

    #[test]
    fn insert_node_recurses_and_suppresses_exact_delete_of_itself() {
        // Render "func(){}" inserted at pos 0 of "X", with an outer patch
        // that would have deleted the whole inserted node; it should be
        // suppressed so the node survives intact.
        let src = b"func(){} rest";
        let mut batch = PatchBatch::new();
        batch.push(Patch::InsertNode { pos: 0, node_start: 0, node_end: 8 });
        // This would, if not suppressed, erase the very thing we just inserted.
        batch.push(Patch::Replace { start: 0, end: 8, text: String::new() });
        let mut out = Vec::new();
        fprint_patched(&mut out, src, 0, 13, &batch).unwrap();
        // both the InsertNode's own rendering and the later literal deletion
        // target the same outer range; the node's recursive render must have
        // kept its own text because the deletion is filtered out *inside*
        // the recursive call, but the deletion still applies at the outer
        // level once (conservative: we only assert the node text survived).
        let s = String::from_utf8(out).unwrap();
        assert!(s.contains("func(){}"));
    }

    #[test]
    fn append_no_contradict_rejects_overlap() {
        let mut batch = PatchBatch::new();
        batch.push(Patch::Replace { start: 5, end: 10, text: "a".into() });
        batch.append_no_contradict(Patch::Replace { start: 7, end: 12, text: "b".into() });
        assert_eq!(batch.patches.len(), 1);
    }

    #[test]
    fn append_no_contradict_is_idempotent() {
        let mut batch = PatchBatch::new();
        let patch = Patch::Replace { start: 5, end: 10, text: "a".into() };
        batch.append_no_contradict(patch.clone());
        batch.append_no_contradict(patch);
        assert_eq!(batch.patches.len(), 1);
    }

    #[test]
    fn stable_sort_preserves_insertion_order_on_equal_start() {
        let batch = {
            let mut b = PatchBatch::new();
            b.push(Patch::Insert { pos: 4, text: "a".into() });
            b.push(Patch::Insert { pos: 2, text: "b".into() });
            b.push(Patch::Insert { pos: 4, text: "c".into() });
            b
        };
        let sorted = batch.sorted();
        let order: Vec<_> = sorted.iter().map(|(_, p)| p.start()).collect();
        assert_eq!(order, vec![2, 4, 4]);
    }
}
