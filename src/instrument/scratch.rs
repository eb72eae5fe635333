//! Scratch-tree writing (spec.md §4.5 item 3): runs the Visitor pipeline
//! over every file in the closure and lays out the instrumented copies in a
//! relocated directory tree, with import paths rewritten to match.

use super::package::Package;
use super::InstrumentConfig;
use crate::error::{Error, Result};
use crate::goast;
use crate::patch::{render_file, Patch, PatchBatch, ParsedFile};
use crate::scope::walk;
use crate::visitors::autoimport::AutoImporter;
use crate::visitors::must_transform::MustTransform;
use crate::visitors::unused::{patch_unused_imports, UnusedFinder};
use path_slash::PathExt as _;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Where each package in the closure landed inside the scratch tree, so the
/// command driver can rewrite positional file arguments and compute
/// `GOROOT`.
pub struct Layout {
    pub root: PathBuf,
    /// import path -> relocated directory.
    pub package_dirs: HashMap<String, PathBuf>,
    pub main_dir: PathBuf,
    pub goroot_dir: Option<PathBuf>,
}

impl Layout {
    pub fn dir_for(&self, import_path: &str) -> Option<&Path> {
        self.package_dirs.get(import_path).map(PathBuf::as_path)
    }
}

/// Sanitizes a local import path into a directory-safe name (spec.md §4.5
/// item 3: "dots replaced by `_`, `..` replaced by `__`").
fn sanitize_local(path: &str) -> String {
    path.replace("..", "__").replace('.', "_")
}

fn relocated_dir(root: &Path, target: &Package, pkg: &Package, cfg: &InstrumentConfig) -> PathBuf {
    if pkg.import_path == target.import_path {
        return root.to_path_buf();
    }
    if pkg.is_local {
        return root.join("locals").join(sanitize_local(&pkg.import_path));
    }
    if pkg.is_stdlib && cfg.include_stdlib {
        return root.join("goroot").join("src").join("pkg").join(&pkg.import_path);
    }
    root.join("gopath").join(&pkg.import_path)
}

pub fn write_tree(
    root: &Path,
    target: &Package,
    closure: &super::graph::Closure,
    cfg: &InstrumentConfig,
) -> Result<Layout> {
    let mut package_dirs = HashMap::new();
    for pkg in &closure.packages {
        let dir = relocated_dir(root, target, pkg, cfg);
        package_dirs.insert(pkg.import_path.clone(), dir);
    }

    for pkg in &closure.packages {
        let dir = package_dirs.get(&pkg.import_path).expect("just inserted");
        std::fs::create_dir_all(dir).map_err(|e| Error::io(e, dir.clone()))?;
        write_package(dir, pkg, &package_dirs, cfg)?;
        copy_resource_files(dir, pkg)?;
    }

    let goroot_dir = if cfg.include_stdlib {
        let link_root = root.join("goroot");
        mirror_goroot(&cfg.goroot, &link_root)?;
        Some(link_root)
    } else {
        None
    };

    let main_dir = package_dirs.get(&target.import_path).cloned().unwrap_or_else(|| root.to_path_buf());
    Ok(Layout { root: root.to_path_buf(), package_dirs, main_dir, goroot_dir })
}

fn write_package(
    dir: &Path,
    pkg: &Package,
    package_dirs: &HashMap<String, PathBuf>,
    cfg: &InstrumentConfig,
) -> Result<()> {
    let resolver = cfg.resolver();
    for file in pkg.files.iter().chain(pkg.test_files.iter()).chain(pkg.xtest_files.iter()) {
        let parsed = ParsedFile::parse(file)?;
        let mut batch = instrument_file(&parsed, &resolver, cfg);
        rewrite_import_paths(&mut batch, &parsed, pkg, package_dirs, dir, cfg);

        let rendered = render_file(&parsed, &batch).map_err(|e| Error::io(e, file.clone()))?;
        let dest = dir.join(file.file_name().expect("go source file has a name"));
        std::fs::write(&dest, rendered).map_err(|e| Error::io(e, dest))?;
    }
    Ok(())
}

/// Runs the Unused-Finder, Auto-Importer, and Short-Error-Transform over one
/// file, collecting every patch into one batch.
///
/// Each runs its own walk rather than being composed via [`MultiVisitor`]:
/// all three need typed access to their own results afterward (a patch
/// batch, and for the Short-Error-Transform, diagnostics too), which a
/// `Vec<Box<dyn Visitor>>` can't hand back without a downcast.
/// [`MultiVisitor`] stays the right tool when every child's output is
/// observable purely through the shared walk (two unused-ness passes
/// cross-checking each other, say); it isn't needed here.
pub(crate) fn instrument_file(parsed: &ParsedFile, resolver: &crate::resolver::ImportResolver, cfg: &InstrumentConfig) -> PatchBatch {
    let mut unused = UnusedFinder::new();
    walk(parsed, &mut unused);
    let used_imports = unused.used_imports().clone();
    let mut batch = unused.into_patch_batch();
    patch_unused_imports(&mut batch, parsed, resolver, &used_imports);

    let mut auto_importer = AutoImporter::new(parsed, resolver);
    walk(parsed, &mut auto_importer);
    for patch in auto_importer.into_patch_batch().iter() {
        batch.append_no_contradict(patch.clone());
    }

    let mut must_transform = MustTransform::new(parsed, cfg.must_builtin.clone());
    walk(parsed, &mut must_transform);
    let (must_patches, diagnostics) = must_transform.into_parts();
    for diag in &diagnostics {
        warn!(%diag, "must-transform diagnostic");
    }
    for patch in must_patches.iter() {
        batch.append_no_contradict(patch.clone());
    }

    batch
}

fn rewrite_import_paths(
    batch: &mut PatchBatch,
    parsed: &ParsedFile,
    pkg: &Package,
    package_dirs: &HashMap<String, PathBuf>,
    file_dest_dir: &Path,
    cfg: &InstrumentConfig,
) {
    for (spec, node) in goast::import_specs(parsed, parsed.tree().root_node()) {
        if spec.path.is_empty() || spec.path.starts_with("./") || spec.path.starts_with("../") {
            if let Some(rewritten) = rewrite_local(&spec.path, pkg, package_dirs, file_dest_dir) {
                replace_path_literal(batch, node, &rewritten);
            }
            continue;
        }
        if spec.path == pkg.import_path {
            replace_path_literal(batch, node, ".");
            continue;
        }
        if !is_instrumented(&spec.path, package_dirs) {
            continue; // irrelevant import: left unchanged.
        }
        if spec.path.is_empty() && !cfg.include_stdlib {
            continue;
        }
        if let Some(target_dir) = package_dirs.get(&spec.path) {
            if let Some(rel) = relative_path(file_dest_dir, target_dir) {
                replace_path_literal(batch, node, &rel);
            }
        }
    }
}

fn is_instrumented(path: &str, package_dirs: &HashMap<String, PathBuf>) -> bool {
    package_dirs.contains_key(path)
}

fn rewrite_local(
    path: &str,
    pkg: &Package,
    package_dirs: &HashMap<String, PathBuf>,
    file_dest_dir: &Path,
) -> Option<String> {
    let target_dir = package_dirs.get(path).or_else(|| package_dirs.get(&pkg.import_path))?;
    relative_path(file_dest_dir, target_dir)
}

/// Relative import-path literal from `from` to `to`, forward-slashed for Go
/// regardless of host path separator (spec.md §4.5 item 3).
fn relative_path(from: &Path, to: &Path) -> Option<String> {
    let from = dunce::canonicalize(from).unwrap_or_else(|_| from.to_path_buf());
    let to = dunce::canonicalize(to).unwrap_or_else(|_| to.to_path_buf());
    let rel = pathdiff::diff_paths(&to, &from)?;
    let mut rel = rel.to_slash_lossy().to_string();
    if rel.is_empty() {
        rel = ".".to_string();
    } else if !rel.starts_with('.') {
        rel = format!("./{rel}");
    }
    Some(rel)
}

fn replace_path_literal(batch: &mut PatchBatch, import_spec_node: tree_sitter::Node<'_>, new_path: &str) {
    if let Some(path_node) = import_spec_node.child_by_field_name("path") {
        batch.append_no_contradict(Patch::Replace {
            start: path_node.start_byte(),
            end: path_node.end_byte(),
            text: format!("\"{new_path}\""),
        });
    }
}

fn copy_resource_files(dest_dir: &Path, pkg: &Package) -> Result<()> {
    const RESOURCE_EXTENSIONS: &[&str] = &["c", "h", "s", "o", "a", "syso"];
    for entry in walkdir::WalkDir::new(&pkg.dir).max_depth(1).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        let is_resource = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| RESOURCE_EXTENSIONS.contains(&e))
            .unwrap_or(false);
        if is_resource {
            let dest = dest_dir.join(path.file_name().expect("resource file has a name"));
            std::fs::copy(path, &dest).map_err(|e| Error::io(e, dest))?;
        }
    }
    Ok(())
}

/// Mirrors `goroot`'s `src` and `pkg` hierarchies under `link_root` by
/// symlink, falling back to a copy where symlinks can't be created (spec.md
/// §4.5 item 4). Guards against symlink cycles by refusing to revisit a
/// target path already mirrored.
fn mirror_goroot(goroot: &Path, link_root: &Path) -> Result<()> {
    let mut visited_targets = std::collections::HashSet::new();
    for subdir in ["src", "pkg"] {
        let source = goroot.join(subdir);
        if !source.is_dir() {
            continue;
        }
        mirror_dir(&source, &link_root.join(subdir), &mut visited_targets)?;
    }
    Ok(())
}

fn mirror_dir(
    source: &Path,
    dest: &Path,
    visited_targets: &mut std::collections::HashSet<PathBuf>,
) -> Result<()> {
    let canonical = dunce::canonicalize(source).unwrap_or_else(|_| source.to_path_buf());
    if !visited_targets.insert(canonical) {
        return Ok(());
    }
    std::fs::create_dir_all(dest).map_err(|e| Error::io(e, dest.to_path_buf()))?;
    for entry in std::fs::read_dir(source).map_err(|e| Error::io(e, source.to_path_buf()))? {
        let entry = entry.map_err(|e| Error::io(e, source.to_path_buf()))?;
        let path = entry.path();
        let dest_path = dest.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| Error::io(e, path.clone()))?;
        if file_type.is_dir() {
            mirror_dir(&path, &dest_path, visited_targets)?;
        } else {
            symlink_or_copy(&path, &dest_path)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn symlink_or_copy(source: &Path, dest: &Path) -> Result<()> {
    if std::os::unix::fs::symlink(source, dest).is_err() {
        std::fs::copy(source, dest).map_err(|e| Error::io(e, dest.to_path_buf()))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn symlink_or_copy(source: &Path, dest: &Path) -> Result<()> {
    std::fs::copy(source, dest).map_err(|e| Error::io(e, dest.to_path_buf()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_relative_dots() {
        assert_eq!(sanitize_local("../sibling/pkg"), "__/sibling/pkg");
        assert_eq!(sanitize_local("./sub/pkg"), "_/sub/pkg");
    }
}
