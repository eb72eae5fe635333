//! Transitive import-closure computation (spec.md §4.5 item 2).

use super::package::{self, Package};
use super::vcs;
use super::InstrumentConfig;
use crate::error::Result;
use crate::goast;
use crate::patch::ParsedFile;
use std::collections::HashSet;

pub struct Closure {
    pub packages: Vec<Package>,
}

/// Whether an import path is "relevant" and should be followed into the
/// closure (spec.md §4.5 item 2). `is_stdlib` must be resolved by the
/// caller (a GOROOT-prefix filesystem check) since nothing about an import
/// path's own text says whether it's stdlib.
fn is_relevant(path: &str, base_import_path: &str, include_stdlib: bool, is_stdlib: bool) -> bool {
    if path.starts_with("./") || path.starts_with("../") {
        return true;
    }
    if is_stdlib {
        return include_stdlib;
    }
    base_import_path == "*" || path.starts_with(base_import_path) || base_import_path.starts_with(path)
}

fn is_stdlib_path(path: &str, goroot: &std::path::Path) -> bool {
    if path.starts_with("./") || path.starts_with("../") {
        return false;
    }
    goroot.join("src").join(path).is_dir()
}

fn effective_base_import_path(target: &Package, cfg: &InstrumentConfig) -> String {
    if !cfg.base_import_path.is_empty() {
        return cfg.base_import_path.clone();
    }
    if target.is_local || target.import_path == "command-line-arguments" {
        return "*".to_string();
    }
    vcs::project_root_prefix(&target.import_path).to_string()
}

fn file_import_paths(path: &std::path::Path) -> Result<Vec<String>> {
    let parsed = ParsedFile::parse(path)?;
    Ok(goast::import_specs(&parsed, parsed.tree().root_node())
        .into_iter()
        .map(|(spec, _)| spec.path)
        .collect())
}

/// BFS over the target package's imports (and, for `test`, its test and
/// external-test imports too), following only relevant edges.
pub fn compute_closure(target: &Package, cfg: &InstrumentConfig, is_test: bool) -> Result<Closure> {
    let base = effective_base_import_path(target, cfg);
    let mut seen = HashSet::new();
    seen.insert(target.import_path.clone());
    let mut packages = vec![target.clone()];
    let mut frontier = vec![target.clone()];

    while let Some(pkg) = frontier.pop() {
        let mut files: Vec<&std::path::PathBuf> = pkg.files.iter().collect();
        if is_test {
            files.extend(pkg.test_files.iter());
            files.extend(pkg.xtest_files.iter());
        }
        let mut imports = Vec::new();
        for file in files {
            imports.extend(file_import_paths(file)?);
        }

        for import_path in imports {
            let stdlib = is_stdlib_path(&import_path, &cfg.goroot);
            if !is_relevant(&import_path, &base, cfg.include_stdlib, stdlib) {
                continue;
            }
            if seen.contains(&import_path) {
                continue;
            }
            seen.insert(import_path.clone());
            match package::resolve_import(&import_path, &pkg.dir, &cfg.goroot, &cfg.gopath) {
                Ok(resolved) => {
                    frontier.push(resolved.clone());
                    packages.push(resolved);
                }
                Err(e) => {
                    warn!(import = %import_path, error = %e, "could not resolve import for instrumentation closure");
                }
            }
        }
    }

    Ok(Closure { packages })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_imports_are_always_relevant() {
        assert!(is_relevant("./sub", "example.com/foo", false, false));
        assert!(is_relevant("../sub", "", true, false));
    }

    #[test]
    fn stdlib_import_relevant_only_when_included() {
        assert!(!is_relevant("fmt", "example.com/foo", false, true));
        assert!(is_relevant("fmt", "example.com/foo", true, true));
    }

    #[test]
    fn stdlib_import_excluded_even_with_star_base() {
        // The default base for `run`/local targets is "*"; a stdlib import
        // must still be excluded unless include_stdlib is set.
        assert!(!is_relevant("fmt", "*", false, true));
        assert!(is_relevant("fmt", "*", true, true));
    }

    #[test]
    fn star_base_includes_everything_non_stdlib() {
        assert!(is_relevant("other.com/bar", "*", false, false));
    }

    #[test]
    fn unrelated_prefix_is_not_relevant() {
        assert!(!is_relevant("other.com/bar", "example.com/foo", false, false));
    }
}
