//! Target-package resolution (spec.md §4.5 item 1).

use crate::error::{Error, Result};
use crate::patch::ParsedFile;
use path_slash::PathExt as _;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Package {
    pub import_path: String,
    pub dir: PathBuf,
    pub name: String,
    pub files: Vec<PathBuf>,
    pub test_files: Vec<PathBuf>,
    pub xtest_files: Vec<PathBuf>,
    pub is_stdlib: bool,
    pub is_local: bool,
}

impl Package {
    pub fn is_main(&self) -> bool {
        self.name == "main"
    }
}

/// Resolves the root package for a `build`/`test`/`run` invocation.
/// `positional` is the already-flag-stripped list of non-flag arguments
/// (individual source files for `run`; at most one import path otherwise).
pub fn discover(
    cwd: &Path,
    goroot: &Path,
    gopath: &[PathBuf],
    subcommand: &str,
    positional: &[String],
) -> Result<Package> {
    if subcommand == "run" {
        return discover_run_files(cwd, positional);
    }
    match positional.len() {
        0 => discover_from_cwd(cwd, goroot, gopath),
        1 => discover_by_import_path(&positional[0], cwd, goroot, gopath),
        n => Err(Error::TooManyPositionalArgs(n)),
    }
}

fn discover_run_files(cwd: &Path, files: &[String]) -> Result<Package> {
    if files.is_empty() {
        return Err(Error::msg("`run` requires at least one source file argument"));
    }
    let paths: Vec<PathBuf> = files.iter().map(|f| cwd.join(f)).collect();
    let dir = paths[0].parent().map(Path::to_path_buf).unwrap_or_else(|| cwd.to_path_buf());
    let parsed = ParsedFile::parse(&paths[0])?;
    let name = parsed.package_name().to_string();
    Ok(Package {
        // mirrors `go run`'s own synthetic import path for ad-hoc file sets.
        import_path: "command-line-arguments".to_string(),
        dir,
        name,
        files: paths,
        test_files: Vec::new(),
        xtest_files: Vec::new(),
        is_stdlib: false,
        is_local: true,
    })
}

fn discover_from_cwd(cwd: &Path, goroot: &Path, gopath: &[PathBuf]) -> Result<Package> {
    let import_path = import_path_for_dir(cwd, goroot, gopath).unwrap_or_else(|| {
        cwd.file_name().and_then(|s| s.to_str()).unwrap_or(".").to_string()
    });
    let is_stdlib = cwd.starts_with(goroot.join("src"));
    load_package_dir(cwd, import_path, false, is_stdlib)
}

fn discover_by_import_path(path: &str, cwd: &Path, goroot: &Path, gopath: &[PathBuf]) -> Result<Package> {
    resolve_import(path, cwd, goroot, gopath)
}

/// Resolves one import path to its package, relative to `from_dir` for
/// local (`./`, `../`) imports. Used both for the initial target and for
/// [`super::graph::compute_closure`] following each package's own imports.
pub fn resolve_import(path: &str, from_dir: &Path, goroot: &Path, gopath: &[PathBuf]) -> Result<Package> {
    if path.starts_with("./") || path.starts_with("../") {
        let dir = from_dir.join(path);
        return load_package_dir(&dir, path.to_string(), true, false);
    }
    for root in gopath {
        let dir = root.join("src").join(path);
        if dir.is_dir() {
            return load_package_dir(&dir, path.to_string(), false, false);
        }
    }
    let goroot_dir = goroot.join("src").join(path);
    if goroot_dir.is_dir() {
        return load_package_dir(&goroot_dir, path.to_string(), false, true);
    }
    Err(Error::PackageNotFound(PathBuf::from(path)))
}

/// Walks `dir` upward to find which GOPATH root (or GOROOT) it is nested
/// under, and returns the import path that prefix implies. Returns `None`
/// when `dir` isn't under any known root — the caller falls back to the
/// directory's own basename.
fn import_path_for_dir(dir: &Path, goroot: &Path, gopath: &[PathBuf]) -> Option<String> {
    for root in gopath {
        let src = root.join("src");
        if let Ok(rel) = dir.strip_prefix(&src) {
            return Some(rel.to_slash_lossy().to_string());
        }
    }
    let goroot_src = goroot.join("src");
    if let Ok(rel) = dir.strip_prefix(&goroot_src) {
        return Some(rel.to_slash_lossy().to_string());
    }
    None
}

fn load_package_dir(dir: &Path, import_path: String, is_local: bool, is_stdlib: bool) -> Result<Package> {
    let mut files = Vec::new();
    let mut test_files = Vec::new();
    let mut xtest_files = Vec::new();
    let mut name = String::new();

    let mut go_files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.path().to_path_buf())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("go"))
        .collect();
    go_files.sort();

    // First pass: the non-test files decide the package's declared name.
    for path in &go_files {
        let is_test =
            path.file_stem().and_then(|s| s.to_str()).map(|s| s.ends_with("_test")).unwrap_or(false);
        if is_test {
            continue;
        }
        let parsed = ParsedFile::parse(path)?;
        if name.is_empty() {
            name = parsed.package_name().to_string();
        }
        files.push(path.clone());
    }

    if name.is_empty() {
        return Err(Error::PackageNotFound(dir.to_path_buf()));
    }

    for path in &go_files {
        let is_test =
            path.file_stem().and_then(|s| s.to_str()).map(|s| s.ends_with("_test")).unwrap_or(false);
        if !is_test {
            continue;
        }
        let parsed = ParsedFile::parse(path)?;
        if parsed.package_name() == name {
            test_files.push(path.clone());
        } else {
            xtest_files.push(path.clone());
        }
    }

    Ok(Package { import_path, dir: dir.to_path_buf(), name, files, test_files, xtest_files, is_stdlib, is_local })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_path_strips_gopath_src_prefix() {
        let gopath = vec![PathBuf::from("/home/me/go")];
        let dir = PathBuf::from("/home/me/go/src/example.com/foo");
        assert_eq!(
            import_path_for_dir(&dir, Path::new("/usr/lib/go"), &gopath),
            Some("example.com/foo".to_string())
        );
    }

    #[test]
    fn dir_outside_any_root_returns_none() {
        let gopath = vec![PathBuf::from("/home/me/go")];
        let dir = PathBuf::from("/tmp/scratch/foo");
        assert_eq!(import_path_for_dir(&dir, Path::new("/usr/lib/go"), &gopath), None);
    }
}
