//! Command Driver (spec.md §4.5 items 1, 5-8): splits the user's flags from
//! positional arguments, retargets them at the scratch tree, runs the
//! toolchain, and stages test binaries afterward.

use super::package::Package;
use super::scratch::Layout;
use super::InstrumentConfig;
use crate::error::{Error, Result};
use std::path::Path;
use std::process::{Command, Stdio};

/// Flags that take a separate value argument in the toolchain's own flag
/// grammar, so a bare `-o` (say) doesn't get mistaken for a positional
/// argument boundary. Not exhaustive of `go build`/`go test`'s full flag
/// surface, but covers the ones likely to appear ahead of a package argument.
const VALUE_FLAGS: &[&str] = &["-o", "-p", "-tags", "-ldflags", "-gcflags", "-run", "-bench", "-timeout"];

/// The user's invocation, split into flags (left alone or adjusted) and
/// positional arguments (package import path / source files).
pub struct ParsedArgs {
    pub flags: Vec<String>,
    pub positional: Vec<String>,
}

/// Splits `args` into flags and positional arguments using the toolchain's
/// own grammar for each subcommand (spec.md §6: "the tool recognizes the
/// toolchain's flag grammar... so it can split positional package arguments
/// from trailing test/run flags").
///
/// For `run`, every non-flag argument up to the first recognized flag is a
/// source file; anything after is left in `flags` to pass through to the
/// program being run. For `build`/`test`, at most one positional package
/// argument is expected.
pub fn split_args(subcommand: &str, args: &[String]) -> ParsedArgs {
    let mut flags = Vec::new();
    let mut positional = Vec::new();
    let mut i = 0;
    let mut positional_done = false;
    while i < args.len() {
        let arg = &args[i];
        if positional_done || arg.starts_with('-') {
            flags.push(arg.clone());
            if VALUE_FLAGS.contains(&arg.as_str()) && i + 1 < args.len() {
                i += 1;
                flags.push(args[i].clone());
            }
            if subcommand == "run" && !positional_done {
                positional_done = true;
            }
        } else {
            positional.push(arg.clone());
            if subcommand != "run" {
                positional_done = true;
            }
        }
        i += 1;
    }
    ParsedArgs { flags, positional }
}

fn has_flag(flags: &[String], name: &str) -> bool {
    flags.iter().any(|f| f == name || f.starts_with(&format!("{name}=")))
}

fn flag_value(flags: &[String], name: &str) -> Option<String> {
    flags.iter().enumerate().find_map(|(i, f)| {
        if let Some(v) = f.strip_prefix(&format!("{name}=")) {
            return Some(v.to_string());
        }
        if f == name {
            return flags.get(i + 1).cloned();
        }
        None
    })
}

/// Drops `-basedir` and `-goroot` (the instrumenter's own flags, not the
/// toolchain's) from a flag list, per spec.md §4.5 item 5.
fn drop_tool_flags(flags: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut skip_next = false;
    for flag in flags {
        if skip_next {
            skip_next = false;
            continue;
        }
        if flag == "-basedir" || flag.starts_with("-basedir=") {
            if flag == "-basedir" {
                skip_next = true;
            }
            continue;
        }
        if flag == "-goroot" || flag == "-work" || flag == "-x" {
            continue;
        }
        out.push(flag.clone());
    }
    out
}

/// Translates bare `-run`, `-v`, `-bench`, `-timeout`, `-short` flags (as the
/// user would write them for `go test`) into their `-test.*` forms, the way
/// a staged test binary expects them (spec.md §4.5 item 7, SPEC_FULL.md
/// supplemented feature 4).
pub fn translate_test_flags(flags: &[String]) -> Vec<String> {
    const TRANSLATE: &[&str] = &["run", "v", "bench", "timeout", "short", "cpu", "count"];
    flags
        .iter()
        .map(|f| {
            for name in TRANSLATE {
                let bare = format!("-{name}");
                if f == &bare {
                    return format!("-test.{name}");
                }
                let prefixed = format!("-{name}=");
                if let Some(value) = f.strip_prefix(&prefixed) {
                    return format!("-test.{name}={value}");
                }
            }
            f.clone()
        })
        .collect()
}

/// `inline` mode (spec.md §6: rewrite files in place instead of emitting a
/// scratch tree): runs the Visitor pipeline over the target package's own
/// files in place and does not invoke the toolchain at all.
pub fn run_inline(
    target: &Package,
    cfg: &InstrumentConfig,
    _subcommand: &str,
    _args: &[String],
) -> Result<super::RunOutcome> {
    let resolver = cfg.resolver();
    for file in target.files.iter().chain(target.test_files.iter()).chain(target.xtest_files.iter()) {
        let parsed = crate::patch::ParsedFile::parse(file)?;
        let batch = super::scratch::instrument_file(&parsed, &resolver, cfg);
        let rendered = crate::patch::render_file(&parsed, &batch).map_err(|e| Error::io(e, file.clone()))?;
        std::fs::write(file, rendered).map_err(|e| Error::io(e, file.clone()))?;
    }
    Ok(super::RunOutcome { exit_code: 0 })
}

/// Retargets and runs the adjusted command against the scratch tree (spec.md
/// §4.5 items 5-8).
pub fn adjust_and_run(
    layout: &Layout,
    target: &Package,
    cfg: &InstrumentConfig,
    subcommand: &str,
    args: &[String],
    original_cwd: &Path,
) -> Result<super::RunOutcome> {
    let parsed = split_args(subcommand, args);
    let mut flags = drop_tool_flags(&parsed.flags);

    let mut positional = parsed.positional.clone();
    let mut wanted_c = has_flag(&parsed.flags, "-c");

    match subcommand {
        "build" => {
            if !target.is_main() {
                return Err(Error::NotMainPackage(target.dir.clone()));
            }
            if flag_value(&flags, "-o").is_none() {
                let base = default_output_name(target, original_cwd);
                let abs = dunce::canonicalize(original_cwd).unwrap_or_else(|_| original_cwd.to_path_buf()).join(base);
                flags.push(format!("-o={}", abs.display()));
            }
        }
        "test" => {
            if !wanted_c {
                flags.push("-c".to_string());
            }
            wanted_c = has_flag(&parsed.flags, "-c");
        }
        "run" => {
            positional = positional
                .iter()
                .map(|p| {
                    let relocated = layout.main_dir.join(Path::new(p).file_name().unwrap_or_default());
                    relocated.to_string_lossy().to_string()
                })
                .collect();
        }
        _ => {}
    }

    if cfg.log_command {
        info!(flags = ?flags, positional = ?positional, "-x: adjusted command line");
    }
    if cfg.keep_scratch {
        info!(path = %layout.root.display(), "-work: preserving scratch directory");
    }

    let mut cmd = Command::new("go");
    cmd.arg(subcommand);
    cmd.args(&flags);
    cmd.args(&positional);
    cmd.current_dir(&layout.main_dir);
    if let Some(goroot) = &layout.goroot_dir {
        cmd.env("GOROOT", goroot);
    }
    cmd.stdin(Stdio::inherit()).stdout(Stdio::inherit()).stderr(Stdio::inherit());

    debug!(?cmd, "spawning toolchain subprocess");
    let status = cmd.status().map_err(|e| Error::io(e, "go"))?;

    if subcommand == "test" {
        return stage_test_binary(layout, target, &status, subcommand, &parsed.flags, original_cwd, wanted_c);
    }

    if !status.success() {
        return Err(Error::ToolchainFailed { subcommand: subcommand.to_string(), status });
    }
    Ok(super::RunOutcome { exit_code: status.code().unwrap_or(1) })
}

fn default_output_name(target: &Package, original_cwd: &Path) -> String {
    if target.import_path == "command-line-arguments" {
        return original_cwd.file_name().and_then(|s| s.to_str()).unwrap_or("a.out").to_string();
    }
    target.dir.file_name().and_then(|s| s.to_str()).unwrap_or(&target.name).to_string()
}

/// Post-test staging (spec.md §4.5 item 7): with `-c`, the produced binary
/// is moved to the user's working directory and left there. Without it, the
/// binary is moved, executed with translated flags and the original stdio,
/// and then removed.
fn stage_test_binary(
    layout: &Layout,
    target: &Package,
    compile_status: &std::process::ExitStatus,
    subcommand: &str,
    original_flags: &[String],
    original_cwd: &Path,
    wanted_c: bool,
) -> Result<super::RunOutcome> {
    if !compile_status.success() {
        return Err(Error::ToolchainFailed { subcommand: subcommand.to_string(), status: *compile_status });
    }

    let binary_name = format!("{}.test", sanitize_binary_name(&target.name));
    let built_path = layout.main_dir.join(&binary_name);
    if !built_path.exists() {
        // nothing to run, e.g. a package with no test files.
        return Ok(super::RunOutcome { exit_code: 0 });
    }
    let staged_path = original_cwd.join(&binary_name);
    std::fs::rename(&built_path, &staged_path).or_else(|_| std::fs::copy(&built_path, &staged_path).map(|_| ()))
        .map_err(|e| Error::io(e, staged_path.clone()))?;

    if wanted_c {
        return Ok(super::RunOutcome { exit_code: 0 });
    }

    let test_flags = translate_test_flags(original_flags);
    let mut cmd = Command::new(&staged_path);
    cmd.args(&test_flags);
    cmd.current_dir(original_cwd);
    cmd.stdin(Stdio::inherit()).stdout(Stdio::inherit()).stderr(Stdio::inherit());
    debug!(?cmd, "running staged test binary");
    let status = cmd.status().map_err(|e| Error::io(e, staged_path.clone()))?;

    let _ = std::fs::remove_file(&staged_path);

    if !status.success() {
        return Err(Error::ToolchainFailed { subcommand: subcommand.to_string(), status });
    }
    Ok(super::RunOutcome { exit_code: status.code().unwrap_or(1) })
}

fn sanitize_binary_name(name: &str) -> String {
    name.replace('/', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_build_positional_from_flags() {
        let args = vec!["-basedir=".to_string(), "example.com/foo".to_string()];
        let parsed = split_args("build", &args);
        assert_eq!(parsed.positional, vec!["example.com/foo".to_string()]);
        assert_eq!(parsed.flags, vec!["-basedir=".to_string()]);
    }

    #[test]
    fn run_splits_source_files_before_first_flag() {
        let args = vec!["main.go".to_string(), "helper.go".to_string(), "-v".to_string()];
        let parsed = split_args("run", &args);
        assert_eq!(parsed.positional, vec!["main.go".to_string(), "helper.go".to_string()]);
        assert_eq!(parsed.flags, vec!["-v".to_string()]);
    }

    #[test]
    fn translates_bare_test_flags() {
        let flags = vec!["-run=TestFoo".to_string(), "-v".to_string(), "-count=1".to_string()];
        let translated = translate_test_flags(&flags);
        assert_eq!(
            translated,
            vec!["-test.run=TestFoo".to_string(), "-test.v".to_string(), "-test.count=1".to_string()]
        );
    }

    #[test]
    fn drops_instrumenter_only_flags() {
        let flags = vec!["-basedir".to_string(), "example.com".to_string(), "-work".to_string(), "-v".to_string()];
        assert_eq!(drop_tool_flags(&flags), vec!["-v".to_string()]);
    }
}
