//! Package Instrumenter & Command Driver (spec.md §4.5): the orchestration
//! layer that turns a `build`/`test`/`run` invocation into a rewritten
//! scratch tree plus a retargeted subprocess call.

pub mod command;
pub mod graph;
pub mod package;
pub mod scratch;
pub mod vcs;

use crate::error::Result;
use crate::resolver::ImportResolver;
use std::path::PathBuf;

/// Flags consumed by the tool itself, never forwarded to the toolchain
/// (spec.md §6).
#[derive(Debug, Clone, Default)]
pub struct InstrumentConfig {
    /// `""` auto-detects; `"*"` means "everything non-stdlib is relevant".
    pub base_import_path: String,
    pub include_stdlib: bool,
    pub keep_scratch: bool,
    pub log_command: bool,
    pub inline: bool,
    pub must_builtin: String,
    pub goroot: PathBuf,
    pub gopath: Vec<PathBuf>,
}

impl InstrumentConfig {
    pub fn search_roots(&self) -> Vec<PathBuf> {
        self.gopath.clone()
    }

    pub fn resolver(&self) -> ImportResolver {
        ImportResolver::new(self.search_roots())
    }
}

/// The outcome of one instrumentation + toolchain run (spec.md §6's exit
/// code rule: the toolchain's status on toolchain failure, zero otherwise).
pub struct RunOutcome {
    pub exit_code: i32,
}

/// Entry point used by `src/bin/gosloppy.rs`: resolves the target package,
/// computes its closure, writes (or, with `inline`, patches in place)
/// the instrumented tree, runs the toolchain, and stages test output.
pub fn run(
    subcommand: &str,
    args: &[String],
    cfg: &InstrumentConfig,
) -> Result<RunOutcome> {
    let cwd = std::env::current_dir().map_err(|e| crate::error::Error::io(e, "."))?;
    let parsed_args = command::split_args(subcommand, args);
    let target = package::discover(&cwd, &cfg.goroot, &cfg.gopath, subcommand, &parsed_args.positional)?;
    info!(package = %target.import_path, "resolved target package");

    if cfg.inline {
        return command::run_inline(&target, cfg, subcommand, args);
    }

    let closure = graph::compute_closure(&target, cfg, subcommand == "test")?;
    debug!(count = closure.packages.len(), "computed instrumentation closure");

    let scratch_dir = tempfile::Builder::new()
        .prefix("gosloppy-")
        .tempdir()
        .map_err(|e| crate::error::Error::io(e, "scratch tempdir"))?;

    let write_result = scratch::write_tree(scratch_dir.path(), &target, &closure, cfg);
    let outcome = match write_result {
        Ok(layout) => command::adjust_and_run(&layout, &target, cfg, subcommand, args, &cwd),
        Err(e) => Err(e),
    };

    if cfg.keep_scratch {
        info!(path = %scratch_dir.path().display(), "keeping scratch directory (-work)");
        let _ = scratch_dir.into_path();
    } else if let Err(e) = std::fs::remove_dir_all(scratch_dir.path()) {
        warn!(error = %e, "failed to remove scratch directory");
    }

    outcome
}
