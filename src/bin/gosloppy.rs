//! Thin CLI shim over [`gosloppy_rs::instrument`]. Argument parsing is
//! deliberately not part of the library: this binary does nothing but parse
//! flags, wire up tracing, and call into the crate.

use clap::Parser;
use gosloppy_rs::instrument::{self, InstrumentConfig};
use std::path::PathBuf;
use std::process::ExitCode;

/// Preprocesses Go source to neutralize unused-identifier/unused-import
/// errors and expand `must(...)` short-error-handling, then invokes the Go
/// toolchain against the rewritten tree.
#[derive(Parser, Debug)]
#[command(name = "gosloppy", version, about)]
struct Cli {
    /// `build`, `test`, or `run`.
    subcommand: String,

    /// Base import-path prefix bounding the instrumentation closure. Empty
    /// auto-detects; `*` includes everything non-stdlib.
    #[arg(long = "basedir", default_value = "")]
    basedir: String,

    /// Also instrument standard-library packages.
    #[arg(long = "goroot", default_value_t = false)]
    goroot_flag: bool,

    /// Preserve the scratch directory and log its location.
    #[arg(short = 'w', long = "work", default_value_t = false)]
    work: bool,

    /// Log the rewritten subprocess command line.
    #[arg(short = 'x', default_value_t = false)]
    x: bool,

    /// Rewrite files in place instead of emitting a scratch tree.
    #[arg(long = "inline", default_value_t = false)]
    inline: bool,

    /// Pseudo-builtin name recognized in place of `must`.
    #[arg(long = "must-builtin", default_value = "must")]
    must_builtin: String,

    /// Everything else: passed through to the underlying toolchain verbatim.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    rest: Vec<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let goroot = go_env_var("GOROOT").unwrap_or_else(|| PathBuf::from("/usr/local/go"));
    let gopath = go_path_roots();

    let cfg = InstrumentConfig {
        base_import_path: cli.basedir,
        include_stdlib: cli.goroot_flag,
        keep_scratch: cli.work,
        log_command: cli.x,
        inline: cli.inline,
        must_builtin: cli.must_builtin,
        goroot,
        gopath,
    };

    match instrument::run(&cli.subcommand, &cli.rest, &cfg) {
        Ok(outcome) => {
            ExitCode::from(outcome.exit_code.clamp(0, 255) as u8)
        }
        Err(e) => {
            tracing::error!(error = %e, "gosloppy failed");
            ExitCode::FAILURE
        }
    }
}

fn go_env_var(name: &str) -> Option<PathBuf> {
    std::env::var_os(name).map(PathBuf::from)
}

fn go_path_roots() -> Vec<PathBuf> {
    match std::env::var_os("GOPATH") {
        Some(val) => std::env::split_paths(&val).collect(),
        None => dirs_home_gopath().into_iter().collect(),
    }
}

fn dirs_home_gopath() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join("go"))
}
