//! Crate-wide error taxonomy.
//!
//! Mirrors spec.md §7: parse errors, I/O errors, and subprocess failures are
//! fatal and flow through this enum; import-resolution failures and
//! `must`-transform diagnostics are deliberately *not* represented here — they
//! are non-fatal and are logged or collected as [`crate::visitors::must_transform::Diagnostic`]
//! instead.

use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`go {subcommand}` exited with {status}")]
    ToolchainFailed { subcommand: String, status: std::process::ExitStatus },

    #[error("no package found at or above {0}")]
    PackageNotFound(PathBuf),

    #[error("{0} is not a main package, refusing to build")]
    NotMainPackage(PathBuf),

    #[error("expected exactly one positional package argument, got {0}")]
    TooManyPositionalArgs(usize),

    #[error("overlapping patches in {path} at byte {start}")]
    OverlappingPatches { path: PathBuf, start: usize },

    #[error("{0}")]
    Message(String),
}

impl Error {
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Error::Io { path: path.into(), source }
    }

    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Parse { path: path.into(), message: message.into() }
    }

    pub fn msg(message: impl std::fmt::Display) -> Self {
        Error::Message(message.to_string())
    }
}
