//! gosloppy-rs: a source-to-source preprocessor for sloppy Go source.
//!
//! Neutralizes unused-identifier and unused-import compiler errors, and
//! rewrites a `must(...)` pseudo-builtin into ordinary `if err != nil`
//! short-error-handling, so that work-in-progress code compiles while it is
//! being written. See `SPEC_FULL.md` and `DESIGN.md` for the full design.

#[macro_use]
extern crate tracing;

pub mod error;
pub mod goast;
pub mod instrument;
pub mod patch;
pub mod resolver;
pub mod scope;
pub mod visitors;

pub use error::{Error, Result};
