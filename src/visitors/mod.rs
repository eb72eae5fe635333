//! Analysis Visitors (spec.md §4.4): the passes that ride [`crate::scope::walk`]
//! and turn what they observe into [`crate::patch::Patch`] values.
//!
//! Each visitor only ever emits patches; composing several of them in one
//! traversal is [`multi::MultiVisitor`]'s job, so none of them mutate source
//! bytes directly or need to know about each other.

pub mod autoimport;
pub mod multi;
pub mod must_transform;
pub mod unused;
