//! Cross-cutting utilities shared by every Graphos crate.

pub mod error;
