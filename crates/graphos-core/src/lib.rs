//! # graphos-core
//!
//! Core layer for Graphos: the execution primitives built on top of
//! `graphos-common`.
//!
//! ## Modules
//!
//! - [`execution`] - Execution primitives: the `Processor` trait and the
//!   external-memory sort stage (`execution::sort`) backed by
//!   `execution::spill`.

pub mod execution;

pub use execution::sort::{Sorter, SorterConfig};
pub use execution::{Comparator, Processor, Reducer};
