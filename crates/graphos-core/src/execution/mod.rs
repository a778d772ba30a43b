//! Execution primitives shared by Graphos pipeline stages.
//!
//! A pipeline stage is anything that implements [`Processor`]: it accepts
//! records one at a time via [`Processor::process`] and is told exactly once
//! that no more are coming via [`Processor::close`]. Stages compose behind
//! `Box<dyn Processor<T>>` so a stage never needs to know the concrete type
//! of what it feeds.

pub mod sort;
pub mod spill;

use std::cmp::Ordering;

use graphos_common::Result;

/// A pipeline stage that consumes records of type `T` in order.
///
/// Implementations must accept `process` calls in any order the upstream
/// stage chooses to deliver them and must not assume anything about timing;
/// the only ordering guarantee is that `close` is called exactly once, after
/// the last `process` call.
pub trait Processor<T> {
    /// Consumes one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be accepted; the error is fatal
    /// to the stage and propagates to the caller.
    fn process(&mut self, record: T) -> Result<()>;

    /// Signals that no further records will arrive.
    ///
    /// The default implementation does nothing, which suits sinks with no
    /// teardown work of their own (for example a writer whose file is
    /// already flushed after every record).
    ///
    /// # Errors
    ///
    /// Returns an error if teardown fails.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A total order over `T`, supplied by the caller.
///
/// Two records comparing equal are treated as equivalent; no stability
/// across equal keys is promised by anything that consumes a `Comparator`.
pub type Comparator<T> = dyn Fn(&T, &T) -> Ordering + Send + Sync;

/// An optional order-preserving transform over a sorted batch.
///
/// Given a non-decreasing sequence (under the paired [`Comparator`]), a
/// reducer returns a non-decreasing sequence of the same type, typically by
/// collapsing equal-keyed records.
pub type Reducer<T> = dyn Fn(Vec<T>) -> Vec<T> + Send + Sync;

/// A streaming read position over one sealed, non-decreasing run.
///
/// Implemented by both in-memory runs ([`sort::run::MemCursor`]) and
/// file-backed runs ([`spill::SpillFileReader`]) so the k-way merger can
/// treat any mix of the two uniformly.
pub trait RunCursor<T> {
    /// Returns the current item without consuming it, or `None` once the
    /// cursor is exhausted.
    fn peek(&self) -> Option<&T>;

    /// Consumes and returns the current item, advancing to the next.
    ///
    /// # Errors
    ///
    /// Returns an error if advancing requires I/O that fails (file-backed
    /// cursors only).
    fn pop(&mut self) -> Result<Option<T>>;
}
