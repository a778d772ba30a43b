//! In-memory sorted runs and the pool that collects them before a spill.

use std::collections::VecDeque;

use graphos_common::utils::error::Result;

use crate::execution::RunCursor;

/// A streaming cursor over a sealed in-memory run.
pub struct MemCursor<T>(VecDeque<T>);

impl<T> MemCursor<T> {
    /// Wraps an already-sorted sequence for streaming consumption.
    #[must_use]
    pub fn new(values: Vec<T>) -> Self {
        Self(values.into())
    }
}

impl<T> RunCursor<T> for MemCursor<T> {
    fn peek(&self) -> Option<&T> {
        self.0.front()
    }

    fn pop(&mut self) -> Result<Option<T>> {
        Ok(self.0.pop_front())
    }
}

/// The set of fully-sorted in-memory runs awaiting merge or spill.
#[derive(Default)]
pub struct RunPool<T> {
    runs: Vec<Vec<T>>,
    record_count: usize,
}

impl<T> RunPool<T> {
    /// An empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            runs: Vec::new(),
            record_count: 0,
        }
    }

    /// Adds a freshly-sealed sorted run to the pool.
    pub fn push(&mut self, run: Vec<T>) {
        self.record_count += run.len();
        self.runs.push(run);
    }

    /// Total records held across every run in the pool.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Whether the pool currently holds no runs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Drains every run into a streaming cursor, resetting the pool.
    pub fn take_cursors(&mut self) -> Vec<Box<dyn RunCursor<T> + Send>>
    where
        T: Send + 'static,
    {
        self.record_count = 0;
        self.runs
            .drain(..)
            .map(|run| Box::new(MemCursor::new(run)) as Box<dyn RunCursor<T> + Send>)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_cursor_streams_in_order() {
        let mut cursor = MemCursor::new(vec![1, 2, 3]);
        assert_eq!(cursor.peek(), Some(&1));
        assert_eq!(cursor.pop().unwrap(), Some(1));
        assert_eq!(cursor.pop().unwrap(), Some(2));
        assert_eq!(cursor.pop().unwrap(), Some(3));
        assert_eq!(cursor.pop().unwrap(), None);
    }

    #[test]
    fn run_pool_tracks_record_count_and_drains() {
        let mut pool: RunPool<i64> = RunPool::new();
        pool.push(vec![1, 2]);
        pool.push(vec![3]);
        assert_eq!(pool.record_count(), 3);
        assert!(!pool.is_empty());

        let cursors = pool.take_cursors();
        assert_eq!(cursors.len(), 2);
        assert_eq!(pool.record_count(), 0);
        assert!(pool.is_empty());
    }
}
