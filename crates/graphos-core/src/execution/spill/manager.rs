//! Owns the on-disk run set and enforces the fan-in bound.

use graphos_common::utils::error::Result;

use super::codec::SpillCodec;
use super::file::{SpillFile, SpillRun};
use crate::execution::sort::merge;
use crate::execution::{Comparator, Processor, RunCursor};

const COMPACTION_SLACK_BYTES: u64 = 1024 * 1024 * 1024;

struct SpillSink<'a, T> {
    file: &'a mut SpillFile<T>,
}

impl<T: SpillCodec> Processor<T> for SpillSink<'_, T> {
    fn process(&mut self, record: T) -> Result<()> {
        self.file.write_record(&record)
    }
}

/// Owns the set of on-disk runs produced by spilling and keeps their count
/// under the configured fan-in bound via small-files-first compaction.
pub struct SpillManager<T> {
    files: Vec<SpillRun<T>>,
    fan_in: usize,
}

impl<T: SpillCodec> SpillManager<T> {
    /// Creates an empty manager enforcing the given fan-in bound.
    #[must_use]
    pub fn new(fan_in: usize) -> Self {
        Self {
            files: Vec::new(),
            fan_in: fan_in.max(1),
        }
    }

    /// The number of on-disk runs currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the spill set currently holds no runs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Merges `cursors` into a single new on-disk run and adds it to the
    /// spill set.
    ///
    /// # Errors
    ///
    /// Returns an error if the merge or the underlying file I/O fails.
    pub fn write_run(
        &mut self,
        cmp: &Comparator<T>,
        cursors: Vec<Box<dyn RunCursor<T> + Send>>,
    ) -> Result<()> {
        let mut file = SpillFile::create(None)?;
        {
            let mut sink = SpillSink { file: &mut file };
            merge::k_way_merge(cmp, cursors, &mut sink)?;
        }
        self.files.push(file.seal()?);
        Ok(())
    }

    /// Cascades small-files-first compaction until the spill set is at or
    /// below the fan-in bound.
    ///
    /// # Errors
    ///
    /// Returns an error if a compaction merge or its file I/O fails.
    pub fn compact_if_needed(&mut self, cmp: &Comparator<T>) -> Result<()> {
        while self.files.len() > self.fan_in {
            self.files.sort_by_key(SpillRun::bytes);
            let cohort_size = self.fan_in.min(self.files.len());
            let cohort: Vec<SpillRun<T>> = self.files.drain(0..cohort_size).collect();
            let cohort_bytes: u64 = cohort.iter().map(SpillRun::bytes).sum();

            let mut cursors: Vec<Box<dyn RunCursor<T> + Send>> = Vec::with_capacity(cohort.len());
            for run in cohort {
                cursors.push(Box::new(run.into_cursor()?));
            }

            let size_hint = cohort_bytes
                .saturating_mul(2)
                .saturating_add(COMPACTION_SLACK_BYTES);
            let mut file = SpillFile::create(Some(size_hint))?;
            {
                let mut sink = SpillSink { file: &mut file };
                merge::k_way_merge(cmp, cursors, &mut sink)?;
            }
            let merged = file.seal()?;

            tracing::debug!(
                files_merged = cohort_size,
                bytes = cohort_bytes,
                "compacted small spill files"
            );
            self.files.push(merged);
        }
        Ok(())
    }

    /// Drains the spill set into file-backed cursors for the final merge.
    ///
    /// # Errors
    ///
    /// Returns an error if any file cannot be reopened for reading.
    pub fn take_cursors(&mut self) -> Result<Vec<Box<dyn RunCursor<T> + Send>>> {
        let mut out = Vec::with_capacity(self.files.len());
        for run in self.files.drain(..) {
            out.push(Box::new(run.into_cursor()?) as Box<dyn RunCursor<T> + Send>);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::sort::run::MemCursor;

    fn cmp() -> Box<Comparator<i64>> {
        Box::new(|a: &i64, b: &i64| a.cmp(b))
    }

    fn mem_cursor(values: Vec<i64>) -> Box<dyn RunCursor<i64> + Send> {
        Box::new(MemCursor::new(values))
    }

    #[test]
    fn write_run_then_read_back_in_order() {
        let mut manager = SpillManager::<i64>::new(20);
        let cmp = cmp();
        manager
            .write_run(&*cmp, vec![mem_cursor(vec![3, 5, 9]), mem_cursor(vec![1, 2, 4])])
            .unwrap();
        assert_eq!(manager.len(), 1);

        let mut cursors = manager.take_cursors().unwrap();
        let mut out = Vec::new();
        let mut cursor = cursors.pop().unwrap();
        while let Some(v) = cursor.pop().unwrap() {
            out.push(v);
        }
        assert_eq!(out, vec![1, 2, 3, 4, 5, 9]);
    }

    #[test]
    fn compaction_keeps_file_count_within_bound() {
        let mut manager = SpillManager::<i64>::new(2);
        let cmp = cmp();
        for value in 0..5_i64 {
            manager
                .write_run(&*cmp, vec![mem_cursor(vec![value])])
                .unwrap();
            manager.compact_if_needed(&*cmp).unwrap();
        }
        assert!(manager.len() <= 2);

        let mut cursors = manager.take_cursors().unwrap();
        let mut out = Vec::new();
        for cursor in &mut cursors {
            while let Some(v) = cursor.pop().unwrap() {
                out.push(v);
            }
        }
        out.sort_unstable();
        assert_eq!(out, vec![0, 1, 2, 3, 4]);
    }
}
