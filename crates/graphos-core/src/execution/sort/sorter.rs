//! The sort stage itself: ingest buffer, flush decision, and the
//! memory-pressure listener that drives asynchronous spills.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use graphos_common::memory::buffer::{
    BufferManager, MemoryConsumer, MemoryRegion, PressureLevel, SpillError,
};
use graphos_common::utils::error::{Error, Result};
use parking_lot::Mutex;

use super::merge;
use super::run::RunPool;
use crate::execution::spill::{SpillCodec, SpillManager};
use crate::execution::{Comparator, Processor, Reducer};

/// Configuration for a [`Sorter`], with defaults matching the project's
/// operational guidance.
#[derive(Debug, Clone, Copy)]
pub struct SorterConfig {
    /// Hard cap on in-memory records (ingest buffer + all runs) before a
    /// forced spill.
    pub object_limit: usize,
    /// Soft trigger: once the ingest buffer alone exceeds this, reduce.
    pub reduce_interval: usize,
    /// Merge-read buffer size in records. Advisory; currently unused by the
    /// streaming cursor implementations, which read one record at a time,
    /// but kept so callers can size their own upstream batching against it.
    pub combine_buffer: usize,
    /// Maximum on-disk runs tolerated before cascade compaction.
    pub file_limit: usize,
    /// Fraction of the host's memory budget at which pressure fires.
    pub memory_threshold_fraction: f64,
}

impl Default for SorterConfig {
    fn default() -> Self {
        Self {
            object_limit: 50_000_000,
            reduce_interval: 100_000,
            combine_buffer: 100_000,
            file_limit: 20,
            memory_threshold_fraction: 0.70,
        }
    }
}

struct SharedState<T> {
    ingest: Vec<T>,
    runs: RunPool<T>,
    spill: SpillManager<T>,
    closed: bool,
    downstream: Box<dyn Processor<T> + Send>,
}

struct SorterInner<T> {
    state: Mutex<SharedState<T>>,
    pressure: AtomicBool,
    comparator: Box<Comparator<T>>,
    reducer: Option<Box<Reducer<T>>>,
    config: SorterConfig,
    name: String,
}

impl<T: SpillCodec + Send + 'static> SorterInner<T> {
    fn needs_flush(&self, state: &SharedState<T>) -> bool {
        self.pressure.load(Ordering::Acquire)
            || state.ingest.len() > self.config.reduce_interval
            || state.ingest.len() + state.runs.record_count() > self.config.object_limit
    }

    /// Seals the ingest buffer into a new in-memory run. See §4.2: sort
    /// in place, apply the reducer if configured, then hand the result to
    /// the run pool.
    fn reduce(&self, state: &mut SharedState<T>) -> Result<()> {
        if state.ingest.is_empty() {
            return Ok(());
        }
        let mut batch = std::mem::take(&mut state.ingest);
        let before = batch.len();
        batch.sort_by(|a, b| (self.comparator)(a, b));
        if let Some(reducer) = &self.reducer {
            batch = reducer(batch);
        }
        tracing::trace!(
            stage = %self.name,
            before,
            after = batch.len(),
            "reduced ingest buffer into a run"
        );
        state.runs.push(batch);
        Ok(())
    }

    fn spill(&self, state: &mut SharedState<T>) -> Result<()> {
        if state.runs.is_empty() {
            return Ok(());
        }
        let cursors = state.runs.take_cursors();
        state.spill.write_run(&self.comparator, cursors)?;
        state.spill.compact_if_needed(&self.comparator)?;
        tracing::debug!(
            stage = %self.name,
            files = state.spill.len(),
            "spilled in-memory runs to disk"
        );
        Ok(())
    }

    fn flush_if_needed(&self, state: &mut SharedState<T>) -> Result<()> {
        if !self.needs_flush(state) {
            return Ok(());
        }
        self.reduce(state)?;
        if self.needs_flush(state) {
            self.spill(state)?;
            self.pressure.store(false, Ordering::Release);
        }
        Ok(())
    }

    fn ingest(&self, record: T) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(Error::internal("process called after close"));
        }
        state.ingest.push(record);
        self.flush_if_needed(&mut state)
    }

    fn finish(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.closed = true;

        self.reduce(&mut state)?;

        if state.spill.is_empty() {
            let cursors = state.runs.take_cursors();
            merge::k_way_merge(&self.comparator, cursors, state.downstream.as_mut())?;
        } else {
            // Final emission (§4.4): flush any residual in-memory runs to
            // disk and cascade compaction until the spill set is within the
            // fan-in bound, even if no flush threshold was ever crossed.
            self.spill(&mut state)?;
            state.spill.compact_if_needed(&self.comparator)?;
            let cursors = state.spill.take_cursors()?;
            merge::k_way_merge(&self.comparator, cursors, state.downstream.as_mut())?;
        }

        state.downstream.close()
    }
}

/// Adapts a [`Sorter`]'s shared state to the host's memory-pressure
/// notification contract.
///
/// Runs on the [`BufferManager`]'s own worker thread, which already
/// satisfies the requirement that the notifier's thread never blocks on
/// I/O — the listener performs the spill directly rather than handing off
/// to a second worker.
struct PressureListener<T> {
    name: String,
    inner: Arc<SorterInner<T>>,
}

impl<T: SpillCodec + Send + 'static> MemoryConsumer for PressureListener<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_pressure(&self, _level: PressureLevel) -> std::result::Result<(), SpillError> {
        self.inner.pressure.store(true, Ordering::Release);
        let mut state = self.inner.state.lock();
        if state.closed {
            // Late notification during/after teardown: discard silently.
            return Ok(());
        }
        self.inner
            .flush_if_needed(&mut state)
            .map_err(|err| SpillError(err.to_string()))
    }
}

/// The external-memory sort pipeline stage.
///
/// Accepts records via [`Processor::process`], sorts them under the
/// supplied comparator, and emits them in non-decreasing order to its
/// downstream processor on [`Processor::close`].
pub struct Sorter<T> {
    inner: Arc<SorterInner<T>>,
    buffer_manager: Option<Arc<BufferManager>>,
    listener_name: String,
}

impl<T: SpillCodec + Send + 'static> Sorter<T> {
    /// Constructs a sorter registered against `memory_notifier`.
    ///
    /// `downstream` receives the sorted output on [`Processor::close`].
    /// `name` identifies this instance in log output and in the
    /// memory-notification registry; it must be unique among sorters
    /// sharing a `BufferManager`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `memory_notifier` is `None` — the
    /// host provides no compatible memory-notification facility — or if
    /// `config.file_limit` is zero.
    pub fn try_new(
        name: impl Into<String>,
        comparator: impl Fn(&T, &T) -> std::cmp::Ordering + Send + Sync + 'static,
        reducer: Option<Box<Reducer<T>>>,
        config: SorterConfig,
        downstream: Box<dyn Processor<T> + Send>,
        memory_notifier: Option<&Arc<BufferManager>>,
    ) -> Result<Self> {
        if config.file_limit == 0 {
            return Err(Error::config("file_limit must be at least 1"));
        }
        let Some(buffer_manager) = memory_notifier else {
            return Err(Error::config(
                "no memory-notification facility available; pass a BufferManager",
            ));
        };

        let name = name.into();
        let inner = Arc::new(SorterInner {
            state: Mutex::new(SharedState {
                ingest: Vec::new(),
                runs: RunPool::new(),
                spill: SpillManager::new(config.file_limit),
                closed: false,
                downstream,
            }),
            pressure: AtomicBool::new(false),
            comparator: Box::new(comparator),
            reducer,
            config,
            name: name.clone(),
        });

        buffer_manager.register_consumer(
            MemoryRegion::SpillStaging,
            Arc::new(PressureListener {
                name: name.clone(),
                inner: Arc::clone(&inner),
            }),
        );
        tracing::debug!(stage = %name, "registered memory-pressure listener");

        Ok(Self {
            inner,
            buffer_manager: Some(Arc::clone(buffer_manager)),
            listener_name: name,
        })
    }
}

impl<T: SpillCodec + Send + 'static> Processor<T> for Sorter<T> {
    fn process(&mut self, record: T) -> Result<()> {
        self.inner.ingest(record)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(buffer_manager) = self.buffer_manager.take() {
            buffer_manager.deregister_consumer(&self.listener_name);
            tracing::debug!(stage = %self.listener_name, "deregistered memory-pressure listener");
        }
        self.inner.finish()
    }
}


#[cfg(test)]
mod proptests {
    use std::sync::{Arc, Mutex as StdMutex};

    use proptest::prelude::*;

    use super::{BufferManager, Processor, Result, Sorter, SorterConfig};

    struct VecSink(Arc<StdMutex<Vec<i64>>>);

    impl Processor<i64> for VecSink {
        fn process(&mut self, record: i64) -> Result<()> {
            self.0.lock().unwrap().push(record);
            Ok(())
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Property 1 (Sortedness) and property 2 (Conservation): the
        /// emitted sequence is non-decreasing and is a permutation of the
        /// input, across arbitrary inputs and flush thresholds.
        #[test]
        fn sorts_and_conserves_arbitrary_input(
            input in proptest::collection::vec(any::<i64>(), 0..500),
            object_limit in 1_usize..200,
            reduce_interval in 1_usize..100,
        ) {
            let buffer_manager = Arc::new(BufferManager::with_defaults());
            let out = Arc::new(StdMutex::new(Vec::new()));
            let mut sorter = Sorter::try_new(
                "proptest-sorter",
                |a: &i64, b: &i64| a.cmp(b),
                None,
                SorterConfig {
                    object_limit,
                    reduce_interval,
                    ..SorterConfig::default()
                },
                Box::new(VecSink(Arc::clone(&out))),
                Some(&buffer_manager),
            ).unwrap();

            for &value in &input {
                sorter.process(value).unwrap();
            }
            sorter.close().unwrap();

            let emitted = out.lock().unwrap().clone();
            prop_assert!(emitted.windows(2).all(|w| w[0] <= w[1]));

            let mut expected = input.clone();
            expected.sort_unstable();
            prop_assert_eq!(emitted, expected);
        }
    }
}
