//! The pressure-aware budget tracker itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossbeam::channel::{self, Sender};
use parking_lot::Mutex;

use super::{BufferStats, MemoryConsumer, MemoryGrant, MemoryRegion, PressureLevel};

/// Configuration for a [`BufferManager`].
#[derive(Debug, Clone, Copy)]
pub struct BufferManagerConfig {
    /// Total byte budget tracked by the manager.
    pub budget_bytes: u64,
    /// Fraction of the budget at which consumers are asked to spill.
    pub moderate_fraction: f64,
    /// Fraction at which consumers should spill aggressively.
    pub high_fraction: f64,
    /// Fraction at which new allocations are refused outright.
    pub critical_fraction: f64,
}

impl Default for BufferManagerConfig {
    fn default() -> Self {
        Self {
            budget_bytes: 1024 * 1024 * 1024,
            moderate_fraction: 0.70,
            high_fraction: 0.85,
            critical_fraction: 0.95,
        }
    }
}

struct RegisteredConsumer {
    region: MemoryRegion,
    consumer: Arc<dyn MemoryConsumer>,
    pending: Arc<AtomicBool>,
}

struct Job {
    consumer: Arc<dyn MemoryConsumer>,
    pending: Arc<AtomicBool>,
    level: PressureLevel,
}

pub(super) struct Inner {
    used: AtomicU64,
    budget: u64,
    moderate: f64,
    high: f64,
    critical: f64,
    consumers: Mutex<Vec<RegisteredConsumer>>,
    jobs: Sender<Job>,
}

impl Inner {
    pub(super) fn release(&self, bytes: u64) {
        self.used.fetch_sub(bytes, Ordering::AcqRel);
    }
}

/// Centralized, pressure-aware memory budget tracker.
///
/// Subsystems reserve bytes with [`try_allocate`](Self::try_allocate) and
/// release them by dropping the returned [`MemoryGrant`]. Anything that
/// needs to shed memory when the budget runs low registers itself as a
/// [`MemoryConsumer`] for one or more [`MemoryRegion`]s; when usage in that
/// region crosses the moderate threshold the manager's single background
/// worker thread calls the consumer back, off whichever thread happened to
/// push usage over the line.
pub struct BufferManager {
    inner: Arc<Inner>,
}

impl BufferManager {
    /// Creates a manager with the given configuration, spawning its
    /// notification worker thread.
    #[must_use]
    pub fn new(config: BufferManagerConfig) -> Self {
        let (tx, rx) = channel::unbounded::<Job>();
        std::thread::Builder::new()
            .name("graphos-buffer-manager".to_string())
            .spawn(move || {
                for job in rx {
                    let result = job.consumer.on_pressure(job.level);
                    job.pending.store(false, Ordering::Release);
                    if let Err(err) = result {
                        tracing::error!(
                            consumer = job.consumer.name(),
                            error = %err,
                            "memory consumer failed to respond to pressure notification"
                        );
                    }
                }
            })
            .expect("failed to spawn buffer manager worker thread");

        Self {
            inner: Arc::new(Inner {
                used: AtomicU64::new(0),
                budget: config.budget_bytes.max(1),
                moderate: config.moderate_fraction,
                high: config.high_fraction,
                critical: config.critical_fraction,
                consumers: Mutex::new(Vec::new()),
                jobs: tx,
            }),
        }
    }

    /// Creates a manager with a conservative fixed default budget.
    ///
    /// Sizing a budget from total system memory requires a platform
    /// introspection dependency this workspace does not otherwise need;
    /// production callers should size the budget explicitly with
    /// [`with_budget`](Self::with_budget) instead.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(BufferManagerConfig::default())
    }

    /// Creates a manager with a specific byte budget and default thresholds.
    #[must_use]
    pub fn with_budget(budget_bytes: u64) -> Self {
        Self::new(BufferManagerConfig {
            budget_bytes,
            ..BufferManagerConfig::default()
        })
    }

    /// Registers `consumer` to be notified when `region` crosses the
    /// moderate pressure threshold.
    pub fn register_consumer(&self, region: MemoryRegion, consumer: Arc<dyn MemoryConsumer>) {
        self.inner.consumers.lock().push(RegisteredConsumer {
            region,
            consumer,
            pending: Arc::new(AtomicBool::new(false)),
        });
    }

    /// Deregisters every consumer previously registered under `name`.
    ///
    /// Callers must deregister before tearing down the consumer so that any
    /// notification already in flight on the worker thread is the last one
    /// delivered.
    pub fn deregister_consumer(&self, name: &str) {
        self.inner
            .consumers
            .lock()
            .retain(|entry| entry.consumer.name() != name);
    }

    /// Reserves `bytes` against the budget, returning a grant that releases
    /// the reservation when dropped, or `None` if doing so would push usage
    /// to or past the critical threshold.
    #[must_use]
    pub fn try_allocate(&self, bytes: u64, region: MemoryRegion) -> Option<MemoryGrant> {
        let critical_bytes = (self.inner.budget as f64 * self.inner.critical) as u64;
        loop {
            let current = self.inner.used.load(Ordering::Acquire);
            let next = current.saturating_add(bytes);
            if next >= critical_bytes {
                return None;
            }
            if self
                .inner
                .used
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                break;
            }
        }
        self.notify_if_under_pressure(region, self.pressure_level());
        Some(MemoryGrant::new(Arc::clone(&self.inner), bytes))
    }

    fn notify_if_under_pressure(&self, region: MemoryRegion, level: PressureLevel) {
        if !level.should_spill() {
            return;
        }
        let consumers = self.inner.consumers.lock();
        for entry in consumers.iter().filter(|entry| entry.region == region) {
            if entry.pending.swap(true, Ordering::AcqRel) {
                tracing::warn!(
                    consumer = entry.consumer.name(),
                    "pressure notification coalesced, spill already in flight"
                );
                continue;
            }
            let job = Job {
                consumer: Arc::clone(&entry.consumer),
                pending: Arc::clone(&entry.pending),
                level,
            };
            if self.inner.jobs.send(job).is_err() {
                entry.pending.store(false, Ordering::Release);
            }
        }
    }

    /// Synthesizes a threshold-exceeded notification for every consumer
    /// registered on `region`, regardless of current usage.
    ///
    /// Intended for tests and operational tooling that want to force a
    /// spill deterministically rather than racing real allocations.
    pub fn inject_pressure(&self, region: MemoryRegion) {
        self.notify_if_under_pressure(region, PressureLevel::Critical);
    }

    /// The manager's current pressure classification.
    #[must_use]
    pub fn pressure_level(&self) -> PressureLevel {
        let used = self.inner.used.load(Ordering::Acquire);
        PressureLevel::classify(
            used as f64 / self.inner.budget as f64,
            self.inner.moderate,
            self.inner.high,
            self.inner.critical,
        )
    }

    /// A snapshot of the manager's current usage.
    #[must_use]
    pub fn stats(&self) -> BufferStats {
        BufferStats {
            used_bytes: self.inner.used.load(Ordering::Acquire),
            budget_bytes: self.inner.budget,
            pressure: self.pressure_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use super::*;

    struct RecordingConsumer {
        name: String,
        calls: Arc<StdMutex<Vec<PressureLevel>>>,
    }

    impl MemoryConsumer for RecordingConsumer {
        fn name(&self) -> &str {
            &self.name
        }

        fn on_pressure(&self, level: PressureLevel) -> Result<(), super::super::SpillError> {
            self.calls.lock().unwrap().push(level);
            Ok(())
        }
    }

    #[test]
    fn allocate_and_release_round_trips_usage() {
        let manager = BufferManager::with_budget(1024);
        let grant = manager.try_allocate(100, MemoryRegion::General).unwrap();
        assert_eq!(manager.stats().used_bytes, 100);
        drop(grant);
        assert_eq!(manager.stats().used_bytes, 0);
    }

    #[test]
    fn try_allocate_refuses_past_critical_threshold() {
        let manager = BufferManager::with_budget(100);
        assert!(manager.try_allocate(94, MemoryRegion::General).is_some());
        assert!(manager.try_allocate(10, MemoryRegion::General).is_none());
    }

    #[test]
    fn crossing_moderate_threshold_notifies_registered_consumer() {
        let manager = BufferManager::with_budget(100);
        let calls = Arc::new(StdMutex::new(Vec::new()));
        let consumer = Arc::new(RecordingConsumer {
            name: "test".to_string(),
            calls: Arc::clone(&calls),
        });
        manager.register_consumer(MemoryRegion::SpillStaging, consumer);

        let _grant = manager
            .try_allocate(75, MemoryRegion::SpillStaging)
            .unwrap();

        // The worker thread runs asynchronously; give it a moment to land.
        for _ in 0..100 {
            if !calls.lock().unwrap().is_empty() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn inject_pressure_forces_a_notification() {
        let manager = BufferManager::with_defaults();
        let calls = Arc::new(StdMutex::new(Vec::new()));
        let consumer = Arc::new(RecordingConsumer {
            name: "injected".to_string(),
            calls: Arc::clone(&calls),
        });
        manager.register_consumer(MemoryRegion::General, consumer);

        manager.inject_pressure(MemoryRegion::General);

        for _ in 0..100 {
            if !calls.lock().unwrap().is_empty() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(calls.lock().unwrap(), vec![PressureLevel::Critical]);
    }

    #[test]
    fn deregister_stops_future_notifications() {
        let manager = BufferManager::with_budget(100);
        let calls = Arc::new(StdMutex::new(Vec::new()));
        let consumer = Arc::new(RecordingConsumer {
            name: "gone".to_string(),
            calls: Arc::clone(&calls),
        });
        manager.register_consumer(MemoryRegion::General, consumer);
        manager.deregister_consumer("gone");

        let _grant = manager.try_allocate(80, MemoryRegion::General).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert!(calls.lock().unwrap().is_empty());
    }
}
