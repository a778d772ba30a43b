//! The registration contract between [`super::BufferManager`] and the
//! components that spill state to disk when it fires.

use thiserror::Error;

use super::PressureLevel;

/// Error returned by a [`MemoryConsumer`] when it fails to respond to a
/// pressure notification.
///
/// Kept distinct from the workspace [`crate::Error`] type so that
/// `graphos-common` itself has no dependency on how a specific consumer
/// represents its own failures; the manager logs the message and moves on.
#[derive(Debug, Error)]
#[error("spill failed: {0}")]
pub struct SpillError(pub String);

/// A component that can be asked to reduce its memory footprint.
///
/// Implementations are invoked off the thread that raised the pressure
/// notification, so they are free to perform blocking I/O.
pub trait MemoryConsumer: Send + Sync {
    /// A short, human-readable name used in log output. Must be stable for
    /// the lifetime of the consumer.
    fn name(&self) -> &str;

    /// Called when the manager's pressure level crosses the registered
    /// threshold for this consumer's region. Implementations should reduce
    /// their resident memory (typically by spilling) and return once the
    /// reduction is complete.
    ///
    /// # Errors
    ///
    /// Returns [`SpillError`] if the consumer could not complete its spill;
    /// the manager logs the failure but does not retry.
    fn on_pressure(&self, level: PressureLevel) -> Result<(), SpillError>;
}
