//! RAII handle representing a reservation against a [`super::BufferManager`].

use std::sync::Arc;

use super::manager::Inner;

/// A reservation of `bytes` against a [`super::BufferManager`]'s budget.
///
/// Releases the reservation automatically when dropped, so callers never
/// need to remember to call back into the manager on every exit path.
pub struct MemoryGrant {
    inner: Arc<Inner>,
    bytes: u64,
}

impl MemoryGrant {
    pub(super) fn new(inner: Arc<Inner>, bytes: u64) -> Self {
        Self { inner, bytes }
    }

    /// The number of bytes reserved by this grant.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl Drop for MemoryGrant {
    fn drop(&mut self) {
        self.inner.release(self.bytes);
    }
}
