//! Transparent spilling of sort runs to disk.
//!
//! - [`SpillCodec`] - on-disk record encoding (length-prefixed, checksummed)
//! - [`SpillFile`] / [`SpillFileReader`] - write/read halves of one run
//! - [`SpillManager`] - owns the on-disk run set, enforces the fan-in bound

mod codec;
mod file;
mod manager;

pub use codec::SpillCodec;
pub use file::{SpillFile, SpillFileReader, SpillRun};
pub use manager::SpillManager;
