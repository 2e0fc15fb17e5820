//! Durable, resumable result storage
//!
//! The output store is a two-column CSV keyed by identifier. It is only ever
//! written through the `Checkpointer`, whose flush is a single transaction:
//! take the lock, load the store, merge the buffered batch (skipping
//! identifiers already present), write the merged file atomically, append
//! failures to the diagnostic log, release the lock. Because the merge skips
//! existing identifiers, repeating a flush is harmless and the store never
//! holds two rows for one identifier.
//!
//! Run lifecycle:
//! 1. `input::read_identifiers` reads the full input set once
//! 2. `resume::pending` subtracts identifiers already in the store
//! 3. Workers produce `ClassificationResult`s → `Checkpointer::record`
//! 4. Buffer reaches the threshold → automatic flush
//! 5. End of run or shutdown → final `Checkpointer::flush`

pub mod checkpointer;
pub mod error;
pub mod failure_log;
pub mod input;
pub mod record;
pub mod resume;
pub mod store;

pub use checkpointer::{Checkpointer, FlushReport};
pub use error::{Error, Result};
pub use failure_log::FailureLog;
pub use input::read_identifiers;
pub use record::{ClassificationResult, FAILED_LABEL};
pub use resume::pending;
pub use store::OutputStore;
