//! Rotating pool of API access credentials
//!
//! A fixed set of access tokens is shared by every concurrent lookup worker.
//! Each token is held exclusively by one in-flight request at a time and
//! moves through a one-way lifecycle:
//!
//! 1. Loaded from the credential file → idle, in rotation
//! 2. `acquire()` hands it to a worker → checked out, still in rotation
//! 3. Request succeeds or fails for non-quota reasons → `release()` back to idle
//! 4. Upstream answers 403 → `mark_exhausted()`, permanently out of rotation
//!
//! No credential re-enters rotation within a run, so the in-rotation count
//! only ever decreases.

pub mod error;
pub mod pool;
pub mod quota;

pub use error::{Error, Result};
pub use pool::{Credential, CredentialPool, PoolStatus};
pub use quota::{ResponseClass, classify_status};
