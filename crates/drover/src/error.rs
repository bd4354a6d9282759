//! Error types for the worker pool.
//!
//! Every failure the pool can report is local and recoverable: the caller
//! surfaces it and carries on. Nothing here is fatal to the process.
//!
//! ## Error Cases
//! - `WorkerAlreadyExist`: a caller-chosen identity is already registered.
//! - `WorkerIdReserved`: a caller-chosen identity is outside the usable range.
//! - `WorkerNotExist`: the identity is not (or no longer) registered.
//! - `WorkerStuck`: a worker did not acknowledge cancellation within the
//!   pool's stop timeout.

use crate::pool::WorkerId;
use core::time::Duration;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for pool operations.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// A worker with this identity is already registered.
    #[error("worker {id} already exist")]
    WorkerAlreadyExist { id: WorkerId },

    /// This identity can never be chosen by the caller.
    #[error("worker id {id} is reserved")]
    WorkerIdReserved { id: WorkerId },

    /// No worker with this identity is registered.
    #[error("worker {id} does not exist")]
    WorkerNotExist { id: WorkerId },

    /// The worker was cancelled but did not report completion in time. It is
    /// still registered and may be deleted again.
    #[error("worker {id} did not stop within {waited:?}")]
    WorkerStuck { id: WorkerId, waited: Duration },
}
