//! Dynamic worker pool.
//!
//! ## Structure
//!
//! - [`manager`] - [`Pool`], the registry of running workers with add, delete
//!   and finish operations.
//! - [`worker`] - [`Worker`], the consumer loop each registered identity runs.

pub mod manager;
pub mod worker;

pub use manager::Pool;
pub use worker::{Completion, Worker, WorkerId, record};
