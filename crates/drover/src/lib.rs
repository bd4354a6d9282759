#![doc = include_str!("../README.md")]

mod error;
pub mod pool;
pub mod queue;
pub mod sink;
pub mod source;

pub use crate::error::*;
pub use crate::pool::{Pool, Worker, WorkerId};
pub use crate::queue::{ItemReceiver, ItemSender, QueueClosed};
pub use crate::sink::{FileSink, LineSink, MemorySink};
pub use crate::source::{AnimalSource, ItemSource, spawn_producer};
// Public re-export so callers can build root tokens without depending on
// `tokio-util` directly.
pub use tokio_util::sync::CancellationToken;
