//! Shared handoff queue between the item source and the workers.
//!
//! The queue is a single-slot [`mpsc`] channel. Producers block in
//! [`ItemSender::send`] until the slot frees up. The receiving half is shared
//! behind an async mutex so that any number of workers can compete for items:
//! each item is handed to exactly one of them.
//!
//! [`ItemReceiver::recv`] is cancel-safe. A worker that abandons a pending
//! `recv` (for example inside `tokio::select!`) releases its place without
//! consuming an item, so nothing is lost when a worker is cancelled.

use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// Slot count of the handoff channel. Tokio channels cannot be unbuffered, so
/// one slot is the closest to a rendezvous.
const HANDOFF_SLOTS: usize = 1;

/// Returned when every [`ItemReceiver`] is gone. Carries the unsent item.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("item queue closed")]
pub struct QueueClosed(pub String);

/// Creates a new shared item queue.
pub fn channel() -> (ItemSender, ItemReceiver) {
    let (tx, rx) = mpsc::channel(HANDOFF_SLOTS);
    (
        ItemSender { tx },
        ItemReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producer half of the item queue.
#[derive(Clone, Debug)]
pub struct ItemSender {
    tx: mpsc::Sender<String>,
}

impl ItemSender {
    /// Hands an item to the queue, waiting while the slot is occupied.
    ///
    /// # Errors
    ///
    /// Returns [`QueueClosed`] if all receivers have been dropped.
    pub async fn send(&self, item: impl Into<String>) -> Result<(), QueueClosed> {
        self.tx
            .send(item.into())
            .await
            .map_err(|mpsc::error::SendError(item)| QueueClosed(item))
    }

    /// Returns `true` once every receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half of the item queue. Cloning it adds another competing
/// consumer; it does not duplicate items.
#[derive(Clone, Debug)]
pub struct ItemReceiver {
    rx: Arc<Mutex<mpsc::Receiver<String>>>,
}

impl ItemReceiver {
    /// Waits for the next item. Returns `None` once every sender is dropped
    /// and the queue is empty.
    pub async fn recv(&self) -> Option<String> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn clones_compete_for_items() {
        let (tx, rx) = channel();
        let other = rx.clone();

        tx.send("Pig").await.unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("Pig"));

        // The item went to `rx`; the clone sees nothing.
        assert!(
            timeout(Duration::from_millis(50), other.recv())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn send_fails_once_receivers_are_gone() {
        let (tx, rx) = channel();
        drop(rx);

        assert!(tx.is_closed());
        assert_eq!(tx.send("Cow").await, Err(QueueClosed("Cow".to_string())));
    }

    #[tokio::test]
    async fn recv_returns_none_after_senders_drop() {
        let (tx, rx) = channel();
        tx.send("Sheep").await.unwrap();
        drop(tx);

        assert_eq!(rx.recv().await.as_deref(), Some("Sheep"));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn abandoned_recv_does_not_consume() {
        let (tx, rx) = channel();

        // Dropped before anything is sent.
        assert!(timeout(Duration::from_millis(20), rx.recv()).await.is_err());

        tx.send("Chicken").await.unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("Chicken"));
    }
}
