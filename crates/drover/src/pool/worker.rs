use crate::{queue::ItemReceiver, sink::LineSink};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Identity of a worker within its pool.
pub type WorkerId = usize;

/// Receiving end of a worker's completion signal. Resolves once the worker's
/// run loop has returned.
pub type Completion = oneshot::Receiver<()>;

/// Formats the record a worker writes for a consumed item.
pub fn record(id: WorkerId, item: &str) -> String {
    format!("Worker [id {id}]: {item}")
}

/// A single consumer of the shared item queue.
///
/// The worker owns the sending half of its completion signal. A `oneshot`
/// holds exactly one pending value, so the signal is delivered even if nobody
/// is waiting for it yet.
#[derive(Debug)]
pub struct Worker {
    id: WorkerId,
    done: oneshot::Sender<()>,
}

impl Worker {
    /// Creates a worker and the receiver of its completion signal.
    pub fn new(id: WorkerId) -> (Self, Completion) {
        let (done, completion) = oneshot::channel();
        (Self { id, done }, completion)
    }

    pub const fn id(&self) -> WorkerId {
        self.id
    }

    /// Consumes items from `input` and records each one to `sink` until
    /// `cancel` fires.
    ///
    /// Designed to be spawned as a Tokio task. Cancellation is cooperative: it
    /// is observed between items, never in the middle of a write, and no
    /// queued items are drained once it fires. If the queue closes, the
    /// worker idles until cancelled so that it only ever stops on request.
    ///
    /// Sink write failures are logged and otherwise ignored.
    pub async fn run(
        self,
        cancel: CancellationToken,
        input: ItemReceiver,
        sink: Arc<dyn LineSink>,
    ) {
        let id = self.id;

        #[cfg(feature = "tracing")]
        tracing::trace!("Worker {id} started");

        loop {
            tokio::select! {
                // Cancellation wins over a ready item.
                biased;
                () = cancel.cancelled() => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Worker {id} cancelled");
                    break;
                }
                item = input.recv() => match item {
                    Some(item) => {
                        if let Err(_e) = sink.write_line(&record(id, &item)) {
                            #[cfg(feature = "tracing")]
                            tracing::warn!("Worker {id} failed to record item: {_e}");
                        }
                    }
                    None => {
                        #[cfg(feature = "tracing")]
                        tracing::debug!("Worker {id} input closed, waiting for cancellation");
                        cancel.cancelled().await;
                        break;
                    }
                },
            }
        }

        // Release the queue before acknowledging, so a stopped worker holds
        // nothing.
        drop(input);
        if self.done.send(()).is_err() {
            #[cfg(feature = "tracing")]
            tracing::trace!("Worker {id} completion signal had no receiver");
        }

        #[cfg(feature = "tracing")]
        tracing::trace!("Worker {id} stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{queue, sink::MemorySink};
    use core::time::Duration;
    use std::{
        io,
        sync::atomic::{AtomicBool, Ordering},
    };
    use tokio::time::timeout;

    /// Fails its first write, then records like a [`MemorySink`].
    #[derive(Default)]
    struct FlakySink {
        failed: AtomicBool,
        inner: MemorySink,
    }

    impl LineSink for FlakySink {
        fn write_line(&self, line: &str) -> io::Result<()> {
            if !self.failed.swap(true, Ordering::SeqCst) {
                return Err(io::Error::other("disk full"));
            }
            self.inner.write_line(line)
        }
    }

    #[tokio::test]
    async fn records_items_until_cancelled() {
        let (tx, rx) = queue::channel();
        let sink = Arc::new(MemorySink::new());
        let cancel = CancellationToken::new();
        let (worker, completion) = Worker::new(7);

        let handle = tokio::spawn(worker.run(cancel.clone(), rx, sink.clone()));

        tx.send("Pig").await.unwrap();
        tx.send("Cow").await.unwrap();
        // The second send only returns once the first item was taken; wait for
        // the second to be recorded too.
        timeout(Duration::from_secs(1), async {
            while sink.len() < 2 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        cancel.cancel();
        timeout(Duration::from_secs(1), completion)
            .await
            .unwrap()
            .unwrap();
        handle.await.unwrap();

        assert_eq!(
            sink.lines(),
            vec!["Worker [id 7]: Pig".to_string(), "Worker [id 7]: Cow".to_string()]
        );
    }

    #[tokio::test]
    async fn completion_is_kept_until_read() {
        let (_tx, rx) = queue::channel();
        let cancel = CancellationToken::new();
        let (worker, completion) = Worker::new(0);

        cancel.cancel();
        // Run to the end before anyone listens for completion.
        worker.run(cancel, rx, Arc::new(MemorySink::new())).await;

        assert_eq!(completion.await, Ok(()));
    }

    #[tokio::test]
    async fn does_not_drain_after_cancellation() {
        let (tx, rx) = queue::channel();
        let sink = Arc::new(MemorySink::new());
        let cancel = CancellationToken::new();
        let (worker, completion) = Worker::new(1);

        tx.send("Sheep").await.unwrap();
        cancel.cancel();
        worker.run(cancel, rx.clone(), sink.clone()).await;
        completion.await.unwrap();

        assert!(sink.is_empty());
        assert_eq!(rx.recv().await.as_deref(), Some("Sheep"));
    }

    #[tokio::test]
    async fn closed_queue_idles_until_cancelled() {
        let (tx, rx) = queue::channel();
        drop(tx);
        let cancel = CancellationToken::new();
        let (worker, mut completion) = Worker::new(2);

        let handle = tokio::spawn(worker.run(cancel.clone(), rx, Arc::new(MemorySink::new())));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(completion.try_recv().is_err());

        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(completion.await, Ok(()));
    }

    #[tokio::test]
    async fn keeps_consuming_after_a_failed_write() {
        let (tx, rx) = queue::channel();
        let sink = Arc::new(FlakySink::default());
        let cancel = CancellationToken::new();
        let (worker, completion) = Worker::new(4);

        let handle = tokio::spawn(worker.run(cancel.clone(), rx, sink.clone()));

        tx.send("Lost").await.unwrap();
        tx.send("Goat").await.unwrap();
        timeout(Duration::from_secs(1), async {
            while sink.inner.is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        cancel.cancel();
        timeout(Duration::from_secs(1), completion)
            .await
            .unwrap()
            .unwrap();
        handle.await.unwrap();

        assert!(sink.failed.load(Ordering::SeqCst));
        assert_eq!(sink.inner.lines(), vec!["Worker [id 4]: Goat".to_string()]);
    }

    #[test]
    fn record_format() {
        assert_eq!(record(3, "Axolotl"), "Worker [id 3]: Axolotl");
    }
}
