//! Registry of running workers.
//!
//! This module defines the [`Pool`] struct, which starts workers on demand,
//! stops them one at a time, and drains all of them on shutdown. Each worker is
//! bound to its own child of the pool's root [`CancellationToken`], so
//! cancelling one worker never disturbs another.
//!
//! The registry is guarded by a mutex that is never held across an `.await`.
//! Stopping a worker happens outside the lock: the caller cancels the worker's
//! token, waits for its completion signal, and only then removes the entry.
//! While a worker is stopping it stays registered, so a registered identity
//! always refers to a worker that is running or on its way out.

use crate::{
    Error, Result,
    pool::worker::{Worker, WorkerId},
    queue::ItemReceiver,
    sink::LineSink,
};
use core::time::Duration;
use futures::future::{BoxFuture, FutureExt, Shared, join_all};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Completion signal of a worker, shareable between concurrent deletes.
type Stopped = Shared<BoxFuture<'static, ()>>;

/// A registered worker: how to stop it and how to know it has stopped.
struct WorkerHandle {
    cancel: CancellationToken,
    stopped: Stopped,
}

#[derive(Default)]
struct Registry {
    workers: HashMap<WorkerId, WorkerHandle>,
    /// Next fresh identity. Only ever increases. `WorkerId::MAX` is never
    /// taken by `add_with_id`, so it always stays above every registered
    /// identity.
    next_id: WorkerId,
}

/// A dynamic pool of workers competing for items on a shared queue.
///
/// Workers are Tokio tasks; [`Pool::add`] and [`Pool::add_with_id`] must be
/// called from within a Tokio runtime.
pub struct Pool {
    registry: Mutex<Registry>,
    root: CancellationToken,
    stop_timeout: Option<Duration>,
}

impl Pool {
    /// Creates an empty pool with its own root cancellation token.
    pub fn new() -> Self {
        Self::with_root(&CancellationToken::new())
    }

    /// Creates an empty pool whose workers are descendants of `root`.
    /// Cancelling `root` stops every worker, but they stay registered until
    /// deleted. Dropping the pool never cancels `root` itself.
    pub fn with_root(root: &CancellationToken) -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            root: root.child_token(),
            stop_timeout: None,
        }
    }

    /// Bounds how long [`Pool::delete`] waits for a cancelled worker to stop.
    ///
    /// Without a bound a worker that never acknowledges cancellation hangs
    /// `delete` (and `finish`) forever.
    pub fn with_stop_timeout(mut self, limit: Duration) -> Self {
        self.stop_timeout = Some(limit);
        self
    }

    pub const fn stop_timeout(&self) -> Option<Duration> {
        self.stop_timeout
    }

    /// Starts a worker under the next fresh identity and returns it.
    ///
    /// Returns as soon as the worker is registered and spawned; it does not
    /// wait for the worker to consume anything.
    pub fn add(&self, input: ItemReceiver, sink: Arc<dyn LineSink>) -> WorkerId {
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id = id.saturating_add(1);
        self.spawn_locked(&mut registry, id, input, sink);
        id
    }

    /// Starts a worker under a caller-chosen identity.
    ///
    /// Later fresh identities from [`Pool::add`] are allocated past `id`.
    ///
    /// # Errors
    ///
    /// - [`Error::WorkerAlreadyExist`] if `id` is registered, including while
    ///   that worker is still stopping.
    /// - [`Error::WorkerIdReserved`] if `id` is `WorkerId::MAX`, which would
    ///   leave no fresh identity for [`Pool::add`].
    pub fn add_with_id(
        &self,
        id: WorkerId,
        input: ItemReceiver,
        sink: Arc<dyn LineSink>,
    ) -> Result<WorkerId> {
        let Some(after) = id.checked_add(1) else {
            return Err(Error::WorkerIdReserved { id });
        };
        let mut registry = self.registry.lock();
        if registry.workers.contains_key(&id) {
            return Err(Error::WorkerAlreadyExist { id });
        }
        registry.next_id = registry.next_id.max(after);
        self.spawn_locked(&mut registry, id, input, sink);
        Ok(id)
    }

    /// Registers and spawns in one critical section, so no reader ever sees an
    /// identity without a running worker behind it.
    fn spawn_locked(
        &self,
        registry: &mut Registry,
        id: WorkerId,
        input: ItemReceiver,
        sink: Arc<dyn LineSink>,
    ) {
        let (worker, completion) = Worker::new(id);
        let cancel = self.root.child_token();
        // A dropped sender means the task is gone, which is as stopped as it
        // gets.
        let stopped = completion.map(|_| ()).boxed().shared();

        registry.workers.insert(
            id,
            WorkerHandle {
                cancel: cancel.clone(),
                stopped,
            },
        );
        tokio::spawn(worker.run(cancel, input, sink));

        #[cfg(feature = "tracing")]
        tracing::info!("Pool added worker {id}");
    }

    /// Stops the worker registered as `id` and removes it.
    ///
    /// Cancels the worker, waits for its completion signal, then unregisters
    /// it. On success the worker has returned from its run loop and will never
    /// write again.
    ///
    /// # Errors
    ///
    /// - [`Error::WorkerNotExist`] if `id` is not registered. Nothing is
    ///   touched. This also covers losing a race with a concurrent delete of
    ///   the same identity; the worker has stopped in that case too.
    /// - [`Error::WorkerStuck`] if a stop timeout is configured and expires.
    ///   The worker stays registered and cancelled.
    pub async fn delete(&self, id: WorkerId) -> Result<()> {
        let (cancel, stopped) = {
            let registry = self.registry.lock();
            let handle = registry
                .workers
                .get(&id)
                .ok_or(Error::WorkerNotExist { id })?;
            (handle.cancel.clone(), handle.stopped.clone())
        };

        cancel.cancel();

        match self.stop_timeout {
            Some(limit) => {
                if timeout(limit, stopped.clone()).await.is_err() {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Worker {id} did not stop within {limit:?}");
                    return Err(Error::WorkerStuck { id, waited: limit });
                }
            }
            None => stopped.clone().await,
        }

        let mut registry = self.registry.lock();
        // Only remove the entry we waited on. A concurrent delete may already
        // have removed it, and `add_with_id` may have reused the identity.
        let ours = registry
            .workers
            .get(&id)
            .is_some_and(|handle| Shared::ptr_eq(&handle.stopped, &stopped));
        if !ours {
            return Err(Error::WorkerNotExist { id });
        }
        registry.workers.remove(&id);

        #[cfg(feature = "tracing")]
        tracing::info!("Pool deleted worker {id}");
        Ok(())
    }

    /// Stops every worker registered at call time and waits for all of them.
    ///
    /// Identities are snapshotted first and deleted concurrently, each delete
    /// re-checking existence on its own. Workers already removed by a
    /// concurrent [`Pool::delete`] count as done.
    ///
    /// # Errors
    ///
    /// Returns the first [`Error::WorkerStuck`] if a stop timeout is configured
    /// and some workers did not stop in time. All other deletes still ran to
    /// completion.
    pub async fn finish(&self) -> Result<()> {
        let ids = self.worker_ids();

        #[cfg(feature = "tracing")]
        tracing::info!("Finishing pool ({} workers)", ids.len());

        let results = join_all(ids.into_iter().map(|id| self.delete(id))).await;

        let mut stuck = None;
        for result in results {
            match result {
                Ok(()) | Err(Error::WorkerNotExist { .. }) => {}
                Err(e) => {
                    stuck.get_or_insert(e);
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::info!("Pool finished ({} workers left)", self.len());

        stuck.map_or(Ok(()), Err)
    }

    /// Number of registered workers, including ones that are stopping.
    pub fn len(&self) -> usize {
        self.registry.lock().workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.lock().workers.is_empty()
    }

    pub fn contains(&self, id: WorkerId) -> bool {
        self.registry.lock().workers.contains_key(&id)
    }

    /// Sorted snapshot of the registered identities.
    pub fn worker_ids(&self) -> Vec<WorkerId> {
        let mut ids: Vec<_> = self.registry.lock().workers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Pool {
    /// Workers never outlive their pool: dropping it cancels them all without
    /// waiting. Use [`Pool::finish`] to wait. Only the pool's own token is
    /// cancelled, never the root it was created from.
    fn drop(&mut self) {
        self.root.cancel();
    }
}

impl core::fmt::Debug for Pool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Pool")
            .field("workers", &self.worker_ids())
            .field("stop_timeout", &self.stop_timeout)
            .finish_non_exhaustive()
    }
}
