// # Task Queue
//
// In-process implementation of `RetryScheduler`.
//
// ## Delivery Semantics
//
// - First delivery happens right after enqueue
// - Any attempt that fails (dispatcher error or non-2xx status) is retried
//   according to the `RetryPolicy`
// - The payload bytes are serialized once and delivered unchanged
// - A task is dropped once its next attempt would start after the age limit;
//   the optional `ExpiryHandler` runs exactly once at that point
//
// ## Crash Behavior
//
// Tasks live in memory only. Pending tasks are lost on restart and
// abandoned on `shutdown()`; there is no persistence of verification state.
// Dropping the queue without calling `shutdown()` leaves already scheduled
// tasks running to completion or expiry.

pub mod policy;

pub use policy::RetryPolicy;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::record::VerificationRecord;
use crate::traits::{ExpiryHandler, RetryScheduler, Task, TaskDispatcher, TaskHandle};

/// In-process retrying task queue
///
/// Every scheduled task is driven by its own tokio task until it succeeds,
/// expires, or the queue shuts down.
///
/// # Example
///
/// ```rust,ignore
/// use verifly_core::queue::{RetryPolicy, TaskQueue};
///
/// let queue = TaskQueue::new(dispatcher, RetryPolicy::default(), "/challenge");
/// let handle = queue.schedule(&record).await?;
/// ```
pub struct TaskQueue {
    /// Delivers attempts to the check endpoint
    dispatcher: Arc<dyn TaskDispatcher>,

    /// Backoff and age limit
    policy: RetryPolicy,

    /// Endpoint path tasks are delivered to
    path: String,

    /// Runs once per expired task
    expiry_handler: Option<Arc<dyn ExpiryHandler>>,

    /// Signals pending deliveries to stop
    shutdown_tx: watch::Sender<bool>,

    /// Number of tasks not yet completed, expired or abandoned
    pending: Arc<AtomicUsize>,
}

impl TaskQueue {
    /// Create a new task queue
    ///
    /// # Parameters
    ///
    /// - `dispatcher`: transport that delivers each attempt
    /// - `policy`: backoff and age limit
    /// - `path`: endpoint path recorded on every task
    pub fn new(
        dispatcher: Arc<dyn TaskDispatcher>,
        policy: RetryPolicy,
        path: impl Into<String>,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            dispatcher,
            policy,
            path: path.into(),
            expiry_handler: None,
            shutdown_tx,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Run `handler` once for every task that expires
    pub fn with_expiry_handler(mut self, handler: Arc<dyn ExpiryHandler>) -> Self {
        self.expiry_handler = Some(handler);
        self
    }

    /// The retry policy applied to every task
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Number of tasks still being delivered
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Whether `shutdown()` has been called
    pub fn is_shut_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Stop all pending deliveries
    ///
    /// Tasks waiting for their next attempt are abandoned; an attempt already
    /// in flight is cancelled. New tasks are rejected afterwards.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
        info!("Task queue shut down ({} pending task(s) abandoned)", self.pending());
    }

    /// Enqueue an already-built task
    fn enqueue(&self, task: Task) -> Result<()> {
        if self.is_shut_down() {
            return Err(Error::schedule("task queue is shut down"));
        }

        let delivery = Delivery {
            dispatcher: Arc::clone(&self.dispatcher),
            policy: self.policy,
            expiry_handler: self.expiry_handler.clone(),
            shutdown_rx: self.shutdown_tx.subscribe(),
            _guard: PendingGuard::new(Arc::clone(&self.pending)),
        };

        tokio::spawn(delivery.run(task));
        Ok(())
    }
}

#[async_trait]
impl RetryScheduler for TaskQueue {
    async fn schedule(&self, record: &VerificationRecord) -> Result<TaskHandle> {
        let payload = record.to_json()?;
        let enqueued_at = chrono::Utc::now();
        let age_limit = chrono::Duration::from_std(self.policy.age_limit)
            .map_err(|e| Error::schedule(format!("age limit out of range: {}", e)))?;

        let task = Task {
            name: Uuid::new_v4().to_string(),
            path: self.path.clone(),
            payload,
            retry_count: 0,
            enqueued_at,
        };

        let handle = TaskHandle {
            name: task.name.clone(),
            path: task.path.clone(),
            enqueued_at,
            expires_at: enqueued_at + age_limit,
        };

        self.enqueue(task)?;
        debug!(
            "Enqueued task {} for {} (expires at {})",
            handle.name, record.domain, handle.expires_at
        );

        Ok(handle)
    }
}

/// Decrements the pending counter when a delivery ends, however it ends
struct PendingGuard {
    pending: Arc<AtomicUsize>,
}

impl PendingGuard {
    fn new(pending: Arc<AtomicUsize>) -> Self {
        pending.fetch_add(1, Ordering::SeqCst);
        Self { pending }
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Everything one task needs to be delivered until it ends
struct Delivery {
    dispatcher: Arc<dyn TaskDispatcher>,
    policy: RetryPolicy,
    expiry_handler: Option<Arc<dyn ExpiryHandler>>,
    shutdown_rx: watch::Receiver<bool>,
    _guard: PendingGuard,
}

impl Delivery {
    async fn run(mut self, mut task: Task) {
        let started = tokio::time::Instant::now();

        loop {
            if *self.shutdown_rx.borrow() {
                debug!("Task {} abandoned on shutdown", task.name);
                return;
            }

            let result = tokio::select! {
                result = self.dispatcher.dispatch(&task) => result,
                _ = shutdown_requested(&mut self.shutdown_rx) => {
                    debug!("Task {} cancelled on shutdown", task.name);
                    return;
                }
            };

            match result {
                Ok(status) if (200..300).contains(&status) => {
                    debug!(
                        "Task {} completed after {} retr(y/ies)",
                        task.name, task.retry_count
                    );
                    return;
                }
                Ok(status) => {
                    debug!(
                        "Task {} attempt {} answered with status {}",
                        task.name, task.retry_count, status
                    );
                }
                Err(e) => {
                    warn!(
                        "Task {} attempt {} could not be delivered: {}",
                        task.name, task.retry_count, e
                    );
                }
            }

            task.retry_count = task.retry_count.saturating_add(1);

            let Some(delay) = self.policy.next_attempt(started.elapsed(), task.retry_count) else {
                info!(
                    "Task {} expired after {} attempt(s)",
                    task.name, task.retry_count
                );
                if let Some(handler) = &self.expiry_handler {
                    handler.on_expired(&task).await;
                }
                return;
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown_requested(&mut self.shutdown_rx) => {
                    debug!("Task {} abandoned on shutdown", task.name);
                    return;
                }
            }
        }
    }
}

/// Resolves once `shutdown()` has been called
///
/// A dropped queue closes the channel without a shutdown; that never resolves.
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|stopped| *stopped).await.is_err() {
        std::future::pending::<()>().await;
    }
}
