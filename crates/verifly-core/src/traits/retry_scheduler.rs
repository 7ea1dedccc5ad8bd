// # Retry Scheduler Traits
//
// Defines the interfaces between the orchestrator, the task queue and the
// transport that delivers tasks back to the check endpoint.
//
// ```text
// Verifier ──schedule()──▶ RetryScheduler (TaskQueue)
//                                │
//                                │ dispatch(task), redelivered per RetryPolicy
//                                ▼
//                          TaskDispatcher ──POST /challenge──▶ Verifier::perform_check
// ```
//
// Retry state is owned by the scheduler, never by the process handling a
// single check. A check handler only reports success or failure through its
// response status.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::record::VerificationRecord;

/// A unit of work carried by the queue
///
/// The payload bytes are produced once at enqueue time and delivered
/// unchanged on every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Unique task name
    pub name: String,
    /// Endpoint path the task is delivered to
    pub path: String,
    /// Serialized record
    pub payload: Vec<u8>,
    /// Number of previous delivery attempts (0 on first delivery)
    pub retry_count: u32,
    /// Wall-clock time of first enqueue
    pub enqueued_at: DateTime<Utc>,
}

impl Task {
    /// Decode the record carried by this task
    pub fn record(&self) -> Result<VerificationRecord, crate::Error> {
        VerificationRecord::from_json(&self.payload)
    }
}

/// Handle returned after a successful enqueue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    /// Unique task name
    pub name: String,
    /// Endpoint path the task is delivered to
    pub path: String,
    /// Wall-clock time of first enqueue
    pub enqueued_at: DateTime<Utc>,
    /// Time after which the task is dropped
    pub expires_at: DateTime<Utc>,
}

/// Trait for retry scheduler implementations
///
/// # Contract
///
/// - Enqueue a task invoking the check operation with `record` as payload
/// - Deliver at least once, never sooner than the minimum backoff after the
///   previous attempt
/// - Drop the task once the age limit (counted from first enqueue) elapses
#[async_trait]
pub trait RetryScheduler: Send + Sync {
    /// Enqueue a verification check for `record`
    async fn schedule(&self, record: &VerificationRecord) -> Result<TaskHandle, crate::Error>;
}

/// Trait for delivering a task to its endpoint
///
/// # Contract
///
/// - `Ok(status)`: the endpoint answered; 2xx completes the task, anything
///   else makes the queue retry it
/// - `Err(_)`: no answer was obtained; the queue retries the task
///
/// Dispatchers must not retry on their own.
#[async_trait]
pub trait TaskDispatcher: Send + Sync {
    /// Deliver one attempt of `task`
    async fn dispatch(&self, task: &Task) -> Result<u16, crate::Error>;
}

/// Hook run once when a task is dropped after its age limit
#[async_trait]
pub trait ExpiryHandler: Send + Sync {
    /// Called with the expired task
    async fn on_expired(&self, task: &Task);
}
