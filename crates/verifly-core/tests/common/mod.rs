//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal test doubles that record how the core
//! drives its collaborators, without doing any real DNS or HTTP work.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use verifly_core::error::{Error, Result};
use verifly_core::traits::{
    CallbackResponse, ExpiryHandler, Notifier, ProofChecker, RetryScheduler, Task,
    TaskDispatcher, TaskHandle,
};
use verifly_core::{VerificationRecord, VeriflyConfig, Verifier, VerificationEvent};

/// What a scripted checker answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Found,
    Absent,
    Fails,
}

/// A ProofChecker that answers from a fixed lookup result
pub struct ScriptedChecker {
    lookup: Lookup,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl ScriptedChecker {
    pub fn new(lookup: Lookup) -> Self {
        Self {
            lookup,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// (domain, challenge) pairs the checker was called with
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProofChecker for ScriptedChecker {
    async fn check(&self, domain: &str, challenge: &str) -> Result<bool> {
        self.calls
            .lock()
            .unwrap()
            .push((domain.to_string(), challenge.to_string()));

        match self.lookup {
            Lookup::Found => Ok(true),
            Lookup::Absent => Ok(false),
            Lookup::Fails => Err(Error::lookup("resolver unreachable")),
        }
    }

    fn strategy_name(&self) -> &'static str {
        "scripted"
    }
}

/// A RetryScheduler that records every scheduled record
#[derive(Default)]
pub struct RecordingScheduler {
    scheduled: Mutex<Vec<VerificationRecord>>,
    fail: bool,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            scheduled: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn scheduled(&self) -> Vec<VerificationRecord> {
        self.scheduled.lock().unwrap().clone()
    }
}

#[async_trait]
impl RetryScheduler for RecordingScheduler {
    async fn schedule(&self, record: &VerificationRecord) -> Result<TaskHandle> {
        if self.fail {
            return Err(Error::schedule("queue unavailable"));
        }

        self.scheduled.lock().unwrap().push(record.clone());
        let now = chrono::Utc::now();
        Ok(TaskHandle {
            name: format!("task-{}", self.scheduled.lock().unwrap().len()),
            path: "/challenge".to_string(),
            enqueued_at: now,
            expires_at: now + chrono::Duration::minutes(20),
        })
    }
}

/// A Notifier that records every delivered record
#[derive(Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<VerificationRecord>>,
    fail: bool,
    status: u16,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::answering(200)
    }

    /// A notifier whose callback endpoint answers with `status`
    pub fn answering(status: u16) -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
            fail: false,
            status,
        }
    }

    /// A notifier whose callback endpoint is unreachable
    pub fn unreachable() -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
            fail: true,
            status: 0,
        }
    }

    pub fn delivered(&self) -> Vec<VerificationRecord> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, record: &VerificationRecord) -> Result<CallbackResponse> {
        self.delivered.lock().unwrap().push(record.clone());

        if self.fail {
            return Err(Error::notify(format!(
                "connection refused: {}",
                record.callback_url
            )));
        }

        Ok(CallbackResponse {
            status: self.status,
            body: String::new(),
        })
    }
}

/// One delivery seen by the ScriptedDispatcher
#[derive(Debug, Clone)]
pub struct Attempt {
    pub at: tokio::time::Instant,
    pub retry_count: u32,
    pub path: String,
    pub payload: Vec<u8>,
}

/// A TaskDispatcher answering from a script of statuses
///
/// Once the script runs out, the last entry repeats. `None` entries
/// simulate a transport failure.
pub struct ScriptedDispatcher {
    script: Mutex<VecDeque<Option<u16>>>,
    last: Mutex<Option<u16>>,
    attempts: Mutex<Vec<Attempt>>,
}

impl ScriptedDispatcher {
    pub fn new(script: Vec<Option<u16>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(Some(200)),
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// A dispatcher that never succeeds
    pub fn always(status: u16) -> Self {
        Self::new(vec![Some(status)])
    }

    pub fn attempts(&self) -> Vec<Attempt> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskDispatcher for ScriptedDispatcher {
    async fn dispatch(&self, task: &Task) -> Result<u16> {
        self.attempts.lock().unwrap().push(Attempt {
            at: tokio::time::Instant::now(),
            retry_count: task.retry_count,
            path: task.path.clone(),
            payload: task.payload.clone(),
        });

        let next = {
            let mut script = self.script.lock().unwrap();
            let mut last = self.last.lock().unwrap();
            if let Some(entry) = script.pop_front() {
                *last = entry;
            }
            *last
        };

        next.ok_or_else(|| Error::http("connection reset"))
    }
}

/// An ExpiryHandler that counts expired tasks
#[derive(Default)]
pub struct CountingExpiryHandler {
    expired: AtomicUsize,
    last: Mutex<Option<Task>>,
}

impl CountingExpiryHandler {
    pub fn expired(&self) -> usize {
        self.expired.load(Ordering::SeqCst)
    }

    pub fn last(&self) -> Option<Task> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExpiryHandler for CountingExpiryHandler {
    async fn on_expired(&self, task: &Task) {
        self.expired.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(task.clone());
    }
}

/// Collaborators of a Verifier under test
pub struct Harness {
    pub verifier: Verifier,
    pub events: tokio::sync::mpsc::Receiver<VerificationEvent>,
    pub checker: Arc<ScriptedChecker>,
    pub scheduler: Arc<RecordingScheduler>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new(lookup: Lookup, notifier: RecordingNotifier) -> Self {
        Self::with_scheduler(lookup, notifier, RecordingScheduler::new())
    }

    pub fn with_scheduler(
        lookup: Lookup,
        notifier: RecordingNotifier,
        scheduler: RecordingScheduler,
    ) -> Self {
        let checker = Arc::new(ScriptedChecker::new(lookup));
        let scheduler = Arc::new(scheduler);
        let notifier = Arc::new(notifier);

        let (verifier, events) = Verifier::new(
            checker.clone(),
            scheduler.clone(),
            notifier.clone(),
            &VeriflyConfig::default(),
        )
        .expect("verifier construction succeeds");

        Self {
            verifier,
            events,
            checker,
            scheduler,
            notifier,
        }
    }

    /// Drain all events emitted so far
    pub fn drain_events(&mut self) -> Vec<VerificationEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

/// A record as enqueued by a previous submission
pub fn pending_record(challenge: &str) -> VerificationRecord {
    VerificationRecord::new("example.com", "https://cb/x").with_challenge(challenge)
}

/// Wait (in virtual time) until the queue has no pending task
pub async fn wait_until_idle(queue: &verifly_core::TaskQueue) {
    while queue.pending() > 0 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
}
