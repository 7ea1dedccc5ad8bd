//! Verification orchestrator
//!
//! The Verifier is responsible for:
//! - Accepting submissions and assigning challenges
//! - Handing the first check to the RetryScheduler
//! - Running single checks via the ProofChecker
//! - Notifying the callback URL once the challenge is observed
//!
//! ## Architecture
//!
//! ```text
//!   submit()                                   perform_check()
//!      │                                              │
//!      ▼                                              ▼
//! ┌──────────────┐   schedule()   ┌──────────────┐  check()  ┌──────────────┐
//! │  Verifier    │───────────────▶│RetryScheduler│           │ ProofChecker │
//! └──────────────┘                └──────────────┘           └──────────────┘
//!                                        │  redelivers until 2xx    ▲
//!                                        └───── or age limit ───────┘
//!                                                                    │ found
//!                                                                    ▼
//!                                                            ┌──────────────┐
//!                                                            │   Notifier   │
//!                                                            └──────────────┘
//! ```
//!
//! ## State Machine
//!
//! `Submitted → Pending-Check → {Verified, Unverified-Retry, Expired}`
//!
//! The Verifier holds no state between calls; every check receives the
//! whole record as its input. Retrying is left entirely to the scheduler,
//! driven by the status code of each check.

pub mod expiry;

pub use expiry::ExpiryNotifier;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::challenge::ChallengeGenerator;
use crate::config::VeriflyConfig;
use crate::error::{Error, Result};
use crate::record::VerificationRecord;
use crate::traits::{CallbackResponse, Notifier, ProofChecker, RetryScheduler, TaskHandle};

/// Events emitted by the Verifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationEvent {
    /// Record accepted and first check enqueued
    Submitted {
        domain: String,
        challenge: String,
        task_name: String,
    },

    /// A single check started
    CheckStarted { domain: String, challenge: String },

    /// Challenge observed and callback delivered
    Verified { domain: String, callback_status: u16 },

    /// Check delivered for a record that was already verified
    AlreadyVerified { domain: String },

    /// Challenge not (yet) published
    NotFound { domain: String },

    /// Lookup was inconclusive
    CheckFailed { domain: String, error: String },

    /// Challenge observed, but the callback could not be delivered
    NotifyFailed { domain: String, error: String },
}

/// Result of a successful submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// The record with its challenge assigned
    pub record: VerificationRecord,
    /// The enqueued check task
    pub task: TaskHandle,
}

/// Result of a single check
#[derive(Debug)]
pub enum CheckOutcome {
    /// Challenge found and callback delivered (terminal)
    Verified {
        record: VerificationRecord,
        callback: CallbackResponse,
    },

    /// Record arrived already verified (terminal, nothing done)
    AlreadyVerified { record: VerificationRecord },

    /// Lookup succeeded, challenge absent; record unchanged
    NotFound { record: VerificationRecord },

    /// Lookup inconclusive; record unchanged
    CheckFailed {
        record: VerificationRecord,
        error: Error,
    },

    /// Challenge found, callback delivery failed (terminal, best effort)
    NotifyFailed {
        record: VerificationRecord,
        error: Error,
    },
}

impl CheckOutcome {
    /// HTTP status the check endpoint answers with
    ///
    /// The scheduler retries anything that is not 2xx, so only terminal
    /// outcomes map to 200.
    pub fn status_code(&self) -> u16 {
        match self {
            CheckOutcome::Verified { .. } | CheckOutcome::AlreadyVerified { .. } => 200,
            CheckOutcome::NotFound { .. } => 404,
            CheckOutcome::CheckFailed { .. } => 500,
            CheckOutcome::NotifyFailed { .. } => 502,
        }
    }

    /// The record as it stands after the check
    pub fn record(&self) -> &VerificationRecord {
        match self {
            CheckOutcome::Verified { record, .. }
            | CheckOutcome::AlreadyVerified { record }
            | CheckOutcome::NotFound { record }
            | CheckOutcome::CheckFailed { record, .. }
            | CheckOutcome::NotifyFailed { record, .. } => record,
        }
    }

    /// Whether the record's DNS proof was confirmed
    pub fn is_verified(&self) -> bool {
        self.record().verified
    }
}

/// Verification orchestrator
///
/// Built from injected collaborators; one instance serves all concurrent
/// submissions and checks.
///
/// ## Lifecycle
///
/// 1. Create with [`Verifier::new()`]
/// 2. Call [`Verifier::submit()`] for every client request
/// 3. Call [`Verifier::perform_check()`] for every task delivery
pub struct Verifier {
    /// Proof checker strategy
    checker: Arc<dyn ProofChecker>,

    /// Scheduler for check tasks
    scheduler: Arc<dyn RetryScheduler>,

    /// Callback notifier
    notifier: Arc<dyn Notifier>,

    /// Challenge generator
    challenges: ChallengeGenerator,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<VerificationEvent>,
}

impl Verifier {
    /// Create a new Verifier
    ///
    /// # Returns
    ///
    /// A tuple of (verifier, event_receiver) where event_receiver yields verification events
    pub fn new(
        checker: Arc<dyn ProofChecker>,
        scheduler: Arc<dyn RetryScheduler>,
        notifier: Arc<dyn Notifier>,
        config: &VeriflyConfig,
    ) -> Result<(Self, mpsc::Receiver<VerificationEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let verifier = Self {
            checker,
            scheduler,
            notifier,
            challenges: ChallengeGenerator::new(config.challenge_prefix.clone()),
            event_tx: tx,
        };

        Ok((verifier, rx))
    }

    /// Submit a record for verification
    ///
    /// Validates the record, trims surrounding whitespace off the domain,
    /// assigns a challenge when none was supplied and enqueues the first check. A caller-supplied challenge is kept as is.
    ///
    /// # Returns
    ///
    /// - `Ok(Submission)`: record with challenge, and the enqueued task
    /// - `Err(Error::InvalidInput)`: record rejected, nothing enqueued
    /// - `Err(_)`: the scheduler failed
    pub async fn submit(&self, mut record: VerificationRecord) -> Result<Submission> {
        record.validate()?;

        record.domain = record.domain.trim().to_string();
        record.verified = false;
        if record.needs_challenge() {
            record.challenge = self.challenges.generate();
            debug!("Assigned challenge {} to {}", record.challenge, record.domain);
        }

        let task = self.scheduler.schedule(&record).await.inspect_err(|e| {
            error!("Failed to schedule check for {}: {}", record.domain, e);
        })?;

        info!("Verification of {} submitted as task {}", record.domain, task.name);
        self.emit_event(VerificationEvent::Submitted {
            domain: record.domain.clone(),
            challenge: record.challenge.clone(),
            task_name: task.name.clone(),
        });

        Ok(Submission { record, task })
    }

    /// Perform one check of a record
    ///
    /// Never fails: every failure is folded into the returned outcome so the
    /// caller can answer the scheduler with a status code.
    pub async fn perform_check(&self, mut record: VerificationRecord) -> CheckOutcome {
        if record.verified {
            debug!("Record for {} already verified, nothing to do", record.domain);
            self.emit_event(VerificationEvent::AlreadyVerified {
                domain: record.domain.clone(),
            });
            return CheckOutcome::AlreadyVerified { record };
        }

        self.emit_event(VerificationEvent::CheckStarted {
            domain: record.domain.clone(),
            challenge: record.challenge.clone(),
        });

        let found = match self.checker.check(&record.domain, &record.challenge).await {
            Ok(found) => found,
            Err(e) => {
                warn!(
                    "Check for {} via {} was inconclusive: {}",
                    record.domain,
                    self.checker.strategy_name(),
                    e
                );
                self.emit_event(VerificationEvent::CheckFailed {
                    domain: record.domain.clone(),
                    error: e.to_string(),
                });
                return CheckOutcome::CheckFailed { record, error: e };
            }
        };

        if !found {
            debug!("Challenge for {} not published yet", record.domain);
            self.emit_event(VerificationEvent::NotFound {
                domain: record.domain.clone(),
            });
            return CheckOutcome::NotFound { record };
        }

        record.verified = true;
        info!("Challenge for {} observed", record.domain);

        match self.notifier.notify(&record).await {
            Ok(callback) => {
                if !callback.is_success() {
                    warn!(
                        "Callback for {} answered with status {}",
                        record.domain, callback.status
                    );
                }
                self.emit_event(VerificationEvent::Verified {
                    domain: record.domain.clone(),
                    callback_status: callback.status,
                });
                CheckOutcome::Verified { record, callback }
            }
            Err(e) => {
                warn!("Could not notify caller for {}: {}", record.domain, e);
                self.emit_event(VerificationEvent::NotifyFailed {
                    domain: record.domain.clone(),
                    error: e.to_string(),
                });
                CheckOutcome::NotifyFailed { record, error: e }
            }
        }
    }

    /// Emit a verification event
    fn emit_event(&self, event: VerificationEvent) {
        if let Err(mpsc::error::TrySendError::Full(_)) = self.event_tx.try_send(event) {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}
