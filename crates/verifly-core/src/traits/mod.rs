//! Core traits for the verification system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`ProofChecker`]: Decide whether a challenge is published in DNS
//! - [`RetryScheduler`]: Enqueue checks with bounded age and backoff
//! - [`TaskDispatcher`]: Deliver queued tasks to the check endpoint
//! - [`Notifier`]: Deliver the outcome to the callback URL

pub mod notifier;
pub mod proof_checker;
pub mod retry_scheduler;

pub use notifier::{CallbackResponse, Notifier};
pub use proof_checker::{ProofChecker, ProofCheckerFactory, contains_challenge};
pub use retry_scheduler::{ExpiryHandler, RetryScheduler, Task, TaskDispatcher, TaskHandle};
