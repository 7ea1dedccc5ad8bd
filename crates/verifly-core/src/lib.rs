// # verifly-core
//
// Core library for asynchronous DNS TXT domain-ownership verification.
//
// ## Architecture Overview
//
// - **VerificationRecord**: The only entity, carried as task payload
// - **ChallengeGenerator**: Issues unique, prefixed challenge tokens
// - **ProofChecker**: Trait for deciding whether a challenge is published in DNS
// - **RetryScheduler**: Trait for enqueueing checks with bounded age and backoff
// - **TaskQueue**: In-process RetryScheduler driven by a RetryPolicy
// - **Notifier**: Trait for delivering the outcome to the callback URL
// - **Verifier**: Orchestrator exposing submit and perform-one-check
// - **CheckerRegistry**: Plugin-based registry for checker strategies
//
// ## Design Principles
//
// 1. **Stateless Checks**: All state lives in the task payload
// 2. **Scheduler-Owned Retry**: Checks report status, the queue decides when to retry
// 3. **Injected Collaborators**: No global clients or route singletons
// 4. **Inconclusive ≠ Absent**: Lookup errors never change `verified`

pub mod challenge;
pub mod config;
pub mod error;
pub mod queue;
pub mod record;
pub mod registry;
pub mod traits;
pub mod verifier;

// Re-export core types for convenience
pub use challenge::ChallengeGenerator;
pub use config::{CheckerConfig, NotifierConfig, SchedulerConfig, VeriflyConfig};
pub use error::{Error, Result};
pub use queue::{RetryPolicy, TaskQueue};
pub use record::VerificationRecord;
pub use registry::CheckerRegistry;
pub use traits::{Notifier, ProofChecker, RetryScheduler, TaskDispatcher};
pub use verifier::{CheckOutcome, ExpiryNotifier, Submission, VerificationEvent, Verifier};
