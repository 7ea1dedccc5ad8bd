// # Notifier Trait
//
// Defines the interface for delivering a verification outcome to the
// caller-supplied callback URL.
//
// ## Implementations
//
// - HTTP POST: `verifly-notifier-http` crate

use async_trait::async_trait;

use crate::record::VerificationRecord;

/// Raw response returned by the callback endpoint
///
/// The notifier does not interpret the status; that is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body (may be empty)
    pub body: String,
}

impl CallbackResponse {
    /// Whether the callback endpoint answered with a 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for callback notifier implementations
///
/// # Contract
///
/// - Serialize the record to JSON and POST it to `record.callback_url`
/// - Return `Err(_)` only when no response was obtained (malformed URL,
///   connection failure, timeout)
/// - Never retry; delivery is best effort and at-least-once from the
///   caller's point of view
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver the record to its callback URL
    async fn notify(&self, record: &VerificationRecord) -> Result<CallbackResponse, crate::Error>;
}
