// # HTTP Callback Notifier
//
// This crate provides the `Notifier` that delivers a verification outcome
// to the caller's callback URL.
//
// ## Request
//
// ```http
// POST <callback_url>
// Content-Type: application/json
//
// {"domain":"example.com","challenge":"verifly-site-verification=...","verified":true,"callback_url":"..."}
// ```
//
// ## Delivery Semantics
//
// - One POST per call, bounded by the configured timeout
// - The response status and body are returned as-is; interpreting a non-2xx
//   answer is the caller's decision
// - `Err(_)` only when no response was obtained (malformed URL, connection
//   failure, timeout)
// - No retries: delivery is best effort, and callers must tolerate
//   duplicate notifications because checks are delivered at least once
//
// ### Trust Level: Untrusted (Notifier)
//
// Response bodies are never logged, only their length.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use verifly_core::config::NotifierConfig;
use verifly_core::traits::{CallbackResponse, Notifier};
use verifly_core::{Error, Result, VerificationRecord};

/// Default HTTP timeout for callback requests (10 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts verification records to their callback URL
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
}

impl HttpNotifier {
    /// Create a notifier with the default timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_HTTP_TIMEOUT)
    }

    /// Create a notifier with a custom per-request timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Create a notifier from configuration
    pub fn from_config(config: &NotifierConfig) -> Result<Self> {
        Self::with_timeout(Duration::from_secs(config.timeout_secs))
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, record: &VerificationRecord) -> Result<CallbackResponse> {
        let url = reqwest::Url::parse(&record.callback_url).map_err(|e| {
            Error::notify(format!(
                "Invalid callback URL '{}': {}",
                record.callback_url, e
            ))
        })?;

        let body = record.to_json()?;

        debug!(
            "Posting {} record for {} to {}",
            if record.verified { "verified" } else { "unverified" },
            record.domain,
            url
        );

        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                Error::notify(format!(
                    "Callback request to {} failed: {}",
                    record.callback_url, e
                ))
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        debug!(
            "Callback for {} answered {} ({} byte body)",
            record.domain,
            status,
            body.len()
        );

        Ok(CallbackResponse { status, body })
    }
}
