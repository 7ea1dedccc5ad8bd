// # DNS-over-HTTPS Proof Checker
//
// This crate provides a `ProofChecker` that reads TXT records through a
// DNS-over-HTTPS JSON endpoint (Cloudflare, Google and Quad9 all speak the
// same `application/dns-json` dialect).
//
// ## Purpose
//
// Use this strategy where raw DNS sockets are unavailable or filtered
// (sandboxed platforms, restrictive egress). On hosts with working DNS the
// `resolver` strategy avoids the extra HTTPS hop.
//
// ## Request
//
// ```http
// GET /dns-query?name=example.com&type=TXT
// accept: application/dns-json
// ```
//
// ## Response Handling
//
// - `Status` 0 (NOERROR) and 3 (NXDOMAIN) are answers; any other status is
//   a resolver failure and the check is inconclusive
// - Answers whose `type` is not 16 (TXT) are ignored (CNAME chains)
// - Each `data` value has exactly one leading and one trailing `"` removed
//   before the exact comparison
//
// ### Trust Level: Untrusted (Checker)
//
// Single request per check. No retries, no caching, no background tasks.
// Retry decisions belong to the task queue.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use verifly_core::config::{CheckerConfig, DEFAULT_DOH_URL};
use verifly_core::registry::CheckerRegistry;
use verifly_core::traits::{ProofChecker, ProofCheckerFactory, contains_challenge};
use verifly_core::{Error, Result};

/// DNS record type number for TXT
const TXT_RECORD_TYPE: u16 = 16;

/// Response code for NOERROR
const RCODE_NOERROR: u32 = 0;

/// Response code for NXDOMAIN
const RCODE_NXDOMAIN: u32 = 3;

/// Default per-request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// DoH JSON response (the subset we read)
#[derive(Debug, Deserialize)]
struct DohResponse {
    #[serde(rename = "Status", default)]
    status: u32,

    #[serde(rename = "Answer", default)]
    answer: Vec<DohAnswer>,
}

#[derive(Debug, Deserialize)]
struct DohAnswer {
    #[serde(rename = "type", default)]
    record_type: Option<u16>,

    #[serde(default)]
    data: String,
}

/// Proof checker backed by a DNS-over-HTTPS JSON endpoint
#[derive(Debug, Clone)]
pub struct DohChecker {
    /// DoH endpoint URL
    url: String,

    /// HTTP client (carries the per-request timeout)
    client: reqwest::Client,
}

impl DohChecker {
    /// Create a checker against `url` with the default timeout
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    /// Create a checker against `url` with a custom per-request timeout
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// The configured endpoint
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the TXT values published at `domain`, quotes stripped
    async fn fetch_txt(&self, domain: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("name", domain), ("type", "TXT")])
            .header("accept", "application/dns-json")
            .send()
            .await
            .map_err(|e| Error::http(format!("DoH request for {} failed: {}", domain, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::http(format!(
                "DoH endpoint answered {} for {}",
                status, domain
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::http(format!("Failed to read DoH response: {}", e)))?;

        let parsed: DohResponse = serde_json::from_slice(&body)
            .map_err(|e| Error::malformed(format!("DoH response for {}: {}", domain, e)))?;

        match parsed.status {
            RCODE_NOERROR => {}
            RCODE_NXDOMAIN => {
                debug!("DoH: {} does not exist (NXDOMAIN)", domain);
                return Ok(Vec::new());
            }
            rcode => {
                return Err(Error::resolver(format!(
                    "DoH resolver reported status {} for {}",
                    rcode, domain
                )));
            }
        }

        Ok(parsed
            .answer
            .into_iter()
            .filter(|answer| answer.record_type.is_none_or(|t| t == TXT_RECORD_TYPE))
            .map(|answer| strip_quotes(&answer.data).to_string())
            .collect())
    }
}

#[async_trait]
impl ProofChecker for DohChecker {
    async fn check(&self, domain: &str, challenge: &str) -> Result<bool> {
        let values = self.fetch_txt(domain).await.inspect_err(|e| {
            warn!("DoH lookup for {} was inconclusive: {}", domain, e);
        })?;

        debug!("DoH: {} has {} TXT value(s)", domain, values.len());
        Ok(contains_challenge(&values, challenge))
    }

    fn strategy_name(&self) -> &'static str {
        "doh"
    }
}

/// Remove exactly one leading and one trailing double quote, if present
///
/// DoH endpoints return TXT data in presentation format (`"\"token\""`).
/// Inner quotes and whitespace are left alone.
pub fn strip_quotes(data: &str) -> &str {
    let data = data.strip_prefix('"').unwrap_or(data);
    data.strip_suffix('"').unwrap_or(data)
}

/// Factory for creating DoH checkers
pub struct DohCheckerFactory;

impl ProofCheckerFactory for DohCheckerFactory {
    fn create(&self, config: &CheckerConfig) -> Result<Box<dyn ProofChecker>> {
        match config {
            CheckerConfig::Doh { url, timeout_secs } => {
                let url = if url.is_empty() { DEFAULT_DOH_URL } else { url };
                Ok(Box::new(DohChecker::with_timeout(
                    url,
                    Duration::from_secs(*timeout_secs),
                )?))
            }
            _ => Err(Error::config("Invalid config for DoH checker")),
        }
    }
}

/// Register the DoH checker with a registry
pub fn register(registry: &CheckerRegistry) {
    registry.register_checker("doh", Box::new(DohCheckerFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("\"abc\""), "abc");
        assert_eq!(strip_quotes("abc"), "abc");
        assert_eq!(strip_quotes("\"abc"), "abc");
        assert_eq!(strip_quotes("abc\""), "abc");
        assert_eq!(strip_quotes("\"\"abc\"\""), "\"abc\"");
        assert_eq!(strip_quotes("\""), "");
        assert_eq!(strip_quotes(" \"abc\" "), " \"abc\" ");
    }

    #[test]
    fn test_factory_creation() {
        let factory = DohCheckerFactory;

        let config = CheckerConfig::Doh {
            url: "https://dns.google/resolve".to_string(),
            timeout_secs: 5,
        };

        let checker = factory.create(&config).unwrap();
        assert_eq!(checker.strategy_name(), "doh");
    }

    #[test]
    fn test_factory_rejects_other_config() {
        let factory = DohCheckerFactory;

        let config = CheckerConfig::Resolver {
            nameservers: vec![],
            timeout_secs: 5,
        };

        assert!(factory.create(&config).is_err());
    }

    #[test]
    fn test_register() {
        let registry = CheckerRegistry::new();
        register(&registry);

        assert!(registry.has_checker("doh"));
        let checker = registry.create_checker(&CheckerConfig::default()).unwrap();
        assert_eq!(checker.strategy_name(), "doh");
    }

    #[test]
    fn test_response_parsing_defaults() {
        let parsed: DohResponse = serde_json::from_str(r#"{"Status":0}"#).unwrap();
        assert_eq!(parsed.status, 0);
        assert!(parsed.answer.is_empty());
    }
}
