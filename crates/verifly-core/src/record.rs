// # Verification Record
//
// The only entity in the system. A record is created at submission, carried
// as the task payload across every retry, and discarded at its terminal
// outcome. It has no identity beyond the task carrying it.
//
// ## Wire Contract
//
// The JSON field names `domain`, `challenge`, `verified` and `callback_url`
// are consumed by external callers and must not change.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Maximum length of a domain name (RFC 1035)
const MAX_DOMAIN_LEN: usize = 253;

/// A single domain-ownership verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    /// Fully-qualified domain name to verify
    pub domain: String,

    /// Token that must appear in a TXT record at `domain`
    ///
    /// Empty until assigned at submission, immutable afterwards.
    #[serde(default)]
    pub challenge: String,

    /// Whether the challenge has been observed in DNS
    #[serde(default)]
    pub verified: bool,

    /// Absolute URL the final record is posted to
    pub callback_url: String,
}

impl VerificationRecord {
    /// Create a new, unverified record without a challenge
    pub fn new(domain: impl Into<String>, callback_url: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            challenge: String::new(),
            verified: false,
            callback_url: callback_url.into(),
        }
    }

    /// Set an explicit challenge
    pub fn with_challenge(mut self, challenge: impl Into<String>) -> Self {
        self.challenge = challenge.into();
        self
    }

    /// Decode a record from a request or task body
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Encode the record as task payload / callback body
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Whether a challenge still has to be generated
    pub fn needs_challenge(&self) -> bool {
        self.challenge.is_empty()
    }

    /// Validate a record received at submission time
    pub fn validate(&self) -> Result<()> {
        let domain = self.domain.trim();
        if domain.is_empty() {
            return Err(Error::invalid_input("domain cannot be empty"));
        }
        if domain.chars().any(char::is_whitespace) {
            return Err(Error::invalid_input(format!(
                "domain '{}' contains whitespace",
                domain
            )));
        }
        if domain.len() > MAX_DOMAIN_LEN {
            return Err(Error::invalid_input(format!(
                "domain too long: {} chars (max {})",
                domain.len(),
                MAX_DOMAIN_LEN
            )));
        }

        let callback = url::Url::parse(&self.callback_url).map_err(|e| {
            Error::invalid_input(format!("callback_url '{}' is invalid: {}", self.callback_url, e))
        })?;
        match callback.scheme() {
            "http" | "https" => Ok(()),
            other => Err(Error::invalid_input(format!(
                "callback_url must use http or https, got '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_without_challenge() {
        let record = VerificationRecord::from_json(
            br#"{"domain":"example.com","callback_url":"https://cb/x"}"#,
        )
        .unwrap();

        assert_eq!(record.domain, "example.com");
        assert!(record.needs_challenge());
        assert!(!record.verified);
        assert_eq!(record.callback_url, "https://cb/x");
    }

    #[test]
    fn test_wire_field_names() {
        let record = VerificationRecord::new("example.com", "https://cb/x").with_challenge("abc");
        let value: serde_json::Value = serde_json::from_slice(&record.to_json().unwrap()).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "domain": "example.com",
                "challenge": "abc",
                "verified": false,
                "callback_url": "https://cb/x",
            })
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(VerificationRecord::from_json(b"not json").is_err());
        assert!(VerificationRecord::from_json(br#"{"domain":"example.com"}"#).is_err());
    }

    #[test]
    fn test_validate() {
        assert!(VerificationRecord::new("example.com", "https://cb/x").validate().is_ok());
        assert!(VerificationRecord::new("  ", "https://cb/x").validate().is_err());
        assert!(VerificationRecord::new("example.com", "not a url").validate().is_err());
        assert!(VerificationRecord::new("example.com", "ftp://cb/x").validate().is_err());
        assert!(VerificationRecord::new("a".repeat(254), "https://cb/x").validate().is_err());
        assert!(VerificationRecord::new("example .com", "https://cb/x").validate().is_err());
        assert!(VerificationRecord::new(" example.com\n", "https://cb/x").validate().is_ok());
    }
}
