//! Challenge token generation
//!
//! Tokens are time-ordered UUIDs (v7) behind a namespace prefix, so a TXT
//! record is self-describing when a domain owner inspects their zone.

use uuid::Uuid;

/// Default namespace marker for generated challenges
pub const DEFAULT_CHALLENGE_PREFIX: &str = "verifly-site-verification=";

/// Produces unique challenge tokens
#[derive(Debug, Clone)]
pub struct ChallengeGenerator {
    prefix: String,
}

impl ChallengeGenerator {
    /// Create a generator with a custom prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The namespace prefix of every token
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Generate a new challenge token
    pub fn generate(&self) -> String {
        format!("{}{}", self.prefix, Uuid::now_v7())
    }
}

impl Default for ChallengeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_CHALLENGE_PREFIX)
    }
}
