// # Proof Checker Trait
//
// Defines the interface for deciding whether a challenge token is currently
// published as a DNS TXT record at a domain.
//
// ## Implementations
//
// - Direct resolver: `verifly-checker-resolver` crate
// - DNS-over-HTTPS: `verifly-checker-doh` crate (for runtimes without raw
//   UDP/TCP socket access)
//
// ## Usage
//
// ```rust,ignore
// use verifly_core::ProofChecker;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let checker = /* ProofChecker implementation */;
//
//     let found = checker
//         .check("example.com", "verifly-site-verification=abc123")
//         .await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// Trait for proof checker implementations
///
/// # Contract
///
/// - `Ok(true)`: at least one TXT record at `domain` equals `challenge`
///   exactly (case-sensitive, no normalization beyond the transport's own
///   quoting)
/// - `Ok(false)`: the lookup succeeded and no record matched, including
///   the "no records" and NXDOMAIN cases
/// - `Err(_)`: the lookup was inconclusive (transport failure, malformed
///   response, resolver-reported failure)
///
/// An error must never be reported as `Ok(false)`. The orchestrator treats
/// errors as inconclusive attempts and leaves the record untouched.
///
/// # Trust Level: Untrusted
///
/// Checkers are isolated and single-shot:
/// - ✅ Perform one lookup per call, bounded by a timeout
/// - ❌ Retry or back off (owned by the task queue)
/// - ❌ Mutate the verification record (owned by `Verifier`)
/// - ❌ Spawn tasks
///
/// Two calls with the same arguments against unchanged DNS must return the
/// same answer.
#[async_trait]
pub trait ProofChecker: Send + Sync {
    /// Check whether `challenge` is published as a TXT record at `domain`
    async fn check(&self, domain: &str, challenge: &str) -> Result<bool, crate::Error>;

    /// Get the strategy name (for logging/debugging)
    fn strategy_name(&self) -> &'static str;
}

/// Helper trait for constructing proof checkers from configuration
pub trait ProofCheckerFactory: Send + Sync {
    /// Create a ProofChecker instance from configuration
    fn create(
        &self,
        config: &crate::config::CheckerConfig,
    ) -> Result<Box<dyn ProofChecker>, crate::Error>;
}

/// Returns true iff any record equals the challenge exactly
///
/// Shared by checker strategies once they have turned their answers into
/// plain strings.
pub fn contains_challenge<I, S>(records: I, challenge: &str) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    records.into_iter().any(|txt| txt.as_ref() == challenge)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_challenge_exact() {
        let records = ["v=spf1 -all", "verifly-site-verification=abc123"];

        assert!(contains_challenge(records, "verifly-site-verification=abc123"));
        assert!(!contains_challenge(records, "verifly-site-verification=ABC123"));
        assert!(!contains_challenge(records, "verifly-site-verification=abc"));
    }

    #[test]
    fn test_contains_challenge_no_trimming() {
        let records = vec![" verifly-site-verification=abc123".to_string()];
        assert!(!contains_challenge(&records, "verifly-site-verification=abc123"));
    }

    #[test]
    fn test_contains_challenge_empty() {
        assert!(!contains_challenge(Vec::<String>::new(), "anything"));
    }
}
