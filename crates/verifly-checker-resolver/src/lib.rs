// # Resolver Proof Checker
//
// This crate provides a `ProofChecker` that queries DNS directly with
// hickory-resolver.
//
// ## Nameserver Selection
//
// - No nameservers configured: the host system configuration is used
//   (`/etc/resolv.conf` on Unix), falling back to hickory's defaults when it
//   cannot be read
// - Explicit nameservers: queried over UDP (TCP on truncation), port 53
//
// ## Answer Handling
//
// The character-strings of each TXT record are concatenated into a single
// value before the exact comparison, so challenges split across 255-byte
// strings still match.
//
// "No records" and NXDOMAIN answers mean the challenge is not published
// (`Ok(false)`). Every other failure (timeout, SERVFAIL, REFUSED, no
// reachable nameserver) is an error: the check is inconclusive.
//
// ### Trust Level: Untrusted (Checker)
//
// Caching is disabled so every check observes the current zone contents.
// No retries beyond the resolver's own per-query attempts.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfig, ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::xfer::Protocol;
use hickory_resolver::{ResolveError, TokioResolver};
use tracing::{debug, warn};

use verifly_core::config::CheckerConfig;
use verifly_core::registry::CheckerRegistry;
use verifly_core::traits::{ProofChecker, ProofCheckerFactory, contains_challenge};
use verifly_core::{Error, Result};

/// Standard DNS port
const DNS_PORT: u16 = 53;

/// Default per-lookup timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Proof checker backed by a direct DNS resolver
pub struct ResolverChecker {
    resolver: TokioResolver,

    /// Upper bound for a whole lookup, all attempts included
    timeout: Duration,
}

impl ResolverChecker {
    /// Create a checker using the host system DNS configuration
    pub fn system(timeout: Duration) -> Self {
        let resolver = match TokioResolver::builder_tokio() {
            Ok(mut builder) => {
                apply_options(builder.options_mut(), timeout);
                builder.build()
            }
            Err(e) => {
                warn!(
                    "Failed to load system DNS configuration, falling back to defaults: {}",
                    e
                );
                let mut opts = ResolverOpts::default();
                apply_options(&mut opts, timeout);
                TokioResolver::builder_with_config(
                    ResolverConfig::default(),
                    TokioConnectionProvider::default(),
                )
                .with_options(opts)
                .build()
            }
        };

        Self { resolver, timeout }
    }

    /// Create a checker querying explicit nameservers on port 53
    pub fn with_nameservers(nameservers: &[IpAddr], timeout: Duration) -> Self {
        let addrs: Vec<SocketAddr> = nameservers
            .iter()
            .map(|ip| SocketAddr::new(*ip, DNS_PORT))
            .collect();
        Self::with_socket_addrs(&addrs, timeout)
    }

    /// Create a checker querying explicit nameserver addresses
    ///
    /// Each address is tried over UDP first, then TCP.
    pub fn with_socket_addrs(addrs: &[SocketAddr], timeout: Duration) -> Self {
        let mut config = ResolverConfig::new();
        for addr in addrs {
            config.add_name_server(NameServerConfig::new(*addr, Protocol::Udp));
            config.add_name_server(NameServerConfig::new(*addr, Protocol::Tcp));
        }

        let mut opts = ResolverOpts::default();
        apply_options(&mut opts, timeout);

        let resolver =
            TokioResolver::builder_with_config(config, TokioConnectionProvider::default())
                .with_options(opts)
                .build();

        Self { resolver, timeout }
    }

    /// Look up the TXT values published at `domain`
    ///
    /// Returns an empty list when the name has no TXT records or does not
    /// exist.
    async fn lookup_txt(&self, domain: &str) -> Result<Vec<String>> {
        let lookup = tokio::time::timeout(self.timeout, self.resolver.txt_lookup(domain))
            .await
            .map_err(|_| {
                Error::lookup(format!(
                    "TXT lookup for {} timed out after {:?}",
                    domain, self.timeout
                ))
            })?;

        match lookup {
            Ok(records) => Ok(records
                .iter()
                .map(|txt| {
                    txt.iter()
                        .map(|data| String::from_utf8_lossy(data))
                        .collect::<String>()
                })
                .collect()),
            Err(e) if is_absent(&e) => {
                debug!("No TXT records at {}: {}", domain, e);
                Ok(Vec::new())
            }
            Err(e) => Err(Error::lookup(format!(
                "TXT lookup for {} failed: {}",
                domain, e
            ))),
        }
    }
}

#[async_trait]
impl ProofChecker for ResolverChecker {
    async fn check(&self, domain: &str, challenge: &str) -> Result<bool> {
        let values = self.lookup_txt(domain).await.inspect_err(|e| {
            warn!("Resolver lookup for {} was inconclusive: {}", domain, e);
        })?;

        debug!("Resolver: {} has {} TXT record(s)", domain, values.len());
        Ok(contains_challenge(&values, challenge))
    }

    fn strategy_name(&self) -> &'static str {
        "resolver"
    }
}

fn apply_options(opts: &mut ResolverOpts, timeout: Duration) {
    opts.timeout = timeout;
    opts.attempts = 2;
    opts.cache_size = 0;
}

/// Whether a resolver error means "nothing published" rather than a failure
fn is_absent(error: &ResolveError) -> bool {
    error.is_no_records_found() || error.is_nx_domain()
}

/// Factory for creating resolver checkers
pub struct ResolverCheckerFactory;

impl ProofCheckerFactory for ResolverCheckerFactory {
    fn create(&self, config: &CheckerConfig) -> Result<Box<dyn ProofChecker>> {
        match config {
            CheckerConfig::Resolver {
                nameservers,
                timeout_secs,
            } => {
                let timeout = if *timeout_secs == 0 {
                    DEFAULT_TIMEOUT
                } else {
                    Duration::from_secs(*timeout_secs)
                };

                if nameservers.is_empty() {
                    Ok(Box::new(ResolverChecker::system(timeout)))
                } else {
                    Ok(Box::new(ResolverChecker::with_nameservers(
                        nameservers,
                        timeout,
                    )))
                }
            }
            _ => Err(Error::config("Invalid config for resolver checker")),
        }
    }
}

/// Register the resolver checker with a registry
pub fn register(registry: &CheckerRegistry) {
    registry.register_checker("resolver", Box::new(ResolverCheckerFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_factory_creation() {
        let factory = ResolverCheckerFactory;

        let config = CheckerConfig::Resolver {
            nameservers: vec!["1.1.1.1".parse().unwrap(), "9.9.9.9".parse().unwrap()],
            timeout_secs: 5,
        };

        let checker = factory.create(&config).unwrap();
        assert_eq!(checker.strategy_name(), "resolver");
    }

    #[tokio::test]
    async fn test_factory_system_configuration() {
        let factory = ResolverCheckerFactory;

        let config = CheckerConfig::Resolver {
            nameservers: vec![],
            timeout_secs: 5,
        };

        assert!(factory.create(&config).is_ok());
    }

    #[test]
    fn test_factory_rejects_other_config() {
        let factory = ResolverCheckerFactory;
        assert!(factory.create(&CheckerConfig::default()).is_err());
    }

    #[test]
    fn test_register() {
        let registry = CheckerRegistry::new();
        register(&registry);

        assert!(registry.has_checker("resolver"));
        assert!(!registry.has_checker("doh"));
    }
}
