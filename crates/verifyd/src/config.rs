//! Environment configuration for verifyd
//!
//! Configuration is read from environment variables only. Every value is
//! parsed and validated before the runtime starts, so a bad deployment
//! fails fast with a message naming the offending variable.

use anyhow::{Context, Result};
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use verifly_core::config::{
    CheckerConfig, DEFAULT_DOH_URL, NotifierConfig, SchedulerConfig, VeriflyConfig,
};

/// Default listen address
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub task_target: String,
    pub checker: String,
    pub doh_url: String,
    pub nameservers: Vec<IpAddr>,
    pub lookup_timeout_secs: u64,
    pub age_limit_secs: u64,
    pub min_backoff_secs: u64,
    pub max_backoff_secs: u64,
    pub notify_timeout_secs: u64,
    pub notify_on_expiry: bool,
    pub challenge_prefix: String,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let scheduler = SchedulerConfig::default();
        let notifier = NotifierConfig::default();

        let listen_addr: SocketAddr = parse(&var, "VERIFLY_LISTEN_ADDR")?
            .map_or_else(|| DEFAULT_LISTEN_ADDR.parse(), Ok)?;

        let task_target = var("VERIFLY_TASK_TARGET")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| loopback_target(listen_addr));

        let nameservers = var("VERIFLY_NAMESERVERS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<IpAddr>().with_context(|| {
                    format!("VERIFLY_NAMESERVERS entry '{}' is not an IP address", s)
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            listen_addr,
            task_target,
            checker: var("VERIFLY_CHECKER").unwrap_or_else(|| "doh".to_string()),
            doh_url: var("VERIFLY_DOH_URL").unwrap_or_else(|| DEFAULT_DOH_URL.to_string()),
            nameservers,
            lookup_timeout_secs: parse(&var, "VERIFLY_LOOKUP_TIMEOUT_SECS")?.unwrap_or(10),
            age_limit_secs: parse(&var, "VERIFLY_AGE_LIMIT_SECS")?
                .unwrap_or(scheduler.age_limit_secs),
            min_backoff_secs: parse(&var, "VERIFLY_MIN_BACKOFF_SECS")?
                .unwrap_or(scheduler.min_backoff_secs),
            max_backoff_secs: parse(&var, "VERIFLY_MAX_BACKOFF_SECS")?
                .unwrap_or(scheduler.max_backoff_secs),
            notify_timeout_secs: parse(&var, "VERIFLY_NOTIFY_TIMEOUT_SECS")?
                .unwrap_or(notifier.timeout_secs),
            notify_on_expiry: parse(&var, "VERIFLY_NOTIFY_ON_EXPIRY")?
                .unwrap_or(notifier.notify_on_expiry),
            challenge_prefix: var("VERIFLY_CHALLENGE_PREFIX")
                .unwrap_or_else(|| VeriflyConfig::default().challenge_prefix),
            log_level: var("VERIFLY_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        match self.checker.as_str() {
            "doh" | "resolver" => {}
            _ => anyhow::bail!(
                "VERIFLY_CHECKER '{}' is not supported. \
                Supported checkers: doh, resolver",
                self.checker
            ),
        }

        if !self.task_target.starts_with("http://") && !self.task_target.starts_with("https://")
        {
            anyhow::bail!(
                "VERIFLY_TASK_TARGET must use HTTP or HTTPS scheme. Got: {}",
                self.task_target
            );
        }

        if !(1..=300).contains(&self.lookup_timeout_secs) {
            anyhow::bail!(
                "VERIFLY_LOOKUP_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                self.lookup_timeout_secs
            );
        }

        if !(1..=300).contains(&self.notify_timeout_secs) {
            anyhow::bail!(
                "VERIFLY_NOTIFY_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                self.notify_timeout_secs
            );
        }

        if self.min_backoff_secs >= self.age_limit_secs {
            anyhow::bail!(
                "VERIFLY_MIN_BACKOFF_SECS ({}) must be below VERIFLY_AGE_LIMIT_SECS ({})",
                self.min_backoff_secs,
                self.age_limit_secs
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "VERIFLY_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        self.to_verifly_config()
            .validate()
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        Ok(())
    }

    /// Build the core configuration
    pub fn to_verifly_config(&self) -> VeriflyConfig {
        let checker = match self.checker.as_str() {
            "resolver" => CheckerConfig::Resolver {
                nameservers: self.nameservers.clone(),
                timeout_secs: self.lookup_timeout_secs,
            },
            _ => CheckerConfig::Doh {
                url: self.doh_url.clone(),
                timeout_secs: self.lookup_timeout_secs,
            },
        };

        VeriflyConfig {
            checker,
            scheduler: SchedulerConfig {
                age_limit_secs: self.age_limit_secs,
                min_backoff_secs: self.min_backoff_secs,
                max_backoff_secs: self.max_backoff_secs,
                ..SchedulerConfig::default()
            },
            notifier: NotifierConfig {
                timeout_secs: self.notify_timeout_secs,
                notify_on_expiry: self.notify_on_expiry,
            },
            challenge_prefix: self.challenge_prefix.clone(),
            ..VeriflyConfig::default()
        }
    }
}

/// Parse an optional variable, naming it in the error
fn parse<T, F>(var: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key).filter(|s| !s.trim().is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e)),
    }
}

/// Task target reaching this process on its own listener
fn loopback_target(listen_addr: SocketAddr) -> String {
    let host = match listen_addr.ip() {
        ip if ip.is_unspecified() && ip.is_ipv6() => "[::1]".to_string(),
        ip if ip.is_unspecified() => "127.0.0.1".to_string(),
        IpAddr::V6(ip) => format!("[{}]", ip),
        IpAddr::V4(ip) => ip.to_string(),
    };
    format!("http://{}:{}", host, listen_addr.port())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.listen_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.task_target, "http://127.0.0.1:8080");
        assert_eq!(config.checker, "doh");
        assert!(!config.notify_on_expiry);

        let core = config.to_verifly_config();
        assert_eq!(core.scheduler.age_limit_secs, 1200);
        assert_eq!(core.scheduler.min_backoff_secs, 5);
        assert_eq!(core.scheduler.task_path, "/challenge");
    }

    #[test]
    fn test_resolver_with_nameservers() {
        let config = config_from(&[
            ("VERIFLY_CHECKER", "resolver"),
            ("VERIFLY_NAMESERVERS", "1.1.1.1, 2606:4700:4700::1111"),
            ("VERIFLY_LOOKUP_TIMEOUT_SECS", "3"),
        ])
        .unwrap();

        assert!(config.validate().is_ok());
        match config.to_verifly_config().checker {
            CheckerConfig::Resolver {
                nameservers,
                timeout_secs,
            } => {
                assert_eq!(nameservers.len(), 2);
                assert_eq!(timeout_secs, 3);
            }
            other => panic!("unexpected checker: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_number_names_variable() {
        let err = config_from(&[("VERIFLY_MIN_BACKOFF_SECS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("VERIFLY_MIN_BACKOFF_SECS"));
    }

    #[test]
    fn test_invalid_nameserver() {
        let err = config_from(&[("VERIFLY_NAMESERVERS", "dns.google")]).unwrap_err();
        assert!(err.to_string().contains("VERIFLY_NAMESERVERS"));
    }

    #[test]
    fn test_unknown_checker_rejected() {
        let config = config_from(&[("VERIFLY_CHECKER", "whois")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backoff_must_fit_age_limit() {
        let config = config_from(&[
            ("VERIFLY_AGE_LIMIT_SECS", "5"),
            ("VERIFLY_MIN_BACKOFF_SECS", "5"),
        ])
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let config = config_from(&[("VERIFLY_LOG_LEVEL", "loud")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_expiry_notification_opt_in() {
        let config = config_from(&[("VERIFLY_NOTIFY_ON_EXPIRY", "true")]).unwrap();
        assert!(config.to_verifly_config().notifier.notify_on_expiry);
    }

    #[test]
    fn test_loopback_target() {
        assert_eq!(
            loopback_target("127.0.0.1:9000".parse().unwrap()),
            "http://127.0.0.1:9000"
        );
        assert_eq!(loopback_target("[::]:80".parse().unwrap()), "http://[::1]:80");
    }
}
