//! Configuration types for the verification system
//!
//! This module defines all configuration structures used throughout the workspace.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

use crate::challenge::DEFAULT_CHALLENGE_PREFIX;

/// Default public DNS-over-HTTPS endpoint
pub const DEFAULT_DOH_URL: &str = "https://cloudflare-dns.com/dns-query";

/// Default internal path check tasks are delivered to
pub const DEFAULT_TASK_PATH: &str = "/challenge";

/// Main verification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VeriflyConfig {
    /// Proof checker strategy
    #[serde(default)]
    pub checker: CheckerConfig,

    /// Retry scheduling settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Callback notifier settings
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// Namespace prefix for generated challenges
    #[serde(default = "default_challenge_prefix")]
    pub challenge_prefix: String,

    /// Capacity of the verification event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl VeriflyConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            checker: CheckerConfig::default(),
            scheduler: SchedulerConfig::default(),
            notifier: NotifierConfig::default(),
            challenge_prefix: default_challenge_prefix(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.challenge_prefix.is_empty() {
            return Err(crate::Error::config("Challenge prefix cannot be empty"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }

        self.checker.validate()?;
        self.scheduler.validate()?;
        self.notifier.validate()?;

        Ok(())
    }
}

impl Default for VeriflyConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Proof checker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckerConfig {
    /// Query DNS directly
    Resolver {
        /// Explicit nameservers (system configuration when empty)
        #[serde(default)]
        nameservers: Vec<IpAddr>,
        /// Per-lookup timeout in seconds
        #[serde(default = "default_lookup_timeout_secs")]
        timeout_secs: u64,
    },

    /// Query a DNS-over-HTTPS JSON endpoint
    Doh {
        /// DoH endpoint URL
        #[serde(default = "default_doh_url")]
        url: String,
        /// Per-request timeout in seconds
        #[serde(default = "default_lookup_timeout_secs")]
        timeout_secs: u64,
    },

    /// Custom checker
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl CheckerConfig {
    /// Validate the checker configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            CheckerConfig::Resolver { timeout_secs, .. } => {
                if *timeout_secs == 0 {
                    return Err(crate::Error::config("Resolver timeout must be > 0"));
                }
                Ok(())
            }
            CheckerConfig::Doh { url, timeout_secs } => {
                if url.is_empty() {
                    return Err(crate::Error::config("DoH URL cannot be empty"));
                }
                if !url.starts_with("https://") && !url.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "DoH URL must use HTTP or HTTPS scheme. Got: {}",
                        url
                    )));
                }
                if *timeout_secs == 0 {
                    return Err(crate::Error::config("DoH timeout must be > 0"));
                }
                Ok(())
            }
            CheckerConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom checker factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom checker config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the strategy name
    pub fn type_name(&self) -> &str {
        match self {
            CheckerConfig::Resolver { .. } => "resolver",
            CheckerConfig::Doh { .. } => "doh",
            CheckerConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for CheckerConfig {
    fn default() -> Self {
        CheckerConfig::Doh {
            url: default_doh_url(),
            timeout_secs: default_lookup_timeout_secs(),
        }
    }
}

/// Retry scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Total age of a task, counted from first enqueue (in seconds)
    #[serde(default = "default_age_limit_secs")]
    pub age_limit_secs: u64,

    /// Minimum delay between successive attempts (in seconds)
    #[serde(default = "default_min_backoff_secs")]
    pub min_backoff_secs: u64,

    /// Maximum delay between successive attempts (in seconds)
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,

    /// Number of times the delay doubles before growing stops
    #[serde(default = "default_max_doublings")]
    pub max_doublings: u32,

    /// Endpoint path check tasks are delivered to
    #[serde(default = "default_task_path")]
    pub task_path: String,
}

/// Paths served next to the task path, which it must not shadow
pub const RESERVED_PATHS: &[&str] = &["/worker", "/healthz"];

impl SchedulerConfig {
    /// Validate the scheduler configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.age_limit_secs == 0 {
            return Err(crate::Error::config("Task age limit must be > 0"));
        }
        if self.min_backoff_secs == 0 {
            return Err(crate::Error::config("Minimum backoff must be > 0"));
        }
        if self.max_backoff_secs < self.min_backoff_secs {
            return Err(crate::Error::config(format!(
                "Maximum backoff ({}s) cannot be below minimum backoff ({}s)",
                self.max_backoff_secs, self.min_backoff_secs
            )));
        }
        if !self.task_path.starts_with('/') {
            return Err(crate::Error::config(format!(
                "Task path must start with '/'. Got: {}",
                self.task_path
            )));
        }
        if RESERVED_PATHS.contains(&self.task_path.as_str()) {
            return Err(crate::Error::config(format!(
                "Task path {} is already served by the daemon",
                self.task_path
            )));
        }
        if self.task_path.contains(['{', '}', '*']) {
            return Err(crate::Error::config(format!(
                "Task path must be a literal path. Got: {}",
                self.task_path
            )));
        }
        Ok(())
    }

    /// Total task age as a duration
    pub fn age_limit(&self) -> Duration {
        Duration::from_secs(self.age_limit_secs)
    }

    /// Minimum backoff as a duration
    pub fn min_backoff(&self) -> Duration {
        Duration::from_secs(self.min_backoff_secs)
    }

    /// Maximum backoff as a duration
    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            age_limit_secs: default_age_limit_secs(),
            min_backoff_secs: default_min_backoff_secs(),
            max_backoff_secs: default_max_backoff_secs(),
            max_doublings: default_max_doublings(),
            task_path: default_task_path(),
        }
    }
}

/// Callback notifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_notify_timeout_secs")]
    pub timeout_secs: u64,

    /// Post the unverified record to the callback URL when a task expires
    ///
    /// Off by default: expiry is silent unless explicitly enabled.
    #[serde(default)]
    pub notify_on_expiry: bool,
}

impl NotifierConfig {
    /// Validate the notifier configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("Notifier timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_notify_timeout_secs(),
            notify_on_expiry: false,
        }
    }
}

fn default_challenge_prefix() -> String {
    DEFAULT_CHALLENGE_PREFIX.to_string()
}

fn default_event_channel_capacity() -> usize {
    1000
}

fn default_doh_url() -> String {
    DEFAULT_DOH_URL.to_string()
}

fn default_lookup_timeout_secs() -> u64 {
    10
}

fn default_age_limit_secs() -> u64 {
    20 * 60
}

fn default_min_backoff_secs() -> u64 {
    5
}

fn default_max_backoff_secs() -> u64 {
    60
}

fn default_max_doublings() -> u32 {
    16
}

fn default_task_path() -> String {
    DEFAULT_TASK_PATH.to_string()
}

fn default_notify_timeout_secs() -> u64 {
    10
}
