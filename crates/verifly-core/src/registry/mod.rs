//! Plugin-based checker registry
//!
//! The registry allows proof checker strategies to be registered
//! dynamically at runtime, so the deployment configuration picks the
//! strategy without hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use verifly_core::registry::CheckerRegistry;
//! use verifly_core::config::CheckerConfig;
//!
//! let registry = CheckerRegistry::new();
//! verifly_checker_doh::register(&registry);
//! verifly_checker_resolver::register(&registry);
//!
//! let checker = registry.create_checker(&CheckerConfig::default())?;
//! ```
//!
//! ## Registration
//!
//! Strategy crates register themselves through a `register()` function:
//!
//! ```rust,ignore
//! pub fn register(registry: &CheckerRegistry) {
//!     registry.register_checker("doh", Box::new(DohCheckerFactory));
//! }
//! ```

use crate::config::CheckerConfig;
use crate::error::{Error, Result};
use crate::traits::{ProofChecker, ProofCheckerFactory};
use std::collections::HashMap;
use std::sync::RwLock;

/// Registry of proof checker factories keyed by strategy name
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct CheckerRegistry {
    checkers: RwLock<HashMap<String, Box<dyn ProofCheckerFactory>>>,
}

impl CheckerRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a proof checker factory
    ///
    /// # Parameters
    ///
    /// - `name`: Strategy name (e.g., "doh", "resolver")
    /// - `factory`: Factory object for creating checker instances
    pub fn register_checker(&self, name: impl Into<String>, factory: Box<dyn ProofCheckerFactory>) {
        let name = name.into();
        let mut checkers = self
            .checkers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        checkers.insert(name, factory);
    }

    /// Create a proof checker from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn ProofChecker>)`: Created checker instance
    /// - `Err(Error)`: If the strategy is not registered or creation fails
    pub fn create_checker(&self, config: &CheckerConfig) -> Result<Box<dyn ProofChecker>> {
        let strategy = config.type_name();
        let checkers = self
            .checkers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let factory = checkers
            .get(strategy)
            .ok_or_else(|| Error::config(format!("Unknown checker strategy: {}", strategy)))?;

        factory.create(config)
    }

    /// List all registered strategy names
    pub fn list_checkers(&self) -> Vec<String> {
        let checkers = self
            .checkers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        checkers.keys().cloned().collect()
    }

    /// Check if a strategy is registered
    pub fn has_checker(&self, name: &str) -> bool {
        let checkers = self
            .checkers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        checkers.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedChecker(bool);

    #[async_trait]
    impl ProofChecker for FixedChecker {
        async fn check(&self, _domain: &str, _challenge: &str) -> Result<bool> {
            Ok(self.0)
        }

        fn strategy_name(&self) -> &'static str {
            "fixed"
        }
    }

    struct FixedCheckerFactory;

    impl ProofCheckerFactory for FixedCheckerFactory {
        fn create(&self, _config: &CheckerConfig) -> Result<Box<dyn ProofChecker>> {
            Ok(Box::new(FixedChecker(true)))
        }
    }

    #[test]
    fn test_registry_registration() {
        let registry = CheckerRegistry::new();

        assert!(!registry.has_checker("fixed"));

        registry.register_checker("fixed", Box::new(FixedCheckerFactory));

        assert!(registry.has_checker("fixed"));
        assert!(registry.list_checkers().contains(&"fixed".to_string()));
    }

    #[tokio::test]
    async fn test_create_custom_checker() {
        let registry = CheckerRegistry::new();
        registry.register_checker("fixed", Box::new(FixedCheckerFactory));

        let config = CheckerConfig::Custom {
            factory: "fixed".to_string(),
            config: serde_json::json!({}),
        };
        let checker = registry.create_checker(&config).unwrap();

        assert_eq!(checker.strategy_name(), "fixed");
        assert!(checker.check("example.com", "token").await.unwrap());
    }

    #[test]
    fn test_unknown_strategy() {
        let registry = CheckerRegistry::new();
        let err = registry
            .create_checker(&CheckerConfig::default())
            .err()
            .unwrap();

        assert!(matches!(err, Error::Config(_)));
    }
}
