//! Plugin-based record service registry
//!
//! Record services are registered by name at startup, so building an updater
//! from configuration needs no hardcoded match over service crates.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use addrsync_core::registry::ServiceRegistry;
//!
//! let registry = ServiceRegistry::new();
//! addrsync_provider_cloudflare::register(&registry);
//! addrsync_provider_dyndns::register(&registry);
//!
//! let service = registry.create_service(&record.service)?;
//! ```
//!
//! ## Registration
//!
//! Each service crate exposes a `register` function:
//!
//! ```rust,ignore
//! pub fn register(registry: &ServiceRegistry) {
//!     registry.register_service("cloudflare", Box::new(CloudflareFactory));
//! }
//! ```

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::traits::{RecordService, RecordServiceFactory};

/// Registry of record service factories, keyed by the configuration's
/// `service` name
///
/// Uses interior mutability so registration works through a shared
/// reference.
#[derive(Default)]
pub struct ServiceRegistry {
    services: RwLock<HashMap<String, Box<dyn RecordServiceFactory>>>,
}

impl ServiceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name`, replacing any earlier one
    pub fn register_service(
        &self,
        name: impl Into<String>,
        factory: Box<dyn RecordServiceFactory>,
    ) {
        let mut services = self.services.write().unwrap_or_else(PoisonError::into_inner);
        services.insert(name.into(), factory);
    }

    /// Create the record service described by `config`
    ///
    /// # Errors
    ///
    /// - The service name is not registered
    /// - The factory rejects the configuration
    pub fn create_service(&self, config: &ServiceConfig) -> Result<Box<dyn RecordService>> {
        let name = config.type_name();
        let services = self.services.read().unwrap_or_else(PoisonError::into_inner);

        let factory = services
            .get(name)
            .ok_or_else(|| Error::config(format!("Unknown service: {}", name)))?;

        factory.create(config)
    }

    /// Registered service names, sorted
    pub fn list_services(&self) -> Vec<String> {
        let services = self.services.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = services.keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether a service name is registered
    pub fn has_service(&self, name: &str) -> bool {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.list_services())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RejectingFactory;

    impl RecordServiceFactory for RejectingFactory {
        fn create(&self, _config: &ServiceConfig) -> Result<Box<dyn RecordService>> {
            Err(Error::config("rejected"))
        }
    }

    fn duck() -> ServiceConfig {
        ServiceConfig::Duck {
            subname: "host".to_string(),
            token: "token".to_string(),
        }
    }

    #[test]
    fn test_registry_registration() {
        let registry = ServiceRegistry::new();
        assert!(!registry.has_service("duck"));

        registry.register_service("duck", Box::new(RejectingFactory));

        assert!(registry.has_service("duck"));
        assert_eq!(registry.list_services(), vec!["duck".to_string()]);
    }

    #[test]
    fn test_unknown_service_is_config_error() {
        let registry = ServiceRegistry::new();
        let err = registry.create_service(&duck()).err().unwrap();
        assert!(matches!(err, Error::Config(msg) if msg.contains("duck")));
    }

    #[test]
    fn test_factory_error_propagates() {
        let registry = ServiceRegistry::new();
        registry.register_service("duck", Box::new(RejectingFactory));
        assert!(matches!(
            registry.create_service(&duck()),
            Err(Error::Config(msg)) if msg == "rejected"
        ));
    }
}
