//! Plugin-based gateway registry
//!
//! The registry lets DNS backends be registered by name at startup, so the
//! binary picks one from configuration without an if-else over providers.
//!
//! ## Registration
//!
//! Implementations expose a `register` function:
//!
//! ```rust,ignore
//! // In cloudns-provider-googledns
//! pub fn register(registry: &GatewayRegistry) {
//!     registry.register("googledns", Box::new(GoogleDnsFactory));
//! }
//! ```

use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::traits::{DnsGateway, DnsGatewayFactory};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Registry of gateway factories keyed by provider kind
///
/// Uses interior mutability with RwLock, allowing registration through a
/// shared reference.
#[derive(Default)]
pub struct GatewayRegistry {
    factories: RwLock<HashMap<String, Box<dyn DnsGatewayFactory>>>,
}

impl GatewayRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a gateway factory under `name`
    ///
    /// A later registration under the same name replaces the earlier one.
    pub fn register(&self, name: impl Into<String>, factory: Box<dyn DnsGatewayFactory>) {
        let mut factories = self
            .factories
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        factories.insert(name.into(), factory);
    }

    /// Create the gateway named by `config.kind`
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<dyn DnsGateway>)`: Created gateway
    /// - `Err(Error::Config)`: If the kind is not registered or creation fails
    pub fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn DnsGateway>> {
        let factories = self
            .factories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let factory = factories.get(&config.kind).ok_or_else(|| {
            let mut known: Vec<&str> = factories.keys().map(String::as_str).collect();
            known.sort_unstable();
            Error::config(format!(
                "Unknown provider '{}'. Registered providers: {}",
                config.kind,
                known.join(", ")
            ))
        })?;

        factory.create(config)
    }

    /// List registered provider kinds
    pub fn list(&self) -> Vec<String> {
        let factories = self
            .factories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        factories.keys().cloned().collect()
    }

    /// Check if a provider kind is registered
    pub fn contains(&self, name: &str) -> bool {
        let factories = self
            .factories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        factories.contains_key(name)
    }
}
