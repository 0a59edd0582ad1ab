//! Provider registry for discovering and cataloging available models.
//!
//! The registry holds every configured provider, indexed by name, and
//! aggregates their static model catalogs. It is built once at startup and
//! shared read-only behind an `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::providers::{ModelProvider, builtin};
use crate::{Error, ModelInfo, Result};

/// Registry of providers in registration order.
#[derive(Default)]
pub struct ModelRegistry {
    providers: Vec<Arc<dyn ModelProvider>>,
    /// Provider name to position in `providers`.
    index: HashMap<String, usize>,
}

impl ModelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in provider.
    pub fn with_builtin_providers() -> Self {
        let mut registry = Self::new();
        for provider in builtin::all() {
            // Built-in names are unique.
            let _ = registry.register_provider(provider);
        }
        registry
    }

    /// Register a provider under its name.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if a provider with the same name is
    /// already registered.
    pub fn register_provider(&mut self, provider: Arc<dyn ModelProvider>) -> Result<()> {
        let name = provider.name().to_string();
        if self.index.contains_key(&name) {
            return Err(Error::Configuration(format!(
                "provider '{name}' is already registered"
            )));
        }
        debug!(provider = %name, models = provider.static_models().len(), "registered provider");
        self.index.insert(name, self.providers.len());
        self.providers.push(provider);
        Ok(())
    }

    /// Look up a provider by exact name.
    ///
    /// # Errors
    ///
    /// Returns `Error::ProviderNotFound` for an unregistered name.
    pub fn provider(&self, name: &str) -> Result<Arc<dyn ModelProvider>> {
        self.index
            .get(name)
            .map(|&i| Arc::clone(&self.providers[i]))
            .ok_or_else(|| Error::ProviderNotFound(name.to_string()))
    }

    /// Every provider's static models, provider-major in registration order.
    pub fn list_models(&self) -> Vec<ModelInfo> {
        self.providers
            .iter()
            .flat_map(|p| p.static_models().iter().cloned())
            .collect()
    }

    /// Static models of one provider; empty if the provider is unknown.
    pub fn find_by_provider(&self, name: &str) -> Vec<ModelInfo> {
        self.provider(name)
            .map(|p| p.static_models().to_vec())
            .unwrap_or_default()
    }

    /// Name of the first registered provider that declares `model`.
    pub fn provider_for_model(&self, model: &str) -> Option<String> {
        self.providers
            .iter()
            .find(|p| p.find_model(model).is_some())
            .map(|p| p.name().to_string())
    }

    /// Registered provider names, in registration order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no provider is registered.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("providers", &self.provider_names())
            .finish()
    }
}
