//! Keyring-backed storage for explicit API keys.
//!
//! Keys saved here feed the explicit tier of a [`CredentialBundle`](super::CredentialBundle);
//! the store itself takes no part in resolution order.

use std::collections::HashMap;

use tracing::debug;

use super::ApiKey;
use crate::{Error, Result};

/// Secure credential storage in the system keyring.
///
/// Entries are keyed by provider name under a single service name.
///
/// # Thread Safety
///
/// The keyring operations are thread-safe. Multiple instances can
/// access the same credentials.
pub struct CredentialStore {
    service_name: String,
}

impl CredentialStore {
    /// Create a new credential store.
    ///
    /// # Arguments
    ///
    /// * `service_name` - Service identifier for keyring (e.g., "switchyard")
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// The keyring service name.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Get the stored API key for a provider.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingCredential` if the keyring has no entry.
    pub fn get(&self, provider: &str) -> Result<ApiKey> {
        self.get_from_keyring(provider)
            .ok_or_else(|| Error::MissingCredential(provider.to_string()))
    }

    /// Store an API key for a provider in the system keyring.
    ///
    /// # Errors
    ///
    /// Returns `Error::Keyring` if the keyring operation fails.
    pub fn set(&self, provider: &str, key: &ApiKey) -> Result<()> {
        let entry = self.keyring_entry(provider)?;
        entry
            .set_password(key.expose_secret())
            .map_err(|e| Error::Keyring(e.to_string()))?;
        debug!(provider, "stored API key in keyring");
        Ok(())
    }

    /// Delete an API key from the system keyring.
    ///
    /// # Errors
    ///
    /// Returns `Error::Keyring` if the keyring operation fails.
    /// Returns `Error::MissingCredential` if no credentials exist.
    pub fn delete(&self, provider: &str) -> Result<()> {
        let entry = self.keyring_entry(provider)?;
        entry.delete_credential().map_err(|e| match e {
            keyring::Error::NoEntry => Error::MissingCredential(provider.to_string()),
            _ => Error::Keyring(e.to_string()),
        })?;
        debug!(provider, "deleted API key from keyring");
        Ok(())
    }

    /// Check if a key is stored for a provider.
    pub fn has(&self, provider: &str) -> bool {
        self.get_from_keyring(provider).is_some()
    }

    /// Load the stored keys for every named provider that has one.
    ///
    /// Providers without an entry, or whose keyring is unavailable, are
    /// skipped.
    pub fn load<'a>(
        &self,
        providers: impl IntoIterator<Item = &'a str>,
    ) -> HashMap<String, ApiKey> {
        providers
            .into_iter()
            .filter_map(|p| self.get(p).ok().map(|k| (p.to_string(), k)))
            .collect()
    }

    /// Names among `providers` that have a stored key, in input order.
    pub fn list_providers<'a>(
        &self,
        providers: impl IntoIterator<Item = &'a str>,
    ) -> Vec<String> {
        providers
            .into_iter()
            .filter(|p| self.has(p))
            .map(str::to_string)
            .collect()
    }

    fn keyring_entry(&self, provider: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service_name, provider)
            .map_err(|e| Error::Keyring(e.to_string()))
    }

    fn get_from_keyring(&self, provider: &str) -> Option<ApiKey> {
        let entry = self.keyring_entry(provider).ok()?;
        entry
            .get_password()
            .ok()
            .filter(|k| !k.is_empty())
            .map(ApiKey::new)
    }
}
