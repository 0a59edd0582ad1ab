//! Credential resolution for providers.
//!
//! Every dispatch resolves an API key and base URL for its provider from a
//! [`CredentialBundle`], a read-only snapshot of three sources. Resolution is
//! a pure function of the bundle: nothing here reads the process environment
//! on its own, which keeps it testable without touching global state.
//!
//! # Priority
//!
//! 1. Per-provider settings (`provider_settings[provider].api_key` / `.base_url`)
//! 2. Explicit API keys (`explicit_api_keys[provider]`)
//! 3. Environment snapshot (`env[api_key_env]` / `env[base_url_env]`)
//! 4. The provider's default base URL (base URL only)
//!
//! Empty values count as absent and fall through to the next tier.
//!
//! # Example
//!
//! ```
//! use switchyard_models::auth::{resolve, CredentialBundle, CredentialKeys, CredentialSource};
//!
//! let bundle = CredentialBundle::new()
//!     .with_env([("OPENAI_API_KEY", "E")])
//!     .with_api_key("OpenAI", "X");
//! let keys = CredentialKeys::new("OPENAI_API_KEY");
//!
//! let resolved = resolve("OpenAI", &keys, &bundle).unwrap();
//! assert_eq!(resolved.api_key().unwrap().expose_secret(), "X");
//! assert_eq!(resolved.source(), Some(CredentialSource::Explicit));
//! ```

mod store;

use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::{Error, Result};

pub use store::CredentialStore;

/// A secure API key that prevents accidental logging.
///
/// The key is wrapped in `SecretString` which:
/// - Implements `Debug` as `"[REDACTED]"`
/// - Zeroizes memory on drop
/// - Requires explicit `.expose_secret()` to access the value
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Create a new API key from a string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(SecretString::from(key.into()))
    }

    /// Expose the secret key value.
    ///
    /// Use sparingly - only when actually sending to an API.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }

    /// Whether the key is the empty string.
    pub fn is_empty(&self) -> bool {
        self.expose_secret().is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey([REDACTED])")
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Caller-supplied overrides for one provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    /// Replaces the provider's base URL.
    pub base_url: Option<String>,
    /// Replaces any explicit or environment API key.
    pub api_key: Option<ApiKey>,
}

impl ProviderSettings {
    /// Settings overriding only the base URL.
    pub fn base_url(url: impl Into<String>) -> Self {
        Self {
            base_url: Some(url.into()),
            api_key: None,
        }
    }

    /// Settings overriding only the API key.
    pub fn api_key(key: impl Into<ApiKey>) -> Self {
        Self {
            base_url: None,
            api_key: Some(key.into()),
        }
    }
}

/// All credential sources available to one dispatch.
///
/// Assembled per request from current configuration and never mutated by
/// resolution.
#[derive(Clone, Default)]
pub struct CredentialBundle {
    /// API keys supplied explicitly per provider name.
    pub explicit_api_keys: HashMap<String, ApiKey>,
    /// Per-provider overrides, keyed by provider name.
    pub provider_settings: HashMap<String, ProviderSettings>,
    /// Snapshot of environment variables.
    pub env: HashMap<String, String>,
}

impl CredentialBundle {
    /// Create an empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bundle whose environment tier is a snapshot of the current process.
    ///
    /// Entries whose name or value is not valid UTF-8 are skipped.
    pub fn from_process_env() -> Self {
        Self::new().with_os_env(std::env::vars_os())
    }

    /// Add environment entries given as OS strings, skipping any that are not
    /// valid UTF-8.
    pub fn with_os_env(self, vars: impl IntoIterator<Item = (OsString, OsString)>) -> Self {
        self.with_env(
            vars.into_iter()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))),
        )
    }

    /// Add environment entries.
    pub fn with_env<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Add an explicit API key for a provider.
    pub fn with_api_key(mut self, provider: impl Into<String>, key: impl Into<ApiKey>) -> Self {
        self.explicit_api_keys.insert(provider.into(), key.into());
        self
    }

    /// Set the overrides for a provider.
    pub fn with_settings(
        mut self,
        provider: impl Into<String>,
        settings: ProviderSettings,
    ) -> Self {
        self.provider_settings.insert(provider.into(), settings);
        self
    }
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Environment values may hold secrets; only names are shown.
        let mut env_keys: Vec<&String> = self.env.keys().collect();
        env_keys.sort();
        f.debug_struct("CredentialBundle")
            .field("explicit_api_keys", &self.explicit_api_keys)
            .field("provider_settings", &self.provider_settings)
            .field("env", &env_keys)
            .finish()
    }
}

/// Where a provider looks for its credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialKeys {
    /// Environment variable holding the default API key.
    pub api_key_env: String,
    /// Environment variable holding the default base URL, if any.
    pub base_url_env: Option<String>,
    /// Base URL used when no tier supplies one.
    pub default_base_url: Option<String>,
    /// Whether resolution fails when no API key is found.
    pub api_key_required: bool,
}

impl CredentialKeys {
    /// Keys for a provider that requires an API key from `api_key_env`.
    pub fn new(api_key_env: impl Into<String>) -> Self {
        Self {
            api_key_env: api_key_env.into(),
            base_url_env: None,
            default_base_url: None,
            api_key_required: true,
        }
    }

    /// Read the base URL from an environment variable.
    pub fn base_url_env(mut self, var: impl Into<String>) -> Self {
        self.base_url_env = Some(var.into());
        self
    }

    /// Fall back to this base URL when no tier supplies one.
    pub fn default_base_url(mut self, url: impl Into<String>) -> Self {
        self.default_base_url = Some(url.into());
        self
    }

    /// Allow resolution to succeed without an API key.
    pub fn key_optional(mut self) -> Self {
        self.api_key_required = false;
        self
    }
}

/// Which tier supplied a resolved API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Per-provider settings override.
    Override,
    /// Explicit per-provider key.
    Explicit,
    /// Environment variable.
    Environment,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CredentialSource::Override => "override",
            CredentialSource::Explicit => "explicit",
            CredentialSource::Environment => "environment",
        };
        f.write_str(s)
    }
}

/// Credentials resolved for one call. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct ResolvedCredentials {
    api_key: Option<ApiKey>,
    base_url: Option<String>,
    source: Option<CredentialSource>,
}

impl ResolvedCredentials {
    /// Credentials with the given key and base URL.
    pub fn new(api_key: Option<ApiKey>, base_url: Option<String>) -> Self {
        Self {
            api_key,
            base_url,
            source: None,
        }
    }

    /// The resolved API key, if any.
    pub fn api_key(&self) -> Option<&ApiKey> {
        self.api_key.as_ref()
    }

    /// The resolved base URL without a trailing slash, if any.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// The tier the API key came from.
    pub fn source(&self) -> Option<CredentialSource> {
        self.source
    }
}

fn non_empty(s: &&str) -> bool {
    !s.is_empty()
}

/// Resolve the API key and base URL for `provider`.
///
/// # Errors
///
/// Returns `Error::MissingCredential` if no tier supplies an API key and
/// `keys.api_key_required` is set.
pub fn resolve(
    provider: &str,
    keys: &CredentialKeys,
    bundle: &CredentialBundle,
) -> Result<ResolvedCredentials> {
    let settings = bundle.provider_settings.get(provider);

    let keyed = settings
        .and_then(|s| s.api_key.clone())
        .filter(|k| !k.is_empty())
        .map(|k| (k, CredentialSource::Override))
        .or_else(|| {
            bundle
                .explicit_api_keys
                .get(provider)
                .filter(|k| !k.is_empty())
                .map(|k| (k.clone(), CredentialSource::Explicit))
        })
        .or_else(|| {
            bundle
                .env
                .get(&keys.api_key_env)
                .map(String::as_str)
                .filter(non_empty)
                .map(|v| (ApiKey::new(v), CredentialSource::Environment))
        });

    let (api_key, source) = match keyed {
        Some((key, source)) => (Some(key), Some(source)),
        None if keys.api_key_required => {
            debug!(provider, env = %keys.api_key_env, "no API key in any tier");
            return Err(Error::MissingCredential(provider.to_string()));
        }
        None => (None, None),
    };

    let base_url = settings
        .and_then(|s| s.base_url.as_deref())
        .filter(non_empty)
        .or_else(|| {
            keys.base_url_env
                .as_ref()
                .and_then(|var| bundle.env.get(var))
                .map(String::as_str)
                .filter(non_empty)
        })
        .or(keys.default_base_url.as_deref())
        .map(|url| url.trim_end_matches('/').to_string());

    if let Some(source) = source {
        debug!(provider, %source, "resolved API key");
    }

    Ok(ResolvedCredentials {
        api_key,
        base_url,
        source,
    })
}
