use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use switchyard_models::auth::{ApiKey, ProviderSettings};

pub const DEFAULT_PROVIDER: &str = "Anthropic";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawSwitchyardConfig {
    #[serde(default)]
    pub chat: RawChatConfig,

    /// Per-provider overrides, keyed by exact provider name
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderSection>,
}

/// Chat defaults as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawChatConfig {
    pub default_provider: Option<String>,
    pub default_model: Option<String>,
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Default)]
pub struct SwitchyardConfig {
    pub chat: ChatConfig,
    pub providers: BTreeMap<String, ProviderSection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Provider used when neither `--provider` nor `--model` picks one
    pub default_provider: String,

    /// Model used when `--model` is not given
    pub default_model: String,

    /// System prompt for conversations that carry none
    pub system_prompt: Option<String>,

    /// Default generation limit
    pub max_tokens: Option<u32>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_provider: DEFAULT_PROVIDER.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            system_prompt: None,
            max_tokens: None,
        }
    }
}

/// `[providers.<name>]` table
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ProviderSection {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

impl ProviderSection {
    pub fn to_settings(&self) -> ProviderSettings {
        ProviderSettings {
            base_url: self.base_url.clone(),
            api_key: self.api_key.as_deref().map(ApiKey::new),
        }
    }
}

impl SwitchyardConfig {
    /// Provider settings for the credential bundle.
    pub fn provider_settings(&self) -> impl Iterator<Item = (&str, ProviderSettings)> {
        self.providers
            .iter()
            .map(|(name, section)| (name.as_str(), section.to_settings()))
    }
}
