use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use tracing::debug;

use super::types::{
    ChatConfig, ProviderSection, RawChatConfig, RawSwitchyardConfig, SwitchyardConfig,
};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<SwitchyardConfig> {
        Self::load_from(
            Self::user_config_path().as_deref(),
            &Self::project_config_path(),
        )
    }

    /// Load from explicit paths; missing files are skipped.
    pub fn load_from(user_path: Option<&Path>, project_path: &Path) -> Result<SwitchyardConfig> {
        let mut raw = RawSwitchyardConfig::default();

        // Layer 1: User config
        if let Some(user_path) = user_path
            && let Some(user_config) = Self::read_raw(user_path)?
        {
            raw = Self::merge_raw(raw, user_config);
        }

        // Layer 2: Project config
        if let Some(project_config) = Self::read_raw(project_path)? {
            raw = Self::merge_raw(raw, project_config);
        }

        Ok(Self::finalize(raw))
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "switchyard").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get project config path
    /// Can be overridden with SWITCHYARD_PROJECT_CONFIG_DIR
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("SWITCHYARD_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".switchyard/config.toml")
        }
    }

    fn read_raw(path: &Path) -> Result<Option<RawSwitchyardConfig>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let raw = toml::from_str(&contents)
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        debug!(path = %path.display(), "loaded config layer");
        Ok(Some(raw))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawSwitchyardConfig, overlay: RawSwitchyardConfig) -> RawSwitchyardConfig {
        let mut providers: BTreeMap<String, ProviderSection> = base.providers;
        for (name, section) in overlay.providers {
            let merged = match providers.remove(&name) {
                Some(existing) => ProviderSection {
                    base_url: section.base_url.or(existing.base_url),
                    api_key: section.api_key.or(existing.api_key),
                },
                None => section,
            };
            providers.insert(name, merged);
        }

        RawSwitchyardConfig {
            chat: RawChatConfig {
                default_provider: overlay.chat.default_provider.or(base.chat.default_provider),
                default_model: overlay.chat.default_model.or(base.chat.default_model),
                system_prompt: overlay.chat.system_prompt.or(base.chat.system_prompt),
                max_tokens: overlay.chat.max_tokens.or(base.chat.max_tokens),
            },
            providers,
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawSwitchyardConfig) -> SwitchyardConfig {
        let defaults = ChatConfig::default();
        SwitchyardConfig {
            chat: ChatConfig {
                default_provider: raw.chat.default_provider.unwrap_or(defaults.default_provider),
                default_model: raw.chat.default_model.unwrap_or(defaults.default_model),
                system_prompt: raw.chat.system_prompt,
                max_tokens: raw.chat.max_tokens,
            },
            providers: raw.providers,
        }
    }
}
