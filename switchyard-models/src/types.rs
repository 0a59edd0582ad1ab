//! Core types for model metadata.

use serde::{Deserialize, Serialize};

/// Information about a model offered by a provider.
///
/// Names are unique within a provider but not across providers, so a model
/// is always addressed by the `(provider, name)` pair.
///
/// # Examples
///
/// ```
/// use switchyard_models::ModelInfo;
///
/// let info = ModelInfo::builder("OpenAI", "gpt-4o")
///     .label("GPT-4o")
///     .max_token_allowed(128_000)
///     .max_completion_tokens(16_384)
///     .build();
/// assert_eq!(info.provider, "OpenAI");
/// assert_eq!(info.max_completion_tokens, 16_384);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Model identifier sent to the vendor.
    pub name: String,
    /// Human-readable label.
    pub label: String,
    /// Name of the provider that serves this model.
    pub provider: String,
    /// Context window size in tokens.
    pub max_token_allowed: u32,
    /// Maximum tokens the model may generate in one completion.
    pub max_completion_tokens: u32,
}

impl ModelInfo {
    /// Create a new model info builder.
    pub fn builder(provider: &str, name: &str) -> ModelInfoBuilder {
        ModelInfoBuilder::new(provider, name)
    }
}

/// Builder for constructing `ModelInfo`.
#[derive(Debug)]
pub struct ModelInfoBuilder {
    provider: String,
    name: String,
    label: Option<String>,
    max_token_allowed: u32,
    max_completion_tokens: u32,
}

impl ModelInfoBuilder {
    fn new(provider: &str, name: &str) -> Self {
        Self {
            provider: provider.to_string(),
            name: name.to_string(),
            label: None,
            max_token_allowed: 8000,
            max_completion_tokens: 4096,
        }
    }

    /// Set the human-readable label. Defaults to the model name.
    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    /// Set the context window size.
    pub fn max_token_allowed(mut self, tokens: u32) -> Self {
        self.max_token_allowed = tokens;
        self
    }

    /// Set the maximum completion tokens.
    pub fn max_completion_tokens(mut self, tokens: u32) -> Self {
        self.max_completion_tokens = tokens;
        self
    }

    /// Build the `ModelInfo`.
    pub fn build(self) -> ModelInfo {
        ModelInfo {
            label: self.label.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            provider: self.provider,
            max_token_allowed: self.max_token_allowed.max(1),
            max_completion_tokens: self.max_completion_tokens.max(1),
        }
    }
}
