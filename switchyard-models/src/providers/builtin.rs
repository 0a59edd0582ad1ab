//! The default provider catalog.

use std::sync::Arc;

use super::ollama::DEFAULT_BASE_URL as OLLAMA_DEFAULT_BASE_URL;
use super::{ModelProvider, VendorProvider, Wire};
use crate::auth::CredentialKeys;

pub const OPENAI: &str = "OpenAI";
pub const ANTHROPIC: &str = "Anthropic";
pub const CLAUDE_CODE: &str = "Claude Code";
pub const GROQ: &str = "Groq";
pub const MISTRAL: &str = "Mistral";
pub const DEEPSEEK: &str = "Deepseek";
pub const OPENAI_LIKE: &str = "OpenAILike";
pub const OLLAMA: &str = "Ollama";

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";

/// OpenAI chat completions.
pub fn openai() -> VendorProvider {
    VendorProvider::builder(
        OPENAI,
        Wire::OpenAi,
        CredentialKeys::new("OPENAI_API_KEY").default_base_url("https://api.openai.com/v1"),
    )
    .model("gpt-4o", "GPT-4o", 128_000, 16_384)
    .model("gpt-4o-mini", "GPT-4o Mini", 128_000, 16_384)
    .model("gpt-4-turbo", "GPT-4 Turbo", 128_000, 4_096)
    .model("gpt-3.5-turbo", "GPT-3.5 Turbo", 16_385, 4_096)
    .stream_usage()
    .build()
}

/// Anthropic Messages API.
pub fn anthropic() -> VendorProvider {
    VendorProvider::builder(
        ANTHROPIC,
        Wire::Anthropic,
        CredentialKeys::new("ANTHROPIC_API_KEY").default_base_url(ANTHROPIC_BASE_URL),
    )
    .model("claude-sonnet-4-20250514", "Claude 4 Sonnet", 200_000, 64_000)
    .model("claude-opus-4-20250514", "Claude 4 Opus", 200_000, 32_000)
    .model("claude-3-5-sonnet-20241022", "Claude 3.5 Sonnet", 200_000, 8_192)
    .model("claude-3-5-haiku-20241022", "Claude 3.5 Haiku", 200_000, 8_192)
    .build()
}

/// Anthropic models through a Claude Code account.
///
/// The key is read from `CLAUDE_CODE_PATH`; requests carry the extended
/// output beta header.
pub fn claude_code() -> VendorProvider {
    VendorProvider::builder(
        CLAUDE_CODE,
        Wire::Anthropic,
        CredentialKeys::new("CLAUDE_CODE_PATH").default_base_url(ANTHROPIC_BASE_URL),
    )
    .model("claude-sonnet-4-20250514", "Claude 4 Sonnet (via Claude Code)", 1_000_000, 64_000)
    .model("claude-opus-4-20250514", "Claude 4 Opus (via Claude Code)", 200_000, 32_000)
    .model("claude-3-5-sonnet-20241022", "Claude 3.5 Sonnet (via Claude Code)", 200_000, 128_000)
    .model("claude-3-5-haiku-20241022", "Claude 3.5 Haiku (via Claude Code)", 200_000, 128_000)
    .header("anthropic-beta", "output-128k-2025-02-19")
    .header("user-agent", "switchyard-claude-code-provider")
    .build()
}

/// Groq, OpenAI-compatible.
pub fn groq() -> VendorProvider {
    VendorProvider::builder(
        GROQ,
        Wire::OpenAi,
        CredentialKeys::new("GROQ_API_KEY").default_base_url("https://api.groq.com/openai/v1"),
    )
    .model("llama-3.3-70b-versatile", "Llama 3.3 70B", 128_000, 32_768)
    .model("llama-3.1-8b-instant", "Llama 3.1 8B", 128_000, 8_192)
    .model("mixtral-8x7b-32768", "Mixtral 8x7B", 32_768, 32_768)
    .build()
}

/// Mistral, OpenAI-compatible.
pub fn mistral() -> VendorProvider {
    VendorProvider::builder(
        MISTRAL,
        Wire::OpenAi,
        CredentialKeys::new("MISTRAL_API_KEY").default_base_url("https://api.mistral.ai/v1"),
    )
    .model("mistral-large-latest", "Mistral Large", 128_000, 8_192)
    .model("mistral-small-latest", "Mistral Small", 32_000, 8_192)
    .model("codestral-latest", "Codestral", 32_000, 8_192)
    .build()
}

/// Deepseek, OpenAI-compatible.
pub fn deepseek() -> VendorProvider {
    VendorProvider::builder(
        DEEPSEEK,
        Wire::OpenAi,
        CredentialKeys::new("DEEPSEEK_API_KEY").default_base_url("https://api.deepseek.com"),
    )
    .model("deepseek-chat", "Deepseek Chat", 64_000, 8_192)
    .model("deepseek-reasoner", "Deepseek Reasoner", 64_000, 8_192)
    .build()
}

/// Any OpenAI-compatible endpoint. There is no default base URL.
pub fn openai_like() -> VendorProvider {
    VendorProvider::builder(
        OPENAI_LIKE,
        Wire::OpenAi,
        CredentialKeys::new("OPENAI_LIKE_API_KEY").base_url_env("OPENAI_LIKE_API_BASE_URL"),
    )
    .accepts_any_model()
    .build()
}

/// A local or remote Ollama server. The key is optional.
pub fn ollama() -> VendorProvider {
    VendorProvider::builder(
        OLLAMA,
        Wire::Ollama,
        CredentialKeys::new("OLLAMA_API_KEY")
            .base_url_env("OLLAMA_API_BASE_URL")
            .default_base_url(OLLAMA_DEFAULT_BASE_URL)
            .key_optional(),
    )
    .accepts_any_model()
    .build()
}

/// Every built-in provider, in catalog order.
pub fn all() -> Vec<Arc<dyn ModelProvider>> {
    vec![
        Arc::new(openai()),
        Arc::new(anthropic()),
        Arc::new(claude_code()),
        Arc::new(groq()),
        Arc::new(mistral()),
        Arc::new(deepseek()),
        Arc::new(openai_like()),
        Arc::new(ollama()),
    ]
}
