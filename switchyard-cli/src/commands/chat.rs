//! One-shot streamed chat.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Args;
use futures_util::StreamExt;
use switchyard_models::auth::{ApiKey, CredentialBundle, CredentialStore};
use switchyard_models::providers::Message;
use switchyard_models::{DispatchRequest, Dispatcher, EventStream, ModelRegistry, StreamEvent};
use tracing::debug;

use super::KEYRING_SERVICE;
use crate::config::{ConfigLoader, SwitchyardConfig};

/// Chat arguments.
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Provider name, e.g. "OpenAI" or "Claude Code"
    #[arg(long)]
    pub provider: Option<String>,

    /// Model name; the provider is looked up when --provider is omitted
    #[arg(long)]
    pub model: Option<String>,

    /// Maximum tokens to generate
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// System prompt for this conversation
    #[arg(long)]
    pub system: Option<String>,

    /// API key for this call, taking precedence over the keyring, the
    /// environment, and any `api_key` in the config file
    #[arg(long)]
    pub api_key: Option<String>,

    /// Prompt text
    #[arg(required = true)]
    pub prompt: Vec<String>,
}

/// Run chat command.
pub async fn run(args: ChatArgs, registry: ModelRegistry) -> Result<()> {
    let config = ConfigLoader::load()?;
    let (provider, model) = resolve_target(
        args.provider.as_deref(),
        args.model.as_deref(),
        &config,
        &registry,
    )?;
    debug!(%provider, %model, "selected model");

    let stored = CredentialStore::new(KEYRING_SERVICE).load([provider.as_str()]);
    let bundle = assemble_bundle(
        CredentialBundle::from_process_env(),
        stored,
        &config,
        &provider,
        args.api_key.as_deref(),
    );

    let mut dispatcher = Dispatcher::new(Arc::new(registry));
    if let Some(prompt) = args.system.or(config.chat.system_prompt) {
        dispatcher = dispatcher.with_system_prompt(prompt);
    }

    let mut request = DispatchRequest::new(
        provider,
        model,
        vec![Message::user(args.prompt.join(" "))],
    );
    request.max_tokens = args.max_tokens.or(config.chat.max_tokens);

    let events = dispatcher.dispatch(request, &bundle).await?;
    write_events(events, &mut std::io::stdout()).await
}

/// Pick the provider and model from flags, falling back to configuration.
fn resolve_target(
    provider: Option<&str>,
    model: Option<&str>,
    config: &SwitchyardConfig,
    registry: &ModelRegistry,
) -> Result<(String, String)> {
    let chat = &config.chat;
    match (provider, model) {
        (Some(provider), Some(model)) => Ok((provider.to_string(), model.to_string())),
        (None, Some(model)) => match registry.provider_for_model(model) {
            Some(provider) => Ok((provider, model.to_string())),
            None => bail!("No provider lists model '{model}'. Pass --provider explicitly."),
        },
        (Some(provider), None) => {
            let handle = registry.provider(provider)?;
            if provider == chat.default_provider
                || handle.find_model(&chat.default_model).is_some()
            {
                return Ok((provider.to_string(), chat.default_model.clone()));
            }
            match handle.static_models().first() {
                Some(model) => Ok((provider.to_string(), model.name.clone())),
                None => bail!("Provider '{provider}' has no default model. Pass --model."),
            }
        }
        (None, None) => Ok((chat.default_provider.clone(), chat.default_model.clone())),
    }
}

/// Layer keyring keys, config overrides, and `--api-key` onto an environment
/// snapshot. The flag lands in the override tier, keeping any configured base URL.
fn assemble_bundle(
    env: CredentialBundle,
    stored: HashMap<String, ApiKey>,
    config: &SwitchyardConfig,
    provider: &str,
    api_key: Option<&str>,
) -> CredentialBundle {
    let mut bundle = env;
    for (name, key) in stored {
        bundle = bundle.with_api_key(name, key);
    }
    for (name, settings) in config.provider_settings() {
        bundle = bundle.with_settings(name, settings);
    }
    if let Some(key) = api_key {
        bundle
            .provider_settings
            .entry(provider.to_string())
            .or_default()
            .api_key = Some(ApiKey::new(key));
    }
    bundle
}

/// Copy text deltas to `out` until the terminal event.
async fn write_events<W: Write>(mut events: EventStream, out: &mut W) -> Result<()> {
    while let Some(event) = events.next().await {
        match event {
            StreamEvent::TextDelta(text) => {
                out.write_all(text.as_bytes())?;
                out.flush()?;
            }
            StreamEvent::Finish { reason, usage } => {
                writeln!(out)?;
                debug!(
                    reason = reason.as_str(),
                    input_tokens = usage.input_tokens,
                    output_tokens = usage.output_tokens,
                    "completed"
                );
                return Ok(());
            }
            StreamEvent::Error(error) => {
                writeln!(out)?;
                bail!("Stream failed: {error}");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use switchyard_models::Error;
    use switchyard_models::auth::CredentialSource;
    use switchyard_models::providers::{FinishReason, ModelProvider, Usage, builtin};

    fn config() -> SwitchyardConfig {
        SwitchyardConfig::default()
    }

    fn events(items: Vec<StreamEvent>) -> EventStream {
        Box::pin(stream::iter(items))
    }

    // ==================== Target selection ====================

    #[test]
    fn flags_win() {
        let registry = ModelRegistry::with_builtin_providers();
        let target = resolve_target(Some("Groq"), Some("anything"), &config(), &registry).unwrap();
        assert_eq!(target, ("Groq".to_string(), "anything".to_string()));
    }

    #[test]
    fn provider_is_derived_from_model() {
        let registry = ModelRegistry::with_builtin_providers();
        let target = resolve_target(None, Some("gpt-4o-mini"), &config(), &registry).unwrap();
        assert_eq!(target.0, "OpenAI");
        assert!(resolve_target(None, Some("no-such-model"), &config(), &registry).is_err());
    }

    #[test]
    fn provider_without_model_uses_its_first_model() {
        let registry = ModelRegistry::with_builtin_providers();
        let target = resolve_target(Some("Mistral"), None, &config(), &registry).unwrap();
        assert_eq!(target.1, "mistral-large-latest");

        // The configured default model is kept when the provider offers it.
        let target = resolve_target(Some("Claude Code"), None, &config(), &registry).unwrap();
        assert_eq!(target.1, "claude-sonnet-4-20250514");

        assert!(resolve_target(Some("OpenAILike"), None, &config(), &registry).is_err());
    }

    #[test]
    fn defaults_come_from_config() {
        let registry = ModelRegistry::with_builtin_providers();
        let mut config = config();
        config.chat.default_provider = "Ollama".into();
        config.chat.default_model = "llama3".into();

        assert_eq!(
            resolve_target(None, None, &config, &registry).unwrap(),
            ("Ollama".to_string(), "llama3".to_string())
        );
        assert_eq!(
            resolve_target(Some("Ollama"), None, &config, &registry).unwrap().1,
            "llama3"
        );
    }

    // ==================== Credential assembly ====================

    #[test]
    fn api_key_flag_beats_keyring_and_env() {
        let mut config = config();
        config.providers.insert(
            "Groq".into(),
            toml::from_str(r#"base_url = "https://proxy.example/openai/v1""#).unwrap(),
        );
        let stored = HashMap::from([
            ("OpenAI".to_string(), ApiKey::new("sk-keyring")),
            ("Groq".to_string(), ApiKey::new("gsk-keyring")),
        ]);
        let env = CredentialBundle::new().with_env([("OPENAI_API_KEY", "sk-env")]);

        let bundle = assemble_bundle(env, stored, &config, "OpenAI", Some("sk-flag"));

        let openai = builtin::openai().credentials(&bundle).unwrap();
        assert_eq!(openai.api_key().unwrap().expose_secret(), "sk-flag");
        assert_eq!(openai.source(), Some(CredentialSource::Override));

        let groq = builtin::groq().credentials(&bundle).unwrap();
        assert_eq!(groq.api_key().unwrap().expose_secret(), "gsk-keyring");
        assert_eq!(groq.base_url(), Some("https://proxy.example/openai/v1"));
    }

    #[test]
    fn api_key_flag_beats_config_key_and_keeps_config_base_url() {
        let mut config = config();
        config.providers.insert(
            "OpenAI".into(),
            toml::from_str(
                r#"
                base_url = "https://proxy.example/v1"
                api_key = "sk-config"
                "#,
            )
            .unwrap(),
        );

        let bundle = assemble_bundle(
            CredentialBundle::new(),
            HashMap::new(),
            &config,
            "OpenAI",
            Some("sk-flag"),
        );
        let openai = builtin::openai().credentials(&bundle).unwrap();
        assert_eq!(openai.api_key().unwrap().expose_secret(), "sk-flag");
        assert_eq!(openai.base_url(), Some("https://proxy.example/v1"));

        let bundle =
            assemble_bundle(CredentialBundle::new(), HashMap::new(), &config, "OpenAI", None);
        let openai = builtin::openai().credentials(&bundle).unwrap();
        assert_eq!(openai.api_key().unwrap().expose_secret(), "sk-config");
    }

    // ==================== Output ====================

    #[tokio::test]
    async fn writes_text_and_trailing_newline() {
        let mut out = Vec::new();
        write_events(
            events(vec![
                StreamEvent::TextDelta("Hello".into()),
                StreamEvent::TextDelta(" World".into()),
                StreamEvent::Finish {
                    reason: FinishReason::Stop,
                    usage: Usage::new(10, 5),
                },
            ]),
            &mut out,
        )
        .await
        .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Hello World\n");
    }

    #[tokio::test]
    async fn terminal_error_fails_after_partial_text() {
        let mut out = Vec::new();
        let err = write_events(
            events(vec![
                StreamEvent::TextDelta("par".into()),
                StreamEvent::Error(Error::UpstreamTransport("reset".into())),
            ]),
            &mut out,
        )
        .await
        .unwrap_err();
        assert_eq!(String::from_utf8(out).unwrap(), "par\n");
        assert!(err.to_string().contains("reset"));
    }
}
