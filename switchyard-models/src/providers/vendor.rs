//! HTTP-backed provider shared by every built-in vendor.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, warn};

use super::anthropic::{ANTHROPIC_VERSION, AnthropicDecoder, AnthropicRequest, MESSAGES_PATH};
use super::ollama::{CHAT_PATH as OLLAMA_CHAT_PATH, OllamaChatRequest, OllamaDecoder};
use super::openai::{CHAT_PATH as OPENAI_CHAT_PATH, OpenAiDecoder, OpenAiRequest};
use super::{ChatRequest, ChatStream, InstanceOptions, ModelHandle, ModelProvider, framing};
use crate::auth::{ApiKey, CredentialKeys};
use crate::{Error, ModelInfo, Result};

/// Request/stream protocol family spoken by a vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wire {
    /// `/chat/completions` with SSE `data:` lines.
    OpenAi,
    /// `/messages` with typed SSE events.
    Anthropic,
    /// `/api/chat` with newline-delimited JSON.
    Ollama,
}

impl Wire {
    /// Endpoint path appended to the base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Wire::OpenAi => OPENAI_CHAT_PATH,
            Wire::Anthropic => MESSAGES_PATH,
            Wire::Ollama => OLLAMA_CHAT_PATH,
        }
    }
}

/// A provider reached over HTTP.
///
/// Vendors differ only in wire, credential variables, model catalog, and
/// fixed headers, so they are all values of this one type. See
/// [`builtin`](super::builtin) for the default catalog.
pub struct VendorProvider {
    name: String,
    wire: Wire,
    keys: CredentialKeys,
    models: Vec<ModelInfo>,
    headers: Vec<(String, String)>,
    accepts_any_model: bool,
    stream_usage: bool,
    client: reqwest::Client,
}

impl std::fmt::Debug for VendorProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VendorProvider")
            .field("name", &self.name)
            .field("wire", &self.wire)
            .field("keys", &self.keys)
            .field("models", &self.models.len())
            .finish_non_exhaustive()
    }
}

impl VendorProvider {
    /// Start building a provider named `name`.
    pub fn builder(
        name: impl Into<String>,
        wire: Wire,
        keys: CredentialKeys,
    ) -> VendorProviderBuilder {
        VendorProviderBuilder {
            name: name.into(),
            wire,
            keys,
            models: Vec::new(),
            headers: Vec::new(),
            accepts_any_model: false,
            stream_usage: false,
        }
    }

    /// The wire protocol this provider speaks.
    pub fn wire(&self) -> Wire {
        self.wire
    }

    /// Headers sent with every request to this vendor.
    pub fn fixed_headers(&self) -> &[(String, String)] {
        &self.headers
    }

    fn header_map(
        &self,
        api_key: Option<&ApiKey>,
        extra: &[(String, String)],
    ) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();

        if let Some(key) = api_key {
            let (name, raw) = match self.wire {
                Wire::Anthropic => (
                    HeaderName::from_static("x-api-key"),
                    key.expose_secret().to_string(),
                ),
                Wire::OpenAi | Wire::Ollama => {
                    (AUTHORIZATION, format!("Bearer {}", key.expose_secret()))
                }
            };
            let mut value = HeaderValue::from_str(&raw).map_err(|_| {
                Error::Configuration(format!(
                    "API key for {} is not a valid header value",
                    self.name
                ))
            })?;
            value.set_sensitive(true);
            map.insert(name, value);
        }
        if self.wire == Wire::Anthropic {
            map.insert(
                HeaderName::from_static("anthropic-version"),
                HeaderValue::from_static(ANTHROPIC_VERSION),
            );
        }

        for (name, value) in self.headers.iter().chain(extra) {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::Configuration(format!("invalid header name: {name}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| Error::Configuration(format!("invalid value for header {name}")))?;
            map.insert(name, value);
        }
        Ok(map)
    }
}

impl ModelProvider for VendorProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn credential_keys(&self) -> &CredentialKeys {
        &self.keys
    }

    fn static_models(&self) -> &[ModelInfo] {
        &self.models
    }

    fn accepts_any_model(&self) -> bool {
        self.accepts_any_model
    }

    fn create_handle(&self, options: InstanceOptions<'_>) -> Result<Box<dyn ModelHandle>> {
        let base_url = options
            .credentials
            .base_url()
            .ok_or_else(|| Error::MissingBaseUrl(self.name.clone()))?;
        let api_key = options.credentials.api_key().filter(|k| !k.is_empty());
        if self.keys.api_key_required && api_key.is_none() {
            return Err(Error::MissingCredential(self.name.clone()));
        }

        Ok(Box::new(VendorHandle {
            provider: self.name.clone(),
            model: options.model.to_string(),
            wire: self.wire,
            url: format!("{base_url}{}", self.wire.path()),
            headers: self.header_map(api_key, options.headers)?,
            stream_usage: self.stream_usage,
            client: self.client.clone(),
        }))
    }
}

/// Builder for [`VendorProvider`].
pub struct VendorProviderBuilder {
    name: String,
    wire: Wire,
    keys: CredentialKeys,
    models: Vec<ModelInfo>,
    headers: Vec<(String, String)>,
    accepts_any_model: bool,
    stream_usage: bool,
}

impl VendorProviderBuilder {
    /// Declare a model; its `provider` field is this provider's name.
    pub fn model(
        mut self,
        name: &str,
        label: &str,
        max_token_allowed: u32,
        max_completion_tokens: u32,
    ) -> Self {
        self.models.push(
            ModelInfo::builder(&self.name, name)
                .label(label)
                .max_token_allowed(max_token_allowed)
                .max_completion_tokens(max_completion_tokens)
                .build(),
        );
        self
    }

    /// Send a fixed header with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Accept model names outside the declared catalog.
    pub fn accepts_any_model(mut self) -> Self {
        self.accepts_any_model = true;
        self
    }

    /// Ask the vendor to report usage in the stream (OpenAI wire).
    pub fn stream_usage(mut self) -> Self {
        self.stream_usage = true;
        self
    }

    /// Finish the provider with a fresh HTTP client.
    pub fn build(self) -> VendorProvider {
        VendorProvider {
            name: self.name,
            wire: self.wire,
            keys: self.keys,
            models: self.models,
            headers: self.headers,
            accepts_any_model: self.accepts_any_model,
            stream_usage: self.stream_usage,
            client: reqwest::Client::new(),
        }
    }
}

/// Handle for one model of a [`VendorProvider`].
struct VendorHandle {
    provider: String,
    model: String,
    wire: Wire,
    url: String,
    headers: HeaderMap,
    stream_usage: bool,
    client: reqwest::Client,
}

#[async_trait]
impl ModelHandle for VendorHandle {
    fn model(&self) -> &str {
        &self.model
    }

    async fn stream(&self, request: ChatRequest) -> Result<ChatStream> {
        let builder = self.client.post(&self.url).headers(self.headers.clone());
        let builder = match self.wire {
            Wire::OpenAi => builder.json(&OpenAiRequest::new(&request, self.stream_usage)),
            Wire::Anthropic => builder.json(&AnthropicRequest::new(&request)),
            Wire::Ollama => builder.json(&OllamaChatRequest::new(&request)),
        };

        debug!(
            provider = %self.provider,
            model = %request.model,
            url = %self.url,
            "opening stream"
        );
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                provider = %self.provider,
                status = status.as_u16(),
                "upstream rejected request"
            );
            return Err(Error::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes_stream();
        Ok(match self.wire {
            Wire::OpenAi => framing::decode(body, OpenAiDecoder::default()),
            Wire::Anthropic => framing::decode(body, AnthropicDecoder::default()),
            Wire::Ollama => framing::decode(body, OllamaDecoder::default()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ResolvedCredentials;

    fn provider(wire: Wire) -> VendorProvider {
        VendorProvider::builder("Test", wire, CredentialKeys::new("TEST_API_KEY"))
            .model("m-1", "Model One", 1000, 100)
            .header("x-client", "switchyard")
            .build()
    }

    fn creds(key: Option<&str>, base_url: Option<&str>) -> ResolvedCredentials {
        ResolvedCredentials::new(key.map(ApiKey::from), base_url.map(str::to_string))
    }

    #[test]
    fn models_carry_provider_name() {
        let p = provider(Wire::OpenAi);
        assert_eq!(p.static_models().len(), 1);
        assert_eq!(p.static_models()[0].provider, "Test");
        assert_eq!(p.static_models()[0].label, "Model One");
        assert!(p.find_model("m-1").is_some());
    }

    #[test]
    fn unknown_model_is_rejected() {
        let p = provider(Wire::OpenAi);
        let c = creds(Some("k"), Some("http://localhost"));
        let err = p.model_instance(InstanceOptions::new("nope", &c)).err().unwrap();
        assert!(matches!(
            err,
            Error::UnknownModel { provider, model } if provider == "Test" && model == "nope"
        ));
    }

    #[test]
    fn any_model_when_allowed() {
        let keys = CredentialKeys::new("K").key_optional();
        let p = VendorProvider::builder("Local", Wire::Ollama, keys)
            .accepts_any_model()
            .build();
        let c = creds(None, Some("http://localhost:11434"));
        let handle = p.model_instance(InstanceOptions::new("llama3", &c)).unwrap();
        assert_eq!(handle.model(), "llama3");
    }

    #[test]
    fn missing_base_url_fails() {
        let p = provider(Wire::OpenAi);
        let c = creds(Some("k"), None);
        let err = p.model_instance(InstanceOptions::new("m-1", &c)).err().unwrap();
        assert!(matches!(err, Error::MissingBaseUrl(name) if name == "Test"));
    }

    #[test]
    fn missing_required_key_fails() {
        let p = provider(Wire::OpenAi);
        let c = creds(None, Some("http://localhost"));
        let err = p.model_instance(InstanceOptions::new("m-1", &c)).err().unwrap();
        assert!(matches!(err, Error::MissingCredential(_)));
    }

    #[test]
    fn bearer_auth_for_openai_wire() {
        let p = provider(Wire::OpenAi);
        let key = ApiKey::new("sk-test");
        let map = p.header_map(Some(&key), &[]).unwrap();
        assert_eq!(map[AUTHORIZATION], "Bearer sk-test");
        assert!(map[AUTHORIZATION].is_sensitive());
        assert_eq!(map["x-client"], "switchyard");
        assert!(map.get("x-api-key").is_none());
    }

    #[test]
    fn api_key_header_for_anthropic_wire() {
        let p = provider(Wire::Anthropic);
        let key = ApiKey::new("sk-ant");
        let map = p.header_map(Some(&key), &[]).unwrap();
        assert_eq!(map["x-api-key"], "sk-ant");
        assert_eq!(map["anthropic-version"], ANTHROPIC_VERSION);
        assert!(map.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn caller_headers_apply_after_fixed_ones() {
        let p = provider(Wire::OpenAi);
        let extra = vec![
            ("x-client".to_string(), "override".to_string()),
            ("x-trace".to_string(), "abc".to_string()),
        ];
        let map = p.header_map(None, &extra).unwrap();
        assert_eq!(map["x-client"], "override");
        assert_eq!(map["x-trace"], "abc");
        assert!(map.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn invalid_header_name_is_configuration_error() {
        let p = provider(Wire::OpenAi);
        let extra = vec![("bad header".to_string(), "v".to_string())];
        let err = p.header_map(None, &extra).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn wire_paths() {
        assert_eq!(Wire::OpenAi.path(), "/chat/completions");
        assert_eq!(Wire::Anthropic.path(), "/messages");
        assert_eq!(Wire::Ollama.path(), "/api/chat");
    }
}
