//! Streaming dispatch.
//!
//! The [`Dispatcher`] resolves a request's provider, credentials, and model,
//! opens the upstream stream, and republishes it as [`StreamEvent`] values.
//! Every event stream ends with exactly one terminal event: a
//! [`StreamEvent::Finish`] or a [`StreamEvent::Error`].

use std::pin::Pin;
use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream;
use tokio_stream::Stream;
use tracing::{debug, warn};

use crate::auth::CredentialBundle;
use crate::providers::{
    ChatRequest, ChatStream, Chunk, FinishReason, InstanceOptions, Message, Role, Usage,
};
use crate::{Error, ModelInfo, ModelRegistry, Result};

/// System prompt used when the dispatcher is not given one.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// A vendor-agnostic chat completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    /// Registered provider name, matched exactly.
    pub provider: String,
    /// Model name within the provider.
    pub model: String,
    /// Conversation so far, in order.
    pub messages: Vec<Message>,
    /// Upper bound on generated tokens.
    pub max_tokens: Option<u32>,
    /// Extra headers for the upstream request.
    pub headers: Vec<(String, String)>,
}

impl DispatchRequest {
    /// A request with no token limit and no extra headers.
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            messages,
            max_tokens: None,
            headers: Vec::new(),
        }
    }

    /// Limit generated tokens; capped at the model's completion limit.
    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    /// Add a header sent after the provider's fixed headers.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// One unit of incremental output.
#[derive(Debug)]
pub enum StreamEvent {
    /// A fragment of generated text.
    TextDelta(String),
    /// Generation completed. Terminal.
    Finish { reason: FinishReason, usage: Usage },
    /// Generation failed after the stream opened. Terminal.
    Error(Error),
}

impl StreamEvent {
    /// Whether no event follows this one.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::TextDelta(_))
    }
}

/// Lazily produced events for one dispatch. Dropping it cancels the call.
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Routes requests to registered providers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ModelRegistry>,
    system_prompt: String,
}

impl Dispatcher {
    /// A dispatcher over `registry` using [`DEFAULT_SYSTEM_PROMPT`].
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            registry,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Use `prompt` when a request carries no system message.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// The registry requests are routed through.
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Dispatch a request and return its event stream.
    ///
    /// # Errors
    ///
    /// Fails without contacting upstream when the provider is not
    /// registered, no credential resolves, or the model is unknown. Fails
    /// with an upstream error when the stream cannot be opened. Errors after
    /// that point are delivered as [`StreamEvent::Error`].
    pub async fn dispatch(
        &self,
        request: DispatchRequest,
        bundle: &CredentialBundle,
    ) -> Result<EventStream> {
        let provider = self.registry.provider(&request.provider)?;
        let credentials = provider.credentials(bundle)?;
        let handle = provider.model_instance(
            InstanceOptions::new(&request.model, &credentials).headers(&request.headers),
        )?;

        let max_tokens = clamp_max_tokens(request.max_tokens, provider.find_model(&request.model));
        let messages = with_system_message(request.messages, &self.system_prompt);

        debug!(
            provider = %request.provider,
            model = %request.model,
            messages = messages.len(),
            max_tokens,
            "dispatching chat request"
        );

        let chunks = handle
            .stream(ChatRequest {
                model: handle.model().to_string(),
                messages,
                max_tokens,
            })
            .await?;
        Ok(events(chunks))
    }
}

fn with_system_message(mut messages: Vec<Message>, prompt: &str) -> Vec<Message> {
    if !messages.iter().any(|m| m.role == Role::System) {
        messages.insert(0, Message::system(prompt));
    }
    messages
}

fn clamp_max_tokens(requested: Option<u32>, model: Option<&ModelInfo>) -> Option<u32> {
    match (requested, model) {
        (Some(tokens), Some(model)) => Some(tokens.min(model.max_completion_tokens)),
        (requested, _) => requested,
    }
}

/// Translate chunks to events, ending after the first terminal event.
fn events(chunks: ChatStream) -> EventStream {
    Box::pin(stream::unfold(Some(chunks), |state| async move {
        // The chunk stream is dropped as soon as a terminal event is produced.
        let mut chunks = state?;
        let event = match chunks.next().await {
            Some(Ok(Chunk::Delta(text))) => {
                return Some((StreamEvent::TextDelta(text), Some(chunks)));
            }
            Some(Ok(Chunk::Finish { reason, usage })) => StreamEvent::Finish { reason, usage },
            Some(Err(error)) => {
                warn!(%error, "stream failed");
                StreamEvent::Error(error)
            }
            None => {
                warn!("stream ended without a completion signal");
                StreamEvent::Error(Error::UpstreamProtocol(
                    "stream ended without a completion signal".to_string(),
                ))
            }
        };
        Some((event, None))
    }))
}
