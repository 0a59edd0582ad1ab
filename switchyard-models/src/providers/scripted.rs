//! In-process provider that replays canned responses.
//!
//! Useful for exercising the dispatcher and its callers without a network.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{
    ChatRequest, ChatStream, Chunk, FinishReason, InstanceOptions, ModelHandle, ModelProvider,
    Usage,
};
use crate::auth::CredentialKeys;
use crate::{Error, ModelInfo, Result};

/// Env var the default scripted keys read the API key from.
pub const SCRIPTED_API_KEY_ENV: &str = "SCRIPTED_API_KEY";

/// One canned response.
#[derive(Debug)]
pub struct ScriptedReply {
    items: Vec<Result<Chunk>>,
    open_error: Option<Error>,
}

impl ScriptedReply {
    /// A reply yielding `chunks` in order.
    pub fn chunks(chunks: impl IntoIterator<Item = Chunk>) -> Self {
        Self {
            items: chunks.into_iter().map(Ok).collect(),
            open_error: None,
        }
    }

    /// Text deltas followed by a `Stop` finish with the given usage.
    pub fn text<'a>(parts: impl IntoIterator<Item = &'a str>, usage: Usage) -> Self {
        Self::chunks(
            parts
                .into_iter()
                .map(|p| Chunk::Delta(p.to_string()))
                .chain([Chunk::Finish {
                    reason: FinishReason::Stop,
                    usage,
                }]),
        )
    }

    /// Append an in-stream error.
    pub fn then_error(mut self, error: Error) -> Self {
        self.items.push(Err(error));
        self
    }

    /// A reply whose stream fails to open.
    pub fn open_error(error: Error) -> Self {
        Self {
            items: Vec::new(),
            open_error: Some(error),
        }
    }
}

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<ScriptedReply>,
    requests: Vec<ChatRequest>,
}

fn lock(script: &Mutex<Script>) -> MutexGuard<'_, Script> {
    script.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A provider whose handles replay queued [`ScriptedReply`] values and
/// record every [`ChatRequest`] they receive.
///
/// # Example
///
/// ```
/// use switchyard_models::providers::{ScriptedProvider, ScriptedReply, Usage};
///
/// let provider = ScriptedProvider::new("Fake")
///     .model("fake-1", 512)
///     .reply(ScriptedReply::text(["Hello", " World"], Usage::new(3, 2)));
/// assert!(provider.requests().is_empty());
/// ```
#[derive(Debug)]
pub struct ScriptedProvider {
    name: String,
    keys: CredentialKeys,
    models: Vec<ModelInfo>,
    accepts_any_model: bool,
    script: Arc<Mutex<Script>>,
}

impl ScriptedProvider {
    /// A provider reading its key from `SCRIPTED_API_KEY`, with a fixed
    /// default base URL.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: CredentialKeys::new(SCRIPTED_API_KEY_ENV).default_base_url("scripted://local"),
            models: Vec::new(),
            accepts_any_model: false,
            script: Arc::default(),
        }
    }

    /// Replace the credential keys.
    pub fn keys(mut self, keys: CredentialKeys) -> Self {
        self.keys = keys;
        self
    }

    /// Declare a model.
    pub fn model(mut self, name: &str, max_completion_tokens: u32) -> Self {
        self.models.push(
            ModelInfo::builder(&self.name, name)
                .max_token_allowed(max_completion_tokens.saturating_mul(4))
                .max_completion_tokens(max_completion_tokens)
                .build(),
        );
        self
    }

    /// Accept any model name.
    pub fn accepts_any_model(mut self) -> Self {
        self.accepts_any_model = true;
        self
    }

    /// Queue a reply for the next stream opened.
    pub fn reply(self, reply: ScriptedReply) -> Self {
        lock(&self.script).replies.push_back(reply);
        self
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        lock(&self.script).requests.clone()
    }
}

impl ModelProvider for ScriptedProvider {
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
        Ok(Box::new(ScriptedHandle {
            model: options.model.to_string(),
            script: Arc::clone(&self.script),
        }))
    }
}

struct ScriptedHandle {
    model: String,
    script: Arc<Mutex<Script>>,
}

#[async_trait]
impl ModelHandle for ScriptedHandle {
    fn model(&self) -> &str {
        &self.model
    }

    async fn stream(&self, request: ChatRequest) -> Result<ChatStream> {
        let reply = {
            let mut script = lock(&self.script);
            script.requests.push(request);
            script.replies.pop_front()
        };
        let reply = reply
            .ok_or_else(|| Error::UpstreamTransport("no scripted reply queued".to_string()))?;

        if let Some(error) = reply.open_error {
            return Err(error);
        }
        Ok(Box::pin(tokio_stream::iter(reply.items)))
    }
}
