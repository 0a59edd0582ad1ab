//! Anthropic Messages wire.
//!
//! System messages travel in the top-level `system` field; the stream is a
//! sequence of typed server-sent events ending in `message_stop`.

use serde::{Deserialize, Serialize};

use super::framing::Decoder;
use super::{ChatRequest, Chunk, FinishReason, Role, Usage};
use crate::{Error, Result};

/// Path appended to the base URL.
pub(crate) const MESSAGES_PATH: &str = "/messages";

/// API version header value.
pub(crate) const ANTHROPIC_VERSION: &str = "2023-06-01";

/// `max_tokens` is mandatory on this wire.
const DEFAULT_MAX_TOKENS: u32 = 8192;

#[derive(Debug, Serialize)]
pub(crate) struct AnthropicRequest<'a> {
    pub model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<AnthropicMessage<'a>>,
    pub max_tokens: u32,
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnthropicMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

impl<'a> AnthropicRequest<'a> {
    /// Shape a chat request; system messages move to the `system` field.
    pub fn new(request: &'a ChatRequest) -> Self {
        Self {
            model: &request.model,
            system: request.system_text(),
            messages: request
                .messages
                .iter()
                .filter(|m| m.role != Role::System)
                .map(|m| AnthropicMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            stream: true,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stream Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    message: Option<MessageStart>,
    #[serde(default)]
    delta: Option<EventDelta>,
    #[serde(default)]
    usage: Option<EventUsage>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct MessageStart {
    #[serde(default)]
    usage: Option<EventUsage>,
}

#[derive(Debug, Deserialize)]
struct EventDelta {
    #[serde(rename = "type", default)]
    delta_type: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventUsage {
    #[serde(default)]
    input_tokens: Option<u64>,
    #[serde(default)]
    output_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    message: String,
}

/// Decodes Messages API events. Usage is split between `message_start`
/// and `message_delta`; both are folded into the final chunk.
#[derive(Debug, Default)]
pub(crate) struct AnthropicDecoder {
    input_tokens: u64,
    output_tokens: u64,
    reason: Option<FinishReason>,
    done: bool,
}

impl AnthropicDecoder {
    fn finish(&mut self) -> Chunk {
        self.done = true;
        Chunk::Finish {
            reason: self.reason.take().unwrap_or(FinishReason::Stop),
            usage: Usage::new(self.input_tokens, self.output_tokens),
        }
    }
}

impl Decoder for AnthropicDecoder {
    fn line(&mut self, line: &str) -> Result<Vec<Chunk>> {
        // The event name is repeated in the payload's `type`, so `event:` lines are skipped.
        let Some(data) = line.strip_prefix("data:") else {
            return Ok(vec![]);
        };
        let data = data.trim();
        if data.is_empty() {
            return Ok(vec![]);
        }

        let event: StreamEvent = serde_json::from_str(data)?;
        match event.event_type.as_str() {
            "message_start" => {
                if let Some(tokens) = event
                    .message
                    .and_then(|m| m.usage)
                    .and_then(|u| u.input_tokens)
                {
                    self.input_tokens = tokens;
                }
                Ok(vec![])
            }
            "content_block_delta" => Ok(event
                .delta
                .filter(|d| d.delta_type.as_deref() == Some("text_delta"))
                .and_then(|d| d.text)
                .filter(|t| !t.is_empty())
                .map(Chunk::Delta)
                .into_iter()
                .collect()),
            "message_delta" => {
                if let Some(reason) = event.delta.and_then(|d| d.stop_reason) {
                    self.reason = Some(FinishReason::from_vendor(&reason));
                }
                if let Some(usage) = event.usage {
                    if let Some(tokens) = usage.output_tokens {
                        self.output_tokens = tokens;
                    }
                    if let Some(tokens) = usage.input_tokens {
                        self.input_tokens = tokens;
                    }
                }
                Ok(vec![])
            }
            "message_stop" => Ok(vec![self.finish()]),
            "error" => {
                let error = event.error.ok_or_else(|| {
                    Error::UpstreamProtocol("error event without error body".to_string())
                })?;
                let message = match error.error_type {
                    Some(kind) => format!("{kind}: {}", error.message),
                    None => error.message,
                };
                Err(Error::UpstreamTransport(message))
            }
            // ping, content_block_start, content_block_stop
            _ => Ok(vec![]),
        }
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn end_of_body(&mut self) -> Option<Chunk> {
        self.reason.is_some().then(|| self.finish())
    }
}
