//! OpenAI-compatible chat completions wire.
//!
//! Used by OpenAI itself and every vendor exposing `/chat/completions`
//! with `data:` server-sent events terminated by `data: [DONE]`.

use serde::{Deserialize, Serialize};

use super::framing::Decoder;
use super::{ChatRequest, Chunk, FinishReason, Usage};
use crate::{Error, Result};

/// Path appended to the base URL.
pub(crate) const CHAT_PATH: &str = "/chat/completions";

// ────────────────────────────────────────────────────────────────────────────
// Request Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<OpenAiMessage<'a>>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<StreamOptions>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct StreamOptions {
    pub include_usage: bool,
}

impl<'a> OpenAiRequest<'a> {
    /// Shape a chat request; `stream_usage` asks the vendor for a usage chunk.
    pub fn new(request: &'a ChatRequest, stream_usage: bool) -> Self {
        Self {
            model: &request.model,
            messages: request
                .messages
                .iter()
                .map(|m| OpenAiMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            stream: true,
            max_tokens: request.max_tokens,
            stream_options: stream_usage.then_some(StreamOptions {
                include_usage: true,
            }),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stream Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Decodes `data:` lines. The finish reason and usage may arrive in
/// separate chunks, so both are held until `[DONE]`.
#[derive(Debug, Default)]
pub(crate) struct OpenAiDecoder {
    reason: Option<FinishReason>,
    usage: Option<Usage>,
    done: bool,
}

impl OpenAiDecoder {
    fn finish(&mut self) -> Chunk {
        self.done = true;
        Chunk::Finish {
            reason: self.reason.take().unwrap_or(FinishReason::Stop),
            usage: self.usage.take().unwrap_or_default(),
        }
    }
}

impl Decoder for OpenAiDecoder {
    fn line(&mut self, line: &str) -> Result<Vec<Chunk>> {
        let Some(data) = line.strip_prefix("data:") else {
            // Blank separators, comments, and `event:`/`id:` fields.
            return Ok(vec![]);
        };
        let data = data.trim();
        if data.is_empty() {
            return Ok(vec![]);
        }
        if data == "[DONE]" {
            return Ok(vec![self.finish()]);
        }

        let chunk: StreamChunk = serde_json::from_str(data)?;
        if let Some(error) = chunk.error {
            return Err(Error::UpstreamTransport(error.message));
        }
        if let Some(usage) = chunk.usage {
            self.usage = Some(Usage::new(usage.prompt_tokens, usage.completion_tokens));
        }

        let mut out = Vec::new();
        for choice in chunk.choices {
            if let Some(text) = choice.delta.and_then(|d| d.content)
                && !text.is_empty()
            {
                out.push(Chunk::Delta(text));
            }
            if let Some(reason) = choice.finish_reason {
                self.reason = Some(FinishReason::from_vendor(&reason));
            }
        }
        Ok(out)
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn end_of_body(&mut self) -> Option<Chunk> {
        // Some compatible servers close the body without `[DONE]`.
        self.reason.is_some().then(|| self.finish())
    }
}
