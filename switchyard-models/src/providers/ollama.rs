//! Ollama chat wire.
//!
//! Connects to an Ollama instance for running models like Llama, Mistral, etc.
//! Responses stream as newline-delimited JSON objects, the last one carrying
//! `done: true` and token counts.

use serde::{Deserialize, Serialize};

use super::framing::Decoder;
use super::{ChatRequest, Chunk, FinishReason, Usage};
use crate::{Error, Result};

/// Default Ollama API base URL.
pub(crate) const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Path appended to the base URL.
pub(crate) const CHAT_PATH: &str = "/api/chat";

// ────────────────────────────────────────────────────────────────────────────
// Ollama API Types
// ────────────────────────────────────────────────────────────────────────────

/// Message in an Ollama chat request.
#[derive(Debug, Serialize)]
pub(crate) struct OllamaChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

/// Request body for Ollama's `/api/chat` endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct OllamaChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<OllamaChatMessage<'a>>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<OllamaChatOptions>,
}

/// Chat options for Ollama.
#[derive(Debug, Serialize)]
pub(crate) struct OllamaChatOptions {
    pub num_predict: u32,
}

impl<'a> OllamaChatRequest<'a> {
    /// Shape a chat request; `max_tokens` becomes `options.num_predict`.
    pub fn new(request: &'a ChatRequest) -> Self {
        Self {
            model: &request.model,
            messages: request
                .messages
                .iter()
                .map(|m| OllamaChatMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            stream: true,
            options: request
                .max_tokens
                .map(|num_predict| OllamaChatOptions { num_predict }),
        }
    }
}

/// One line of Ollama's streamed `/api/chat` response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    message: Option<OllamaResponseMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Default)]
pub(crate) struct OllamaDecoder {
    done: bool,
}

impl Decoder for OllamaDecoder {
    fn line(&mut self, line: &str) -> Result<Vec<Chunk>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(vec![]);
        }

        let response: OllamaChatResponse = serde_json::from_str(trimmed)?;
        if let Some(error) = response.error {
            return Err(Error::UpstreamTransport(error));
        }

        let mut out = Vec::new();
        if let Some(message) = response.message
            && !message.content.is_empty()
        {
            out.push(Chunk::Delta(message.content));
        }
        if response.done {
            self.done = true;
            out.push(Chunk::Finish {
                reason: response
                    .done_reason
                    .as_deref()
                    .map(FinishReason::from_vendor)
                    .unwrap_or(FinishReason::Stop),
                usage: Usage::new(
                    response.prompt_eval_count.unwrap_or(0),
                    response.eval_count.unwrap_or(0),
                ),
            });
        }
        Ok(out)
    }

    fn is_done(&self) -> bool {
        self.done
    }
}
