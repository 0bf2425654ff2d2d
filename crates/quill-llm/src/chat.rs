//! [`ChatGenerator`]: the OpenAI-compatible chat-completions client.

use std::time::Duration;

use quill_core::{
  generator::{GenerationError, Generated, NarrativeGenerator},
  prompt::Message,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Connection settings for a chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct ChatConfig {
  /// Base URL up to, not including, `/chat/completions`.
  pub base_url: String,
  /// Sent as a bearer token when present.
  pub api_key:  Option<String>,
  pub model:    String,
  pub timeout:  Duration,
}

impl ChatConfig {
  pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
}

/// Narrative generator backed by a chat-completions API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ChatGenerator {
  client:   Client,
  endpoint: String,
  api_key:  Option<String>,
  model:    String,
}

impl ChatGenerator {
  pub fn new(config: ChatConfig) -> Result<Self> {
    let base = config.base_url.trim_end_matches('/');
    if !(base.starts_with("http://") || base.starts_with("https://")) {
      return Err(Error::BaseUrl(config.base_url));
    }

    let client = Client::builder().timeout(config.timeout).build()?;
    Ok(Self {
      client,
      endpoint: format!("{base}/chat/completions"),
      api_key: config.api_key.filter(|k| !k.is_empty()),
      model: config.model,
    })
  }
}

impl NarrativeGenerator for ChatGenerator {
  async fn generate(&self, conversation: &[Message]) -> Result<Generated, GenerationError> {
    let body = ChatRequest {
      model:           &self.model,
      messages:        conversation,
      response_format: ResponseFormat { kind: "json_object" },
    };

    let mut req = self.client.post(&self.endpoint).json(&body);
    if let Some(key) = &self.api_key {
      req = req.bearer_auth(key);
    }

    tracing::debug!(model = %self.model, turns = conversation.len(), "requesting chapter");
    let resp = req
      .send()
      .await
      .map_err(|e| GenerationError::Backend(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
      let text = resp.text().await.unwrap_or_default();
      tracing::warn!(%status, "chat completion rejected");
      return Err(GenerationError::Backend(format!("{status}: {}", text.trim())));
    }

    let parsed: ChatResponse = resp
      .json()
      .await
      .map_err(|e| GenerationError::Malformed(e.to_string()))?;
    into_generated(parsed)
  }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
  model:           &'a str,
  messages:        &'a [Message],
  response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
  #[serde(rename = "type")]
  kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
  #[serde(default)]
  choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
  message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
  content: Option<String>,
}

/// The JSON object the model is instructed to reply with.
#[derive(Deserialize)]
struct ChapterReply {
  narrative: String,
  #[serde(default)]
  options:   Vec<ReplyOption>,
}

#[derive(Deserialize)]
struct ReplyOption {
  action: String,
}

// ─── Parsing ─────────────────────────────────────────────────────────────────

fn into_generated(resp: ChatResponse) -> Result<Generated, GenerationError> {
  let content = resp
    .choices
    .into_iter()
    .next()
    .and_then(|c| c.message.content)
    .ok_or_else(|| GenerationError::Malformed("no content in response".into()))?;
  parse_chapter(&content)
}

/// Parse the model's reply into a validated [`Generated`].
fn parse_chapter(content: &str) -> Result<Generated, GenerationError> {
  let reply: ChapterReply = serde_json::from_str(strip_code_fence(content))
    .map_err(|e| GenerationError::Malformed(format!("chapter JSON: {e}")))?;

  Generated {
    narrative: reply.narrative,
    options:   reply.options.into_iter().map(|o| o.action).collect(),
  }
  .validate()
}

/// Some models wrap JSON replies in a markdown fence despite being asked not
/// to.
fn strip_code_fence(content: &str) -> &str {
  let trimmed = content.trim();
  let Some(inner) = trimmed.strip_prefix("```") else {
    return trimmed;
  };
  let inner = inner.strip_prefix("json").unwrap_or(inner);
  inner.strip_suffix("```").unwrap_or(inner).trim()
}
