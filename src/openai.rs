//! Minimal OpenAI-compatible chat client.
//!
//! We only call chat.completions with one system and one user message and
//! return the plain text. Calls are instrumented and log model names, latencies
//! and response sizes (not contents).
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::completion::CompletionClient;
use crate::config::{CompletionCfg, BASE_URL_ENV};
use crate::error::{AdapterError, ConfigError};
use crate::provider::ModelRef;

const CLIENT_USER_AGENT: &str = concat!("cardforge/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct OpenAiClient {
  client: reqwest::Client,
  api_key: String,
  base_url: String,
  temperature: Option<f32>,
  max_output_tokens: Option<u32>,
}

impl OpenAiClient {
  pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, cfg: &CompletionCfg) -> Result<Self, ConfigError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(cfg.timeout_secs))
      .build()
      .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

    Ok(Self {
      client,
      api_key: api_key.into(),
      base_url: base_url.into().trim_end_matches('/').to_string(),
      temperature: cfg.temperature,
      max_output_tokens: cfg.max_output_tokens,
    })
  }

  /// Build the client for a model's provider, reading the API key from its env var.
  /// Base URL precedence: `OPENAI_BASE_URL` (openai only), config, provider default.
  pub fn for_model(model: &ModelRef, cfg: &CompletionCfg) -> Result<Self, ConfigError> {
    let provider = model.provider;
    let api_key = std::env::var(provider.api_key_env)
      .ok()
      .filter(|k| !k.trim().is_empty())
      .ok_or(ConfigError::MissingApiKey { env: provider.api_key_env })?;

    let env_base_url = (provider.name == "openai")
      .then(|| std::env::var(BASE_URL_ENV).ok())
      .flatten()
      .filter(|u| !u.trim().is_empty());
    let base_url = env_base_url
      .or_else(|| cfg.base_url.clone())
      .unwrap_or_else(|| provider.base_url.to_string());

    let client = Self::new(api_key.trim(), base_url, cfg)?;
    info!(target: "cardforge", provider = provider.name, base_url = %client.base_url, "Completion client ready");
    Ok(client)
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  fn chat_url(&self) -> String {
    format!("{}/chat/completions", self.base_url)
  }

  fn request(&self, model: &str, system: &str, user: &str) -> ChatCompletionRequest {
    ChatCompletionRequest {
      model: model.to_string(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature: self.temperature,
      max_completion_tokens: self.max_output_tokens,
    }
  }
}

impl CompletionClient for OpenAiClient {
  /// Plain-text chat completion.
  #[instrument(level = "info", skip(self, system_prompt, user_prompt),
               fields(%model, system_len = system_prompt.len(), user_len = user_prompt.len()))]
  async fn complete(
    &self,
    model: &str,
    system_prompt: &str,
    user_prompt: &str,
  ) -> Result<String, AdapterError> {
    let req = self.request(model, system_prompt, user_prompt);
    let start = Instant::now();

    let res = self.client.post(self.chat_url())
      .header(USER_AGENT, CLIENT_USER_AGENT)
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await
      .map_err(|e| {
        error!(elapsed = ?start.elapsed(), error = %e, "Completion request failed");
        AdapterError::Transport(e.to_string())
      })?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or(body);
      error!(elapsed = ?start.elapsed(), %status, "Completion service returned an error status");
      return Err(AdapterError::Status { status: status.as_u16(), message });
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| AdapterError::Decode(e.to_string()))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "Completion usage");
    }
    let text = first_choice_text(body)?;
    info!(elapsed = ?start.elapsed(), response_len = text.len(), "Model response received");
    Ok(text)
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  #[serde(skip_serializing_if = "Option::is_none")]
  temperature: Option<f32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_completion_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  #[serde(default)] choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

fn first_choice_text(body: ChatCompletionResponse) -> Result<String, AdapterError> {
  body.choices.into_iter().next()
    .and_then(|c| c.message.content)
    .map(|text| text.trim().to_string())
    .filter(|text| !text.is_empty())
    .ok_or(AdapterError::EmptyResponse)
}

/// Try to extract a clean error message from an OpenAI-style error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
