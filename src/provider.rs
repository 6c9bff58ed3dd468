//! Model references of the form `provider:model` and the providers we know.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmProvider {
  pub name: &'static str,
  pub base_url: &'static str,
  pub api_key_env: &'static str,
}

pub const DEFAULT_PROVIDER: &str = "openai";

pub const LLM_PROVIDERS: &[LlmProvider] = &[
  LlmProvider {
    name: "openai",
    base_url: "https://api.openai.com/v1",
    api_key_env: "OPENAI_API_KEY",
  },
  LlmProvider {
    name: "anthropic",
    base_url: "https://api.anthropic.com/v1",
    api_key_env: "ANTHROPIC_API_KEY",
  },
];

pub fn find_provider(name: &str) -> Option<&'static LlmProvider> {
  let name = name.trim();
  LLM_PROVIDERS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

/// A parsed `provider:model` string. A bare model name means the default provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRef {
  pub provider: &'static LlmProvider,
  pub model: String,
}

impl FromStr for ModelRef {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    let (provider_name, model) = s.split_once(':').unwrap_or((DEFAULT_PROVIDER, s));
    let provider =
      find_provider(provider_name).ok_or_else(|| ConfigError::UnknownProvider(provider_name.to_string()))?;
    let model = model.trim();
    if model.is_empty() {
      return Err(ConfigError::EmptyModel);
    }
    Ok(Self { provider, model: model.to_string() })
  }
}

impl fmt::Display for ModelRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.provider.name, self.model)
  }
}
