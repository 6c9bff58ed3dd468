//! Loading run configuration from TOML.
//!
//! See `AppConfig` for the expected schema. Every key is optional; missing keys
//! fall back to the defaults below and CLI flags override whatever is loaded.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::error::ConfigError;

pub const CONFIG_PATH_ENV: &str = "CARDFORGE_CONFIG";
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

pub const DEFAULT_MODEL: &str = "openai:gpt-5-mini";
pub const DEFAULT_DECK_NAME: &str = "Generated Deck";
pub const DEFAULT_MAX_REFLECTIONS: u32 = 1;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Clone, Debug, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
  #[serde(default)]
  pub workflow: WorkflowCfg,
  #[serde(default)]
  pub completion: CompletionCfg,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct WorkflowCfg {
  pub model: String,
  pub preset: String,
  pub max_reflections: u32,
  pub deck_name: String,
}

impl Default for WorkflowCfg {
  fn default() -> Self {
    Self {
      model: DEFAULT_MODEL.into(),
      preset: "general".into(),
      max_reflections: DEFAULT_MAX_REFLECTIONS,
      deck_name: DEFAULT_DECK_NAME.into(),
    }
  }
}

/// Settings for the HTTP completion client.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CompletionCfg {
  /// Overrides the provider's base URL (e.g. a local OpenAI-compatible server).
  pub base_url: Option<String>,
  pub timeout_secs: u64,
  /// Left unset by default: some reasoning models reject anything but 1.0.
  pub temperature: Option<f32>,
  pub max_output_tokens: Option<u32>,
}

impl Default for CompletionCfg {
  fn default() -> Self {
    Self { base_url: None, timeout_secs: DEFAULT_TIMEOUT_SECS, temperature: None, max_output_tokens: None }
  }
}

impl AppConfig {
  pub fn from_toml_str(s: &str, path: &Path) -> Result<Self, ConfigError> {
    toml::from_str(s).map_err(|e| ConfigError::ParseFile { path: path.to_path_buf(), message: e.to_string() })
  }

  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    let s = std::fs::read_to_string(path)
      .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    let cfg = Self::from_toml_str(&s, path)?;
    info!(target: "cardforge", path = %path.display(), "Loaded config (TOML)");
    Ok(cfg)
  }

  /// Explicit path first, then `CARDFORGE_CONFIG`, then built-in defaults.
  pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
    let path = explicit
      .map(Path::to_path_buf)
      .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));
    match path {
      Some(path) => Self::from_file(&path),
      None => Ok(Self::default()),
    }
  }
}
