//! Cardforge · text to flashcards
//!
//! - Generates question/answer flashcards from arbitrary text via an
//!   OpenAI-compatible completion service
//! - Optionally reviews and rewrites them through bounded reflect/improve cycles
//! - Writes a Markdown preview and an Anki-importable text deck
//!
//! Important env variables:
//!   OPENAI_API_KEY     : key for the `openai` provider
//!   ANTHROPIC_API_KEY  : key for the `anthropic` provider
//!   OPENAI_BASE_URL    : overrides the `openai` base URL
//!   CARDFORGE_CONFIG   : path to TOML config (see `config::AppConfig`)
//!   LOG_LEVEL          : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT         : "pretty" (default) or "json"

pub mod completion;
pub mod config;
pub mod deck;
pub mod domain;
pub mod error;
pub mod openai;
pub mod parser;
pub mod prompts;
pub mod provider;
pub mod report;
pub mod source;
pub mod telemetry;
pub mod util;
pub mod workflow;

pub use completion::CompletionClient;
pub use domain::{Flashcard, FlashcardFeedback, FlashcardList};
pub use error::{AdapterError, ConfigError, ParseError, SchemaError, WorkflowError};
pub use prompts::Preset;
pub use source::SourceText;
pub use workflow::{Progress, RunMode, Workflow, WorkflowSettings};
