//! Error taxonomy shared by the contract, parser, adapter and workflow.
//!
//! Every error here propagates unchanged; nothing in the core recovers locally.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// A payload that decoded fine but breaks the flashcard/feedback contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
  #[error("empty field: {0}")]
  EmptyField(&'static str),
  #[error("empty list")]
  EmptyList,
  #[error("empty list field: {0}")]
  EmptyListField(&'static str),
  #[error("missing field: {0}")]
  MissingField(&'static str),
  #[error("wrong type for {field}: expected {expected}")]
  WrongType { field: String, expected: &'static str },
}

/// Which JSON container a parse step was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
  Array,
  Object,
}

impl fmt::Display for PayloadKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PayloadKind::Array => f.write_str("array"),
      PayloadKind::Object => f.write_str("object"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
  #[error("no {0} found")]
  NotFound(PayloadKind),
  #[error("malformed json: {0}")]
  Malformed(String),
  #[error("not an {0}")]
  WrongShape(PayloadKind),
  #[error("schema violation: {0}")]
  Schema(SchemaError),
}

impl From<SchemaError> for ParseError {
  fn from(err: SchemaError) -> Self {
    ParseError::Schema(err)
  }
}

/// Failure of the external completion call. Opaque to the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
  #[error("completion request failed: {0}")]
  Transport(String),
  #[error("completion service returned HTTP {status}: {message}")]
  Status { status: u16, message: String },
  #[error("completion response could not be decoded: {0}")]
  Decode(String),
  #[error("completion service returned no content")]
  EmptyResponse,
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("unknown preset: {0}")]
  UnknownPreset(String),
  #[error("max_reflections must be at most {max}, got {requested}")]
  ReflectionBound { requested: u32, max: u32 },
  #[error("unknown provider: {0}")]
  UnknownProvider(String),
  #[error("missing API key: set {env}")]
  MissingApiKey { env: &'static str },
  #[error("empty model name")]
  EmptyModel,
  #[error("failed to read config {}", .path.display())]
  ReadFile {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("failed to parse config {}: {message}", .path.display())]
  ParseFile { path: PathBuf, message: String },
  #[error("failed to build HTTP client: {0}")]
  HttpClient(String),
}

/// Problems with the text the user asked us to learn from.
#[derive(Debug, Error)]
pub enum SourceError {
  #[error("input file not found: {}", .0.display())]
  NotFound(PathBuf),
  #[error("path is not a file: {}", .0.display())]
  NotAFile(PathBuf),
  #[error("error reading file {}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("input file is empty: {}", .0.display())]
  Empty(PathBuf),
  #[error("learning objective is empty")]
  EmptyObjective,
}

#[derive(Debug, Error)]
#[error("failed to write {}", .path.display())]
pub struct OutputError {
  pub path: PathBuf,
  #[source]
  pub source: std::io::Error,
}

/// Where in the loop a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Generation,
  Reflection { cycle: u32 },
  Improvement { cycle: u32 },
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Phase::Generation => f.write_str("during generation"),
      Phase::Reflection { cycle } => write!(f, "during reflection cycle {cycle}"),
      Phase::Improvement { cycle } => write!(f, "during improvement cycle {cycle}"),
    }
  }
}

#[derive(Debug, Error)]
pub enum StepError {
  #[error(transparent)]
  Adapter(#[from] AdapterError),
  #[error(transparent)]
  Parse(#[from] ParseError),
}

/// Aborted workflow run. No partial card set survives one of these.
///
/// The message names the phase; the failing step is the error source.
#[derive(Debug, Error)]
#[error("workflow aborted {phase}")]
pub struct WorkflowError {
  pub phase: Phase,
  #[source]
  pub source: StepError,
}

impl WorkflowError {
  pub fn new(phase: Phase, source: impl Into<StepError>) -> Self {
    Self { phase, source: source.into() }
  }
}
