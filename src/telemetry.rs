//! Telemetry initialization (tracing/tracing-subscriber).
//!
//! Behavior:
//! - LOG_LEVEL controls the filter (e.g. "debug" or detailed directives like
//!   "info,cardforge=debug,reqwest=info").
//! - LOG_FORMAT selects "pretty" (default) or "json" structured logs.
//! - Logs go to stderr; stdout is reserved for progress and results.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "warn,cardforge=info";

pub fn init_tracing() {
  let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(true)
    .with_file(true)
    .with_line_number(true);

  // `.json()` changes the builder's type, so each arm calls `init` itself.
  match std::env::var("LOG_FORMAT").as_deref() {
    Ok("json") => builder.json().init(),
    _ => builder.init(),
  }
}
