//! Boundary to the external text-completion service.

use crate::error::AdapterError;

/// Sends one (system, user) prompt pair to a named model and returns the raw text.
///
/// Implementations must not retry; one failure aborts the calling workflow.
#[allow(async_fn_in_trait)]
pub trait CompletionClient {
  async fn complete(
    &self,
    model: &str,
    system_prompt: &str,
    user_prompt: &str,
  ) -> Result<String, AdapterError>;
}
