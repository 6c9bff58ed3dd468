//! Extract and validate the JSON payload embedded in free-form model output.
//!
//! Models like to wrap JSON in prose or fenced code blocks, so we locate the
//! payload by its brackets. The first opener starts the payload. The end is
//! the matching closer found by a string-aware depth scan, or, when the text
//! after the opener never balances, the last closer in the text.

use serde_json::Value;
use tracing::debug;

use crate::domain::{validate_feedback, validate_flashcard_list, FlashcardFeedback, FlashcardList};
use crate::error::{ParseError, PayloadKind};
use crate::util::trunc_for_log;

pub fn parse_flashcards(raw_text: &str) -> Result<FlashcardList, ParseError> {
  let value = decode_payload(raw_text, PayloadKind::Array)?;
  Ok(validate_flashcard_list(expect_array(&value)?)?)
}

pub fn parse_feedback(raw_text: &str) -> Result<FlashcardFeedback, ParseError> {
  let value = decode_payload(raw_text, PayloadKind::Object)?;
  Ok(validate_feedback(expect_object(&value)?)?)
}

fn expect_array(value: &Value) -> Result<&[Value], ParseError> {
  value.as_array().map(Vec::as_slice).ok_or(ParseError::WrongShape(PayloadKind::Array))
}

fn expect_object(value: &Value) -> Result<&serde_json::Map<String, Value>, ParseError> {
  value.as_object().ok_or(ParseError::WrongShape(PayloadKind::Object))
}

fn decode_payload(raw_text: &str, kind: PayloadKind) -> Result<Value, ParseError> {
  let slice = locate(raw_text, kind).ok_or(ParseError::NotFound(kind))?;
  serde_json::from_str(slice).map_err(|e| {
    debug!(%kind, error = %e, payload = %trunc_for_log(slice, 200), "Model payload is not valid JSON");
    ParseError::Malformed(e.to_string())
  })
}

fn delimiters(kind: PayloadKind) -> (char, char) {
  match kind {
    PayloadKind::Array => ('[', ']'),
    PayloadKind::Object => ('{', '}'),
  }
}

/// Byte slice holding the candidate payload, inclusive of both delimiters.
fn locate(text: &str, kind: PayloadKind) -> Option<&str> {
  let (open, close) = delimiters(kind);
  let start = text.find(open)?;
  if let Some(end) = balanced_end(&text[start..], open, close) {
    return Some(&text[start..start + end + 1]);
  }
  let end = text.rfind(close)?;
  (end > start).then(|| &text[start..=end])
}

/// Offset of the closer matching the opener at offset 0, ignoring
/// delimiters inside JSON string literals.
fn balanced_end(text: &str, open: char, close: char) -> Option<usize> {
  let mut depth = 0usize;
  let mut in_string = false;
  let mut escaped = false;
  for (idx, ch) in text.char_indices() {
    if in_string {
      match ch {
        _ if escaped => escaped = false,
        '\\' => escaped = true,
        '"' => in_string = false,
        _ => {}
      }
      continue;
    }
    match ch {
      '"' => in_string = true,
      c if c == open => depth += 1,
      c if c == close => {
        depth = depth.checked_sub(1)?;
        if depth == 0 {
          return Some(idx);
        }
      }
      _ => {}
    }
  }
  None
}
