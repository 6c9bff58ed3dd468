//! Domain models: flashcards, flashcard lists and reflection feedback,
//! together with the validation contract the model output must satisfy.
//!
//! Values here are only ever built through the `validate_*` functions, so
//! anything holding a `Flashcard` or `FlashcardFeedback` can trust its shape.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::SchemaError;

/// A single question/answer pair. Both sides are trimmed and non-empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Flashcard {
  question: String,
  answer: String,
}

impl Flashcard {
  pub fn question(&self) -> &str {
    &self.question
  }

  pub fn answer(&self) -> &str {
    &self.answer
  }
}

/// Non-empty, ordered set of flashcards (generation order).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FlashcardList(Vec<Flashcard>);

impl FlashcardList {
  pub fn new(cards: Vec<Flashcard>) -> Result<Self, SchemaError> {
    if cards.is_empty() {
      return Err(SchemaError::EmptyList);
    }
    Ok(Self(cards))
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  /// Always false; kept for API symmetry with `len`.
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Flashcard> {
    self.0.iter()
  }

  pub fn as_slice(&self) -> &[Flashcard] {
    &self.0
  }
}

impl<'a> IntoIterator for &'a FlashcardList {
  type Item = &'a Flashcard;
  type IntoIter = std::slice::Iter<'a, Flashcard>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.iter()
  }
}

/// Structured critique produced by one reflection cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FlashcardFeedback {
  strengths: Vec<String>,
  weaknesses: Vec<String>,
  recommendations: Vec<String>,
  overall_quality: String,
}

impl FlashcardFeedback {
  pub fn strengths(&self) -> &[String] {
    &self.strengths
  }

  pub fn weaknesses(&self) -> &[String] {
    &self.weaknesses
  }

  pub fn recommendations(&self) -> &[String] {
    &self.recommendations
  }

  pub fn overall_quality(&self) -> &str {
    &self.overall_quality
  }

  /// One-line summary used in progress output.
  pub fn summary(&self) -> String {
    format!(
      "quality \"{}\", {} strength(s), {} weakness(es), {} recommendation(s)",
      self.overall_quality,
      self.strengths.len(),
      self.weaknesses.len(),
      self.recommendations.len()
    )
  }
}

/// Prior cards plus the critique of them; lives for a single improvement call.
#[derive(Clone, Copy, Debug)]
pub struct ImprovementContext<'a> {
  pub cards: &'a FlashcardList,
  pub feedback: &'a FlashcardFeedback,
}

pub fn validate_flashcard(question: &str, answer: &str) -> Result<Flashcard, SchemaError> {
  let question = question.trim();
  if question.is_empty() {
    return Err(SchemaError::EmptyField("question"));
  }
  let answer = answer.trim();
  if answer.is_empty() {
    return Err(SchemaError::EmptyField("answer"));
  }
  Ok(Flashcard { question: question.to_string(), answer: answer.to_string() })
}

/// Validate decoded JSON items as flashcards, preserving order.
pub fn validate_flashcard_list(items: &[Value]) -> Result<FlashcardList, SchemaError> {
  let cards = items
    .iter()
    .enumerate()
    .map(|(idx, item)| {
      let obj = item.as_object().ok_or_else(|| SchemaError::WrongType {
        field: format!("item {idx}"),
        expected: "object",
      })?;
      let question = required_str(obj, "question")?;
      let answer = required_str(obj, "answer")?;
      validate_flashcard(question, answer)
    })
    .collect::<Result<Vec<_>, _>>()?;
  FlashcardList::new(cards)
}

pub fn validate_feedback(obj: &Map<String, Value>) -> Result<FlashcardFeedback, SchemaError> {
  let strengths = required_list(obj, "strengths")?;
  let weaknesses = required_list(obj, "weaknesses")?;
  let recommendations = required_list(obj, "recommendations")?;
  let overall_quality = required_str(obj, "overall_quality")?.trim();
  if overall_quality.is_empty() {
    return Err(SchemaError::EmptyField("overall_quality"));
  }
  Ok(FlashcardFeedback {
    strengths,
    weaknesses,
    recommendations,
    overall_quality: overall_quality.to_string(),
  })
}

fn required_str<'a>(obj: &'a Map<String, Value>, name: &'static str) -> Result<&'a str, SchemaError> {
  match obj.get(name) {
    None | Some(Value::Null) => Err(SchemaError::MissingField(name)),
    Some(Value::String(s)) => Ok(s),
    Some(_) => Err(SchemaError::WrongType { field: name.to_string(), expected: "string" }),
  }
}

fn required_list(obj: &Map<String, Value>, name: &'static str) -> Result<Vec<String>, SchemaError> {
  let items = match obj.get(name) {
    None | Some(Value::Null) => return Err(SchemaError::MissingField(name)),
    Some(Value::Array(items)) => items,
    Some(_) => {
      return Err(SchemaError::WrongType { field: name.to_string(), expected: "array of strings" })
    }
  };

  let mut cleaned = Vec::with_capacity(items.len());
  for item in items {
    let s = item.as_str().ok_or_else(|| SchemaError::WrongType {
      field: name.to_string(),
      expected: "array of strings",
    })?;
    let s = s.trim();
    if !s.is_empty() {
      cleaned.push(s.to_string());
    }
  }
  if cleaned.is_empty() {
    return Err(SchemaError::EmptyListField(name));
  }
  Ok(cleaned)
}

/// JSON schema of a flashcard list, pretty-printed for prompts.
/// Keys come out sorted, so the text is stable across runs.
pub fn flashcard_list_schema() -> String {
  let schema = json!({
    "title": "FlashcardList",
    "type": "array",
    "minItems": 1,
    "items": {
      "title": "Flashcard",
      "type": "object",
      "required": ["question", "answer"],
      "properties": {
        "question": {
          "type": "string",
          "minLength": 1,
          "description": "The prompt the learner should answer"
        },
        "answer": {
          "type": "string",
          "minLength": 1,
          "description": "The canonical answer for the prompt"
        }
      }
    }
  });
  render_schema(&schema)
}

pub fn feedback_schema() -> String {
  let list = |description: &str| {
    json!({
      "type": "array",
      "minItems": 1,
      "items": { "type": "string", "minLength": 1 },
      "description": description
    })
  };
  let schema = json!({
    "title": "FlashcardFeedback",
    "type": "object",
    "required": ["strengths", "weaknesses", "recommendations", "overall_quality"],
    "properties": {
      "strengths": list("Positive aspects of the flashcards"),
      "weaknesses": list("Issues that need to be addressed"),
      "recommendations": list("Actionable suggestions"),
      "overall_quality": {
        "type": "string",
        "minLength": 1,
        "description": "Summary judgement of the flashcard set"
      }
    }
  });
  render_schema(&schema)
}

fn render_schema(schema: &Value) -> String {
  // Serializing a `Value` cannot fail.
  serde_json::to_string_pretty(schema).unwrap_or_default()
}
