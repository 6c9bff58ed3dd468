//! Prompt construction for the three phases of the workflow.
//!
//! System prompts are a pure function of the preset; user prompts are a pure
//! function of the source text, the learning objective and (for reflection
//! and improvement) the current cards. Nothing here touches the network or disk.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::domain::{feedback_schema, flashcard_list_schema, FlashcardFeedback, FlashcardList, ImprovementContext};
use crate::error::ConfigError;
use crate::util::fill_template;

/// Named variant of the instructional wording. Does not change the data contract.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Preset {
  #[default]
  General,
  Cloze,
  Concepts,
  Procedures,
  Programming,
}

impl Preset {
  pub const ALL: [Preset; 5] =
    [Preset::General, Preset::Cloze, Preset::Concepts, Preset::Procedures, Preset::Programming];

  pub fn name(self) -> &'static str {
    match self {
      Preset::General => "general",
      Preset::Cloze => "cloze",
      Preset::Concepts => "concepts",
      Preset::Procedures => "procedures",
      Preset::Programming => "programming",
    }
  }

  pub fn description(self) -> &'static str {
    match self {
      Preset::General => "balanced question/answer cards",
      Preset::Cloze => "fill-in-the-blank sentences",
      Preset::Concepts => "definitions, distinctions and relationships",
      Preset::Procedures => "ordered steps, preconditions and outcomes",
      Preset::Programming => "APIs, syntax, semantics and pitfalls of code",
    }
  }

  fn guidance(self) -> &'static Guidance {
    match self {
      Preset::General => &GENERAL,
      Preset::Cloze => &CLOZE,
      Preset::Concepts => &CONCEPTS,
      Preset::Procedures => &PROCEDURES,
      Preset::Programming => &PROGRAMMING,
    }
  }
}

impl fmt::Display for Preset {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for Preset {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let wanted = s.trim();
    Preset::ALL
      .into_iter()
      .find(|p| p.name().eq_ignore_ascii_case(wanted))
      .ok_or_else(|| ConfigError::UnknownPreset(s.to_string()))
  }
}

/// Per-preset wording spliced into the shared phase templates.
struct Guidance {
  generation: &'static str,
  reflection: &'static str,
  improvement: &'static str,
}

const GENERAL: Guidance = Guidance {
  generation: "\
- Keep each question clear and concise, testing one idea.
- Test understanding of key concepts rather than trivia.
- Cover the important information in the text.
- Make answers short enough to memorize.",
  reflection: "\
- Is every card atomic, unambiguous and answerable from the text?
- Does the set cover the learning objective without redundancy?",
  improvement: "\
- Split cards that test more than one idea.
- Fill the coverage gaps named in the feedback.",
};

const CLOZE: Guidance = Guidance {
  generation: "\
- Write each card as a cloze deletion: the question is a sentence from or
  faithful to the text with exactly one key term replaced by \"[...]\".
- The answer is only the hidden term or short phrase.
- Hide the part a learner most needs to recall, never filler words.",
  reflection: "\
- Does each cloze hide exactly one meaningful term?
- Is the remaining sentence enough context to recall the hidden term uniquely?",
  improvement: "\
- Keep every card in cloze form with a single \"[...]\" deletion.
- Move deletions that hide trivial words onto key terms.",
};

const CONCEPTS: Guidance = Guidance {
  generation: "\
- Focus on concepts: definitions, distinguishing features, relationships and
  contrasts between ideas.
- Prefer \"why\" and \"how does X differ from Y\" over rote recall.
- Answers explain the concept in one or two sentences.",
  reflection: "\
- Do the cards capture the central concepts and how they relate?
- Do any cards reduce a concept to a keyword without understanding?",
  improvement: "\
- Add cards for missing relationships and contrasts.
- Rewrite keyword-only cards so the answer shows understanding.",
};

const PROCEDURES: Guidance = Guidance {
  generation: "\
- Focus on procedures: ordered steps, preconditions, decision points and
  expected outcomes.
- Ask \"what comes after\", \"what must be true before\" and \"what happens if\".
- Keep step order explicit in answers.",
  reflection: "\
- Are the steps complete and in the correct order?
- Are preconditions and failure cases covered?",
  improvement: "\
- Fix any step ordering errors.
- Add cards for missing preconditions or failure handling.",
};

const PROGRAMMING: Guidance = Guidance {
  generation: "\
- Focus on programming knowledge: API behavior, syntax, semantics, complexity
  and common pitfalls.
- Use short inline code in questions or answers where it helps.
- Ask what code does, why it behaves that way, and when to use it.",
  reflection: "\
- Are code snippets correct and minimal?
- Do cards test behavior and pitfalls, not just names?",
  improvement: "\
- Correct any inaccurate code or API claims.
- Replace name-only cards with cards about behavior.",
};

const GENERATION_SYSTEM_TEMPLATE: &str = "\
You are an expert at creating educational flashcards for spaced repetition.
Your task is to extract the key information from a text and turn it into
question-answer flashcards that serve the learner's stated objective.

Guidelines:
{guidance}

You must produce JSON that conforms exactly to this JSON schema:
{schema}

Output only the JSON array. Do not wrap it in commentary.";

const REFLECTION_SYSTEM_TEMPLATE: &str = "\
You are a meticulous reviewer of educational flashcards.
Provide constructive feedback on a flashcard set generated from a source text
for a specific learning objective.

Assess in particular:
{guidance}
- Are answers accurate with respect to the source text?

You must produce a JSON object that conforms exactly to this JSON schema:
{schema}

Every list must contain at least one entry. Output only the JSON object.";

const IMPROVEMENT_SYSTEM_TEMPLATE: &str = "\
You are an expert at refining educational flashcards.
You receive a source text, a learning objective, an existing flashcard set and
structured feedback about it. Return improved flashcards that address the
feedback while staying faithful to the source text.

When improving:
{guidance}
- Keep cards that were already good; the result replaces the previous set.

You must produce JSON that conforms exactly to this JSON schema:
{schema}

Output only the JSON array. Do not wrap it in commentary.";

const GENERATION_USER_TEMPLATE: &str = "\
Based on the following learning objective: \"{objective}\"

Please analyze the following text and generate relevant flashcards:

{text}

Return ONLY a valid JSON array of objects with \"question\" and \"answer\" fields.
Do not include any explanation or additional text outside the JSON.";

const REFLECTION_USER_TEMPLATE: &str = "\
Learning objective: \"{objective}\"

Source text:

{text}

Flashcards to review:

{cards}

Assess how well these flashcards serve the learning objective.
Return ONLY a JSON object with \"strengths\", \"weaknesses\", \"recommendations\"
and \"overall_quality\" fields.";

const IMPROVEMENT_USER_TEMPLATE: &str = "\
Based on the following learning objective: \"{objective}\"

Source text:

{text}

Previous flashcards:

{cards}

Feedback on the previous flashcards:

{feedback}

Produce an improved set of flashcards that addresses this feedback.
Return ONLY a valid JSON array of objects with \"question\" and \"answer\" fields.
Do not include any explanation or additional text outside the JSON.";

/// System prompts for the three phases, resolved once per workflow run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemPrompts {
  pub generation: String,
  pub reflection: String,
  pub improvement: String,
}

impl SystemPrompts {
  pub fn for_preset(preset: Preset) -> Self {
    let guidance = preset.guidance();
    let cards = flashcard_list_schema();
    let feedback = feedback_schema();
    Self {
      generation: fill_template(
        GENERATION_SYSTEM_TEMPLATE,
        &[("guidance", guidance.generation), ("schema", &cards)],
      ),
      reflection: fill_template(
        REFLECTION_SYSTEM_TEMPLATE,
        &[("guidance", guidance.reflection), ("schema", &feedback)],
      ),
      improvement: fill_template(
        IMPROVEMENT_SYSTEM_TEMPLATE,
        &[("guidance", guidance.improvement), ("schema", &cards)],
      ),
    }
  }
}

/// Resolve a preset by name and render its (generation, reflection, improvement) prompts.
pub fn system_prompts(preset: &str) -> Result<(String, String, String), ConfigError> {
  let SystemPrompts { generation, reflection, improvement } =
    SystemPrompts::for_preset(preset.parse()?);
  Ok((generation, reflection, improvement))
}

pub fn user_prompt_for_generation(source_text: &str, objective: &str) -> String {
  fill_template(GENERATION_USER_TEMPLATE, &[("objective", objective), ("text", source_text)])
}

pub fn user_prompt_for_reflection(source_text: &str, objective: &str, cards: &FlashcardList) -> String {
  let cards = to_prompt_json(cards);
  fill_template(
    REFLECTION_USER_TEMPLATE,
    &[("objective", objective), ("text", source_text), ("cards", &cards)],
  )
}

pub fn user_prompt_for_improvement(
  source_text: &str,
  objective: &str,
  context: ImprovementContext<'_>,
) -> String {
  let cards = to_prompt_json(context.cards);
  let feedback = to_prompt_json::<FlashcardFeedback>(context.feedback);
  fill_template(
    IMPROVEMENT_USER_TEMPLATE,
    &[("objective", objective), ("text", source_text), ("cards", &cards), ("feedback", &feedback)],
  )
}

/// Pretty JSON in struct declaration order, so prompts are stable and readable.
fn to_prompt_json<T: Serialize + ?Sized>(value: &T) -> String {
  serde_json::to_string_pretty(value).unwrap_or_default()
}
