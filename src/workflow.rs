//! Generate → [reflect → improve]×N → finalize.
//!
//! Each transition makes exactly one completion call and waits for it. Any
//! failure aborts the whole run; the caller only ever sees a fully valid,
//! non-empty card set or a `WorkflowError` naming the phase.

use std::fmt;

use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::completion::CompletionClient;
use crate::domain::{FlashcardFeedback, FlashcardList, ImprovementContext};
use crate::error::{ConfigError, Phase, StepError, WorkflowError};
use crate::parser::{parse_feedback, parse_flashcards};
use crate::prompts::{
  user_prompt_for_generation, user_prompt_for_improvement, user_prompt_for_reflection, Preset, SystemPrompts,
};
use crate::source::SourceText;

/// Upper bound on reflect+improve round-trips per run.
pub const MAX_REFLECTIONS: u32 = 5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunMode {
  /// Run every configured reflection cycle.
  #[default]
  Full,
  /// Finalize right after generation, skipping reflection.
  Preview,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkflowSettings {
  model: String,
  preset: Preset,
  max_reflections: u32,
  mode: RunMode,
}

impl WorkflowSettings {
  pub fn new(model: impl Into<String>, preset: Preset, max_reflections: u32) -> Result<Self, ConfigError> {
    if max_reflections > MAX_REFLECTIONS {
      return Err(ConfigError::ReflectionBound { requested: max_reflections, max: MAX_REFLECTIONS });
    }
    let model = model.into();
    if model.trim().is_empty() {
      return Err(ConfigError::EmptyModel);
    }
    Ok(Self { model, preset, max_reflections, mode: RunMode::Full })
  }

  pub fn with_mode(mut self, mode: RunMode) -> Self {
    self.mode = mode;
    self
  }

  pub fn model(&self) -> &str {
    &self.model
  }

  pub fn preset(&self) -> Preset {
    self.preset
  }

  pub fn max_reflections(&self) -> u32 {
    self.max_reflections
  }

  pub fn mode(&self) -> RunMode {
    self.mode
  }

  /// Reflection cycles this run will actually perform.
  pub fn planned_cycles(&self) -> u32 {
    match self.mode {
      RunMode::Full => self.max_reflections,
      RunMode::Preview => 0,
    }
  }
}

/// Observational progress notification emitted at each transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Progress {
  Generated { cards: usize },
  Reflected { cycle: u32, summary: String },
  Improved { cycle: u32, cards: usize },
  Finalized { cards: usize },
}

impl fmt::Display for Progress {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Progress::Generated { cards } => write!(f, "Generated {cards} flashcard(s)"),
      Progress::Reflected { cycle, summary } => write!(f, "Reflection {cycle}: {summary}"),
      Progress::Improved { cycle, cards } => write!(f, "Improvement {cycle}: {cards} flashcard(s)"),
      Progress::Finalized { cards } => write!(f, "Finalized {cards} flashcard(s)"),
    }
  }
}

/// Loop states. Each carries exactly the data the next transition needs, so a
/// replaced card set is moved out and dropped rather than kept around.
enum Stage {
  Initial,
  Generated(FlashcardList),
  Reflected { cycle: u32, cards: FlashcardList, feedback: FlashcardFeedback },
  Improved { cycle: u32, cards: FlashcardList },
  Finalized(FlashcardList),
}

pub struct Workflow<'a, C> {
  client: &'a C,
  settings: WorkflowSettings,
  prompts: SystemPrompts,
  observer: Option<Box<dyn FnMut(&Progress) + 'a>>,
}

impl<'a, C: CompletionClient> Workflow<'a, C> {
  pub fn new(client: &'a C, settings: WorkflowSettings) -> Self {
    let prompts = SystemPrompts::for_preset(settings.preset);
    Self { client, settings, prompts, observer: None }
  }

  pub fn on_progress(mut self, observer: impl FnMut(&Progress) + 'a) -> Self {
    self.observer = Some(Box::new(observer));
    self
  }

  pub async fn run(&mut self, source: &SourceText) -> Result<FlashcardList, WorkflowError> {
    let run_id = Uuid::new_v4();
    let span = info_span!(
      "workflow",
      %run_id,
      model = %self.settings.model,
      preset = %self.settings.preset,
      cycles = self.settings.planned_cycles(),
      text_len = source.text().len(),
    );
    self.drive(source).instrument(span).await
  }

  async fn drive(&mut self, source: &SourceText) -> Result<FlashcardList, WorkflowError> {
    let planned = self.settings.planned_cycles();
    let mut stage = Stage::Initial;
    loop {
      stage = match stage {
        Stage::Initial => {
          let cards = self.generate(source).await?;
          self.notify(Progress::Generated { cards: cards.len() });
          Stage::Generated(cards)
        }
        Stage::Generated(cards) => {
          if planned == 0 {
            Stage::Finalized(cards)
          } else {
            self.reflect(source, 1, cards).await?
          }
        }
        Stage::Reflected { cycle, cards, feedback } => {
          let improved = self.improve(source, cycle, &cards, &feedback).await?;
          self.notify(Progress::Improved { cycle, cards: improved.len() });
          Stage::Improved { cycle, cards: improved }
        }
        Stage::Improved { cycle, cards } => {
          if cycle >= planned {
            Stage::Finalized(cards)
          } else {
            self.reflect(source, cycle + 1, cards).await?
          }
        }
        Stage::Finalized(cards) => {
          info!(cards = cards.len(), "Workflow finalized");
          self.notify(Progress::Finalized { cards: cards.len() });
          return Ok(cards);
        }
      };
    }
  }

  async fn generate(&self, source: &SourceText) -> Result<FlashcardList, WorkflowError> {
    let phase = Phase::Generation;
    let user = user_prompt_for_generation(source.text(), source.objective());
    let raw = self.call(phase, &self.prompts.generation, &user).await?;
    let cards = parse_flashcards(&raw).map_err(|e| self.fail(phase, e))?;
    info!(cards = cards.len(), "Generated flashcards");
    Ok(cards)
  }

  async fn reflect(&mut self, source: &SourceText, cycle: u32, cards: FlashcardList) -> Result<Stage, WorkflowError> {
    let phase = Phase::Reflection { cycle };
    let user = user_prompt_for_reflection(source.text(), source.objective(), &cards);
    let raw = self.call(phase, &self.prompts.reflection, &user).await?;
    let feedback = parse_feedback(&raw).map_err(|e| self.fail(phase, e))?;
    info!(cycle, quality = %feedback.overall_quality(), weaknesses = feedback.weaknesses().len(), "Reflection complete");
    self.notify(Progress::Reflected { cycle, summary: feedback.summary() });
    Ok(Stage::Reflected { cycle, cards, feedback })
  }

  async fn improve(
    &self,
    source: &SourceText,
    cycle: u32,
    cards: &FlashcardList,
    feedback: &FlashcardFeedback,
  ) -> Result<FlashcardList, WorkflowError> {
    let phase = Phase::Improvement { cycle };
    let user = user_prompt_for_improvement(
      source.text(),
      source.objective(),
      ImprovementContext { cards, feedback },
    );
    let raw = self.call(phase, &self.prompts.improvement, &user).await?;
    let improved = parse_flashcards(&raw).map_err(|e| self.fail(phase, e))?;
    info!(cycle, before = cards.len(), after = improved.len(), "Improved flashcards");
    Ok(improved)
  }

  async fn call(&self, phase: Phase, system: &str, user: &str) -> Result<String, WorkflowError> {
    self
      .client
      .complete(&self.settings.model, system, user)
      .await
      .map_err(|e| self.fail(phase, e))
  }

  fn fail(&self, phase: Phase, source: impl Into<StepError>) -> WorkflowError {
    let err = WorkflowError::new(phase, source);
    warn!(%phase, error = %err.source, "Workflow aborted");
    err
  }

  fn notify(&mut self, progress: Progress) {
    if let Some(observer) = self.observer.as_mut() {
      observer(&progress);
    }
  }
}

#[cfg(test)]
mod tests {
  use std::cell::RefCell;
  use std::collections::VecDeque;
  use std::rc::Rc;

  use super::*;
  use crate::error::{AdapterError, ParseError, SchemaError};

  const FEEDBACK: &str = r#"Sure! {"strengths":["accurate"],"weaknesses":["too few"],"recommendations":["add more"],"overall_quality":"fair"}"#;

  #[derive(Debug, Clone, PartialEq, Eq)]
  struct Call {
    model: String,
    system: String,
    user: String,
  }

  /// Replays canned responses in order and records every call.
  struct ScriptedClient {
    responses: RefCell<VecDeque<Result<String, AdapterError>>>,
    calls: RefCell<Vec<Call>>,
  }

  impl ScriptedClient {
    fn new<I, S>(responses: I) -> Self
    where
      I: IntoIterator<Item = Result<S, AdapterError>>,
      S: Into<String>,
    {
      Self {
        responses: RefCell::new(responses.into_iter().map(|r| r.map(Into::into)).collect()),
        calls: RefCell::default(),
      }
    }

    fn calls(&self) -> Vec<Call> {
      self.calls.borrow().clone()
    }
  }

  impl CompletionClient for ScriptedClient {
    async fn complete(&self, model: &str, system_prompt: &str, user_prompt: &str) -> Result<String, AdapterError> {
      self.calls.borrow_mut().push(Call {
        model: model.into(),
        system: system_prompt.into(),
        user: user_prompt.into(),
      });
      self
        .responses
        .borrow_mut()
        .pop_front()
        .unwrap_or_else(|| Err(AdapterError::Transport("script exhausted".into())))
    }
  }

  fn cards_json(n: usize) -> String {
    let items: Vec<_> = (1..=n)
      .map(|i| format!(r#"{{"question":"Q{i}","answer":"A{i}"}}"#))
      .collect();
    format!("[{}]", items.join(","))
  }

  fn settings(max_reflections: u32) -> WorkflowSettings {
    WorkflowSettings::new("test-model", Preset::General, max_reflections).expect("settings")
  }

  fn source() -> SourceText {
    SourceText::new("Photosynthesis converts light into chemical energy.", "basic biology").expect("source")
  }

  /// Script for a full run: generation then (feedback, improvement) per cycle.
  fn full_script(cycles: usize) -> Vec<Result<String, AdapterError>> {
    let mut script = vec![Ok(cards_json(2))];
    for i in 0..cycles {
      script.push(Ok(FEEDBACK.to_string()));
      script.push(Ok(cards_json(3 + i)));
    }
    script
  }

  #[tokio::test]
  async fn single_generation_scenario() {
    let client = ScriptedClient::new([Ok(
      r#"[{"question":"What does photosynthesis convert?","answer":"Light into chemical energy."}]"#,
    )]);
    let mut wf = Workflow::new(&client, settings(0));
    let cards = wf.run(&source()).await.expect("run");

    assert_eq!(cards.len(), 1);
    let card = &cards.as_slice()[0];
    assert_eq!(card.question(), "What does photosynthesis convert?");
    assert_eq!(card.answer(), "Light into chemical energy.");

    let calls = client.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].model, "test-model");
    assert_eq!(calls[0].system, SystemPrompts::for_preset(Preset::General).generation);
    assert!(calls[0].user.contains("basic biology"));
    assert!(calls[0].user.contains("Photosynthesis converts light into chemical energy."));
  }

  #[tokio::test]
  async fn adapter_is_called_once_plus_twice_per_cycle() {
    for n in 0..=3u32 {
      let client = ScriptedClient::new(full_script(n as usize));
      let mut wf = Workflow::new(&client, settings(n));
      wf.run(&source()).await.expect("run");
      assert_eq!(client.calls().len(), 1 + 2 * n as usize, "max_reflections = {n}");
    }
  }

  #[tokio::test]
  async fn preview_stops_after_generation() {
    let client = ScriptedClient::new(full_script(3));
    let mut wf = Workflow::new(&client, settings(3).with_mode(RunMode::Preview));
    let cards = wf.run(&source()).await.expect("run");
    assert_eq!(cards.len(), 2);
    assert_eq!(client.calls().len(), 1);
  }

  #[tokio::test]
  async fn improvement_replaces_instead_of_merging() {
    let client = ScriptedClient::new([Ok(cards_json(2)), Ok(FEEDBACK.to_string()), Ok(cards_json(3))]);
    let mut wf = Workflow::new(&client, settings(1));
    let cards = wf.run(&source()).await.expect("run");
    assert_eq!(cards.len(), 3);
    let questions: Vec<_> = cards.iter().map(|c| c.question()).collect();
    assert_eq!(questions, ["Q1", "Q2", "Q3"]);
  }

  #[tokio::test]
  async fn phases_use_their_own_prompts_and_feed_results_forward() {
    let client = ScriptedClient::new(full_script(2));
    let mut wf = Workflow::new(&client, settings(2));
    wf.run(&source()).await.expect("run");

    let prompts = SystemPrompts::for_preset(Preset::General);
    let systems: Vec<_> = client.calls().into_iter().map(|c| c.system).collect();
    assert_eq!(
      systems,
      [
        prompts.generation.clone(),
        prompts.reflection.clone(),
        prompts.improvement.clone(),
        prompts.reflection.clone(),
        prompts.improvement.clone(),
      ]
    );

    let calls = client.calls();
    // Cycle 1 reflects on the generated pair and improves with the feedback.
    assert!(calls[1].user.contains("\"Q2\"") && !calls[1].user.contains("\"Q3\""));
    assert!(calls[2].user.contains("\"too few\"") && calls[2].user.contains("\"Q2\""));
    // Cycle 2 reflects on the 3 cards produced by cycle 1.
    assert!(calls[3].user.contains("\"Q3\"") && !calls[3].user.contains("\"Q4\""));
  }

  #[tokio::test]
  async fn progress_is_reported_at_each_transition() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let client = ScriptedClient::new(full_script(1));
    let sink = Rc::clone(&seen);
    let mut wf = Workflow::new(&client, settings(1)).on_progress(move |p| sink.borrow_mut().push(p.clone()));
    wf.run(&source()).await.expect("run");
    drop(wf);

    let seen = seen.borrow();
    assert_eq!(seen.len(), 4);
    assert_eq!(seen[0], Progress::Generated { cards: 2 });
    assert!(matches!(&seen[1], Progress::Reflected { cycle: 1, summary } if summary.contains("fair")));
    assert_eq!(seen[2], Progress::Improved { cycle: 1, cards: 3 });
    assert_eq!(seen[3], Progress::Finalized { cards: 3 });
    assert_eq!(seen[3].to_string(), "Finalized 3 flashcard(s)");
  }

  #[tokio::test]
  async fn generation_failure_aborts_with_phase() {
    let client = ScriptedClient::new([Ok::<_, AdapterError>("I could not do that.")]);
    let mut wf = Workflow::new(&client, settings(2));
    let err = wf.run(&source()).await.expect_err("abort");
    assert_eq!(err.phase, Phase::Generation);
    assert!(matches!(err.source, StepError::Parse(ParseError::NotFound(_))));
    assert_eq!(client.calls().len(), 1);
  }

  #[tokio::test]
  async fn adapter_failure_mid_run_loses_the_whole_run() {
    let client = ScriptedClient::new([
      Ok(cards_json(2)),
      Ok(FEEDBACK.to_string()),
      Ok(cards_json(3)),
      Err(AdapterError::Status { status: 500, message: "boom".into() }),
    ]);
    let mut wf = Workflow::new(&client, settings(2));
    let err = wf.run(&source()).await.expect_err("abort");
    assert_eq!(err.phase, Phase::Reflection { cycle: 2 });
    assert_eq!(err.to_string(), "workflow aborted during reflection cycle 2");
    assert!(matches!(err.source, StepError::Adapter(AdapterError::Status { status: 500, .. })));
    assert_eq!(client.calls().len(), 4);
  }

  #[tokio::test]
  async fn invalid_improvement_is_reported_with_cycle() {
    let client = ScriptedClient::new([Ok(cards_json(2)), Ok(FEEDBACK.to_string()), Ok("[]".to_string())]);
    let mut wf = Workflow::new(&client, settings(1));
    let err = wf.run(&source()).await.expect_err("abort");
    assert_eq!(err.phase, Phase::Improvement { cycle: 1 });
    assert!(matches!(err.source, StepError::Parse(ParseError::Schema(SchemaError::EmptyList))));
  }

  #[tokio::test]
  async fn preset_selects_system_prompts() {
    let client = ScriptedClient::new([Ok(cards_json(1))]);
    let settings = WorkflowSettings::new("m", Preset::Cloze, 0).expect("settings");
    let mut wf = Workflow::new(&client, settings);
    wf.run(&source()).await.expect("run");
    assert_eq!(client.calls()[0].system, SystemPrompts::for_preset(Preset::Cloze).generation);
  }

  #[test]
  fn reflection_bound_is_validated() {
    assert!(WorkflowSettings::new("m", Preset::General, MAX_REFLECTIONS).is_ok());
    let err = WorkflowSettings::new("m", Preset::General, MAX_REFLECTIONS + 1).expect_err("too many");
    assert!(matches!(err, ConfigError::ReflectionBound { requested: 6, max: 5 }));
    assert!(matches!(WorkflowSettings::new(" ", Preset::General, 1), Err(ConfigError::EmptyModel)));
  }

  #[test]
  fn preview_plans_no_cycles() {
    assert_eq!(settings(3).planned_cycles(), 3);
    assert_eq!(settings(3).with_mode(RunMode::Preview).planned_cycles(), 0);
  }
}
