use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, ValueHint};
use tracing::info;

use cardforge::config::AppConfig;
use cardforge::openai::OpenAiClient;
use cardforge::provider::ModelRef;
use cardforge::source::{load_source, SourceText};
use cardforge::{deck, report, telemetry};
use cardforge::{Preset, RunMode, Workflow, WorkflowSettings};

#[derive(Parser, Debug)]
#[command(
    name = "cardforge",
    version,
    about = "Turn any text into a flashcard deck.",
    long_about = None,
    arg_required_else_help = true
)]
struct Cli {
    /// Text file to learn from
    #[arg(
        value_name = "FILE",
        value_hint = ValueHint::FilePath,
        required_unless_present = "list_presets"
    )]
    file: Option<PathBuf>,
    /// What you want to learn from the file
    #[arg(value_name = "OBJECTIVE", required_unless_present = "list_presets")]
    objective: Option<String>,
    /// Deck output path (default: <FILE> with a .tsv extension).
    /// The Markdown preview is written next to it with a .md extension.
    #[arg(short, long, value_name = "PATH", value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
    /// Model as provider:model, e.g. openai:gpt-5-mini
    #[arg(short, long, value_name = "MODEL")]
    model: Option<String>,
    /// Prompt preset (see --list-presets)
    #[arg(short, long, value_name = "PRESET")]
    preset: Option<String>,
    /// Number of reflect/improve cycles after generation
    #[arg(long, value_name = "COUNT")]
    max_reflections: Option<u32>,
    /// Stop right after the first generation, skipping reflection
    #[arg(long)]
    preview: bool,
    /// Only write the Markdown preview; skip the deck file
    #[arg(long)]
    report_only: bool,
    /// TOML config file (defaults to $CARDFORGE_CONFIG when set)
    #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,
    /// List available presets and exit
    #[arg(long)]
    list_presets: bool,
}

/// Everything a run needs, after layering CLI flags over the config file.
#[derive(Debug)]
struct RunPlan {
    model: ModelRef,
    settings: WorkflowSettings,
    deck_name: String,
    deck_path: PathBuf,
    report_path: PathBuf,
    report_only: bool,
}

impl RunPlan {
    fn resolve(cli: &Cli, cfg: &AppConfig, file: &Path) -> Result<Self> {
        let model: ModelRef = cli.model.as_deref().unwrap_or(&cfg.workflow.model).parse()?;
        let preset: Preset = cli.preset.as_deref().unwrap_or(&cfg.workflow.preset).parse()?;
        let max_reflections = cli.max_reflections.unwrap_or(cfg.workflow.max_reflections);
        let mode = if cli.preview { RunMode::Preview } else { RunMode::Full };
        let settings = WorkflowSettings::new(model.model.clone(), preset, max_reflections)?.with_mode(mode);

        let (deck_path, report_path) = match &cli.output {
            Some(output) => (output.clone(), output.with_extension("md")),
            None => default_outputs(file),
        };
        for output in [&deck_path, &report_path] {
            if output == file {
                bail!("output {} would overwrite the input file", output.display());
            }
        }

        Ok(Self {
            model,
            settings,
            deck_name: cfg.workflow.deck_name.clone(),
            deck_path,
            report_path,
            report_only: cli.report_only,
        })
    }
}

/// `<FILE>.tsv` and `<FILE>.md`, or `<FILE>.cards.tsv` and `<FILE>.cards.md`
/// when the input already carries one of those extensions.
fn default_outputs(file: &Path) -> (PathBuf, PathBuf) {
    let deck = file.with_extension("tsv");
    let report = file.with_extension("md");
    if deck == file || report == file {
        (file.with_extension("cards.tsv"), file.with_extension("cards.md"))
    } else {
        (deck, report)
    }
}

#[tokio::main]
async fn main() {
    telemetry::init_tracing();
    if let Err(error) = run_cli().await {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    if cli.list_presets {
        for preset in Preset::ALL {
            println!("{:<12} {}", preset.name(), preset.description());
        }
        return Ok(());
    }

    let (file, objective) = cli
        .file
        .as_deref()
        .zip(cli.objective.as_deref())
        .ok_or_else(|| anyhow!("FILE and OBJECTIVE are required"))?;

    let cfg = AppConfig::load(cli.config.as_deref())?;
    let plan = RunPlan::resolve(&cli, &cfg, file)?;
    info!(target: "cardforge", model = %plan.model, preset = %plan.settings.preset(), cycles = plan.settings.planned_cycles(), "Starting run");

    let text = load_source(file).context("loading source")?;
    let source = SourceText::new(text, objective)?;
    let client = OpenAiClient::for_model(&plan.model, &cfg.completion)?;

    let mut workflow =
        Workflow::new(&client, plan.settings.clone()).on_progress(|progress| println!("{progress}"));
    let cards = workflow.run(&source).await?;

    report::write_markdown(&cards, &plan.report_path).context("writing outputs")?;
    if plan.report_only {
        println!("Preview report saved to: {}", plan.report_path.display());
        return Ok(());
    }

    deck::write_deck(&cards, &plan.deck_name, &plan.deck_path).context("writing outputs")?;
    println!("Successfully generated {} flashcards!", cards.len());
    println!("Saved to: {}", plan.deck_path.display());
    println!("Preview report saved to: {}", plan.report_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardforge::ConfigError;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("cardforge").chain(args.iter().copied())).expect("args")
    }

    fn resolve(args: &[&str], cfg: &AppConfig) -> Result<RunPlan> {
        let cli = cli(args);
        let file = cli.file.clone().expect("file");
        RunPlan::resolve(&cli, cfg, &file)
    }

    #[test]
    fn defaults_come_from_config() {
        let plan = resolve(&["notes/bio.txt", "basic biology"], &AppConfig::default()).expect("plan");
        assert_eq!(plan.model.to_string(), "openai:gpt-5-mini");
        assert_eq!(plan.settings.model(), "gpt-5-mini");
        assert_eq!(plan.settings.preset(), Preset::General);
        assert_eq!(plan.settings.planned_cycles(), 1);
        assert_eq!(plan.deck_path, PathBuf::from("notes/bio.tsv"));
        assert_eq!(plan.report_path, PathBuf::from("notes/bio.md"));
        assert!(!plan.report_only);
    }

    #[test]
    fn flags_override_config() {
        let mut cfg = AppConfig::default();
        cfg.workflow.preset = "concepts".into();
        cfg.workflow.max_reflections = 2;
        let plan = resolve(
            &[
                "in.txt",
                "goal",
                "--preset",
                "cloze",
                "--max-reflections",
                "3",
                "-m",
                "anthropic:claude-sonnet",
                "-o",
                "out/deck.txt",
                "--report-only",
            ],
            &cfg,
        )
        .expect("plan");
        assert_eq!(plan.settings.preset(), Preset::Cloze);
        assert_eq!(plan.settings.max_reflections(), 3);
        assert_eq!(plan.model.provider.name, "anthropic");
        assert_eq!(plan.deck_path, PathBuf::from("out/deck.txt"));
        assert_eq!(plan.report_path, PathBuf::from("out/deck.md"));
        assert!(plan.report_only);
    }

    #[test]
    fn markdown_input_is_never_overwritten_by_the_report() {
        let plan = resolve(&["notes/bio.md", "goal"], &AppConfig::default()).expect("plan");
        assert_eq!(plan.deck_path, PathBuf::from("notes/bio.cards.tsv"));
        assert_eq!(plan.report_path, PathBuf::from("notes/bio.cards.md"));
    }

    #[test]
    fn tsv_input_is_never_overwritten_by_the_deck() {
        let plan = resolve(&["export/cards.tsv", "goal"], &AppConfig::default()).expect("plan");
        assert_eq!(plan.deck_path, PathBuf::from("export/cards.cards.tsv"));
        assert_eq!(plan.report_path, PathBuf::from("export/cards.cards.md"));
    }

    #[test]
    fn explicit_output_onto_the_input_is_refused() {
        let err = resolve(&["notes/bio.md", "goal", "-o", "notes/bio.tsv"], &AppConfig::default())
            .expect_err("report would replace input");
        assert!(err.to_string().contains("would overwrite the input file"), "{err}");

        let err = resolve(&["in.txt", "goal", "--output", "in.txt"], &AppConfig::default()).expect_err("same path");
        assert!(err.to_string().contains("in.txt"), "{err}");
    }

    #[test]
    fn preview_flag_skips_reflection() {
        let plan = resolve(&["in.txt", "goal", "--preview", "--max-reflections", "4"], &AppConfig::default())
            .expect("plan");
        assert_eq!(plan.settings.mode(), RunMode::Preview);
        assert_eq!(plan.settings.planned_cycles(), 0);
    }

    #[test]
    fn invalid_settings_are_config_errors() {
        let err = resolve(&["in.txt", "goal", "--preset", "poetry"], &AppConfig::default()).expect_err("preset");
        assert!(matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::UnknownPreset(_))));

        let err = resolve(&["in.txt", "goal", "--max-reflections", "9"], &AppConfig::default()).expect_err("bound");
        assert!(matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::ReflectionBound { .. })));
    }

    #[test]
    fn list_presets_needs_no_positionals() {
        let cli = cli(&["--list-presets"]);
        assert!(cli.list_presets);
        assert!(cli.file.is_none());
        assert!(Cli::try_parse_from(["cardforge", "only-a-file.txt"]).is_err());
    }
}
