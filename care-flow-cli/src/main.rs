mod render;
mod terminal;

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use care_flow::{
    AnswerSource, Pipeline, PipelineConfig, PlaceholderAnswers, SessionRecord, SuppliedAnswers,
};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::render::{render_json, render_record};
use crate::terminal::{SymptomInput, TerminalAnswers, read_symptoms};

const DEMO_TEXT: &str =
    "I've had headaches every afternoon for two weeks, moderate pain, worse with screen time.";

#[derive(Parser)]
#[command(
    name = "care-flow",
    version,
    about = "Turn a free-text symptom description into a doctor-ready visit note"
)]
struct Cli {
    /// OpenRouter model id (overrides CARE_FLOW_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Per-call timeout in seconds (overrides CARE_FLOW_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the whole pipeline with placeholder answers
    Demo {
        /// Symptom description; defaults to a built-in headache example
        text: Option<String>,
        /// Print the session record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Describe symptoms and answer follow-up questions at the terminal
    Interactive,
    /// Run the pipeline with answers read from a JSON file
    Run {
        #[arg(long)]
        text: String,
        /// JSON object mapping question text to answer text
        #[arg(long)]
        answers: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
}

/// Logs go to stderr so stdout carries only the rendered output
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "care_flow=info,care_flow_cli=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true)
                        .with_writer(io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<PipelineConfig> {
    let mut config = PipelineConfig::from_env()?;
    if let Some(model) = &cli.model {
        config = config.with_model(model);
    }
    if let Some(secs) = cli.timeout_secs {
        config = config.with_timeout_secs(secs)?;
    }
    Ok(config)
}

fn load_answers(path: &Path) -> anyhow::Result<SuppliedAnswers> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading answers file {}", path.display()))?;
    let answers: HashMap<String, String> = serde_json::from_str(&raw)
        .with_context(|| format!("answers file {} must be a JSON object of strings", path.display()))?;
    Ok(SuppliedAnswers::new(answers))
}

fn print_record(record: &SessionRecord, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", render_json(record)?);
    } else {
        print!("{}", render_record(record));
    }
    Ok(())
}

async fn run_once(
    pipeline: &Pipeline,
    text: String,
    answers: &dyn AnswerSource,
    json: bool,
) -> anyhow::Result<()> {
    let mut record = SessionRecord::new(text);
    let outcome = pipeline.execute(&mut record, answers).await;
    if outcome.is_err() {
        // Show what was produced before the failure.
        print_record(&record, json)?;
    }
    outcome?;
    print_record(&record, json)
}

async fn interactive(pipeline: &Pipeline) -> anyhow::Result<()> {
    println!("{}", "=".repeat(80));
    println!("CARE-FLOW - Interactive");
    println!("{}", "=".repeat(80));

    loop {
        println!("\nEnter your symptoms. Press Enter on an empty line when done, or type 'quit'.");

        let input = tokio::task::spawn_blocking(|| read_symptoms(&mut io::stdin().lock())).await??;
        let text = match input {
            SymptomInput::Quit | SymptomInput::Eof => {
                println!("\nGoodbye!");
                return Ok(());
            }
            SymptomInput::Empty => {
                println!("No input provided. Try again.");
                continue;
            }
            SymptomInput::Text(text) => text,
        };

        let mut record = SessionRecord::new(text);
        match pipeline.execute(&mut record, &TerminalAnswers).await {
            Ok(_) => print!("{}", render_record(&record)),
            Err(e) => {
                error!(session_id = %record.id, error = %e, "Run aborted");
                print!("{}", render_record(&record));
                println!("\nThe run could not finish: {e}");
                println!("You can describe your symptoms again to start a fresh run.");
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    info!(model = %config.model, timeout = ?config.request_timeout, "Configuration loaded");

    let pipeline = Pipeline::from_config(&config);

    match cli.command {
        Command::Demo { text, json } => {
            let text = text.unwrap_or_else(|| DEMO_TEXT.to_string());
            run_once(&pipeline, text, &PlaceholderAnswers, json).await
        }
        Command::Interactive => interactive(&pipeline).await,
        Command::Run { text, answers, json } => {
            let answers = match answers {
                Some(path) => load_answers(&path)?,
                None => SuppliedAnswers::default(),
            };
            run_once(&pipeline, text, &answers, json).await
        }
    }
}
