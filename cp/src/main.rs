//! Content Planner
//!
//! CLI entry point for interactive sessions and read-only inspection.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use contentplanner::cli::{Cli, Command, OutputFormat, generate_after_help};
use contentplanner::collect::{AnswerCollector, SalesAnswerer};
use contentplanner::config::Config;
use contentplanner::console::{Console, Transcript};
use contentplanner::context::ContextSource;
use contentplanner::generate::LlmGenerator;
use contentplanner::llm::create_client;
use contentplanner::orchestrator::{Orchestrator, OrchestratorConfig, resume_or_create};
use contentplanner::prompts::PromptLoader;
use contentplanner::state::SessionWriter;
use contentplanner::store::{FileStorage, SessionStore};
use contentplanner::strategy::{QuestionStrategy, StrategyConfig};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("contentplanner")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("contentplanner.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Cli::command().after_help(generate_after_help());
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    if let Some(output) = &cli.output {
        debug!(output = %output.display(), "main: overriding output-file");
        config.session.output_file = output.clone();
    }
    config.validate().context("Invalid configuration")?;

    let store = SessionStore::new(Arc::new(FileStorage::new(&config.session.output_file)));

    match cli.command {
        None | Some(Command::Run) => {
            debug!("main: running interactive session");
            run_session(&config, store).await
        }
        Some(Command::Status { format }) => {
            debug!(?format, "main: status command");
            show_status(&store, format)
        }
        Some(Command::Ideas { format }) => {
            debug!(?format, "main: ideas command");
            show_ideas(&store, format)
        }
    }
}

async fn run_session(config: &Config, store: SessionStore) -> Result<()> {
    let console = Arc::new(Console::new());
    console.banner(&store.location());

    let Some(session) = resume_or_create(&store, console.as_ref()).await? else {
        info!("Quit before a session was opened");
        println!("Goodbye!");
        return Ok(());
    };

    let writer = SessionWriter::spawn(store, session.baseline());
    let base = std::env::current_dir().context("Failed to get current directory")?;
    let prompts = Arc::new(PromptLoader::new(&base));
    let settings = &config.session;

    let context = match ContextSource::new(&settings.context_file).load() {
        Ok(context) => context,
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable context file");
            println!("{} {}", "!".yellow(), e);
            None
        }
    };

    let generator = Arc::new(
        LlmGenerator::from_config(&config.llm, prompts.clone())
            .with_summary_bounds(settings.summary_min_chars, settings.summary_max_chars),
    );
    if !generator.is_available() {
        println!(
            "{} LLM is not configured; rounds will fail until it is.",
            "!".yellow()
        );
    }

    let strategy = QuestionStrategy::new(
        generator.clone(),
        StrategyConfig {
            questions_per_round: settings.questions_per_round,
            repeat_threshold: settings.question_repeat_threshold,
            call_timeout: settings.call_timeout(),
        },
    )
    .with_seed_context(if settings.seed_questions_with_context {
        context.clone()
    } else {
        None
    });

    let auto_answerer = build_auto_answerer(config, prompts, context);

    let mut orchestrator = Orchestrator::new(
        session,
        writer,
        strategy,
        generator,
        console.clone(),
        OrchestratorConfig {
            ideas_per_round: settings.ideas_per_round,
            curator: settings.curator(),
            autosave_interval: settings.autosave_interval(),
            call_timeout: settings.call_timeout(),
        },
    )
    .with_auto_answerer(auto_answerer);

    orchestrator
        .run(console.as_ref())
        .await
        .context("Failed to save the session on exit")?;
    println!("Goodbye!");
    Ok(())
}

/// Salesperson answerer for AI-to-AI rounds, or why those rounds are refused
fn build_auto_answerer(
    config: &Config,
    prompts: Arc<PromptLoader>,
    context: Option<String>,
) -> std::result::Result<Arc<dyn AnswerCollector>, String> {
    let Some(knowledge) = context else {
        return Err(format!(
            "AI-to-AI rounds need a non-empty context file ({})",
            config.session.context_file.display()
        ));
    };
    let client = create_client(config.answerer()).map_err(|e| format!("AI-to-AI rounds unavailable: {}", e))?;
    let answerer = SalesAnswerer::new(client, prompts, knowledge, config.session.call_timeout());
    Ok(Arc::new(Transcript::new(Arc::new(answerer))))
}

fn show_status(store: &SessionStore, format: OutputFormat) -> Result<()> {
    let session = store.load().context("Failed to load saved session")?;
    let summary = session.as_ref().map(|s| s.summary());

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Text => match summary {
            Some(summary) => {
                println!("{}", "Saved session".bright_cyan().bold());
                println!("  {:14} {}", "Subject:", summary.subject);
                println!("  {:14} {}", "Rounds:", summary.rounds);
                println!("  {:14} {}", "Answers:", summary.qa_count);
                println!("  {:14} {}", "Ideas:", summary.ideas_count);
                match summary.last_updated {
                    Some(at) => println!("  {:14} {}", "Last saved:", at.to_rfc3339()),
                    None => println!("  {:14} {}", "Last saved:", "never".dimmed()),
                }
            }
            None => println!("No saved session at {}", store.location()),
        },
    }
    Ok(())
}

fn show_ideas(store: &SessionStore, format: OutputFormat) -> Result<()> {
    let session = store.load().context("Failed to load saved session")?;
    let ideas = session.as_ref().map(|s| s.ideas()).unwrap_or_default();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(ideas)?);
        }
        OutputFormat::Text => {
            if session.is_none() {
                println!("No saved session at {}", store.location());
            } else if ideas.is_empty() {
                println!("{}", "No ideas yet.".dimmed());
            } else {
                for (i, idea) in ideas.iter().enumerate() {
                    println!("{}. {}", i + 1, idea.title.bright_white().bold());
                    println!("   {}", idea.summary);
                }
            }
        }
    }
    Ok(())
}
