//! Terminal front end for a session
//!
//! [`Console`] steers the orchestrator from stdin/stdout and answers user
//! rounds. Line editing uses rustyline; each prompt runs on the blocking pool
//! so the autosave task keeps running while the operator types.

use std::sync::Arc;

use async_trait::async_trait;
use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, warn};

use crate::collect::{Answer, AnswerCollector, QuestionSlot};
use crate::domain::SessionSummary;
use crate::orchestrator::{Action, Operator, RecoveryChoice, ResumeChoice, RoundOutcome, SessionEvent};
use crate::state::SaveOutcome;
use crate::store::StoreError;

/// Result of reading one line
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Line(String),
    Interrupted,
    Eof,
    Failed(String),
}

async fn read_line(prompt: String) -> Input {
    let result = tokio::task::spawn_blocking(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => return Input::Failed(format!("Failed to initialize readline: {}", e)),
        };
        match rl.readline(&prompt) {
            Ok(line) => Input::Line(line),
            Err(ReadlineError::Interrupted) => Input::Interrupted,
            Err(ReadlineError::Eof) => Input::Eof,
            Err(e) => Input::Failed(e.to_string()),
        }
    })
    .await;

    match result {
        Ok(input) => input,
        Err(e) => Input::Failed(format!("Input task failed: {}", e)),
    }
}

fn prompt() -> String {
    format!("{} ", ">".bright_green())
}

pub fn parse_resume_choice(input: &str) -> Option<ResumeChoice> {
    match input.trim().to_lowercase().as_str() {
        "r" | "resume" => Some(ResumeChoice::Resume),
        "n" | "new" | "fresh" => Some(ResumeChoice::Fresh),
        "q" | "quit" => Some(ResumeChoice::Quit),
        _ => None,
    }
}

pub fn parse_recovery_choice(input: &str) -> Option<RecoveryChoice> {
    match input.trim().to_lowercase().as_str() {
        "n" | "new" | "fresh" => Some(RecoveryChoice::Fresh),
        "q" | "quit" => Some(RecoveryChoice::Quit),
        _ => None,
    }
}

pub fn parse_action(input: &str) -> Option<Action> {
    match input.trim().to_lowercase().as_str() {
        "u" | "round" => Some(Action::Round),
        "a" | "auto" => Some(Action::AutoRound),
        "s" | "save" => Some(Action::Save),
        "q" | "quit" | "exit" => Some(Action::Quit),
        _ => None,
    }
}

fn print_summary(summary: &SessionSummary) {
    println!("  {:14} {}", "Subject:".bright_white(), summary.subject);
    println!("  {:14} {}", "Rounds:".bright_white(), summary.rounds);
    println!("  {:14} {}", "Answers:".bright_white(), summary.qa_count);
    println!("  {:14} {}", "Ideas:".bright_white(), summary.ideas_count);
    if let Some(at) = summary.last_updated {
        println!("  {:14} {}", "Last saved:".bright_white(), at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
}

/// Interactive operator and user-round answer collector
#[derive(Debug, Clone, Default)]
pub struct Console;

impl Console {
    pub fn new() -> Self {
        Self
    }

    pub fn banner(&self, location: &str) {
        println!();
        println!("{}", "Content Planner".bright_cyan().bold());
        println!("Session file: {}", location);
        println!();
    }

    /// Ask until the input parses; `None` on EOF or Ctrl-C
    async fn choose<T>(&self, parse: fn(&str) -> Option<T>) -> Option<T> {
        loop {
            match read_line(prompt()).await {
                Input::Line(line) => match parse(&line) {
                    Some(choice) => return Some(choice),
                    None => println!("{} Unknown choice: {}", "?".yellow(), line.trim()),
                },
                Input::Interrupted => {
                    println!("^C");
                    return None;
                }
                Input::Eof => {
                    println!();
                    return None;
                }
                Input::Failed(e) => {
                    warn!(error = %e, "Console input failed");
                    println!("{} {}", "Error:".red(), e);
                    return None;
                }
            }
        }
    }

    fn report_round(&self, outcome: &RoundOutcome) {
        match outcome {
            RoundOutcome::Completed {
                round,
                answered,
                skipped,
                curation,
                idea_error,
            } => {
                if let Some(e) = idea_error {
                    println!("{} Idea generation failed: {}", "!".yellow(), e);
                }
                println!(
                    "{} Round {} complete: {} answered, {} skipped",
                    "✓".bright_green(),
                    round,
                    answered,
                    skipped
                );
                if curation.accepted.is_empty() {
                    println!("{}", "No new ideas this round.".dimmed());
                } else {
                    println!("{}", "New ideas:".bright_cyan());
                    for idea in &curation.accepted {
                        println!("  {} {}", "•".bright_green(), idea.title.bright_white());
                        println!("    {}", idea.summary.dimmed());
                    }
                }
                if curation.rejected() > 0 {
                    println!(
                        "{}",
                        format!(
                            "Dropped {} duplicate and {} malformed ideas.",
                            curation.duplicates, curation.invalid
                        )
                        .dimmed()
                    );
                }
            }
            RoundOutcome::NothingAnswered { skipped } => {
                println!(
                    "{} All {} questions skipped; round not counted.",
                    "!".yellow(),
                    skipped
                );
            }
            RoundOutcome::NoQuestions { error: Some(e) } => {
                println!("{} Could not generate questions: {}", "!".yellow(), e);
                println!("{}", "Try another round later.".dimmed());
            }
            RoundOutcome::NoQuestions { error: None } => {
                println!("{}", "No new questions to ask.".dimmed());
            }
            RoundOutcome::Refused { reason } => {
                println!("{} {}", "!".yellow(), reason);
            }
            RoundOutcome::Rejected(e) => {
                println!("{} Round discarded: {}", "Error:".red(), e);
            }
        }
    }
}

#[async_trait]
impl Operator for Console {
    async fn choose_resume(&self, summary: &SessionSummary) -> ResumeChoice {
        debug!(subject = %summary.subject, "Console::choose_resume: called");
        println!("{}", "Found a saved session:".bright_cyan());
        print_summary(summary);
        println!();
        println!(
            "{} resume, {} start a new session, {} quit",
            "[r]".yellow(),
            "[n]".yellow(),
            "[q]".yellow()
        );
        self.choose(parse_resume_choice).await.unwrap_or(ResumeChoice::Quit)
    }

    async fn recover_corrupt(&self, error: &StoreError) -> RecoveryChoice {
        debug!(%error, "Console::recover_corrupt: called");
        println!("{} {}", "Error:".red(), error);
        println!(
            "{}",
            "The saved file is left as is until the new session is saved.".dimmed()
        );
        println!("{} start a new session, {} quit", "[n]".yellow(), "[q]".yellow());
        self.choose(parse_recovery_choice).await.unwrap_or(RecoveryChoice::Quit)
    }

    async fn subject(&self) -> Option<String> {
        println!("{}", "What product or service should we plan content for?".bright_cyan());
        match read_line(prompt()).await {
            Input::Line(line) => Some(line),
            Input::Interrupted | Input::Eof => None,
            Input::Failed(e) => {
                warn!(error = %e, "Console input failed");
                None
            }
        }
    }

    async fn next_action(&self, summary: &SessionSummary) -> Action {
        println!();
        println!(
            "{}",
            format!(
                "{} | round {} | {} answers | {} ideas",
                summary.subject,
                summary.rounds + 1,
                summary.qa_count,
                summary.ideas_count
            )
            .dimmed()
        );
        println!(
            "{} answer a round, {} AI-to-AI round, {} save, {} quit",
            "[u]".yellow(),
            "[a]".yellow(),
            "[s]".yellow(),
            "[q]".yellow()
        );
        self.choose(parse_action).await.unwrap_or(Action::Quit)
    }

    fn report(&self, event: &SessionEvent) {
        match event {
            SessionEvent::RoundStarted { round, automated } => {
                println!();
                let kind = if *automated { "AI-to-AI round" } else { "Round" };
                println!("{}", format!("{} {}", kind, round).bright_cyan().bold());
                if !*automated {
                    println!("{}", "Press Enter on an empty line to skip a question.".dimmed());
                }
            }
            SessionEvent::RoundFinished(outcome) => self.report_round(outcome),
            SessionEvent::Saved { location, outcome } => match outcome {
                SaveOutcome::Written { .. } => println!("{} Saved to {}", "✓".bright_green(), location),
                SaveOutcome::Stale { .. } => println!("{}", "Already saved.".dimmed()),
            },
            SessionEvent::SaveFailed { location, error } => {
                println!("{} Could not save to {}: {}", "Error:".red(), location, error);
            }
            SessionEvent::InvalidSubject(e) => {
                println!("{} {}", "?".yellow(), e);
            }
            SessionEvent::Interrupted => {
                println!();
                println!("{}", "Interrupted, saving session...".yellow());
            }
        }
    }
}

#[async_trait]
impl AnswerCollector for Console {
    async fn ask(&self, slot: QuestionSlot<'_>) -> Answer {
        println!();
        println!(
            "{} {}",
            format!("Question {}/{}:", slot.number, slot.total).bright_cyan(),
            slot.question
        );
        match read_line(prompt()).await {
            Input::Line(line) => Answer::from_input(&line),
            Input::Interrupted => {
                println!("^C");
                Answer::Skip
            }
            Input::Eof => Answer::Skip,
            Input::Failed(e) => {
                warn!(error = %e, "Console input failed");
                Answer::Skip
            }
        }
    }
}

/// Prints each question and the answer given by another collector
pub struct Transcript {
    inner: Arc<dyn AnswerCollector>,
}

impl Transcript {
    pub fn new(inner: Arc<dyn AnswerCollector>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl AnswerCollector for Transcript {
    async fn ask(&self, slot: QuestionSlot<'_>) -> Answer {
        println!();
        println!(
            "{} {}",
            format!("Question {}/{}:", slot.number, slot.total).bright_cyan(),
            slot.question
        );
        let answer = self.inner.ask(slot).await;
        match &answer {
            Answer::Text(text) => println!("{} {}", ">".bright_green(), text),
            Answer::Skip => println!("{}", "(no answer)".dimmed()),
        }
        answer
    }
}
