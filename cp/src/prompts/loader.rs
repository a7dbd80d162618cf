//! Prompt Loader
//!
//! Loads prompt templates from files or falls back to embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, info};

use super::embedded;
use crate::domain::QaEntry;

pub const QUESTIONS_FIRST: &str = "questions-first";
pub const QUESTIONS_FOLLOW_UP: &str = "questions-follow-up";
pub const IDEAS: &str = "ideas";
pub const ANSWER: &str = "answer";

/// One answered question as templates see it
#[derive(Debug, Clone, Serialize)]
pub struct HistoryItem {
    pub question: String,
    pub answer: String,
}

impl From<&QaEntry> for HistoryItem {
    fn from(entry: &QaEntry) -> Self {
        Self {
            question: entry.question.clone(),
            answer: entry.answer.clone(),
        }
    }
}

/// Context for the question templates
#[derive(Debug, Clone, Serialize)]
pub struct QuestionPrompt {
    pub subject: String,
    pub count: usize,
    pub history: Vec<HistoryItem>,
    pub seed_context: Option<String>,
}

/// Context for the idea template
#[derive(Debug, Clone, Serialize)]
pub struct IdeaPrompt {
    pub subject: String,
    pub count: usize,
    pub history: Vec<HistoryItem>,
    pub existing_titles: Vec<String>,
    pub summary_min: usize,
    pub summary_max: usize,
}

/// Context for the salesperson answer template
#[derive(Debug, Clone, Serialize)]
pub struct AnswerPrompt {
    pub subject: String,
    pub knowledge: String,
    pub question: String,
    pub max_chars: usize,
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory (`.contentplanner/prompts/`)
    user_dir: Option<PathBuf>,
    /// Project default directory (`prompts/`)
    repo_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader rooted at `base` (usually the working directory)
    pub fn new(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        let user_dir = base.join(".contentplanner/prompts");
        let repo_dir = base.join("prompts");

        Self {
            hbs: Self::engine(),
            user_dir: if user_dir.exists() { Some(user_dir) } else { None },
            repo_dir: if repo_dir.exists() { Some(repo_dir) } else { None },
        }
    }

    /// Create a loader that only uses embedded prompts (for testing)
    pub fn embedded_only() -> Self {
        Self {
            hbs: Self::engine(),
            user_dir: None,
            repo_dir: None,
        }
    }

    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        // Prompts are plain text, not HTML
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. User override: `.contentplanner/prompts/{name}.pmt`
    /// 2. Project default: `prompts/{name}.pmt`
    /// 3. Embedded fallback
    fn load_template(&self, name: &str) -> Result<String> {
        for dir in [&self.user_dir, &self.repo_dir].into_iter().flatten() {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!("Loading prompt from {:?}", path);
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read prompt {}: {}", path.display(), e));
            }
        }

        if let Some(content) = embedded::get_embedded(name) {
            debug!("Using embedded prompt: {}", name);
            return Ok(content.to_string());
        }

        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        let template = self.load_template(template_name)?;
        info!("Rendering template '{}'", template_name);

        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }
}
