//! Question and idea generation
//!
//! The round loop only sees the two generator traits; `LlmGenerator` is the
//! production implementation backed by an `LlmClient`.

use async_trait::async_trait;

mod error;
mod llm;
mod parse;

pub use error::GenerationError;
pub use llm::LlmGenerator;
pub use parse::{parse_ideas, parse_questions};

use crate::domain::{Idea, QaEntry};

/// Which question template a request uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionPhase {
    /// Nothing known beyond the subject
    FirstRound,
    /// Building on answered history
    FollowUp,
}

/// Input to one question generation call
#[derive(Debug, Clone)]
pub struct QuestionRequest {
    pub subject: String,
    /// Answered questions only; skips never reach history
    pub history: Vec<QaEntry>,
    pub count: usize,
    pub phase: QuestionPhase,
    /// Optional seed text from the context file
    pub seed_context: Option<String>,
}

/// Input to one idea generation call
#[derive(Debug, Clone)]
pub struct IdeaRequest {
    pub subject: String,
    pub history: Vec<QaEntry>,
    /// Titles already accepted, so the model can steer away from them
    pub existing_titles: Vec<String>,
    pub count: usize,
}

#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate_questions(&self, request: &QuestionRequest) -> Result<Vec<String>, GenerationError>;
}

#[async_trait]
pub trait IdeaGenerator: Send + Sync {
    async fn generate_ideas(&self, request: &IdeaRequest) -> Result<Vec<Idea>, GenerationError>;
}
