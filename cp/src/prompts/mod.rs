//! Prompt templates

mod embedded;
mod loader;

pub use loader::{
    ANSWER, AnswerPrompt, HistoryItem, IDEAS, IdeaPrompt, PromptLoader, QUESTIONS_FIRST, QUESTIONS_FOLLOW_UP,
    QuestionPrompt,
};
