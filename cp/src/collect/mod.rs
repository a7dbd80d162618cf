//! Answer collection
//!
//! A round asks each question through an `AnswerCollector`: the console for
//! user rounds, `SalesAnswerer` for AI-to-AI rounds.

use async_trait::async_trait;

mod sales;

pub use sales::SalesAnswerer;

/// Reply to one question
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Text(String),
    /// Explicitly not answered; never recorded
    Skip,
}

impl Answer {
    /// Blank input means skip
    pub fn from_input(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            Answer::Skip
        } else {
            Answer::Text(trimmed.to_string())
        }
    }
}

/// One question as presented to a collector
#[derive(Debug, Clone, Copy)]
pub struct QuestionSlot<'a> {
    pub subject: &'a str,
    /// 1-based position within the round
    pub number: usize,
    pub total: usize,
    pub question: &'a str,
}

#[async_trait]
pub trait AnswerCollector: Send + Sync {
    async fn ask(&self, slot: QuestionSlot<'_>) -> Answer;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_from_input() {
        assert_eq!(Answer::from_input(""), Answer::Skip);
        assert_eq!(Answer::from_input("   \t"), Answer::Skip);
        assert_eq!(Answer::from_input("  Battery lasts 30h "), Answer::Text("Battery lasts 30h".to_string()));
    }
}
