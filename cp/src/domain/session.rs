//! Session, QaEntry and Idea records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ValidationError;

/// One answered question
///
/// Skipped questions never become a `QaEntry`; the answer is always non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaEntry {
    /// Round the question was asked in (1-based)
    pub round: u32,
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

impl QaEntry {
    /// Create an entry stamped with the current time
    pub fn new(round: u32, question: impl Into<String>, answer: impl Into<String>) -> Result<Self, ValidationError> {
        let question = question.into().trim().to_string();
        let answer = answer.into().trim().to_string();
        debug!(%round, question_len = question.len(), answer_len = answer.len(), "QaEntry::new: called");

        if question.is_empty() {
            return Err(ValidationError::EmptyQuestion);
        }
        if answer.is_empty() {
            return Err(ValidationError::EmptyAnswer);
        }

        Ok(Self {
            round,
            question,
            answer,
            timestamp: Utc::now(),
        })
    }
}

/// A content idea: a title plus a short summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Idea {
    pub title: String,
    #[serde(default)]
    pub summary: String,
}

impl Idea {
    /// Create an idea with trimmed title and summary (no validation)
    pub fn new(title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            title: title.into().trim().to_string(),
            summary: summary.into().trim().to_string(),
        }
    }

    /// Summary length in characters
    pub fn summary_len(&self) -> usize {
        self.summary.chars().count()
    }
}

/// The durable record of one planning session
///
/// Fields are private so the append-only history and the round counter can
/// only move forward through [`Session::record_round`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    subject: String,

    #[serde(rename = "rounds")]
    round_count: u32,

    qa_history: Vec<QaEntry>,

    #[serde(rename = "content_ideas")]
    ideas: Vec<Idea>,

    last_updated: Option<DateTime<Utc>>,
}

impl Session {
    /// Start a new session for a subject
    pub fn new(subject: impl Into<String>) -> Result<Self, ValidationError> {
        let subject = subject.into().trim().to_string();
        debug!(%subject, "Session::new: called");
        if subject.is_empty() {
            return Err(ValidationError::EmptySubject);
        }

        Ok(Self {
            subject,
            round_count: 0,
            qa_history: Vec::new(),
            ideas: Vec::new(),
            last_updated: None,
        })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Number of completed rounds
    pub fn round_count(&self) -> u32 {
        self.round_count
    }

    /// The round a newly asked question belongs to
    pub fn next_round(&self) -> u32 {
        self.round_count + 1
    }

    /// Answered questions in chronological order
    pub fn qa_history(&self) -> &[QaEntry] {
        &self.qa_history
    }

    /// Accepted ideas in acceptance order
    pub fn ideas(&self) -> &[Idea] {
        &self.ideas
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Commit one completed round
    ///
    /// Appends the answered entries and the already-curated ideas, then bumps
    /// the round counter. Nothing is changed if any entry fails validation.
    pub fn record_round(&mut self, entries: Vec<QaEntry>, ideas: Vec<Idea>) -> Result<u32, ValidationError> {
        let expected = self.next_round();
        debug!(%expected, entry_count = entries.len(), idea_count = ideas.len(), "Session::record_round: called");

        for entry in &entries {
            if entry.round != expected {
                return Err(ValidationError::RoundMismatch {
                    expected,
                    found: entry.round,
                });
            }
            if entry.question.trim().is_empty() {
                return Err(ValidationError::EmptyQuestion);
            }
            if entry.answer.trim().is_empty() {
                return Err(ValidationError::EmptyAnswer);
            }
        }
        if ideas.iter().any(|idea| idea.title.trim().is_empty()) {
            return Err(ValidationError::EmptyTitle);
        }

        self.qa_history.extend(entries);
        self.ideas.extend(ideas);
        self.round_count = expected;
        Ok(expected)
    }

    /// Set the persist time
    pub(crate) fn stamp(&mut self, at: DateTime<Utc>) {
        self.last_updated = Some(at);
    }

    /// Check the invariants of a session read from storage
    pub fn validate(&self) -> Result<(), ValidationError> {
        debug!(subject = %self.subject, rounds = %self.round_count, "Session::validate: called");
        if self.subject.trim().is_empty() {
            return Err(ValidationError::EmptySubject);
        }

        let mut previous = 0;
        for entry in &self.qa_history {
            if entry.round == 0 || entry.round < previous || entry.round > self.round_count {
                return Err(ValidationError::RoundOutOfOrder {
                    round: entry.round,
                    previous,
                    completed: self.round_count,
                });
            }
            if entry.question.trim().is_empty() {
                return Err(ValidationError::EmptyQuestion);
            }
            if entry.answer.trim().is_empty() {
                return Err(ValidationError::EmptyAnswer);
            }
            previous = entry.round;
        }

        if self.ideas.iter().any(|idea| idea.title.trim().is_empty()) {
            return Err(ValidationError::EmptyTitle);
        }
        Ok(())
    }

    /// Display projection of this session
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            subject: self.subject.clone(),
            rounds: self.round_count,
            qa_count: self.qa_history.len(),
            ideas_count: self.ideas.len(),
            last_updated: self.last_updated,
        }
    }
}

/// Counts shown when offering to resume a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub subject: String,
    pub rounds: u32,
    pub qa_count: usize,
    pub ideas_count: usize,
    pub last_updated: Option<DateTime<Utc>>,
}
