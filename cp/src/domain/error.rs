//! Domain validation errors

use thiserror::Error;

/// Shape violations in session data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Subject must not be empty")]
    EmptySubject,

    #[error("Question must not be empty")]
    EmptyQuestion,

    #[error("Answer must not be empty (skipped questions are not recorded)")]
    EmptyAnswer,

    #[error("Idea title must not be empty")]
    EmptyTitle,

    #[error("Entry belongs to round {found}, expected round {expected}")]
    RoundMismatch { expected: u32, found: u32 },

    #[error("History entry for round {round} is out of order (previous round {previous}, completed rounds {completed})")]
    RoundOutOfOrder { round: u32, previous: u32, completed: u32 },
}
