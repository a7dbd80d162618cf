//! Session writer messages
//!
//! Commands and responses for the actor pattern.

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use super::Snapshot;
use crate::store::StoreError;

/// What happened to a save request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Snapshot persisted at the given time
    Written { revision: u64, at: DateTime<Utc> },
    /// Snapshot was older than one already persisted and was dropped
    Stale { revision: u64, latest: u64 },
}

/// Commands sent to the SessionWriter actor
#[derive(Debug)]
pub enum WriterCommand {
    Save {
        snapshot: Snapshot,
        reply: oneshot::Sender<Result<SaveOutcome, StoreError>>,
    },
}
