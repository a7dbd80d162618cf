//! SharedSession - lock-guarded session with a mutation revision

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::{Idea, QaEntry, Session, ValidationError};

/// Point-in-time copy of the session plus the revision it reflects
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub session: Session,
    pub revision: u64,
}

#[derive(Debug)]
struct Versioned {
    session: Session,
    revision: u64,
}

/// Handle to the in-memory session shared by the round loop and autosave
///
/// Only the round loop mutates; every mutation bumps the revision so the
/// writer can tell fresh snapshots from stale ones.
#[derive(Debug, Clone)]
pub struct SharedSession {
    inner: Arc<RwLock<Versioned>>,
    baseline: Option<u64>,
}

impl SharedSession {
    /// Wrap a session read from storage (revision 0 is already persisted)
    pub fn loaded(session: Session) -> Self {
        debug!(subject = %session.subject(), "SharedSession::loaded: called");
        Self {
            inner: Arc::new(RwLock::new(Versioned { session, revision: 0 })),
            baseline: Some(0),
        }
    }

    /// Wrap a newly created session (revision 1 has never been persisted)
    pub fn fresh(session: Session) -> Self {
        debug!(subject = %session.subject(), "SharedSession::fresh: called");
        Self {
            inner: Arc::new(RwLock::new(Versioned { session, revision: 1 })),
            baseline: None,
        }
    }

    /// Revision known to match durable storage when this handle was created
    pub fn baseline(&self) -> Option<u64> {
        self.baseline
    }

    /// Copy the session under the read lock
    pub async fn snapshot(&self) -> Snapshot {
        let guard = self.inner.read().await;
        Snapshot {
            session: guard.session.clone(),
            revision: guard.revision,
        }
    }

    pub async fn revision(&self) -> u64 {
        self.inner.read().await.revision
    }

    /// Read from the session without copying it
    pub async fn read<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        let guard = self.inner.read().await;
        f(&guard.session)
    }

    /// Commit a completed round as one unit
    ///
    /// History, ideas and the round counter change together under the write
    /// lock, so a concurrent snapshot sees all of it or none of it.
    pub async fn record_round(&self, entries: Vec<QaEntry>, ideas: Vec<Idea>) -> Result<u32, ValidationError> {
        debug!(entry_count = entries.len(), idea_count = ideas.len(), "SharedSession::record_round: called");
        let mut guard = self.inner.write().await;
        let round = guard.session.record_round(entries, ideas)?;
        guard.revision += 1;
        debug!(%round, revision = guard.revision, "SharedSession::record_round: committed");
        Ok(round)
    }
}
