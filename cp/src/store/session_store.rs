//! SessionStore - load/save/summarize over a snapshot backend

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::{SnapshotStorage, StoreError};
use crate::domain::{Session, SessionSummary};

/// Reads and writes the persisted session snapshot
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn SnapshotStorage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SnapshotStorage>) -> Self {
        Self { storage }
    }

    /// Where the snapshot lives
    pub fn location(&self) -> String {
        self.storage.location()
    }

    /// Load the persisted session
    ///
    /// Returns `Ok(None)` when no snapshot exists and `CorruptState` when one
    /// exists but does not decode into a well-formed session.
    pub fn load(&self) -> Result<Option<Session>, StoreError> {
        debug!(location = %self.location(), "SessionStore::load: called");
        let bytes = match self.storage.read() {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("SessionStore::load: not found");
                return Ok(None);
            }
            Err(e) => return Err(StoreError::StorageReadFailure(e.to_string())),
        };

        let session: Session = serde_json::from_slice(&bytes).map_err(|e| {
            warn!(error = %e, "SessionStore::load: snapshot failed to parse");
            StoreError::CorruptState(e.to_string())
        })?;

        session.validate().map_err(|e| {
            warn!(error = %e, "SessionStore::load: snapshot failed validation");
            StoreError::CorruptState(e.to_string())
        })?;

        info!(
            subject = %session.subject(),
            rounds = session.round_count(),
            "Loaded session from {}",
            self.location()
        );
        Ok(Some(session))
    }

    /// Persist a session, returning the stamped copy that was written
    ///
    /// The copy's `last_updated` is set to the save time.
    pub fn save(&self, session: &Session) -> Result<Session, StoreError> {
        debug!(subject = %session.subject(), rounds = session.round_count(), "SessionStore::save: called");
        let mut stamped = session.clone();
        stamped.stamp(Utc::now());

        let bytes = serde_json::to_vec_pretty(&stamped).map_err(|e| StoreError::StorageWriteFailure(e.to_string()))?;
        self.storage
            .write(&bytes)
            .map_err(|e| StoreError::StorageWriteFailure(e.to_string()))?;

        debug!(location = %self.location(), "SessionStore::save: written");
        Ok(stamped)
    }

    /// Display projection of a session
    pub fn summarize(session: &Session) -> SessionSummary {
        session.summary()
    }
}
