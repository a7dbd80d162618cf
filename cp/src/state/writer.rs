//! SessionWriter - actor that owns the SessionStore
//!
//! Every save goes through this actor's channel, so writes are serialized and
//! a snapshot older than the last one written is never persisted over it.

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use super::messages::{SaveOutcome, WriterCommand};
use super::Snapshot;
use crate::store::{SessionStore, StoreError};

/// Handle to send saves to the writer actor
#[derive(Clone)]
pub struct SessionWriter {
    tx: mpsc::Sender<WriterCommand>,
    written_rx: watch::Receiver<Option<u64>>,
    location: String,
}

impl SessionWriter {
    /// Spawn the writer actor
    ///
    /// `baseline` is the revision already matching durable storage, if any.
    pub fn spawn(store: SessionStore, baseline: Option<u64>) -> Self {
        debug!(location = %store.location(), ?baseline, "SessionWriter::spawn: called");
        let (tx, rx) = mpsc::channel(16);
        let (written_tx, written_rx) = watch::channel(baseline);
        let location = store.location();

        tokio::spawn(actor_loop(store, rx, written_tx));

        info!("SessionWriter spawned for {}", location);
        Self {
            tx,
            written_rx,
            location,
        }
    }

    /// Where snapshots are written
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Revision of the most recent successful write
    pub fn last_written(&self) -> Option<u64> {
        *self.written_rx.borrow()
    }

    /// Whether a session at `revision` has changes not yet persisted
    pub fn is_dirty(&self, revision: u64) -> bool {
        self.last_written().is_none_or(|written| revision > written)
    }

    /// Persist a snapshot, waiting for the write to finish
    pub async fn save(&self, snapshot: Snapshot) -> Result<SaveOutcome, StoreError> {
        debug!(revision = snapshot.revision, "SessionWriter::save: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(WriterCommand::Save {
                snapshot,
                reply: reply_tx,
            })
            .await
            .map_err(|_| StoreError::ChannelError)?;
        reply_rx.await.map_err(|_| StoreError::ChannelError)?
    }
}

async fn actor_loop(
    store: SessionStore,
    mut rx: mpsc::Receiver<WriterCommand>,
    written_tx: watch::Sender<Option<u64>>,
) {
    debug!("SessionWriter actor started");
    while let Some(command) = rx.recv().await {
        match command {
            WriterCommand::Save { snapshot, reply } => {
                let result = handle_save(&store, snapshot, &written_tx);
                let _ = reply.send(result);
            }
        }
    }
    debug!("SessionWriter actor stopped: all handles dropped");
}

fn handle_save(
    store: &SessionStore,
    snapshot: Snapshot,
    written_tx: &watch::Sender<Option<u64>>,
) -> Result<SaveOutcome, StoreError> {
    let revision = snapshot.revision;
    let latest = *written_tx.borrow();

    if let Some(latest) = latest
        && revision < latest
    {
        warn!(revision, latest, "Dropping stale session snapshot");
        return Ok(SaveOutcome::Stale { revision, latest });
    }

    let saved = store.save(&snapshot.session)?;

    let at = saved.last_updated().unwrap_or_else(chrono::Utc::now);
    written_tx.send_replace(Some(revision));
    debug!(revision, %at, "handle_save: written");
    Ok(SaveOutcome::Written { revision, at })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{QaEntry, Session};
    use crate::state::SharedSession;
    use crate::store::MemoryStorage;
    use std::sync::Arc;

    fn writer_with(storage: Arc<MemoryStorage>, baseline: Option<u64>) -> SessionWriter {
        SessionWriter::spawn(SessionStore::new(storage), baseline)
    }

    #[tokio::test]
    async fn test_save_writes_and_tracks_revision() {
        let storage = Arc::new(MemoryStorage::new());
        let writer = writer_with(storage.clone(), None);
        let shared = SharedSession::fresh(Session::new("Subject").unwrap());

        assert!(writer.is_dirty(1));
        let outcome = writer.save(shared.snapshot().await).await.unwrap();

        assert!(matches!(outcome, SaveOutcome::Written { revision: 1, .. }));
        assert_eq!(writer.last_written(), Some(1));
        assert!(!writer.is_dirty(1));
        assert_eq!(storage.write_count(), 1);
    }

    #[tokio::test]
    async fn test_stale_snapshot_never_overwrites_fresher_one() {
        let storage = Arc::new(MemoryStorage::new());
        let writer = writer_with(storage.clone(), None);
        let shared = SharedSession::fresh(Session::new("Subject").unwrap());

        let old = shared.snapshot().await;
        shared
            .record_round(vec![QaEntry::new(1, "Q?", "A").unwrap()], vec![])
            .await
            .unwrap();
        let new = shared.snapshot().await;

        writer.save(new).await.unwrap();
        let outcome = writer.save(old).await.unwrap();

        assert_eq!(outcome, SaveOutcome::Stale { revision: 1, latest: 2 });
        assert_eq!(storage.write_count(), 1);
        let persisted: Session = serde_json::from_slice(&storage.contents().unwrap()).unwrap();
        assert_eq!(persisted.round_count(), 1);
    }

    #[tokio::test]
    async fn test_same_revision_can_be_saved_again() {
        let storage = Arc::new(MemoryStorage::new());
        let writer = writer_with(storage.clone(), Some(0));
        let shared = SharedSession::loaded(Session::new("Subject").unwrap());

        assert!(!writer.is_dirty(0));
        writer.save(shared.snapshot().await).await.unwrap();
        writer.save(shared.snapshot().await).await.unwrap();
        assert_eq!(storage.write_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_previous_revision() {
        let storage = Arc::new(MemoryStorage::new());
        let writer = writer_with(storage.clone(), None);
        let shared = SharedSession::fresh(Session::new("Subject").unwrap());

        storage.fail_next_writes(1);
        let err = writer.save(shared.snapshot().await).await.unwrap_err();

        assert!(matches!(err, StoreError::StorageWriteFailure(_)));
        assert_eq!(writer.last_written(), None);
        assert!(writer.is_dirty(1));
    }
}
