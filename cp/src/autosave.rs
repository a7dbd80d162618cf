//! Periodic autosave of the shared session
//!
//! The scheduler owns one background task. Each tick it snapshots the session
//! and hands it to the writer if anything changed since the last write. A
//! failed save is logged and retried on the next tick.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::state::{SaveOutcome, SessionWriter, SharedSession};
use crate::store::StoreError;

struct Running {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

/// Owns the autosave timer for one session
pub struct AutosaveScheduler {
    writer: SessionWriter,
    running: Option<Running>,
}

impl AutosaveScheduler {
    pub fn new(writer: SessionWriter) -> Self {
        Self { writer, running: None }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Start saving every `interval`
    ///
    /// Calling this while already running does nothing.
    pub fn start(&mut self, session: SharedSession, interval: Duration) {
        debug!(?interval, "AutosaveScheduler::start: called");
        if self.running.is_some() {
            debug!("AutosaveScheduler::start: already running");
            return;
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(autosave_loop(session, self.writer.clone(), interval, shutdown_rx));
        self.running = Some(Running { shutdown_tx, task });
        info!("Autosave started (every {}s)", interval.as_secs());
    }

    /// Stop the timer, waiting for an in-flight save to finish
    pub async fn stop(&mut self) {
        debug!("AutosaveScheduler::stop: called");
        let Some(running) = self.running.take() else {
            debug!("AutosaveScheduler::stop: not running");
            return;
        };

        let _ = running.shutdown_tx.send(()).await;
        if let Err(e) = running.task.await {
            warn!(error = %e, "Autosave task ended abnormally");
        }
        info!("Autosave stopped");
    }
}

impl Drop for AutosaveScheduler {
    fn drop(&mut self) {
        // The task exits on its own once it sees the signal or the closed channel
        if let Some(running) = self.running.take() {
            let _ = running.shutdown_tx.try_send(());
        }
    }
}

/// Save the session if it has unpersisted changes
///
/// Returns `None` when there was nothing to save.
pub async fn save_if_dirty(session: &SharedSession, writer: &SessionWriter) -> Option<Result<SaveOutcome, StoreError>> {
    let snapshot = session.snapshot().await;
    if !writer.is_dirty(snapshot.revision) {
        debug!(revision = snapshot.revision, "save_if_dirty: clean");
        return None;
    }
    Some(writer.save(snapshot).await)
}

async fn autosave_loop(
    session: SharedSession,
    writer: SessionWriter,
    interval: Duration,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match save_if_dirty(&session, &writer).await {
                    Some(Ok(SaveOutcome::Written { revision, .. })) => {
                        info!(revision, "Autosaved to {}", writer.location());
                    }
                    Some(Ok(SaveOutcome::Stale { revision, latest })) => {
                        debug!(revision, latest, "autosave_loop: snapshot already superseded");
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Autosave failed, retrying next interval");
                    }
                    None => {}
                }
            }
            _ = shutdown_rx.recv() => {
                debug!("autosave_loop: shutdown received");
                break;
            }
        }
    }
}
