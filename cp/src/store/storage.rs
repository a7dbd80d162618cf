//! Snapshot storage backends

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

/// Blob store holding exactly one session snapshot
///
/// `write` must be atomic from a reader's point of view: a concurrent `read`
/// sees either the previous snapshot or the new one, never a partial write.
pub trait SnapshotStorage: Send + Sync {
    /// Read the snapshot, `None` if none was ever written
    fn read(&self) -> io::Result<Option<Vec<u8>>>;

    /// Replace the snapshot
    fn write(&self, bytes: &[u8]) -> io::Result<()>;

    /// Human-readable location for messages
    fn location(&self) -> String;
}

/// JSON file on disk, replaced via temp file + rename
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "session".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStorage for FileStorage {
    fn read(&self) -> io::Result<Option<Vec<u8>>> {
        debug!(path = %self.path.display(), "FileStorage::read: called");
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("FileStorage::read: no snapshot on disk");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn write(&self, bytes: &[u8]) -> io::Result<()> {
        debug!(path = %self.path.display(), len = bytes.len(), "FileStorage::write: called");
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        // Same directory so the rename stays on one filesystem
        let tmp_path = self.temp_path();
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(bytes)?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-process storage, used for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: Mutex<Option<Vec<u8>>>,
    writes: AtomicUsize,
    failures_pending: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-populated with a raw snapshot
    pub fn with_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Mutex::new(Some(bytes.into())),
            ..Self::default()
        }
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make the next `n` writes fail with an I/O error
    pub fn fail_next_writes(&self, n: usize) {
        self.failures_pending.store(n, Ordering::SeqCst);
    }

    /// Current snapshot bytes
    pub fn contents(&self) -> Option<Vec<u8>> {
        self.data.lock().ok().and_then(|d| d.clone())
    }
}

impl SnapshotStorage for MemoryStorage {
    fn read(&self) -> io::Result<Option<Vec<u8>>> {
        let data = self.data.lock().map_err(|_| io::Error::other("memory storage lock poisoned"))?;
        Ok(data.clone())
    }

    fn write(&self, bytes: &[u8]) -> io::Result<()> {
        let failing = self
            .failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            debug!("MemoryStorage::write: injected failure");
            return Err(io::Error::other("storage unavailable"));
        }

        let mut data = self.data.lock().map_err(|_| io::Error::other("memory storage lock poisoned"))?;
        *data = Some(bytes.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
