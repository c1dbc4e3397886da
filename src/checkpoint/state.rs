//! Checkpoint state and its durable store.
//!
//! Implements atomic file writes: the state is serialized to a temp file in
//! the target directory, fsynced, and renamed into place, so a crash or
//! interrupt mid-write never leaves a truncated checkpoint behind.

use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Persisted harvest progress.
///
/// `cursor` is the opaque continuation token for the next page; `None` means
/// "start from the most recent message". `batch_no` counts successfully
/// completed batches and never decreases. Once `finished` is true the
/// harvest is permanently complete for this file; deleting the file is the
/// operator's way to force a restart from the beginning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CheckpointState {
    /// Continuation token for the next page, if any.
    pub cursor: Option<String>,
    /// Count of batches successfully completed.
    pub batch_no: u64,
    /// Whether the backward walk has reached its end.
    pub finished: bool,
}

impl CheckpointState {
    /// Record a successfully completed batch.
    ///
    /// The cursor is overwritten here and nowhere else, so a crash mid-retry
    /// always resumes at the same already-attempted page.
    pub fn advance(&mut self, next_cursor: Option<String>) {
        self.cursor = next_cursor;
        self.batch_no += 1;
    }

    /// Mark the harvest permanently complete.
    pub fn mark_finished(&mut self) {
        self.finished = true;
    }
}

/// Durable read/write access to a [`CheckpointState`] file.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Create a store backed by the given file path.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Path of the underlying state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state, falling back to the default empty state.
    ///
    /// A missing file means "no prior progress"; an unreadable or corrupt
    /// file is treated as "start over" and logged, never surfaced as an
    /// error.
    pub fn load(&self) -> CheckpointState {
        match self.read() {
            Ok(Some(state)) => {
                info!(
                    path = %self.path.display(),
                    batch_no = state.batch_no,
                    finished = state.finished,
                    has_cursor = state.cursor.is_some(),
                    "Loaded checkpoint state"
                );
                state
            }
            Ok(None) => {
                debug!(path = %self.path.display(), "No checkpoint file, starting fresh");
                CheckpointState::default()
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Checkpoint unreadable, starting fresh"
                );
                CheckpointState::default()
            }
        }
    }

    /// Read the state file, distinguishing "absent" from "corrupt".
    ///
    /// Used by [`CheckpointStore::load`] and by the read-only `state`
    /// inspection command, which wants to report corruption instead of
    /// silently swallowing it.
    pub fn read(&self) -> Result<Option<CheckpointState>, CheckpointError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let lock_file = self.open_lock_file()?;
        let lock = RwLock::new(lock_file);
        let _guard = lock
            .read()
            .map_err(|e| CheckpointError::Lock(format!("failed to acquire read lock: {e}")))?;

        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| CheckpointError::Io(e.to_string()))?;
        let state = serde_json::from_str(&contents)
            .map_err(|e| CheckpointError::Deserialization(e.to_string()))?;
        Ok(Some(state))
    }

    /// Persist the state atomically.
    ///
    /// Holds an exclusive lock on a sibling `.lock` file for the duration of
    /// the write; the interrupt path saves through this same method, so a
    /// scheduled save and a shutdown save can never interleave.
    pub fn save(&self, state: &CheckpointState) -> Result<(), CheckpointError> {
        debug!(
            path = %self.path.display(),
            batch_no = state.batch_no,
            finished = state.finished,
            "Saving checkpoint state"
        );

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| CheckpointError::Io(e.to_string()))?;
            }
        }

        let json = serde_json::to_string_pretty(state)
            .map_err(|e| CheckpointError::Serialization(e.to_string()))?;

        let lock_file = self.open_lock_file()?;
        let mut lock = RwLock::new(lock_file);
        let _guard = lock
            .write()
            .map_err(|e| CheckpointError::Lock(format!("failed to acquire write lock: {e}")))?;

        let parent_dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp_file = tempfile::NamedTempFile::new_in(parent_dir)
            .map_err(|e| CheckpointError::Io(format!("failed to create temp file: {e}")))?;

        temp_file
            .write_all(json.as_bytes())
            .map_err(|e| CheckpointError::Io(format!("failed to write temp file: {e}")))?;
        temp_file
            .flush()
            .map_err(|e| CheckpointError::Io(format!("failed to flush temp file: {e}")))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| CheckpointError::Io(format!("failed to sync temp file: {e}")))?;

        temp_file
            .persist(&self.path)
            .map_err(|e| CheckpointError::Io(format!("failed to persist temp file: {e}")))?;

        // Fsync the parent directory so the rename itself is durable.
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Ok(dir) = std::fs::File::open(parent) {
                    let _ = dir.sync_all();
                }
            }
        }

        debug!(path = %self.path.display(), "Checkpoint state saved");
        Ok(())
    }

    fn open_lock_file(&self) -> Result<std::fs::File, CheckpointError> {
        let lock_path = self.path.with_extension("lock");
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| CheckpointError::Lock(format!("failed to create lock file: {e}")))
    }
}

/// Errors related to checkpoint persistence.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Lock error
    #[error("lock error: {0}")]
    Lock(String),
}
