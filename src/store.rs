use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::app_dirs::AppDirs;
use crate::snapshot::SessionSnapshot;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no writable data directory available")]
    NoDataDir,
    #[error("failed to write session file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Durable half of the persistence gateway. A failure here never affects the
/// in-memory ledger; callers log and move on.
pub trait SnapshotStore: Send {
    fn save(&self, snapshot: &SessionSnapshot) -> Result<(), StoreError>;
}

/// Writes one pretty-printed JSON file per session under the app data dir.
/// Re-saving the same session overwrites the file with the full current
/// state, which is what makes skipped syncs harmless.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: Option<PathBuf>,
}

impl FileSnapshotStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            dir: AppDirs::sessions_dir(),
        }
    }

    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: Some(dir.as_ref().to_path_buf()),
        }
    }

    pub fn session_path(&self, session_id: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| d.join(format!("{session_id}.json")))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn save(&self, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        let dir = self.dir.as_ref().ok_or(StoreError::NoDataDir)?;
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.json", snapshot.session_id));
        let data = serde_json::to_vec_pretty(snapshot)?;
        fs::write(path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::ShotLedger;
    use crate::session::SessionContext;
    use chrono::Local;
    use tempfile::tempdir;

    fn snapshot() -> SessionSnapshot {
        let session = SessionContext::begin();
        let mut ledger = ShotLedger::new();
        ledger.current_entry().record_attempt(true);
        SessionSnapshot::capture(&session, &ledger, Local::now())
    }

    #[test]
    fn save_writes_one_file_per_session() {
        let dir = tempdir().unwrap();
        let store = FileSnapshotStore::with_dir(dir.path());
        let snap = snapshot();

        store.save(&snap).unwrap();

        let path = store.session_path(&snap.session_id).unwrap();
        assert!(path.exists());

        let loaded: SessionSnapshot =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(loaded, snap);
    }

    #[test]
    fn save_creates_missing_directories() {
        let dir = tempdir().unwrap();
        let store = FileSnapshotStore::with_dir(dir.path().join("nested").join("deep"));
        store.save(&snapshot()).unwrap();
    }

    #[test]
    fn resave_overwrites_with_current_state() {
        let dir = tempdir().unwrap();
        let store = FileSnapshotStore::with_dir(dir.path());
        let mut snap = snapshot();
        store.save(&snap).unwrap();

        snap.total_attempts = 99;
        store.save(&snap).unwrap();

        let path = store.session_path(&snap.session_id).unwrap();
        let loaded: SessionSnapshot =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(loaded.total_attempts, 99);
    }

    #[test]
    fn missing_data_dir_is_reported_not_fatal() {
        let store = FileSnapshotStore { dir: None };
        assert_matches::assert_matches!(store.save(&snapshot()), Err(StoreError::NoDataDir));
    }
}
