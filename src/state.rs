// src/state.rs
//! Persisted capture state: the last-processed-window-end pointer and the
//! learned preference weight table, written at well-defined commit points.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::score::preference::PreferenceWeightTable;

pub const ENV_STATE_PATH: &str = "CAPTURE_STATE_PATH";
pub const DEFAULT_STATE_PATH: &str = "state/capture.json";

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CaptureState {
    #[serde(default)]
    pub last_window_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub weights: PreferenceWeightTable,
}

pub trait StateStore: Send + Sync {
    fn load(&self) -> Result<CaptureState>;
    fn save(&self, state: &CaptureState) -> Result<()>;
}

/// JSON file store. A missing file is a fresh install, not an error.
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Resolve the path from $CAPTURE_STATE_PATH or the default location.
    pub fn from_env() -> Self {
        let path = std::env::var(ENV_STATE_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_STATE_PATH));
        Self::new(path)
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> Result<CaptureState> {
        match fs::read_to_string(&self.path) {
            Ok(s) => serde_json::from_str(&s)
                .with_context(|| format!("parsing capture state at {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CaptureState::default()),
            Err(e) => {
                Err(e).with_context(|| format!("reading capture state at {}", self.path.display()))
            }
        }
    }

    fn save(&self, state: &CaptureState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating state dir {}", parent.display()))?;
            }
        }
        let json = serde_json::to_vec_pretty(state).context("serializing capture state")?;
        fs::write(&self.path, json)
            .with_context(|| format!("writing capture state at {}", self.path.display()))
    }
}

/// In-memory store for tests and dry runs.
#[derive(Default)]
pub struct MemoryStateStore {
    inner: Mutex<CaptureState>,
}

impl MemoryStateStore {
    pub fn new(state: CaptureState) -> Self {
        Self {
            inner: Mutex::new(state),
        }
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<CaptureState> {
        Ok(self.inner.lock().expect("state mutex poisoned").clone())
    }

    fn save(&self, state: &CaptureState) -> Result<()> {
        *self.inner.lock().expect("state mutex poisoned") = state.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn missing_file_is_fresh_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("capture.json"));
        let state = store.load().unwrap();
        assert_eq!(state, CaptureState::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("nested/capture.json"));
        let state = CaptureState {
            last_window_end: Some(Utc.with_ymd_and_hms(2026, 3, 1, 17, 0, 0).unwrap()),
            weights: PreferenceWeightTable::from_entries(vec![("local".into(), 2.0)]),
        };
        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), state);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.json");
        fs::write(&path, "not json").unwrap();
        assert!(FileStateStore::new(&path).load().is_err());
    }
}
