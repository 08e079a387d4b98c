//! Persisted application state: whether the first-launch alert was shown.

use crate::errors::CameraError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppState {
    pub first_launch_alert_shown: bool,
    pub first_launch_alert_shown_at: Option<DateTime<Utc>>,
}

/// TOML-backed store for [`AppState`]
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/qrsnap/state.toml`, or the working directory when the
    /// platform has no data dir
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .map(|d| d.join("qrsnap"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("state.toml")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable state counts as a fresh install
    pub fn load(&self) -> AppState {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return AppState::default(),
            Err(e) => {
                log::warn!("Could not read state file {:?}: {}", self.path, e);
                return AppState::default();
            }
        };

        toml::from_str(&contents).unwrap_or_else(|e| {
            log::warn!("Ignoring malformed state file {:?}: {}", self.path, e);
            AppState::default()
        })
    }

    pub fn save(&self, state: &AppState) -> Result<(), CameraError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let contents = toml::to_string_pretty(state)
            .map_err(|e| CameraError::IoError(format!("Failed to serialize state: {}", e)))?;
        fs::write(&self.path, contents)?;
        Ok(())
    }

    /// Persist that the first-launch alert has been presented
    pub fn record_first_launch_alert(&self) -> Result<(), CameraError> {
        let mut state = self.load();
        if state.first_launch_alert_shown {
            return Ok(());
        }
        state.first_launch_alert_shown = true;
        state.first_launch_alert_shown_at = Some(Utc::now());
        self.save(&state)
    }
}
