// src/storage/state.rs
use crate::errors::Result;
use crate::types::{Phase, Position};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{error, info};

/// Snapshot of the held position, written whenever it changes so a restart
/// resumes the same trade instead of opening a second one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub phase: Phase,
    pub position: Option<Position>,
}

impl PersistedState {
    pub fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            position: None,
        }
    }
}

pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Missing or unreadable files yield `None`.
    pub async fn load(&self) -> Option<PersistedState> {
        let data = tokio::fs::read_to_string(&self.path).await.ok()?;
        match serde_json::from_str::<PersistedState>(&data) {
            Ok(state) => {
                info!(path = %self.path.display(), phase = ?state.phase, "Restored state");
                Some(state)
            }
            Err(e) => {
                error!(path = %self.path.display(), "Ignoring corrupt state file: {}", e);
                None
            }
        }
    }

    pub async fn save(&self, state: &PersistedState) -> Result<()> {
        let data = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
