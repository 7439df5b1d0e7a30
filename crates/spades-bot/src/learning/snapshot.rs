//! On-disk form of a learning agent.

use crate::learning::agent::{
    EpisodeStats, ParamsError, PlayEntry, QLearningAgent, QLearningParams,
};
use crate::learning::betting::BetEntry;
use serde::{Deserialize, Serialize};
use spades_core::model::player::PlayerId;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub player: PlayerId,
    pub params: QLearningParams,
    pub epsilon: f64,
    #[serde(default)]
    pub stats: EpisodeStats,
    #[serde(default)]
    pub play_values: Vec<PlayEntry>,
    #[serde(default)]
    pub bet_values: Vec<BetEntry>,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to access snapshot {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot holds invalid parameters: {0}")]
    Params(#[from] ParamsError),
}

impl AgentSnapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| SnapshotError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, self.to_json()?).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Loads a snapshot and rebuilds the agent it describes.
    pub fn load_agent(path: impl AsRef<Path>) -> Result<QLearningAgent, SnapshotError> {
        let snapshot = Self::load(path)?;
        Ok(QLearningAgent::restore(snapshot)?)
    }
}
