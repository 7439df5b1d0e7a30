use std::path::Path;

use spades_bot::learning::ParamsError;
use spades_bot::{AgentSnapshot, QLearningAgent, RandomAgent, SeatAgent, SnapshotError};
use spades_core::game::agent::Agent;
use spades_core::model::player::PlayerId;
use thiserror::Error;
use tracing::info;

use crate::config::{AgentConfig, AgentKind, LearningParams, ValidationError};

const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid parameters for agent '{name}': {source}")]
    InvalidParams {
        name: String,
        #[source]
        source: ValidationError,
    },
    #[error("agent '{name}' rejected its parameters: {source}")]
    Params {
        name: String,
        #[source]
        source: ParamsError,
    },
    #[error("failed to warm start agent '{name}': {source}")]
    Snapshot {
        name: String,
        #[source]
        source: SnapshotError,
    },
    #[error("snapshot for agent '{name}' belongs to player {found}, expected {expected}")]
    SnapshotSeat {
        name: String,
        expected: PlayerId,
        found: PlayerId,
    },
}

/// Everything needed to seat an agent, resolved from configuration.
#[derive(Debug, Clone)]
pub struct AgentBlueprint {
    pub name: String,
    pub player: PlayerId,
    implementation: Implementation,
}

#[derive(Debug, Clone)]
enum Implementation {
    Random { seed: Option<u64> },
    Learning(LearningParams),
}

impl AgentBlueprint {
    pub fn from_configs(configs: &[AgentConfig]) -> Result<Vec<Self>, AgentError> {
        configs
            .iter()
            .enumerate()
            .map(|(position, config)| Self::from_config(position, config))
            .collect()
    }

    fn from_config(position: usize, config: &AgentConfig) -> Result<Self, AgentError> {
        let invalid = |source| AgentError::InvalidParams {
            name: config.name.clone(),
            source,
        };
        let implementation = match config.kind {
            AgentKind::Random => Implementation::Random {
                seed: config.random_params().map_err(invalid)?.seed,
            },
            AgentKind::QLearning => {
                Implementation::Learning(config.learning_params().map_err(invalid)?)
            }
        };
        Ok(Self {
            name: config.name.clone(),
            player: config.player_id(position),
            implementation,
        })
    }

    pub fn kind(&self) -> AgentKind {
        match self.implementation {
            Implementation::Random { .. } => AgentKind::Random,
            Implementation::Learning(_) => AgentKind::QLearning,
        }
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        match &self.implementation {
            Implementation::Learning(params) => params.snapshot.as_deref(),
            Implementation::Random { .. } => None,
        }
    }

    /// Builds the agent; unseeded agents derive their seed from `run_seed`.
    pub fn spawn(&self, run_seed: u64) -> Result<SeatAgent, AgentError> {
        let stride = u64::from(self.player.index()).wrapping_add(1);
        let derived = run_seed.wrapping_add(stride.wrapping_mul(SEED_STRIDE));
        match &self.implementation {
            Implementation::Random { seed } => {
                Ok(RandomAgent::new(self.player, seed.unwrap_or(derived)).into())
            }
            Implementation::Learning(params) => {
                if let Some(path) = params.snapshot.as_ref() {
                    return self.restore(path);
                }
                let mut agent_params = params.agent.clone();
                agent_params.seed.get_or_insert(derived);
                let agent = QLearningAgent::new(self.player, agent_params).map_err(|source| {
                    AgentError::Params {
                        name: self.name.clone(),
                        source,
                    }
                })?;
                Ok(agent.into())
            }
        }
    }

    fn restore(&self, path: &Path) -> Result<SeatAgent, AgentError> {
        let agent = AgentSnapshot::load_agent(path).map_err(|source| AgentError::Snapshot {
            name: self.name.clone(),
            source,
        })?;
        let found = agent.id();
        if found != self.player {
            return Err(AgentError::SnapshotSeat {
                name: self.name.clone(),
                expected: self.player,
                found,
            });
        }
        info!(
            target: "spades_bench::roster",
            agent = %self.name,
            path = %path.display(),
            episodes = agent.stats().episodes,
            "warm started learning agent"
        );
        Ok(agent.into())
    }
}

#[cfg(test)]
mod tests {
    use super::{AgentBlueprint, AgentError};
    use crate::config::{AgentConfig, AgentKind};
    use spades_bot::{QLearningAgent, QLearningParams};
    use spades_core::model::player::PlayerId;
    use tempfile::tempdir;

    fn config(name: &str, kind: AgentKind, params: &str) -> AgentConfig {
        AgentConfig {
            name: name.to_string(),
            kind,
            index: None,
            params: serde_yaml::from_str(params).expect("params yaml"),
        }
    }

    #[test]
    fn blueprints_default_index_to_position() {
        let configs = vec![
            config("r", AgentKind::Random, "seed: 3"),
            config("q", AgentKind::QLearning, "epsilon: 0.2"),
        ];
        let blueprints = AgentBlueprint::from_configs(&configs).unwrap();
        assert_eq!(blueprints[0].player, PlayerId(0));
        assert_eq!(blueprints[1].player, PlayerId(1));
        assert_eq!(blueprints[1].kind(), AgentKind::QLearning);

        let seated = blueprints[1].spawn(11).unwrap();
        let learner = seated.as_learning().expect("learning agent");
        assert_eq!(learner.params().epsilon, 0.2);
        assert!(learner.params().seed.is_some());
    }

    #[test]
    fn warm_start_restores_the_saved_agent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("q.json");
        let agent = QLearningAgent::new(
            PlayerId(1),
            QLearningParams {
                epsilon: 0.1,
                seed: Some(5),
                ..QLearningParams::default()
            },
        )
        .unwrap();
        agent.snapshot().save(&path).unwrap();

        let params = format!("snapshot: \"{}\"", path.display());
        let configs = vec![
            config("r", AgentKind::Random, "{}"),
            config("q", AgentKind::QLearning, &params),
        ];
        let blueprints = AgentBlueprint::from_configs(&configs).unwrap();
        assert_eq!(blueprints[1].snapshot_path(), Some(path.as_path()));
        let seated = blueprints[1].spawn(0).unwrap();
        assert_eq!(seated.as_learning().unwrap().epsilon(), 0.1);
    }

    #[test]
    fn snapshot_for_another_seat_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("q.json");
        let agent = QLearningAgent::new(PlayerId(7), QLearningParams::default()).unwrap();
        agent.snapshot().save(&path).unwrap();

        let params = format!("snapshot: \"{}\"", path.display());
        let configs = vec![config("q", AgentKind::QLearning, &params)];
        let blueprints = AgentBlueprint::from_configs(&configs).unwrap();
        let err = blueprints[0].spawn(0).err().expect("seat mismatch");
        assert!(matches!(err, AgentError::SnapshotSeat { found, .. } if found == PlayerId(7)));
    }
}
