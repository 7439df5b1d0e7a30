pub mod actions;
pub mod agent;
pub mod betting;
pub mod snapshot;
pub mod state;
pub mod table;

pub use actions::{ActionError, SymbolicAction, vocabulary};
pub use agent::{EpisodeStats, ParamsError, QLearningAgent, QLearningParams};
pub use betting::{BetLearner, BetState};
pub use snapshot::{AgentSnapshot, SnapshotError};
pub use state::{BoardToken, StateKey};
pub use table::{ValueEntry, ValueTable};
