pub mod learning;
pub mod policy;

pub use learning::{
    AgentSnapshot, BoardToken, QLearningAgent, QLearningParams, SnapshotError, StateKey,
    SymbolicAction,
};
pub use policy::{RandomAgent, SeatAgent};
