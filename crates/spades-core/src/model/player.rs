use core::fmt;
use serde::{Deserialize, Serialize};

/// Stable identity of a participant. Unique within a game, independent of seating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl PlayerId {
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl From<u32> for PlayerId {
    fn from(value: u32) -> Self {
        PlayerId(value)
    }
}

/// Fixed seating order for one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seating {
    seats: Vec<PlayerId>,
}

impl Seating {
    /// Returns the first id that occurs twice, if any.
    pub fn first_duplicate(players: &[PlayerId]) -> Option<PlayerId> {
        players
            .iter()
            .enumerate()
            .find(|(idx, id)| players[..*idx].contains(id))
            .map(|(_, id)| *id)
    }

    pub(crate) fn new_unchecked(seats: Vec<PlayerId>) -> Self {
        Self { seats }
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn players(&self) -> &[PlayerId] {
        &self.seats
    }

    pub fn position_of(&self, player: PlayerId) -> Option<usize> {
        self.seats.iter().position(|id| *id == player)
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.position_of(player).is_some()
    }

    /// Seating order starting at `leader` and wrapping around.
    pub fn rotation_from(&self, leader: PlayerId) -> Vec<PlayerId> {
        let start = self.position_of(leader).unwrap_or(0);
        self.seats[start..]
            .iter()
            .chain(self.seats[..start].iter())
            .copied()
            .collect()
    }
}
