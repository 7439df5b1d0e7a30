//! Compact table key for the play policy.

use serde::{Deserialize, Serialize};
use spades_core::game::agent::TableView;
use spades_core::model::card::Card;
use spades_core::model::rank::Rank;
use spades_core::model::trick::Trick;
use std::fmt;
use std::str::FromStr;

/// Board summary. Only a single card on the board is encoded; an empty board
/// and a board holding two or more cards both read as `Empty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum BoardToken {
    Empty,
    Spade(Rank),
    NonSpade(Rank),
}

impl BoardToken {
    /// Only a lone lead card is encoded; an empty board and a board holding
    /// two or more cards both map to `Empty`.
    pub fn from_trick(trick: &Trick) -> Self {
        match trick.plays() {
            [only] => Self::from_card(only.card),
            _ => BoardToken::Empty,
        }
    }

    pub fn from_card(card: Card) -> Self {
        if card.is_spade() {
            BoardToken::Spade(card.rank)
        } else {
            BoardToken::NonSpade(card.rank)
        }
    }
}

impl fmt::Display for BoardToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardToken::Empty => f.write_str("EMPTY"),
            BoardToken::Spade(rank) => write!(f, "S{}", rank.symbol()),
            BoardToken::NonSpade(rank) => write!(f, "NS{}", rank.symbol()),
        }
    }
}

impl FromStr for BoardToken {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "EMPTY" {
            return Ok(BoardToken::Empty);
        }
        let (spade, rank) = match s.strip_prefix("NS") {
            Some(rest) => (false, rest),
            None => match s.strip_prefix('S') {
                Some(rest) => (true, rest),
                None => return Err(format!("invalid board token '{s}'")),
            },
        };
        let rank = rank
            .parse::<Rank>()
            .map_err(|_| format!("invalid board token '{s}'"))?;
        Ok(if spade {
            BoardToken::Spade(rank)
        } else {
            BoardToken::NonSpade(rank)
        })
    }
}

impl From<BoardToken> for String {
    fn from(token: BoardToken) -> Self {
        token.to_string()
    }
}

impl TryFrom<String> for BoardToken {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateKey {
    pub board: BoardToken,
    pub turns_remaining: i32,
}

impl StateKey {
    pub fn from_view(view: &TableView<'_>) -> Self {
        Self {
            board: BoardToken::from_trick(view.trick()),
            turns_remaining: turns_remaining(
                view.deck_size(),
                view.num_players(),
                view.tricks_resolved(),
            ),
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.board, self.turns_remaining)
    }
}

/// Rough countdown: `deck / 2 / players / 2` minus the tricks resolved so far.
/// Can go negative late in a game.
pub fn turns_remaining(deck_size: usize, num_players: usize, tricks_resolved: usize) -> i32 {
    let players = num_players.max(1);
    let budget = deck_size / 2 / players / 2;
    budget as i32 - tricks_resolved as i32
}
