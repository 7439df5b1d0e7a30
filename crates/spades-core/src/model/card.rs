use crate::model::rank::{ParseRankError, Rank};
use crate::model::suit::{ParseSuitError, Suit};
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }

    pub const fn is_spade(self) -> bool {
        self.suit.is_trump()
    }

    /// True when `self` and `other` share a suit and `self` ranks strictly higher.
    pub fn outranks(self, other: Card) -> bool {
        self.suit == other.suit && self.rank > other.rank
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCardError {
    TooShort(String),
    Rank(ParseRankError),
    Suit(ParseSuitError),
}

impl fmt::Display for ParseCardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCardError::TooShort(raw) => write!(f, "card token '{raw}' is too short"),
            ParseCardError::Rank(err) => write!(f, "{err}"),
            ParseCardError::Suit(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ParseCardError {}

impl FromStr for Card {
    type Err = ParseCardError;

    /// Parses the `Display` form, e.g. `"QS"` or `"10H"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if token.len() < 2 || !token.is_ascii() {
            return Err(ParseCardError::TooShort(token.to_string()));
        }
        let (rank, suit) = token.split_at(token.len() - 1);
        let rank = rank.parse::<Rank>().map_err(ParseCardError::Rank)?;
        let suit = suit.parse::<Suit>().map_err(ParseCardError::Suit)?;
        Ok(Card::new(rank, suit))
    }
}
