//! Symbolic action space for the learning agent.
//!
//! A handful of abstract moves ("lowest card that still wins", "highest
//! spade") stand in for the concrete cards. Each action is resolved back to a
//! card by re-running the hand query that produced it.

use serde::{Deserialize, Serialize};
use spades_core::model::card::Card;
use spades_core::model::hand::Hand;
use spades_core::model::suit::Suit;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SymbolicAction {
    HighestNonSpade,
    /// Also covers the off-suit discard; `LOWEST_OFF_SUIT` parses to this.
    #[serde(alias = "LOWEST_OFF_SUIT")]
    LowestNonSpade,
    HighestSpade,
    LowestSpade,
    HighestSameSuit,
    LowestSameSuit,
    LowestSameSuitWin,
    LowestSpadeWin,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("invalid legal action '{0}'")]
    Unknown(String),
}

impl SymbolicAction {
    pub const ALL: [SymbolicAction; 8] = [
        SymbolicAction::HighestNonSpade,
        SymbolicAction::LowestNonSpade,
        SymbolicAction::HighestSpade,
        SymbolicAction::LowestSpade,
        SymbolicAction::HighestSameSuit,
        SymbolicAction::LowestSameSuit,
        SymbolicAction::LowestSameSuitWin,
        SymbolicAction::LowestSpadeWin,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            SymbolicAction::HighestNonSpade => "HIGHEST_NON_SPADE",
            SymbolicAction::LowestNonSpade => "LOWEST_NON_SPADE",
            SymbolicAction::HighestSpade => "HIGHEST_SPADE",
            SymbolicAction::LowestSpade => "LOWEST_SPADE",
            SymbolicAction::HighestSameSuit => "HIGHEST_SAME_SUIT",
            SymbolicAction::LowestSameSuit => "LOWEST_SAME_SUIT",
            SymbolicAction::LowestSameSuitWin => "LOWEST_SAME_SUIT_WIN",
            SymbolicAction::LowestSpadeWin => "LOWEST_SPADE_WIN",
        }
    }

    /// Maps the action to a card for `hand` facing `lead`.
    ///
    /// `legal` is consulted only for the lowest-plain-card action, which
    /// would otherwise pick an off-suit card while the lead suit must be
    /// followed. With no plain card among `legal` it falls back to the
    /// lowest legal card.
    pub fn resolve(self, hand: &Hand, lead: Option<Card>, legal: &[Card]) -> Option<Card> {
        match (self, lead) {
            (SymbolicAction::HighestNonSpade, _) => hand.highest_non_spade(),
            (SymbolicAction::LowestNonSpade, _) => legal
                .iter()
                .copied()
                .filter(|card| !card.is_spade())
                .min_by_key(|card| card.rank)
                .or_else(|| legal.iter().copied().min_by_key(|card| card.rank))
                .or_else(|| hand.lowest_non_spade()),
            (SymbolicAction::HighestSpade, _) => hand.highest_of_suit(Suit::Spades),
            (SymbolicAction::LowestSpade, _) => hand.lowest_of_suit(Suit::Spades),
            (SymbolicAction::HighestSameSuit, Some(lead)) => hand.highest_of_suit(lead.suit),
            (SymbolicAction::LowestSameSuit, Some(lead)) => hand.lowest_of_suit(lead.suit),
            (SymbolicAction::LowestSameSuitWin, Some(lead)) => hand.lowest_that_beats(lead),
            (SymbolicAction::LowestSpadeWin, Some(lead)) => hand.lowest_spade_that_wins(lead),
            (_, None) => None,
        }
    }
}

impl fmt::Display for SymbolicAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SymbolicAction {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if token.eq_ignore_ascii_case("LOWEST_OFF_SUIT") {
            return Ok(SymbolicAction::LowestNonSpade);
        }
        SymbolicAction::ALL
            .iter()
            .copied()
            .find(|action| action.as_str().eq_ignore_ascii_case(token))
            .ok_or_else(|| ActionError::Unknown(token.to_string()))
    }
}

/// Symbolic moves available to `hand` given the card that led the current
/// trick (`None` when the board is empty).
pub fn vocabulary(hand: &Hand, lead: Option<Card>) -> Vec<SymbolicAction> {
    let mut actions = Vec::new();
    match lead {
        None => {
            if hand.has_non_spade() {
                actions.push(SymbolicAction::HighestNonSpade);
                actions.push(SymbolicAction::LowestNonSpade);
            } else if !hand.is_empty() {
                actions.push(SymbolicAction::HighestSpade);
                actions.push(SymbolicAction::LowestSpade);
            }
        }
        Some(lead) => {
            let follows = hand.highest_of_suit(lead.suit).is_some();
            if follows {
                actions.push(SymbolicAction::HighestSameSuit);
            }
            if hand.lowest_of_suit(lead.suit).is_some() {
                actions.push(SymbolicAction::LowestSameSuit);
            }
            if hand.lowest_that_beats(lead).is_some() {
                actions.push(SymbolicAction::LowestSameSuitWin);
            }
            if hand.lowest_spade_that_wins(lead).is_some() {
                actions.push(SymbolicAction::LowestSpadeWin);
            }
            // Discarding is only legal once void in the lead suit.
            if !follows && !hand.off_suit_non_spades(lead.suit).is_empty() {
                actions.push(SymbolicAction::LowestNonSpade);
            }
        }
    }
    actions
}
