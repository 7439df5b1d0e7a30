use crate::model::card::Card;
use crate::model::player::PlayerId;
use crate::model::rules;
use crate::model::suit::Suit;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One trick: the playing order fixed when it opened and the cards laid so far.
///
/// The position of a play in `plays` is its board position, so the board and
/// the record of who played where can never drift apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trick {
    order: Vec<PlayerId>,
    plays: Vec<Play>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Play {
    pub player: PlayerId,
    pub card: Card,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrickError {
    TrickComplete,
    OutOfTurn {
        expected: PlayerId,
        actual: PlayerId,
    },
    AlreadyPlayed(PlayerId),
}

impl fmt::Display for TrickError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrickError::TrickComplete => write!(f, "trick already complete"),
            TrickError::OutOfTurn { expected, actual } => {
                write!(f, "expected {expected} to play next but got {actual}")
            }
            TrickError::AlreadyPlayed(player) => {
                write!(f, "{player} has already played this trick")
            }
        }
    }
}

impl std::error::Error for TrickError {}

impl Trick {
    pub fn new(order: Vec<PlayerId>) -> Self {
        let capacity = order.len();
        Self {
            order,
            plays: Vec::with_capacity(capacity),
        }
    }

    pub fn order(&self) -> &[PlayerId] {
        &self.order
    }

    pub fn leader(&self) -> Option<PlayerId> {
        self.order.first().copied()
    }

    pub fn plays(&self) -> &[Play] {
        &self.plays
    }

    pub fn is_empty(&self) -> bool {
        self.plays.is_empty()
    }

    pub fn len(&self) -> usize {
        self.plays.len()
    }

    pub fn is_complete(&self) -> bool {
        !self.order.is_empty() && self.plays.len() == self.order.len()
    }

    pub fn lead_card(&self) -> Option<Card> {
        self.plays.first().map(|play| play.card)
    }

    pub fn lead_suit(&self) -> Option<Suit> {
        self.lead_card().map(|card| card.suit)
    }

    pub fn card_at(&self, position: usize) -> Option<Card> {
        self.plays.get(position).map(|play| play.card)
    }

    pub fn player_at(&self, position: usize) -> Option<PlayerId> {
        self.plays.get(position).map(|play| play.player)
    }

    pub fn expected_player(&self) -> Option<PlayerId> {
        self.order.get(self.plays.len()).copied()
    }

    pub fn play(&mut self, player: PlayerId, card: Card) -> Result<(), TrickError> {
        if self.is_complete() {
            return Err(TrickError::TrickComplete);
        }

        if self.plays.iter().any(|play| play.player == player) {
            return Err(TrickError::AlreadyPlayed(player));
        }

        let expected = self.expected_player().ok_or(TrickError::TrickComplete)?;
        if expected != player {
            return Err(TrickError::OutOfTurn {
                expected,
                actual: player,
            });
        }

        self.plays.push(Play { player, card });
        Ok(())
    }

    /// The winning play of a complete trick.
    pub fn winning_play(&self) -> Option<Play> {
        if !self.is_complete() {
            return None;
        }
        rules::winning_position(&self.plays).map(|position| self.plays[position])
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.winning_play().map(|play| play.player)
    }
}

#[cfg(test)]
mod tests {
    use super::{Trick, TrickError};
    use crate::model::card::Card;
    use crate::model::player::PlayerId;

    fn card(token: &str) -> Card {
        token.parse().unwrap()
    }

    fn order() -> Vec<PlayerId> {
        vec![PlayerId(2), PlayerId(0), PlayerId(1)]
    }

    #[test]
    fn plays_follow_turn_order() {
        let mut trick = Trick::new(order());
        assert!(trick.play(PlayerId(2), card("2C")).is_ok());
        assert!(matches!(
            trick.play(PlayerId(1), card("3C")),
            Err(TrickError::OutOfTurn { .. })
        ));
        assert!(matches!(
            trick.play(PlayerId(2), card("4C")),
            Err(TrickError::AlreadyPlayed(_))
        ));
    }

    #[test]
    fn positions_record_card_and_player_together() {
        let mut trick = Trick::new(order());
        trick.play(PlayerId(2), card("10H")).unwrap();
        trick.play(PlayerId(0), card("3S")).unwrap();
        assert_eq!(trick.card_at(1), Some(card("3S")));
        assert_eq!(trick.player_at(1), Some(PlayerId(0)));
        assert_eq!(trick.lead_card(), Some(card("10H")));
        assert_eq!(trick.winner(), None, "incomplete trick has no winner");
    }

    #[test]
    fn spade_beats_higher_lead_suit_card() {
        let mut trick = Trick::new(order());
        trick.play(PlayerId(2), card("AH")).unwrap();
        trick.play(PlayerId(0), card("2S")).unwrap();
        trick.play(PlayerId(1), card("KH")).unwrap();
        assert_eq!(trick.winner(), Some(PlayerId(0)));
        assert!(matches!(
            trick.play(PlayerId(1), card("QH")),
            Err(TrickError::TrickComplete)
        ));
    }
}
