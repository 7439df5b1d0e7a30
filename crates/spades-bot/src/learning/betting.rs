//! Optional learned bidding: a one-step value table keyed on hand strength.

use crate::learning::table::{ValueEntry, ValueTable};
use crate::policy::random::sample_normal_bet;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use spades_core::model::card::Card;
use spades_core::model::hand::Hand;
use tracing::trace;

/// Summed rank values of the dealt hand, plain cards and spades apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BetState {
    pub non_spade_value: u32,
    pub spade_value: u32,
}

impl BetState {
    pub fn from_hand(hand: &Hand) -> Self {
        let (spades, plain): (Vec<_>, Vec<_>) = hand.iter().partition(|card| card.is_spade());
        let total = |cards: Vec<&Card>| -> u32 {
            cards.iter().map(|card| u32::from(card.rank.value())).sum()
        };
        Self {
            non_spade_value: total(plain),
            spade_value: total(spades),
        }
    }
}

pub type BetEntry = ValueEntry<BetState, u8>;

#[derive(Debug, Clone, Default)]
pub struct BetLearner {
    table: ValueTable<BetState, u8>,
    pending: Option<(BetState, u8)>,
}

impl BetLearner {
    pub fn new() -> Self {
        Self {
            table: ValueTable::new(),
            pending: None,
        }
    }

    pub fn from_entries(entries: Vec<BetEntry>) -> Self {
        Self {
            table: ValueTable::from_entries(entries),
            pending: None,
        }
    }

    pub fn entries(&self) -> Vec<BetEntry> {
        self.table.entries()
    }

    pub fn value(&self, state: &BetState, bet: u8) -> f64 {
        self.table.value(state, bet)
    }

    /// Epsilon-greedy bet in `0..=cards held`. Exploration draws the same
    /// normal bet the baseline uses.
    pub fn choose<R: Rng + ?Sized>(
        &mut self,
        hand: &Hand,
        deck_size: usize,
        num_players: usize,
        epsilon: f64,
        rng: &mut R,
    ) -> u8 {
        let state = BetState::from_hand(hand);
        let max_bet = u8::try_from(hand.len()).unwrap_or(u8::MAX);
        let legal: Vec<u8> = (0..=max_bet).collect();

        let bet = if rng.gen_bool(epsilon) {
            sample_normal_bet(deck_size, num_players, hand.len(), rng)
        } else {
            self.table
                .best_actions(&state, &legal)
                .choose(rng)
                .copied()
                .unwrap_or(0)
        };
        trace!(
            target: "spades_bot::betting",
            non_spade = state.non_spade_value,
            spade = state.spade_value,
            bet,
            "bet chosen"
        );
        self.pending = Some((state, bet));
        bet
    }

    /// Terminal update for the bet placed this game; no successor state.
    pub fn learn(&mut self, final_score: i32, alpha: f64) -> Option<f64> {
        let (state, bet) = self.pending.take()?;
        Some(
            self.table
                .update(state, bet, f64::from(final_score), 0.0, alpha, 0.0),
        )
    }
}
