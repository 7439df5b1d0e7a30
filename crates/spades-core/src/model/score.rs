use crate::model::player::PlayerId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How tricks won are turned into a game score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// Exact bet earns ten per trick, a bust earns nothing and each
    /// overtrick costs ten.
    #[default]
    BustCover,
    /// Ten per trick won, bets ignored.
    Simple,
}

impl ScoringMode {
    pub fn score(self, bet: u8, tricks_won: u32) -> i32 {
        let bet = i32::from(bet);
        let won = tricks_won as i32;
        match self {
            ScoringMode::Simple => won * 10,
            ScoringMode::BustCover if won < bet => 0,
            ScoringMode::BustCover if won == bet => bet * 10,
            ScoringMode::BustCover => bet * 10 - (won - bet) * 10,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScoringMode::BustCover => "bust_cover",
            ScoringMode::Simple => "simple",
        }
    }
}

/// Bets, tricks won and final scores, keyed by player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSheet {
    bets: BTreeMap<PlayerId, u8>,
    tricks_won: BTreeMap<PlayerId, u32>,
    final_scores: BTreeMap<PlayerId, i32>,
}

impl ScoreSheet {
    pub fn new(players: &[PlayerId]) -> Self {
        Self {
            bets: BTreeMap::new(),
            tricks_won: players.iter().map(|id| (*id, 0)).collect(),
            final_scores: players.iter().map(|id| (*id, 0)).collect(),
        }
    }

    pub fn bet(&self, player: PlayerId) -> Option<u8> {
        self.bets.get(&player).copied()
    }

    pub fn bets(&self) -> &BTreeMap<PlayerId, u8> {
        &self.bets
    }

    pub(crate) fn record_bet(&mut self, player: PlayerId, bet: u8) {
        self.bets.insert(player, bet);
    }

    pub fn tricks_won(&self, player: PlayerId) -> u32 {
        self.tricks_won.get(&player).copied().unwrap_or(0)
    }

    pub fn all_tricks_won(&self) -> &BTreeMap<PlayerId, u32> {
        &self.tricks_won
    }

    pub fn total_tricks_won(&self) -> u32 {
        self.tricks_won.values().sum()
    }

    pub(crate) fn add_trick(&mut self, player: PlayerId) {
        *self.tricks_won.entry(player).or_insert(0) += 1;
    }

    pub fn final_score(&self, player: PlayerId) -> i32 {
        self.final_scores.get(&player).copied().unwrap_or(0)
    }

    pub fn final_scores(&self) -> &BTreeMap<PlayerId, i32> {
        &self.final_scores
    }

    /// Scores every player that placed a bet. Scores start at 0 and a bust
    /// leaves them there.
    pub(crate) fn settle(&mut self, mode: ScoringMode) {
        for (player, bet) in &self.bets {
            let won = self.tricks_won.get(player).copied().unwrap_or(0);
            self.final_scores.insert(*player, mode.score(*bet, won));
        }
    }
}
