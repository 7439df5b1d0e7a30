use super::engine::GameResult;
use crate::model::card::Card;
use crate::model::player::PlayerId;
use crate::model::score::ScoringMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flattened, human-readable record of a finished game. Cards are written in
/// their short form (`10H`, `QS`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameRecord {
    pub game: u64,
    pub scoring: ScoringMode,
    pub seating: Vec<PlayerId>,
    pub bets: BTreeMap<PlayerId, u8>,
    pub tricks_won: BTreeMap<PlayerId, u32>,
    pub final_scores: BTreeMap<PlayerId, i32>,
    pub winner: PlayerId,
    #[serde(default)]
    pub tricks: Vec<TrickRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrickRecord {
    pub plays: Vec<(PlayerId, String)>,
    pub winner: Option<PlayerId>,
}

impl TrickRecord {
    pub fn cards(&self) -> Vec<Card> {
        self.plays
            .iter()
            .filter_map(|(_, token)| token.parse().ok())
            .collect()
    }
}

impl GameRecord {
    pub fn capture(game: u64, result: &GameResult) -> Self {
        let tricks = result
            .tricks
            .iter()
            .map(|trick| TrickRecord {
                plays: trick
                    .plays()
                    .iter()
                    .map(|play| (play.player, play.card.to_string()))
                    .collect(),
                winner: trick.winner(),
            })
            .collect();

        GameRecord {
            game,
            scoring: result.scoring,
            seating: result.seating.clone(),
            bets: result.bets.clone(),
            tricks_won: result.tricks_won.clone(),
            final_scores: result.final_scores.clone(),
            winner: result.winner,
            tricks,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Single-line form for JSONL traces.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::GameRecord;
    use crate::game::agent::{Agent, TableView};
    use crate::game::engine::{GameConfig, Spades};
    use crate::model::card::Card;
    use crate::model::player::PlayerId;

    struct Lowest(PlayerId);

    impl Agent for Lowest {
        fn id(&self) -> PlayerId {
            self.0
        }

        fn make_bet(&mut self, _view: &TableView<'_>) -> u8 {
            2
        }

        fn decide(&mut self, view: &TableView<'_>) -> Option<Card> {
            view.legal_moves().first().copied()
        }
    }

    fn sample_record() -> GameRecord {
        let agents = vec![Lowest(PlayerId(0)), Lowest(PlayerId(1)), Lowest(PlayerId(2))];
        let mut game = Spades::with_seed(agents, GameConfig::default(), 17).unwrap();
        let result = game.play_next_game().unwrap();
        GameRecord::capture(1, &result)
    }

    #[test]
    fn record_serializes_to_json() {
        let json = sample_record().to_json().unwrap();
        assert!(json.contains("\"game\": 1"));
        assert!(json.contains("\"scoring\": \"bust_cover\""));
        assert!(json.contains("\"winner\""));
    }

    #[test]
    fn record_roundtrip_preserves_tricks() {
        let record = sample_record();
        let restored = GameRecord::from_json(&record.to_json_line().unwrap()).unwrap();
        assert_eq!(restored, record);
        let cards: usize = restored.tricks.iter().map(|t| t.cards().len()).sum();
        assert_eq!(cards, 52);
    }

    #[test]
    fn record_from_json_tolerates_missing_tricks() {
        let legacy = r#"{
            "game": 4,
            "scoring": "simple",
            "seating": [1, 0],
            "bets": {"0": 3, "1": 4},
            "tricks_won": {"0": 10, "1": 16},
            "final_scores": {"0": 100, "1": 160},
            "winner": 1
        }"#;

        let record = GameRecord::from_json(legacy).unwrap();
        assert_eq!(record.game, 4);
        assert!(record.tricks.is_empty());
        assert_eq!(record.final_scores[&PlayerId(1)], 160);
    }
}
