use crate::game::agent::{Agent, TableView, TrickFeedback};
use crate::model::deck::Deck;
use crate::model::player::{PlayerId, Seating};
use crate::model::round::{PlayOutcome, RoundError, RoundState};
use crate::model::score::ScoringMode;
use crate::model::trick::Trick;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Reward for every trick except the last one.
pub const STEP_REWARD: f64 = -1.0;
/// Per-trick multiplier for the reward paid out after the last trick.
pub const TRICK_REWARD: f64 = 10.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default)]
    pub scoring: ScoringMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    NoAgents,
    DuplicatePlayer(PlayerId),
    MissingAgent(PlayerId),
    NoDecision(PlayerId),
    Stalled,
    Round(RoundError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::NoAgents => write!(f, "a game needs at least one agent"),
            EngineError::DuplicatePlayer(id) => {
                write!(f, "all players must have a unique index ({id} appears twice)")
            }
            EngineError::MissingAgent(id) => write!(f, "no agent is registered for {id}"),
            EngineError::NoDecision(id) => write!(f, "{id} returned no card to play"),
            EngineError::Stalled => write!(f, "cards remain in hand but nobody is due to play"),
            EngineError::Round(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<RoundError> for EngineError {
    fn from(err: RoundError) -> Self {
        EngineError::Round(err)
    }
}

/// Outcome of one scored game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    pub seating: Vec<PlayerId>,
    pub scoring: ScoringMode,
    pub bets: BTreeMap<PlayerId, u8>,
    pub tricks_won: BTreeMap<PlayerId, u32>,
    pub final_scores: BTreeMap<PlayerId, i32>,
    pub winner: PlayerId,
    pub tricks: Vec<Trick>,
}

impl GameResult {
    fn from_round(round: &RoundState, scoring: ScoringMode) -> Option<Self> {
        let sheet = round.scores();
        // Strict comparison keeps the earliest seat on ties.
        let winner = round
            .players()
            .iter()
            .copied()
            .fold(None::<PlayerId>, |best, id| match best {
                Some(current) if sheet.final_score(current) >= sheet.final_score(id) => {
                    Some(current)
                }
                _ => Some(id),
            })?;

        Some(Self {
            seating: round.players().to_vec(),
            scoring,
            bets: sheet.bets().clone(),
            tricks_won: sheet.all_tricks_won().clone(),
            final_scores: sheet.final_scores().clone(),
            winner,
            tricks: round.trick_history().to_vec(),
        })
    }

    pub fn score_of(&self, player: PlayerId) -> i32 {
        self.final_scores.get(&player).copied().unwrap_or(0)
    }

    pub fn bet_of(&self, player: PlayerId) -> u8 {
        self.bets.get(&player).copied().unwrap_or(0)
    }

    pub fn tricks_of(&self, player: PlayerId) -> u32 {
        self.tricks_won.get(&player).copied().unwrap_or(0)
    }

    pub fn made_exact_bet(&self, player: PlayerId) -> bool {
        self.tricks_of(player) == u32::from(self.bet_of(player))
    }

    pub fn busted(&self, player: PlayerId) -> bool {
        self.tricks_of(player) < u32::from(self.bet_of(player))
    }
}

/// Cumulative results of `play_x_games`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub games: usize,
    pub score_board: BTreeMap<PlayerId, i64>,
    pub wins: BTreeMap<PlayerId, u32>,
}

impl MatchSummary {
    pub fn record(&mut self, result: &GameResult) {
        self.games += 1;
        for (player, score) in &result.final_scores {
            *self.score_board.entry(*player).or_insert(0) += i64::from(*score);
            self.wins.entry(*player).or_insert(0);
        }
        *self.wins.entry(result.winner).or_insert(0) += 1;
    }

    pub fn wins_of(&self, player: PlayerId) -> u32 {
        self.wins.get(&player).copied().unwrap_or(0)
    }

    pub fn total_score_of(&self, player: PlayerId) -> i64 {
        self.score_board.get(&player).copied().unwrap_or(0)
    }
}

/// Runs games between a fixed roster of agents. Agents keep their internal
/// state from one game to the next.
pub struct Spades<A: Agent = Box<dyn Agent>> {
    agents: Vec<A>,
    config: GameConfig,
    rng: StdRng,
    seed: u64,
    games_played: u64,
}

impl<A: Agent> Spades<A> {
    pub fn new(agents: Vec<A>, config: GameConfig) -> Result<Self, EngineError> {
        let seed: u64 = rand::random();
        Self::with_seed(agents, config, seed)
    }

    pub fn with_seed(agents: Vec<A>, config: GameConfig, seed: u64) -> Result<Self, EngineError> {
        if agents.is_empty() {
            return Err(EngineError::NoAgents);
        }
        let ids: Vec<PlayerId> = agents.iter().map(Agent::id).collect();
        if let Some(duplicate) = Seating::first_duplicate(&ids) {
            return Err(EngineError::DuplicatePlayer(duplicate));
        }
        Ok(Self {
            agents,
            config,
            rng: StdRng::seed_from_u64(seed),
            seed,
            games_played: 0,
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> GameConfig {
        self.config
    }

    pub fn games_played(&self) -> u64 {
        self.games_played
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.agents.iter().map(Agent::id).collect()
    }

    pub fn agents(&self) -> &[A] {
        &self.agents
    }

    pub fn agents_mut(&mut self) -> &mut [A] {
        &mut self.agents
    }

    pub fn into_agents(self) -> Vec<A> {
        self.agents
    }

    fn agent_index(&self, player: PlayerId) -> Result<usize, EngineError> {
        self.agents
            .iter()
            .position(|agent| agent.id() == player)
            .ok_or(EngineError::MissingAgent(player))
    }

    /// Shuffles the seating and the deck from the engine's RNG and plays one
    /// full game.
    pub fn play_next_game(&mut self) -> Result<GameResult, EngineError> {
        let mut seating = self.player_ids();
        seating.shuffle(&mut self.rng);
        let deck = Deck::shuffled(&mut self.rng);
        self.play_game_with_deck(&seating, &deck)
    }

    pub fn play_x_games(&mut self, games: usize) -> Result<MatchSummary, EngineError> {
        let mut summary = MatchSummary::default();
        for _ in 0..games {
            let result = self.play_next_game()?;
            summary.record(&result);
        }
        Ok(summary)
    }

    /// Plays one game with an explicit seating and deck order.
    pub fn play_game_with_deck(
        &mut self,
        seating: &[PlayerId],
        deck: &Deck,
    ) -> Result<GameResult, EngineError> {
        let indices = seating
            .iter()
            .map(|id| self.agent_index(*id))
            .collect::<Result<Vec<_>, _>>()?;
        let mut round = RoundState::deal(seating, deck)?;

        for (player, index) in seating.iter().zip(&indices) {
            let view = TableView::for_player(&round, *player)
                .ok_or(EngineError::MissingAgent(*player))?;
            let bet = self.agents[*index].make_bet(&view);
            round.place_bet(*player, bet)?;
        }

        while !round.is_terminal() {
            let player = round
                .current_trick()
                .expected_player()
                .ok_or(EngineError::Stalled)?;
            let index = self.agent_index(player)?;
            let card = {
                let view = TableView::for_player(&round, player)
                    .ok_or(EngineError::MissingAgent(player))?;
                self.agents[index]
                    .decide(&view)
                    .ok_or(EngineError::NoDecision(player))?
            };

            if let PlayOutcome::TrickCompleted { winner, .. } = round.play_card(player, card)? {
                let game_over = round.is_terminal();
                for (seat, index) in seating.iter().zip(&indices) {
                    let Some(view) = TableView::for_player(&round, *seat) else {
                        continue;
                    };
                    let reward = if game_over {
                        TRICK_REWARD * f64::from(view.tricks_won())
                    } else {
                        STEP_REWARD
                    };
                    let feedback = TrickFeedback {
                        winner,
                        reward,
                        game_over,
                    };
                    self.agents[*index].observe_trick(&view, &feedback);
                }
            }
        }

        round.score_game(self.config.scoring)?;
        let result =
            GameResult::from_round(&round, self.config.scoring).ok_or(EngineError::NoAgents)?;
        self.games_played += 1;
        debug!(
            target: "spades_core::engine",
            game = self.games_played,
            winner = %result.winner,
            tricks = result.tricks.len(),
            "game finished"
        );

        for index in &indices {
            self.agents[*index].observe_game_end(&result);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::{EngineError, GameConfig, MatchSummary, Spades};
    use crate::game::agent::{Agent, TableView, TrickFeedback};
    use crate::model::card::Card;
    use crate::model::deck::Deck;
    use crate::model::player::PlayerId;
    use crate::model::score::ScoringMode;

    struct FirstLegal {
        id: PlayerId,
        bet: u8,
        rewards: Vec<f64>,
        games_seen: u32,
    }

    impl FirstLegal {
        fn new(id: u32, bet: u8) -> Self {
            Self {
                id: PlayerId(id),
                bet,
                rewards: Vec::new(),
                games_seen: 0,
            }
        }
    }

    impl Agent for FirstLegal {
        fn id(&self) -> PlayerId {
            self.id
        }

        fn make_bet(&mut self, view: &TableView<'_>) -> u8 {
            self.bet.min(view.cards_dealt() as u8)
        }

        fn decide(&mut self, view: &TableView<'_>) -> Option<Card> {
            view.legal_moves().first().copied()
        }

        fn observe_trick(&mut self, _view: &TableView<'_>, feedback: &TrickFeedback) {
            self.rewards.push(feedback.reward);
        }

        fn observe_game_end(&mut self, _result: &super::GameResult) {
            self.games_seen += 1;
        }
    }

    struct Cheater(PlayerId);

    impl Agent for Cheater {
        fn id(&self) -> PlayerId {
            self.0
        }

        fn make_bet(&mut self, _view: &TableView<'_>) -> u8 {
            0
        }

        fn decide(&mut self, view: &TableView<'_>) -> Option<Card> {
            let legal = view.legal_moves();
            view.hand()
                .iter()
                .copied()
                .find(|card| !legal.contains(card))
                .or_else(|| legal.first().copied())
        }
    }

    #[test]
    fn duplicate_agents_are_rejected() {
        let agents = vec![FirstLegal::new(1, 3), FirstLegal::new(1, 3)];
        let err = Spades::with_seed(agents, GameConfig::default(), 0).err();
        assert_eq!(err, Some(EngineError::DuplicatePlayer(PlayerId(1))));
    }

    #[test]
    fn rewards_are_step_penalties_then_trick_payout() {
        let agents = vec![FirstLegal::new(0, 3), FirstLegal::new(1, 3)];
        let mut game = Spades::with_seed(agents, GameConfig::default(), 7).unwrap();
        let result = game
            .play_game_with_deck(&[PlayerId(0), PlayerId(1)], &Deck::shuffled_with_seed(7))
            .unwrap();

        for agent in game.agents() {
            assert_eq!(agent.rewards.len(), 26);
            assert!(agent.rewards[..25].iter().all(|r| *r == -1.0));
            let won = result.tricks_of(agent.id) as f64;
            assert_eq!(agent.rewards[25], 10.0 * won);
            assert_eq!(agent.games_seen, 1);
        }
    }

    #[test]
    fn winner_has_the_highest_score() {
        let agents = vec![FirstLegal::new(0, 5), FirstLegal::new(1, 2), FirstLegal::new(2, 0)];
        let mut game = Spades::with_seed(agents, GameConfig::default(), 3).unwrap();
        let result = game.play_next_game().unwrap();
        let best = result.final_scores.values().max().copied().unwrap();
        assert_eq!(result.score_of(result.winner), best);
        let first_best = result
            .seating
            .iter()
            .find(|id| result.score_of(**id) == best)
            .copied();
        assert_eq!(first_best, Some(result.winner));
    }

    #[test]
    fn simple_scoring_pays_every_trick() {
        let agents = vec![FirstLegal::new(0, 13), FirstLegal::new(1, 13)];
        let config = GameConfig {
            scoring: ScoringMode::Simple,
        };
        let mut game = Spades::with_seed(agents, config, 11).unwrap();
        let result = game.play_next_game().unwrap();
        for id in &result.seating {
            assert_eq!(result.score_of(*id), 10 * result.tricks_of(*id) as i32);
        }
    }

    #[test]
    fn batch_play_accumulates_scores_and_wins() {
        let agents = vec![FirstLegal::new(0, 4), FirstLegal::new(1, 6)];
        let mut game = Spades::with_seed(agents, GameConfig::default(), 21).unwrap();
        let summary: MatchSummary = game.play_x_games(5).unwrap();
        assert_eq!(summary.games, 5);
        assert_eq!(summary.wins_of(PlayerId(0)) + summary.wins_of(PlayerId(1)), 5);
        assert_eq!(game.games_played(), 5);
        assert!(game.agents().iter().all(|agent| agent.games_seen == 5));
    }

    #[test]
    fn same_seed_replays_the_same_games() {
        let run = |seed| {
            let agents = vec![FirstLegal::new(0, 4), FirstLegal::new(1, 6)];
            let mut game = Spades::with_seed(agents, GameConfig::default(), seed).unwrap();
            game.play_x_games(3).unwrap()
        };
        assert_eq!(run(99), run(99));
    }

    #[test]
    fn illegal_play_is_fatal() {
        let agents: Vec<Box<dyn Agent>> =
            vec![Box::new(Cheater(PlayerId(0))), Box::new(Cheater(PlayerId(1)))];
        let mut game = Spades::with_seed(agents, GameConfig::default(), 5).unwrap();
        let err = game.play_x_games(10).unwrap_err();
        assert!(matches!(err, EngineError::Round(_)));
    }

    #[test]
    fn seating_must_reference_known_agents() {
        let agents = vec![FirstLegal::new(0, 1), FirstLegal::new(1, 1)];
        let mut game = Spades::with_seed(agents, GameConfig::default(), 0).unwrap();
        let err = game
            .play_game_with_deck(&[PlayerId(0), PlayerId(5)], &Deck::standard())
            .unwrap_err();
        assert_eq!(err, EngineError::MissingAgent(PlayerId(5)));
    }
}
