//! Epsilon-greedy tabular Q-learning over the symbolic action space.

use crate::learning::actions::{SymbolicAction, vocabulary};
use crate::learning::betting::BetLearner;
use crate::learning::snapshot::AgentSnapshot;
use crate::learning::state::StateKey;
use crate::learning::table::{ValueEntry, ValueTable};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use spades_core::game::agent::{Agent, TableView, TrickFeedback};
use spades_core::game::engine::GameResult;
use spades_core::model::card::Card;
use spades_core::model::player::PlayerId;
use thiserror::Error;
use tracing::{info, trace};

pub type PlayTable = ValueTable<StateKey, SymbolicAction>;
pub type PlayEntry = ValueEntry<StateKey, SymbolicAction>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QLearningParams {
    pub alpha: f64,
    pub discount: f64,
    pub epsilon: f64,
    /// Games after which exploration stops.
    pub training_games: Option<u64>,
    pub fixed_bet: u8,
    pub learn_bets: bool,
    pub seed: Option<u64>,
}

impl Default for QLearningParams {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            discount: 1.0,
            epsilon: 0.5,
            training_games: None,
            fixed_bet: 13,
            learn_bets: false,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamsError {
    #[error("{name} must be within [0, 1], got {value}")]
    OutOfRange { name: &'static str, value: f64 },
}

impl QLearningParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        for (name, value) in [
            ("alpha", self.alpha),
            ("discount", self.discount),
            ("epsilon", self.epsilon),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ParamsError::OutOfRange { name, value });
            }
        }
        Ok(())
    }
}

/// Episode bookkeeping, split at the end of training.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeStats {
    pub episodes: u64,
    pub training_reward: f64,
    pub evaluation_reward: f64,
}

pub struct QLearningAgent {
    id: PlayerId,
    params: QLearningParams,
    epsilon: f64,
    table: PlayTable,
    bets: BetLearner,
    rng: StdRng,
    pending: Option<(StateKey, SymbolicAction)>,
    episode_reward: f64,
    stats: EpisodeStats,
}

impl QLearningAgent {
    pub fn new(id: PlayerId, params: QLearningParams) -> Result<Self, ParamsError> {
        params.validate()?;
        let seed = params.seed.unwrap_or_else(rand::random);
        let mut agent = Self {
            id,
            epsilon: params.epsilon,
            params,
            table: PlayTable::new(),
            bets: BetLearner::new(),
            rng: StdRng::seed_from_u64(seed),
            pending: None,
            episode_reward: 0.0,
            stats: EpisodeStats::default(),
        };
        agent.anneal();
        Ok(agent)
    }

    /// Rebuilds an agent from a snapshot; learning resumes where it stopped.
    pub fn restore(snapshot: AgentSnapshot) -> Result<Self, ParamsError> {
        let mut agent = Self::new(snapshot.player, snapshot.params)?;
        if !(0.0..=1.0).contains(&snapshot.epsilon) {
            return Err(ParamsError::OutOfRange {
                name: "epsilon",
                value: snapshot.epsilon,
            });
        }
        agent.epsilon = snapshot.epsilon;
        agent.stats = snapshot.stats;
        agent.table = PlayTable::from_entries(snapshot.play_values);
        agent.bets = BetLearner::from_entries(snapshot.bet_values);
        agent.anneal();
        Ok(agent)
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            player: self.id,
            params: self.params.clone(),
            epsilon: self.epsilon,
            stats: self.stats.clone(),
            play_values: self.table.entries(),
            bet_values: self.bets.entries(),
        }
    }

    pub fn params(&self) -> &QLearningParams {
        &self.params
    }

    /// Current exploration rate; zero once training is over.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn table(&self) -> &PlayTable {
        &self.table
    }

    pub fn stats(&self) -> &EpisodeStats {
        &self.stats
    }

    pub fn is_training(&self) -> bool {
        self.params
            .training_games
            .is_none_or(|limit| self.stats.episodes < limit)
    }

    pub fn q_value(&self, state: &StateKey, action: SymbolicAction) -> f64 {
        self.table.value(state, action)
    }

    pub fn legal_actions(&self, view: &TableView<'_>) -> Vec<SymbolicAction> {
        vocabulary(view.hand(), view.lead_card())
    }

    /// Epsilon-greedy pick; greedy ties are broken uniformly at random.
    pub fn choose_action(&mut self, view: &TableView<'_>) -> Option<SymbolicAction> {
        let actions = self.legal_actions(view);
        if actions.is_empty() {
            return None;
        }
        if self.rng.gen_bool(self.epsilon) {
            return actions.choose(&mut self.rng).copied();
        }
        let state = StateKey::from_view(view);
        self.table
            .best_actions(&state, &actions)
            .choose(&mut self.rng)
            .copied()
    }

    /// One temporal-difference step for `(state, action)` given the reward
    /// and the view after the transition.
    pub fn update(
        &mut self,
        state: StateKey,
        action: SymbolicAction,
        next: &TableView<'_>,
        reward: f64,
    ) -> f64 {
        let next_state = StateKey::from_view(next);
        let next_actions = self.legal_actions(next);
        let next_max = self.table.max_value(&next_state, &next_actions);
        let updated = self.table.update(
            state,
            action,
            reward,
            next_max,
            self.params.alpha,
            self.params.discount,
        );
        trace!(
            target: "spades_bot::learning",
            player = %self.id,
            state = %state,
            action = %action,
            reward,
            value = updated,
            "value updated"
        );
        updated
    }

    fn anneal(&mut self) {
        if self.epsilon > 0.0 && !self.is_training() {
            self.epsilon = 0.0;
            info!(
                target: "spades_bot::learning",
                player = %self.id,
                episodes = self.stats.episodes,
                "training finished, exploration disabled"
            );
        }
    }
}

impl Agent for QLearningAgent {
    fn id(&self) -> PlayerId {
        self.id
    }

    fn make_bet(&mut self, view: &TableView<'_>) -> u8 {
        if self.params.learn_bets {
            return self.bets.choose(
                view.hand(),
                view.deck_size(),
                view.num_players(),
                self.epsilon,
                &mut self.rng,
            );
        }
        let held = u8::try_from(view.cards_dealt()).unwrap_or(u8::MAX);
        self.params.fixed_bet.min(held)
    }

    fn decide(&mut self, view: &TableView<'_>) -> Option<Card> {
        let legal = view.legal_moves();
        let Some(action) = self.choose_action(view) else {
            return legal.first().copied();
        };
        let card = action
            .resolve(view.hand(), view.lead_card(), &legal)
            .filter(|card| legal.contains(card))
            .or_else(|| legal.first().copied());
        self.pending = Some((StateKey::from_view(view), action));
        trace!(
            target: "spades_bot::learning",
            player = %self.id,
            action = %action,
            card = ?card,
            "action chosen"
        );
        card
    }

    fn observe_trick(&mut self, view: &TableView<'_>, feedback: &TrickFeedback) {
        self.episode_reward += feedback.reward;
        if let Some((state, action)) = self.pending.take() {
            self.update(state, action, view, feedback.reward);
        }
    }

    fn observe_game_end(&mut self, result: &GameResult) {
        if self.params.learn_bets {
            self.bets.learn(result.score_of(self.id), self.params.alpha);
        }
        if self.is_training() {
            self.stats.training_reward += self.episode_reward;
        } else {
            self.stats.evaluation_reward += self.episode_reward;
        }
        self.stats.episodes += 1;
        self.episode_reward = 0.0;
        self.pending = None;
        self.anneal();
    }
}

#[cfg(test)]
mod tests {
    use super::{ParamsError, QLearningAgent, QLearningParams};
    use crate::learning::actions::SymbolicAction;
    use crate::learning::state::{BoardToken, StateKey};
    use spades_core::game::agent::{Agent, TableView};
    use spades_core::game::engine::{GameConfig, Spades};
    use spades_core::model::card::Card;
    use spades_core::model::hand::Hand;
    use spades_core::model::player::PlayerId;
    use spades_core::model::round::RoundState;
    use std::collections::HashMap;

    fn hand(tokens: &[&str]) -> Hand {
        tokens.iter().map(|t| t.parse::<Card>().unwrap()).collect()
    }

    fn params(alpha: f64, epsilon: f64) -> QLearningParams {
        QLearningParams {
            alpha,
            epsilon,
            seed: Some(42),
            ..QLearningParams::default()
        }
    }

    fn opening_round() -> RoundState {
        let players = [PlayerId(0), PlayerId(1)];
        let hands = vec![hand(&["2H", "KD", "9C"]), hand(&["3H", "4D", "5C"])];
        let mut round = RoundState::from_hands(&players, hands).unwrap();
        round.place_bet(PlayerId(0), 1).unwrap();
        round.place_bet(PlayerId(1), 1).unwrap();
        round
    }

    #[test]
    fn params_out_of_range_are_rejected() {
        let err = QLearningAgent::new(PlayerId(0), params(1.5, 0.1)).err();
        assert_eq!(
            err,
            Some(ParamsError::OutOfRange {
                name: "alpha",
                value: 1.5
            })
        );
    }

    #[test]
    fn greedy_choice_takes_the_best_action() {
        let round = opening_round();
        let view = TableView::for_player(&round, PlayerId(0)).unwrap();
        let mut agent = QLearningAgent::new(PlayerId(0), params(0.5, 0.0)).unwrap();
        let state = StateKey::from_view(&view);
        assert_eq!(state.board, BoardToken::Empty);
        agent.table.set(state, SymbolicAction::HighestNonSpade, 3.0);

        for _ in 0..20 {
            assert_eq!(
                agent.choose_action(&view),
                Some(SymbolicAction::HighestNonSpade)
            );
        }
        assert_eq!(agent.decide(&view), Some("KD".parse().unwrap()));
    }

    #[test]
    fn full_exploration_is_close_to_uniform() {
        let round = opening_round();
        let view = TableView::for_player(&round, PlayerId(0)).unwrap();
        let mut agent = QLearningAgent::new(PlayerId(0), params(0.5, 1.0)).unwrap();
        let state = StateKey::from_view(&view);
        agent.table.set(state, SymbolicAction::HighestNonSpade, 100.0);

        let mut counts: HashMap<SymbolicAction, u32> = HashMap::new();
        for _ in 0..2000 {
            let action = agent.choose_action(&view).unwrap();
            *counts.entry(action).or_insert(0) += 1;
        }
        let high = counts[&SymbolicAction::HighestNonSpade];
        let low = counts[&SymbolicAction::LowestNonSpade];
        assert_eq!(high + low, 2000);
        assert!((850..=1150).contains(&high), "split {high}/{low}");
    }

    #[test]
    fn zero_alpha_leaves_the_table_unchanged() {
        let mut agent = QLearningAgent::new(PlayerId(0), params(0.0, 0.5)).unwrap();
        let round = opening_round();
        let view = TableView::for_player(&round, PlayerId(0)).unwrap();
        let state = StateKey::from_view(&view);
        agent.table.set(state, SymbolicAction::LowestNonSpade, -4.0);

        for reward in [-1.0, -1.0, 30.0] {
            agent.update(state, SymbolicAction::LowestNonSpade, &view, reward);
            agent.update(state, SymbolicAction::HighestNonSpade, &view, reward);
        }
        assert_eq!(agent.q_value(&state, SymbolicAction::LowestNonSpade), -4.0);
        assert_eq!(agent.q_value(&state, SymbolicAction::HighestNonSpade), 0.0);
    }

    #[test]
    fn fixed_bet_is_capped_by_hand_size() {
        let round = opening_round();
        let view = TableView::for_player(&round, PlayerId(0)).unwrap();
        let mut agent = QLearningAgent::new(PlayerId(0), params(0.5, 0.5)).unwrap();
        assert_eq!(agent.make_bet(&view), 3);
    }

    #[test]
    fn exploration_stops_after_training_games() {
        let learner = QLearningAgent::new(
            PlayerId(0),
            QLearningParams {
                training_games: Some(3),
                ..params(0.5, 0.5)
            },
        )
        .unwrap();
        let opponent = QLearningAgent::new(PlayerId(1), params(0.5, 0.5)).unwrap();
        let mut game =
            Spades::with_seed(vec![learner, opponent], GameConfig::default(), 4).unwrap();

        game.play_x_games(2).unwrap();
        assert!(game.agents()[0].is_training());
        assert_eq!(game.agents()[0].epsilon(), 0.5);

        game.play_x_games(2).unwrap();
        let learner = &game.agents()[0];
        assert!(!learner.is_training());
        assert_eq!(learner.epsilon(), 0.0);
        assert_eq!(learner.stats().episodes, 4);
        assert!(!learner.table().is_empty());
    }

    #[test]
    fn snapshot_restores_values_and_progress() {
        let agent = QLearningAgent::new(PlayerId(2), params(0.5, 0.5)).unwrap();
        let mut game = Spades::with_seed(
            vec![
                agent,
                QLearningAgent::new(PlayerId(3), params(0.5, 0.5)).unwrap(),
            ],
            GameConfig::default(),
            10,
        )
        .unwrap();
        game.play_x_games(3).unwrap();
        let trained = &game.agents()[0];
        let snapshot = trained.snapshot();

        let restored = QLearningAgent::restore(snapshot.clone()).unwrap();
        assert_eq!(restored.stats(), trained.stats());
        assert_eq!(restored.table().len(), trained.table().len());
        assert_eq!(restored.snapshot(), snapshot);
    }
}
