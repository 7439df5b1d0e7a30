pub mod random;

pub use random::{RandomAgent, sample_normal_bet};

use crate::learning::QLearningAgent;
use spades_core::game::agent::{Agent, TableView, TrickFeedback};
use spades_core::game::engine::GameResult;
use spades_core::model::card::Card;
use spades_core::model::player::PlayerId;

/// Any agent that can take a seat, so a mixed roster fits in one `Vec`.
pub enum SeatAgent {
    Random(RandomAgent),
    Learning(Box<QLearningAgent>),
}

impl SeatAgent {
    pub fn kind(&self) -> &'static str {
        match self {
            SeatAgent::Random(_) => "random",
            SeatAgent::Learning(_) => "q_learning",
        }
    }

    pub fn as_learning(&self) -> Option<&QLearningAgent> {
        match self {
            SeatAgent::Learning(agent) => Some(&**agent),
            SeatAgent::Random(_) => None,
        }
    }

    fn inner(&self) -> &dyn Agent {
        match self {
            SeatAgent::Random(agent) => agent as &dyn Agent,
            SeatAgent::Learning(agent) => &**agent,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Agent {
        match self {
            SeatAgent::Random(agent) => agent as &mut dyn Agent,
            SeatAgent::Learning(agent) => &mut **agent,
        }
    }
}

impl From<RandomAgent> for SeatAgent {
    fn from(agent: RandomAgent) -> Self {
        SeatAgent::Random(agent)
    }
}

impl From<QLearningAgent> for SeatAgent {
    fn from(agent: QLearningAgent) -> Self {
        SeatAgent::Learning(Box::new(agent))
    }
}

impl Agent for SeatAgent {
    fn id(&self) -> PlayerId {
        self.inner().id()
    }

    fn make_bet(&mut self, view: &TableView<'_>) -> u8 {
        self.inner_mut().make_bet(view)
    }

    fn decide(&mut self, view: &TableView<'_>) -> Option<Card> {
        self.inner_mut().decide(view)
    }

    fn observe_trick(&mut self, view: &TableView<'_>, feedback: &TrickFeedback) {
        self.inner_mut().observe_trick(view, feedback)
    }

    fn observe_game_end(&mut self, result: &GameResult) {
        self.inner_mut().observe_game_end(result)
    }
}
