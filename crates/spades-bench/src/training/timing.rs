use std::time::{Duration, Instant};

use spades_bot::SeatAgent;
use spades_core::game::agent::{Agent, TableView, TrickFeedback};
use spades_core::game::engine::GameResult;
use spades_core::model::card::Card;
use spades_core::model::player::PlayerId;

/// Wraps a seated agent and clocks every bet and card decision.
pub struct TimedAgent {
    name: String,
    inner: SeatAgent,
    metrics: DecisionMetrics,
}

impl TimedAgent {
    pub fn new(name: impl Into<String>, inner: SeatAgent) -> Self {
        Self {
            name: name.into(),
            inner,
            metrics: DecisionMetrics::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inner(&self) -> &SeatAgent {
        &self.inner
    }

    /// Returns the timings gathered since the last call and starts over.
    pub fn take_metrics(&mut self) -> DecisionSummary {
        std::mem::take(&mut self.metrics).finalize()
    }
}

impl Agent for TimedAgent {
    fn id(&self) -> PlayerId {
        self.inner.id()
    }

    fn make_bet(&mut self, view: &TableView<'_>) -> u8 {
        let start = Instant::now();
        let bet = self.inner.make_bet(view);
        self.metrics.record(start.elapsed());
        bet
    }

    fn decide(&mut self, view: &TableView<'_>) -> Option<Card> {
        let start = Instant::now();
        let card = self.inner.decide(view);
        self.metrics.record(start.elapsed());
        card
    }

    fn observe_trick(&mut self, view: &TableView<'_>, feedback: &TrickFeedback) {
        self.inner.observe_trick(view, feedback);
    }

    fn observe_game_end(&mut self, result: &GameResult) {
        self.inner.observe_game_end(result);
    }
}

#[derive(Debug, Default)]
pub struct DecisionMetrics {
    total: Duration,
    decisions: u32,
}

impl DecisionMetrics {
    pub fn record(&mut self, duration: Duration) -> f64 {
        self.total += duration;
        self.decisions += 1;
        duration.as_secs_f64() * 1000.0
    }

    pub fn finalize(self) -> DecisionSummary {
        let avg_ms = if self.decisions == 0 {
            0.0
        } else {
            self.total.as_secs_f64() * 1000.0 / f64::from(self.decisions)
        };

        DecisionSummary {
            decisions: self.decisions,
            avg_ms_per_decision: avg_ms,
            total_ms: self.total.as_secs_f64() * 1000.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecisionSummary {
    pub decisions: u32,
    pub avg_ms_per_decision: f64,
    pub total_ms: f64,
}
