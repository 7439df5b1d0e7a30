use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use crate::config::{AgentConfig, AgentKind, BenchmarkConfig};
use crate::training::{DecisionSummary, GameOutcome, Phase};

const CONFIDENCE_Z: f64 = 1.96; // 95% CI

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("baseline agent '{0}' not present in run results")]
    MissingBaseline(String),
    #[error("agent '{0}' defined in results but missing from configuration")]
    UnknownAgent(String),
    #[error("baseline '{0}' missing for game {1}")]
    MissingBaselineGame(String, usize),
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to render plot: {0}")]
    Plot(String),
}

pub struct AnalyticsCollector {
    baseline: String,
    agents: HashMap<String, AgentAccumulator>,
    comparisons: HashMap<String, ComparisonAccumulator>,
    agent_order: Vec<String>,
    latency_budget_ms: u64,
    curve_window: usize,
}

impl AnalyticsCollector {
    pub fn new(config: &BenchmarkConfig) -> Result<Self, AnalyticsError> {
        let baseline = config
            .metrics
            .baseline
            .clone()
            .ok_or_else(|| AnalyticsError::MissingBaseline("<unset>".into()))?;

        let mut agents = HashMap::new();
        let mut order = Vec::new();
        for agent in &config.agents {
            agents.insert(
                agent.name.clone(),
                AgentAccumulator::new(agent.clone(), config.metrics.latency_budget_ms),
            );
            order.push(agent.name.clone());
        }

        Ok(Self {
            baseline,
            agents,
            comparisons: HashMap::new(),
            agent_order: order,
            latency_budget_ms: config.metrics.latency_budget_ms,
            curve_window: config.metrics.curve_window,
        })
    }

    pub fn record_game(&mut self, outcome: &GameOutcome) -> Result<(), AnalyticsError> {
        let baseline_score = outcome
            .seat_results
            .iter()
            .find(|seat| seat.agent_name == self.baseline)
            .map(|seat| f64::from(seat.score))
            .ok_or_else(|| {
                AnalyticsError::MissingBaselineGame(self.baseline.clone(), outcome.game_index)
            })?;

        for seat in &outcome.seat_results {
            let acc = self
                .agents
                .get_mut(&seat.agent_name)
                .ok_or_else(|| AnalyticsError::UnknownAgent(seat.agent_name.clone()))?;

            acc.record_game(GameTally {
                score: f64::from(seat.score),
                winner: seat.winner,
                exact_bet: seat.exact_bet,
                busted: seat.busted,
                evaluation: seat.phase == Some(Phase::Evaluation),
                metrics: &seat.metrics,
            });
        }

        for seat in &outcome.seat_results {
            if seat.agent_name == self.baseline {
                continue;
            }
            let diff = f64::from(seat.score) - baseline_score;
            self.comparisons
                .entry(seat.agent_name.clone())
                .or_default()
                .record(diff);
        }

        Ok(())
    }

    pub fn finalize(mut self) -> Result<AnalyticsSummary, AnalyticsError> {
        let mut reports = Vec::new();
        for name in &self.agent_order {
            if let Some(acc) = self.agents.remove(name) {
                reports.push(acc.into_report(self.curve_window));
            }
        }

        if !reports.iter().any(|report| report.name == self.baseline) {
            return Err(AnalyticsError::MissingBaseline(self.baseline));
        }

        let mut comparisons = Vec::new();
        for report in &reports {
            if report.name == self.baseline {
                comparisons.push(ComparisonReport {
                    agent: report.name.clone(),
                    p_value: 1.0,
                    sample_size: report.games,
                });
                continue;
            }
            let (p_value, sample_size) = self
                .comparisons
                .remove(&report.name)
                .map(ComparisonAccumulator::wilcoxon_signed_rank)
                .unwrap_or((1.0, 0));
            comparisons.push(ComparisonReport {
                agent: report.name.clone(),
                p_value,
                sample_size,
            });
        }

        Ok(AnalyticsSummary {
            baseline: self.baseline,
            agents: reports,
            comparisons,
            latency_budget_ms: self.latency_budget_ms,
            curve_window: self.curve_window,
        }
        .enrich())
    }
}

struct GameTally<'a> {
    score: f64,
    winner: bool,
    exact_bet: bool,
    busted: bool,
    evaluation: bool,
    metrics: &'a DecisionSummary,
}

struct AgentAccumulator {
    config: AgentConfig,
    per_game_scores: Vec<f64>,
    evaluation_scores: Vec<f64>,
    wins: u32,
    exact_bets: u32,
    busts: u32,
    total_latency_ms: f64,
    total_decisions: u64,
    latency_budget_ms: u64,
}

impl AgentAccumulator {
    fn new(config: AgentConfig, latency_budget_ms: u64) -> Self {
        Self {
            config,
            per_game_scores: Vec::new(),
            evaluation_scores: Vec::new(),
            wins: 0,
            exact_bets: 0,
            busts: 0,
            total_latency_ms: 0.0,
            total_decisions: 0,
            latency_budget_ms,
        }
    }

    fn record_game(&mut self, tally: GameTally<'_>) {
        self.per_game_scores.push(tally.score);
        if tally.evaluation {
            self.evaluation_scores.push(tally.score);
        }
        self.wins += u32::from(tally.winner);
        self.exact_bets += u32::from(tally.exact_bet);
        self.busts += u32::from(tally.busted);
        self.total_latency_ms += tally.metrics.total_ms;
        self.total_decisions += u64::from(tally.metrics.decisions);
    }

    fn into_report(self, curve_window: usize) -> AgentReport {
        let games = self.per_game_scores.len();
        let avg_score = mean(&self.per_game_scores).unwrap_or(0.0);
        let ci95 = confidence_interval(&self.per_game_scores);

        let avg_latency = if self.total_decisions == 0 {
            0.0
        } else {
            self.total_latency_ms / self.total_decisions as f64
        };

        AgentReport {
            name: self.config.name.clone(),
            kind: self.config.kind,
            params: self.config.params.clone(),
            games,
            avg_score,
            ci95,
            wins: self.wins as usize,
            exact_bets: self.exact_bets as usize,
            busts: self.busts as usize,
            evaluation_games: self.evaluation_scores.len(),
            avg_evaluation_score: mean(&self.evaluation_scores),
            average_ms_per_decision: avg_latency,
            delta_vs_baseline: 0.0, // Filled later once we know baseline report
            over_budget: avg_latency > self.latency_budget_ms as f64,
            curve: rolling_mean(&self.per_game_scores, curve_window),
        }
    }
}

#[derive(Clone, Default)]
struct ComparisonAccumulator {
    diffs: Vec<f64>,
}

impl ComparisonAccumulator {
    fn record(&mut self, diff: f64) {
        self.diffs.push(diff);
    }

    /// Two-sided Wilcoxon signed-rank test (normal approximation with tie and
    /// continuity correction) on the paired score differences.
    fn wilcoxon_signed_rank(self) -> (f64, usize) {
        let diffs: Vec<f64> = self
            .diffs
            .into_iter()
            .filter(|d| d.abs() > f64::EPSILON)
            .collect();
        let n = diffs.len();
        if n == 0 {
            return (1.0, 0);
        }

        let mut paired: Vec<(f64, f64)> =
            diffs.into_iter().map(|d| (d.abs(), d.signum())).collect();
        paired.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut ranks = Vec::with_capacity(n);
        let mut tie_sizes = Vec::new();
        let mut i = 0;
        while i < paired.len() {
            let mut j = i;
            while j + 1 < paired.len() && (paired[j + 1].0 - paired[i].0).abs() < 1e-12 {
                j += 1;
            }
            let rank = (i + j + 2) as f64 / 2.0;
            for entry in &paired[i..=j] {
                ranks.push((rank, entry.1));
            }
            if j > i {
                tie_sizes.push(j - i + 1);
            }
            i = j + 1;
        }

        let w_plus: f64 = ranks
            .iter()
            .filter(|(_, sign)| *sign > 0.0)
            .map(|(rank, _)| *rank)
            .sum();
        let w_minus: f64 = ranks
            .iter()
            .filter(|(_, sign)| *sign < 0.0)
            .map(|(rank, _)| *rank)
            .sum();

        let w = w_plus.min(w_minus);
        let n_f = n as f64;
        let mean_w = n_f * (n_f + 1.0) / 4.0;

        let tie_adjustment: f64 = tie_sizes
            .into_iter()
            .map(|count| {
                let c = count as f64;
                (c.powi(3) - c) / 48.0
            })
            .sum();
        let variance_w = n_f * (n_f + 1.0) * (2.0 * n_f + 1.0) / 24.0 - tie_adjustment;
        if variance_w <= 0.0 {
            return (1.0, n);
        }

        let Ok(normal) = Normal::new(0.0, 1.0) else {
            return (1.0, n);
        };
        let z = (((w - mean_w).abs() - 0.5) / variance_w.sqrt()).max(0.0);
        let p = 2.0 * (1.0 - normal.cdf(z));
        (p.clamp(0.0, 1.0), n)
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyticsSummary {
    pub baseline: String,
    pub agents: Vec<AgentReport>,
    pub comparisons: Vec<ComparisonReport>,
    pub latency_budget_ms: u64,
    pub curve_window: usize,
}

impl AnalyticsSummary {
    pub fn enrich(mut self) -> Self {
        let baseline_avg = self
            .agents
            .iter()
            .find(|agent| agent.name == self.baseline)
            .map(|agent| agent.avg_score)
            .unwrap_or(0.0);

        for agent in &mut self.agents {
            agent.delta_vs_baseline = agent.avg_score - baseline_avg;
        }

        self
    }

    pub fn p_value_of(&self, agent: &str) -> f64 {
        self.comparisons
            .iter()
            .find(|c| c.agent == agent)
            .map(|c| c.p_value)
            .unwrap_or(1.0)
    }

    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        let mut rows = String::new();
        rows.push_str("# Training Summary\n\n");
        rows.push_str(&format!(
            "Baseline: {} | Latency budget: {} ms average per decision | Curve window: {} games\n\n",
            self.baseline, self.latency_budget_ms, self.curve_window
        ));
        rows.push_str("| Agent | Kind | Games | Avg score | Δ vs baseline | 95% CI | Win % | Exact bet % | Bust % | Eval avg | Avg ms/decision | Over Budget | p-value |\n");
        rows.push_str("|-------|------|-------|-----------|---------------|--------|-------|-------------|--------|----------|-----------------|-------------|---------|\n");

        for agent in &self.agents {
            let rate = |count: usize| {
                if agent.games == 0 {
                    0.0
                } else {
                    count as f64 / agent.games as f64 * 100.0
                }
            };
            let eval = agent
                .avg_evaluation_score
                .map(|score| format!("{score:.2}"))
                .unwrap_or_else(|| "-".to_string());

            rows.push_str(&format!(
                "| {name} | {kind} | {games} | {avg:.2} | {delta:+.2} | [{ci_low:.2}, {ci_high:.2}] | {win:.1}% | {exact:.1}% | {bust:.1}% | {eval} | {latency:.3} | {over_budget} | {pval:.3} |\n",
                name = agent.name,
                kind = agent.kind.as_str(),
                games = agent.games,
                avg = agent.avg_score,
                delta = agent.delta_vs_baseline,
                ci_low = agent.ci95.0,
                ci_high = agent.ci95.1,
                win = rate(agent.wins),
                exact = rate(agent.exact_bets),
                bust = rate(agent.busts),
                latency = agent.average_ms_per_decision,
                over_budget = if agent.over_budget { "Yes" } else { "No" },
                pval = self.p_value_of(&agent.name),
            ));
        }

        rows.push_str("\nLearning curve lines follow the table order:\n\n");
        for (idx, agent) in self.agents.iter().enumerate() {
            let (r, g, b) = Palette99::COLORS[idx % Palette99::COLORS.len()];
            rows.push_str(&format!(
                "- {} `#{r:02x}{g:02x}{b:02x}`\n",
                agent.name
            ));
        }

        fs::write(path.as_ref(), rows).map_err(|e| AnalyticsError::Io {
            context: "writing summary markdown",
            source: e,
        })?;
        Ok(())
    }

    /// Draws the rolling-average score of every agent against the game index.
    pub fn render_plot(&self, dir: impl AsRef<Path>) -> Result<PathBuf, AnalyticsError> {
        let dir = dir.as_ref();
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).map_err(|e| AnalyticsError::Io {
                context: "creating plots directory",
                source: e,
            })?;
        }

        let output_path = dir.join("learning_curve.png");
        let curves: Vec<Vec<f64>> = self.agents.iter().map(|a| a.curve.clone()).collect();

        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));

        let plot_attempt = std::panic::catch_unwind(move || {
            let root = BitMapBackend::new(&output_path, (800, 480)).into_drawing_area();
            root.fill(&WHITE)
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            let games = curves.iter().map(Vec::len).max().unwrap_or(0).max(1);
            let y_min = curves
                .iter()
                .flatten()
                .copied()
                .fold(0.0f64, f64::min);
            let y_max = curves
                .iter()
                .flatten()
                .copied()
                .fold(0.0f64, f64::max);
            let margin = ((y_max - y_min).abs() * 0.1).max(1.0);

            let mut chart = ChartBuilder::on(&root)
                .margin(20)
                .build_cartesian_2d(0..games, (y_min - margin)..(y_max + margin))
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            chart
                .draw_series(LineSeries::new(
                    [(0, 0.0), (games, 0.0)],
                    BLACK.mix(0.3).stroke_width(1),
                ))
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            for (idx, curve) in curves.iter().enumerate() {
                chart
                    .draw_series(LineSeries::new(
                        curve.iter().copied().enumerate(),
                        Palette99::pick(idx).stroke_width(2),
                    ))
                    .map_err(|e| AnalyticsError::Plot(e.to_string()))?;
            }

            drop(chart);

            root.present()
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            drop(root);

            Ok(output_path)
        });

        std::panic::set_hook(prev_hook);

        match plot_attempt {
            Ok(result) => result,
            Err(_) => Err(AnalyticsError::Plot(
                "plotters panicked while rendering the learning curve".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentReport {
    pub name: String,
    pub kind: AgentKind,
    pub params: serde_yaml::Value,
    pub games: usize,
    pub avg_score: f64,
    pub ci95: (f64, f64),
    pub wins: usize,
    pub exact_bets: usize,
    pub busts: usize,
    pub evaluation_games: usize,
    pub avg_evaluation_score: Option<f64>,
    pub average_ms_per_decision: f64,
    #[serde(skip)]
    pub delta_vs_baseline: f64,
    #[serde(skip)]
    pub over_budget: bool,
    #[serde(skip)]
    pub curve: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub agent: String,
    pub p_value: f64,
    pub sample_size: usize,
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn confidence_interval(points: &[f64]) -> (f64, f64) {
    let Some(mean) = mean(points) else {
        return (0.0, 0.0);
    };
    if points.len() == 1 {
        return (mean, mean);
    }
    let variance = points
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (points.len() as f64 - 1.0);
    let std_error = (variance / points.len() as f64).sqrt();
    let margin = CONFIDENCE_Z * std_error;
    (mean - margin, mean + margin)
}

/// Trailing mean over at most `window` games ending at each index.
fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut sum = 0.0;
    values
        .iter()
        .enumerate()
        .map(|(idx, value)| {
            sum += value;
            if idx >= window {
                sum -= values[idx - window];
            }
            sum / (idx + 1).min(window) as f64
        })
        .collect()
}
