mod roster;
mod timing;

pub use roster::{AgentBlueprint, AgentError};
pub use timing::{DecisionMetrics, DecisionSummary, TimedAgent};

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use spades_core::game::agent::Agent;
use spades_core::game::engine::{EngineError, GameConfig, GameResult, Spades};
use spades_core::game::serialization::GameRecord;
use spades_core::model::player::PlayerId;
use thiserror::Error;
use tracing::{Level, event, info};

use crate::analytics::{AnalyticsCollector, AnalyticsError};
use crate::config::{AgentKind, BenchmarkConfig, ResolvedOutputs};

/// Plays the configured number of games with a persistent roster, so learning
/// agents improve from one game to the next.
pub struct TrainingRunner {
    config: BenchmarkConfig,
    outputs: ResolvedOutputs,
    roster: Vec<AgentBlueprint>,
    logging_enabled: bool,
}

/// Summary details returned after a run.
#[derive(Debug)]
pub struct RunSummary {
    pub games_played: usize,
    pub seed: u64,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub plot_path: Option<PathBuf>,
    pub trace_path: Option<PathBuf>,
    pub snapshot_paths: Vec<PathBuf>,
}

impl TrainingRunner {
    /// Build a runner from a validated configuration.
    pub fn new(config: BenchmarkConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let roster = AgentBlueprint::from_configs(&config.agents)?;
        for blueprint in &roster {
            if let Some(path) = blueprint.snapshot_path()
                && !path.exists()
            {
                return Err(RunnerError::MissingSnapshot {
                    agent: blueprint.name.clone(),
                    path: path.to_path_buf(),
                });
            }
        }

        Ok(Self {
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
            roster,
        })
    }

    pub fn roster(&self) -> &[AgentBlueprint] {
        &self.roster
    }

    /// Execute the run, streaming JSONL rows to disk.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;
        if !self.outputs.plots_dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.outputs.plots_dir)?;
        }

        let seed = self.config.games.seed.unwrap_or_else(rand::random);
        let agents = self
            .roster
            .iter()
            .map(|blueprint| {
                blueprint
                    .spawn(seed)
                    .map(|agent| TimedAgent::new(blueprint.name.clone(), agent))
            })
            .collect::<Result<Vec<_>, AgentError>>()?;
        let game_config = GameConfig {
            scoring: self.config.scoring,
        };
        let mut engine = Spades::with_seed(agents, game_config, seed)?;

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut trace = match self.outputs.trace_jsonl.as_ref() {
            Some(path) => {
                ensure_parent(path.parent())?;
                Some(BufWriter::new(File::create(path)?))
            }
            None => None,
        };
        let mut analytics = AnalyticsCollector::new(&self.config)?;
        let mut rows_written = 0usize;

        info!(
            target: "spades_bench::run",
            run_id = %self.config.run_id,
            seed,
            games = self.config.games.count,
            agents = self.roster.len(),
            "run started"
        );

        for game_index in 0..self.config.games.count {
            let phases: Vec<Option<Phase>> = engine
                .agents()
                .iter()
                .map(|agent| agent.inner().as_learning().map(|l| Phase::of(l.is_training())))
                .collect();
            let result = engine.play_next_game()?;
            let outcome = self.collect_outcome(game_index, &result, engine.agents_mut(), &phases);

            analytics.record_game(&outcome)?;
            rows_written += write_game_rows(&mut writer, &self.config.run_id, seed, &outcome)?;
            if let Some(trace) = trace.as_mut() {
                let record = GameRecord::capture(game_index as u64, &result);
                trace.write_all(record.to_json_line()?.as_bytes())?;
                trace.write_all(b"\n")?;
            }

            if self.logging_enabled && tracing::enabled!(Level::INFO) {
                let winner_name = outcome
                    .seat_results
                    .iter()
                    .find(|seat| seat.winner)
                    .map(|seat| seat.agent_name.as_str())
                    .unwrap_or_default();
                event!(
                    target: "spades_bench::game",
                    Level::INFO,
                    run_id = %self.config.run_id,
                    game_index = game_index as u64,
                    winner = winner_name,
                    tricks = result.tricks.len() as u32
                );
            }
        }

        writer.flush()?;
        if let Some(trace) = trace.as_mut() {
            trace.flush()?;
        }

        let snapshot_paths = self.save_snapshots(engine.agents())?;

        let summary = analytics.finalize()?;
        summary.write_markdown(&self.outputs.summary_md)?;
        let plot_path = match summary.render_plot(&self.outputs.plots_dir) {
            Ok(path) => Some(path),
            Err(err) => {
                eprintln!("WARN: {}", err);
                None
            }
        };

        Ok(RunSummary {
            games_played: self.config.games.count,
            seed,
            rows_written,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            plot_path,
            trace_path: self.outputs.trace_jsonl.clone(),
            snapshot_paths,
        })
    }

    fn collect_outcome(
        &self,
        game_index: usize,
        result: &GameResult,
        agents: &mut [TimedAgent],
        phases: &[Option<Phase>],
    ) -> GameOutcome {
        let seat_results = agents
            .iter_mut()
            .zip(phases)
            .map(|(agent, phase)| {
                let player = agent.id();
                SeatResult {
                    agent_name: agent.name().to_string(),
                    kind: self.kind_of(player),
                    player,
                    seat: result.seating.iter().position(|p| *p == player),
                    bet: result.bet_of(player),
                    tricks: result.tricks_of(player),
                    score: result.score_of(player),
                    winner: result.winner == player,
                    exact_bet: result.made_exact_bet(player),
                    busted: result.busted(player),
                    phase: *phase,
                    metrics: agent.take_metrics(),
                }
            })
            .collect();

        GameOutcome {
            game_index,
            seat_results,
        }
    }

    fn kind_of(&self, player: PlayerId) -> AgentKind {
        self.roster
            .iter()
            .find(|blueprint| blueprint.player == player)
            .map(AgentBlueprint::kind)
            .unwrap_or(AgentKind::Random)
    }

    fn save_snapshots(&self, agents: &[TimedAgent]) -> Result<Vec<PathBuf>, RunnerError> {
        let Some(dir) = self.outputs.snapshots_dir.as_ref() else {
            return Ok(Vec::new());
        };

        let mut paths = Vec::new();
        for agent in agents {
            let Some(learner) = agent.inner().as_learning() else {
                continue;
            };
            let path = dir.join(format!("{}.json", agent.name()));
            learner.snapshot().save(&path)?;
            info!(
                target: "spades_bench::run",
                agent = agent.name(),
                path = %path.display(),
                episodes = learner.stats().episodes,
                "snapshot saved"
            );
            paths.push(path);
        }
        Ok(paths)
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn write_game_rows(
    writer: &mut BufWriter<File>,
    run_id: &str,
    run_seed: u64,
    outcome: &GameOutcome,
) -> Result<usize, RunnerError> {
    let game_id = format!("G{:06}", outcome.game_index);

    let mut rows_written = 0usize;
    for seat in &outcome.seat_results {
        let row = GameLogRow {
            run_id,
            game_id: &game_id,
            game_index: outcome.game_index,
            run_seed,
            agent: &seat.agent_name,
            kind: seat.kind,
            player: seat.player,
            seat: seat.seat,
            phase: seat.phase,
            bet: seat.bet,
            tricks: seat.tricks,
            score: seat.score,
            winner: seat.winner,
            exact_bet: seat.exact_bet,
            busted: seat.busted,
            speed_ms_turn: seat.metrics.avg_ms_per_decision,
            decisions: seat.metrics.decisions,
        };

        serde_json::to_writer(&mut *writer, &row)?;
        writer.write_all(b"\n")?;
        rows_written += 1;
    }

    Ok(rows_written)
}

/// Whether a learning agent was still exploring when the game started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Training,
    Evaluation,
}

impl Phase {
    fn of(training: bool) -> Self {
        if training {
            Phase::Training
        } else {
            Phase::Evaluation
        }
    }
}

pub struct GameOutcome {
    pub game_index: usize,
    pub seat_results: Vec<SeatResult>,
}

pub struct SeatResult {
    pub agent_name: String,
    pub kind: AgentKind,
    pub player: PlayerId,
    /// Position in this game's shuffled seating.
    pub seat: Option<usize>,
    pub bet: u8,
    pub tricks: u32,
    pub score: i32,
    pub winner: bool,
    pub exact_bet: bool,
    pub busted: bool,
    pub phase: Option<Phase>,
    pub metrics: DecisionSummary,
}

#[derive(Serialize)]
struct GameLogRow<'a> {
    run_id: &'a str,
    game_id: &'a str,
    game_index: usize,
    run_seed: u64,
    agent: &'a str,
    kind: AgentKind,
    player: PlayerId,
    seat: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phase: Option<Phase>,
    bet: u8,
    tricks: u32,
    score: i32,
    winner: bool,
    exact_bet: bool,
    busted: bool,
    speed_ms_turn: f64,
    decisions: u32,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("{0}")]
    Agent(#[from] AgentError),
    #[error("snapshot for agent '{agent}' not found at {path:?}")]
    MissingSnapshot { agent: String, path: PathBuf },
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("game execution failed: {0}")]
    Game(#[from] EngineError),
    #[error("failed to save snapshot: {0}")]
    Snapshot(#[from] spades_bot::SnapshotError),
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
}
