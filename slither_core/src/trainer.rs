use log::{Level, debug, info, log_enabled};
use rand::{SeedableRng, rngs::StdRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    Direction,
    agent::{EpisodeReport, QAgent, play_episode},
    board::{Board, Outcome},
    config::{ConfigError, TrainConfig},
    error::Result,
    qtable::{QTable, Transition},
    state::State,
};

pub const COLLISION_REWARD: f64 = -100.0;
pub const RED_REWARD: f64 = -30.0;
pub const GREEN_REWARD: f64 = 50.0;
pub const PROGRESS_REWARD: f64 = 5.0;
pub const IDLE_REWARD: f64 = -0.1;

const PROGRESS_EVERY: usize = 100;
const BEST_EVERY: usize = 1_000;

/// Shaped reward for the transition `before -> after` that produced `outcome`.
///
/// A plain move pays off only when the nearest visible green got strictly closer;
/// having no green in sight counts as infinitely far.
pub fn reward(outcome: Outcome, before: &State, after: &State) -> f64 {
    match outcome {
        Outcome::Collision => COLLISION_REWARD,
        Outcome::AteRed | Outcome::ShrunkToDeath => RED_REWARD,
        Outcome::Grew => GREEN_REWARD,
        Outcome::Moved => {
            let now = after.nearest_green_distance;
            let was = before.nearest_green_distance;
            if now > 0 && (was == 0 || now < was) {
                PROGRESS_REWARD
            } else {
                IDLE_REWARD
            }
        }
    }
}

/// What a finished training run reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub episodes: usize,
    /// Longest end-of-episode snake seen while training.
    pub best_length: usize,
    /// Final snake length of each greedy evaluation episode.
    pub evaluation_lengths: Vec<usize>,
    pub states_visited: usize,
    pub final_epsilon: f64,
}

impl TrainingSummary {
    pub fn mean_evaluation_length(&self) -> f64 {
        if self.evaluation_lengths.is_empty() {
            return 0.0;
        }
        let total: usize = self.evaluation_lengths.iter().sum();
        total as f64 / self.evaluation_lengths.len() as f64
    }
}

/// Owns one board and one agent for the lifetime of a training run.
pub struct Trainer {
    config: TrainConfig,
    board: Board,
    agent: QAgent,
    episodes_run: usize,
    best_length: usize,
}

impl Trainer {
    /// Starts from an empty table.
    pub fn new(config: TrainConfig) -> Result<Self> {
        Self::with_table(config, QTable::new())
    }

    /// Continues training an existing table.
    pub fn with_table(config: TrainConfig, table: QTable) -> Result<Self> {
        config.validate()?;
        let seed = config.resolve_seed();
        debug!("Trainer seed {seed}");

        let mut master = StdRng::seed_from_u64(seed);
        let board = Board::new(config.grid_size, StdRng::from_rng(&mut master))?;
        let agent = QAgent::new(
            table,
            config.alpha,
            config.gamma,
            config.epsilon_start,
            StdRng::from_rng(&mut master),
        );

        Ok(Self {
            config,
            board,
            agent,
            episodes_run: 0,
            best_length: 0,
        })
    }

    pub fn agent(&self) -> &QAgent {
        &self.agent
    }

    pub fn into_agent(self) -> QAgent {
        self.agent
    }

    /// Resets the board and plays one learning episode.
    pub fn run_episode(&mut self) -> Result<EpisodeReport> {
        self.board.reset(self.config.grid_size)?;
        let emit_trace = log_enabled!(Level::Trace);

        let mut state = State::from_vision(&self.board.vision());
        let mut steps = 0;
        let mut last_outcome = None;
        while steps < self.config.max_steps && !self.board.is_terminal() {
            let key = state.key();
            let action = self.agent.select_index(key);
            self.board.turn(Direction::CLOCKWISE[action]);
            let outcome = self.board.step(emit_trace);
            let next = State::from_vision(&self.board.vision());

            self.agent.learn(&Transition {
                state: key,
                action,
                reward: reward(outcome, &state, &next),
                next_state: next.key(),
                done: outcome.is_terminal(),
            });

            state = next;
            steps += 1;
            last_outcome = Some(outcome);
        }

        self.episodes_run += 1;
        self.best_length = self.best_length.max(self.board.snake_len());
        Ok(EpisodeReport {
            length: self.board.snake_len(),
            steps,
            last_outcome,
            terminal: self.board.is_terminal(),
        })
    }

    /// Runs the configured number of episodes, decaying epsilon after each.
    pub fn train(&mut self) -> Result<()> {
        let episodes = self.config.episodes;
        for episode in 0..episodes {
            if episode % PROGRESS_EVERY == 0 {
                info!("Episode {episode} / {episodes}");
            }

            let report = self.run_episode()?;
            debug!(
                "Episode {episode}: length {}, {} steps, {:?}, epsilon {:.4}",
                report.length,
                report.steps,
                report.last_outcome,
                self.agent.epsilon()
            );

            if episode % BEST_EVERY == 0 {
                info!("  Best snake length so far: {}", self.best_length);
            }
            self.agent
                .decay_epsilon(self.config.epsilon_decay, self.config.epsilon_end);
        }
        Ok(())
    }

    /// Plays `runs` greedy episodes without learning and returns their final lengths.
    ///
    /// Epsilon is restored afterwards.
    pub fn evaluate(&mut self, runs: usize) -> Result<Vec<usize>> {
        let epsilon = self.agent.epsilon();
        self.agent.set_epsilon(0.0);

        let mut lengths = Vec::with_capacity(runs);
        for run in 0..runs {
            self.board.reset(self.config.grid_size)?;
            let report = play_episode(
                &mut self.board,
                &mut self.agent,
                self.config.max_steps,
                log_enabled!(Level::Trace),
            );
            info!(
                "Evaluation run {}: length {} after {} steps",
                run + 1,
                report.length,
                report.steps
            );
            lengths.push(report.length);
        }

        self.agent.set_epsilon(epsilon);
        Ok(lengths)
    }

    pub fn summary(&self, evaluation_lengths: Vec<usize>) -> TrainingSummary {
        TrainingSummary {
            episodes: self.episodes_run,
            best_length: self.best_length,
            evaluation_lengths,
            states_visited: self.agent.table().len(),
            final_epsilon: self.agent.epsilon(),
        }
    }
}

/// Trains a fresh table with `config`, then evaluates it greedily.
pub fn train(config: &TrainConfig) -> Result<(QTable, TrainingSummary)> {
    let mut trainer = Trainer::new(config.clone())?;
    trainer.train()?;
    let lengths = trainer.evaluate(config.eval_runs)?;
    let summary = trainer.summary(lengths);
    info!(
        "Training done: best length {}, {} states, evaluation {:?}",
        summary.best_length, summary.states_visited, summary.evaluation_lengths
    );
    Ok((trainer.into_agent().into_table(), summary))
}

/// One of several independent runs started by [`train_independent`].
#[derive(Debug, Clone)]
pub struct RunResult {
    pub seed: u64,
    pub summary: TrainingSummary,
    pub table: QTable,
}

/// Trains `runs` independent boards and tables in parallel, run `i` seeded with
/// `seed + i`. Results are ordered best first by mean evaluation length, then by
/// best training length.
pub fn train_independent(config: &TrainConfig, runs: usize) -> Result<Vec<RunResult>> {
    if runs == 0 {
        return Err(ConfigError::Invalid {
            field: "runs",
            reason: "must be positive".to_string(),
        }
        .into());
    }
    config.validate()?;
    let base = config.resolve_seed();
    info!("Training {runs} independent runs from seed {base}");

    let mut results = (0..runs as u64)
        .into_par_iter()
        .map(|i| -> Result<RunResult> {
            let seed = base.wrapping_add(i);
            let run_config = TrainConfig {
                seed: Some(seed),
                ..config.clone()
            };
            let (table, summary) = train(&run_config)?;
            Ok(RunResult {
                seed,
                summary,
                table,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    results.sort_by(|a, b| {
        b.summary
            .mean_evaluation_length()
            .total_cmp(&a.summary.mean_evaluation_length())
            .then(b.summary.best_length.cmp(&a.summary.best_length))
    });
    Ok(results)
}
