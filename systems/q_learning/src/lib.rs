#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tabular Q-learning planner.
//!
//! Each agent trains its own table before the evacuation starts by replaying
//! episodes from its starting cell against a private copy of the hazard. At
//! run time it follows the table greedily.

mod table;

pub use table::QTable;

use std::time::{Duration, Instant};

use fire_evac_core::{
    reward::{learning_reward, CellOutcome},
    Decision, Direction, PlanningContext, Position,
};
use fire_evac_world::HazardField;
use rand::{seq::SliceRandom, Rng};

/// Tunable parameters of the learner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LearnerConfig {
    /// Number of training episodes.
    pub episodes: u32,
    /// Step cap of a single episode.
    pub max_steps_per_episode: u32,
    /// Step size `α` of the temporal-difference update.
    pub learning_rate: f64,
    /// Discount `γ` applied to the next state's value.
    pub discount_factor: f64,
    /// Probability `ε` of exploring instead of exploiting.
    pub epsilon: f64,
    /// Episode steps between two expansions of the hazard copy.
    pub hazard_interval: u32,
    /// Wall-clock budget for training; `None` trains every episode.
    pub deadline: Option<Duration>,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            episodes: 200,
            max_steps_per_episode: 100,
            learning_rate: 0.1,
            discount_factor: 0.9,
            epsilon: 0.2,
            hazard_interval: 2,
            deadline: None,
        }
    }
}

/// Summary of a training session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrainingReport {
    /// Episodes that ran to completion.
    pub episodes_run: u32,
    /// Episodes that ended on a safe zone.
    pub reached_safety: u32,
    /// Episodes that ended in the hazard.
    pub reached_hazard: u32,
}

/// Per-agent Q-learning planner.
#[derive(Clone, Debug)]
pub struct TabularLearner {
    config: LearnerConfig,
    table: QTable,
}

impl TabularLearner {
    /// Creates an untrained learner.
    #[must_use]
    pub fn new(config: LearnerConfig) -> Self {
        Self {
            config,
            table: QTable::new(),
        }
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    /// Learned action values.
    #[must_use]
    pub fn table(&self) -> &QTable {
        &self.table
    }

    /// Trains the table with episodes that start at `start`.
    ///
    /// `context` supplies the map and safe zones. Every episode evolves its
    /// own clone of `hazard`, so the caller's field is left untouched.
    pub fn learn<R: Rng + ?Sized>(
        &mut self,
        start: Position,
        context: &PlanningContext<'_>,
        hazard: &HazardField,
        rng: &mut R,
    ) -> TrainingReport {
        let started = Instant::now();
        let mut report = TrainingReport::default();

        for _ in 0..self.config.episodes {
            if let Some(deadline) = self.config.deadline {
                if started.elapsed() >= deadline {
                    tracing::debug!(
                        episodes = report.episodes_run,
                        ?deadline,
                        "training deadline reached"
                    );
                    break;
                }
            }

            match self.run_episode(start, context, hazard.clone(), rng) {
                CellOutcome::Safe => report.reached_safety += 1,
                CellOutcome::Hazard => report.reached_hazard += 1,
                CellOutcome::Open => {}
            }
            report.episodes_run += 1;
        }

        report
    }

    /// Greedy decision for an agent standing on `agent`.
    ///
    /// Holds when no move is legal.
    #[must_use]
    pub fn decide(&self, agent: Position, context: &PlanningContext<'_>) -> Decision {
        let moves: Vec<(Direction, Position)> = context.grid().passable_moves(agent).collect();
        match self.greedy(agent, &moves) {
            Some((_, next)) => Decision::Move(next),
            None => Decision::Hold,
        }
    }

    fn run_episode<R: Rng + ?Sized>(
        &mut self,
        start: Position,
        context: &PlanningContext<'_>,
        mut field: HazardField,
        rng: &mut R,
    ) -> CellOutcome {
        let grid = context.grid();
        let interval = self.config.hazard_interval.max(1);
        let mut state = start;

        for step in 0..self.config.max_steps_per_episode {
            let moves: Vec<(Direction, Position)> = grid.passable_moves(state).collect();
            let Some((direction, next)) = self.choose(state, &moves, rng) else {
                return CellOutcome::Open;
            };

            let snapshot = PlanningContext::new(grid, context.safe_zones(), field.view());
            let reward = learning_reward(next, &snapshot);
            let outcome = CellOutcome::classify(next, &snapshot);

            let future = grid
                .passable_moves(next)
                .map(|(action, _)| self.table.value(next, action))
                .fold(None, |best: Option<f64>, value| {
                    Some(best.map_or(value, |best| best.max(value)))
                })
                .unwrap_or(0.0);

            let learning_rate = self.config.learning_rate;
            let discount = self.config.discount_factor;
            let slot = &mut self.table.entry(state)[direction.index()];
            *slot += learning_rate * (reward.value + discount * future - *slot);

            state = next;
            if outcome.is_terminal() {
                return outcome;
            }

            if (step + 1) % interval == 0 {
                let _ = field.spread();
                if field.contains(state) {
                    return CellOutcome::Hazard;
                }
            }
        }

        CellOutcome::Open
    }

    fn choose<R: Rng + ?Sized>(
        &self,
        state: Position,
        moves: &[(Direction, Position)],
        rng: &mut R,
    ) -> Option<(Direction, Position)> {
        if rng.gen::<f64>() < self.config.epsilon {
            moves.choose(rng).copied()
        } else {
            self.greedy(state, moves)
        }
    }

    fn greedy(
        &self,
        state: Position,
        moves: &[(Direction, Position)],
    ) -> Option<(Direction, Position)> {
        let values = self.table.values(state);
        let mut best: Option<((Direction, Position), f64)> = None;

        for &candidate in moves {
            let value = values[candidate.0.index()];
            if best.map_or(true, |(_, top)| value > top) {
                best = Some((candidate, value));
            }
        }

        best.map(|(candidate, _)| candidate)
    }
}

impl Default for TabularLearner {
    fn default() -> Self {
        Self::new(LearnerConfig::default())
    }
}
