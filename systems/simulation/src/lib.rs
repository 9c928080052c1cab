#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Turn-based evacuation loop.
//!
//! A [`Simulation`] owns the authoritative world and one [`AgentPolicy`] per
//! agent. Every tick it asks each active agent for a decision against the same
//! start-of-tick snapshot, applies all of them, then closes the tick so the
//! hazard can spread. Q-learning agents are trained in parallel before the
//! first tick.

mod config;
mod policy;

pub use config::{ConfigError, PolicyKind, SimulationConfig, UnknownPolicy, DEFAULT_MAX_TICKS};
pub use policy::{agent_rng, AgentPolicy};

use std::collections::{BTreeMap, BTreeSet};

use fire_evac_core::{AgentId, Command, Decision, Event, MapError, MapLayout};
use fire_evac_system_q_learning::{TabularLearner, TrainingReport};
use fire_evac_world::{self as world, query, World, WorldConfig};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

/// Errors raised while setting up a run.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SimulationError {
    /// The map could not be parsed.
    #[error(transparent)]
    Map(#[from] MapError),
    /// The configuration is inconsistent.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Lifecycle of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// Agents are still evacuating and the tick cap is not reached.
    Running,
    /// Every agent left the map or the tick cap was reached.
    Ended,
}

/// What happened during a single tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TickReport {
    /// Number of completed ticks after this one.
    pub tick: u64,
    /// Events emitted by the world, in application order.
    pub events: Vec<Event>,
    /// Status after the tick.
    pub status: RunStatus,
}

/// Final accounting of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Outcome {
    /// Ticks played.
    pub ticks: u64,
    /// Agents present at the start.
    pub initial_agents: usize,
    /// Agents that reached a safe zone.
    pub safe: usize,
    /// Agents overtaken by the hazard.
    pub dead: usize,
    /// Agents still evacuating when the tick cap was reached.
    pub stranded: usize,
    /// Sum of the distances traveled by saved agents.
    pub objective: u64,
}

impl Outcome {
    /// Share of the initial agents that reached safety.
    #[must_use]
    pub fn safe_fraction(&self) -> f64 {
        if self.initial_agents == 0 {
            return 0.0;
        }
        self.safe as f64 / self.initial_agents as f64
    }
}

/// A single evacuation run.
#[derive(Debug)]
pub struct Simulation {
    world: World,
    policies: BTreeMap<AgentId, AgentPolicy>,
    config: SimulationConfig,
    status: RunStatus,
    training: Vec<(AgentId, TrainingReport)>,
}

impl Simulation {
    /// Parses `rows` and prepares a run on the resulting map.
    pub fn from_map<I, S>(rows: I, config: SimulationConfig) -> Result<Self, SimulationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let layout = MapLayout::parse(rows)?;
        Self::new(&layout, config)
    }

    /// Validates `config`, builds the world and the agents' policies.
    ///
    /// Q-learning agents are trained here, one rayon task per agent, each on
    /// private clones of the starting hazard.
    pub fn new(layout: &MapLayout, config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;

        let world = World::new(
            layout,
            WorldConfig {
                hazard_interval: config.hazard_interval,
            },
        );

        let (policies, training) = match config.policy {
            PolicyKind::QLearning => train_learners(&world, &config),
            _ => {
                let policies = query::agents(&world)
                    .into_iter()
                    .map(|agent| (agent.id, AgentPolicy::new(&config, agent.id)))
                    .collect();
                (policies, Vec::new())
            }
        };

        let status = if config.max_ticks == Some(0) {
            RunStatus::Ended
        } else {
            RunStatus::Running
        };

        Ok(Self {
            world,
            policies,
            config,
            status,
            training,
        })
    }

    /// Authoritative world state.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Configuration of the run.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Current lifecycle status.
    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Training summaries of Q-learning agents, ordered by agent.
    #[must_use]
    pub fn training_reports(&self) -> &[(AgentId, TrainingReport)] {
        &self.training
    }

    /// Plays one tick. Does nothing once the run has ended.
    pub fn step(&mut self) -> TickReport {
        if self.status == RunStatus::Ended {
            return TickReport {
                tick: query::tick(&self.world),
                events: Vec::new(),
                status: self.status,
            };
        }

        let decisions: Vec<(AgentId, Decision)> = {
            let context = query::planning_context(&self.world);
            let policies = &mut self.policies;
            query::agents(&self.world)
                .into_iter()
                .filter_map(|agent| {
                    let policy = policies.get_mut(&agent.id)?;
                    Some((agent.id, policy.decide(agent.position, &context)))
                })
                .collect()
        };

        let mut events = Vec::new();
        for (agent, decision) in decisions {
            world::apply(
                &mut self.world,
                Command::MoveAgent { agent, decision },
                &mut events,
            );
        }
        world::apply(&mut self.world, Command::Tick, &mut events);

        let departed: BTreeSet<AgentId> = events
            .iter()
            .filter_map(|event| match event {
                Event::AgentCaught { agent, .. } | Event::AgentEvacuated { agent, .. } => {
                    Some(*agent)
                }
                _ => None,
            })
            .collect();
        self.policies.retain(|agent, _| !departed.contains(agent));

        let tick = query::tick(&self.world);
        let capped = self.config.max_ticks.map_or(false, |cap| tick >= cap);
        if query::is_finished(&self.world) || capped {
            self.status = RunStatus::Ended;
        }

        let tally = query::tally(&self.world);
        tracing::debug!(
            tick,
            alive = tally.alive,
            safe = tally.safe,
            dead = tally.dead,
            "tick complete"
        );

        TickReport {
            tick,
            events,
            status: self.status,
        }
    }

    /// Plays until the run ends and returns its outcome.
    pub fn run(&mut self) -> Outcome {
        self.run_with(|_, _| {})
    }

    /// Plays until the run ends, calling `observer` after every tick.
    pub fn run_with<F>(&mut self, mut observer: F) -> Outcome
    where
        F: FnMut(&World, &TickReport),
    {
        while self.status == RunStatus::Running {
            let report = self.step();
            observer(&self.world, &report);
        }
        self.outcome()
    }

    /// Accounting of the run so far.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        let tally = query::tally(&self.world);
        Outcome {
            ticks: query::tick(&self.world),
            initial_agents: tally.initial,
            safe: tally.safe,
            dead: tally.dead,
            stranded: tally.alive,
            objective: tally.objective,
        }
    }
}

type TrainedPolicies = (
    BTreeMap<AgentId, AgentPolicy>,
    Vec<(AgentId, TrainingReport)>,
);

fn train_learners(world: &World, config: &SimulationConfig) -> TrainedPolicies {
    let context = query::planning_context(world);
    let hazard = query::hazard_field(world);
    let learner_config = fire_evac_system_q_learning::LearnerConfig {
        hazard_interval: config.hazard_interval,
        ..config.learner
    };

    let mut learners: Vec<_> = query::agents(world)
        .into_iter()
        .map(|agent| (agent, TabularLearner::new(learner_config), None))
        .collect();

    learners
        .par_iter_mut()
        .for_each(|(agent, learner, report)| {
            tracing::info!(
                agent = agent.id.get(),
                episodes = learner_config.episodes,
                "training started"
            );
            let mut rng = agent_rng(config.seed, agent.id);
            let summary = learner.learn(agent.position, &context, hazard, &mut rng);
            tracing::info!(
                agent = agent.id.get(),
                episodes = summary.episodes_run,
                reached_safety = summary.reached_safety,
                reached_hazard = summary.reached_hazard,
                "training finished"
            );
            *report = Some(summary);
        });

    let mut policies = BTreeMap::new();
    let mut reports = Vec::new();
    for (agent, learner, report) in learners {
        let _ = policies.insert(agent.id, AgentPolicy::QLearning(learner));
        if let Some(report) = report {
            reports.push((agent.id, report));
        }
    }
    (policies, reports)
}
