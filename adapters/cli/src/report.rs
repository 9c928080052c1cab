//! Aggregated statistics over repeated runs.

use std::fmt;

use fire_evac_system_simulation::{Outcome, PolicyKind};
use serde::Serialize;

/// Averages over every repetition of an experiment.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct Summary {
    pub(crate) method: PolicyKind,
    pub(crate) runs: usize,
    pub(crate) agents: usize,
    /// Saved agents over all agents of all runs.
    pub(crate) average_saved: f64,
    pub(crate) average_ticks: f64,
    /// Mean objective per run.
    pub(crate) objective: f64,
    /// Mean objective per run and agent.
    pub(crate) average_objective: f64,
    pub(crate) stranded: usize,
    pub(crate) outcomes: Vec<Outcome>,
}

impl Summary {
    /// Aggregates `outcomes`, which must all come from the same map.
    #[must_use]
    pub(crate) fn new(method: PolicyKind, outcomes: Vec<Outcome>) -> Self {
        let runs = outcomes.len();
        let agents = outcomes.first().map_or(0, |outcome| outcome.initial_agents);
        let population = (agents * runs) as f64;

        let saved: usize = outcomes.iter().map(|outcome| outcome.safe).sum();
        let ticks: u64 = outcomes.iter().map(|outcome| outcome.ticks).sum();
        let objective: u64 = outcomes.iter().map(|outcome| outcome.objective).sum();
        let stranded: usize = outcomes.iter().map(|outcome| outcome.stranded).sum();

        Self {
            method,
            runs,
            agents,
            average_saved: ratio(saved as f64, population),
            average_ticks: ratio(ticks as f64, runs as f64),
            objective: ratio(objective as f64, runs as f64),
            average_objective: ratio(objective as f64, population),
            stranded,
            outcomes,
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Method: {}", self.method)?;
        writeln!(f, "Runs: {} with {} agents", self.runs, self.agents)?;
        writeln!(f, "Average Saved Agent: {:.2}", self.average_saved)?;
        writeln!(f, "Average Time: {:.2}", self.average_ticks)?;
        writeln!(f, "Objective function: {:.0}", self.objective)?;
        write!(f, "Average objective: {:.0}", self.average_objective)?;
        if self.stranded > 0 {
            write!(f, "\nStranded at tick cap: {}", self.stranded)?;
        }
        Ok(())
    }
}
