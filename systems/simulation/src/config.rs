//! Run configuration and its validation.

use std::{fmt, str::FromStr};

use fire_evac_system_q_learning::LearnerConfig;
use fire_evac_system_tree_search::SearchConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tick cap applied unless a run asks for another one.
pub const DEFAULT_MAX_TICKS: u64 = 1000;

/// Selects the policy every agent of a run follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// Uniform random walk that ignores the hazard.
    Random,
    /// Shortest path around the hazard's surroundings.
    AStar,
    /// Monte Carlo tree search.
    Mcts,
    /// Tabular Q-learning trained before the run.
    QLearning,
}

impl PolicyKind {
    /// Every policy in presentation order.
    pub const ALL: [PolicyKind; 4] = [
        PolicyKind::Random,
        PolicyKind::AStar,
        PolicyKind::Mcts,
        PolicyKind::QLearning,
    ];

    /// Human readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Random => "Random",
            Self::AStar => "AStar",
            Self::Mcts => "MCTS",
            Self::QLearning => "Qlearning",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error raised when a policy name is not recognised.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown policy {0:?}; expected one of random, astar, mcts, qlearning")]
pub struct UnknownPolicy(pub String);

impl FromStr for PolicyKind {
    type Err = UnknownPolicy;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "astar" | "a*" => Ok(Self::AStar),
            "mcts" => Ok(Self::Mcts),
            "qlearning" | "q-learning" => Ok(Self::QLearning),
            _ => Err(UnknownPolicy(value.to_owned())),
        }
    }
}

/// Configuration errors detected before a run starts.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigError {
    /// The hazard would never expand.
    #[error("hazard interval must be at least one tick")]
    ZeroHazardInterval,
    /// Tree search without simulations cannot rank moves.
    #[error("tree search needs at least one simulation per decision")]
    ZeroSimulations,
    /// Rollouts of length zero carry no information.
    #[error("tree search horizon must be at least one step")]
    ZeroHorizon,
    /// Q-learning without episodes leaves the table empty.
    #[error("q-learning needs at least one training episode")]
    ZeroEpisodes,
    /// A learning parameter lies outside `[0, 1]`.
    #[error("{name} must lie in [0, 1], got {value}")]
    OutOfUnitRange {
        /// Name of the offending parameter.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },
}

/// Everything needed to set up a run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationConfig {
    /// Policy followed by every agent.
    pub policy: PolicyKind,
    /// Ticks between two hazard expansions, shared by the world and training.
    pub hazard_interval: u32,
    /// Tree search parameters, used by [`PolicyKind::Mcts`].
    pub search: SearchConfig,
    /// Learner parameters, used by [`PolicyKind::QLearning`].
    pub learner: LearnerConfig,
    /// Cap on the number of ticks; agents alive at the cap are stranded.
    /// `None` lifts the cap, which only terminates on maps with fire.
    pub max_ticks: Option<u64>,
    /// Seed from which every agent's random stream is derived.
    pub seed: u64,
}

impl SimulationConfig {
    /// Default configuration for `policy`.
    #[must_use]
    pub fn new(policy: PolicyKind) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Checks the parameters the selected policy depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hazard_interval == 0 {
            return Err(ConfigError::ZeroHazardInterval);
        }

        match self.policy {
            PolicyKind::Random | PolicyKind::AStar => Ok(()),
            PolicyKind::Mcts => {
                if self.search.simulations == 0 {
                    Err(ConfigError::ZeroSimulations)
                } else if self.search.horizon == 0 {
                    Err(ConfigError::ZeroHorizon)
                } else {
                    Ok(())
                }
            }
            PolicyKind::QLearning => {
                if self.learner.episodes == 0 {
                    return Err(ConfigError::ZeroEpisodes);
                }
                unit_range("learning rate", self.learner.learning_rate)?;
                unit_range("discount factor", self.learner.discount_factor)?;
                unit_range("epsilon", self.learner.epsilon)
            }
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::Random,
            hazard_interval: 2,
            search: SearchConfig::default(),
            learner: LearnerConfig::default(),
            max_ticks: Some(DEFAULT_MAX_TICKS),
            seed: 0,
        }
    }
}

fn unit_range(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfUnitRange { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_names_parse_case_insensitively() {
        for kind in PolicyKind::ALL {
            assert_eq!(kind.name().parse::<PolicyKind>(), Ok(kind));
        }
        assert_eq!("ASTAR".parse::<PolicyKind>(), Ok(PolicyKind::AStar));
        assert!("greedy".parse::<PolicyKind>().is_err());
    }

    #[test]
    fn defaults_are_valid_for_every_policy() {
        for kind in PolicyKind::ALL {
            assert_eq!(SimulationConfig::new(kind).validate(), Ok(()));
        }
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let mut config = SimulationConfig::new(PolicyKind::Mcts);
        config.search.simulations = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroSimulations));

        let mut config = SimulationConfig::new(PolicyKind::QLearning);
        config.learner.epsilon = 1.5;
        assert_eq!(
            config.validate(),
            Err(ConfigError::OutOfUnitRange {
                name: "epsilon",
                value: 1.5,
            })
        );

        let mut config = SimulationConfig::new(PolicyKind::Random);
        config.hazard_interval = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroHazardInterval));

        // Planner settings of other policies are not checked.
        config.hazard_interval = 1;
        config.search.horizon = 0;
        assert_eq!(config.validate(), Ok(()));
    }
}
