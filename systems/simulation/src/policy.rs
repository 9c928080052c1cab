//! Per-agent decision makers.

use fire_evac_core::{AgentId, Decision, PlanningContext, Position};
use fire_evac_system_astar::PathPlanner;
use fire_evac_system_q_learning::TabularLearner;
use fire_evac_system_random_walk::RandomWalk;
use fire_evac_system_tree_search::TreeSearchPlanner;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::{PolicyKind, SimulationConfig};

/// Deterministic random stream for `agent` within a run seeded by `seed`.
///
/// Every agent reads its own ChaCha stream, so the draws of one agent never
/// depend on how many draws another agent made.
#[must_use]
pub fn agent_rng(seed: u64, agent: AgentId) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(u64::from(agent.get()));
    rng
}

/// Decision maker owned by a single agent.
#[derive(Clone, Debug)]
pub enum AgentPolicy {
    /// Uniform random walk.
    Random {
        /// Stateless walker.
        walker: RandomWalk,
        /// Agent-private random stream.
        rng: ChaCha8Rng,
    },
    /// Shortest path planner.
    AStar(PathPlanner),
    /// Monte Carlo tree search.
    Mcts {
        /// Planner with its optional retained subtree.
        planner: TreeSearchPlanner,
        /// Agent-private random stream.
        rng: ChaCha8Rng,
    },
    /// Greedy follower of a trained Q-table.
    QLearning(TabularLearner),
}

impl AgentPolicy {
    /// Builds the untrained policy selected by `config` for `agent`.
    #[must_use]
    pub fn new(config: &SimulationConfig, agent: AgentId) -> Self {
        match config.policy {
            PolicyKind::Random => Self::Random {
                walker: RandomWalk::new(),
                rng: agent_rng(config.seed, agent),
            },
            PolicyKind::AStar => Self::AStar(PathPlanner::new()),
            PolicyKind::Mcts => Self::Mcts {
                planner: TreeSearchPlanner::new(config.search),
                rng: agent_rng(config.seed, agent),
            },
            PolicyKind::QLearning => Self::QLearning(TabularLearner::new(config.learner)),
        }
    }

    /// Policy-selection token of this policy.
    #[must_use]
    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::Random { .. } => PolicyKind::Random,
            Self::AStar(_) => PolicyKind::AStar,
            Self::Mcts { .. } => PolicyKind::Mcts,
            Self::QLearning(_) => PolicyKind::QLearning,
        }
    }

    /// Chooses the next step for an agent standing on `agent`.
    pub fn decide(&mut self, agent: Position, context: &PlanningContext<'_>) -> Decision {
        match self {
            Self::Random { walker, rng } => walker.decide(agent, context, rng),
            Self::AStar(planner) => planner.plan_move(agent, context),
            Self::Mcts { planner, rng } => planner.decide(agent, context, rng),
            Self::QLearning(learner) => learner.decide(agent, context),
        }
    }
}
