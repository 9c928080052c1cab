#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Monte Carlo tree search planner.
//!
//! Every decision runs a fixed budget of simulations. Each simulation selects
//! a path through the tree with UCT, expands one untried move, estimates the
//! new node with a random rollout and feeds the result back to the root. The
//! agent then takes the most visited move.

mod tree;

pub use tree::{NodeId, SearchTree};

use fire_evac_core::{
    reward::{search_reward, CellOutcome},
    Decision, Direction, PlanningContext, Position,
};
use rand::{seq::IteratorRandom, seq::SliceRandom, Rng};

const DEFAULT_SIMULATIONS: u32 = 100;
const DEFAULT_HORIZON: u32 = 7;
const DEFAULT_EXPLORATION_WEIGHT: f64 = 1.0;

/// Reward returned by a rollout that runs out of legal moves.
pub const STUCK_PENALTY: f64 = -10.0;

const VISIT_EPSILON: f64 = 1e-6;

/// Tunable parameters of the tree search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchConfig {
    /// Simulations run per decision.
    pub simulations: u32,
    /// Maximum number of random moves in a rollout.
    pub horizon: u32,
    /// Weight of the exploration term in UCT.
    pub exploration_weight: f64,
    /// Keep the chosen child's subtree for the next decision.
    pub reuse_subtree: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            simulations: DEFAULT_SIMULATIONS,
            horizon: DEFAULT_HORIZON,
            exploration_weight: DEFAULT_EXPLORATION_WEIGHT,
            reuse_subtree: false,
        }
    }
}

/// Per-agent tree search planner.
#[derive(Clone, Debug)]
pub struct TreeSearchPlanner {
    config: SearchConfig,
    retained: Option<SearchTree>,
}

impl TreeSearchPlanner {
    /// Creates a planner with the provided configuration.
    #[must_use]
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            retained: None,
        }
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Subtree kept from the previous decision, if any.
    #[must_use]
    pub fn retained(&self) -> Option<&SearchTree> {
        self.retained.as_ref()
    }

    /// Chooses the next step for an agent standing on `agent`.
    ///
    /// Holds when the agent has no legal move.
    pub fn decide<R: Rng + ?Sized>(
        &mut self,
        agent: Position,
        context: &PlanningContext<'_>,
        rng: &mut R,
    ) -> Decision {
        let tree = self.search(agent, context, rng);

        let Some(chosen) = most_visited_child(&tree, tree.root()) else {
            tracing::trace!(?agent, "tree search found no legal move");
            return Decision::Hold;
        };

        let next = tree.state(chosen);
        tracing::trace!(?agent, ?next, visits = tree.visits(chosen), "tree search decided");

        if self.config.reuse_subtree {
            self.retained = Some(tree.subtree(chosen));
        }
        Decision::Move(next)
    }

    /// Runs the simulation budget from `agent` and returns the resulting tree.
    ///
    /// A retained subtree whose root matches `agent` is grown further;
    /// anything else is discarded.
    pub fn search<R: Rng + ?Sized>(
        &mut self,
        agent: Position,
        context: &PlanningContext<'_>,
        rng: &mut R,
    ) -> SearchTree {
        let mut tree = match self.retained.take() {
            Some(tree) if tree.state(tree.root()) == agent => tree,
            _ => SearchTree::new(agent),
        };

        for _ in 0..self.config.simulations {
            let leaf = self.select(&tree, context);
            let node = expand(&mut tree, leaf, context, rng);
            let reward = rollout(tree.state(node), context, self.config.horizon, rng);
            tree.backpropagate(node, reward);
        }

        tree
    }

    fn select(&self, tree: &SearchTree, context: &PlanningContext<'_>) -> NodeId {
        let grid = context.grid();
        let mut node = tree.root();

        loop {
            let state = tree.state(node);
            if CellOutcome::classify(state, context).is_terminal() {
                return node;
            }

            let mut moves = grid.passable_moves(state).peekable();
            if moves.peek().is_none() {
                return node;
            }
            let fully_expanded = moves.all(|(direction, _)| tree.child(node, direction).is_some());
            if !fully_expanded {
                return node;
            }

            match self.best_child(tree, node) {
                Some(child) => node = child,
                None => return node,
            }
        }
    }

    fn best_child(&self, tree: &SearchTree, node: NodeId) -> Option<NodeId> {
        let parent_visits = f64::from(tree.visits(node));
        let mut best: Option<(NodeId, f64)> = None;

        for (_, child) in tree.children(node) {
            let visits = f64::from(tree.visits(child)) + VISIT_EPSILON;
            let score = tree.value(child) / visits
                + self.config.exploration_weight * ((parent_visits + 1.0).ln() / visits).sqrt();
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((child, score));
            }
        }

        best.map(|(child, _)| child)
    }
}

impl Default for TreeSearchPlanner {
    fn default() -> Self {
        Self::new(SearchConfig::default())
    }
}

/// Child of `node` with the most visits. Ties go to the first child in
/// [`Direction::ALL`] order; mean values are ignored.
fn most_visited_child(tree: &SearchTree, node: NodeId) -> Option<NodeId> {
    let mut best: Option<(NodeId, u32)> = None;
    for (_, child) in tree.children(node) {
        let visits = tree.visits(child);
        if best.map_or(true, |(_, most)| visits > most) {
            best = Some((child, visits));
        }
    }
    best.map(|(child, _)| child)
}

/// Adds one untried child below `node`, chosen uniformly at random.
///
/// Terminal and fully expanded nodes are returned unchanged.
fn expand<R: Rng + ?Sized>(
    tree: &mut SearchTree,
    node: NodeId,
    context: &PlanningContext<'_>,
    rng: &mut R,
) -> NodeId {
    let state = tree.state(node);
    if CellOutcome::classify(state, context).is_terminal() {
        return node;
    }

    let untried: Vec<(Direction, Position)> = context
        .grid()
        .passable_moves(state)
        .filter(|(direction, _)| tree.child(node, *direction).is_none())
        .collect();

    match untried.choose(rng) {
        Some(&(direction, next)) => tree.add_child(node, direction, next),
        None => node,
    }
}

/// Estimates `start` by walking randomly for up to `horizon` moves.
///
/// Reaching a terminal cell returns that cell's reward weighted by the number
/// of moves left, counting the current one.
fn rollout<R: Rng + ?Sized>(
    start: Position,
    context: &PlanningContext<'_>,
    horizon: u32,
    rng: &mut R,
) -> f64 {
    let opening = search_reward(start, context);
    if opening.terminal {
        return opening.value * f64::from(horizon);
    }

    let grid = context.grid();
    let mut position = start;
    let mut total = 0.0;

    for step in 0..horizon {
        let Some((_, next)) = grid.passable_moves(position).choose(rng) else {
            return STUCK_PENALTY;
        };
        position = next;

        let reward = search_reward(position, context);
        if reward.terminal {
            return reward.value * f64::from(horizon - step);
        }
        total += reward.value;
    }

    total
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use fire_evac_core::{Grid, HazardView, SafeZones};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn root_visits_match_the_budget() {
        let grid = Grid::new(4, 4);
        let zones = SafeZones::new([Position::new(3, 3)]);
        let hazard: BTreeSet<_> = [Position::new(0, 3)].into_iter().collect();
        let context = PlanningContext::new(&grid, &zones, HazardView::new(&hazard));
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut planner = TreeSearchPlanner::new(SearchConfig {
            simulations: 37,
            ..SearchConfig::default()
        });

        let tree = planner.search(Position::new(0, 0), &context, &mut rng);

        assert_eq!(tree.visits(tree.root()), 37);
        let child_visits: u32 = tree
            .children(tree.root())
            .map(|(_, child)| tree.visits(child))
            .sum();
        assert_eq!(child_visits, 37);
    }

    #[test]
    fn rollout_from_terminal_cell_is_weighted_by_the_horizon() {
        let grid = Grid::new(1, 3);
        let zones = SafeZones::new([Position::new(0, 2)]);
        let hazard = BTreeSet::new();
        let context = PlanningContext::new(&grid, &zones, HazardView::new(&hazard));
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let value = rollout(Position::new(0, 2), &context, 7, &mut rng);

        assert!((value - 110.0 * 7.0).abs() < 1e-9);
    }

    #[test]
    fn stuck_rollout_is_penalised() {
        let grid = Grid::new(1, 1);
        let zones = SafeZones::default();
        let hazard = BTreeSet::new();
        let context = PlanningContext::new(&grid, &zones, HazardView::new(&hazard));
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let value = rollout(Position::new(0, 0), &context, 7, &mut rng);

        assert!((value - STUCK_PENALTY).abs() < f64::EPSILON);
    }

    #[test]
    fn most_visited_child_beats_a_better_mean() {
        let mut tree = SearchTree::new(Position::new(1, 1));
        let root = tree.root();
        let steady = tree.add_child(root, Direction::South, Position::new(2, 1));
        let lucky = tree.add_child(root, Direction::North, Position::new(0, 1));
        for _ in 0..3 {
            tree.backpropagate(steady, 1.0);
        }
        tree.backpropagate(lucky, 100.0);

        assert_eq!(most_visited_child(&tree, root), Some(steady));
    }

    #[test]
    fn visit_ties_go_to_the_first_direction() {
        let mut tree = SearchTree::new(Position::new(1, 1));
        let root = tree.root();
        let east = tree.add_child(root, Direction::East, Position::new(1, 2));
        let west = tree.add_child(root, Direction::West, Position::new(1, 0));
        let south = tree.add_child(root, Direction::South, Position::new(2, 1));
        for child in [east, west, south] {
            tree.backpropagate(child, 1.0);
            tree.backpropagate(child, -1.0);
        }
        tree.backpropagate(east, 0.0);
        tree.backpropagate(south, 0.0);

        assert_eq!(most_visited_child(&tree, root), Some(south));
        assert_eq!(most_visited_child(&SearchTree::new(Position::new(0, 0)), root), None);
    }

    #[test]
    fn expansion_skips_walls() {
        let grid = Grid::new(3, 3)
            .with_wall(Position::new(0, 1))
            .with_wall(Position::new(1, 2));
        let zones = SafeZones::new([Position::new(2, 2)]);
        let hazard = BTreeSet::new();
        let context = PlanningContext::new(&grid, &zones, HazardView::new(&hazard));
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut tree = SearchTree::new(Position::new(1, 1));
        let root = tree.root();

        for _ in 0..4 {
            let _ = expand(&mut tree, root, &context, &mut rng);
        }

        let children: Vec<_> = tree
            .children(root)
            .map(|(direction, child)| (direction, tree.state(child)))
            .collect();
        assert_eq!(
            children,
            vec![
                (Direction::South, Position::new(2, 1)),
                (Direction::West, Position::new(1, 0)),
            ]
        );
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn boxed_in_agent_holds() {
        let grid = Grid::new(1, 1);
        let zones = SafeZones::default();
        let hazard = BTreeSet::new();
        let context = PlanningContext::new(&grid, &zones, HazardView::new(&hazard));
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let decision = TreeSearchPlanner::default().decide(Position::new(0, 0), &context, &mut rng);

        assert_eq!(decision, Decision::Hold);
    }
}
