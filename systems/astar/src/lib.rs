#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shortest-path evacuation planner.
//!
//! Agents avoid walls, burning cells and every cell next to the fire, then
//! follow an A* route toward the closest reachable safe zone.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, HashSet},
};

use fire_evac_core::{Decision, Grid, PlanningContext, Position};

/// Stateless A* planner.
#[derive(Clone, Copy, Debug, Default)]
pub struct PathPlanner;

impl PathPlanner {
    /// Creates a new planner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Chooses the next step for an agent standing on `agent`.
    ///
    /// Safe zones are tried nearest first. The first one with a route wins and
    /// the agent takes the route's first step. Without any route the agent
    /// holds.
    #[must_use]
    pub fn plan_move(&self, agent: Position, context: &PlanningContext<'_>) -> Decision {
        let blocked = blocked_cells(context);

        let mut goals: Vec<Position> = context.safe_zones().iter().collect();
        goals.sort_by_key(|goal| goal.manhattan_distance(agent));

        for goal in goals {
            if let Some(path) = find_path(context.grid(), agent, goal, &blocked) {
                return match path.get(1) {
                    Some(&next) => Decision::Move(next),
                    None => Decision::Hold,
                };
            }
        }

        tracing::trace!(?agent, "no route to any safe zone");
        Decision::Hold
    }
}

/// Cells an agent must not enter: walls, hazard cells and their in-bounds
/// orthogonal neighbours.
#[must_use]
pub fn blocked_cells(context: &PlanningContext<'_>) -> HashSet<Position> {
    let grid = context.grid();
    let mut blocked: HashSet<Position> = grid.walls().collect();

    for cell in context.hazard().iter() {
        let _ = blocked.insert(cell);
        blocked.extend(grid.neighbors(cell).map(|(_, neighbor)| neighbor));
    }

    blocked
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Frontier {
    f_score: u32,
    sequence: u64,
    position: Position,
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Finds a shortest four-neighbour path from `start` to `goal`.
///
/// The returned path includes both endpoints. Cells outside the grid or in
/// `blocked` are never entered; the start cell itself is not checked. Nodes
/// with equal `f = g + h` are expanded in insertion order.
#[tracing::instrument(level = "trace", skip(grid, blocked))]
pub fn find_path(
    grid: &Grid,
    start: Position,
    goal: Position,
    blocked: &HashSet<Position>,
) -> Option<Vec<Position>> {
    let mut open_set = BinaryHeap::new();
    let mut came_from: HashMap<Position, Position> = HashMap::new();
    let mut g_score: HashMap<Position, u32> = HashMap::new();
    let mut closed_set: HashSet<Position> = HashSet::new();
    let mut sequence = 0_u64;

    let _ = g_score.insert(start, 0);
    open_set.push(Frontier {
        f_score: start.manhattan_distance(goal),
        sequence,
        position: start,
    });

    while let Some(Frontier {
        position: current, ..
    }) = open_set.pop()
    {
        if current == goal {
            tracing::trace!(expanded = closed_set.len(), "path found");
            return Some(reconstruct_path(&came_from, current));
        }

        if !closed_set.insert(current) {
            continue;
        }

        let current_g = g_score.get(&current).copied().unwrap_or(u32::MAX);
        for (_, neighbor) in grid.neighbors(current) {
            if closed_set.contains(&neighbor) || blocked.contains(&neighbor) {
                continue;
            }

            let tentative_g = current_g.saturating_add(1);
            if tentative_g < g_score.get(&neighbor).copied().unwrap_or(u32::MAX) {
                let _ = came_from.insert(neighbor, current);
                let _ = g_score.insert(neighbor, tentative_g);
                sequence += 1;
                open_set.push(Frontier {
                    f_score: tentative_g + neighbor.manhattan_distance(goal),
                    sequence,
                    position: neighbor,
                });
            }
        }
    }

    tracing::trace!(expanded = closed_set.len(), "no path found");
    None
}

fn reconstruct_path(came_from: &HashMap<Position, Position>, mut current: Position) -> Vec<Position> {
    let mut path = vec![current];
    while let Some(&previous) = came_from.get(&current) {
        path.push(previous);
        current = previous;
    }
    path.reverse();
    path
}
