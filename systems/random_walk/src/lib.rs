#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Baseline policy that wanders without looking at the fire.

use fire_evac_core::{Decision, PlanningContext, Position};
use rand::{seq::IteratorRandom, Rng};

/// Picks uniformly among the moves that do not run into a wall.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomWalk;

impl RandomWalk {
    /// Creates a new random walker.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Chooses a random passable neighbour, or holds when boxed in.
    pub fn decide<R: Rng + ?Sized>(
        &self,
        agent: Position,
        context: &PlanningContext<'_>,
        rng: &mut R,
    ) -> Decision {
        context
            .grid()
            .passable_moves(agent)
            .choose(rng)
            .map_or(Decision::Hold, |(_, next)| Decision::Move(next))
    }
}
