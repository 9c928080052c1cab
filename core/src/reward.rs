//! Reward shaping shared by the search and learning planners.
//!
//! The shaped term pulls agents toward the nearest safe zone and pushes them
//! away from the nearest hazard cell:
//! `(10 - distance_to_safety) + (distance_to_hazard - 5)`.
//! A missing safe zone or a hazard-free map contributes nothing for the
//! corresponding term.

use crate::{PlanningContext, Position};

/// Magnitude of the bonus granted for reaching a safe zone.
pub const SAFETY_BONUS: f64 = 100.0;
/// Magnitude of the penalty applied for entering a hazard cell.
pub const HAZARD_PENALTY: f64 = 100.0;

const SAFETY_BASELINE: f64 = 10.0;
const HAZARD_BASELINE: f64 = 5.0;

/// Reward observed for a single cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reward {
    /// Scalar reward value.
    pub value: f64,
    /// Whether the cell ends an episode (safe zone or hazard).
    pub terminal: bool,
}

/// Terminal classification of a cell for reward purposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellOutcome {
    /// The cell is a safe zone.
    Safe,
    /// The cell is hazardous.
    Hazard,
    /// The cell is neither.
    Open,
}

impl CellOutcome {
    /// Classifies `position`, letting a safe zone take precedence over hazard.
    #[must_use]
    pub fn classify(position: Position, context: &PlanningContext<'_>) -> Self {
        if context.safe_zones().contains(position) {
            Self::Safe
        } else if context.hazard().contains(position) {
            Self::Hazard
        } else {
            Self::Open
        }
    }

    /// Whether reaching the cell ends a rollout or an episode.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self != Self::Open
    }
}

/// Distance-based reward for standing on `position`.
#[must_use]
pub fn shaped_reward(position: Position, context: &PlanningContext<'_>) -> f64 {
    let safety = context
        .safe_zones()
        .nearest_distance(position)
        .map_or(0.0, |distance| SAFETY_BASELINE - f64::from(distance));
    let hazard = context
        .hazard()
        .nearest_distance(position)
        .map_or(0.0, |distance| f64::from(distance) - HAZARD_BASELINE);
    safety + hazard
}

/// Reward used by tree search rollouts.
///
/// Terminal cells add their bonus or penalty on top of the shaped term.
#[must_use]
pub fn search_reward(position: Position, context: &PlanningContext<'_>) -> Reward {
    let shaped = shaped_reward(position, context);
    let outcome = CellOutcome::classify(position, context);
    let value = match outcome {
        CellOutcome::Safe => shaped + SAFETY_BONUS,
        CellOutcome::Hazard => shaped - HAZARD_PENALTY,
        CellOutcome::Open => shaped,
    };
    Reward {
        value,
        terminal: outcome.is_terminal(),
    }
}

/// Reward used by temporal-difference learning.
///
/// Terminal cells replace the shaped term with a flat bonus or penalty.
#[must_use]
pub fn learning_reward(position: Position, context: &PlanningContext<'_>) -> Reward {
    let outcome = CellOutcome::classify(position, context);
    let value = match outcome {
        CellOutcome::Safe => SAFETY_BONUS,
        CellOutcome::Hazard => -HAZARD_PENALTY,
        CellOutcome::Open => shaped_reward(position, context),
    };
    Reward {
        value,
        terminal: outcome.is_terminal(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::{Grid, HazardView, SafeZones};

    fn fixture() -> (Grid, SafeZones, BTreeSet<Position>) {
        let grid = Grid::new(10, 10);
        let zones = SafeZones::new([Position::new(0, 0)]);
        let hazard: BTreeSet<_> = [Position::new(9, 9)].into_iter().collect();
        (grid, zones, hazard)
    }

    #[test]
    fn shaped_reward_combines_both_distances() {
        let (grid, zones, hazard) = fixture();
        let context = PlanningContext::new(&grid, &zones, HazardView::new(&hazard));

        // safety distance 4, hazard distance 14
        let reward = shaped_reward(Position::new(2, 2), &context);
        assert!((reward - (6.0 + 9.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn hazard_free_maps_only_reward_safety() {
        let (grid, zones, _) = fixture();
        let empty = BTreeSet::new();
        let context = PlanningContext::new(&grid, &zones, HazardView::new(&empty));

        let reward = shaped_reward(Position::new(0, 3), &context);
        assert!((reward - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn search_reward_adds_terminal_bonus() {
        let (grid, zones, hazard) = fixture();
        let context = PlanningContext::new(&grid, &zones, HazardView::new(&hazard));

        let safe = search_reward(Position::new(0, 0), &context);
        assert!(safe.terminal);
        assert!((safe.value - (10.0 + 13.0 + 100.0)).abs() < f64::EPSILON);

        let burned = search_reward(Position::new(9, 9), &context);
        assert!(burned.terminal);
        assert!((burned.value - (-8.0 - 5.0 - 100.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn learning_reward_uses_flat_terminals() {
        let (grid, zones, hazard) = fixture();
        let context = PlanningContext::new(&grid, &zones, HazardView::new(&hazard));

        assert_eq!(
            learning_reward(Position::new(0, 0), &context),
            Reward {
                value: SAFETY_BONUS,
                terminal: true
            }
        );
        assert_eq!(
            learning_reward(Position::new(9, 9), &context),
            Reward {
                value: -HAZARD_PENALTY,
                terminal: true
            }
        );
        assert!(!learning_reward(Position::new(5, 5), &context).terminal);
    }

    #[test]
    fn safety_wins_when_a_safe_zone_burns() {
        let grid = Grid::new(3, 3);
        let zones = SafeZones::new([Position::new(1, 1)]);
        let hazard: BTreeSet<_> = [Position::new(1, 1)].into_iter().collect();
        let context = PlanningContext::new(&grid, &zones, HazardView::new(&hazard));

        assert_eq!(
            CellOutcome::classify(Position::new(1, 1), &context),
            CellOutcome::Safe
        );
        assert_eq!(
            CellOutcome::classify(Position::new(0, 0), &context),
            CellOutcome::Open
        );
        assert!(!CellOutcome::Open.is_terminal());
    }
}
