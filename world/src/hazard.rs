//! Ring-by-ring hazard propagation.

use std::collections::BTreeSet;

use fire_evac_core::{Direction, Grid, HazardView, Position};

/// Set of hazardous cells that grows by one breadth-first ring per expansion.
///
/// The field remembers every cell it has ever marked in `seen`, so a cell is
/// never added twice and each expansion only inspects the current frontier's
/// unseen neighbours. Walls do not stop the spread; agents can never stand on
/// a wall, so burning walls only matters to planners that avoid the hazard's
/// surroundings. Cloning the field gives training episodes a private copy that
/// evolves independently of the live simulation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HazardField {
    rows: u32,
    columns: u32,
    cells: BTreeSet<Position>,
    seen: BTreeSet<Position>,
}

/// Result of a single hazard expansion over an agent roster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expansion<T> {
    /// Agents that are not standing on a hazardous cell after the expansion.
    pub survivors: Vec<T>,
    /// Agents overtaken by the hazard, in roster order.
    pub caught: Vec<T>,
    /// Cells that became hazardous, in ascending order.
    pub new_cells: Vec<Position>,
}

impl<T> Expansion<T> {
    /// Number of agents removed by the expansion.
    #[must_use]
    pub fn deaths(&self) -> usize {
        self.caught.len()
    }
}

impl HazardField {
    /// Creates a field bounded by `grid` and ignited at the in-bounds `seeds`.
    #[must_use]
    pub fn new(grid: &Grid, seeds: impl IntoIterator<Item = Position>) -> Self {
        let cells: BTreeSet<Position> = seeds
            .into_iter()
            .filter(|seed| grid.contains(*seed))
            .collect();
        Self {
            rows: grid.rows(),
            columns: grid.columns(),
            seen: cells.clone(),
            cells,
        }
    }

    /// Read-only view used by planners.
    #[must_use]
    pub fn view(&self) -> HazardView<'_> {
        HazardView::new(&self.cells)
    }

    /// Hazardous cells in ascending order.
    #[must_use]
    pub fn cells(&self) -> &BTreeSet<Position> {
        &self.cells
    }

    /// Reports whether `position` is hazardous.
    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        self.cells.contains(&position)
    }

    /// Number of hazardous cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether no cell is hazardous.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Grows the hazard by one ring and returns the newly hazardous cells.
    pub fn spread(&mut self) -> Vec<Position> {
        let mut frontier = BTreeSet::new();

        for cell in &self.cells {
            for direction in Direction::ALL {
                let Some(neighbor) = cell.step(direction) else {
                    continue;
                };
                if neighbor.row() >= self.rows || neighbor.column() >= self.columns {
                    continue;
                }
                if self.seen.insert(neighbor) {
                    let _ = frontier.insert(neighbor);
                }
            }
        }

        self.cells.extend(frontier.iter().copied());
        frontier.into_iter().collect()
    }

    /// Grows the hazard by one ring and removes the agents it overtakes.
    ///
    /// `position_of` extracts an agent's cell; the roster order is preserved
    /// in both partitions.
    pub fn expand<T, F>(&mut self, roster: Vec<T>, position_of: F) -> Expansion<T>
    where
        F: Fn(&T) -> Position,
    {
        let new_cells = self.spread();
        let (caught, survivors): (Vec<T>, Vec<T>) = roster
            .into_iter()
            .partition(|agent| self.cells.contains(&position_of(agent)));

        Expansion {
            survivors,
            caught,
            new_cells,
        }
    }
}
