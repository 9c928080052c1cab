#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the fire evacuation engine.
//!
//! This crate defines the value types and message surface that connect the
//! authoritative world, the planning systems and the adapters. The simulation
//! loop gathers a [`Decision`] from every agent policy, submits them to the
//! world as [`Command`] values and observes the resulting [`Event`] stream.
//! Policies never mutate the world: they read a [`PlanningContext`] captured
//! at the start of the tick and answer with a decision.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub mod layout;
pub mod reward;

pub use layout::{MapError, MapLayout};

/// Location of a single grid cell expressed as row and column indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    row: u32,
    column: u32,
}

impl Position {
    /// Creates a new grid position.
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Computes the Manhattan distance between two positions.
    #[must_use]
    pub fn manhattan_distance(self, other: Position) -> u32 {
        self.row.abs_diff(other.row) + self.column.abs_diff(other.column)
    }

    /// Position reached by taking one step in `direction`.
    ///
    /// Returns `None` when the step would leave the non-negative quadrant.
    /// Upper bounds are the grid's concern.
    #[must_use]
    pub fn step(self, direction: Direction) -> Option<Position> {
        match direction {
            Direction::North => Some(Self::new(self.row.checked_sub(1)?, self.column)),
            Direction::South => Some(Self::new(self.row.checked_add(1)?, self.column)),
            Direction::West => Some(Self::new(self.row, self.column.checked_sub(1)?)),
            Direction::East => Some(Self::new(self.row, self.column.checked_add(1)?)),
        }
    }

    /// Reports whether `other` is exactly one orthogonal step away.
    #[must_use]
    pub fn is_adjacent(self, other: Position) -> bool {
        self.manhattan_distance(other) == 1
    }
}

/// Cardinal movement directions available to agents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
    /// Movement toward increasing column indices.
    East,
}

impl Direction {
    /// Every direction in canonical order.
    ///
    /// All "first encountered" tie-breaks across the planners follow this order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// Number of distinct directions.
    pub const COUNT: usize = Self::ALL.len();

    /// Dense index of the direction inside [`Direction::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::North => 0,
            Self::South => 1,
            Self::West => 2,
            Self::East => 3,
        }
    }

    /// Direction that leads from `from` to the orthogonally adjacent `to`.
    #[must_use]
    pub fn between(from: Position, to: Position) -> Option<Direction> {
        if !from.is_adjacent(to) {
            return None;
        }

        if to.row() < from.row() {
            Some(Self::North)
        } else if to.row() > from.row() {
            Some(Self::South)
        } else if to.column() < from.column() {
            Some(Self::West)
        } else {
            Some(Self::East)
        }
    }
}

/// Static classification of a grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    /// Impassable cell.
    Wall,
    /// Traversable cell.
    Free,
}

/// Immutable rectangular map of walls and free cells.
///
/// Every query treats out-of-bounds positions as impassable so planners never
/// have to special-case the map border.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    rows: u32,
    columns: u32,
    cells: Vec<CellKind>,
}

impl Grid {
    /// Creates a grid of the provided dimensions with every cell free.
    #[must_use]
    pub fn new(rows: u32, columns: u32) -> Self {
        let capacity_u64 = u64::from(rows) * u64::from(columns);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            rows,
            columns,
            cells: vec![CellKind::Free; capacity],
        }
    }

    /// Returns the grid with a wall placed at `position`.
    ///
    /// Positions outside the grid are ignored.
    #[must_use]
    pub fn with_wall(mut self, position: Position) -> Self {
        if let Some(index) = self.index(position) {
            self.cells[index] = CellKind::Wall;
        }
        self
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Reports whether the position lies inside the grid.
    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        position.row() < self.rows && position.column() < self.columns
    }

    /// Kind of the cell at `position`, if it lies inside the grid.
    #[must_use]
    pub fn kind(&self, position: Position) -> Option<CellKind> {
        self.index(position)
            .and_then(|index| self.cells.get(index).copied())
    }

    /// Reports whether an agent may stand on `position`.
    #[must_use]
    pub fn is_passable(&self, position: Position) -> bool {
        self.kind(position) == Some(CellKind::Free)
    }

    /// In-bounds orthogonal neighbours of `position` in [`Direction::ALL`] order.
    pub fn neighbors(&self, position: Position) -> impl Iterator<Item = (Direction, Position)> + '_ {
        Direction::ALL.into_iter().filter_map(move |direction| {
            position
                .step(direction)
                .filter(|next| self.contains(*next))
                .map(|next| (direction, next))
        })
    }

    /// Moves available from `position`: neighbours that are in bounds and not walls.
    pub fn passable_moves(
        &self,
        position: Position,
    ) -> impl Iterator<Item = (Direction, Position)> + '_ {
        self.neighbors(position)
            .filter(move |(_, next)| self.is_passable(*next))
    }

    /// Iterator over every wall cell in row-major order.
    pub fn walls(&self) -> impl Iterator<Item = Position> + '_ {
        let columns = self.columns;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, kind)| **kind == CellKind::Wall)
            .filter_map(move |(index, _)| {
                let index = u32::try_from(index).ok()?;
                Some(Position::new(index / columns, index % columns))
            })
    }

    fn index(&self, position: Position) -> Option<usize> {
        if !self.contains(position) {
            return None;
        }
        let row = usize::try_from(position.row()).ok()?;
        let column = usize::try_from(position.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }
}

/// Fixed set of designated safe cells.
///
/// The zones keep the order in which they were declared so tie-breaks that
/// depend on iteration order stay stable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SafeZones {
    ordered: Vec<Position>,
    lookup: BTreeSet<Position>,
}

impl SafeZones {
    /// Creates a safe zone set, dropping duplicate positions.
    #[must_use]
    pub fn new(positions: impl IntoIterator<Item = Position>) -> Self {
        let mut zones = Self::default();
        for position in positions {
            if zones.lookup.insert(position) {
                zones.ordered.push(position);
            }
        }
        zones
    }

    /// Reports whether `position` is a safe zone.
    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        self.lookup.contains(&position)
    }

    /// Safe zones in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Position> + '_ {
        self.ordered.iter().copied()
    }

    /// Number of safe zones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// Reports whether the set has no zones.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Manhattan distance from `position` to the nearest safe zone.
    #[must_use]
    pub fn nearest_distance(&self, position: Position) -> Option<u32> {
        self.ordered
            .iter()
            .map(|zone| zone.manhattan_distance(position))
            .min()
    }
}

/// Read-only view over the hazardous cells at a given instant.
#[derive(Clone, Copy, Debug)]
pub struct HazardView<'a> {
    cells: &'a BTreeSet<Position>,
}

impl<'a> HazardView<'a> {
    /// Captures a view backed by the provided hazard set.
    #[must_use]
    pub fn new(cells: &'a BTreeSet<Position>) -> Self {
        Self { cells }
    }

    /// Reports whether `position` is hazardous.
    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        self.cells.contains(&position)
    }

    /// Reports whether `position` is orthogonally adjacent to a hazardous cell.
    #[must_use]
    pub fn is_adjacent(&self, position: Position) -> bool {
        Direction::ALL
            .into_iter()
            .filter_map(|direction| position.step(direction))
            .any(|neighbor| self.cells.contains(&neighbor))
    }

    /// Manhattan distance from `position` to the nearest hazardous cell.
    #[must_use]
    pub fn nearest_distance(&self, position: Position) -> Option<u32> {
        self.cells
            .iter()
            .map(|cell| cell.manhattan_distance(position))
            .min()
    }

    /// Hazardous cells in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Position> + 'a {
        let cells: &'a BTreeSet<Position> = self.cells;
        cells.iter().copied()
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
}

/// Everything a policy may consult when deciding a move.
///
/// The context is captured once at the start of a tick, so every agent reads
/// the same hazard snapshot regardless of decision order.
#[derive(Clone, Copy, Debug)]
pub struct PlanningContext<'a> {
    grid: &'a Grid,
    safe_zones: &'a SafeZones,
    hazard: HazardView<'a>,
}

impl<'a> PlanningContext<'a> {
    /// Bundles the static map, the safe zones and a hazard snapshot.
    #[must_use]
    pub fn new(grid: &'a Grid, safe_zones: &'a SafeZones, hazard: HazardView<'a>) -> Self {
        Self {
            grid,
            safe_zones,
            hazard,
        }
    }

    /// Static map.
    #[must_use]
    pub fn grid(&self) -> &'a Grid {
        self.grid
    }

    /// Designated safe cells.
    #[must_use]
    pub fn safe_zones(&self) -> &'a SafeZones {
        self.safe_zones
    }

    /// Hazard snapshot.
    #[must_use]
    pub fn hazard(&self) -> HazardView<'a> {
        self.hazard
    }

    /// Status an agent standing on `position` would have.
    ///
    /// Hazard wins over safety when a safe zone has caught fire.
    #[must_use]
    pub fn status_at(&self, position: Position) -> AgentStatus {
        if self.hazard.contains(position) {
            AgentStatus::Dead
        } else if self.safe_zones.contains(position) {
            AgentStatus::Safe
        } else {
            AgentStatus::Alive
        }
    }
}

/// Outcome of a single policy decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    /// Step onto the provided adjacent cell.
    Move(Position),
    /// Stay in place because no move was found.
    Hold,
}

impl Decision {
    /// Cell the agent occupies once the decision is carried out.
    #[must_use]
    pub fn destination(self, current: Position) -> Position {
        match self {
            Self::Move(next) => next,
            Self::Hold => current,
        }
    }
}

/// Unique identifier assigned to an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Lifecycle state of an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentStatus {
    /// Still evacuating.
    Alive,
    /// Overtaken by the hazard.
    Dead,
    /// Reached a safe zone.
    Safe,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    /// Carries out an agent's decision for the current tick.
    MoveAgent {
        /// Agent the decision belongs to.
        agent: AgentId,
        /// Decision produced by the agent's policy.
        decision: Decision,
    },
    /// Closes the current tick, expanding the hazard when it is due.
    Tick,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// An agent stepped onto a new cell and is still evacuating.
    AgentMoved {
        /// Agent that moved.
        agent: AgentId,
        /// Cell occupied before the move.
        from: Position,
        /// Cell occupied after the move.
        to: Position,
    },
    /// An agent stayed in place and is still evacuating.
    AgentHeld {
        /// Agent that held its position.
        agent: AgentId,
        /// Cell the agent occupies.
        at: Position,
    },
    /// The world refused a move that was not a legal single step.
    MoveRejected {
        /// Agent whose move was refused.
        agent: AgentId,
        /// Cell the agent occupies.
        from: Position,
        /// Requested destination.
        to: Position,
    },
    /// An agent reached a safe zone and left the simulation.
    AgentEvacuated {
        /// Agent that reached safety.
        agent: AgentId,
        /// Safe zone the agent reached.
        at: Position,
        /// Cells traveled before reaching safety.
        distance: u64,
    },
    /// An agent was overtaken by the hazard and left the simulation.
    AgentCaught {
        /// Agent that died.
        agent: AgentId,
        /// Cell where the agent died.
        at: Position,
    },
    /// The hazard grew by one ring.
    HazardSpread {
        /// Newly hazardous cells in ascending order.
        cells: Vec<Position>,
    },
    /// The tick counter advanced.
    TimeAdvanced {
        /// Number of completed ticks.
        tick: u64,
    },
    /// No agent remains active.
    SimulationEnded {
        /// Number of completed ticks.
        tick: u64,
    },
}
