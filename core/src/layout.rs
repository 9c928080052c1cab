//! Character map parsing.
//!
//! Maps are rectangular character matrices. Marker cells (agents, hazard
//! seeds and safe zones) are recorded and then replaced by free floor, so the
//! resulting [`Grid`] only knows walls and free cells.

use thiserror::Error;

use crate::{Grid, Position};

/// Marker for an impassable wall.
pub const WALL: char = '=';
/// Marker for an agent's starting cell.
pub const AGENT: char = 'P';
/// Marker for an initial hazard cell.
pub const HAZARD: char = 'F';
/// Marker for a safe zone.
pub const SAFE_ZONE: char = 'S';
/// Markers that denote free floor.
pub const FREE: [char; 2] = [' ', '.'];

/// Errors raised while turning a character matrix into a [`MapLayout`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MapError {
    /// The matrix contained no rows or only empty rows.
    #[error("map contains no cells")]
    Empty,
    /// A row's width differs from the first row's width.
    #[error("map row {row} has {found} cells but the first row has {expected}")]
    Ragged {
        /// Zero-based index of the offending row.
        row: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of the offending row.
        found: usize,
    },
    /// A cell contained a character that is not a known marker.
    #[error("unknown map marker {marker:?} at row {row}, column {column}")]
    UnknownMarker {
        /// Zero-based row of the cell.
        row: usize,
        /// Zero-based column of the cell.
        column: usize,
        /// Offending character.
        marker: char,
    },
    /// The matrix is too large to be addressed with 32-bit coordinates.
    #[error("map dimensions exceed the supported range")]
    TooLarge,
    /// No agent start marker was found.
    #[error("map contains no agents")]
    NoAgents,
    /// No safe zone marker was found.
    #[error("map contains no safe zones")]
    NoSafeZones,
}

/// Parsed map: the cleaned grid plus the marker positions in row-major order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapLayout {
    grid: Grid,
    agents: Vec<Position>,
    hazard_seeds: Vec<Position>,
    safe_zones: Vec<Position>,
}

impl MapLayout {
    /// Parses a rectangular character matrix, one string per row.
    pub fn parse<I, S>(rows: I) -> Result<Self, MapError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rows: Vec<Vec<char>> = rows
            .into_iter()
            .map(|row| row.as_ref().chars().collect())
            .collect();

        if rows.iter().all(Vec::is_empty) {
            return Err(MapError::Empty);
        }
        let expected = rows.first().map_or(0, Vec::len);

        let height = u32::try_from(rows.len()).map_err(|_| MapError::TooLarge)?;
        let width = u32::try_from(expected).map_err(|_| MapError::TooLarge)?;

        let mut grid = Grid::new(height, width);
        let mut agents = Vec::new();
        let mut hazard_seeds = Vec::new();
        let mut safe_zones = Vec::new();

        for (row_index, row) in rows.iter().enumerate() {
            if row.len() != expected {
                return Err(MapError::Ragged {
                    row: row_index,
                    expected,
                    found: row.len(),
                });
            }

            for (column_index, &marker) in row.iter().enumerate() {
                let position = Position::new(
                    u32::try_from(row_index).map_err(|_| MapError::TooLarge)?,
                    u32::try_from(column_index).map_err(|_| MapError::TooLarge)?,
                );

                match marker {
                    WALL => grid = grid.with_wall(position),
                    AGENT => agents.push(position),
                    HAZARD => hazard_seeds.push(position),
                    SAFE_ZONE => safe_zones.push(position),
                    other if FREE.contains(&other) => {}
                    other => {
                        return Err(MapError::UnknownMarker {
                            row: row_index,
                            column: column_index,
                            marker: other,
                        })
                    }
                }
            }
        }

        if agents.is_empty() {
            return Err(MapError::NoAgents);
        }
        if safe_zones.is_empty() {
            return Err(MapError::NoSafeZones);
        }

        Ok(Self {
            grid,
            agents,
            hazard_seeds,
            safe_zones,
        })
    }

    /// Static map with every marker replaced by free floor.
    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Agent starting cells.
    #[must_use]
    pub fn agents(&self) -> &[Position] {
        &self.agents
    }

    /// Initial hazard cells.
    #[must_use]
    pub fn hazard_seeds(&self) -> &[Position] {
        &self.hazard_seeds
    }

    /// Safe zone cells.
    #[must_use]
    pub fn safe_zones(&self) -> &[Position] {
        &self.safe_zones
    }
}
