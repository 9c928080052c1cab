use std::collections::HashMap;

use fire_evac_core::{Direction, Position};

/// Action values for every visited cell, indexed by [`Direction::index`].
///
/// Rows are created on first write only, so reading an unseen cell never
/// grows the table.
#[derive(Clone, Debug, Default)]
pub struct QTable {
    rows: HashMap<Position, [f64; Direction::COUNT]>,
}

impl QTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutable action values for `state`, inserting zeros on first access.
    pub fn entry(&mut self, state: Position) -> &mut [f64; Direction::COUNT] {
        self.rows.entry(state).or_insert([0.0; Direction::COUNT])
    }

    /// Action values for `state`; zeros when the cell was never updated.
    #[must_use]
    pub fn values(&self, state: Position) -> [f64; Direction::COUNT] {
        self.rows
            .get(&state)
            .copied()
            .unwrap_or([0.0; Direction::COUNT])
    }

    /// Value of taking `direction` from `state`.
    #[must_use]
    pub fn value(&self, state: Position, direction: Direction) -> f64 {
        self.values(state)[direction.index()]
    }

    /// Reports whether `state` has a stored row.
    #[must_use]
    pub fn contains(&self, state: Position) -> bool {
        self.rows.contains_key(&state)
    }

    /// Number of stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Reports whether no row is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
