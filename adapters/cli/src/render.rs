//! Plain-text frames of the evacuation.

use std::fmt::Write as _;

use fire_evac_core::{CellKind, Position};
use fire_evac_world::{query, World};

const WALL_GLYPH: char = '=';
const FLOOR_GLYPH: char = ' ';
const AGENT_GLYPH: char = 'P';
const HAZARD_GLYPH: char = 'F';
const SAFE_GLYPH: char = 'S';

/// Draws the counters line and the map.
///
/// Layers are painted in order: agents, then fire over agents, then safe
/// zones over everything. Cells are separated by a space so the grid keeps a
/// square aspect in a terminal.
#[must_use]
pub(crate) fn frame(world: &World) -> String {
    let grid = query::grid(world);
    let tally = query::tally(world);

    let mut canvas: Vec<Vec<char>> = (0..grid.rows())
        .map(|row| {
            (0..grid.columns())
                .map(|column| match grid.kind(Position::new(row, column)) {
                    Some(CellKind::Wall) => WALL_GLYPH,
                    _ => FLOOR_GLYPH,
                })
                .collect()
        })
        .collect();

    let mut paint = |position: Position, glyph: char| {
        let row = usize::try_from(position.row()).ok();
        let column = usize::try_from(position.column()).ok();
        if let Some(cell) = row
            .zip(column)
            .and_then(|(row, column)| canvas.get_mut(row)?.get_mut(column))
        {
            *cell = glyph;
        }
    };

    for agent in query::agents(world) {
        paint(agent.position, AGENT_GLYPH);
    }
    for cell in query::hazard(world).iter() {
        paint(cell, HAZARD_GLYPH);
    }
    for zone in query::safe_zones(world).iter() {
        paint(zone, SAFE_GLYPH);
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Ticks: {}, Safe: {}, Dead: {}, Objective Function: {}",
        query::tick(world),
        tally.safe,
        tally.dead,
        tally.objective
    );
    for row in canvas {
        let line: Vec<String> = row.into_iter().map(String::from).collect();
        let _ = writeln!(out, "{}", line.join(" "));
    }
    out
}
