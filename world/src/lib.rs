#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the fire evacuation engine.
//!
//! The world owns the static map, the safe zones, the spreading hazard and the
//! roster of evacuating agents. All mutation flows through [`apply`]; readers
//! use the free functions in [`query`].

mod hazard;

pub use hazard::{Expansion, HazardField};

use fire_evac_core::{
    AgentId, AgentStatus, Command, Decision, Event, Grid, MapLayout, PlanningContext, Position,
    SafeZones,
};

const DEFAULT_HAZARD_INTERVAL: u32 = 2;

/// Tunable parameters of the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldConfig {
    /// Number of ticks between two hazard expansions.
    ///
    /// The hazard grows at the end of every tick whose index satisfies
    /// `tick % hazard_interval == hazard_interval - 1`. A value of zero is
    /// treated as one.
    pub hazard_interval: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            hazard_interval: DEFAULT_HAZARD_INTERVAL,
        }
    }
}

#[derive(Clone, Debug)]
struct AgentRecord {
    id: AgentId,
    position: Position,
    distance: u64,
}

/// Represents the authoritative simulation state.
#[derive(Clone, Debug)]
pub struct World {
    grid: Grid,
    safe_zones: SafeZones,
    hazard: HazardField,
    agents: Vec<AgentRecord>,
    config: WorldConfig,
    initial_agents: usize,
    safe: usize,
    dead: usize,
    objective: u64,
    tick_index: u64,
}

impl World {
    /// Builds a world from a parsed map. Agent ids follow layout order.
    #[must_use]
    pub fn new(layout: &MapLayout, config: WorldConfig) -> Self {
        let grid = layout.grid().clone();
        let hazard = HazardField::new(&grid, layout.hazard_seeds().iter().copied());
        let agents: Vec<AgentRecord> = layout
            .agents()
            .iter()
            .zip(0_u32..)
            .map(|(&position, id)| AgentRecord {
                id: AgentId::new(id),
                position,
                distance: 0,
            })
            .collect();

        Self {
            safe_zones: SafeZones::new(layout.safe_zones().iter().copied()),
            initial_agents: agents.len(),
            agents,
            hazard,
            grid,
            config,
            safe: 0,
            dead: 0,
            objective: 0,
            tick_index: 0,
        }
    }

    fn context(&self) -> PlanningContext<'_> {
        PlanningContext::new(&self.grid, &self.safe_zones, self.hazard.view())
    }

    fn hazard_due(&self) -> bool {
        let interval = u64::from(self.config.hazard_interval.max(1));
        self.tick_index % interval == interval - 1
    }

    fn agent_index(&self, agent: AgentId) -> Option<usize> {
        self.agents.iter().position(|record| record.id == agent)
    }

    fn move_agent(&mut self, agent: AgentId, decision: Decision, out_events: &mut Vec<Event>) {
        let Some(index) = self.agent_index(agent) else {
            return;
        };
        let from = self.agents[index].position;

        let to = match decision {
            Decision::Hold => from,
            Decision::Move(to) if from.is_adjacent(to) && self.grid.is_passable(to) => to,
            Decision::Move(to) => {
                tracing::warn!(
                    agent = agent.get(),
                    ?from,
                    ?to,
                    "rejected move that is not a single passable step"
                );
                out_events.push(Event::MoveRejected { agent, from, to });
                from
            }
        };

        if to != from {
            let record = &mut self.agents[index];
            record.position = to;
            record.distance = record.distance.saturating_add(1);
        }

        let status = self.context().status_at(to);
        match status {
            AgentStatus::Dead => {
                let _ = self.agents.remove(index);
                self.dead += 1;
                out_events.push(Event::AgentCaught { agent, at: to });
            }
            AgentStatus::Safe => {
                let record = self.agents.remove(index);
                self.safe += 1;
                self.objective = self.objective.saturating_add(record.distance);
                out_events.push(Event::AgentEvacuated {
                    agent,
                    at: to,
                    distance: record.distance,
                });
            }
            AgentStatus::Alive if to != from => {
                out_events.push(Event::AgentMoved { agent, from, to });
            }
            AgentStatus::Alive => {
                out_events.push(Event::AgentHeld { agent, at: to });
            }
        }
    }

    fn close_tick(&mut self, out_events: &mut Vec<Event>) {
        if self.hazard_due() {
            let roster = std::mem::take(&mut self.agents);
            let expansion = self.hazard.expand(roster, |record| record.position);
            self.agents = expansion.survivors;

            tracing::debug!(
                tick = self.tick_index,
                new_cells = expansion.new_cells.len(),
                caught = expansion.caught.len(),
                "hazard expanded"
            );

            if !expansion.new_cells.is_empty() {
                out_events.push(Event::HazardSpread {
                    cells: expansion.new_cells,
                });
            }
            for record in expansion.caught {
                self.dead += 1;
                out_events.push(Event::AgentCaught {
                    agent: record.id,
                    at: record.position,
                });
            }
        }

        self.tick_index = self.tick_index.saturating_add(1);
        out_events.push(Event::TimeAdvanced {
            tick: self.tick_index,
        });

        if self.agents.is_empty() {
            out_events.push(Event::SimulationEnded {
                tick: self.tick_index,
            });
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::MoveAgent { agent, decision } => world.move_agent(agent, decision, out_events),
        Command::Tick => world.close_tick(out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::{HazardField, World};
    use fire_evac_core::{AgentId, Grid, HazardView, PlanningContext, Position, SafeZones};

    /// Static map with walls and free cells.
    #[must_use]
    pub fn grid(world: &World) -> &Grid {
        &world.grid
    }

    /// Designated safe cells.
    #[must_use]
    pub fn safe_zones(world: &World) -> &SafeZones {
        &world.safe_zones
    }

    /// Read-only view of the hazardous cells.
    #[must_use]
    pub fn hazard(world: &World) -> HazardView<'_> {
        world.hazard.view()
    }

    /// Live hazard field, cloned by planners that simulate its growth.
    #[must_use]
    pub fn hazard_field(world: &World) -> &HazardField {
        &world.hazard
    }

    /// Planning context captured from the current state.
    #[must_use]
    pub fn planning_context(world: &World) -> PlanningContext<'_> {
        world.context()
    }

    /// Number of completed ticks.
    #[must_use]
    pub fn tick(world: &World) -> u64 {
        world.tick_index
    }

    /// Number of ticks between two hazard expansions.
    #[must_use]
    pub fn hazard_interval(world: &World) -> u32 {
        world.config.hazard_interval.max(1)
    }

    /// Reports whether every agent has left the roster.
    #[must_use]
    pub fn is_finished(world: &World) -> bool {
        world.agents.is_empty()
    }

    /// Captures the active agents ordered by identifier.
    #[must_use]
    pub fn agents(world: &World) -> Vec<AgentSnapshot> {
        let mut snapshots: Vec<AgentSnapshot> = world
            .agents
            .iter()
            .map(|record| AgentSnapshot {
                id: record.id,
                position: record.position,
                distance: record.distance,
            })
            .collect();
        snapshots.sort_by_key(|snapshot| snapshot.id);
        snapshots
    }

    /// Snapshot of a single active agent, if it is still evacuating.
    #[must_use]
    pub fn agent(world: &World, id: AgentId) -> Option<AgentSnapshot> {
        world
            .agents
            .iter()
            .find(|record| record.id == id)
            .map(|record| AgentSnapshot {
                id: record.id,
                position: record.position,
                distance: record.distance,
            })
    }

    /// Aggregated counters of the run so far.
    #[must_use]
    pub fn tally(world: &World) -> Tally {
        Tally {
            initial: world.initial_agents,
            alive: world.agents.len(),
            safe: world.safe,
            dead: world.dead,
            objective: world.objective,
        }
    }

    /// Read-only snapshot of an evacuating agent.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct AgentSnapshot {
        /// Identifier of the agent.
        pub id: AgentId,
        /// Cell the agent occupies.
        pub position: Position,
        /// Cells traveled so far.
        pub distance: u64,
    }

    /// Population counters. `alive + safe + dead` always equals `initial`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Tally {
        /// Agents present when the world was created.
        pub initial: usize,
        /// Agents still evacuating.
        pub alive: usize,
        /// Agents that reached a safe zone.
        pub safe: usize,
        /// Agents overtaken by the hazard.
        pub dead: usize,
        /// Sum of the distances traveled by saved agents.
        pub objective: u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corridor() -> World {
        let layout = MapLayout::parse(["=====", "=P S=", "====="]).expect("valid map");
        World::new(&layout, WorldConfig::default())
    }

    fn move_agent(world: &mut World, to: Position) -> Vec<Event> {
        let mut events = Vec::new();
        apply(
            world,
            Command::MoveAgent {
                agent: AgentId::new(0),
                decision: Decision::Move(to),
            },
            &mut events,
        );
        events
    }

    #[test]
    fn agent_is_evacuated_on_reaching_a_safe_zone() {
        let mut world = corridor();

        let first = move_agent(&mut world, Position::new(1, 2));
        assert_eq!(
            first,
            vec![Event::AgentMoved {
                agent: AgentId::new(0),
                from: Position::new(1, 1),
                to: Position::new(1, 2),
            }]
        );

        let second = move_agent(&mut world, Position::new(1, 3));
        assert_eq!(
            second,
            vec![Event::AgentEvacuated {
                agent: AgentId::new(0),
                at: Position::new(1, 3),
                distance: 2,
            }]
        );

        let tally = query::tally(&world);
        assert_eq!(tally.safe, 1);
        assert_eq!(tally.objective, 2);
        assert!(query::is_finished(&world));
    }

    #[test]
    fn illegal_moves_are_rejected_as_holds() {
        let mut world = corridor();

        let events = move_agent(&mut world, Position::new(0, 1));
        assert_eq!(
            events,
            vec![
                Event::MoveRejected {
                    agent: AgentId::new(0),
                    from: Position::new(1, 1),
                    to: Position::new(0, 1),
                },
                Event::AgentHeld {
                    agent: AgentId::new(0),
                    at: Position::new(1, 1),
                },
            ]
        );

        let jump = move_agent(&mut world, Position::new(1, 3));
        assert!(matches!(jump[0], Event::MoveRejected { .. }));
        let agent = query::agent(&world, AgentId::new(0)).expect("agent still active");
        assert_eq!(agent.position, Position::new(1, 1));
        assert_eq!(agent.distance, 0);
    }

    #[test]
    fn walking_into_the_hazard_is_fatal() {
        let layout = MapLayout::parse(["PFS"]).expect("valid map");
        let mut world = World::new(&layout, WorldConfig::default());

        let events = move_agent(&mut world, Position::new(0, 1));

        assert_eq!(
            events,
            vec![Event::AgentCaught {
                agent: AgentId::new(0),
                at: Position::new(0, 1),
            }]
        );
        assert_eq!(query::tally(&world).dead, 1);
    }

    #[test]
    fn hazard_expands_on_the_last_tick_of_each_interval() {
        let layout = MapLayout::parse(["F   ", "   P", "S   "]).expect("valid map");
        let mut world = World::new(&layout, WorldConfig { hazard_interval: 2 });
        let mut events = Vec::new();

        apply(&mut world, Command::Tick, &mut events);
        assert_eq!(events, vec![Event::TimeAdvanced { tick: 1 }]);
        assert_eq!(query::hazard(&world).len(), 1);

        events.clear();
        apply(&mut world, Command::Tick, &mut events);
        assert_eq!(
            events,
            vec![
                Event::HazardSpread {
                    cells: vec![Position::new(0, 1), Position::new(1, 0)],
                },
                Event::TimeAdvanced { tick: 2 },
            ]
        );
    }

    #[test]
    fn expansion_catches_agents_and_ends_the_run() {
        let layout = MapLayout::parse(["FP", "=S"]).expect("valid map");
        let mut world = World::new(&layout, WorldConfig { hazard_interval: 1 });
        let mut events = Vec::new();

        apply(&mut world, Command::Tick, &mut events);

        assert_eq!(
            events,
            vec![
                Event::HazardSpread {
                    cells: vec![Position::new(0, 1), Position::new(1, 0)],
                },
                Event::AgentCaught {
                    agent: AgentId::new(0),
                    at: Position::new(0, 1),
                },
                Event::TimeAdvanced { tick: 1 },
                Event::SimulationEnded { tick: 1 },
            ]
        );
        assert_eq!(query::tally(&world).dead, 1);
    }

    #[test]
    fn agents_keep_layout_order() {
        let layout = MapLayout::parse(["P P", " S ", "P  "]).expect("valid map");
        let world = World::new(&layout, WorldConfig::default());

        let positions: Vec<_> = query::agents(&world)
            .into_iter()
            .map(|agent| (agent.id.get(), agent.position))
            .collect();
        assert_eq!(
            positions,
            vec![
                (0, Position::new(0, 0)),
                (1, Position::new(0, 2)),
                (2, Position::new(2, 0)),
            ]
        );
    }
}
