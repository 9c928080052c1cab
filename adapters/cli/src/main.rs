#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs repeated evacuation experiments.

mod render;
mod report;
mod scenario;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use fire_evac_core::MapLayout;
use fire_evac_system_simulation::{
    PolicyKind, Simulation, SimulationConfig, DEFAULT_MAX_TICKS,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::{report::Summary, scenario::Scenario};

const DEFAULT_ROLLOUT: u32 = 100;
const DEFAULT_END_TICKS: u32 = 7;
const DEFAULT_ITER: u32 = 10;
const DEFAULT_HAZARD_INTERVAL: u32 = 2;
const DEFAULT_LOG_FILTER: &str = "warn,fire_evac_system_simulation=info";

/// Command line arguments. Flags left unset fall back to the scenario's
/// tuning table, then to the built-in defaults.
#[derive(Debug, Parser)]
#[command(
    name = "fire-evac",
    version,
    about = "Runs a fire evacuation with the selected policy and reports averages."
)]
struct Cli {
    /// Policy followed by every agent: random, astar, mcts or qlearning.
    #[arg(long)]
    method: PolicyKind,
    /// Tree search simulations per decision, or Q-learning episodes [default: 100].
    #[arg(long)]
    rollout: Option<u32>,
    /// Length of a tree search rollout [default: 7].
    #[arg(long)]
    end_ticks: Option<u32>,
    /// Number of runs to average over [default: 10].
    #[arg(long)]
    iter: Option<u32>,
    /// Ticks between two hazard expansions [default: 2].
    #[arg(long)]
    hazard_interval: Option<u32>,
    /// Cap on the ticks of a single run [default: 1000].
    #[arg(long)]
    max_ticks: Option<u64>,
    /// Base seed; run `i` uses `seed + i` [default: 0].
    #[arg(long)]
    seed: Option<u64>,
    /// TOML scenario file replacing the built-in floor plan.
    #[arg(long)]
    scenario: Option<PathBuf>,
    /// Print the map after every tick.
    #[arg(long)]
    render: bool,
    /// Print the summary as JSON.
    #[arg(long)]
    json: bool,
}

/// Fully resolved experiment parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Experiment {
    runs: u32,
    base_seed: u64,
    config: SimulationConfig,
}

impl Experiment {
    fn resolve(cli: &Cli, scenario: &Scenario) -> Self {
        let tuning = scenario.tuning;
        let rollout = cli.rollout.or(tuning.rollout).unwrap_or(DEFAULT_ROLLOUT);
        let horizon = cli
            .end_ticks
            .or(tuning.end_ticks)
            .unwrap_or(DEFAULT_END_TICKS);

        let mut config = SimulationConfig::new(cli.method);
        config.hazard_interval = cli
            .hazard_interval
            .or(tuning.hazard_interval)
            .unwrap_or(DEFAULT_HAZARD_INTERVAL);
        config.max_ticks = Some(
            cli.max_ticks
                .or(tuning.max_ticks)
                .unwrap_or(DEFAULT_MAX_TICKS),
        );
        config.search.simulations = rollout;
        config.search.horizon = horizon;
        config.learner.episodes = rollout;

        Self {
            runs: cli.iter.or(tuning.iter).unwrap_or(DEFAULT_ITER),
            base_seed: cli.seed.or(tuning.seed).unwrap_or(0),
            config,
        }
    }

    fn run(&self, layout: &MapLayout, render: bool) -> Result<Summary> {
        let mut outcomes = Vec::new();
        for index in 0..self.runs {
            let config = SimulationConfig {
                seed: self.base_seed.wrapping_add(u64::from(index)),
                ..self.config
            };
            let mut simulation = Simulation::new(layout, config)
                .with_context(|| format!("failed to set up run {index}"))?;

            if render {
                print!("{}", render::frame(simulation.world()));
            }
            let outcome = simulation.run_with(|world, _| {
                if render {
                    print!("{}", render::frame(world));
                }
            });
            tracing::info!(
                run = index,
                ticks = outcome.ticks,
                safe = outcome.safe,
                dead = outcome.dead,
                "run finished"
            );
            outcomes.push(outcome);
        }
        Ok(Summary::new(self.config.policy, outcomes))
    }
}

fn init_logging() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install the log subscriber")
}

fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    let scenario = match &cli.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::reference(),
    };
    let layout = MapLayout::parse(&scenario.map).context("scenario map is malformed")?;
    let experiment = Experiment::resolve(&cli, &scenario);

    let summary = experiment.run(&layout, cli.render)?;
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("failed to encode the summary")?
        );
    } else {
        println!("{summary}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("fire-evac").chain(args.iter().copied()))
            .expect("arguments parse")
    }

    #[test]
    fn defaults_apply_without_flags_or_tuning() {
        let cli = parse(&["--method", "MCTS"]);

        let experiment = Experiment::resolve(&cli, &Scenario::reference());

        assert_eq!(experiment.runs, DEFAULT_ITER);
        assert_eq!(experiment.base_seed, 0);
        assert_eq!(experiment.config.policy, PolicyKind::Mcts);
        assert_eq!(experiment.config.search.simulations, DEFAULT_ROLLOUT);
        assert_eq!(experiment.config.search.horizon, DEFAULT_END_TICKS);
        assert_eq!(experiment.config.learner.episodes, DEFAULT_ROLLOUT);
        assert_eq!(experiment.config.hazard_interval, DEFAULT_HAZARD_INTERVAL);
        assert_eq!(experiment.config.max_ticks, Some(DEFAULT_MAX_TICKS));
    }

    #[test]
    fn flags_win_over_scenario_tuning() {
        let scenario = Scenario::parse(
            "version = 1\nmap = [\"PS\"]\n[tuning]\nrollout = 30\niter = 4\nseed = 9\n",
        )
        .expect("valid scenario");
        let cli = parse(&["--method", "qlearning", "--rollout", "12"]);

        let experiment = Experiment::resolve(&cli, &scenario);

        assert_eq!(experiment.config.learner.episodes, 12);
        assert_eq!(experiment.runs, 4);
        assert_eq!(experiment.base_seed, 9);
    }

    #[test]
    fn unknown_methods_are_rejected() {
        let result = Cli::try_parse_from(["fire-evac", "--method", "greedy"]);
        assert!(result.is_err());
    }

    #[test]
    fn every_run_gets_its_own_seed() {
        let layout = MapLayout::parse(["=====", "=P S=", "====="]).expect("valid map");
        let cli = parse(&["--method", "random", "--iter", "3", "--seed", "5"]);
        let experiment = Experiment::resolve(&cli, &Scenario::reference());

        let summary = experiment.run(&layout, false).expect("runs succeed");

        assert_eq!(summary.runs, 3);
        assert_eq!(summary.agents, 1);
    }
}
