use fire_evac_core::{Decision, MapLayout, Position};
use fire_evac_system_q_learning::{LearnerConfig, TabularLearner};
use fire_evac_world::{query, World, WorldConfig};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const CORRIDOR: [&str; 3] = ["=======", "=P   S=", "======="];

fn greedy_walk(learner: &TabularLearner, world: &World, start: Position) -> Vec<Position> {
    let context = query::planning_context(world);
    let mut position = start;
    let mut visited = vec![position];

    for _ in 0..10 {
        match learner.decide(position, &context) {
            Decision::Move(next) => position = next,
            Decision::Hold => break,
        }
        visited.push(position);
        if query::safe_zones(world).contains(position) {
            break;
        }
    }

    visited
}

#[test]
fn corridor_policy_converges_to_the_shortest_walk() {
    let layout = MapLayout::parse(CORRIDOR).expect("valid map");
    let world = World::new(&layout, WorldConfig::default());
    let start = Position::new(1, 1);
    let expected: Vec<Position> = (1..=5).map(|column| Position::new(1, column)).collect();

    let mut converged = 0;
    for seed in 0..5 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut learner = TabularLearner::new(LearnerConfig {
            episodes: 2_000,
            ..LearnerConfig::default()
        });

        let report = learner.learn(
            start,
            &query::planning_context(&world),
            query::hazard_field(&world),
            &mut rng,
        );
        assert_eq!(report.episodes_run, 2_000);
        assert_eq!(report.reached_hazard, 0);

        if greedy_walk(&learner, &world, start) == expected {
            converged += 1;
        }
    }

    assert!(converged >= 4, "only {converged} of 5 seeds converged");
}

#[test]
fn training_is_reproducible_for_a_seed() {
    let layout = MapLayout::parse(["=======", "=P  =S=", "=F    =", "======="])
        .expect("valid map");
    let world = World::new(&layout, WorldConfig::default());
    let start = Position::new(1, 1);

    let train = |seed: u64| {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut learner = TabularLearner::new(LearnerConfig {
            episodes: 50,
            ..LearnerConfig::default()
        });
        let report = learner.learn(
            start,
            &query::planning_context(&world),
            query::hazard_field(&world),
            &mut rng,
        );
        (report, greedy_walk(&learner, &world, start))
    };

    assert_eq!(train(21), train(21));
}
