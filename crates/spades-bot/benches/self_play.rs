use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use spades_bot::{QLearningAgent, QLearningParams, RandomAgent, SeatAgent};
use spades_core::game::engine::{GameConfig, Spades};
use spades_core::model::player::PlayerId;

fn roster(players: u32, seed: u64) -> Vec<SeatAgent> {
    let learner = QLearningAgent::new(
        PlayerId(0),
        QLearningParams {
            seed: Some(seed),
            ..QLearningParams::default()
        },
    )
    .expect("default params are valid");
    let mut agents: Vec<SeatAgent> = vec![learner.into()];
    for id in 1..players {
        agents.push(RandomAgent::new(PlayerId(id), seed + u64::from(id)).into());
    }
    agents
}

fn bench_self_play(c: &mut Criterion) {
    let mut group = c.benchmark_group("self_play");

    for players in [2u32, 4] {
        group.bench_function(format!("game_{players}_players"), |b| {
            b.iter_batched(
                || Spades::with_seed(roster(players, 42), GameConfig::default(), 42),
                |game| {
                    let mut game = game.expect("roster ids are unique");
                    black_box(game.play_x_games(10).expect("games complete"));
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_self_play);
criterion_main!(benches);
