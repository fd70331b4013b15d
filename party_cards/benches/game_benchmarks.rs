use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use party_cards::{
    BlackCard, GameSettings, Pack, Session, WhiteCard,
    game::{GameOutcome, Trophy, deck::shuffle},
};
use std::hint::black_box;

fn pack(whites: usize) -> Pack {
    let mut pack = Pack::new("bench", "Bench");
    for i in 0..whites {
        let mut card = WhiteCard::new(&format!("w_{i}"), "an answer");
        if i % 4 == 0 {
            card.flags = "lewd".to_string();
        }
        pack.add_white(card);
    }
    for i in 0..50 {
        pack.add_black(BlackCard::new(&format!("b_{i}"), "____", 1, 0));
    }
    pack
}

/// Helper to create a session with N players already in a round
fn setup_session(n_players: usize, max_points: u32) -> Session {
    let settings = GameSettings {
        max_players: n_players.max(3),
        max_points,
        max_rounds: 0,
        ..GameSettings::default()
    };
    let mut session = Session::new(&[pack(500)], settings);
    for i in 0..n_players {
        session
            .create_player(Some(&format!("player{i}")), false, None)
            .unwrap();
    }
    session
}

/// Everyone plays their first card and the judge picks the first play
fn play_round(session: &mut Session) {
    let judge = session.judge().unwrap().id();
    let plays: Vec<_> = session
        .players()
        .iter()
        .filter(|p| p.id() != judge)
        .map(|p| (p.id(), vec![p.hand()[0].id.clone()]))
        .collect();
    for (id, cards) in plays {
        session.play_cards(id, &cards).unwrap();
    }
    session.judge_cards(judge, 0).unwrap();
}

/// Benchmark the 100-pass shuffle at different pile sizes
fn bench_shuffle(c: &mut Criterion) {
    let mut group = c.benchmark_group("shuffle");
    for size in [10, 100, 500] {
        let mut items: Vec<usize> = (0..size).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| shuffle(black_box(&mut items), &mut rand::rng()));
        });
    }
    group.finish();
}

/// Benchmark joining, which deals a full hand per player
fn bench_join(c: &mut Criterion) {
    c.bench_function("join_and_deal", |b| {
        b.iter_with_setup(
            || Session::new(&[pack(500)], GameSettings::default()),
            |mut session| {
                for i in 0..3 {
                    session
                        .create_player(Some(&format!("p{i}")), false, None)
                        .unwrap();
                }
                session
            },
        );
    });
}

/// Benchmark a full round at different table sizes
fn bench_round(c: &mut Criterion) {
    let mut group = c.benchmark_group("round");
    for n_players in [3, 6, 10] {
        group.bench_with_input(
            BenchmarkId::from_parameter(n_players),
            &n_players,
            |b, &n| {
                b.iter_with_setup(
                    || setup_session(n, 10),
                    |mut session| {
                        play_round(&mut session);
                        session
                    },
                );
            },
        );
    }
    group.finish();
}

/// Benchmark trophy evaluation against a long play history
fn bench_trophy_eval(c: &mut Criterion) {
    let trophy: Trophy = serde_json::from_str(
        r#"{
            "id": "dirty_mind",
            "requirements": [{
                "type": "all",
                "requirements": [
                    { "type": "card_proportion", "flags": ["lewd"], "percent": 20 },
                    { "type": "win_proportion", "percent": 10 }
                ]
            }]
        }"#,
    )
    .unwrap();

    // Points are never reached, so the game keeps going.
    let mut session = setup_session(3, 1000);
    for _ in 0..100 {
        play_round(&mut session);
        let round = session.round();
        session.round_end_elapsed(round);
    }
    let player = &session.players()[0];
    let outcome = GameOutcome::default();

    c.bench_function("trophy_eval_100_rounds", |b| {
        b.iter(|| trophy.is_player_eligible(black_box(player), &outcome));
    });
}

criterion_group!(
    benches,
    bench_shuffle,
    bench_join,
    bench_round,
    bench_trophy_eval
);
criterion_main!(benches);
