//! Benchmarks for seeded scripted games and replay.

#![allow(missing_docs)]

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use hexhold::game::validate::legal_actions;
use hexhold::{ActionKind, GameAction, GameConfig, GameEngine};

const TURNS: u32 = 10;
const ACTIONS_PER_PHASE: usize = 3;

fn config(seed: u64) -> GameConfig {
    GameConfig::new(vec!["Defender".to_string(), "Antagonist".to_string()]).with_seed(seed)
}

/// First-legal-action script, capped per phase.
fn scripted_game(seed: u64) -> (GameEngine, Vec<GameAction>) {
    let mut engine = GameEngine::new();
    engine.start_game(&config(seed)).expect("start");
    let mut log = Vec::new();
    let mut acted = 0;

    while let Some(state) = engine.get_state() {
        if state.game_over || state.turn > TURNS {
            break;
        }
        let scripted = (acted < ACTIONS_PER_PHASE)
            .then(|| {
                legal_actions(state, engine.rules())
                    .into_iter()
                    .find(|a| !matches!(a.kind, ActionKind::AdvancePhase | ActionKind::EndTurn))
            })
            .flatten();
        let action = match scripted {
            Some(action) => {
                acted += 1;
                action
            }
            None => {
                acted = 0;
                GameAction::new(state.current_player_id.clone(), ActionKind::AdvancePhase)
            }
        };
        engine.apply_action(&action).expect("scripted action");
        log.push(action);
    }
    (engine, log)
}

fn bench_scripted_game(c: &mut Criterion) {
    c.bench_function("scripted_game_10_turns", |b| {
        b.iter(|| {
            let (engine, log) = scripted_game(black_box(12345));
            black_box((engine.compute_state_hash(), log.len()))
        });
    });
}

fn bench_replay(c: &mut Criterion) {
    let (_, log) = scripted_game(12345);
    let config = config(12345);

    c.bench_function("replay_10_turns", |b| {
        b.iter(|| {
            let mut engine = GameEngine::new();
            engine.replay(black_box(&config), black_box(&log)).expect("replay");
            black_box(engine.compute_state_hash())
        });
    });
}

fn bench_state_hash(c: &mut Criterion) {
    let (engine, _) = scripted_game(7);

    c.bench_function("state_hash", |b| {
        b.iter(|| black_box(engine.compute_state_hash()));
    });
}

criterion_group!(benches, bench_scripted_game, bench_replay, bench_state_hash);
criterion_main!(benches);
