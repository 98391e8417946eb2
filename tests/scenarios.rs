//! End-to-end engine scenarios: setup, moves, rejections, starvation,
//! duplicate submissions and full-game replay.

use std::collections::BTreeSet;

use hexhold::game::engine::EngineError;
use hexhold::game::events::GameEventData;
use hexhold::game::factory::{SettlementOverride, StateOverrides};
use hexhold::game::reducer::{reduce_action, ReduceError};
use hexhold::game::rules::RulesConfig;
use hexhold::game::state::{
    CharacterType, ResourceKind, Resources, SettlementId, VictoryCondition,
};
use hexhold::game::validate::{legal_actions, ValidationError};
use hexhold::{ActionKind, GameAction, GameConfig, GameEngine, GameState, LcgRandom, Phase, PlayerRole};

fn config() -> GameConfig {
    GameConfig::new(vec!["Ada".to_string(), "Zed".to_string()]).with_seed(12345)
}

fn started(config: &GameConfig) -> GameEngine {
    let mut engine = GameEngine::new();
    engine.start_game(config).unwrap();
    engine
}

fn state(engine: &GameEngine) -> &GameState {
    engine.get_state().unwrap()
}

fn current_action(engine: &GameEngine, kind: ActionKind) -> GameAction {
    GameAction::new(state(engine).current_player_id.clone(), kind)
}

fn same_modulo_id(a: &GameState, b: &GameState) -> bool {
    let mut b = b.clone();
    b.game_id = a.game_id.clone();
    *a == b
}

#[test]
fn test_seeded_start_is_reproducible() {
    let engine = started(&config());
    let s = state(&engine);

    assert_eq!(s.turn, 1);
    assert_eq!(s.phase, Phase::Preparation);
    assert_eq!(s.settlements.len(), 3);
    for settlement in s.settlements.values() {
        let types: Vec<CharacterType> = settlement
            .members
            .iter()
            .map(|id| s.characters[id].character_type)
            .collect();
        assert_eq!(types.len(), CharacterType::ALL.len());
        let distinct: BTreeSet<CharacterType> = types.iter().copied().collect();
        assert_eq!(distinct.len(), CharacterType::ALL.len());
    }

    let twin = started(&config());
    assert_ne!(state(&twin).game_id, s.game_id);
    assert!(same_modulo_id(s, state(&twin)));
    assert_eq!(twin.compute_state_hash().unwrap(), engine.compute_state_hash().unwrap());
}

#[test]
fn test_move_after_two_advances() {
    let mut engine = started(&config());
    engine.advance_phase().unwrap();
    engine.advance_phase().unwrap();
    assert_eq!(state(&engine).phase, Phase::Movement);

    let s = state(&engine);
    let character = s.characters.values().find(|c| c.is_available()).unwrap().id;
    let from = s.character_tile(character).unwrap();
    let target = s
        .tiles
        .values()
        .find(|t| !t.destroyed && s.tile_distance(from, t.id) == Some(1))
        .unwrap()
        .id;

    let events = engine
        .apply_action(&current_action(&engine, ActionKind::Move { character_id: character, tile_id: target }))
        .unwrap();

    assert_eq!(state(&engine).characters[&character].current_tile_id, Some(target));
    assert!(events.iter().any(|e| matches!(
        e.data,
        GameEventData::CharacterMoved { character_id, to, .. } if character_id == character && to == target
    )));
}

#[test]
fn test_gather_without_capacity_rejected() {
    let mut engine = started(&config());
    for _ in 0..3 {
        engine.advance_phase().unwrap();
    }
    assert_eq!(state(&engine).phase, Phase::ResourceGathering);

    let s = state(&engine);
    let home = SettlementId(0);
    let doctor = s.settlements[&home]
        .members
        .iter()
        .copied()
        .find(|id| s.characters[id].character_type == CharacterType::Doctor)
        .unwrap();
    let before = s.settlements[&home].resources;

    let result = engine.apply_action(&current_action(
        &engine,
        ActionKind::Gather { character_id: doctor, resource: ResourceKind::Food, amount: 2 },
    ));

    match result {
        Err(EngineError::Rejected(ReduceError::Rejected(ValidationError::NoCapacity {
            character_type,
            resource,
        }))) => {
            assert_eq!(character_type, CharacterType::Doctor);
            assert_eq!(resource, ResourceKind::Food);
        }
        other => panic!("expected capacity rejection, got {other:?}"),
    }
    assert_eq!(state(&engine).settlements[&home].resources, before);
    assert_eq!(engine.get_stats().actions_rejected, 1);
}

#[test]
fn test_food_shortfall_starves_population() {
    let overrides = StateOverrides {
        settlements: vec![SettlementOverride {
            settlement_id: SettlementId(0),
            resources: Some(Resources::new(4, 3, 4, 2)),
            ..Default::default()
        }],
        ..Default::default()
    };
    let mut engine = started(&config().with_overrides(overrides));
    let population = state(&engine).settlements[&SettlementId(0)].population;
    assert_eq!(population, 10);

    // Defender to the alien turn, alien to role check, defender through the
    // wraparound into turn 2.
    let mut events = Vec::new();
    for _ in 0..3 {
        events.extend(engine.apply_action(&current_action(&engine, ActionKind::EndTurn)).unwrap());
    }
    assert_eq!(state(&engine).turn, 2);

    let shortfall = 10 - 4;
    let deaths = shortfall * RulesConfig::default().starvation_death_permille / 1000;
    assert_eq!(state(&engine).settlements[&SettlementId(0)].population, population - deaths);
    assert_eq!(state(&engine).settlements[&SettlementId(0)].resources.food, 0);
    assert!(events.iter().any(|e| matches!(
        &e.data,
        GameEventData::Starvation { settlement_id, shortfall: s, deaths: d, .. }
            if *settlement_id == SettlementId(0) && *s == shortfall && *d == deaths
    )));
    assert_eq!(state(&engine).settlements[&SettlementId(1)].population, 10);
}

#[test]
fn test_huge_population_survives_full_turns() {
    let overrides = StateOverrides {
        settlements: vec![SettlementOverride {
            settlement_id: SettlementId(0),
            population: Some(u32::MAX),
            wounded: Some(1),
            ..Default::default()
        }],
        ..Default::default()
    };
    let mut engine = started(&config().with_overrides(overrides));
    assert_eq!(state(&engine).free_population(), u32::MAX);

    for _ in 0..16 {
        engine.advance_phase().unwrap();
    }
    let s = state(&engine);
    assert_eq!(s.turn, 3);
    assert!(!s.game_over);
    assert!(s.settlements[&SettlementId(0)].population > 0);
    assert!(engine.compute_state_hash().is_ok());
}

#[test]
fn test_duplicate_submission_revalidated() {
    let mut engine = started(&config());
    engine.advance_phase().unwrap();
    engine.advance_phase().unwrap();

    let s = state(&engine);
    let character = s.characters.values().find(|c| c.is_available()).unwrap().id;
    let from = s.character_tile(character).unwrap();
    let target = s
        .tiles
        .values()
        .find(|t| s.tile_distance(from, t.id) == Some(1))
        .unwrap()
        .id;
    let action = current_action(&engine, ActionKind::Move { character_id: character, tile_id: target });

    engine.apply_action(&action).unwrap();
    let after_first = engine.snapshot().unwrap();

    let second = engine.apply_action(&action);
    assert!(matches!(
        second,
        Err(EngineError::Rejected(ReduceError::Rejected(ValidationError::CharacterUnavailable(id)))) if id == character
    ));
    assert_eq!(engine.snapshot().unwrap(), after_first);
}

#[test]
fn test_out_of_turn_action_changes_nothing() {
    let mut engine = started(&config());
    let before = engine.snapshot().unwrap();
    let antagonist = before.player_with_role(PlayerRole::Antagonist).unwrap().id.clone();

    let result = engine.apply_action(&GameAction::new(antagonist, ActionKind::AdvancePhase));
    assert!(matches!(
        result,
        Err(EngineError::Rejected(ReduceError::Rejected(ValidationError::NotYourTurn { .. })))
    ));
    assert_eq!(engine.snapshot().unwrap(), before);
}

#[test]
fn test_reducer_leaves_input_state_alone() {
    let engine = started(&config());
    let original = engine.snapshot().unwrap();
    let copy = original.clone();

    let mut rng = LcgRandom::new(original.rng_seed);
    let action = GameAction::new(original.current_player_id.clone(), ActionKind::AdvancePhase);
    let transition = reduce_action(&original, &action, &RulesConfig::default(), &mut rng).unwrap();

    assert_eq!(original, copy);
    assert_eq!(transition.state.phase, Phase::Exploration);
    assert_eq!(original.phase, Phase::Preparation);
}

/// Defender only advances; the antagonist spends its budget on the first
/// legal actions. Starvation ends the game within two turns.
fn play_to_completion(engine: &mut GameEngine) -> Vec<GameAction> {
    let mut log = Vec::new();
    let mut alien_actions = 0;
    for _ in 0..100 {
        let s = state(engine);
        if s.game_over {
            break;
        }
        let action = if s.phase == Phase::AntagonistTurn && alien_actions < 2 {
            alien_actions += 1;
            legal_actions(s, engine.rules())
                .into_iter()
                .find(|a| !matches!(a.kind, ActionKind::AdvancePhase | ActionKind::EndTurn))
                .unwrap_or_else(|| current_action(engine, ActionKind::EndTurn))
        } else {
            if s.phase == Phase::AntagonistTurn {
                alien_actions = 0;
            }
            current_action(engine, ActionKind::EndTurn)
        };
        engine.apply_action(&action).unwrap();
        log.push(action);
    }
    log
}

#[test]
fn test_full_game_replays_identically() {
    let starving = |id| SettlementOverride {
        settlement_id: SettlementId(id),
        population: Some(1),
        wounded: Some(0),
        resources: Some(Resources::default()),
    };
    let rules = RulesConfig { starvation_death_permille: 1000, ..RulesConfig::default() };
    let config = config()
        .with_overrides(StateOverrides {
            settlements: vec![starving(0), starving(1), starving(2)],
            ..Default::default()
        })
        .with_rules(rules);

    let mut engine = started(&config);
    let log = play_to_completion(&mut engine);
    let final_state = engine.snapshot().unwrap();

    assert!(final_state.game_over);
    assert!(final_state.turn >= 2);
    assert_eq!(final_state.victory_condition, Some(VictoryCondition::PopulationExtinct));
    assert_eq!(final_state.winner, Some(PlayerRole::Antagonist));
    assert!(log.iter().any(|a| a.kind.is_antagonist_action()));

    let mut replayer = GameEngine::new();
    let replayed = replayer.replay(&config, &log).unwrap().clone();
    assert!(same_modulo_id(&final_state, &replayed));
    assert_eq!(replayed.winner, final_state.winner);
    assert_eq!(replayed.victory_condition, final_state.victory_condition);
    assert_eq!(replayer.compute_state_hash().unwrap(), engine.compute_state_hash().unwrap());

    // Nothing more can be applied once the game is over.
    let late = current_action(&engine, ActionKind::EndTurn);
    assert!(matches!(
        engine.apply_action(&late),
        Err(EngineError::Rejected(ReduceError::Rejected(ValidationError::GameOver)))
    ));
}

#[test]
fn test_replay_reports_divergence() {
    let mut engine = GameEngine::new();
    let bogus = vec![
        GameAction::new(hexhold::PlayerId::new("player-1"), ActionKind::AdvancePhase),
        GameAction::new(hexhold::PlayerId::new("player-1"), ActionKind::RaiseShield),
    ];
    match engine.replay(&config(), &bogus) {
        Err(EngineError::ReplayDiverged { index, action, .. }) => {
            assert_eq!(index, 1);
            assert_eq!(action, "RAISE_SHIELD");
        }
        other => panic!("expected divergence, got {other:?}"),
    }
}
