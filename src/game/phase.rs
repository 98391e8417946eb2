//! Phase State Machine
//!
//! Eight phases in a fixed cycle. Advancing is routed through the reducer as
//! an action; this module owns the successor table, turn ownership and the
//! effects that run on entering each phase.

use crate::game::events::{GameEvent, GameEventData};
use crate::game::rules::{self, RulesConfig};
use crate::game::state::{ControlStatus, GameState, Phase, PlayerId, PlayerRole, SettlementId};

/// Cycle order, starting from the wraparound target.
pub const PHASE_ORDER: [Phase; 8] = [
    Phase::Preparation,
    Phase::Exploration,
    Phase::Movement,
    Phase::ResourceGathering,
    Phase::Trading,
    Phase::AntagonistTurn,
    Phase::RoleCheck,
    Phase::EndGameCheck,
];

/// Successor of a phase. The last phase wraps to the first.
pub fn next_phase(phase: Phase) -> Phase {
    match phase {
        Phase::Preparation => Phase::Exploration,
        Phase::Exploration => Phase::Movement,
        Phase::Movement => Phase::ResourceGathering,
        Phase::ResourceGathering => Phase::Trading,
        Phase::Trading => Phase::AntagonistTurn,
        Phase::AntagonistTurn => Phase::RoleCheck,
        Phase::RoleCheck => Phase::EndGameCheck,
        Phase::EndGameCheck => Phase::Preparation,
    }
}

/// Whether the phase may be left. Only a finished game parked on the
/// end-game check is stuck.
pub fn can_advance(state: &GameState) -> bool {
    !(state.game_over && state.phase == Phase::EndGameCheck)
}

/// Phases that wait for player input.
pub fn is_human_phase(phase: Phase) -> bool {
    matches!(
        phase,
        Phase::Exploration | Phase::Movement | Phase::ResourceGathering | Phase::Trading
    )
}

/// System-driven phases.
pub fn is_automatic_phase(phase: Phase) -> bool {
    matches!(phase, Phase::Preparation | Phase::RoleCheck | Phase::EndGameCheck)
}

/// The antagonist's phase.
pub fn is_alien_phase(phase: Phase) -> bool {
    phase == Phase::AntagonistTurn
}

/// Role that owns a phase.
pub fn owner_role(phase: Phase) -> PlayerRole {
    if is_alien_phase(phase) {
        PlayerRole::Antagonist
    } else {
        PlayerRole::Defender
    }
}

/// Player that owns a phase. With a single seat that player owns every
/// phase.
pub fn owner_of(state: &GameState, phase: Phase) -> PlayerId {
    state
        .player_with_role(owner_role(phase))
        .or_else(|| state.players.first())
        .map(|p| p.id.clone())
        .unwrap_or_else(|| state.current_player_id.clone())
}

/// Move to the next phase and run its entry effects.
pub fn advance(state: &mut GameState, rules: &RulesConfig) -> Vec<GameEvent> {
    let from = state.phase;
    let to = next_phase(from);
    state.phase = to;
    state.current_player_id = owner_of(state, to);

    let mut events = vec![GameEvent::new(
        state.turn,
        to,
        GameEventData::PhaseChanged { from, to },
    )];
    enter_phase(state, rules, &mut events);
    events
}

/// Advance until the other seat is up or the game ends. Stops after one full
/// cycle when a single seat owns everything.
pub fn end_turn(state: &mut GameState, rules: &RulesConfig) -> Vec<GameEvent> {
    let owner = state.current_player_id.clone();
    let mut events = Vec::new();
    for _ in 0..PHASE_ORDER.len() {
        if !can_advance(state) {
            break;
        }
        events.extend(advance(state, rules));
        if state.game_over || state.current_player_id != owner {
            break;
        }
    }
    events
}

fn enter_phase(state: &mut GameState, rules: &RulesConfig, events: &mut Vec<GameEvent>) {
    match state.phase {
        Phase::Preparation => start_turn(state, rules, events),
        Phase::Exploration | Phase::Movement | Phase::ResourceGathering | Phase::Trading => {
            rules::reset_used(&mut state.characters);
        }
        Phase::AntagonistTurn => {
            rules::antagonist_upkeep(&mut state.antagonist, rules);
            events.push(GameEvent::new(
                state.turn,
                state.phase,
                GameEventData::ShieldRegenerated { shield: state.antagonist.mothership_shield },
            ));
        }
        Phase::RoleCheck => resolve_contested(state, events),
        Phase::EndGameCheck => evaluate_end(state, rules, events),
    }
}

fn start_turn(state: &mut GameState, rules: &RulesConfig, events: &mut Vec<GameEvent>) {
    state.turn += 1;
    state.actions_this_turn.clear();
    rules::turn_start_reset(state);
    events.push(GameEvent::new(
        state.turn,
        state.phase,
        GameEventData::TurnStarted { turn: state.turn },
    ));

    let turn = state.turn;
    for settlement in state.settlements.values_mut() {
        if let Some(starvation) = rules::consume_food(settlement, rules) {
            events.push(GameEvent::starvation(
                turn,
                settlement.id,
                starvation.shortfall,
                starvation.deaths,
            ));
        }
        let died = rules::care_for_wounded(settlement, rules);
        if died > 0 {
            events.push(GameEvent::wounded_died(turn, settlement.id, died));
        }
    }
}

fn resolve_contested(state: &mut GameState, events: &mut Vec<GameEvent>) {
    let contested: Vec<(SettlementId, ControlStatus)> = state
        .settlements
        .values()
        .map(|s| {
            let next = match s.control {
                ControlStatus::Contested if rules::soldier_present(state, s.tile_id) => {
                    ControlStatus::Defender
                }
                ControlStatus::Contested => ControlStatus::Antagonist,
                other => other,
            };
            (s.id, next)
        })
        .collect();

    for (id, control) in contested {
        let Some(settlement) = state.settlements.get_mut(&id) else {
            continue;
        };
        let previous = rules::set_control(settlement, &mut state.characters, control);
        if previous != control {
            events.push(GameEvent::new(
                state.turn,
                state.phase,
                GameEventData::ControlChanged { settlement_id: id, from: previous, to: control },
            ));
        }
    }
}

fn evaluate_end(state: &mut GameState, rules: &RulesConfig, events: &mut Vec<GameEvent>) {
    if rules::beacon_active(state) {
        state.beacon_turns += 1;
        events.push(GameEvent::new(
            state.turn,
            state.phase,
            GameEventData::BeaconProgress {
                turns: state.beacon_turns,
                required: rules.beacon_turns_required,
            },
        ));
    } else {
        state.beacon_turns = 0;
    }

    let check = rules::check_game_end(state, rules);
    if let (true, Some(condition), Some(winner)) =
        (check.is_game_over, check.victory_condition, check.winner)
    {
        state.game_over = true;
        state.victory_condition = Some(condition);
        state.winner = Some(winner);
        events.push(GameEvent::new(
            state.turn,
            state.phase,
            GameEventData::GameEnded { condition, winner },
        ));
    }
}
