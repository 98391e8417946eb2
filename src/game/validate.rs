//! Action Validation
//!
//! One predicate per action kind, built from shared base checks. Validation
//! is pure and cheap; the reducer re-runs it on every action it applies.

use thiserror::Error;

use crate::game::action::{ActionKind, AttackTarget, GameAction, Recipe};
use crate::game::constants::{
    ALIEN_MOVE_RANGE, ATTACK_RANGE, BOMB_RANGE, CONTROL_RANGE, MAX_SHIELD_LEVEL,
};
use crate::game::phase;
use crate::game::rules::RulesConfig;
use crate::game::state::{
    BuildingType, Character, CharacterId, CharacterType, ControlStatus, GameState, Phase,
    PlayerId, PlayerRole, ResourceKind, Resources, Settlement, SettlementId, Tile, TileId,
};

/// Why an action was refused.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The game has ended.
    #[error("game is over")]
    GameOver,

    /// Submitter is not seated.
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    /// Submitter does not own the current phase.
    #[error("not your turn: {current} is to act")]
    NotYourTurn {
        /// Player who may act.
        current: PlayerId,
    },

    /// Action not allowed in this phase.
    #[error("{action} is not allowed during {phase}")]
    WrongPhase {
        /// Action tag.
        action: &'static str,
        /// Current phase.
        phase: Phase,
    },

    /// Action reserved for the other faction.
    #[error("{action} requires the {required:?} role")]
    WrongRole {
        /// Action tag.
        action: &'static str,
        /// Role needed.
        required: PlayerRole,
    },

    /// Referenced character does not exist.
    #[error("unknown {0}")]
    UnknownCharacter(CharacterId),

    /// Referenced tile does not exist.
    #[error("unknown {0}")]
    UnknownTile(TileId),

    /// Referenced settlement does not exist.
    #[error("unknown {0}")]
    UnknownSettlement(SettlementId),

    /// Character has acted, is wounded or its home is occupied.
    #[error("{0} cannot act right now")]
    CharacterUnavailable(CharacterId),

    /// Tile already revealed.
    #[error("{0} is already explored")]
    AlreadyExplored(TileId),

    /// Tile bombed out.
    #[error("{0} is destroyed")]
    TileDestroyed(TileId),

    /// Target too far (or on the actor's own tile).
    #[error("target at distance {distance} is out of range (max {range})")]
    OutOfRange {
        /// Distance to target.
        distance: u32,
        /// Allowed range.
        range: u32,
    },

    /// Amount must be positive.
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// Character type has no capacity for the resource.
    #[error("{character_type:?} has no capacity to gather {resource:?}")]
    NoCapacity {
        /// Actor type.
        character_type: CharacterType,
        /// Requested resource.
        resource: ResourceKind,
    },

    /// Character type cannot construct.
    #[error("{0:?} cannot build")]
    CannotBuild(CharacterType),

    /// Character type cannot treat wounded.
    #[error("{0:?} cannot heal")]
    CannotHeal(CharacterType),

    /// Actor must stand in its home settlement.
    #[error("{0} must be at its home settlement")]
    NotAtSettlement(CharacterId),

    /// A deployed gatherer's tile holds none of the resource.
    #[error("{tile_id} has no {resource:?} left to gather")]
    CacheEmpty {
        /// Gatherer's tile.
        tile_id: TileId,
        /// Requested resource.
        resource: ResourceKind,
    },

    /// Building already present.
    #[error("{0:?} already built")]
    AlreadyBuilt(BuildingType),

    /// Stock does not cover the cost.
    #[error("insufficient resources: need {needed:?}")]
    InsufficientResources {
        /// Required stock.
        needed: Resources,
    },

    /// No wounded to treat.
    #[error("no wounded to treat in {0}")]
    NothingToHeal(SettlementId),

    /// Transfer source and destination are the same.
    #[error("cannot transfer within {0}")]
    SameSettlement(SettlementId),

    /// Settlement under antagonist control.
    #[error("{0} is occupied")]
    SettlementOccupied(SettlementId),

    /// Mothership is not on the board.
    #[error("mothership is not deployed")]
    NoMothership,

    /// Escort already destroyed.
    #[error("auxiliary vessel already destroyed")]
    VesselGone,

    /// Liberation needs a soldier.
    #[error("only soldiers can liberate")]
    NotSoldier,

    /// Liberation target already free.
    #[error("{0} is not occupied")]
    NotOccupied(SettlementId),

    /// Settlement already under antagonist influence.
    #[error("{0} is already controlled or contested")]
    AlreadyControlled(SettlementId),

    /// Alien action budget spent.
    #[error("no antagonist actions left this turn")]
    NoAlienActions,

    /// No control tokens.
    #[error("no control tokens")]
    NoControlTokens,

    /// Shield generator at maximum.
    #[error("shield level already at maximum")]
    ShieldMaxed,

    /// Phase cannot be left.
    #[error("phase cannot advance")]
    CannotAdvance,
}

type Validation = Result<(), ValidationError>;

// =============================================================================
// BASE CHECKS
// =============================================================================

fn game_not_over(state: &GameState) -> Validation {
    if state.game_over {
        return Err(ValidationError::GameOver);
    }
    Ok(())
}

fn players_turn(state: &GameState, player: &PlayerId) -> Validation {
    if state.player(player).is_none() {
        return Err(ValidationError::UnknownPlayer(player.clone()));
    }
    if &state.current_player_id != player {
        return Err(ValidationError::NotYourTurn { current: state.current_player_id.clone() });
    }
    Ok(())
}

fn in_phase(state: &GameState, action: &'static str, phases: &[Phase]) -> Validation {
    if !phases.contains(&state.phase) {
        return Err(ValidationError::WrongPhase { action, phase: state.phase });
    }
    Ok(())
}

/// A lone seat plays both factions.
fn has_role(state: &GameState, player: &PlayerId, action: &'static str, required: PlayerRole) -> Validation {
    if state.players.len() > 1 && state.role_of(player) != Some(required) {
        return Err(ValidationError::WrongRole { action, required });
    }
    Ok(())
}

fn character(state: &GameState, id: CharacterId) -> Result<&Character, ValidationError> {
    state.characters.get(&id).ok_or(ValidationError::UnknownCharacter(id))
}

fn available_character(state: &GameState, id: CharacterId) -> Result<&Character, ValidationError> {
    let character = character(state, id)?;
    if !character.is_available() {
        return Err(ValidationError::CharacterUnavailable(id));
    }
    Ok(character)
}

fn tile(state: &GameState, id: TileId) -> Result<&Tile, ValidationError> {
    state.tiles.get(&id).ok_or(ValidationError::UnknownTile(id))
}

fn intact_tile(state: &GameState, id: TileId) -> Result<&Tile, ValidationError> {
    let tile = tile(state, id)?;
    if tile.destroyed {
        return Err(ValidationError::TileDestroyed(id));
    }
    Ok(tile)
}

fn settlement(state: &GameState, id: SettlementId) -> Result<&Settlement, ValidationError> {
    state.settlements.get(&id).ok_or(ValidationError::UnknownSettlement(id))
}

fn free_settlement(state: &GameState, id: SettlementId) -> Result<&Settlement, ValidationError> {
    let settlement = settlement(state, id)?;
    if settlement.control == ControlStatus::Antagonist {
        return Err(ValidationError::SettlementOccupied(id));
    }
    Ok(settlement)
}

fn home_of<'a>(state: &'a GameState, character: &Character) -> Result<&'a Settlement, ValidationError> {
    settlement(state, character.settlement_id)
}

fn at_home(state: &GameState, character: &Character) -> Validation {
    let home = home_of(state, character)?;
    if state.character_tile(character.id) != Some(home.tile_id) {
        return Err(ValidationError::NotAtSettlement(character.id));
    }
    Ok(())
}

fn within(distance: u32, min: u32, range: u32) -> Validation {
    if distance < min || distance > range {
        return Err(ValidationError::OutOfRange { distance, range });
    }
    Ok(())
}

fn distance(state: &GameState, from: TileId, to: TileId) -> Result<u32, ValidationError> {
    state.tile_distance(from, to).ok_or(ValidationError::UnknownTile(to))
}

fn character_tile(state: &GameState, id: CharacterId) -> Result<TileId, ValidationError> {
    state.character_tile(id).ok_or(ValidationError::UnknownCharacter(id))
}

fn alien_budget(state: &GameState, rules: &RulesConfig) -> Validation {
    if state.antagonist.actions_used >= rules.alien_actions_per_turn {
        return Err(ValidationError::NoAlienActions);
    }
    Ok(())
}

fn mothership_distance(state: &GameState, target: TileId) -> Result<u32, ValidationError> {
    let at = state.antagonist.current_tile_id.ok_or(ValidationError::NoMothership)?;
    distance(state, at, target)
}

/// Healing capacity of a character in its home settlement.
pub fn heal_capacity(character: &Character, home: &Settlement, rules: &RulesConfig) -> u32 {
    let base = character.character_type.healing_capacity();
    if base > 0 && home.has_building(BuildingType::Infirmary) {
        base.saturating_add(rules.infirmary_heal_bonus)
    } else {
        base
    }
}

// =============================================================================
// PER-ACTION VALIDATORS
// =============================================================================

fn validate_explore(state: &GameState, character_id: CharacterId, tile_id: TileId) -> Validation {
    available_character(state, character_id)?;
    let target = intact_tile(state, tile_id)?;
    if target.explored {
        return Err(ValidationError::AlreadyExplored(tile_id));
    }
    let from = character_tile(state, character_id)?;
    within(distance(state, from, tile_id)?, 1, 1)
}

fn validate_move(state: &GameState, character_id: CharacterId, tile_id: TileId) -> Validation {
    let character = available_character(state, character_id)?;
    intact_tile(state, tile_id)?;
    let from = character_tile(state, character_id)?;
    within(
        distance(state, from, tile_id)?,
        1,
        character.character_type.movement_range(),
    )
}

fn validate_gather(
    state: &GameState,
    character_id: CharacterId,
    resource: ResourceKind,
    amount: u32,
) -> Validation {
    let character = available_character(state, character_id)?;
    if amount == 0 {
        return Err(ValidationError::ZeroAmount);
    }
    if character.character_type.gather_capacity(resource) == 0 {
        return Err(ValidationError::NoCapacity {
            character_type: character.character_type,
            resource,
        });
    }
    free_settlement(state, character.settlement_id)?;
    if let Some(tile_id) = character.current_tile_id {
        let stocked = tile(state, tile_id)?
            .cache
            .as_ref()
            .is_some_and(|cache| cache.get(resource) > 0);
        if !stocked {
            return Err(ValidationError::CacheEmpty { tile_id, resource });
        }
    }
    Ok(())
}

fn validate_build(state: &GameState, character_id: CharacterId, building: BuildingType) -> Validation {
    let character = available_character(state, character_id)?;
    if !character.character_type.can_build() {
        return Err(ValidationError::CannotBuild(character.character_type));
    }
    at_home(state, character)?;
    let home = free_settlement(state, character.settlement_id)?;
    if home.has_building(building) {
        return Err(ValidationError::AlreadyBuilt(building));
    }
    let cost = building.cost();
    if !home.resources.covers(&cost) {
        return Err(ValidationError::InsufficientResources { needed: cost });
    }
    Ok(())
}

fn validate_heal(
    state: &GameState,
    character_id: CharacterId,
    amount: u32,
    rules: &RulesConfig,
) -> Validation {
    let character = available_character(state, character_id)?;
    if amount == 0 {
        return Err(ValidationError::ZeroAmount);
    }
    let home = free_settlement(state, character.settlement_id)?;
    if heal_capacity(character, home, rules) == 0 {
        return Err(ValidationError::CannotHeal(character.character_type));
    }
    at_home(state, character)?;
    let wounded_members = home
        .members
        .iter()
        .filter_map(|id| state.characters.get(id))
        .any(|c| c.is_wounded);
    if home.wounded == 0 && !wounded_members {
        return Err(ValidationError::NothingToHeal(home.id));
    }
    if home.resources.medicine == 0 {
        return Err(ValidationError::InsufficientResources {
            needed: Resources::single(ResourceKind::Medicine, 1),
        });
    }
    Ok(())
}

fn validate_transfer(
    state: &GameState,
    from: SettlementId,
    to: SettlementId,
    resource: ResourceKind,
    amount: u32,
) -> Validation {
    if from == to {
        return Err(ValidationError::SameSettlement(from));
    }
    if amount == 0 {
        return Err(ValidationError::ZeroAmount);
    }
    let source = free_settlement(state, from)?;
    free_settlement(state, to)?;
    if source.resources.get(resource) < amount {
        return Err(ValidationError::InsufficientResources {
            needed: Resources::single(resource, amount),
        });
    }
    Ok(())
}

fn validate_convert(state: &GameState, settlement_id: SettlementId, recipe: Recipe) -> Validation {
    let settlement = free_settlement(state, settlement_id)?;
    let (input, amount, _, _) = recipe.ratio();
    if settlement.resources.get(input) < amount {
        return Err(ValidationError::InsufficientResources {
            needed: Resources::single(input, amount),
        });
    }
    Ok(())
}

fn validate_attack(state: &GameState, character_id: CharacterId, target: AttackTarget) -> Validation {
    available_character(state, character_id)?;
    if target == AttackTarget::AuxiliaryVessel && !state.antagonist.has_auxiliary_vessel {
        return Err(ValidationError::VesselGone);
    }
    let from = character_tile(state, character_id)?;
    within(mothership_distance(state, from)?, 0, ATTACK_RANGE)
}

fn validate_liberate(state: &GameState, character_id: CharacterId, settlement_id: SettlementId) -> Validation {
    let character = available_character(state, character_id)?;
    if character.character_type != CharacterType::Soldier {
        return Err(ValidationError::NotSoldier);
    }
    let target = settlement(state, settlement_id)?;
    if target.control == ControlStatus::Defender {
        return Err(ValidationError::NotOccupied(settlement_id));
    }
    let at = character_tile(state, character_id)?;
    within(distance(state, at, target.tile_id)?, 0, 0)
}

fn validate_alien_move(state: &GameState, tile_id: TileId) -> Validation {
    intact_tile(state, tile_id)?;
    match state.antagonist.current_tile_id {
        Some(at) => within(distance(state, at, tile_id)?, 1, ALIEN_MOVE_RANGE),
        None => Ok(()),
    }
}

fn validate_control(state: &GameState, settlement_id: SettlementId) -> Validation {
    let target = settlement(state, settlement_id)?;
    if target.control != ControlStatus::Defender {
        return Err(ValidationError::AlreadyControlled(settlement_id));
    }
    if state.antagonist.control_tokens == 0 {
        return Err(ValidationError::NoControlTokens);
    }
    within(mothership_distance(state, target.tile_id)?, 0, CONTROL_RANGE)
}

fn validate_bomb(state: &GameState, tile_id: TileId) -> Validation {
    intact_tile(state, tile_id)?;
    within(mothership_distance(state, tile_id)?, 0, BOMB_RANGE)
}

fn validate_raise_shield(state: &GameState) -> Validation {
    if state.antagonist.shield_level >= MAX_SHIELD_LEVEL {
        return Err(ValidationError::ShieldMaxed);
    }
    Ok(())
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Phases in which an action kind is legal.
pub fn allowed_phases(kind: &ActionKind) -> &'static [Phase] {
    use Phase::*;
    match kind {
        ActionKind::Explore { .. } => &[Exploration],
        ActionKind::Move { .. } | ActionKind::Attack { .. } | ActionKind::Liberate { .. } => &[Movement],
        ActionKind::Gather { .. } => &[ResourceGathering],
        ActionKind::Build { .. } | ActionKind::Heal { .. } => &[ResourceGathering, Trading],
        ActionKind::Transfer { .. } | ActionKind::Convert { .. } => &[Trading],
        ActionKind::AlienMove { .. }
        | ActionKind::Control { .. }
        | ActionKind::Bomb { .. }
        | ActionKind::RaiseShield => &[AntagonistTurn],
        ActionKind::AdvancePhase | ActionKind::EndTurn => &phase::PHASE_ORDER,
    }
}

/// Validate an action against a state.
///
/// Checks run in a fixed order: game over, seat and turn, phase, role, then
/// the action's own preconditions.
pub fn validate_action(state: &GameState, action: &GameAction, rules: &RulesConfig) -> Validation {
    let name = action.kind.name();
    game_not_over(state)?;
    players_turn(state, &action.player_id)?;
    in_phase(state, name, allowed_phases(&action.kind))?;

    match &action.kind {
        ActionKind::AdvancePhase | ActionKind::EndTurn => {
            if !phase::can_advance(state) {
                return Err(ValidationError::CannotAdvance);
            }
            return Ok(());
        }
        kind if kind.is_antagonist_action() => {
            has_role(state, &action.player_id, name, PlayerRole::Antagonist)?;
            alien_budget(state, rules)?;
        }
        _ => has_role(state, &action.player_id, name, PlayerRole::Defender)?,
    }

    match &action.kind {
        ActionKind::Explore { character_id, tile_id } => validate_explore(state, *character_id, *tile_id),
        ActionKind::Move { character_id, tile_id } => validate_move(state, *character_id, *tile_id),
        ActionKind::Gather { character_id, resource, amount } => {
            validate_gather(state, *character_id, *resource, *amount)
        }
        ActionKind::Build { character_id, building } => validate_build(state, *character_id, *building),
        ActionKind::Heal { character_id, amount } => validate_heal(state, *character_id, *amount, rules),
        ActionKind::Transfer { from, to, resource, amount } => {
            validate_transfer(state, *from, *to, *resource, *amount)
        }
        ActionKind::Convert { settlement_id, recipe } => validate_convert(state, *settlement_id, *recipe),
        ActionKind::Attack { character_id, target } => validate_attack(state, *character_id, *target),
        ActionKind::Liberate { character_id, settlement_id } => {
            validate_liberate(state, *character_id, *settlement_id)
        }
        ActionKind::AlienMove { tile_id } => validate_alien_move(state, *tile_id),
        ActionKind::Control { settlement_id } => validate_control(state, *settlement_id),
        ActionKind::Bomb { tile_id } => validate_bomb(state, *tile_id),
        ActionKind::RaiseShield => validate_raise_shield(state),
        ActionKind::AdvancePhase | ActionKind::EndTurn => Ok(()),
    }
}

/// Every action the current player could submit right now, in a stable
/// order with `AdvancePhase` and `EndTurn` last. Quantities are fixed
/// (gather at full capacity, heal two, transfer one), so this is a
/// representative set rather than every parameterisation. Used by scripted
/// controllers and simulation harnesses.
pub fn legal_actions(state: &GameState, rules: &RulesConfig) -> Vec<GameAction> {
    let mut candidates = Vec::new();
    let characters: Vec<&Character> = state.characters.values().collect();

    match state.phase {
        Phase::Exploration => {
            for c in &characters {
                for tile in state.tiles.keys() {
                    candidates.push(ActionKind::Explore { character_id: c.id, tile_id: *tile });
                }
            }
        }
        Phase::Movement => {
            for c in &characters {
                for target in [AttackTarget::AuxiliaryVessel, AttackTarget::Mothership] {
                    candidates.push(ActionKind::Attack { character_id: c.id, target });
                }
                for settlement in state.settlements.keys() {
                    candidates.push(ActionKind::Liberate { character_id: c.id, settlement_id: *settlement });
                }
                for tile in state.tiles.keys() {
                    candidates.push(ActionKind::Move { character_id: c.id, tile_id: *tile });
                }
            }
        }
        Phase::ResourceGathering | Phase::Trading => {
            for c in &characters {
                candidates.push(ActionKind::Heal { character_id: c.id, amount: 2 });
                for building in BuildingType::ALL {
                    candidates.push(ActionKind::Build { character_id: c.id, building });
                }
                if state.phase == Phase::ResourceGathering {
                    for resource in ResourceKind::ALL {
                        let amount = c.character_type.gather_capacity(resource);
                        candidates.push(ActionKind::Gather { character_id: c.id, resource, amount });
                    }
                }
            }
            if state.phase == Phase::Trading {
                for settlement in state.settlements.keys() {
                    for recipe in [Recipe::Scrap, Recipe::Rations, Recipe::Salvage] {
                        candidates.push(ActionKind::Convert { settlement_id: *settlement, recipe });
                    }
                    for to in state.settlements.keys() {
                        for resource in ResourceKind::ALL {
                            candidates.push(ActionKind::Transfer { from: *settlement, to: *to, resource, amount: 1 });
                        }
                    }
                }
            }
        }
        Phase::AntagonistTurn => {
            candidates.push(ActionKind::RaiseShield);
            for settlement in state.settlements.keys() {
                candidates.push(ActionKind::Control { settlement_id: *settlement });
            }
            for tile in state.tiles.keys() {
                candidates.push(ActionKind::Bomb { tile_id: *tile });
            }
            for tile in state.tiles.keys() {
                candidates.push(ActionKind::AlienMove { tile_id: *tile });
            }
        }
        Phase::Preparation | Phase::RoleCheck | Phase::EndGameCheck => {}
    }
    candidates.push(ActionKind::AdvancePhase);
    candidates.push(ActionKind::EndTurn);

    candidates
        .into_iter()
        .map(|kind| GameAction::new(state.current_player_id.clone(), kind))
        .filter(|action| validate_action(state, action, rules).is_ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::factory::{create_initial_state, GameConfig};

    fn setup() -> (GameState, RulesConfig) {
        let state =
            create_initial_state(&GameConfig::new(vec!["Ada".into(), "Zed".into()]).with_seed(12345))
                .unwrap();
        (state, RulesConfig::default())
    }

    fn defender(state: &GameState) -> PlayerId {
        state.players[0].id.clone()
    }

    fn antagonist(state: &GameState) -> PlayerId {
        state.players[1].id.clone()
    }

    fn member(state: &GameState, settlement: u32, character_type: CharacterType) -> CharacterId {
        state.settlements[&SettlementId(settlement)]
            .members
            .iter()
            .copied()
            .find(|id| state.characters[id].character_type == character_type)
            .unwrap()
    }

    fn neighbour(state: &GameState, settlement: u32) -> TileId {
        let home = state.settlements[&SettlementId(settlement)].tile_id;
        state
            .tiles
            .values()
            .find(|t| state.tile_distance(home, t.id) == Some(1))
            .unwrap()
            .id
    }

    #[test]
    fn test_base_check_order() {
        let (mut state, rules) = setup();
        let move_action = |player: PlayerId| {
            GameAction::new(player, ActionKind::Move { character_id: CharacterId(0), tile_id: TileId(0) })
        };

        assert!(matches!(
            validate_action(&state, &move_action(antagonist(&state)), &rules),
            Err(ValidationError::NotYourTurn { .. })
        ));
        assert!(matches!(
            validate_action(&state, &move_action(PlayerId::new("ghost")), &rules),
            Err(ValidationError::UnknownPlayer(_))
        ));
        assert!(matches!(
            validate_action(&state, &move_action(defender(&state)), &rules),
            Err(ValidationError::WrongPhase { action: "MOVE", phase: Phase::Preparation })
        ));

        state.game_over = true;
        assert_eq!(
            validate_action(&state, &move_action(antagonist(&state)), &rules),
            Err(ValidationError::GameOver)
        );
    }

    #[test]
    fn test_move_range() {
        let (mut state, rules) = setup();
        state.phase = Phase::Movement;
        let leader = member(&state, 0, CharacterType::Leader);
        let near = neighbour(&state, 0);
        let ok = GameAction::new(defender(&state), ActionKind::Move { character_id: leader, tile_id: near });
        assert_eq!(validate_action(&state, &ok, &rules), Ok(()));

        let home = state.settlements[&SettlementId(0)].tile_id;
        let far = state
            .tiles
            .values()
            .find(|t| state.tile_distance(home, t.id) == Some(3))
            .unwrap()
            .id;
        let too_far = GameAction::new(defender(&state), ActionKind::Move { character_id: leader, tile_id: far });
        assert_eq!(
            validate_action(&state, &too_far, &rules),
            Err(ValidationError::OutOfRange { distance: 3, range: 1 })
        );

        state.tiles.get_mut(&near).unwrap().destroyed = true;
        assert_eq!(validate_action(&state, &ok, &rules), Err(ValidationError::TileDestroyed(near)));
    }

    #[test]
    fn test_gather_capacity() {
        let (mut state, rules) = setup();
        state.phase = Phase::ResourceGathering;
        let doctor = member(&state, 0, CharacterType::Doctor);
        let action = GameAction::new(
            defender(&state),
            ActionKind::Gather { character_id: doctor, resource: ResourceKind::Food, amount: 2 },
        );
        let err = validate_action(&state, &action, &rules).unwrap_err();
        assert!(err.to_string().contains("capacity"));
    }

    #[test]
    fn test_build_checks() {
        let (mut state, rules) = setup();
        state.phase = Phase::Trading;
        let engineer = member(&state, 0, CharacterType::Engineer);
        let soldier = member(&state, 0, CharacterType::Soldier);
        let player = defender(&state);
        let build = |c, b| GameAction::new(player.clone(), ActionKind::Build { character_id: c, building: b });

        assert_eq!(validate_action(&state, &build(engineer, BuildingType::Barricade), &rules), Ok(()));
        assert_eq!(
            validate_action(&state, &build(soldier, BuildingType::Barricade), &rules),
            Err(ValidationError::CannotBuild(CharacterType::Soldier))
        );
        assert!(matches!(
            validate_action(&state, &build(engineer, BuildingType::Shuttle), &rules),
            Err(ValidationError::InsufficientResources { .. })
        ));

        state
            .settlements
            .get_mut(&SettlementId(0))
            .unwrap()
            .buildings
            .push(BuildingType::Barricade);
        assert_eq!(
            validate_action(&state, &build(engineer, BuildingType::Barricade), &rules),
            Err(ValidationError::AlreadyBuilt(BuildingType::Barricade))
        );
    }

    #[test]
    fn test_used_character_rejected() {
        let (mut state, rules) = setup();
        state.phase = Phase::Movement;
        let leader = member(&state, 0, CharacterType::Leader);
        state.characters.get_mut(&leader).unwrap().is_used = true;
        let action = GameAction::new(
            defender(&state),
            ActionKind::Move { character_id: leader, tile_id: neighbour(&state, 0) },
        );
        assert_eq!(
            validate_action(&state, &action, &rules),
            Err(ValidationError::CharacterUnavailable(leader))
        );
    }

    #[test]
    fn test_antagonist_actions() {
        let (mut state, rules) = setup();
        state.phase = Phase::AntagonistTurn;
        state.current_player_id = antagonist(&state);
        let raise = GameAction::new(antagonist(&state), ActionKind::RaiseShield);
        assert_eq!(validate_action(&state, &raise, &rules), Ok(()));

        state.antagonist.actions_used = rules.alien_actions_per_turn;
        assert_eq!(validate_action(&state, &raise, &rules), Err(ValidationError::NoAlienActions));

        state.antagonist.actions_used = 0;
        state.antagonist.shield_level = MAX_SHIELD_LEVEL;
        assert_eq!(validate_action(&state, &raise, &rules), Err(ValidationError::ShieldMaxed));
    }

    #[test]
    fn test_defender_cannot_use_alien_actions_out_of_phase() {
        let (mut state, rules) = setup();
        state.phase = Phase::Movement;
        let action = GameAction::new(defender(&state), ActionKind::RaiseShield);
        assert!(matches!(
            validate_action(&state, &action, &rules),
            Err(ValidationError::WrongPhase { .. })
        ));
    }

    #[test]
    fn test_transfer_checks() {
        let (mut state, rules) = setup();
        state.phase = Phase::Trading;
        let player = defender(&state);
        let transfer = |from, to, amount| {
            GameAction::new(
                player.clone(),
                ActionKind::Transfer {
                    from: SettlementId(from),
                    to: SettlementId(to),
                    resource: ResourceKind::Food,
                    amount,
                },
            )
        };
        assert_eq!(validate_action(&state, &transfer(0, 1, 5), &rules), Ok(()));
        assert_eq!(
            validate_action(&state, &transfer(0, 0, 5), &rules),
            Err(ValidationError::SameSettlement(SettlementId(0)))
        );
        assert!(matches!(
            validate_action(&state, &transfer(0, 1, 50), &rules),
            Err(ValidationError::InsufficientResources { .. })
        ));

        state.settlements.get_mut(&SettlementId(1)).unwrap().control = ControlStatus::Antagonist;
        assert_eq!(
            validate_action(&state, &transfer(0, 1, 5), &rules),
            Err(ValidationError::SettlementOccupied(SettlementId(1)))
        );
    }

    #[test]
    fn test_advance_blocked_only_when_finished() {
        let (mut state, rules) = setup();
        let advance = GameAction::new(defender(&state), ActionKind::AdvancePhase);
        assert_eq!(validate_action(&state, &advance, &rules), Ok(()));
        state.phase = Phase::EndGameCheck;
        state.game_over = true;
        assert_eq!(validate_action(&state, &advance, &rules), Err(ValidationError::GameOver));
    }

    #[test]
    fn test_legal_actions_are_valid_and_end_with_phase_control() {
        let (mut state, rules) = setup();
        let preparation = legal_actions(&state, &rules);
        assert_eq!(preparation.len(), 2);
        assert_eq!(preparation[0].kind, ActionKind::AdvancePhase);

        state.phase = Phase::Movement;
        let movement = legal_actions(&state, &rules);
        assert!(movement.len() > 2);
        assert!(movement.iter().all(|a| validate_action(&state, a, &rules).is_ok()));
        assert!(movement.iter().any(|a| matches!(a.kind, ActionKind::Move { .. })));
        assert_eq!(movement.last().map(|a| &a.kind), Some(&ActionKind::EndTurn));
    }

    #[test]
    fn test_legal_actions_for_antagonist() {
        let (mut state, rules) = setup();
        state.phase = Phase::AntagonistTurn;
        state.current_player_id = antagonist(&state);
        let actions = legal_actions(&state, &rules);
        assert_eq!(actions[0].kind, ActionKind::RaiseShield);
        assert!(actions.iter().all(|a| a.player_id == antagonist(&state)));
        assert!(actions.iter().any(|a| matches!(a.kind, ActionKind::Bomb { .. })));
    }
}
