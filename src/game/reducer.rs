//! Action Reducer
//!
//! `(state, action) -> (state', events)`. The input state is never touched:
//! the reducer validates, clones, and lets one handler mutate the clone.

use thiserror::Error;

use crate::core::rng::{RandomSource, RngError};
use crate::game::action::{ActionKind, AttackTarget, GameAction, Recipe};
use crate::game::constants::{self, AUX_VESSEL_HULL};
use crate::game::dice::{roll_value, DiceType};
use crate::game::events::{GameEvent, GameEventData};
use crate::game::phase;
use crate::game::rules::{self, Attacker, RulesConfig};
use crate::game::state::{
    BuildingType, Character, CharacterId, ControlStatus, GameState, ResourceKind, Resources,
    Settlement, SettlementId, TileId,
};
use crate::game::validate::{heal_capacity, validate_action, ValidationError};

/// Why a reduction failed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ReduceError {
    /// The action failed validation.
    #[error(transparent)]
    Rejected(#[from] ValidationError),

    /// The action validated but its handler hit an impossible state.
    #[error("handler fault: {0}")]
    Fault(String),
}

impl From<RngError> for ReduceError {
    fn from(e: RngError) -> Self {
        ReduceError::Fault(e.to_string())
    }
}

/// A successful reduction.
#[derive(Clone, Debug)]
pub struct Transition {
    /// The new state.
    pub state: GameState,
    /// What happened, in order.
    pub events: Vec<GameEvent>,
}

type HandlerResult = Result<(), ReduceError>;

/// Scratch context shared by handlers.
struct Ctx<'a> {
    state: GameState,
    rules: &'a RulesConfig,
    rng: &'a mut dyn RandomSource,
    events: Vec<GameEvent>,
}

impl Ctx<'_> {
    fn emit(&mut self, data: GameEventData) {
        self.events.push(GameEvent::new(self.state.turn, self.state.phase, data));
    }

    fn character_mut(&mut self, id: CharacterId) -> Result<&mut Character, ReduceError> {
        self.state
            .characters
            .get_mut(&id)
            .ok_or_else(|| ReduceError::Fault(format!("{id} vanished")))
    }

    fn settlement_mut(&mut self, id: SettlementId) -> Result<&mut Settlement, ReduceError> {
        self.state
            .settlements
            .get_mut(&id)
            .ok_or_else(|| ReduceError::Fault(format!("{id} vanished")))
    }

    fn character(&self, id: CharacterId) -> Result<&Character, ReduceError> {
        self.state
            .characters
            .get(&id)
            .ok_or_else(|| ReduceError::Fault(format!("{id} vanished")))
    }

    fn tile_of(&self, id: CharacterId) -> Result<TileId, ReduceError> {
        self.state
            .character_tile(id)
            .ok_or_else(|| ReduceError::Fault(format!("{id} has no position")))
    }

    fn mark_used(&mut self, id: CharacterId) -> HandlerResult {
        self.character_mut(id)?.is_used = true;
        Ok(())
    }

    fn roll(&mut self, dice_type: DiceType) -> Result<u32, ReduceError> {
        Ok(roll_value(dice_type, &mut *self.rng)?)
    }
}

/// Validate and apply an action.
///
/// The serialized action is appended to the turn log before dispatch, so an
/// action that wraps the turn is logged into the turn it closed and then
/// cleared with it.
pub fn reduce_action(
    state: &GameState,
    action: &GameAction,
    rules: &RulesConfig,
    rng: &mut dyn RandomSource,
) -> Result<Transition, ReduceError> {
    validate_action(state, action, rules)?;

    let mut ctx = Ctx {
        state: state.clone(),
        rules,
        rng,
        events: Vec::new(),
    };
    let logged = action
        .to_json()
        .map_err(|e| ReduceError::Fault(format!("action log: {e}")))?;
    ctx.state.actions_this_turn.push(logged);

    match &action.kind {
        ActionKind::Explore { character_id, tile_id } => explore(&mut ctx, *character_id, *tile_id)?,
        ActionKind::Move { character_id, tile_id } => move_character(&mut ctx, *character_id, *tile_id)?,
        ActionKind::Gather { character_id, resource, amount } => {
            gather(&mut ctx, *character_id, *resource, *amount)?
        }
        ActionKind::Build { character_id, building } => build(&mut ctx, *character_id, *building)?,
        ActionKind::Heal { character_id, amount } => heal(&mut ctx, *character_id, *amount)?,
        ActionKind::Transfer { from, to, resource, amount } => {
            transfer(&mut ctx, *from, *to, *resource, *amount)?
        }
        ActionKind::Convert { settlement_id, recipe } => convert(&mut ctx, *settlement_id, *recipe)?,
        ActionKind::Attack { character_id, target } => attack(&mut ctx, *character_id, *target)?,
        ActionKind::Liberate { character_id, settlement_id } => {
            liberate(&mut ctx, *character_id, *settlement_id)?
        }
        ActionKind::AlienMove { tile_id } => alien_move(&mut ctx, *tile_id)?,
        ActionKind::Control { settlement_id } => control(&mut ctx, *settlement_id)?,
        ActionKind::Bomb { tile_id } => bomb(&mut ctx, *tile_id)?,
        ActionKind::RaiseShield => raise_shield(&mut ctx)?,
        ActionKind::AdvancePhase => {
            let events = phase::advance(&mut ctx.state, ctx.rules);
            ctx.events.extend(events);
        }
        ActionKind::EndTurn => {
            let events = phase::end_turn(&mut ctx.state, ctx.rules);
            ctx.events.extend(events);
        }
    }

    Ok(Transition { state: ctx.state, events: ctx.events })
}

// =============================================================================
// DEFENDER HANDLERS
// =============================================================================

fn explore(ctx: &mut Ctx, character_id: CharacterId, tile_id: TileId) -> HandlerResult {
    let value = ctx.roll(DiceType::Exploration)?;
    let tile = ctx
        .state
        .tiles
        .get_mut(&tile_id)
        .ok_or_else(|| ReduceError::Fault(format!("{tile_id} vanished")))?;
    tile.explored = true;

    let found = match constants::cache_bounds(tile.tile_type) {
        Some([(kind, _, _), _]) if value > 0 => {
            tile.cache.get_or_insert_with(Default::default).add(kind, value);
            Some((kind, value))
        }
        _ => None,
    };

    ctx.mark_used(character_id)?;
    ctx.emit(GameEventData::TileExplored { character_id, tile_id, found });
    Ok(())
}

fn move_character(ctx: &mut Ctx, character_id: CharacterId, tile_id: TileId) -> HandlerResult {
    let from = ctx.tile_of(character_id)?;
    let home_tile = {
        let home = ctx.character(character_id)?.settlement_id;
        ctx.settlement_mut(home)?.tile_id
    };

    let character = ctx.character_mut(character_id)?;
    character.current_tile_id = (tile_id != home_tile).then_some(tile_id);
    character.is_used = true;

    ctx.emit(GameEventData::CharacterMoved { character_id, from, to: tile_id });
    Ok(())
}

/// At home a character works the settlement's own land for its full
/// capacity. Deployed, it carries out what the tile's cache holds, up to the
/// same capacity.
fn gather(ctx: &mut Ctx, character_id: CharacterId, resource: ResourceKind, amount: u32) -> HandlerResult {
    let (character_type, home, deployed_at) = {
        let c = ctx.character(character_id)?;
        (c.character_type, c.settlement_id, c.current_tile_id)
    };
    let capacity = amount.min(character_type.gather_capacity(resource));

    let gained = match deployed_at {
        Some(tile_id) => {
            let tile = ctx
                .state
                .tiles
                .get_mut(&tile_id)
                .ok_or_else(|| ReduceError::Fault(format!("{tile_id} vanished")))?;
            let taken = tile.cache.as_mut().map_or(0, |cache| cache.take(resource, capacity));
            if tile.cache.as_ref().is_some_and(Resources::is_empty) {
                tile.cache = None;
            }
            taken
        }
        None => capacity,
    };

    ctx.settlement_mut(home)?.resources.add(resource, gained);
    ctx.mark_used(character_id)?;
    ctx.emit(GameEventData::ResourcesGathered {
        character_id,
        settlement_id: home,
        resource,
        amount: gained,
        from_tile: deployed_at,
    });
    Ok(())
}

fn build(ctx: &mut Ctx, character_id: CharacterId, building: BuildingType) -> HandlerResult {
    let home = ctx.character(character_id)?.settlement_id;
    let settlement = ctx.settlement_mut(home)?;
    settlement.resources.subtract(&building.cost());
    settlement.buildings.push(building);
    let tile_id = settlement.tile_id;

    if let Some(tile) = ctx.state.tiles.get_mut(&tile_id) {
        tile.building = Some(building);
    }
    ctx.mark_used(character_id)?;
    ctx.emit(GameEventData::BuildingConstructed { settlement_id: home, building });
    Ok(())
}

fn heal(ctx: &mut Ctx, healer_id: CharacterId, amount: u32) -> HandlerResult {
    let home_id = ctx.character(healer_id)?.settlement_id;
    let (mut budget, control, members) = {
        let healer = ctx.character(healer_id)?;
        let home = ctx
            .state
            .settlements
            .get(&home_id)
            .ok_or_else(|| ReduceError::Fault(format!("{home_id} vanished")))?;
        let budget = amount
            .min(heal_capacity(healer, home, ctx.rules))
            .min(home.resources.medicine);
        (budget, home.control, home.members.clone())
    };
    let medicine_used = budget;

    let mut characters = Vec::new();
    for id in members {
        if budget == 0 {
            break;
        }
        let character = ctx.character_mut(id)?;
        if character.is_wounded {
            character.is_wounded = false;
            character.can_act = rules::derive_can_act(character, control);
            characters.push(id);
            budget -= 1;
        }
    }

    let settlement = ctx.settlement_mut(home_id)?;
    let population = budget.min(settlement.wounded);
    settlement.wounded -= population;
    settlement.population = settlement.population.saturating_add(population);
    let medicine_used = medicine_used - (budget - population);
    settlement.resources.take(ResourceKind::Medicine, medicine_used);

    ctx.mark_used(healer_id)?;
    ctx.emit(GameEventData::WoundedHealed {
        healer_id,
        settlement_id: home_id,
        characters,
        population,
        medicine_used,
    });
    Ok(())
}

fn transfer(
    ctx: &mut Ctx,
    from: SettlementId,
    to: SettlementId,
    resource: ResourceKind,
    amount: u32,
) -> HandlerResult {
    let moved = ctx.settlement_mut(from)?.resources.take(resource, amount);
    ctx.settlement_mut(to)?.resources.add(resource, moved);
    ctx.emit(GameEventData::ResourcesTransferred { from, to, resource, amount: moved });
    Ok(())
}

fn convert(ctx: &mut Ctx, settlement_id: SettlementId, recipe: Recipe) -> HandlerResult {
    let (input, cost, output, yields) = recipe.ratio();
    let settlement = ctx.settlement_mut(settlement_id)?;
    let bonus = u32::from(settlement.has_building(BuildingType::Workshop));
    settlement.resources.take(input, cost);
    let produced = yields + bonus;
    settlement.resources.add(output, produced);
    ctx.emit(GameEventData::ResourcesConverted { settlement_id, recipe, produced });
    Ok(())
}

fn attack(ctx: &mut Ctx, character_id: CharacterId, target: AttackTarget) -> HandlerResult {
    let character_type = ctx.character(character_id)?.character_type;
    let roll = ctx.roll(DiceType::D6)?;
    let damage = rules::combat_damage(ctx.rules, Attacker::Character(character_type), roll, false);

    let (absorbed, hull_damage) = match target {
        AttackTarget::Mothership => {
            let antagonist = &mut ctx.state.antagonist;
            let hit = rules::apply_damage(antagonist.mothership_shield, damage);
            let absorbed = antagonist.mothership_shield - hit.new_shield;
            antagonist.mothership_shield = hit.new_shield;
            antagonist.mothership_health = antagonist.mothership_health.saturating_sub(hit.overflow);
            (absorbed, hit.overflow)
        }
        AttackTarget::AuxiliaryVessel => (0, damage),
    };

    ctx.emit(GameEventData::AttackResolved {
        character_id,
        target,
        roll,
        damage,
        absorbed,
        hull_damage,
    });

    if target == AttackTarget::AuxiliaryVessel && damage >= AUX_VESSEL_HULL {
        ctx.state.antagonist.has_auxiliary_vessel = false;
        ctx.emit(GameEventData::AuxiliaryVesselDestroyed { character_id });
    }

    let character = ctx.character_mut(character_id)?;
    character.is_used = true;
    if roll == 1 {
        character.is_wounded = true;
        character.can_act = false;
        ctx.emit(GameEventData::CharacterWounded { character_id });
    }
    Ok(())
}

fn liberate(ctx: &mut Ctx, character_id: CharacterId, settlement_id: SettlementId) -> HandlerResult {
    let state = &mut ctx.state;
    let settlement = state
        .settlements
        .get_mut(&settlement_id)
        .ok_or_else(|| ReduceError::Fault(format!("{settlement_id} vanished")))?;
    let from = rules::set_control(settlement, &mut state.characters, ControlStatus::Defender);

    ctx.mark_used(character_id)?;
    ctx.emit(GameEventData::ControlChanged { settlement_id, from, to: ControlStatus::Defender });
    Ok(())
}

// =============================================================================
// ANTAGONIST HANDLERS
// =============================================================================

fn alien_move(ctx: &mut Ctx, tile_id: TileId) -> HandlerResult {
    let antagonist = &mut ctx.state.antagonist;
    let from = antagonist.current_tile_id.replace(tile_id);
    antagonist.actions_used += 1;
    ctx.emit(GameEventData::MothershipMoved { from, to: tile_id });
    Ok(())
}

fn control(ctx: &mut Ctx, settlement_id: SettlementId) -> HandlerResult {
    let tile_id = ctx.settlement_mut(settlement_id)?.tile_id;
    let to = if rules::soldier_present(&ctx.state, tile_id) {
        ControlStatus::Contested
    } else {
        ControlStatus::Antagonist
    };

    let state = &mut ctx.state;
    state.antagonist.control_tokens -= 1;
    state.antagonist.actions_used += 1;
    let settlement = state
        .settlements
        .get_mut(&settlement_id)
        .ok_or_else(|| ReduceError::Fault(format!("{settlement_id} vanished")))?;
    let from = rules::set_control(settlement, &mut state.characters, to);

    ctx.emit(GameEventData::ControlChanged { settlement_id, from, to });
    Ok(())
}

fn bomb(ctx: &mut Ctx, tile_id: TileId) -> HandlerResult {
    let roll = ctx.roll(DiceType::D6)?;
    ctx.state.antagonist.actions_used += 1;

    let target = ctx.state.settlement_on_tile(tile_id).map(|s| (s.id, s.is_defended()));
    let (damage, killed, wounded, destroyed) = match target {
        Some((settlement_id, defended)) => {
            let damage = rules::combat_damage(ctx.rules, Attacker::Mothership, roll, defended);
            let (killed, wounded) = rules::bombard_settlement(ctx.settlement_mut(settlement_id)?, damage);
            (damage, killed, wounded, false)
        }
        None => {
            let damage = rules::combat_damage(ctx.rules, Attacker::Mothership, roll, false);
            let destroyed = damage > 0;
            if destroyed {
                if let Some(tile) = ctx.state.tiles.get_mut(&tile_id) {
                    tile.destroyed = true;
                    tile.cache = None;
                }
                // Anyone caught in the blast is wounded and carried home.
                let caught: Vec<CharacterId> = ctx
                    .state
                    .characters
                    .values()
                    .filter(|c| c.current_tile_id == Some(tile_id))
                    .map(|c| c.id)
                    .collect();
                for id in caught {
                    let character = ctx.character_mut(id)?;
                    character.current_tile_id = None;
                    character.is_wounded = true;
                    character.can_act = false;
                    ctx.emit(GameEventData::CharacterWounded { character_id: id });
                }
            }
            (damage, 0, 0, destroyed)
        }
    };

    ctx.emit(GameEventData::TileBombed { tile_id, roll, damage, killed, wounded, destroyed });
    Ok(())
}

fn raise_shield(ctx: &mut Ctx) -> HandlerResult {
    let antagonist = &mut ctx.state.antagonist;
    antagonist.shield_level += 1;
    antagonist.actions_used += 1;
    let level = antagonist.shield_level;
    ctx.emit(GameEventData::ShieldRaised { level });
    Ok(())
}
