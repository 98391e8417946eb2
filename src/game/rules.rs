//! Game Rules
//!
//! Survival, combat and victory mechanics. Functions take the narrowest slice
//! of state they need and return what happened; the reducer and phase machine
//! decide which events to emit.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game::constants::{MAX_CONTROL_TOKENS, MAX_MOTHERSHIP_SHIELD};
use crate::game::state::{
    AntagonistState, BuildingType, Character, CharacterId, CharacterType, ControlStatus,
    GameState, PlayerRole, Settlement, TileId, VictoryCondition,
};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Who is dealing damage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attacker {
    /// A defender character of the given type.
    Character(CharacterType),
    /// Mothership bombardment.
    Mothership,
}

/// One row of the combat table: damage per D6 face (index 0 = face 1).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatRow {
    /// Attacker this row applies to.
    pub attacker: Attacker,
    /// Damage for faces 1..=6.
    pub damage: [u32; 6],
}

/// Damage lookup table. Attackers without a row deal no damage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatTable {
    /// Rows, first match wins.
    pub rows: Vec<CombatRow>,
}

impl CombatTable {
    /// Base damage before defensive reduction. Faces outside 1..=6 deal none.
    pub fn lookup(&self, attacker: Attacker, face: u32) -> u32 {
        let Some(row) = self.rows.iter().find(|r| r.attacker == attacker) else {
            return 0;
        };
        match face {
            1..=6 => row.damage[(face - 1) as usize],
            _ => 0,
        }
    }
}

impl Default for CombatTable {
    fn default() -> Self {
        let row = |attacker, damage| CombatRow { attacker, damage };
        Self {
            rows: vec![
                row(Attacker::Character(CharacterType::Soldier), [0, 1, 2, 2, 3, 4]),
                row(Attacker::Character(CharacterType::Leader), [0, 0, 1, 1, 2, 2]),
                row(Attacker::Character(CharacterType::Engineer), [0, 0, 1, 1, 2, 2]),
                row(Attacker::Character(CharacterType::Scavenger), [0, 0, 1, 1, 1, 2]),
                row(Attacker::Character(CharacterType::Doctor), [0, 0, 0, 1, 1, 1]),
                row(Attacker::Mothership, [1, 2, 2, 3, 4, 5]),
            ],
        }
    }
}

/// Tunable mechanics for a match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Food each population unit (healthy or wounded) eats per turn.
    pub food_per_person: u32,
    /// Deaths per unit of food shortfall, in per-mille.
    pub starvation_death_permille: u32,
    /// Untreated wounded that die per turn, in per-mille.
    pub wounded_death_permille: u32,
    /// Damage lookup.
    pub combat: CombatTable,
    /// Damage removed when the target has a defensive building.
    pub defensive_reduction: u32,
    /// Antagonist actions per alien turn.
    pub alien_actions_per_turn: u32,
    /// Control tokens gained at the start of each alien turn.
    pub control_token_income: u32,
    /// Consecutive end-game checks a beacon must be held.
    pub beacon_turns_required: u32,
    /// Free population required to escape.
    pub escape_min_survivors: u32,
    /// Extra healing capacity an infirmary grants.
    pub infirmary_heal_bonus: u32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            food_per_person: 1,
            starvation_death_permille: 500,
            wounded_death_permille: 250,
            combat: CombatTable::default(),
            defensive_reduction: 1,
            alien_actions_per_turn: 2,
            control_token_income: 1,
            beacon_turns_required: 3,
            escape_min_survivors: 8,
            infirmary_heal_bonus: 1,
        }
    }
}

fn permille(amount: u32, ratio: u32) -> u32 {
    (u64::from(amount) * u64::from(ratio) / 1000) as u32
}

// =============================================================================
// SURVIVAL
// =============================================================================

/// Outcome of feeding a settlement with a shortfall.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Starvation {
    /// Food missing.
    pub shortfall: u32,
    /// Population lost.
    pub deaths: u32,
}

/// Feed a settlement. Returns `None` when nobody went hungry.
///
/// Deaths come out of the healthy population first, then the wounded.
pub fn consume_food(settlement: &mut Settlement, rules: &RulesConfig) -> Option<Starvation> {
    let mouths = settlement.headcount();
    let required = mouths.saturating_mul(rules.food_per_person);
    let eaten = settlement.resources.food.min(required);
    settlement.resources.food -= eaten;

    let shortfall = required - eaten;
    if shortfall == 0 {
        return None;
    }

    let deaths = permille(shortfall, rules.starvation_death_permille).min(mouths);
    let from_healthy = deaths.min(settlement.population);
    settlement.population -= from_healthy;
    settlement.wounded -= deaths - from_healthy;
    Some(Starvation { shortfall, deaths })
}

/// Wounded without medicine may die. Medicine is not consumed here; only
/// healing spends it. Returns deaths.
pub fn care_for_wounded(settlement: &mut Settlement, rules: &RulesConfig) -> u32 {
    let untreated = settlement.wounded.saturating_sub(settlement.resources.medicine);
    let deaths = permille(untreated, rules.wounded_death_permille);
    settlement.wounded -= deaths;
    deaths
}

/// Split bombardment damage into killed and wounded population.
pub fn bombard_settlement(settlement: &mut Settlement, damage: u32) -> (u32, u32) {
    let killed = (damage / 2).min(settlement.population);
    settlement.population -= killed;
    let wounded = (damage - damage / 2).min(settlement.population);
    settlement.population -= wounded;
    settlement.wounded = settlement.wounded.saturating_add(wounded);
    (killed, wounded)
}

// =============================================================================
// CONTROL
// =============================================================================

/// Whether a character may act given its home settlement's control.
pub fn derive_can_act(character: &Character, control: ControlStatus) -> bool {
    !character.is_wounded && control != ControlStatus::Antagonist
}

/// Change a settlement's control and re-derive its members' `can_act`.
/// Returns the previous status.
pub fn set_control(
    settlement: &mut Settlement,
    characters: &mut BTreeMap<CharacterId, Character>,
    control: ControlStatus,
) -> ControlStatus {
    let previous = settlement.control;
    settlement.control = control;
    for id in &settlement.members {
        if let Some(character) = characters.get_mut(id) {
            character.can_act = derive_can_act(character, control);
        }
    }
    previous
}

/// Whether a healthy soldier stands on a tile.
pub fn soldier_present(state: &GameState, tile_id: TileId) -> bool {
    state.characters.values().any(|c| {
        c.character_type == CharacterType::Soldier
            && !c.is_wounded
            && state.character_tile(c.id) == Some(tile_id)
    })
}

/// Clear per-phase flags and re-derive `can_act` for every character.
pub fn turn_start_reset(state: &mut GameState) {
    let controls: BTreeMap<_, _> = state
        .settlements
        .values()
        .map(|s| (s.id, s.control))
        .collect();
    for character in state.characters.values_mut() {
        let control = controls
            .get(&character.settlement_id)
            .copied()
            .unwrap_or(ControlStatus::Defender);
        character.is_used = false;
        character.can_act = derive_can_act(character, control);
    }
}

/// Let every character act again in the new phase.
pub fn reset_used(characters: &mut BTreeMap<CharacterId, Character>) {
    for character in characters.values_mut() {
        character.is_used = false;
    }
}

// =============================================================================
// COMBAT
// =============================================================================

/// Damage dealt by one attack after defensive reduction.
pub fn combat_damage(rules: &RulesConfig, attacker: Attacker, face: u32, defended: bool) -> u32 {
    let base = rules.combat.lookup(attacker, face);
    if defended {
        base.saturating_sub(rules.defensive_reduction)
    } else {
        base
    }
}

/// Result of hitting a shield.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DamageResult {
    /// Shield left.
    pub new_shield: u32,
    /// Damage that passed through.
    pub overflow: u32,
}

/// Shield absorbs first; the remainder overflows to the caller.
pub fn apply_damage(shield: u32, damage: u32) -> DamageResult {
    let absorbed = shield.min(damage);
    DamageResult {
        new_shield: shield - absorbed,
        overflow: damage - absorbed,
    }
}

/// Start-of-alien-turn upkeep: reset the action counter, regenerate the
/// shield and pay out control-token income.
pub fn antagonist_upkeep(antagonist: &mut AntagonistState, rules: &RulesConfig) {
    antagonist.actions_used = 0;
    antagonist.mothership_shield =
        antagonist.mothership_shield.saturating_add(antagonist.shield_level).min(MAX_MOTHERSHIP_SHIELD);
    antagonist.control_tokens =
        antagonist.control_tokens.saturating_add(rules.control_token_income).min(MAX_CONTROL_TOKENS);
}

// =============================================================================
// VICTORY
// =============================================================================

/// Mothership hull is gone.
pub fn mothership_destroyed(antagonist: &AntagonistState) -> bool {
    antagonist.mothership_health == 0
}

/// A defender-held shuttle, enough survivors and no escort left.
pub fn escape_ready(state: &GameState, rules: &RulesConfig) -> bool {
    let has_shuttle = state
        .settlements
        .values()
        .any(|s| s.control == ControlStatus::Defender && s.has_building(BuildingType::Shuttle));
    has_shuttle
        && !state.antagonist.has_auxiliary_vessel
        && state.free_population() >= rules.escape_min_survivors
}

/// A defender-held settlement has a rescue beacon.
pub fn beacon_active(state: &GameState) -> bool {
    state.settlements.values().any(|s| {
        s.control == ControlStatus::Defender && s.has_building(BuildingType::RescueBeacon)
    })
}

/// Beacon held for the required streak.
pub fn rescue_arrived(beacon_turns: u32, rules: &RulesConfig) -> bool {
    beacon_turns >= rules.beacon_turns_required
}

/// No free population remains.
pub fn population_extinct(state: &GameState) -> bool {
    state.free_population() == 0
}

/// Result of [`check_game_end`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GameEndCheck {
    /// Whether any condition holds.
    pub is_game_over: bool,
    /// Winning condition.
    pub victory_condition: Option<VictoryCondition>,
    /// Winning faction.
    pub winner: Option<PlayerRole>,
}

/// Evaluate every end condition. When several hold at once, precedence is
/// mothership destroyed, escape, rescue beacon, then extinction.
pub fn check_game_end(state: &GameState, rules: &RulesConfig) -> GameEndCheck {
    let condition = if mothership_destroyed(&state.antagonist) {
        Some(VictoryCondition::MothershipDestroyed)
    } else if escape_ready(state, rules) {
        Some(VictoryCondition::Escape)
    } else if rescue_arrived(state.beacon_turns, rules) {
        Some(VictoryCondition::RescueBeacon)
    } else if population_extinct(state) {
        Some(VictoryCondition::PopulationExtinct)
    } else {
        None
    };

    match condition {
        Some(condition) => GameEndCheck {
            is_game_over: true,
            victory_condition: Some(condition),
            winner: Some(condition.winner()),
        },
        None => GameEndCheck::default(),
    }
}
