//! Game State Definitions
//!
//! All entity and value types for a match.
//! Uses BTreeMap for deterministic iteration order.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::hash::{hash_serializable, StateHash, STATE_DOMAIN};
use crate::core::hex::HexCoord;
use crate::game::constants;
use crate::game::factory::{SerializedGameState, StateError};

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Player identifier, assigned by the session layer (or `player-N` when the
/// engine is driven directly).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Create from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as str.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.0)
            }
        }
    };
}

entity_id!(
    /// Tile identifier (index in board generation order).
    TileId, "tile"
);
entity_id!(
    /// Settlement identifier.
    SettlementId, "settlement"
);
entity_id!(
    /// Character identifier.
    CharacterId, "character"
);

// =============================================================================
// PLAYERS
// =============================================================================

/// Faction a player controls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerRole {
    /// Human survivors. Always the first seat.
    Defender,
    /// Alien occupiers. Always the second seat.
    Antagonist,
}

impl PlayerRole {
    /// Role for a seat index (positional assignment).
    pub fn for_seat(index: usize) -> PlayerRole {
        if index == 0 {
            PlayerRole::Defender
        } else {
            PlayerRole::Antagonist
        }
    }
}

/// A seated player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Player identifier.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Faction.
    pub role: PlayerRole,
}

// =============================================================================
// RESOURCES
// =============================================================================

/// The four stockpiled resource kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Feeds population every turn.
    Food,
    /// Treats wounded.
    Medicine,
    /// Construction input.
    Materials,
    /// Construction and conversion input.
    Weapons,
}

impl ResourceKind {
    /// Every kind, in canonical order.
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Food,
        ResourceKind::Medicine,
        ResourceKind::Materials,
        ResourceKind::Weapons,
    ];
}

/// A resource inventory. Quantities are unsigned and subtraction clamps at
/// zero, so they can never go negative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resources {
    /// Food units.
    pub food: u32,
    /// Medicine units.
    pub medicine: u32,
    /// Material units.
    pub materials: u32,
    /// Weapon units.
    pub weapons: u32,
}

impl Resources {
    /// Create from explicit amounts.
    pub const fn new(food: u32, medicine: u32, materials: u32, weapons: u32) -> Self {
        Self { food, medicine, materials, weapons }
    }

    /// Single-kind inventory.
    pub fn single(kind: ResourceKind, amount: u32) -> Self {
        let mut r = Self::default();
        r.add(kind, amount);
        r
    }

    /// Amount of one kind.
    pub fn get(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::Food => self.food,
            ResourceKind::Medicine => self.medicine,
            ResourceKind::Materials => self.materials,
            ResourceKind::Weapons => self.weapons,
        }
    }

    fn slot(&mut self, kind: ResourceKind) -> &mut u32 {
        match kind {
            ResourceKind::Food => &mut self.food,
            ResourceKind::Medicine => &mut self.medicine,
            ResourceKind::Materials => &mut self.materials,
            ResourceKind::Weapons => &mut self.weapons,
        }
    }

    /// Add units of one kind (saturating).
    pub fn add(&mut self, kind: ResourceKind, amount: u32) {
        let slot = self.slot(kind);
        *slot = slot.saturating_add(amount);
    }

    /// Remove units of one kind, clamping at zero. Returns the amount
    /// actually removed.
    pub fn take(&mut self, kind: ResourceKind, amount: u32) -> u32 {
        let slot = self.slot(kind);
        let taken = amount.min(*slot);
        *slot -= taken;
        taken
    }

    /// Whether every kind in `cost` is covered.
    pub fn covers(&self, cost: &Resources) -> bool {
        ResourceKind::ALL.iter().all(|k| self.get(*k) >= cost.get(*k))
    }

    /// Subtract a whole cost, clamping each kind at zero.
    pub fn subtract(&mut self, cost: &Resources) {
        for kind in ResourceKind::ALL {
            self.take(kind, cost.get(kind));
        }
    }

    /// Sum of all kinds.
    pub fn total(&self) -> u32 {
        ResourceKind::ALL
            .iter()
            .fold(0u32, |total, k| total.saturating_add(self.get(*k)))
    }

    /// True when every kind is zero.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

// =============================================================================
// TILES
// =============================================================================

/// Terrain of a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileType {
    /// Open ground.
    Plains,
    /// Food and materials.
    Forest,
    /// Materials and weapons.
    Ruins,
    /// Medicine and food.
    Urban,
    /// High ground.
    Hills,
}

impl TileType {
    /// Every terrain type, in draw order.
    pub const ALL: [TileType; 5] = [
        TileType::Plains,
        TileType::Forest,
        TileType::Ruins,
        TileType::Urban,
        TileType::Hills,
    ];
}

/// A hex tile on the board.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// Tile identifier.
    pub id: TileId,
    /// Cube coordinates.
    pub coords: HexCoord,
    /// Terrain.
    pub tile_type: TileType,
    /// Revealed to the defender.
    pub explored: bool,
    /// Bombed out; impassable.
    pub destroyed: bool,
    /// Structure standing on the tile.
    pub building: Option<BuildingType>,
    /// Scavengeable stock.
    pub cache: Option<Resources>,
}

// =============================================================================
// BUILDINGS
// =============================================================================

/// Settlement structures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingType {
    /// Reduces bombardment damage.
    Barricade,
    /// Boosts healing in the settlement.
    Infirmary,
    /// Adds one unit to every conversion output.
    Workshop,
    /// Calls for rescue while held.
    RescueBeacon,
    /// Escape vehicle.
    Shuttle,
}

impl BuildingType {
    /// Every building type.
    pub const ALL: [BuildingType; 5] = [
        BuildingType::Barricade,
        BuildingType::Infirmary,
        BuildingType::Workshop,
        BuildingType::RescueBeacon,
        BuildingType::Shuttle,
    ];

    /// Construction cost.
    pub fn cost(self) -> Resources {
        constants::building_cost(self)
    }

    /// Whether this building reduces incoming damage.
    pub fn is_defensive(self) -> bool {
        matches!(self, BuildingType::Barricade)
    }
}

// =============================================================================
// SETTLEMENTS
// =============================================================================

/// Which faction holds a settlement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlStatus {
    /// Held by the survivors.
    Defender,
    /// Occupied; members cannot act.
    Antagonist,
    /// Disputed until the next role check.
    Contested,
}

/// A human population center ("ghetto").
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Settlement identifier.
    pub id: SettlementId,
    /// Display name.
    pub name: String,
    /// Tile the settlement stands on.
    pub tile_id: TileId,
    /// Controlling faction.
    pub control: ControlStatus,
    /// Healthy population.
    pub population: u32,
    /// Wounded population.
    pub wounded: u32,
    /// Stockpile.
    pub resources: Resources,
    /// Constructed buildings.
    pub buildings: Vec<BuildingType>,
    /// Member characters (sorted).
    pub members: Vec<CharacterId>,
}

impl Settlement {
    /// Healthy plus wounded, saturating.
    pub fn headcount(&self) -> u32 {
        self.population.saturating_add(self.wounded)
    }

    /// Whether a building of this type has been constructed.
    pub fn has_building(&self, building: BuildingType) -> bool {
        self.buildings.contains(&building)
    }

    /// Whether any defensive structure stands.
    pub fn is_defended(&self) -> bool {
        self.buildings.iter().any(|b| b.is_defensive())
    }
}

// =============================================================================
// CHARACTERS
// =============================================================================

/// Character roles. Each has distinct capabilities (see
/// [`constants`](crate::game::constants)).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterType {
    /// Builds, heals a little, gathers a little.
    Leader,
    /// Heals.
    Doctor,
    /// Fast gatherer.
    Scavenger,
    /// Builder and materials gatherer.
    Engineer,
    /// Fighter; holds contested settlements.
    Soldier,
}

impl CharacterType {
    /// Every type, in creation order.
    pub const ALL: [CharacterType; 5] = [
        CharacterType::Leader,
        CharacterType::Doctor,
        CharacterType::Scavenger,
        CharacterType::Engineer,
        CharacterType::Soldier,
    ];

    /// Move range in tiles.
    pub fn movement_range(self) -> u32 {
        constants::movement_range(self)
    }

    /// Gather capacity for a resource.
    pub fn gather_capacity(self, resource: ResourceKind) -> u32 {
        constants::gather_capacity(self, resource)
    }

    /// Wounded units treated per heal action.
    pub fn healing_capacity(self) -> u32 {
        constants::healing_capacity(self)
    }

    /// May construct buildings.
    pub fn can_build(self) -> bool {
        constants::can_build(self)
    }
}

/// An individually tracked actor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    /// Character identifier.
    pub id: CharacterId,
    /// Role.
    pub character_type: CharacterType,
    /// Home settlement.
    pub settlement_id: SettlementId,
    /// Current position; `None` means at home.
    pub current_tile_id: Option<TileId>,
    /// Wounded characters cannot act until healed.
    pub is_wounded: bool,
    /// Already acted in the current phase.
    pub is_used: bool,
    /// Derived: not wounded and home settlement not occupied.
    pub can_act: bool,
}

impl Character {
    /// Whether the character may take an action right now.
    pub fn is_available(&self) -> bool {
        self.can_act && !self.is_used && !self.is_wounded
    }
}

// =============================================================================
// ANTAGONIST
// =============================================================================

/// Escalating alien threat.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AntagonistState {
    /// Shield generator level; regenerates mothership shield each alien turn.
    pub shield_level: u32,
    /// Tokens available for control actions.
    pub control_tokens: u32,
    /// Mothership hull.
    pub mothership_health: u32,
    /// Mothership shield, absorbs damage first.
    pub mothership_shield: u32,
    /// Mothership position.
    pub current_tile_id: Option<TileId>,
    /// Escort vessel that blocks escape.
    pub has_auxiliary_vessel: bool,
    /// Actions spent in the current alien turn.
    pub actions_used: u32,
}

// =============================================================================
// PHASES & OUTCOMES
// =============================================================================

/// The eight phases of a turn, in cycle order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Upkeep: food and wounded care.
    Preparation,
    /// Reveal tiles.
    Exploration,
    /// Move characters; defender combat.
    Movement,
    /// Gather resources.
    ResourceGathering,
    /// Move and convert resources.
    Trading,
    /// Antagonist acts.
    AntagonistTurn,
    /// Settlement control resolves.
    RoleCheck,
    /// Victory conditions evaluated.
    EndGameCheck,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Preparation => "PREPARATION",
            Phase::Exploration => "EXPLORATION",
            Phase::Movement => "MOVEMENT",
            Phase::ResourceGathering => "RESOURCE_GATHERING",
            Phase::Trading => "TRADING",
            Phase::AntagonistTurn => "ANTAGONIST_TURN",
            Phase::RoleCheck => "ROLE_CHECK",
            Phase::EndGameCheck => "END_GAME_CHECK",
        };
        f.write_str(name)
    }
}

/// How a game ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VictoryCondition {
    /// Mothership hull reached zero.
    MothershipDestroyed,
    /// Survivors escaped by shuttle.
    Escape,
    /// Rescue beacon held long enough.
    RescueBeacon,
    /// No free population left.
    PopulationExtinct,
}

impl VictoryCondition {
    /// Faction that wins under this condition.
    pub fn winner(self) -> PlayerRole {
        match self {
            VictoryCondition::PopulationExtinct => PlayerRole::Antagonist,
            _ => PlayerRole::Defender,
        }
    }
}

// =============================================================================
// GAME STATE
// =============================================================================

/// Complete state of a match.
///
/// Replaced wholesale on each transition; the reducer only ever mutates a
/// fresh clone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameState {
    /// Game identifier (random, not gameplay-significant).
    pub game_id: String,
    /// Turn number, starting at 1.
    pub turn: u32,
    /// Current phase.
    pub phase: Phase,
    /// Player who may act now.
    pub current_player_id: PlayerId,
    /// Seats in join order.
    pub players: Vec<Player>,
    /// Board tiles.
    pub tiles: BTreeMap<TileId, Tile>,
    /// Settlements.
    pub settlements: BTreeMap<SettlementId, Settlement>,
    /// Characters.
    pub characters: BTreeMap<CharacterId, Character>,
    /// Alien faction state.
    pub antagonist: AntagonistState,
    /// Serialized actions applied this turn.
    pub actions_this_turn: Vec<String>,
    /// Consecutive end-game checks with a held rescue beacon.
    pub beacon_turns: u32,
    /// Terminal flag.
    pub game_over: bool,
    /// Set when `game_over`.
    pub victory_condition: Option<VictoryCondition>,
    /// Set when `game_over`.
    pub winner: Option<PlayerRole>,
    /// Seed the match was created from.
    pub rng_seed: u64,
    /// Generator position after the last draw.
    pub rng_state: u64,
}

impl GameState {
    /// Find a seated player.
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    /// First player holding a role.
    pub fn player_with_role(&self, role: PlayerRole) -> Option<&Player> {
        self.players.iter().find(|p| p.role == role)
    }

    /// Role of a seated player.
    pub fn role_of(&self, id: &PlayerId) -> Option<PlayerRole> {
        self.player(id).map(|p| p.role)
    }

    /// Tile at a coordinate.
    pub fn tile_at(&self, coords: HexCoord) -> Option<&Tile> {
        self.tiles.values().find(|t| t.coords == coords)
    }

    /// Settlement standing on a tile.
    pub fn settlement_on_tile(&self, tile_id: TileId) -> Option<&Settlement> {
        self.settlements.values().find(|s| s.tile_id == tile_id)
    }

    /// Tile a character currently occupies (home tile when not deployed).
    pub fn character_tile(&self, id: CharacterId) -> Option<TileId> {
        let character = self.characters.get(&id)?;
        character
            .current_tile_id
            .or_else(|| self.settlements.get(&character.settlement_id).map(|s| s.tile_id))
    }

    /// Coordinates of a tile.
    pub fn coords_of(&self, tile_id: TileId) -> Option<HexCoord> {
        self.tiles.get(&tile_id).map(|t| t.coords)
    }

    /// Hex distance between two tiles.
    pub fn tile_distance(&self, a: TileId, b: TileId) -> Option<u32> {
        Some(self.coords_of(a)?.distance(self.coords_of(b)?))
    }

    /// Healthy plus wounded population in settlements not under
    /// antagonist control.
    pub fn free_population(&self) -> u32 {
        self.settlements
            .values()
            .filter(|s| s.control != ControlStatus::Antagonist)
            .fold(0u32, |total, s| total.saturating_add(s.headcount()))
    }

    /// Hash of everything except `game_id`, for replay comparison.
    pub fn compute_hash(&self) -> Result<StateHash, StateError> {
        let mut canonical = SerializedGameState::from(self);
        canonical.game_id.clear();
        Ok(hash_serializable(STATE_DOMAIN, &canonical)?)
    }
}
