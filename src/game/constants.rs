//! Game Constants
//!
//! Board layout, starting values and per-type capability tables. Anything a
//! balance pass is expected to tune per match lives in
//! [`RulesConfig`](crate::game::rules::RulesConfig) instead.

use crate::core::hex::HexCoord;
use crate::game::state::{BuildingType, CharacterType, ResourceKind, Resources};

// =============================================================================
// BOARD
// =============================================================================

/// Radius of the hex board (37 tiles).
pub const MAP_RADIUS: u32 = 3;

/// Fixed settlement placements.
pub const SETTLEMENT_COORDS: [HexCoord; 3] = [
    HexCoord::new(-2, 0),
    HexCoord::new(2, -2),
    HexCoord::new(0, 2),
];

/// Display names, parallel to [`SETTLEMENT_COORDS`].
pub const SETTLEMENT_NAMES: [&str; 3] = ["Northgate", "Ashford", "Low Quarter"];

// =============================================================================
// SETTLEMENTS
// =============================================================================

/// Healthy population per settlement at game start.
pub const STARTING_POPULATION: u32 = 10;

/// Starting inventory per settlement.
pub const STARTING_RESOURCES: Resources = Resources {
    food: 12,
    medicine: 3,
    materials: 4,
    weapons: 2,
};

// =============================================================================
// ANTAGONIST
// =============================================================================

/// Mothership hull points.
pub const MOTHERSHIP_HEALTH: u32 = 20;
/// Mothership shield at game start.
pub const MOTHERSHIP_SHIELD: u32 = 5;
/// Upper bound for mothership shield regeneration.
pub const MAX_MOTHERSHIP_SHIELD: u32 = 8;
/// Shield generator level at game start.
pub const STARTING_SHIELD_LEVEL: u32 = 1;
/// Shield generator cap.
pub const MAX_SHIELD_LEVEL: u32 = 5;
/// Control tokens at game start.
pub const STARTING_CONTROL_TOKENS: u32 = 2;
/// Control token cap.
pub const MAX_CONTROL_TOKENS: u32 = 6;
/// Single-hit damage that destroys the auxiliary vessel.
pub const AUX_VESSEL_HULL: u32 = 3;

/// Mothership movement range.
pub const ALIEN_MOVE_RANGE: u32 = 2;
/// Range within which the mothership can place a control token.
pub const CONTROL_RANGE: u32 = 2;
/// Bombardment range.
pub const BOMB_RANGE: u32 = 3;
/// Distance from the mothership a character must be to attack it.
pub const ATTACK_RANGE: u32 = 1;

// =============================================================================
// CHARACTER CAPABILITIES
// =============================================================================

/// Tiles a character type may cross in one move.
pub fn movement_range(character_type: CharacterType) -> u32 {
    match character_type {
        CharacterType::Leader => 1,
        CharacterType::Doctor => 1,
        CharacterType::Scavenger => 2,
        CharacterType::Engineer => 1,
        CharacterType::Soldier => 2,
    }
}

/// Maximum units of a resource one gather action yields.
pub fn gather_capacity(character_type: CharacterType, resource: ResourceKind) -> u32 {
    use CharacterType::*;
    use ResourceKind::*;
    match (character_type, resource) {
        (Leader, Food) | (Leader, Materials) => 1,
        (Doctor, Medicine) => 2,
        (Scavenger, Food) => 3,
        (Scavenger, Medicine) => 1,
        (Scavenger, Materials) => 2,
        (Scavenger, Weapons) => 1,
        (Engineer, Materials) => 3,
        (Soldier, Weapons) => 2,
        _ => 0,
    }
}

/// Wounded units one heal action can treat.
pub fn healing_capacity(character_type: CharacterType) -> u32 {
    match character_type {
        CharacterType::Doctor => 2,
        CharacterType::Leader => 1,
        _ => 0,
    }
}

/// Whether a character type may construct buildings.
pub fn can_build(character_type: CharacterType) -> bool {
    matches!(character_type, CharacterType::Engineer | CharacterType::Leader)
}

// =============================================================================
// BUILDINGS
// =============================================================================

/// Construction cost of a building.
pub fn building_cost(building: BuildingType) -> Resources {
    match building {
        BuildingType::Barricade => Resources::new(0, 0, 3, 0),
        BuildingType::Infirmary => Resources::new(0, 1, 2, 0),
        BuildingType::Workshop => Resources::new(0, 0, 4, 0),
        BuildingType::RescueBeacon => Resources::new(0, 0, 5, 2),
        BuildingType::Shuttle => Resources::new(2, 0, 6, 2),
    }
}

// =============================================================================
// TILE CACHES
// =============================================================================

/// Seeded cache size bounds per tile type, `(min, max)` per resource.
pub fn cache_bounds(tile_type: crate::game::state::TileType) -> Option<[(ResourceKind, u32, u32); 2]> {
    use crate::game::state::TileType;
    match tile_type {
        TileType::Forest => Some([(ResourceKind::Food, 2, 5), (ResourceKind::Materials, 1, 3)]),
        TileType::Ruins => Some([(ResourceKind::Materials, 2, 6), (ResourceKind::Weapons, 0, 2)]),
        TileType::Urban => Some([(ResourceKind::Medicine, 1, 3), (ResourceKind::Food, 1, 3)]),
        TileType::Plains | TileType::Hills => None,
    }
}
