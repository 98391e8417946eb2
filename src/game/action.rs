//! Player Actions
//!
//! Closed set of everything a player (human or AI) can ask the engine to do.
//! Every variant carries exactly the fields it needs; dispatch is exhaustive
//! pattern matching, so a new variant cannot be forgotten by the validator or
//! reducer.

use serde::{Deserialize, Serialize};

use crate::game::state::{BuildingType, CharacterId, PlayerId, ResourceKind, SettlementId, TileId};

/// Resource conversion recipes (fixed input -> output ratios).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipe {
    /// 2 materials -> 1 weapons.
    Scrap,
    /// 3 food -> 1 medicine.
    Rations,
    /// 1 weapons -> 2 materials.
    Salvage,
}

impl Recipe {
    /// `(input kind, input amount, output kind, output amount)`.
    pub fn ratio(self) -> (ResourceKind, u32, ResourceKind, u32) {
        match self {
            Recipe::Scrap => (ResourceKind::Materials, 2, ResourceKind::Weapons, 1),
            Recipe::Rations => (ResourceKind::Food, 3, ResourceKind::Medicine, 1),
            Recipe::Salvage => (ResourceKind::Weapons, 1, ResourceKind::Materials, 2),
        }
    }
}

/// What a defender attack aims at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackTarget {
    /// The mothership (shield first, then hull).
    Mothership,
    /// The escort vessel.
    AuxiliaryVessel,
}

/// The action payload, one variant per action kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    /// Reveal an adjacent unexplored tile.
    Explore {
        /// Acting character.
        character_id: CharacterId,
        /// Tile to reveal.
        tile_id: TileId,
    },
    /// Relocate a character within its movement range.
    Move {
        /// Acting character.
        character_id: CharacterId,
        /// Destination.
        tile_id: TileId,
    },
    /// Collect resources into the character's settlement.
    Gather {
        /// Acting character.
        character_id: CharacterId,
        /// Resource to collect.
        resource: ResourceKind,
        /// Requested amount; capped by capacity.
        amount: u32,
    },
    /// Construct a building in the character's settlement.
    Build {
        /// Acting character.
        character_id: CharacterId,
        /// Structure to build.
        building: BuildingType,
    },
    /// Treat wounded in the character's settlement.
    Heal {
        /// Acting character (healer).
        character_id: CharacterId,
        /// Requested number of wounded to treat.
        amount: u32,
    },
    /// Move resources between two settlements.
    Transfer {
        /// Source settlement.
        from: SettlementId,
        /// Destination settlement.
        to: SettlementId,
        /// Resource to move.
        resource: ResourceKind,
        /// Amount to move.
        amount: u32,
    },
    /// Run a conversion recipe once.
    Convert {
        /// Settlement whose stock is converted.
        settlement_id: SettlementId,
        /// Recipe.
        recipe: Recipe,
    },
    /// Defender strike against the alien fleet.
    Attack {
        /// Acting character.
        character_id: CharacterId,
        /// Target.
        target: AttackTarget,
    },
    /// Retake an occupied or contested settlement with a soldier.
    Liberate {
        /// Acting soldier.
        character_id: CharacterId,
        /// Settlement to retake.
        settlement_id: SettlementId,
    },
    /// Reposition the mothership.
    AlienMove {
        /// Destination.
        tile_id: TileId,
    },
    /// Spend a control token on a settlement.
    Control {
        /// Target settlement.
        settlement_id: SettlementId,
    },
    /// Bombard a tile.
    Bomb {
        /// Target tile.
        tile_id: TileId,
    },
    /// Upgrade the shield generator.
    RaiseShield,
    /// Move to the next phase.
    AdvancePhase,
    /// Advance phases until the other faction is up.
    EndTurn,
}

impl ActionKind {
    /// Stable tag used in logs and rejection messages.
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Explore { .. } => "EXPLORE",
            ActionKind::Move { .. } => "MOVE",
            ActionKind::Gather { .. } => "GATHER",
            ActionKind::Build { .. } => "BUILD",
            ActionKind::Heal { .. } => "HEAL",
            ActionKind::Transfer { .. } => "TRANSFER",
            ActionKind::Convert { .. } => "CONVERT",
            ActionKind::Attack { .. } => "ATTACK",
            ActionKind::Liberate { .. } => "LIBERATE",
            ActionKind::AlienMove { .. } => "ALIEN_MOVE",
            ActionKind::Control { .. } => "CONTROL",
            ActionKind::Bomb { .. } => "BOMB",
            ActionKind::RaiseShield => "RAISE_SHIELD",
            ActionKind::AdvancePhase => "ADVANCE_PHASE",
            ActionKind::EndTurn => "END_TURN",
        }
    }

    /// Whether this action is reserved for the antagonist.
    pub fn is_antagonist_action(&self) -> bool {
        matches!(
            self,
            ActionKind::AlienMove { .. }
                | ActionKind::Control { .. }
                | ActionKind::Bomb { .. }
                | ActionKind::RaiseShield
        )
    }
}

/// An action attributed to a player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameAction {
    /// Submitting player.
    pub player_id: PlayerId,
    /// Payload.
    pub kind: ActionKind,
}

impl GameAction {
    /// Create an action.
    pub fn new(player_id: PlayerId, kind: ActionKind) -> Self {
        Self { player_id, kind }
    }

    /// Serialize to the JSON form stored in the turn log.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse the JSON form.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
