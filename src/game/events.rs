//! Game Events
//!
//! Typed records emitted by the reducer describing what changed. Consumed by
//! presentation layers for feedback and animation; never read back by rules.

use serde::{Deserialize, Serialize};

use crate::game::action::{AttackTarget, Recipe};
use crate::game::state::{
    BuildingType, CharacterId, ControlStatus, Phase, PlayerRole, ResourceKind,
    SettlementId, TileId, VictoryCondition,
};

/// Game event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEventData {
    /// Phase changed.
    PhaseChanged {
        /// Phase left.
        from: Phase,
        /// Phase entered.
        to: Phase,
    },

    /// A new turn began.
    TurnStarted {
        /// The new turn number.
        turn: u32,
    },

    /// Tile revealed.
    TileExplored {
        /// Explorer.
        character_id: CharacterId,
        /// Revealed tile.
        tile_id: TileId,
        /// Extra cache uncovered by the exploration die.
        found: Option<(ResourceKind, u32)>,
    },

    /// Character relocated.
    CharacterMoved {
        /// Character moved.
        character_id: CharacterId,
        /// Tile left.
        from: TileId,
        /// Tile reached.
        to: TileId,
    },

    /// Resources collected.
    ResourcesGathered {
        /// Gatherer.
        character_id: CharacterId,
        /// Settlement credited.
        settlement_id: SettlementId,
        /// Resource gathered.
        resource: ResourceKind,
        /// Units credited.
        amount: u32,
        /// Tile cache drawn from; `None` when gathered at home.
        from_tile: Option<TileId>,
    },

    /// Building finished.
    BuildingConstructed {
        /// Where it stands.
        settlement_id: SettlementId,
        /// What was built.
        building: BuildingType,
    },

    /// Wounded treated.
    WoundedHealed {
        /// Treating character.
        healer_id: CharacterId,
        /// Healer's settlement.
        settlement_id: SettlementId,
        /// Characters returned to health.
        characters: Vec<CharacterId>,
        /// Wounded population returned to health.
        population: u32,
        /// Medicine spent.
        medicine_used: u32,
    },

    /// Stock moved between settlements.
    ResourcesTransferred {
        /// Source settlement.
        from: SettlementId,
        /// Destination settlement.
        to: SettlementId,
        /// Resource moved.
        resource: ResourceKind,
        /// Units actually moved.
        amount: u32,
    },

    /// Conversion recipe applied.
    ResourcesConverted {
        /// Converting settlement.
        settlement_id: SettlementId,
        /// Recipe used.
        recipe: Recipe,
        /// Units of output added.
        produced: u32,
    },

    /// Defender attack resolved.
    AttackResolved {
        /// Attacker.
        character_id: CharacterId,
        /// What was attacked.
        target: AttackTarget,
        /// Die face.
        roll: u32,
        /// Damage dealt before shields.
        damage: u32,
        /// Damage soaked by the shield.
        absorbed: u32,
        /// Damage that reached the hull.
        hull_damage: u32,
    },

    /// Escort vessel destroyed.
    AuxiliaryVesselDestroyed {
        /// Character that landed the blow.
        character_id: CharacterId,
    },

    /// Character took a wound.
    CharacterWounded {
        /// Wounded character.
        character_id: CharacterId,
    },

    /// Settlement changed hands.
    ControlChanged {
        /// Settlement affected.
        settlement_id: SettlementId,
        /// Previous controller.
        from: ControlStatus,
        /// New controller.
        to: ControlStatus,
    },

    /// Mothership relocated.
    MothershipMoved {
        /// Previous position, if it had one.
        from: Option<TileId>,
        /// New position.
        to: TileId,
    },

    /// Bombardment resolved.
    TileBombed {
        /// Target tile.
        tile_id: TileId,
        /// Die result.
        roll: u32,
        /// Damage dealt.
        damage: u32,
        /// Population killed.
        killed: u32,
        /// Population wounded.
        wounded: u32,
        /// Whether the tile was destroyed.
        destroyed: bool,
    },

    /// Shield generator upgraded.
    ShieldRaised {
        /// New shield level.
        level: u32,
    },

    /// Mothership shield regenerated at the start of the alien turn.
    ShieldRegenerated {
        /// Shield after regeneration.
        shield: u32,
    },

    /// Food shortfall killed population.
    Starvation {
        /// Hungry settlement.
        settlement_id: SettlementId,
        /// Food missing.
        shortfall: u32,
        /// Population lost.
        deaths: u32,
        /// Human-readable summary.
        message: String,
    },

    /// Untreated wounded died.
    WoundedDied {
        /// Settlement affected.
        settlement_id: SettlementId,
        /// Wounded lost.
        deaths: u32,
        /// Human-readable summary.
        message: String,
    },

    /// Rescue beacon streak changed.
    BeaconProgress {
        /// Consecutive turns with an active beacon.
        turns: u32,
        /// Turns needed for rescue.
        required: u32,
    },

    /// Game finished.
    GameEnded {
        /// How it ended.
        condition: VictoryCondition,
        /// Winning side.
        winner: PlayerRole,
    },
}

/// An event stamped with when it happened.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Turn when event occurred.
    pub turn: u32,
    /// Phase when event occurred.
    pub phase: Phase,
    /// Event data.
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(turn: u32, phase: Phase, data: GameEventData) -> Self {
        Self { turn, phase, data }
    }

    /// Create starvation event with a descriptive message.
    pub fn starvation(turn: u32, settlement_id: SettlementId, shortfall: u32, deaths: u32) -> Self {
        Self::new(
            turn,
            Phase::Preparation,
            GameEventData::Starvation {
                settlement_id,
                shortfall,
                deaths,
                message: format!(
                    "{settlement_id} is short {shortfall} food; {deaths} starved"
                ),
            },
        )
    }

    /// Create wounded-died event with a descriptive message.
    pub fn wounded_died(turn: u32, settlement_id: SettlementId, deaths: u32) -> Self {
        Self::new(
            turn,
            Phase::Preparation,
            GameEventData::WoundedDied {
                settlement_id,
                deaths,
                message: format!("{deaths} untreated wounded died in {settlement_id}"),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starvation_message() {
        let event = GameEvent::starvation(4, SettlementId(1), 6, 3);
        match event.data {
            GameEventData::Starvation { message, deaths, .. } => {
                assert_eq!(deaths, 3);
                assert!(message.contains("settlement-1"));
                assert!(message.contains("3 starved"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_event_json_roundtrip() {
        let event = GameEvent::new(
            2,
            Phase::EndGameCheck,
            GameEventData::GameEnded {
                condition: VictoryCondition::RescueBeacon,
                winner: PlayerRole::Defender,
            },
        );
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(serde_json::from_str::<GameEvent>(&json).unwrap(), event);
    }
}
