//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! All messages are JSON with an internal `type` tag; states travel in their
//! serialized (pair-list) form.

use serde::{Deserialize, Serialize};

use crate::game::action::{ActionKind, GameAction};
use crate::game::events::GameEvent;
use crate::game::factory::SerializedGameState;
use crate::game::state::{PlayerId, PlayerRole};

/// Room identifier as sent on the wire.
pub type SessionId = String;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open a new room and take its first seat.
    CreateSession {
        /// Display name.
        player_name: String,
        /// Room options.
        #[serde(default)]
        options: Option<SessionOptions>,
    },

    /// Take a seat in an existing room.
    JoinSession {
        /// Room to join.
        session_id: SessionId,
        /// Display name.
        player_name: String,
    },

    /// Leave a room.
    LeaveSession {
        /// Room to leave.
        session_id: SessionId,
    },

    /// Submit a game action. The acting player is the connection's player.
    SubmitAction {
        /// Target room.
        session_id: SessionId,
        /// The action.
        action: ActionKind,
    },

    /// Ask for the current state.
    RequestSnapshot {
        /// Target room.
        session_id: SessionId,
    },
}

/// Options a creator may set on a new room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Fixed seed for a reproducible match.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Seats; 1 or 2.
    #[serde(default)]
    pub max_players: Option<usize>,
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// A seat in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Player id.
    pub player_id: PlayerId,
    /// Display name.
    pub name: String,
    /// Role, once the room has filled.
    pub role: Option<PlayerRole>,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Room created; the creator is seated next.
    SessionCreated {
        /// New room id.
        session_id: SessionId,
    },

    /// The receiving connection took a seat.
    SessionJoined {
        /// Room id.
        session_id: SessionId,
        /// Id assigned to the receiving player.
        player_id: PlayerId,
        /// Current roster in seat order.
        players: Vec<RosterEntry>,
        /// Live state, if the game has started.
        state: Option<SerializedGameState>,
    },

    /// Someone else took a seat.
    PlayerJoined {
        /// The new seat.
        player: RosterEntry,
    },

    /// Someone left.
    PlayerLeft {
        /// Who left.
        player_id: PlayerId,
    },

    /// Role assigned to the receiving player when the room filled.
    RoleAssigned {
        /// Receiving player.
        player_id: PlayerId,
        /// Role.
        role: PlayerRole,
    },

    /// The game began.
    GameStarted {
        /// Initial state.
        state: SerializedGameState,
    },

    /// State after an applied action.
    StateUpdated {
        /// New state.
        state: SerializedGameState,
        /// What the action did.
        events: Vec<GameEvent>,
    },

    /// Reply to a snapshot request.
    StateSnapshot {
        /// Current state.
        state: SerializedGameState,
    },

    /// The game finished.
    GameEnded {
        /// Final state.
        state: SerializedGameState,
        /// Winning role, if any.
        winner: Option<PlayerRole>,
    },

    /// An action was applied.
    ActionApplied {
        /// The action, with its acting player.
        action: GameAction,
        /// What it did.
        events: Vec<GameEvent>,
    },

    /// The engine refused an action. Sent to the submitter only.
    ActionRejected {
        /// The refused action.
        action: ActionKind,
        /// Why.
        reason: String,
    },

    /// Session fault. Sent to the offending connection only.
    Error {
        /// Stable machine-readable code.
        code: String,
        /// Human-readable detail.
        message: String,
    },
}

impl ServerMessage {
    /// Build an error message.
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerMessage::Error { code: code.to_string(), message: message.into() }
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{CharacterId, TileId};

    #[test]
    fn test_client_message_from_wire() {
        let text = r#"{"type":"submit_action","session_id":"abc","action":{"type":"MOVE","character_id":3,"tile_id":7}}"#;
        let msg = ClientMessage::from_json(text).unwrap();
        assert_eq!(
            msg,
            ClientMessage::SubmitAction {
                session_id: "abc".to_string(),
                action: ActionKind::Move { character_id: CharacterId(3), tile_id: TileId(7) },
            }
        );
    }

    #[test]
    fn test_create_session_without_options() {
        let msg = ClientMessage::from_json(r#"{"type":"create_session","player_name":"Ada"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::CreateSession { player_name: "Ada".to_string(), options: None }
        );
    }

    #[test]
    fn test_unknown_message_type_rejected() {
        assert!(ClientMessage::from_json(r#"{"type":"ping","timestamp":1}"#).is_err());
    }

    #[test]
    fn test_error_message_json() {
        let json = ServerMessage::error("not_your_turn", "wait").to_json().unwrap();
        assert!(json.contains(r#""type":"error""#));
        assert!(json.contains(r#""code":"not_your_turn""#));
    }

    #[test]
    fn test_rejection_roundtrip() {
        let msg = ServerMessage::ActionRejected {
            action: ActionKind::EndTurn,
            reason: "game is over".to_string(),
        };
        let json = msg.to_json().unwrap();
        assert_eq!(ServerMessage::from_json(&json).unwrap(), msg);
    }
}
