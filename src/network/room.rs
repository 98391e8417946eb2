//! Game Room Management
//!
//! A room is one authoritative session: a roster of connected players around
//! a single [`GameEngine`]. All state changes for a match go through
//! [`GameRoom::apply_player_action`]; the engine does the rules, the room
//! only decides who may ask.
//!
//! Rooms are held as `Arc<Mutex<GameRoom>>`, so actions against one room are
//! applied strictly one at a time while different rooms proceed in parallel.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::game::action::{ActionKind, GameAction};
use crate::game::engine::{EngineError, GameEngine, DEFAULT_HISTORY_CAP};
use crate::game::events::GameEvent;
use crate::game::factory::{GameConfig, SerializedGameState, MAX_PLAYERS};
use crate::game::rules::RulesConfig;
use crate::game::state::{PlayerId, PlayerRole};
use crate::network::protocol::{RosterEntry, ServerMessage, SessionId};

/// Unique room identifier.
pub type RoomId = SessionId;

/// Room lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    /// Seats open.
    Waiting,
    /// Room filled; engine is being set up.
    Starting,
    /// Game running.
    InProgress,
    /// Engine reported game over.
    Finished,
    /// Last player left.
    Abandoned,
}

/// Configuration for a room.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Seats. The game starts when they are all taken.
    pub max_players: usize,
    /// Fixed seed; random when absent.
    pub seed: Option<u64>,
    /// Inactivity after which the reaper may delete the room.
    pub idle_timeout: Duration,
    /// Rules handed to the engine.
    pub rules: RulesConfig,
    /// Engine action history bound.
    pub history_cap: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: MAX_PLAYERS,
            seed: None,
            idle_timeout: Duration::from_secs(60 * 60),
            rules: RulesConfig::default(),
            history_cap: DEFAULT_HISTORY_CAP,
        }
    }
}

/// Session faults. Each maps to a stable wire code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    /// Every seat is taken.
    #[error("room is full")]
    RoomFull,

    /// Seats are closed once the game starts.
    #[error("game already in progress")]
    GameInProgress,

    /// The player already has a seat somewhere.
    #[error("player {0} is already in a room")]
    AlreadyInRoom(PlayerId),

    /// The player holds no seat in this room.
    #[error("player is not in this room")]
    NotInRoom,

    /// Another player owns the current phase.
    #[error("not your turn: {current} is to act")]
    NotYourTurn {
        /// Owner of the current phase.
        current: PlayerId,
    },

    /// Unknown room id.
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    /// The room is still waiting for players.
    #[error("game has not started")]
    GameNotStarted,

    /// The game is over.
    #[error("game has finished")]
    GameFinished,

    /// Every seat was given up; the room only waits for the reaper.
    #[error("room has been abandoned")]
    RoomClosed,

    /// Malformed or out-of-range request.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Engine-level validation refused the action.
    #[error("{0}")]
    ActionRejected(String),

    /// The engine failed outside validation.
    #[error("engine failure: {0}")]
    Engine(String),
}

impl RoomError {
    /// Wire code.
    pub fn code(&self) -> &'static str {
        match self {
            RoomError::RoomFull => "room_full",
            RoomError::GameInProgress => "game_in_progress",
            RoomError::AlreadyInRoom(_) => "already_in_room",
            RoomError::NotInRoom => "not_in_room",
            RoomError::NotYourTurn { .. } => "not_your_turn",
            RoomError::RoomNotFound(_) => "room_not_found",
            RoomError::GameNotStarted => "game_not_started",
            RoomError::GameFinished => "game_finished",
            RoomError::RoomClosed => "room_closed",
            RoomError::InvalidMessage(_) => "invalid_message",
            RoomError::ActionRejected(_) => "action_rejected",
            RoomError::Engine(_) => "engine_error",
        }
    }

    /// Message to send back to the offending connection.
    pub fn to_message(&self, action: Option<&ActionKind>) -> ServerMessage {
        match (self, action) {
            (RoomError::ActionRejected(reason), Some(action)) => ServerMessage::ActionRejected {
                action: action.clone(),
                reason: reason.clone(),
            },
            _ => ServerMessage::error(self.code(), self.to_string()),
        }
    }
}

impl From<EngineError> for RoomError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Rejected(reason) => RoomError::ActionRejected(reason.to_string()),
            other => RoomError::Engine(other.to_string()),
        }
    }
}

/// A seated player.
#[derive(Debug)]
pub struct RoomPlayer {
    /// Player identifier.
    pub player_id: PlayerId,
    /// Display name.
    pub name: String,
    /// Role, assigned when the room fills.
    pub role: Option<PlayerRole>,
    /// When the seat was taken.
    pub joined_at: DateTime<Utc>,
    /// Message channel to this player.
    pub sender: mpsc::Sender<ServerMessage>,
}

impl RoomPlayer {
    fn entry(&self) -> RosterEntry {
        RosterEntry {
            player_id: self.player_id.clone(),
            name: self.name.clone(),
            role: self.role,
        }
    }
}

/// One match.
pub struct GameRoom {
    /// Unique room identifier.
    pub id: RoomId,
    /// Current state.
    pub state: RoomState,
    /// Room configuration.
    pub config: RoomConfig,
    /// Seats in join order.
    players: Vec<RoomPlayer>,
    /// The rules engine.
    engine: GameEngine,
    /// When the room was created.
    created_at: DateTime<Utc>,
    /// Last join, leave or applied action.
    last_activity: DateTime<Utc>,
}

impl GameRoom {
    /// Create an empty room.
    pub fn new(id: RoomId, config: RoomConfig) -> Self {
        let now = Utc::now();
        let engine = GameEngine::with_history_cap(config.history_cap);
        Self {
            id,
            state: RoomState::Waiting,
            config,
            players: Vec::new(),
            engine,
            created_at: now,
            last_activity: now,
        }
    }

    // =========================================================================
    // ROSTER
    // =========================================================================

    /// Seat a player. Starts the game the moment the last seat is taken.
    pub fn add_player(
        &mut self,
        player_id: PlayerId,
        name: String,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<(), RoomError> {
        match self.state {
            RoomState::Waiting => {}
            RoomState::Starting | RoomState::InProgress => return Err(RoomError::GameInProgress),
            RoomState::Finished => return Err(RoomError::GameFinished),
            RoomState::Abandoned => return Err(RoomError::RoomClosed),
        }
        if self.players.len() >= self.config.max_players {
            return Err(RoomError::RoomFull);
        }
        if self.is_member(&player_id) {
            return Err(RoomError::AlreadyInRoom(player_id));
        }

        let player = RoomPlayer {
            player_id: player_id.clone(),
            name,
            role: None,
            joined_at: Utc::now(),
            sender,
        };
        let entry = player.entry();
        self.players.push(player);
        self.touch();
        info!(room = %self.id, player = %player_id, seats = self.players.len(), "player joined");

        self.send_to(
            &player_id,
            ServerMessage::SessionJoined {
                session_id: self.id.clone(),
                player_id: player_id.clone(),
                players: self.roster(),
                state: self.snapshot(),
            },
        );
        self.broadcast_except(&player_id, ServerMessage::PlayerJoined { player: entry });

        if self.players.len() == self.config.max_players {
            if let Err(e) = self.start() {
                error!(room = %self.id, error = %e, "failed to start game");
                self.players.retain(|p| p.player_id != player_id);
                for p in &mut self.players {
                    p.role = None;
                }
                self.state = RoomState::Waiting;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Remove a seat. An empty room is abandoned.
    pub fn remove_player(&mut self, player_id: &PlayerId) -> bool {
        let before = self.players.len();
        self.players.retain(|p| &p.player_id != player_id);
        if self.players.len() == before {
            return false;
        }
        self.touch();
        info!(room = %self.id, player = %player_id, seats = self.players.len(), "player left");
        self.broadcast(ServerMessage::PlayerLeft { player_id: player_id.clone() });
        if self.players.is_empty() {
            self.state = RoomState::Abandoned;
            info!(room = %self.id, "room abandoned");
        }
        true
    }

    /// Whether a player holds a seat here.
    pub fn is_member(&self, player_id: &PlayerId) -> bool {
        self.players.iter().any(|p| &p.player_id == player_id)
    }

    /// Roster in seat order.
    pub fn roster(&self) -> Vec<RosterEntry> {
        self.players.iter().map(RoomPlayer::entry).collect()
    }

    /// Get player count.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    // =========================================================================
    // GAME
    // =========================================================================

    fn start(&mut self) -> Result<(), RoomError> {
        self.state = RoomState::Starting;
        for (seat, player) in self.players.iter_mut().enumerate() {
            player.role = Some(PlayerRole::for_seat(seat));
        }

        let mut config = GameConfig::new(self.players.iter().map(|p| p.name.clone()).collect())
            .with_player_ids(self.players.iter().map(|p| p.player_id.clone()).collect())
            .with_rules(self.config.rules.clone());
        if let Some(seed) = self.config.seed {
            config = config.with_seed(seed);
        }
        let initial = SerializedGameState::from(self.engine.start_game(&config)?);
        self.state = RoomState::InProgress;
        info!(room = %self.id, seed = initial.rng_seed, "game started");

        let assignments: Vec<(PlayerId, PlayerRole)> = self
            .players
            .iter()
            .filter_map(|p| p.role.map(|role| (p.player_id.clone(), role)))
            .collect();
        for (player_id, role) in assignments {
            self.send_to(&player_id, ServerMessage::RoleAssigned { player_id: player_id.clone(), role });
        }
        self.broadcast(ServerMessage::GameStarted { state: initial });
        Ok(())
    }

    /// The only way to change a running game. Checks, in order: the game is
    /// running, the player is seated, the player owns the current phase, and
    /// finally the engine's own validation.
    pub fn apply_player_action(
        &mut self,
        player_id: &PlayerId,
        kind: ActionKind,
    ) -> Result<Vec<GameEvent>, RoomError> {
        match self.state {
            RoomState::InProgress => {}
            RoomState::Finished => return Err(RoomError::GameFinished),
            _ => return Err(RoomError::GameNotStarted),
        }
        if !self.is_member(player_id) {
            return Err(RoomError::NotInRoom);
        }
        let current = self
            .engine
            .get_state()
            .map(|s| s.current_player_id.clone())
            .ok_or(RoomError::GameNotStarted)?;
        if &current != player_id {
            return Err(RoomError::NotYourTurn { current });
        }

        let action = GameAction::new(player_id.clone(), kind);
        let events = match self.engine.apply_action(&action) {
            Ok(events) => events,
            Err(e) => {
                debug!(room = %self.id, player = %player_id, reason = %e, "action refused");
                return Err(e.into());
            }
        };
        self.touch();

        let Some(state) = self.snapshot() else {
            return Err(RoomError::GameNotStarted);
        };
        self.broadcast(ServerMessage::ActionApplied { action, events: events.clone() });
        self.broadcast(ServerMessage::StateUpdated { state: state.clone(), events: events.clone() });

        if state.game_over {
            self.state = RoomState::Finished;
            info!(room = %self.id, winner = ?state.winner, "game finished");
            let winner = state.winner;
            self.broadcast(ServerMessage::GameEnded { state, winner });
        }
        Ok(events)
    }

    /// Serialized copy of the live state.
    pub fn snapshot(&self) -> Option<SerializedGameState> {
        self.engine.get_state().map(SerializedGameState::from)
    }

    /// Snapshot for a seated player.
    pub fn snapshot_for(&self, player_id: &PlayerId) -> Result<SerializedGameState, RoomError> {
        if !self.is_member(player_id) {
            return Err(RoomError::NotInRoom);
        }
        self.snapshot().ok_or(RoomError::GameNotStarted)
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Last join, leave or applied action.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// Whether the reaper may delete this room.
    pub fn is_reapable(&self, now: DateTime<Utc>) -> bool {
        if self.players.is_empty() || self.state == RoomState::Abandoned {
            return true;
        }
        let idle = (now - self.last_activity).num_seconds();
        idle >= self.config.idle_timeout.as_secs() as i64
    }

    // =========================================================================
    // MESSAGING
    // =========================================================================

    fn send_to(&self, player_id: &PlayerId, msg: ServerMessage) {
        if let Some(player) = self.players.iter().find(|p| &p.player_id == player_id) {
            if player.sender.try_send(msg).is_err() {
                warn!(room = %self.id, player = %player_id, "dropped message to slow or closed client");
            }
        }
    }

    fn broadcast(&self, msg: ServerMessage) {
        for player in &self.players {
            if player.sender.try_send(msg.clone()).is_err() {
                warn!(room = %self.id, player = %player.player_id, "dropped broadcast to slow or closed client");
            }
        }
    }

    fn broadcast_except(&self, skip: &PlayerId, msg: ServerMessage) {
        for player in self.players.iter().filter(|p| &p.player_id != skip) {
            if player.sender.try_send(msg.clone()).is_err() {
                warn!(room = %self.id, player = %player.player_id, "dropped broadcast to slow or closed client");
            }
        }
    }
}

impl std::fmt::Debug for GameRoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameRoom")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("players", &self.players.len())
            .field("created_at", &self.created_at)
            .field("engine", &self.engine)
            .finish()
    }
}

// =============================================================================
// ROOM MANAGER
// =============================================================================

/// Registry of live rooms.
pub struct RoomManager {
    /// Active rooms.
    rooms: RwLock<BTreeMap<RoomId, Arc<Mutex<GameRoom>>>>,
    /// Player to room mapping.
    player_rooms: RwLock<BTreeMap<PlayerId, RoomId>>,
    /// Config for rooms created without explicit options.
    defaults: RoomConfig,
}

impl RoomManager {
    /// Create a manager.
    pub fn new(defaults: RoomConfig) -> Self {
        Self {
            rooms: RwLock::new(BTreeMap::new()),
            player_rooms: RwLock::new(BTreeMap::new()),
            defaults,
        }
    }

    /// Defaults applied to new rooms.
    pub fn defaults(&self) -> &RoomConfig {
        &self.defaults
    }

    /// Open a room and seat its creator.
    pub async fn create_room(
        &self,
        player_id: PlayerId,
        name: String,
        config: RoomConfig,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<RoomId, RoomError> {
        if config.max_players == 0 || config.max_players > MAX_PLAYERS {
            return Err(RoomError::InvalidMessage(format!(
                "max_players must be 1..={MAX_PLAYERS}, got {}",
                config.max_players
            )));
        }
        // Held across the insert so a player cannot take two seats at once.
        let mut index = self.player_rooms.write().await;
        if index.contains_key(&player_id) {
            return Err(RoomError::AlreadyInRoom(player_id));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let mut room = GameRoom::new(id.clone(), config);
        if sender.try_send(ServerMessage::SessionCreated { session_id: id.clone() }).is_err() {
            warn!(room = %id, "creator channel closed");
        }
        room.add_player(player_id.clone(), name, sender)?;

        self.rooms.write().await.insert(id.clone(), Arc::new(Mutex::new(room)));
        index.insert(player_id, id.clone());
        info!(room = %id, "room created");
        Ok(id)
    }

    /// Seat a player in an existing room.
    pub async fn join_room(
        &self,
        room_id: &RoomId,
        player_id: PlayerId,
        name: String,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<(), RoomError> {
        let mut index = self.player_rooms.write().await;
        if index.contains_key(&player_id) {
            return Err(RoomError::AlreadyInRoom(player_id));
        }
        let room = self.get_room(room_id).await.ok_or_else(|| RoomError::RoomNotFound(room_id.clone()))?;
        room.lock().await.add_player(player_id.clone(), name, sender)?;
        index.insert(player_id, room_id.clone());
        Ok(())
    }

    /// Give up a seat.
    pub async fn leave_room(&self, room_id: &RoomId, player_id: &PlayerId) -> Result<(), RoomError> {
        let room = self.get_room(room_id).await.ok_or_else(|| RoomError::RoomNotFound(room_id.clone()))?;
        if !room.lock().await.remove_player(player_id) {
            return Err(RoomError::NotInRoom);
        }
        let mut index = self.player_rooms.write().await;
        if index.get(player_id) == Some(room_id) {
            index.remove(player_id);
        }
        Ok(())
    }

    /// Drop a player from whatever room they are in, e.g. on disconnect.
    pub async fn leave_any(&self, player_id: &PlayerId) -> Option<RoomId> {
        let room_id = self.room_of(player_id).await?;
        self.leave_room(&room_id, player_id).await.ok()?;
        Some(room_id)
    }

    /// Route an action to its room.
    pub async fn submit_action(
        &self,
        room_id: &RoomId,
        player_id: &PlayerId,
        kind: ActionKind,
    ) -> Result<Vec<GameEvent>, RoomError> {
        let room = self.get_room(room_id).await.ok_or_else(|| RoomError::RoomNotFound(room_id.clone()))?;
        let mut room = room.lock().await;
        room.apply_player_action(player_id, kind)
    }

    /// Current state of a room, for one of its players.
    pub async fn snapshot(&self, room_id: &RoomId, player_id: &PlayerId) -> Result<SerializedGameState, RoomError> {
        let room = self.get_room(room_id).await.ok_or_else(|| RoomError::RoomNotFound(room_id.clone()))?;
        let room = room.lock().await;
        room.snapshot_for(player_id)
    }

    /// Get a room by ID.
    pub async fn get_room(&self, id: &RoomId) -> Option<Arc<Mutex<GameRoom>>> {
        self.rooms.read().await.get(id).cloned()
    }

    /// Room a player is seated in.
    pub async fn room_of(&self, player_id: &PlayerId) -> Option<RoomId> {
        self.player_rooms.read().await.get(player_id).cloned()
    }

    /// Get active room count.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Delete every empty, abandoned or idle room. Returns the removed ids.
    ///
    /// Lock order everywhere is player index, then registry, then room.
    pub async fn reap_idle(&self, now: DateTime<Utc>) -> Vec<RoomId> {
        let mut index = self.player_rooms.write().await;
        let mut rooms = self.rooms.write().await;

        let mut reaped = Vec::new();
        for (id, room) in rooms.iter() {
            let room = room.lock().await;
            if room.is_reapable(now) {
                debug!(
                    room = %id,
                    state = ?room.state,
                    age_secs = (now - room.created_at).num_seconds(),
                    "reaping room"
                );
                reaped.push(id.clone());
            }
        }
        if reaped.is_empty() {
            return reaped;
        }

        for id in &reaped {
            rooms.remove(id);
        }
        index.retain(|_, room_id| !reaped.contains(room_id));
        info!(count = reaped.len(), "reaped idle rooms");
        reaped
    }

    /// Run [`RoomManager::reap_idle`] on a fixed interval.
    pub fn spawn_reaper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let reaped = self.reap_idle(Utc::now()).await;
                debug!(reaped = reaped.len(), "reaper sweep");
            }
        })
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::Phase;

    fn seeded() -> RoomConfig {
        RoomConfig { seed: Some(42), ..Default::default() }
    }

    fn pid(s: &str) -> PlayerId {
        PlayerId::new(s)
    }

    fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn full_room() -> (GameRoom, mpsc::Receiver<ServerMessage>, mpsc::Receiver<ServerMessage>) {
        let mut room = GameRoom::new("room-1".to_string(), seeded());
        let (tx1, rx1) = mpsc::channel(64);
        let (tx2, rx2) = mpsc::channel(64);
        room.add_player(pid("alice"), "Alice".to_string(), tx1).unwrap();
        room.add_player(pid("bob"), "Bob".to_string(), tx2).unwrap();
        (room, rx1, rx2)
    }

    #[tokio::test]
    async fn test_room_waits_until_full() {
        let mut room = GameRoom::new("room-1".to_string(), seeded());
        let (tx, mut rx) = mpsc::channel(64);
        room.add_player(pid("alice"), "Alice".to_string(), tx).unwrap();

        assert_eq!(room.state, RoomState::Waiting);
        assert!(room.snapshot().is_none());
        let msgs = drain(&mut rx);
        assert!(matches!(&msgs[0], ServerMessage::SessionJoined { state: None, players, .. } if players.len() == 1));
    }

    #[tokio::test]
    async fn test_room_autostarts_with_positional_roles() {
        let (room, mut rx1, mut rx2) = full_room();
        assert_eq!(room.state, RoomState::InProgress);

        let roster = room.roster();
        assert_eq!(roster[0].role, Some(PlayerRole::Defender));
        assert_eq!(roster[1].role, Some(PlayerRole::Antagonist));

        let alice = drain(&mut rx1);
        assert!(alice.iter().any(|m| matches!(m, ServerMessage::PlayerJoined { .. })));
        assert!(alice.iter().any(|m| matches!(m, ServerMessage::RoleAssigned { role: PlayerRole::Defender, .. })));
        assert!(alice.iter().any(|m| matches!(m, ServerMessage::GameStarted { .. })));

        let bob = drain(&mut rx2);
        assert!(bob.iter().any(|m| matches!(m, ServerMessage::RoleAssigned { role: PlayerRole::Antagonist, .. })));

        let state = room.snapshot().unwrap();
        assert_eq!(state.current_player_id, pid("alice"));
        assert_eq!(state.rng_seed, 42);
    }

    #[tokio::test]
    async fn test_room_full_and_in_progress() {
        let config = RoomConfig { max_players: 2, ..seeded() };
        let mut room = GameRoom::new("room-1".to_string(), config);
        for name in ["a", "b"] {
            let (tx, _rx) = mpsc::channel(64);
            room.add_player(pid(name), name.to_string(), tx).unwrap();
        }
        let (tx, _rx) = mpsc::channel(64);
        assert_eq!(room.add_player(pid("c"), "c".to_string(), tx), Err(RoomError::GameInProgress));
    }

    #[tokio::test]
    async fn test_closed_rooms_refuse_seats() {
        let mut abandoned = GameRoom::new("room-1".to_string(), seeded());
        let (tx, _rx) = mpsc::channel(64);
        abandoned.add_player(pid("a"), "a".to_string(), tx).unwrap();
        assert!(abandoned.remove_player(&pid("a")));
        let (tx, _rx) = mpsc::channel(64);
        let err = abandoned.add_player(pid("b"), "b".to_string(), tx).unwrap_err();
        assert_eq!(err, RoomError::RoomClosed);
        assert_eq!(err.code(), "room_closed");

        let (mut finished, _rx1, _rx2) = full_room();
        finished.state = RoomState::Finished;
        let (tx, _rx) = mpsc::channel(64);
        let err = finished.add_player(pid("c"), "c".to_string(), tx).unwrap_err();
        assert_eq!(err.code(), "game_finished");
    }

    #[tokio::test]
    async fn test_duplicate_join_rejected() {
        let mut room = GameRoom::new("room-1".to_string(), seeded());
        let (tx, _rx) = mpsc::channel(64);
        room.add_player(pid("a"), "a".to_string(), tx.clone()).unwrap();
        assert_eq!(
            room.add_player(pid("a"), "a".to_string(), tx),
            Err(RoomError::AlreadyInRoom(pid("a")))
        );
    }

    #[tokio::test]
    async fn test_action_check_order() {
        let mut room = GameRoom::new("room-1".to_string(), seeded());
        let (tx, _rx) = mpsc::channel(64);
        room.add_player(pid("alice"), "Alice".to_string(), tx).unwrap();
        // (1) not started
        assert_eq!(
            room.apply_player_action(&pid("alice"), ActionKind::AdvancePhase),
            Err(RoomError::GameNotStarted)
        );

        let (mut room, _rx1, _rx2) = full_room();
        // (2) stranger
        assert_eq!(
            room.apply_player_action(&pid("mallory"), ActionKind::AdvancePhase),
            Err(RoomError::NotInRoom)
        );
        // (3) seated but not the phase owner
        assert_eq!(
            room.apply_player_action(&pid("bob"), ActionKind::AdvancePhase),
            Err(RoomError::NotYourTurn { current: pid("alice") })
        );
        // (4) owner, but the engine refuses
        let err = room.apply_player_action(&pid("alice"), ActionKind::RaiseShield).unwrap_err();
        assert_eq!(err.code(), "action_rejected");
    }

    #[tokio::test]
    async fn test_rejection_leaves_state_untouched() {
        let (mut room, _rx1, _rx2) = full_room();
        let before = room.snapshot().unwrap();
        let _ = room.apply_player_action(&pid("bob"), ActionKind::AdvancePhase);
        let _ = room.apply_player_action(&pid("alice"), ActionKind::RaiseShield);
        assert_eq!(room.snapshot().unwrap(), before);
    }

    #[tokio::test]
    async fn test_applied_action_broadcasts() {
        let (mut room, mut rx1, mut rx2) = full_room();
        drain(&mut rx1);
        drain(&mut rx2);

        let events = room.apply_player_action(&pid("alice"), ActionKind::AdvancePhase).unwrap();
        assert!(!events.is_empty());
        assert_eq!(room.snapshot().unwrap().phase, Phase::Exploration);

        for rx in [&mut rx1, &mut rx2] {
            let msgs = drain(rx);
            assert!(msgs.iter().any(|m| matches!(m, ServerMessage::ActionApplied { .. })));
            assert!(msgs.iter().any(|m| matches!(m, ServerMessage::StateUpdated { .. })));
        }
    }

    #[tokio::test]
    async fn test_end_turn_hands_over_to_antagonist() {
        let (mut room, _rx1, _rx2) = full_room();
        room.apply_player_action(&pid("alice"), ActionKind::EndTurn).unwrap();
        let state = room.snapshot().unwrap();
        assert_eq!(state.phase, Phase::AntagonistTurn);
        assert_eq!(state.current_player_id, pid("bob"));
        assert_eq!(
            room.apply_player_action(&pid("alice"), ActionKind::AdvancePhase),
            Err(RoomError::NotYourTurn { current: pid("bob") })
        );
    }

    #[tokio::test]
    async fn test_last_player_leaving_abandons() {
        let (mut room, _rx1, mut rx2) = full_room();
        assert!(room.remove_player(&pid("alice")));
        assert!(drain(&mut rx2).iter().any(|m| matches!(m, ServerMessage::PlayerLeft { .. })));
        assert_eq!(room.state, RoomState::InProgress);
        assert!(room.remove_player(&pid("bob")));
        assert_eq!(room.state, RoomState::Abandoned);
        assert!(!room.remove_player(&pid("bob")));
    }

    #[tokio::test]
    async fn test_idle_reapable() {
        let (room, _rx1, _rx2) = full_room();
        let now = room.last_activity();
        assert!(!room.is_reapable(now));
        assert!(room.is_reapable(now + chrono::Duration::seconds(3600)));
    }

    #[tokio::test]
    async fn test_single_seat_room_owns_every_phase() {
        let config = RoomConfig { max_players: 1, ..seeded() };
        let mut room = GameRoom::new("solo".to_string(), config);
        let (tx, _rx) = mpsc::channel(64);
        room.add_player(pid("solo"), "Solo".to_string(), tx).unwrap();
        assert_eq!(room.state, RoomState::InProgress);
        room.apply_player_action(&pid("solo"), ActionKind::EndTurn).unwrap();
        room.apply_player_action(&pid("solo"), ActionKind::AdvancePhase).unwrap();
    }

    #[tokio::test]
    async fn test_manager_create_join_leave() {
        let manager = RoomManager::new(seeded());
        let (tx1, mut rx1) = mpsc::channel(64);
        let (tx2, _rx2) = mpsc::channel(64);

        let id = manager
            .create_room(pid("alice"), "Alice".to_string(), seeded(), tx1)
            .await
            .unwrap();
        assert!(matches!(drain(&mut rx1).first(), Some(ServerMessage::SessionCreated { .. })));
        assert_eq!(manager.room_count().await, 1);
        assert_eq!(manager.room_of(&pid("alice")).await, Some(id.clone()));

        manager.join_room(&id, pid("bob"), "Bob".to_string(), tx2).await.unwrap();
        let state = manager.snapshot(&id, &pid("bob")).await.unwrap();
        assert_eq!(state.players.len(), 2);

        assert_eq!(
            manager.snapshot(&id, &pid("mallory")).await,
            Err(RoomError::NotInRoom)
        );

        manager.leave_room(&id, &pid("bob")).await.unwrap();
        assert_eq!(manager.room_of(&pid("bob")).await, None);
        assert_eq!(manager.leave_any(&pid("alice")).await, Some(id.clone()));

        let reaped = manager.reap_idle(Utc::now()).await;
        assert_eq!(reaped, vec![id]);
        assert_eq!(manager.room_count().await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_joins_take_one_seat() {
        let manager = Arc::new(RoomManager::new(seeded()));
        let config = RoomConfig { max_players: 2, ..seeded() };
        let mut rooms = Vec::new();
        for host in ["h1", "h2", "h3", "h4"] {
            let (tx, _rx) = mpsc::channel(64);
            rooms.push(manager.create_room(pid(host), host.to_string(), config.clone(), tx).await.unwrap());
        }

        let joins: Vec<_> = rooms
            .iter()
            .cloned()
            .map(|room_id| {
                let manager = manager.clone();
                tokio::spawn(async move {
                    let (tx, _rx) = mpsc::channel(64);
                    manager.join_room(&room_id, pid("eve"), "Eve".to_string(), tx).await
                })
            })
            .collect();

        let mut seated = 0;
        for join in joins {
            match join.await.unwrap() {
                Ok(()) => seated += 1,
                Err(e) => assert_eq!(e, RoomError::AlreadyInRoom(pid("eve"))),
            }
        }
        assert_eq!(seated, 1);

        let mut rosters_with_eve = 0;
        for room_id in &rooms {
            let room = manager.get_room(room_id).await.unwrap();
            if room.lock().await.is_member(&pid("eve")) {
                rosters_with_eve += 1;
                assert_eq!(manager.room_of(&pid("eve")).await.as_ref(), Some(room_id));
            }
        }
        assert_eq!(rosters_with_eve, 1);
    }

    #[tokio::test]
    async fn test_manager_unknown_room() {
        let manager = RoomManager::default();
        let (tx, _rx) = mpsc::channel(64);
        let err = manager
            .join_room(&"nope".to_string(), pid("a"), "a".to_string(), tx)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "room_not_found");
        let err = manager
            .submit_action(&"nope".to_string(), &pid("a"), ActionKind::EndTurn)
            .await
            .unwrap_err();
        assert_eq!(err, RoomError::RoomNotFound("nope".to_string()));
    }

    #[tokio::test]
    async fn test_manager_rejects_bad_seat_count() {
        let manager = RoomManager::default();
        let (tx, _rx) = mpsc::channel(64);
        let config = RoomConfig { max_players: 3, ..Default::default() };
        let err = manager.create_room(pid("a"), "a".to_string(), config, tx).await.unwrap_err();
        assert_eq!(err.code(), "invalid_message");
    }

    #[tokio::test]
    async fn test_reaper_keeps_active_rooms() {
        let manager = RoomManager::default();
        let (tx, _rx) = mpsc::channel(64);
        manager.create_room(pid("a"), "a".to_string(), seeded(), tx).await.unwrap();
        assert!(manager.reap_idle(Utc::now()).await.is_empty());
        assert_eq!(manager.room_count().await, 1);
    }
}
