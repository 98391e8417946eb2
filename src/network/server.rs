//! WebSocket Game Server
//!
//! Async WebSocket server for multiplayer connections. Parses client JSON,
//! routes the five request kinds to the [`RoomManager`] and forwards room
//! notifications back out. Holds no game rules of its own.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::game::engine::DEFAULT_HISTORY_CAP;
use crate::game::state::PlayerId;
use crate::network::protocol::{ClientMessage, ServerMessage, SessionOptions};
use crate::network::room::{RoomConfig, RoomError, RoomManager};

/// Outbound queue depth per connection.
const CLIENT_CHANNEL_CAPACITY: usize = 64;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Inactivity after which a room is reaped.
    pub idle_timeout: Duration,
    /// How often the reaper sweeps.
    pub reap_interval: Duration,
    /// Per-room action history bound.
    pub history_cap: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            idle_timeout: Duration::from_secs(60 * 60),
            reap_interval: Duration::from_secs(60),
            history_cap: DEFAULT_HISTORY_CAP,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, GameServerError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| GameServerError::Config(format!("{key}: cannot parse {raw:?}"))),
        Err(_) => Ok(default),
    }
}

impl ServerConfig {
    /// Defaults overridden by `HEXHOLD_BIND`, `HEXHOLD_MAX_CONNECTIONS`,
    /// `HEXHOLD_IDLE_SECS`, `HEXHOLD_REAP_SECS` and `HEXHOLD_HISTORY_CAP`.
    pub fn from_env() -> Result<Self, GameServerError> {
        let defaults = Self::default();
        Ok(Self {
            bind_addr: env_or("HEXHOLD_BIND", defaults.bind_addr)?,
            max_connections: env_or("HEXHOLD_MAX_CONNECTIONS", defaults.max_connections)?,
            idle_timeout: Duration::from_secs(env_or("HEXHOLD_IDLE_SECS", defaults.idle_timeout.as_secs())?),
            reap_interval: Duration::from_secs(env_or("HEXHOLD_REAP_SECS", defaults.reap_interval.as_secs())?),
            history_cap: env_or("HEXHOLD_HISTORY_CAP", defaults.history_cap)?,
        })
    }

    /// Room defaults derived from this config.
    pub fn room_config(&self) -> RoomConfig {
        RoomConfig {
            idle_timeout: self.idle_timeout,
            history_cap: self.history_cap,
            ..RoomConfig::default()
        }
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Bad configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Connected client state.
struct ConnectedClient {
    /// Player identifier assigned on connect.
    player_id: PlayerId,
    /// Connection time.
    connected_at: DateTime<Utc>,
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Room registry.
    rooms: Arc<RoomManager>,
    /// Connected clients.
    clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let rooms = Arc::new(RoomManager::new(config.room_config()));

        Self {
            config,
            rooms,
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Bind the configured address and serve until shutdown.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        info!("Game server listening on {}", listener.local_addr()?);

        let reaper = self.rooms.clone().spawn_reaper(self.config.reap_interval);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let clients_count = self.clients.read().await.len();
                            if clients_count >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        reaper.abort();
        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let rooms = self.rooms.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(CLIENT_CHANNEL_CAPACITY);
            let player_id = PlayerId::new(uuid::Uuid::new_v4().to_string());

            clients.write().await.insert(addr, ConnectedClient {
                player_id: player_id.clone(),
                connected_at: Utc::now(),
            });

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                match ClientMessage::from_json(&text) {
                                    Ok(client_msg) => {
                                        Self::handle_client_message(&player_id, client_msg, &rooms, &msg_tx).await;
                                    }
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        let err = RoomError::InvalidMessage(e.to_string());
                                        let _ = msg_tx.send(err.to_message(None)).await;
                                    }
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }

            // Cleanup
            sender_task.abort();
            if let Some(room_id) = rooms.leave_any(&player_id).await {
                debug!("Client {} left room {} on disconnect", addr, room_id);
            }
            if let Some(client) = clients.write().await.remove(&addr) {
                let session = Utc::now() - client.connected_at;
                info!(
                    "Client {} ({}) cleaned up after {}s",
                    addr,
                    client.player_id,
                    session.num_seconds()
                );
            }
        });
    }

    /// Route one request. Faults go back to this connection only.
    async fn handle_client_message(
        player_id: &PlayerId,
        msg: ClientMessage,
        rooms: &Arc<RoomManager>,
        sender: &mpsc::Sender<ServerMessage>,
    ) {
        let result = match msg {
            ClientMessage::CreateSession { player_name, options } => {
                let config = Self::room_config_for(rooms, options.unwrap_or_default());
                rooms
                    .create_room(player_id.clone(), player_name, config, sender.clone())
                    .await
                    .map(|_| ())
                    .map_err(|e| (e, None))
            }
            ClientMessage::JoinSession { session_id, player_name } => rooms
                .join_room(&session_id, player_id.clone(), player_name, sender.clone())
                .await
                .map_err(|e| (e, None)),
            ClientMessage::LeaveSession { session_id } => rooms
                .leave_room(&session_id, player_id)
                .await
                .map_err(|e| (e, None)),
            ClientMessage::SubmitAction { session_id, action } => rooms
                .submit_action(&session_id, player_id, action.clone())
                .await
                .map(|_| ())
                .map_err(|e| (e, Some(action))),
            ClientMessage::RequestSnapshot { session_id } => {
                match rooms.snapshot(&session_id, player_id).await {
                    Ok(state) => {
                        let _ = sender.send(ServerMessage::StateSnapshot { state }).await;
                        Ok(())
                    }
                    Err(e) => Err((e, None)),
                }
            }
        };

        if let Err((e, action)) = result {
            debug!(player = %player_id, code = e.code(), "request refused: {}", e);
            let _ = sender.send(e.to_message(action.as_ref())).await;
        }
    }

    fn room_config_for(rooms: &RoomManager, options: SessionOptions) -> RoomConfig {
        let defaults = rooms.defaults().clone();
        RoomConfig {
            seed: options.seed.or(defaults.seed),
            max_players: options.max_players.unwrap_or(defaults.max_players),
            ..defaults
        }
    }

    /// Room registry.
    pub fn rooms(&self) -> &Arc<RoomManager> {
        &self.rooms
    }

    /// Get connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Player ids of connected clients.
    pub async fn connected_players(&self) -> Vec<PlayerId> {
        self.clients.read().await.values().map(|c| c.player_id.clone()).collect()
    }

    /// Signal server shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}
