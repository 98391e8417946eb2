//! Hexhold Game Server
//!
//! `hexhold-server demo [seed]` plays a seeded scripted game and checks that a
//! replay of its action list lands on the same state hash.
//! `hexhold-server serve` runs the WebSocket room server (configured from
//! `HEXHOLD_*` environment variables).

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use hexhold::{
    game::{
        events::GameEventData,
        legal_actions,
    },
    network::{GameServer, ServerConfig},
    ActionKind, GameAction, GameConfig, GameEngine, VERSION,
};

/// Turns the demo plays before stopping.
const DEMO_TURNS: u32 = 12;

/// Non-phase actions the script takes in a phase before advancing.
const ACTIONS_PER_PHASE: usize = 3;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Hexhold Server v{}", VERSION);

    let mut args = std::env::args().skip(1);
    let mode = args.next().unwrap_or_else(|| "demo".to_string());
    match mode.as_str() {
        "demo" => {
            let seed = match args.next() {
                Some(raw) => raw.parse().with_context(|| format!("invalid seed {raw:?}"))?,
                None => 12345,
            };
            demo_game(seed)
        }
        "serve" => serve().await,
        other => bail!("unknown mode {other:?}; expected `demo` or `serve`"),
    }
}

/// Play a scripted game, then verify it by replay and by save/load.
fn demo_game(seed: u64) -> Result<()> {
    info!("=== Starting Demo Game ===");

    let config = GameConfig::new(vec!["Defender".to_string(), "Antagonist".to_string()]).with_seed(seed);
    let mut engine = GameEngine::new();
    let state = engine.start_game(&config)?;
    info!("Game ID: {}", state.game_id);
    info!("RNG Seed: {}", state.rng_seed);
    for player in &state.players {
        info!("Seat {} ({}) plays {:?}", player.name, player.id, player.role);
    }

    let mut actions: Vec<GameAction> = Vec::new();
    let mut acted_in_phase = 0;

    while let Some(state) = engine.get_state() {
        if state.game_over || state.turn > DEMO_TURNS {
            break;
        }

        let scripted = if acted_in_phase < ACTIONS_PER_PHASE {
            legal_actions(state, engine.rules())
                .into_iter()
                .find(|a| !matches!(a.kind, ActionKind::AdvancePhase | ActionKind::EndTurn))
        } else {
            None
        };
        let action = match scripted {
            Some(action) => {
                acted_in_phase += 1;
                action
            }
            None => {
                acted_in_phase = 0;
                GameAction::new(state.current_player_id.clone(), ActionKind::AdvancePhase)
            }
        };

        let events = engine
            .apply_action(&action)
            .with_context(|| format!("scripted {} was rejected", action.kind.name()))?;

        for event in &events {
            match &event.data {
                GameEventData::TurnStarted { turn } => info!("--- Turn {} ---", turn),
                GameEventData::Starvation { message, .. } | GameEventData::WoundedDied { message, .. } => {
                    warn!("{}", message)
                }
                GameEventData::AttackResolved { roll, damage, hull_damage, .. } => {
                    info!("Attack: rolled {}, {} damage, {} to the hull", roll, damage, hull_damage)
                }
                GameEventData::TileBombed { tile_id, killed, wounded, destroyed, .. } => {
                    info!("{} bombed: {} killed, {} wounded, destroyed={}", tile_id, killed, wounded, destroyed)
                }
                GameEventData::ControlChanged { settlement_id, to, .. } => {
                    info!("{} is now {:?}", settlement_id, to)
                }
                GameEventData::GameEnded { condition, winner } => {
                    info!("Game ended: {:?}, {:?} wins", condition, winner)
                }
                other => debug!("{:?}", other),
            }
        }
        actions.push(action);
    }

    info!("=== Game Results ===");
    let hash = engine.compute_state_hash()?;
    info!("Final State Hash: {}", hex::encode(hash));
    if let Some(state) = engine.get_state() {
        info!("Turn {} / {} ({} actions)", state.turn, state.phase, actions.len());
        for settlement in state.settlements.values() {
            info!(
                "{}: population {}, wounded {}, {:?}",
                settlement.name, settlement.population, settlement.wounded, settlement.control
            );
        }
        info!(
            "Mothership: health {}, shield {}",
            state.antagonist.mothership_health, state.antagonist.mothership_shield
        );
    }
    info!("Stats: {:?}", engine.get_stats());

    info!("=== Verifying Determinism ===");
    let mut replay_engine = GameEngine::new();
    replay_engine.replay(&config, &actions)?;
    let replay_hash = replay_engine.compute_state_hash()?;
    info!("Replay State Hash: {}", hex::encode(replay_hash));
    if replay_hash != hash {
        bail!("determinism check failed: replay hash differs");
    }
    info!("DETERMINISM VERIFIED");

    let saved = engine.save_game()?;
    let mut loaded = GameEngine::new();
    loaded.load_game(&saved)?;
    if loaded.compute_state_hash()? != hash {
        bail!("save/load changed the state hash");
    }
    info!("SAVE/LOAD VERIFIED ({} bytes)", saved.len());

    Ok(())
}

/// Run the room server until Ctrl-C.
async fn serve() -> Result<()> {
    let config = ServerConfig::from_env()?;
    info!("Binding {}", config.bind_addr);

    let server = Arc::new(GameServer::new(config));
    let runner = {
        let server = server.clone();
        tokio::spawn(async move { server.run().await })
    };

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    server.shutdown();
    runner.await.context("server task failed")??;
    Ok(())
}
