//! # Hexhold Game Server
//!
//! Deterministic turn-based rules engine for Hexhold, plus the authoritative
//! room layer that runs one engine per match.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HEXHOLD SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── hex.rs      - Cube-coordinate hex math                  │
//! │  ├── rng.rs      - Seeded LCG and replaceable sources        │
//! │  └── hash.rs     - State hashing for replay comparison       │
//! │                                                              │
//! │  game/           - Rules (deterministic)                     │
//! │  ├── state.rs    - Game state and entities                   │
//! │  ├── factory.rs  - Initial state, save formats               │
//! │  ├── validate.rs - Action preconditions                      │
//! │  ├── rules.rs    - Survival, combat, control, victory        │
//! │  ├── phase.rs    - Phase machine and turn ownership          │
//! │  ├── reducer.rs  - (state, action) -> (state', events)       │
//! │  └── engine.rs   - Orchestrator: rng, dice, history, replay  │
//! │                                                              │
//! │  network/        - Sessions (non-deterministic)              │
//! │  ├── room.rs     - Authoritative rooms and reaping           │
//! │  ├── protocol.rs - Message types                             │
//! │  └── server.rs   - WebSocket server                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are deterministic:
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time in rules
//! - Every gameplay draw comes from the session's seeded generator
//!
//! Given the same seed and the same action list, a replay reaches a state
//! with the same [`crate::core::hash::StateHash`]. Game ids come from `uuid` and are
//! excluded from that hash.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use crate::core::hex::HexCoord;
pub use crate::core::rng::{LcgRandom, RandomSource, SequenceRandom};
pub use game::action::{ActionKind, GameAction};
pub use game::engine::{EngineError, GameEngine};
pub use game::factory::GameConfig;
pub use game::state::{GameState, Phase, PlayerId, PlayerRole};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
