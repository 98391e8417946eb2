//! Game Logic Module
//!
//! The rules engine. Everything below `engine` is deterministic: no clocks,
//! no ambient randomness, BTreeMap everywhere.
//!
//! ## Module Structure
//!
//! - `state`: Game state and entity types
//! - `constants`: Board layout and capability tables
//! - `action`: The closed action set
//! - `events`: Typed records of what an action did
//! - `dice`: Die types and rolling
//! - `factory`: Initial state and save formats
//! - `validate`: Per-action preconditions
//! - `rules`: Survival, combat and victory mechanics
//! - `phase`: Phase cycle and turn ownership
//! - `reducer`: `(state, action) -> (state', events)`
//! - `engine`: Stateful orchestrator

pub mod action;
pub mod constants;
pub mod dice;
pub mod engine;
pub mod events;
pub mod factory;
pub mod phase;
pub mod reducer;
pub mod rules;
pub mod state;
pub mod validate;

// Re-export key types
pub use action::{ActionKind, AttackTarget, GameAction, Recipe};
pub use dice::{DiceRoll, DiceType};
pub use engine::{EngineError, EngineStats, GameEngine};
pub use events::{GameEvent, GameEventData};
pub use factory::{GameConfig, SerializedGameState, StateError, StateOverrides};
pub use reducer::{reduce_action, ReduceError, Transition};
pub use rules::RulesConfig;
pub use state::{GameState, Phase, PlayerId, PlayerRole};
pub use validate::{legal_actions, validate_action, ValidationError};
