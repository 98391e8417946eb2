//! Game Engine
//!
//! Stateful façade over the pure rules: owns the active state, the seeded
//! generator, the dice subsystem and a bounded action history. A session
//! drives exactly one engine.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::core::hash::StateHash;
use crate::core::rng::{LcgRandom, RandomSource, RngError};
use crate::game::action::{ActionKind, GameAction};
use crate::game::dice::{Dice, DiceRoll, DiceType};
use crate::game::events::{GameEvent, GameEventData};
use crate::game::factory::{
    create_initial_state, deserialize_state, serialize_state, state_from_bytes, state_to_bytes,
    GameConfig, StateError,
};
use crate::game::phase;
use crate::game::reducer::{reduce_action, ReduceError};
use crate::game::rules::RulesConfig;
use crate::game::state::GameState;
use crate::game::validate::{validate_action, ValidationError};

/// Default bound on the action history.
pub const DEFAULT_HISTORY_CAP: usize = 1000;

/// Engine-level failures.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No game has been started or loaded.
    #[error("no active game")]
    NoActiveGame,

    /// The action was refused or its handler faulted. State is unchanged.
    #[error(transparent)]
    Rejected(#[from] ReduceError),

    /// A recorded action failed during replay.
    #[error("replay diverged at action {index} ({action}): {reason}")]
    ReplayDiverged {
        /// Position in the action list.
        index: usize,
        /// Action tag.
        action: &'static str,
        /// Rejection reason.
        reason: String,
    },

    /// Creation, save or load failure.
    #[error(transparent)]
    State(#[from] StateError),

    /// Dice misuse.
    #[error(transparent)]
    Dice(#[from] RngError),
}

/// Running counters for simulation harnesses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Games started, loaded or replayed.
    pub games_started: u64,
    /// Actions that changed state.
    pub actions_applied: u64,
    /// Actions refused.
    pub actions_rejected: u64,
    /// Phase transitions.
    pub phases_advanced: u64,
    /// Dice rolled, by the rules or on request.
    pub dice_rolled: u64,
}

/// The orchestrator.
pub struct GameEngine {
    state: Option<GameState>,
    rng: Box<dyn RandomSource>,
    dice: Dice,
    history: VecDeque<GameAction>,
    history_cap: usize,
    rules: RulesConfig,
    stats: EngineStats,
}

impl Default for GameEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GameEngine {
    /// Engine with the default history cap and no active game.
    pub fn new() -> Self {
        Self::with_history_cap(DEFAULT_HISTORY_CAP)
    }

    /// Engine with a custom history cap. A cap of zero disables history.
    pub fn with_history_cap(cap: usize) -> Self {
        Self {
            state: None,
            rng: Box::new(LcgRandom::default()),
            dice: Dice::new(),
            history: VecDeque::new(),
            history_cap: cap,
            rules: RulesConfig::default(),
            stats: EngineStats::default(),
        }
    }

    /// Replace the generator for the active game, e.g. with a fixed
    /// sequence in tests. Reset again by the next start or load.
    pub fn set_random_source(&mut self, rng: Box<dyn RandomSource>) {
        self.rng = rng;
    }

    fn resume_rng(&mut self, state: &GameState) {
        let mut rng = LcgRandom::new(state.rng_seed);
        rng.set_state(state.rng_state);
        self.rng = Box::new(rng);
    }

    fn install(&mut self, state: GameState) -> &GameState {
        self.resume_rng(&state);
        self.history.clear();
        self.stats.games_started += 1;
        self.state.insert(state)
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Create a fresh game from a config.
    #[instrument(skip_all, fields(players = config.player_names.len(), seed = ?config.seed))]
    pub fn start_game(&mut self, config: &GameConfig) -> Result<&GameState, EngineError> {
        let state = create_initial_state(config)?;
        self.rules = config.rules.clone();
        info!(game_id = %state.game_id, seed = state.rng_seed, "game started");
        Ok(self.install(state))
    }

    /// Resume from a JSON save. Rules are not part of a save; the engine's
    /// current rules stay in effect.
    pub fn load_game(&mut self, json: &str) -> Result<&GameState, EngineError> {
        let state = deserialize_state(json)?;
        info!(game_id = %state.game_id, turn = state.turn, "game loaded");
        Ok(self.install(state))
    }

    /// Resume from a binary save.
    pub fn load_game_binary(&mut self, bytes: &[u8]) -> Result<&GameState, EngineError> {
        let state = state_from_bytes(bytes)?;
        info!(game_id = %state.game_id, turn = state.turn, "game loaded (binary)");
        Ok(self.install(state))
    }

    /// JSON save of the active game.
    pub fn save_game(&self) -> Result<String, EngineError> {
        Ok(serialize_state(self.active()?)?)
    }

    /// Binary save of the active game.
    pub fn save_game_binary(&self) -> Result<Vec<u8>, EngineError> {
        Ok(state_to_bytes(self.active()?)?)
    }

    /// Replace the rules used for subsequent actions.
    pub fn set_rules(&mut self, rules: RulesConfig) {
        self.rules = rules;
    }

    // =========================================================================
    // ACTIONS
    // =========================================================================

    fn active(&self) -> Result<&GameState, EngineError> {
        self.state.as_ref().ok_or(EngineError::NoActiveGame)
    }

    /// Read-only pre-check.
    pub fn validate_action(&self, action: &GameAction) -> Result<(), EngineError> {
        validate_action(self.active()?, action, &self.rules)
            .map_err(|e| EngineError::Rejected(ReduceError::Rejected(e)))
    }

    /// Apply an action. On failure the state and the generator position are
    /// left exactly as they were.
    pub fn apply_action(&mut self, action: &GameAction) -> Result<Vec<GameEvent>, EngineError> {
        let state = self.state.as_ref().ok_or(EngineError::NoActiveGame)?;
        let was_over = state.game_over;
        let checkpoint = self.rng.state();

        match reduce_action(state, action, &self.rules, self.rng.as_mut()) {
            Ok(transition) => {
                let mut next = transition.state;
                next.rng_state = self.rng.state();
                self.record(action, &transition.events);

                #[cfg(feature = "debug-tracing")]
                tracing::trace!(
                    turn = next.turn,
                    phase = %next.phase,
                    hash = ?next.compute_hash().map(hex::encode),
                    "state after {}",
                    action.kind.name()
                );

                if next.game_over && !was_over {
                    info!(
                        game_id = %next.game_id,
                        condition = ?next.victory_condition,
                        winner = ?next.winner,
                        "game over"
                    );
                }
                self.state = Some(next);
                Ok(transition.events)
            }
            Err(e) => {
                self.rng.set_state(checkpoint);
                self.stats.actions_rejected += 1;
                debug!(player = %action.player_id, action = action.kind.name(), reason = %e, "action rejected");
                Err(EngineError::Rejected(e))
            }
        }
    }

    fn record(&mut self, action: &GameAction, events: &[GameEvent]) {
        self.stats.actions_applied += 1;
        for event in events {
            match event.data {
                GameEventData::PhaseChanged { .. } => self.stats.phases_advanced += 1,
                GameEventData::TileExplored { .. }
                | GameEventData::AttackResolved { .. }
                | GameEventData::TileBombed { .. } => self.stats.dice_rolled += 1,
                _ => {}
            }
        }
        if self.history_cap > 0 {
            if self.history.len() == self.history_cap {
                self.history.pop_front();
            }
            self.history.push_back(action.clone());
        }
    }

    /// Advance one phase on behalf of the phase owner.
    pub fn advance_phase(&mut self) -> Result<Vec<GameEvent>, EngineError> {
        let state = self.active()?;
        if !phase::can_advance(state) {
            return Err(ReduceError::Rejected(ValidationError::CannotAdvance).into());
        }
        let action = GameAction::new(state.current_player_id.clone(), ActionKind::AdvancePhase);
        self.apply_action(&action)
    }

    /// Rebuild a game from a config and a recorded action list. Fails on the
    /// first action that does not apply.
    #[instrument(skip_all, fields(actions = actions.len()))]
    pub fn replay(&mut self, config: &GameConfig, actions: &[GameAction]) -> Result<&GameState, EngineError> {
        self.start_game(config)?;
        for (index, action) in actions.iter().enumerate() {
            self.apply_action(action).map_err(|e| EngineError::ReplayDiverged {
                index,
                action: action.kind.name(),
                reason: e.to_string(),
            })?;
        }
        self.active()
    }

    /// Roll a die with the engine's generator. The draw is persisted into the
    /// active state so saves capture it.
    pub fn roll_dice(&mut self, dice_type: DiceType) -> Result<DiceRoll, EngineError> {
        let roll = self.dice.roll(dice_type, self.rng.as_mut())?;
        self.stats.dice_rolled += 1;
        if let Some(state) = self.state.as_mut() {
            state.rng_state = self.rng.state();
        }
        Ok(roll)
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Live state.
    pub fn get_state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    /// Owned copy of the live state.
    pub fn snapshot(&self) -> Option<GameState> {
        self.state.clone()
    }

    /// Counters.
    pub fn get_stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Recorded actions, oldest first.
    pub fn history(&self) -> &VecDeque<GameAction> {
        &self.history
    }

    /// Active rules.
    pub fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    /// Hash of the live state, for replay comparison.
    pub fn compute_state_hash(&self) -> Result<StateHash, EngineError> {
        Ok(self.active()?.compute_hash()?)
    }
}

impl std::fmt::Debug for GameEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameEngine")
            .field("game_id", &self.state.as_ref().map(|s| s.game_id.as_str()))
            .field("history", &self.history.len())
            .field("stats", &self.stats)
            .finish()
    }
}
