//! State Factory
//!
//! Builds the initial state of a match from a config and converts states to
//! and from their storage forms. Maps travel as ordered `(id, entity)` pair
//! lists so the encoding does not depend on a map representation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::core::hex::{coordinates_in_range, ring, HexCoord};
use crate::core::rng::{LcgRandom, RandomSource, RngError, LCG_MODULUS};
use crate::game::constants::{
    self, MAP_RADIUS, MOTHERSHIP_HEALTH, MOTHERSHIP_SHIELD, SETTLEMENT_COORDS,
    SETTLEMENT_NAMES, STARTING_CONTROL_TOKENS, STARTING_POPULATION, STARTING_RESOURCES,
    STARTING_SHIELD_LEVEL,
};
use crate::game::phase;
use crate::game::rules::RulesConfig;
use crate::game::state::{
    AntagonistState, Character, CharacterId, CharacterType, ControlStatus, GameState, Phase,
    Player, PlayerId, PlayerRole, Resources, Settlement, SettlementId, Tile, TileId, TileType,
    VictoryCondition,
};

/// Seats in a match.
pub const MAX_PLAYERS: usize = 2;

/// State construction and decoding errors.
#[derive(Debug, Error)]
pub enum StateError {
    /// No player names supplied.
    #[error("at least one player is required")]
    NoPlayers,

    /// More names than seats.
    #[error("too many players: {0} (max {MAX_PLAYERS})")]
    TooManyPlayers(usize),

    /// Player ids do not line up with names.
    #[error("{ids} player ids supplied for {names} players")]
    PlayerIdMismatch {
        /// Ids supplied.
        ids: usize,
        /// Names supplied.
        names: usize,
    },

    /// Override refers to something that does not exist.
    #[error("invalid override: {0}")]
    InvalidOverride(String),

    /// Decoded data violates a state invariant.
    #[error("corrupt state: {0}")]
    Corrupt(String),

    /// Random source misuse during generation.
    #[error(transparent)]
    Rng(#[from] RngError),

    /// JSON encoding failure.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary encoding failure.
    #[error("binary: {0}")]
    Binary(#[from] bincode::Error),
}

// =============================================================================
// CONFIG
// =============================================================================

/// Per-settlement starting adjustments.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementOverride {
    /// Settlement to adjust.
    pub settlement_id: SettlementId,
    /// Starting healthy population.
    pub population: Option<u32>,
    /// Starting wounded.
    pub wounded: Option<u32>,
    /// Starting inventory.
    pub resources: Option<Resources>,
}

/// Partial starting-state overrides, applied after generation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateOverrides {
    /// Settlement adjustments.
    #[serde(default)]
    pub settlements: Vec<SettlementOverride>,
    /// Mothership hull.
    pub mothership_health: Option<u32>,
    /// Mothership shield.
    pub mothership_shield: Option<u32>,
    /// Antagonist control tokens.
    pub control_tokens: Option<u32>,
}

/// Everything needed to create a match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Display names, in seat order.
    pub player_names: Vec<String>,
    /// Explicit player ids, parallel to `player_names`.
    #[serde(default)]
    pub player_ids: Option<Vec<PlayerId>>,
    /// Seed; a random one is drawn when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Starting-state adjustments.
    #[serde(default)]
    pub overrides: Option<StateOverrides>,
    /// Tunable mechanics.
    #[serde(default)]
    pub rules: RulesConfig,
}

impl GameConfig {
    /// Config with default rules and a random seed.
    pub fn new(player_names: Vec<String>) -> Self {
        Self {
            player_names,
            player_ids: None,
            seed: None,
            overrides: None,
            rules: RulesConfig::default(),
        }
    }

    /// Fix the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Use explicit player ids.
    pub fn with_player_ids(mut self, ids: Vec<PlayerId>) -> Self {
        self.player_ids = Some(ids);
        self
    }

    /// Apply starting-state overrides.
    pub fn with_overrides(mut self, overrides: StateOverrides) -> Self {
        self.overrides = Some(overrides);
        self
    }

    /// Replace the rules.
    pub fn with_rules(mut self, rules: RulesConfig) -> Self {
        self.rules = rules;
        self
    }
}

// =============================================================================
// CREATION
// =============================================================================

/// Draw a seed from the non-deterministic id source. Only used when the
/// caller did not pick one.
fn random_seed() -> u64 {
    (Uuid::new_v4().as_u128() as u64) % LCG_MODULUS
}

fn draw_index(rng: &mut dyn RandomSource, len: usize) -> Result<usize, RngError> {
    Ok(rng.next_int(0, len as i64 - 1)? as usize)
}

fn build_players(config: &GameConfig) -> Result<Vec<Player>, StateError> {
    let names = &config.player_names;
    if names.is_empty() {
        return Err(StateError::NoPlayers);
    }
    if names.len() > MAX_PLAYERS {
        return Err(StateError::TooManyPlayers(names.len()));
    }
    if let Some(ids) = &config.player_ids {
        if ids.len() != names.len() {
            return Err(StateError::PlayerIdMismatch { ids: ids.len(), names: names.len() });
        }
    }

    Ok(names
        .iter()
        .enumerate()
        .map(|(i, name)| Player {
            id: config
                .player_ids
                .as_ref()
                .map(|ids| ids[i].clone())
                .unwrap_or_else(|| PlayerId::new(format!("player-{}", i + 1))),
            name: name.clone(),
            role: PlayerRole::for_seat(i),
        })
        .collect())
}

fn build_tiles(rng: &mut dyn RandomSource) -> Result<BTreeMap<TileId, Tile>, StateError> {
    let mut tiles = BTreeMap::new();
    for (index, coords) in coordinates_in_range(HexCoord::ORIGIN, MAP_RADIUS)
        .into_iter()
        .enumerate()
    {
        let is_settlement = SETTLEMENT_COORDS.contains(&coords);
        let tile_type = if is_settlement {
            TileType::Urban
        } else {
            TileType::ALL[draw_index(rng, TileType::ALL.len())?]
        };

        let cache = match (is_settlement, constants::cache_bounds(tile_type)) {
            (false, Some(bounds)) => {
                let mut cache = Resources::default();
                for (kind, min, max) in bounds {
                    let amount = rng.next_int(i64::from(min), i64::from(max))?;
                    cache.add(kind, amount as u32);
                }
                Some(cache)
            }
            _ => None,
        };

        let explored = SETTLEMENT_COORDS
            .iter()
            .any(|s| s.distance(coords) <= 1);

        let id = TileId(index as u32);
        tiles.insert(
            id,
            Tile {
                id,
                coords,
                tile_type,
                explored,
                destroyed: false,
                building: None,
                cache,
            },
        );
    }
    Ok(tiles)
}

fn tile_id_at(tiles: &BTreeMap<TileId, Tile>, coords: HexCoord) -> Result<TileId, StateError> {
    tiles
        .values()
        .find(|t| t.coords == coords)
        .map(|t| t.id)
        .ok_or_else(|| StateError::Corrupt(format!("no tile at {coords}")))
}

fn apply_overrides(state: &mut GameState, overrides: &StateOverrides) -> Result<(), StateError> {
    for adjust in &overrides.settlements {
        let settlement = state
            .settlements
            .get_mut(&adjust.settlement_id)
            .ok_or_else(|| StateError::InvalidOverride(format!("unknown {}", adjust.settlement_id)))?;
        if let Some(population) = adjust.population {
            settlement.population = population;
        }
        if let Some(wounded) = adjust.wounded {
            settlement.wounded = wounded;
        }
        if let Some(resources) = adjust.resources {
            settlement.resources = resources;
        }
    }
    if let Some(health) = overrides.mothership_health {
        state.antagonist.mothership_health = health;
    }
    if let Some(shield) = overrides.mothership_shield {
        state.antagonist.mothership_shield = shield;
    }
    if let Some(tokens) = overrides.control_tokens {
        state.antagonist.control_tokens = tokens;
    }
    Ok(())
}

/// Build the starting state. Identical configs with the same seed produce
/// identical states apart from `game_id`.
pub fn create_initial_state(config: &GameConfig) -> Result<GameState, StateError> {
    let players = build_players(config)?;
    let seed = config.seed.unwrap_or_else(random_seed);
    let mut rng = LcgRandom::new(seed);

    let tiles = build_tiles(&mut rng)?;

    let mut settlements = BTreeMap::new();
    for (index, (coords, name)) in SETTLEMENT_COORDS.iter().zip(SETTLEMENT_NAMES).enumerate() {
        let id = SettlementId(index as u32);
        settlements.insert(
            id,
            Settlement {
                id,
                name: name.to_string(),
                tile_id: tile_id_at(&tiles, *coords)?,
                control: ControlStatus::Defender,
                population: STARTING_POPULATION,
                wounded: 0,
                resources: STARTING_RESOURCES,
                buildings: Vec::new(),
                members: Vec::new(),
            },
        );
    }

    // Type-major round robin: every settlement gets a leader before anyone
    // gets a doctor.
    let mut characters = BTreeMap::new();
    let mut next_id = 0;
    for character_type in CharacterType::ALL {
        for settlement in settlements.values_mut() {
            let id = CharacterId(next_id);
            next_id += 1;
            settlement.members.push(id);
            characters.insert(
                id,
                Character {
                    id,
                    character_type,
                    settlement_id: settlement.id,
                    current_tile_id: None,
                    is_wounded: false,
                    is_used: false,
                    can_act: true,
                },
            );
        }
    }

    let landing: Vec<TileId> = ring(HexCoord::ORIGIN, MAP_RADIUS)
        .into_iter()
        .filter(|c| !SETTLEMENT_COORDS.contains(c))
        .map(|c| tile_id_at(&tiles, c))
        .collect::<Result<_, _>>()?;
    let mothership_tile = landing[draw_index(&mut rng, landing.len())?];

    let mut state = GameState {
        game_id: Uuid::new_v4().to_string(),
        turn: 1,
        phase: Phase::Preparation,
        current_player_id: players[0].id.clone(),
        players,
        tiles,
        settlements,
        characters,
        antagonist: AntagonistState {
            shield_level: STARTING_SHIELD_LEVEL,
            control_tokens: STARTING_CONTROL_TOKENS,
            mothership_health: MOTHERSHIP_HEALTH,
            mothership_shield: MOTHERSHIP_SHIELD,
            current_tile_id: Some(mothership_tile),
            has_auxiliary_vessel: true,
            actions_used: 0,
        },
        actions_this_turn: Vec::new(),
        beacon_turns: 0,
        game_over: false,
        victory_condition: None,
        winner: None,
        rng_seed: seed,
        rng_state: rng.state(),
    };

    if let Some(overrides) = &config.overrides {
        apply_overrides(&mut state, overrides)?;
    }
    state.current_player_id = phase::owner_of(&state, state.phase);
    Ok(state)
}

// =============================================================================
// SERIALIZATION
// =============================================================================

/// Storage form of [`GameState`]: maps flattened to ordered pair lists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedGameState {
    /// Game identifier.
    pub game_id: String,
    /// Turn number.
    pub turn: u32,
    /// Current phase.
    pub phase: Phase,
    /// Player who may act.
    pub current_player_id: PlayerId,
    /// Seats.
    pub players: Vec<Player>,
    /// Tiles as `(id, tile)` pairs.
    pub tiles: Vec<(TileId, Tile)>,
    /// Settlements as `(id, settlement)` pairs.
    pub settlements: Vec<(SettlementId, Settlement)>,
    /// Characters as `(id, character)` pairs.
    pub characters: Vec<(CharacterId, Character)>,
    /// Antagonist state.
    pub antagonist: AntagonistState,
    /// Serialized actions this turn.
    pub actions_this_turn: Vec<String>,
    /// Beacon streak.
    pub beacon_turns: u32,
    /// Terminal flag.
    pub game_over: bool,
    /// Victory condition.
    pub victory_condition: Option<VictoryCondition>,
    /// Winner.
    pub winner: Option<PlayerRole>,
    /// Creation seed.
    pub rng_seed: u64,
    /// Generator position.
    pub rng_state: u64,
}

impl From<&GameState> for SerializedGameState {
    fn from(state: &GameState) -> Self {
        Self {
            game_id: state.game_id.clone(),
            turn: state.turn,
            phase: state.phase,
            current_player_id: state.current_player_id.clone(),
            players: state.players.clone(),
            tiles: state.tiles.iter().map(|(k, v)| (*k, v.clone())).collect(),
            settlements: state.settlements.iter().map(|(k, v)| (*k, v.clone())).collect(),
            characters: state.characters.iter().map(|(k, v)| (*k, v.clone())).collect(),
            antagonist: state.antagonist.clone(),
            actions_this_turn: state.actions_this_turn.clone(),
            beacon_turns: state.beacon_turns,
            game_over: state.game_over,
            victory_condition: state.victory_condition,
            winner: state.winner,
            rng_seed: state.rng_seed,
            rng_state: state.rng_state,
        }
    }
}

fn collect_pairs<K, V>(
    what: &str,
    pairs: Vec<(K, V)>,
    id_of: impl Fn(&V) -> K,
) -> Result<BTreeMap<K, V>, StateError>
where
    K: Ord + Copy + std::fmt::Display,
{
    let mut map = BTreeMap::new();
    for (key, value) in pairs {
        if id_of(&value) != key {
            return Err(StateError::Corrupt(format!("{what} key {key} does not match entry")));
        }
        if map.insert(key, value).is_some() {
            return Err(StateError::Corrupt(format!("duplicate {what} {key}")));
        }
    }
    Ok(map)
}

impl TryFrom<SerializedGameState> for GameState {
    type Error = StateError;

    fn try_from(s: SerializedGameState) -> Result<Self, Self::Error> {
        let tiles = collect_pairs("tile", s.tiles, |t| t.id)?;
        let settlements = collect_pairs("settlement", s.settlements, |v| v.id)?;
        let characters = collect_pairs("character", s.characters, |c| c.id)?;

        if let Some(bad) = tiles.values().find(|t| !t.coords.is_valid()) {
            return Err(StateError::Corrupt(format!("{} has invalid coordinates", bad.id)));
        }
        if !s.players.iter().any(|p| p.id == s.current_player_id) {
            return Err(StateError::Corrupt(format!(
                "current player {} is not seated",
                s.current_player_id
            )));
        }
        for settlement in settlements.values() {
            if !tiles.contains_key(&settlement.tile_id) {
                return Err(StateError::Corrupt(format!("{} stands on unknown tile", settlement.id)));
            }
            for member in &settlement.members {
                let consistent = characters
                    .get(member)
                    .map(|c| c.settlement_id == settlement.id)
                    .unwrap_or(false);
                if !consistent {
                    return Err(StateError::Corrupt(format!(
                        "{} lists {member} but it belongs elsewhere",
                        settlement.id
                    )));
                }
            }
        }
        for character in characters.values() {
            let listed = settlements
                .get(&character.settlement_id)
                .map(|s| s.members.contains(&character.id))
                .unwrap_or(false);
            if !listed {
                return Err(StateError::Corrupt(format!("{} has no home settlement", character.id)));
            }
        }

        Ok(GameState {
            game_id: s.game_id,
            turn: s.turn,
            phase: s.phase,
            current_player_id: s.current_player_id,
            players: s.players,
            tiles,
            settlements,
            characters,
            antagonist: s.antagonist,
            actions_this_turn: s.actions_this_turn,
            beacon_turns: s.beacon_turns,
            game_over: s.game_over,
            victory_condition: s.victory_condition,
            winner: s.winner,
            rng_seed: s.rng_seed,
            rng_state: s.rng_state,
        })
    }
}

/// Encode as JSON.
pub fn serialize_state(state: &GameState) -> Result<String, StateError> {
    Ok(serde_json::to_string(&SerializedGameState::from(state))?)
}

/// Decode and validate JSON.
pub fn deserialize_state(json: &str) -> Result<GameState, StateError> {
    let serialized: SerializedGameState = serde_json::from_str(json)?;
    GameState::try_from(serialized)
}

/// Encode as compact binary.
pub fn state_to_bytes(state: &GameState) -> Result<Vec<u8>, StateError> {
    Ok(bincode::serialize(&SerializedGameState::from(state))?)
}

/// Decode and validate compact binary.
pub fn state_from_bytes(bytes: &[u8]) -> Result<GameState, StateError> {
    let serialized: SerializedGameState = bincode::deserialize(bytes)?;
    GameState::try_from(serialized)
}
