//! Deterministic Random Number Generators
//!
//! Every random value that can influence a game outcome flows through a
//! [`RandomSource`] owned by the session's engine. Two implementations:
//!
//! - [`LcgRandom`]: linear congruential generator, fully described by one
//!   31-bit state word so it can be persisted inside the game state.
//! - [`SequenceRandom`]: cycles through a fixed list of floats, used by tests
//!   to force specific dice outcomes.

use serde::{Deserialize, Serialize};

/// LCG multiplier.
pub const LCG_MULTIPLIER: u64 = 1_103_515_245;
/// LCG increment.
pub const LCG_INCREMENT: u64 = 12_345;
/// LCG modulus (2^31).
pub const LCG_MODULUS: u64 = 1 << 31;

/// Errors raised by random sources.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RngError {
    /// `next_int` called with `min > max`.
    #[error("invalid range: min {min} > max {max}")]
    InvalidRange {
        /// Requested lower bound.
        min: i64,
        /// Requested upper bound.
        max: i64,
    },
}

/// Seeded, serializable source of randomness.
pub trait RandomSource: Send {
    /// Next float in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// Current state word.
    fn state(&self) -> u64;

    /// Restore a state word previously returned by [`RandomSource::state`].
    fn set_state(&mut self, state: u64);

    /// Integer in `[min, max]`, inclusive on both ends. Consumes one draw.
    fn next_int(&mut self, min: i64, max: i64) -> Result<i64, RngError> {
        if min > max {
            return Err(RngError::InvalidRange { min, max });
        }
        let span = (max - min + 1) as f64;
        let offset = (self.next_f64() * span).floor() as i64;
        // Guard against a sequence double that is exactly 1.0.
        Ok(min + offset.min(max - min))
    }
}

// =============================================================================
// LCG
// =============================================================================

/// Linear congruential generator: `state' = (a * state + c) mod 2^31`,
/// `next = state' / 2^31`.
///
/// # Example
///
/// ```
/// use hexhold::core::rng::{LcgRandom, RandomSource};
///
/// let mut rng = LcgRandom::new(12345);
/// assert_eq!(rng.next_state(), 1_406_932_606); // Always the same!
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LcgRandom {
    state: u64,
}

impl LcgRandom {
    /// Create from a seed. Seeds are reduced modulo 2^31.
    pub fn new(seed: u64) -> Self {
        Self { state: seed % LCG_MODULUS }
    }

    /// Advance and return the raw state word.
    #[inline]
    pub fn next_state(&mut self) -> u64 {
        self.state = (LCG_MULTIPLIER * self.state + LCG_INCREMENT) % LCG_MODULUS;
        self.state
    }
}

impl Default for LcgRandom {
    fn default() -> Self {
        Self::new(0)
    }
}

impl RandomSource for LcgRandom {
    #[inline]
    fn next_f64(&mut self) -> f64 {
        self.next_state() as f64 / LCG_MODULUS as f64
    }

    fn state(&self) -> u64 {
        self.state
    }

    fn set_state(&mut self, state: u64) {
        self.state = state % LCG_MODULUS;
    }
}

// =============================================================================
// FIXED SEQUENCE
// =============================================================================

/// Test double that replays an injected list of floats forever.
///
/// The state word is the index of the next value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SequenceRandom {
    values: Vec<f64>,
    index: usize,
}

impl SequenceRandom {
    /// Create from a list of values in `[0, 1)`. An empty list yields zeros.
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, index: 0 }
    }

    /// Build a sequence that makes a `1..=faces` die land on each given face
    /// in order.
    pub fn for_faces(faces: u32, rolls: &[u32]) -> Self {
        let values = rolls
            .iter()
            .map(|&face| (f64::from(face) - 0.5) / f64::from(faces))
            .collect();
        Self::new(values)
    }
}

impl RandomSource for SequenceRandom {
    fn next_f64(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.index % self.values.len()];
        self.index = (self.index + 1) % self.values.len();
        value
    }

    fn state(&self) -> u64 {
        self.index as u64
    }

    fn set_state(&mut self, state: u64) {
        self.index = if self.values.is_empty() {
            0
        } else {
            (state % self.values.len() as u64) as usize
        };
    }
}

// =============================================================================
// TESTS
// =============================================================================
