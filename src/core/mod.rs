//! Core deterministic primitives.
//!
//! Pure, dependency-light building blocks shared by the rules engine:
//! hex grid math, seeded random sources and state hashing.

pub mod hex;
pub mod rng;
pub mod hash;

// Re-export core types
pub use hex::HexCoord;
pub use rng::{LcgRandom, RandomSource, RngError, SequenceRandom};
pub use hash::{StateHash, StateHasher};
