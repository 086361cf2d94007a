//! Deterministic seeded randomness.
//!
//! Every random draw an effect makes is a pure function of the user seed and the number of
//! draws taken so far (or, with [`frame_rng`], of the seed and a frame index). Nothing here reads
//! the clock or the OS entropy pool.

use crate::foundation::core::FrameIndex;
use crate::foundation::math::Fnv1a32;

/// Seed used when the user seed is empty or whitespace.
pub const DEFAULT_SEED: &str = "frameloom";

// Substituted when a hash lands on zero; xorshift state must never be zero.
const NONZERO_FALLBACK: u32 = 0x9e37_79b9;

const TWO_POW_32: f64 = 4_294_967_296.0;

/// Hash a user seed into a stable, non-zero 32-bit value.
pub fn hash_seed(seed: &str) -> u32 {
    let mut h = Fnv1a32::new_default();
    h.write_bytes(effective_seed(seed).as_bytes());
    nonzero(h.finish())
}

/// Create a stream generator for `seed`.
pub fn create_rng(seed: &str) -> Rng {
    Rng::from_state(hash_seed(seed))
}

/// Create an independent stream for one frame of a seeded animation.
///
/// Lets an effect render frame `n` directly instead of replaying the draws of frames `0..n`.
pub fn frame_rng(seed: &str, frame: FrameIndex) -> Rng {
    let mut h = Fnv1a32::new_default();
    h.write_bytes(effective_seed(seed).as_bytes());
    h.write_bytes(b":");
    h.write_bytes(&frame.0.to_le_bytes());
    Rng::from_state(nonzero(h.finish()))
}

fn effective_seed(seed: &str) -> &str {
    if seed.trim().is_empty() {
        DEFAULT_SEED
    } else {
        seed
    }
}

fn nonzero(h: u32) -> u32 {
    if h == 0 { NONZERO_FALLBACK } else { h }
}

/// xorshift32 (13/17/5) stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rng {
    state: u32,
}

impl Rng {
    /// Start a stream from a raw state. Zero is remapped to a fixed non-zero state.
    pub fn from_state(state: u32) -> Self {
        Self {
            state: nonzero(state),
        }
    }

    /// Current internal state.
    pub fn state(&self) -> u32 {
        self.state
    }

    /// Advance and return the raw 32-bit state.
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Advance and return a float in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / TWO_POW_32
    }

    /// Uniform float in `[min, max)`.
    pub fn range(&mut self, min: f64, max: f64) -> f64 {
        min + (max - min) * self.next_f64()
    }

    /// Uniform integer in `[0, n)`; `0` when `n == 0`.
    pub fn below(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        ((self.next_f64() * n as f64) as usize).min(n - 1)
    }

    /// Pick one element uniformly.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        items.get(self.below(items.len()))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/rng.rs"]
mod tests;
