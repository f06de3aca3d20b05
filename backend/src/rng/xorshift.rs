//! xorshift64* random number generator
//!
//! Fast 64-bit PRNG with a single word of state. The rationing engine only
//! needs it for reproducible tie-breaking, so statistical quality beyond
//! xorshift64* is not a concern.
//!
//! # Determinism
//!
//! Same seed and same sequence of calls → same draws, on every platform.
//! Allocation vectors produced by the randomized policies are therefore
//! bit-for-bit reproducible.

use serde::{Deserialize, Serialize};

/// Seeded xorshift64* generator threaded through rationing policies.
///
/// # Example
/// ```
/// use market_rationing_core_rs::SeededRng;
///
/// let mut rng = SeededRng::new(12345);
/// let draw = rng.next_u64();
/// let index = rng.below(10); // [0, 10)
/// assert!(index < 10);
/// # let _ = draw;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    /// Create a generator from a seed. A zero seed is mapped to 1 since
    /// xorshift never leaves the all-zero state.
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Next raw 64-bit draw.
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Uniform-ish draw in `[0, bound)`.
    ///
    /// # Panics
    /// Panics if `bound` is zero.
    pub fn below(&mut self, bound: usize) -> usize {
        assert!(bound > 0, "bound must be positive");
        (self.next_u64() % bound as u64) as usize
    }

    /// Draw in `[0.0, 1.0)` built from the top 53 bits.
    pub fn next_f64(&mut self) -> f64 {
        let value = self.next_u64();
        (value >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// Fisher–Yates permutation of `0..len`.
    ///
    /// Consumes exactly `len.saturating_sub(1)` draws.
    pub fn permutation(&mut self, len: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..len).collect();
        for i in (1..len).rev() {
            let j = self.below(i + 1);
            order.swap(i, j);
        }
        order
    }

    /// Current internal state, for replaying from a known point.
    pub fn state(&self) -> u64 {
        self.state
    }
}
