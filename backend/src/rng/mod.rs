//! Deterministic random number generation
//!
//! Uses the xorshift64* algorithm. Every random draw the engine makes (tie
//! breaks, lottery ordering) goes through a [`SeededRng`] passed in by the
//! caller, never through ambient or global state.

mod xorshift;

pub use xorshift::SeededRng;
