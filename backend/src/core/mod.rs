//! Core helpers shared across the engine

pub mod digest;
pub mod tolerance;

pub use tolerance::Tolerance;
