//! Orchestrator - the matching engine that drives a rationing call
//!
//! See `engine.rs` for the state machine and `config.rs` for configuration.

pub mod config;
pub mod engine;

pub use config::{ConfigError, EngineConfig, PolicyConfig};
pub use engine::RationingEngine;
