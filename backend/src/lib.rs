//! Market Rationing Core - Rust Engine
//!
//! Two-sided rationing engine: clears supply against demand when the two
//! aggregates differ, with deterministic, reproducible rationing of the
//! oversubscribed side.
//!
//! # Architecture
//!
//! - **models**: Domain types (ComputeNode, NodeCollection, AllocationResult, errors, events)
//! - **feasibility**: Validation of a supply/demand pair before rationing
//! - **policy**: Rationing policies (proportional, priority, lottery)
//! - **orchestrator**: State machine driving validate → ration → apply → settle
//! - **settlement**: Pairing of fills and the contract binder interface
//! - **rng**: Deterministic random number generation
//! - **core**: Tolerance and canonical hashing
//!
//! # Critical Invariants
//!
//! 1. Conservation: Σ supply fills == Σ demand fills (within ε)
//! 2. No node is ever filled beyond its capacity
//! 3. All randomness is explicit and seeded
//! 4. Infeasible input is rejected before anything is mutated
//!
//! # Example
//!
//! ```rust
//! use market_rationing_core_rs::{ComputeNode, EngineConfig, NodeCollection, RationingEngine};
//!
//! let engine = RationingEngine::new(EngineConfig::default()).unwrap();
//! let mut supply: NodeCollection = vec![ComputeNode::new("A", 200.0)].into();
//! let mut demand: NodeCollection = vec![ComputeNode::new("B", 50.0)].into();
//!
//! engine.ration_nodes(&mut supply, &mut demand).unwrap();
//! assert_eq!(supply.total_fill(), demand.total_fill());
//! ```

pub mod core;
pub mod feasibility;
pub mod models;
pub mod orchestrator;
pub mod policy;
pub mod rng;
pub mod settlement;

pub use feasibility::check_feasibility;
pub use models::{
    allocation::{AllocationResult, NodeAllocation, RationingStage},
    collection::NodeCollection,
    errors::{
        InfeasibilityReason, InfeasibleConfigurationError, OverAllocationError,
        PolicyViolationError, RationingError,
    },
    event::{EventLog, RationingEvent},
    node::{ComputeNode, Side},
};
pub use orchestrator::{ConfigError, EngineConfig, PolicyConfig, RationingEngine};
pub use policy::RationingPolicy;
pub use rng::SeededRng;
pub use settlement::{AcceptAllBinder, BindRejection, ContractBinder, ContractRecord};
