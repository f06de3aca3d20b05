//! Domain models for the rationing engine

pub mod allocation;
pub mod collection;
pub mod errors;
pub mod event;
pub mod node;

pub use allocation::{AllocationResult, NodeAllocation, RationingStage};
pub use collection::NodeCollection;
pub use errors::{
    InfeasibilityReason, InfeasibleConfigurationError, OverAllocationError, PolicyViolationError,
    RationingError,
};
pub use event::{EventLog, RationingEvent};
pub use node::{ComputeNode, Side};
