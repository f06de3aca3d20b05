//! Error types surfaced by the rationing engine
//!
//! - [`InfeasibleConfigurationError`]: the caller handed over node collections
//!   that cannot be rationed. Detected before any mutation.
//! - [`OverAllocationError`]: a fill would push a node past its capacity. Under
//!   correct policy math this never happens; the orchestrator halts on it
//!   instead of clamping.
//! - [`PolicyViolationError`]: a rationing policy returned output that breaks
//!   its contract (wrong allocation count, or allocations that do not
//!   conserve volume). Only reachable through a caller-supplied policy; the
//!   orchestrator halts on it before writing anything.

use crate::models::node::Side;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a pair of node collections was rejected before rationing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InfeasibilityReason {
    /// One side is empty while the other side has non-zero aggregate capacity
    EmptySide,

    /// A node's remaining capacity is negative beyond tolerance
    NegativeCapacity,

    /// A capacity, fill or aggregate is NaN or infinite
    NonFiniteValue,

    /// Two nodes share an identity key
    DuplicateNodeId,
}

impl InfeasibilityReason {
    /// Stable reason code, as used in logs and serialized reports.
    pub fn code(&self) -> &'static str {
        match self {
            InfeasibilityReason::EmptySide => "EMPTY_SIDE",
            InfeasibilityReason::NegativeCapacity => "NEGATIVE_CAPACITY",
            InfeasibilityReason::NonFiniteValue => "NON_FINITE_VALUE",
            InfeasibilityReason::DuplicateNodeId => "DUPLICATE_NODE_ID",
        }
    }
}

impl fmt::Display for InfeasibilityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Node collections failed the feasibility check.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("infeasible configuration: {reason}{}", node_suffix(.node_id))]
pub struct InfeasibleConfigurationError {
    pub reason: InfeasibilityReason,

    /// Offending node, when the failure is attributable to one
    pub node_id: Option<String>,
}

fn node_suffix(node_id: &Option<String>) -> String {
    match node_id {
        Some(id) => format!(" (node {})", id),
        None => String::new(),
    }
}

impl InfeasibleConfigurationError {
    pub fn new(reason: InfeasibilityReason) -> Self {
        Self {
            reason,
            node_id: None,
        }
    }

    pub fn for_node(reason: InfeasibilityReason, node_id: impl Into<String>) -> Self {
        Self {
            reason,
            node_id: Some(node_id.into()),
        }
    }
}

/// A fill would exceed a node's capacity (or turn negative).
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("over-allocation on node {node_id}: attempted fill {attempted}, capacity {capacity}")]
pub struct OverAllocationError {
    pub node_id: String,

    /// Fill the node would have reached
    pub attempted: f64,

    pub capacity: f64,
}

/// A rationing policy's output broke the policy contract.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyViolationError {
    #[error("policy {policy} returned {actual} allocations for {expected} {side:?} nodes")]
    AllocationCount {
        policy: &'static str,
        side: Side,
        expected: usize,
        actual: usize,
    },

    #[error("policy {policy} broke conservation: supply {supply} vs demand {demand}")]
    Conservation {
        policy: &'static str,
        supply: f64,
        demand: f64,
    },
}

/// Any failure of a rationing call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RationingError {
    #[error(transparent)]
    InfeasibleConfiguration(#[from] InfeasibleConfigurationError),

    #[error(transparent)]
    OverAllocation(#[from] OverAllocationError),

    #[error(transparent)]
    PolicyViolation(#[from] PolicyViolationError),
}

impl RationingError {
    /// Reason code when this is a feasibility failure.
    pub fn infeasibility_reason(&self) -> Option<InfeasibilityReason> {
        match self {
            RationingError::InfeasibleConfiguration(err) => Some(err.reason),
            RationingError::OverAllocation(_) | RationingError::PolicyViolation(_) => None,
        }
    }
}
