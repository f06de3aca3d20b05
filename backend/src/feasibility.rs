//! Feasibility checker
//!
//! Runs before anything is mutated. A pair of collections that fails here is
//! handed back to the caller exactly as it came in.
//!
//! Checks, in order:
//! 1. Every capacity and fill is finite, and so are both aggregates
//! 2. No node has negative capacity, fill or remaining capacity beyond
//!    tolerance
//! 3. Identity keys are unique across both sides
//! 4. Neither side is empty while the other side has something to match

use crate::core::Tolerance;
use crate::models::collection::NodeCollection;
use crate::models::errors::{InfeasibilityReason, InfeasibleConfigurationError};
use crate::models::node::ComputeNode;
use std::collections::HashSet;

/// Validate a supply/demand pair before rationing.
///
/// # Example
/// ```
/// use market_rationing_core_rs::{check_feasibility, ComputeNode, InfeasibilityReason, NodeCollection};
/// use market_rationing_core_rs::core::Tolerance;
///
/// let left = NodeCollection::new();
/// let right: NodeCollection = vec![ComputeNode::new("C", 10.0)].into();
///
/// let err = check_feasibility(&left, &right, Tolerance::default()).unwrap_err();
/// assert_eq!(err.reason, InfeasibilityReason::EmptySide);
/// ```
pub fn check_feasibility(
    left: &NodeCollection,
    right: &NodeCollection,
    tolerance: Tolerance,
) -> Result<(), InfeasibleConfigurationError> {
    let all_nodes = || left.iter().chain(right.iter());

    for node in all_nodes() {
        if !node.capacity().is_finite() || !node.current_fill().is_finite() {
            return Err(InfeasibleConfigurationError::for_node(
                InfeasibilityReason::NonFiniteValue,
                node.id(),
            ));
        }
    }
    if !left.aggregate_capacity().is_finite() || !right.aggregate_capacity().is_finite() {
        return Err(InfeasibleConfigurationError::new(
            InfeasibilityReason::NonFiniteValue,
        ));
    }

    if let Some(node) = all_nodes().find(|node| is_negative(node, tolerance)) {
        return Err(InfeasibleConfigurationError::for_node(
            InfeasibilityReason::NegativeCapacity,
            node.id(),
        ));
    }

    let mut seen = HashSet::new();
    for node in all_nodes() {
        if !seen.insert(node.id()) {
            return Err(InfeasibleConfigurationError::for_node(
                InfeasibilityReason::DuplicateNodeId,
                node.id(),
            ));
        }
    }

    let supply = left.aggregate_available();
    let demand = right.aggregate_available();
    let slack = tolerance.absolute(supply.max(demand));
    if (left.is_empty() && demand > slack) || (right.is_empty() && supply > slack) {
        return Err(InfeasibleConfigurationError::new(
            InfeasibilityReason::EmptySide,
        ));
    }

    Ok(())
}

fn is_negative(node: &ComputeNode, tolerance: Tolerance) -> bool {
    let slack = node.slack(tolerance);
    node.capacity() < -slack || node.current_fill() < -slack || node.remaining() < -slack
}
