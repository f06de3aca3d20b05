//! Allocation results
//!
//! What a rationing call reports back: the delta written onto every node,
//! the matched volume, the terminal stage, and any contracts bound or refused
//! along the way.

use crate::core::digest::canonical_digest;
use crate::models::event::EventLog;
use crate::models::node::Side;
use crate::settlement::binder::{BinderFailure, ContractRecord};
use serde::{Deserialize, Serialize};

/// Orchestrator state machine.
///
/// ```text
/// Validating → Rationing → Applying → Settled
///      ↓                       ↓
///   Rejected            PartiallySettled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RationingStage {
    Validating,
    Rationing,
    Applying,
    Settled,
    PartiallySettled,
    Rejected,
}

impl RationingStage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RationingStage::Settled | RationingStage::PartiallySettled | RationingStage::Rejected
        )
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: RationingStage) -> bool {
        use RationingStage::*;
        matches!(
            (self, next),
            (Validating, Rationing)
                | (Validating, Rejected)
                | (Rationing, Applying)
                | (Applying, Settled)
                | (Applying, PartiallySettled)
        )
    }
}

/// Delta applied to one node by one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAllocation {
    pub side: Side,
    pub node_id: String,

    /// Fill added by this call (net of any revocation)
    pub delta: f64,

    /// Node's fill once the call returned
    pub fill: f64,
}

/// Outcome of a successful rationing call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationResult {
    /// Supply nodes first, then demand nodes, each in collection order
    pub allocations: Vec<NodeAllocation>,

    /// Volume matched on each side
    pub matched_volume: f64,

    /// True when supply and demand were equal and nobody was rationed
    pub cleared: bool,

    /// Fully served side of the final pass; `None` if balanced or empty
    pub binding_side: Option<Side>,

    /// `Settled` or `PartiallySettled`
    pub stage: RationingStage,

    /// |Σ supply deltas − Σ demand deltas|
    pub residual_imbalance: f64,

    /// Contracts the binder accepted on the final pass
    pub contracts: Vec<ContractRecord>,

    /// Bind attempts the binder refused, across both passes
    pub binder_failures: Vec<BinderFailure>,

    pub events: EventLog,
}

impl AllocationResult {
    pub fn is_partial(&self) -> bool {
        self.stage == RationingStage::PartiallySettled
    }

    pub fn allocations_for(&self, side: Side) -> impl Iterator<Item = &NodeAllocation> {
        self.allocations.iter().filter(move |a| a.side == side)
    }

    pub fn delta_for(&self, node_id: &str) -> Option<f64> {
        self.allocations
            .iter()
            .find(|a| a.node_id == node_id)
            .map(|a| a.delta)
    }

    /// Sum of deltas on one side.
    pub fn side_total(&self, side: Side) -> f64 {
        self.allocations_for(side).map(|a| a.delta).sum()
    }

    /// SHA-256 fingerprint of the per-node allocations.
    ///
    /// Two runs with the same inputs and seed produce the same digest.
    pub fn digest(&self) -> Result<String, serde_json::Error> {
        canonical_digest(&self.allocations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_transitions() {
        use RationingStage::*;
        assert!(Validating.can_transition_to(Rationing));
        assert!(Validating.can_transition_to(Rejected));
        assert!(Applying.can_transition_to(PartiallySettled));
        assert!(!Rationing.can_transition_to(Settled));
        assert!(!Settled.can_transition_to(Rationing));

        assert!(Settled.is_terminal());
        assert!(Rejected.is_terminal());
        assert!(!Applying.is_terminal());
    }
}
