//! Rationing Policy Module
//!
//! A rationing policy decides how the volume that can actually be matched is
//! shared out among the nodes of the oversubscribed side.
//!
//! # Overview
//!
//! Given supply aggregate `S` and demand aggregate `D`, the matched volume is
//! `M = min(S, D)`. The side whose aggregate equals `M` is the **binding
//! side**: every node on it is served in full. The other side is
//! oversubscribed and the policy distributes `M` across its nodes.
//!
//! # Policy Interface
//!
//! All policies implement [`RationingPolicy`]:
//! ```rust
//! use market_rationing_core_rs::policy::{Claim, RationingPolicy};
//! use market_rationing_core_rs::SeededRng;
//!
//! #[derive(Debug)]
//! struct FirstComeFirstServed;
//!
//! impl RationingPolicy for FirstComeFirstServed {
//!     fn name(&self) -> &'static str {
//!         "first_come"
//!     }
//!
//!     fn ration(&self, claims: &[Claim<'_>], target: f64, _rng: &mut SeededRng) -> Vec<f64> {
//!         let order: Vec<usize> = (0..claims.len()).collect();
//!         market_rationing_core_rs::policy::fill_in_order(claims, &order, target)
//!     }
//! }
//! ```
//!
//! Contract for implementors:
//! - return exactly one allocation per claim, in claim order
//! - each allocation lies in `[0, claim.capacity]`
//! - allocations sum to `target` (within floating-point rounding)
//! - output depends only on the claims, the target and the RNG draws; no
//!   hidden state
//!
//! Available policies:
//! 1. **Proportional**: everyone gets the same fraction of their capacity
//! 2. **Priority**: highest priority served first, seeded tie-breaks
//! 3. **Lottery**: seeded random serving order

use crate::core::Tolerance;
use crate::models::collection::NodeCollection;
use crate::models::errors::PolicyViolationError;
use crate::models::node::{ComputeNode, Side};
use crate::rng::SeededRng;
use std::fmt;

pub mod lottery;
pub mod priority;
pub mod proportional;

pub use lottery::LotteryPolicy;
pub use priority::PriorityPolicy;
pub use proportional::ProportionalPolicy;

/// One oversubscribed node as seen by a policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Claim<'a> {
    pub id: &'a str,
    pub priority: i64,

    /// Quantity the node can still take (its available capacity)
    pub capacity: f64,
}

impl<'a> From<&'a ComputeNode> for Claim<'a> {
    fn from(node: &'a ComputeNode) -> Self {
        Claim {
            id: node.id(),
            priority: node.priority(),
            capacity: node.available(),
        }
    }
}

/// Strategy for sharing the matched volume across an oversubscribed side.
pub trait RationingPolicy: fmt::Debug + Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Allocate `target` across `claims`.
    ///
    /// `target` is strictly less than the sum of claim capacities whenever
    /// this is called by the planner.
    fn ration(&self, claims: &[Claim<'_>], target: f64, rng: &mut SeededRng) -> Vec<f64>;
}

/// Serve claims one after another in `order`, each up to its capacity,
/// until `target` is used up.
pub fn fill_in_order(claims: &[Claim<'_>], order: &[usize], target: f64) -> Vec<f64> {
    let mut allocations = vec![0.0; claims.len()];
    let mut remaining = target.max(0.0);

    for &index in order {
        if remaining <= 0.0 {
            break;
        }
        let take = claims[index].capacity.max(0.0).min(remaining);
        allocations[index] = take;
        remaining -= take;
    }

    allocations
}

/// Allocation decided for one call, before it is written onto the nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationPlan {
    /// S: available supply
    pub supply_total: f64,

    /// D: available demand
    pub demand_total: f64,

    /// M = min(S, D)
    pub matched_volume: f64,

    /// Fully served side; `None` when balanced
    pub binding_side: Option<Side>,

    /// One entry per supply node, in collection order
    pub supply: Vec<f64>,

    /// One entry per demand node, in collection order
    pub demand: Vec<f64>,
}

impl AllocationPlan {
    /// True when no node had to be rationed.
    pub fn is_cleared(&self) -> bool {
        self.binding_side.is_none()
    }

    pub fn allocations(&self, side: Side) -> &[f64] {
        match side {
            Side::Supply => &self.supply,
            Side::Demand => &self.demand,
        }
    }

    /// |Σ supply − Σ demand| of the planned allocations.
    pub fn imbalance(&self) -> f64 {
        let supply: f64 = self.supply.iter().sum();
        let demand: f64 = self.demand.iter().sum();
        (supply - demand).abs()
    }
}

/// Compute the allocation for a supply/demand pair.
///
/// Works on available capacity (capacity minus existing fill, zero for
/// exhausted nodes). Callers are expected to have run the feasibility check.
///
/// `S` and `D` within ε of `max(S, D)` count as balanced; an all-zero market
/// is an exact no-op.
///
/// # Errors
/// [`PolicyViolationError`] if the policy returns the wrong number of
/// allocations, or allocations whose sum leaves the two sides more than ε
/// apart. Per-node capacity bounds are left to the node ledger.
///
/// # Example
/// ```
/// use market_rationing_core_rs::policy::{plan_allocation, ProportionalPolicy};
/// use market_rationing_core_rs::{ComputeNode, NodeCollection, SeededRng, Side};
/// use market_rationing_core_rs::core::Tolerance;
///
/// let left: NodeCollection = vec![ComputeNode::new("A", 60.0), ComputeNode::new("B", 40.0)].into();
/// let right: NodeCollection = vec![ComputeNode::new("C", 50.0)].into();
///
/// let plan = plan_allocation(
///     &ProportionalPolicy,
///     &left,
///     &right,
///     Tolerance::default(),
///     &mut SeededRng::new(1),
/// )
/// .unwrap();
/// assert_eq!(plan.matched_volume, 50.0);
/// assert_eq!(plan.binding_side, Some(Side::Demand));
/// assert_eq!(plan.supply, vec![30.0, 20.0]);
/// assert_eq!(plan.demand, vec![50.0]);
/// ```
pub fn plan_allocation(
    policy: &dyn RationingPolicy,
    left: &NodeCollection,
    right: &NodeCollection,
    tolerance: Tolerance,
    rng: &mut SeededRng,
) -> Result<AllocationPlan, PolicyViolationError> {
    let supply_claims: Vec<Claim<'_>> = left.iter().map(Claim::from).collect();
    let demand_claims: Vec<Claim<'_>> = right.iter().map(Claim::from).collect();

    let supply_total: f64 = supply_claims.iter().map(|c| c.capacity).sum();
    let demand_total: f64 = demand_claims.iter().map(|c| c.capacity).sum();
    let matched_volume = supply_total.min(demand_total);

    let full = |claims: &[Claim<'_>]| claims.iter().map(|c| c.capacity).collect::<Vec<f64>>();

    let scale = supply_total.max(demand_total);
    let (binding_side, supply, demand) =
        if (supply_total == 0.0 && demand_total == 0.0)
            || tolerance.approx_eq(supply_total, demand_total, scale)
        {
            (None, full(&supply_claims), full(&demand_claims))
        } else if supply_total > demand_total {
            let supply = policy.ration(&supply_claims, matched_volume, rng);
            (Some(Side::Demand), supply, full(&demand_claims))
        } else {
            let demand = policy.ration(&demand_claims, matched_volume, rng);
            (Some(Side::Supply), full(&supply_claims), demand)
        };

    for (side, allocations, claims) in [
        (Side::Supply, &supply, &supply_claims),
        (Side::Demand, &demand, &demand_claims),
    ] {
        if allocations.len() != claims.len() {
            return Err(PolicyViolationError::AllocationCount {
                policy: policy.name(),
                side,
                expected: claims.len(),
                actual: allocations.len(),
            });
        }
    }

    let plan = AllocationPlan {
        supply_total,
        demand_total,
        matched_volume,
        binding_side,
        supply,
        demand,
    };

    let imbalance = plan.imbalance();
    if imbalance.is_nan() || imbalance > tolerance.absolute(scale) {
        return Err(PolicyViolationError::Conservation {
            policy: policy.name(),
            supply: plan.supply.iter().sum(),
            demand: plan.demand.iter().sum(),
        });
    }

    Ok(plan)
}
