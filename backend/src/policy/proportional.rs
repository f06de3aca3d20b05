//! Uniform proportional rationing
//!
//! The standard policy: every oversubscribed node receives the same fraction
//! `M / Σcap` of its capacity, so nobody is favored beyond their stated size.
//!
//! # Rounding
//!
//! Floating-point division can leave a residual `M − Σalloc` of a few ulps.
//! The residual goes to the node with the largest capacity (lowest identity
//! key on ties), which keeps conservation exact to within ε and leaves every
//! other node's ratio untouched.
//!
//! No randomness is consumed.

use super::{Claim, RationingPolicy};
use crate::rng::SeededRng;

/// Proportional policy
///
/// # Example
///
/// ```
/// use market_rationing_core_rs::policy::{Claim, ProportionalPolicy, RationingPolicy};
/// use market_rationing_core_rs::SeededRng;
///
/// let claims = [
///     Claim { id: "A", priority: 0, capacity: 60.0 },
///     Claim { id: "B", priority: 0, capacity: 40.0 },
/// ];
/// let allocations = ProportionalPolicy.ration(&claims, 50.0, &mut SeededRng::new(1));
/// assert_eq!(allocations, vec![30.0, 20.0]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ProportionalPolicy;

impl ProportionalPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl RationingPolicy for ProportionalPolicy {
    fn name(&self) -> &'static str {
        "proportional"
    }

    fn ration(&self, claims: &[Claim<'_>], target: f64, _rng: &mut SeededRng) -> Vec<f64> {
        let aggregate: f64 = claims.iter().map(|c| c.capacity).sum();
        if target <= 0.0 || aggregate <= 0.0 {
            return vec![0.0; claims.len()];
        }

        let ratio = target / aggregate;
        let mut allocations: Vec<f64> = claims.iter().map(|c| c.capacity * ratio).collect();

        let allocated: f64 = allocations.iter().sum();
        let residual = target - allocated;
        if residual != 0.0 {
            if let Some(index) = residual_sink(claims) {
                allocations[index] += residual;
            }
        }

        allocations
    }
}

/// Index of the claim with the largest capacity, lowest id on ties.
fn residual_sink(claims: &[Claim<'_>]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (index, claim) in claims.iter().enumerate() {
        best = match best {
            None => Some(index),
            Some(current) => {
                let incumbent = &claims[current];
                if claim.capacity > incumbent.capacity
                    || (claim.capacity == incumbent.capacity && claim.id < incumbent.id)
                {
                    Some(index)
                } else {
                    Some(current)
                }
            }
        };
    }
    best
}
