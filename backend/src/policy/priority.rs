//! Priority rationing
//!
//! Nodes are served in full, highest `priority` first, until the matched
//! volume runs out. The node where it runs out gets the remainder; everyone
//! after it gets nothing.
//!
//! Equal priorities are ordered by one RNG draw per node, drawn in node
//! order, then by position. The draw count is always `claims.len()`, so the
//! RNG advances the same way whatever the priorities are.

use super::{fill_in_order, Claim, RationingPolicy};
use crate::rng::SeededRng;
use std::cmp::Reverse;

#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityPolicy;

impl PriorityPolicy {
    pub fn new() -> Self {
        Self
    }

    /// Serving order for `claims`.
    pub fn serving_order(claims: &[Claim<'_>], rng: &mut SeededRng) -> Vec<usize> {
        let draws: Vec<u64> = claims.iter().map(|_| rng.next_u64()).collect();
        let mut order: Vec<usize> = (0..claims.len()).collect();
        order.sort_by_key(|&i| (Reverse(claims[i].priority), draws[i], i));
        order
    }
}

impl RationingPolicy for PriorityPolicy {
    fn name(&self) -> &'static str {
        "priority"
    }

    fn ration(&self, claims: &[Claim<'_>], target: f64, rng: &mut SeededRng) -> Vec<f64> {
        let order = Self::serving_order(claims, rng);
        fill_in_order(claims, &order, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim(id: &str, priority: i64, capacity: f64) -> Claim<'_> {
        Claim {
            id,
            priority,
            capacity,
        }
    }

    #[test]
    fn test_highest_priority_served_first() {
        let claims = [claim("A", 1, 50.0), claim("B", 9, 50.0), claim("C", 5, 50.0)];
        let allocations = PriorityPolicy.ration(&claims, 70.0, &mut SeededRng::new(3));
        assert_eq!(allocations, vec![0.0, 50.0, 20.0]);
    }

    #[test]
    fn test_ties_reproducible_by_seed() {
        let claims = [claim("A", 0, 10.0), claim("B", 0, 10.0), claim("C", 0, 10.0)];
        let first = PriorityPolicy.ration(&claims, 15.0, &mut SeededRng::new(42));
        let second = PriorityPolicy.ration(&claims, 15.0, &mut SeededRng::new(42));
        assert_eq!(first, second);

        let full = first.iter().filter(|&&a| a == 10.0).count();
        let partial = first.iter().filter(|&&a| a == 5.0).count();
        assert_eq!((full, partial), (1, 1));
    }

    #[test]
    fn test_draws_one_per_claim() {
        let claims = [claim("A", 2, 1.0), claim("B", 1, 1.0)];
        let mut rng = SeededRng::new(5);
        let mut expected = rng.clone();
        PriorityPolicy.ration(&claims, 1.0, &mut rng);
        expected.next_u64();
        expected.next_u64();
        assert_eq!(rng, expected);
    }
}
