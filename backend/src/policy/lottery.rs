//! Lottery rationing
//!
//! The serving order is a seeded Fisher–Yates shuffle of the oversubscribed
//! nodes; nodes are then served in full in that order until the matched
//! volume runs out. Priorities are ignored.

use super::{fill_in_order, Claim, RationingPolicy};
use crate::rng::SeededRng;

#[derive(Debug, Clone, Copy, Default)]
pub struct LotteryPolicy;

impl LotteryPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl RationingPolicy for LotteryPolicy {
    fn name(&self) -> &'static str {
        "lottery"
    }

    fn ration(&self, claims: &[Claim<'_>], target: f64, rng: &mut SeededRng) -> Vec<f64> {
        let order = rng.permutation(claims.len());
        fill_in_order(claims, &order, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> Vec<Claim<'static>> {
        ["A", "B", "C", "D", "E"]
            .into_iter()
            .map(|id| Claim {
                id,
                priority: 0,
                capacity: 10.0,
            })
            .collect()
    }

    #[test]
    fn test_lottery_matches_permutation() {
        let claims = claims();
        let order = SeededRng::new(11).permutation(claims.len());
        let allocations = LotteryPolicy.ration(&claims, 25.0, &mut SeededRng::new(11));

        assert_eq!(allocations[order[0]], 10.0);
        assert_eq!(allocations[order[1]], 10.0);
        assert_eq!(allocations[order[2]], 5.0);
        assert_eq!(allocations[order[3]], 0.0);
        assert_eq!(allocations[order[4]], 0.0);
    }

    #[test]
    fn test_lottery_deterministic() {
        let claims = claims();
        let a = LotteryPolicy.ration(&claims, 33.0, &mut SeededRng::new(8));
        let b = LotteryPolicy.ration(&claims, 33.0, &mut SeededRng::new(8));
        assert_eq!(a, b);
        assert_eq!(a.iter().sum::<f64>(), 33.0);
    }
}
