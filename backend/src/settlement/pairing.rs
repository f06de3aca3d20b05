//! Bilateral pairing of aggregate fills
//!
//! The rationing step only decides how much each node gets. To hand bilateral
//! contracts to a binder, the per-node amounts are paired up with a
//! north-west-corner sweep: walk both sides in collection order, match the
//! current supply node against the current demand node for the smaller of
//! their outstanding amounts, and advance whichever side ran out.
//!
//! The sweep is deterministic and produces at most `L + R − 1` pairs. Summing
//! pair volumes per node gives back that node's amount, up to `slack`.

use serde::{Deserialize, Serialize};

/// One supply node matched against one demand node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchedPair {
    pub supply_index: usize,
    pub demand_index: usize,
    pub volume: f64,
}

/// Pair up `supply` and `demand` amounts in order.
///
/// Outstanding amounts at or below `slack` are treated as exhausted, so
/// floating-point dust never produces a contract.
///
/// # Example
/// ```
/// use market_rationing_core_rs::settlement::sweep_pairs;
///
/// let pairs = sweep_pairs(&[100.0, 50.0], &[90.0, 60.0], 1e-9);
/// let volumes: Vec<f64> = pairs.iter().map(|p| p.volume).collect();
/// assert_eq!(volumes, vec![90.0, 10.0, 50.0]);
/// ```
pub fn sweep_pairs(supply: &[f64], demand: &[f64], slack: f64) -> Vec<MatchedPair> {
    let mut pairs = Vec::new();
    let (mut i, mut j) = (0, 0);
    let mut supply_left = supply.first().copied().unwrap_or(0.0);
    let mut demand_left = demand.first().copied().unwrap_or(0.0);

    while i < supply.len() && j < demand.len() {
        if supply_left <= slack {
            i += 1;
            supply_left = supply.get(i).copied().unwrap_or(0.0);
            continue;
        }
        if demand_left <= slack {
            j += 1;
            demand_left = demand.get(j).copied().unwrap_or(0.0);
            continue;
        }

        let volume = supply_left.min(demand_left);
        pairs.push(MatchedPair {
            supply_index: i,
            demand_index: j,
            volume,
        });
        supply_left -= volume;
        demand_left -= volume;
    }

    pairs
}
