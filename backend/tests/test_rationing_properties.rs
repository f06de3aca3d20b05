//! Property tests for the rationing engine
//!
//! Conservation, capacity bounds, proportionality, idempotence on balanced
//! input and seeded determinism, over randomly generated markets. Sub-unit
//! markets get their own properties since ε stays relative at every scale.

use market_rationing_core_rs::{
    ComputeNode, EngineConfig, NodeCollection, PolicyConfig, RationingEngine, Side,
};
use proptest::prelude::*;

fn collection(prefix: &str, capacities: &[f64]) -> NodeCollection {
    capacities
        .iter()
        .enumerate()
        .map(|(i, capacity)| ComputeNode::new(format!("{}{:03}", prefix, i), *capacity))
        .collect()
}

fn capacities() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.001f64..1_000_000.0, 1..20)
}

fn sub_unit_capacities() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1e-6f64..1.0, 1..20)
}

fn policies() -> impl Strategy<Value = PolicyConfig> {
    prop_oneof![
        Just(PolicyConfig::Proportional),
        Just(PolicyConfig::Priority),
        Just(PolicyConfig::Lottery),
    ]
}

fn engine(policy: PolicyConfig, seed: u64) -> RationingEngine {
    RationingEngine::new(EngineConfig::default().with_policy(policy).with_seed(seed)).unwrap()
}

fn scale(left: &NodeCollection, right: &NodeCollection) -> f64 {
    left.aggregate_capacity().max(right.aggregate_capacity())
}

proptest! {
    #[test]
    fn prop_conservation(
        supply in capacities(),
        demand in capacities(),
        policy in policies(),
        seed in any::<u64>(),
    ) {
        let mut left = collection("S", &supply);
        let mut right = collection("D", &demand);
        let result = engine(policy, seed).ration_nodes(&mut left, &mut right).unwrap();

        let tolerance = 1e-9 * scale(&left, &right);
        prop_assert!((left.total_fill() - right.total_fill()).abs() <= tolerance);
        prop_assert!(result.residual_imbalance <= tolerance);

        let expected = left.aggregate_capacity().min(right.aggregate_capacity());
        prop_assert!((result.matched_volume - expected).abs() <= tolerance);
    }

    #[test]
    fn prop_fills_never_exceed_capacity(
        supply in capacities(),
        demand in capacities(),
        policy in policies(),
        seed in any::<u64>(),
    ) {
        let mut left = collection("S", &supply);
        let mut right = collection("D", &demand);
        engine(policy, seed).ration_nodes(&mut left, &mut right).unwrap();

        for node in left.iter().chain(right.iter()) {
            prop_assert!(node.current_fill() >= 0.0, "{} negative fill", node.id());
            prop_assert!(
                node.current_fill() <= node.capacity() * (1.0 + 1e-9),
                "{} filled {} over capacity {}",
                node.id(),
                node.current_fill(),
                node.capacity()
            );
        }
    }

    #[test]
    fn prop_proportional_ratio_uniform(
        supply in capacities(),
        demand in capacities(),
    ) {
        let mut left = collection("S", &supply);
        let mut right = collection("D", &demand);
        let result = engine(PolicyConfig::Proportional, 1)
            .ration_nodes(&mut left, &mut right)
            .unwrap();

        let rationed = match result.binding_side {
            Some(Side::Demand) => &left,
            Some(Side::Supply) => &right,
            None => return Ok(()),
        };

        let ratio = result.matched_volume / rationed.aggregate_capacity();
        let sink = rationed
            .iter()
            .fold(None::<&ComputeNode>, |best, node| match best {
                Some(b) if b.capacity() > node.capacity()
                    || (b.capacity() == node.capacity() && b.id() <= node.id()) => Some(b),
                _ => Some(node),
            })
            .map(|node| node.id().to_string());

        for node in rationed.iter() {
            if Some(node.id().to_string()) == sink {
                continue;
            }
            let expected = node.capacity() * ratio;
            prop_assert!(
                (node.current_fill() - expected).abs() <= 1e-9 * node.capacity(),
                "{}: fill {} expected {}",
                node.id(),
                node.current_fill(),
                expected
            );
        }
    }

    #[test]
    fn prop_sub_unit_markets_stay_relative(
        supply in sub_unit_capacities(),
        demand in sub_unit_capacities(),
        policy in policies(),
        seed in any::<u64>(),
    ) {
        let mut left = collection("S", &supply);
        let mut right = collection("D", &demand);
        let s = left.aggregate_capacity();
        let d = right.aggregate_capacity();
        let result = engine(policy, seed).ration_nodes(&mut left, &mut right).unwrap();

        let tolerance = 1e-9 * s.max(d);
        prop_assert!(
            (left.total_fill() - right.total_fill()).abs() <= tolerance,
            "supply {} demand {}",
            left.total_fill(),
            right.total_fill()
        );
        prop_assert!((result.matched_volume - s.min(d)).abs() <= tolerance);
        if result.cleared {
            prop_assert!((s - d).abs() <= tolerance, "cleared with S={} D={}", s, d);
        }
        for node in left.iter().chain(right.iter()) {
            prop_assert!(node.current_fill() <= node.capacity() * (1.0 + 1e-9));
        }
    }

    #[test]
    fn prop_sub_unit_near_balance_is_rationed(
        supply in sub_unit_capacities(),
        excess in 1e-8f64..1e-3,
    ) {
        let demand: Vec<f64> = supply.iter().map(|c| c * (1.0 + excess)).collect();
        let mut left = collection("S", &supply);
        let mut right = collection("D", &demand);
        let result = engine(PolicyConfig::Proportional, 3)
            .ration_nodes(&mut left, &mut right)
            .unwrap();

        prop_assert!(!result.cleared);
        prop_assert_eq!(result.binding_side, Some(Side::Supply));
        let tolerance = 1e-9 * right.aggregate_capacity();
        prop_assert!((left.total_fill() - right.total_fill()).abs() <= tolerance);
    }

    #[test]
    fn prop_balanced_input_fills_exactly(
        units in prop::collection::vec(1u32..10_000, 1..20),
        policy in policies(),
    ) {
        let supply: Vec<f64> = units.iter().map(|&u| f64::from(u)).collect();
        let mut demand = supply.clone();
        demand.reverse();

        let mut left = collection("S", &supply);
        let mut right = collection("D", &demand);
        let result = engine(policy, 9).ration_nodes(&mut left, &mut right).unwrap();

        prop_assert!(result.cleared);
        for node in left.iter().chain(right.iter()) {
            prop_assert_eq!(node.current_fill(), node.capacity());
        }
    }

    #[test]
    fn prop_same_seed_same_fills(
        supply in capacities(),
        demand in capacities(),
        policy in policies(),
        seed in any::<u64>(),
    ) {
        let run = || {
            let mut left = collection("S", &supply);
            let mut right = collection("D", &demand);
            engine(policy, seed).ration_nodes(&mut left, &mut right).unwrap();
            left.iter()
                .chain(right.iter())
                .map(|node| node.current_fill().to_bits())
                .collect::<Vec<u64>>()
        };
        prop_assert_eq!(run(), run());
    }
}
