//! Feasibility tests through the engine
//!
//! A rejected call must leave both collections exactly as they were.

use market_rationing_core_rs::{
    ComputeNode, EngineConfig, InfeasibilityReason, NodeCollection, RationingEngine,
    RationingError,
};

fn side(nodes: &[(&str, f64)]) -> NodeCollection {
    nodes
        .iter()
        .map(|(id, capacity)| ComputeNode::new(*id, *capacity))
        .collect()
}

fn engine() -> RationingEngine {
    RationingEngine::new(EngineConfig::default()).unwrap()
}

/// Bit-exact view of a collection, so NaN compares equal to itself.
fn fingerprint(collection: &NodeCollection) -> Vec<(String, u64, u64, i64, bool)> {
    collection
        .iter()
        .map(|node| {
            (
                node.id().to_string(),
                node.capacity().to_bits(),
                node.current_fill().to_bits(),
                node.priority(),
                node.is_exhausted(),
            )
        })
        .collect()
}

fn assert_rejected(
    mut left: NodeCollection,
    mut right: NodeCollection,
    expected: InfeasibilityReason,
) {
    let left_before = fingerprint(&left);
    let right_before = fingerprint(&right);

    let err = engine().ration_nodes(&mut left, &mut right).unwrap_err();
    match &err {
        RationingError::InfeasibleConfiguration(e) => assert_eq!(e.reason, expected),
        other => panic!("expected infeasible configuration, got {:?}", other),
    }

    assert_eq!(fingerprint(&left), left_before, "supply side mutated on rejection");
    assert_eq!(fingerprint(&right), right_before, "demand side mutated on rejection");
}

#[test]
fn test_scenario_5_empty_supply_side() {
    assert_rejected(side(&[]), side(&[("C", 10.0)]), InfeasibilityReason::EmptySide);
}

#[test]
fn test_empty_demand_side() {
    assert_rejected(
        side(&[("A", 10.0), ("B", 3.0)]),
        side(&[]),
        InfeasibilityReason::EmptySide,
    );
}

#[test]
fn test_negative_capacity() {
    assert_rejected(
        side(&[("A", 10.0)]),
        side(&[("C", 5.0), ("D", -2.0)]),
        InfeasibilityReason::NegativeCapacity,
    );
}

#[test]
fn test_overfilled_node_has_negative_remaining() {
    let mut left = side(&[("A", 10.0)]);
    left.nodes_mut()[0].apply_fill(10.0).unwrap();
    let mut json = serde_json::to_value(&left).unwrap();
    json[0]["fill"] = serde_json::json!(12.0);
    let left: NodeCollection = serde_json::from_value(json).unwrap();

    assert_rejected(left, side(&[("C", 5.0)]), InfeasibilityReason::NegativeCapacity);
}

#[test]
fn test_nan_capacity() {
    assert_rejected(
        side(&[("A", f64::NAN)]),
        side(&[("C", 5.0)]),
        InfeasibilityReason::NonFiniteValue,
    );
}

#[test]
fn test_nan_on_demand_side() {
    assert_rejected(
        side(&[("A", 3.0), ("B", 4.0)]),
        side(&[("C", 5.0), ("D", f64::NAN)]),
        InfeasibilityReason::NonFiniteValue,
    );
}

#[test]
fn test_fingerprint_tells_nan_payloads_apart() {
    let a = side(&[("A", f64::NAN)]);
    assert_eq!(fingerprint(&a), fingerprint(&a.clone()));
    assert_ne!(fingerprint(&a), fingerprint(&side(&[("A", 1.0)])));
}

#[test]
fn test_infinite_capacity() {
    assert_rejected(
        side(&[("A", 1.0)]),
        side(&[("C", f64::INFINITY)]),
        InfeasibilityReason::NonFiniteValue,
    );
}

#[test]
fn test_duplicate_ids() {
    assert_rejected(
        side(&[("A", 1.0), ("A", 2.0)]),
        side(&[("C", 5.0)]),
        InfeasibilityReason::DuplicateNodeId,
    );
}

#[test]
fn test_both_sides_empty_is_noop() {
    let mut left = side(&[]);
    let mut right = side(&[]);
    let result = engine().ration_nodes(&mut left, &mut right).unwrap();
    assert_eq!(result.matched_volume, 0.0);
    assert!(result.allocations.is_empty());
}

#[test]
fn test_error_reason_accessor() {
    let mut left = side(&[]);
    let mut right = side(&[("C", 10.0)]);
    let err = engine().ration_nodes(&mut left, &mut right).unwrap_err();
    assert_eq!(err.infeasibility_reason(), Some(InfeasibilityReason::EmptySide));
    assert_eq!(err.to_string(), "infeasible configuration: EMPTY_SIDE");
}
