//! Rationing Engine - matching orchestrator
//!
//! Drives one ration-and-settle cycle over a supply/demand pair:
//! - Feasibility check (nothing mutated on failure)
//! - Allocation planning (policy rations the oversubscribed side)
//! - Verify-then-commit of every fill delta
//! - Optional contract binding, with a single re-ration on rejection
//!
//! # State Machine
//!
//! ```text
//! Validating ──→ Rationing ──→ Applying ──→ Settled
//!     │                            │
//!     └──→ Rejected                └──→ PartiallySettled
//! ```
//!
//! `PartiallySettled` is reached only through a binder rejection: the
//! rejected party is marked exhausted, fills are restored to their values
//! before the call, and the remaining market is re-rationed once. Rejections
//! on that second pass revoke the pair's volume from both nodes and are
//! reported; there is no third pass.
//!
//! # Errors
//!
//! Every error leaves both collections as they were passed in. The second
//! pass is staged on copies and written back only once it has fully
//! succeeded; if it fails, the first-pass fills are rolled back and any
//! contract bound on the second pass is released.
//!
//! # Example
//!
//! ```rust
//! use market_rationing_core_rs::orchestrator::{EngineConfig, RationingEngine};
//! use market_rationing_core_rs::{ComputeNode, NodeCollection, RationingStage};
//!
//! let engine = RationingEngine::new(EngineConfig::default()).unwrap();
//!
//! let mut left: NodeCollection = vec![ComputeNode::new("A", 60.0), ComputeNode::new("B", 40.0)].into();
//! let mut right: NodeCollection = vec![ComputeNode::new("C", 50.0)].into();
//!
//! let result = engine.ration_nodes(&mut left, &mut right).unwrap();
//! assert_eq!(result.stage, RationingStage::Settled);
//! assert_eq!(result.matched_volume, 50.0);
//! assert_eq!(left.fills(), vec![30.0, 20.0]);
//! assert_eq!(right.fills(), vec![50.0]);
//! ```

use crate::feasibility::check_feasibility;
use crate::models::allocation::{AllocationResult, NodeAllocation, RationingStage};
use crate::core::Tolerance;
use crate::models::collection::NodeCollection;
use crate::models::errors::{OverAllocationError, PolicyViolationError, RationingError};
use crate::models::event::{EventLog, RationingEvent};
use crate::models::node::Side;
use crate::orchestrator::config::{ConfigError, EngineConfig, PolicyConfig};
use crate::policy::{
    plan_allocation, AllocationPlan, LotteryPolicy, PriorityPolicy, ProportionalPolicy,
    RationingPolicy,
};
use crate::rng::SeededRng;
use crate::settlement::{sweep_pairs, BinderFailure, ContractBinder, ContractRecord, MatchedPair};
use tracing::{debug, info, warn};

/// Two-sided rationing engine.
///
/// Holds only its configuration and policy; nothing carries over between
/// calls. Safe to share across threads as long as each call gets its own
/// pair of collections.
#[derive(Debug)]
pub struct RationingEngine {
    config: EngineConfig,
    policy: Box<dyn RationingPolicy>,
}

/// Stage tracking and event log for one call.
struct RationingRun {
    stage: RationingStage,
    events: EventLog,
}

impl RationingRun {
    fn new() -> Self {
        Self {
            stage: RationingStage::Validating,
            events: EventLog::new(),
        }
    }

    fn advance(&mut self, next: RationingStage) {
        debug_assert!(
            self.stage.can_transition_to(next),
            "illegal stage transition {:?} -> {:?}",
            self.stage,
            next
        );
        debug!(from = ?self.stage, to = ?next, "rationing stage change");
        self.events.log(RationingEvent::StageChanged {
            from: self.stage,
            to: next,
        });
        self.stage = next;
    }
}

/// Outcome of one binding pass.
#[derive(Default)]
struct BindOutcome {
    contracts: Vec<ContractRecord>,
    rejected: Vec<(MatchedPair, BinderFailure)>,
}

/// Staged result of the re-ration after a binder rejection.
struct Rebind {
    plan: AllocationPlan,
    supply: NodeCollection,
    demand: NodeCollection,
    contracts: Vec<ContractRecord>,
    failures: Vec<BinderFailure>,
    revoked_volume: f64,
}

impl RationingEngine {
    /// Create an engine, building the policy named in the config.
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] if the config fails validation.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        let policy: Box<dyn RationingPolicy> = match config.policy {
            PolicyConfig::Proportional => Box::new(ProportionalPolicy::new()),
            PolicyConfig::Priority => Box::new(PriorityPolicy::new()),
            PolicyConfig::Lottery => Box::new(LotteryPolicy::new()),
        };
        Self::with_policy(config, policy)
    }

    /// Create an engine around a caller-supplied policy. `config.policy` is
    /// ignored.
    pub fn with_policy(
        config: EngineConfig,
        policy: Box<dyn RationingPolicy>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, policy })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Ration `left` (supply) against `right` (demand) in place.
    ///
    /// Tie-break randomness starts from `config.rng_seed` on every call.
    ///
    /// # Errors
    /// - [`RationingError::InfeasibleConfiguration`]: collections rejected,
    ///   left untouched
    /// - [`RationingError::OverAllocation`]: internal invariant breach; the
    ///   call halts before writing anything
    /// - [`RationingError::PolicyViolation`]: the policy broke its output
    ///   contract; the call halts before writing anything
    pub fn ration_nodes(
        &self,
        left: &mut NodeCollection,
        right: &mut NodeCollection,
    ) -> Result<AllocationResult, RationingError> {
        let mut rng = SeededRng::new(self.config.rng_seed);
        self.ration_nodes_with_rng(left, right, &mut rng)
    }

    /// [`ration_nodes`](Self::ration_nodes) with an explicitly threaded RNG.
    pub fn ration_nodes_with_rng(
        &self,
        left: &mut NodeCollection,
        right: &mut NodeCollection,
        rng: &mut SeededRng,
    ) -> Result<AllocationResult, RationingError> {
        self.run(left, right, rng, None)
    }

    /// Ration, then bind every settled pair through `binder`.
    ///
    /// Ends in `Settled` if every pair binds, `PartiallySettled` otherwise.
    pub fn ration_and_bind<B: ContractBinder>(
        &self,
        left: &mut NodeCollection,
        right: &mut NodeCollection,
        binder: &mut B,
    ) -> Result<AllocationResult, RationingError> {
        let mut rng = SeededRng::new(self.config.rng_seed);
        self.ration_and_bind_with_rng(left, right, binder, &mut rng)
    }

    /// [`ration_and_bind`](Self::ration_and_bind) with an explicitly threaded RNG.
    pub fn ration_and_bind_with_rng<B: ContractBinder>(
        &self,
        left: &mut NodeCollection,
        right: &mut NodeCollection,
        binder: &mut B,
        rng: &mut SeededRng,
    ) -> Result<AllocationResult, RationingError> {
        self.run(left, right, rng, Some(binder as &mut dyn ContractBinder))
    }

    fn run(
        &self,
        left: &mut NodeCollection,
        right: &mut NodeCollection,
        rng: &mut SeededRng,
        binder: Option<&mut dyn ContractBinder>,
    ) -> Result<AllocationResult, RationingError> {
        let tolerance = self.config.tolerance();
        let mut run = RationingRun::new();

        if let Err(err) = check_feasibility(left, right, tolerance) {
            warn!(reason = %err.reason, node = ?err.node_id, "rationing rejected");
            run.advance(RationingStage::Rejected);
            return Err(err.into());
        }

        let baseline_supply = left.fills();
        let baseline_demand = right.fills();

        run.advance(RationingStage::Rationing);
        let mut plan = self.plan(left, right, rng, 1, &mut run.events)?;

        run.advance(RationingStage::Applying);
        commit(left, right, &plan, 1, tolerance, &mut run.events)?;

        let mut contracts = Vec::new();
        let mut binder_failures = Vec::new();
        let mut revoked_volume = 0.0;
        let mut partial = false;

        if let Some(binder) = binder {
            let slack = tolerance.absolute(plan.matched_volume);
            let first = bind_pass(left, right, &plan, binder, 1, slack, &mut run.events);

            if first.rejected.is_empty() {
                contracts = first.contracts;
            } else {
                partial = true;
                for contract in &first.contracts {
                    binder.release(contract);
                }

                let staged = self.rebind(
                    left,
                    right,
                    (baseline_supply.as_slice(), baseline_demand.as_slice()),
                    first.rejected,
                    binder,
                    rng,
                    &mut run.events,
                );
                let rebind = match staged {
                    Ok(rebind) => rebind,
                    Err(err) => {
                        warn!(error = %err, "re-ration failed, rolling back");
                        restore(left, &baseline_supply);
                        restore(right, &baseline_demand);
                        return Err(err);
                    }
                };

                *left = rebind.supply;
                *right = rebind.demand;
                plan = rebind.plan;
                contracts = rebind.contracts;
                binder_failures = rebind.failures;
                revoked_volume = rebind.revoked_volume;
            }
        }

        let stage = if partial {
            RationingStage::PartiallySettled
        } else {
            RationingStage::Settled
        };
        run.advance(stage);

        let mut allocations = Vec::with_capacity(left.len() + right.len());
        collect_allocations(&mut allocations, Side::Supply, left, &baseline_supply);
        collect_allocations(&mut allocations, Side::Demand, right, &baseline_demand);

        let supply_delta: f64 = allocations
            .iter()
            .filter(|a| a.side == Side::Supply)
            .map(|a| a.delta)
            .sum();
        let demand_delta: f64 = allocations
            .iter()
            .filter(|a| a.side == Side::Demand)
            .map(|a| a.delta)
            .sum();
        let residual_imbalance = (supply_delta - demand_delta).abs();
        let scale = plan.supply_total.max(plan.demand_total);
        if residual_imbalance > tolerance.absolute(scale) {
            warn!(
                residual = residual_imbalance,
                supply = supply_delta,
                demand = demand_delta,
                "conservation residual above tolerance"
            );
        }

        let matched_volume = plan.matched_volume - revoked_volume;
        info!(
            policy = self.policy.name(),
            stage = ?stage,
            matched = matched_volume,
            supply_nodes = left.len(),
            demand_nodes = right.len(),
            failures = binder_failures.len(),
            "rationing finished"
        );

        Ok(AllocationResult {
            allocations,
            matched_volume,
            cleared: plan.is_cleared() && !partial,
            binding_side: plan.binding_side,
            stage,
            residual_imbalance,
            contracts,
            binder_failures,
            events: run.events,
        })
    }

    /// Exclude the rejected parties and re-ration once, on copies of the
    /// collections.
    ///
    /// Fills start again from the values before the call. On error nothing
    /// has been written back and every second-pass contract is released.
    #[allow(clippy::too_many_arguments)]
    fn rebind(
        &self,
        left: &NodeCollection,
        right: &NodeCollection,
        baseline: (&[f64], &[f64]),
        rejected: Vec<(MatchedPair, BinderFailure)>,
        binder: &mut dyn ContractBinder,
        rng: &mut SeededRng,
        events: &mut EventLog,
    ) -> Result<Rebind, RationingError> {
        let tolerance = self.config.tolerance();
        let mut supply = left.clone();
        let mut demand = right.clone();
        let mut failures = Vec::with_capacity(rejected.len());

        for (pair, failure) in rejected {
            let (side, node) = match failure.party {
                Side::Supply => (Side::Supply, &mut supply.nodes_mut()[pair.supply_index]),
                Side::Demand => (Side::Demand, &mut demand.nodes_mut()[pair.demand_index]),
            };
            if !node.is_exhausted() {
                node.mark_exhausted();
                warn!(node = node.id(), side = side.label(), "node exhausted after bind rejection");
                events.log(RationingEvent::NodeExhausted {
                    side,
                    node_id: node.id().to_string(),
                });
            }
            failures.push(failure);
        }

        restore(&mut supply, baseline.0);
        restore(&mut demand, baseline.1);

        let plan = self.plan(&supply, &demand, rng, 2, events)?;
        commit(&mut supply, &mut demand, &plan, 2, tolerance, events)?;

        let slack = tolerance.absolute(plan.matched_volume);
        let BindOutcome {
            contracts,
            rejected,
        } = bind_pass(&supply, &demand, &plan, binder, 2, slack, events);

        let mut revoked_volume = 0.0;
        for (pair, failure) in rejected {
            let revoked = supply.nodes_mut()[pair.supply_index]
                .revoke_fill(pair.volume, tolerance)
                .and_then(|()| {
                    demand.nodes_mut()[pair.demand_index].revoke_fill(pair.volume, tolerance)
                });
            if let Err(err) = revoked {
                for contract in &contracts {
                    binder.release(contract);
                }
                return Err(err.into());
            }

            revoked_volume += pair.volume;
            events.log(RationingEvent::PairRevoked {
                supplier_id: failure.supplier_id.clone(),
                consumer_id: failure.consumer_id.clone(),
                volume: pair.volume,
            });
            failures.push(failure);
        }

        Ok(Rebind {
            plan,
            supply,
            demand,
            contracts,
            failures,
            revoked_volume,
        })
    }

    fn plan(
        &self,
        left: &NodeCollection,
        right: &NodeCollection,
        rng: &mut SeededRng,
        pass: usize,
        events: &mut EventLog,
    ) -> Result<AllocationPlan, PolicyViolationError> {
        let plan = plan_allocation(
            self.policy.as_ref(),
            left,
            right,
            self.config.tolerance(),
            rng,
        )?;
        debug!(
            pass,
            policy = self.policy.name(),
            supply = plan.supply_total,
            demand = plan.demand_total,
            matched = plan.matched_volume,
            binding = ?plan.binding_side,
            "allocation planned"
        );
        events.log(RationingEvent::Rationed {
            pass,
            supply_total: plan.supply_total,
            demand_total: plan.demand_total,
            matched_volume: plan.matched_volume,
            binding_side: plan.binding_side,
        });
        Ok(plan)
    }
}

/// Write a plan onto both collections.
///
/// Every delta is checked before any is applied, so an over-allocation
/// leaves both collections as they were.
fn commit(
    left: &mut NodeCollection,
    right: &mut NodeCollection,
    plan: &AllocationPlan,
    pass: usize,
    tolerance: Tolerance,
    events: &mut EventLog,
) -> Result<(), OverAllocationError> {
    for (node, delta) in left.iter().zip(&plan.supply) {
        node.check_fill_within(*delta, tolerance)?;
    }
    for (node, delta) in right.iter().zip(&plan.demand) {
        node.check_fill_within(*delta, tolerance)?;
    }

    apply_side(left, Side::Supply, &plan.supply, pass, tolerance, events)?;
    apply_side(right, Side::Demand, &plan.demand, pass, tolerance, events)?;
    Ok(())
}

fn apply_side(
    collection: &mut NodeCollection,
    side: Side,
    deltas: &[f64],
    pass: usize,
    tolerance: Tolerance,
    events: &mut EventLog,
) -> Result<(), OverAllocationError> {
    for (node, delta) in collection.nodes_mut().iter_mut().zip(deltas) {
        node.apply_fill_within(*delta, tolerance)?;
        if *delta != 0.0 {
            events.log(RationingEvent::NodeFilled {
                pass,
                side,
                node_id: node.id().to_string(),
                delta: *delta,
            });
        }
    }
    Ok(())
}

fn restore(collection: &mut NodeCollection, fills: &[f64]) {
    for (node, fill) in collection.nodes_mut().iter_mut().zip(fills) {
        node.restore_fill(*fill);
    }
}

fn bind_pass(
    left: &NodeCollection,
    right: &NodeCollection,
    plan: &AllocationPlan,
    binder: &mut dyn ContractBinder,
    pass: usize,
    slack: f64,
    events: &mut EventLog,
) -> BindOutcome {
    let mut outcome = BindOutcome::default();

    for pair in sweep_pairs(&plan.supply, &plan.demand, slack) {
        let supplier = &left.nodes()[pair.supply_index];
        let consumer = &right.nodes()[pair.demand_index];

        match binder.bind(supplier, consumer, pair.volume) {
            Ok(contract) => {
                events.log(RationingEvent::ContractBound {
                    pass,
                    supplier_id: contract.supplier_id.clone(),
                    consumer_id: contract.consumer_id.clone(),
                    volume: contract.volume,
                });
                outcome.contracts.push(contract);
            }
            Err(rejection) => {
                let culprit = match rejection.party {
                    Side::Supply => supplier.id(),
                    Side::Demand => consumer.id(),
                };
                warn!(
                    pass,
                    supplier = supplier.id(),
                    consumer = consumer.id(),
                    volume = pair.volume,
                    reason = %rejection.reason,
                    "binder rejected pair"
                );
                events.log(RationingEvent::BindRejected {
                    pass,
                    party: rejection.party,
                    node_id: culprit.to_string(),
                    volume: pair.volume,
                    reason: rejection.reason.clone(),
                });
                outcome.rejected.push((
                    pair,
                    BinderFailure {
                        pass,
                        party: rejection.party,
                        supplier_id: supplier.id().to_string(),
                        consumer_id: consumer.id().to_string(),
                        volume: pair.volume,
                        reason: rejection.reason,
                    },
                ));
            }
        }
    }

    outcome
}

fn collect_allocations(
    out: &mut Vec<NodeAllocation>,
    side: Side,
    collection: &NodeCollection,
    baseline: &[f64],
) {
    for (node, before) in collection.iter().zip(baseline) {
        out.push(NodeAllocation {
            side,
            node_id: node.id().to_string(),
            delta: node.current_fill() - before,
            fill: node.current_fill(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::node::ComputeNode;
    use crate::settlement::{AcceptAllBinder, BindRejection};

    fn side(nodes: &[(&str, f64)]) -> NodeCollection {
        nodes
            .iter()
            .map(|(id, capacity)| ComputeNode::new(*id, *capacity))
            .collect()
    }

    fn engine() -> RationingEngine {
        RationingEngine::new(EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_engine_rejects_invalid_config() {
        let config = EngineConfig {
            tolerance: 0.0,
            ..EngineConfig::default()
        };
        assert!(RationingEngine::new(config).is_err());
    }

    #[test]
    fn test_stage_path_settled() {
        let mut left = side(&[("A", 10.0)]);
        let mut right = side(&[("B", 5.0)]);
        let result = engine().ration_nodes(&mut left, &mut right).unwrap();

        assert_eq!(
            result.events.stage_path(),
            vec![
                RationingStage::Validating,
                RationingStage::Rationing,
                RationingStage::Applying,
                RationingStage::Settled
            ]
        );
    }

    /// Conserves volume but pushes the first claim past its capacity.
    #[derive(Debug)]
    struct Lopsided;

    impl RationingPolicy for Lopsided {
        fn name(&self) -> &'static str {
            "lopsided"
        }

        fn ration(
            &self,
            claims: &[crate::policy::Claim<'_>],
            target: f64,
            _rng: &mut SeededRng,
        ) -> Vec<f64> {
            let mut allocations = vec![0.0; claims.len()];
            allocations[0] = claims[0].capacity + 2.0;
            allocations[1] = target - allocations[0];
            allocations
        }
    }

    #[test]
    fn test_over_allocating_policy_halts_without_mutation() {
        let engine = RationingEngine::with_policy(EngineConfig::default(), Box::new(Lopsided)).unwrap();
        let mut left = side(&[("A", 10.0), ("B", 10.0)]);
        let mut right = side(&[("C", 5.0)]);

        let err = engine.ration_nodes(&mut left, &mut right).unwrap_err();
        match err {
            RationingError::OverAllocation(e) => {
                assert_eq!(e.node_id, "A");
                assert_eq!(e.attempted, 12.0);
            }
            other => panic!("expected over-allocation, got {:?}", other),
        }
        assert_eq!(left.fills(), vec![0.0, 0.0]);
        assert_eq!(right.fills(), vec![0.0]);
    }

    #[test]
    fn test_unconserving_policy_is_a_typed_error() {
        #[derive(Debug)]
        struct Greedy;
        impl RationingPolicy for Greedy {
            fn name(&self) -> &'static str {
                "greedy"
            }
            fn ration(
                &self,
                claims: &[crate::policy::Claim<'_>],
                _target: f64,
                _rng: &mut SeededRng,
            ) -> Vec<f64> {
                claims.iter().map(|c| c.capacity).collect()
            }
        }

        let engine = RationingEngine::with_policy(EngineConfig::default(), Box::new(Greedy)).unwrap();
        let mut left = side(&[("A", 10.0)]);
        let mut right = side(&[("B", 5.0)]);

        let err = engine.ration_nodes(&mut left, &mut right).unwrap_err();
        assert!(matches!(
            err,
            RationingError::PolicyViolation(PolicyViolationError::Conservation { .. })
        ));
        assert_eq!(err.infeasibility_reason(), None);
        assert_eq!(left.fills(), vec![0.0]);
        assert_eq!(right.fills(), vec![0.0]);
    }

    #[test]
    fn test_second_pass_failure_rolls_back_everything() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        /// Serves in order on the first call, then turns lopsided.
        #[derive(Debug, Default)]
        struct BreaksOnReration {
            calls: AtomicUsize,
        }

        impl RationingPolicy for BreaksOnReration {
            fn name(&self) -> &'static str {
                "breaks_on_reration"
            }

            fn ration(
                &self,
                claims: &[crate::policy::Claim<'_>],
                target: f64,
                rng: &mut SeededRng,
            ) -> Vec<f64> {
                if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    let order: Vec<usize> = (0..claims.len()).collect();
                    crate::policy::fill_in_order(claims, &order, target)
                } else {
                    Lopsided.ration(claims, target, rng)
                }
            }
        }

        let engine = RationingEngine::with_policy(
            EngineConfig::default(),
            Box::new(BreaksOnReration::default()),
        )
        .unwrap();
        let mut left = side(&[("A", 10.0), ("B", 10.0)]);
        let mut right = side(&[("C", 10.0), ("D", 5.0)]);

        let mut binder = AcceptAllBinder::new();
        let mut refuse_b = |supplier: &ComputeNode, consumer: &ComputeNode, volume: f64| {
            if supplier.id() == "B" {
                Err(BindRejection::new(Side::Supply, "blocked"))
            } else {
                binder.bind(supplier, consumer, volume)
            }
        };

        let err = engine
            .ration_and_bind(&mut left, &mut right, &mut refuse_b)
            .unwrap_err();

        match err {
            RationingError::OverAllocation(e) => assert_eq!(e.node_id, "C"),
            other => panic!("expected over-allocation, got {:?}", other),
        }
        assert_eq!(left.fills(), vec![0.0, 0.0]);
        assert_eq!(right.fills(), vec![0.0, 0.0]);
        assert!(left.iter().chain(right.iter()).all(|node| !node.is_exhausted()));
    }

    #[test]
    fn test_binding_releases_first_pass_contracts() {
        let mut left = side(&[("A", 10.0), ("B", 10.0)]);
        let mut right = side(&[("C", 10.0)]);

        let mut binder = AcceptAllBinder::new();
        let mut refuse_b = |supplier: &ComputeNode, consumer: &ComputeNode, volume: f64| {
            if supplier.id() == "B" {
                Err(BindRejection::new(Side::Supply, "blocked"))
            } else {
                binder.bind(supplier, consumer, volume)
            }
        };

        let result = engine()
            .ration_and_bind(&mut left, &mut right, &mut refuse_b)
            .unwrap();

        assert_eq!(result.stage, RationingStage::PartiallySettled);
        assert!(left.get("B").unwrap().is_exhausted());
        assert_eq!(left.fills(), vec![10.0, 0.0]);
        assert_eq!(right.fills(), vec![10.0]);
        assert_eq!(result.contracts.len(), 1);
        assert_eq!(result.contracts[0].volume, 10.0);
    }
}
