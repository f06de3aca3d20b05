//! Contract binder interface
//!
//! The binder is the caller's hook for turning a matched volume into a
//! binding contract: a credit check, a ledger entry, an instrument issue.
//! The engine calls it once per bilateral pair it settles and reacts to a
//! rejection by excluding the rejected party and re-rationing once.

use crate::models::node::{ComputeNode, Side};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A bilateral contract accepted by a binder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRecord {
    /// Unique contract identifier (UUID)
    pub id: String,

    pub supplier_id: String,
    pub consumer_id: String,
    pub volume: f64,
}

impl ContractRecord {
    pub fn new(supplier_id: impl Into<String>, consumer_id: impl Into<String>, volume: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            supplier_id: supplier_id.into(),
            consumer_id: consumer_id.into(),
            volume,
        }
    }

    /// Contract for a supplier/consumer pair.
    pub fn between(supplier: &ComputeNode, consumer: &ComputeNode, volume: f64) -> Self {
        Self::new(supplier.id(), consumer.id(), volume)
    }
}

/// Binder refused a pair. `party` says whose fault it was.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} party rejected: {reason}", .party.label())]
pub struct BindRejection {
    pub party: Side,
    pub reason: String,
}

impl BindRejection {
    pub fn new(party: Side, reason: impl Into<String>) -> Self {
        Self {
            party,
            reason: reason.into(),
        }
    }
}

/// A refused bind attempt, as reported in the allocation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinderFailure {
    /// 1 = initial ration, 2 = re-ration
    pub pass: usize,
    pub party: Side,
    pub supplier_id: String,
    pub consumer_id: String,
    pub volume: f64,
    pub reason: String,
}

/// Turns matched volume into contracts.
///
/// Any `FnMut(&ComputeNode, &ComputeNode, f64) -> Result<ContractRecord, BindRejection>`
/// is a binder:
///
/// ```
/// use market_rationing_core_rs::settlement::{BindRejection, ContractBinder, ContractRecord};
/// use market_rationing_core_rs::{ComputeNode, Side};
///
/// let mut credit_check = |supplier: &ComputeNode, consumer: &ComputeNode, volume: f64| {
///     if consumer.id() == "RISKY" {
///         Err(BindRejection::new(Side::Demand, "credit limit"))
///     } else {
///         Ok(ContractRecord::between(supplier, consumer, volume))
///     }
/// };
///
/// let a = ComputeNode::new("A", 10.0);
/// let risky = ComputeNode::new("RISKY", 10.0);
/// assert!(credit_check.bind(&a, &risky, 5.0).is_err());
/// ```
pub trait ContractBinder {
    /// Bind `volume` between `supplier` and `consumer`.
    fn bind(
        &mut self,
        supplier: &ComputeNode,
        consumer: &ComputeNode,
        volume: f64,
    ) -> Result<ContractRecord, BindRejection>;

    /// Undo a contract bound earlier in the same call (before a re-ration).
    fn release(&mut self, _contract: &ContractRecord) {}
}

impl<F> ContractBinder for F
where
    F: FnMut(&ComputeNode, &ComputeNode, f64) -> Result<ContractRecord, BindRejection>,
{
    fn bind(
        &mut self,
        supplier: &ComputeNode,
        consumer: &ComputeNode,
        volume: f64,
    ) -> Result<ContractRecord, BindRejection> {
        self(supplier, consumer, volume)
    }
}

/// Binder that accepts every pair and keeps the live contracts.
#[derive(Debug, Clone, Default)]
pub struct AcceptAllBinder {
    bound: Vec<ContractRecord>,
}

impl AcceptAllBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contracts bound and not released.
    pub fn bound(&self) -> &[ContractRecord] {
        &self.bound
    }

    pub fn total_volume(&self) -> f64 {
        self.bound.iter().map(|c| c.volume).sum()
    }
}

impl ContractBinder for AcceptAllBinder {
    fn bind(
        &mut self,
        supplier: &ComputeNode,
        consumer: &ComputeNode,
        volume: f64,
    ) -> Result<ContractRecord, BindRejection> {
        let contract = ContractRecord::between(supplier, consumer, volume);
        self.bound.push(contract.clone());
        Ok(contract)
    }

    fn release(&mut self, contract: &ContractRecord) {
        self.bound.retain(|c| c.id != contract.id);
    }
}
