//! Node ledger
//!
//! A [`ComputeNode`] is one market participant: how much it offers (supply
//! side) or requests (demand side), and how much of that has been filled.
//! The side is given by the collection the node sits in, so capacity and
//! fill are both non-negative magnitudes.
//!
//! CRITICAL: `0 <= fill <= capacity` (within ε relative to capacity) at all
//! times. Every mutation goes through [`ComputeNode::apply_fill_within`],
//! which refuses to break this instead of clamping.

use crate::core::Tolerance;
use crate::models::errors::OverAllocationError;
use serde::{Deserialize, Serialize};

/// Which population a node belongs to.
///
/// Left collections are supply, right collections are demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Supply,
    Demand,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Supply => Side::Demand,
            Side::Demand => Side::Supply,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Side::Supply => "supply",
            Side::Demand => "demand",
        }
    }
}

/// A market participant record.
///
/// # Example
/// ```
/// use market_rationing_core_rs::ComputeNode;
///
/// let mut node = ComputeNode::new("BANK_A", 100.0).with_priority(3);
/// node.apply_fill(40.0).unwrap();
/// assert_eq!(node.current_fill(), 40.0);
/// assert_eq!(node.remaining(), 60.0);
/// assert!(node.apply_fill(61.0).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeNode {
    /// Identity key, unique within one rationing call
    id: String,

    /// Stated quantity offered or requested
    capacity: f64,

    /// Higher is served first by the priority policy
    #[serde(default)]
    priority: i64,

    /// Quantity allocated so far
    #[serde(default)]
    fill: f64,

    /// Set when a contract binder rejected this node; its available
    /// capacity is zero from then on
    #[serde(default)]
    exhausted: bool,
}

impl ComputeNode {
    /// Create a node with zero fill and default priority.
    pub fn new(id: impl Into<String>, capacity: f64) -> Self {
        Self {
            id: id.into(),
            capacity,
            priority: 0,
            fill: 0.0,
            exhausted: false,
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn priority(&self) -> i64 {
        self.priority
    }

    pub fn current_fill(&self) -> f64 {
        self.fill
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Capacity not yet filled. May be negative for malformed input; the
    /// feasibility checker rejects that before any rationing.
    pub fn remaining(&self) -> f64 {
        self.capacity - self.fill
    }

    /// Capacity the rationing policy may still hand out.
    pub fn available(&self) -> f64 {
        if self.exhausted {
            0.0
        } else {
            self.remaining().max(0.0)
        }
    }

    /// Absolute slack allowed on this node's bounds: ε × |capacity|.
    ///
    /// A zero-capacity node gets no slack, so its fill must stay exactly 0.
    pub fn slack(&self, tolerance: Tolerance) -> f64 {
        tolerance.absolute(self.capacity)
    }

    /// [`check_fill_within`](Self::check_fill_within) at the default tolerance.
    pub fn check_fill(&self, delta: f64) -> Result<f64, OverAllocationError> {
        self.check_fill_within(delta, Tolerance::default())
    }

    /// Validate `delta` without mutating; returns the fill it would produce.
    pub fn check_fill_within(
        &self,
        delta: f64,
        tolerance: Tolerance,
    ) -> Result<f64, OverAllocationError> {
        let attempted = self.fill + delta;
        let slack = self.slack(tolerance);
        let bound = self.capacity.max(0.0);

        if !attempted.is_finite() || attempted > bound + slack || attempted < -slack {
            return Err(OverAllocationError {
                node_id: self.id.clone(),
                attempted,
                capacity: self.capacity,
            });
        }

        Ok(attempted.max(0.0))
    }

    /// Increase the fill by `delta`, at the default tolerance.
    ///
    /// # Errors
    /// [`OverAllocationError`] if the resulting fill would exceed capacity or
    /// drop below zero. The node is unchanged on error.
    pub fn apply_fill(&mut self, delta: f64) -> Result<(), OverAllocationError> {
        self.apply_fill_within(delta, Tolerance::default())
    }

    /// Increase the fill by `delta`, allowing `tolerance` relative slack.
    pub fn apply_fill_within(
        &mut self,
        delta: f64,
        tolerance: Tolerance,
    ) -> Result<(), OverAllocationError> {
        self.fill = self.check_fill_within(delta, tolerance)?;
        Ok(())
    }

    /// Take back part of a fill (a contract that could not be bound).
    pub(crate) fn revoke_fill(
        &mut self,
        amount: f64,
        tolerance: Tolerance,
    ) -> Result<(), OverAllocationError> {
        self.apply_fill_within(-amount, tolerance)
    }

    /// Reset the fill to a value recorded before the call started.
    pub(crate) fn restore_fill(&mut self, fill: f64) {
        self.fill = fill;
    }

    pub(crate) fn mark_exhausted(&mut self) {
        self.exhausted = true;
    }
}
