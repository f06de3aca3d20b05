//! Event logging for rationing audits and replay.
//!
//! Every rationing call records what it did, in order, into an [`EventLog`]
//! returned with the [`AllocationResult`](crate::models::allocation::AllocationResult).
//! Events make it possible to:
//! - Audit a settlement (which nodes were filled, which were rejected)
//! - Debug a partial settlement (why a node was exhausted)
//! - Compare two replays event-by-event
//!
//! # Example
//!
//! ```rust
//! use market_rationing_core_rs::models::{RationingEvent, EventLog, Side};
//!
//! let mut log = EventLog::new();
//! log.log(RationingEvent::NodeFilled {
//!     pass: 1,
//!     side: Side::Supply,
//!     node_id: "A".to_string(),
//!     delta: 30.0,
//! });
//! assert_eq!(log.events_for_node("A").len(), 1);
//! ```

use crate::models::allocation::RationingStage;
use crate::models::node::Side;
use serde::Serialize;

/// Something that happened during one rationing call.
///
/// `pass` is 1 for the initial ration and 2 for the single re-ration that
/// follows a binder rejection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RationingEvent {
    /// Orchestrator moved to a new stage
    StageChanged {
        from: RationingStage,
        to: RationingStage,
    },

    /// Policy computed an allocation plan
    Rationed {
        pass: usize,
        supply_total: f64,
        demand_total: f64,
        matched_volume: f64,
        /// Fully served side; `None` when the market was balanced
        binding_side: Option<Side>,
    },

    /// Allocation written back onto a node
    NodeFilled {
        pass: usize,
        side: Side,
        node_id: String,
        delta: f64,
    },

    /// Binder accepted a bilateral contract
    ContractBound {
        pass: usize,
        supplier_id: String,
        consumer_id: String,
        volume: f64,
    },

    /// Binder refused a bilateral contract
    BindRejected {
        pass: usize,
        party: Side,
        node_id: String,
        volume: f64,
        reason: String,
    },

    /// Node excluded from the re-ration
    NodeExhausted { side: Side, node_id: String },

    /// Volume of a pair rejected on the final pass, taken back from both nodes
    PairRevoked {
        supplier_id: String,
        consumer_id: String,
        volume: f64,
    },
}

impl RationingEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            RationingEvent::StageChanged { .. } => "StageChanged",
            RationingEvent::Rationed { .. } => "Rationed",
            RationingEvent::NodeFilled { .. } => "NodeFilled",
            RationingEvent::ContractBound { .. } => "ContractBound",
            RationingEvent::BindRejected { .. } => "BindRejected",
            RationingEvent::NodeExhausted { .. } => "NodeExhausted",
            RationingEvent::PairRevoked { .. } => "PairRevoked",
        }
    }

    /// Whether this event concerns the given node.
    pub fn involves(&self, id: &str) -> bool {
        match self {
            RationingEvent::NodeFilled { node_id, .. }
            | RationingEvent::BindRejected { node_id, .. }
            | RationingEvent::NodeExhausted { node_id, .. } => node_id == id,
            RationingEvent::ContractBound {
                supplier_id,
                consumer_id,
                ..
            }
            | RationingEvent::PairRevoked {
                supplier_id,
                consumer_id,
                ..
            } => supplier_id == id || consumer_id == id,
            RationingEvent::StageChanged { .. } | RationingEvent::Rationed { .. } => false,
        }
    }
}

/// Ordered log of rationing events.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EventLog {
    events: Vec<RationingEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn log(&mut self, event: RationingEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[RationingEvent] {
        &self.events
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<&RationingEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    pub fn events_for_node(&self, node_id: &str) -> Vec<&RationingEvent> {
        self.events.iter().filter(|e| e.involves(node_id)).collect()
    }

    /// Stages visited, in order, starting from the first one left.
    pub fn stage_path(&self) -> Vec<RationingStage> {
        let mut path = Vec::new();
        for event in &self.events {
            if let RationingEvent::StageChanged { from, to } = event {
                if path.is_empty() {
                    path.push(*from);
                }
                path.push(*to);
            }
        }
        path
    }
}
