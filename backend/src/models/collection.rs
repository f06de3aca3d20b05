//! Node collections
//!
//! An ordered, caller-owned sequence of [`ComputeNode`]s. Order matters: it is
//! the insertion order used for deterministic tie-breaking and pairing.

use crate::models::node::ComputeNode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeCollection {
    nodes: Vec<ComputeNode>,
}

impl NodeCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: ComputeNode) {
        self.nodes.push(node);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[ComputeNode] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [ComputeNode] {
        &mut self.nodes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ComputeNode> {
        self.nodes.iter()
    }

    pub fn get(&self, id: &str) -> Option<&ComputeNode> {
        self.nodes.iter().find(|node| node.id() == id)
    }

    /// Sum of stated capacities.
    pub fn aggregate_capacity(&self) -> f64 {
        self.nodes.iter().map(ComputeNode::capacity).sum()
    }

    /// Sum of capacity still available for rationing.
    pub fn aggregate_available(&self) -> f64 {
        self.nodes.iter().map(ComputeNode::available).sum()
    }

    pub fn total_fill(&self) -> f64 {
        self.nodes.iter().map(ComputeNode::current_fill).sum()
    }

    pub fn fills(&self) -> Vec<f64> {
        self.nodes.iter().map(ComputeNode::current_fill).collect()
    }
}

impl From<Vec<ComputeNode>> for NodeCollection {
    fn from(nodes: Vec<ComputeNode>) -> Self {
        Self { nodes }
    }
}

impl FromIterator<ComputeNode> for NodeCollection {
    fn from_iter<I: IntoIterator<Item = ComputeNode>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a NodeCollection {
    type Item = &'a ComputeNode;
    type IntoIter = std::slice::Iter<'a, ComputeNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregates() {
        let mut collection: NodeCollection =
            vec![ComputeNode::new("A", 60.0), ComputeNode::new("B", 40.0)].into();
        assert_eq!(collection.aggregate_capacity(), 100.0);
        assert_eq!(collection.aggregate_available(), 100.0);

        collection.nodes_mut()[0].apply_fill(10.0).unwrap();
        assert_eq!(collection.total_fill(), 10.0);
        assert_eq!(collection.aggregate_available(), 90.0);
        assert_eq!(collection.get("A").map(|n| n.current_fill()), Some(10.0));
        assert!(collection.get("Z").is_none());
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let collection: NodeCollection = vec![ComputeNode::new("A", 1.0)].into();
        let json = serde_json::to_value(&collection).unwrap();
        assert!(json.is_array());
    }
}
