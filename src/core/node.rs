//! Type definition for the `Node` primitive of a k8s-style cluster.

use serde::{Deserialize, Serialize};

use crate::core::common::{ObjectMeta, Resources};

pub const ORIGIN_LABEL: &str = "origin";
pub const CLUSTER_AUTOSCALER_ORIGIN: &str = "cluster-autoscaler";
pub const NODE_GROUP_LABEL: &str = "node-group";
pub const SCALE_DOWN_DISABLED_LABEL: &str = "cluster-autoscaler.kubernetes.io/scale-down-disabled";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub enum NodeConditionType {
    Ready,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NodeCondition {
    pub condition_type: NodeConditionType,
    pub status: bool,
    /// Timestamp of the last transition of `status`.
    pub last_transition_time: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct NodeStatus {
    pub capacity: Resources,
    #[serde(default)]
    pub allocatable: Resources,
    #[serde(default)]
    pub conditions: Vec<NodeCondition>,
    /// Name of the node group this node belongs to, if any (provider-managed).
    #[serde(default)]
    pub node_group: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Node {
    #[serde(default)]
    pub metadata: ObjectMeta,
    pub status: NodeStatus,
}

impl Node {
    pub fn new(name: impl Into<String>, capacity: Resources) -> Self {
        let allocatable = capacity.clone();
        Self {
            metadata: ObjectMeta {
                name: name.into(),
                ..Default::default()
            },
            status: NodeStatus {
                capacity,
                allocatable,
                conditions: Default::default(),
                node_group: None,
            },
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_node_group(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.metadata
            .labels
            .insert(NODE_GROUP_LABEL.to_string(), name.clone());
        self.status.node_group = Some(name);
        self
    }

    /// Stamps the conventional `origin=cluster-autoscaler` label, marking this node as one
    /// created by the autoscaler rather than pre-existing cluster capacity.
    pub fn with_origin_label(self) -> Self {
        self.with_label(ORIGIN_LABEL, CLUSTER_AUTOSCALER_ORIGIN)
    }

    pub fn mark_ready(mut self, since: f64) -> Self {
        self.status.conditions.push(NodeCondition {
            condition_type: NodeConditionType::Ready,
            status: true,
            last_transition_time: since,
        });
        self
    }

    /// Timestamp at which the node became `Ready`, i.e. the "ready/available timestamp".
    /// A node with no recorded `Ready` condition is considered available since its creation.
    pub fn ready_since(&self) -> f64 {
        self.status
            .conditions
            .iter()
            .find(|c| c.condition_type == NodeConditionType::Ready && c.status)
            .map(|c| c.last_transition_time)
            .unwrap_or(self.metadata.creation_timestamp)
    }

    pub fn is_provider_managed(&self) -> bool {
        self.status.node_group.is_some()
    }

    pub fn is_scale_down_disabled(&self) -> bool {
        self.metadata
            .labels
            .get(SCALE_DOWN_DISABLED_LABEL)
            .map(|v| v == "true")
            .unwrap_or(false)
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_since_falls_back_to_creation_timestamp() {
        let node = Node::new("n1", Resources::new(1000, 1024));
        assert_eq!(node.ready_since(), 0.0);
    }

    #[test]
    fn ready_since_prefers_ready_condition() {
        let node = Node::new("n1", Resources::new(1000, 1024)).mark_ready(42.0);
        assert_eq!(node.ready_since(), 42.0);
    }

    #[test]
    fn origin_label_marks_autoscaler_created_nodes() {
        let node = Node::new("n1", Resources::new(1000, 1024)).with_origin_label();
        assert_eq!(
            node.metadata.labels.get(ORIGIN_LABEL).map(String::as_str),
            Some(CLUSTER_AUTOSCALER_ORIGIN)
        );
    }

    #[test]
    fn scale_down_disabled_label_is_honored() {
        let node =
            Node::new("n1", Resources::new(1000, 1024)).with_label(SCALE_DOWN_DISABLED_LABEL, "true");
        assert!(node.is_scale_down_disabled());
    }
}
