//! Type definition for the `Workload` (pod) primitive of a k8s-style cluster.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::common::{ObjectMeta, Resources};

/// Scheduling constraints opaque to the core engine — delegated entirely to the
/// `PredicateOracle` when evaluating fit. The core never interprets these fields itself.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct SchedulingConstraints {
    #[serde(default)]
    pub node_selector: HashMap<String, String>,
    /// Opaque affinity/anti-affinity payload, meaningful only to the oracle.
    #[serde(default)]
    pub affinity: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct ResourceRequirements {
    pub requests: Resources,
    #[serde(default)]
    pub limits: Resources,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct PodSpec {
    pub resources: ResourceRequirements,
    #[serde(default)]
    pub constraints: SchedulingConstraints,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub enum PodConditionType {
    PodScheduled,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PodCondition {
    pub condition_type: PodConditionType,
    pub status: bool,
    pub last_transition_time: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct PodStatus {
    #[serde(default)]
    pub assigned_node: Option<String>,
    #[serde(default)]
    pub conditions: Vec<PodCondition>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Workload {
    #[serde(default)]
    pub metadata: ObjectMeta,
    pub spec: PodSpec,
    #[serde(default)]
    pub status: PodStatus,
}

impl Workload {
    pub fn new(name: impl Into<String>, requests: Resources) -> Self {
        Self {
            metadata: ObjectMeta {
                name: name.into(),
                ..Default::default()
            },
            spec: PodSpec {
                resources: ResourceRequirements {
                    requests,
                    limits: Default::default(),
                },
                constraints: Default::default(),
            },
            status: Default::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn assigned_node(&self) -> Option<&str> {
        self.status.assigned_node.as_deref()
    }

    pub fn assign_to(mut self, node_name: impl Into<String>) -> Self {
        self.status.assigned_node = Some(node_name.into());
        self
    }

    pub fn get_condition(&self, condition_type: &PodConditionType) -> Option<&PodCondition> {
        self.status
            .conditions
            .iter()
            .find(|c| &c.condition_type == condition_type)
    }

    pub fn mark_unschedulable(mut self, since: f64) -> Self {
        self.status
            .conditions
            .retain(|c| c.condition_type != PodConditionType::PodScheduled);
        self.status.conditions.push(PodCondition {
            condition_type: PodConditionType::PodScheduled,
            status: false,
            last_transition_time: since,
        });
        self
    }

    /// Timestamp at which this workload was marked unschedulable, if it currently is.
    pub fn unschedulable_since(&self) -> Option<f64> {
        self.get_condition(&PodConditionType::PodScheduled)
            .filter(|c| !c.status)
            .map(|c| c.last_transition_time)
    }

    pub fn is_unschedulable(&self) -> bool {
        self.unschedulable_since().is_some()
    }

    pub fn clear_unschedulable(&mut self) {
        self.status
            .conditions
            .retain(|c| c.condition_type != PodConditionType::PodScheduled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unschedulable_since_reads_pod_scheduled_condition() {
        let workload = Workload::new("w1", Resources::new(100, 1024)).mark_unschedulable(10.0);
        assert_eq!(workload.unschedulable_since(), Some(10.0));
        assert!(workload.is_unschedulable());
    }

    #[test]
    fn clear_unschedulable_removes_condition() {
        let mut workload = Workload::new("w1", Resources::new(100, 1024)).mark_unschedulable(10.0);
        workload.clear_unschedulable();
        assert!(!workload.is_unschedulable());
    }
}
