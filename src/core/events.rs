//! Events the autoscaler emits, attached to workloads or nodes by name.

use serde::{Deserialize, Serialize};

/// A node group was resized upward to accommodate unschedulable workloads.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TriggeredScaleUp {
    pub group: String,
    pub delta: u64,
}

/// Scale-up was considered but not taken, along with a human-readable reason
/// (e.g. "no node group fits this workload", "capacity-exhausted").
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NotTriggerScaleUp {
    pub reason: String,
}

/// A node was successfully removed by the scale-down action pass.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ScaleDown {
    pub node: String,
}

/// A scale-down attempt on a node failed.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ScaleDownFailed {
    pub node: String,
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum AutoscalerEvent {
    TriggeredScaleUp(TriggeredScaleUp),
    NotTriggerScaleUp(NotTriggerScaleUp),
    ScaleDown(ScaleDown),
    ScaleDownFailed(ScaleDownFailed),
}

impl AutoscalerEvent {
    pub fn triggered_scale_up(group: impl Into<String>, delta: u64) -> Self {
        Self::TriggeredScaleUp(TriggeredScaleUp {
            group: group.into(),
            delta,
        })
    }

    pub fn not_trigger_scale_up(reason: impl Into<String>) -> Self {
        Self::NotTriggerScaleUp(NotTriggerScaleUp {
            reason: reason.into(),
        })
    }

    pub fn scale_down(node: impl Into<String>) -> Self {
        Self::ScaleDown(ScaleDown { node: node.into() })
    }

    pub fn scale_down_failed(node: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ScaleDownFailed(ScaleDownFailed {
            node: node.into(),
            reason: reason.into(),
        })
    }
}
