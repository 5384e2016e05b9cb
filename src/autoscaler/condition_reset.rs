//! §4.9: clear a stale `PodScheduled=False` condition once the cluster has changed enough since
//! it was set that the scheduler's earlier verdict can no longer be trusted.

use crate::core::node::Node;
use crate::core::pod::Workload;

/// Names of workloads whose `unschedulable_since` predates the newest node's `ready_since`.
pub fn stale_unschedulable_workloads(workloads: &[Workload], nodes: &[Node]) -> Vec<String> {
    let Some(newest_ready) = nodes
        .iter()
        .map(Node::ready_since)
        .fold(None, |acc: Option<f64>, ready| match acc {
            Some(max) if max >= ready => Some(max),
            _ => Some(ready),
        })
    else {
        return Vec::new();
    };

    workloads
        .iter()
        .filter_map(|w| w.unschedulable_since().map(|since| (w, since)))
        .filter(|(_, since)| *since < newest_ready)
        .map(|(w, _)| w.name().to_string())
        .collect()
}
