//! Pure simulation helpers shared by the scale-up and scale-down planners: utilization
//! calculation and the greedy relocation attempt used to decide whether workloads hosted on a
//! node could land elsewhere.

use std::collections::HashMap;

use crate::core::node::Node;
use crate::core::pod::Workload;
use crate::oracle::PredicateOracle;

/// `LocationHints` remembers, per workload name, the node name it was last placed on by a
/// relocation simulation — used only to bias tie-breaking towards stability across ticks.
pub type LocationHints = HashMap<String, String>;

/// `max(sum(cpu requests) / capacity.cpu, sum(memory requests) / capacity.memory)`.
/// A node hosting nothing has utilization `0.0`. A zero-capacity dimension contributes `0.0`
/// rather than dividing by zero.
pub fn utilization(node: &Node, workloads: &[&Workload]) -> f64 {
    let mut cpu_sum: u64 = 0;
    let mut memory_sum: u64 = 0;
    for workload in workloads {
        cpu_sum += workload.spec.resources.requests.cpu as u64;
        memory_sum += workload.spec.resources.requests.memory;
    }

    let cpu_util = if node.status.capacity.cpu == 0 {
        0.0
    } else {
        cpu_sum as f64 / node.status.capacity.cpu as f64
    };
    let memory_util = if node.status.capacity.memory == 0 {
        0.0
    } else {
        memory_sum as f64 / node.status.capacity.memory as f64
    };
    cpu_util.max(memory_util)
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelocationPlan {
    /// Workload name -> destination node name.
    pub placements: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelocationFailure {
    /// Name of the first workload that could not be placed on any candidate.
    pub unplaced_workload: String,
}

/// Attempts to place every workload in `workloads` onto exactly one node in `candidate_nodes`,
/// consulting `oracle` and accumulating already-placed workloads as co-scheduled so later
/// placements see reduced capacity. Never mutates the caller's nodes or workloads.
pub fn try_relocate(
    workloads: &[&Workload],
    candidate_nodes: &[&Node],
    oracle: &dyn PredicateOracle,
    hints: &LocationHints,
) -> Result<RelocationPlan, RelocationFailure> {
    let mut ordered: Vec<&Workload> = workloads.to_vec();
    ordered.sort_by(|a, b| {
        let a_req = &a.spec.resources.requests;
        let b_req = &b.spec.resources.requests;
        (b_req.cpu, b_req.memory)
            .cmp(&(a_req.cpu, a_req.memory))
            .then_with(|| a.metadata.name.cmp(&b.metadata.name))
    });

    let mut nodes: Vec<Node> = candidate_nodes.iter().map(|n| (*n).clone()).collect();
    let mut co_scheduled: HashMap<String, Vec<Workload>> = HashMap::new();
    let mut placements: HashMap<String, String> = HashMap::new();

    for workload in ordered {
        let mut fitting: Vec<usize> = Vec::new();
        for (idx, node) in nodes.iter().enumerate() {
            let hosted = co_scheduled.get(node.name()).cloned().unwrap_or_default();
            let hosted_refs: Vec<&Workload> = hosted.iter().collect();
            match oracle.fits(workload, node, &hosted_refs) {
                Ok(true) => fitting.push(idx),
                Ok(false) | Err(_) => {}
            }
        }

        if fitting.is_empty() {
            return Err(RelocationFailure {
                unplaced_workload: workload.name().to_string(),
            });
        }

        let chosen = hints
            .get(workload.name())
            .and_then(|hinted_name| {
                fitting
                    .iter()
                    .copied()
                    .find(|&idx| nodes[idx].name() == hinted_name)
            })
            .unwrap_or_else(|| {
                *fitting
                    .iter()
                    .min_by_key(|&&idx| nodes[idx].name().to_string())
                    .expect("fitting is non-empty")
            });

        let node_name = nodes[chosen].name().to_string();
        co_scheduled
            .entry(node_name.clone())
            .or_default()
            .push((*workload).clone());
        placements.insert(workload.name().to_string(), node_name);
    }

    Ok(RelocationPlan { placements })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::common::Resources;
    use crate::oracle::ResourceFitOracle;

    #[test]
    fn utilization_is_zero_for_empty_node() {
        let node = Node::new("n1", Resources::new(1000, 4096));
        assert_eq!(utilization(&node, &[]), 0.0);
    }

    #[test]
    fn utilization_takes_the_max_dimension() {
        let node = Node::new("n1", Resources::new(1000, 4096));
        let w = Workload::new("w1", Resources::new(500, 512));
        assert_eq!(utilization(&node, &[&w]), 0.5);
    }

    #[test]
    fn utilization_handles_zero_capacity_dimension() {
        let node = Node::new("n1", Resources::new(0, 4096));
        let w = Workload::new("w1", Resources::new(500, 2048));
        assert_eq!(utilization(&node, &[&w]), 0.5);
    }

    #[test]
    fn try_relocate_places_on_lexicographically_first_fitting_node() {
        let oracle = ResourceFitOracle;
        let node_a = Node::new("node-b", Resources::new(1000, 4096));
        let node_b = Node::new("node-a", Resources::new(1000, 4096));
        let w = Workload::new("w1", Resources::new(100, 256));
        let plan = try_relocate(&[&w], &[&node_a, &node_b], &oracle, &LocationHints::new()).unwrap();
        assert_eq!(plan.placements.get("w1"), Some(&"node-a".to_string()));
    }

    #[test]
    fn try_relocate_honors_location_hint_when_still_fitting() {
        let oracle = ResourceFitOracle;
        let node_a = Node::new("node-a", Resources::new(1000, 4096));
        let node_b = Node::new("node-b", Resources::new(1000, 4096));
        let w = Workload::new("w1", Resources::new(100, 256));
        let mut hints = LocationHints::new();
        hints.insert("w1".to_string(), "node-b".to_string());
        let plan = try_relocate(&[&w], &[&node_a, &node_b], &oracle, &hints).unwrap();
        assert_eq!(plan.placements.get("w1"), Some(&"node-b".to_string()));
    }

    #[test]
    fn try_relocate_fails_identifying_first_unplaced_workload() {
        let oracle = ResourceFitOracle;
        let node = Node::new("node-a", Resources::new(100, 256));
        let w = Workload::new("w1", Resources::new(500, 256));
        let err = try_relocate(&[&w], &[&node], &oracle, &LocationHints::new()).unwrap_err();
        assert_eq!(err.unplaced_workload, "w1");
    }

    #[test]
    fn try_relocate_accounts_for_already_placed_co_scheduled_workloads() {
        let oracle = ResourceFitOracle;
        let node = Node::new("node-a", Resources::new(1000, 4096));
        let w1 = Workload::new("w1", Resources::new(600, 1024));
        let w2 = Workload::new("w2", Resources::new(600, 1024));
        let err = try_relocate(&[&w1, &w2], &[&node], &oracle, &LocationHints::new()).unwrap_err();
        assert_eq!(err.unplaced_workload, "w2");
    }
}
