//! §4.8: re-test workloads marked unschedulable against the current node snapshot before
//! committing to a scale-up, in case the scheduler has since caught up.

use std::collections::HashMap;

use crate::core::node::Node;
use crate::core::pod::Workload;
use crate::oracle::PredicateOracle;

pub struct FilterResult {
    pub still_unsatisfied: Vec<Workload>,
    /// `true` if at least one workload was found schedulable after all, suppressing scale-down
    /// this tick on the suspicion that the scheduler and the autoscaler currently disagree.
    pub schedulable_pods_present: bool,
}

/// `workloads_by_node` maps node name to the workloads currently assigned to it, used to compute
/// each candidate node's co-scheduled set at evaluation time.
pub fn filter_unschedulable(
    unschedulable: Vec<Workload>,
    nodes: &[Node],
    workloads_by_node: &HashMap<String, Vec<&Workload>>,
    oracle: &dyn PredicateOracle,
    enabled: bool,
) -> FilterResult {
    if !enabled {
        return FilterResult {
            still_unsatisfied: unschedulable,
            schedulable_pods_present: false,
        };
    }

    let mut still_unsatisfied = Vec::new();
    let mut schedulable_pods_present = false;

    for workload in unschedulable {
        let now_schedulable = nodes.iter().any(|node| {
            let hosted = workloads_by_node
                .get(node.name())
                .cloned()
                .unwrap_or_default();
            matches!(oracle.fits(&workload, node, &hosted), Ok(true))
        });

        if now_schedulable {
            schedulable_pods_present = true;
        } else {
            still_unsatisfied.push(workload);
        }
    }

    FilterResult {
        still_unsatisfied,
        schedulable_pods_present,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::common::Resources;
    use crate::oracle::ResourceFitOracle;

    #[test]
    fn workload_that_now_fits_is_marked_schedulable_and_removed() {
        let node = Node::new("n1", Resources::new(1000, 4096));
        let workload = Workload::new("w1", Resources::new(500, 1024)).mark_unschedulable(5.0);
        let oracle = ResourceFitOracle;
        let result = filter_unschedulable(vec![workload], &[node], &HashMap::new(), &oracle, true);
        assert!(result.still_unsatisfied.is_empty());
        assert!(result.schedulable_pods_present);
    }

    #[test]
    fn workload_that_still_does_not_fit_remains_unsatisfied() {
        let node = Node::new("n1", Resources::new(100, 256));
        let workload = Workload::new("w1", Resources::new(500, 1024)).mark_unschedulable(5.0);
        let oracle = ResourceFitOracle;
        let result = filter_unschedulable(vec![workload], &[node], &HashMap::new(), &oracle, true);
        assert_eq!(result.still_unsatisfied.len(), 1);
        assert!(!result.schedulable_pods_present);
    }

    #[test]
    fn disabled_filter_passes_everything_through_unchanged() {
        let node = Node::new("n1", Resources::new(1000, 4096));
        let workload = Workload::new("w1", Resources::new(500, 1024)).mark_unschedulable(5.0);
        let oracle = ResourceFitOracle;
        let result = filter_unschedulable(vec![workload], &[node], &HashMap::new(), &oracle, false);
        assert_eq!(result.still_unsatisfied.len(), 1);
        assert!(!result.schedulable_pods_present);
    }
}
