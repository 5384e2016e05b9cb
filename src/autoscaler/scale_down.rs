//! Scale-down planning: classify underutilized, provider-managed nodes as candidates for removal
//! with hysteresis, then act on at most one per tick once several gates are satisfied.

use std::collections::{HashMap, HashSet};

use crate::autoscaler::provider::{NodeGroupProvider, ProviderError};
use crate::autoscaler::simulator::{try_relocate, utilization, LocationHints};
use crate::core::events::AutoscalerEvent;
use crate::core::node::Node;
use crate::core::pod::Workload;
use crate::oracle::PredicateOracle;
use crate::usage_tracker::UsageTracker;

/// Node name -> timestamp since which it has been continuously classified unneeded.
pub type UnneededMap = HashMap<String, f64>;

pub struct ClassificationInput<'a> {
    pub nodes: &'a [Node],
    pub workloads_by_node: &'a HashMap<String, Vec<&'a Workload>>,
    pub oracle: &'a dyn PredicateOracle,
    pub usage_tracker: &'a UsageTracker,
    pub utilization_threshold: f64,
    pub now: f64,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ClassificationResult {
    pub unneeded: UnneededMap,
    pub hints: LocationHints,
}

pub struct ScaleDownPlanner;

impl ScaleDownPlanner {
    /// §4.5 classification pass. `previous_unneeded` carries the map forward across ticks so
    /// hysteresis (continuous unneeded duration) is preserved.
    pub fn classify(input: &ClassificationInput, previous_unneeded: &UnneededMap) -> ClassificationResult {
        let mut candidate_order: Vec<&Node> = input
            .nodes
            .iter()
            .filter(|n| n.is_provider_managed() && !n.is_scale_down_disabled())
            .filter(|n| {
                let hosted = input
                    .workloads_by_node
                    .get(n.name())
                    .cloned()
                    .unwrap_or_default();
                utilization(n, &hosted) < input.utilization_threshold
            })
            .collect();
        candidate_order.sort_by(|a, b| {
            let util_a = utilization(
                a,
                &input
                    .workloads_by_node
                    .get(a.name())
                    .cloned()
                    .unwrap_or_default(),
            );
            let util_b = utilization(
                b,
                &input
                    .workloads_by_node
                    .get(b.name())
                    .cloned()
                    .unwrap_or_default(),
            );
            util_a
                .partial_cmp(&util_b)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name().cmp(b.name()))
        });

        let mut committed_removals: HashSet<&str> = HashSet::new();
        let mut unneeded = UnneededMap::new();
        let mut hints = LocationHints::new();

        for node in &candidate_order {
            let destinations: Vec<&Node> = input
                .nodes
                .iter()
                .filter(|d| d.name() != node.name())
                .filter(|d| !committed_removals.contains(d.name()))
                .filter(|d| !input.usage_tracker.recently_hosted(d.name(), input.now))
                .collect();

            let hosted = input
                .workloads_by_node
                .get(node.name())
                .cloned()
                .unwrap_or_default();

            let plan = if hosted.is_empty() {
                Some(None)
            } else {
                try_relocate(&hosted, &destinations, input.oracle, &hints)
                    .ok()
                    .map(Some)
            };

            if let Some(maybe_plan) = plan {
                committed_removals.insert(node.name());
                let since = previous_unneeded
                    .get(node.name())
                    .copied()
                    .unwrap_or(input.now)
                    .min(input.now);
                unneeded.insert(node.name().to_string(), since);

                if let Some(plan) = maybe_plan {
                    hints.extend(plan.placements);
                }
            }
        }

        ClassificationResult { unneeded, hints }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDownGate {
    TooSoonAfterScaleUp,
    TooSoonAfterFailedTrial,
    SchedulableWorkloadsPresent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScaleDownAction {
    /// No node was old enough or gating prevented action this tick.
    Skipped,
    Removed {
        node: String,
        events: Vec<AutoscalerEvent>,
    },
    Failed {
        node: String,
        events: Vec<AutoscalerEvent>,
    },
}

pub struct ScaleDownActionInput<'a> {
    pub now: f64,
    pub last_scale_up_time: f64,
    pub last_scale_down_failed_trial: f64,
    pub scale_down_delay: f64,
    pub scale_down_trial_interval: f64,
    pub scale_down_unneeded_time: f64,
    pub schedulable_pods_present: bool,
    pub unneeded: &'a UnneededMap,
}

impl ScaleDownPlanner {
    pub fn gates(input: &ScaleDownActionInput) -> Vec<ScaleDownGate> {
        let mut gates = Vec::new();
        if input.now - input.last_scale_up_time < input.scale_down_delay {
            gates.push(ScaleDownGate::TooSoonAfterScaleUp);
        }
        if input.now - input.last_scale_down_failed_trial < input.scale_down_trial_interval {
            gates.push(ScaleDownGate::TooSoonAfterFailedTrial);
        }
        if input.schedulable_pods_present {
            gates.push(ScaleDownGate::SchedulableWorkloadsPresent);
        }
        gates
    }

    /// §4.5 action pass. Returns `Skipped` immediately if any gate is closed, without consulting
    /// `unneeded` — callers check `gates()` separately if they need the reason.
    pub fn act(
        provider: &mut dyn NodeGroupProvider,
        input: &ScaleDownActionInput,
    ) -> ScaleDownAction {
        if !Self::gates(input).is_empty() {
            return ScaleDownAction::Skipped;
        }

        let ready = input
            .unneeded
            .iter()
            .filter(|(_, &since)| input.now - since >= input.scale_down_unneeded_time)
            .min_by(|(name_a, since_a), (name_b, since_b)| {
                since_a
                    .partial_cmp(since_b)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| name_a.cmp(name_b))
            });

        let Some((node_name, _)) = ready else {
            return ScaleDownAction::Skipped;
        };

        let Some(group) = provider.node_group_for_node(node_name) else {
            return ScaleDownAction::Failed {
                node: node_name.clone(),
                events: vec![AutoscalerEvent::scale_down_failed(
                    node_name.clone(),
                    "node group not found",
                )],
            };
        };

        match provider.delete_node(&group.name, node_name) {
            Ok(()) => ScaleDownAction::Removed {
                node: node_name.clone(),
                events: vec![AutoscalerEvent::scale_down(node_name.clone())],
            },
            Err(err) => ScaleDownAction::Failed {
                node: node_name.clone(),
                events: vec![AutoscalerEvent::scale_down_failed(
                    node_name.clone(),
                    provider_error_reason(err),
                )],
            },
        }
    }
}

fn provider_error_reason(err: ProviderError) -> &'static str {
    match err {
        ProviderError::UnknownGroup => "unknown node group",
        ProviderError::SizeOutOfBounds => "would violate min_size",
        ProviderError::NodeNotInGroup => "node not in group",
        ProviderError::Rejected => "provider rejected request",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autoscaler::provider::{NodeGroupConfig, StaticNodeGroupProvider};
    use crate::core::common::Resources;
    use crate::oracle::ResourceFitOracle;

    fn provider_with_nodes(min_size: u64, max_size: u64, count: u64) -> StaticNodeGroupProvider {
        let mut provider = StaticNodeGroupProvider::new(vec![NodeGroupConfig {
            name: "pool-a".to_string(),
            min_size,
            max_size,
            node_template: Node::new("template", Resources::new(1000, 4096)),
        }]);
        provider.resize("pool-a", count).unwrap();
        provider
    }

    #[test]
    fn classifies_idle_node_as_unneeded() {
        let node = Node::new("pool-a-0", Resources::new(1000, 4096)).with_node_group("pool-a");
        let other = Node::new("pool-a-1", Resources::new(1000, 4096)).with_node_group("pool-a");
        let oracle = ResourceFitOracle;
        let tracker = UsageTracker::new();
        let workloads_by_node = HashMap::new();
        let input = ClassificationInput {
            nodes: &[node.clone(), other],
            workloads_by_node: &workloads_by_node,
            oracle: &oracle,
            usage_tracker: &tracker,
            utilization_threshold: 0.5,
            now: 100.0,
        };
        let result = ScaleDownPlanner::classify(&input, &UnneededMap::new());
        assert!(result.unneeded.contains_key("pool-a-0"));
        assert!(result.unneeded.contains_key("pool-a-1"));
    }

    #[test]
    fn preserves_earliest_unneeded_timestamp_across_ticks() {
        let node = Node::new("pool-a-0", Resources::new(1000, 4096)).with_node_group("pool-a");
        let oracle = ResourceFitOracle;
        let tracker = UsageTracker::new();
        let workloads_by_node = HashMap::new();
        let mut previous = UnneededMap::new();
        previous.insert("pool-a-0".to_string(), 10.0);
        let input = ClassificationInput {
            nodes: &[node],
            workloads_by_node: &workloads_by_node,
            oracle: &oracle,
            usage_tracker: &tracker,
            utilization_threshold: 0.5,
            now: 100.0,
        };
        let result = ScaleDownPlanner::classify(&input, &previous);
        assert_eq!(result.unneeded.get("pool-a-0"), Some(&10.0));
    }

    #[test]
    fn mutually_relocatable_idle_pair_yields_only_one_unneeded_node() {
        // Two nodes, each hosting a workload small enough to fit on the other. Without pair-swap
        // avoidance both would be classified unneeded in the same pass, since each looks
        // individually relocatable onto its sibling.
        let node_a = Node::new("pool-a-0", Resources::new(1000, 4096)).with_node_group("pool-a");
        let node_b = Node::new("pool-a-1", Resources::new(1000, 4096)).with_node_group("pool-a");
        let workload_a = Workload::new("w-a", Resources::new(100, 256)).assign_to("pool-a-0");
        let workload_b = Workload::new("w-b", Resources::new(100, 256)).assign_to("pool-a-1");
        let oracle = ResourceFitOracle;
        let tracker = UsageTracker::new();
        let mut workloads_by_node: HashMap<String, Vec<&Workload>> = HashMap::new();
        workloads_by_node.insert("pool-a-0".to_string(), vec![&workload_a]);
        workloads_by_node.insert("pool-a-1".to_string(), vec![&workload_b]);
        let input = ClassificationInput {
            nodes: &[node_a, node_b],
            workloads_by_node: &workloads_by_node,
            oracle: &oracle,
            usage_tracker: &tracker,
            utilization_threshold: 0.5,
            now: 100.0,
        };
        let result = ScaleDownPlanner::classify(&input, &UnneededMap::new());
        assert_eq!(result.unneeded.len(), 1);
    }

    #[test]
    fn scale_down_disabled_label_excludes_node_from_candidates() {
        let node = Node::new("pool-a-0", Resources::new(1000, 4096))
            .with_node_group("pool-a")
            .with_label(crate::core::node::SCALE_DOWN_DISABLED_LABEL, "true");
        let oracle = ResourceFitOracle;
        let tracker = UsageTracker::new();
        let workloads_by_node = HashMap::new();
        let input = ClassificationInput {
            nodes: &[node],
            workloads_by_node: &workloads_by_node,
            oracle: &oracle,
            usage_tracker: &tracker,
            utilization_threshold: 0.5,
            now: 100.0,
        };
        let result = ScaleDownPlanner::classify(&input, &UnneededMap::new());
        assert!(result.unneeded.is_empty());
    }

    #[test]
    fn action_pass_skips_when_within_scale_down_delay() {
        let mut provider = provider_with_nodes(0, 3, 1);
        let mut unneeded = UnneededMap::new();
        unneeded.insert("pool-a-0".to_string(), 0.0);
        let input = ScaleDownActionInput {
            now: 100.0,
            last_scale_up_time: 90.0,
            last_scale_down_failed_trial: 0.0,
            scale_down_delay: 600.0,
            scale_down_trial_interval: 60.0,
            scale_down_unneeded_time: 600.0,
            schedulable_pods_present: false,
            unneeded: &unneeded,
        };
        assert_eq!(ScaleDownPlanner::act(&mut provider, &input), ScaleDownAction::Skipped);
    }

    #[test]
    fn action_pass_removes_oldest_ready_node() {
        let mut provider = provider_with_nodes(0, 3, 2);
        let mut unneeded = UnneededMap::new();
        unneeded.insert("pool-a-0".to_string(), 0.0);
        unneeded.insert("pool-a-1".to_string(), 50.0);
        let input = ScaleDownActionInput {
            now: 1000.0,
            last_scale_up_time: 0.0,
            last_scale_down_failed_trial: 0.0,
            scale_down_delay: 600.0,
            scale_down_trial_interval: 60.0,
            scale_down_unneeded_time: 600.0,
            schedulable_pods_present: false,
            unneeded: &unneeded,
        };
        match ScaleDownPlanner::act(&mut provider, &input) {
            ScaleDownAction::Removed { node, .. } => assert_eq!(node, "pool-a-0"),
            other => panic!("expected Removed, got {other:?}"),
        }
    }

    #[test]
    fn action_pass_respects_min_size_and_reports_failure() {
        let mut provider = provider_with_nodes(1, 3, 1);
        let mut unneeded = UnneededMap::new();
        unneeded.insert("pool-a-0".to_string(), 0.0);
        let input = ScaleDownActionInput {
            now: 1000.0,
            last_scale_up_time: 0.0,
            last_scale_down_failed_trial: 0.0,
            scale_down_delay: 600.0,
            scale_down_trial_interval: 60.0,
            scale_down_unneeded_time: 600.0,
            schedulable_pods_present: false,
            unneeded: &unneeded,
        };
        assert!(matches!(
            ScaleDownPlanner::act(&mut provider, &input),
            ScaleDownAction::Failed { .. }
        ));
    }
}
