//! Orchestrates one reconciliation tick end to end, owning every piece of state that must
//! survive across ticks. Mirrors this codebase's "at most one mutation per cycle" autoscaler
//! design, generalized from an event-driven request/response cycle into a direct synchronous
//! `tick()` since there is no simulation event bus to drive it.

use std::collections::{HashMap, HashSet};
use std::thread;
use std::time::Duration;

use serde::Deserialize;

use crate::autoscaler::cluster_api::ClusterApi;
use crate::autoscaler::condition_reset::stale_unschedulable_workloads;
use crate::autoscaler::provider::{NodeGroupConfig, NodeGroupProvider};
use crate::autoscaler::scale_down::{
    ClassificationInput, ScaleDownAction, ScaleDownActionInput, ScaleDownPlanner, UnneededMap,
};
use crate::autoscaler::scale_up::{ScaleUpOutcome, ScaleUpPlanner};
use crate::autoscaler::simulator::LocationHints;
use crate::autoscaler::unschedulable_filter::filter_unschedulable;
use crate::clock::Clock;
use crate::core::node::Node;
use crate::core::pod::Workload;
use crate::metrics::collector::MetricsCollector;
use crate::oracle::PredicateOracle;
use crate::usage_tracker::UsageTracker;

fn default_scan_interval() -> f64 {
    10.0
}
fn default_scale_down_enabled() -> bool {
    true
}
fn default_scale_down_delay() -> f64 {
    600.0
}
fn default_scale_down_unneeded_time() -> f64 {
    600.0
}
fn default_scale_down_utilization_threshold() -> f64 {
    0.5
}
fn default_scale_down_trial_interval() -> f64 {
    60.0
}
fn default_verify_unschedulable_pods() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AutoscalerConfig {
    #[serde(default = "default_scan_interval")]
    pub scan_interval: f64,
    #[serde(default = "default_scale_down_enabled")]
    pub scale_down_enabled: bool,
    #[serde(default = "default_scale_down_delay")]
    pub scale_down_delay: f64,
    #[serde(default = "default_scale_down_unneeded_time")]
    pub scale_down_unneeded_time: f64,
    #[serde(default = "default_scale_down_utilization_threshold")]
    pub scale_down_utilization_threshold: f64,
    #[serde(default = "default_scale_down_trial_interval")]
    pub scale_down_trial_interval: f64,
    #[serde(default = "default_verify_unschedulable_pods")]
    pub verify_unschedulable_pods: bool,
    pub node_groups: Vec<NodeGroupConfig>,
}

impl AutoscalerConfig {
    /// Panics if `node_groups` is empty, matching this codebase's existing convention for
    /// required non-empty configuration (`assert!(!node_groups.is_empty())`).
    pub fn validate(&self) {
        assert!(
            !self.node_groups.is_empty(),
            "AutoscalerConfig.node_groups must not be empty"
        );
    }
}

/// Owns every piece of state that must survive between ticks: the unneeded-since map, location
/// hints, workload/node co-location history, and the two gating timers.
pub struct Reconciler<C, P, O, K>
where
    C: ClusterApi,
    P: NodeGroupProvider,
    O: PredicateOracle,
    K: Clock,
{
    config: AutoscalerConfig,
    cluster_api: C,
    provider: P,
    oracle: O,
    clock: K,
    metrics: MetricsCollector,

    unneeded: UnneededMap,
    hints: LocationHints,
    usage_tracker: UsageTracker,
    last_scale_up_time: f64,
    last_scale_down_failed_trial: f64,
}

impl<C, P, O, K> Reconciler<C, P, O, K>
where
    C: ClusterApi,
    P: NodeGroupProvider,
    O: PredicateOracle,
    K: Clock,
{
    pub fn new(config: AutoscalerConfig, cluster_api: C, provider: P, oracle: O, clock: K) -> Self {
        config.validate();
        Self {
            config,
            cluster_api,
            provider,
            oracle,
            clock,
            metrics: MetricsCollector::new(),
            unneeded: UnneededMap::new(),
            hints: LocationHints::new(),
            usage_tracker: UsageTracker::new(),
            last_scale_up_time: f64::NEG_INFINITY,
            last_scale_down_failed_trial: f64::NEG_INFINITY,
        }
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn metrics_mut(&mut self) -> &mut MetricsCollector {
        &mut self.metrics
    }

    /// Runs `tick()` on an interval using the injected clock, with no overlap between ticks: if a
    /// tick overruns `scan_interval`, the next one starts immediately rather than queuing up.
    pub fn run(&mut self, iterations: u64) {
        for _ in 0..iterations {
            let started = self.clock.now();
            self.tick();
            let elapsed = self.clock.now() - started;
            let remaining = self.config.scan_interval - elapsed;
            if remaining > 0.0 {
                thread::sleep(Duration::from_secs_f64(remaining));
            }
        }
    }

    pub fn tick(&mut self) {
        let tick_started = self.clock.now();
        let now = tick_started;
        let listing_started = tick_started;

        let nodes = match self.cluster_api.list_nodes() {
            Ok(nodes) if !nodes.is_empty() => nodes,
            _ => {
                log::debug!("tick skipped: no nodes reported by the cluster API");
                return;
            }
        };

        // §4.7: verify every node actually belongs to a group known to the provider before
        // trusting it for the rest of the tick. A node whose self-reported group no longer
        // exists on the provider is warned about and skipped, not treated as a tick failure.
        let known_groups: HashSet<String> =
            self.provider.groups().into_iter().map(|g| g.name).collect();
        let nodes: Vec<Node> = nodes
            .into_iter()
            .filter(|node| match node.status.node_group.as_deref() {
                Some(group) if !known_groups.contains(group) => {
                    log::warn!(
                        "node {} reports node group {group} which is unknown to the provider; skipping it this tick",
                        node.name()
                    );
                    false
                }
                _ => true,
            })
            .collect();
        if nodes.is_empty() {
            log::debug!("tick skipped: no nodes remain after node-group verification");
            return;
        }

        let scheduled = self.cluster_api.list_scheduled_workloads().unwrap_or_default();
        let unschedulable = self
            .cluster_api
            .list_unschedulable_workloads()
            .unwrap_or_default();

        let mut workloads_by_node: HashMap<String, Vec<&Workload>> = HashMap::new();
        for workload in &scheduled {
            if let Some(node_name) = workload.assigned_node() {
                workloads_by_node
                    .entry(node_name.to_string())
                    .or_default()
                    .push(workload);
            }
        }
        for (node_name, hosted) in &workloads_by_node {
            for workload in hosted {
                self.usage_tracker.observe(node_name, workload.name(), now);
            }
        }
        self.usage_tracker.clean_up(now - self.config.scale_down_unneeded_time * 2.0);

        let stale = stale_unschedulable_workloads(&unschedulable, &nodes);
        for workload_name in &stale {
            if let Err(err) = self.cluster_api.clear_unschedulable_condition(workload_name) {
                log::debug!("failed to clear stale unschedulable condition on {workload_name}: {err:?}");
            }
        }
        let unschedulable: Vec<Workload> = unschedulable
            .into_iter()
            .filter(|w| !stale.contains(&w.metadata.name))
            .collect();
        self.metrics
            .listing_phase_duration_stats
            .add(self.clock.now() - listing_started);

        let filter_started = self.clock.now();
        let filter = filter_unschedulable(
            unschedulable,
            &nodes,
            &workloads_by_node,
            &self.oracle,
            self.config.verify_unschedulable_pods,
        );
        self.metrics
            .filter_phase_duration_stats
            .add(self.clock.now() - filter_started);

        log::info!(
            "tick at {now}: {} nodes, {} unsatisfied workloads",
            nodes.len(),
            filter.still_unsatisfied.len()
        );

        if !filter.still_unsatisfied.is_empty() {
            let scale_up_started = self.clock.now();
            self.run_scale_up(&filter.still_unsatisfied);
            self.metrics
                .scale_up_phase_duration_stats
                .add(self.clock.now() - scale_up_started);
            self.metrics.tick_duration_stats.add(self.clock.now() - tick_started);
            return;
        }

        if self.config.scale_down_enabled {
            let scale_down_started = self.clock.now();
            self.run_scale_down(&nodes, &workloads_by_node, filter.schedulable_pods_present, now);
            self.metrics
                .scale_down_phase_duration_stats
                .add(self.clock.now() - scale_down_started);
        }

        self.metrics.tick_duration_stats.add(self.clock.now() - tick_started);
    }

    fn run_scale_up(&mut self, unsatisfied: &[Workload]) {
        let outcome = ScaleUpPlanner::plan_and_apply(&mut self.provider, unsatisfied, &self.oracle);
        match outcome {
            ScaleUpOutcome::ScaledUp { group, delta, events } => {
                self.last_scale_up_time = self.clock.now();
                self.metrics.total_scaled_up_nodes += delta;
                log::info!("scaled up group {group} by {delta}");
                self.record_scale_up_events(events);
            }
            ScaleUpOutcome::NotTriggered { events } => {
                self.record_scale_up_events(events);
            }
            ScaleUpOutcome::ProviderError(err) => {
                log::debug!("scale-up provider error: {err:?}");
            }
        }
    }

    fn record_scale_up_events(&mut self, events: Vec<crate::core::events::AutoscalerEvent>) {
        for event in events {
            if let crate::core::events::AutoscalerEvent::NotTriggerScaleUp(ref reason) = event {
                if reason.reason == "capacity-exhausted" {
                    self.metrics.total_capacity_exhausted_events += 1;
                }
            }
            let _ = self.cluster_api.record_event(event);
        }
    }

    fn run_scale_down(
        &mut self,
        nodes: &[Node],
        workloads_by_node: &HashMap<String, Vec<&Workload>>,
        schedulable_pods_present: bool,
        now: f64,
    ) {
        for node in nodes {
            let hosted = workloads_by_node.get(node.name()).cloned().unwrap_or_default();
            self.metrics
                .utilization_stats
                .add(crate::autoscaler::simulator::utilization(node, &hosted));
        }

        let classification_input = ClassificationInput {
            nodes,
            workloads_by_node,
            oracle: &self.oracle,
            usage_tracker: &self.usage_tracker,
            utilization_threshold: self.config.scale_down_utilization_threshold,
            now,
        };
        let classified = ScaleDownPlanner::classify(&classification_input, &self.unneeded);
        self.unneeded = classified.unneeded;
        self.hints = classified.hints;

        let action_input = ScaleDownActionInput {
            now,
            last_scale_up_time: self.last_scale_up_time,
            last_scale_down_failed_trial: self.last_scale_down_failed_trial,
            scale_down_delay: self.config.scale_down_delay,
            scale_down_trial_interval: self.config.scale_down_trial_interval,
            scale_down_unneeded_time: self.config.scale_down_unneeded_time,
            schedulable_pods_present,
            unneeded: &self.unneeded,
        };

        match ScaleDownPlanner::act(&mut self.provider, &action_input) {
            ScaleDownAction::Removed { node, events } => {
                self.metrics.total_scaled_down_nodes += 1;
                self.unneeded.remove(&node);
                log::info!("scaled down node {node}");
                for event in events {
                    let _ = self.cluster_api.record_event(event);
                }
            }
            ScaleDownAction::Failed { node, events } => {
                self.last_scale_down_failed_trial = now;
                self.metrics.total_scale_down_failures += 1;
                log::debug!("scale-down of {node} failed");
                for event in events {
                    let _ = self.cluster_api.record_event(event);
                }
            }
            ScaleDownAction::Skipped => {}
        }
    }
}
