//! Scale-up planning: given unschedulable workloads and the node groups known to the provider,
//! decide whether to grow exactly one group and by how much.

use std::collections::HashMap;

use crate::autoscaler::provider::{NodeGroupProvider, ProviderError};
use crate::autoscaler::simulator::{try_relocate, LocationHints};
use crate::core::events::AutoscalerEvent;
use crate::core::node::Node;
use crate::core::pod::Workload;
use crate::oracle::PredicateOracle;

#[derive(Debug, PartialEq)]
pub enum ScaleUpOutcome {
    /// A group was resized; events to record and the new `last_scale_up_time` marker.
    ScaledUp {
        group: String,
        delta: u64,
        events: Vec<AutoscalerEvent>,
    },
    /// Nothing was resized this tick, but informational events were produced (e.g. workloads
    /// that fit no group, or a group capped by `max_size`).
    NotTriggered { events: Vec<AutoscalerEvent> },
    /// The provider rejected the resize request; the tick ends and is retried next scan.
    ProviderError(ProviderError),
}

pub struct ScaleUpPlanner;

impl ScaleUpPlanner {
    /// Runs the full §4.4 algorithm against `unschedulable` workloads and the groups exposed by
    /// `provider`. Mutates `provider` only on the single group ultimately chosen for resize.
    pub fn plan_and_apply(
        provider: &mut dyn NodeGroupProvider,
        unschedulable: &[Workload],
        oracle: &dyn PredicateOracle,
    ) -> ScaleUpOutcome {
        let groups = provider.groups();
        if groups.is_empty() || unschedulable.is_empty() {
            return ScaleUpOutcome::NotTriggered { events: Vec::new() };
        }

        let templates: HashMap<String, Node> = groups
            .iter()
            .map(|g| (g.name.clone(), provider.template_node(g)))
            .collect();

        let mut events = Vec::new();
        let mut fit_groups: HashMap<&str, Vec<&Workload>> = HashMap::new();

        for workload in unschedulable {
            let fitting: Vec<&str> = groups
                .iter()
                .filter(|g| {
                    let template = &templates[&g.name];
                    matches!(oracle.fits(workload, template, &[]), Ok(true))
                })
                .map(|g| g.name.as_str())
                .collect();

            if fitting.is_empty() {
                events.push(AutoscalerEvent::not_trigger_scale_up(format!(
                    "workload {} fits no node group",
                    workload.name()
                )));
                continue;
            }

            for group_name in fitting {
                fit_groups.entry(group_name).or_default().push(workload);
            }
        }

        // §4.4 step 5: maximize served(g), tie-break by the smaller increment needed (step 6),
        // then by lexicographic group name. `None` (even max_size copies would not be enough)
        // sorts last within a served(g) tier.
        let deltas: HashMap<&str, Option<u64>> = groups
            .iter()
            .filter(|g| fit_groups.contains_key(g.name.as_str()))
            .map(|g| {
                let cap = g.max_size.saturating_sub(g.current_size).max(1);
                let delta = Self::smallest_fitting_delta(&fit_groups[g.name.as_str()], &templates[&g.name], oracle, cap);
                (g.name.as_str(), delta)
            })
            .collect();

        let chosen = groups
            .iter()
            .filter(|g| fit_groups.contains_key(g.name.as_str()))
            .min_by(|a, b| {
                let served_a = fit_groups[a.name.as_str()].len();
                let served_b = fit_groups[b.name.as_str()].len();
                served_b
                    .cmp(&served_a)
                    .then_with(|| deltas[a.name.as_str()].unwrap_or(u64::MAX).cmp(&deltas[b.name.as_str()].unwrap_or(u64::MAX)))
                    .then_with(|| a.name.cmp(&b.name))
            });

        let Some(group) = chosen else {
            return ScaleUpOutcome::NotTriggered { events };
        };

        let served = &fit_groups[group.name.as_str()];
        let headroom = group.max_size.saturating_sub(group.current_size);
        if headroom == 0 {
            events.push(AutoscalerEvent::not_trigger_scale_up("capacity-exhausted"));
            return ScaleUpOutcome::NotTriggered { events };
        }

        let fit = Self::smallest_fitting_delta(served, &templates[&group.name], oracle, headroom);
        let delta = fit.unwrap_or(headroom);
        if fit.is_none() {
            events.push(AutoscalerEvent::not_trigger_scale_up("capacity-exhausted"));
        }

        match provider.resize(&group.name, group.current_size + delta) {
            Ok(()) => {
                events.push(AutoscalerEvent::triggered_scale_up(group.name.clone(), delta));
                ScaleUpOutcome::ScaledUp {
                    group: group.name.clone(),
                    delta,
                    events,
                }
            }
            Err(err) => ScaleUpOutcome::ProviderError(err),
        }
    }

    /// Smallest `k` in `1..=cap` such that `k` fresh copies of `template` could simulate-accept
    /// every workload in `served`. `None` if even `cap` copies are not enough.
    fn smallest_fitting_delta(
        served: &[&Workload],
        template: &Node,
        oracle: &dyn PredicateOracle,
        cap: u64,
    ) -> Option<u64> {
        for k in 1..=cap {
            let synthetic: Vec<Node> = (0..k)
                .map(|i| {
                    let mut node = template.clone();
                    node.metadata.name = format!("synthetic-{}", i);
                    node
                })
                .collect();
            let refs: Vec<&Node> = synthetic.iter().collect();
            if try_relocate(served, &refs, oracle, &LocationHints::new()).is_ok() {
                return Some(k);
            }
        }
        None
    }
}
