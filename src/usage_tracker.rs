//! Tracks which nodes have recently hosted any workload, so the scale-down planner can avoid
//! immediately swapping a removed workload back onto a node it just vacated (pair-swap
//! avoidance, see the scale-down planner).

use std::collections::HashMap;

/// Last-observed time at which a node hosted at least one workload.
#[derive(Debug, Default)]
pub struct UsageTracker {
    last_seen: HashMap<String, f64>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `workload` was hosted on `node` as of `now`.
    pub fn observe(&mut self, node: &str, workload: &str, now: f64) {
        let _ = workload;
        self.last_seen
            .entry(node.to_string())
            .and_modify(|seen_at| *seen_at = seen_at.max(now))
            .or_insert(now);
    }

    /// Whether any workload was hosted on `node` at or after `cutoff`.
    pub fn recently_hosted(&self, node: &str, cutoff: f64) -> bool {
        self.last_seen
            .get(node)
            .is_some_and(|&seen_at| seen_at >= cutoff)
    }

    /// Drop every observation older than `cutoff`, bounding memory growth across ticks.
    pub fn clean_up(&mut self, cutoff: f64) {
        self.last_seen.retain(|_, &mut seen_at| seen_at >= cutoff);
    }
}
