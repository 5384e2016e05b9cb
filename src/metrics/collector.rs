//! Implements centralized storage for metrics. Any component may access this component to
//! report metrics about pods, nodes, etc.

use average::{concatenate, Estimate, Max, Mean, Min, Variance};

concatenate!(
    Estimator,
    [Min, min],
    [Max, max],
    [Mean, mean],
    [Variance, population_variance]
);

#[derive(Debug, Default)]
pub struct EstimatorWrapper {
    estimator: Estimator,
}

impl std::fmt::Debug for Estimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Estimator")
            .field("min", &self.min)
            .field("max", &self.max)
            .field("mean", &self.mean)
            .field("population_variance", &self.population_variance).finish()
    }
}

impl EstimatorWrapper {
    pub fn new() -> Self {
        Self {
            estimator: Estimator::new(),
        }
    }

    pub fn add(&mut self, value: f64) {
        self.estimator.add(value);
    }

    pub fn min(&self) -> f64 {
        self.estimator.min()
    }

    pub fn max(&self) -> f64 {
        self.estimator.max()
    }

    pub fn mean(&self) -> f64 {
        self.estimator.mean()
    }

    pub fn population_variance(&self) -> f64 {
        self.estimator.population_variance()
    }
}

impl PartialEq for EstimatorWrapper {
    fn eq(&self, other: &Self) -> bool {
        self.min() == other.min() &&
        self.max() == other.max() &&
        self.mean() == other.mean() &&
        self.population_variance() == other.population_variance()
    }
}

#[derive(Default)]
pub struct MetricsCollector {
    /// Total number of nodes added across all successful scale-ups.
    pub total_scaled_up_nodes: u64,
    /// Total number of nodes removed across all successful scale-downs.
    pub total_scaled_down_nodes: u64,
    /// Total number of scale-down attempts that did not succeed.
    pub total_scale_down_failures: u64,
    /// Total number of `NotTriggerScaleUp("capacity-exhausted")` events emitted.
    pub total_capacity_exhausted_events: u64,

    /// Wall-clock duration of each reconciliation tick, start to finish.
    pub tick_duration_stats: EstimatorWrapper,
    /// Node utilization samples observed during scale-down classification.
    pub utilization_stats: EstimatorWrapper,

    /// Duration of the listing phase: fetching nodes/workloads and refreshing usage tracking.
    pub listing_phase_duration_stats: EstimatorWrapper,
    /// Duration of the unschedulable-filter phase (§4.8 re-verification).
    pub filter_phase_duration_stats: EstimatorWrapper,
    /// Duration of the scale-up planning phase, when it runs.
    pub scale_up_phase_duration_stats: EstimatorWrapper,
    /// Duration of the scale-down planning phase, when it runs.
    pub scale_down_phase_duration_stats: EstimatorWrapper,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }
}
