//! A single-threaded cooperative cluster-autoscaler control loop: watches for unschedulable
//! workloads and underutilized nodes, and drives node-group providers to grow or shrink the
//! cluster accordingly.

pub mod autoscaler;
pub mod clock;
pub mod config;
pub mod core;
pub mod logging;
pub mod metrics;
pub mod oracle;
pub mod usage_tracker;
