//! Top-level configuration for running the autoscaler as a standalone process.

use serde::Deserialize;

use crate::autoscaler::reconciler::AutoscalerConfig;
use crate::metrics::printer::MetricsPrinterConfig;

#[derive(Debug, Deserialize, PartialEq)]
pub struct Config {
    /// If not set, logs go to stdout/stderr.
    pub logs_filepath: Option<String>,
    pub autoscaler: AutoscalerConfig,
    pub metrics_printer: Option<MetricsPrinterConfig>,
}
