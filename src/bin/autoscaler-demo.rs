//! Minimal demonstration entry point: loads a `Config` from a YAML file, wires a `Reconciler`
//! against the in-memory reference adapters, and runs it for a bounded number of ticks. Not a
//! production deployment harness — real deployments supply their own `ClusterApi` and
//! `NodeGroupProvider` backed by a real infrastructure API.

use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use clap::Parser;

use cluster_autoscaler_core::autoscaler::cluster_api::InMemoryClusterApi;
use cluster_autoscaler_core::autoscaler::provider::StaticNodeGroupProvider;
use cluster_autoscaler_core::autoscaler::reconciler::Reconciler;
use cluster_autoscaler_core::clock::SystemClock;
use cluster_autoscaler_core::config::Config;
use cluster_autoscaler_core::logging;
use cluster_autoscaler_core::metrics::printer::print_metrics;
use cluster_autoscaler_core::oracle::ResourceFitOracle;

#[derive(Parser, Debug)]
#[command(about = "Runs the cluster-autoscaler reconciliation loop against an in-memory cluster")]
struct Args {
    /// Path to a YAML file deserializing into `Config`.
    #[arg(long)]
    config: String,

    /// Number of ticks to run before exiting.
    #[arg(long, default_value_t = 1)]
    iterations: u64,

    /// Optional path to redirect logs to a rotating file; overrides the config file's
    /// `logs_filepath` if both are set.
    #[arg(long)]
    logs_filepath: Option<String>,
}

fn main() {
    let args = Args::parse();

    let raw = fs::read_to_string(&args.config).expect("failed to read config file");
    let config: Config = serde_yaml::from_str(&raw).expect("failed to parse config");

    logging::init(args.logs_filepath.as_deref().or(config.logs_filepath.as_deref()));

    let provider = StaticNodeGroupProvider::new(config.autoscaler.node_groups.clone());
    let cluster_api = InMemoryClusterApi::new(Vec::new(), Vec::new());

    let mut reconciler = Reconciler::new(
        config.autoscaler,
        cluster_api,
        provider,
        ResourceFitOracle,
        SystemClock,
    );

    reconciler.run(args.iterations);

    let metrics = reconciler.metrics();
    log::info!(
        "done: {} scaled up, {} scaled down, {} scale-down failures",
        metrics.total_scaled_up_nodes,
        metrics.total_scaled_down_nodes,
        metrics.total_scale_down_failures
    );

    if let Some(printer_config) = &config.metrics_printer {
        let snapshot = Rc::new(RefCell::new(std::mem::take(reconciler.metrics_mut())));
        print_metrics(snapshot, printer_config);
    }
}
