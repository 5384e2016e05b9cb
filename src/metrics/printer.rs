use prettytable::{row, Table};
use serde::{Deserialize, Serialize};
use std::{cell::RefCell, fs::File, io::Write, rc::Rc};

use crate::metrics::collector::MetricsCollector;

#[derive(Debug, Default, Deserialize, PartialEq)]
pub enum OutputFormat {
    #[default]
    JSON,
    PrettyTable,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct MetricsPrinterConfig {
    format: OutputFormat,
    output_file: std::path::PathBuf,
}

pub fn print_metrics(collector: Rc<RefCell<MetricsCollector>>, config: &MetricsPrinterConfig) {
    match config.format {
        OutputFormat::PrettyTable => print_metrics_as_pretty_table(collector, &config.output_file),
        OutputFormat::JSON => print_metrics_as_json(collector, &config.output_file),
    }
}

pub fn print_metrics_as_pretty_table(
    collector: Rc<RefCell<MetricsCollector>>,
    output_file: &std::path::PathBuf,
) {
    let metrics = collector.borrow();
    let mut metrics_file = File::create(output_file).unwrap();

    let mut aggregated_table = Table::new();
    aggregated_table.add_row(row!["Metric", "Count"]);
    aggregated_table.add_row(row!["Total scaled up nodes", metrics.total_scaled_up_nodes]);
    aggregated_table.add_row(row![
        "Total scaled down nodes",
        metrics.total_scaled_down_nodes
    ]);
    aggregated_table.add_row(row![
        "Total scale-down failures",
        metrics.total_scale_down_failures
    ]);
    aggregated_table.add_row(row![
        "Total capacity-exhausted events",
        metrics.total_capacity_exhausted_events
    ]);

    let mut stats_table = Table::new();
    stats_table.add_row(row!["Metric", "Min", "Max", "Mean", "Variance"]);
    for (label, stats) in [
        ("Tick duration", &metrics.tick_duration_stats),
        ("Node utilization", &metrics.utilization_stats),
        ("Listing phase duration", &metrics.listing_phase_duration_stats),
        ("Filter phase duration", &metrics.filter_phase_duration_stats),
        ("Scale-up phase duration", &metrics.scale_up_phase_duration_stats),
        ("Scale-down phase duration", &metrics.scale_down_phase_duration_stats),
    ] {
        stats_table.add_row(row![
            label,
            stats.min(),
            stats.max(),
            stats.mean(),
            stats.population_variance()
        ]);
    }

    let _ = aggregated_table.print(&mut metrics_file);
    let _ = stats_table.print(&mut metrics_file);
}

#[derive(Serialize)]
struct MetricsJSON {
    counters: Counters,
    timings: Timings,
}

#[derive(Serialize)]
struct Counters {
    total_scaled_up_nodes: u64,
    total_scaled_down_nodes: u64,
    total_scale_down_failures: u64,
    total_capacity_exhausted_events: u64,
}

#[derive(Serialize)]
struct Timings {
    tick_duration: TimingsStats,
    node_utilization: TimingsStats,
    listing_phase_duration: TimingsStats,
    filter_phase_duration: TimingsStats,
    scale_up_phase_duration: TimingsStats,
    scale_down_phase_duration: TimingsStats,
}

#[derive(Serialize)]
struct TimingsStats {
    min: f64,
    max: f64,
    mean: f64,
    variance: f64,
}

fn timings_stats(stats: &crate::metrics::collector::EstimatorWrapper) -> TimingsStats {
    TimingsStats {
        min: stats.min(),
        max: stats.max(),
        mean: stats.mean(),
        variance: stats.population_variance(),
    }
}

pub fn print_metrics_as_json(
    collector: Rc<RefCell<MetricsCollector>>,
    output_file: &std::path::PathBuf,
) {
    let metrics = collector.borrow();
    let mut metrics_file = File::create(output_file).unwrap();

    let metrics = MetricsJSON {
        counters: Counters {
            total_scaled_up_nodes: metrics.total_scaled_up_nodes,
            total_scaled_down_nodes: metrics.total_scaled_down_nodes,
            total_scale_down_failures: metrics.total_scale_down_failures,
            total_capacity_exhausted_events: metrics.total_capacity_exhausted_events,
        },
        timings: Timings {
            tick_duration: timings_stats(&metrics.tick_duration_stats),
            node_utilization: timings_stats(&metrics.utilization_stats),
            listing_phase_duration: timings_stats(&metrics.listing_phase_duration_stats),
            filter_phase_duration: timings_stats(&metrics.filter_phase_duration_stats),
            scale_up_phase_duration: timings_stats(&metrics.scale_up_phase_duration_stats),
            scale_down_phase_duration: timings_stats(&metrics.scale_down_phase_duration_stats),
        },
    };

    let serialized_json = serde_json::to_string_pretty(&metrics).unwrap();
    metrics_file.write_all(serialized_json.as_bytes()).unwrap();
}
