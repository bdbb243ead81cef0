//! The four chart pipelines: load, derive series, render, report.

use crate::discover::{self, TraceFile};
use crate::plot::{self, Chart, Marker, SeriesStyle};
use crate::report::RunReport;
use crate::table::{self, Metric, SweepGroup, SweepLayout};
use crate::trace;
use anyhow::{Context, Result};
use plotters::style::{BLUE, RED};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Comparison metrics and their axis labels, in plotting order
pub const TRACE_METRICS: [(&str, &str); 7] = [
    ("cwnd", "Congestion Window (cwnd)"),
    ("inflight", "Inflight Data"),
    ("next-rx", "Next RX"),
    ("next-tx", "Next TX"),
    ("rto", "Retransmission Timeout (RTO)"),
    ("rtt", "Round Trip Time (RTT)"),
    ("ssth", "Slow Start Threshold (ssth)"),
];

pub const DEFAULT_PREFIXES: [&str; 3] = ["TcpVegas", "TcpBbr", "TcpVegasTweaked"];

/// Axis label for a trace metric key
pub fn metric_label(metric: &str) -> String {
    TRACE_METRICS
        .iter()
        .find(|(key, _)| *key == metric)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| metric.to_uppercase())
}

#[derive(Debug, Clone)]
pub struct SweepOptions {
    pub output_dir: PathBuf,
    pub layout: SweepLayout,
    pub metrics: Vec<Metric>,
}

impl SweepOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            layout: SweepLayout::default(),
            metrics: Metric::ALL.to_vec(),
        }
    }

    fn chart_path(&self, group: &SweepGroup, metric: Metric) -> PathBuf {
        self.output_dir
            .join(format!("{}_vs_{}.svg", group.variable, metric))
    }
}

/// A metric table together with the legend label it is drawn under
#[derive(Debug, Clone)]
pub struct LabeledTable {
    pub path: PathBuf,
    pub label: String,
}

fn load_groups(path: &Path, layout: &SweepLayout) -> Result<Vec<SweepGroup>> {
    let rows = table::load_table(path)?;
    log::debug!("Loaded {} rows from {}", rows.len(), path.display());
    layout
        .slice(&rows)
        .with_context(|| format!("Unexpected row layout in {}", path.display()))
}

fn sweep_chart(group: &SweepGroup, metric: Metric) -> Chart {
    Chart::new(
        format!("{} vs {}", group.variable, metric),
        group.variable.column(),
        metric.column(),
    )
}

/// Plot every metric against every swept variable of one table
pub fn plot_sweep<P: AsRef<Path>>(table: P, options: &SweepOptions) -> Result<RunReport> {
    let mut report = RunReport::new("sweep");
    let groups = load_groups(table.as_ref(), &options.layout)?;

    for group in &groups {
        for &metric in &options.metrics {
            let mut chart = sweep_chart(group, metric);
            chart.push(None, group.points(metric), SeriesStyle::new(BLUE, Marker::Circle));

            let path = options.chart_path(group, metric);
            plot::render(&chart, &path)?;
            report.record_chart(path, chart.point_count());
        }
    }

    Ok(report.finish())
}

/// Overlay two tables sharing the same sweep layout
pub fn compare_sweeps(
    baseline: &LabeledTable,
    candidate: &LabeledTable,
    options: &SweepOptions,
) -> Result<RunReport> {
    let mut report = RunReport::new("compare-sweep");
    let base_groups = load_groups(&baseline.path, &options.layout)?;
    let cand_groups = load_groups(&candidate.path, &options.layout)?;

    for (base, cand) in base_groups.iter().zip(&cand_groups) {
        if base.x_values() != cand.x_values() {
            report.warn(
                base.variable.column(),
                format!(
                    "{} values differ between {} {:?} and {} {:?}",
                    base.variable,
                    baseline.label,
                    base.x_values(),
                    candidate.label,
                    cand.x_values()
                ),
            );
        }

        for &metric in &options.metrics {
            let mut chart = sweep_chart(base, metric);
            chart.push(
                Some(baseline.label.clone()),
                base.points(metric),
                SeriesStyle::new(BLUE, Marker::Circle),
            );
            chart.push(
                Some(candidate.label.clone()),
                cand.points(metric),
                SeriesStyle::new(RED, Marker::Cross),
            );

            let path = options.chart_path(base, metric);
            plot::render(&chart, &path)?;
            report.record_chart(path, chart.point_count());
        }
    }

    Ok(report.finish())
}

fn plot_trace(file: &TraceFile, output_dir: &Path) -> Result<(PathBuf, usize)> {
    let series = trace::load_series(&file.path)?;
    if series.skipped > 0 {
        log::debug!("{}: skipped {} malformed lines", file.id, series.skipped);
    }

    let metric = file.id.metric.to_uppercase();
    let mut chart = Chart::new(
        format!("{} Plot for {}", metric, file.file_name()),
        "Time (s)",
        format!("{} Value", metric),
    )
    .with_size((1000, 600));
    chart.push(Some(file.stem()), series.points, plot::palette(0));

    let path = output_dir.join(format!("{}.svg", file.stem()));
    plot::render(&chart, &path)?;
    Ok((path, chart.point_count()))
}

/// One chart per trace file of the given algorithm, under `<output_dir>/<prefix>/`
pub fn plot_traces<P: AsRef<Path>, Q: AsRef<Path>>(
    data_dir: P,
    prefix: &str,
    output_dir: Q,
) -> Result<RunReport> {
    let mut report = RunReport::new("trace");
    let traces = discover::list_traces(data_dir)?;
    let selected = discover::by_prefix(&traces, prefix);

    if selected.is_empty() {
        report.notice(prefix, format!("No .data files found with prefix '{}'.", prefix));
        return Ok(report.finish());
    }

    let sub_dir = output_dir.as_ref().join(prefix);
    for file in &selected {
        match plot_trace(file, &sub_dir) {
            Ok((path, points)) => report.record_chart(path, points),
            Err(e) => report.error(
                file.path.display().to_string(),
                &e.context(format!("Error processing file {}", file.path.display())),
            ),
        }
    }

    Ok(report.finish())
}

#[derive(Debug, Clone)]
pub struct CompareOptions {
    pub output_dir: PathBuf,
    pub prefixes: Vec<String>,
    pub metrics: Vec<String>,
    pub flows: Vec<u32>,
}

impl CompareOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            prefixes: DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect(),
            metrics: TRACE_METRICS.iter().map(|(m, _)| m.to_string()).collect(),
            flows: vec![0, 1],
        }
    }
}

fn plot_combined(
    entries: &discover::Bucket,
    title: String,
    y_desc: String,
    path: &Path,
) -> Result<usize> {
    let mut chart = Chart::new(title, "Time (s)", y_desc);

    for (i, (file, label)) in entries.iter().enumerate() {
        log::info!("Plotting: {}, Label: {}", file.display(), label);
        let series = trace::load_series(file)?;
        chart.push(Some(label.clone()), series.points, plot::palette(i));
    }

    plot::render(&chart, path)?;
    Ok(chart.point_count())
}

/// First occurrence of each value, in order
fn unique<T: Ord + Clone>(values: &[T]) -> Vec<T> {
    let mut seen = BTreeSet::new();
    values.iter().filter(|v| seen.insert(*v)).cloned().collect()
}

/// Overlay the traces of several algorithms per (metric, flow)
pub fn compare_traces<P: AsRef<Path>>(data_dir: P, options: &CompareOptions) -> Result<RunReport> {
    let mut report = RunReport::new("compare-trace");
    let traces = discover::list_traces(data_dir)?;
    let metrics = unique(&options.metrics);
    let flows = unique(&options.flows);
    let buckets = discover::comparison_buckets(&traces, &options.prefixes, &metrics, &flows);

    // walk metrics in configured order rather than key order
    for metric in &metrics {
        let label = metric_label(metric);
        for &flow in &flows {
            let key = discover::BucketKey {
                metric: metric.clone(),
                flow,
            };
            let Some(entries) = buckets.get(&key) else {
                continue;
            };

            if entries.len() < 2 {
                report.notice(
                    key.to_string(),
                    format!(
                        "Not enough data files to create a comparison plot for '{}' (flow{}).",
                        metric, flow
                    ),
                );
                continue;
            }

            let title = format!(
                "{} Comparison: {} (flow{})",
                label,
                options.prefixes.join(", "),
                flow
            );
            let path = options
                .output_dir
                .join(format!("{}_flow{}_comparison.svg", metric, flow));

            match plot_combined(entries, title, label.clone(), &path) {
                Ok(points) => report.record_chart(path, points),
                Err(e) => report.error(
                    key.to_string(),
                    &e.context("Error creating combined plot"),
                ),
            }
        }
    }

    Ok(report.finish())
}
