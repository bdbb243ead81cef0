//! nsplot - Chart generation for network simulator experiments.
//!
//! Renders metric tables from routing experiments and per-flow TCP traces
//! into line charts, either one series per chart or several protocol
//! variants overlaid for comparison.

mod discover;
mod pipeline;
mod plot;
mod report;
mod table;
mod trace;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use num_format::{Locale, ToFormattedString};
use pipeline::{CompareOptions, LabeledTable, SweepOptions};
use report::RunReport;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use table::SweepLayout;

/// Chart generator for network simulator output
#[derive(Parser, Debug)]
#[command(name = "nsplot")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Write the run report as JSON to this file
    #[arg(long, global = true)]
    report: Option<PathBuf>,

    /// Exit with an error status if any chart failed
    #[arg(long, global = true)]
    strict: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plot each metric against each swept parameter of one metric table
    Sweep {
        /// Metric table written by the routing experiment
        #[arg(default_value = "manet-routing.output.csv")]
        table: PathBuf,

        /// Output directory for charts
        #[arg(short, long, default_value = "graphs")]
        output: PathBuf,

        /// Number of runs per swept parameter
        #[arg(long, default_value_t = 4)]
        group_size: usize,
    },

    /// Overlay two metric tables (two routing protocols) per chart
    CompareSweep {
        /// Baseline metric table
        #[arg(long, default_value = "manet-routing.output.csv")]
        baseline: PathBuf,

        /// Candidate metric table
        #[arg(long, default_value = "result.csv")]
        candidate: PathBuf,

        /// Legend label of the baseline
        #[arg(long, default_value = "AODV")]
        baseline_label: String,

        /// Legend label of the candidate
        #[arg(long, default_value = "RAODV")]
        candidate_label: String,

        /// Output directory for charts
        #[arg(short, long, default_value = "graphs/task3")]
        output: PathBuf,

        /// Number of runs per swept parameter
        #[arg(long, default_value_t = 4)]
        group_size: usize,
    },

    /// Plot every trace file of one algorithm (prompts for it if not given)
    Trace {
        /// Algorithm prefix, e.g. TcpVegas or TcpBbr
        #[arg(short, long)]
        prefix: Option<String>,

        /// Directory holding the .data files
        #[arg(short = 'd', long, default_value = ".")]
        data_dir: PathBuf,

        /// Output directory; charts go to <OUTPUT>/<PREFIX>/
        #[arg(short, long, default_value = "scratch/graphs")]
        output: PathBuf,
    },

    /// Overlay the same metric and flow across algorithms
    CompareTrace {
        /// Directory holding the .data files
        #[arg(short = 'd', long, default_value = ".")]
        data_dir: PathBuf,

        /// Output directory for charts
        #[arg(short, long, default_value = "scratch/graphs/comparison")]
        output: PathBuf,

        /// Algorithm prefixes to compare
        #[arg(long, value_delimiter = ',', default_values = ["TcpVegas", "TcpBbr", "TcpVegasTweaked"])]
        prefixes: Vec<String>,

        /// Metrics to compare (default: all known TCP metrics)
        #[arg(long, value_delimiter = ',')]
        metrics: Vec<String>,

        /// Flow numbers to compare
        #[arg(long, value_delimiter = ',', default_values = ["0", "1"])]
        flows: Vec<u32>,
    },
}

fn init_logging() {
    let mut builder = pretty_env_logger::formatted_builder();
    match std::env::var("RUST_LOG") {
        Ok(filters) => {
            builder.parse_filters(&filters);
        }
        Err(_) => {
            builder.filter_level(log::LevelFilter::Info);
        }
    }
    builder.init();
}

/// Ask for an algorithm prefix. Any answer is accepted as typed, minus
/// surrounding whitespace.
fn prompt_prefix<R: BufRead, W: Write>(mut input: R, mut output: W) -> Result<String> {
    write!(output, "Enter the prefix (e.g., TcpVegas or TcpBbr): ")?;
    output.flush()?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("Failed to read prefix from stdin")?;
    Ok(line.trim().to_string())
}

fn run(command: Command) -> Result<RunReport> {
    match command {
        Command::Sweep {
            table,
            output,
            group_size,
        } => {
            let options = SweepOptions {
                layout: SweepLayout::uniform(group_size),
                ..SweepOptions::new(output)
            };
            log::info!("Loading metric table: {}", table.display());
            pipeline::plot_sweep(&table, &options)
        }
        Command::CompareSweep {
            baseline,
            candidate,
            baseline_label,
            candidate_label,
            output,
            group_size,
        } => {
            let options = SweepOptions {
                layout: SweepLayout::uniform(group_size),
                ..SweepOptions::new(output)
            };
            let baseline = LabeledTable {
                path: baseline,
                label: baseline_label,
            };
            let candidate = LabeledTable {
                path: candidate,
                label: candidate_label,
            };
            log::info!(
                "Comparing {} ({}) with {} ({})",
                baseline.label,
                baseline.path.display(),
                candidate.label,
                candidate.path.display()
            );
            pipeline::compare_sweeps(&baseline, &candidate, &options)
        }
        Command::Trace {
            prefix,
            data_dir,
            output,
        } => {
            let prefix = match prefix {
                Some(p) => p,
                None => prompt_prefix(io::stdin().lock(), io::stdout())?,
            };
            pipeline::plot_traces(&data_dir, &prefix, &output)
        }
        Command::CompareTrace {
            data_dir,
            output,
            prefixes,
            metrics,
            flows,
        } => {
            let mut options = CompareOptions::new(output);
            options.prefixes = prefixes;
            options.flows = flows;
            if !metrics.is_empty() {
                options.metrics = metrics.iter().map(|m| m.to_lowercase()).collect();
            }
            pipeline::compare_traces(&data_dir, &options)
        }
    }
}

fn print_summary(report: &RunReport) {
    eprintln!(
        "\n{}: {} charts written ({} points)",
        report.pipeline,
        report.charts.len(),
        report.points_plotted.to_formatted_string(&Locale::en)
    );
    if report.skipped() > 0 {
        eprintln!("  Skipped: {}", report.skipped());
    }
    if report.warnings() > 0 {
        eprintln!("  Warnings: {}", report.warnings());
    }
    if report.errors() > 0 {
        eprintln!("  Errors: {}", report.errors());
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();

    let report = run(args.command)?;
    print_summary(&report);

    if let Some(ref path) = args.report {
        report.write_json(path)?;
        eprintln!("Run report written to: {}", path.display());
    }

    check_strict(&report, args.strict)
}

/// Under `--strict`, any Error diagnostic fails the run
fn check_strict(report: &RunReport, strict: bool) -> Result<()> {
    if strict && report.errors() > 0 {
        bail!("{} chart(s) failed", report.errors());
    }
    Ok(())
}
