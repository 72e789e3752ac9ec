//! VitalCluster: interactive patient clustering CLI
//!
//! Collects vitals at the console, runs DBSCAN, reports clusters and
//! anomalies, and renders the scatter plot.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};
use vitalcluster::{
    cluster_patients, collect_patients, evaluate, publish_plot, Args, RunLog,
};

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    let params = args.clustering_params()?;
    let mut run_log = RunLog::append_to(&args.log_file)
        .with_context(|| format!("opening run log {}", args.log_file.display()))?;

    // Step 1: collect patients
    let patients = {
        let stdin = io::stdin();
        collect_patients(stdin.lock(), io::stdout())?
    };
    info!(patients = patients.len(), "input collection finished");

    // Step 2: cluster
    debug!(eps = params.eps, min_samples = params.min_samples, "clustering");
    let labels = cluster_patients(&patients, &params)?;

    // Step 3: evaluate and report
    let mut stdout = io::stdout();
    writeln!(stdout, "\n=== Clustering Results ===")?;
    let evaluation = evaluate(&patients, &labels, &mut run_log, &mut stdout)?;
    info!(
        clusters = evaluation.cluster_count,
        anomalies = evaluation.anomaly_count,
        "evaluation recorded in {}",
        args.log_file.display()
    );

    // Step 4: visualize
    let plot_options = args.plot_options();
    if plot_options.display && cfg!(feature = "window") {
        writeln!(stdout, "\nClose the plot window (or press Escape) to finish.")?;
    }
    let report = publish_plot(&patients, &labels, &plot_options).context("rendering plot")?;

    if let Some(path) = &report.exported {
        writeln!(stdout, "Plot saved to: {}", path.display())?;
    }
    if plot_options.display && !report.displayed {
        writeln!(
            stdout,
            "Plot window unavailable (built without the `window` feature); use --output <PATH> to export the plot."
        )?;
    }
    debug!(?report, "visualization finished");

    Ok(())
}

/// Diagnostics go to stderr; prompts and results stay on stdout
fn init_tracing(args: &Args) {
    let filter = match args.log_directive() {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(io::stderr)
        .init();
}
