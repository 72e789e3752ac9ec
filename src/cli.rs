//! Command-line interface definitions and argument parsing

use crate::log::DEFAULT_LOG_FILE;
use crate::model::{ClusteringParams, DEFAULT_EPS, DEFAULT_MIN_SAMPLES};
use crate::viz::PlotOptions;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Cluster manually entered patient vitals with DBSCAN and flag anomalies
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Neighbourhood radius for DBSCAN, in raw mmHg / mg/dL units
    #[arg(long, default_value_t = DEFAULT_EPS)]
    pub eps: f64,

    /// Minimum number of patients within `eps` (itself included) for a dense region
    #[arg(short, long, default_value_t = DEFAULT_MIN_SAMPLES)]
    pub min_samples: usize,

    /// Append-only run log receiving the timestamped results
    #[arg(short, long, default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Export the scatter plot as a PNG to this path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Do not open the plot window
    #[arg(long)]
    pub no_plot: bool,

    /// Increase diagnostic output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Validated DBSCAN parameters from the command line
    pub fn clustering_params(&self) -> crate::Result<ClusteringParams> {
        ClusteringParams::new(self.eps, self.min_samples)
    }

    /// Plot destinations requested on the command line
    pub fn plot_options(&self) -> PlotOptions {
        PlotOptions {
            export: self.output.clone(),
            display: !self.no_plot,
        }
    }

    /// Diagnostic filter directive for the selected verbosity
    pub fn log_directive(&self) -> Option<&'static str> {
        match self.verbose {
            0 => None,
            1 => Some("info"),
            2 => Some("debug"),
            _ => Some("trace"),
        }
    }
}
