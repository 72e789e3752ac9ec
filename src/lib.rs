//! VitalCluster: density-based clustering of manually entered patient vitals
//!
//! Blood pressure / blood sugar pairs are collected at the console, grouped
//! with DBSCAN, and patients outside every dense region are reported as
//! anomalies, both in a timestamped run log and as a scatter plot.

pub mod cli;
pub mod data;
pub mod error;
pub mod eval;
pub mod log;
pub mod model;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use data::{collect_patients, PatientRecord, PatientSet};
pub use error::VitalsError;
pub use eval::{evaluate, Evaluation};
pub use log::RunLog;
pub use model::{cluster_patients, ClusteringParams, LabelAssignment, NOISE_LABEL};
pub use viz::{publish_plot, render_scatter, PlotOptions, PlotReport};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
