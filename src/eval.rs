//! Clustering evaluation and reporting

use crate::data::PatientSet;
use crate::error::VitalsError;
use crate::log::RunLog;
use crate::model::LabelAssignment;
use std::io::Write;
use tracing::{debug, info};

/// Message used when DBSCAN finds fewer than two clusters
pub const UNSUCCESSFUL_CLUSTERING: &str =
    "Clustering was unsuccessful: fewer than two clusters found.";

/// Summary of one clustering run
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub total_patients: usize,
    pub cluster_count: usize,
    pub anomaly_count: usize,
    /// Patients per cluster, indexed by cluster id
    pub cluster_sizes: Vec<usize>,
    /// Mean silhouette over non-anomalous patients, only with 2+ clusters
    pub silhouette: Option<f64>,
}

impl Evaluation {
    pub fn is_successful(&self) -> bool {
        self.silhouette.is_some()
    }
}

/// Summarize a label assignment, write it to the run log and echo it.
///
/// Cluster and anomaly counts are always recorded. The silhouette score is
/// computed only when there are at least two clusters; otherwise a warning
/// is recorded instead.
///
/// # Arguments
/// * `patients` - Patients that were clustered
/// * `labels` - Labels produced for exactly those patients
/// * `log` - Run log receiving timestamped lines
/// * `console` - Where the summary is echoed (stdout in the binary)
pub fn evaluate<L: Write, C: Write>(
    patients: &PatientSet,
    labels: &LabelAssignment,
    log: &mut RunLog<L>,
    console: &mut C,
) -> crate::Result<Evaluation> {
    if patients.is_empty() {
        return Err(VitalsError::InsufficientData {
            stage: "evaluation",
            required: 1,
            actual: 0,
        }
        .into());
    }
    if patients.len() != labels.len() {
        return Err(VitalsError::LabelMismatch {
            patients: patients.len(),
            labels: labels.len(),
        }
        .into());
    }

    let cluster_count = labels.cluster_count();
    let anomaly_count = labels.anomaly_count();
    let cluster_sizes = labels.cluster_sizes();

    log.info(format!("Total clusters: {}", cluster_count))?;
    log.info(format!("Detected anomalies: {}", anomaly_count))?;
    writeln!(console, "Total clusters: {}", cluster_count)?;
    writeln!(console, "Detected anomalies: {}", anomaly_count)?;

    for (cluster_id, &size) in cluster_sizes.iter().enumerate() {
        let percentage = (size as f64 / patients.len() as f64) * 100.0;
        writeln!(
            console,
            "  Cluster {}: {} patients ({:.1}%)",
            cluster_id, size, percentage
        )?;
    }

    let silhouette = labels.silhouette_score(&patients.to_features());
    match silhouette {
        Some(score) => {
            info!(score, "silhouette score computed");
            log.info(format!("Silhouette Score: {:.2}", score))?;
            writeln!(console, "Silhouette Score: {:.2}", score)?;
        }
        None => {
            // The run log and console already carry the warning
            debug!(cluster_count, "fewer than two clusters, no silhouette score");
            log.warning(UNSUCCESSFUL_CLUSTERING)?;
            writeln!(console, "{}", UNSUCCESSFUL_CLUSTERING)?;
        }
    }

    Ok(Evaluation {
        total_patients: patients.len(),
        cluster_count,
        anomaly_count,
        cluster_sizes,
        silhouette,
    })
}
