//! Typed error kinds raised by the clustering pipeline

use thiserror::Error;

/// Failures callers may want to tell apart (downcast from `anyhow::Error`)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VitalsError {
    /// Not enough patient records to run the requested stage
    #[error("insufficient data: {stage} needs at least {required} patient record(s), got {actual}")]
    InsufficientData {
        stage: &'static str,
        required: usize,
        actual: usize,
    },

    /// A clustering parameter is outside its valid range
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Labels were produced for a different patient set
    #[error("label assignment has {labels} entries but the patient set has {patients}")]
    LabelMismatch { patients: usize, labels: usize },
}
