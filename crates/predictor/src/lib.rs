//! Model handle for the heart failure predictor.
//!
//! A classifier is loaded once when the process starts and shared read-only
//! between requests. Prediction is strictly single-row: one record in, one raw
//! label out.

use std::path::PathBuf;

use shared::domain::PatientRecord;
use thiserror::Error;

mod linear;

pub use linear::{LinearModel, ModelSummary};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model artifact {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid model artifact: {0}")]
    Invalid(String),
    #[error("record is missing feature {0}")]
    MissingFeature(&'static str),
    #[error("model produced unexpected label {0}")]
    UnexpectedLabel(i64),
}

pub trait Classifier: Send + Sync {
    /// Returns the raw class label for a single record.
    fn predict(&self, record: &PatientRecord) -> Result<i64, ModelError>;
}
