use std::sync::Arc;

use predictor::{Classifier, ModelError};
use shared::{
    domain::PatientRecord,
    error::{ApiError, ErrorCode},
    protocol::{FormInputs, RiskClass},
};
use tracing::{debug, error, info, warn};

pub mod form;

#[derive(Clone)]
pub struct ApiContext {
    pub classifier: Arc<dyn Classifier>,
}

impl ApiContext {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }
}

/// What the result column should show after a submit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// Leave the result column as it is.
    NoUpdate,
    /// Show nothing.
    Empty,
    Rendered(RiskClass),
}

/// Store callback: the record that replaces whatever session storage holds.
pub fn store_record(inputs: &FormInputs) -> PatientRecord {
    let record = form::publish(inputs);
    debug!(missing = record.missing_fields().len(), "published patient record");
    record
}

/// Submit callback.
///
/// An absent record skips the update whatever the click count. Out-of-domain
/// values are refused before the classifier runs; incomplete records are
/// handed over as is and fail inside the model.
pub fn evaluate(
    ctx: &ApiContext,
    n_clicks: u64,
    record: Option<&PatientRecord>,
) -> Result<Evaluation, ApiError> {
    let Some(record) = record else {
        debug!(n_clicks, "no stored record, skipping update");
        return Ok(Evaluation::NoUpdate);
    };
    if n_clicks == 0 {
        return Ok(Evaluation::Empty);
    }
    record.validate().map_err(|err| {
        warn!(error = %err, "refusing out-of-domain record");
        ApiError::new(ErrorCode::Validation, err.to_string())
    })?;

    let label = ctx.classifier.predict(record).map_err(internal)?;
    let risk = RiskClass::from_label(label)
        .ok_or_else(|| internal(ModelError::UnexpectedLabel(label)))?;
    info!(n_clicks, %risk, "prediction rendered");
    Ok(Evaluation::Rendered(risk))
}

fn internal(err: ModelError) -> ApiError {
    error!(error = %err, "prediction failed");
    ApiError::new(ErrorCode::Internal, "prediction failed")
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
