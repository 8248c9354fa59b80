use std::{collections::BTreeMap, fmt, fs, path::Path};

use serde::Deserialize;
use shared::domain::{Field, FieldKind, FieldValue, PatientRecord};
use tracing::{debug, info};

use crate::{Classifier, ModelError};

const FORMAT_VERSION: u32 = 1;

fn default_threshold() -> f64 {
    0.5
}

/// On-disk form of a logistic regression over the record columns.
#[derive(Debug, Deserialize)]
struct ModelArtifact {
    format_version: u32,
    #[serde(default)]
    name: Option<String>,
    intercept: f64,
    #[serde(default = "default_threshold")]
    threshold: f64,
    terms: Vec<Term>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Term {
    /// Contributes `weight * (x - mean) / scale`.
    Numeric {
        column: String,
        mean: f64,
        scale: f64,
        weight: f64,
    },
    /// Contributes the weight of the record's level, zero for unlisted levels.
    Categorical {
        column: String,
        weights: BTreeMap<String, f64>,
    },
}

#[derive(Debug, Clone)]
enum CompiledTerm {
    Numeric {
        field: Field,
        mean: f64,
        scale: f64,
        weight: f64,
    },
    Categorical {
        field: Field,
        weights: BTreeMap<String, f64>,
    },
}

impl CompiledTerm {
    fn field(&self) -> Field {
        match self {
            Self::Numeric { field, .. } | Self::Categorical { field, .. } => *field,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LinearModel {
    name: Option<String>,
    intercept: f64,
    threshold: f64,
    terms: Vec<CompiledTerm>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSummary {
    pub name: Option<String>,
    pub threshold: f64,
    pub columns: Vec<&'static str>,
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} terms, threshold {}): {}",
            self.name.as_deref().unwrap_or("unnamed model"),
            self.columns.len(),
            self.threshold,
            self.columns.join(", ")
        )
    }
}

impl LinearModel {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model = Self::from_json(&raw)?;
        info!(path = %path.display(), summary = %model.summary(), "model loaded");
        Ok(model)
    }

    pub fn from_json(raw: &str) -> Result<Self, ModelError> {
        let artifact: ModelArtifact = serde_json::from_str(raw)?;
        Self::from_artifact(artifact)
    }

    fn from_artifact(artifact: ModelArtifact) -> Result<Self, ModelError> {
        if artifact.format_version != FORMAT_VERSION {
            return Err(invalid(format!(
                "unsupported format_version {}, expected {FORMAT_VERSION}",
                artifact.format_version
            )));
        }
        if !artifact.intercept.is_finite() {
            return Err(invalid("intercept must be finite"));
        }
        if !(artifact.threshold > 0.0 && artifact.threshold < 1.0) {
            return Err(invalid(format!(
                "threshold {} must lie strictly between 0 and 1",
                artifact.threshold
            )));
        }
        if artifact.terms.is_empty() {
            return Err(invalid("artifact has no terms"));
        }

        let mut terms: Vec<CompiledTerm> = Vec::with_capacity(artifact.terms.len());
        for term in artifact.terms {
            let compiled = compile_term(term)?;
            if terms.iter().any(|t| t.field() == compiled.field()) {
                return Err(invalid(format!(
                    "column {} appears in more than one term",
                    compiled.field()
                )));
            }
            terms.push(compiled);
        }

        Ok(Self {
            name: artifact.name,
            intercept: artifact.intercept,
            threshold: artifact.threshold,
            terms,
        })
    }

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            name: self.name.clone(),
            threshold: self.threshold,
            columns: self.terms.iter().map(|t| t.field().column()).collect(),
        }
    }

    fn probability(&self, record: &PatientRecord) -> Result<f64, ModelError> {
        let mut z = self.intercept;
        for term in &self.terms {
            let field = term.field();
            let value = record
                .value(field)
                .ok_or(ModelError::MissingFeature(field.column()))?;
            z += match (term, value) {
                (
                    CompiledTerm::Numeric {
                        mean, scale, weight, ..
                    },
                    FieldValue::Number(x),
                ) => weight * (x - mean) / scale,
                (CompiledTerm::Categorical { weights, .. }, FieldValue::Category(level)) => {
                    weights.get(level).copied().unwrap_or(0.0)
                }
                _ => {
                    return Err(invalid(format!(
                        "term kind does not match column {field}"
                    )))
                }
            };
        }
        Ok(1.0 / (1.0 + (-z).exp()))
    }
}

impl Classifier for LinearModel {
    fn predict(&self, record: &PatientRecord) -> Result<i64, ModelError> {
        let probability = self.probability(record)?;
        let label = i64::from(probability >= self.threshold);
        debug!(label, "linear model prediction");
        Ok(label)
    }
}

fn compile_term(term: Term) -> Result<CompiledTerm, ModelError> {
    match term {
        Term::Numeric {
            column,
            mean,
            scale,
            weight,
        } => {
            let field = Field::from_column(&column).map_err(|e| invalid(e.to_string()))?;
            if field.kind() != FieldKind::Numeric {
                return Err(invalid(format!("column {field} is not numeric")));
            }
            if !(mean.is_finite() && weight.is_finite()) {
                return Err(invalid(format!("numeric term {field} must be finite")));
            }
            if !(scale.is_finite() && scale > 0.0) {
                return Err(invalid(format!("numeric term {field} needs a positive scale")));
            }
            Ok(CompiledTerm::Numeric {
                field,
                mean,
                scale,
                weight,
            })
        }
        Term::Categorical { column, weights } => {
            let field = Field::from_column(&column).map_err(|e| invalid(e.to_string()))?;
            if field.kind() != FieldKind::Categorical {
                return Err(invalid(format!("column {field} is not categorical")));
            }
            let levels = field.levels();
            for (level, weight) in &weights {
                if !levels.contains(&level.as_str()) {
                    return Err(invalid(format!("column {field} has no level '{level}'")));
                }
                if !weight.is_finite() {
                    return Err(invalid(format!("weight for {field}={level} must be finite")));
                }
            }
            Ok(CompiledTerm::Categorical { field, weights })
        }
    }
}

fn invalid(message: impl Into<String>) -> ModelError {
    ModelError::Invalid(message.into())
}

#[cfg(test)]
#[path = "tests/linear_tests.rs"]
mod tests;
