use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{
    ChestPainType, ExerciseAngina, FastingBs, PatientRecord, RestingEcg, Sex, StSlope,
};

/// Session storage key holding the latest published record.
pub const SESSION_STORE_KEY: &str = "store-data";

/// Raw widget values as the page reports them, keyed by widget id.
///
/// Number inputs arrive unchecked; the form controller decides whether the
/// widget would have accepted them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormInputs {
    #[serde(default)]
    pub age: Option<f64>,
    #[serde(default)]
    pub sex: Option<Sex>,
    #[serde(default)]
    pub chest_pain: Option<ChestPainType>,
    #[serde(default)]
    pub bp: Option<f64>,
    #[serde(default)]
    pub cholesterol: Option<f64>,
    #[serde(default)]
    pub blood_sugar: Option<FastingBs>,
    #[serde(default)]
    pub resting_ecg: Option<RestingEcg>,
    #[serde(default)]
    pub maximum_hr: Option<f64>,
    #[serde(default)]
    pub exercise_angina: Option<ExerciseAngina>,
    #[serde(default)]
    pub oldpeak: Option<f64>,
    #[serde(default)]
    pub st_slope: Option<StSlope>,
}

/// Submit click counter plus whatever session storage currently holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateRequest {
    #[serde(default)]
    pub n_clicks: u64,
    #[serde(default)]
    pub data: Option<PatientRecord>,
}

/// Binary model outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskClass {
    NotAtRisk,
    AtRisk,
}

impl RiskClass {
    /// Maps a raw model label. Only `0` and `1` are meaningful.
    pub fn from_label(label: i64) -> Option<Self> {
        match label {
            0 => Some(Self::NotAtRisk),
            1 => Some(Self::AtRisk),
            _ => None,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::NotAtRisk => "Patient is not at risk of heart failure",
            Self::AtRisk => "Patient is at risk of heart failure",
        }
    }
}

impl fmt::Display for RiskClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAtRisk => f.write_str("not_at_risk"),
            Self::AtRisk => f.write_str("at_risk"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_partition_exactly_at_zero_and_one() {
        assert_eq!(RiskClass::from_label(0), Some(RiskClass::NotAtRisk));
        assert_eq!(RiskClass::from_label(1), Some(RiskClass::AtRisk));
        assert_eq!(RiskClass::from_label(-1), None);
        assert_eq!(RiskClass::from_label(2), None);
    }

    #[test]
    fn evaluate_request_defaults_to_no_clicks_and_no_data() {
        let req: EvaluateRequest = serde_json::from_str("{}").expect("request");
        assert_eq!(req.n_clicks, 0);
        assert!(req.data.is_none());

        let req: EvaluateRequest =
            serde_json::from_str(r#"{"n_clicks": 3, "data": {"Age": 61}}"#).expect("request");
        assert_eq!(req.n_clicks, 3);
        assert_eq!(req.data.and_then(|d| d.age), Some(61));
    }

    #[test]
    fn form_inputs_use_widget_ids() {
        let inputs: FormInputs =
            serde_json::from_str(r#"{"chest_pain": "NAP", "blood_sugar": 1, "bp": 130}"#)
                .expect("inputs");
        assert_eq!(inputs.chest_pain, Some(ChestPainType::NonAnginalPain));
        assert_eq!(inputs.blood_sugar, Some(FastingBs::Elevated));
        assert_eq!(inputs.bp, Some(130.0));
        assert!(inputs.age.is_none());
    }
}
