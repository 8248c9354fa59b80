use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("{field} value {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: Field,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{field} value {value} is not a multiple of {step}")]
    OffStep { field: Field, value: f64, step: f64 },
    #[error("{field} value is not a finite number")]
    NotFinite { field: Field },
    #[error("unknown {kind} code '{code}'")]
    UnknownCode { kind: &'static str, code: String },
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
}

macro_rules! coded_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $code:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $code)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn code(self) -> &'static str {
                match self {
                    $($name::$variant => $code,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = RecordError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($code => Ok($name::$variant),)+
                    other => Err(RecordError::UnknownCode {
                        kind: stringify!($name),
                        code: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.code())
            }
        }
    };
}

coded_enum!(Sex {
    Male => "M",
    Female => "F",
});

coded_enum!(ChestPainType {
    TypicalAngina => "TA",
    AtypicalAngina => "ATA",
    NonAnginalPain => "NAP",
    Asymptomatic => "ASY",
});

coded_enum!(
    /// Resting electrocardiogram result.
    RestingEcg {
        Normal => "Normal",
        StTAbnormality => "ST",
        LeftVentricularHypertrophy => "LVH",
    }
);

coded_enum!(ExerciseAngina {
    Yes => "Y",
    No => "N",
});

coded_enum!(
    /// Slope of the peak exercise ST segment.
    StSlope {
        Up => "Up",
        Flat => "Flat",
        Down => "Down",
    }
);

/// Fasting blood sugar flag, `1` when above 120 mg/dl. Travels as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FastingBs {
    Normal,
    Elevated,
}

impl FastingBs {
    pub const ALL: &'static [FastingBs] = &[FastingBs::Elevated, FastingBs::Normal];

    pub fn code(self) -> &'static str {
        match self {
            FastingBs::Normal => "0",
            FastingBs::Elevated => "1",
        }
    }
}

impl TryFrom<u8> for FastingBs {
    type Error = RecordError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FastingBs::Normal),
            1 => Ok(FastingBs::Elevated),
            other => Err(RecordError::UnknownCode {
                kind: "FastingBs",
                code: other.to_string(),
            }),
        }
    }
}

impl From<FastingBs> for u8 {
    fn from(value: FastingBs) -> Self {
        match value {
            FastingBs::Normal => 0,
            FastingBs::Elevated => 1,
        }
    }
}

impl FromStr for FastingBs {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().parse::<u8>().map_err(|_| RecordError::UnknownCode {
            kind: "FastingBs",
            code: s.to_string(),
        })?;
        FastingBs::try_from(raw)
    }
}

impl fmt::Display for FastingBs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Closed numeric interval with a step grid anchored at `min`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericDomain {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl NumericDomain {
    const fn new(min: f64, max: f64, step: f64) -> Self {
        Self { min, max, step }
    }

    pub fn check(&self, field: Field, value: f64) -> Result<(), RecordError> {
        if !value.is_finite() {
            return Err(RecordError::NotFinite { field });
        }
        if value < self.min || value > self.max {
            return Err(RecordError::OutOfRange {
                field,
                value,
                min: self.min,
                max: self.max,
            });
        }
        if !self.on_grid(value) {
            return Err(RecordError::OffStep {
                field,
                value,
                step: self.step,
            });
        }
        Ok(())
    }

    pub fn accepts(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max && self.on_grid(value)
    }

    fn on_grid(&self, value: f64) -> bool {
        let steps = (value - self.min) / self.step;
        (steps - steps.round()).abs() <= 1e-6
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Numeric,
    Categorical,
}

/// The eleven record fields, in form order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Age,
    Sex,
    ChestPainType,
    RestingBp,
    Cholesterol,
    FastingBs,
    RestingEcg,
    MaxHr,
    ExerciseAngina,
    Oldpeak,
    StSlope,
}

impl Field {
    pub const ALL: [Field; 11] = [
        Field::Age,
        Field::Sex,
        Field::ChestPainType,
        Field::RestingBp,
        Field::Cholesterol,
        Field::FastingBs,
        Field::RestingEcg,
        Field::MaxHr,
        Field::ExerciseAngina,
        Field::Oldpeak,
        Field::StSlope,
    ];

    /// Column name used in stored records and by the model.
    pub fn column(self) -> &'static str {
        match self {
            Field::Age => "Age",
            Field::Sex => "Sex",
            Field::ChestPainType => "ChestPainType",
            Field::RestingBp => "RestingBP",
            Field::Cholesterol => "Cholesterol",
            Field::FastingBs => "FastingBS",
            Field::RestingEcg => "RestingECG",
            Field::MaxHr => "MaxHR",
            Field::ExerciseAngina => "ExerciseAngina",
            Field::Oldpeak => "Oldpeak",
            Field::StSlope => "ST_Slope",
        }
    }

    /// Id of the input widget on the page.
    pub fn widget_id(self) -> &'static str {
        match self {
            Field::Age => "age",
            Field::Sex => "sex",
            Field::ChestPainType => "chest_pain",
            Field::RestingBp => "bp",
            Field::Cholesterol => "cholesterol",
            Field::FastingBs => "blood_sugar",
            Field::RestingEcg => "resting_ecg",
            Field::MaxHr => "maximum_hr",
            Field::ExerciseAngina => "exercise_angina",
            Field::Oldpeak => "oldpeak",
            Field::StSlope => "st_slope",
        }
    }

    /// FastingBS is a 0/1 flag and is fed to models as a number.
    pub fn kind(self) -> FieldKind {
        match self {
            Field::Age
            | Field::RestingBp
            | Field::Cholesterol
            | Field::FastingBs
            | Field::MaxHr
            | Field::Oldpeak => FieldKind::Numeric,
            Field::Sex
            | Field::ChestPainType
            | Field::RestingEcg
            | Field::ExerciseAngina
            | Field::StSlope => FieldKind::Categorical,
        }
    }

    pub fn numeric_domain(self) -> Option<NumericDomain> {
        match self {
            Field::Age => Some(NumericDomain::new(0.0, 100.0, 1.0)),
            Field::RestingBp => Some(NumericDomain::new(1.0, 250.0, 1.0)),
            Field::Cholesterol => Some(NumericDomain::new(0.0, 100.0, 1.0)),
            Field::MaxHr => Some(NumericDomain::new(50.0, 210.0, 1.0)),
            Field::Oldpeak => Some(NumericDomain::new(0.0, 100.0, 0.1)),
            _ => None,
        }
    }

    /// Legal codes of a categorical field, empty for numeric fields.
    pub fn levels(self) -> Vec<&'static str> {
        match self {
            Field::Sex => Sex::ALL.iter().map(|v| v.code()).collect(),
            Field::ChestPainType => ChestPainType::ALL.iter().map(|v| v.code()).collect(),
            Field::RestingEcg => RestingEcg::ALL.iter().map(|v| v.code()).collect(),
            Field::ExerciseAngina => ExerciseAngina::ALL.iter().map(|v| v.code()).collect(),
            Field::StSlope => StSlope::ALL.iter().map(|v| v.code()).collect(),
            _ => Vec::new(),
        }
    }

    pub fn from_column(column: &str) -> Result<Self, RecordError> {
        Field::ALL
            .into_iter()
            .find(|field| field.column() == column)
            .ok_or_else(|| RecordError::UnknownColumn(column.to_string()))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// One field of a record as a model sees it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Category(&'static str),
}

/// The eleven clinical measurements entered on the form.
///
/// Every field is optional because the form publishes a record on each
/// widget change, long before the user has filled everything in.
/// Deserialization validates every present value, so a record read back from
/// session storage is always within its declared domains.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "UncheckedRecord")]
pub struct PatientRecord {
    #[serde(rename = "Age")]
    pub age: Option<u8>,
    #[serde(rename = "Sex")]
    pub sex: Option<Sex>,
    #[serde(rename = "ChestPainType")]
    pub chest_pain_type: Option<ChestPainType>,
    #[serde(rename = "RestingBP")]
    pub resting_bp: Option<u16>,
    #[serde(rename = "Cholesterol")]
    pub cholesterol: Option<u16>,
    #[serde(rename = "FastingBS")]
    pub fasting_bs: Option<FastingBs>,
    #[serde(rename = "RestingECG")]
    pub resting_ecg: Option<RestingEcg>,
    #[serde(rename = "MaxHR")]
    pub max_hr: Option<u16>,
    #[serde(rename = "ExerciseAngina")]
    pub exercise_angina: Option<ExerciseAngina>,
    #[serde(rename = "Oldpeak")]
    pub oldpeak: Option<f64>,
    #[serde(rename = "ST_Slope")]
    pub st_slope: Option<StSlope>,
}

#[derive(Deserialize)]
struct UncheckedRecord {
    #[serde(rename = "Age")]
    age: Option<u8>,
    #[serde(rename = "Sex")]
    sex: Option<Sex>,
    #[serde(rename = "ChestPainType")]
    chest_pain_type: Option<ChestPainType>,
    #[serde(rename = "RestingBP")]
    resting_bp: Option<u16>,
    #[serde(rename = "Cholesterol")]
    cholesterol: Option<u16>,
    #[serde(rename = "FastingBS")]
    fasting_bs: Option<FastingBs>,
    #[serde(rename = "RestingECG")]
    resting_ecg: Option<RestingEcg>,
    #[serde(rename = "MaxHR")]
    max_hr: Option<u16>,
    #[serde(rename = "ExerciseAngina")]
    exercise_angina: Option<ExerciseAngina>,
    #[serde(rename = "Oldpeak")]
    oldpeak: Option<f64>,
    #[serde(rename = "ST_Slope")]
    st_slope: Option<StSlope>,
}

impl TryFrom<UncheckedRecord> for PatientRecord {
    type Error = RecordError;

    fn try_from(raw: UncheckedRecord) -> Result<Self, Self::Error> {
        let record = PatientRecord {
            age: raw.age,
            sex: raw.sex,
            chest_pain_type: raw.chest_pain_type,
            resting_bp: raw.resting_bp,
            cholesterol: raw.cholesterol,
            fasting_bs: raw.fasting_bs,
            resting_ecg: raw.resting_ecg,
            max_hr: raw.max_hr,
            exercise_angina: raw.exercise_angina,
            oldpeak: raw.oldpeak,
            st_slope: raw.st_slope,
        };
        record.validate()?;
        Ok(record)
    }
}

impl PatientRecord {
    /// Checks every present numeric value against its field's domain.
    pub fn validate(&self) -> Result<(), RecordError> {
        for field in Field::ALL {
            let (Some(domain), Some(FieldValue::Number(value))) =
                (field.numeric_domain(), self.value(field))
            else {
                continue;
            };
            domain.check(field, value)?;
        }
        Ok(())
    }

    pub fn value(&self, field: Field) -> Option<FieldValue> {
        let number = |v: f64| FieldValue::Number(v);
        match field {
            Field::Age => self.age.map(|v| number(f64::from(v))),
            Field::Sex => self.sex.map(|v| FieldValue::Category(v.code())),
            Field::ChestPainType => self.chest_pain_type.map(|v| FieldValue::Category(v.code())),
            Field::RestingBp => self.resting_bp.map(|v| number(f64::from(v))),
            Field::Cholesterol => self.cholesterol.map(|v| number(f64::from(v))),
            Field::FastingBs => self.fasting_bs.map(|v| number(f64::from(u8::from(v)))),
            Field::RestingEcg => self.resting_ecg.map(|v| FieldValue::Category(v.code())),
            Field::MaxHr => self.max_hr.map(|v| number(f64::from(v))),
            Field::ExerciseAngina => self.exercise_angina.map(|v| FieldValue::Category(v.code())),
            Field::Oldpeak => self.oldpeak.map(number),
            Field::StSlope => self.st_slope.map(|v| FieldValue::Category(v.code())),
        }
    }

    pub fn missing_fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|field| self.value(*field).is_none())
            .collect()
    }

    /// A record is submittable once all eleven fields are present.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PatientRecord {
        PatientRecord {
            age: Some(55),
            sex: Some(Sex::Male),
            chest_pain_type: Some(ChestPainType::Asymptomatic),
            resting_bp: Some(140),
            cholesterol: Some(60),
            fasting_bs: Some(FastingBs::Normal),
            resting_ecg: Some(RestingEcg::Normal),
            max_hr: Some(120),
            exercise_angina: Some(ExerciseAngina::Yes),
            oldpeak: Some(1.5),
            st_slope: Some(StSlope::Flat),
        }
    }

    #[test]
    fn serializes_with_column_names_and_nulls() {
        let record = PatientRecord {
            age: Some(40),
            fasting_bs: Some(FastingBs::Elevated),
            st_slope: Some(StSlope::Up),
            ..Default::default()
        };
        let value = serde_json::to_value(record).expect("serialize");
        assert_eq!(value["Age"], 40);
        assert_eq!(value["FastingBS"], 1);
        assert_eq!(value["ST_Slope"], "Up");
        assert!(value["Sex"].is_null());
        assert_eq!(value.as_object().expect("object").len(), 11);
    }

    #[test]
    fn stored_record_reads_back_unchanged() {
        let record = sample();
        let stored = serde_json::to_string(&record).expect("serialize");
        let restored: PatientRecord = serde_json::from_str(&stored).expect("deserialize");
        assert_eq!(restored, record);
    }

    #[test]
    fn deserialization_rejects_out_of_domain_values() {
        let err = serde_json::from_str::<PatientRecord>(r#"{"MaxHR": 20}"#)
            .expect_err("max hr below 50");
        assert!(err.to_string().contains("MaxHR"));

        serde_json::from_str::<PatientRecord>(r#"{"Oldpeak": 1.55}"#).expect_err("off step");
        serde_json::from_str::<PatientRecord>(r#"{"Sex": "X"}"#).expect_err("unknown sex");
        serde_json::from_str::<PatientRecord>(r#"{"FastingBS": 2}"#).expect_err("not a flag");
    }

    #[test]
    fn missing_keys_read_as_null() {
        let record: PatientRecord = serde_json::from_str("{}").expect("empty record");
        assert_eq!(record, PatientRecord::default());
        assert_eq!(record.missing_fields().len(), 11);
        assert!(!record.is_complete());
        assert!(sample().is_complete());
    }

    #[test]
    fn oldpeak_grid_tolerates_float_noise() {
        let domain = Field::Oldpeak.numeric_domain().expect("numeric");
        assert!(domain.accepts(0.1 + 0.2));
        assert!(domain.accepts(100.0));
        assert!(!domain.accepts(100.1));
        assert!(!domain.accepts(f64::NAN));
    }

    #[test]
    fn columns_round_trip_through_field() {
        for field in Field::ALL {
            assert_eq!(Field::from_column(field.column()).expect("known"), field);
        }
        assert!(Field::from_column("Weight").is_err());
    }

    #[test]
    fn codes_parse_back() {
        assert_eq!("ASY".parse::<ChestPainType>().expect("code"), ChestPainType::Asymptomatic);
        assert_eq!("1".parse::<FastingBs>().expect("flag"), FastingBs::Elevated);
        assert!("Sideways".parse::<StSlope>().is_err());
    }
}
