//! Form layout and the store callback.
//!
//! The page renders its widgets from [`FIELD_SPECS`] and [`SECTIONS`], and every
//! widget change posts the whole form back to [`publish`], which turns it into
//! the record kept in session storage.

use shared::{
    domain::{
        ChestPainType, ExerciseAngina, FastingBs, Field, PatientRecord, RestingEcg, Sex, StSlope,
    },
    protocol::FormInputs,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropdownOption {
    pub label: &'static str,
    pub value: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Widget {
    /// Number input bounded by the field's numeric domain.
    Number,
    /// Select box. `numeric` dropdowns submit their value as a number.
    Dropdown {
        options: &'static [DropdownOption],
        numeric: bool,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: Field,
    pub prompt: &'static str,
    pub placeholder: &'static str,
    pub widget: Widget,
}

#[derive(Debug, Clone, Copy)]
pub struct Section {
    pub title: &'static str,
    pub fields: &'static [Field],
}

pub static FIELD_SPECS: [FieldSpec; 11] = [
    FieldSpec {
        field: Field::Age,
        prompt: "1. What is the Age of the patient?",
        placeholder: "Age in years",
        widget: Widget::Number,
    },
    FieldSpec {
        field: Field::Sex,
        prompt: "2. What is the sex of the patient?",
        placeholder: "Patient's sex",
        widget: Widget::Dropdown {
            options: &[
                DropdownOption { label: "Male", value: "M" },
                DropdownOption { label: "Female", value: "F" },
            ],
            numeric: false,
        },
    },
    FieldSpec {
        field: Field::ChestPainType,
        prompt: "3. Chest Pain Type?",
        placeholder: "Patient's chest pain type",
        widget: Widget::Dropdown {
            options: &[
                DropdownOption { label: "Typical Angina", value: "TA" },
                DropdownOption { label: "Atypical Angina", value: "ATA" },
                DropdownOption { label: "Non-Anginal Pain", value: "NAP" },
                DropdownOption { label: "Asymptomatic", value: "ASY" },
            ],
            numeric: false,
        },
    },
    FieldSpec {
        field: Field::RestingBp,
        prompt: "4. What is the patient's resting blood pressure?",
        placeholder: "Blood pressure [mm Hg]",
        widget: Widget::Number,
    },
    FieldSpec {
        field: Field::Cholesterol,
        prompt: "5. Patient's serum cholesterol?",
        placeholder: "Cholesterol [mm/dl]",
        widget: Widget::Number,
    },
    FieldSpec {
        field: Field::FastingBs,
        prompt: "6. Patient's Fasting Blood sugar",
        placeholder: "Fasting BS",
        widget: Widget::Dropdown {
            options: &[
                DropdownOption { label: "> 120 mg/dl", value: "1" },
                DropdownOption { label: "Otherwise", value: "0" },
            ],
            numeric: true,
        },
    },
    FieldSpec {
        field: Field::RestingEcg,
        prompt: "7. Patient's resting electrocardiogram results",
        placeholder: "RestingECG",
        widget: Widget::Dropdown {
            options: &[
                DropdownOption { label: "Normal", value: "Normal" },
                DropdownOption {
                    label: "Having ST-T wave abnormality (T wave inversions and/or ST elevation or depression of > 0.05 mV)",
                    value: "ST",
                },
                DropdownOption {
                    label: "Showing probable or definite left ventricular hypertrophy by Estes' criteria",
                    value: "LVH",
                },
            ],
            numeric: false,
        },
    },
    FieldSpec {
        field: Field::MaxHr,
        prompt: "8. Maximum heart rate achieved by patient?",
        placeholder: "MaxHR",
        widget: Widget::Number,
    },
    FieldSpec {
        field: Field::ExerciseAngina,
        prompt: "9. Exercise-induced angina",
        placeholder: "ExerciseAngina",
        widget: Widget::Dropdown {
            options: &[
                DropdownOption { label: "Yes", value: "Y" },
                DropdownOption { label: "No", value: "N" },
            ],
            numeric: false,
        },
    },
    FieldSpec {
        field: Field::Oldpeak,
        prompt: "10. Oldpeak?",
        placeholder: "Numeric value measured in depression",
        widget: Widget::Number,
    },
    FieldSpec {
        field: Field::StSlope,
        prompt: "11. The slope of the peak exercise ST segment?",
        placeholder: "ST slope",
        widget: Widget::Dropdown {
            options: &[
                DropdownOption { label: "Upsloping", value: "Up" },
                DropdownOption { label: "Flat", value: "Flat" },
                DropdownOption { label: "Downsloping", value: "Down" },
            ],
            numeric: false,
        },
    },
];

/// The four form pages. The submit button sits at the end of the last one.
pub static SECTIONS: [Section; 4] = [
    Section {
        title: "Page 1",
        fields: &[Field::Age, Field::Sex, Field::ChestPainType],
    },
    Section {
        title: "Page 2",
        fields: &[Field::RestingBp, Field::Cholesterol, Field::FastingBs],
    },
    Section {
        title: "Page 3",
        fields: &[Field::RestingEcg, Field::MaxHr, Field::ExerciseAngina],
    },
    Section {
        title: "Page 4",
        fields: &[Field::Oldpeak, Field::StSlope],
    },
];

pub fn field_spec(field: Field) -> &'static FieldSpec {
    // FIELD_SPECS is ordered like Field::ALL.
    &FIELD_SPECS[field as usize]
}

/// What a number widget reports for a raw entry: the value when it lies in
/// the field's domain and on its step grid, nothing otherwise.
pub fn accept_number(field: Field, raw: Option<f64>) -> Option<f64> {
    let domain = field.numeric_domain()?;
    raw.filter(|value| domain.accepts(*value))
}

fn accept_integer<T: TryFrom<i64>>(field: Field, raw: Option<f64>) -> Option<T> {
    accept_number(field, raw).and_then(|value| T::try_from(value.round() as i64).ok())
}

/// Builds a fresh record from the full set of current widget values.
///
/// The result depends only on `inputs`: nothing from earlier calls is merged
/// in. Refused numeric entries become `None`, just as the widget would report
/// no value.
pub fn publish(inputs: &FormInputs) -> PatientRecord {
    PatientRecord {
        age: accept_integer(Field::Age, inputs.age),
        sex: inputs.sex,
        chest_pain_type: inputs.chest_pain,
        resting_bp: accept_integer(Field::RestingBp, inputs.bp),
        cholesterol: accept_integer(Field::Cholesterol, inputs.cholesterol),
        fasting_bs: inputs.blood_sugar,
        resting_ecg: inputs.resting_ecg,
        max_hr: accept_integer(Field::MaxHr, inputs.maximum_hr),
        exercise_angina: inputs.exercise_angina,
        oldpeak: accept_number(Field::Oldpeak, inputs.oldpeak),
        st_slope: inputs.st_slope,
    }
}

/// A single widget change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldUpdate {
    Age(Option<f64>),
    Sex(Option<Sex>),
    ChestPainType(Option<ChestPainType>),
    RestingBp(Option<f64>),
    Cholesterol(Option<f64>),
    FastingBs(Option<FastingBs>),
    RestingEcg(Option<RestingEcg>),
    MaxHr(Option<f64>),
    ExerciseAngina(Option<ExerciseAngina>),
    Oldpeak(Option<f64>),
    StSlope(Option<StSlope>),
}

/// Latest value of every widget on one page instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    inputs: FormInputs,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one change and returns the record that replaces the stored one.
    pub fn apply(&mut self, update: FieldUpdate) -> PatientRecord {
        let inputs = &mut self.inputs;
        match update {
            FieldUpdate::Age(v) => inputs.age = v,
            FieldUpdate::Sex(v) => inputs.sex = v,
            FieldUpdate::ChestPainType(v) => inputs.chest_pain = v,
            FieldUpdate::RestingBp(v) => inputs.bp = v,
            FieldUpdate::Cholesterol(v) => inputs.cholesterol = v,
            FieldUpdate::FastingBs(v) => inputs.blood_sugar = v,
            FieldUpdate::RestingEcg(v) => inputs.resting_ecg = v,
            FieldUpdate::MaxHr(v) => inputs.maximum_hr = v,
            FieldUpdate::ExerciseAngina(v) => inputs.exercise_angina = v,
            FieldUpdate::Oldpeak(v) => inputs.oldpeak = v,
            FieldUpdate::StSlope(v) => inputs.st_slope = v,
        }
        self.record()
    }

    pub fn record(&self) -> PatientRecord {
        publish(&self.inputs)
    }
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;
