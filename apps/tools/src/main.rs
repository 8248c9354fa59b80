use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use predictor::LinearModel;
use server_api::{
    evaluate,
    form::{FieldUpdate, FormState},
    ApiContext, Evaluation,
};
use shared::{
    domain::{ChestPainType, ExerciseAngina, FastingBs, PatientRecord, RestingEcg, Sex, StSlope},
    error::ApiException,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Offline tools for the heart failure predictor")]
struct Cli {
    #[arg(long, default_value = "models/finalmodel.json")]
    model: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score one patient the way the submit button does.
    Predict(PatientArgs),
    /// Validate the model artifact and print what it scores on.
    Inspect,
}

#[derive(Args, Debug)]
struct PatientArgs {
    #[arg(long)]
    age: Option<f64>,
    /// M or F
    #[arg(long)]
    sex: Option<Sex>,
    /// TA, ATA, NAP or ASY
    #[arg(long)]
    chest_pain: Option<ChestPainType>,
    #[arg(long)]
    bp: Option<f64>,
    #[arg(long)]
    cholesterol: Option<f64>,
    /// 1 if fasting blood sugar is above 120 mg/dl, else 0
    #[arg(long)]
    blood_sugar: Option<FastingBs>,
    /// Normal, ST or LVH
    #[arg(long)]
    resting_ecg: Option<RestingEcg>,
    #[arg(long)]
    max_hr: Option<f64>,
    /// Y or N
    #[arg(long)]
    exercise_angina: Option<ExerciseAngina>,
    #[arg(long)]
    oldpeak: Option<f64>,
    /// Up, Flat or Down
    #[arg(long)]
    st_slope: Option<StSlope>,
}

impl PatientArgs {
    /// Feeds every flag through the form widgets, in form order.
    fn into_record(self) -> PatientRecord {
        let mut form = FormState::new();
        for update in [
            FieldUpdate::Age(self.age),
            FieldUpdate::Sex(self.sex),
            FieldUpdate::ChestPainType(self.chest_pain),
            FieldUpdate::RestingBp(self.bp),
            FieldUpdate::Cholesterol(self.cholesterol),
            FieldUpdate::FastingBs(self.blood_sugar),
            FieldUpdate::RestingEcg(self.resting_ecg),
            FieldUpdate::MaxHr(self.max_hr),
            FieldUpdate::ExerciseAngina(self.exercise_angina),
            FieldUpdate::Oldpeak(self.oldpeak),
            FieldUpdate::StSlope(self.st_slope),
        ] {
            form.apply(update);
        }
        form.record()
    }
}

/// The record a submit would send, refused while any field is missing.
fn submittable_record(args: PatientArgs) -> Result<PatientRecord> {
    let record = args.into_record();
    let missing = record.missing_fields();
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|f| f.column()).collect();
        bail!(
            "missing or refused fields: {} (check the values are within the form's limits)",
            names.join(", ")
        );
    }
    Ok(record)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let model = LinearModel::load(&cli.model)
        .with_context(|| format!("loading model artifact '{}'", cli.model.display()))?;

    match cli.command {
        Command::Inspect => {
            println!("{}", model.summary());
        }
        Command::Predict(args) => {
            let record = submittable_record(args)?;
            let ctx = ApiContext::new(Arc::new(model));
            match evaluate(&ctx, 1, Some(&record)).map_err(ApiException::from)? {
                Evaluation::Rendered(risk) => println!("{}", risk.message()),
                Evaluation::NoUpdate | Evaluation::Empty => bail!("no prediction was made"),
            }
        }
    }

    Ok(())
}
