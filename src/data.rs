//! Patient records and the interactive console collector

use ndarray::Array2;
use std::io::{BufRead, Write};
use tracing::debug;

/// Number of features per patient (blood pressure, blood sugar)
pub const N_FEATURES: usize = 2;

const NEW_PATIENT_BANNER: &str = "Enter new patient data:";
const BLOOD_PRESSURE_PROMPT: &str = "Blood pressure (mmHg): ";
const BLOOD_SUGAR_PROMPT: &str = "Blood sugar (mg/dL): ";
const CONTINUE_PROMPT: &str = "Add another patient? (yes/no): ";
const INVALID_INPUT_MESSAGE: &str = "Invalid input! Please enter numeric values.";

/// A single patient's vitals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatientRecord {
    /// Blood pressure in mmHg
    pub blood_pressure: f64,
    /// Blood sugar in mg/dL
    pub blood_sugar: f64,
}

impl PatientRecord {
    pub fn new(blood_pressure: f64, blood_sugar: f64) -> Self {
        Self {
            blood_pressure,
            blood_sugar,
        }
    }

    pub fn features(&self) -> [f64; N_FEATURES] {
        [self.blood_pressure, self.blood_sugar]
    }
}

impl From<[f64; N_FEATURES]> for PatientRecord {
    fn from([blood_pressure, blood_sugar]: [f64; N_FEATURES]) -> Self {
        Self::new(blood_pressure, blood_sugar)
    }
}

/// Ordered collection of patient records gathered during one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientSet {
    records: Vec<PatientRecord>,
}

impl PatientSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: PatientRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[PatientRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &PatientRecord> {
        self.records.iter()
    }

    /// Raw (unnormalized) feature matrix of shape (n_patients, 2)
    pub fn to_features(&self) -> Array2<f64> {
        let mut features = Array2::zeros((self.records.len(), N_FEATURES));
        for (mut row, record) in features.outer_iter_mut().zip(self.records.iter()) {
            row[0] = record.blood_pressure;
            row[1] = record.blood_sugar;
        }
        features
    }
}

impl<R: Into<PatientRecord>> FromIterator<R> for PatientSet {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Interactively collect patient records until the operator stops.
///
/// Each record asks for blood pressure then blood sugar. Anything that is not
/// a finite number prints an error and restarts the current record; records
/// already accepted are kept. After every accepted record the operator is
/// asked whether to continue, and only `yes`/`y` does. End of input stops the
/// loop and drops a half-entered record.
///
/// # Arguments
/// * `input` - Source of operator answers (stdin in the binary)
/// * `output` - Destination for prompts and messages (stdout in the binary)
///
/// # Returns
/// * The collected `PatientSet`, which may be empty
pub fn collect_patients<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
) -> crate::Result<PatientSet> {
    let mut patients = PatientSet::new();

    loop {
        writeln!(output, "{}", NEW_PATIENT_BANNER)?;

        let Some(answer) = prompt(&mut input, &mut output, BLOOD_PRESSURE_PROMPT)? else {
            break;
        };
        let Some(blood_pressure) = parse_measurement(&answer) else {
            writeln!(output, "{}", INVALID_INPUT_MESSAGE)?;
            continue;
        };

        let Some(answer) = prompt(&mut input, &mut output, BLOOD_SUGAR_PROMPT)? else {
            break;
        };
        let Some(blood_sugar) = parse_measurement(&answer) else {
            writeln!(output, "{}", INVALID_INPUT_MESSAGE)?;
            continue;
        };

        patients.push(PatientRecord::new(blood_pressure, blood_sugar));
        debug!(
            blood_pressure,
            blood_sugar,
            total = patients.len(),
            "patient record accepted"
        );

        let Some(answer) = prompt(&mut input, &mut output, CONTINUE_PROMPT)? else {
            break;
        };
        if !is_affirmative(&answer) {
            break;
        }
    }

    Ok(patients)
}

/// Write a prompt and read one line; `None` on end of input
fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    message: &str,
) -> crate::Result<Option<String>> {
    write!(output, "{}", message)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

fn parse_measurement(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "yes" | "y")
}
