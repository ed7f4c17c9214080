//! Record normalizer (component B): builds the canonical `Encounter`
//! view from a loosely-typed input row.
//!
//! This is the one place that probes alternate field names (`DX1` vs
//! `Pdx`, `DRG` vs `MS-DRG`, `Sdx*`/`POA_Sdx*` vs `DX*`/`POA*`).
//! Everything downstream of `Encounter::from_row` works against the
//! normalized fields only.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;

use super::diagnosis::{Diagnosis, DxPosition, Poa, normalize_code};
use super::procedure::{Procedure, normalize_time_str};

const MAX_SECONDARY_DX: u32 = 29;
const MAX_PROCEDURES: u32 = 20;

/// Canonical, immutable view of one inpatient encounter.
#[derive(Debug, Clone)]
pub struct Encounter {
    pub encounter_id: String,
    pub age: Option<i32>,
    pub sex_present: bool,
    pub discharge_quarter_present: bool,
    pub discharge_year_present: bool,
    pub admission_type: Option<i32>,
    pub mdc: Option<i32>,
    pub drg: Option<i32>,
    pub ms_drg_text: Option<String>,
    pub admit_date: Option<NaiveDate>,
    pub discharge_date: Option<NaiveDate>,
    pub length_of_stay: Option<f64>,
    pub diagnoses: Vec<Diagnosis>,
    pub procedures: Vec<Procedure>,
}

impl Encounter {
    /// Build a canonical encounter from one input row. `index` is the
    /// row's position in the batch, used for the `Row_<index>` id
    /// fallback.
    #[must_use]
    pub fn from_row(row: &HashMap<String, Value>, index: usize) -> Self {
        let encounter_id = field_str(row, "EncounterID")
            .or_else(|| field_str(row, "Encounter_ID"))
            .unwrap_or_else(|| format!("Row_{index}"));

        let drg = field_i32(row, "DRG").or_else(|| field_i32(row, "MS-DRG"));
        let ms_drg_text = field_str(row, "MS-DRG").map(|s| normalize_code(&s));

        let admit_date = field_str(row, "admission_date")
            .or_else(|| field_str(row, "Admission_Date"))
            .and_then(|s| parse_date_permissive(&s));
        let discharge_date = field_str(row, "discharge_date")
            .or_else(|| field_str(row, "Discharge_Date"))
            .and_then(|s| parse_date_permissive(&s));
        let length_of_stay =
            field_f64(row, "length_of_stay").or_else(|| field_f64(row, "Length_of_stay"));

        Self {
            encounter_id,
            age: field_i32(row, "AGE").or_else(|| field_i32(row, "Age")),
            sex_present: field_present(row, "SEX"),
            discharge_quarter_present: field_present(row, "DQTR"),
            discharge_year_present: field_present(row, "YEAR"),
            admission_type: field_i32(row, "ATYPE"),
            mdc: field_i32(row, "MDC"),
            drg,
            ms_drg_text,
            admit_date,
            discharge_date,
            length_of_stay,
            diagnoses: extract_diagnoses(row),
            procedures: extract_procedures(row),
        }
    }

    /// The principal diagnosis code, if any (`DX1` or `Pdx`).
    #[must_use]
    pub fn principal_dx_code(&self) -> Option<&str> {
        self.diagnoses
            .iter()
            .find(|dx| dx.position == DxPosition::Principal)
            .map(|dx| dx.code.as_str())
    }

    /// True when every required field (`SEX`, `AGE`, `DQTR`, `YEAR`,
    /// principal diagnosis) is present.
    #[must_use]
    pub fn has_required_fields(&self) -> bool {
        self.sex_present
            && self.age.is_some()
            && self.discharge_quarter_present
            && self.discharge_year_present
            && self.principal_dx_code().is_some()
    }
}

fn extract_diagnoses(row: &HashMap<String, Value>) -> Vec<Diagnosis> {
    let mut diagnoses = Vec::new();

    let principal_raw = field_str(row, "DX1").or_else(|| field_str(row, "Pdx"));
    if let Some(raw) = principal_raw {
        let poa = Poa::from(field_str(row, "POA1").as_deref());
        diagnoses.push(Diagnosis::new(normalize_code(&raw), poa, DxPosition::Principal, 1));
    }

    for i in 1..=MAX_SECONDARY_DX {
        let position = i + 1;
        let standard = field_str(row, &format!("DX{position}"));
        let (raw, poa_raw) = if let Some(code) = standard {
            (Some(code), field_str(row, &format!("POA{position}")))
        } else {
            (
                field_str(row, &format!("Sdx{i}")),
                field_str(row, &format!("POA_Sdx{i}")),
            )
        };

        if let Some(code) = raw {
            let poa = Poa::from(poa_raw.as_deref());
            diagnoses.push(Diagnosis::new(
                normalize_code(&code),
                poa,
                DxPosition::Secondary,
                position,
            ));
        }
    }

    diagnoses
}

fn extract_procedures(row: &HashMap<String, Value>) -> Vec<Procedure> {
    let mut procedures = Vec::new();

    for i in 1..=MAX_PROCEDURES {
        let Some(code) = field_str(row, &format!("Proc{i}")) else {
            continue;
        };
        let date_str = field_str(row, &format!("Proc{i}_Date"));
        let time_str = field_str(row, &format!("Proc{i}_Time"));
        let datetime = date_str.and_then(|d| combine_date_time(&d, time_str.as_deref()));
        procedures.push(Procedure::new(normalize_code(&code), datetime, i));
    }

    procedures
}

fn combine_date_time(date_str: &str, time_str: Option<&str>) -> Option<NaiveDateTime> {
    let date = parse_date_permissive(date_str)?;
    let time = time_str
        .and_then(normalize_time_str)
        .and_then(|t| NaiveTime::parse_from_str(&t, "%H:%M:%S").ok())
        .unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).expect("midnight is valid"));
    Some(NaiveDateTime::new(date, time))
}

/// Parse a date permissively across the common input encodings,
/// returning `None` rather than propagating a parse error.
fn parse_date_permissive(raw: &str) -> Option<NaiveDate> {
    const FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            // Accept a date+time string, taking the date portion only.
            trimmed.split_whitespace().next().and_then(|d| {
                FORMATS.iter().find_map(|fmt| NaiveDate::parse_from_str(d, fmt).ok())
            })
        })
}

fn field_str(row: &HashMap<String, Value>, key: &str) -> Option<String> {
    let value = row.get(key)?;
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    let trimmed = text.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

fn field_present(row: &HashMap<String, Value>, key: &str) -> bool {
    field_str(row, key).is_some()
}

fn field_i32(row: &HashMap<String, Value>, key: &str) -> Option<i32> {
    match row.get(key) {
        Some(Value::Number(n)) => n.as_i64().map(|v| v as i32),
        _ => field_str(row, key).and_then(|s| s.parse::<f64>().ok()).map(|v| v as i32),
    }
}

fn field_f64(row: &HashMap<String, Value>, key: &str) -> Option<f64> {
    match row.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        _ => field_str(row, key).and_then(|s| s.parse::<f64>().ok()),
    }
}
