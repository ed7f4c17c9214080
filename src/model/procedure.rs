//! Procedure entries within a normalized encounter.

use chrono::NaiveDateTime;

/// A single coded procedure with its optional timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Procedure {
    /// ICD-10-PCS code, uppercased and period-stripped.
    pub code: String,
    /// Combined date+time, midnight if only a date was given, `None`
    /// if parsing failed or no date was present.
    pub datetime: Option<NaiveDateTime>,
    /// 1-based index of this procedure within the encounter's Proc list.
    pub sequence: u32,
}

impl Procedure {
    #[must_use]
    pub const fn new(code: String, datetime: Option<NaiveDateTime>, sequence: u32) -> Self {
        Self { code, datetime, sequence }
    }
}

/// Parse a procedure time field into `HH:MM:SS`, accepting the three
/// encodings named in the input schema: `HH:MM:SS`, `HHMMSS`, `HHMM`.
#[must_use]
pub fn normalize_time_str(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.contains(':') {
        return Some(trimmed.to_string());
    }
    match trimmed.len() {
        6 => Some(format!("{}:{}:{}", &trimmed[0..2], &trimmed[2..4], &trimmed[4..6])),
        4 => Some(format!("{}:{}:00", &trimmed[0..2], &trimmed[2..4])),
        _ => None,
    }
}
