//! Diagnosis entries within a normalized encounter.

/// Present-on-admission indicator for a diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Poa {
    Y,
    N,
    U,
    W,
    /// Any other value, or absent.
    Unknown,
}

impl From<Option<&str>> for Poa {
    fn from(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("Y") => Self::Y,
            Some("N") => Self::N,
            Some("U") => Self::U,
            Some("W") => Self::W,
            _ => Self::Unknown,
        }
    }
}

/// Principal vs. secondary position of a diagnosis in the encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DxPosition {
    Principal,
    Secondary,
}

/// A single coded diagnosis with its POA and position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnosis {
    /// ICD-10-CM code, uppercased and period-stripped.
    pub code: String,
    pub poa: Poa,
    pub position: DxPosition,
    /// 1-based index of this diagnosis within the encounter's DX list.
    pub sequence: u32,
}

impl Diagnosis {
    #[must_use]
    pub const fn new(code: String, poa: Poa, position: DxPosition, sequence: u32) -> Self {
        Self { code, poa, position, sequence }
    }
}

/// Uppercase a raw code and strip periods, per the registry/diagnosis
/// normalization rule shared across the engine.
#[must_use]
pub fn normalize_code(raw: &str) -> String {
    raw.trim().replace('.', "").to_uppercase()
}
