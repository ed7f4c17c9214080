//! Common denominator gate (component D): checks shared by every
//! indicator, applied before any per-PSI logic runs.

use crate::codesets::CodeSetRegistry;
use crate::model::{DxPosition, Encounter, Poa};
use crate::predicate::has_dx;

/// Reason the common gate rejected an encounter, carrying its
/// human-readable rationale line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateExclusion {
    pub rationale: String,
}

impl GateExclusion {
    fn new(rationale: impl Into<String>) -> Self {
        Self { rationale: rationale.into() }
    }
}

/// Evaluate the common gate. Returns `Some` with the first triggered
/// exclusion reason, in the fixed order specified for every PSI:
/// ungroupable DRG, missing required fields, MDC 14, MDC 15, age < 18.
#[must_use]
pub fn common_gate(enc: &Encounter, registry: &CodeSetRegistry) -> Option<GateExclusion> {
    if enc.drg == Some(999) {
        return Some(GateExclusion::new("Data Quality: Ungroupable DRG (999)"));
    }

    if !enc.has_required_fields() {
        return Some(GateExclusion::new(
            "Data Quality: Missing required fields (SEX, AGE, DQTR, YEAR, or principal diagnosis)",
        ));
    }

    if let Some(principal) = enc.principal_dx_code() {
        let mdc14 = registry.get("MDC14PRINDX_CODES");
        if mdc14.contains(principal) {
            return Some(GateExclusion::new(
                "Population Exclusion: Principal diagnosis in MDC 14 (Obstetric)",
            ));
        }
        let mdc15 = registry.get("MDC15PRINDX_CODES");
        if mdc15.contains(principal) {
            return Some(GateExclusion::new(
                "Population Exclusion: Principal diagnosis in MDC 15 (Neonatal)",
            ));
        }
    }

    if let Some(age) = enc.age {
        if age < 18 {
            return Some(GateExclusion::new(format!("Age Exclusion: Patient age {age} < 18 years")));
        }
    }

    None
}

/// Convenience: is the principal diagnosis in MDC 14 (obstetric)? Used
/// by PSI-05/07 population tests which carve out obstetric cases at
/// any age (see the documented age-18 divergence in `DESIGN.md`).
#[must_use]
pub fn is_obstetric_principal(enc: &Encounter, registry: &CodeSetRegistry) -> bool {
    has_dx(
        &enc.diagnoses,
        registry.get("MDC14PRINDX_CODES"),
        Some(DxPosition::Principal),
        None::<Poa>,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn registry_with_mdc14(code: &str) -> CodeSetRegistry {
        CodeSetRegistry::from_rows(&[HashMap::from([(
            "(MDC14PRINDX)".to_string(),
            serde_json::Value::String(code.to_string()),
        )])])
    }

    #[test]
    fn ungroupable_drg_short_circuits() {
        let mut row = HashMap::new();
        row.insert("SEX".to_string(), serde_json::json!("F"));
        row.insert("AGE".to_string(), serde_json::json!(40));
        row.insert("DQTR".to_string(), serde_json::json!(1));
        row.insert("YEAR".to_string(), serde_json::json!(2024));
        row.insert("DX1".to_string(), serde_json::json!("I10"));
        row.insert("DRG".to_string(), serde_json::json!(999));
        let enc = Encounter::from_row(&row, 0);
        let registry = CodeSetRegistry::default();
        let exclusion = common_gate(&enc, &registry).unwrap();
        assert!(exclusion.rationale.contains("Ungroupable"));
    }

    #[test]
    fn mdc14_principal_excludes() {
        let mut row = HashMap::new();
        row.insert("SEX".to_string(), serde_json::json!("F"));
        row.insert("AGE".to_string(), serde_json::json!(16));
        row.insert("DQTR".to_string(), serde_json::json!(1));
        row.insert("YEAR".to_string(), serde_json::json!(2024));
        row.insert("DX1".to_string(), serde_json::json!("O80"));
        let enc = Encounter::from_row(&row, 0);
        let registry = registry_with_mdc14("O80");
        let exclusion = common_gate(&enc, &registry).unwrap();
        assert!(exclusion.rationale.contains("MDC 14"));
    }
}
