//! PSI-09: Perioperative Hemorrhage or Hematoma Rate.
//!
//! Population: surgical discharges (`SURGI2R`) with at least one OR
//! procedure. Exclusions: a principal or present-on-admission
//! hemorrhage/hematoma diagnosis; a coagulation disorder diagnosis; a
//! principal or present-on-admission bleeding-control-procedure
//! complication diagnosis (`MEDBLEEDD`); a hemorrhage-control
//! procedure (`HEMOTH2P`) performed before the first OR procedure, or
//! given as the only other procedure alongside exactly one OR
//! procedure; or a thrombolytic medication administered on or before
//! that control procedure. Numerator: a secondary hemorrhage or
//! hematoma diagnosis not present on admission, together with a
//! control procedure performed strictly after the first OR procedure.

use crate::codesets::CodeSetRegistry;
use crate::config::EngineConfig;
use crate::gate::common_gate;
use crate::model::{DxPosition, Encounter, Poa};
use crate::predicate::{before, count_proc, first_proc_date, has_dx, has_proc, on_or_before};

use super::{ms_drg_in, PsiName, PsiResult, PsiStatus};

pub fn evaluate(enc: &Encounter, registry: &CodeSetRegistry, config: &EngineConfig) -> PsiResult {
    let mut rationale = Vec::new();

    if let Some(exclusion) = common_gate(enc, registry) {
        rationale.push(exclusion.rationale);
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let surgical = ms_drg_in(enc, registry, &["SURGI2R_CODES"]) && has_proc(&enc.procedures, registry.get("ORPROC_CODES"));
    if !surgical {
        rationale.push("Population Exclusion: not a surgical discharge with an OR procedure".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let hemorrhage_at_admission = has_dx(&enc.diagnoses, registry.get("POHMRI2D_CODES"), Some(DxPosition::Principal), None)
        || has_dx(&enc.diagnoses, registry.get("POHMRI2D_CODES"), Some(DxPosition::Secondary), Some(Poa::Y));
    if hemorrhage_at_admission {
        rationale.push("Population Exclusion: hemorrhage/hematoma present on admission".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    if has_dx(&enc.diagnoses, registry.get("COAGDID_CODES"), None, None) {
        rationale.push("Population Exclusion: coagulation disorder diagnosis present".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let medbleed_excludes = has_dx(&enc.diagnoses, registry.get("MEDBLEEDD_CODES"), Some(DxPosition::Principal), None)
        || has_dx(&enc.diagnoses, registry.get("MEDBLEEDD_CODES"), Some(DxPosition::Secondary), Some(Poa::Y));
    if medbleed_excludes {
        rationale.push("Population Exclusion: medication-induced bleeding diagnosis present on admission".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let first_or = first_proc_date(&enc.procedures, registry.get("ORPROC_CODES"));
    let first_control = first_proc_date(&enc.procedures, registry.get("HEMOTH2P_CODES"));

    if config.validate_timing {
        if let (Some(or_dt), Some(control_dt)) = (first_or, first_control) {
            if before(control_dt, or_dt) {
                rationale.push(
                    "Population Exclusion: hemorrhage control procedure performed before the first OR procedure"
                        .to_string(),
                );
                return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
            }
        }
    }

    let lone_control_procedure =
        count_proc(&enc.procedures, registry.get("ORPROC_CODES")) == 1 && has_proc(&enc.procedures, registry.get("HEMOTH2P_CODES"));
    if lone_control_procedure {
        rationale.push(
            "Population Exclusion: the only OR procedure coded is itself the hemorrhage control procedure".to_string(),
        );
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    if config.validate_timing {
        if let (Some(control_dt), Some(thrombolytic_dt)) =
            (first_control, first_proc_date(&enc.procedures, registry.get("THROMBOLYTICP_CODES")))
        {
            if on_or_before(thrombolytic_dt, control_dt) {
                rationale.push(
                    "Population Exclusion: thrombolytic medication administered at or before the control procedure".to_string(),
                );
                return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
            }
        }
    }

    let dx_hit = has_dx(&enc.diagnoses, registry.get("POHMRI2D_CODES"), Some(DxPosition::Secondary), Some(Poa::N));
    let control_performed = has_proc(&enc.procedures, registry.get("HEMOTH2P_CODES"));
    let timing_satisfied = if config.validate_timing {
        match (first_or, first_control) {
            (Some(or_dt), Some(control_dt)) => !on_or_before(control_dt, or_dt),
            _ => control_performed,
        }
    } else {
        control_performed
    };

    if dx_hit && control_performed && timing_satisfied {
        rationale.push(
            "Numerator: hemorrhage/hematoma coded as not present on admission with a control procedure after the first OR procedure"
                .to_string(),
        );
        finish(enc, PsiStatus::Inclusion, rationale, registry, config)
    } else {
        rationale.push("Denominator: no qualifying hemorrhage/hematoma with control procedure".to_string());
        finish(enc, PsiStatus::DenominatorOnly, rationale, registry, config)
    }
}

fn finish(
    enc: &Encounter,
    status: PsiStatus,
    rationale: Vec<String>,
    registry: &CodeSetRegistry,
    config: &EngineConfig,
) -> PsiResult {
    let mut result = PsiResult::new(enc.encounter_id.clone(), PsiName::Psi09, status, rationale);
    result.attach_debug_manifest(registry, config);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn registry() -> CodeSetRegistry {
        CodeSetRegistry::from_rows(&[
            HashMap::from([("(SURGI2R)".to_string(), json!("470"))]),
            HashMap::from([("(ORPROC)".to_string(), json!("0DTJ4ZZ"))]),
            HashMap::from([("(POHMRI2D)".to_string(), json!("K91.840"))]),
            HashMap::from([("(HEMOTH2P)".to_string(), json!("0W9G30Z"))]),
        ])
    }

    fn base_row() -> HashMap<String, serde_json::Value> {
        let mut row = HashMap::new();
        row.insert("SEX".to_string(), json!("M"));
        row.insert("AGE".to_string(), json!(60));
        row.insert("DQTR".to_string(), json!(1));
        row.insert("YEAR".to_string(), json!(2024));
        row.insert("MS-DRG".to_string(), json!("470"));
        row.insert("DX1".to_string(), json!("K35.80"));
        row
    }

    #[test]
    fn control_before_or_is_excluded() {
        let mut row = base_row();
        row.insert("DX2".to_string(), json!("K91.840"));
        row.insert("POA2".to_string(), json!("N"));
        row.insert("Proc1".to_string(), json!("0W9G30Z"));
        row.insert("Proc1_Date".to_string(), json!("2024-01-01"));
        row.insert("Proc2".to_string(), json!("0DTJ4ZZ"));
        row.insert("Proc2_Date".to_string(), json!("2024-01-02"));
        let enc = Encounter::from_row(&row, 0);
        let config = EngineConfig::default();
        let result = evaluate(&enc, &registry(), &config);
        assert!(result.is_exclusion());
    }

    #[test]
    fn control_after_or_with_dx_is_inclusion() {
        let mut row = base_row();
        row.insert("DX2".to_string(), json!("K91.840"));
        row.insert("POA2".to_string(), json!("N"));
        row.insert("Proc1".to_string(), json!("0DTJ4ZZ"));
        row.insert("Proc1_Date".to_string(), json!("2024-01-01"));
        row.insert("Proc2".to_string(), json!("0W9G30Z"));
        row.insert("Proc2_Date".to_string(), json!("2024-01-03"));
        let enc = Encounter::from_row(&row, 0);
        let config = EngineConfig::default();
        let result = evaluate(&enc, &registry(), &config);
        assert!(result.is_inclusion());
    }

    #[test]
    fn hemorrhage_present_on_admission_excludes() {
        let mut row = base_row();
        row.insert("DX2".to_string(), json!("K91.840"));
        row.insert("POA2".to_string(), json!("Y"));
        row.insert("Proc1".to_string(), json!("0DTJ4ZZ"));
        row.insert("Proc1_Date".to_string(), json!("2024-01-01"));
        let enc = Encounter::from_row(&row, 0);
        let config = EngineConfig::default();
        let result = evaluate(&enc, &registry(), &config);
        assert!(result.is_exclusion());
    }

    #[test]
    fn lone_control_procedure_with_single_or_proc_is_excluded() {
        let registry = CodeSetRegistry::from_rows(&[
            HashMap::from([("(SURGI2R)".to_string(), json!("470"))]),
            HashMap::from([("(ORPROC)".to_string(), json!("0W9G30Z"))]),
            HashMap::from([("(POHMRI2D)".to_string(), json!("K91.840"))]),
            HashMap::from([("(HEMOTH2P)".to_string(), json!("0W9G30Z"))]),
        ]);
        let mut row = base_row();
        row.insert("DX2".to_string(), json!("K91.840"));
        row.insert("POA2".to_string(), json!("N"));
        row.insert("Proc1".to_string(), json!("0W9G30Z"));
        row.insert("Proc1_Date".to_string(), json!("2024-01-01"));
        let enc = Encounter::from_row(&row, 0);
        let config = EngineConfig::default();
        let result = evaluate(&enc, &registry, &config);
        assert!(result.is_exclusion());
    }
}
