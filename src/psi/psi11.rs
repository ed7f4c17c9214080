//! PSI-11: Postoperative Respiratory Failure Rate.
//!
//! Population: elective surgical discharges (`SURGI2R`) age 18+ with
//! at least one OR procedure, outside MDC 4. Exclusions: acute
//! respiratory failure (`ACURF3D`) present at admission; malignant
//! hyperthermia, a neuromuscular disorder present on admission, or a
//! degenerative neurological disorder present on admission; craniotomy
//! or other neurosurgery, lung/pleural surgery, or lung transplant;
//! pre-existing ventilatory support; a present-on-admission
//! tracheostomy diagnosis, a tracheostomy procedure coded strictly
//! before the index OR procedure (a pre-existing airway, not a
//! complication), or a tracheostomy that is itself the only OR
//! procedure coded. Numerator: any of — a secondary acute respiratory
//! failure diagnosis (`ACURF2D`) not present on admission; reintubation
//! on or after index+1 day; prolonged mechanical ventilation on or
//! after index+2 days; or a tracheostomy on or after index+1 day.

use crate::codesets::CodeSetRegistry;
use crate::config::EngineConfig;
use crate::gate::common_gate;
use crate::model::{DxPosition, Encounter, Poa};
use crate::predicate::{before, count_proc, first_proc_date, has_dx, has_proc};

use super::{ms_drg_in, PsiName, PsiResult, PsiStatus};

const ELECTIVE_ADMISSION_TYPE: i32 = 3;

pub fn evaluate(enc: &Encounter, registry: &CodeSetRegistry, config: &EngineConfig) -> PsiResult {
    let mut rationale = Vec::new();

    if let Some(exclusion) = common_gate(enc, registry) {
        rationale.push(exclusion.rationale);
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let elective_surgical = enc.age.is_some_and(|a| a >= 18)
        && enc.admission_type == Some(ELECTIVE_ADMISSION_TYPE)
        && ms_drg_in(enc, registry, &["SURGI2R_CODES"])
        && has_proc(&enc.procedures, registry.get("ORPROC_CODES"));
    if !elective_surgical {
        rationale.push("Population Exclusion: not an elective surgical discharge age 18+ with an OR procedure".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    if enc.mdc == Some(4) {
        rationale.push("Population Exclusion: principal diagnosis in MDC 4 (diseases of the respiratory system)".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let resp_failure_at_admission = has_dx(&enc.diagnoses, registry.get("ACURF3D_CODES"), Some(DxPosition::Principal), None)
        || has_dx(&enc.diagnoses, registry.get("ACURF3D_CODES"), None, Some(Poa::Y));
    if resp_failure_at_admission {
        rationale.push("Population Exclusion: acute respiratory failure present on admission".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    if has_dx(&enc.diagnoses, registry.get("MALHYPD_CODES"), None, None) {
        rationale.push("Population Exclusion: malignant hyperthermia diagnosis present".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    if has_dx(&enc.diagnoses, registry.get("NEUROMD_CODES"), None, Some(Poa::Y)) {
        rationale.push("Population Exclusion: neuromuscular disorder present on admission".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    if has_dx(&enc.diagnoses, registry.get("DGNEUID_CODES"), None, Some(Poa::Y)) {
        rationale.push("Population Exclusion: degenerative neurological disorder present on admission".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    if has_proc(&enc.procedures, registry.get("NUCRANP_CODES")) {
        rationale.push("Population Exclusion: craniotomy or other neurosurgical procedure performed".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let lung_surgery =
        has_proc(&enc.procedures, registry.get("LUNGCIP_CODES")) || has_proc(&enc.procedures, registry.get("LUNGTRANSP_CODES"));
    if lung_surgery {
        rationale.push("Population Exclusion: lung/pleural surgery or lung transplant procedure performed".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    if has_proc(&enc.procedures, registry.get("PRESOPP_CODES")) {
        rationale.push("Population Exclusion: ventilatory support present prior to the index procedure".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let lone_tracheostomy_procedure =
        count_proc(&enc.procedures, registry.get("ORPROC_CODES")) == 1 && has_proc(&enc.procedures, registry.get("TRACHIP_CODES"));
    if lone_tracheostomy_procedure {
        rationale.push("Population Exclusion: the only OR procedure coded is itself the tracheostomy procedure".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let first_or = first_proc_date(&enc.procedures, registry.get("ORPROC_CODES"));

    let preexisting_trach = has_dx(&enc.diagnoses, registry.get("TRACHID_CODES"), None, Some(Poa::Y)) || {
        if config.validate_timing {
            match (first_or, first_proc_date(&enc.procedures, registry.get("TRACHIP_CODES"))) {
                (Some(or_dt), Some(trach_dt)) => before(trach_dt, or_dt),
                _ => false,
            }
        } else {
            false
        }
    };
    if preexisting_trach {
        rationale.push("Population Exclusion: tracheostomy diagnosis present on admission or pre-index tracheostomy procedure present".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let new_resp_failure = has_dx(&enc.diagnoses, registry.get("ACURF2D_CODES"), Some(DxPosition::Secondary), Some(Poa::N));

    let reintubation = proc_on_or_after_offset(enc, registry, "PR9604P_CODES", first_or, 1, config.validate_timing);
    let prolonged_ventilation = ["PR9671P_CODES", "PR9672P_CODES"]
        .iter()
        .any(|name| proc_on_or_after_offset(enc, registry, name, first_or, 2, config.validate_timing));
    let new_tracheostomy = proc_on_or_after_offset(enc, registry, "TRACHIP_CODES", first_or, 1, config.validate_timing);

    let numerator = new_resp_failure || reintubation || prolonged_ventilation || new_tracheostomy;

    if numerator {
        rationale.push("Numerator: postoperative respiratory failure criterion met".to_string());
        finish(enc, PsiStatus::Inclusion, rationale, registry, config)
    } else {
        rationale.push("Denominator: no qualifying postoperative respiratory failure criterion met".to_string());
        finish(enc, PsiStatus::DenominatorOnly, rationale, registry, config)
    }
}

/// True if a procedure in `set_name` occurred at least `offset_days`
/// after `first_or` (calendar-day granularity). When timing validation
/// is off, or either date is missing, falls back to mere presence of
/// the procedure.
fn proc_on_or_after_offset(
    enc: &Encounter,
    registry: &CodeSetRegistry,
    set_name: &str,
    first_or: Option<chrono::NaiveDateTime>,
    offset_days: i64,
    validate_timing: bool,
) -> bool {
    let present = has_proc(&enc.procedures, registry.get(set_name));
    if !validate_timing {
        return present;
    }
    match (first_or, first_proc_date(&enc.procedures, registry.get(set_name))) {
        (Some(or_dt), Some(proc_dt)) => crate::predicate::day_offset(or_dt, proc_dt) >= offset_days,
        _ => present,
    }
}

fn finish(
    enc: &Encounter,
    status: PsiStatus,
    rationale: Vec<String>,
    registry: &CodeSetRegistry,
    config: &EngineConfig,
) -> PsiResult {
    let mut result = PsiResult::new(enc.encounter_id.clone(), PsiName::Psi11, status, rationale);
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
            HashMap::from([("(ACURF3D)".to_string(), json!("J96.00"))]),
            HashMap::from([("(ACURF2D)".to_string(), json!("J96.01"))]),
            HashMap::from([("(NEUROMD)".to_string(), json!("G70.00"))]),
            HashMap::from([("(TRACHIP)".to_string(), json!("0B110F4"))]),
            HashMap::from([("(PR9671P)".to_string(), json!("5A1945Z"))]),
        ])
    }

    fn base_row() -> HashMap<String, serde_json::Value> {
        let mut row = HashMap::new();
        row.insert("SEX".to_string(), json!("M"));
        row.insert("AGE".to_string(), json!(60));
        row.insert("DQTR".to_string(), json!(1));
        row.insert("YEAR".to_string(), json!(2024));
        row.insert("MS-DRG".to_string(), json!("470"));
        row.insert("ATYPE".to_string(), json!(3));
        row.insert("DX1".to_string(), json!("K35.80"));
        row.insert("Proc1".to_string(), json!("0DTJ4ZZ"));
        row.insert("Proc1_Date".to_string(), json!("2024-01-01"));
        row
    }

    #[test]
    fn new_respiratory_failure_dx_is_inclusion() {
        let mut row = base_row();
        row.insert("DX2".to_string(), json!("J96.01"));
        row.insert("POA2".to_string(), json!("N"));
        let enc = Encounter::from_row(&row, 0);
        let config = EngineConfig::default();
        let result = evaluate(&enc, &registry(), &config);
        assert!(result.is_inclusion());
    }

    #[test]
    fn acurf3d_at_admission_on_secondary_dx_is_not_excluded() {
        let mut row = base_row();
        row.insert("DX2".to_string(), json!("J96.00"));
        row.insert("POA2".to_string(), json!("N"));
        let enc = Encounter::from_row(&row, 0);
        let config = EngineConfig::default();
        let result = evaluate(&enc, &registry(), &config);
        assert!(!result.is_exclusion());
    }

    #[test]
    fn mdc_4_is_excluded() {
        let mut row = base_row();
        row.insert("MDC".to_string(), json!(4));
        let enc = Encounter::from_row(&row, 0);
        let config = EngineConfig::default();
        let result = evaluate(&enc, &registry(), &config);
        assert!(result.is_exclusion());
    }

    #[test]
    fn neuromuscular_disorder_not_present_on_admission_does_not_exclude() {
        let mut row = base_row();
        row.insert("DX2".to_string(), json!("G70.00"));
        row.insert("POA2".to_string(), json!("N"));
        let enc = Encounter::from_row(&row, 0);
        let config = EngineConfig::default();
        let result = evaluate(&enc, &registry(), &config);
        assert!(!result.is_exclusion());
    }

    #[test]
    fn lone_tracheostomy_procedure_is_excluded() {
        let registry = CodeSetRegistry::from_rows(&[
            HashMap::from([("(SURGI2R)".to_string(), json!("470"))]),
            HashMap::from([("(ORPROC)".to_string(), json!("0B110F4"))]),
            HashMap::from([("(TRACHIP)".to_string(), json!("0B110F4"))]),
        ]);
        let mut row = base_row();
        row.insert("Proc1".to_string(), json!("0B110F4"));
        row.insert("Proc1_Date".to_string(), json!("2024-01-01"));
        let enc = Encounter::from_row(&row, 0);
        let config = EngineConfig::default();
        let result = evaluate(&enc, &registry, &config);
        assert!(result.is_exclusion());
    }

    #[test]
    fn tracheostomy_procedure_before_index_is_excluded() {
        let mut row = base_row();
        row.insert("Proc1".to_string(), json!("0B110F4"));
        row.insert("Proc1_Date".to_string(), json!("2023-12-30"));
        row.insert("Proc2".to_string(), json!("0DTJ4ZZ"));
        row.insert("Proc2_Date".to_string(), json!("2024-01-01"));
        row.insert("Proc3".to_string(), json!("0DTJ4ZZ"));
        row.insert("Proc3_Date".to_string(), json!("2024-01-05"));
        let enc = Encounter::from_row(&row, 0);
        let config = EngineConfig::default();
        let result = evaluate(&enc, &registry(), &config);
        assert!(result.is_exclusion());
    }

    #[test]
    fn prolonged_ventilation_after_two_days_is_inclusion() {
        let mut row = base_row();
        row.insert("Proc2".to_string(), json!("5A1945Z"));
        row.insert("Proc2_Date".to_string(), json!("2024-01-03"));
        let enc = Encounter::from_row(&row, 0);
        let config = EngineConfig::default();
        let result = evaluate(&enc, &registry(), &config);
        assert!(result.is_inclusion());
    }

    #[test]
    fn ventilation_on_the_index_day_is_not_postoperative() {
        let mut row = base_row();
        row.insert("Proc2".to_string(), json!("5A1945Z"));
        row.insert("Proc2_Date".to_string(), json!("2024-01-01"));
        let enc = Encounter::from_row(&row, 0);
        let config = EngineConfig::default();
        let result = evaluate(&enc, &registry(), &config);
        assert!(matches!(result.status, PsiStatus::DenominatorOnly));
    }
}
