//! PSI-12: Perioperative Pulmonary Embolism or DVT Rate.
//!
//! Population: surgical discharges (`SURGI2R`) age 18+ with at least
//! one OR procedure. Exclusions: a principal or present-on-admission
//! DVT/PE diagnosis; a secondary heparin-induced thrombocytopenia
//! diagnosis; a present-on-admission neurologic trauma diagnosis; any
//! ECMO procedure; a vena cava interruption or thrombectomy/endarterectomy
//! procedure performed on or before the index OR procedure; every OR
//! procedure coded being itself one of those treatment procedures; or
//! the index OR procedure occurring 10 or more calendar days after
//! admission. Numerator: a secondary DVT or PE diagnosis not present
//! on admission.

use crate::codesets::CodeSetRegistry;
use crate::config::EngineConfig;
use crate::gate::common_gate;
use crate::model::{DxPosition, Encounter, Poa};
use crate::predicate::{first_proc_date, has_dx, has_proc, on_or_before};

use super::{ms_drg_in, PsiName, PsiResult, PsiStatus};

const LATE_INDEX_PROC_DAYS: i64 = 10;

pub fn evaluate(enc: &Encounter, registry: &CodeSetRegistry, config: &EngineConfig) -> PsiResult {
    let mut rationale = Vec::new();

    if let Some(exclusion) = common_gate(enc, registry) {
        rationale.push(exclusion.rationale);
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let population = enc.age.is_some_and(|a| a >= 18)
        && ms_drg_in(enc, registry, &["SURGI2R_CODES"])
        && has_proc(&enc.procedures, registry.get("ORPROC_CODES"));
    if !population {
        rationale.push("Population Exclusion: not a surgical discharge age 18+ with an OR procedure".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let dvt_pe_at_admission = has_dx(&enc.diagnoses, registry.get("DEEPVIB_CODES"), Some(DxPosition::Principal), None)
        || has_dx(&enc.diagnoses, registry.get("PULMOID_CODES"), Some(DxPosition::Principal), None)
        || has_dx(&enc.diagnoses, registry.get("DEEPVIB_CODES"), Some(DxPosition::Secondary), Some(Poa::Y))
        || has_dx(&enc.diagnoses, registry.get("PULMOID_CODES"), Some(DxPosition::Secondary), Some(Poa::Y));
    if dvt_pe_at_admission {
        rationale.push("Population Exclusion: DVT/PE present on admission".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    if has_dx(&enc.diagnoses, registry.get("HITD_CODES"), Some(DxPosition::Secondary), None) {
        rationale.push("Population Exclusion: heparin-induced thrombocytopenia diagnosis present".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    if has_dx(&enc.diagnoses, registry.get("NEURTRAD_CODES"), None, Some(Poa::Y)) {
        rationale.push("Population Exclusion: neurologic trauma diagnosis present on admission".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    if has_proc(&enc.procedures, registry.get("ECMOP_CODES")) {
        rationale.push("Population Exclusion: ECMO procedure performed".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let first_or = first_proc_date(&enc.procedures, registry.get("ORPROC_CODES"));

    if config.validate_timing {
        if let (Some(or_dt), Some(vena_dt)) = (first_or, first_proc_date(&enc.procedures, registry.get("VENACIP_CODES"))) {
            if on_or_before(vena_dt, or_dt) {
                rationale.push(
                    "Population Exclusion: vena cava interruption performed at or before the index OR procedure".to_string(),
                );
                return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
            }
        }
        if let (Some(or_dt), Some(thromb_dt)) = (first_or, first_proc_date(&enc.procedures, registry.get("THROMP_CODES"))) {
            if on_or_before(thromb_dt, or_dt) {
                rationale.push(
                    "Population Exclusion: thrombectomy/endarterectomy performed at or before the index OR procedure"
                        .to_string(),
                );
                return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
            }
        }
    }

    let treatment_only_proc = enc
        .procedures
        .iter()
        .filter(|p| registry.get("ORPROC_CODES").contains(&p.code))
        .all(|p| registry.get("VENACIP_CODES").contains(&p.code) || registry.get("THROMP_CODES").contains(&p.code));
    if treatment_only_proc {
        rationale.push("Population Exclusion: every OR procedure coded is itself a DVT/PE treatment procedure".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    if config.validate_timing {
        if let (Some(admit), Some(or_dt)) = (enc.admit_date, first_or) {
            if (or_dt.date() - admit).num_days() >= LATE_INDEX_PROC_DAYS {
                rationale.push(
                    "Population Exclusion: index OR procedure occurred 10 or more days after admission".to_string(),
                );
                return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
            }
        }
    }

    let numerator = has_dx(&enc.diagnoses, registry.get("DEEPVIB_CODES"), Some(DxPosition::Secondary), Some(Poa::N))
        || has_dx(&enc.diagnoses, registry.get("PULMOID_CODES"), Some(DxPosition::Secondary), Some(Poa::N));

    if numerator {
        rationale.push("Numerator: DVT or PE coded as not present on admission".to_string());
        finish(enc, PsiStatus::Inclusion, rationale, registry, config)
    } else {
        rationale.push("Denominator: no qualifying perioperative DVT/PE diagnosis".to_string());
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
    let mut result = PsiResult::new(enc.encounter_id.clone(), PsiName::Psi12, status, rationale);
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
            HashMap::from([("(DEEPVIB)".to_string(), json!("I82.40"))]),
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
        row.insert("admission_date".to_string(), json!("2024-01-01"));
        row.insert("Proc1".to_string(), json!("0DTJ4ZZ"));
        row.insert("Proc1_Date".to_string(), json!("2024-01-05"));
        row
    }

    #[test]
    fn new_dvt_diagnosis_is_inclusion() {
        let mut row = base_row();
        row.insert("DX2".to_string(), json!("I82.40"));
        row.insert("POA2".to_string(), json!("N"));
        let enc = Encounter::from_row(&row, 0);
        let config = EngineConfig::default();
        let result = evaluate(&enc, &registry(), &config);
        assert!(result.is_inclusion());
    }

    #[test]
    fn late_index_procedure_excludes_regardless_of_diagnosis() {
        let mut row = base_row();
        row.insert("Proc1_Date".to_string(), json!("2024-01-11"));
        row.insert("DX2".to_string(), json!("I82.40"));
        row.insert("POA2".to_string(), json!("N"));
        let enc = Encounter::from_row(&row, 0);
        let config = EngineConfig::default();
        let result = evaluate(&enc, &registry(), &config);
        assert!(result.is_exclusion());
    }
}
