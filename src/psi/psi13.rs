//! PSI-13: Postoperative Sepsis Rate.
//!
//! Population: elective surgical discharges (`SURGI2R`) age 18+ with
//! at least one OR procedure. Exclusions: a principal or
//! present-on-admission sepsis diagnosis; a principal or
//! present-on-admission infection diagnosis; the index OR procedure
//! occurring 10 or more calendar days after admission. Numerator: a
//! secondary sepsis diagnosis not present on admission. Every result
//! carries an immune-compromise risk category for reporting, whether
//! or not the encounter is included.

use crate::codesets::CodeSetRegistry;
use crate::config::EngineConfig;
use crate::gate::common_gate;
use crate::model::{DxPosition, Encounter, Poa};
use crate::predicate::{first_proc_date, has_dx, has_proc};
use crate::risk::classify_immune_compromise;

use super::{ms_drg_in, PsiName, PsiResult, PsiStatus};

const ELECTIVE_ADMISSION_TYPE: i32 = 3;
const LATE_INDEX_PROC_DAYS: i64 = 10;

pub fn evaluate(enc: &Encounter, registry: &CodeSetRegistry, config: &EngineConfig) -> PsiResult {
    let mut rationale = Vec::new();

    if let Some(exclusion) = common_gate(enc, registry) {
        rationale.push(exclusion.rationale);
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let population = enc.age.is_some_and(|a| a >= 18)
        && enc.admission_type == Some(ELECTIVE_ADMISSION_TYPE)
        && ms_drg_in(enc, registry, &["SURGI2R_CODES"])
        && has_proc(&enc.procedures, registry.get("ORPROC_CODES"));
    if !population {
        rationale.push("Population Exclusion: not an elective surgical discharge age 18+ with an OR procedure".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let sepsis_at_admission = has_dx(&enc.diagnoses, registry.get("SEPTI2D_CODES"), Some(DxPosition::Principal), None)
        || has_dx(&enc.diagnoses, registry.get("SEPTI2D_CODES"), Some(DxPosition::Secondary), Some(Poa::Y));
    if sepsis_at_admission {
        rationale.push("Population Exclusion: sepsis present on admission".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let infection_at_admission = has_dx(&enc.diagnoses, registry.get("INFECID_CODES"), Some(DxPosition::Principal), None)
        || has_dx(&enc.diagnoses, registry.get("INFECID_CODES"), Some(DxPosition::Secondary), Some(Poa::Y));
    if infection_at_admission {
        rationale.push("Population Exclusion: infection present on admission".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    if config.validate_timing {
        if let (Some(admit), Some(or_dt)) = (enc.admit_date, first_proc_date(&enc.procedures, registry.get("ORPROC_CODES"))) {
            if (or_dt.date() - admit).num_days() >= LATE_INDEX_PROC_DAYS {
                rationale.push(
                    "Population Exclusion: index OR procedure occurred 10 or more days after admission".to_string(),
                );
                return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
            }
        }
    }

    let numerator = has_dx(&enc.diagnoses, registry.get("SEPTI2D_CODES"), Some(DxPosition::Secondary), Some(Poa::N));

    if numerator {
        rationale.push("Numerator: sepsis coded as not present on admission".to_string());
        finish(enc, PsiStatus::Inclusion, rationale, registry, config)
    } else {
        rationale.push("Denominator: no qualifying postoperative sepsis diagnosis".to_string());
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
    let mut result = PsiResult::new(enc.encounter_id.clone(), PsiName::Psi13, status, rationale);
    let category = classify_immune_compromise(enc, registry);
    result.details.insert("risk_category".to_string(), serde_json::Value::from(category.as_str()));
    result.attach_debug_manifest(registry, config);
    result
}
