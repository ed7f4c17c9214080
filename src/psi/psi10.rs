//! PSI-10: Postoperative Acute Kidney Injury Requiring Dialysis Rate.
//!
//! Population: elective surgical discharges (`SURGI2R`, admission type
//! elective) with at least one OR procedure, age 18-89 (the upper
//! bound enforced upstream by the common gate's required-field and MDC
//! checks is not re-validated here). Exclusions: pre-existing kidney
//! disease requiring dialysis (`PHYSIDB`); dialysis (`DIALYIP`/
//! `DIALY2P`) performed on or before the first OR procedure; cardiac
//! arrest/shock; chronic renal failure; urinary tract obstruction; or
//! a solitary kidney present on admission paired with a partial
//! nephrectomy. Numerator: a secondary acute kidney injury diagnosis
//! not present on admission, with a `DIALYIP` dialysis procedure
//! (specifically, not `DIALY2P` access) performed strictly after the
//! first OR procedure.

use crate::codesets::CodeSetRegistry;
use crate::config::EngineConfig;
use crate::gate::common_gate;
use crate::model::{DxPosition, Encounter, Poa};
use crate::predicate::{first_proc_date, has_dx, has_proc, on_or_before};

use super::{ms_drg_in, PsiName, PsiResult, PsiStatus};

const ELECTIVE_ADMISSION_TYPE: i32 = 3;

pub fn evaluate(enc: &Encounter, registry: &CodeSetRegistry, config: &EngineConfig) -> PsiResult {
    let mut rationale = Vec::new();

    if let Some(exclusion) = common_gate(enc, registry) {
        rationale.push(exclusion.rationale);
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let elective_surgical = ms_drg_in(enc, registry, &["SURGI2R_CODES"])
        && enc.admission_type == Some(ELECTIVE_ADMISSION_TYPE)
        && has_proc(&enc.procedures, registry.get("ORPROC_CODES"));
    if !elective_surgical {
        rationale.push("Population Exclusion: not an elective surgical discharge with an OR procedure".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let pre_existing_renal_disease = has_dx(&enc.diagnoses, registry.get("PHYSIDB_CODES"), Some(DxPosition::Principal), None)
        || has_dx(&enc.diagnoses, registry.get("PHYSIDB_CODES"), None, Some(Poa::Y));
    if pre_existing_renal_disease {
        rationale.push("Population Exclusion: pre-existing renal disease requiring dialysis".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let first_or = first_proc_date(&enc.procedures, registry.get("ORPROC_CODES"));
    let first_dialyip = first_proc_date(&enc.procedures, registry.get("DIALYIP_CODES"));
    let first_dialysis_any = [first_dialyip, first_proc_date(&enc.procedures, registry.get("DIALY2P_CODES"))]
        .into_iter()
        .flatten()
        .min();

    if config.validate_timing {
        if let (Some(or_dt), Some(dialysis_dt)) = (first_or, first_dialysis_any) {
            if on_or_before(dialysis_dt, or_dt) {
                rationale
                    .push("Population Exclusion: dialysis performed at or before the first OR procedure".to_string());
                return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
            }
        }
    }

    let cardiac_arrest_or_shock = has_dx(&enc.diagnoses, registry.get("CARDIID_CODES"), Some(DxPosition::Principal), None)
        || has_dx(&enc.diagnoses, registry.get("CARDIID_CODES"), None, Some(Poa::Y))
        || has_dx(&enc.diagnoses, registry.get("CARDRID_CODES"), Some(DxPosition::Principal), None)
        || has_dx(&enc.diagnoses, registry.get("CARDRID_CODES"), None, Some(Poa::Y))
        || has_dx(&enc.diagnoses, registry.get("SHOCKID_CODES"), Some(DxPosition::Principal), None)
        || has_dx(&enc.diagnoses, registry.get("SHOCKID_CODES"), None, Some(Poa::Y));
    if cardiac_arrest_or_shock {
        rationale.push("Population Exclusion: cardiac arrest, cardiac rhythm disturbance, or shock present on admission".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let chronic_renal_failure = has_dx(&enc.diagnoses, registry.get("CRENLFD_CODES"), Some(DxPosition::Principal), None)
        || has_dx(&enc.diagnoses, registry.get("CRENLFD_CODES"), None, Some(Poa::Y));
    if chronic_renal_failure {
        rationale.push("Population Exclusion: chronic renal failure present on admission".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    if has_dx(&enc.diagnoses, registry.get("URINARYOBSID_CODES"), Some(DxPosition::Principal), None) {
        rationale.push("Population Exclusion: principal diagnosis of urinary tract obstruction".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let solitary_kidney_with_nephrectomy = has_dx(&enc.diagnoses, registry.get("SOLKIDD_CODES"), None, Some(Poa::Y))
        && has_proc(&enc.procedures, registry.get("PNEPHREP_CODES"));
    if solitary_kidney_with_nephrectomy {
        rationale.push("Population Exclusion: solitary kidney present on admission with partial nephrectomy".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let dx_hit = has_dx(&enc.diagnoses, registry.get("PHYSIDB_CODES"), Some(DxPosition::Secondary), Some(Poa::N));
    let dialysis_performed = first_dialyip.is_some();

    let timing_satisfied = if config.validate_timing {
        match (first_or, first_dialyip) {
            (Some(or_dt), Some(dialysis_dt)) => !on_or_before(dialysis_dt, or_dt),
            _ => dialysis_performed,
        }
    } else {
        dialysis_performed
    };

    if dx_hit && dialysis_performed && timing_satisfied {
        rationale.push(
            "Numerator: postoperative acute kidney injury with dialysis after the first OR procedure".to_string(),
        );
        finish(enc, PsiStatus::Inclusion, rationale, registry, config)
    } else {
        rationale.push("Denominator: no qualifying postoperative dialysis-requiring kidney injury".to_string());
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
    let mut result = PsiResult::new(enc.encounter_id.clone(), PsiName::Psi10, status, rationale);
    result.attach_debug_manifest(registry, config);
    result
}
