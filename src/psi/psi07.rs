//! PSI-07: Central Venous Catheter-Related Bloodstream Infection Rate.
//!
//! Population: surgical or medical discharges age 18+, or an obstetric
//! principal diagnosis at any age (see `psi05` for why that branch
//! never actually fires), with a length of stay of at least two days.
//! Exclusions: a bloodstream infection present on admission, any
//! cancer diagnosis, or an immunocompromised state (diagnosis or
//! procedure). Numerator: a secondary bloodstream infection diagnosis
//! not present on admission.

use crate::codesets::CodeSetRegistry;
use crate::config::EngineConfig;
use crate::gate::{common_gate, is_obstetric_principal};
use crate::model::{DxPosition, Encounter, Poa};
use crate::predicate::{has_dx, has_proc};

use super::{ms_drg_in, PsiName, PsiResult, PsiStatus};

const MIN_LENGTH_OF_STAY_DAYS: f64 = 2.0;

pub fn evaluate(enc: &Encounter, registry: &CodeSetRegistry, config: &EngineConfig) -> PsiResult {
    let mut rationale = Vec::new();

    if let Some(exclusion) = common_gate(enc, registry) {
        rationale.push(exclusion.rationale);
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let surgical_or_medical =
        enc.age.is_some_and(|a| a >= 18) && ms_drg_in(enc, registry, &["SURGI2R_CODES", "MEDIC2R_CODES"]);
    let obstetric = is_obstetric_principal(enc, registry);
    if !(surgical_or_medical || obstetric) {
        rationale.push(
            "Population Exclusion: not a surgical/medical discharge age 18+, nor an obstetric case".to_string(),
        );
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let short_stay = enc.length_of_stay.is_some_and(|los| los < MIN_LENGTH_OF_STAY_DAYS);
    if short_stay {
        rationale.push("Population Exclusion: length of stay under 2 days".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let infection_on_admission = has_dx(&enc.diagnoses, registry.get("IDTMC3D_CODES"), None, Some(Poa::Y));
    if infection_on_admission {
        rationale.push("Population Exclusion: bloodstream infection present on admission".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    if has_dx(&enc.diagnoses, registry.get("CANCEID_CODES"), None, None) {
        rationale.push("Population Exclusion: cancer diagnosis present".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let immunocompromised = has_dx(&enc.diagnoses, registry.get("IMMUNID_CODES"), None, None)
        || has_proc(&enc.procedures, registry.get("IMMUNIP_CODES"));
    if immunocompromised {
        rationale.push("Population Exclusion: immunocompromised state diagnosis or procedure present".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let numerator = has_dx(
        &enc.diagnoses,
        registry.get("IDTMC3D_CODES"),
        Some(DxPosition::Secondary),
        Some(Poa::N),
    );

    if numerator {
        rationale.push("Numerator: catheter-related bloodstream infection coded as not present on admission".to_string());
        finish(enc, PsiStatus::Inclusion, rationale, registry, config)
    } else {
        rationale.push("Denominator: no qualifying bloodstream infection diagnosis".to_string());
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
    let mut result = PsiResult::new(enc.encounter_id.clone(), PsiName::Psi07, status, rationale);
    result.attach_debug_manifest(registry, config);
    result
}
