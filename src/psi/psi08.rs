//! PSI-08: In-Hospital Fall with Hip Fracture Rate.
//!
//! Population: medical and surgical discharges. Exclusions:
//! principal diagnosis of fracture, any fracture present on
//! admission, or a principal/secondary diagnosis of a pathological or
//! other peri-prosthetic fracture (`PROSFXID`). Numerator: a secondary
//! hip fracture diagnosis not present on admission takes priority over
//! any other fracture site when both are coded (`FractureStratum`).

use crate::codesets::CodeSetRegistry;
use crate::config::EngineConfig;
use crate::gate::common_gate;
use crate::model::{DxPosition, Encounter, Poa};
use crate::predicate::has_dx;

use super::{ms_drg_in, FractureStratum, PsiName, PsiResult, PsiStatus};

pub fn evaluate(enc: &Encounter, registry: &CodeSetRegistry, config: &EngineConfig) -> PsiResult {
    let mut rationale = Vec::new();

    if let Some(exclusion) = common_gate(enc, registry) {
        rationale.push(exclusion.rationale);
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config, None);
    }

    if !ms_drg_in(enc, registry, &["SURGI2R_CODES", "MEDIC2R_CODES"]) {
        rationale.push("Population Exclusion: not a surgical/medical discharge".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config, None);
    }

    let principal_fracture = has_dx(&enc.diagnoses, registry.get("FXID_CODES"), Some(DxPosition::Principal), None)
        || has_dx(&enc.diagnoses, registry.get("HIPFXID_CODES"), Some(DxPosition::Principal), None);
    if principal_fracture {
        rationale.push("Population Exclusion: principal diagnosis is a fracture".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config, None);
    }

    let fracture_poa = has_dx(&enc.diagnoses, registry.get("FXID_CODES"), None, Some(Poa::Y))
        || has_dx(&enc.diagnoses, registry.get("HIPFXID_CODES"), None, Some(Poa::Y));
    if fracture_poa {
        rationale.push("Population Exclusion: a fracture was present on admission".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config, None);
    }

    if has_dx(&enc.diagnoses, registry.get("PROSFXID_CODES"), None, None) {
        rationale.push("Population Exclusion: pathological or peri-prosthetic fracture diagnosis present".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config, None);
    }

    let hip_fracture = has_dx(
        &enc.diagnoses,
        registry.get("HIPFXID_CODES"),
        Some(DxPosition::Secondary),
        Some(Poa::N),
    );
    let other_fracture = has_dx(
        &enc.diagnoses,
        registry.get("FXID_CODES"),
        Some(DxPosition::Secondary),
        Some(Poa::N),
    );

    if hip_fracture {
        rationale.push("Numerator: hip fracture coded as not present on admission".to_string());
        finish(enc, PsiStatus::Inclusion, rationale, registry, config, Some(FractureStratum::Hip))
    } else if other_fracture {
        rationale.push("Denominator: non-hip fracture coded, does not trigger the indicator".to_string());
        finish(enc, PsiStatus::DenominatorOnly, rationale, registry, config, Some(FractureStratum::Other))
    } else {
        rationale.push("Denominator: no in-hospital fracture diagnosis".to_string());
        finish(enc, PsiStatus::DenominatorOnly, rationale, registry, config, None)
    }
}

fn finish(
    enc: &Encounter,
    status: PsiStatus,
    rationale: Vec<String>,
    registry: &CodeSetRegistry,
    config: &EngineConfig,
    stratum: Option<FractureStratum>,
) -> PsiResult {
    let mut result = PsiResult::new(enc.encounter_id.clone(), PsiName::Psi08, status, rationale);
    if let Some(s) = stratum {
        let label = match s {
            FractureStratum::Hip => "hip",
            FractureStratum::Other => "other",
        };
        result.details.insert("fracture_stratum".to_string(), serde_json::Value::from(label));
    }
    result.attach_debug_manifest(registry, config);
    result
}
