//! PSI-05: Retained Surgical Item or Unretrieved Device Fragment Rate.
//!
//! Population: surgical or medical discharges age 18+ (`SURGI2R` /
//! `MEDIC2R`), or an obstetric principal diagnosis (`MDC14PRINDX`) at
//! any age. In practice the obstetric branch never fires: the common
//! gate (component D) already excludes every MDC 14 principal
//! diagnosis before indicator logic runs, regardless of age. This is
//! a documented divergence from AHRQ intent, preserved as found — see
//! `DESIGN.md`.
//! Exclusions: a principal or present-on-admission retained item.
//! Numerator: a secondary retained-item diagnosis not present on
//! admission.

use crate::codesets::CodeSetRegistry;
use crate::config::EngineConfig;
use crate::gate::{common_gate, is_obstetric_principal};
use crate::model::{DxPosition, Encounter, Poa};
use crate::predicate::{has_dx, matching_dx};

use super::{ms_drg_in, PsiName, PsiResult, PsiStatus};

pub fn evaluate(enc: &Encounter, registry: &CodeSetRegistry, config: &EngineConfig) -> PsiResult {
    let mut rationale = Vec::new();

    if let Some(exclusion) = common_gate(enc, registry) {
        rationale.push(exclusion.rationale);
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config, &[]);
    }

    let surgical_or_medical =
        enc.age.is_some_and(|a| a >= 18) && ms_drg_in(enc, registry, &["SURGI2R_CODES", "MEDIC2R_CODES"]);
    let obstetric = is_obstetric_principal(enc, registry);
    if !(surgical_or_medical || obstetric) {
        rationale.push(
            "Population Exclusion: not a surgical/medical discharge age 18+, nor an obstetric case".to_string(),
        );
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config, &[]);
    }

    if has_dx(&enc.diagnoses, registry.get("FOREIID_CODES"), Some(DxPosition::Principal), None) {
        rationale.push("Population Exclusion: principal diagnosis of retained surgical item".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config, &[]);
    }

    if has_dx(&enc.diagnoses, registry.get("FOREIID_CODES"), Some(DxPosition::Secondary), Some(Poa::Y)) {
        rationale.push("Population Exclusion: retained surgical item present on admission".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config, &[]);
    }

    let matches = matching_dx(&enc.diagnoses, registry.get("FOREIID_CODES"), Some(DxPosition::Secondary), Some(Poa::N));

    if !matches.is_empty() {
        rationale.push("Numerator: retained surgical item coded as not present on admission".to_string());
        let codes: Vec<&str> = matches.iter().map(|dx| dx.code.as_str()).collect();
        finish(enc, PsiStatus::Inclusion, rationale, registry, config, &codes)
    } else {
        rationale.push("Denominator: no qualifying retained surgical item diagnosis".to_string());
        finish(enc, PsiStatus::DenominatorOnly, rationale, registry, config, &[])
    }
}

fn finish(
    enc: &Encounter,
    status: PsiStatus,
    rationale: Vec<String>,
    registry: &CodeSetRegistry,
    config: &EngineConfig,
    matched_codes: &[&str],
) -> PsiResult {
    let mut result = PsiResult::new(enc.encounter_id.clone(), PsiName::Psi05, status, rationale);
    if !matched_codes.is_empty() {
        result.details.insert(
            "retained_surgical_item_matches".to_string(),
            serde_json::Value::from(matched_codes.iter().map(|c| serde_json::Value::from(*c)).collect::<Vec<_>>()),
        );
    }
    result.attach_debug_manifest(registry, config);
    result
}
