//! PSI-14: Postoperative Wound Dehiscence Rate.
//!
//! Population: age 18+ with an abdominopelvic surgery, either open
//! (`ABDOMIPOPEN`) or non-open (`ABDOMIPOTHER`). Exclusions: a
//! principal or present-on-admission abdominal wall disruption
//! diagnosis; length of stay under 2 days; a wound reclosure procedure
//! performed on or before either the open or the non-open index
//! abdominopelvic procedure date, checked independently regardless of
//! which one determines the reporting stratum. Numerator: a wound reclosure
//! procedure together with an abdominal wall disruption diagnosis not
//! present on admission. Stratified by whether the index procedure was
//! open or non-open.

use crate::codesets::CodeSetRegistry;
use crate::config::EngineConfig;
use crate::gate::common_gate;
use crate::model::{DxPosition, Encounter, Poa};
use crate::predicate::{first_proc_date, has_dx, has_proc, last_proc_date, on_or_before};

use super::{PsiName, PsiResult, PsiStatus, WoundStratum};

const MIN_LOS_DAYS: f64 = 2.0;

pub fn evaluate(enc: &Encounter, registry: &CodeSetRegistry, config: &EngineConfig) -> PsiResult {
    let mut rationale = Vec::new();

    if let Some(exclusion) = common_gate(enc, registry) {
        rationale.push(exclusion.rationale);
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config, None);
    }

    let has_open = has_proc(&enc.procedures, registry.get("ABDOMIPOPEN_CODES"));
    let has_other = has_proc(&enc.procedures, registry.get("ABDOMIPOTHER_CODES"));
    let population = enc.age.is_some_and(|a| a >= 18) && (has_open || has_other);
    if !population {
        rationale.push("Population Exclusion: no abdominopelvic surgery (open or non-open) age 18+".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config, None);
    }

    let stratum = if has_open { WoundStratum::Open } else { WoundStratum::Other };

    let abwall_at_admission = has_dx(&enc.diagnoses, registry.get("ABWALLCD_CODES"), Some(DxPosition::Principal), None)
        || has_dx(&enc.diagnoses, registry.get("ABWALLCD_CODES"), Some(DxPosition::Secondary), Some(Poa::Y));
    if abwall_at_admission {
        rationale.push("Population Exclusion: abdominal wall disruption present on admission".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config, Some(stratum));
    }

    if enc.length_of_stay.is_some_and(|los| los < MIN_LOS_DAYS) {
        rationale.push("Population Exclusion: length of stay under 2 days".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config, Some(stratum));
    }

    if config.validate_timing {
        let reclosure_dt = last_proc_date(&enc.procedures, registry.get("RECLOIP_CODES"));
        let index_dates = [
            first_proc_date(&enc.procedures, registry.get("ABDOMIPOPEN_CODES")),
            first_proc_date(&enc.procedures, registry.get("ABDOMIPOTHER_CODES")),
        ];
        for index_dt in index_dates.into_iter().flatten() {
            if let Some(reclosure_dt) = reclosure_dt {
                if on_or_before(reclosure_dt, index_dt) {
                    rationale.push(
                        "Population Exclusion: wound reclosure procedure performed at or before the index procedure".to_string(),
                    );
                    return finish(enc, PsiStatus::Exclusion, rationale, registry, config, Some(stratum));
                }
            }
        }
    }

    let reclosure = has_proc(&enc.procedures, registry.get("RECLOIP_CODES"));
    let new_abwall = has_dx(&enc.diagnoses, registry.get("ABWALLCD_CODES"), Some(DxPosition::Secondary), Some(Poa::N));

    if reclosure && new_abwall {
        rationale.push("Numerator: wound reclosure with abdominal wall disruption not present on admission".to_string());
        finish(enc, PsiStatus::Inclusion, rationale, registry, config, Some(stratum))
    } else {
        rationale.push("Denominator: no qualifying wound dehiscence".to_string());
        finish(enc, PsiStatus::DenominatorOnly, rationale, registry, config, Some(stratum))
    }
}

fn finish(
    enc: &Encounter,
    status: PsiStatus,
    rationale: Vec<String>,
    registry: &CodeSetRegistry,
    config: &EngineConfig,
    stratum: Option<WoundStratum>,
) -> PsiResult {
    let mut result = PsiResult::new(enc.encounter_id.clone(), PsiName::Psi14, status, rationale);
    if let Some(s) = stratum {
        let label = match s {
            WoundStratum::Open => "open_approach",
            WoundStratum::Other => "non_open_approach",
        };
        result.details.insert("stratum".to_string(), serde_json::Value::from(label));
    }
    result.attach_debug_manifest(registry, config);
    result
}
