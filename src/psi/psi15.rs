//! PSI-15: Abdominopelvic Accidental Puncture or Laceration Rate.
//!
//! Population: age 18+, surgical or medical discharge (`SURGI2R` /
//! `MEDIC2R`), with at least one abdominopelvic index procedure
//! (`ABDOMI15P`). The index date is the earliest such procedure;
//! missing it is itself an exclusion. A principal diagnosis in any
//! organ's injury code set excludes the whole encounter. Each of the
//! six organ systems (spleen, adrenal gland, vessel, diaphragm,
//! gastrointestinal tract, genitourinary tract) is then scored
//! independently: a secondary injury diagnosis not present on
//! admission, paired with a same-organ evaluation/treatment procedure
//! in the 1-to-30-day window after the index date, qualifies that
//! organ — unless the injury was itself present on admission and a
//! matching procedure exists, which blocks that organ alone. The
//! encounter is a numerator case if any organ qualifies.

use chrono::NaiveDateTime;

use crate::codesets::CodeSetRegistry;
use crate::config::EngineConfig;
use crate::gate::common_gate;
use crate::model::{Diagnosis, DxPosition, Encounter, Poa};
use crate::predicate::{has_dx, has_proc};
use crate::risk::classify_procedure_complexity;

use super::{ms_drg_in, OrganSystem, PsiName, PsiResult, PsiStatus};

const MIN_WINDOW_DAYS: i64 = 1;
const MAX_WINDOW_DAYS: i64 = 30;

pub fn evaluate(enc: &Encounter, registry: &CodeSetRegistry, config: &EngineConfig) -> PsiResult {
    let mut rationale = Vec::new();

    if let Some(exclusion) = common_gate(enc, registry) {
        rationale.push(exclusion.rationale);
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config, None, &[]);
    }

    let population = enc.age.is_some_and(|a| a >= 18)
        && ms_drg_in(enc, registry, &["SURGI2R_CODES", "MEDIC2R_CODES"])
        && has_proc(&enc.procedures, registry.get("ABDOMI15P_CODES"));
    if !population {
        rationale.push("Population Exclusion: not a surgical/medical discharge age 18+ with an abdominopelvic procedure".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config, None, &[]);
    }

    let Some(index_date) = crate::predicate::first_proc_date(&enc.procedures, registry.get("ABDOMI15P_CODES")) else {
        rationale.push("Population Exclusion: missing index abdominopelvic procedure date".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config, None, &[]);
    };

    let all_injury_codes = registry.union(&OrganSystem::all().iter().map(|o| o.injury_code_set_name()).collect::<Vec<_>>());
    if has_dx(&enc.diagnoses, &all_injury_codes, Some(DxPosition::Principal), None) {
        rationale.push("Population Exclusion: principal diagnosis is an abdominopelvic injury".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config, Some(index_date), &[]);
    }

    let mut qualifying = Vec::new();
    for organ in OrganSystem::all() {
        if organ_qualifies(enc, registry, *organ, index_date) {
            qualifying.push(*organ);
        }
    }

    if qualifying.is_empty() {
        rationale.push("Denominator: no organ system qualifies for accidental puncture/laceration".to_string());
        finish(enc, PsiStatus::DenominatorOnly, rationale, registry, config, Some(index_date), &qualifying)
    } else {
        rationale.push(format!(
            "Numerator: qualifying organ system(s): {}",
            qualifying.iter().map(|o| o.to_string()).collect::<Vec<_>>().join(", ")
        ));
        finish(enc, PsiStatus::Inclusion, rationale, registry, config, Some(index_date), &qualifying)
    }
}

/// Whether `organ` qualifies: a secondary, not-present-on-admission
/// injury diagnosis together with an organ procedure in the
/// index+1..index+30 day window, unless the injury was present on
/// admission alongside a matching procedure (per-organ POA block).
fn organ_qualifies(enc: &Encounter, registry: &CodeSetRegistry, organ: OrganSystem, index_date: NaiveDateTime) -> bool {
    let injury_codes = registry.get(organ.injury_code_set_name());
    let proc_codes = registry.get(organ.procedure_code_set_name());

    let injury_hits: Vec<&Diagnosis> = enc
        .diagnoses
        .iter()
        .filter(|dx| dx.position == DxPosition::Secondary && dx.poa == Poa::N && injury_codes.contains(&dx.code))
        .collect();

    let proc_hits_nonempty = enc.procedures.iter().any(|p| {
        proc_codes.contains(&p.code)
            && p.datetime.is_some_and(|dt| {
                let offset = (dt.date() - index_date.date()).num_days();
                (MIN_WINDOW_DAYS..=MAX_WINDOW_DAYS).contains(&offset)
            })
    });

    let poa_injury_with_proc =
        has_dx(&enc.diagnoses, injury_codes, Some(DxPosition::Secondary), Some(Poa::Y)) && proc_hits_nonempty;

    !injury_hits.is_empty() && proc_hits_nonempty && !poa_injury_with_proc
}

fn finish(
    enc: &Encounter,
    status: PsiStatus,
    rationale: Vec<String>,
    registry: &CodeSetRegistry,
    config: &EngineConfig,
    index_date: Option<NaiveDateTime>,
    qualifying_organs: &[OrganSystem],
) -> PsiResult {
    let mut result = PsiResult::new(enc.encounter_id.clone(), PsiName::Psi15, status, rationale);
    if !qualifying_organs.is_empty() {
        let names: Vec<serde_json::Value> = qualifying_organs.iter().map(|o| serde_json::Value::from(o.to_string())).collect();
        result.details.insert("qualifying_organs".to_string(), serde_json::Value::Array(names));
    }
    if let Some(index) = index_date {
        let complexity = classify_procedure_complexity(enc, index);
        result.details.insert("risk_category".to_string(), serde_json::Value::from(complexity.as_str()));
    }
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
            HashMap::from([("(MEDIC2R)".to_string(), json!("872"))]),
            HashMap::from([("(ABDOMI15P)".to_string(), json!("0DTJ4ZZ"))]),
            HashMap::from([("(SPLEEN15D)".to_string(), json!("S36.030A"))]),
            HashMap::from([("(SPLEEN15P)".to_string(), json!("07TP0ZZ"))]),
        ])
    }

    fn base_row() -> HashMap<String, serde_json::Value> {
        let mut row = HashMap::new();
        row.insert("SEX".to_string(), json!("F"));
        row.insert("AGE".to_string(), json!(55));
        row.insert("DQTR".to_string(), json!(1));
        row.insert("YEAR".to_string(), json!(2024));
        row.insert("MS-DRG".to_string(), json!("872"));
        row.insert("DX1".to_string(), json!("K35.80"));
        row.insert("Proc1".to_string(), json!("0DTJ4ZZ"));
        row.insert("Proc1_Date".to_string(), json!("2024-05-01"));
        row
    }

    #[test]
    fn spleen_injury_with_matching_procedure_in_window_qualifies() {
        let mut row = base_row();
        row.insert("DX2".to_string(), json!("S36.030A"));
        row.insert("POA2".to_string(), json!("N"));
        row.insert("Proc2".to_string(), json!("07TP0ZZ"));
        row.insert("Proc2_Date".to_string(), json!("2024-05-10"));
        let enc = Encounter::from_row(&row, 0);
        let config = EngineConfig::default();
        let result = evaluate(&enc, &registry(), &config);
        assert!(result.is_inclusion());
        let organs = result.details.get("qualifying_organs").unwrap().as_array().unwrap();
        assert_eq!(organs, &[serde_json::Value::from("spleen")]);
    }

    #[test]
    fn poa_injury_with_matching_procedure_blocks_that_organ() {
        let mut row = base_row();
        row.insert("DX2".to_string(), json!("S36.030A"));
        row.insert("POA2".to_string(), json!("Y"));
        row.insert("Proc2".to_string(), json!("07TP0ZZ"));
        row.insert("Proc2_Date".to_string(), json!("2024-05-10"));
        let enc = Encounter::from_row(&row, 0);
        let config = EngineConfig::default();
        let result = evaluate(&enc, &registry(), &config);
        assert!(matches!(result.status, PsiStatus::DenominatorOnly));
    }

    #[test]
    fn procedure_outside_window_does_not_qualify() {
        let mut row = base_row();
        row.insert("DX2".to_string(), json!("S36.030A"));
        row.insert("POA2".to_string(), json!("N"));
        row.insert("Proc2".to_string(), json!("07TP0ZZ"));
        row.insert("Proc2_Date".to_string(), json!("2024-06-15"));
        let enc = Encounter::from_row(&row, 0);
        let config = EngineConfig::default();
        let result = evaluate(&enc, &registry(), &config);
        assert!(matches!(result.status, PsiStatus::DenominatorOnly));
    }

    #[test]
    fn poa_companion_injury_blocks_only_when_the_matching_procedure_falls_in_window() {
        let mut row = base_row();
        row.insert("DX2".to_string(), json!("S36.030A"));
        row.insert("POA2".to_string(), json!("N"));
        row.insert("DX3".to_string(), json!("S36.030A"));
        row.insert("POA3".to_string(), json!("Y"));
        row.insert("Proc2".to_string(), json!("07TP0ZZ"));
        row.insert("Proc2_Date".to_string(), json!("2024-05-10"));
        let enc = Encounter::from_row(&row, 0);
        let config = EngineConfig::default();
        let result = evaluate(&enc, &registry(), &config);
        assert!(matches!(result.status, PsiStatus::DenominatorOnly));
    }

    #[test]
    fn missing_index_date_excludes() {
        let mut row = base_row();
        row.remove("Proc1_Date");
        let enc = Encounter::from_row(&row, 0);
        let config = EngineConfig::default();
        let result = evaluate(&enc, &registry(), &config);
        assert!(result.is_exclusion());
    }
}
