//! PSI-06: Iatrogenic Pneumothorax Rate.
//!
//! Population: surgical or medical discharges age 18+. Exclusions: a
//! principal or present-on-admission non-traumatic pneumothorax, any
//! chest trauma or pleural-condition diagnosis, or a thoracic/cardiac
//! surgery procedure. Numerator: a secondary iatrogenic pneumothorax
//! diagnosis not present on admission.

use crate::codesets::CodeSetRegistry;
use crate::config::EngineConfig;
use crate::gate::common_gate;
use crate::model::{DxPosition, Encounter, Poa};
use crate::predicate::{has_dx, has_proc};

use super::{ms_drg_in, PsiName, PsiResult, PsiStatus};

pub fn evaluate(enc: &Encounter, registry: &CodeSetRegistry, config: &EngineConfig) -> PsiResult {
    let mut rationale = Vec::new();

    if let Some(exclusion) = common_gate(enc, registry) {
        rationale.push(exclusion.rationale);
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let surgical_or_medical = ms_drg_in(enc, registry, &["SURGI2R_CODES", "MEDIC2R_CODES"]);
    if !(enc.age.is_some_and(|a| a >= 18) && surgical_or_medical) {
        rationale.push("Population Exclusion: not a surgical/medical discharge age 18+".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    if has_dx(&enc.diagnoses, registry.get("IATPTXD_CODES"), Some(DxPosition::Principal), None) {
        rationale.push("Population Exclusion: principal diagnosis of non-traumatic pneumothorax".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    if has_dx(&enc.diagnoses, registry.get("IATPTXD_CODES"), Some(DxPosition::Secondary), Some(Poa::Y)) {
        rationale.push("Population Exclusion: secondary non-traumatic pneumothorax present on admission".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    if has_dx(&enc.diagnoses, registry.get("CTRAUMD_CODES"), None, None) {
        rationale.push("Population Exclusion: specified chest trauma diagnosis present".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    if has_dx(&enc.diagnoses, registry.get("PLEURAD_CODES"), None, None) {
        rationale.push("Population Exclusion: pleural effusion diagnosis present".to_string());
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let thoracic_surgery =
        has_proc(&enc.procedures, registry.get("THORAIP_CODES")) || has_proc(&enc.procedures, registry.get("CARDSIP_CODES"));
    if thoracic_surgery {
        rationale.push(
            "Population Exclusion: thoracic surgery or potentially trans-pleural cardiac procedure performed".to_string(),
        );
        return finish(enc, PsiStatus::Exclusion, rationale, registry, config);
    }

    let numerator = has_dx(&enc.diagnoses, registry.get("IATROID_CODES"), Some(DxPosition::Secondary), Some(Poa::N));

    if numerator {
        rationale.push("Numerator: iatrogenic pneumothorax coded as not present on admission".to_string());
        finish(enc, PsiStatus::Inclusion, rationale, registry, config)
    } else {
        rationale.push("Denominator: no qualifying iatrogenic pneumothorax diagnosis".to_string());
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
    let mut result = PsiResult::new(enc.encounter_id.clone(), PsiName::Psi06, status, rationale);
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
            HashMap::from([("(IATROID)".to_string(), json!("J95.811"))]),
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
    fn not_poa_pneumothorax_is_inclusion() {
        let mut row = base_row();
        row.insert("DX2".to_string(), json!("J95.811"));
        row.insert("POA2".to_string(), json!("N"));
        let enc = Encounter::from_row(&row, 0);
        let config = EngineConfig::default();
        let result = evaluate(&enc, &registry(), &config);
        assert!(result.is_inclusion());
    }

    #[test]
    fn chest_trauma_excludes_regardless_of_iatrogenic_dx() {
        let registry = CodeSetRegistry::from_rows(&[
            HashMap::from([("(SURGI2R)".to_string(), json!("470"))]),
            HashMap::from([("(IATROID)".to_string(), json!("J95.811"))]),
            HashMap::from([("(CTRAUMD)".to_string(), json!("S27.0XXA"))]),
        ]);
        let mut row = base_row();
        row.insert("DX2".to_string(), json!("S27.0XXA"));
        row.insert("DX3".to_string(), json!("J95.811"));
        row.insert("POA3".to_string(), json!("N"));
        let enc = Encounter::from_row(&row, 0);
        let config = EngineConfig::default();
        let result = evaluate(&enc, &registry, &config);
        assert!(result.is_exclusion());
    }
}
