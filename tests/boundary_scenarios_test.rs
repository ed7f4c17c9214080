//! The six literal boundary scenarios named in the rules engine's
//! specification, each exercised end to end through the public crate
//! API (registry construction, row normalization, evaluation).

use std::collections::HashMap;

use psi_rules_engine::{CodeSetRegistry, EngineConfig, Encounter, PsiName, PsiStatus};
use serde_json::json;

fn appendix(pairs: &[(&str, &str)]) -> CodeSetRegistry {
    let rows: Vec<HashMap<String, serde_json::Value>> = pairs
        .iter()
        .map(|(header, code)| HashMap::from([((*header).to_string(), json!(*code))]))
        .collect();
    CodeSetRegistry::from_rows(&rows)
}

fn base_row() -> HashMap<String, serde_json::Value> {
    let mut row = HashMap::new();
    row.insert("SEX".to_string(), json!("F"));
    row.insert("DQTR".to_string(), json!(2));
    row.insert("YEAR".to_string(), json!(2024));
    row
}

#[test]
fn scenario_1_psi05_retained_surgical_item_inclusion() {
    let registry = appendix(&[("(SURGI2R)", "470"), ("(FOREIID)", "T81.500A")]);
    let mut row = base_row();
    row.insert("AGE".to_string(), json!(70));
    row.insert("MS-DRG".to_string(), json!("470"));
    row.insert("DX1".to_string(), json!("I10"));
    row.insert("DX2".to_string(), json!("T81500A"));
    row.insert("POA2".to_string(), json!("N"));
    let enc = Encounter::from_row(&row, 0);
    let config = EngineConfig::default();
    let result = PsiName::Psi05.evaluate(&enc, &registry, &config);
    assert!(result.is_inclusion());
    assert_eq!(
        result.details.get("retained_surgical_item_matches").and_then(|v| v.as_array()),
        Some(&vec![serde_json::Value::from("T81500A")])
    );
}

#[test]
fn scenario_2_psi08_hip_fracture_takes_priority() {
    let registry = appendix(&[("(SURGI2R)", "470"), ("(HIPFXID)", "S72.001A"), ("(FXID)", "S52.501A")]);
    let mut row = base_row();
    row.insert("AGE".to_string(), json!(65));
    row.insert("MS-DRG".to_string(), json!("470"));
    row.insert("DX1".to_string(), json!("I10"));
    row.insert("DX2".to_string(), json!("S72001A"));
    row.insert("POA2".to_string(), json!("N"));
    row.insert("DX3".to_string(), json!("S52501A"));
    row.insert("POA3".to_string(), json!("N"));
    let enc = Encounter::from_row(&row, 0);
    let config = EngineConfig::default();
    let result = PsiName::Psi08.evaluate(&enc, &registry, &config);
    assert!(result.is_inclusion());
    assert_eq!(result.details.get("fracture_stratum").and_then(|v| v.as_str()), Some("hip"));
}

#[test]
fn scenario_3_psi09_hemorrhage_treatment_before_or_excludes() {
    let registry = appendix(&[("(SURGI2R)", "470"), ("(ORPROC)", "0DTJ4ZZ"), ("(HEMOTH2P)", "06Q70ZZ")]);
    let mut row = base_row();
    row.insert("AGE".to_string(), json!(50));
    row.insert("MS-DRG".to_string(), json!("470"));
    row.insert("DX1".to_string(), json!("K35.80"));
    row.insert("Proc1".to_string(), json!("0DTJ4ZZ"));
    row.insert("Proc1_Date".to_string(), json!("2024-03-01"));
    row.insert("Proc2".to_string(), json!("06Q70ZZ"));
    row.insert("Proc2_Date".to_string(), json!("2024-02-28"));
    let enc = Encounter::from_row(&row, 0);
    let config = EngineConfig::default();
    let result = PsiName::Psi09.evaluate(&enc, &registry, &config);
    assert!(result.is_exclusion());
    assert!(result.rationale.iter().any(|line| line.contains("before the first OR procedure")));
}

#[test]
fn scenario_4_psi12_day_ten_index_procedure_excludes_regardless_of_dvt_pe() {
    let registry = appendix(&[("(SURGI2R)", "470"), ("(ORPROC)", "0DTJ4ZZ"), ("(DEEPVIB)", "I82.40")]);
    let mut row = base_row();
    row.insert("AGE".to_string(), json!(60));
    row.insert("MS-DRG".to_string(), json!("470"));
    row.insert("DX1".to_string(), json!("K35.80"));
    row.insert("DX2".to_string(), json!("I82.40"));
    row.insert("POA2".to_string(), json!("N"));
    row.insert("admission_date".to_string(), json!("2024-01-01"));
    row.insert("Proc1".to_string(), json!("0DTJ4ZZ"));
    row.insert("Proc1_Date".to_string(), json!("2024-01-11"));
    let enc = Encounter::from_row(&row, 0);
    let config = EngineConfig::default();
    let result = PsiName::Psi12.evaluate(&enc, &registry, &config);
    assert!(result.is_exclusion());
}

#[test]
fn scenario_5_psi14_stratifies_open_vs_non_open_approach() {
    let registry = appendix(&[
        ("(ABDOMIPOPEN)", "0DTJ0ZZ"),
        ("(ABDOMIPOTHER)", "0DTJ4ZZ"),
        ("(ABWALLCD)", "T81.31XA"),
        ("(RECLOIP)", "0WQF0ZZ"),
    ]);

    let mut open_row = base_row();
    open_row.insert("AGE".to_string(), json!(55));
    open_row.insert("DX1".to_string(), json!("K35.80"));
    open_row.insert("length_of_stay".to_string(), json!(5));
    open_row.insert("Proc1".to_string(), json!("0DTJ0ZZ"));
    open_row.insert("Proc1_Date".to_string(), json!("2024-01-01"));
    open_row.insert("Proc2".to_string(), json!("0WQF0ZZ"));
    open_row.insert("Proc2_Date".to_string(), json!("2024-01-10"));
    open_row.insert("DX2".to_string(), json!("T81.31XA"));
    open_row.insert("POA2".to_string(), json!("N"));
    let open_enc = Encounter::from_row(&open_row, 0);
    let config = EngineConfig::default();
    let open_result = PsiName::Psi14.evaluate(&open_enc, &registry, &config);
    assert!(open_result.is_inclusion());
    assert_eq!(open_result.details.get("stratum").and_then(|v| v.as_str()), Some("open_approach"));

    let mut non_open_row = open_row;
    non_open_row.remove("Proc1");
    non_open_row.remove("Proc1_Date");
    non_open_row.insert("Proc1".to_string(), json!("0DTJ4ZZ"));
    non_open_row.insert("Proc1_Date".to_string(), json!("2024-01-01"));
    let non_open_enc = Encounter::from_row(&non_open_row, 0);
    let non_open_result = PsiName::Psi14.evaluate(&non_open_enc, &registry, &config);
    assert!(non_open_result.is_inclusion());
    assert_eq!(non_open_result.details.get("stratum").and_then(|v| v.as_str()), Some("non_open_approach"));
}

#[test]
fn scenario_6_psi15_organ_match_and_poa_block() {
    let registry = appendix(&[
        ("(SURGI2R)", "470"),
        ("(MEDIC2R)", "872"),
        ("(ABDOMI15P)", "0DTJ4ZZ"),
        ("(SPLEEN15D)", "S36.030A"),
        ("(SPLEEN15P)", "07TP0ZZ"),
    ]);

    let mut qualifying_row = base_row();
    qualifying_row.insert("AGE".to_string(), json!(55));
    qualifying_row.insert("MS-DRG".to_string(), json!("872"));
    qualifying_row.insert("DX1".to_string(), json!("K35.80"));
    qualifying_row.insert("Proc1".to_string(), json!("0DTJ4ZZ"));
    qualifying_row.insert("Proc1_Date".to_string(), json!("2024-05-01"));
    qualifying_row.insert("DX2".to_string(), json!("S36.030A"));
    qualifying_row.insert("POA2".to_string(), json!("N"));
    qualifying_row.insert("Proc2".to_string(), json!("07TP0ZZ"));
    qualifying_row.insert("Proc2_Date".to_string(), json!("2024-05-10"));
    let enc = Encounter::from_row(&qualifying_row, 0);
    let config = EngineConfig::default();
    let result = PsiName::Psi15.evaluate(&enc, &registry, &config);
    assert!(result.is_inclusion());
    assert_eq!(
        result.details.get("qualifying_organs").and_then(|v| v.as_array()),
        Some(&vec![serde_json::Value::from("spleen")])
    );

    let mut poa_row = qualifying_row;
    poa_row.insert("POA2".to_string(), json!("Y"));
    let poa_enc = Encounter::from_row(&poa_row, 0);
    let poa_result = PsiName::Psi15.evaluate(&poa_enc, &registry, &config);
    assert!(matches!(poa_result.status, PsiStatus::DenominatorOnly));
}
