use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use log::{info, warn};
use psi_rules_engine::{CodeSetRegistry, EngineConfig, Encounter, Result, run_batch};
use serde_json::Value;

/// Reads two JSON files — an appendix (`{"data": [...]}`) and a batch
/// of encounter rows (a JSON array of row objects) — and prints a
/// per-PSI tally. `cargo run -- <appendix.json> <records.json>`.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let (Some(appendix_path), Some(records_path)) = (args.next(), args.next()) else {
        warn!("usage: psi-rules-engine <appendix.json> <records.json>");
        return Ok(());
    };

    let registry = load_registry(&appendix_path)?;
    let records = load_records(&records_path)?;

    info!("loaded {} encounter(s) from {records_path}", records.len());

    let config = EngineConfig::default();
    let start = Instant::now();
    let report = run_batch(&records, &registry, &config);
    info!("evaluated {} result row(s) in {:?}", report.results.len(), start.elapsed());

    for psi in psi_rules_engine::PsiName::all() {
        if let Some(tally) = report.tallies.get(psi) {
            info!(
                "{psi}: total={} inclusions={} exclusions={} rate_per_1000={:.2}",
                tally.total_cases,
                tally.inclusions,
                tally.exclusions,
                tally.rate_per_1000()
            );
        }
    }

    Ok(())
}

fn load_registry(path: &str) -> Result<CodeSetRegistry> {
    let raw = fs::read_to_string(path).map_err(|e| {
        psi_rules_engine::PsiEngineError::InvalidAppendix(format!("cannot read {path}: {e}"))
    })?;
    let value: Value = serde_json::from_str(&raw).map_err(|e| {
        psi_rules_engine::PsiEngineError::InvalidAppendix(format!("cannot parse {path}: {e}"))
    })?;
    CodeSetRegistry::from_json_appendix(&value)
}

fn load_records(path: &str) -> Result<Vec<Encounter>> {
    let raw = fs::read_to_string(PathBuf::from(path)).map_err(|e| {
        psi_rules_engine::PsiEngineError::InvalidAppendix(format!("cannot read {path}: {e}"))
    })?;
    let rows: Vec<HashMap<String, Value>> = serde_json::from_str(&raw).map_err(|e| {
        psi_rules_engine::PsiEngineError::InvalidAppendix(format!("cannot parse {path}: {e}"))
    })?;
    Ok(rows.iter().enumerate().map(|(i, row)| Encounter::from_row(row, i)).collect())
}
