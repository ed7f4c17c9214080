//! Batch driver (component G): runs every selected PSI against every
//! encounter and aggregates per-indicator tallies.
//!
//! The driver never re-implements gating or numerator logic — it only
//! dispatches to `PsiName::evaluate` and folds the resulting
//! `PsiResult`s into a report.

use std::collections::HashMap;

use log::info;
use rayon::prelude::*;

use crate::codesets::CodeSetRegistry;
use crate::config::EngineConfig;
use crate::model::Encounter;
use crate::psi::{PsiName, PsiResult, PsiStatus};

/// Per-PSI counts and rate, computed over the unfiltered batch size —
/// matching the source tool, which denominates `rate_per_1000` against
/// total encounters evaluated, not just the ones passing the
/// denominator gate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchTally {
    pub total_cases: usize,
    pub inclusions: usize,
    pub exclusions: usize,
}

impl BatchTally {
    #[must_use]
    pub fn rate_per_1000(&self) -> f64 {
        if self.total_cases == 0 {
            return 0.0;
        }
        1000.0 * (self.inclusions as f64) / (self.total_cases as f64)
    }

    fn record(&mut self, status: PsiStatus) {
        self.total_cases += 1;
        match status {
            PsiStatus::Inclusion => self.inclusions += 1,
            PsiStatus::Exclusion => self.exclusions += 1,
            PsiStatus::DenominatorOnly => {}
        }
    }
}

/// The full output of a batch run: every result row (subject to
/// `show_exclusions`), plus per-PSI tallies for reporting.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub results: Vec<PsiResult>,
    pub tallies: HashMap<PsiName, BatchTally>,
}

/// Evaluate every selected PSI against every encounter and aggregate
/// the results. Results are sharded across worker threads by
/// `(record, psi)` pair via `rayon`, then restored to input-row order
/// — a convenience, not a contract (see `spec.md` §5).
#[must_use]
pub fn run_batch(records: &[Encounter], registry: &CodeSetRegistry, config: &EngineConfig) -> BatchReport {
    info!(
        "running {} PSI(s) across {} encounter(s)",
        config.selected_psis.len(),
        records.len()
    );

    let mut pairs: Vec<(usize, PsiResult)> = records
        .par_iter()
        .enumerate()
        .flat_map_iter(|(row_index, enc)| {
            config
                .selected_psis
                .iter()
                .map(move |psi| (row_index, psi.evaluate(enc, registry, config)))
        })
        .collect();

    pairs.sort_by_key(|(row_index, result)| (*row_index, result.psi.sort_index()));

    let mut tallies: HashMap<PsiName, BatchTally> = HashMap::new();
    for psi in &config.selected_psis {
        tallies.insert(*psi, BatchTally::default());
    }

    let mut results = Vec::with_capacity(pairs.len());
    for (_, result) in pairs {
        tallies.entry(result.psi).or_default().record(result.status);
        if config.show_exclusions || !result.is_exclusion() {
            results.push(result);
        }
    }

    BatchReport { results, tallies }
}
