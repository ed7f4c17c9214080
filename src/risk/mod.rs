//! Risk categorizers (component F): PSI-13's immune-compromise status
//! and PSI-15's procedure-complexity stratum.

use std::sync::Once;

use chrono::NaiveDateTime;

use crate::codesets::CodeSetRegistry;
use crate::model::Encounter;
use crate::predicate::{has_dx, has_proc};

static EMPTY_SET_WARNED: Once = Once::new();

fn warn_if_empty(registry: &CodeSetRegistry, name: &str) {
    if registry.len(name) == 0 {
        EMPTY_SET_WARNED.call_once(|| {
            log::warn!(
                "risk-adjustment code set '{name}' is empty; immune-compromise and \
                 procedure-complexity stratification will under-count until the \
                 appendix carries real codes for it"
            );
        });
    }
}

/// PSI-13's immune-compromise risk category, used to stratify sepsis
/// cases rather than change whether they're counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmuneCompromiseCategory {
    /// A severe immunocompromising condition is coded.
    Severe,
    /// A moderate immunocompromising condition is coded.
    Moderate,
    /// A malignancy with chemotherapy or radiation treatment is coded.
    MalignancyWithTreatment,
    /// No immune-compromise signal found.
    Baseline,
}

impl ImmuneCompromiseCategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ImmuneCompromiseCategory::Severe => "severe_immunocompromised",
            ImmuneCompromiseCategory::Moderate => "moderate_immunocompromised",
            ImmuneCompromiseCategory::MalignancyWithTreatment => "malignancy_with_treatment",
            ImmuneCompromiseCategory::Baseline => "baseline",
        }
    }
}

/// Classify the encounter's immune-compromise status for PSI-13.
/// Precedence: severe, then moderate, then malignancy combined with
/// chemotherapy or radiation treatment, else baseline.
#[must_use]
pub fn classify_immune_compromise(enc: &Encounter, registry: &CodeSetRegistry) -> ImmuneCompromiseCategory {
    warn_if_empty(registry, "SEVEREIMMUNED_CODES");
    warn_if_empty(registry, "MODERATEIMMUNED_CODES");
    warn_if_empty(registry, "MALIGNANCY_CODES");

    if has_dx(&enc.diagnoses, registry.get("SEVEREIMMUNED_CODES"), None, None) {
        return ImmuneCompromiseCategory::Severe;
    }
    if has_dx(&enc.diagnoses, registry.get("MODERATEIMMUNED_CODES"), None, None) {
        return ImmuneCompromiseCategory::Moderate;
    }
    let malignancy = has_dx(&enc.diagnoses, registry.get("MALIGNANCY_CODES"), None, None);
    let treated = has_proc(&enc.procedures, registry.get("CHEMOTHERAPYP_CODES"))
        || has_proc(&enc.procedures, registry.get("RADIATIONP_CODES"));
    if malignancy && treated {
        return ImmuneCompromiseCategory::MalignancyWithTreatment;
    }
    ImmuneCompromiseCategory::Baseline
}

/// PSI-15's procedure-complexity stratum: how many distinct procedures
/// were performed on the same calendar day as the index abdominopelvic
/// procedure. Not a code-set lookup — a same-day procedure count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureComplexity {
    High,
    Moderate,
    Low,
}

impl ProcedureComplexity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProcedureComplexity::High => "high_complexity",
            ProcedureComplexity::Moderate => "moderate_complexity",
            ProcedureComplexity::Low => "low_complexity",
        }
    }

    #[must_use]
    pub fn from_same_day_count(count: usize) -> Self {
        if count >= 5 {
            ProcedureComplexity::High
        } else if count >= 2 {
            ProcedureComplexity::Moderate
        } else {
            ProcedureComplexity::Low
        }
    }
}

/// Classify procedure complexity from the count of procedures dated
/// exactly on `index_date`.
#[must_use]
pub fn classify_procedure_complexity(enc: &Encounter, index_date: NaiveDateTime) -> ProcedureComplexity {
    let same_day_count = enc
        .procedures
        .iter()
        .filter(|p| p.datetime.is_some_and(|dt| dt.date() == index_date.date()))
        .count();
    ProcedureComplexity::from_same_day_count(same_day_count)
}
