//! Configuration surface for the PSI rules engine.

use crate::psi::PsiName;

/// Runtime flags and PSI selection for a batch run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Which indicators to evaluate for every record.
    pub selected_psis: Vec<PsiName>,
    /// Include diagnostic strings and per-PSI code-set counts in output.
    pub debug_mode: bool,
    /// Reporting-only: whether exclusion rows are kept in the report.
    /// Never changes a verdict.
    pub show_exclusions: bool,
    /// When false, skip exclusion/numerator checks that require
    /// procedure dates, falling back to the conservative behavior
    /// documented per-indicator (see `psi::psi11` for the most visible
    /// case).
    pub validate_timing: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            selected_psis: PsiName::all().to_vec(),
            debug_mode: false,
            show_exclusions: true,
            validate_timing: true,
        }
    }
}
