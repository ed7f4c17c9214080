//! Error taxonomy for the PSI rules engine.
//!
//! Per-record problems (missing fields, unparseable dates, ungroupable
//! DRGs) are never represented here — they surface as gate exclusions
//! or silent `None` fields, exactly as the evaluators are never allowed
//! to raise. Only batch-level, appendix-level failures abort the run.

use thiserror::Error;

/// Errors that can abort a batch before or during evaluation.
#[derive(Debug, Error)]
pub enum PsiEngineError {
    /// The appendix table did not resolve to a usable set of code-set
    /// columns, e.g. a JSON appendix whose `data` key is missing or not
    /// a list of row objects.
    #[error("invalid appendix: {0}")]
    InvalidAppendix(String),

    /// A requested PSI name does not match one of PSI 05-15.
    #[error("unsupported PSI: {0}")]
    UnsupportedPsi(String),
}

/// Result type for the engine's fallible batch-level operations.
pub type Result<T> = std::result::Result<T, PsiEngineError>;
