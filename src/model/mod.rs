//! Canonical encounter model (component B).
//!
//! `Encounter::from_row` is the only place that probes alternate input
//! field names; everything else in the engine works against the
//! normalized types re-exported here.

pub mod diagnosis;
pub mod encounter;
pub mod procedure;

pub use diagnosis::{Diagnosis, DxPosition, Poa, normalize_code};
pub use encounter::Encounter;
pub use procedure::Procedure;
