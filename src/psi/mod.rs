//! Indicator evaluators (component E) and their shared result types.
//!
//! Each `psiNN` submodule implements one AHRQ Patient Safety Indicator.
//! All of them share the same calling convention: take an `&Encounter`,
//! the `&CodeSetRegistry`, and the `&EngineConfig`, and return a
//! `PsiResult` that never errs — every per-record outcome is a status,
//! not a `Result`.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use crate::codesets::CodeSetRegistry;
use crate::config::EngineConfig;
use crate::model::Encounter;

pub mod psi05;
pub mod psi06;
pub mod psi07;
pub mod psi08;
pub mod psi09;
pub mod psi10;
pub mod psi11;
pub mod psi12;
pub mod psi13;
pub mod psi14;
pub mod psi15;

/// One of the eleven indicators this engine evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum PsiName {
    Psi05,
    Psi06,
    Psi07,
    Psi08,
    Psi09,
    Psi10,
    Psi11,
    Psi12,
    Psi13,
    Psi14,
    Psi15,
}

impl PsiName {
    /// All eleven indicators, in numeric order.
    #[must_use]
    pub fn all() -> &'static [PsiName] {
        &[
            PsiName::Psi05,
            PsiName::Psi06,
            PsiName::Psi07,
            PsiName::Psi08,
            PsiName::Psi09,
            PsiName::Psi10,
            PsiName::Psi11,
            PsiName::Psi12,
            PsiName::Psi13,
            PsiName::Psi14,
            PsiName::Psi15,
        ]
    }

    /// The AHRQ short title, used in reports and log lines.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            PsiName::Psi05 => "Retained Surgical Item or Unretrieved Device Fragment",
            PsiName::Psi06 => "Iatrogenic Pneumothorax Rate",
            PsiName::Psi07 => "Central Venous Catheter-Related Bloodstream Infection Rate",
            PsiName::Psi08 => "In-Hospital Fall with Hip Fracture Rate",
            PsiName::Psi09 => "Perioperative Hemorrhage or Hematoma Rate",
            PsiName::Psi10 => "Postoperative Acute Kidney Injury Requiring Dialysis Rate",
            PsiName::Psi11 => "Postoperative Respiratory Failure Rate",
            PsiName::Psi12 => "Perioperative Pulmonary Embolism or DVT Rate",
            PsiName::Psi13 => "Postoperative Sepsis Rate",
            PsiName::Psi14 => "Postoperative Wound Dehiscence Rate",
            PsiName::Psi15 => "Abdominopelvic Accidental Puncture or Laceration Rate",
        }
    }

    /// Evaluate this indicator against one encounter.
    #[must_use]
    pub fn evaluate(self, enc: &Encounter, registry: &CodeSetRegistry, config: &EngineConfig) -> PsiResult {
        match self {
            PsiName::Psi05 => psi05::evaluate(enc, registry, config),
            PsiName::Psi06 => psi06::evaluate(enc, registry, config),
            PsiName::Psi07 => psi07::evaluate(enc, registry, config),
            PsiName::Psi08 => psi08::evaluate(enc, registry, config),
            PsiName::Psi09 => psi09::evaluate(enc, registry, config),
            PsiName::Psi10 => psi10::evaluate(enc, registry, config),
            PsiName::Psi11 => psi11::evaluate(enc, registry, config),
            PsiName::Psi12 => psi12::evaluate(enc, registry, config),
            PsiName::Psi13 => psi13::evaluate(enc, registry, config),
            PsiName::Psi14 => psi14::evaluate(enc, registry, config),
            PsiName::Psi15 => psi15::evaluate(enc, registry, config),
        }
    }

    /// Stable ordinal used to restore a deterministic per-row PSI order
    /// after parallel batch evaluation (see `batch::run_batch`).
    #[must_use]
    pub fn sort_index(self) -> u8 {
        match self {
            PsiName::Psi05 => 5,
            PsiName::Psi06 => 6,
            PsiName::Psi07 => 7,
            PsiName::Psi08 => 8,
            PsiName::Psi09 => 9,
            PsiName::Psi10 => 10,
            PsiName::Psi11 => 11,
            PsiName::Psi12 => 12,
            PsiName::Psi13 => 13,
            PsiName::Psi14 => 14,
            PsiName::Psi15 => 15,
        }
    }

    /// The manifest of appendix code-set names this indicator consults,
    /// surfaced in debug-mode reports. Mirrors the original tool's
    /// per-indicator code reference listing.
    #[must_use]
    pub fn code_set_manifest(self) -> &'static [&'static str] {
        match self {
            PsiName::Psi05 => &["SURGI2R_CODES", "MEDIC2R_CODES", "MDC14PRINDX_CODES", "FOREIID_CODES"],
            PsiName::Psi06 => &[
                "SURGI2R_CODES",
                "MEDIC2R_CODES",
                "IATPTXD_CODES",
                "CTRAUMD_CODES",
                "PLEURAD_CODES",
                "THORAIP_CODES",
                "CARDSIP_CODES",
                "IATROID_CODES",
            ],
            PsiName::Psi07 => &[
                "SURGI2R_CODES",
                "MEDIC2R_CODES",
                "MDC14PRINDX_CODES",
                "IDTMC3D_CODES",
                "CANCEID_CODES",
                "IMMUNID_CODES",
                "IMMUNIP_CODES",
            ],
            PsiName::Psi08 => &["SURGI2R_CODES", "MEDIC2R_CODES", "FXID_CODES", "HIPFXID_CODES", "PROSFXID_CODES"],
            PsiName::Psi09 => &[
                "SURGI2R_CODES",
                "ORPROC_CODES",
                "POHMRI2D_CODES",
                "COAGDID_CODES",
                "MEDBLEEDD_CODES",
                "HEMOTH2P_CODES",
                "THROMBOLYTICP_CODES",
            ],
            PsiName::Psi10 => &[
                "SURGI2R_CODES",
                "ORPROC_CODES",
                "PHYSIDB_CODES",
                "DIALYIP_CODES",
                "DIALY2P_CODES",
                "CARDIID_CODES",
                "CARDRID_CODES",
                "SHOCKID_CODES",
                "CRENLFD_CODES",
                "URINARYOBSID_CODES",
                "SOLKIDD_CODES",
                "PNEPHREP_CODES",
            ],
            PsiName::Psi11 => &[
                "SURGI2R_CODES",
                "ORPROC_CODES",
                "ACURF3D_CODES",
                "ACURF2D_CODES",
                "TRACHID_CODES",
                "TRACHIP_CODES",
                "MALHYPD_CODES",
                "NEUROMD_CODES",
                "DGNEUID_CODES",
                "NUCRANP_CODES",
                "PRESOPP_CODES",
                "LUNGCIP_CODES",
                "LUNGTRANSP_CODES",
                "PR9672P_CODES",
                "PR9671P_CODES",
                "PR9604P_CODES",
            ],
            PsiName::Psi12 => &[
                "SURGI2R_CODES",
                "ORPROC_CODES",
                "DEEPVIB_CODES",
                "PULMOID_CODES",
                "HITD_CODES",
                "NEURTRAD_CODES",
                "ECMOP_CODES",
                "VENACIP_CODES",
                "THROMP_CODES",
            ],
            PsiName::Psi13 => &[
                "SURGI2R_CODES",
                "ORPROC_CODES",
                "SEPTI2D_CODES",
                "INFECID_CODES",
                "SEVEREIMMUNED_CODES",
                "MODERATEIMMUNED_CODES",
                "MALIGNANCY_CODES",
                "CHEMOTHERAPYP_CODES",
                "RADIATIONP_CODES",
            ],
            PsiName::Psi14 => &["ABDOMIPOPEN_CODES", "ABDOMIPOTHER_CODES", "ABWALLCD_CODES", "RECLOIP_CODES"],
            PsiName::Psi15 => &[
                "SURGI2R_CODES",
                "MEDIC2R_CODES",
                "ABDOMI15P_CODES",
                "SPLEEN15D_CODES",
                "SPLEEN15P_CODES",
                "ADRENAL15D_CODES",
                "ADRENAL15P_CODES",
                "VESSEL15D_CODES",
                "VESSEL15P_CODES",
                "DIAPHR15D_CODES",
                "DIAPHR15P_CODES",
                "GI15D_CODES",
                "GI15P_CODES",
                "GU15D_CODES",
                "GU15P_CODES",
            ],
        }
    }
}

impl fmt::Display for PsiName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = match self {
            PsiName::Psi05 => "PSI-05",
            PsiName::Psi06 => "PSI-06",
            PsiName::Psi07 => "PSI-07",
            PsiName::Psi08 => "PSI-08",
            PsiName::Psi09 => "PSI-09",
            PsiName::Psi10 => "PSI-10",
            PsiName::Psi11 => "PSI-11",
            PsiName::Psi12 => "PSI-12",
            PsiName::Psi13 => "PSI-13",
            PsiName::Psi14 => "PSI-14",
            PsiName::Psi15 => "PSI-15",
        };
        f.write_str(n)
    }
}

/// The verdict an indicator reaches for one encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum PsiStatus {
    /// In the denominator and the numerator: the adverse event occurred.
    Inclusion,
    /// Excluded from the denominator entirely (common gate or
    /// indicator-specific population/exclusion criteria).
    Exclusion,
    /// In the denominator, event did not occur.
    DenominatorOnly,
}

/// Organ systems scored independently by PSI-15.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrganSystem {
    Spleen,
    Adrenal,
    Vessel,
    Diaphragm,
    Gastrointestinal,
    Genitourinary,
}

impl OrganSystem {
    #[must_use]
    pub fn all() -> &'static [OrganSystem] {
        &[
            OrganSystem::Spleen,
            OrganSystem::Adrenal,
            OrganSystem::Vessel,
            OrganSystem::Diaphragm,
            OrganSystem::Gastrointestinal,
            OrganSystem::Genitourinary,
        ]
    }

    /// The appendix code-set name carrying this organ's injury codes.
    #[must_use]
    pub fn injury_code_set_name(self) -> &'static str {
        match self {
            OrganSystem::Spleen => "SPLEEN15D_CODES",
            OrganSystem::Adrenal => "ADRENAL15D_CODES",
            OrganSystem::Vessel => "VESSEL15D_CODES",
            OrganSystem::Diaphragm => "DIAPHR15D_CODES",
            OrganSystem::Gastrointestinal => "GI15D_CODES",
            OrganSystem::Genitourinary => "GU15D_CODES",
        }
    }

    /// The appendix code-set name carrying this organ's related
    /// evaluation/treatment procedure codes.
    #[must_use]
    pub fn procedure_code_set_name(self) -> &'static str {
        match self {
            OrganSystem::Spleen => "SPLEEN15P_CODES",
            OrganSystem::Adrenal => "ADRENAL15P_CODES",
            OrganSystem::Vessel => "VESSEL15P_CODES",
            OrganSystem::Diaphragm => "DIAPHR15P_CODES",
            OrganSystem::Gastrointestinal => "GI15P_CODES",
            OrganSystem::Genitourinary => "GU15P_CODES",
        }
    }
}

impl fmt::Display for OrganSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = match self {
            OrganSystem::Spleen => "spleen",
            OrganSystem::Adrenal => "adrenal gland",
            OrganSystem::Vessel => "vessel",
            OrganSystem::Diaphragm => "diaphragm",
            OrganSystem::Gastrointestinal => "gastrointestinal tract",
            OrganSystem::Genitourinary => "genitourinary tract",
        };
        f.write_str(n)
    }
}

/// PSI-14's wound stratum: whether the index procedure was open
/// abdominopelvic surgery or the "other" (laparoscopic/percutaneous) kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WoundStratum {
    Open,
    Other,
}

/// PSI-08's fracture-site stratum: hip fractures take priority over
/// any other in-hospital fall fracture when both are coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FractureStratum {
    Hip,
    Other,
}

/// The outcome of evaluating one indicator against one encounter.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PsiResult {
    pub encounter_id: String,
    pub psi: PsiName,
    pub status: PsiStatus,
    /// Ordered, human-readable trail of why the status was reached —
    /// one line per gate/population/exclusion/numerator check that
    /// fired.
    pub rationale: Vec<String>,
    /// Debug-mode extras: code-set sizes consulted, matched codes,
    /// organ/stratum classifications. Empty unless `debug_mode` is set.
    pub details: HashMap<String, Value>,
}

/// Whether the encounter's resolved `MS-DRG` text falls in any of the
/// named DRG-partition code sets (e.g. `SURGI2R_CODES`, `MEDIC2R_CODES`).
/// DRG membership is a string-set test against the raw `MS-DRG` field,
/// not the coerced-to-integer `drg`.
#[must_use]
pub(crate) fn ms_drg_in(enc: &Encounter, registry: &CodeSetRegistry, set_names: &[&str]) -> bool {
    let Some(ms_drg) = enc.ms_drg_text.as_deref() else {
        return false;
    };
    set_names.iter().any(|name| registry.get(name).contains(ms_drg))
}

impl PsiResult {
    #[must_use]
    pub fn new(encounter_id: impl Into<String>, psi: PsiName, status: PsiStatus, rationale: Vec<String>) -> Self {
        Self { encounter_id: encounter_id.into(), psi, status, rationale, details: HashMap::new() }
    }

    #[must_use]
    pub fn is_inclusion(&self) -> bool {
        matches!(self.status, PsiStatus::Inclusion)
    }

    #[must_use]
    pub fn is_exclusion(&self) -> bool {
        matches!(self.status, PsiStatus::Exclusion)
    }

    /// Attach the per-PSI code-set manifest sizes when `debug_mode` is
    /// on; a no-op otherwise.
    pub fn attach_debug_manifest(&mut self, registry: &CodeSetRegistry, config: &EngineConfig) {
        if !config.debug_mode {
            return;
        }
        let sizes: HashMap<String, Value> = self
            .psi
            .code_set_manifest()
            .iter()
            .map(|name| ((*name).to_string(), Value::from(registry.len(name))))
            .collect();
        self.details.insert("code_set_sizes".to_string(), Value::Object(sizes.into_iter().collect()));
    }
}
