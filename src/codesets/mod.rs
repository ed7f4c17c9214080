//! Code-set registry (component A).
//!
//! Builds a name -> set-of-codes mapping from an appendix table. Each
//! appendix column becomes one named code set; the name is derived from
//! the column header, and the codes are normalized the same way
//! diagnosis/procedure codes are (uppercase, no periods).

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashSet;

/// A named, normalized set of ICD-10-CM/PCS codes.
pub type CodeSet = FxHashSet<String>;

static PAREN_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^)]+)\)").expect("static regex is valid"));

static EMPTY_SET: LazyLock<CodeSet> = LazyLock::new(CodeSet::default);

/// Registry of code sets keyed by their normalized appendix-derived name.
#[derive(Debug, Clone, Default)]
pub struct CodeSetRegistry {
    sets: HashMap<String, CodeSet>,
}

impl CodeSetRegistry {
    /// Build a registry from appendix rows, one row per `HashMap` of
    /// column name to cell value. Mirrors a tabular appendix (Excel) or
    /// a JSON appendix already unwrapped from its `data` array.
    #[must_use]
    pub fn from_rows(rows: &[HashMap<String, serde_json::Value>]) -> Self {
        let mut sets: HashMap<String, CodeSet> = HashMap::new();

        for row in rows {
            for (column, value) in row {
                let name = Self::code_set_name(column);
                let Some(code) = Self::normalize_cell(value) else {
                    continue;
                };
                sets.entry(name).or_default().insert(code);
            }
        }

        Self { sets }
    }

    /// Derive the registry key for an appendix column header: the
    /// parenthesized token if present, else the whole header,
    /// uppercased with an `_CODES` suffix.
    #[must_use]
    pub fn code_set_name(column_header: &str) -> String {
        let token = PAREN_TOKEN
            .captures(column_header)
            .and_then(|caps| caps.get(1))
            .map_or_else(|| column_header.trim(), |m| m.as_str());
        format!("{}_CODES", token.trim().to_uppercase())
    }

    fn normalize_cell(value: &serde_json::Value) -> Option<String> {
        let raw = match value {
            serde_json::Value::Null => return None,
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let cleaned = raw.trim().replace('.', "").to_uppercase();
        if cleaned.is_empty() { None } else { Some(cleaned) }
    }

    /// Look up a code set by name. Unknown names resolve to the empty
    /// set rather than `None`.
    #[must_use]
    pub fn get(&self, name: &str) -> &CodeSet {
        self.sets.get(name).unwrap_or(&EMPTY_SET)
    }

    /// Number of codes in the named set, for debug reporting.
    #[must_use]
    pub fn len(&self, name: &str) -> usize {
        self.get(name).len()
    }

    /// Union of several named sets, used for PSI-15's organ-spanning
    /// injury-code checks.
    #[must_use]
    pub fn union(&self, names: &[&str]) -> CodeSet {
        let mut out = CodeSet::default();
        for name in names {
            out.extend(self.get(name).iter().cloned());
        }
        out
    }

    /// Build a registry from a JSON appendix of the shape
    /// `{"data": [{col: code, ...}, ...]}`, treating it exactly as the
    /// tabular form. A `data` key that is missing or not an array is a
    /// hard `InvalidAppendix` error — the one failure that aborts a
    /// batch before any evaluation runs (`spec.md` §6, §7).
    pub fn from_json_appendix(value: &serde_json::Value) -> crate::error::Result<Self> {
        let rows_value = value
            .get("data")
            .ok_or_else(|| crate::error::PsiEngineError::InvalidAppendix("missing 'data' key".to_string()))?;
        let array = rows_value
            .as_array()
            .ok_or_else(|| crate::error::PsiEngineError::InvalidAppendix("'data' is not a list of rows".to_string()))?;

        let rows: Vec<HashMap<String, serde_json::Value>> = array
            .iter()
            .map(|row| match row {
                serde_json::Value::Object(map) => Ok(map.clone().into_iter().collect()),
                _ => Err(crate::error::PsiEngineError::InvalidAppendix(
                    "appendix row is not an object".to_string(),
                )),
            })
            .collect::<crate::error::Result<Vec<_>>>()?;

        Ok(Self::from_rows(&rows))
    }
}
