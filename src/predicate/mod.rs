//! Predicate kit (component C): small, reusable predicates over
//! diagnosis and procedure lists. Every per-PSI evaluator is built by
//! composing these.

use chrono::NaiveDateTime;

use crate::codesets::CodeSet;
use crate::model::{Diagnosis, DxPosition, Poa, Procedure};

/// True if any diagnosis has a code in `codes` and, when given, matches
/// `position` and `poa`.
#[must_use]
pub fn has_dx(
    diagnoses: &[Diagnosis],
    codes: &CodeSet,
    position: Option<DxPosition>,
    poa: Option<Poa>,
) -> bool {
    diagnoses.iter().any(|dx| dx_matches(dx, codes, position, poa))
}

/// All diagnoses matching `codes` (and, when given, `position`/`poa`),
/// preserving input order.
#[must_use]
pub fn matching_dx(
    diagnoses: &[Diagnosis],
    codes: &CodeSet,
    position: Option<DxPosition>,
    poa: Option<Poa>,
) -> Vec<&Diagnosis> {
    diagnoses
        .iter()
        .filter(|dx| dx_matches(dx, codes, position, poa))
        .collect()
}

fn dx_matches(
    dx: &Diagnosis,
    codes: &CodeSet,
    position: Option<DxPosition>,
    poa: Option<Poa>,
) -> bool {
    if !codes.contains(&dx.code) {
        return false;
    }
    if let Some(p) = position {
        if dx.position != p {
            return false;
        }
    }
    if let Some(want_poa) = poa {
        if dx.poa != want_poa {
            return false;
        }
    }
    true
}

/// True if any procedure's code is in `codes`.
#[must_use]
pub fn has_proc(procedures: &[Procedure], codes: &CodeSet) -> bool {
    procedures.iter().any(|p| codes.contains(&p.code))
}

/// Number of procedures whose code is in `codes`.
#[must_use]
pub fn count_proc(procedures: &[Procedure], codes: &CodeSet) -> usize {
    procedures.iter().filter(|p| codes.contains(&p.code)).count()
}

/// Earliest timestamp among procedures in `codes`, ignoring entries
/// with no timestamp.
#[must_use]
pub fn first_proc_date(procedures: &[Procedure], codes: &CodeSet) -> Option<NaiveDateTime> {
    procedures
        .iter()
        .filter(|p| codes.contains(&p.code))
        .filter_map(|p| p.datetime)
        .min()
}

/// Latest timestamp among procedures in `codes`, ignoring entries with
/// no timestamp.
#[must_use]
pub fn last_proc_date(procedures: &[Procedure], codes: &CodeSet) -> Option<NaiveDateTime> {
    procedures
        .iter()
        .filter(|p| codes.contains(&p.code))
        .filter_map(|p| p.datetime)
        .max()
}

/// Whole-calendar-day difference `b - a`, truncating to dates first so
/// that time-of-day never affects the offset.
#[must_use]
pub fn day_offset(a: NaiveDateTime, b: NaiveDateTime) -> i64 {
    (b.date() - a.date()).num_days()
}

/// Strictly-before comparison at calendar-day granularity.
#[must_use]
pub fn before(a: NaiveDateTime, b: NaiveDateTime) -> bool {
    a.date() < b.date()
}

/// Same-calendar-day comparison.
#[must_use]
pub fn same_day(a: NaiveDateTime, b: NaiveDateTime) -> bool {
    a.date() == b.date()
}

/// On-or-before comparison at calendar-day granularity.
#[must_use]
pub fn on_or_before(a: NaiveDateTime, b: NaiveDateTime) -> bool {
    a.date() <= b.date()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::normalize_code;
    use chrono::{NaiveDate, NaiveTime};

    fn dt(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDateTime::new(
            NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
        )
    }

    fn codes(list: &[&str]) -> CodeSet {
        list.iter().map(|c| normalize_code(c)).collect()
    }

    #[test]
    fn first_and_last_ignore_null_dates() {
        let procs = vec![
            Procedure::new("ABC".into(), None, 1),
            Procedure::new("ABC".into(), Some(dt(2024, 3, 1)), 2),
            Procedure::new("ABC".into(), Some(dt(2024, 2, 28)), 3),
        ];
        let set = codes(&["ABC"]);
        assert_eq!(first_proc_date(&procs, &set), Some(dt(2024, 2, 28)));
        assert_eq!(last_proc_date(&procs, &set), Some(dt(2024, 3, 1)));
    }

    #[test]
    fn ordering_monotonicity_holds_regardless_of_input_order() {
        let set = codes(&["ABC"]);
        let forward = vec![
            Procedure::new("ABC".into(), Some(dt(2024, 1, 1)), 1),
            Procedure::new("ABC".into(), Some(dt(2024, 1, 5)), 2),
        ];
        let mut swapped = forward.clone();
        swapped.reverse();

        assert_eq!(first_proc_date(&forward, &set), first_proc_date(&swapped, &set));
        assert_eq!(last_proc_date(&forward, &set), last_proc_date(&swapped, &set));
        assert!(before(first_proc_date(&forward, &set).unwrap(), last_proc_date(&forward, &set).unwrap()));
    }

    #[test]
    fn same_day_ignores_time_of_day() {
        let morning = NaiveDateTime::new(
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            NaiveTime::from_hms_opt(1, 0, 0).unwrap(),
        );
        let evening = NaiveDateTime::new(
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
        );
        assert!(same_day(morning, evening));
        assert!(!before(morning, evening));
        assert!(on_or_before(morning, evening));
    }
}
