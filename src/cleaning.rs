//! Cleaning and filtering of raw work-order rows
//!
//! Unparseable cells are treated as missing, never as errors. A row survives
//! cleaning only if it has a completion date and a weight, is not dated in the
//! future relative to the run's reference time, and (optionally) is not older
//! than the configured cutoff.

use crate::error::PipelineError;
use crate::records::{RawRecord, WorkOrder};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Date-time layouts accepted for the completion column
const DATETIME_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Date-only layouts accepted for the completion column
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"];

/// Parse a completion date cell, returning `None` when it cannot be read
pub fn parse_completion_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parse a numeric cell; accepts `.` or `,` as the decimal separator
///
/// When both appear, the last one is the decimal mark and the other must be
/// valid thousands grouping (`1,234.5` and `1.234,5` are both 1234.5). A lone
/// separator is always decimal, so `1,234` reads as 1.234 the way the
/// spreadsheet export writes tonnage. Repeated separators of one kind are
/// grouping (`1.234.567`). Anything else is unparseable.
pub fn parse_quantity(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let normalized = match (raw.rfind(','), raw.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => {
            format!("{}.{}", ungroup(&raw[..comma], '.')?, &raw[comma + 1..])
        }
        (Some(_), Some(dot)) => format!("{}.{}", ungroup(&raw[..dot], ',')?, &raw[dot + 1..]),
        (Some(_), None) if raw.matches(',').count() > 1 => ungroup(raw, ',')?,
        (Some(_), None) => raw.replacen(',', ".", 1),
        (None, Some(_)) if raw.matches('.').count() > 1 => ungroup(raw, '.')?,
        (None, _) => raw.to_string(),
    };
    let value: f64 = normalized.parse().ok()?;
    value.is_finite().then_some(value)
}

/// Strip thousands separators, requiring a 1-3 digit head and 3-digit groups
fn ungroup(integer: &str, separator: char) -> Option<String> {
    let (sign, body) = match integer.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", integer.strip_prefix('+').unwrap_or(integer)),
    };
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());

    let mut groups = body.split(separator);
    let head = groups.next()?;
    if !(1..=3).contains(&head.len()) || !all_digits(head) {
        return None;
    }
    let mut digits = format!("{}{}", sign, head);
    for group in groups {
        if group.len() != 3 || !all_digits(group) {
            return None;
        }
        digits.push_str(group);
    }
    Some(digits)
}

/// Filtering rules for one run
#[derive(Debug, Clone, PartialEq)]
pub struct CleaningRules {
    /// Records completed after this instant are discarded
    pub today: NaiveDateTime,
    /// Records completed before this date are discarded
    pub cutoff: Option<NaiveDate>,
    /// Drop rows without a service-order identifier
    pub require_order_ref: bool,
}

impl CleaningRules {
    /// Rules evaluated against the local clock at call time
    pub fn as_of_now(cutoff: Option<NaiveDate>, require_order_ref: bool) -> Self {
        Self {
            today: Local::now().naive_local(),
            cutoff,
            require_order_ref,
        }
    }
}

/// Row counts collected while cleaning
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningStats {
    pub rows_in: usize,
    pub rows_kept: usize,
    pub dropped_missing: usize,
    pub dropped_future: usize,
    pub dropped_before_cutoff: usize,
}

/// Records that passed cleaning, plus how they got there
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedDataset {
    pub records: Vec<WorkOrder>,
    pub stats: CleaningStats,
}

impl CleanedDataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Wrap already-clean orders (no filtering applied)
    pub fn from_orders(records: Vec<WorkOrder>) -> Self {
        let n = records.len();
        Self {
            records,
            stats: CleaningStats {
                rows_in: n,
                rows_kept: n,
                ..Default::default()
            },
        }
    }
}

/// Apply `rules` to raw rows
///
/// Fails with [`PipelineError::EmptyAfterFilter`] when no row survives.
pub fn clean(raw: &[RawRecord], rules: &CleaningRules) -> Result<CleanedDataset, PipelineError> {
    let mut stats = CleaningStats {
        rows_in: raw.len(),
        ..Default::default()
    };
    let cutoff = rules.cutoff.and_then(|d| d.and_hms_opt(0, 0, 0));

    let mut records = Vec::with_capacity(raw.len());
    for row in raw {
        let (Some(completed_at), Some(weight)) = (row.completion_date, row.weight) else {
            stats.dropped_missing += 1;
            continue;
        };
        if rules.require_order_ref && row.order_ref.is_none() {
            stats.dropped_missing += 1;
            continue;
        }
        if completed_at > rules.today {
            stats.dropped_future += 1;
            continue;
        }
        if cutoff.is_some_and(|c| completed_at < c) {
            stats.dropped_before_cutoff += 1;
            continue;
        }

        records.push(WorkOrder {
            completed_at,
            weight,
            order_ref: row.order_ref.clone(),
            order_quantity: row.order_quantity,
        });
    }

    stats.rows_kept = records.len();
    info!(
        "Cleaning kept {} of {} rows (missing={}, future={}, before cutoff={})",
        stats.rows_kept, stats.rows_in, stats.dropped_missing, stats.dropped_future,
        stats.dropped_before_cutoff
    );

    if records.is_empty() {
        warn!("No usable records after filtering");
        return Err(PipelineError::EmptyAfterFilter { rows_in: stats.rows_in });
    }

    Ok(CleanedDataset { records, stats })
}
