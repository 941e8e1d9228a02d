//! False / true defect classification.
//!
//! A failing result is a *false defect* (가성불량) when the same unit has a
//! passing result inside the analysed window, and a *true defect* (진성불량)
//! when it never passes there. Nothing here is stored: every query
//! recomputes the labels from the records it loads.

pub mod dao;
pub mod export;
pub mod summary;

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::NaiveDateTime;
use diesel::SqliteConnection;
use tracing::info;

use crate::database::models::{History, Spec};
use crate::error::Result;
use crate::station::Station;

/// Result of one measured item against its spec limits
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SpecResult {
    Pass,
    /// below the minimum (미달)
    Below,
    /// above the maximum (초과)
    Above,
    /// not measured, zero, or no usable limits (제외)
    Excluded,
}

impl fmt::Display for SpecResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SpecResult::Pass => "Pass",
            SpecResult::Below => "미달",
            SpecResult::Above => "초과",
            SpecResult::Excluded => "제외",
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FailureCategory {
    Pass,
    /// 가성불량
    FalseDefect,
    /// 진성불량
    TrueDefect,
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureCategory::Pass => "Pass",
            FailureCategory::FalseDefect => "가성불량",
            FailureCategory::TrueDefect => "진성불량",
        })
    }
}

/// Anything carrying a unit serial number and a pass / no pass verdict
pub trait Outcome {
    fn serial(&self) -> &str;
    fn passed(&self) -> bool;
}

impl<T: Outcome> Outcome for &T {
    fn serial(&self) -> &str {
        (**self).serial()
    }

    fn passed(&self) -> bool {
        (**self).passed()
    }
}

/// Checks a measured value against `[min, max]`.
/// Missing or zero readings are excluded before any limit is looked at.
pub fn evaluate(value: Option<f64>, min: Option<f64>, max: Option<f64>) -> SpecResult {
    let v = match value {
        None => return SpecResult::Excluded,
        Some(v) if v == 0.0 => return SpecResult::Excluded,
        Some(v) => v,
    };
    if max.is_some_and(|hi| v > hi) {
        return SpecResult::Above;
    }
    if min.is_some_and(|lo| v < lo) {
        return SpecResult::Below;
    }
    match (min, max) {
        (Some(lo), Some(hi)) if lo <= v && v <= hi => SpecResult::Pass,
        _ => SpecResult::Excluded,
    }
}

/// Labels every record: passing ones are `Pass`, the others become false
/// defects when their unit passed anywhere in `records`, true defects otherwise.
/// Output order follows input order.
pub fn classify<T: Outcome>(records: &[T]) -> Vec<FailureCategory> {
    let passed: HashSet<&str> = records
        .iter()
        .filter(|r| r.passed())
        .map(|r| r.serial())
        .collect();
    records
        .iter()
        .map(|r| {
            if r.passed() {
                FailureCategory::Pass
            } else if passed.contains(r.serial()) {
                FailureCategory::FalseDefect
            } else {
                FailureCategory::TrueDefect
            }
        })
        .collect()
}

/// Selection of history records to analyse.
/// The time window is half open: `from <= tested_at < to`.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub station: Station,
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
    pub jig: Option<String>,
    pub week: Option<String>,
}

impl Window {
    pub fn new(station: Station) -> Self {
        Self {
            station,
            from: None,
            to: None,
            jig: None,
            week: None,
        }
    }
}

/// One measured item of one history record, with both classification levels
#[derive(Debug, Clone, PartialEq)]
pub struct ItemVerdict {
    pub history_id: i32,
    pub tested_at: Option<NaiveDateTime>,
    pub finished_at: Option<NaiveDateTime>,
    pub local_test_id: Option<String>,
    pub serial: String,
    pub jig: Option<String>,
    pub item: String,
    pub value: Option<f64>,
    pub min_limit: Option<f64>,
    pub max_limit: Option<f64>,
    pub detail: SpecResult,
    pub category: FailureCategory,
}

impl Outcome for ItemVerdict {
    fn serial(&self) -> &str {
        &self.serial
    }

    fn passed(&self) -> bool {
        self.detail == SpecResult::Pass
    }
}

pub const PASS_FLAG: &str = "O";

impl Outcome for History {
    fn serial(&self) -> &str {
        &self.serial
    }

    fn passed(&self) -> bool {
        self.pass_flag.as_deref() == Some(PASS_FLAG)
    }
}

/// A history record labelled from its raw pass flag
#[derive(Debug, Clone)]
pub struct FlagVerdict {
    pub history: History,
    pub category: FailureCategory,
}

/// Evaluates the items of the window against the spec version each one
/// was ingested with, then classifies per unit.
pub fn classify_items(conn: &mut SqliteConnection, window: &Window) -> Result<Vec<ItemVerdict>> {
    let rows = dao::load_measurements(conn, window)?;
    let specs: HashMap<String, Spec> = dao::load_specs(conn, window.station)?
        .into_iter()
        .map(|s| (s.spec_key.clone(), s))
        .collect();

    let mut verdicts: Vec<ItemVerdict> = rows
        .into_iter()
        .map(|(m, h)| {
            let spec = m.spec_key.as_ref().and_then(|k| specs.get(k));
            let min_limit = spec.and_then(|s| s.min_limit);
            let max_limit = spec.and_then(|s| s.max_limit);
            ItemVerdict {
                history_id: h.history_id,
                tested_at: h.tested_at,
                finished_at: h.finished_at,
                local_test_id: h.local_test_id,
                serial: h.serial,
                jig: h.jig,
                item: m.item,
                value: m.value,
                min_limit,
                max_limit,
                detail: evaluate(m.value, min_limit, max_limit),
                category: FailureCategory::Pass,
            }
        })
        .collect();

    let categories = classify(&verdicts);
    for (v, c) in verdicts.iter_mut().zip(categories) {
        v.category = c;
    }
    info!(
        "Classified {} items of station {}",
        verdicts.len(),
        window.station
    );
    Ok(verdicts)
}

/// Classification from the raw pass flags. Records without a flag do not
/// apply to the station and are left out.
pub fn classify_flags(conn: &mut SqliteConnection, window: &Window) -> Result<Vec<FlagVerdict>> {
    let records = dao::load_flagged(conn, window)?;
    let categories = classify(&records);
    info!(
        "Classified {} records of station {}",
        records.len(),
        window.station
    );
    Ok(records
        .into_iter()
        .zip(categories)
        .map(|(history, category)| FlagVerdict { history, category })
        .collect())
}
