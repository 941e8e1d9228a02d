use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::NaiveDate;

use super::{classify, FailureCategory, Outcome};
use crate::database::models::History;

pub const NO_JIG: &str = "-";
pub const NOT_AVAILABLE: &str = "N/A";
pub const METRICS: [&str; 5] = ["총 테스트 수", "PASS", "가성불량", "진성불량", "FAIL"];
pub const METRIC_HEADER: &str = "지표";

/// Unit counts for one jig on one day
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DayCounts {
    pub total_test: usize,
    pub pass: usize,
    pub false_defect: usize,
    pub true_defect: usize,
    pub fail: usize,
}

impl DayCounts {
    fn values(&self) -> [usize; 5] {
        [
            self.total_test,
            self.pass,
            self.false_defect,
            self.true_defect,
            self.fail,
        ]
    }

    /// Classification happens inside the group, so a unit passing on another
    /// jig or another day does not turn this group's failure into a false defect.
    pub fn from_records(records: &[&History]) -> Self {
        let categories = classify(records);
        let mut total = HashSet::new();
        let mut passed = HashSet::new();
        let mut false_defect = HashSet::new();
        let mut true_defect = HashSet::new();
        for (r, c) in records.iter().zip(categories) {
            total.insert(r.serial());
            match c {
                FailureCategory::Pass => passed.insert(r.serial()),
                FailureCategory::FalseDefect => false_defect.insert(r.serial()),
                FailureCategory::TrueDefect => true_defect.insert(r.serial()),
            };
        }
        Self {
            total_test: total.len(),
            pass: passed.len(),
            false_defect: false_defect.len(),
            true_defect: true_defect.len(),
            fail: total.len() - passed.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JigReport {
    pub jig: String,
    pub days: BTreeMap<NaiveDate, DayCounts>,
}

/// Per jig, per day summary of a station
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// Every day present in the data, shared by all jig tables
    pub dates: Vec<NaiveDate>,
    /// Sorted by jig
    pub jigs: Vec<JigReport>,
}

impl Summary {
    /// Records without a test time cannot be placed on a day and are ignored.
    pub fn build(records: &[History]) -> Self {
        let mut groups: BTreeMap<String, BTreeMap<NaiveDate, Vec<&History>>> = BTreeMap::new();
        let mut dates = BTreeSet::new();
        for r in records {
            let Some(tested_at) = r.tested_at else {
                continue;
            };
            let day = tested_at.date();
            dates.insert(day);
            let jig = r.jig.clone().unwrap_or_else(|| NO_JIG.to_string());
            groups
                .entry(jig)
                .or_default()
                .entry(day)
                .or_default()
                .push(r);
        }
        let jigs = groups
            .into_iter()
            .map(|(jig, days)| JigReport {
                jig,
                days: days
                    .into_iter()
                    .map(|(day, recs)| (day, DayCounts::from_records(&recs)))
                    .collect(),
            })
            .collect();
        Self {
            dates: dates.into_iter().collect(),
            jigs,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.jigs.is_empty()
    }

    pub fn header(&self) -> Vec<String> {
        std::iter::once(METRIC_HEADER.to_string())
            .chain(self.dates.iter().map(|d| d.format("%y%m%d").to_string()))
            .collect()
    }

    /// Metric rows of one jig, `N/A` on days without tests
    pub fn rows(&self, report: &JigReport) -> Vec<Vec<String>> {
        METRICS
            .iter()
            .enumerate()
            .map(|(i, metric)| {
                std::iter::once(metric.to_string())
                    .chain(self.dates.iter().map(|d| match report.days.get(d) {
                        Some(counts) => counts.values()[i].to_string(),
                        None => NOT_AVAILABLE.to_string(),
                    }))
                    .collect()
            })
            .collect()
    }
}
