use std::io::Write;

use chrono::NaiveDateTime;

use super::summary::Summary;
use super::{FlagVerdict, ItemVerdict};
use crate::error::Result;
use crate::station::Station;

// Spreadsheet programs need it to pick UTF-8 for the Korean labels
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub const ITEM_HEADER: [&str; 11] = [
    "tested_at",
    "finished_at",
    "local_test_id",
    "serial",
    "jig",
    "item",
    "value",
    "min_limit",
    "max_limit",
    "spec_result",
    "final_category",
];

pub const FLAG_HEADER: [&str; 6] = [
    "tested_at",
    "serial",
    "jig",
    "test_week",
    "pass_flag",
    "final_category",
];

pub fn default_report_name(station: Station, now: NaiveDateTime) -> String {
    format!(
        "{}_analysis_report_{}.csv",
        station,
        now.format("%Y%m%d_%H%M%S")
    )
}

pub fn fmt_time(t: &Option<NaiveDateTime>) -> String {
    t.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

pub fn fmt_number(v: &Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

pub fn item_row(v: &ItemVerdict) -> Vec<String> {
    vec![
        fmt_time(&v.tested_at),
        fmt_time(&v.finished_at),
        v.local_test_id.clone().unwrap_or_default(),
        v.serial.clone(),
        v.jig.clone().unwrap_or_default(),
        v.item.clone(),
        fmt_number(&v.value),
        fmt_number(&v.min_limit),
        fmt_number(&v.max_limit),
        v.detail.to_string(),
        v.category.to_string(),
    ]
}

pub fn flag_row(v: &FlagVerdict) -> Vec<String> {
    let h = &v.history;
    vec![
        fmt_time(&h.tested_at),
        h.serial.clone(),
        h.jig.clone().unwrap_or_default(),
        h.test_week.clone(),
        h.pass_flag.clone().unwrap_or_default(),
        v.category.to_string(),
    ]
}

fn write_block<W: Write>(out: &mut W, header: &[String], rows: &[Vec<String>]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(header)?;
    for row in rows {
        wtr.write_record(row)?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    out.write_all(&bytes)?;
    Ok(())
}

/// One table per jig, separated by an empty line
pub fn write_summary<W: Write>(out: &mut W, summary: &Summary) -> Result<()> {
    out.write_all(UTF8_BOM)?;
    let header = summary.header();
    for jig in &summary.jigs {
        write_block(out, &header, &summary.rows(jig))?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_items<W: Write>(out: &mut W, verdicts: &[ItemVerdict]) -> Result<()> {
    out.write_all(UTF8_BOM)?;
    let header: Vec<String> = ITEM_HEADER.iter().map(|h| h.to_string()).collect();
    let rows: Vec<Vec<String>> = verdicts.iter().map(item_row).collect();
    write_block(out, &header, &rows)?;
    out.flush()?;
    Ok(())
}

pub fn write_flags<W: Write>(out: &mut W, verdicts: &[FlagVerdict]) -> Result<()> {
    out.write_all(UTF8_BOM)?;
    let header: Vec<String> = FLAG_HEADER.iter().map(|h| h.to_string()).collect();
    let rows: Vec<Vec<String>> = verdicts.iter().map(flag_row).collect();
    write_block(out, &header, &rows)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::summary::{DayCounts, JigReport};
    use crate::analysis::{FailureCategory, SpecResult};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    #[test]
    fn report_name() {
        let now = NaiveDate::from_ymd_opt(2025, 10, 22)
            .unwrap()
            .and_hms_opt(9, 5, 7)
            .unwrap();
        assert_eq!(
            default_report_name(Station::Pcb, now),
            "pcb_analysis_report_20251022_090507.csv"
        );
    }

    #[test]
    fn item_csv_has_bom_and_labels() {
        let v = ItemVerdict {
            history_id: 1,
            tested_at: None,
            finished_at: None,
            local_test_id: Some("7".into()),
            serial: "A001".into(),
            jig: None,
            item: "PcbLed".into(),
            value: Some(1.5),
            min_limit: Some(2.0),
            max_limit: Some(4.0),
            detail: SpecResult::Below,
            category: FailureCategory::FalseDefect,
        };
        let mut out = Vec::new();
        write_items(&mut out, &[v]).unwrap();
        assert!(out.starts_with(UTF8_BOM));
        let text = String::from_utf8(out[UTF8_BOM.len()..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("tested_at,finished_at"));
        assert_eq!(lines.next().unwrap(), ",,7,A001,,PcbLed,1.5,2,4,미달,가성불량");
    }

    #[test]
    fn summary_csv_has_one_block_per_jig() {
        let d1 = NaiveDate::from_ymd_opt(2025, 10, 22).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2025, 10, 23).unwrap();
        let counts = DayCounts {
            total_test: 2,
            pass: 1,
            false_defect: 0,
            true_defect: 1,
            fail: 1,
        };
        let summary = Summary {
            dates: vec![d1, d2],
            jigs: vec![
                JigReport {
                    jig: "J1".into(),
                    days: BTreeMap::from([(d1, counts), (d2, counts)]),
                },
                JigReport {
                    jig: "J2".into(),
                    days: BTreeMap::from([(d2, counts)]),
                },
            ],
        };
        let mut out = Vec::new();
        write_summary(&mut out, &summary).unwrap();
        assert!(out.starts_with(UTF8_BOM));

        let text = String::from_utf8(out[UTF8_BOM.len()..].to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        // header and five metrics per jig, each block followed by a blank line
        assert_eq!(lines.len(), 14);
        let headers: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, l)| **l == "지표,251022,251023")
            .map(|(i, _)| i)
            .collect();
        assert_eq!(headers, vec![0, 7]);
        assert_eq!(lines[6], "");
        assert_eq!(lines[13], "");
        assert!(lines[1].ends_with(",2,2"));
        assert!(lines[8].ends_with(",N/A,2"));
        assert_eq!(lines[12], "FAIL,N/A,1");
    }
}
