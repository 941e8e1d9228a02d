use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use diesel::SqliteConnection;

use rcinspect::analysis::{self, summary::Summary, FailureCategory, SpecResult, Window};
use rcinspect::browse::{self, Filter};
use rcinspect::ingest::{self, IngestOptions};
use rcinspect::{database, maintenance, Station};

// Two header lines ahead of the column row, as the line PCs export it
const EXPORT: &str = "\
Test Log Export
Line 2
,SNumber,Stamp,ICount,PcbStartTime,PcbStopTime,PcbPass,PcbPC,PcbLed,PcbMinLed,PcbMaxLed,PcbIrCurr,FwPass,FwStamp,FwPC
0,=\"A001\",2025-10-22 08:00:00,1,=\"20251022080000\",=\"20251022080030\",=\"X\",JIG1,1.0,2.0,4.0,10.5,,,
1,=\"A001\",2025-10-22 08:05:00,2,=\"20251022080500\",=\"20251022080530\",=\"O\",JIG1,3.0,2.0,4.0,,O,2025-10-22 09:00:00,FW7
2,=\"B001\",2025-10-22 08:10:00,1,=\"20251022081000\",=\"20251022081030\",=\"X\",JIG2,0,2.0,4.0,,,,
";

fn setup() -> (tempfile::TempDir, SqliteConnection, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("history.db");
    let conn = database::init(db.to_str().unwrap()).unwrap();
    let csv = dir.path().join("line2_1022.csv");
    fs::write(&csv, EXPORT).unwrap();
    (dir, conn, csv)
}

fn ingest(conn: &mut SqliteConnection, csv: &Path) -> ingest::IngestSummary {
    let opts = IngestOptions::from_config(conn).unwrap();
    ingest::ingest_file(conn, csv, &opts).unwrap()
}

fn day(d: u32) -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 10, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

#[test]
fn ingest_stores_units_records_and_measurements() {
    let (_dir, mut conn, csv) = setup();
    let summary = ingest(&mut conn, &csv);
    assert_eq!(summary.source, "line2_1022.csv");
    assert_eq!(summary.stations, vec![Station::Pcb, Station::Fw]);
    assert_eq!(summary.rows, 3);
    assert_eq!(summary.saved.products, 2);
    assert_eq!(summary.saved.records, 4);

    // Known serials are not inserted twice
    let again = ingest(&mut conn, &csv);
    assert_eq!(again.saved.products, 0);
    assert_eq!(again.saved.records, 4);
}

#[test]
fn item_classification_uses_the_stored_limits() {
    let (_dir, mut conn, csv) = setup();
    ingest(&mut conn, &csv);

    let verdicts = analysis::classify_items(&mut conn, &Window::new(Station::Pcb)).unwrap();
    let led: Vec<_> = verdicts.iter().filter(|v| v.item == "PcbLed").collect();
    assert_eq!(led.len(), 3);
    for v in &led {
        assert_eq!(v.min_limit, Some(2.0));
        assert_eq!(v.max_limit, Some(4.0));
    }

    let a_below = led
        .iter()
        .find(|v| v.serial == "A001" && v.detail == SpecResult::Below)
        .unwrap();
    assert_eq!(a_below.category, FailureCategory::FalseDefect);

    // A zero reading is excluded, and B001 never passes
    let b = led.iter().find(|v| v.serial == "B001").unwrap();
    assert_eq!(b.detail, SpecResult::Excluded);
    assert_eq!(b.category, FailureCategory::TrueDefect);
}

#[test]
fn flag_classification_and_daily_summary() {
    let (_dir, mut conn, csv) = setup();
    ingest(&mut conn, &csv);

    let mut window = Window::new(Station::Pcb);
    window.from = Some(day(22));
    window.to = Some(day(23));
    let verdicts = analysis::classify_flags(&mut conn, &window).unwrap();
    assert_eq!(verdicts.len(), 3);
    let categories: Vec<_> = verdicts.iter().map(|v| v.category).collect();
    assert_eq!(
        categories,
        vec![
            FailureCategory::FalseDefect,
            FailureCategory::Pass,
            FailureCategory::TrueDefect
        ]
    );

    let records: Vec<_> = verdicts.into_iter().map(|v| v.history).collect();
    let summary = Summary::build(&records);
    assert_eq!(summary.header(), vec!["지표", "251022"]);
    let jig1 = summary.rows(&summary.jigs[0]);
    assert_eq!(summary.jigs[0].jig, "JIG1");
    assert_eq!(jig1[0], vec!["총 테스트 수", "1"]);
    assert_eq!(jig1[2], vec!["가성불량", "1"]);
    let jig2 = summary.rows(&summary.jigs[1]);
    assert_eq!(jig2[3], vec!["진성불량", "1"]);
    assert_eq!(jig2[4], vec!["FAIL", "1"]);

    window.jig = Some("JIG2".into());
    assert_eq!(analysis::classify_flags(&mut conn, &window).unwrap().len(), 1);

    window.from = Some(day(23));
    window.to = None;
    window.jig = None;
    assert!(analysis::classify_flags(&mut conn, &window).unwrap().is_empty());
}

#[test]
fn query_counts_limits_and_filters() {
    let (_dir, mut conn, csv) = setup();
    ingest(&mut conn, &csv);

    let result = browse::run_query(
        &mut conn,
        "SELECT serial, station, pass_flag FROM history_t ORDER BY tested_at LIMIT 1;",
        Some(2),
        &[],
    )
    .unwrap();
    assert_eq!(result.columns, vec!["serial", "station", "pass_flag"]);
    assert_eq!(result.total, 4);
    assert_eq!(result.rows.len(), 2);

    let filters: Vec<Filter> = vec!["pass_flag:equals:o".parse().unwrap()];
    let result = browse::run_query(
        &mut conn,
        "SELECT serial, station, pass_flag FROM history_t",
        None,
        &filters,
    )
    .unwrap();
    assert_eq!(result.rows.len(), 2);

    assert!(browse::run_query(&mut conn, "DROP TABLE history_t", None, &[]).is_err());

    let tables = browse::list_tables(&mut conn).unwrap();
    assert!(tables.contains(&"history_t".to_string()));
    assert!(tables.contains(&"history_v".to_string()));
    assert!(!tables.iter().any(|t| t.starts_with("__diesel")));

    let rows = browse::browse_table(&mut conn, "product_t", &["serial".into()], None).unwrap();
    assert_eq!(rows.columns, vec!["serial"]);
    assert_eq!(rows.rows.len(), 2);
    assert!(browse::browse_table(&mut conn, "nope_t", &[], None).is_err());
    assert!(browse::browse_table(&mut conn, "product_t", &["nope".into()], None).is_err());
}

#[test]
fn deletion_keeps_units_with_remaining_history() {
    let (_dir, mut conn, csv) = setup();
    ingest(&mut conn, &csv);

    let counts =
        maintenance::delete_range(&mut conn, day(22), day(23), Some(Station::Fw)).unwrap();
    assert_eq!(counts.records, 1);
    assert_eq!(counts.products, 0);

    let status = maintenance::status(&mut conn).unwrap();
    assert_eq!(status.len(), 1);
    assert_eq!(status[0].test_week, "W43");
    assert_eq!(status[0].records, 3);
    assert_eq!(status[0].units, 2);

    let counts = maintenance::delete_week(&mut conn, "2025", "PCB", "W43").unwrap();
    assert_eq!(counts.records, 3);
    assert_eq!(counts.products, 2);
    assert_eq!(counts.specs, 1);
    assert!(maintenance::status(&mut conn).unwrap().is_empty());
}

#[test]
fn failing_files_do_not_stop_the_batch() {
    let (dir, mut conn, csv) = setup();
    let no_serial = dir.path().join("no_serial.csv");
    fs::write(&no_serial, "Serial,PcbPass\nA001,O\n").unwrap();
    let missing = dir.path().join("missing.csv");

    let opts = IngestOptions::from_config(&mut conn).unwrap();
    let summaries = ingest::ingest_files(&mut conn, &[missing, no_serial, csv], &opts);
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].source, "line2_1022.csv");
    assert_eq!(summaries[0].saved.records, 4);

    let status = maintenance::status(&mut conn).unwrap();
    assert_eq!(status.iter().map(|r| r.records).sum::<usize>(), 4);
}

#[test]
fn quoted_semicolon_is_one_statement() {
    let (_dir, mut conn, _csv) = setup();
    let result = browse::run_query(&mut conn, "SELECT 'a;b' AS x", None, &[]).unwrap();
    assert_eq!(result.columns, vec!["x"]);
    assert_eq!(result.rows, vec![vec![serde_json::json!("a;b")]]);
    assert_eq!(result.total, 1);
}
