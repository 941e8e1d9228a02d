use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sql_types::Text;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::database::models::HistoryView;
use crate::database::Db;
use crate::error::{Error, Result};
use crate::station::Station;

// Keeps IN lists well under SQLite's bound parameter limit
const CHUNK: usize = 500;

/// One line of the stored data overview
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRow {
    pub year: String,
    pub test_week: String,
    pub model_suffix: String,
    pub station: String,
    pub records: usize,
    pub units: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeletedCounts {
    pub records: usize,
    pub measurements: usize,
    pub products: usize,
    pub specs: usize,
}

impl DeletedCounts {
    pub fn is_empty(&self) -> bool {
        self.records == 0
    }
}

fn load_view(conn: &mut SqliteConnection) -> Result<Vec<HistoryView>> {
    use crate::database::views::history_v::dsl::*;

    let sql = history_v.select(HistoryView::as_select());
    debug!("{:?}", diesel::debug_query::<Db, _>(&sql).to_string());
    Ok(sql.load(conn)?)
}

/// Records and distinct units per year, week, model suffix and station.
/// Newest weeks first.
pub fn status(conn: &mut SqliteConnection) -> Result<Vec<StatusRow>> {
    type Key = (Reverse<String>, Reverse<String>, String, String);
    let mut groups: BTreeMap<Key, (usize, HashSet<String>)> = BTreeMap::new();
    for row in load_view(conn)? {
        let key = (
            Reverse(row.year.unwrap_or_default()),
            Reverse(row.test_week),
            row.model_suffix,
            row.station,
        );
        let entry = groups.entry(key).or_default();
        entry.0 += 1;
        entry.1.insert(row.serial);
    }
    Ok(groups
        .into_iter()
        .map(
            |((Reverse(year), Reverse(test_week), model_suffix, station), (records, units))| {
                StatusRow {
                    year,
                    test_week,
                    model_suffix,
                    station,
                    records,
                    units: units.len(),
                }
            },
        )
        .collect())
}

fn delete_ids(conn: &mut SqliteConnection, ids: &[i32]) -> Result<DeletedCounts> {
    use crate::database::schema::{history_t, measurement_t, product_t, spec_t};

    let mut counts = DeletedCounts::default();
    for chunk in ids.chunks(CHUNK) {
        let sql = diesel::delete(measurement_t::table)
            .filter(measurement_t::history_id.eq_any(chunk));
        debug!("{:?}", diesel::debug_query::<Db, _>(&sql).to_string());
        counts.measurements += sql.execute(conn)?;

        let sql = diesel::delete(history_t::table).filter(history_t::history_id.eq_any(chunk));
        debug!("{:?}", diesel::debug_query::<Db, _>(&sql).to_string());
        counts.records += sql.execute(conn)?;
    }

    let sql = diesel::delete(product_t::table).filter(diesel::dsl::not(
        product_t::serial.eq_any(history_t::table.select(history_t::serial)),
    ));
    debug!("{:?}", diesel::debug_query::<Db, _>(&sql).to_string());
    counts.products = sql.execute(conn)?;

    let sql = diesel::delete(spec_t::table).filter(diesel::dsl::not(
        spec_t::spec_key.nullable().eq_any(
            measurement_t::table
                .filter(measurement_t::spec_key.is_not_null())
                .select(measurement_t::spec_key),
        ),
    ));
    debug!("{:?}", diesel::debug_query::<Db, _>(&sql).to_string());
    counts.specs = sql.execute(conn)?;
    Ok(counts)
}

fn delete_selected(conn: &mut SqliteConnection, ids: Vec<i32>, what: &str) -> Result<DeletedCounts> {
    if ids.is_empty() {
        warn!("No records found for {}", what);
        return Ok(DeletedCounts::default());
    }
    let counts = conn.transaction::<_, Error, _>(|conn| delete_ids(conn, &ids))?;
    info!(
        "Deleted {} records, {} measurements, {} products, {} specs for {}",
        counts.records, counts.measurements, counts.products, counts.specs, what
    );
    Ok(counts)
}

/// Removes one test week of one model suffix
pub fn delete_week(
    conn: &mut SqliteConnection,
    the_year: &str,
    suffix: &str,
    week: &str,
) -> Result<DeletedCounts> {
    use crate::database::views::history_v::dsl::*;

    let sql = history_v
        .filter(year.eq(the_year))
        .filter(model_suffix.eq(suffix))
        .filter(test_week.eq(week))
        .select(history_id);
    debug!("{:?}", diesel::debug_query::<Db, _>(&sql).to_string());
    let ids: Vec<i32> = sql.load(conn)?;
    delete_selected(conn, ids, &format!("{the_year} {suffix} {week}"))
}

/// Removes the records tested in `[from, to)`, optionally of one station only
pub fn delete_range(
    conn: &mut SqliteConnection,
    from: NaiveDateTime,
    to: NaiveDateTime,
    the_station: Option<Station>,
) -> Result<DeletedCounts> {
    use crate::database::schema::history_t::dsl::*;

    let mut sql = history_t
        .filter(tested_at.ge(from))
        .filter(tested_at.lt(to))
        .select(history_id)
        .into_boxed();
    if let Some(s) = the_station {
        sql = sql.filter(station.eq(s.as_str()));
    }
    debug!("{:?}", diesel::debug_query::<Db, _>(&sql).to_string());
    let ids: Vec<i32> = sql.load(conn)?;
    let what = match the_station {
        Some(s) => format!("{s} from {from} to {to}"),
        None => format!("all stations from {from} to {to}"),
    };
    delete_selected(conn, ids, &what)
}

/// Writes a compacted copy of the whole database to a new file
pub fn export_database(conn: &mut SqliteConnection, path: &Path) -> Result<()> {
    if path.exists() {
        return Err(Error::FileExists(path.display().to_string()));
    }
    let target = path.to_string_lossy().to_string();
    diesel::sql_query("VACUUM INTO ?")
        .bind::<Text, _>(&target)
        .execute(conn)?;
    info!("Database exported to {}", target);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::init;
    use crate::database::models::{Measurement, NewHistory, NewProduct, Spec};
    use crate::database::schema::{history_t, measurement_t, product_t, spec_t};
    use chrono::NaiveDate;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, day)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn seed(conn: &mut SqliteConnection) {
        for (serial, suffix) in [("A001", "PCB"), ("B001", "PCB"), ("C001", "SUB")] {
            diesel::insert_into(product_t::table)
                .values(&NewProduct {
                    serial: serial.into(),
                    model_name: "SJ_TM2360E".into(),
                    model_suffix: suffix.into(),
                    first_seen: at(20),
                })
                .execute(conn)
                .unwrap();
        }
        diesel::insert_into(spec_t::table)
            .values(&Spec {
                spec_key: "k1".into(),
                station: "pcb".into(),
                item: "PcbLed".into(),
                min_limit: Some(1.0),
                max_limit: Some(2.0),
                source: None,
                created_at: at(20),
            })
            .execute(conn)
            .unwrap();
        let rows = [
            ("A001", "pcb", 20, "W43"),
            ("A001", "pcb", 21, "W43"),
            ("B001", "fw", 28, "W44"),
            ("C001", "pcb", 22, "W43"),
        ];
        for (i, (serial, station, day, week)) in rows.iter().enumerate() {
            diesel::insert_into(history_t::table)
                .values(&NewHistory {
                    serial: serial.to_string(),
                    station: station.to_string(),
                    local_test_id: None,
                    icount: None,
                    tested_at: Some(at(*day)),
                    finished_at: None,
                    stamp: None,
                    pass_flag: Some("O".into()),
                    jig: Some("J1".into()),
                    test_week: week.to_string(),
                    source: None,
                })
                .execute(conn)
                .unwrap();
            diesel::insert_into(measurement_t::table)
                .values(&Measurement {
                    history_id: i as i32 + 1,
                    item: "PcbLed".into(),
                    value: Some(1.5),
                    spec_key: (*serial == "A001").then(|| "k1".to_string()),
                })
                .execute(conn)
                .unwrap();
        }
    }

    #[test]
    fn status_groups_newest_first() {
        let mut conn = init(":memory:").unwrap();
        seed(&mut conn);
        let rows = status(&mut conn).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].test_week, "W44");
        assert_eq!(rows[0].station, "fw");
        assert_eq!(rows[1].model_suffix, "PCB");
        assert_eq!(rows[1].records, 2);
        assert_eq!(rows[1].units, 1);
        assert_eq!(rows[1].year, "2025");
    }

    #[test]
    fn deleting_a_week_removes_orphans_only() {
        let mut conn = init(":memory:").unwrap();
        seed(&mut conn);
        let counts = delete_week(&mut conn, "2025", "PCB", "W43").unwrap();
        assert_eq!(
            counts,
            DeletedCounts {
                records: 2,
                measurements: 2,
                products: 1,
                specs: 1,
            }
        );
        let serials: Vec<String> = product_t::table
            .select(product_t::serial)
            .order(product_t::serial)
            .load(&mut conn)
            .unwrap();
        assert_eq!(serials, vec!["B001", "C001"]);
    }

    #[test]
    fn deleting_a_range_of_one_station() {
        let mut conn = init(":memory:").unwrap();
        seed(&mut conn);
        let counts = delete_range(&mut conn, at(21), at(29), Some(Station::Pcb)).unwrap();
        assert_eq!(counts.records, 2);
        // A001 still has its first record
        assert_eq!(counts.products, 1);
        assert_eq!(counts.specs, 0);
    }

    #[test]
    fn nothing_to_delete() {
        let mut conn = init(":memory:").unwrap();
        seed(&mut conn);
        let counts = delete_week(&mut conn, "2024", "PCB", "W01").unwrap();
        assert!(counts.is_empty());
    }

    #[test]
    fn export_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = init(":memory:").unwrap();
        seed(&mut conn);
        let path = dir.path().join("copy.db");
        export_database(&mut conn, &path).unwrap();
        assert!(path.exists());
        assert!(matches!(
            export_database(&mut conn, &path),
            Err(Error::FileExists(_))
        ));
    }
}
