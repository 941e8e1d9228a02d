use std::collections::HashMap;

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use super::csvfile::{parse_number, RawTable, SERIAL_COLUMN};
use super::timefmt::{parse_timestamp, week_label};
use super::IngestOptions;
use crate::database::models::{NewHistory, NewProduct, Spec};
use crate::error::{Error, Result};
use crate::station::Station;

const STAMP_COLUMN: &str = "Stamp";
const ICOUNT_COLUMN: &str = "ICount";
const PC_COLUMN: &str = "PC";
const UNKNOWN_WEEK: &str = "UNKNOWN";

/// One history record with its measured items.
/// The database id is not known until the record is saved.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub history: NewHistory,
    pub values: Vec<ItemValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemValue {
    pub item: String,
    pub value: Option<f64>,
    pub spec_key: Option<String>,
}

/// Everything one CSV file contributes to the database
#[derive(Debug, Default)]
pub struct Batch {
    pub source: String,
    pub stations: Vec<Station>,
    pub products: Vec<NewProduct>,
    pub specs: Vec<Spec>,
    pub records: Vec<Record>,
}

struct StationLayout {
    station: Station,
    // (item column, spec key when the export carries limits for it)
    items: Vec<(String, Option<String>)>,
}

fn normalize_flag(raw: Option<&str>) -> Option<String> {
    match raw? {
        "o" | "O" => Some("O".to_string()),
        "x" | "X" => Some("X".to_string()),
        other => {
            debug!("Ignoring pass flag {:?}", other);
            None
        }
    }
}

fn local_test_column(table: &RawTable) -> Option<usize> {
    match table.headers.first().map(String::as_str) {
        Some("") | Some("Unnamed: 0") => Some(0),
        _ => None,
    }
}

// Item columns of a station plus one spec version per item with limits
fn layout(
    table: &RawTable,
    station: Station,
    opts: &IngestOptions,
    source: &str,
    now: NaiveDateTime,
    specs: &mut Vec<Spec>,
) -> StationLayout {
    let mut items = Vec::new();
    for header in &table.headers {
        let Some(rest) = header.strip_prefix(station.prefix()) else {
            continue;
        };
        if rest.is_empty()
            || station.is_reserved(header)
            || items.iter().any(|(i, _)| i == header)
        {
            continue;
        }
        if opts.exclude_items.iter().any(|x| x == header) {
            debug!("Item {} excluded by operator", header);
            continue;
        }
        let min_col = station.min_column(rest);
        let max_col = station.max_column(rest);
        if table.has(&min_col) || table.has(&max_col) {
            let spec = Spec {
                spec_key: uuid::Uuid::new_v4().hyphenated().to_string(),
                station: station.as_str().to_string(),
                item: header.clone(),
                min_limit: table.first_number(&min_col),
                max_limit: table.first_number(&max_col),
                source: Some(source.to_string()),
                created_at: now,
            };
            items.push((header.clone(), Some(spec.spec_key.clone())));
            specs.push(spec);
        } else if table.is_numeric(header) {
            items.push((header.clone(), None));
        }
    }
    StationLayout { station, items }
}

fn first_time(table: &RawTable, row: &[Option<String>], columns: &[String]) -> Option<NaiveDateTime> {
    columns
        .iter()
        .find_map(|c| table.cell(row, c).and_then(parse_timestamp))
}

fn make_record(
    table: &RawTable,
    row: &[Option<String>],
    serial: &str,
    layout: &StationLayout,
    opts: &IngestOptions,
    source: &str,
) -> Option<Record> {
    let station = layout.station;
    let pass_flag = normalize_flag(table.cell(row, &station.pass_column()));
    let values: Vec<ItemValue> = layout
        .items
        .iter()
        .filter_map(|(item, spec_key)| {
            let value = table.cell(row, item).and_then(parse_number);
            // items without a spec only matter when measured
            if value.is_none() && spec_key.is_none() {
                return None;
            }
            Some(ItemValue {
                item: item.clone(),
                value,
                spec_key: spec_key.clone(),
            })
        })
        .collect();

    if pass_flag.is_none() && values.iter().all(|v| v.value.is_none()) {
        return None;
    }

    let stamp = table.cell(row, STAMP_COLUMN).and_then(parse_timestamp);
    let tested_at = first_time(table, row, &station.time_columns()).or(stamp);
    let finished_at = table.cell(row, &station.stop_column()).and_then(parse_timestamp);
    let jig = table
        .cell(row, &station.pc_column())
        .or_else(|| table.cell(row, PC_COLUMN))
        .map(str::to_string);
    let test_week = match (&opts.week, &tested_at) {
        (Some(w), _) => w.clone(),
        (None, Some(t)) => week_label(t),
        (None, None) => UNKNOWN_WEEK.to_string(),
    };
    let local_test_id = local_test_column(table)
        .and_then(|i| row.get(i))
        .and_then(|c| c.clone());
    let icount = table
        .cell(row, ICOUNT_COLUMN)
        .and_then(parse_number)
        .map(|n| n as i32);

    Some(Record {
        history: NewHistory {
            serial: serial.to_string(),
            station: station.as_str().to_string(),
            local_test_id,
            icount,
            tested_at,
            finished_at,
            stamp,
            pass_flag,
            jig,
            test_week,
            source: Some(source.to_string()),
        },
        values,
    })
}

/// Splits a test log export into products, spec versions and history records.
/// `now` stamps the spec versions and products whose records carry no time.
pub fn reshape(
    table: &RawTable,
    opts: &IngestOptions,
    source: &str,
    now: NaiveDateTime,
) -> Result<Batch> {
    let stations: Vec<Station> = Station::ALL
        .into_iter()
        .filter(|s| table.has(&s.pass_column()))
        .collect();
    if stations.is_empty() {
        return Err(Error::MissingColumn(Station::Pcb.pass_column()));
    }

    let mut specs = Vec::new();
    let layouts: Vec<StationLayout> = stations
        .iter()
        .map(|s| layout(table, *s, opts, source, now, &mut specs))
        .collect();

    let mut records = Vec::new();
    let mut first_seen: HashMap<String, Option<NaiveDateTime>> = HashMap::new();
    let mut serial_order = Vec::new();
    let mut skipped = 0;
    for row in &table.rows {
        let Some(serial) = table.cell(row, SERIAL_COLUMN) else {
            skipped += 1;
            continue;
        };
        for layout in &layouts {
            if let Some(record) = make_record(table, row, serial, layout, opts, source) {
                let seen = first_seen.entry(serial.to_string()).or_insert_with(|| {
                    serial_order.push(serial.to_string());
                    None
                });
                if let Some(t) = record.history.tested_at {
                    *seen = Some(seen.map_or(t, |s| s.min(t)));
                }
                records.push(record);
            }
        }
    }
    if skipped > 0 {
        warn!("{}: skipped {} rows without serial number", source, skipped);
    }

    let products = serial_order
        .into_iter()
        .map(|serial| NewProduct {
            first_seen: first_seen.get(&serial).copied().flatten().unwrap_or(now),
            serial,
            model_name: opts.model_name.clone(),
            model_suffix: opts.model_suffix.clone(),
        })
        .collect();

    Ok(Batch {
        source: source.to_string(),
        stations,
        products,
        specs,
        records,
    })
}
