pub mod csvfile;
pub mod dao;
pub mod reshape;
pub mod timefmt;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::NaiveDateTime;
use diesel::SqliteConnection;
use tracing::{error, info};

use crate::database;
use crate::error::Result;
use crate::station::Station;
use dao::SavedCounts;

const DEFAULT_MODEL_NAME: &str = "SJ_TM2360E";
const DEFAULT_MODEL_SUFFIX: &str = "PCB";
const DEFAULT_HEADER_ROW: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct IngestOptions {
    pub model_name: String,
    pub model_suffix: String,
    /// Zero based CSV row holding the header, used when sniffing fails
    pub header_row: usize,
    /// Week label such as `W42`; derived from the test time when absent
    pub week: Option<String>,
    pub exclude_items: Vec<String>,
    pub dry_run: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL_NAME.into(),
            model_suffix: DEFAULT_MODEL_SUFFIX.into(),
            header_row: DEFAULT_HEADER_ROW,
            week: None,
            exclude_items: Vec::new(),
            dry_run: false,
        }
    }
}

impl IngestOptions {
    /// Defaults persisted in the `ingest` section of config_t
    pub fn from_config(conn: &mut SqliteConnection) -> Result<Self> {
        let mut opts = Self::default();
        for item in database::get_config(conn, "ingest")? {
            match item.property.as_str() {
                "model_name" => opts.model_name = item.value,
                "model_suffix" => opts.model_suffix = item.value,
                "header_row" => match item.value.parse::<usize>() {
                    Ok(n) => opts.header_row = n,
                    Err(_) => error!("Invalid ingest.header_row {}", item.value),
                },
                &_ => error!("{}", item.property),
            }
        }
        Ok(opts)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestSummary {
    pub source: String,
    pub stations: Vec<Station>,
    pub rows: usize,
    pub saved: SavedCounts,
}

pub fn ingest_reader<R: Read>(
    conn: &mut SqliteConnection,
    reader: R,
    source: &str,
    opts: &IngestOptions,
    now: NaiveDateTime,
) -> Result<IngestSummary> {
    let table = csvfile::read_table(reader, opts.header_row)?;
    let batch = reshape::reshape(&table, opts, source, now)?;
    info!(
        "{}: {} rows, stations {:?}, {} units, {} records, {} spec items",
        source,
        table.rows.len(),
        batch.stations,
        batch.products.len(),
        batch.records.len(),
        batch.specs.len()
    );
    let saved = if opts.dry_run {
        info!("{}: dry run, nothing saved", source);
        SavedCounts::default()
    } else {
        let saved = dao::save(conn, &batch)?;
        info!(
            "{}: saved {} new units, {} records, {} measurements",
            source, saved.products, saved.records, saved.measurements
        );
        saved
    };
    Ok(IngestSummary {
        source: source.to_string(),
        stations: batch.stations,
        rows: table.rows.len(),
        saved,
    })
}

pub fn ingest_file(
    conn: &mut SqliteConnection,
    path: &Path,
    opts: &IngestOptions,
) -> Result<IngestSummary> {
    let file = File::open(path)?;
    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    ingest_reader(
        conn,
        BufReader::new(file),
        &source,
        opts,
        crate::now(),
    )
}

/// Ingests every file, carrying on past files that fail
pub fn ingest_files(
    conn: &mut SqliteConnection,
    paths: &[impl AsRef<Path>],
    opts: &IngestOptions,
) -> Vec<IngestSummary> {
    let mut summaries = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        match ingest_file(conn, path, opts) {
            Ok(summary) => summaries.push(summary),
            Err(e) => error!("{}: {}", path.display(), e),
        }
    }
    summaries
}
