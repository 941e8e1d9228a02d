use chrono::{Duration, NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use rcinspect::ingest::timefmt::parse_timestamp;
use rcinspect::Station;

pub fn parse() -> Cli {
    Cli::parse()
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Turn console debugging information on
    #[arg(short, long)]
    pub console: bool,

    /// Log to a file
    #[arg(short, long, value_name = "FILE", default_value = "rcinspect.log")]
    pub log_file: PathBuf,

    /// Verbosity: -v info, -vv debug
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// SQLite database file, overrides DATABASE_URL
    #[arg(short, long, value_name = "URL")]
    pub database: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply pending migrations and show database identity
    Database {},

    /// Load test log CSV exports
    Ingest {
        /// CSV files to load
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Model name stored with new units
        #[arg(long)]
        model_name: Option<String>,

        /// Model suffix stored with new units
        #[arg(long)]
        model_suffix: Option<String>,

        /// Zero based header row, used when no SNumber row is found
        #[arg(long, value_name = "ROW")]
        header_row: Option<usize>,

        /// Test week label such as W42
        #[arg(short, long)]
        week: Option<String>,

        /// Measurement columns to leave out
        #[arg(short, long, value_name = "COLUMN", action = clap::ArgAction::Append)]
        exclude: Vec<String>,

        /// Parse and report only
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Stored records per year, week, model suffix and station
    Status {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List tables and views
    Tables {},

    /// Show raw rows of a table
    Browse {
        table: String,

        /// Comma separated columns
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,

        #[arg(long)]
        limit: Option<i64>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Run a read only SQL statement
    Query {
        sql: String,

        #[arg(long)]
        limit: Option<i64>,

        /// column:op:value with op one of contains, equals, starts, ends
        #[arg(short, long, action = clap::ArgAction::Append)]
        filter: Vec<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Classify failures as false or true defects
    Classify {
        #[command(flatten)]
        window: WindowArgs,

        /// Verdict source
        #[arg(short, long, value_enum, default_value_t = Mode::Items)]
        mode: Mode,

        /// Write the verdicts to a CSV file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Rows shown on screen
        #[arg(long, default_value_t = 20)]
        show: usize,
    },

    /// Daily per jig summary report
    Report {
        #[command(flatten)]
        window: WindowArgs,

        /// Report file, named after the station and time when absent
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Delete stored records
    Delete {
        #[command(subcommand)]
        target: DeleteTarget,
    },

    /// Copy the database to a new file
    Export { path: PathBuf },
}

#[derive(Subcommand)]
pub enum DeleteTarget {
    /// One test week of one model suffix
    Week {
        #[arg(long)]
        year: String,

        #[arg(long)]
        suffix: String,

        #[arg(long)]
        week: String,
    },

    /// Records tested within a time range
    Range {
        #[arg(long, value_parser = parse_from)]
        from: NaiveDateTime,

        #[arg(long, value_parser = parse_until)]
        to: NaiveDateTime,

        #[arg(short, long, value_enum)]
        station: Option<StationArg>,
    },
}

#[derive(Args)]
pub struct WindowArgs {
    #[arg(short, long, value_enum)]
    pub station: StationArg,

    /// Start time, inclusive
    #[arg(long, value_parser = parse_from)]
    pub from: Option<NaiveDateTime>,

    /// End time, exclusive; a bare date includes that whole day
    #[arg(long, value_parser = parse_until)]
    pub to: Option<NaiveDateTime>,

    #[arg(short, long)]
    pub jig: Option<String>,

    #[arg(short, long)]
    pub week: Option<String>,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
#[clap(rename_all = "lower")]
pub enum StationArg {
    /// PCB test
    Pcb,

    /// Firmware download
    Fw,

    /// RF transmit test
    Rftx,

    /// Semi assembly test
    Semi,

    /// Battery ADC test
    Batadc,
}

impl From<StationArg> for Station {
    fn from(arg: StationArg) -> Self {
        match arg {
            StationArg::Pcb => Station::Pcb,
            StationArg::Fw => Station::Fw,
            StationArg::Rftx => Station::RfTx,
            StationArg::Semi => Station::SemiAssy,
            StationArg::Batadc => Station::Batadc,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
#[clap(rename_all = "lower")]
pub enum Mode {
    /// Evaluate each measurement against its limits
    Items,

    /// Use the recorded pass flag
    Flags,
}

fn parse_from(s: &str) -> Result<NaiveDateTime, String> {
    parse_timestamp(s).ok_or_else(|| format!("invalid date or time: {s}"))
}

fn parse_until(s: &str) -> Result<NaiveDateTime, String> {
    let t = parse_from(s)?;
    // a bare date covers the whole day
    match NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d") {
        Ok(_) => Ok(t + Duration::days(1)),
        Err(_) => Ok(t),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn bare_end_date_includes_the_day() {
        assert_eq!(parse_until("2025-10-22"), Ok(at(23, 0)));
        assert_eq!(parse_until(" 2025-10-22 "), Ok(at(23, 0)));
    }

    #[test]
    fn end_time_is_kept() {
        assert_eq!(parse_until("2025-10-22 08:00:00"), Ok(at(22, 8)));
        assert_eq!(parse_from("2025-10-22"), Ok(at(22, 0)));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_until("next tuesday").is_err());
        assert!(parse_from("").is_err());
    }
}
