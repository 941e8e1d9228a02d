use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tracing::{error, info, Level};

use crate::argparse::{Cli, Commands, DeleteTarget, Mode, WindowArgs};
use rcinspect::analysis::{self, export, summary::Summary, FailureCategory, Window};
use rcinspect::browse::{self, filter::cell_text, Filter, QueryResult};
use rcinspect::ingest::{self, IngestOptions};
use rcinspect::{database, maintenance, text, Station};

// Include these modules as part of the binary crate, not the library crate
// as this contains the actual implementation of the logging facility
mod argparse;
mod logging;

fn window(args: WindowArgs) -> Window {
    Window {
        station: Station::from(args.station),
        from: args.from,
        to: args.to,
        jig: args.jig,
        week: args.week,
    }
}

fn print_result(result: &QueryResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }
    let rows: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();
    print!("{}", text::render(&result.columns, &rows));
    println!(
        "{} rows shown, {} in total (limit {})",
        rows.len(),
        result.total,
        result.limit
    );
    Ok(())
}

fn print_categories<'a>(categories: impl Iterator<Item = &'a FailureCategory>) {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for c in categories {
        *counts.entry(c.to_string()).or_default() += 1;
    }
    let rows: Vec<Vec<String>> = counts
        .into_iter()
        .map(|(c, n)| vec![c, n.to_string()])
        .collect();
    print!("{}", text::render(&["category", "rows"], &rows));
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if path.exists() {
        bail!(rcinspect::Error::FileExists(path.display().to_string()));
    }
    Ok(BufWriter::new(File::create(path)?))
}

fn main() -> Result<()> {
    let cli = argparse::parse();

    let Cli {
        console,
        log_file,
        verbose,
        database,
        command,
    } = cli;

    let level = match verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };

    let _guards = logging::init(level, console, Some(&log_file));
    let result = rcinspect::get_database_url(database)
        .map_err(anyhow::Error::from)
        .and_then(|url| run(command, &url));
    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}

fn run(command: Commands, database_url: &str) -> Result<()> {
    let conn = &mut database::init(database_url)?;

    match command {
        Commands::Database {} => {
            println!(
                "{}: version {}, UUID {}",
                database_url,
                database::get_database_version(conn)?,
                database::get_database_uuid(conn)?
            );
        }

        Commands::Ingest {
            files,
            model_name,
            model_suffix,
            header_row,
            week,
            exclude,
            dry_run,
        } => {
            let mut opts = IngestOptions::from_config(conn)?;
            if let Some(name) = model_name {
                opts.model_name = name;
            }
            if let Some(suffix) = model_suffix {
                opts.model_suffix = suffix;
            }
            if let Some(row) = header_row {
                opts.header_row = row;
            }
            opts.week = week;
            opts.exclude_items = exclude;
            opts.dry_run = dry_run;

            let summaries = ingest::ingest_files(conn, &files, &opts);
            let rows: Vec<Vec<String>> = summaries
                .iter()
                .map(|s| {
                    vec![
                        s.source.clone(),
                        s.stations
                            .iter()
                            .map(Station::to_string)
                            .collect::<Vec<_>>()
                            .join(","),
                        s.rows.to_string(),
                        s.saved.products.to_string(),
                        s.saved.records.to_string(),
                        s.saved.measurements.to_string(),
                    ]
                })
                .collect();
            print!(
                "{}",
                text::render(
                    &["file", "stations", "rows", "new units", "records", "measurements"],
                    &rows
                )
            );
            let failed = files.len() - summaries.len();
            if failed > 0 {
                bail!("{} of {} files could not be ingested", failed, files.len());
            }
        }

        Commands::Status { json } => {
            let status = maintenance::status(conn)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
                return Ok(());
            }
            let rows: Vec<Vec<String>> = status
                .into_iter()
                .map(|r| {
                    vec![
                        r.year,
                        r.test_week,
                        r.model_suffix,
                        r.station,
                        r.records.to_string(),
                        r.units.to_string(),
                    ]
                })
                .collect();
            print!(
                "{}",
                text::render(&["year", "week", "suffix", "station", "records", "units"], &rows)
            );
        }

        Commands::Tables {} => {
            for table in browse::list_tables(conn)? {
                println!("{}", table);
            }
        }

        Commands::Browse {
            table,
            columns,
            limit,
            json,
        } => {
            let result = browse::browse_table(conn, &table, &columns, limit)?;
            print_result(&result, json)?;
        }

        Commands::Query {
            sql,
            limit,
            filter,
            json,
        } => {
            let filters = filter
                .iter()
                .map(|f| f.parse::<Filter>())
                .collect::<rcinspect::Result<Vec<_>>>()?;
            for f in &filters {
                info!("Filter {}", f);
            }
            let result = browse::run_query(conn, &sql, limit, &filters)?;
            print_result(&result, json)?;
        }

        Commands::Classify {
            window: args,
            mode,
            output,
            show,
        } => {
            let window = window(args);
            match mode {
                Mode::Items => {
                    let verdicts = analysis::classify_items(conn, &window)?;
                    let rows: Vec<Vec<String>> =
                        verdicts.iter().take(show).map(export::item_row).collect();
                    print!("{}", text::render(&export::ITEM_HEADER, &rows));
                    print_categories(verdicts.iter().map(|v| &v.category));
                    if let Some(path) = output {
                        export::write_items(&mut create(&path)?, &verdicts)?;
                        println!("Written {}", path.display());
                    }
                }
                Mode::Flags => {
                    let verdicts = analysis::classify_flags(conn, &window)?;
                    let rows: Vec<Vec<String>> =
                        verdicts.iter().take(show).map(export::flag_row).collect();
                    print!("{}", text::render(&export::FLAG_HEADER, &rows));
                    print_categories(verdicts.iter().map(|v| &v.category));
                    if let Some(path) = output {
                        export::write_flags(&mut create(&path)?, &verdicts)?;
                        println!("Written {}", path.display());
                    }
                }
            }
        }

        Commands::Report {
            window: args,
            output,
        } => {
            let window = window(args);
            let records: Vec<_> = analysis::classify_flags(conn, &window)?
                .into_iter()
                .map(|v| v.history)
                .collect();
            let summary = Summary::build(&records);
            if summary.is_empty() {
                println!("No {} records with a pass flag in range", window.station);
                return Ok(());
            }
            let header = summary.header();
            for jig in &summary.jigs {
                println!("[{}]", jig.jig);
                print!("{}", text::render(&header, &summary.rows(jig)));
                println!();
            }
            let path = output.unwrap_or_else(|| {
                PathBuf::from(export::default_report_name(window.station, rcinspect::now()))
            });
            export::write_summary(&mut create(&path)?, &summary)?;
            println!("Written {}", path.display());
        }

        Commands::Delete { target } => {
            let counts = match target {
                DeleteTarget::Week { year, suffix, week } => {
                    maintenance::delete_week(conn, &year, &suffix, &week)?
                }
                DeleteTarget::Range { from, to, station } => {
                    maintenance::delete_range(conn, from, to, station.map(Station::from))?
                }
            };
            if counts.is_empty() {
                println!("Nothing to delete");
            } else {
                println!(
                    "Deleted {} records, {} measurements, {} units, {} spec versions",
                    counts.records, counts.measurements, counts.products, counts.specs
                );
            }
        }

        Commands::Export { path } => {
            maintenance::export_database(conn, &path)?;
            println!("Written {}", path.display());
        }
    }
    Ok(())
}
