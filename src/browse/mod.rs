//! Read-only access to the database for operators: table listing, raw
//! table browsing and ad-hoc SQL.
//!
//! Ad-hoc statements are wrapped in a temporary view. SQLite then reports
//! the result columns, which lets rows of any shape come back as JSON arrays.

pub mod filter;

use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
pub use filter::{Filter, FilterOp};

pub const DEFAULT_LIMIT: i64 = 100;
const QUERY_VIEW: &str = "rcinspect_query_v";

static TRAILING_LIMIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*LIMIT\s+\d+\s*;?\s*$").expect("limit pattern"));

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    /// Rows the statement yields without a limit
    pub total: i64,
    pub limit: i64,
}

#[derive(QueryableByName, Debug)]
struct NameRow {
    #[diesel(sql_type = Text)]
    name: String,
}

#[derive(QueryableByName, Debug)]
struct CountRow {
    #[diesel(sql_type = BigInt)]
    n: i64,
}

#[derive(QueryableByName, Debug)]
struct JsonRow {
    #[diesel(sql_type = Text)]
    row: String,
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// A `;` outside quoted literals and identifiers ends a statement
fn has_separator(sql: &str) -> bool {
    let mut quote: Option<char> = None;
    for c in sql.chars() {
        match (quote, c) {
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '[') => quote = Some(']'),
            (None, ';') => return true,
            (Some(q), c) if c == q => quote = None,
            _ => {}
        }
    }
    false
}

/// Removes a trailing `LIMIT n` and semicolons so the statement can be
/// counted and limited again. Anything but a single SELECT / WITH is refused.
pub fn clean_query(sql: &str) -> Result<String> {
    let stripped = TRAILING_LIMIT.replace(sql.trim(), "");
    let cleaned = stripped.trim().trim_end_matches([';', ' ', '\n', '\t', '\r']);
    let head = cleaned.to_lowercase();
    if !(head.starts_with("select") || head.starts_with("with")) {
        return Err(Error::InvalidQuery(
            "only SELECT or WITH statements are allowed".into(),
        ));
    }
    if has_separator(cleaned) {
        return Err(Error::InvalidQuery("a single statement is expected".into()));
    }
    Ok(cleaned.to_string())
}

fn effective_limit(limit: Option<i64>) -> i64 {
    match limit {
        Some(n) if n > 0 => n,
        _ => DEFAULT_LIMIT,
    }
}

pub fn list_tables(conn: &mut SqliteConnection) -> Result<Vec<String>> {
    let rows: Vec<NameRow> = diesel::sql_query(
        "SELECT name FROM sqlite_master \
         WHERE type IN ('table', 'view') \
         AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '__diesel%' \
         ORDER BY name",
    )
    .load(conn)?;
    Ok(rows.into_iter().map(|r| r.name).collect())
}

fn column_names(conn: &mut SqliteConnection, schema: &str, table: &str) -> Result<Vec<String>> {
    let sql = format!("PRAGMA {}.table_info({})", schema, quote_ident(table));
    let rows: Vec<NameRow> = diesel::sql_query(sql).load(conn)?;
    Ok(rows.into_iter().map(|r| r.name).collect())
}

pub fn table_columns(conn: &mut SqliteConnection, table: &str) -> Result<Vec<String>> {
    column_names(conn, "main", table)
}

fn drop_query_view(conn: &mut SqliteConnection) -> Result<()> {
    diesel::sql_query(format!("DROP VIEW IF EXISTS temp.{QUERY_VIEW}")).execute(conn)?;
    Ok(())
}

fn fetch(conn: &mut SqliteConnection, limit: i64) -> Result<QueryResult> {
    let columns = column_names(conn, "temp", QUERY_VIEW)?;
    let total = diesel::sql_query(format!("SELECT COUNT(*) AS n FROM temp.{QUERY_VIEW}"))
        .get_result::<CountRow>(conn)?
        .n;

    // json_array refuses blobs, they come back as hex text
    let cells: Vec<String> = columns
        .iter()
        .map(|c| {
            let c = quote_ident(c);
            format!("CASE WHEN typeof({c}) = 'blob' THEN hex({c}) ELSE {c} END")
        })
        .collect();
    let sql = format!(
        "SELECT json_array({}) AS row FROM temp.{QUERY_VIEW} LIMIT ?",
        cells.join(", ")
    );
    debug!("{}", sql);
    let raw: Vec<JsonRow> = diesel::sql_query(sql)
        .bind::<BigInt, _>(limit)
        .load(conn)?;
    let rows = raw
        .iter()
        .map(|r| serde_json::from_str::<Vec<Value>>(&r.row))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(QueryResult {
        columns,
        rows,
        total,
        limit,
    })
}

/// Runs an operator supplied SELECT with a fresh limit, then narrows the
/// rows with the post-query filters.
pub fn run_query(
    conn: &mut SqliteConnection,
    sql: &str,
    limit: Option<i64>,
    filters: &[Filter],
) -> Result<QueryResult> {
    let cleaned = clean_query(sql)?;
    let limit = effective_limit(limit);
    drop_query_view(conn)?;
    let create = format!("CREATE TEMP VIEW {QUERY_VIEW} AS {cleaned}");
    debug!("{}", create);
    diesel::sql_query(create)
        .execute(conn)
        .map_err(|e| Error::InvalidQuery(e.to_string()))?;

    let fetched = fetch(conn, limit);
    // the view goes away even when fetching failed
    drop_query_view(conn)?;
    let mut result = fetched?;
    filter::apply(&mut result, filters);
    Ok(result)
}

/// Raw rows of one table, optionally only some of its columns
pub fn browse_table(
    conn: &mut SqliteConnection,
    table: &str,
    columns: &[String],
    limit: Option<i64>,
) -> Result<QueryResult> {
    if !list_tables(conn)?.iter().any(|t| t == table) {
        return Err(Error::UnknownTable(table.to_string()));
    }
    let known = table_columns(conn, table)?;
    let selected: Vec<String> = if columns.is_empty() {
        known
    } else {
        for c in columns {
            if !known.contains(c) {
                return Err(Error::UnknownColumn {
                    table: table.to_string(),
                    column: c.clone(),
                });
            }
        }
        columns.to_vec()
    };
    let list: Vec<String> = selected.iter().map(|c| quote_ident(c)).collect();
    let sql = format!("SELECT {} FROM {}", list.join(", "), quote_ident(table));
    run_query(conn, &sql, limit, &[])
}
