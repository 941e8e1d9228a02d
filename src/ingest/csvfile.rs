use std::collections::HashMap;
use std::io::Read;

use tracing::debug;

use crate::error::{Error, Result};

pub const SERIAL_COLUMN: &str = "SNumber";

// How far down the file the header row is searched for
const SNIFF_ROWS: usize = 20;

/// Test log export after header detection and cell cleanup.
/// Every row is padded to the header width.
#[derive(Debug, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
    index: HashMap<String, usize>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let mut index = HashMap::with_capacity(headers.len());
        for (i, h) in headers.iter().enumerate() {
            // first occurrence wins on duplicated headers
            index.entry(h.clone()).or_insert(i);
        }
        Self {
            headers,
            rows,
            index,
        }
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    pub fn has(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    pub fn cell<'a>(&self, row: &'a [Option<String>], column: &str) -> Option<&'a str> {
        self.position(column)
            .and_then(|i| row.get(i))
            .and_then(|c| c.as_deref())
    }

    /// First non-empty numeric value of a column, used for spec limits
    pub fn first_number(&self, column: &str) -> Option<f64> {
        let i = self.position(column)?;
        self.rows
            .iter()
            .filter_map(|r| r.get(i).and_then(|c| c.as_deref()))
            .find_map(parse_number)
    }

    /// Whether any cell of the column holds a number
    pub fn is_numeric(&self, column: &str) -> bool {
        self.first_number(column).is_some()
    }
}

/// Strips the `="..."` wrapper Excel puts around text cells.
/// Placeholders for missing values become `None`.
pub fn clean_cell(raw: &str) -> Option<String> {
    let cleaned = raw.replace("=\"", "").replace('"', "");
    let cleaned = cleaned.trim();
    match cleaned {
        "" | "nan" | "NaN" | "N/A" | "None" => None,
        s => Some(s.to_string()),
    }
}

pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

// Rows above the header carry export metadata. The header is the first
// row naming the serial column; fall back to the configured offset.
fn sniff_header(records: &[csv::StringRecord], header_row: usize) -> usize {
    records
        .iter()
        .take(SNIFF_ROWS)
        .position(|r| r.iter().any(|c| c.trim() == SERIAL_COLUMN))
        .unwrap_or(header_row)
}

pub fn read_table<R: Read>(reader: R, header_row: usize) -> Result<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut records = Vec::new();
    for record in rdr.records() {
        records.push(record?);
    }

    let header_idx = sniff_header(&records, header_row);
    let Some(header) = records.get(header_idx) else {
        return Err(Error::MissingColumn(SERIAL_COLUMN.to_string()));
    };
    debug!("Using CSV row {} as header", header_idx);

    let headers: Vec<String> = header
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect();
    let width = headers.len();

    let rows = records[header_idx + 1..]
        .iter()
        .map(|r| {
            let mut row: Vec<Option<String>> = r.iter().take(width).map(clean_cell).collect();
            row.resize(width, None);
            row
        })
        .filter(|row| row.iter().any(Option::is_some))
        .collect();

    let table = RawTable::new(headers, rows);
    if !table.has(SERIAL_COLUMN) {
        return Err(Error::MissingColumn(SERIAL_COLUMN.to_string()));
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "\
Model,SJ_TM2360E
Line,2
Exported,2025-10-22
,
,SNumber,Stamp,PcbPass,PcbLed
0,=\"A001\",2025-10-22 08:00:00,=\"O\",3.1
1,=\"A002\",2025-10-22 08:01:00,x,nan
,,,,
";

    #[test]
    fn excel_wrappers_are_removed() {
        assert_eq!(clean_cell("=\"A001\""), Some("A001".to_string()));
        assert_eq!(clean_cell("  O "), Some("O".to_string()));
        assert_eq!(clean_cell("nan"), None);
        assert_eq!(clean_cell("=\"\""), None);
    }

    #[test]
    fn header_is_sniffed() {
        let table = read_table(EXPORT.as_bytes(), 0).unwrap();
        assert_eq!(table.headers[1], "SNumber");
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.cell(&table.rows[0], "SNumber"), Some("A001"));
        assert_eq!(table.cell(&table.rows[1], "PcbLed"), None);
    }

    #[test]
    fn configured_offset_is_the_fallback() {
        let data = "junk\nSerial,PcbPass\nA1,O\n";
        // no SNumber anywhere: offset is used, then the serial column is missing
        let err = read_table(data.as_bytes(), 1).unwrap_err();
        assert!(matches!(err, Error::MissingColumn(c) if c == SERIAL_COLUMN));
    }

    #[test]
    fn short_rows_are_padded() {
        let data = "SNumber,PcbPass,PcbLed\nA1,O\n";
        let table = read_table(data.as_bytes(), 4).unwrap();
        assert_eq!(table.rows[0].len(), 3);
        assert_eq!(table.first_number("PcbLed"), None);
        assert!(!table.is_numeric("PcbLed"));
    }
}
