use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use tracing::warn;

use super::QueryResult;
use crate::error::Error;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FilterOp {
    Contains,
    Equals,
    StartsWith,
    EndsWith,
}

impl FromStr for FilterOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "contains" | "포함" => Ok(FilterOp::Contains),
            "equals" | "eq" | "일치" => Ok(FilterOp::Equals),
            "starts" | "startswith" | "시작" => Ok(FilterOp::StartsWith),
            "ends" | "endswith" | "종료" => Ok(FilterOp::EndsWith),
            _ => Err(Error::InvalidFilter(s.to_string())),
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FilterOp::Contains => "contains",
            FilterOp::Equals => "equals",
            FilterOp::StartsWith => "starts",
            FilterOp::EndsWith => "ends",
        })
    }
}

/// Post-query search condition, written `column:op:value` on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: String,
}

impl FromStr for Filter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(column), Some(op), Some(value)) if !column.is_empty() && !value.is_empty() => {
                Ok(Filter {
                    column: column.to_string(),
                    op: op.parse().map_err(|_| Error::InvalidFilter(s.to_string()))?,
                    value: value.to_string(),
                })
            }
            _ => Err(Error::InvalidFilter(s.to_string())),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} '{}'", self.column, self.op, self.value)
    }
}

/// String rendering of a cell, shared by filters and terminal output
pub fn cell_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Filter {
    fn matches(&self, cell: &Value) -> bool {
        let text = cell_text(cell).to_lowercase();
        let needle = self.value.to_lowercase();
        match self.op {
            FilterOp::Contains => text.contains(&needle),
            FilterOp::Equals => text == needle,
            FilterOp::StartsWith => text.starts_with(&needle),
            FilterOp::EndsWith => text.ends_with(&needle),
        }
    }
}

/// Keeps the rows matching every filter, case insensitive.
/// Filters on columns the result does not have are skipped.
pub fn apply(result: &mut QueryResult, filters: &[Filter]) {
    for filter in filters {
        let Some(idx) = result.columns.iter().position(|c| *c == filter.column) else {
            warn!("Ignoring filter on unknown column {}", filter.column);
            continue;
        };
        result
            .rows
            .retain(|row| row.get(idx).is_some_and(|cell| filter.matches(cell)));
    }
}
