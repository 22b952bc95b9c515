//! Typed tabular data shared by the runner, the validator, and the loader.
//!
//! A `TabularResult` is the normalized in-memory form of a delimited dataset:
//! an ordered schema plus rows of typed cells aligned with it. Both the
//! reference CSV and every candidate's output end up in this shape so they
//! can be compared column for column.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{SmithError, SmithResult};

/// How the values of a column are normalized before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Compared after trimming surrounding whitespace.
    Text,
    /// Compared exactly (counts, identifiers).
    Number,
    /// Compared within the validator's epsilon (currency values).
    Amount,
    /// Compared as calendar dates, independent of source format.
    Date,
}

/// Name fragments that mark a numeric column as monetary.
const MONETARY_KEYWORDS: &[&str] = &[
    "amount",
    "balance",
    "debit",
    "credit",
    "withdrawal",
    "deposit",
    "value",
    "total",
    "price",
    "fee",
    "charge",
];

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Amount => "amount",
            Self::Date => "date",
        }
    }

    /// Classify a column from its header and raw values.
    ///
    /// Empty values are ignored. A column with no non-empty values is text.
    /// Numeric columns become `Amount` when the name carries a monetary
    /// keyword or any value has a fractional part, and `Number` otherwise.
    pub fn infer<'a>(name: &str, values: impl IntoIterator<Item = &'a str>) -> Self {
        let present: Vec<&str> = values
            .into_iter()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect();

        if present.is_empty() {
            return Self::Text;
        }
        if present.iter().all(|v| parse_date(v).is_some()) {
            return Self::Date;
        }
        if present.iter().all(|v| parse_number(v).is_some()) {
            let lowered = name.to_lowercase();
            let monetary = MONETARY_KEYWORDS.iter().any(|k| lowered.contains(k));
            let fractional = present.iter().any(|v| v.contains('.'));
            return if monetary || fractional {
                Self::Amount
            } else {
                Self::Number
            };
        }
        Self::Text
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a table schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A single typed cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl CellValue {
    /// Parse `raw` according to `kind`.
    ///
    /// Blank input is always `Empty`. Returns `None` when a non-blank value
    /// cannot be read as the requested kind.
    pub fn parse(raw: &str, kind: ColumnKind) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Some(Self::Empty);
        }
        match kind {
            ColumnKind::Text => Some(Self::Text(trimmed.to_string())),
            ColumnKind::Number | ColumnKind::Amount => parse_number(trimmed).map(Self::Number),
            ColumnKind::Date => parse_date(trimmed).map(Self::Date),
        }
    }

    /// Re-read this value as `kind`, or `None` if it cannot be represented.
    pub fn coerce(&self, kind: ColumnKind) -> Option<Self> {
        match (self, kind) {
            (Self::Empty, _) => Some(Self::Empty),
            (Self::Text(s), kind) => Self::parse(s, kind),
            (Self::Number(n), ColumnKind::Number | ColumnKind::Amount) => Some(Self::Number(*n)),
            (Self::Number(n), ColumnKind::Text) => Some(Self::Text(n.to_string())),
            (Self::Date(d), ColumnKind::Date) => Some(Self::Date(*d)),
            (Self::Date(d), ColumnKind::Text) => Some(Self::Text(d.format("%Y-%m-%d").to_string())),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("<empty>"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// An ordered schema plus rows of cells aligned with it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TabularResult {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<CellValue>>,
}

impl TabularResult {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row. The row must have exactly one cell per column.
    pub fn push_row(&mut self, row: Vec<CellValue>) -> SmithResult<()> {
        if row.len() != self.columns.len() {
            return Err(SmithError::Execution {
                reason: format!(
                    "row {} has {} cells but the schema has {} columns",
                    self.rows.len(),
                    row.len(),
                    self.columns.len()
                ),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Look up one cell by row index and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Iterate one row as `(column name, value)` pairs in schema order.
    pub fn row(&self, row: usize) -> Option<impl Iterator<Item = (&str, &CellValue)> + '_> {
        let cells = self.rows.get(row)?;
        Some(
            self.columns
                .iter()
                .map(|c| c.name.as_str())
                .zip(cells.iter()),
        )
    }
}

// ── Value parsing ─────────────────────────────────────────────────────────────

/// Accepted date layouts, tried in order. Numeric layouts are day-first.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d %b %Y",
    "%d-%b-%Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d/%m/%y",
    "%d-%m-%y",
    "%d-%b-%y",
    "%d %b %y",
];

/// Parse a date in any of the accepted layouts.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| parse_date_with(trimmed, fmt))
}

/// Parse a date with one explicit `chrono` format string.
///
/// Four-digit-year layouts reject years below 1000 so that `05/01/24` is not
/// read as the year 24 by `%Y`.
pub fn parse_date_with(raw: &str, fmt: &str) -> Option<NaiveDate> {
    let date = NaiveDate::parse_from_str(raw.trim(), fmt).ok()?;
    if fmt.contains("%Y") && date.year() < 1000 {
        return None;
    }
    Some(date)
}

/// Parse a number as it appears on statements.
///
/// Strips thousands separators, spaces, and common currency markers, and
/// reads an accounting-style `(12.50)` as `-12.50`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let mut s = raw.trim();
    let mut negative = false;
    if s.len() >= 2 && s.starts_with('(') && s.ends_with(')') {
        negative = true;
        s = &s[1..s.len() - 1];
    }
    for prefix in ["Rs.", "INR", "USD", "EUR"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest;
        }
    }

    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, ',' | ' ' | '$' | '€' | '£' | '₹' | '¥'))
        .collect();

    if !cleaned.chars().any(|c| c.is_ascii_digit())
        || !cleaned
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+'))
    {
        return None;
    }

    let value: f64 = cleaned.parse().ok()?;
    Some(if negative { -value } else { value })
}
