//! Loading delimited tables into typed `TabularResult`s.
//!
//! The reference CSV of a target is loaded once per run. Its header fixes the
//! schema order and each column is classified (explicit declaration first,
//! inference otherwise) so the validator knows how to normalize values.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use parsesmith_contracts::{
    error::{SmithError, SmithResult},
    table::{CellValue, Column, ColumnKind, TabularResult},
};

/// Read the reference CSV at `path`.
///
/// Any problem (unreadable file, ragged rows, empty header, a value that
/// contradicts a declared column type) is a `Configuration` error.
pub fn load_reference(
    path: &Path,
    declared: &BTreeMap<String, ColumnKind>,
) -> SmithResult<TabularResult> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        SmithError::config(format!(
            "failed to read reference '{}': {}",
            path.display(),
            e
        ))
    })?;

    let table = table_from_csv(&contents, declared).map_err(|reason| {
        SmithError::config(format!("invalid reference '{}': {}", path.display(), reason))
    })?;

    debug!(
        path = %path.display(),
        columns = table.columns.len(),
        rows = table.row_count(),
        "reference loaded"
    );
    Ok(table)
}

/// Parse CSV text (header row first) into a typed table.
///
/// Column kinds come from `declared` when present and are inferred from the
/// column's values otherwise.
pub fn table_from_csv(
    input: &str,
    declared: &BTreeMap<String, ColumnKind>,
) -> Result<TabularResult, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(input.as_bytes());

    let names: Vec<String> = reader
        .headers()
        .map_err(|e| format!("unreadable header: {e}"))?
        .iter()
        .map(str::to_string)
        .collect();

    if names.is_empty() || names.iter().all(|n| n.is_empty()) {
        return Err("missing header row".to_string());
    }

    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| format!("row {i}: {e}"))?;
        raw_rows.push(record.iter().map(str::to_string).collect());
    }

    let columns: Vec<Column> = names
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let kind = declared.get(name).copied().unwrap_or_else(|| {
                ColumnKind::infer(name, raw_rows.iter().map(|r| r[idx].as_str()))
            });
            Column::new(name.clone(), kind)
        })
        .collect();

    let mut table = TabularResult::new(columns);
    for (row_idx, raw) in raw_rows.iter().enumerate() {
        let mut cells = Vec::with_capacity(raw.len());
        for (column, value) in table.columns.iter().zip(raw.iter()) {
            let cell = CellValue::parse(value, column.kind).ok_or_else(|| {
                format!(
                    "row {row_idx}, column '{}': '{}' is not a valid {} value",
                    column.name, value, column.kind
                )
            })?;
            cells.push(cell);
        }
        table.push_row(cells).map_err(|e| e.to_string())?;
    }

    Ok(table)
}

/// Header plus the first `rows` data rows of `table`, as CSV text.
///
/// Dates are written as `%Y-%m-%d` and numbers in their shortest form.
pub fn preview_csv(table: &TabularResult, rows: usize) -> String {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let _ = writer.write_record(table.column_names());
    for row in table.rows.iter().take(rows) {
        let _ = writer.write_record(row.iter().map(cell_text));
    }
    let bytes = writer.into_inner().unwrap_or_default();
    String::from_utf8(bytes).unwrap_or_default()
}

fn cell_text(cell: &CellValue) -> String {
    match cell {
        CellValue::Empty => String::new(),
        CellValue::Text(s) => s.clone(),
        CellValue::Number(n) => n.to_string(),
        CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
    }
}
