//! Typed table validator for the parsesmith agent loop.
//!
//! `TableValidator` implements the `Validator` trait from `parsesmith-core`.
//! Unlike a report-style checker it returns at the first divergence: the
//! diagnostic is fed into the next generation prompt, and one precise
//! mismatch is easier to repair than a wall of them.
//!
//! Normalization is driven by the reference column's kind. A produced cell
//! is coerced to that kind first, so a candidate that emits `"05/01/2024"`
//! as text still matches a reference `2024-01-05`.

use tracing::debug;

use parsesmith_contracts::{
    table::{CellValue, ColumnKind, TabularResult},
    verdict::{Diagnostic, Verdict},
};
use parsesmith_core::traits::Validator;

/// Default absolute tolerance for `Amount` columns.
pub const DEFAULT_AMOUNT_EPSILON: f64 = 1e-6;

/// The parsesmith table validator.
#[derive(Debug, Clone)]
pub struct TableValidator {
    amount_epsilon: f64,
}

impl TableValidator {
    /// A validator with the default amount tolerance.
    pub fn new() -> Self {
        Self {
            amount_epsilon: DEFAULT_AMOUNT_EPSILON,
        }
    }

    /// Override the absolute tolerance used for `Amount` columns.
    pub fn with_amount_epsilon(mut self, epsilon: f64) -> Self {
        self.amount_epsilon = epsilon.abs();
        self
    }

    pub fn amount_epsilon(&self) -> f64 {
        self.amount_epsilon
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    /// Whether `actual` matches `expected` under `kind`'s equivalence.
    fn cells_match(&self, kind: ColumnKind, expected: &CellValue, actual: &CellValue) -> bool {
        match (expected, actual) {
            (CellValue::Empty, CellValue::Empty) => true,
            (CellValue::Number(e), CellValue::Number(a)) => match kind {
                ColumnKind::Amount => (e - a).abs() <= self.amount_epsilon,
                _ => e == a,
            },
            (CellValue::Date(e), CellValue::Date(a)) => e == a,
            (CellValue::Text(e), CellValue::Text(a)) => e.trim() == a.trim(),
            _ => false,
        }
    }
}

impl Default for TableValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator for TableValidator {
    fn compare(&self, produced: &TabularResult, reference: &TabularResult) -> Verdict {
        // ── Phase 1: columns ──────────────────────────────────────────────────
        let expected_names = reference.column_names();
        let actual_names = produced.column_names();
        if expected_names != actual_names {
            debug!(?expected_names, ?actual_names, "column mismatch");
            return Verdict::Fail(Diagnostic::columns(expected_names, actual_names));
        }

        // ── Phase 2: row count ────────────────────────────────────────────────
        if produced.row_count() != reference.row_count() {
            debug!(
                expected = reference.row_count(),
                actual = produced.row_count(),
                "row count mismatch"
            );
            return Verdict::Fail(Diagnostic::row_count(
                reference.row_count(),
                produced.row_count(),
            ));
        }

        // ── Phase 3: cells, row-major ─────────────────────────────────────────
        for (row, (expected_row, actual_row)) in
            reference.rows.iter().zip(produced.rows.iter()).enumerate()
        {
            for (col, column) in reference.columns.iter().enumerate() {
                let expected = expected_row.get(col).unwrap_or(&CellValue::Empty);
                let raw = actual_row.get(col).unwrap_or(&CellValue::Empty);

                let matched = match raw.coerce(column.kind) {
                    Some(actual) => self.cells_match(column.kind, expected, &actual),
                    None => false,
                };
                if !matched {
                    debug!(row, column = %column.name, %expected, actual = %raw, "cell mismatch");
                    return Verdict::Fail(Diagnostic::Cell {
                        row,
                        column: column.name.clone(),
                        expected: expected.clone(),
                        actual: raw.clone(),
                    });
                }
            }
        }

        debug!(rows = reference.row_count(), "tables match");
        Verdict::Pass
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use parsesmith_contracts::{
        table::{CellValue, Column, ColumnKind, TabularResult},
        verdict::{Diagnostic, Verdict},
    };
    use parsesmith_core::traits::Validator;

    use super::TableValidator;

    // ── Builder helpers ───────────────────────────────────────────────────────

    fn date(y: i32, m: u32, d: u32) -> CellValue {
        CellValue::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn statement() -> TabularResult {
        let mut table = TabularResult::new(vec![
            Column::new("Date", ColumnKind::Date),
            Column::new("Description", ColumnKind::Text),
            Column::new("Amount", ColumnKind::Amount),
            Column::new("Balance", ColumnKind::Amount),
        ]);
        table
            .push_row(vec![date(2024, 1, 5), text("Opening deposit"), CellValue::Number(1000.0), CellValue::Number(1000.0)])
            .unwrap();
        table
            .push_row(vec![date(2024, 1, 6), text("Coffee shop"), CellValue::Number(-4.5), CellValue::Number(995.5)])
            .unwrap();
        table
            .push_row(vec![date(2024, 1, 9), text("Salary"), CellValue::Number(2500.0), CellValue::Number(3495.5)])
            .unwrap();
        table
    }

    fn with_cell(mut table: TabularResult, row: usize, col: usize, value: CellValue) -> TabularResult {
        table.rows[row][col] = value;
        table
    }

    // ── Structure ─────────────────────────────────────────────────────────────

    /// Any table compared with itself passes.
    #[test]
    fn identical_tables_pass() {
        let v = TableValidator::new();
        assert_eq!(v.compare(&statement(), &statement()), Verdict::Pass);
        assert_eq!(
            v.compare(&TabularResult::default(), &TabularResult::default()),
            Verdict::Pass
        );
    }

    #[test]
    fn renamed_column_is_a_column_mismatch() {
        let mut produced = statement();
        produced.columns[2].name = "Amt".to_string();

        match TableValidator::new().compare(&produced, &statement()) {
            Verdict::Fail(d) => {
                assert_eq!(d.label(), "column-mismatch");
                assert!(d.to_string().contains("'Amt'"));
            }
            Verdict::Pass => panic!("expected column mismatch"),
        }
    }

    #[test]
    fn reordered_columns_fail_before_rows_are_inspected() {
        let mut produced = statement();
        produced.columns.swap(0, 1);
        produced.rows.clear();

        let verdict = TableValidator::new().compare(&produced, &statement());
        assert_eq!(verdict.diagnostic().unwrap().label(), "column-mismatch");
    }

    #[test]
    fn missing_row_is_a_row_count_mismatch() {
        let mut produced = statement();
        produced.rows.pop();

        assert_eq!(
            TableValidator::new().compare(&produced, &statement()),
            Verdict::Fail(Diagnostic::row_count(3, 2))
        );
    }

    // ── Cells ─────────────────────────────────────────────────────────────────

    /// Changing exactly one cell yields a diagnostic naming that cell.
    #[test]
    fn single_changed_cell_is_reported_precisely() {
        let produced = with_cell(statement(), 1, 1, text("Tea shop"));

        assert_eq!(
            TableValidator::new().compare(&produced, &statement()),
            Verdict::Fail(Diagnostic::Cell {
                row: 1,
                column: "Description".to_string(),
                expected: text("Coffee shop"),
                actual: text("Tea shop"),
            })
        );
    }

    #[test]
    fn first_divergence_in_row_major_order_wins() {
        let produced = with_cell(statement(), 2, 0, date(2024, 1, 10));
        let produced = with_cell(produced, 1, 3, CellValue::Number(0.0));

        match TableValidator::new().compare(&produced, &statement()) {
            Verdict::Fail(Diagnostic::Cell { row, column, .. }) => {
                assert_eq!((row, column.as_str()), (1, "Balance"));
            }
            other => panic!("expected cell mismatch, got {:?}", other),
        }
    }

    #[test]
    fn amounts_compare_within_epsilon() {
        let v = TableValidator::new();
        let reference = with_cell(statement(), 0, 2, CellValue::Number(1234.50));

        let close = with_cell(statement(), 0, 2, CellValue::Number(1234.500000001));
        assert_eq!(v.compare(&close, &reference), Verdict::Pass);

        let off = with_cell(statement(), 0, 2, CellValue::Number(1234.51));
        assert_eq!(
            v.compare(&off, &reference).diagnostic().unwrap().label(),
            "cell-mismatch"
        );
    }

    #[test]
    fn wider_epsilon_is_honoured() {
        let v = TableValidator::new().with_amount_epsilon(0.01);
        assert_eq!(v.amount_epsilon(), 0.01);
        let off = with_cell(statement(), 0, 2, CellValue::Number(1000.005));
        assert_eq!(v.compare(&off, &statement()), Verdict::Pass);
    }

    #[test]
    fn number_columns_compare_exactly() {
        let mut reference = TabularResult::new(vec![Column::new("Count", ColumnKind::Number)]);
        reference.push_row(vec![CellValue::Number(3.0)]).unwrap();

        let mut produced = reference.clone();
        produced.rows[0][0] = CellValue::Number(3.0000000001);

        let verdict = TableValidator::new().compare(&produced, &reference);
        assert!(!verdict.is_pass(), "Number columns have no tolerance");
    }

    /// Dates written in a different layout still match the reference.
    #[test]
    fn dates_match_regardless_of_textual_format() {
        let v = TableValidator::new();
        for raw in ["05/01/2024", "05-01-2024", "2024-01-05", "05 Jan 2024"] {
            let produced = with_cell(statement(), 0, 0, text(raw));
            assert_eq!(v.compare(&produced, &statement()), Verdict::Pass, "layout {raw}");
        }
    }

    #[test]
    fn textual_amounts_are_coerced() {
        let produced = with_cell(statement(), 2, 2, text("2,500.00"));
        assert_eq!(TableValidator::new().compare(&produced, &statement()), Verdict::Pass);
    }

    #[test]
    fn text_is_compared_after_trimming() {
        let produced = with_cell(statement(), 0, 1, text("  Opening deposit "));
        assert_eq!(TableValidator::new().compare(&produced, &statement()), Verdict::Pass);
    }

    #[test]
    fn empty_matches_only_empty() {
        let v = TableValidator::new();
        let reference = with_cell(statement(), 1, 2, CellValue::Empty);

        let blank = with_cell(statement(), 1, 2, text("   "));
        assert_eq!(v.compare(&blank, &reference), Verdict::Pass);

        let zero = with_cell(statement(), 1, 2, CellValue::Number(0.0));
        assert!(!v.compare(&zero, &reference).is_pass());
    }

    /// A value that cannot be read as the column's kind is a mismatch that
    /// shows the raw value.
    #[test]
    fn uncoercible_value_reports_raw_cell() {
        let produced = with_cell(statement(), 0, 3, text("n/a"));

        match TableValidator::new().compare(&produced, &statement()) {
            Verdict::Fail(Diagnostic::Cell { column, actual, .. }) => {
                assert_eq!(column, "Balance");
                assert_eq!(actual, text("n/a"));
            }
            other => panic!("expected cell mismatch, got {:?}", other),
        }
    }
}
