//! # parsesmith-contracts
//!
//! Shared types, verdicts, and error contracts for the parsesmith agent loop.
//!
//! Every crate in the workspace imports from here. Apart from value parsing
//! for typed cells, no logic lives in this crate.

pub mod candidate;
pub mod error;
pub mod execution;
pub mod state;
pub mod table;
pub mod target;
pub mod verdict;

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use candidate::{CandidateProgram, GenerationStrategy};
    use error::SmithError;
    use execution::RunOutcome;
    use state::{AgentState, Phase, RunId};
    use table::{parse_date, parse_number, CellValue, Column, ColumnKind, TabularResult};
    use target::Target;
    use verdict::{Diagnostic, Verdict};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── Value parsing ────────────────────────────────────────────────────────

    #[test]
    fn parse_date_accepts_iso_and_day_first_layouts() {
        assert_eq!(parse_date("2024-01-05"), Some(date(2024, 1, 5)));
        assert_eq!(parse_date("05/01/2024"), Some(date(2024, 1, 5)));
        assert_eq!(parse_date("05-01-2024"), Some(date(2024, 1, 5)));
        assert_eq!(parse_date("05 Jan 2024"), Some(date(2024, 1, 5)));
        assert_eq!(parse_date("Jan 05, 2024"), Some(date(2024, 1, 5)));
        assert_eq!(parse_date("05/01/24"), Some(date(2024, 1, 5)));
    }

    #[test]
    fn parse_date_rejects_non_dates() {
        assert_eq!(parse_date("Salary credit"), None);
        assert_eq!(parse_date("1234.50"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn parse_number_handles_statement_formatting() {
        assert_eq!(parse_number("1,234.50"), Some(1234.5));
        assert_eq!(parse_number(" -42 "), Some(-42.0));
        assert_eq!(parse_number("(12.50)"), Some(-12.5));
        assert_eq!(parse_number("₹ 1,000.00"), Some(1000.0));
        assert_eq!(parse_number("Rs.250"), Some(250.0));
        assert_eq!(parse_number("ATM withdrawal"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("-"), None);
    }

    // ── Column classification ────────────────────────────────────────────────

    #[test]
    fn infer_classifies_dates_amounts_numbers_and_text() {
        assert_eq!(
            ColumnKind::infer("Date", ["2024-01-05", "2024-01-06"]),
            ColumnKind::Date
        );
        assert_eq!(
            ColumnKind::infer("Balance", ["1000", "1200"]),
            ColumnKind::Amount,
            "monetary keyword marks integers as amounts"
        );
        assert_eq!(
            ColumnKind::infer("Rate", ["1.5", "2"]),
            ColumnKind::Amount,
            "fractional values mark the column as an amount"
        );
        assert_eq!(
            ColumnKind::infer("Transactions", ["3", "4"]),
            ColumnKind::Number
        );
        assert_eq!(
            ColumnKind::infer("Description", ["Salary", "Rent"]),
            ColumnKind::Text
        );
        assert_eq!(ColumnKind::infer("Debit", ["", " "]), ColumnKind::Text);
    }

    #[test]
    fn infer_ignores_empty_cells() {
        assert_eq!(
            ColumnKind::infer("Credit", ["", "500.00", ""]),
            ColumnKind::Amount
        );
    }

    // ── CellValue ────────────────────────────────────────────────────────────

    #[test]
    fn coerce_reads_text_as_target_kind() {
        let raw = CellValue::Text("05/01/2024".to_string());
        assert_eq!(
            raw.coerce(ColumnKind::Date),
            Some(CellValue::Date(date(2024, 1, 5)))
        );
        assert_eq!(
            CellValue::Text("abc".to_string()).coerce(ColumnKind::Amount),
            None
        );
        assert_eq!(
            CellValue::Text("  ".to_string()).coerce(ColumnKind::Amount),
            Some(CellValue::Empty)
        );
        assert_eq!(
            CellValue::Date(date(2024, 1, 5)).coerce(ColumnKind::Number),
            None
        );
    }

    // ── TabularResult ────────────────────────────────────────────────────────

    #[test]
    fn push_row_rejects_misaligned_rows() {
        let mut table = TabularResult::new(vec![
            Column::new("Date", ColumnKind::Date),
            Column::new("Amount", ColumnKind::Amount),
        ]);
        table
            .push_row(vec![CellValue::Date(date(2024, 1, 5)), CellValue::Number(1.0)])
            .unwrap();

        let err = table.push_row(vec![CellValue::Empty]).unwrap_err();
        assert!(err.to_string().contains("has 1 cells but the schema has 2 columns"));
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn get_and_row_address_cells_by_column_name() {
        let mut table = TabularResult::new(vec![
            Column::new("Description", ColumnKind::Text),
            Column::new("Amount", ColumnKind::Amount),
        ]);
        table
            .push_row(vec![CellValue::Text("Rent".to_string()), CellValue::Number(-900.0)])
            .unwrap();

        assert_eq!(table.get(0, "Amount"), Some(&CellValue::Number(-900.0)));
        assert_eq!(table.get(0, "Missing"), None);
        assert_eq!(table.get(1, "Amount"), None);

        let pairs: Vec<(&str, &CellValue)> = table.row(0).unwrap().collect();
        assert_eq!(pairs[0].0, "Description");
        assert_eq!(pairs[1].1, &CellValue::Number(-900.0));
    }

    // ── Diagnostics ──────────────────────────────────────────────────────────

    #[test]
    fn row_count_diagnostic_reports_expected_and_actual() {
        let d = Diagnostic::row_count(3, 2);
        assert_eq!(d.label(), "row-count-mismatch");
        assert!(d.to_string().contains("expected 3 rows, got 2"));
    }

    #[test]
    fn column_diagnostic_names_first_difference() {
        let d = Diagnostic::columns(
            vec!["Date".into(), "Amount".into()],
            vec!["Date".into(), "Amt".into()],
        );
        let msg = d.to_string();
        assert!(msg.contains("position 1"), "{msg}");
        assert!(msg.contains("'Amt'"), "{msg}");
    }

    #[test]
    fn verdict_fail_round_trips() {
        let original = Verdict::Fail(Diagnostic::Cell {
            row: 2,
            column: "Amount".to_string(),
            expected: CellValue::Number(1234.5),
            actual: CellValue::Text("oops".to_string()),
        });
        let json = serde_json::to_string(&original).unwrap();
        let decoded: Verdict = serde_json::from_str(&json).unwrap();
        assert_eq!(original, decoded);
    }

    // ── RunOutcome ───────────────────────────────────────────────────────────

    fn terminal_state(phase: Phase, verdict: Verdict) -> AgentState {
        let mut state = AgentState::new(
            Target::new("icici", "s.txt", "r.csv", "p.toml"),
            3,
        );
        state.phase = phase;
        state.attempt = 3;
        state.candidate = Some(CandidateProgram {
            source: "entry = \"parse\"".to_string(),
            attempt: 3,
            strategy: GenerationStrategy::Template,
        });
        state.verdict = Some(verdict);
        state
    }

    #[test]
    fn exhausted_outcome_converts_to_validation_error_with_payload() {
        let outcome = RunOutcome {
            state: terminal_state(Phase::Exhausted, Verdict::Fail(Diagnostic::row_count(3, 2))),
        };
        assert!(!outcome.passed());
        assert_eq!(outcome.attempts(), 3);

        match outcome.into_result() {
            Err(SmithError::Validation { diagnostic }) => {
                assert_eq!(diagnostic, Diagnostic::row_count(3, 2));
            }
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn exhausted_on_raised_failure_converts_to_execution_error() {
        let outcome = RunOutcome {
            state: terminal_state(Phase::Exhausted, Verdict::Fail(Diagnostic::raised("timed out"))),
        };
        assert!(matches!(
            outcome.into_result(),
            Err(SmithError::Execution { reason }) if reason == "timed out"
        ));
    }

    #[test]
    fn passed_outcome_yields_candidate() {
        let outcome = RunOutcome {
            state: terminal_state(Phase::Success, Verdict::Pass),
        };
        assert!(outcome.passed());
        assert_eq!(outcome.into_result().unwrap().attempt, 3);
    }

    // ── Identity and errors ──────────────────────────────────────────────────

    #[test]
    fn run_id_new_produces_unique_values() {
        let ids: std::collections::HashSet<String> =
            (0..50).map(|_| RunId::new().to_string()).collect();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn error_display_messages() {
        let err = SmithError::config("target 'hdfc' not found");
        assert!(err.is_configuration());
        assert!(err.to_string().contains("configuration error"));
        assert!(err.to_string().contains("hdfc"));

        let err = SmithError::Validation {
            diagnostic: Diagnostic::row_count(3, 2),
        };
        assert!(!err.is_configuration());
        assert!(err.to_string().contains("expected 3 rows, got 2"));
    }
}
