//! Verdicts and the diagnostics that explain a failed attempt.
//!
//! A diagnostic describes exactly one divergence. It is rendered into the
//! next generation prompt, so its `Display` form is written to be read by a
//! code generator as much as by an operator.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::table::CellValue;

/// The outcome of validating one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Verdict {
    Pass,
    Fail(Diagnostic),
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    /// The failure diagnostic, if any.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Self::Pass => None,
            Self::Fail(d) => Some(d),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => f.write_str("PASS"),
            Self::Fail(d) => write!(f, "FAIL: {d}"),
        }
    }
}

/// A structural difference between the produced and reference tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaMismatch {
    /// Column names, order, or count differ.
    Columns {
        expected: Vec<String>,
        actual: Vec<String>,
    },
    /// Same columns, different number of rows.
    RowCount { expected: usize, actual: usize },
}

/// Why a candidate failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    Schema { mismatch: SchemaMismatch },
    Cell {
        /// Zero-based data row index.
        row: usize,
        column: String,
        expected: CellValue,
        actual: CellValue,
    },
    /// The candidate raised, timed out, or returned the wrong shape.
    Raised { message: String },
    /// No candidate source could be obtained for the attempt.
    Generation { message: String },
}

impl Diagnostic {
    pub fn columns(expected: Vec<String>, actual: Vec<String>) -> Self {
        Self::Schema {
            mismatch: SchemaMismatch::Columns { expected, actual },
        }
    }

    pub fn row_count(expected: usize, actual: usize) -> Self {
        Self::Schema {
            mismatch: SchemaMismatch::RowCount { expected, actual },
        }
    }

    pub fn raised(message: impl Into<String>) -> Self {
        Self::Raised {
            message: message.into(),
        }
    }

    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
        }
    }

    /// Short machine-friendly label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Schema {
                mismatch: SchemaMismatch::Columns { .. },
            } => "column-mismatch",
            Self::Schema {
                mismatch: SchemaMismatch::RowCount { .. },
            } => "row-count-mismatch",
            Self::Cell { .. } => "cell-mismatch",
            Self::Raised { .. } => "raised-failure",
            Self::Generation { .. } => "generation-failure",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema {
                mismatch: SchemaMismatch::Columns { expected, actual },
            } => {
                write!(
                    f,
                    "column mismatch: expected columns [{}], got [{}]",
                    expected.join(", "),
                    actual.join(", ")
                )?;
                if let Some((i, (e, a))) = expected
                    .iter()
                    .zip(actual.iter())
                    .enumerate()
                    .find(|(_, (e, a))| e != a)
                {
                    write!(f, "; first difference at position {i}: expected '{e}', got '{a}'")?;
                } else if expected.len() != actual.len() {
                    write!(
                        f,
                        "; expected {} columns, got {}",
                        expected.len(),
                        actual.len()
                    )?;
                }
                Ok(())
            }
            Self::Schema {
                mismatch: SchemaMismatch::RowCount { expected, actual },
            } => write!(f, "row count mismatch: expected {expected} rows, got {actual}"),
            Self::Cell {
                row,
                column,
                expected,
                actual,
            } => write!(
                f,
                "cell mismatch at row {row}, column '{column}': expected {expected}, got {actual}"
            ),
            Self::Raised { message } => write!(f, "candidate raised: {message}"),
            Self::Generation { message } => write!(f, "no candidate generated: {message}"),
        }
    }
}
