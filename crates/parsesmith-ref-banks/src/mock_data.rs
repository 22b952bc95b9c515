//! Simulated statement data for the reference scenarios.
//!
//! Everything here is fictional. The statement text stands in for the output
//! of `pdftotext -layout` on a real PDF.

use std::path::{Path, PathBuf};

use tracing::debug;

use parsesmith_contracts::{
    error::{SmithError, SmithResult},
    target::Target,
};

/// Target key used by every scenario.
pub const TARGET: &str = "acme";

// ── Statement text (mock) ─────────────────────────────────────────────────────

/// One month of an ACME Savings Bank statement, column-aligned.
pub const ACME_STATEMENT_TEXT: &str = "\
ACME SAVINGS BANK                                   Statement of Account
Account: 0012-3456-789                              Period: 01/01/2024 - 31/01/2024
Opening balance                                                 12,500.00

Date        Description                     Amount       Balance
02-01-2024  UPI/Grocery Mart                -1,245.50    11,254.50
03-01-2024  Salary credit ACME Corp         85,000.00    96,254.50
05-01-2024  ATM withdrawal                  -5,000.00    91,254.50
09-01-2024  Electricity bill BESCOM         -2,310.75    88,943.75
15-01-2024  Interest credit                 312.40       89,256.15
28-01-2024  Rent transfer                   -25,000.00   64,256.15

Closing balance                                                 64,256.15
Page 1 of 1
";

// ── Reference output (mock) ───────────────────────────────────────────────────

/// The known-correct extraction of `ACME_STATEMENT_TEXT`.
pub const ACME_REFERENCE_CSV: &str = "\
Date,Description,Amount,Balance
2024-01-02,UPI/Grocery Mart,-1245.50,11254.50
2024-01-03,Salary credit ACME Corp,85000.00,96254.50
2024-01-05,ATM withdrawal,-5000.00,91254.50
2024-01-09,Electricity bill BESCOM,-2310.75,88943.75
2024-01-15,Interest credit,312.40,89256.15
2024-01-28,Rent transfer,-25000.00,64256.15
";

/// A reference asking for a `Reference No` column the statement never
/// prints. No candidate can satisfy it.
pub const ACME_UNSATISFIABLE_CSV: &str = "\
Date,Reference No,Description,Amount,Balance
2024-01-02,UPI-88213,UPI/Grocery Mart,-1245.50,11254.50
2024-01-03,NEFT-10021,Salary credit ACME Corp,85000.00,96254.50
2024-01-05,ATM-55120,ATM withdrawal,-5000.00,91254.50
2024-01-09,BBPS-7781,Electricity bill BESCOM,-2310.75,88943.75
2024-01-15,INT-0124,Interest credit,312.40,89256.15
2024-01-28,IMPS-4410,Rent transfer,-25000.00,64256.15
";

/// Write the statement and `reference_csv` under `dir` in the default
/// layout, and return the target pointing at them.
pub fn write_fixture(dir: &Path, reference_csv: &str, parser_ext: &str) -> SmithResult<Target> {
    let data = dir.join("data").join(TARGET);
    std::fs::create_dir_all(&data).map_err(|e| io_error(&data, e))?;

    let sample = data.join(format!("{TARGET}_sample.txt"));
    let reference = data.join(format!("{TARGET}_sample.csv"));
    std::fs::write(&sample, ACME_STATEMENT_TEXT).map_err(|e| io_error(&sample, e))?;
    std::fs::write(&reference, reference_csv).map_err(|e| io_error(&reference, e))?;

    let parser: PathBuf = dir
        .join("custom_parsers")
        .join(format!("{TARGET}_parser.{parser_ext}"));
    debug!(dir = %dir.display(), "statement fixture written");
    Ok(Target::new(TARGET, sample, reference, parser))
}

fn io_error(path: &Path, e: std::io::Error) -> SmithError {
    SmithError::config(format!("failed to write fixture '{}': {}", path.display(), e))
}
