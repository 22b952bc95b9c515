//! # parsesmith-ref-banks
//!
//! Reference statement family for the parsesmith agent loop.
//!
//! Demonstrates three runs against the bundled ACME Savings Bank statement:
//!
//! 1. **Template pass**: the schema-driven template recipe reproduces the
//!    reference on the first attempt.
//! 2. **Guided repair**: a flawed first candidate drops rows; the row-count
//!    diagnostic is fed back and the second candidate passes.
//! 3. **Exhaustion**: a reference the statement cannot satisfy uses up the
//!    attempt ceiling and ends with the last diagnostic.
//!
//! All data is fictional and written to temporary directories. No network
//! calls are made.

pub mod mock_data;
pub mod scenarios;
