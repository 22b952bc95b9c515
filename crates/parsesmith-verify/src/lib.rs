//! # parsesmith-verify
//!
//! Output validation for the parsesmith agent loop.
//!
//! This crate provides [`engine::TableValidator`], which implements the
//! [`parsesmith_core::traits::Validator`] trait. It compares a produced
//! `TabularResult` with the reference in three phases and stops at the first
//! divergence:
//!
//! 1. **Columns**: names and order must match exactly.
//! 2. **Row count**: must match exactly.
//! 3. **Cells**: row-major, each pair normalized by the reference column's
//!    kind (dates as calendar dates, amounts within an epsilon, text trimmed).
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use parsesmith_verify::engine::TableValidator;
//!
//! let validator = TableValidator::new().with_amount_epsilon(0.005);
//! ```

pub mod engine;

pub use engine::TableValidator;
