//! Target identity: one document family under automation.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::table::ColumnKind;

/// One document family (e.g. one bank's statement layout).
///
/// Built once at invocation time from configuration and never modified
/// during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Unique key, e.g. "icici".
    pub name: String,
    /// Sample document the candidate is run against.
    pub sample_path: PathBuf,
    /// Known-correct CSV output for the sample.
    pub reference_path: PathBuf,
    /// Where the latest candidate is persisted.
    pub parser_path: PathBuf,
    /// Explicit column classifications that override inference.
    #[serde(default)]
    pub column_types: BTreeMap<String, ColumnKind>,
}

impl Target {
    pub fn new(
        name: impl Into<String>,
        sample_path: impl Into<PathBuf>,
        reference_path: impl Into<PathBuf>,
        parser_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            sample_path: sample_path.into(),
            reference_path: reference_path.into(),
            parser_path: parser_path.into(),
            column_types: BTreeMap::new(),
        }
    }

    /// Declare the kind of one reference column.
    pub fn with_column_type(mut self, column: impl Into<String>, kind: ColumnKind) -> Self {
        self.column_types.insert(column.into(), kind);
        self
    }
}
