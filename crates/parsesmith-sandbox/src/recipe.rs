//! Extraction recipes: the TOML program dialect interpreted in-process.
//!
//! A recipe is a small declarative program:
//!
//! ```toml
//! entry = "parse"
//! row_pattern = '^(\d{2}-\d{2}-\d{4})\s+(.+?)\s+(-?[\d,]*\.\d+)$'
//! start_after = '^Date\s+Description'   # optional
//! stop_at = '^Closing balance'          # optional
//! skip = '^Page \d+'                    # optional
//!
//! [[columns]]
//! name = "Date"
//! kind = "date"
//! date_format = "%d-%m-%Y"              # optional
//!
//! [[columns]]
//! name = "Description"
//! kind = "text"
//! group = 2                             # optional, defaults to position + 1
//! ```
//!
//! Lines are scanned top to bottom. Scanning starts after the first line
//! matching `start_after` (or at the top) and ends at the first line matching
//! `stop_at`. Every other line matching `row_pattern` and not `skip` becomes
//! one row.

use regex::Regex;
use serde::Deserialize;

use parsesmith_contracts::table::{parse_date_with, CellValue, Column, ColumnKind, TabularResult};

/// The only entry point a recipe may declare.
pub const ENTRY_POINT: &str = "parse";

/// Authoring rules rendered into generation prompts.
pub const RECIPE_INSTRUCTIONS: &str = r#"Write an extraction recipe as a TOML document with these keys:
- entry = "parse" (required, exactly this value)
- row_pattern: a regular expression (Rust regex syntax) matched against each line of the document text; every matching line becomes one row
- start_after (optional): regex; rows are only taken after the first line that matches it
- stop_at (optional): regex; scanning stops at the first line that matches it
- skip (optional): regex; matching lines are ignored
- one [[columns]] table per output column, in output order, with:
  - name: the exact column name
  - kind: one of "text", "number", "amount", "date"
  - group (optional): 1-based capture group of row_pattern holding the value; defaults to the column's position
  - date_format (optional): chrono format such as "%d-%m-%Y" for date columns
A capture group that does not participate in a match yields an empty cell.
Use single-quoted TOML strings for regexes so backslashes need no escaping."#;

/// A recipe as written by a generator.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Recipe {
    pub entry: String,
    pub row_pattern: String,
    #[serde(default)]
    pub start_after: Option<String>,
    #[serde(default)]
    pub stop_at: Option<String>,
    #[serde(default)]
    pub skip: Option<String>,
    pub columns: Vec<RecipeColumn>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipeColumn {
    pub name: String,
    pub kind: ColumnKind,
    #[serde(default)]
    pub group: Option<usize>,
    #[serde(default)]
    pub date_format: Option<String>,
}

impl Recipe {
    pub fn from_toml_str(source: &str) -> Result<Self, String> {
        toml::from_str(source).map_err(|e| format!("recipe is not valid TOML: {e}"))
    }

    /// Check the entry point, compile every regex, and resolve groups.
    pub fn compile(&self) -> Result<CompiledRecipe, String> {
        if self.entry != ENTRY_POINT {
            return Err(format!(
                "entry point '{}' not found; recipes must declare entry = \"{ENTRY_POINT}\"",
                self.entry
            ));
        }
        if self.columns.is_empty() {
            return Err("recipe declares no columns".to_string());
        }

        let row = compile_regex("row_pattern", &self.row_pattern)?;
        let groups = row.captures_len() - 1;

        let mut columns = Vec::with_capacity(self.columns.len());
        for (idx, col) in self.columns.iter().enumerate() {
            let group = col.group.unwrap_or(idx + 1);
            if group == 0 || group > groups {
                return Err(format!(
                    "column '{}' reads capture group {}, but row_pattern has {} group(s)",
                    col.name, group, groups
                ));
            }
            columns.push(CompiledColumn {
                column: Column::new(col.name.clone(), col.kind),
                group,
                date_format: col.date_format.clone(),
            });
        }

        Ok(CompiledRecipe {
            row,
            start_after: self
                .start_after
                .as_deref()
                .map(|p| compile_regex("start_after", p))
                .transpose()?,
            stop_at: self
                .stop_at
                .as_deref()
                .map(|p| compile_regex("stop_at", p))
                .transpose()?,
            skip: self
                .skip
                .as_deref()
                .map(|p| compile_regex("skip", p))
                .transpose()?,
            columns,
        })
    }
}

fn compile_regex(field: &str, pattern: &str) -> Result<Regex, String> {
    Regex::new(pattern).map_err(|e| format!("{field} is not a valid regex: {e}"))
}

#[derive(Debug)]
struct CompiledColumn {
    column: Column,
    group: usize,
    date_format: Option<String>,
}

/// A recipe ready to run. Built per invocation, never cached.
#[derive(Debug)]
pub struct CompiledRecipe {
    row: Regex,
    start_after: Option<Regex>,
    stop_at: Option<Regex>,
    skip: Option<Regex>,
    columns: Vec<CompiledColumn>,
}

impl CompiledRecipe {
    /// Apply the recipe to document text.
    ///
    /// Values that cannot be read as their column's kind are kept as text so
    /// the validator can report them verbatim.
    pub fn apply(&self, text: &str) -> TabularResult {
        let mut table = TabularResult::new(self.columns.iter().map(|c| c.column.clone()).collect());
        let mut started = self.start_after.is_none();

        for line in text.lines() {
            if !started {
                started = self.start_after.as_ref().is_some_and(|re| re.is_match(line));
                continue;
            }
            if self.stop_at.as_ref().is_some_and(|re| re.is_match(line)) {
                break;
            }
            if self.skip.as_ref().is_some_and(|re| re.is_match(line)) {
                continue;
            }
            let Some(caps) = self.row.captures(line) else {
                continue;
            };

            let row = self
                .columns
                .iter()
                .map(|c| match caps.get(c.group) {
                    None => CellValue::Empty,
                    Some(m) => read_cell(m.as_str(), c),
                })
                .collect();
            table.rows.push(row);
        }

        table
    }
}

fn read_cell(raw: &str, column: &CompiledColumn) -> CellValue {
    let parsed = match (&column.date_format, column.column.kind) {
        (Some(fmt), ColumnKind::Date) if !raw.trim().is_empty() => {
            parse_date_with(raw, fmt).map(CellValue::Date)
        }
        _ => CellValue::parse(raw, column.column.kind),
    };
    parsed.unwrap_or_else(|| CellValue::Text(raw.trim().to_string()))
}
