//! Prompt construction for the generation step.
//!
//! A `PromptContext` carries everything a generator may use. Model-backed
//! generators send `render()` to their backend; the template generator reads
//! the schema directly.

use serde::Serialize;

use parsesmith_contracts::{
    candidate::ProgramDialect,
    table::Column,
    verdict::Diagnostic,
};

/// Marker appended to a truncated sample excerpt.
pub const TRUNCATION_MARKER: &str = "[... excerpt truncated ...]";

/// Reference data rows shown to the generator.
pub const REFERENCE_PREVIEW_ROWS: usize = 3;

/// Inputs to one generation call.
#[derive(Debug, Clone, Serialize)]
pub struct PromptContext {
    pub target: String,
    /// Reference columns, in order, with their classified kinds.
    pub schema: Vec<Column>,
    /// Header plus the first reference rows, as CSV.
    pub reference_preview: String,
    /// Data rows the reference holds.
    pub reference_rows: usize,
    pub sample_excerpt: String,
    /// Diagnostic of the immediately preceding attempt, if it failed.
    pub diagnostic: Option<Diagnostic>,
    /// Source of the immediately preceding candidate, if there was one.
    pub previous_source: Option<String>,
    /// 1-based attempt this generation belongs to.
    pub attempt: u32,
    pub dialect: ProgramDialect,
}

impl PromptContext {
    /// Render the full prompt text sent to a model backend.
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!(
            "You are writing a parser for '{}' bank statements (attempt {}).\n\n",
            self.target, self.attempt
        ));

        out.push_str("## Output schema\n");
        out.push_str("The parser must return exactly these columns, in this order:\n");
        for (i, column) in self.schema.iter().enumerate() {
            out.push_str(&format!("{}. {} ({})\n", i + 1, column.name, column.kind));
        }
        out.push('\n');
        out.push_str(&format!(
            "The expected output has {} data rows. It starts like this (CSV):\n```\n",
            self.reference_rows
        ));
        out.push_str(self.reference_preview.trim_end());
        out.push_str("\n```\n\n");

        out.push_str(&format!("## Program format: {}\n", self.dialect.name));
        out.push_str(self.dialect.instructions.trim_end());
        out.push_str("\n\n");

        out.push_str("## Sample document excerpt\n```\n");
        out.push_str(self.sample_excerpt.trim_end());
        out.push_str("\n```\n\n");

        if let Some(diagnostic) = &self.diagnostic {
            out.push_str("## The previous attempt failed\n");
            out.push_str(&diagnostic.to_string());
            out.push_str("\n\n");
            if let Some(previous) = &self.previous_source {
                out.push_str("Previous program:\n```\n");
                out.push_str(previous.trim_end());
                out.push_str("\n```\n\n");
            }
            out.push_str("Fix the program so that its output matches the schema and values exactly.\n\n");
        }

        out.push_str("Respond with the program source only, without explanations.\n");
        out
    }
}

/// Bound `text` to at most `max_chars` characters.
///
/// Cuts at the last line break inside the bound when there is one, so the
/// excerpt never ends mid-line, and appends `TRUNCATION_MARKER`.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let byte_end = text
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let head = &text[..byte_end];
    let head = match head.rfind('\n') {
        Some(i) if i > 0 => &head[..i],
        _ => head,
    };

    format!("{head}\n{TRUNCATION_MARKER}")
}

#[cfg(test)]
mod tests {
    use parsesmith_contracts::table::ColumnKind;

    use super::*;

    fn context(diagnostic: Option<Diagnostic>, previous: Option<&str>) -> PromptContext {
        PromptContext {
            target: "icici".to_string(),
            schema: vec![
                Column::new("Date", ColumnKind::Date),
                Column::new("Description", ColumnKind::Text),
                Column::new("Amount", ColumnKind::Amount),
            ],
            reference_preview: "Date,Description,Amount\n2024-01-05,Salary,5000.00\n".to_string(),
            reference_rows: 12,
            sample_excerpt: "05-01-2024 Salary 5000.00".to_string(),
            diagnostic,
            previous_source: previous.map(str::to_string),
            attempt: 2,
            dialect: ProgramDialect {
                name: "recipe".to_string(),
                extension: "toml".to_string(),
                instructions: "Write a TOML recipe.".to_string(),
            },
        }
    }

    #[test]
    fn render_lists_schema_in_order_with_kinds() {
        let text = context(None, None).render();
        let date = text.find("1. Date (date)").unwrap();
        let desc = text.find("2. Description (text)").unwrap();
        let amount = text.find("3. Amount (amount)").unwrap();
        assert!(date < desc && desc < amount);
        assert!(text.contains("Write a TOML recipe."));
        assert!(text.contains("05-01-2024 Salary 5000.00"));
        assert!(!text.contains("previous attempt failed"));
    }

    #[test]
    fn render_shows_reference_rows_below_schema() {
        let text = context(None, None).render();
        let schema = text.find("3. Amount (amount)").unwrap();
        let count = text.find("The expected output has 12 data rows").unwrap();
        let preview = text.find("2024-01-05,Salary,5000.00").unwrap();
        assert!(schema < count && count < preview);
    }

    #[test]
    fn render_includes_diagnostic_and_previous_source() {
        let text = context(Some(Diagnostic::row_count(3, 2)), Some("entry = \"parse\"")).render();
        assert!(text.contains("expected 3 rows, got 2"));
        assert!(text.contains("entry = \"parse\""));
    }

    #[test]
    fn excerpt_keeps_short_text_intact() {
        assert_eq!(excerpt("line one\nline two", 100), "line one\nline two");
    }

    #[test]
    fn excerpt_cuts_at_line_boundary() {
        let text = "first line\nsecond line\nthird line";
        let cut = excerpt(text, 15);
        assert!(cut.starts_with("first line\n"));
        assert!(!cut.contains("second"));
        assert!(cut.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn excerpt_is_char_boundary_safe() {
        let text = "₹₹₹₹₹₹₹₹₹₹";
        let cut = excerpt(text, 4);
        assert!(cut.starts_with("₹₹₹₹"));
    }
}
