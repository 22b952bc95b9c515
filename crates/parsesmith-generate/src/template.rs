//! The deterministic fallback generator.
//!
//! Builds a recipe straight from the target schema: one capture group per
//! column, chosen by the column's kind, separated by runs of whitespace and
//! anchored to the whole line. The output depends only on the schema, so the
//! same context always yields the same recipe.

use tracing::debug;

use parsesmith_contracts::{
    candidate::GenerationStrategy,
    error::{SmithError, SmithResult},
    table::ColumnKind,
};
use parsesmith_core::{prompt::PromptContext, traits::Generator};

/// Dialect name the template generator writes.
pub const RECIPE_DIALECT: &str = "recipe";

const DATE_GROUP: &str = r"(\d{1,4}[-/.]\d{1,2}[-/.]\d{1,4}|\d{1,2}[ -][A-Za-z]{3}[ -]\d{2,4})";
const NUMBER_GROUP: &str = r"(-?[\d,]*\.?\d+)";
const TEXT_GROUP: &str = r"(.+?)";

/// Schema-driven recipe generator. Needs no network and no credentials.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateGenerator;

impl TemplateGenerator {
    pub fn new() -> Self {
        Self
    }

    fn group_for(kind: ColumnKind) -> &'static str {
        match kind {
            ColumnKind::Date => DATE_GROUP,
            ColumnKind::Number | ColumnKind::Amount => NUMBER_GROUP,
            ColumnKind::Text => TEXT_GROUP,
        }
    }

    /// The recipe source for `ctx`'s schema.
    pub fn render(ctx: &PromptContext) -> String {
        let groups: Vec<&str> = ctx.schema.iter().map(|c| Self::group_for(c.kind)).collect();
        let pattern = format!(r"^\s*{}\s*$", groups.join(r"\s+"));

        let mut out = String::new();
        out.push_str(&format!("# extraction recipe for '{}'\n", ctx.target));
        out.push_str("entry = \"parse\"\n");
        out.push_str(&format!("row_pattern = '{pattern}'\n"));
        for column in &ctx.schema {
            out.push_str("\n[[columns]]\n");
            out.push_str(&format!("name = {}\n", toml_basic_string(&column.name)));
            out.push_str(&format!("kind = \"{}\"\n", column.kind));
        }
        out
    }
}

/// Quote `s` as a TOML basic string.
fn toml_basic_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

impl Generator for TemplateGenerator {
    fn strategy(&self) -> GenerationStrategy {
        GenerationStrategy::Template
    }

    fn generate(&self, ctx: &PromptContext) -> SmithResult<String> {
        if ctx.dialect.name != RECIPE_DIALECT {
            return Err(SmithError::Generation {
                reason: format!(
                    "template generator only writes '{RECIPE_DIALECT}' programs, runner expects '{}'",
                    ctx.dialect.name
                ),
            });
        }
        if ctx.schema.is_empty() {
            return Err(SmithError::Generation {
                reason: "schema has no columns".to_string(),
            });
        }

        let source = Self::render(ctx);
        debug!(target = %ctx.target, columns = ctx.schema.len(), "template recipe rendered");
        Ok(source)
    }
}
