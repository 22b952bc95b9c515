//! Document extractors: sample document on disk → text.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use parsesmith_contracts::error::{SmithError, SmithResult};
use parsesmith_core::traits::DocumentExtractor;

/// Reads the document as UTF-8 text.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl DocumentExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> SmithResult<String> {
        std::fs::read_to_string(path).map_err(|e| SmithError::Execution {
            reason: format!("failed to read '{}': {}", path.display(), e),
        })
    }
}

/// Runs an external converter and takes its stdout as the document text.
///
/// The argument `{input}` is replaced by the document path, e.g.
/// `pdftotext -layout {input} -`.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: String,
    args: Vec<String>,
}

impl CommandExtractor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// `pdftotext -layout <document> -`, which keeps column alignment.
    pub fn pdftotext() -> Self {
        Self::new(
            "pdftotext",
            vec!["-layout".into(), "{input}".into(), "-".into()],
        )
    }
}

impl DocumentExtractor for CommandExtractor {
    fn extract(&self, path: &Path) -> SmithResult<String> {
        let args: Vec<std::ffi::OsString> = self
            .args
            .iter()
            .map(|a| {
                if a == "{input}" {
                    path.as_os_str().to_os_string()
                } else {
                    a.into()
                }
            })
            .collect();

        debug!(program = %self.program, path = %path.display(), "extracting document text");
        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| SmithError::Execution {
                reason: format!("failed to start '{}': {}", self.program, e),
            })?;

        if !output.status.success() {
            return Err(SmithError::Execution {
                reason: format!(
                    "'{}' exited with {}: {}",
                    self.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Picks an extractor by file extension: `.pdf` through `pdftotext`,
/// everything else as plain text.
#[derive(Debug, Clone)]
pub struct AutoExtractor {
    pdf: CommandExtractor,
}

impl AutoExtractor {
    pub fn new() -> Self {
        Self {
            pdf: CommandExtractor::pdftotext(),
        }
    }

    pub fn with_pdf_extractor(mut self, pdf: CommandExtractor) -> Self {
        self.pdf = pdf;
        self
    }
}

impl Default for AutoExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentExtractor for AutoExtractor {
    fn extract(&self, path: &Path) -> SmithResult<String> {
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            self.pdf.extract(path)
        } else {
            PlainTextExtractor.extract(path)
        }
    }
}
