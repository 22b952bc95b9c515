//! `RecipeRunner`: executes extraction recipes on a bounded worker thread.

use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use tracing::{debug, warn};

use parsesmith_contracts::{candidate::ProgramDialect, execution::CapturedFailure};
use parsesmith_core::traits::{DocumentExtractor, Execution, SandboxRunner};

use crate::recipe::{Recipe, ENTRY_POINT, RECIPE_INSTRUCTIONS};

/// Default hard limit on one candidate execution.
pub const DEFAULT_EXECUTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs recipe candidates in-process.
///
/// Every call parses and compiles the recipe from scratch on a fresh worker
/// thread, so nothing survives between candidates. A worker that overruns
/// the timeout is abandoned; the regex engine runs in time linear in its
/// input, so an abandoned worker always finishes on its own.
pub struct RecipeRunner {
    extractor: Arc<dyn DocumentExtractor>,
    timeout: Duration,
}

impl RecipeRunner {
    pub fn new(extractor: Arc<dyn DocumentExtractor>) -> Self {
        Self {
            extractor,
            timeout: DEFAULT_EXECUTION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The recipe entry point: extract the document, then apply the recipe.
    fn parse(
        source: &str,
        sample: &Path,
        extractor: &dyn DocumentExtractor,
    ) -> Execution {
        let recipe = Recipe::from_toml_str(source).map_err(CapturedFailure::new)?;
        let compiled = recipe.compile().map_err(CapturedFailure::new)?;
        let text = extractor
            .extract(sample)
            .map_err(|e| CapturedFailure::new(format!("{ENTRY_POINT}: {e}")))?;
        Ok(compiled.apply(&text))
    }
}

impl SandboxRunner for RecipeRunner {
    fn dialect(&self) -> ProgramDialect {
        ProgramDialect {
            name: "recipe".to_string(),
            extension: "toml".to_string(),
            instructions: RECIPE_INSTRUCTIONS.to_string(),
        }
    }

    fn execute(&self, source: &str, sample: &Path) -> Execution {
        let (tx, rx) = mpsc::channel();
        let source = source.to_string();
        let sample: PathBuf = sample.to_path_buf();
        let extractor = Arc::clone(&self.extractor);

        let handle = std::thread::Builder::new()
            .name("recipe-worker".to_string())
            .spawn(move || {
                let result = Self::parse(&source, &sample, extractor.as_ref());
                // The receiver is gone only after a timeout.
                let _ = tx.send(result);
            })
            .map_err(|e| CapturedFailure::new(format!("failed to start worker: {e}")))?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => {
                if let Ok(table) = &result {
                    debug!(rows = table.row_count(), "recipe executed");
                }
                result
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(timeout_secs = self.timeout.as_secs_f64(), "recipe execution timed out");
                Err(CapturedFailure::new(format!(
                    "execution timed out after {:.1}s",
                    self.timeout.as_secs_f64()
                )))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                let message = match handle.join() {
                    Err(payload) => payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string()),
                    Ok(()) => "worker exited without a result".to_string(),
                };
                warn!(%message, "recipe worker panicked");
                Err(CapturedFailure::new(format!("candidate panicked: {message}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use parsesmith_contracts::error::SmithResult;

    use super::*;
    use crate::extract::PlainTextExtractor;

    const RECIPE: &str = r#"
entry = "parse"
row_pattern = '^(\S+)\s+(\d+)$'

[[columns]]
name = "Name"
kind = "text"

[[columns]]
name = "Count"
kind = "number"
"#;

    fn sample(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{text}").unwrap();
        file
    }

    fn runner() -> RecipeRunner {
        RecipeRunner::new(Arc::new(PlainTextExtractor))
    }

    struct PanickingExtractor;

    impl DocumentExtractor for PanickingExtractor {
        fn extract(&self, _path: &Path) -> SmithResult<String> {
            panic!("extractor blew up")
        }
    }

    struct SlowExtractor;

    impl DocumentExtractor for SlowExtractor {
        fn extract(&self, _path: &Path) -> SmithResult<String> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(String::new())
        }
    }

    #[test]
    fn executes_recipe_against_sample() {
        let file = sample("apples 3\npears 4\nnot a row\n");
        let table = runner().execute(RECIPE, file.path()).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_names(), vec!["Name", "Count"]);
    }

    #[test]
    fn malformed_recipe_is_captured() {
        let file = sample("apples 3\n");
        let failure = runner().execute("this is not toml", file.path()).unwrap_err();
        assert!(failure.message.contains("not valid TOML"), "{failure}");
    }

    #[test]
    fn missing_sample_is_captured() {
        let failure = runner()
            .execute(RECIPE, Path::new("/no/such/sample.txt"))
            .unwrap_err();
        assert!(failure.message.starts_with("parse:"), "{failure}");
    }

    #[test]
    fn panic_is_captured() {
        let file = sample("apples 3\n");
        let failure = RecipeRunner::new(Arc::new(PanickingExtractor))
            .execute(RECIPE, file.path())
            .unwrap_err();
        assert!(failure.message.contains("extractor blew up"), "{failure}");
    }

    #[test]
    fn overrun_is_captured_as_timeout() {
        let file = sample("apples 3\n");
        let failure = RecipeRunner::new(Arc::new(SlowExtractor))
            .with_timeout(Duration::from_millis(50))
            .execute(RECIPE, file.path())
            .unwrap_err();
        assert!(failure.message.contains("timed out"), "{failure}");
    }

    #[test]
    fn consecutive_candidates_are_independent() {
        let file = sample("apples 3\n");
        let r = runner();
        assert!(r.execute("entry = \"run\"", file.path()).is_err());
        assert_eq!(r.execute(RECIPE, file.path()).unwrap().row_count(), 1);
    }

    #[test]
    fn dialect_is_recipe_toml() {
        let d = runner().dialect();
        assert_eq!((d.name.as_str(), d.extension.as_str()), ("recipe", "toml"));
        assert!(d.instructions.contains("row_pattern"));
    }
}
