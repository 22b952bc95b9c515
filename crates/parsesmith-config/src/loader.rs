//! Loading, validation, and target resolution.
//!
//! Resolution order for a target's paths:
//!
//! 1. Explicit CLI overrides (`TargetOverrides`).
//! 2. The matching `[[targets]]` entry.
//! 3. The default layout under `settings.data_dir` / `settings.parsers_dir`.
//!
//! Resolution never checks that input files exist; the agent loop does that
//! in `Init` and reports a configuration error there.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use parsesmith_contracts::{
    error::{SmithError, SmithResult},
    target::Target,
};

use crate::settings::{SmithConfig, TargetEntry};

/// File name looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "parsesmith.toml";

/// Per-invocation path overrides, usually from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct TargetOverrides {
    pub sample: Option<PathBuf>,
    pub reference: Option<PathBuf>,
    pub parser: Option<PathBuf>,
}

impl SmithConfig {
    /// Parse `s` as TOML and validate it.
    ///
    /// Returns `SmithError::Configuration` if the TOML is malformed, has
    /// unknown keys, or fails validation.
    pub fn from_toml_str(s: &str) -> SmithResult<Self> {
        let config: SmithConfig = toml::from_str(s)
            .map_err(|e| SmithError::config(format!("failed to parse configuration TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read the file at `path` and parse it.
    pub fn from_file(path: &Path) -> SmithResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SmithError::config(format!(
                "failed to read configuration file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Load `path` when given; otherwise `parsesmith.toml` in the working
    /// directory if present, or the defaults.
    pub fn load(path: Option<&Path>) -> SmithResult<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    debug!(path = DEFAULT_CONFIG_FILE, "loading default configuration file");
                    Self::from_file(default)
                } else {
                    debug!("no configuration file; using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    /// Reject values the loop cannot run with.
    pub fn validate(&self) -> SmithResult<()> {
        let s = &self.settings;
        if s.max_attempts == 0 {
            return Err(SmithError::config("settings.max_attempts must be at least 1"));
        }
        if s.excerpt_chars == 0 {
            return Err(SmithError::config("settings.excerpt_chars must be at least 1"));
        }
        if s.generation_timeout_secs == 0 || s.execution_timeout_secs == 0 {
            return Err(SmithError::config("settings timeouts must be at least 1 second"));
        }
        if !(s.amount_epsilon >= 0.0 && s.amount_epsilon.is_finite()) {
            return Err(SmithError::config(
                "settings.amount_epsilon must be a finite, non-negative number",
            ));
        }

        let mut seen = BTreeSet::new();
        for entry in &self.targets {
            validate_target_name(&entry.name)?;
            if !seen.insert(entry.name.as_str()) {
                return Err(SmithError::config(format!(
                    "target '{}' is declared more than once",
                    entry.name
                )));
            }
        }
        Ok(())
    }

    pub fn target_names(&self) -> Vec<String> {
        self.targets.iter().map(|t| t.name.clone()).collect()
    }

    pub fn target_entry(&self, name: &str) -> Option<&TargetEntry> {
        self.targets.iter().find(|t| t.name == name)
    }

    /// Build the `Target` for `name`.
    ///
    /// `extension` is the runner dialect's parser file extension. Targets
    /// not listed in `[[targets]]` use the default layout.
    pub fn resolve_target(
        &self,
        name: &str,
        overrides: &TargetOverrides,
        extension: &str,
    ) -> SmithResult<Target> {
        validate_target_name(name)?;
        let entry = self.target_entry(name);
        let data = self.settings.data_dir.join(name);

        let sample = overrides
            .sample
            .clone()
            .or_else(|| entry.and_then(|e| e.sample.clone()))
            .unwrap_or_else(|| default_sample(&data, name));
        let reference = overrides
            .reference
            .clone()
            .or_else(|| entry.and_then(|e| e.reference.clone()))
            .unwrap_or_else(|| data.join(format!("{name}_sample.csv")));
        let parser = overrides
            .parser
            .clone()
            .or_else(|| entry.and_then(|e| e.parser.clone()))
            .unwrap_or_else(|| {
                self.settings
                    .parsers_dir
                    .join(format!("{name}_parser.{extension}"))
            });

        let declared = entry.map(|e| e.column_types.clone()).unwrap_or_default();
        let target = declared
            .into_iter()
            .fold(Target::new(name, sample, reference, parser), |t, (column, kind)| {
                t.with_column_type(column, kind)
            });

        debug!(
            target = %target.name,
            sample = %target.sample_path.display(),
            reference = %target.reference_path.display(),
            parser = %target.parser_path.display(),
            configured = entry.is_some(),
            "target resolved"
        );
        Ok(target)
    }
}

/// `data/<t>/<t>_sample.pdf`, or its `.txt` rendition when only that exists.
fn default_sample(data: &Path, name: &str) -> PathBuf {
    let pdf = data.join(format!("{name}_sample.pdf"));
    let txt = pdf.with_extension("txt");
    if !pdf.exists() && txt.exists() {
        txt
    } else {
        pdf
    }
}

/// Target names become file names, so keep them to `[A-Za-z0-9_-]`.
fn validate_target_name(name: &str) -> SmithResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(SmithError::config(format!(
            "invalid target name '{name}': use letters, digits, '_' or '-'"
        )))
    }
}
