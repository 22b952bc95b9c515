//! # parsesmith-config
//!
//! TOML configuration for parsesmith: loop settings, generator and runner
//! selection, and the target registry.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use parsesmith_config::{SmithConfig, TargetOverrides};
//!
//! let config = SmithConfig::load(None)?;
//! let target = config.resolve_target("icici", &TargetOverrides::default(), "toml")?;
//! ```

pub mod loader;
pub mod settings;

pub use loader::{TargetOverrides, DEFAULT_CONFIG_FILE};
pub use settings::{
    ProviderConfig, ProviderKind, RunnerConfig, RunnerKind, Settings, SmithConfig, TargetEntry,
};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use parsesmith_contracts::{error::SmithError, table::ColumnKind};

    use crate::{ProviderKind, RunnerKind, SmithConfig, TargetOverrides};

    // ── 1. defaults ───────────────────────────────────────────────────────────

    /// An empty document is a complete configuration.
    #[test]
    fn test_empty_document_uses_defaults() {
        let config = SmithConfig::from_toml_str("").unwrap();

        assert_eq!(config.settings.max_attempts, 3);
        assert_eq!(config.settings.execution_timeout_secs, 30);
        assert_eq!(config.settings.generation_timeout_secs, 60);
        assert_eq!(config.settings.data_dir, PathBuf::from("data"));
        assert_eq!(config.provider.kind, ProviderKind::Template);
        assert_eq!(config.runner.kind, RunnerKind::Recipe);
        assert!(config.targets.is_empty());
    }

    // ── 2. full document ──────────────────────────────────────────────────────

    #[test]
    fn test_full_document() {
        let toml = r#"
            [settings]
            max_attempts = 5
            amount_epsilon = 0.005
            parsers_dir = "out"

            [provider]
            kind = "groq"
            model = "llama3-70b-8192"

            [runner]
            kind = "command"
            interpreter = "python3"
            extension = "py"

            [[targets]]
            name = "icici"
            column_types = { "Debit Amt" = "amount", "Ref" = "text" }

            [[targets]]
            name = "sbi"
            sample = "statements/sbi.pdf"
            reference = "statements/sbi.csv"
        "#;

        let config = SmithConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.settings.max_attempts, 5);
        assert_eq!(config.settings.excerpt_chars, 4000, "unset fields keep defaults");
        assert_eq!(config.provider.kind, ProviderKind::Groq);
        assert_eq!(config.provider.model.as_deref(), Some("llama3-70b-8192"));
        assert_eq!(config.runner.kind, RunnerKind::Command);
        assert_eq!(config.target_names(), vec!["icici", "sbi"]);
        assert_eq!(
            config.target_entry("icici").unwrap().column_types.get("Debit Amt"),
            Some(&ColumnKind::Amount)
        );
    }

    // ── 3. target resolution ──────────────────────────────────────────────────

    #[test]
    fn test_unlisted_target_uses_default_layout() {
        let config = SmithConfig::default();
        let target = config
            .resolve_target("icici", &TargetOverrides::default(), "toml")
            .unwrap();

        assert_eq!(target.sample_path, Path::new("data/icici/icici_sample.pdf"));
        assert_eq!(target.reference_path, Path::new("data/icici/icici_sample.csv"));
        assert_eq!(target.parser_path, Path::new("custom_parsers/icici_parser.toml"));
        assert!(target.column_types.is_empty());
    }

    #[test]
    fn test_entry_paths_and_overrides() {
        let toml = r#"
            [[targets]]
            name = "sbi"
            sample = "statements/sbi.pdf"
            reference = "statements/sbi.csv"
            column_types = { "Amount" = "amount" }
        "#;
        let config = SmithConfig::from_toml_str(toml).unwrap();

        let target = config
            .resolve_target("sbi", &TargetOverrides::default(), "py")
            .unwrap();
        assert_eq!(target.sample_path, Path::new("statements/sbi.pdf"));
        assert_eq!(target.parser_path, Path::new("custom_parsers/sbi_parser.py"));
        assert_eq!(target.column_types.get("Amount"), Some(&ColumnKind::Amount));

        let overrides = TargetOverrides {
            sample: Some(PathBuf::from("elsewhere.txt")),
            ..TargetOverrides::default()
        };
        let target = config.resolve_target("sbi", &overrides, "py").unwrap();
        assert_eq!(target.sample_path, Path::new("elsewhere.txt"));
        assert_eq!(target.reference_path, Path::new("statements/sbi.csv"));
    }

    #[test]
    fn test_text_rendition_is_used_when_pdf_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("icici");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::write(data.join("icici_sample.txt"), "text").unwrap();

        let mut config = SmithConfig::default();
        config.settings.data_dir = dir.path().to_path_buf();

        let target = config
            .resolve_target("icici", &TargetOverrides::default(), "toml")
            .unwrap();
        assert_eq!(target.sample_path, data.join("icici_sample.txt"));
    }

    // ── 4. validation ─────────────────────────────────────────────────────────

    #[test]
    fn test_invalid_target_name_is_rejected() {
        let err = SmithConfig::default()
            .resolve_target("../etc", &TargetOverrides::default(), "toml")
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("invalid target name"));
    }

    #[test]
    fn test_duplicate_targets_are_rejected() {
        let toml = r#"
            [[targets]]
            name = "icici"

            [[targets]]
            name = "icici"
        "#;
        let err = SmithConfig::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("declared more than once"));
    }

    #[test]
    fn test_zero_attempts_is_rejected() {
        let err = SmithConfig::from_toml_str("[settings]\nmax_attempts = 0\n").unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn test_zero_excerpt_chars_is_rejected() {
        let err = SmithConfig::from_toml_str("[settings]\nexcerpt_chars = 0\n").unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("excerpt_chars"));
    }

    // ── 5. TOML errors ────────────────────────────────────────────────────────

    /// Malformed TOML and unknown keys are configuration errors.
    #[test]
    fn test_toml_parse_error() {
        for bad in ["this is not valid toml ][[[", "[settings]\nmax_attemps = 3\n"] {
            match SmithConfig::from_toml_str(bad) {
                Err(SmithError::Configuration { reason }) => {
                    assert!(
                        reason.contains("failed to parse configuration TOML"),
                        "unexpected reason: {reason}"
                    );
                }
                other => panic!("expected Configuration error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let err = SmithConfig::load(Some(Path::new("/no/such/parsesmith.toml"))).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_provider_and_runner_parse_from_flags() {
        assert_eq!("Gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert!("bard".parse::<ProviderKind>().is_err());
        assert_eq!("command".parse::<RunnerKind>().unwrap(), RunnerKind::Command);
    }
}
