//! parsesmith: generate, run and repair statement parsers.
//!
//! Usage:
//!   parsesmith run --target icici
//!   parsesmith run --target icici --provider groq --max-attempts 5
//!   parsesmith run-all --config parsesmith.toml
//!   parsesmith validate --target icici
//!   parsesmith demo
//!
//! Exit status: 0 when every run passes, 1 when a run exhausts its attempts,
//! 2 on configuration errors.

mod wiring;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use parsesmith_config::{ProviderKind, RunnerKind, SmithConfig, TargetOverrides};
use parsesmith_contracts::{
    error::{SmithError, SmithResult},
    execution::RunOutcome,
    verdict::Verdict,
};
use parsesmith_core::traits::{AttemptJournal, NullJournal};
use parsesmith_journal::InMemoryJournal;
use parsesmith_ref_banks::scenarios::{exhaustion, guided_repair, template_pass};

use crate::wiring::wire;

const EXIT_PASS: i32 = 0;
const EXIT_FAIL: i32 = 1;
const EXIT_CONFIG: i32 = 2;

// ── CLI definition ────────────────────────────────────────────────────────────

/// parsesmith: a bounded generate → execute → validate → repair loop that
/// writes parsers for bank statements.
#[derive(Parser)]
#[command(
    name = "parsesmith",
    about = "Generate and self-repair bank statement parsers",
    long_about = "Generates an extraction program for a statement family, runs it on a sample,\n\
                  checks the output against a reference CSV and retries with the diagnostic\n\
                  until it passes or the attempt ceiling is reached."
)]
struct Cli {
    /// Configuration file. Defaults to ./parsesmith.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the agent loop for one target.
    Run(RunArgs),
    /// Run every configured target in parallel.
    RunAll {
        /// Write each target's attempt journal to <DIR>/<target>.json.
        #[arg(long)]
        journal_dir: Option<PathBuf>,
    },
    /// Re-run the persisted parser for a target and validate it.
    Validate(ValidateArgs),
    /// Run the bundled reference scenarios.
    Demo,
}

#[derive(Args)]
struct RunArgs {
    /// Target key, e.g. "icici".
    #[arg(long)]
    target: String,

    #[arg(long)]
    sample: Option<PathBuf>,

    #[arg(long)]
    reference: Option<PathBuf>,

    /// template, openai, groq or gemini.
    #[arg(long)]
    provider: Option<ProviderKind>,

    #[arg(long)]
    model: Option<String>,

    /// recipe or command.
    #[arg(long)]
    runner: Option<RunnerKind>,

    /// Interpreter for the command runner.
    #[arg(long)]
    interpreter: Option<String>,

    #[arg(long)]
    max_attempts: Option<u32>,

    /// Write the attempt journal to this file when the run ends.
    #[arg(long)]
    journal: Option<PathBuf>,
}

#[derive(Args)]
struct ValidateArgs {
    #[arg(long)]
    target: String,

    #[arg(long)]
    sample: Option<PathBuf>,

    #[arg(long)]
    reference: Option<PathBuf>,

    /// Parser file to check instead of the target's persisted one.
    #[arg(long)]
    parser: Option<PathBuf>,
}

impl RunArgs {
    /// Layer the flags over the file configuration.
    fn apply(&self, config: &mut SmithConfig) -> SmithResult<()> {
        if let Some(kind) = self.provider {
            config.provider.kind = kind;
        }
        if let Some(model) = &self.model {
            config.provider.model = Some(model.clone());
        }
        if let Some(kind) = self.runner {
            config.runner.kind = kind;
        }
        if let Some(interpreter) = &self.interpreter {
            config.runner.interpreter = interpreter.clone();
        }
        if let Some(max) = self.max_attempts {
            config.settings.max_attempts = max;
        }
        config.validate()
    }

    fn overrides(&self) -> TargetOverrides {
        TargetOverrides {
            sample: self.sample.clone(),
            reference: self.reference.clone(),
            parser: None,
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug to see every loop transition.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = SmithConfig::load(cli.config.as_deref()).and_then(|config| match cli.command {
        Command::Run(args) => run(config, &args),
        Command::RunAll { journal_dir } => run_all(&config, journal_dir),
        Command::Validate(args) => validate(&config, &args),
        Command::Demo => demo(),
    });

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("parsesmith: {}", e);
            std::process::exit(exit_code_for(&e));
        }
    }
}

fn exit_code_for(error: &SmithError) -> i32 {
    if error.is_configuration() {
        EXIT_CONFIG
    } else {
        EXIT_FAIL
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn run(mut config: SmithConfig, args: &RunArgs) -> SmithResult<i32> {
    args.apply(&mut config)?;

    let mut journal = InMemoryJournal::new(args.target.clone());
    if let Some(path) = &args.journal {
        journal = journal.with_export_path(path);
    }

    let wired = wire(&config, &args.target, &args.overrides(), Box::new(journal))?;
    let parser_path = wired.target.parser_path.clone();

    println!("Target:      {}", wired.target.name);
    println!("Generator:   {}", wired.generator);
    println!("Runner:      {}", wired.runner);
    println!("Attempts:    up to {}", config.settings.max_attempts);
    println!();

    let outcome = wired.agent.run(wired.target)?;
    print_outcome(&outcome);
    if outcome.passed() {
        println!("Parser:      {}", parser_path.display());
        Ok(EXIT_PASS)
    } else {
        Ok(EXIT_FAIL)
    }
}

fn run_all(config: &SmithConfig, journal_dir: Option<PathBuf>) -> SmithResult<i32> {
    let names = config.target_names();
    if names.is_empty() {
        return Err(SmithError::config(
            "no targets configured; add [[targets]] entries to the configuration file",
        ));
    }

    // One loop per target; nothing is shared between threads but the config.
    let results: Vec<(String, SmithResult<RunOutcome>)> = std::thread::scope(|scope| {
        let handles: Vec<_> = names
            .iter()
            .map(|name| {
                let journal_dir = journal_dir.clone();
                let handle = scope.spawn(move || {
                    let mut journal = InMemoryJournal::new(name.clone());
                    if let Some(dir) = journal_dir {
                        journal = journal.with_export_path(dir.join(format!("{name}.json")));
                    }
                    let wired = wire(config, name, &TargetOverrides::default(), Box::new(journal))?;
                    wired.agent.run(wired.target)
                });
                (name.clone(), handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(name, handle)| {
                let result = handle.join().unwrap_or_else(|_| {
                    Err(SmithError::Execution {
                        reason: format!("run for '{name}' panicked"),
                    })
                });
                (name, result)
            })
            .collect()
    });

    let mut code = EXIT_PASS;
    for (name, result) in &results {
        match result {
            Ok(outcome) if outcome.passed() => {
                println!("{:<16} PASS  (attempt {})", name, outcome.attempts());
            }
            Ok(outcome) => {
                println!("{:<16} FAIL  after {} attempt(s)", name, outcome.attempts());
                if let Some(diagnostic) = outcome.verdict().diagnostic() {
                    println!("{:<16}       [{}] {}", "", diagnostic.label(), diagnostic);
                }
                code = code.max(EXIT_FAIL);
            }
            Err(e) => {
                println!("{:<16} ERROR {}", name, e);
                code = code.max(exit_code_for(e));
            }
        }
    }
    Ok(code)
}

fn validate(config: &SmithConfig, args: &ValidateArgs) -> SmithResult<i32> {
    let overrides = TargetOverrides {
        sample: args.sample.clone(),
        reference: args.reference.clone(),
        parser: args.parser.clone(),
    };
    let journal: Box<dyn AttemptJournal> = Box::new(NullJournal);
    let wired = wire(config, &args.target, &overrides, journal)?;

    println!("Target:      {}", wired.target.name);
    println!("Parser:      {}", wired.target.parser_path.display());

    let verdict = wired.agent.check_persisted(&wired.target)?;
    print_verdict(&verdict);
    Ok(if verdict.is_pass() { EXIT_PASS } else { EXIT_FAIL })
}

fn demo() -> SmithResult<i32> {
    print_banner();
    template_pass::run_scenario()?;
    guided_repair::run_scenario()?;
    exhaustion::run_scenario()?;
    println!("All reference scenarios completed successfully.");
    Ok(EXIT_PASS)
}

// ── Output ────────────────────────────────────────────────────────────────────

fn print_outcome(outcome: &RunOutcome) {
    if outcome.passed() {
        println!("Result:      PASS on attempt {}", outcome.attempts());
    } else {
        println!("Result:      FAIL after {} attempt(s)", outcome.attempts());
    }
    print_verdict(&outcome.verdict());
}

fn print_verdict(verdict: &Verdict) {
    match verdict.diagnostic() {
        None => println!("Verdict:     pass"),
        Some(diagnostic) => {
            println!("Verdict:     fail ({})", diagnostic.label());
            println!("Diagnostic:  {}", diagnostic);
        }
    }
}

fn print_banner() {
    println!();
    println!("parsesmith: bounded parser repair loop");
    println!("Reference Demo");
    println!("=======================================");
    println!();
    println!("Per attempt:");
    println!("  [1] Generator writes a candidate from the schema, sample and last diagnostic");
    println!("  [2] Sandbox runner executes it on the sample with a hard timeout");
    println!("  [3] Validator compares the produced table with the reference CSV");
    println!("  [4] Attempt recorded in the SHA-256 hash-chained journal");
    println!("  [5] Pass → done; Fail → retry with the diagnostic until the ceiling");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn run_flags_override_the_file() {
        let cli = parse(&[
            "parsesmith",
            "run",
            "--target",
            "icici",
            "--provider",
            "gemini",
            "--max-attempts",
            "5",
            "--runner",
            "command",
        ]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };

        let mut config = SmithConfig::default();
        args.apply(&mut config).unwrap();
        assert_eq!(config.provider.kind, ProviderKind::Gemini);
        assert_eq!(config.runner.kind, RunnerKind::Command);
        assert_eq!(config.settings.max_attempts, 5);
    }

    #[test]
    fn zero_attempts_flag_is_a_config_error() {
        let cli = parse(&["parsesmith", "run", "--target", "icici", "--max-attempts", "0"]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };

        let err = args.apply(&mut SmithConfig::default()).unwrap_err();
        assert_eq!(exit_code_for(&err), EXIT_CONFIG);
    }

    #[test]
    fn unknown_provider_is_rejected_by_the_parser() {
        assert!(Cli::try_parse_from(["parsesmith", "run", "--target", "x", "--provider", "bard"])
            .is_err());
    }

    #[test]
    fn global_config_flag_after_subcommand() {
        let cli = parse(&["parsesmith", "validate", "--target", "icici", "--config", "p.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("p.toml")));
    }

    #[test]
    fn run_all_without_targets_is_a_config_error() {
        let err = run_all(&SmithConfig::default(), None).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn failures_other_than_configuration_exit_with_one() {
        let err = SmithError::Execution {
            reason: "boom".to_string(),
        };
        assert_eq!(exit_code_for(&err), EXIT_FAIL);
    }
}
