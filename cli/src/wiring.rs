//! Builds agent loops from a loaded `SmithConfig`.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use parsesmith_config::{ProviderKind, RunnerKind, SmithConfig, TargetOverrides};
use parsesmith_contracts::{
    error::{SmithError, SmithResult},
    target::Target,
};
use parsesmith_core::{
    traits::{AttemptJournal, Generator, SandboxRunner},
    AgentLoop, LoopConfig,
};
use parsesmith_generate::{BackendOptions, ModelGenerator, Provider, TemplateGenerator};
use parsesmith_sandbox::{AutoExtractor, CommandRunner, RecipeRunner};
use parsesmith_verify::TableValidator;

/// A loop plus the target it was resolved for.
pub struct Wired {
    pub agent: AgentLoop,
    pub target: Target,
    pub generator: String,
    pub runner: String,
}

/// Resolve `name` and build a loop for it.
pub fn wire(
    config: &SmithConfig,
    name: &str,
    overrides: &TargetOverrides,
    journal: Box<dyn AttemptJournal>,
) -> SmithResult<Wired> {
    let runner = build_runner(config);
    let dialect = runner.dialect();
    let generator = build_generator(config)?;
    let target = config.resolve_target(name, overrides, &dialect.extension)?;

    let settings = &config.settings;
    let validator = TableValidator::new().with_amount_epsilon(settings.amount_epsilon);

    let generator_label = generator.strategy().to_string();
    debug!(
        target = %target.name,
        generator = %generator_label,
        dialect = %dialect.name,
        amount_epsilon = validator.amount_epsilon(),
        "loop wired"
    );

    let agent = AgentLoop::new(
        generator,
        runner,
        Box::new(validator),
        Box::new(AutoExtractor::new()),
        journal,
        LoopConfig {
            max_attempts: settings.max_attempts,
            excerpt_chars: settings.excerpt_chars,
        },
    );

    Ok(Wired {
        agent,
        target,
        generator: generator_label,
        runner: dialect.name,
    })
}

fn build_runner(config: &SmithConfig) -> Box<dyn SandboxRunner> {
    let timeout = Duration::from_secs(config.settings.execution_timeout_secs);
    match config.runner.kind {
        RunnerKind::Recipe => {
            Box::new(RecipeRunner::new(Arc::new(AutoExtractor::new())).with_timeout(timeout))
        }
        RunnerKind::Command => Box::new(
            CommandRunner::new(&config.runner.interpreter, &config.runner.extension)
                .with_timeout(timeout),
        ),
    }
}

fn build_generator(config: &SmithConfig) -> SmithResult<Box<dyn Generator>> {
    let provider = match config.provider.kind {
        ProviderKind::Template => {
            if config.runner.kind != RunnerKind::Recipe {
                return Err(SmithError::config(
                    "the template provider only writes recipes; use `--runner recipe` or a model provider",
                ));
            }
            return Ok(Box::new(TemplateGenerator::new()));
        }
        ProviderKind::Openai => Provider::OpenAi,
        ProviderKind::Groq => Provider::Groq,
        ProviderKind::Gemini => Provider::Gemini,
    };

    let options = BackendOptions {
        model: config.provider.model.clone(),
        base_url: config.provider.base_url.clone(),
        api_key_env: config.provider.api_key_env.clone(),
        timeout: Some(Duration::from_secs(config.settings.generation_timeout_secs)),
    };
    Ok(Box::new(ModelGenerator::from_provider(provider, &options)?))
}
