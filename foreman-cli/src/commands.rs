use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use foreman_agent::{
    Coordinator, CoordinatorError, DecisionModel, NullEnvironment, OpenAiDecisionModel,
    PromptError, RegistryError, RetryingModel, ReturnType, RunRequest, RunResult,
};
use foreman_core::{CoreError, ForemanConfig};
use foreman_testing::{ScriptedModel, ScriptedReply};

use crate::echo::echo_registry;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] CoreError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid script: {0}")]
    Script(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn load_config(path: &Path) -> Result<ForemanConfig, CliError> {
    Ok(ForemanConfig::load_from_file(path)?)
}

fn coordinator(
    config: &ForemanConfig,
    model: Arc<dyn DecisionModel>,
) -> Result<Coordinator, CliError> {
    let registry = echo_registry(&config.workers)?;
    Ok(Coordinator::from_config(config, model, registry)?)
}

/// Render the system prompt a run with `goal` would start from.
pub fn render_prompt(config_path: &Path, goal: &str) -> Result<String, CliError> {
    let config = load_config(config_path)?;
    let coordinator = coordinator(&config, Arc::new(ScriptedModel::new()))?;
    Ok(coordinator.system_prompt(goal)?)
}

/// The tool schema offered to the decision model, as OpenAI `tools` JSON.
pub fn render_catalog(config_path: &Path) -> Result<String, CliError> {
    let config = load_config(config_path)?;
    let registry = echo_registry(&config.workers)?;
    let catalog = foreman_agent::ToolCatalog::for_registry(&registry);
    Ok(serde_json::to_string_pretty(&catalog.to_openai_tools())?)
}

/// Validate a configuration file and describe it.
pub fn check(config_path: &Path) -> Result<String, CliError> {
    let config = load_config(config_path)?;
    let ids: Vec<&str> = config.workers.iter().map(|w| w.id.as_str()).collect();
    Ok(format!(
        "OK: model {} with {} worker(s) [{}], completion token {}",
        config.model.model,
        ids.len(),
        ids.join(", "),
        config.coordinator.completion_token
    ))
}

fn load_script(script_path: &Path) -> Result<Vec<ScriptedReply>, CliError> {
    let raw = std::fs::read_to_string(script_path).map_err(|source| CliError::Io {
        path: script_path.to_path_buf(),
        source,
    })?;
    Ok(serde_yaml::from_str(&raw)?)
}

fn request(goal: &str, summary: bool) -> RunRequest {
    let return_type = if summary {
        ReturnType::Summary
    } else {
        ReturnType::InfoTrajectory
    };
    RunRequest::new(Arc::new(NullEnvironment))
        .with_goal(goal)
        .with_return_type(return_type)
}

/// Run the coordinator against scripted model replies and echo workers.
pub async fn replay(
    config_path: &Path,
    script_path: &Path,
    goal: &str,
    summary: bool,
) -> Result<RunResult, CliError> {
    let config = load_config(config_path)?;
    let replies = load_script(script_path)?;
    info!(replies = replies.len(), "Replaying scripted decisions");

    let model = ScriptedModel::from_replies(replies).named("replay");
    let coordinator = coordinator(&config, Arc::new(model))?;
    Ok(coordinator.run(request(goal, summary)).await?)
}

/// Run the coordinator against the configured model and echo workers.
pub async fn run_live(config_path: &Path, goal: &str, summary: bool) -> Result<RunResult, CliError> {
    let config = load_config(config_path)?;
    let model = RetryingModel::new(
        OpenAiDecisionModel::from_settings(&config.model),
        config.retry.clone(),
    );
    let coordinator = coordinator(&config, Arc::new(model))?;
    Ok(coordinator.run(request(goal, summary)).await?)
}
