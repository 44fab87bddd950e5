//! The coordinator control loop.
//!
//! A run moves through three states:
//!
//! ```text
//!   AwaitingDecision ──(tool calls)──▶ Dispatching ──▶ AwaitingDecision
//!          │  ▲
//!          │  └──(stop without token)
//!          └──(stop with token)──▶ Done
//! ```
//!
//! Each decision turn is appended to the conversation and its usage merged before anything
//! else happens. Invocations within a turn are dispatched strictly one after another: the
//! dispatch step is logged, the worker runs against the fully merged stats baseline, and its
//! stats, trajectory and summary are folded in before the next invocation is touched.
//! A [`RunResult`] is only ever produced on entering `Done`.

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use foreman_core::{
    CoordinatorSettings, ForemanConfig, PricingPolicy, TrajectoryLog, TrajectoryStep,
    UsageStats,
};

use crate::catalog::{DISPATCH_ACTION, ToolCatalog};
use crate::completion::{contains_completion_token, strip_completion_token};
use crate::error::{CoordinatorError, CoordinatorResult, PromptError, WorkerError};
use crate::prompt::PromptBuilder;
use crate::registry::{WorkerDescriptor, WorkerRegistry};
use crate::traits::{DecisionModel, Worker};
use crate::types::{
    DialogueTurn, FinishReason, GOAL_KEY, ModelResponse, ReturnType, Role, RunRequest, RunResult,
    SUBTASK_KEY, SetupContext, Subtask, ToolInvocation, WorkerInfo, WorkerOutput, WorkerRequest,
};

/// Environment report fields copied into [`RunResult::terminal_fields`] when present.
pub const TERMINAL_FIELDS: [&str; 6] = [
    "edited_files30",
    "edited_files50",
    "edited_files70",
    "model_stats",
    "exit_status",
    "submission",
];

/// What a decision turn asks the coordinator to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Run the turn's invocations
    Dispatch,
    /// The goal is satisfied
    Finish,
    /// Neither; ask the model again
    Continue,
}

/// Classify a decision turn.
///
/// Structured invocations always win. Otherwise the run finishes only when the model stopped
/// normally and its content carries the completion token.
pub fn classify(response: &ModelResponse, completion_token: &str) -> Decision {
    if !response.tool_calls.is_empty() {
        Decision::Dispatch
    } else if response.finish_reason == FinishReason::Stop
        && contains_completion_token(&response.content, completion_token)
    {
        Decision::Finish
    } else {
        Decision::Continue
    }
}

enum LoopState {
    AwaitingDecision,
    Dispatching {
        response: ModelResponse,
        decision_time: Duration,
    },
    Done(ModelResponse),
}

/// Mutable state owned by one run.
struct RunState {
    turns: Vec<DialogueTurn>,
    stats: UsageStats,
    trajectory: TrajectoryLog,
    decisions: usize,
    dispatches: usize,
    last_summary: Option<String>,
}

impl RunState {
    fn new(system_prompt: String, init_stats: UsageStats) -> Self {
        Self {
            turns: vec![DialogueTurn::system(system_prompt)],
            stats: init_stats,
            trajectory: TrajectoryLog::new(),
            decisions: 0,
            dispatches: 0,
            last_summary: None,
        }
    }

    fn last_rationale(&self) -> Option<String> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == Role::Assistant && !t.content.trim().is_empty())
            .map(|t| t.content.clone())
    }
}

/// Supervisory agent that delegates subtasks to registered workers.
///
/// # Example
/// ```rust,ignore
/// let registry = WorkerRegistry::builder()
///     .register("coder", "Edits source files", coder)?
///     .register("tester", "Runs the test suite", tester)?
///     .build();
///
/// let coordinator = Coordinator::builder(model, registry)
///     .pricing(PricingPolicy::new(0.000_002_5, 0.000_01))
///     .max_turns(40)
///     .build()?;
///
/// let result = coordinator
///     .run(RunRequest::new(environment).with_goal("Fix the failing pager test"))
///     .await?;
/// ```
pub struct Coordinator {
    name: String,
    registry: WorkerRegistry,
    model: Arc<dyn DecisionModel>,
    pricing: PricingPolicy,
    settings: CoordinatorSettings,
    prompt: PromptBuilder,
}

impl Coordinator {
    /// Start building a coordinator.
    pub fn builder(model: Arc<dyn DecisionModel>, registry: WorkerRegistry) -> CoordinatorBuilder {
        CoordinatorBuilder {
            name: "coordinator".to_string(),
            model,
            registry,
            pricing: PricingPolicy::default(),
            settings: CoordinatorSettings::default(),
        }
    }

    /// Build a coordinator from loaded configuration.
    pub fn from_config(
        config: &ForemanConfig,
        model: Arc<dyn DecisionModel>,
        registry: WorkerRegistry,
    ) -> CoordinatorResult<Self> {
        Self::builder(model, registry)
            .pricing(config.pricing)
            .settings(config.coordinator.clone())
            .build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &WorkerRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    /// The action menu offered to the decision model.
    pub fn catalog(&self) -> ToolCatalog {
        ToolCatalog::for_registry(&self.registry)
    }

    /// The system prompt a run with this goal would start from.
    pub fn system_prompt(&self, goal: &str) -> Result<String, PromptError> {
        self.prompt
            .render(goal, &self.registry, &self.settings.completion_token)
    }

    /// Run the control loop until the decision model signals completion.
    pub async fn run(&self, request: RunRequest) -> CoordinatorResult<RunResult> {
        let span = info_span!(
            "coordinator_run",
            coordinator = %self.name,
            run_id = %Uuid::new_v4()
        );
        self.run_loop(request).instrument(span).await
    }

    async fn run_loop(&self, request: RunRequest) -> CoordinatorResult<RunResult> {
        if self.registry.is_empty() {
            return Err(CoordinatorError::Config(
                "coordinator has no registered workers".to_string(),
            ));
        }
        let goal = request
            .goal()
            .ok_or_else(|| CoordinatorError::Config("run request carries no goal".to_string()))?;

        let system_prompt = self.system_prompt(goal)?;
        let catalog = self.catalog();
        let mut run = RunState::new(system_prompt, request.init_stats.unwrap_or_default());

        info!(
            model = self.model.model_name(),
            workers = self.registry.len(),
            seed_cost = run.stats.cost_total,
            "Starting coordinator run"
        );

        let mut state = LoopState::AwaitingDecision;
        loop {
            state = match state {
                LoopState::AwaitingDecision => self.decide(&mut run, &catalog).await?,
                LoopState::Dispatching {
                    response,
                    decision_time,
                } => {
                    // Tool-call turns often carry no text; fall back to earlier commentary.
                    let rationale = run.last_rationale().unwrap_or_default();
                    for (idx, invocation) in response.tool_calls.iter().enumerate() {
                        // Decision latency is attributed to the turn's first dispatch step.
                        let elapsed = if idx == 0 {
                            decision_time
                        } else {
                            Duration::ZERO
                        };
                        self.dispatch(&mut run, &request, &rationale, invocation, elapsed)
                            .await?;
                    }
                    LoopState::AwaitingDecision
                }
                LoopState::Done(response) => return self.finish(run, &request, &response).await,
            };
        }
    }

    async fn decide(
        &self,
        run: &mut RunState,
        catalog: &ToolCatalog,
    ) -> CoordinatorResult<LoopState> {
        if let Some(limit) = self.settings.max_turns
            && run.decisions >= limit
        {
            warn!(limit, "Turn limit reached without completion");
            return Err(CoordinatorError::TurnLimitExceeded {
                limit,
                rationale: run.last_rationale(),
            });
        }

        let started = Instant::now();
        let response = self
            .model
            .decide(&run.turns, catalog)
            .await
            .map_err(|source| CoordinatorError::DecisionModel {
                source,
                rationale: run.last_rationale(),
            })?;
        let decision_time = started.elapsed();

        run.decisions += 1;
        run.turns.push(DialogueTurn::assistant(
            response.content.clone(),
            response.tool_calls.clone(),
        ));
        run.stats.merge(&self.pricing.price(&response.usage));

        let decision = classify(&response, &self.settings.completion_token);
        debug!(
            turn = run.decisions,
            finish_reason = ?response.finish_reason,
            invocations = response.tool_calls.len(),
            decision = ?decision,
            cost_total = run.stats.cost_total,
            "Decision received"
        );
        // A completed run is returned even if its final decision crossed the limit.
        if decision != Decision::Finish {
            self.check_cost_limit(run)?;
        }

        Ok(match decision {
            Decision::Dispatch => LoopState::Dispatching {
                response,
                decision_time,
            },
            Decision::Finish => LoopState::Done(response),
            Decision::Continue => {
                warn!(
                    turn = run.decisions,
                    finish_reason = ?response.finish_reason,
                    "Decision neither dispatched nor completed, asking again"
                );
                LoopState::AwaitingDecision
            }
        })
    }

    /// Resolve and validate an invocation without touching run state.
    fn prepare<'a>(
        &'a self,
        invocation: &ToolInvocation,
        rationale: &str,
    ) -> CoordinatorResult<(&'a WorkerDescriptor, Subtask)> {
        let malformed = |reason: String| CoordinatorError::MalformedInvocation {
            reason,
            rationale: rationale.to_string(),
            arguments: invocation.arguments.clone(),
        };

        if invocation.name != DISPATCH_ACTION {
            return Err(malformed(format!("unknown action '{}'", invocation.name)));
        }
        let args = invocation
            .arguments
            .as_object()
            .ok_or_else(|| malformed("arguments must be a JSON object".to_string()))?;
        let field = |name: &str| match args.get(name) {
            Some(Value::String(value)) => Ok(value.clone()),
            Some(_) => Err(malformed(format!("parameter '{}' must be a string", name))),
            None => Err(malformed(format!("missing required parameter '{}'", name))),
        };

        let worker = field("worker")?;
        let descriptor =
            self.registry
                .get(&worker)
                .map_err(|_| CoordinatorError::UnknownWorker {
                    worker: worker.clone(),
                    rationale: rationale.to_string(),
                    arguments: invocation.arguments.clone(),
                })?;

        let subtask = Subtask {
            target_worker: descriptor.id.clone(),
            instructions: field("task")?,
            current_status: field("current_status")?,
            definition_of_done: field("definition_of_done")?,
        };
        Ok((descriptor, subtask))
    }

    async fn dispatch(
        &self,
        run: &mut RunState,
        request: &RunRequest,
        rationale: &str,
        invocation: &ToolInvocation,
        decision_time: Duration,
    ) -> CoordinatorResult<()> {
        let (descriptor, subtask) = self.prepare(invocation, rationale)?;

        // Logged before the worker runs so the rationale survives a worker failure.
        run.trajectory.push(
            TrajectoryStep::new(invocation.to_action_string())
                .with_observation(rationale)
                .with_execution_time(decision_time),
        );

        info!(
            worker = %descriptor.id,
            dispatch = run.dispatches + 1,
            definition_of_done = %subtask.definition_of_done,
            "Dispatching subtask"
        );

        let worker_request = WorkerRequest {
            setup_context: subtask_context(&request.setup_context, &subtask),
            environment: request.environment.clone(),
            observation: request.observation.clone(),
            trajectory_dir: request.trajectory_dir.clone(),
            return_type: ReturnType::Summary,
            cost_baseline: run.stats,
        };

        let started = Instant::now();
        let output = descriptor.handle.run(worker_request).await.map_err(|source| {
            CoordinatorError::WorkerRun {
                worker: descriptor.id.clone(),
                source,
                rationale: rationale.to_string(),
                arguments: invocation.arguments.clone(),
            }
        })?;

        run.stats.merge(&output.info.stats);
        let steps = output.trajectory.len();
        run.trajectory.append(output.trajectory);
        run.turns.push(DialogueTurn::tool_result(
            invocation.id.clone(),
            output.summary.clone(),
        ));
        run.dispatches += 1;
        run.last_summary = Some(output.summary);

        info!(
            worker = %descriptor.id,
            steps,
            elapsed_ms = started.elapsed().as_millis() as u64,
            cost_total = run.stats.cost_total,
            "Worker finished"
        );
        self.check_cost_limit(run)
    }

    async fn finish(
        &self,
        run: RunState,
        request: &RunRequest,
        response: &ModelResponse,
    ) -> CoordinatorResult<RunResult> {
        let token = self.settings.completion_token.as_str();
        let report = request.environment.signal_completion(token).await?;
        let terminal_fields: Map<String, Value> = TERMINAL_FIELDS
            .iter()
            .filter_map(|key| report.get(*key).map(|v| (key.to_string(), v.clone())))
            .collect();

        let summary = match request.return_type {
            ReturnType::Summary => Some(summarize(&response.content, token, &run)),
            ReturnType::InfoTrajectory => None,
        };

        info!(
            decisions = run.decisions,
            dispatches = run.dispatches,
            steps = run.trajectory.len(),
            cost_total = run.stats.cost_total,
            "Coordinator run complete"
        );

        Ok(RunResult {
            stats: run.stats,
            trajectory: run.trajectory,
            terminal_fields,
            summary,
        })
    }

    fn check_cost_limit(&self, run: &RunState) -> CoordinatorResult<()> {
        match self.settings.cost_limit {
            Some(limit) if run.stats.cost_total > limit => {
                warn!(limit, total = run.stats.cost_total, "Cost limit exceeded");
                Err(CoordinatorError::CostLimitExceeded {
                    limit,
                    total: run.stats.cost_total,
                })
            }
            _ => Ok(()),
        }
    }
}

/// Setup context handed to a worker: the caller's context with the goal replaced by the subtask.
fn subtask_context(base: &SetupContext, subtask: &Subtask) -> SetupContext {
    let mut context = base.clone();
    context.insert(GOAL_KEY.to_string(), Value::String(subtask.render()));
    context.insert(
        SUBTASK_KEY.to_string(),
        json!({
            "target_worker": subtask.target_worker.as_str(),
            "instructions": subtask.instructions,
            "current_status": subtask.current_status,
            "definition_of_done": subtask.definition_of_done,
        }),
    );
    context
}

fn summarize(final_content: &str, token: &str, run: &RunState) -> String {
    let remark = strip_completion_token(final_content, token);
    if !remark.is_empty() {
        return remark;
    }
    match run.last_summary.as_deref().map(str::trim) {
        Some(last) if !last.is_empty() => format!(
            "Completed after {} subtask(s). Last report: {}",
            run.dispatches, last
        ),
        _ => format!("Completed after {} subtask(s).", run.dispatches),
    }
}

#[async_trait]
impl Worker for Coordinator {
    async fn run(&self, request: WorkerRequest) -> Result<WorkerOutput, WorkerError> {
        let run_request = RunRequest::from(request).with_return_type(ReturnType::Summary);
        let result = Coordinator::run(self, run_request)
            .await
            .map_err(|e| WorkerError::Nested(Box::new(e)))?;

        Ok(WorkerOutput {
            info: WorkerInfo {
                stats: result.stats,
                extra: result.terminal_fields,
            },
            trajectory: result.trajectory.into_steps(),
            summary: result.summary.unwrap_or_default(),
        })
    }
}

/// Builder for [`Coordinator`].
pub struct CoordinatorBuilder {
    name: String,
    model: Arc<dyn DecisionModel>,
    registry: WorkerRegistry,
    pricing: PricingPolicy,
    settings: CoordinatorSettings,
}

impl CoordinatorBuilder {
    /// Name used in logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn pricing(mut self, pricing: PricingPolicy) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn settings(mut self, settings: CoordinatorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn completion_token(mut self, token: impl Into<String>) -> Self {
        self.settings.completion_token = token.into();
        self
    }

    pub fn max_turns(mut self, max_turns: usize) -> Self {
        self.settings.max_turns = Some(max_turns);
        self
    }

    pub fn cost_limit(mut self, cost_limit: f64) -> Self {
        self.settings.cost_limit = Some(cost_limit);
        self
    }

    pub fn prompt_template(mut self, template: impl Into<String>) -> Self {
        self.settings.prompt_template = Some(template.into());
        self
    }

    pub fn build(self) -> CoordinatorResult<Coordinator> {
        let token = &self.settings.completion_token;
        if token.is_empty() || token.chars().any(char::is_whitespace) {
            return Err(CoordinatorError::Config(format!(
                "completion token must be a single non-empty word, got {:?}",
                token
            )));
        }
        if self.settings.max_turns == Some(0) {
            return Err(CoordinatorError::Config(
                "max_turns must be at least 1".to_string(),
            ));
        }

        let prompt = match &self.settings.prompt_template {
            Some(template) => PromptBuilder::with_template(template)?,
            None => PromptBuilder::new()?,
        };

        Ok(Coordinator {
            name: self.name,
            registry: self.registry,
            model: self.model,
            pricing: self.pricing,
            settings: self.settings,
            prompt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EnvironmentError, ModelError};
    use crate::traits::{NullEnvironment, RunEnvironment};
    use foreman_core::ModelUsage;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct Script {
        responses: Mutex<VecDeque<ModelResponse>>,
        seen_turns: Mutex<Vec<usize>>,
    }

    impl Script {
        fn new(responses: Vec<ModelResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                seen_turns: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl DecisionModel for Script {
        async fn decide(
            &self,
            turns: &[DialogueTurn],
            _catalog: &ToolCatalog,
        ) -> Result<ModelResponse, ModelError> {
            self.seen_turns.lock().unwrap().push(turns.len());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ModelError::InvalidResponse("script exhausted".into()))
        }

        fn model_name(&self) -> &str {
            "script"
        }
    }

    struct Echo;

    #[async_trait]
    impl Worker for Echo {
        async fn run(&self, request: WorkerRequest) -> Result<WorkerOutput, WorkerError> {
            let subtask = request.subtask().expect("subtask in context");
            Ok(WorkerOutput {
                info: WorkerInfo {
                    stats: UsageStats {
                        calls: 1,
                        tokens_in: 10,
                        tokens_out: 5,
                        cost_delta: 0.5,
                        cost_total: 0.5,
                    },
                    extra: Map::new(),
                },
                trajectory: vec![TrajectoryStep::new(format!("work on {}", subtask.instructions))],
                summary: format!("did {}", subtask.instructions),
            })
        }
    }

    struct Reporting;

    #[async_trait]
    impl RunEnvironment for Reporting {
        async fn signal_completion(
            &self,
            token: &str,
        ) -> Result<Map<String, Value>, EnvironmentError> {
            let mut report = Map::new();
            report.insert("exit_status".into(), json!(format!("submitted ({token})")));
            report.insert("submission".into(), json!("diff --git a/x b/x"));
            report.insert("unrelated".into(), json!(true));
            Ok(report)
        }
    }

    fn call(id: &str, worker: &str, task: &str) -> ToolInvocation {
        ToolInvocation::new(
            id,
            DISPATCH_ACTION,
            json!({
                "worker": worker,
                "task": task,
                "current_status": "starting",
                "definition_of_done": "fix bug",
            }),
        )
    }

    fn coordinator(model: Arc<Script>) -> Coordinator {
        let registry = WorkerRegistry::builder()
            .register("coder", "Edits source files", Arc::new(Echo))
            .unwrap()
            .build();
        Coordinator::builder(model, registry)
            .pricing(PricingPolicy::new(0.01, 0.02))
            .build()
            .unwrap()
    }

    fn request() -> RunRequest {
        RunRequest::new(Arc::new(Reporting)).with_goal("Fix the pager")
    }

    #[test]
    fn classify_prefers_tool_calls() {
        let with_calls = ModelResponse::tool_calls("DONE?", vec![call("1", "coder", "x")]);
        assert_eq!(classify(&with_calls, "DONE"), Decision::Dispatch);
        assert_eq!(classify(&ModelResponse::stop("DONE"), "DONE"), Decision::Finish);
        assert_eq!(
            classify(&ModelResponse::stop("still working"), "DONE"),
            Decision::Continue
        );

        let truncated = ModelResponse {
            finish_reason: FinishReason::Other("length".into()),
            ..ModelResponse::stop("DONE")
        };
        assert_eq!(classify(&truncated, "DONE"), Decision::Continue);
    }

    #[tokio::test]
    async fn dispatch_then_done() {
        let model = Script::new(vec![
            ModelResponse::tool_calls("Start with the fix.", vec![call("c1", "coder", "patch")])
                .with_usage(ModelUsage::single_call(100, 10)),
            ModelResponse::stop("All good. DONE").with_usage(ModelUsage::single_call(50, 5)),
        ]);
        let result = coordinator(model.clone()).run(request()).await.unwrap();

        assert_eq!(result.trajectory.len(), 2);
        assert_eq!(
            result.trajectory.steps()[0].observation.as_deref(),
            Some("Start with the fix.")
        );
        assert_eq!(result.trajectory.steps()[1].action, "work on patch");
        assert_eq!(result.stats.calls, 3);
        assert_eq!(result.stats.tokens_in, 160);
        assert!((result.stats.cost_total - (1.2 + 0.5 + 0.6)).abs() < 1e-9);
        assert_eq!(result.terminal_fields.len(), 2);
        assert_eq!(result.terminal_fields["exit_status"], "submitted (DONE)");
        assert!(result.summary.is_none());

        // system; then system + assistant + tool-result
        assert_eq!(*model.seen_turns.lock().unwrap(), vec![1, 3]);
    }

    #[tokio::test]
    async fn stop_without_token_asks_again() {
        let model = Script::new(vec![
            ModelResponse::stop("Let me think about this."),
            ModelResponse::stop("DONE"),
        ]);
        let result = coordinator(model.clone()).run(request()).await.unwrap();
        assert!(result.trajectory.is_empty());
        assert_eq!(*model.seen_turns.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn unknown_worker_aborts_without_logging_dispatch() {
        let model = Script::new(vec![ModelResponse::tool_calls(
            "Paint it.",
            vec![call("c1", "painter", "paint")],
        )]);
        let err = coordinator(model).run(request()).await.unwrap_err();
        match err {
            CoordinatorError::UnknownWorker {
                worker,
                rationale,
                arguments,
            } => {
                assert_eq!(worker, "painter");
                assert_eq!(rationale, "Paint it.");
                assert_eq!(arguments["task"], "paint");
            }
            other => panic!("expected UnknownWorker, got {other}"),
        }
    }

    #[tokio::test]
    async fn rejected_invocation_leaves_run_state_untouched() {
        let coordinator = coordinator(Script::new(vec![]));
        let mut run = RunState::new("system".into(), UsageStats::seeded(2, 0.05));
        let before = run.stats;

        let err = coordinator
            .dispatch(
                &mut run,
                &request(),
                "Paint it.",
                &call("c1", "painter", "paint"),
                Duration::ZERO,
            )
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "UNKNOWN_WORKER");
        assert_eq!(run.stats, before);
        assert!(run.trajectory.is_empty());
        assert_eq!(run.turns.len(), 1);
        assert_eq!(run.dispatches, 0);
    }

    #[tokio::test]
    async fn missing_parameter_is_malformed() {
        let invocation = ToolInvocation::new(
            "c1",
            DISPATCH_ACTION,
            json!({"worker": "coder", "task": "patch", "current_status": "x"}),
        );
        let model = Script::new(vec![ModelResponse::tool_calls("Go.", vec![invocation])]);
        let err = coordinator(model).run(request()).await.unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_INVOCATION");
        assert!(err.to_string().contains("definition_of_done"));
    }

    #[tokio::test]
    async fn turn_limit_stops_endless_chatter() {
        let model = Script::new(vec![
            ModelResponse::stop("hmm"),
            ModelResponse::stop("hmm again"),
        ]);
        let registry = WorkerRegistry::builder()
            .register("coder", "Edits source files", Arc::new(Echo))
            .unwrap()
            .build();
        let coordinator = Coordinator::builder(model, registry)
            .max_turns(2)
            .build()
            .unwrap();

        let err = coordinator.run(request()).await.unwrap_err();
        match err {
            CoordinatorError::TurnLimitExceeded { limit, rationale } => {
                assert_eq!(limit, 2);
                assert_eq!(rationale.as_deref(), Some("hmm again"));
            }
            other => panic!("expected TurnLimitExceeded, got {other}"),
        }
    }

    #[tokio::test]
    async fn empty_registry_and_missing_goal_are_config_errors() {
        let model = Script::new(vec![]);
        let empty = Coordinator::builder(model.clone(), WorkerRegistry::default())
            .build()
            .unwrap();
        let err = empty.run(request()).await.unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");

        let err = coordinator(model)
            .run(RunRequest::new(Arc::new(NullEnvironment)))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }

    #[test]
    fn builder_rejects_bad_token() {
        let model = Script::new(vec![]);
        let result = Coordinator::builder(model, WorkerRegistry::default())
            .completion_token("ALL DONE")
            .build();
        assert!(matches!(result, Err(CoordinatorError::Config(_))));
    }
}
