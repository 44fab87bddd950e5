//! Tests for coordinators registered as workers of other coordinators

use foreman_agent::{
    Coordinator, CoordinatorError, Role, RunRequest, Worker, WorkerError, WorkerRegistry,
};
use foreman_core::{ModelUsage, PricingPolicy, UsageStats};
use foreman_testing::{MockWorker, ScriptedModel, StubEnvironment, dispatch, dispatch_call, done};
use serde_json::json;
use std::sync::Arc;

const PRICING: PricingPolicy = PricingPolicy {
    price_in: 0.0001,
    price_out: 0.001,
};

struct Team {
    inner_model: ScriptedModel,
    outer_model: ScriptedModel,
    coder: MockWorker,
    outer: Coordinator,
}

fn team(coder: MockWorker, inner_replies: Vec<foreman_agent::ModelResponse>) -> Team {
    let inner_model = ScriptedModel::from_responses(inner_replies).named("inner");
    let inner_registry = WorkerRegistry::builder()
        .register("coder", "Edits source files", Arc::new(coder.clone()))
        .unwrap()
        .build();
    let inner = Coordinator::builder(Arc::new(inner_model.clone()), inner_registry)
        .name("backend-team")
        .pricing(PRICING)
        .build()
        .unwrap();

    let outer_model = ScriptedModel::from_responses([
        dispatch(
            "The backend team owns the pager.",
            vec![dispatch_call(
                "outer_1",
                "backend",
                "Fix the pager",
                "Issue triaged",
                "fix bug",
            )],
        )
        .with_usage(ModelUsage::single_call(1000, 100)),
        done("DONE").with_usage(ModelUsage::single_call(1500, 10)),
    ])
    .named("outer");
    let outer_registry = WorkerRegistry::builder()
        .register("backend", "Backend team coordinator", Arc::new(inner))
        .unwrap()
        .build();
    let outer = Coordinator::builder(Arc::new(outer_model.clone()), outer_registry)
        .pricing(PRICING)
        .build()
        .unwrap();

    Team {
        inner_model,
        outer_model,
        coder,
        outer,
    }
}

fn inner_replies() -> Vec<foreman_agent::ModelResponse> {
    vec![
        dispatch(
            "Coder takes it.",
            vec![dispatch_call(
                "inner_1",
                "coder",
                "Patch pager.rs",
                "Nothing done yet",
                "fix bug",
            )],
        )
        .with_usage(ModelUsage::single_call(800, 80)),
        done("DONE").with_usage(ModelUsage::single_call(900, 5)),
    ]
}

#[tokio::test]
async fn test_nested_run_merges_stats_and_trajectory() {
    let coder = MockWorker::new("coder")
        .with_step("edit pager.rs")
        .with_step("run tests")
        .with_cost(3, 0.4)
        .with_summary("patched pager.rs");
    let team = team(coder, inner_replies());
    let env = StubEnvironment::new().with_field("exit_status", json!("submitted"));

    let result = team
        .outer
        .run(
            RunRequest::new(Arc::new(env.clone()))
                .with_goal("Resolve issue #42")
                .with_init_stats(UsageStats::seeded(2, 0.05)),
        )
        .await
        .unwrap();

    // outer dispatch, inner dispatch, coder's two steps
    let actions: Vec<&str> = result.trajectory.iter().map(|s| s.action.as_str()).collect();
    assert_eq!(actions.len(), 4);
    assert!(actions[0].contains("\"backend\""));
    assert!(actions[1].contains("\"coder\""));
    assert_eq!(&actions[2..], ["edit pager.rs", "run tests"]);

    let outer_cost = PRICING.cost(&ModelUsage::single_call(1000, 100))
        + PRICING.cost(&ModelUsage::single_call(1500, 10));
    let inner_cost = PRICING.cost(&ModelUsage::single_call(800, 80))
        + PRICING.cost(&ModelUsage::single_call(900, 5));
    assert_eq!(result.stats.calls, 2 + 2 + 2 + 3);
    assert_eq!(result.stats.tokens_in, 1000 + 1500 + 800 + 900);
    assert!((result.stats.cost_total - (0.05 + outer_cost + inner_cost + 0.4)).abs() < 1e-9);

    // Both levels signal their environment on completion
    assert_eq!(env.signals(), ["DONE", "DONE"]);
    assert_eq!(result.terminal_fields["exit_status"], "submitted");
}

#[tokio::test]
async fn test_nested_run_is_seeded_from_outer_baseline() {
    let coder = MockWorker::new("coder").with_cost(1, 0.1);
    let team = team(coder, inner_replies());
    let env = StubEnvironment::new();

    team.outer
        .run(
            RunRequest::new(Arc::new(env))
                .with_goal("Resolve issue #42")
                .with_init_stats(UsageStats::seeded(2, 0.05)),
        )
        .await
        .unwrap();

    // The coder sees the outer running total plus the inner decision, but only the
    // inner run's own counters.
    let outer_decision = PRICING.cost(&ModelUsage::single_call(1000, 100));
    let inner_decision = PRICING.cost(&ModelUsage::single_call(800, 80));
    let baseline = team.coder.baselines()[0];
    assert_eq!(baseline.calls, 1);
    assert!((baseline.cost_total - (0.05 + outer_decision + inner_decision)).abs() < 1e-9);
    assert!((baseline.cost_delta - inner_decision).abs() < 1e-9);
}

#[tokio::test]
async fn test_nested_summary_feeds_outer_conversation() {
    let coder = MockWorker::new("coder").with_summary("patched pager.rs");
    let team = team(coder, inner_replies());
    let env = StubEnvironment::new();

    team.outer
        .run(RunRequest::new(Arc::new(env)).with_goal("Resolve issue #42"))
        .await
        .unwrap();

    let second_turn = &team.outer_model.seen_turns()[1];
    let tool_result = &second_turn[2];
    assert_eq!(tool_result.role, Role::ToolResult);
    assert_eq!(tool_result.tool_call_id.as_deref(), Some("outer_1"));
    assert_eq!(
        tool_result.content,
        "Completed after 1 subtask(s). Last report: patched pager.rs"
    );

    // The inner coordinator was prompted with the rendered subtask as its goal
    let inner_prompt = &team.inner_model.seen_turns()[0][0].content;
    assert!(inner_prompt.contains("Task: Fix the pager"));
    assert!(inner_prompt.contains("Definition of done: fix bug"));
}

#[tokio::test]
async fn test_nested_failure_surfaces_through_outer_run() {
    let coder = MockWorker::new("coder").failing("tests still red");
    let team = team(coder, inner_replies());
    let env = StubEnvironment::new();

    let err = team
        .outer
        .run(RunRequest::new(Arc::new(env.clone())).with_goal("Resolve issue #42"))
        .await
        .unwrap_err();

    match err {
        CoordinatorError::WorkerRun {
            worker,
            source: WorkerError::Nested(inner),
            rationale,
            ..
        } => {
            assert_eq!(worker, "backend");
            assert_eq!(rationale, "The backend team owns the pager.");
            match *inner {
                CoordinatorError::WorkerRun {
                    worker, rationale, ..
                } => {
                    assert_eq!(worker, "coder");
                    assert_eq!(rationale, "Coder takes it.");
                }
                other => panic!("expected inner WorkerRun, got {other}"),
            }
        }
        other => panic!("expected nested WorkerRun, got {other}"),
    }
    assert_eq!(env.signal_count(), 0);
}

#[tokio::test]
async fn test_coordinator_as_worker_returns_summary_output() {
    let coder = MockWorker::new("coder").with_step("edit").with_cost(2, 0.2);
    let inner_model = ScriptedModel::from_responses(inner_replies());
    let registry = WorkerRegistry::builder()
        .register("coder", "Edits source files", Arc::new(coder))
        .unwrap()
        .build();
    let inner = Coordinator::builder(Arc::new(inner_model), registry)
        .pricing(PRICING)
        .build()
        .unwrap();

    let request = foreman_agent::WorkerRequest {
        setup_context: RunRequest::new(Arc::new(StubEnvironment::new()))
            .with_goal("Patch the pager")
            .setup_context,
        environment: Arc::new(StubEnvironment::new().with_field("submission", json!("diff"))),
        observation: None,
        trajectory_dir: None,
        return_type: foreman_agent::ReturnType::InfoTrajectory,
        cost_baseline: UsageStats::seeded(5, 1.0),
    };

    let output = Worker::run(&inner, request).await.unwrap();
    assert_eq!(output.trajectory.len(), 2);
    assert_eq!(output.info.extra["submission"], "diff");
    assert!(!output.summary.is_empty());

    // Deltas cover only this sub-run; the total carries the caller's baseline forward
    let inner_cost = PRICING.cost(&ModelUsage::single_call(800, 80))
        + PRICING.cost(&ModelUsage::single_call(900, 5));
    assert_eq!(output.info.stats.calls, 2 + 2);
    assert!((output.info.stats.cost_delta - (inner_cost + 0.2)).abs() < 1e-9);
    assert!((output.info.stats.cost_total - (1.0 + inner_cost + 0.2)).abs() < 1e-9);
}
