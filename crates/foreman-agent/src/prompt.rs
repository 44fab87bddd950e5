//! System prompt rendering using Handlebars
//!
//! The prompt is a pure function of the goal, the registry and the completion token. It is
//! rendered once at the start of each run and becomes the conversation's only system turn.

use handlebars::Handlebars;
use serde_json::json;

use crate::catalog::DISPATCH_ACTION;
use crate::error::PromptError;
use crate::registry::WorkerRegistry;

const TEMPLATE_NAME: &str = "coordinator/system";

/// Built-in coordinator instructions.
pub const DEFAULT_TEMPLATE: &str = r#"You are the coordinator of a team of specialized workers. You do not solve the goal yourself: you break it into subtasks and delegate them, one at a time, to the worker best suited for each.

GOAL:
{{goal}}

WORKERS:
{{#each workers}}
- {{this.id}}: {{this.description}}
{{/each}}

On every turn you must:
1. State your assessment of the progress made so far, based on the worker reports you have received.
2. Choose exactly one next subtask and exactly one worker, and delegate it by calling the `{{dispatch_action}}` action.
3. Give the subtask a specific, narrowly scoped definition of done that the worker can verify on its own.
4. When the goal is fully satisfied, do not delegate anything further. Reply with the single word {{completion_token}} instead.
"#;

/// Renders the coordinator's system instructions.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    handlebars: Handlebars<'static>,
}

impl PromptBuilder {
    /// Create a builder using the built-in template.
    pub fn new() -> Result<Self, PromptError> {
        Self::with_template(DEFAULT_TEMPLATE)
    }

    /// Create a builder from a custom Handlebars template.
    ///
    /// The template sees `goal`, `workers` (a list of `{id, description}`),
    /// `completion_token` and `dispatch_action`.
    pub fn with_template(template: &str) -> Result<Self, PromptError> {
        let mut hbs = Handlebars::new();
        hbs.set_strict_mode(true);
        // Prompts are plain text; HTML escaping would mangle code in goals.
        hbs.register_escape_fn(handlebars::no_escape);
        hbs.register_template_string(TEMPLATE_NAME, template)?;
        Ok(Self { handlebars: hbs })
    }

    /// Render the system prompt for one run.
    pub fn render(
        &self,
        goal: &str,
        registry: &WorkerRegistry,
        completion_token: &str,
    ) -> Result<String, PromptError> {
        let workers: Vec<_> = registry
            .list()
            .iter()
            .map(|w| json!({ "id": w.id.as_str(), "description": w.capability_description }))
            .collect();

        let data = json!({
            "goal": goal,
            "workers": workers,
            "completion_token": completion_token,
            "dispatch_action": DISPATCH_ACTION,
        });

        Ok(self.handlebars.render(TEMPLATE_NAME, &data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkerError;
    use crate::traits::Worker;
    use crate::types::{WorkerOutput, WorkerRequest};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Noop;

    #[async_trait]
    impl Worker for Noop {
        async fn run(&self, _request: WorkerRequest) -> Result<WorkerOutput, WorkerError> {
            Ok(WorkerOutput::default())
        }
    }

    fn registry() -> WorkerRegistry {
        WorkerRegistry::builder()
            .register("coder", "Edits source files", Arc::new(Noop))
            .unwrap()
            .register("tester", "Runs the test suite", Arc::new(Noop))
            .unwrap()
            .build()
    }

    #[test]
    fn default_prompt_covers_turn_protocol() {
        let prompt = PromptBuilder::new()
            .unwrap()
            .render("Fix issue #42 in the pager", &registry(), "DONE")
            .unwrap();

        assert!(prompt.contains("Fix issue #42 in the pager"));
        assert!(prompt.contains("- coder: Edits source files"));
        assert!(prompt.contains("- tester: Runs the test suite"));
        assert!(prompt.contains("assessment of the progress"));
        assert!(prompt.contains("exactly one worker"));
        assert!(prompt.contains("definition of done"));
        assert!(prompt.contains("single word DONE"));
        assert!(prompt.contains("`call_worker`"));
    }

    #[test]
    fn goal_text_is_not_html_escaped() {
        let prompt = PromptBuilder::new()
            .unwrap()
            .render("Make `a < b && c > d` hold", &registry(), "DONE")
            .unwrap();
        assert!(prompt.contains("Make `a < b && c > d` hold"));
    }

    #[test]
    fn custom_template_is_rendered() {
        let builder = PromptBuilder::with_template("{{goal}} | {{completion_token}}").unwrap();
        let prompt = builder.render("ship it", &registry(), "FINISHED").unwrap();
        assert_eq!(prompt, "ship it | FINISHED");
    }

    #[test]
    fn strict_mode_rejects_unknown_variables() {
        let builder = PromptBuilder::with_template("{{goal}} {{budget}}").unwrap();
        assert!(matches!(
            builder.render("x", &registry(), "DONE"),
            Err(PromptError::RenderingFailed(_))
        ));
    }

    #[test]
    fn malformed_template_is_rejected() {
        assert!(matches!(
            PromptBuilder::with_template("{{#each workers}}"),
            Err(PromptError::RegistrationFailed(_))
        ));
    }
}
