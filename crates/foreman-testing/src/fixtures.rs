//! Builders for common decision model replies.

use serde_json::json;

use foreman_agent::{DISPATCH_ACTION, ModelResponse, ToolInvocation};
use foreman_core::ModelUsage;

/// A well-formed dispatch invocation.
pub fn dispatch_call(
    id: &str,
    worker: &str,
    task: &str,
    current_status: &str,
    definition_of_done: &str,
) -> ToolInvocation {
    ToolInvocation::new(
        id,
        DISPATCH_ACTION,
        json!({
            "worker": worker,
            "task": task,
            "current_status": current_status,
            "definition_of_done": definition_of_done,
        }),
    )
}

/// A dispatch turn with the given commentary and invocations, billed as one call.
pub fn dispatch(content: &str, calls: Vec<ToolInvocation>) -> ModelResponse {
    ModelResponse::tool_calls(content, calls).with_usage(ModelUsage::single_call(0, 0))
}

/// A completion turn, billed as one call.
pub fn done(content: &str) -> ModelResponse {
    ModelResponse::stop(content).with_usage(ModelUsage::single_call(0, 0))
}
