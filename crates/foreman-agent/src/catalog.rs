//! The action menu offered to the decision model.
//!
//! The catalog holds exactly one action, [`DISPATCH_ACTION`], whose `worker` parameter is an
//! enum of the registered worker ids. It is derived from the registry on demand and never
//! stored as run state.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::registry::WorkerRegistry;

/// Name of the single dispatchable action.
pub const DISPATCH_ACTION: &str = "call_worker";

/// Parameters every dispatch invocation must carry.
pub const REQUIRED_PARAMETERS: [&str; 4] = ["worker", "task", "current_status", "definition_of_done"];

/// One callable action and its JSON Schema parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    /// Render in the OpenAI `tools` array element form.
    pub fn to_openai(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

/// The full action menu for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCatalog {
    tools: Vec<ToolDefinition>,
}

impl ToolCatalog {
    /// Derive the catalog from the registry's current contents.
    pub fn for_registry(registry: &WorkerRegistry) -> Self {
        let worker_ids: Vec<&str> = registry.ids().map(|id| id.as_str()).collect();
        let roster = registry
            .list()
            .iter()
            .map(|w| format!("{}: {}", w.id, w.capability_description))
            .collect::<Vec<_>>()
            .join("; ");

        let dispatch = ToolDefinition {
            name: DISPATCH_ACTION.to_string(),
            description: format!(
                "Delegate exactly one narrowly scoped subtask to a worker. Available workers: {}",
                roster
            ),
            parameters: json!({
                "type": "object",
                "properties": {
                    "worker": {
                        "type": "string",
                        "enum": worker_ids,
                        "description": "Id of the worker that should perform the subtask",
                    },
                    "task": {
                        "type": "string",
                        "description": "Specific instructions for the worker",
                    },
                    "current_status": {
                        "type": "string",
                        "description": "What has been accomplished so far and what is known",
                    },
                    "definition_of_done": {
                        "type": "string",
                        "description": "Narrow, checkable condition that marks this subtask finished",
                    },
                },
                "required": REQUIRED_PARAMETERS,
                "additionalProperties": false,
            }),
        };

        Self {
            tools: vec![dispatch],
        }
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Look up an action by name.
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Render the whole catalog as an OpenAI `tools` array.
    pub fn to_openai_tools(&self) -> Value {
        Value::Array(self.tools.iter().map(ToolDefinition::to_openai).collect())
    }
}
