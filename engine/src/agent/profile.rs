//! Agent profiles
//!
//! Planner, worker, reviewer and notebook assembler differ only in
//! configuration: name, model, system prompt, permitted capabilities and the
//! structured response they must produce. An `AgentProfile` carries those
//! values; behavior is shared through `AgentRuntime`.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

use super::prompts;
use crate::llm::ResponseSchema;
use crate::tools::{NOTEBOOK_TOOLS, WORK_TOOLS};

/// Role an agent plays in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Planner,
    Worker,
    Reviewer,
    NotebookAssembler,
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentRole::Planner => write!(f, "planner"),
            AgentRole::Worker => write!(f, "worker"),
            AgentRole::Reviewer => write!(f, "reviewer"),
            AgentRole::NotebookAssembler => write!(f, "notebook_assembler"),
        }
    }
}

/// Static configuration of one agent
#[derive(Debug, Clone, PartialEq)]
pub struct AgentProfile {
    pub role: AgentRole,
    /// Unique name, also the audit stream key
    pub name: String,
    pub description: String,
    pub model: String,
    pub system_prompt: String,
    /// Names of the capabilities the agent may call
    pub capabilities: Vec<String>,
    /// Schema the final (non tool-calling) reply must match
    pub response_schema: Option<ResponseSchema>,
}

impl AgentProfile {
    /// The long-lived planning agent
    pub fn planner(model: impl Into<String>) -> Self {
        Self {
            role: AgentRole::Planner,
            name: "PlanningAgent".to_string(),
            description: "Plans the steps of the project".to_string(),
            model: model.into(),
            system_prompt: prompts::PLANNER_SYSTEM_PROMPT.to_string(),
            capabilities: names(WORK_TOOLS),
            response_schema: Some(planning_schema()),
        }
    }

    /// Worker for plan step `step`
    pub fn worker(step: usize, model: impl Into<String>) -> Self {
        Self {
            role: AgentRole::Worker,
            name: format!("WorkerAgent{}", step),
            description: "Completes one step of the project".to_string(),
            model: model.into(),
            system_prompt: prompts::WORKER_SYSTEM_PROMPT.to_string(),
            capabilities: names(WORK_TOOLS),
            response_schema: None,
        }
    }

    /// Reviewer for plan step `step`
    pub fn reviewer(step: usize, model: impl Into<String>) -> Self {
        Self {
            role: AgentRole::Reviewer,
            name: format!("ReviewAgent{}", step),
            description: "Reviews the work done by a worker and gives feedback".to_string(),
            model: model.into(),
            system_prompt: prompts::REVIEWER_SYSTEM_PROMPT.to_string(),
            capabilities: names(WORK_TOOLS),
            response_schema: Some(review_schema()),
        }
    }

    /// Notebook assembler run after the project is done
    pub fn notebook_assembler(model: impl Into<String>) -> Self {
        Self {
            role: AgentRole::NotebookAssembler,
            name: "IpynbAgent".to_string(),
            description: "Builds a Jupyter notebook from the finished project".to_string(),
            model: model.into(),
            system_prompt: prompts::NOTEBOOK_SYSTEM_PROMPT.to_string(),
            capabilities: names(NOTEBOOK_TOOLS),
            response_schema: None,
        }
    }

    /// Replace the permitted capability set
    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Strict schema of the planner's decision
pub fn planning_schema() -> ResponseSchema {
    ResponseSchema {
        name: "PlanningResponse".to_string(),
        schema: json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["plan", "user_question", "done"]
                },
                "steps_description": {
                    "type": ["array", "null"],
                    "items": { "type": "string" }
                },
                "user_question": { "type": ["string", "null"] },
                "final_summary": { "type": ["string", "null"] }
            },
            "required": ["action", "steps_description", "user_question", "final_summary"],
            "additionalProperties": false
        }),
    }
}

/// Strict schema of the reviewer's verdict
pub fn review_schema() -> ResponseSchema {
    ResponseSchema {
        name: "ReviewResponse".to_string(),
        schema: json!({
            "type": "object",
            "properties": {
                "passed": { "type": "boolean" },
                "feedback": { "type": ["string", "null"] }
            },
            "required": ["passed", "feedback"],
            "additionalProperties": false
        }),
    }
}
