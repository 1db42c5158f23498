//! Agents
//!
//! An agent is a profile (role, model, prompt, capabilities, response
//! schema) plus the conversation it owns. `AgentRuntime` drives any agent
//! through the query/tool loop; the roles differ only in their profile.

pub mod artifact;
pub mod conversation;
pub mod core;
pub mod profile;
pub mod prompts;

pub use conversation::ConversationState;
pub use core::{Agent, AgentRuntime, DEFAULT_MAX_TOOL_ROUNDS};
pub use profile::{planning_schema, review_schema, AgentProfile, AgentRole};
