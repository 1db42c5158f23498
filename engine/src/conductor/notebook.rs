//! Notebook assembly
//!
//! After a run is done, one more agent lays the finished project out as a
//! Jupyter notebook. It gets the brief and the work log, and only the file
//! and notebook capabilities.

use std::sync::Arc;

use sdk::errors::EngineError;
use tracing::info;

use crate::agent::{prompts, Agent, AgentProfile, AgentRuntime};
use crate::audit::AuditSink;

/// Run the notebook assembler and return its final answer
pub async fn assemble_notebook(
    runtime: &AgentRuntime,
    audit: Arc<dyn AuditSink>,
    model: &str,
    brief: &str,
    work_log: &str,
) -> Result<String, EngineError> {
    let mut agent = Agent::new(AgentProfile::notebook_assembler(model), audit);
    agent.add_user_message(prompts::notebook_seed(brief, work_log))?;

    info!("{} is assembling the notebook", agent.name());
    let response = runtime.query(&mut agent).await?;
    Ok(response.turn_content())
}
