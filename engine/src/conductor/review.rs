//! Review Loop
//!
//! Runs one plan step: a fresh worker does the work, a fresh reviewer checks
//! it, and the two alternate until the reviewer accepts. The worker's final
//! summary becomes the step's `WorkSummary`.

use std::sync::Arc;

use sdk::errors::EngineError;
use tracing::{info, warn};

use super::types::{ReviewVerdict, WorkSummary};
use crate::agent::{prompts, Agent, AgentProfile, AgentRuntime};
use crate::audit::AuditSink;

/// Default cap on reviewer queries per step
pub const DEFAULT_MAX_REVIEW_ROUNDS: usize = 10;

/// Inputs of one step
#[derive(Debug, Clone, Copy)]
pub struct StepInput<'a> {
    /// 1-based step number across the run
    pub step: usize,
    pub brief: &'a str,
    pub description: &'a str,
    /// Work log of earlier steps
    pub prior_work: &'a str,
}

/// Alternates a worker and a reviewer until the work is accepted
pub struct ReviewLoop {
    runtime: Arc<AgentRuntime>,
    audit: Arc<dyn AuditSink>,
    worker_model: String,
    reviewer_model: String,
    max_review_rounds: usize,
}

impl ReviewLoop {
    pub fn new(
        runtime: Arc<AgentRuntime>,
        audit: Arc<dyn AuditSink>,
        worker_model: impl Into<String>,
        reviewer_model: impl Into<String>,
    ) -> Self {
        Self {
            runtime,
            audit,
            worker_model: worker_model.into(),
            reviewer_model: reviewer_model.into(),
            max_review_rounds: DEFAULT_MAX_REVIEW_ROUNDS,
        }
    }

    pub fn with_max_review_rounds(mut self, max_review_rounds: usize) -> Self {
        self.max_review_rounds = max_review_rounds;
        self
    }

    /// Run the step to an accepted summary.
    ///
    /// # Errors
    ///
    /// - Any fatal error from a worker or reviewer query
    /// - `EngineError::LimitExceeded` when the reviewer rejects
    ///   `max_review_rounds` times
    pub async fn run(&self, input: StepInput<'_>) -> Result<WorkSummary, EngineError> {
        let mut worker = Agent::new(
            AgentProfile::worker(input.step, &self.worker_model),
            Arc::clone(&self.audit),
        );
        worker.add_user_message(prompts::worker_seed(
            input.brief,
            input.prior_work,
            input.description,
        ))?;
        let first_output = self.runtime.query(&mut worker).await?.turn_content();

        let mut reviewer = Agent::new(
            AgentProfile::reviewer(input.step, &self.reviewer_model),
            Arc::clone(&self.audit),
        );
        reviewer.add_user_message(prompts::reviewer_seed(
            input.brief,
            input.description,
            &first_output,
        ))?;

        for round in 1..=self.max_review_rounds {
            let response = self.runtime.query(&mut reviewer).await?;
            let verdict = ReviewVerdict::from_response(reviewer.name(), &response)?;

            if verdict.accepted {
                info!(step = input.step, round, "{} has passed the work", reviewer.name());
                worker.add_user_message(prompts::REVIEW_PASSED)?;
                let summary = self.runtime.query(&mut worker).await?.turn_content();
                return Ok(WorkSummary {
                    step: input.step,
                    agent: worker.name().to_string(),
                    description: input.description.to_string(),
                    summary,
                    review_rounds: round,
                });
            }

            let feedback = verdict.feedback_text();
            info!(step = input.step, round, "Feedback: {}", feedback);
            if round == self.max_review_rounds {
                break;
            }

            worker.add_user_message(prompts::review_feedback(feedback))?;
            let revised = self.runtime.query(&mut worker).await?.turn_content();
            reviewer.add_user_message(prompts::worker_changes(&revised))?;
        }

        warn!(
            step = input.step,
            "{} rejected the work {} times",
            reviewer.name(),
            self.max_review_rounds
        );
        Err(EngineError::limit(
            reviewer.name(),
            "max_review_rounds",
            self.max_review_rounds,
        ))
    }
}
