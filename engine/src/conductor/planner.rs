//! Conductor Planner
//!
//! The outer state machine of a run. The long-lived planning agent decides
//! what happens next; the controller acts on each decision:
//!
//! - `Plan(steps)`: run the first step through the review loop and report
//!   its summary back to the planner
//! - `UserQuestion(q)`: ask the user, `exit` aborts the run
//! - `Done(summary)`: finish
//!
//! ```text
//! AwaitingPlan ──plan──▶ ExecutingStep ──summary──▶ AwaitingPlan
//!      │
//!      ├──done──▶ Done
//!      └──exit──▶ Aborted
//! ```

use std::sync::Arc;

use chrono::Utc;
use sdk::errors::EngineError;
use tracing::{debug, info, warn};

use super::review::{ReviewLoop, StepInput, DEFAULT_MAX_REVIEW_ROUNDS};
use super::types::{PlanningDecision, RunOutcome, RunState, WorkSummary};
use crate::agent::{Agent, AgentProfile, AgentRole, AgentRuntime};
use crate::audit::AuditSink;
use crate::config::Config;
use crate::input::{is_exit, InputChannel};

/// Marker appended to truncated summaries
pub const TRUNCATION_MARKER: &str = "...[truncated]";

/// Truncate `text` to at most `max` chars plus the marker; `None` keeps it whole
pub fn truncate_summary(text: &str, max: Option<usize>) -> String {
    match max {
        Some(max) if text.chars().count() > max => {
            let cut: String = text.chars().take(max).collect();
            format!("{}{}", cut, TRUNCATION_MARKER)
        }
        _ => text.to_string(),
    }
}

/// Models and limits of a run
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    pub planner_model: String,
    pub worker_model: String,
    pub reviewer_model: String,
    pub max_review_rounds: usize,
    pub max_summary_chars: Option<usize>,
}

impl ControllerSettings {
    /// Same model for every role, default limits
    pub fn with_model(model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            planner_model: model.clone(),
            worker_model: model.clone(),
            reviewer_model: model,
            max_review_rounds: DEFAULT_MAX_REVIEW_ROUNDS,
            max_summary_chars: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            planner_model: config.model_for(AgentRole::Planner).to_string(),
            worker_model: config.model_for(AgentRole::Worker).to_string(),
            reviewer_model: config.model_for(AgentRole::Reviewer).to_string(),
            max_review_rounds: config.limits.max_review_rounds,
            max_summary_chars: config.limits.max_summary_chars,
        }
    }
}

/// Drives a run from the brief to `Done` or `Aborted`
pub struct PlanningController<I: InputChannel> {
    runtime: Arc<AgentRuntime>,
    review: ReviewLoop,
    planner: Agent,
    input: I,
    brief: String,
    max_summary_chars: Option<usize>,
    state: RunState,
    work_summaries: Vec<WorkSummary>,
    steps_run: usize,
    plan_logged: bool,
}

impl<I: InputChannel> PlanningController<I> {
    /// Create a controller whose planner is seeded with `brief`
    pub fn new(
        runtime: Arc<AgentRuntime>,
        audit: Arc<dyn AuditSink>,
        settings: ControllerSettings,
        brief: impl Into<String>,
        input: I,
    ) -> Result<Self, EngineError> {
        let brief = brief.into();
        let mut planner = Agent::new(
            AgentProfile::planner(&settings.planner_model),
            Arc::clone(&audit),
        );
        planner.add_user_message(brief.clone())?;

        let review = ReviewLoop::new(
            Arc::clone(&runtime),
            audit,
            &settings.worker_model,
            &settings.reviewer_model,
        )
        .with_max_review_rounds(settings.max_review_rounds);

        Ok(Self {
            runtime,
            review,
            planner,
            input,
            brief,
            max_summary_chars: settings.max_summary_chars,
            state: RunState::AwaitingPlan,
            work_summaries: Vec::new(),
            steps_run: 0,
            plan_logged: false,
        })
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn planner(&self) -> &Agent {
        &self.planner
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn work_summaries(&self) -> &[WorkSummary] {
        &self.work_summaries
    }

    /// Work log of accepted steps, as handed to workers and the notebook agent
    pub fn work_log(&self) -> String {
        let log = self
            .work_summaries
            .iter()
            .map(WorkSummary::entry)
            .collect::<Vec<_>>()
            .join("\n");
        truncate_summary(&log, self.max_summary_chars)
    }

    /// Run until a terminal state.
    ///
    /// # Errors
    /// Any fatal error of the planner, a worker or a reviewer. The state is
    /// left where the error happened.
    pub async fn run(&mut self) -> Result<RunOutcome, EngineError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        info!(run_id = %run_id, "Starting run");

        let mut final_summary = None;
        while !self.state.is_terminal() {
            final_summary = self.advance().await?;
        }

        info!(run_id = %run_id, state = %self.state, steps = self.steps_run, "Run finished");
        Ok(RunOutcome {
            run_id,
            state: self.state.clone(),
            final_summary,
            work_summaries: self.work_summaries.clone(),
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Perform one transition. Returns the final summary on `Done`.
    pub async fn advance(&mut self) -> Result<Option<String>, EngineError> {
        match std::mem::replace(&mut self.state, RunState::AwaitingPlan) {
            RunState::AwaitingPlan => self.await_plan().await,
            RunState::ExecutingStep(steps) => {
                self.execute_step(steps).await?;
                Ok(None)
            }
            terminal => {
                self.state = terminal;
                Ok(None)
            }
        }
    }

    async fn await_plan(&mut self) -> Result<Option<String>, EngineError> {
        loop {
            let response = self.runtime.query(&mut self.planner).await?;
            let decision = PlanningDecision::from_response(self.planner.name(), &response)?;
            debug!(agent = %self.planner.name(), action = decision.action(), "Planner decided");
            match decision {
                PlanningDecision::Plan(steps) => {
                    if !self.plan_logged {
                        info!("Planning agent has formed an initial plan: {:?}", steps);
                        self.plan_logged = true;
                    } else {
                        debug!(remaining = steps.len(), "Plan updated");
                    }
                    self.state = RunState::ExecutingStep(steps);
                    return Ok(None);
                }
                PlanningDecision::UserQuestion(question) => {
                    let answer = self.input.ask(&question).await?;
                    match answer {
                        Some(answer) if !is_exit(&answer) => {
                            self.planner.add_user_message(answer)?;
                        }
                        _ => {
                            warn!("Run aborted by the user");
                            self.state = RunState::Aborted;
                            return Ok(None);
                        }
                    }
                }
                PlanningDecision::Done(summary) => {
                    info!("Project is complete. Final summary: {}", summary);
                    self.state = RunState::Done;
                    return Ok(Some(summary));
                }
            }
        }
    }

    async fn execute_step(&mut self, steps: Vec<String>) -> Result<(), EngineError> {
        let Some(description) = steps.first() else {
            return Err(EngineError::backend(
                self.planner.name(),
                "Planner returned an empty plan",
            ));
        };
        self.steps_run += 1;
        let step = self.steps_run;
        info!(step, "Starting step: {}", description);

        let prior_work = self.work_log();
        let result = self
            .review
            .run(StepInput {
                step,
                brief: &self.brief,
                description,
                prior_work: &prior_work,
            })
            .await;
        let summary = match result {
            Ok(summary) => summary,
            Err(e) => {
                self.state = RunState::ExecutingStep(steps);
                return Err(e);
            }
        };

        let entry = truncate_summary(&summary.entry(), self.max_summary_chars);
        self.planner.add_user_message(entry)?;
        info!(step, agent = %summary.agent, "Step accepted");
        self.work_summaries.push(summary);
        self.state = RunState::AwaitingPlan;
        Ok(())
    }
}
