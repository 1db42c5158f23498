//! Conductor Types
//!
//! Decisions, verdicts and outcomes exchanged between the planning
//! controller, the review loop and the process entry point.

use chrono::{DateTime, Utc};
use sdk::errors::EngineError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};
use std::fmt;

use crate::llm::CompletionResponse;

/// Feedback used when a reviewer rejects work without saying why
pub const GENERIC_FEEDBACK: &str =
    "The work does not meet the required standard yet. Check it again and improve it.";

/// What the planner decided to do next.
///
/// Serializes to the planner's wire shape: `action` plus the nullable
/// `steps_description`, `user_question` and `final_summary` fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanningDecision {
    /// Remaining steps; only the first one is executed before re-planning
    Plan(Vec<String>),
    /// A question for the user
    UserQuestion(String),
    /// The project is complete
    Done(String),
}

/// Wire shape of the planner's structured reply
#[derive(Debug, Serialize, Deserialize)]
struct RawPlanningResponse {
    action: String,
    #[serde(default)]
    steps_description: Option<Vec<String>>,
    #[serde(default)]
    user_question: Option<String>,
    #[serde(default)]
    final_summary: Option<String>,
}

impl From<&PlanningDecision> for RawPlanningResponse {
    fn from(decision: &PlanningDecision) -> Self {
        let mut raw = Self {
            action: decision.action().to_string(),
            steps_description: None,
            user_question: None,
            final_summary: None,
        };
        match decision {
            PlanningDecision::Plan(steps) => raw.steps_description = Some(steps.clone()),
            PlanningDecision::UserQuestion(q) => raw.user_question = Some(q.clone()),
            PlanningDecision::Done(summary) => raw.final_summary = Some(summary.clone()),
        }
        raw
    }
}

impl RawPlanningResponse {
    fn into_decision(self) -> Result<PlanningDecision, String> {
        match self.action.as_str() {
            "plan" => match self.steps_description {
                None => Err("Planner planned without steps_description".to_string()),
                Some(steps) if steps.is_empty() => {
                    Err("Planner returned an empty plan".to_string())
                }
                Some(steps) => Ok(PlanningDecision::Plan(steps)),
            },
            "user_question" => self
                .user_question
                .map(PlanningDecision::UserQuestion)
                .ok_or_else(|| "Planner asked a question without user_question".to_string()),
            "done" => self
                .final_summary
                .map(PlanningDecision::Done)
                .ok_or_else(|| "Planner finished without final_summary".to_string()),
            other => Err(format!("Unknown planning action '{}'", other)),
        }
    }
}

impl Serialize for PlanningDecision {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RawPlanningResponse::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PlanningDecision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawPlanningResponse::deserialize(deserializer)?
            .into_decision()
            .map_err(serde::de::Error::custom)
    }
}

impl PlanningDecision {
    /// Value of the `action` field
    pub fn action(&self) -> &'static str {
        match self {
            PlanningDecision::Plan(_) => "plan",
            PlanningDecision::UserQuestion(_) => "user_question",
            PlanningDecision::Done(_) => "done",
        }
    }

    /// Payload in the planner's wire shape, as accepted by `from_value`
    pub fn to_value(&self) -> Value {
        let raw = RawPlanningResponse::from(self);
        json!({
            "action": raw.action,
            "steps_description": raw.steps_description,
            "user_question": raw.user_question,
            "final_summary": raw.final_summary,
        })
    }

    /// Interpret a planner payload.
    ///
    /// # Errors
    /// `EngineError::Backend` when the payload is malformed, names an
    /// unknown action, lacks the field its action needs, or plans no steps.
    pub fn from_value(agent: &str, value: Value) -> Result<Self, EngineError> {
        let raw: RawPlanningResponse = serde_json::from_value(value).map_err(|e| {
            EngineError::backend(agent, format!("Malformed planning decision: {}", e))
        })?;
        raw.into_decision()
            .map_err(|message| EngineError::backend(agent, message))
    }

    /// Interpret the planner's final response
    pub fn from_response(agent: &str, response: &CompletionResponse) -> Result<Self, EngineError> {
        Self::from_value(agent, structured_payload(agent, response)?)
    }
}

/// A reviewer's judgement of one round of worker output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewVerdict {
    pub accepted: bool,
    /// Present iff `accepted` is false
    pub feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawReviewResponse {
    passed: bool,
    #[serde(default)]
    feedback: Option<String>,
}

impl ReviewVerdict {
    /// Build a normalized verdict
    pub fn new(accepted: bool, feedback: Option<String>) -> Self {
        let feedback = if accepted {
            None
        } else {
            Some(
                feedback
                    .filter(|f| !f.trim().is_empty())
                    .unwrap_or_else(|| GENERIC_FEEDBACK.to_string()),
            )
        };
        Self { accepted, feedback }
    }

    pub fn accepted() -> Self {
        Self::new(true, None)
    }

    pub fn rejected(feedback: impl Into<String>) -> Self {
        Self::new(false, Some(feedback.into()))
    }

    /// Interpret a reviewer payload (`{"passed": bool, "feedback": ...}`)
    pub fn from_value(agent: &str, value: Value) -> Result<Self, EngineError> {
        let raw: RawReviewResponse = serde_json::from_value(value)
            .map_err(|e| EngineError::backend(agent, format!("Malformed review verdict: {}", e)))?;
        Ok(Self::new(raw.passed, raw.feedback))
    }

    pub fn from_response(agent: &str, response: &CompletionResponse) -> Result<Self, EngineError> {
        Self::from_value(agent, structured_payload(agent, response)?)
    }

    /// Feedback text; empty for accepted verdicts
    pub fn feedback_text(&self) -> &str {
        self.feedback.as_deref().unwrap_or_default()
    }
}

/// Parsed payload of a structured reply, falling back to parsing the text
fn structured_payload(agent: &str, response: &CompletionResponse) -> Result<Value, EngineError> {
    if let Some(parsed) = &response.parsed {
        return Ok(parsed.clone());
    }
    let text = response
        .content
        .as_deref()
        .ok_or_else(|| EngineError::backend(agent, "Expected a structured response, got none"))?;
    serde_json::from_str(text.trim())
        .map_err(|e| EngineError::backend(agent, format!("Response is not valid JSON: {}", e)))
}

/// State of the outer planning loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "steps", rename_all = "snake_case")]
pub enum RunState {
    AwaitingPlan,
    /// Steps still to do; the first is being executed
    ExecutingStep(Vec<String>),
    Done,
    Aborted,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Aborted)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::AwaitingPlan => write!(f, "awaiting_plan"),
            RunState::ExecutingStep(_) => write!(f, "executing_step"),
            RunState::Done => write!(f, "done"),
            RunState::Aborted => write!(f, "aborted"),
        }
    }
}

/// Summary of one accepted plan step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkSummary {
    /// 1-based step number across the run
    pub step: usize,
    /// Worker that produced the summary
    pub agent: String,
    pub description: String,
    /// Worker's final summary text
    pub summary: String,
    /// Review rounds it took to get accepted
    pub review_rounds: usize,
}

impl WorkSummary {
    /// Entry as recorded in the work log and sent to the planner
    pub fn entry(&self) -> String {
        crate::agent::prompts::work_summary(&self.agent, &self.summary)
    }
}

/// Result of a finished run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: String,
    /// `Done` or `Aborted`
    pub state: RunState,
    /// Planner's final summary; only set when `Done`
    pub final_summary: Option<String>,
    pub work_summaries: Vec<WorkSummary>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunOutcome {
    pub fn is_done(&self) -> bool {
        self.state == RunState::Done
    }

    /// Work log joined the way it is handed to later agents
    pub fn work_log(&self) -> String {
        self.work_summaries
            .iter()
            .map(WorkSummary::entry)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_decision() {
        let decision = PlanningDecision::from_value(
            "PlanningAgent",
            json!({
                "action": "plan",
                "steps_description": ["Load data.csv", "Plot it"],
                "user_question": null,
                "final_summary": null
            }),
        )
        .unwrap();
        assert_eq!(
            decision,
            PlanningDecision::Plan(vec!["Load data.csv".into(), "Plot it".into()])
        );
    }

    #[test]
    fn test_empty_plan_is_backend_error() {
        let err = PlanningDecision::from_value(
            "PlanningAgent",
            json!({"action": "plan", "steps_description": []}),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Backend { ref agent, .. } if agent == "PlanningAgent"));
    }

    #[test]
    fn test_missing_steps_differs_from_empty_plan() {
        let message = |value: Value| match PlanningDecision::from_value("PlanningAgent", value) {
            Err(EngineError::Backend { message, .. }) => message,
            other => panic!("expected backend error, got {:?}", other),
        };
        assert_eq!(
            message(json!({"action": "plan", "steps_description": []})),
            "Planner returned an empty plan"
        );
        assert_eq!(
            message(json!({"action": "plan", "steps_description": null})),
            "Planner planned without steps_description"
        );
        assert_eq!(
            message(json!({"action": "plan"})),
            "Planner planned without steps_description"
        );
    }

    #[test]
    fn test_decision_serializes_to_wire_shape() {
        let plan = PlanningDecision::Plan(vec!["Load data.csv and report shape".into()]);
        let value = serde_json::to_value(&plan).unwrap();
        assert_eq!(
            value,
            json!({
                "action": "plan",
                "steps_description": ["Load data.csv and report shape"],
                "user_question": null,
                "final_summary": null
            })
        );
        assert_eq!(value, plan.to_value());

        let response = CompletionResponse::parsed(value);
        assert_eq!(
            PlanningDecision::from_response("PlanningAgent", &response).unwrap(),
            plan
        );

        let question = PlanningDecision::UserQuestion("Which column?".into());
        assert_eq!(question.to_value()["user_question"], "Which column?");
        assert_eq!(question.to_value()["steps_description"], Value::Null);
    }

    #[test]
    fn test_missing_fields_are_backend_errors() {
        for value in [
            json!({"action": "user_question", "user_question": null}),
            json!({"action": "done"}),
            json!({"action": "dance"}),
            json!({"steps_description": ["x"]}),
        ] {
            assert!(matches!(
                PlanningDecision::from_value("PlanningAgent", value),
                Err(EngineError::Backend { .. })
            ));
        }
    }

    #[test]
    fn test_decision_from_text_response() {
        let response = CompletionResponse::text(r#" {"action": "done", "final_summary": "ok"} "#);
        assert_eq!(
            PlanningDecision::from_response("PlanningAgent", &response).unwrap(),
            PlanningDecision::Done("ok".into())
        );
        assert!(PlanningDecision::from_response(
            "PlanningAgent",
            &CompletionResponse::text("not json")
        )
        .is_err());
    }

    #[test]
    fn test_verdict_normalization() {
        let accepted = ReviewVerdict::new(true, Some("nice".into()));
        assert_eq!(accepted.feedback, None);

        let rejected = ReviewVerdict::new(false, None);
        assert_eq!(rejected.feedback.as_deref(), Some(GENERIC_FEEDBACK));

        let blank = ReviewVerdict::new(false, Some("  ".into()));
        assert_eq!(blank.feedback_text(), GENERIC_FEEDBACK);

        let parsed = ReviewVerdict::from_value(
            "ReviewAgent1",
            json!({"passed": false, "feedback": "missing null check"}),
        )
        .unwrap();
        assert_eq!(parsed, ReviewVerdict::rejected("missing null check"));
    }

    #[test]
    fn test_run_state() {
        assert!(RunState::Done.is_terminal());
        assert!(RunState::Aborted.is_terminal());
        assert!(!RunState::ExecutingStep(vec!["a".into()]).is_terminal());
        assert_eq!(RunState::AwaitingPlan.to_string(), "awaiting_plan");
    }

    #[test]
    fn test_work_log() {
        let outcome = RunOutcome {
            run_id: "r".into(),
            state: RunState::Done,
            final_summary: Some("all good".into()),
            work_summaries: vec![
                WorkSummary {
                    step: 1,
                    agent: "WorkerAgent1".into(),
                    description: "load".into(),
                    summary: "loaded".into(),
                    review_rounds: 1,
                },
                WorkSummary {
                    step: 2,
                    agent: "WorkerAgent2".into(),
                    description: "plot".into(),
                    summary: "plotted".into(),
                    review_rounds: 2,
                },
            ],
            started_at: Utc::now(),
            finished_at: Utc::now(),
        };
        assert!(outcome.is_done());
        assert_eq!(
            outcome.work_log(),
            "WorkerAgent1 did the following work: loaded\nWorkerAgent2 did the following work: plotted"
        );
    }
}
