//! Integration tests for the planning loop and the review loop
//!
//! Every run is driven by a scripted backend; the models of the recorded
//! requests tell which agent asked:
//! - planner-model: PlanningAgent
//! - worker-model: WorkerAgent<n>
//! - reviewer-model: ReviewAgent<n>

mod common;

use std::sync::Arc;

use common::*;
use lumen_engine::agent::prompts;
use lumen_engine::audit::{AuditSink, MemoryAuditSink, NullAuditSink};
use lumen_engine::conductor::{
    assemble_notebook, ControllerSettings, PlanningController, RunState, TRUNCATION_MARKER,
};
use lumen_engine::input::ScriptedInput;
use lumen_engine::llm::{LLMError, MessageRole};
use lumen_engine::tools::ToolRegistry;
use sdk::errors::EngineError;

const BRIEF: &str = "Analyse data.csv and tell me what drives sales.";
const PLANNER: &str = "planner-model";
const WORKER: &str = "worker-model";
const REVIEWER: &str = "reviewer-model";

fn settings() -> ControllerSettings {
    ControllerSettings {
        planner_model: PLANNER.to_string(),
        worker_model: WORKER.to_string(),
        reviewer_model: REVIEWER.to_string(),
        max_review_rounds: 10,
        max_summary_chars: None,
    }
}

fn controller(
    provider: &Arc<ScriptedProvider>,
    settings: ControllerSettings,
    input: ScriptedInput,
) -> PlanningController<ScriptedInput> {
    PlanningController::new(
        runtime(Arc::clone(provider), ToolRegistry::empty()),
        Arc::new(NullAuditSink),
        settings,
        BRIEF,
        input,
    )
    .unwrap()
}

// Scenario A: one step, accepted at once, one summary reaches the planner
#[tokio::test]
async fn test_single_step_accepted() {
    let provider = ScriptedProvider::new(vec![
        plan(&["Load data.csv and report shape"]),
        say("Loaded data.csv, shape is (120, 4)"),
        accept(),
        say("I loaded data.csv with pandas; it has 120 rows and 4 columns."),
        done("Sales are driven by price."),
    ]);
    let mut controller = controller(&provider, settings(), ScriptedInput::default());

    let outcome = controller.run().await.unwrap();

    assert_eq!(outcome.state, RunState::Done);
    assert_eq!(
        outcome.final_summary.as_deref(),
        Some("Sales are driven by price.")
    );
    assert_eq!(
        provider.models(),
        vec![PLANNER, WORKER, REVIEWER, WORKER, PLANNER]
    );

    assert_eq!(outcome.work_summaries.len(), 1);
    let summary = &outcome.work_summaries[0];
    assert_eq!(summary.step, 1);
    assert_eq!(summary.agent, "WorkerAgent1");
    assert_eq!(summary.review_rounds, 1);
    assert_eq!(
        summary.summary,
        "I loaded data.csv with pandas; it has 120 rows and 4 columns."
    );

    // The planner was re-queried with exactly one new user turn: the summary
    let requests = provider.requests();
    let replan = &requests[4].messages;
    assert_eq!(replan.len(), requests[0].messages.len() + 2);
    let last = replan.last().unwrap();
    assert_eq!(last.role, MessageRole::User);
    assert_eq!(
        last.text(),
        "WorkerAgent1 did the following work: I loaded data.csv with pandas; it has 120 rows and 4 columns."
    );
    let user_turns = replan.iter().filter(|m| m.role == MessageRole::User).count();
    assert_eq!(user_turns, 2);
}

#[tokio::test]
async fn test_agents_are_seeded_with_brief_step_and_work() {
    let provider = ScriptedProvider::new(vec![
        plan(&["Load data.csv and report shape"]),
        say("first output"),
        accept(),
        say("final summary"),
        done("done"),
    ]);
    let mut controller = controller(&provider, settings(), ScriptedInput::default());
    controller.run().await.unwrap();

    let requests = provider.requests();
    assert_eq!(requests[0].messages[1].text(), BRIEF);
    assert_eq!(requests[0].schema.as_deref(), Some("PlanningResponse"));

    let worker_seed = requests[1].messages[1].text();
    assert_eq!(
        worker_seed,
        prompts::worker_seed(BRIEF, "", "Load data.csv and report shape")
    );
    assert!(requests[1].schema.is_none());

    let reviewer_seed = requests[2].messages[1].text();
    assert_eq!(
        reviewer_seed,
        prompts::reviewer_seed(BRIEF, "Load data.csv and report shape", "first output")
    );
    assert_eq!(requests[2].schema.as_deref(), Some("ReviewResponse"));

    // Accepted: the worker is asked for its summary
    assert_eq!(
        requests[3].messages.last().unwrap().text(),
        prompts::REVIEW_PASSED
    );
}

// Scenario B: a rejection goes back to the worker, the planner waits
#[tokio::test]
async fn test_rejection_feeds_back_to_worker() {
    let provider = ScriptedProvider::new(vec![
        plan(&["Clean the data"]),
        say("Dropped duplicates"),
        reject("missing null check"),
        say("Added a null check on every column"),
        accept(),
        say("Dropped duplicates and null rows"),
        done("done"),
    ]);
    let mut controller = controller(&provider, settings(), ScriptedInput::default());

    let outcome = controller.run().await.unwrap();

    assert_eq!(
        provider.models(),
        vec![PLANNER, WORKER, REVIEWER, WORKER, REVIEWER, WORKER, PLANNER]
    );

    let requests = provider.requests();
    let revision = requests[3].messages.last().unwrap();
    assert_eq!(revision.role, MessageRole::User);
    assert!(revision.text().contains("missing null check"));

    let re_review = requests[4].messages.last().unwrap();
    assert_eq!(
        re_review.text(),
        prompts::worker_changes("Added a null check on every column")
    );

    assert_eq!(outcome.work_summaries[0].review_rounds, 2);
}

// Scenario C: the user answers "exit"
#[tokio::test]
async fn test_exit_answer_aborts_without_backend_calls() {
    let provider = ScriptedProvider::new(vec![
        question("Which column holds the sales figures?"),
        done("should never be requested"),
    ]);
    let mut controller = controller(&provider, settings(), ScriptedInput::new(["exit\n"]));

    let outcome = controller.run().await.unwrap();

    assert_eq!(outcome.state, RunState::Aborted);
    assert!(outcome.final_summary.is_none());
    assert!(outcome.work_summaries.is_empty());
    assert_eq!(provider.request_count(), 1);
    assert_eq!(
        controller.input().questions(),
        ["Which column holds the sales figures?"]
    );
}

#[tokio::test]
async fn test_closed_input_aborts() {
    let provider = ScriptedProvider::new(vec![question("Anything else?")]);
    let mut controller = controller(&provider, settings(), ScriptedInput::default());

    let outcome = controller.run().await.unwrap();
    assert_eq!(outcome.state, RunState::Aborted);
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn test_answer_is_sent_to_planner() {
    let provider = ScriptedProvider::new(vec![
        question("Which column holds the sales figures?"),
        done("Used the revenue column"),
    ]);
    let mut controller = controller(&provider, settings(), ScriptedInput::new(["revenue"]));

    let outcome = controller.run().await.unwrap();

    assert_eq!(outcome.state, RunState::Done);
    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    let answer = requests[1].messages.last().unwrap();
    assert_eq!(answer.role, MessageRole::User);
    assert_eq!(answer.text(), "revenue");
}

#[tokio::test]
async fn test_steps_are_numbered_across_the_run() {
    let provider = ScriptedProvider::new(vec![
        plan(&["Load the data", "Plot it"]),
        say("loaded"),
        accept(),
        say("loaded summary"),
        plan(&["Plot it"]),
        say("plotted"),
        accept(),
        say("plotted summary"),
        done("done"),
    ]);
    let mut controller = controller(&provider, settings(), ScriptedInput::default());

    let outcome = controller.run().await.unwrap();

    let agents: Vec<_> = outcome
        .work_summaries
        .iter()
        .map(|s| s.agent.as_str())
        .collect();
    assert_eq!(agents, ["WorkerAgent1", "WorkerAgent2"]);

    // The second worker sees the first step's work
    let requests = provider.requests();
    let second_seed = requests[5].messages[1].text();
    assert!(second_seed.contains("WorkerAgent1 did the following work: loaded summary"));
    assert!(second_seed.contains("Plot it"));
    assert_eq!(
        controller.work_log(),
        "WorkerAgent1 did the following work: loaded summary\nWorkerAgent2 did the following work: plotted summary"
    );
}

#[tokio::test]
async fn test_review_round_limit() {
    let provider = ScriptedProvider::new(vec![
        plan(&["Build a model"]),
        say("model v1"),
        reject("accuracy too low"),
        say("model v2"),
        reject("still too low"),
        say("never requested"),
    ]);
    let mut settings = settings();
    settings.max_review_rounds = 2;
    let mut controller = controller(&provider, settings, ScriptedInput::default());

    let err = controller.run().await.unwrap_err();

    match err {
        EngineError::LimitExceeded {
            agent,
            limit,
            value,
        } => {
            assert_eq!(agent, "ReviewAgent1");
            assert_eq!(limit, "max_review_rounds");
            assert_eq!(value, 2);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(provider.request_count(), 5);
    assert_eq!(
        controller.state(),
        &RunState::ExecutingStep(vec!["Build a model".to_string()])
    );
}

#[tokio::test]
async fn test_empty_plan_is_backend_error() {
    let provider = ScriptedProvider::new(vec![plan(&[])]);
    let mut controller = controller(&provider, settings(), ScriptedInput::default());

    let err = controller.run().await.unwrap_err();
    assert!(matches!(err, EngineError::Backend { ref agent, .. } if agent == "PlanningAgent"));
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn test_worker_backend_error_names_worker() {
    let provider = ScriptedProvider::with_results(vec![
        Ok(plan(&["Load data"])),
        Err(LLMError::Timeout),
    ]);
    let mut controller = controller(&provider, settings(), ScriptedInput::default());

    let err = controller.run().await.unwrap_err();
    assert!(matches!(err, EngineError::Backend { ref agent, .. } if agent == "WorkerAgent1"));
}

#[tokio::test]
async fn test_summary_truncation() {
    let long = "x".repeat(50);
    let provider = ScriptedProvider::new(vec![
        plan(&["Load data"]),
        say("loaded"),
        accept(),
        say(&long),
        done("done"),
    ]);
    let mut settings = settings();
    settings.max_summary_chars = Some(20);
    let mut controller = controller(&provider, settings, ScriptedInput::default());

    let outcome = controller.run().await.unwrap();

    let requests = provider.requests();
    let inserted = requests[4].messages.last().unwrap().text();
    assert!(inserted.ends_with(TRUNCATION_MARKER));
    assert_eq!(inserted.chars().count(), 20 + TRUNCATION_MARKER.chars().count());
    // The recorded summary itself is kept whole
    assert_eq!(outcome.work_summaries[0].summary, long);
}

#[tokio::test]
async fn test_audit_streams_per_agent() {
    let provider = ScriptedProvider::new(vec![
        plan(&["Load data"]),
        say("loaded"),
        accept(),
        say("summary"),
        done("done"),
    ]);
    let audit = Arc::new(MemoryAuditSink::new(1000));
    let sink: Arc<dyn AuditSink> = Arc::clone(&audit) as Arc<dyn AuditSink>;
    let mut controller = PlanningController::new(
        runtime(Arc::clone(&provider), ToolRegistry::empty()),
        sink,
        settings(),
        BRIEF,
        ScriptedInput::default(),
    )
    .unwrap();
    controller.run().await.unwrap();

    assert_eq!(
        audit.agents(),
        vec!["PlanningAgent", "ReviewAgent1", "WorkerAgent1"]
    );
    // system, brief, plan, summary, done
    assert_eq!(audit.entries("PlanningAgent").len(), 5);
    let first: serde_json::Value =
        serde_json::from_str(&audit.entries("PlanningAgent")[0]).unwrap();
    assert_eq!(first["role"], "system");
}

#[tokio::test]
async fn test_notebook_assembler() {
    let provider = ScriptedProvider::new(vec![say("Notebook written to project.ipynb")]);
    let runtime = runtime(Arc::clone(&provider), ToolRegistry::empty());

    let answer = assemble_notebook(
        &runtime,
        Arc::new(NullAuditSink),
        "notebook-model",
        BRIEF,
        "WorkerAgent1 did the following work: loaded",
    )
    .await
    .unwrap();

    assert_eq!(answer, "Notebook written to project.ipynb");
    let request = &provider.requests()[0];
    assert_eq!(request.model, "notebook-model");
    assert_eq!(
        request.messages[1].text(),
        prompts::notebook_seed(BRIEF, "WorkerAgent1 did the following work: loaded")
    );
}
