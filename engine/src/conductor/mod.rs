//! Conductor System
//!
//! Orchestrates a run: planning, step execution through the review loop,
//! and termination.

pub mod notebook;
pub mod planner;
pub mod review;
pub mod types;

pub use notebook::assemble_notebook;
pub use planner::{truncate_summary, ControllerSettings, PlanningController, TRUNCATION_MARKER};
pub use review::{ReviewLoop, StepInput, DEFAULT_MAX_REVIEW_ROUNDS};
pub use types::{PlanningDecision, ReviewVerdict, RunOutcome, RunState, WorkSummary};
