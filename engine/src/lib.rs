//! Lumen Engine Library
//!
//! This library provides the core functionality of the Lumen engine:
//! agents, their tools, and the planning loop that coordinates them.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// Workspace confinement for file tools
pub mod fs_guard;

/// Completion backend abstraction layer
pub mod llm;

/// Per-agent conversation audit log
pub mod audit;

/// Agents and the query/tool loop
pub mod agent;

/// Planning, review and run orchestration
pub mod conductor;

/// Built-in capabilities
pub mod tools;

/// Answers to the planner's questions
pub mod input;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
