//! Conversation State
//!
//! Append-only, ordered log of turns owned by a single agent. The log is
//! seeded with exactly one system turn and only grows. Besides the turns it
//! tracks the ids of tool calls the last assistant turn requested and that
//! have not been answered yet; a `tool` turn must answer one of those ids.
//!
//! Each append is mirrored to the injected audit sink. The mirror is
//! truncated and never read back: `snapshot()` is the only source of truth
//! for what the model sees next.

use std::sync::Arc;

use sdk::errors::EngineError;

use crate::audit::AuditSink;
use crate::llm::{Message, MessageRole};

/// Average characters per token, used for log-only size estimates
const CHARS_PER_TOKEN: usize = 4;

/// Conversation history of one agent
pub struct ConversationState {
    /// Name of the owning agent, also the audit stream key
    agent: String,

    /// All turns, in insertion order
    messages: Vec<Message>,

    /// Tool call ids requested but not yet answered
    pending: Vec<String>,

    /// Audit mirror
    audit: Arc<dyn AuditSink>,
}

impl ConversationState {
    /// Create a conversation seeded with the system prompt
    pub fn new(
        agent: impl Into<String>,
        system_prompt: impl Into<String>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let agent = agent.into();
        let seed = Message::system(system_prompt);
        audit.record(&agent, &seed);
        Self {
            agent,
            messages: vec![seed],
            pending: Vec::new(),
            audit,
        }
    }

    /// Append a turn.
    ///
    /// Rejects a `tool` turn that does not answer a pending call, and an
    /// `assistant` turn while calls from the previous one are unanswered.
    pub fn append(&mut self, message: Message) -> Result<(), EngineError> {
        match message.role {
            MessageRole::Tool => {
                let id = message.tool_call_id.as_deref().ok_or_else(|| {
                    EngineError::ProtocolViolation(format!(
                        "{}: tool turn without a tool call id",
                        self.agent
                    ))
                })?;
                let position = self.pending.iter().position(|p| p == id).ok_or_else(|| {
                    EngineError::ProtocolViolation(format!(
                        "{}: tool result for call '{}' which is not pending",
                        self.agent, id
                    ))
                })?;
                self.pending.remove(position);
            }
            MessageRole::Assistant => {
                self.ensure_resolved()?;
                self.pending
                    .extend(message.tool_calls.iter().map(|call| call.id.clone()));
            }
            MessageRole::User | MessageRole::System => {}
        }

        self.audit.record(&self.agent, &message);
        self.messages.push(message);
        Ok(())
    }

    /// Append a `user` turn with plain text
    pub fn append_user(&mut self, content: impl Into<String>) -> Result<(), EngineError> {
        self.append(Message::user(content))
    }

    /// All turns, in insertion order, system seed included
    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    /// Number of turns
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always false: the system seed is present from construction
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Most recent turn
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Ids of tool calls still waiting for a result
    pub fn pending_calls(&self) -> &[String] {
        &self.pending
    }

    /// Fails if any tool call is still waiting for a result
    pub fn ensure_resolved(&self) -> Result<(), EngineError> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(EngineError::ProtocolViolation(format!(
                "{}: unresolved tool calls {:?}",
                self.agent, self.pending
            )))
        }
    }

    /// Name of the owning agent
    pub fn agent(&self) -> &str {
        &self.agent
    }

    /// Rough token count of the whole conversation, for logging
    pub fn token_estimate(&self) -> usize {
        self.messages.iter().map(Self::estimate_tokens).sum()
    }

    fn estimate_tokens(message: &Message) -> usize {
        let content_chars = message.text().len();
        let call_chars: usize = message
            .tool_calls
            .iter()
            .map(|call| call.name.len() + call.arguments.len())
            .sum();

        // Roughly 10 tokens of role and structure overhead
        (content_chars + call_chars).div_ceil(CHARS_PER_TOKEN) + 10
    }
}

impl std::fmt::Debug for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationState")
            .field("agent", &self.agent)
            .field("turns", &self.messages.len())
            .field("pending", &self.pending)
            .finish()
    }
}
