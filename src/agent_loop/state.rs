//! Per-thread loop state.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::ModelChoice;
use crate::types::{Message, Role, Usage};

/// Everything the loop needs to resume a thread.
///
/// `messages` is append-only and `llm_calls` only ever grows, including
/// across turns of the same thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub thread_id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_model: Option<ModelChoice>,
    #[serde(default)]
    pub selected_tools: BTreeSet<String>,
    #[serde(default)]
    pub llm_calls: u32,
    #[serde(default)]
    pub errors: Vec<String>,
    /// Token usage summed over every model call on this thread.
    #[serde(default)]
    pub usage: Usage,
}

impl AgentState {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            messages: Vec::new(),
            selected_model: None,
            selected_tools: BTreeSet::new(),
            llm_calls: 0,
            errors: Vec::new(),
            usage: Usage::default(),
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Index of the most recent user message, or 0 when there is none.
    pub fn turn_start(&self) -> usize {
        self.messages
            .iter()
            .rposition(|m| m.role == Role::User)
            .unwrap_or(0)
    }

    /// Messages belonging to the current turn, starting at its user message.
    pub fn current_turn(&self) -> &[Message] {
        &self.messages[self.turn_start()..]
    }

    /// Most recent final answer in the current turn.
    pub fn final_answer(&self) -> Option<&Message> {
        self.current_turn().iter().rev().find(|m| m.is_final_answer())
    }

    /// Distinct tool names that produced results this turn, in first-use order.
    pub fn tools_used(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for name in self
            .current_turn()
            .iter()
            .filter(|m| m.role == Role::Tool)
            .filter_map(|m| m.tool_name.as_deref())
        {
            if !seen.iter().any(|s: &String| s == name) {
                seen.push(name.to_string());
            }
        }
        seen
    }
}
