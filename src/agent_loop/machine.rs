//! Loop steps and the pure transitions between them.
//!
//! `call_model` and `execute_tools` suspend on I/O and live in the runner;
//! every other step is a synchronous function of the state.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::state::AgentState;
use crate::models::ModelChoice;
use crate::router;
use crate::tools::ToolGroup;
use crate::types::Message;

/// Default model-call budget per thread.
pub const MAX_LLM_CALLS: u32 = 6;

pub const NO_MESSAGES: &str = "No messages provided.";
pub const EMPTY_USER_MESSAGE: &str = "Empty user message.";

pub const INVALID_INPUT_REPLY: &str = "Please provide a non-empty question so I can help you.";
pub const FALLBACK_REPLY: &str =
    "I couldn't produce a final answer. Please rephrase your question or provide more details.";

/// Tool-result body for a call outside the active tool set.
pub fn unknown_tool_reply(name: &str) -> String {
    format!("❌ Unknown tool: {name}")
}

/// Tool-result body for a handler that failed or timed out.
pub fn tool_error_reply(name: &str, error: &impl std::fmt::Display) -> String {
    format!("❌ Tool error ({name}): {error}")
}

/// Budget-exhaustion reply for the given limit.
pub fn maxed_out_reply(max_llm_calls: u32) -> String {
    format!(
        "I reached the safety limit of {max_llm_calls} model calls. \
         Please try narrowing your question or being more specific."
    )
}

/// A state of the agent loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LoopStep {
    ValidateInput,
    InvalidInput,
    RouteRequest,
    CallModel,
    ExecuteTools,
    MaxedOut,
    ValidateFinal,
    End,
}

impl LoopStep {
    pub fn is_terminal(self) -> bool {
        self == Self::End
    }
}

/// Normalize the input and fill unset selections.
///
/// Only errors recorded by this pass divert to `invalid_input`; errors from
/// earlier turns stay in the log but do not block.
pub fn validate_input(state: &mut AgentState) -> LoopStep {
    let before = state.errors.len();

    if state.messages.is_empty() {
        state.errors.push(NO_MESSAGES.to_string());
        state.push(Message::user(""));
    }

    let blank = router::latest_user_text(&state.messages).map_or(true, |t| t.trim().is_empty());
    if blank {
        state.errors.push(EMPTY_USER_MESSAGE.to_string());
    }

    if state.selected_model.is_none() {
        state.selected_model = Some(ModelChoice::Default);
    }
    if state.selected_tools.is_empty() {
        state.selected_tools = ToolGroup::General.tool_names();
    }

    if state.errors.len() > before {
        LoopStep::InvalidInput
    } else {
        LoopStep::RouteRequest
    }
}

pub fn invalid_input(state: &mut AgentState) -> LoopStep {
    state.push(Message::assistant(INVALID_INPUT_REPLY));
    LoopStep::ValidateFinal
}

pub fn route_request(state: &mut AgentState) -> LoopStep {
    let route = router::route(&state.messages);
    state.selected_model = Some(route.model);
    state.selected_tools = route.group.tool_names();
    LoopStep::CallModel
}

/// Decide where to go after a model call.
pub fn next_step(state: &AgentState, max_llm_calls: u32) -> LoopStep {
    let wants_tools = state.last_message().is_some_and(Message::has_tool_calls);
    if wants_tools && state.llm_calls >= max_llm_calls {
        LoopStep::MaxedOut
    } else if wants_tools {
        LoopStep::ExecuteTools
    } else {
        LoopStep::ValidateFinal
    }
}

pub fn maxed_out(state: &mut AgentState, max_llm_calls: u32) -> LoopStep {
    state.push(Message::assistant(maxed_out_reply(max_llm_calls)));
    LoopStep::ValidateFinal
}

/// Guarantee the turn ends on a printable answer.
pub fn validate_final(state: &mut AgentState) -> LoopStep {
    if state.final_answer().is_none() {
        state.push(Message::assistant(FALLBACK_REPLY));
    }
    LoopStep::End
}
