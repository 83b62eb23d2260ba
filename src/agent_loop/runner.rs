//! Trampoline driving the loop from `validate_input` to `end`.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::adapter::ModelAdapter;
use super::events::{LoopEventEmitter, LoopEventPayload, LoopEventSink};
use super::machine::{self, LoopStep, MAX_LLM_CALLS};
use super::state::AgentState;
use crate::checkpoint::{new_thread_id, CheckpointStore};
use crate::config::AppConfig;
use crate::error::Result;
use crate::types::Message;

/// Runs turns of the agent loop, checkpointing after every transition.
///
/// Cheap to clone; share one per process.
#[derive(Clone)]
pub struct AgentLoop {
    adapter: Arc<ModelAdapter>,
    store: Arc<dyn CheckpointStore>,
    max_llm_calls: u32,
}

impl std::fmt::Debug for AgentLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentLoop")
            .field("adapter", &self.adapter)
            .field("max_llm_calls", &self.max_llm_calls)
            .finish_non_exhaustive()
    }
}

impl AgentLoop {
    pub fn new(adapter: Arc<ModelAdapter>, store: Arc<dyn CheckpointStore>) -> Self {
        Self {
            adapter,
            store,
            max_llm_calls: MAX_LLM_CALLS,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        adapter: Arc<ModelAdapter>,
        store: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self::new(adapter, store).with_max_llm_calls(config.settings().max_llm_calls)
    }

    /// Model-call budget per thread.
    pub fn with_max_llm_calls(mut self, max_llm_calls: u32) -> Self {
        self.max_llm_calls = max_llm_calls;
        self
    }

    pub fn max_llm_calls(&self) -> u32 {
        self.max_llm_calls
    }

    pub fn store(&self) -> &Arc<dyn CheckpointStore> {
        &self.store
    }

    pub fn adapter(&self) -> &ModelAdapter {
        &self.adapter
    }

    /// State for the next turn: a resumed thread or a fresh one, with the
    /// user message appended.
    ///
    /// Resuming a thread with no checkpoint is `ThreadNotFound`.
    pub async fn prepare(&self, thread_id: Option<&str>, text: &str) -> Result<AgentState> {
        let mut state = match thread_id {
            Some(id) => self.store.load_state(id).await?,
            None => AgentState::new(new_thread_id()),
        };
        state.push(Message::user(text));
        Ok(state)
    }

    /// Prepare and run one turn.
    pub async fn run_turn(
        &self,
        thread_id: Option<&str>,
        text: &str,
        sink: Option<LoopEventSink>,
    ) -> Result<AgentState> {
        let state = self.prepare(thread_id, text).await?;
        self.run(state, sink).await
    }

    /// Drive the state machine to `end`.
    ///
    /// Returns `Err` only for infrastructure failures (storage, missing
    /// provider); everything else ends as an assistant message.
    pub async fn run(&self, mut state: AgentState, sink: Option<LoopEventSink>) -> Result<AgentState> {
        let emitter = LoopEventEmitter::new(state.thread_id.clone(), sink);
        let mut step = LoopStep::ValidateInput;
        self.checkpoint(step, &state, &emitter).await?;

        while !step.is_terminal() {
            emitter.emit(state.llm_calls, LoopEventPayload::StepEntered { step });
            let appended_from = state.messages.len();

            let next = self.advance(step, &mut state).await?;
            debug!(thread_id = %state.thread_id, %step, %next, llm_calls = state.llm_calls, "transition");

            for message in &state.messages[appended_from..] {
                emitter.emit(
                    state.llm_calls,
                    LoopEventPayload::MessageAppended {
                        message: message.clone(),
                    },
                );
            }
            step = next;
            self.checkpoint(step, &state, &emitter).await?;
        }

        info!(
            thread_id = %state.thread_id,
            llm_calls = state.llm_calls,
            messages = state.messages.len(),
            "turn complete"
        );
        Ok(state)
    }

    async fn advance(&self, step: LoopStep, state: &mut AgentState) -> Result<LoopStep> {
        let next = match step {
            LoopStep::ValidateInput => machine::validate_input(state),
            LoopStep::InvalidInput => machine::invalid_input(state),
            LoopStep::RouteRequest => machine::route_request(state),
            LoopStep::CallModel => self.call_model(state).await?,
            LoopStep::ExecuteTools => self.execute_tools(state).await,
            LoopStep::MaxedOut => machine::maxed_out(state, self.max_llm_calls),
            LoopStep::ValidateFinal => machine::validate_final(state),
            LoopStep::End => LoopStep::End,
        };
        Ok(next)
    }

    async fn call_model(&self, state: &mut AgentState) -> Result<LoopStep> {
        let model = state.selected_model.unwrap_or_default();
        let reply = self
            .adapter
            .call(model, &state.selected_tools, &state.messages)
            .await?;
        state.llm_calls += 1;
        state.usage.merge(&reply.usage);
        state.push(reply.message);
        Ok(machine::next_step(state, self.max_llm_calls))
    }

    /// Run the pending calls in order; every call gets exactly one result.
    async fn execute_tools(&self, state: &mut AgentState) -> LoopStep {
        let calls = state
            .last_message()
            .map(|m| m.tool_calls.clone())
            .unwrap_or_default();
        let registry = self.adapter.registry();

        for call in calls {
            let known = state.selected_tools.contains(&call.name) && registry.spec(&call.name).is_some();
            let body = if !known {
                warn!(thread_id = %state.thread_id, tool = %call.name, "unknown tool requested");
                machine::unknown_tool_reply(&call.name)
            } else {
                match registry.invoke(&call.name, &call.arguments).await {
                    Ok(output) => output,
                    Err(e) => {
                        warn!(thread_id = %state.thread_id, tool = %call.name, error = %e, "tool failed");
                        machine::tool_error_reply(&call.name, &e)
                    }
                }
            };
            state.push(Message::tool_result(call.call_id, call.name, body));
        }

        LoopStep::CallModel
    }

    async fn checkpoint(&self, step: LoopStep, state: &AgentState, emitter: &LoopEventEmitter) -> Result<()> {
        let checkpoint = self.store.put(step, state).await?;
        emitter.emit(
            state.llm_calls,
            LoopEventPayload::Checkpointed {
                checkpoint_id: checkpoint.checkpoint_id,
                seq: checkpoint.seq,
            },
        );
        Ok(())
    }
}
