//! Request surface: chat, streaming chat, history and checkpoint replay.

use std::sync::Arc;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::agent_loop::{AgentLoop, AgentState, LoopEvent, LoopEventPayload, LoopEventSink, ModelAdapter};
use crate::checkpoint::{new_thread_id, Checkpoint, CheckpointStore, FileCheckpointStore};
use crate::config::AppConfig;
use crate::error::{Result, SwitchyardError};
use crate::tools::ToolRegistry;
use crate::types::{HistoryEntry, Message, Role, Usage};
use crate::util::text::truncate_with_ellipsis;
use crate::validation::{self, DEFAULT_MAX_MESSAGE_CHARS};

/// Tool results in streamed events are cut to this many characters.
pub const STREAM_TOOL_RESULT_CHARS: usize = 300;

pub const NO_RESPONSE: &str = "No response generated.";

/// Result of a completed `chat` turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub thread_id: String,
    pub model_used: String,
    pub llm_calls: u32,
    pub tools_used: Vec<String>,
    /// Tokens spent on this thread so far.
    #[serde(default)]
    pub usage: Usage,
}

impl ChatResponse {
    fn from_state(state: &AgentState) -> Self {
        let response = state
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant && !m.has_tool_calls())
            .map_or_else(|| NO_RESPONSE.to_string(), |m| m.text.clone());
        Self {
            response,
            thread_id: state.thread_id.clone(),
            model_used: state.selected_model.unwrap_or_default().display_name().to_string(),
            llm_calls: state.llm_calls,
            tools_used: state.tools_used(),
            usage: state.usage.clone(),
        }
    }
}

/// One streamed chat event.
///
/// A stream starts with `thread_id` and ends with exactly one of `complete`
/// or `error`, the only events with `done = true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    ThreadId {
        thread_id: String,
        done: bool,
    },
    ToolCall {
        tool_name: String,
        tool_args: serde_json::Value,
        done: bool,
    },
    ToolResult {
        tool_name: String,
        content: String,
        done: bool,
    },
    Response {
        content: String,
        done: bool,
    },
    Complete {
        thread_id: String,
        llm_calls: u32,
        done: bool,
    },
    Error {
        error: String,
        done: bool,
    },
}

impl ChatEvent {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }

    /// Client-visible events for one loop event.
    fn from_loop_event(event: &LoopEvent) -> Vec<ChatEvent> {
        let LoopEventPayload::MessageAppended { message } = &event.payload else {
            return Vec::new();
        };
        match message.role {
            Role::Assistant if message.has_tool_calls() => message
                .tool_calls
                .iter()
                .map(|call| ChatEvent::ToolCall {
                    tool_name: call.name.clone(),
                    tool_args: call.arguments.clone(),
                    done: false,
                })
                .collect(),
            Role::Assistant if !message.text.trim().is_empty() => vec![ChatEvent::Response {
                content: message.text.clone(),
                done: false,
            }],
            Role::Tool => vec![ChatEvent::ToolResult {
                tool_name: message.tool_name.clone().unwrap_or_default(),
                content: truncate_with_ellipsis(&message.text, STREAM_TOOL_RESULT_CHARS),
                done: false,
            }],
            _ => Vec::new(),
        }
    }
}

/// Entry point for chat requests; validates input and drives the loop.
#[derive(Debug, Clone)]
pub struct ChatService {
    agent: AgentLoop,
    max_message_chars: usize,
}

impl ChatService {
    pub fn new(agent: AgentLoop) -> Self {
        Self {
            agent,
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
        }
    }

    /// Wire providers, tools and the file checkpoint store from config.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let store: Arc<dyn CheckpointStore> = Arc::new(FileCheckpointStore::from_config(config));
        Self::with_store(config, store)
    }

    /// Like [`ChatService::from_config`] with a caller-supplied store.
    pub fn with_store(config: &AppConfig, store: Arc<dyn CheckpointStore>) -> Result<Self> {
        let registry = Arc::new(ToolRegistry::from_config(config)?);
        let adapter = Arc::new(ModelAdapter::from_config(config, registry));
        let agent = AgentLoop::from_config(config, adapter, store);
        Ok(Self::new(agent).with_max_message_chars(config.settings().max_message_chars))
    }

    pub fn with_max_message_chars(mut self, max_message_chars: usize) -> Self {
        self.max_message_chars = max_message_chars;
        self
    }

    pub fn agent(&self) -> &AgentLoop {
        &self.agent
    }

    fn store(&self) -> &Arc<dyn CheckpointStore> {
        self.agent.store()
    }

    /// Run one turn to completion.
    pub async fn chat(&self, message: &str, thread_id: Option<&str>) -> Result<ChatResponse> {
        let (message, thread_id) =
            validation::validate_chat_request(message, thread_id, self.max_message_chars)?;
        let state = self.agent.run_turn(thread_id.as_deref(), &message, None).await?;
        let response = ChatResponse::from_state(&state);
        info!(
            thread_id = %response.thread_id,
            model = %response.model_used,
            llm_calls = response.llm_calls,
            "chat complete"
        );
        Ok(response)
    }

    /// Run one turn, streaming events as the loop makes progress.
    ///
    /// Invalid input is rejected up front; everything after that, including
    /// an unknown thread id, arrives as a terminal `error` event.
    pub fn chat_stream(
        &self,
        message: &str,
        thread_id: Option<&str>,
    ) -> Result<BoxStream<'static, ChatEvent>> {
        let (message, resume) =
            validation::validate_chat_request(message, thread_id, self.max_message_chars)?;
        let thread_id = resume.clone().unwrap_or_else(new_thread_id);

        let (tx, mut rx) = mpsc::unbounded_channel::<ChatEvent>();
        let sink_tx = tx.clone();
        let sink: LoopEventSink = Arc::new(move |event: LoopEvent| {
            for chat_event in ChatEvent::from_loop_event(&event) {
                let _ = sink_tx.send(chat_event);
            }
        });

        let agent = self.agent.clone();
        let run_thread_id = thread_id.clone();
        tokio::spawn(async move {
            let prepared = match resume {
                Some(id) => agent.prepare(Some(&id), &message).await,
                None => {
                    let mut state = AgentState::new(run_thread_id.clone());
                    state.push(Message::user(message));
                    Ok(state)
                }
            };
            let outcome = match prepared {
                Ok(state) => agent.run(state, Some(sink)).await,
                Err(e) => Err(e),
            };
            let last = match outcome {
                Ok(state) => ChatEvent::Complete {
                    thread_id: run_thread_id,
                    llm_calls: state.llm_calls,
                    done: true,
                },
                Err(e) => {
                    warn!(thread_id = %run_thread_id, error = %e, "streamed chat failed");
                    ChatEvent::Error {
                        error: e.to_string(),
                        done: true,
                    }
                }
            };
            let _ = tx.send(last);
        });

        let stream = async_stream::stream! {
            yield ChatEvent::ThreadId { thread_id, done: false };
            while let Some(event) = rx.recv().await {
                let done = event.is_done();
                yield event;
                if done {
                    break;
                }
            }
        };
        Ok(Box::pin(stream))
    }

    /// User and assistant turns of a thread, oldest first.
    pub async fn get_history(&self, thread_id: &str) -> Result<Vec<HistoryEntry>> {
        let thread_id = validation::validate_thread_id(thread_id)?;
        let state = self.store().load_state(&thread_id).await?;
        Ok(state.messages.iter().filter_map(HistoryEntry::from_message).collect())
    }

    /// Drop all persisted state of a thread; returns whether it existed.
    pub async fn delete_history(&self, thread_id: &str) -> Result<bool> {
        let thread_id = validation::validate_thread_id(thread_id)?;
        let existed = self.store().delete(&thread_id).await?;
        info!(thread_id = %thread_id, existed, "deleted thread");
        Ok(existed)
    }

    /// Every checkpoint of a thread, oldest first.
    pub async fn list_checkpoints(&self, thread_id: &str) -> Result<Vec<Checkpoint>> {
        let thread_id = validation::validate_thread_id(thread_id)?;
        let checkpoints = self.store().list(&thread_id).await?;
        if checkpoints.is_empty() {
            return Err(SwitchyardError::ThreadNotFound(thread_id));
        }
        Ok(checkpoints)
    }

    pub async fn get_checkpoint(&self, thread_id: &str, checkpoint_id: Uuid) -> Result<Option<Checkpoint>> {
        let thread_id = validation::validate_thread_id(thread_id)?;
        self.store().get(&thread_id, checkpoint_id).await
    }
}
