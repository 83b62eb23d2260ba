//! Shared test utilities: a scripted provider and loop/service builders.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use switchyard::agent_loop::{AgentLoop, ModelAdapter};
use switchyard::checkpoint::{CheckpointStore, MemoryCheckpointStore};
use switchyard::error::SwitchyardError;
use switchyard::models::ModelChoice;
use switchyard::provider::{ModelProvider, ProviderRequest, ProviderResponse, ProviderSet};
use switchyard::service::ChatService;
use switchyard::tools::{ToolBackends, ToolRegistry};
use switchyard::types::{FinishReason, ToolCall, Usage};
use switchyard::util::retry::RetryPolicy;

/// Provider that replays queued results and records every request.
///
/// An empty queue answers with "Mock response".
pub struct MockProvider {
    model_id: String,
    responses: Mutex<Vec<Result<ProviderResponse, SwitchyardError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl MockProvider {
    pub fn new(model_id: &str) -> Self {
        Self {
            model_id: model_id.to_string(),
            responses: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a plain text answer.
    pub fn queue_text(&self, text: &str) {
        self.responses.lock().unwrap().push(Ok(ProviderResponse {
            text: text.to_string(),
            usage: Usage {
                input_tokens: 10,
                output_tokens: 20,
                total_tokens: 30,
            },
            tool_calls: vec![],
            finish_reason: Some(FinishReason::Stop),
        }));
    }

    /// Queue a single tool call.
    pub fn queue_tool_call(&self, id: &str, name: &str, args: Value) {
        self.queue_tool_calls(vec![ToolCall::new(id, name, args)]);
    }

    /// Queue several tool calls in one assistant turn.
    pub fn queue_tool_calls(&self, calls: Vec<ToolCall>) {
        self.responses.lock().unwrap().push(Ok(ProviderResponse {
            text: String::new(),
            usage: Usage {
                input_tokens: 10,
                output_tokens: 5,
                total_tokens: 15,
            },
            tool_calls: calls,
            finish_reason: Some(FinishReason::ToolCalls),
        }));
    }

    pub fn queue_error(&self, error: SwitchyardError) {
        self.responses.lock().unwrap().push(Err(error));
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate_text(&self, request: &ProviderRequest) -> Result<ProviderResponse, SwitchyardError> {
        self.requests.lock().unwrap().push(request.clone());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Ok(ProviderResponse {
                text: "Mock response".to_string(),
                usage: Usage::default(),
                tool_calls: vec![],
                finish_reason: Some(FinishReason::Stop),
            });
        }
        responses.remove(0)
    }
}

/// One mock per model slot.
pub struct Mocks {
    pub default: Arc<MockProvider>,
    pub openai: Arc<MockProvider>,
    pub anthropic: Arc<MockProvider>,
}

impl Mocks {
    pub fn new() -> Self {
        Self {
            default: Arc::new(MockProvider::new("mock-default")),
            openai: Arc::new(MockProvider::new("mock-openai")),
            anthropic: Arc::new(MockProvider::new("mock-anthropic")),
        }
    }

    pub fn provider_set(&self) -> ProviderSet {
        ProviderSet::new()
            .with(ModelChoice::Default, self.default.clone())
            .with(ModelChoice::OpenAi, self.openai.clone())
            .with(ModelChoice::Anthropic, self.anthropic.clone())
    }
}

/// Retries without real sleeps.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::builder()
        .max_retries(2)
        .initial_delay(Duration::from_millis(1))
        .max_delay(Duration::from_millis(1))
        .build()
}

pub fn adapter(mocks: &Mocks, backends: ToolBackends) -> Arc<ModelAdapter> {
    let registry = Arc::new(ToolRegistry::new(backends));
    Arc::new(ModelAdapter::new(mocks.provider_set(), registry).with_retry(fast_retry()))
}

pub fn agent_loop(mocks: &Mocks) -> (AgentLoop, Arc<MemoryCheckpointStore>) {
    agent_loop_with(mocks, ToolBackends::default())
}

pub fn agent_loop_with(mocks: &Mocks, backends: ToolBackends) -> (AgentLoop, Arc<MemoryCheckpointStore>) {
    let store = Arc::new(MemoryCheckpointStore::new());
    let dyn_store: Arc<dyn CheckpointStore> = store.clone();
    (AgentLoop::new(adapter(mocks, backends), dyn_store), store)
}

pub fn chat_service(mocks: &Mocks) -> ChatService {
    let (agent, _) = agent_loop(mocks);
    ChatService::new(agent)
}
