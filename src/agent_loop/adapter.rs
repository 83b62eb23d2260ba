//! Model invocation: one assistant message per `call_model` step.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::Result;
use crate::models::ModelChoice;
use crate::prompt::PromptTemplates;
use crate::provider::{ProviderRequest, ProviderResponse, ProviderSet};
use crate::tools::ToolRegistry;
use crate::types::{FinishReason, GenerationSettings, Message, Role, Usage};
use crate::util::retry::RetryPolicy;

/// Assistant text used when every attempt at a model call failed.
pub fn model_failure_reply(error: &impl std::fmt::Display) -> String {
    format!("I encountered an error calling the model: {error}. Please try again.")
}

/// One model step: the assistant message plus what the provider reported.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelReply {
    pub message: Message,
    pub usage: Usage,
    pub finish_reason: Option<FinishReason>,
}

/// Binds prompts and tools to a provider call and retries transient failures.
#[derive(Debug, Clone)]
pub struct ModelAdapter {
    providers: ProviderSet,
    registry: Arc<ToolRegistry>,
    prompts: PromptTemplates,
    retry: RetryPolicy,
    settings: GenerationSettings,
}

impl ModelAdapter {
    pub fn new(providers: ProviderSet, registry: Arc<ToolRegistry>) -> Self {
        Self {
            providers,
            registry,
            prompts: PromptTemplates::default(),
            retry: RetryPolicy::default(),
            settings: GenerationSettings::default(),
        }
    }

    /// Providers, generation settings and model deadline from config.
    pub fn from_config(config: &AppConfig, registry: Arc<ToolRegistry>) -> Self {
        let settings = config.settings();
        let retry = RetryPolicy::builder()
            .maybe_deadline(settings.model_deadline_secs.map(Duration::from_secs))
            .build();
        Self::new(ProviderSet::from_config(config), registry)
            .with_retry(retry)
            .with_settings(
                GenerationSettings::builder()
                    .max_tokens(settings.max_tokens)
                    .temperature(settings.temperature)
                    .build(),
            )
    }

    pub fn with_prompts(mut self, prompts: PromptTemplates) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn providers(&self) -> &ProviderSet {
        &self.providers
    }

    /// Ask the model for the next assistant message.
    ///
    /// Provider failures, after retries, come back as an assistant message
    /// describing the failure. Only a missing provider is an error.
    pub async fn call(
        &self,
        model: ModelChoice,
        tools: &BTreeSet<String>,
        messages: &[Message],
    ) -> Result<ModelReply> {
        let provider = self.providers.get(model)?;
        let request = self.build_request(tools, messages);

        debug!(
            provider = provider.provider_name(),
            model = provider.model_id(),
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "calling model"
        );

        let request = &request;
        let result = self
            .retry
            .execute(move || {
                let provider = Arc::clone(&provider);
                async move { provider.generate_text(request).await }
            })
            .await;

        match result {
            Ok(response) => {
                debug!(
                    model = %model,
                    finish_reason = ?response.finish_reason,
                    total_tokens = response.usage.total_tokens,
                    "model replied"
                );
                if response.finish_reason == Some(FinishReason::Length) {
                    warn!(model = %model, "reply cut off at the token limit");
                }
                let usage = response.usage.clone();
                let finish_reason = response.finish_reason;
                Ok(ModelReply {
                    message: into_message(response),
                    usage,
                    finish_reason,
                })
            }
            Err(e) => {
                warn!(model = %model, error = %e, "model call failed");
                Ok(ModelReply {
                    message: Message::assistant(model_failure_reply(&e)),
                    usage: Usage::default(),
                    finish_reason: Some(FinishReason::Error),
                })
            }
        }
    }

    /// System prompt first, then the conversation without stored system turns.
    ///
    /// Tool calls that never received a result (a turn that hit the budget)
    /// are left out of the outgoing copy; providers reject them.
    pub fn build_request(&self, tools: &BTreeSet<String>, messages: &[Message]) -> ProviderRequest {
        let answered: HashSet<&str> = messages
            .iter()
            .filter(|m| m.role == Role::Tool)
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();

        let mut outgoing = Vec::with_capacity(messages.len() + 1);
        outgoing.push(Message::system(self.prompts.select(tools)));
        for message in messages.iter().filter(|m| m.role != Role::System) {
            if !message.has_tool_calls() {
                outgoing.push(message.clone());
                continue;
            }
            let mut message = message.clone();
            message.tool_calls.retain(|call| answered.contains(call.call_id.as_str()));
            if message.has_tool_calls() || !message.text.trim().is_empty() {
                outgoing.push(message);
            }
        }

        let definitions = self.registry.definitions(tools);
        ProviderRequest {
            messages: outgoing,
            settings: self.settings.clone(),
            tools: (!definitions.is_empty()).then_some(definitions),
        }
    }
}

fn into_message(response: ProviderResponse) -> Message {
    if response.tool_calls.is_empty() {
        return Message::assistant(response.text);
    }
    let calls = response
        .tool_calls
        .into_iter()
        .map(|mut call| {
            if call.call_id.is_empty() {
                call.call_id = format!("call_{}", Uuid::new_v4().simple());
            }
            call
        })
        .collect();
    Message::assistant_with_tool_calls(response.text, calls)
}
