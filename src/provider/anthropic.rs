//! Anthropic Messages API provider.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::SwitchyardError;
use crate::types::*;

use super::http::{anthropic_headers, endpoint, shared_client, status_to_error};
use super::{ModelProvider, ProviderRequest, ProviderResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

pub struct AnthropicProvider {
    model_id: String,
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(model_id: impl Into<String>, api_key: String, base_url: Option<String>) -> Self {
        Self {
            model_id: model_id.into(),
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    pub(crate) fn build_request_body(&self, request: &ProviderRequest) -> Value {
        let mut system_parts = Vec::new();
        let mut messages: Vec<Value> = Vec::new();

        for msg in &request.messages {
            match msg.role {
                Role::System => system_parts.push(msg.text.clone()),
                Role::User => messages.push(json!({ "role": "user", "content": msg.text })),
                Role::Assistant => {
                    let mut content: Vec<Value> = Vec::new();
                    if !msg.text.is_empty() {
                        content.push(json!({ "type": "text", "text": msg.text }));
                    }
                    for tc in &msg.tool_calls {
                        content.push(json!({
                            "type": "tool_use",
                            "id": tc.call_id,
                            "name": tc.name,
                            "input": tc.arguments,
                        }));
                    }
                    if !content.is_empty() {
                        messages.push(json!({ "role": "assistant", "content": content }));
                    }
                }
                Role::Tool => {
                    let block = json!({
                        "type": "tool_result",
                        "tool_use_id": msg.tool_call_id.clone().unwrap_or_default(),
                        "content": msg.text,
                        "is_error": msg.text.starts_with('❌'),
                    });
                    // Results for one batch of calls share a single user turn.
                    match messages.last_mut() {
                        Some(last) if is_tool_result_turn(last) => {
                            if let Some(blocks) = last["content"].as_array_mut() {
                                blocks.push(block);
                            }
                        }
                        _ => messages.push(json!({ "role": "user", "content": [block] })),
                    }
                }
            }
        }

        let mut body = json!({
            "model": self.model_id,
            "messages": messages,
            "max_tokens": request.settings.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });

        if let Some(obj) = body.as_object_mut() {
            if !system_parts.is_empty() {
                obj.insert("system".into(), system_parts.join("\n").into());
            }
            if let Some(temp) = request.settings.temperature {
                obj.insert("temperature".into(), temp.into());
            }
            if let Some(ref tools) = request.tools {
                if !tools.is_empty() {
                    let defs: Vec<Value> = tools
                        .iter()
                        .map(|t| {
                            json!({
                                "name": t.name,
                                "description": t.description,
                                "input_schema": t.parameters,
                            })
                        })
                        .collect();
                    obj.insert("tools".into(), defs.into());
                }
            }
        }

        body
    }
}

fn is_tool_result_turn(message: &Value) -> bool {
    message["role"] == "user"
        && message["content"]
            .as_array()
            .and_then(|blocks| blocks.first())
            .map(|block| block["type"] == "tool_result")
            .unwrap_or(false)
}

#[async_trait]
impl ModelProvider for AnthropicProvider {
    fn provider_name(&self) -> &str {
        "anthropic"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate_text(&self, request: &ProviderRequest) -> Result<ProviderResponse, SwitchyardError> {
        let body = self.build_request_body(request);
        let url = endpoint(&self.base_url, "messages");

        debug!(model = %self.model_id, "Anthropic generate_text");

        let resp = shared_client()
            .post(&url)
            .headers(anthropic_headers(&self.api_key, API_VERSION))
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        let data: MessagesResponse = resp.json().await?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for block in data.content {
            match block.r#type.as_str() {
                "text" => {
                    if let Some(t) = block.text {
                        text.push_str(&t);
                    }
                }
                "tool_use" => {
                    if let (Some(id), Some(name)) = (block.id, block.name) {
                        tool_calls.push(ToolCall::new(id, name, block.input.unwrap_or(Value::Null)));
                    }
                }
                _ => {}
            }
        }

        Ok(ProviderResponse {
            text,
            usage: Usage {
                input_tokens: data.usage.input_tokens,
                output_tokens: data.usage.output_tokens,
                total_tokens: data.usage.input_tokens + data.usage.output_tokens,
            },
            tool_calls,
            finish_reason: data.stop_reason.as_deref().map(FinishReason::from_provider),
        })
    }
}

// Internal Anthropic response types

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: MessagesUsage,
}

#[derive(Deserialize)]
struct ContentBlock {
    r#type: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    input: Option<Value>,
}

#[derive(Deserialize, Default)]
struct MessagesUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ToolDefinition;
    use pretty_assertions::assert_eq;

    #[test]
    fn system_is_hoisted_and_tool_results_grouped() {
        let provider = AnthropicProvider::new("claude-sonnet", "key".to_string(), None);
        let request = ProviderRequest {
            messages: vec![
                Message::system("be careful"),
                Message::user("fix my code"),
                Message::assistant_with_tool_calls(
                    "",
                    vec![
                        ToolCall::new("toolu_1", "explain_code", json!({"code": "x = 1"})),
                        ToolCall::new("toolu_2", "suggest_refactor", json!({"code": "x = 1"})),
                    ],
                ),
                Message::tool_result("toolu_1", "explain_code", "[]"),
                Message::tool_result("toolu_2", "suggest_refactor", "❌ Tool error (suggest_refactor): boom"),
            ],
            settings: GenerationSettings::default(),
            tools: Some(vec![ToolDefinition {
                name: "explain_code".into(),
                description: "Explain".into(),
                parameters: json!({"type": "object"}),
            }]),
        };

        let body = provider.build_request_body(&request);
        assert_eq!(body["system"], "be careful");
        assert_eq!(body["max_tokens"], 4096);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1]["content"][0]["type"], "tool_use");
        assert_eq!(messages[1]["content"][1]["id"], "toolu_2");
        let results = messages[2]["content"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["tool_use_id"], "toolu_1");
        assert_eq!(results[1]["is_error"], true);
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");
    }
}
