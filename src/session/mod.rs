//! Session chat: a persona reply over a per-session transcript, without the
//! agent loop or checkpoints.

pub mod prompts;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use strum::{Display, EnumString};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::{Result, SwitchyardError};
use crate::models::ModelChoice;
use crate::provider::{ModelProvider, ProviderRequest, ProviderSet};
use crate::types::{GenerationSettings, Message};
use crate::util::retry::RetryPolicy;
use crate::validation::{self, DEFAULT_MAX_MESSAGE_CHARS};

/// Tone the persona answers in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResponseMode {
    #[default]
    Helpful,
    Concise,
    Expert,
}

/// Append-only transcripts keyed by session id, kept in memory.
#[derive(Debug, Default)]
pub struct TranscriptStore {
    sessions: RwLock<HashMap<String, Vec<Message>>>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages of a session, oldest first; empty for unknown sessions.
    pub async fn history(&self, session_id: &str) -> Vec<Message> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn append(&self, session_id: &str, messages: impl IntoIterator<Item = Message> + Send) {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_default()
            .extend(messages);
    }

    /// Empty a session's transcript. Returns whether the session existed.
    pub async fn clear(&self, session_id: &str) -> bool {
        match self.sessions.write().await.get_mut(session_id) {
            Some(messages) => {
                messages.clear();
                true
            }
            None => false,
        }
    }

    pub async fn exists(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }
}

fn json_object_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("json object regex must compile"))
}

/// Pull the outermost JSON object out of a reply; `{"response": raw}` if none parses.
pub fn parse_reasoning(raw: &str) -> Value {
    json_object_regex()
        .find(raw)
        .and_then(|m| serde_json::from_str::<Value>(m.as_str()).ok())
        .unwrap_or_else(|| json!({ "response": raw }))
}

/// Persona chat over one model with a remembered transcript per session.
pub struct SessionChat {
    provider: Arc<dyn ModelProvider>,
    transcripts: Arc<TranscriptStore>,
    retry: RetryPolicy,
    settings: GenerationSettings,
    max_message_chars: usize,
}

impl std::fmt::Debug for SessionChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionChat")
            .field("provider", &self.provider.provider_name())
            .field("model", &self.provider.model_id())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl SessionChat {
    pub fn new(provider: Arc<dyn ModelProvider>, transcripts: Arc<TranscriptStore>) -> Self {
        Self {
            provider,
            transcripts,
            retry: RetryPolicy::default(),
            settings: GenerationSettings::default(),
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
        }
    }

    /// Session chat on the default model slot.
    pub fn from_config(config: &AppConfig, transcripts: Arc<TranscriptStore>) -> Result<Self> {
        let provider = ProviderSet::from_config(config).get(ModelChoice::Default)?;
        let settings = config.settings();
        Ok(Self::new(provider, transcripts)
            .with_settings(
                GenerationSettings::builder()
                    .max_tokens(settings.max_tokens)
                    .temperature(settings.temperature)
                    .build(),
            )
            .with_max_message_chars(settings.max_message_chars))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_max_message_chars(mut self, max_message_chars: usize) -> Self {
        self.max_message_chars = max_message_chars;
        self
    }

    pub fn transcripts(&self) -> &TranscriptStore {
        &self.transcripts
    }

    /// Structured persona reply in the requested tone.
    pub async fn reply(&self, session_id: &str, message: &str, mode: ResponseMode) -> Result<String> {
        let message = self.check(session_id, message)?;
        let history = self.transcripts.history(session_id).await;
        let reply = self.complete(prompts::chat_messages(&history, &message, mode)).await?;
        self.remember(session_id, message, &reply).await;
        info!(session_id, %mode, "session reply");
        Ok(reply)
    }

    /// Reasoning trace as JSON, `{workflow, answer}` when the model complies.
    pub async fn reason(&self, session_id: &str, query: &str) -> Result<Value> {
        let query = self.check(session_id, query)?;
        let history = self.transcripts.history(session_id).await;
        let reply = self.complete(prompts::reason_messages(&history, &query)).await?;
        self.remember(session_id, query, &reply).await;
        Ok(parse_reasoning(&reply))
    }

    fn check(&self, session_id: &str, message: &str) -> Result<String> {
        if session_id.trim().is_empty() {
            return Err(SwitchyardError::InvalidInput("Session id cannot be empty".into()));
        }
        validation::validate_message(message, self.max_message_chars)
    }

    async fn complete(&self, messages: Vec<Message>) -> Result<String> {
        let request = ProviderRequest {
            messages,
            settings: self.settings.clone(),
            tools: None,
        };
        debug!(provider = self.provider.provider_name(), messages = request.messages.len(), "session call");
        let provider = &self.provider;
        let request = &request;
        let response = self
            .retry
            .execute(move || async move { provider.generate_text(request).await })
            .await?;
        Ok(response.text)
    }

    /// Transcripts only grow after a reply arrived.
    async fn remember(&self, session_id: &str, message: String, reply: &str) {
        self.transcripts
            .append(session_id, [Message::user(message), Message::assistant(reply)])
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn reasoning_json_is_extracted_from_prose() {
        let raw = "Sure! {\"workflow\": [], \"answer\": \"4\"} hope that helps";
        assert_eq!(parse_reasoning(raw)["answer"], "4");

        let fallback = parse_reasoning("no json here");
        assert_eq!(fallback, json!({"response": "no json here"}));

        let broken = parse_reasoning("{not json}");
        assert_eq!(broken["response"], "{not json}");
    }

    #[test]
    fn response_modes_parse_lowercase() {
        assert_eq!(ResponseMode::from_str("concise").unwrap(), ResponseMode::Concise);
        assert_eq!(ResponseMode::default().to_string(), "helpful");
        assert!(ResponseMode::from_str("casual").is_err());
    }

    #[tokio::test]
    async fn clear_reports_existence() {
        let store = TranscriptStore::new();
        assert!(!store.clear("s1").await);
        store.append("s1", [Message::user("hi"), Message::assistant("hello")]).await;
        assert_eq!(store.history("s1").await.len(), 2);
        assert!(store.clear("s1").await);
        assert!(store.history("s1").await.is_empty());
        assert!(store.exists("s1").await);
        assert!(!store.exists("s2").await);
    }
}
