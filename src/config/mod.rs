//! Configuration system (layered: code > env > TOML file > defaults).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SwitchyardError};

/// Default endpoint for the Gemini OpenAI-compatible API.
pub const GEMINI_OPENAI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai/";

/// Tunables for the agent runtime. Every field has a default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeSettings {
    pub default_model: String,
    pub openai_model: String,
    pub anthropic_model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub max_message_chars: usize,
    pub max_llm_calls: u32,
    pub tool_timeout_secs: u64,
    pub model_deadline_secs: Option<u64>,
    pub checkpoint_dir: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub python_bin: String,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            default_model: "gemini-2.5-flash-lite".to_string(),
            openai_model: "gpt-4o".to_string(),
            anthropic_model: "claude-sonnet-4-20250514".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            max_message_chars: 10_000,
            max_llm_calls: 6,
            tool_timeout_secs: 15,
            model_deadline_secs: None,
            checkpoint_dir: None,
            database_path: None,
            python_bin: "python3".to_string(),
        }
    }
}

/// On-disk shape of the optional TOML config file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    api_keys: HashMap<String, String>,
    base_urls: HashMap<String, String>,
    runtime: RuntimeSettings,
}

/// Layered configuration for switchyard.
///
/// Credentials and endpoints are keyed by provider name (`google`, `openai`,
/// `anthropic`, `tavily`).
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    api_keys: Arc<RwLock<HashMap<String, String>>>,
    base_urls: Arc<RwLock<HashMap<String, String>>>,
    settings: RuntimeSettings,
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from environment variables, reading `.env` first if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let mut config = Self::new();
        config.apply_env();
        config
    }

    /// Load a TOML file, then overlay environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::new(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let file: FileConfig = toml::from_str(raw)
            .map_err(|e| SwitchyardError::Configuration(format!("invalid config file: {e}")))?;
        Ok(Self {
            api_keys: Arc::new(RwLock::new(file.api_keys)),
            base_urls: Arc::new(RwLock::new(file.base_urls)),
            settings: file.runtime,
        })
    }

    fn apply_env(&mut self) {
        let key_mappings = [
            ("GOOGLE_API_KEY", "google"),
            ("GEMINI_API_KEY", "google"),
            ("OPENAI_API_KEY", "openai"),
            ("ANTHROPIC_API_KEY", "anthropic"),
            ("TAVILY_API_KEY", "tavily"),
        ];
        for (env_var, provider) in &key_mappings {
            if let Ok(key) = std::env::var(env_var) {
                self.set_api_key(provider, key);
            }
        }

        let url_mappings = [
            ("GOOGLE_OPENAI_BASE_URL", "google"),
            ("OPENAI_BASE_URL", "openai"),
            ("ANTHROPIC_BASE_URL", "anthropic"),
        ];
        for (env_var, provider) in &url_mappings {
            if let Ok(url) = std::env::var(env_var) {
                self.set_base_url(provider, url);
            }
        }

        let s = &mut self.settings;
        if let Ok(v) = std::env::var("LLM_MODEL") {
            s.default_model = v;
        }
        if let Ok(v) = std::env::var("OPENAI_MODEL") {
            s.openai_model = v;
        }
        if let Ok(v) = std::env::var("ANTHROPIC_MODEL") {
            s.anthropic_model = v;
        }
        if let Ok(v) = std::env::var("PYTHON_BIN") {
            s.python_bin = v;
        }
        if let Ok(v) = std::env::var("SWITCHYARD_CHECKPOINT_DIR") {
            s.checkpoint_dir = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("DATABASE_PATH") {
            s.database_path = Some(PathBuf::from(v));
        }
        parse_env("LLM_TEMPERATURE", &mut s.temperature);
        parse_env("LLM_MAX_TOKENS", &mut s.max_tokens);
        parse_env("SWITCHYARD_MAX_MESSAGE_CHARS", &mut s.max_message_chars);
        parse_env("SWITCHYARD_MAX_LLM_CALLS", &mut s.max_llm_calls);
        parse_env("SWITCHYARD_TOOL_TIMEOUT_SECS", &mut s.tool_timeout_secs);
        let mut deadline = 0u64;
        if parse_env("SWITCHYARD_MODEL_DEADLINE_SECS", &mut deadline) {
            s.model_deadline_secs = Some(deadline);
        }
    }

    pub fn set_api_key(&self, provider: &str, key: String) {
        if let Ok(mut keys) = self.api_keys.write() {
            keys.insert(provider.to_string(), key);
        }
    }

    pub fn get_api_key(&self, provider: &str) -> Option<String> {
        self.api_keys.read().ok()?.get(provider).cloned()
    }

    pub fn set_base_url(&self, provider: &str, url: String) {
        if let Ok(mut urls) = self.base_urls.write() {
            urls.insert(provider.to_string(), url);
        }
    }

    pub fn get_base_url(&self, provider: &str) -> Option<String> {
        self.base_urls.read().ok()?.get(provider).cloned()
    }

    pub fn has_credentials(&self, provider: &str) -> bool {
        self.get_api_key(provider).is_some()
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut RuntimeSettings {
        &mut self.settings
    }

    pub fn with_settings(mut self, settings: RuntimeSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Checkpoint directory, falling back to `~/.switchyard/checkpoints`.
    pub fn checkpoint_dir(&self) -> PathBuf {
        self.settings
            .checkpoint_dir
            .clone()
            .unwrap_or_else(default_checkpoint_dir)
    }

    /// Log a warning for every provider without a key.
    pub fn warn_missing_credentials(&self) {
        for (provider, env_var) in [
            ("google", "GOOGLE_API_KEY"),
            ("openai", "OPENAI_API_KEY"),
            ("anthropic", "ANTHROPIC_API_KEY"),
            ("tavily", "TAVILY_API_KEY"),
        ] {
            if !self.has_credentials(provider) {
                tracing::warn!(provider, env_var, "credentials not set; dependent features are disabled");
            }
        }
    }
}

fn parse_env<T: std::str::FromStr>(var: &str, slot: &mut T) -> bool {
    let Ok(raw) = std::env::var(var) else {
        return false;
    };
    match raw.trim().parse() {
        Ok(value) => {
            *slot = value;
            true
        }
        Err(_) => {
            tracing::warn!(var, value = %raw, "ignoring unparsable environment value");
            false
        }
    }
}

fn default_switchyard_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".switchyard")
}

fn default_checkpoint_dir() -> PathBuf {
    default_switchyard_dir().join("checkpoints")
}
