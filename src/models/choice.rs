//! The closed set of model slots a request can be routed to.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::config::AppConfig;

/// Which configured model a turn runs on.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ModelChoice {
    /// General-purpose model served through the Gemini OpenAI-compatible endpoint.
    #[default]
    Default,
    OpenAi,
    Anthropic,
}

impl ModelChoice {
    pub const ALL: [ModelChoice; 3] = [Self::Default, Self::OpenAi, Self::Anthropic];

    /// Human-readable model name reported in chat results.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Default => "Gemini 2.5 Flash Lite",
            Self::OpenAi => "GPT-4o",
            Self::Anthropic => "Claude Sonnet",
        }
    }

    /// Provider key used for credentials and base URLs in [`AppConfig`].
    pub fn provider_key(self) -> &'static str {
        match self {
            Self::Default => "google",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }

    /// Configured API model identifier for this slot.
    pub fn model_id(self, config: &AppConfig) -> String {
        let settings = config.settings();
        match self {
            Self::Default => settings.default_model.clone(),
            Self::OpenAi => settings.openai_model.clone(),
            Self::Anthropic => settings.anthropic_model.clone(),
        }
    }
}
