//! Model slot → provider mapping.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::{Result, SwitchyardError};
use crate::models::ModelChoice;

use super::ModelProvider;

/// Providers available to the agent loop, one per [`ModelChoice`].
#[derive(Clone, Default)]
pub struct ProviderSet {
    providers: HashMap<ModelChoice, Arc<dyn ModelProvider>>,
}

impl fmt::Debug for ProviderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut slots: Vec<_> = self
            .providers
            .iter()
            .map(|(choice, p)| format!("{choice}={}/{}", p.provider_name(), p.model_id()))
            .collect();
        slots.sort();
        f.debug_struct("ProviderSet").field("slots", &slots).finish()
    }
}

impl ProviderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the provider for a slot.
    pub fn with(mut self, choice: ModelChoice, provider: Arc<dyn ModelProvider>) -> Self {
        self.providers.insert(choice, provider);
        self
    }

    /// Build every slot that has credentials; warn about the rest.
    #[allow(unused_mut)]
    pub fn from_config(config: &AppConfig) -> Self {
        let mut set = Self::new();

        for choice in ModelChoice::ALL {
            let provider_key = choice.provider_key();
            let Some(api_key) = config.get_api_key(provider_key) else {
                tracing::warn!(model = %choice, provider = provider_key, "no API key; model slot disabled");
                continue;
            };
            let model_id = choice.model_id(config);
            let base_url = config.get_base_url(provider_key);

            let provider: Option<Arc<dyn ModelProvider>> = match choice {
                #[cfg(feature = "openai")]
                ModelChoice::Default => Some(Arc::new(super::openai::OpenAiProvider::compatible(
                    provider_key,
                    model_id,
                    api_key,
                    base_url.unwrap_or_else(|| crate::config::GEMINI_OPENAI_BASE_URL.to_string()),
                ))),
                #[cfg(feature = "openai")]
                ModelChoice::OpenAi => Some(Arc::new(super::openai::OpenAiProvider::new(
                    model_id, api_key, base_url,
                ))),
                #[cfg(feature = "anthropic")]
                ModelChoice::Anthropic => Some(Arc::new(super::anthropic::AnthropicProvider::new(
                    model_id, api_key, base_url,
                ))),
                #[allow(unreachable_patterns)]
                _ => None,
            };

            match provider {
                Some(provider) => set = set.with(choice, provider),
                None => tracing::warn!(model = %choice, "provider support not compiled in"),
            }
        }

        set
    }

    /// Resolve the provider for a slot; a missing slot is a configuration fault.
    pub fn get(&self, choice: ModelChoice) -> Result<Arc<dyn ModelProvider>> {
        self.providers
            .get(&choice)
            .cloned()
            .ok_or_else(|| SwitchyardError::ModelUnavailable(choice.to_string()))
    }

    pub fn contains(&self, choice: ModelChoice) -> bool {
        self.providers.contains_key(&choice)
    }
}
