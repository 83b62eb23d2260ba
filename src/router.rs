//! Keyword router: latest user text to (model, tool group).
//!
//! Matching is plain substring membership on the lower-cased text, so
//! "update" matches "data" and "errors" matches "error". Database terms are
//! checked before code terms, then everything else is general.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::ModelChoice;
use crate::tools::ToolGroup;
use crate::types::{Message, Role};

pub const DB_KEYWORDS: [&str; 8] = [
    "database", "sql", "data", "schema", "query", "postgres", "mysql", "table",
];

pub const CODE_KEYWORDS: [&str; 8] = [
    "code", "bug", "error", "function", "class", "python", "debug", "refactor",
];

/// Routing decision for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub model: ModelChoice,
    pub group: ToolGroup,
}

impl Route {
    pub const GENERAL: Route = Route {
        model: ModelChoice::Default,
        group: ToolGroup::General,
    };
}

/// Text of the most recent user message, if any.
pub fn latest_user_text(messages: &[Message]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.text.as_str())
}

/// Classify text alone.
pub fn classify(text: &str) -> Route {
    let lower = text.to_lowercase();
    if DB_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        Route {
            model: ModelChoice::OpenAi,
            group: ToolGroup::Database,
        }
    } else if CODE_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        Route {
            model: ModelChoice::Anthropic,
            group: ToolGroup::CodeAnalysis,
        }
    } else {
        Route::GENERAL
    }
}

/// Route a conversation on its latest user message.
pub fn route(messages: &[Message]) -> Route {
    let route = classify(latest_user_text(messages).unwrap_or_default());
    info!(model = %route.model, group = %route.group, "routed request");
    route
}
