//! Tool registry: a fixed set of capabilities addressable by name.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use super::arguments::ToolArguments;
use super::database::{self, SqlBackend};
use super::general::{self, SearchBackend};
use super::types::ToolParameters;
use super::code;
use crate::config::AppConfig;
use crate::error::{Result, SwitchyardError};
use crate::provider::ToolDefinition;
use crate::util::timeout::with_timeout;

pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(15);

/// A named bundle of capabilities bound together with one system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ToolGroup {
    Database,
    CodeAnalysis,
    General,
}

impl ToolGroup {
    /// Names of the capabilities in this group, independent of any registry.
    pub fn tool_names(self) -> BTreeSet<String> {
        Capability::ALL
            .into_iter()
            .filter(|cap| cap.group() == self)
            .map(|cap| cap.name().to_string())
            .collect()
    }
}

/// Every capability the runtime can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    QueryDatabase,
    GetDatabaseSchema,
    ExplainCode,
    SuggestRefactor,
    ExecuteCode,
    SearchWeb,
    CallExternalApi,
}

impl Capability {
    pub const ALL: [Capability; 7] = [
        Self::QueryDatabase,
        Self::GetDatabaseSchema,
        Self::ExplainCode,
        Self::SuggestRefactor,
        Self::ExecuteCode,
        Self::SearchWeb,
        Self::CallExternalApi,
    ];

    /// Tool name as exposed to the model.
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn group(self) -> ToolGroup {
        match self {
            Self::QueryDatabase | Self::GetDatabaseSchema => ToolGroup::Database,
            Self::ExplainCode | Self::SuggestRefactor | Self::ExecuteCode => ToolGroup::CodeAnalysis,
            Self::SearchWeb | Self::CallExternalApi => ToolGroup::General,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::QueryDatabase => {
                "Execute a read-only SQL query (SELECT/WITH/EXPLAIN) against the database and \
                 return up to 10 formatted rows. Statements that modify data are blocked."
            }
            Self::GetDatabaseSchema => {
                "List all tables in the database with their columns, types, nullability and \
                 defaults. Use this when unsure which tables exist."
            }
            Self::ExplainCode => {
                "Summarize Python source: top-level functions with arguments, docstring and line \
                 count, and classes with their methods."
            }
            Self::SuggestRefactor => {
                "Static refactor hints for Python source: long parameter lists, long functions \
                 and deeply nested loops."
            }
            Self::ExecuteCode => "Execute a Python snippet with a 5 second limit and return its output.",
            Self::SearchWeb => {
                "Search the web for current information, news or facts. Returns the top results \
                 with URLs."
            }
            Self::CallExternalApi => "Fetch data from an external REST API with a GET request (10 second timeout).",
        }
    }

    pub fn parameters(self) -> ToolParameters {
        match self {
            Self::QueryDatabase => ToolParameters::object()
                .string("sql_query", "SQL SELECT query to execute", true)
                .build(),
            Self::GetDatabaseSchema => ToolParameters::empty(),
            Self::ExplainCode | Self::SuggestRefactor => ToolParameters::object()
                .string("code", "Python source code", true)
                .build(),
            Self::ExecuteCode => ToolParameters::object()
                .string("code", "Python source code to run", true)
                .string_with_default("language", "Language of the snippet", "python")
                .build(),
            Self::SearchWeb => ToolParameters::object()
                .string("query", "Search terms to look for", true)
                .build(),
            Self::CallExternalApi => ToolParameters::object()
                .string("url", "Absolute URL to request", true)
                .string_with_default("method", "HTTP method", "GET")
                .build(),
        }
    }

    async fn run(self, args: &ToolArguments, backends: &ToolBackends) -> Result<String> {
        match self {
            Self::QueryDatabase => {
                let sql = args.get_str("sql_query")?;
                Ok(database::query_database(backends.sql()?.as_ref(), sql).await)
            }
            Self::GetDatabaseSchema => Ok(database::get_database_schema(backends.sql()?.as_ref()).await),
            Self::ExplainCode => Ok(code::explain_code(args.get_str("code")?)),
            Self::SuggestRefactor => Ok(code::suggest_refactor(args.get_str("code")?)),
            Self::ExecuteCode => {
                let source = args.get_str("code")?;
                let language = args.get_str_or("language", "python");
                Ok(code::execute_code(&backends.python_bin, source, language).await)
            }
            Self::SearchWeb => {
                let query = args.get_str("query")?;
                Ok(general::search_web(backends.search()?.as_ref(), query).await)
            }
            Self::CallExternalApi => {
                let url = args.get_str("url")?;
                let method = args.get_str_or("method", "GET");
                Ok(general::call_external_api(url, method).await)
            }
        }
    }
}

/// Registered tool: name, description, input schema and the capability behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: ToolParameters,
    pub capability: Capability,
}

impl ToolSpec {
    pub fn from_capability(capability: Capability) -> Self {
        Self {
            name: capability.name().to_string(),
            description: capability.description().to_string(),
            parameters: capability.parameters(),
            capability,
        }
    }

    pub fn group(&self) -> ToolGroup {
        self.capability.group()
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.schema.clone(),
        }
    }
}

/// External collaborators the capabilities call into.
#[derive(Clone)]
pub struct ToolBackends {
    pub sql: Option<Arc<dyn SqlBackend>>,
    pub search: Option<Arc<dyn SearchBackend>>,
    pub python_bin: String,
}

impl Default for ToolBackends {
    fn default() -> Self {
        Self {
            sql: None,
            search: None,
            python_bin: "python3".to_string(),
        }
    }
}

impl fmt::Debug for ToolBackends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolBackends")
            .field("sql", &self.sql.as_ref().map(|_| ".."))
            .field("search", &self.search.as_ref().map(|_| ".."))
            .field("python_bin", &self.python_bin)
            .finish()
    }
}

impl ToolBackends {
    /// Wire backends from configuration; unconfigured ones stay `None`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let settings = config.settings();
        let mut backends = Self {
            python_bin: settings.python_bin.clone(),
            ..Self::default()
        };

        if let Some(key) = config.get_api_key("tavily") {
            backends.search = Some(Arc::new(general::TavilySearch::new(key, config.get_base_url("tavily"))));
        }

        #[cfg(feature = "sqlite")]
        if let Some(path) = &settings.database_path {
            backends.sql = Some(Arc::new(database::SqliteBackend::open(path)?));
        }

        Ok(backends)
    }

    fn sql(&self) -> Result<&Arc<dyn SqlBackend>> {
        self.sql
            .as_ref()
            .ok_or_else(|| SwitchyardError::Configuration("database not configured (set DATABASE_PATH)".into()))
    }

    fn search(&self) -> Result<&Arc<dyn SearchBackend>> {
        self.search
            .as_ref()
            .ok_or_else(|| SwitchyardError::Configuration("web search not configured (set TAVILY_API_KEY)".into()))
    }
}

/// Read-only after construction; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    specs: BTreeMap<String, ToolSpec>,
    backends: ToolBackends,
    timeout: Duration,
}

impl ToolRegistry {
    /// Register every capability.
    pub fn new(backends: ToolBackends) -> Self {
        let specs = Capability::ALL
            .into_iter()
            .map(|cap| (cap.name().to_string(), ToolSpec::from_capability(cap)))
            .collect();
        Self {
            specs,
            backends,
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let registry = Self::new(ToolBackends::from_config(config)?)
            .with_timeout(Duration::from_secs(config.settings().tool_timeout_secs));
        Ok(registry)
    }

    /// Per-invocation wall-clock limit.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn spec(&self, name: &str) -> Option<&ToolSpec> {
        self.specs.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    /// Names of every tool in a group.
    pub fn tools_for_group(&self, group: ToolGroup) -> BTreeSet<String> {
        self.specs
            .values()
            .filter(|spec| spec.group() == group)
            .map(|spec| spec.name.clone())
            .collect()
    }

    /// Provider-facing definitions for the selected names; unknown names are skipped.
    pub fn definitions(&self, selected: &BTreeSet<String>) -> Vec<ToolDefinition> {
        selected
            .iter()
            .filter_map(|name| self.specs.get(name))
            .map(ToolSpec::definition)
            .collect()
    }

    /// Run a tool by name under the registry timeout. A panicking handler
    /// surfaces as `ToolExecution` instead of unwinding into the caller.
    pub async fn invoke(&self, name: &str, arguments: &serde_json::Value) -> Result<String> {
        let spec = self
            .specs
            .get(name)
            .ok_or_else(|| SwitchyardError::InvalidArgument(format!("unknown tool: {name}")))?;
        let args = ToolArguments::new(arguments.clone());
        let handler = AssertUnwindSafe(spec.capability.run(&args, &self.backends)).catch_unwind();
        match with_timeout(self.timeout, async { Ok(handler.await) }).await? {
            Ok(result) => result,
            Err(payload) => Err(SwitchyardError::tool(name, panic_message(payload.as_ref()))),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("handler panicked: {detail}")
}
