//! Tool system for function calling.

pub mod arguments;
pub mod code;
pub mod database;
pub mod general;
pub mod registry;
pub mod types;

pub use arguments::ToolArguments;
pub use database::{ColumnInfo, Row, SqlBackend, TableSchema};
#[cfg(feature = "sqlite")]
pub use database::SqliteBackend;
pub use general::{SearchBackend, SearchHit, TavilySearch};
pub use registry::{Capability, ToolBackends, ToolGroup, ToolRegistry, ToolSpec};
pub use types::ToolParameters;
