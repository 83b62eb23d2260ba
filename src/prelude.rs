//! Convenience re-exports for common use.

pub use crate::agent_loop::{AgentLoop, AgentState, LoopEvent, LoopEventSink, LoopStep, ModelAdapter};
pub use crate::checkpoint::{Checkpoint, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use crate::config::AppConfig;
pub use crate::error::{Result, SwitchyardError};
pub use crate::models::ModelChoice;
pub use crate::provider::{ModelProvider, ProviderSet};
pub use crate::service::{ChatEvent, ChatResponse, ChatService};
pub use crate::session::{ResponseMode, SessionChat, TranscriptStore};
pub use crate::tools::{ToolGroup, ToolRegistry};
pub use crate::types::{GenerationSettings, HistoryEntry, Message, Role, ToolCall};
