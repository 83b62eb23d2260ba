//! Agent loop: state, transitions, model adapter and the driving runner.

pub mod adapter;
pub mod events;
pub mod machine;
pub mod runner;
pub mod state;

pub use adapter::{ModelAdapter, ModelReply};
pub use events::{LoopEvent, LoopEventPayload, LoopEventSink};
pub use machine::{LoopStep, MAX_LLM_CALLS};
pub use runner::AgentLoop;
pub use state::AgentState;
