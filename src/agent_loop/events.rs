//! Loop event stream types.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::machine::LoopStep;
use crate::types::Message;

/// Concrete event payloads emitted by the agent loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoopEventPayload {
    /// The loop is about to run this step.
    StepEntered { step: LoopStep },
    /// A message was appended to the thread.
    MessageAppended { message: Message },
    Checkpointed { checkpoint_id: Uuid, seq: u64 },
}

/// Envelope for loop events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopEvent {
    pub thread_id: String,
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub llm_calls: u32,
    pub payload: LoopEventPayload,
}

/// Callback receiving loop events as transitions happen.
pub type LoopEventSink = Arc<dyn Fn(LoopEvent) + Send + Sync>;

pub(crate) struct LoopEventEmitter {
    thread_id: String,
    seq: AtomicU64,
    sink: Option<LoopEventSink>,
}

impl LoopEventEmitter {
    pub(crate) fn new(thread_id: impl Into<String>, sink: Option<LoopEventSink>) -> Self {
        Self {
            thread_id: thread_id.into(),
            seq: AtomicU64::new(1),
            sink,
        }
    }

    pub(crate) fn emit(&self, llm_calls: u32, payload: LoopEventPayload) {
        let Some(sink) = &self.sink else { return };
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        (sink)(LoopEvent {
            thread_id: self.thread_id.clone(),
            seq,
            timestamp: Utc::now(),
            llm_calls,
            payload,
        });
    }
}
