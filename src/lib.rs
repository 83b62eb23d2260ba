//! Switchyard: a routed, checkpointed tool-calling agent runtime.
//!
//! Each user message is classified by keyword into a model and a tool group,
//! then driven through a bounded call-model / run-tools loop whose state is
//! checkpointed per thread after every transition. Every turn ends on a
//! printable assistant answer.
//!
//! # Quick Start
//!
//! ```no_run
//! use switchyard::prelude::*;
//!
//! # async fn example() -> switchyard::error::Result<()> {
//! let config = AppConfig::from_env();
//! let service = ChatService::from_config(&config)?;
//! let reply = service.chat("What is the capital of France?", None).await?;
//! println!("{} ({})", reply.response, reply.thread_id);
//! # Ok(())
//! # }
//! ```

pub mod agent_loop;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod models;
pub mod prelude;
pub mod prompt;
pub mod provider;
pub mod router;
pub mod service;
pub mod session;
pub mod tools;
pub mod types;
pub mod util;
pub mod validation;

#[cfg(feature = "cli")]
pub mod cli;
