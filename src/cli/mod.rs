//! CLI entry point for switchyard.

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::session::ResponseMode;

/// Switchyard agent CLI
#[derive(Parser, Debug)]
#[command(name = "switchyard", version, about = "Routed, checkpointed tool-calling agent")]
pub struct Cli {
    /// TOML config file (environment variables still override it)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug-level logging unless RUST_LOG is set
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send one message to the agent
    Chat(ChatArgs),
    /// Print the user/assistant turns of a thread
    History(ThreadArgs),
    /// Delete every checkpoint of a thread
    Delete(ThreadArgs),
    /// List a thread's checkpoints, or print one of them
    Checkpoints(CheckpointArgs),
    /// Persona chat with an in-memory transcript
    Session(SessionArgs),
}

/// Arguments for `switchyard chat`.
#[derive(Parser, Debug)]
pub struct ChatArgs {
    /// Message to send
    pub message: String,

    /// Continue an existing thread
    #[arg(short, long)]
    pub thread: Option<String>,

    /// Print events as the loop runs
    #[arg(short, long)]
    pub stream: bool,
}

/// A single thread id argument.
#[derive(Parser, Debug)]
pub struct ThreadArgs {
    pub thread: String,
}

/// Arguments for `switchyard checkpoints`.
#[derive(Parser, Debug)]
pub struct CheckpointArgs {
    pub thread: String,

    /// Print this checkpoint in full instead of listing
    #[arg(long)]
    pub id: Option<Uuid>,
}

/// Arguments for `switchyard session`.
#[derive(Parser, Debug)]
pub struct SessionArgs {
    pub session_id: String,

    /// Message to send; reads lines from stdin when omitted
    pub message: Option<String>,

    /// Tone of the reply
    #[arg(short, long, default_value = "helpful")]
    pub mode: ResponseMode,

    /// Ask for a JSON reasoning trace instead of a persona reply
    #[arg(short, long)]
    pub reason: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_chat_with_defaults() {
        let cli = Cli::try_parse_from(["switchyard", "chat", "What is the capital of France?"]).unwrap();
        match cli.command {
            Commands::Chat(args) => {
                assert_eq!(args.message, "What is the capital of France?");
                assert!(args.thread.is_none());
                assert!(!args.stream);
            }
            other => panic!("expected Chat, got {other:?}"),
        }
        assert!(!cli.verbose);
        assert!(cli.config.is_none());
    }

    #[test]
    fn parse_chat_resuming_a_thread() {
        let cli = Cli::try_parse_from([
            "switchyard",
            "--config",
            "switchyard.toml",
            "chat",
            "--thread",
            "thread_0123456789abcdef",
            "--stream",
            "follow-up",
        ])
        .unwrap();
        match cli.command {
            Commands::Chat(args) => {
                assert_eq!(args.thread.as_deref(), Some("thread_0123456789abcdef"));
                assert!(args.stream);
            }
            other => panic!("expected Chat, got {other:?}"),
        }
        assert_eq!(cli.config, Some(PathBuf::from("switchyard.toml")));
    }

    #[test]
    fn parse_checkpoint_by_id() {
        let cli = Cli::try_parse_from([
            "switchyard",
            "checkpoints",
            "thread_0123456789abcdef",
            "--id",
            "5d1c6b1e-0000-4000-8000-000000000000",
        ])
        .unwrap();
        match cli.command {
            Commands::Checkpoints(args) => assert!(args.id.is_some()),
            other => panic!("expected Checkpoints, got {other:?}"),
        }
        assert!(Cli::try_parse_from(["switchyard", "checkpoints", "t", "--id", "nope"]).is_err());
    }

    #[test]
    fn parse_session_modes() {
        let cli = Cli::try_parse_from(["switchyard", "session", "s1", "--mode", "expert", "hi there"]).unwrap();
        match cli.command {
            Commands::Session(args) => {
                assert_eq!(args.mode, ResponseMode::Expert);
                assert_eq!(args.message.as_deref(), Some("hi there"));
                assert!(!args.reason);
            }
            other => panic!("expected Session, got {other:?}"),
        }
        assert!(Cli::try_parse_from(["switchyard", "session", "s1", "--mode", "casual"]).is_err());
    }

    #[test]
    fn parse_missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["switchyard"]).is_err());
        assert!(Cli::try_parse_from(["switchyard", "history"]).is_err());
    }
}
