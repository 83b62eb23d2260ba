//! Command handlers for the switchyard binary.

use std::io::{BufRead, Write};
use std::sync::Arc;

use futures::StreamExt;
use uuid::Uuid;

use super::{ChatArgs, CheckpointArgs, SessionArgs};
use crate::config::AppConfig;
use crate::error::Result;
use crate::service::{ChatEvent, ChatService};
use crate::session::{SessionChat, TranscriptStore};

pub async fn handle_chat(config: &AppConfig, args: ChatArgs) -> Result<()> {
    let service = ChatService::from_config(config)?;

    if !args.stream {
        let reply = service.chat(&args.message, args.thread.as_deref()).await?;
        println!("{}", reply.response);
        eprintln!();
        eprintln!("thread:     {}", reply.thread_id);
        eprintln!("model:      {}", reply.model_used);
        eprintln!("llm calls:  {}", reply.llm_calls);
        eprintln!(
            "tokens:     {} in / {} out",
            reply.usage.input_tokens, reply.usage.output_tokens
        );
        if !reply.tools_used.is_empty() {
            eprintln!("tools used: {}", reply.tools_used.join(", "));
        }
        return Ok(());
    }

    let mut events = service.chat_stream(&args.message, args.thread.as_deref())?;
    while let Some(event) = events.next().await {
        print_event(&event);
    }
    Ok(())
}

fn print_event(event: &ChatEvent) {
    match event {
        ChatEvent::ThreadId { thread_id, .. } => eprintln!("🧵 {thread_id}"),
        ChatEvent::ToolCall { tool_name, tool_args, .. } => eprintln!("⚡ {tool_name} {tool_args}"),
        ChatEvent::ToolResult { tool_name, content, .. } => eprintln!("  ↳ {tool_name}: {content}"),
        ChatEvent::Response { content, .. } => println!("{content}"),
        ChatEvent::Complete { llm_calls, .. } => eprintln!("✅ done ({llm_calls} model calls)"),
        ChatEvent::Error { error, .. } => eprintln!("❌ {error}"),
    }
}

pub async fn handle_history(config: &AppConfig, thread: &str) -> Result<()> {
    let service = ChatService::from_config(config)?;
    for entry in service.get_history(thread).await? {
        println!("[{}] {}", entry.role, entry.content);
    }
    Ok(())
}

pub async fn handle_delete(config: &AppConfig, thread: &str) -> Result<()> {
    let service = ChatService::from_config(config)?;
    if service.delete_history(thread).await? {
        println!("Deleted {thread}");
    } else {
        println!("No such thread: {thread}");
    }
    Ok(())
}

pub async fn handle_checkpoints(config: &AppConfig, args: CheckpointArgs) -> Result<()> {
    let service = ChatService::from_config(config)?;
    match args.id {
        Some(id) => print_checkpoint(&service, &args.thread, id).await,
        None => {
            for cp in service.list_checkpoints(&args.thread).await? {
                println!(
                    "{:>4}  {}  {:<15} llm_calls={} messages={}  {}",
                    cp.seq,
                    cp.checkpoint_id,
                    cp.step.to_string(),
                    cp.state.llm_calls,
                    cp.state.messages.len(),
                    cp.created_at.format("%Y-%m-%d %H:%M:%S"),
                );
            }
            Ok(())
        }
    }
}

async fn print_checkpoint(service: &ChatService, thread: &str, id: Uuid) -> Result<()> {
    match service.get_checkpoint(thread, id).await? {
        Some(checkpoint) => println!("{}", serde_json::to_string_pretty(&checkpoint)?),
        None => println!("No checkpoint {id} in {thread}"),
    }
    Ok(())
}

pub async fn handle_session(config: &AppConfig, args: SessionArgs) -> Result<()> {
    let chat = SessionChat::from_config(config, Arc::new(TranscriptStore::new()))?;

    if let Some(message) = args.message.as_deref() {
        return session_turn(&chat, &args, message).await;
    }

    // Interactive: the transcript lives as long as this loop.
    let stdin = std::io::stdin();
    loop {
        eprint!("> ");
        std::io::stderr().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        if let Err(e) = session_turn(&chat, &args, &line).await {
            eprintln!("❌ {e}");
        }
    }
    Ok(())
}

async fn session_turn(chat: &SessionChat, args: &SessionArgs, message: &str) -> Result<()> {
    if args.reason {
        let trace = chat.reason(&args.session_id, message).await?;
        println!("{}", serde_json::to_string_pretty(&trace)?);
    } else {
        println!("{}", chat.reply(&args.session_id, message, args.mode).await?);
    }
    Ok(())
}
