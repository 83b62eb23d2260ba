//! Switchyard CLI binary entry point.

use clap::Parser;
use switchyard::cli::{commands, Cli, Commands};
use switchyard::config::AppConfig;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "switchyard=debug" } else { "switchyard=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };
    config.warn_missing_credentials();

    let result = match cli.command {
        Commands::Chat(args) => commands::handle_chat(&config, args).await,
        Commands::History(args) => commands::handle_history(&config, &args.thread).await,
        Commands::Delete(args) => commands::handle_delete(&config, &args.thread).await,
        Commands::Checkpoints(args) => commands::handle_checkpoints(&config, args).await,
        Commands::Session(args) => commands::handle_session(&config, args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        eprintln!("Hint: {:?}", e.recovery_suggestion());
        std::process::exit(if e.is_client_error() { 2 } else { 1 });
    }
}
