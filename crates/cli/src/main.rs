//! docqa CLI
//!
//! Main entry point for the docqa command-line tool: ingest documents into a
//! local knowledge base and ask questions grounded in them.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, KnowledgeCommand};
use docqa_core::{config::AppConfig, logging, AppResult, LogFormat};
use std::path::PathBuf;

/// docqa - question answering over your own documents
#[derive(Parser, Debug)]
#[command(name = "docqa")]
#[command(about = "Question answering over a local knowledge base", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "DOCQA_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "DOCQA_CONFIG")]
    config: Option<PathBuf>,

    /// Log level or filter (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Answer model provider (extractive, ollama)
    #[arg(short, long, global = true, env = "DOCQA_PROVIDER")]
    provider: Option<String>,

    /// Answer model identifier
    #[arg(short, long, global = true, env = "DOCQA_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question answered from a knowledge base
    Ask(AskCommand),

    /// Knowledge base management
    Knowledge(KnowledgeCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let log_format = cli.log_format.as_deref().map(LogFormat::parse).transpose()?;

    let config = AppConfig::load()?.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        log_format,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_format)?;

    tracing::info!("docqa starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Answer provider: {} ({})", config.provider, config.model);

    config.validate()?;
    config.ensure_docqa_dir()?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Knowledge(cmd) => cmd.name(),
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Knowledge(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "docqa",
            "ask",
            "Где офис?",
            "--provider",
            "ollama",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.provider.as_deref(), Some("ollama"));
        assert_eq!(cli.log_format.as_deref(), Some("json"));
        assert!(matches!(cli.command, Commands::Ask(_)));
    }
}
