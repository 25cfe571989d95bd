//! ragline CLI
//!
//! Front end for the retrieval-augmented query pipeline: document storage,
//! retrieval, LLM answering with conversation history, and backend checks.

mod commands;
mod services;

use clap::{Parser, Subcommand};
use commands::{CheckCommand, DownloadCommand, QueryCommand, RetrieveCommand, UploadCommand};
use ragline_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// ragline - retrieval-augmented answers over your documents
#[derive(Parser, Debug)]
#[command(name = "ragline")]
#[command(about = "Retrieval-augmented answers over your documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "RAGLINE_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "RAGLINE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (ollama, deepseek, gemini)
    #[arg(short, long, global = true, env = "RAGLINE_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "RAGLINE_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a query with history and document context
    Query(QueryCommand),

    /// Rank local documents by relevance to a query
    Retrieve(RetrieveCommand),

    /// Store a local file as a named document
    Upload(UploadCommand),

    /// Copy a stored document to a local path
    Download(DownloadCommand),

    /// Check that every backend is reachable
    Check(CheckCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Query(_) => "query",
            Commands::Retrieve(_) => "retrieve",
            Commands::Upload(_) => "upload",
            Commands::Download(_) => "download",
            Commands::Check(_) => "check",
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Workspace and config file decide which YAML is read, so they go in first
    let config = AppConfig::load_from(cli.workspace.clone(), cli.config.clone())?;

    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("ragline starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {:?}", config.active_model());

    config.ensure_state_dir()?;

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match cli.command {
        Commands::Query(cmd) => cmd.execute(&config).await,
        Commands::Retrieve(cmd) => cmd.execute(&config).await,
        Commands::Upload(cmd) => cmd.execute(&config).await,
        Commands::Download(cmd) => cmd.execute(&config).await,
        Commands::Check(cmd) => cmd.execute(&config).await,
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

    #[test]
    fn test_parse_query_command() {
        let cli = Cli::try_parse_from([
            "ragline", "query", "--user", "alice", "--file", "a.pdf", "--file", "b.pdf",
            "--history", "5", "Tell me about cats",
        ])
        .unwrap();

        match cli.command {
            Commands::Query(cmd) => {
                assert_eq!(cmd.user, "alice");
                assert_eq!(cmd.files, vec!["a.pdf", "b.pdf"]);
                assert_eq!(cmd.history, Some(5));
                assert_eq!(cmd.query, "Tell me about cats");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_retrieve_with_global_flags() {
        let cli = Cli::try_parse_from([
            "ragline", "retrieve", "-k", "2", "--path", "docs", "cats", "--verbose",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Retrieve(cmd) => {
                assert_eq!(cmd.top_k, Some(2));
                assert_eq!(cmd.paths, vec![PathBuf::from("docs")]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_retrieve_requires_path() {
        assert!(Cli::try_parse_from(["ragline", "retrieve", "cats"]).is_err());
    }

    #[test]
    fn test_query_requires_user() {
        assert!(Cli::try_parse_from(["ragline", "query", "hello"]).is_err());
    }
}
