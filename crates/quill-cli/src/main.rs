//! quill: a terminal coding agent with a runtime-extensible toolset.

mod approval;
mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use tracing_subscriber::EnvFilter;

const VERBOSE_FILTER: &str =
    "quill=debug,quill_core=debug,quill_tools=debug,quill_mcp=debug,quill_provider=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before parsing, so clap's `env` fallbacks see the file too.
    load_dotenv(Path::new(".env"));
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = quill_core::ConfigStore::new().load();
    config.apply_env(|key| std::env::var(key).ok());
    cli.apply_to(&mut config);
    let mcp_config = cli.mcp_config.as_deref();

    match cli.command.clone().unwrap_or(Commands::Chat) {
        Commands::Chat => commands::chat::run(&config, mcp_config).await?,
        Commands::Exec { prompt } => commands::exec::run(&config, mcp_config, &prompt).await?,
        Commands::Tools { name } => {
            commands::tools::run(&config, mcp_config, name.as_deref()).await?
        }
        Commands::CheckMcp => commands::check_mcp::run(mcp_config).await?,
    }

    Ok(())
}

/// Logs go to stderr so they never mix with the streamed reply.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Export the `KEY=value` pairs of a dotenv file. Variables already set in
/// the environment keep their value. Returns false if nothing was loaded.
fn load_dotenv(path: &Path) -> bool {
    dotenvy::from_path(path).is_ok()
}
