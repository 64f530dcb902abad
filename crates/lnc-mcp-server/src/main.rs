use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use lnc_mcp_server::{initialize_daemon, RootError, ServerConfig};

/// Read-only Lightning Node Connect server for MCP clients.
///
/// Pairs with a Lightning node through a mailbox relay and answers node
/// queries over JSON-RPC on stdio. Nothing it exposes can move funds.
#[derive(Parser, Debug)]
#[command(
    name = "lnc-mcp-server",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (Read-Only)"),
    about,
    long_about = None
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve MCP over stdio (the default)
    Serve,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Logs go to stderr; stdout carries the protocol.
fn init_tracing(development: bool, verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        let default_level = if development { "debug" } else { "info" };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if development {
        builder.init();
    } else {
        builder.json().init();
    }
}

fn config_path(path: Option<&PathBuf>) -> PathBuf {
    path.cloned()
        .unwrap_or_else(ServerConfig::default_config_path)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ServerConfig::load(&config_path(cli.config.as_ref())) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("lnc-mcp-server: {}", e);
            std::process::exit(1);
        }
    };
    init_tracing(config.development, cli.verbose);

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => cmd_serve(config).await,
        Commands::Init { force } => cmd_init(cli.config.as_ref(), force),
    };
    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn cmd_serve(config: ServerConfig) -> Result<(), RootError> {
    let daemon = initialize_daemon(config)?;
    let exit = daemon.run_stdio().await?;
    info!(reason = ?exit, "lnc-mcp-server stopped");
    Ok(())
}

fn cmd_init(path: Option<&PathBuf>, force: bool) -> Result<(), RootError> {
    let path = config_path(path);
    if path.exists() && !force {
        return Err(RootError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    ServerConfig::default().save(&path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
