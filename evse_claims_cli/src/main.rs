//! evse-claims: inspect and change charging claims on a controller.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;

use evse_claims_cli::{commands, Config};
use evse_claims_store::{ClaimStore, ReqwestApi};

#[derive(Parser)]
#[command(name = "evse-claims")]
#[command(about = "Inspect and change charging claims on an EVSE controller")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "evse-claims.toml")]
    config: PathBuf,

    /// Controller base URL (overrides config file)
    #[arg(long, env = "EVSE_URL")]
    url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show all claims, highest priority first
    List,
    /// Show which client is in control
    Controller,
    /// Assert a claim with a JSON payload
    Claim {
        /// Client name or id (default: own identity)
        #[arg(long)]
        client: Option<String>,
        /// e.g. '{"state":"active","charge_current":16}'
        payload: String,
    },
    /// Release a claim
    Release {
        #[arg(long)]
        client: Option<String>,
    },
    /// Show the client registry
    Clients,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;
    if let Some(url) = cli.url {
        config.api.base_url = url;
    }
    debug!(base_url = %config.api.base_url, "using controller");

    let store = ClaimStore::new(ReqwestApi::new(config.api)?, config.store);

    let output = match cli.command {
        Command::List => commands::list(&store).await?,
        Command::Controller => commands::controller(&store).await?,
        Command::Claim { client, payload } => {
            commands::claim(&store, client.as_deref(), &payload).await?
        }
        Command::Release { client } => commands::release(&store, client.as_deref()).await?,
        Command::Clients => commands::clients(store.registry()),
    };

    print!("{output}");
    if !output.ends_with('\n') {
        println!();
    }
    Ok(())
}
