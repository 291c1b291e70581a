use anyhow::{Result, anyhow};
use clap::Parser;

use notedate::auth::token_manager::TokenManager;
use notedate::auth::tokens_file;
use notedate::config::load_config;
use notedate::service::http::ServiceClient;
use notedate::sync::{self, SyncConfig};

#[derive(Parser)]
#[command(name = "notedate")]
#[command(about = "Set note creation dates from YYYYMMDD dates in titles", long_about = None)]
struct Cli {
    /// Notebook to process (overrides the config file)
    #[arg(long)]
    notebook: Option<String>,

    /// Service base URL (overrides the config file)
    #[arg(long)]
    server: Option<String>,

    /// Discard the cached access token and authorize again
    #[arg(long)]
    reauth: bool,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let cfg = load_config().map_err(|e| anyhow!("Configuration error: {e}"))?;

    println!("Starting note date updater...");

    let notebook = cli.notebook.clone().or_else(|| cfg.notebook.clone());
    let token_mgr = TokenManager::new(cfg, cli.server.as_deref());

    if cli.reauth {
        tokens_file::clear_tokens()?;
    }
    let access_token = token_mgr
        .get_access_token(cli.reauth)
        .map_err(|e| anyhow!("Failed to get access token: {e}"))?;

    let store = ServiceClient::new(token_mgr.server(), &access_token)?;
    sync::run_sync(&store, &SyncConfig::default(), notebook.as_deref())
}
