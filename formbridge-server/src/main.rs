//! formbridge HTTP server: OAuth login, form definitions and submissions.

mod auth;
mod error;
mod routes;
mod session;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use formbridge::io::airtable::AirtableClient;
use formbridge::io::config::load_config;
use formbridge::io::oauth::AirtableOAuth;
use formbridge::io::store::JsonStore;
use tracing::info;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "formbridge-server")]
#[command(about = "HTTP API for conditional forms backed by Airtable")]
struct Args {
    /// Path to the TOML config file (defaults apply when missing)
    #[arg(long, default_value = "formbridge.toml")]
    config: PathBuf,

    /// Address to bind the server to (overrides `server.bind`)
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on (overrides `server.port`)
    #[arg(long)]
    port: Option<u16>,

    /// OAuth client id (overrides `oauth.client_id`)
    #[arg(long, env = "FORMBRIDGE_CLIENT_ID")]
    client_id: Option<String>,

    /// OAuth client secret (overrides `oauth.client_secret`)
    #[arg(long, env = "FORMBRIDGE_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("formbridge_server=info".parse()?)
                .add_directive("formbridge=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(client_id) = args.client_id {
        config.oauth.client_id = client_id;
    }
    if args.client_secret.is_some() {
        config.oauth.client_secret = args.client_secret;
    }
    config.validate_credentials()?;

    let store = JsonStore::open(&config.store.data_dir)
        .with_context(|| format!("open store {}", config.store.data_dir.display()))?;
    let remote = Arc::new(AirtableClient::new(&config.airtable)?);
    let oauth = Arc::new(AirtableOAuth::new(
        &config.oauth,
        config.airtable.request_timeout_secs,
    )?);
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    info!(
        data_dir = %config.store.data_dir.display(),
        frontend_url = %config.server.frontend_url,
        "starting formbridge-server"
    );

    let state = AppState::new(config, store, remote, oauth);
    let app = routes::app(state)?;

    info!(addr = %addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
