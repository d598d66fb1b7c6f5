use std::time::Duration;

use clap::Parser;
use gkp_connect::{GoogleProvider, RelayClient, RelayConfig, RelayError, RelayServer, ServerConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "gkp-connect",
    about = "Relay a Google sign-in and an Apify API token to the GKP backend."
)]
struct Args {
    /// Google OAuth client id (public).
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    client_id: Option<String>,

    #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// Public base URL of this relay; defaults to the listen address.
    #[arg(long, env = "FRONTEND_URL")]
    frontend_url: Option<String>,

    /// Base URL of the GKP backend receiving the credential bundle.
    #[arg(long, env = "GKP_BACKEND_URL")]
    backend_url: String,

    #[arg(long, env = "RELAY_HOST", default_value = "127.0.0.1")]
    host: String,

    #[arg(long, env = "RELAY_PORT", default_value_t = 3000)]
    port: u16,

    #[arg(long, default_value_t = 900)]
    session_ttl_secs: u64,

    /// Timeout for provider and backend requests.
    #[arg(long)]
    http_timeout_secs: Option<u64>,

    /// Open the authorize page in the default browser once listening.
    #[arg(long)]
    open: bool,
}

#[tokio::main]
async fn main() -> Result<(), RelayError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let server_config = ServerConfig::new(args.host.clone(), args.port);
    let frontend_url = args
        .frontend_url
        .clone()
        .unwrap_or_else(|| server_config.local_url());

    let mut config = RelayConfig::new(frontend_url, args.backend_url.clone())
        .with_session_ttl(Duration::from_secs(args.session_ttl_secs));
    if let Some(client_id) = args.client_id {
        config = config.with_client_id(client_id);
    }
    if let Some(client_secret) = args.client_secret {
        config = config.with_client_secret(client_secret);
    }
    if let Some(secs) = args.http_timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }

    if config.client_id.is_none() {
        tracing::warn!("GOOGLE_CLIENT_ID is not set; sign-in will show a configuration error");
    }
    tracing::info!(
        redirect_uri = %config.redirect_uri(),
        backend = %config.backend_url,
        "relay configured"
    );

    let authorize_url = format!("{}/authorize", config.frontend_url);
    let client = RelayClient::new(GoogleProvider::new(), config)?;
    let server = RelayServer::new(client);
    let listener = RelayServer::bind(&server_config).await?;

    if args.open {
        eprintln!("Authorization page:\n{authorize_url}");
        if let Err(err) = webbrowser::open(&authorize_url) {
            eprintln!("Failed to open browser automatically: {err}");
        }
    }

    server.serve(listener).await
}
