//! final-cut-backend: chat and scoring relay for the Final Cut detective game.

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use final_cut_backend::config::{Cli, Config, API_KEY_VARS};
use final_cut_backend::server::routes::{build_router, AppState};
use final_cut_backend::upstream::openai::OpenAiCompatClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "final_cut_backend=debug,tower_http=debug"
    } else {
        "final_cut_backend=info,tower_http=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .init();

    info!("final-cut-backend v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration once; handlers only ever see this snapshot.
    let config = Arc::new(Config::load(&cli.env_file));

    if config.upstream.api_key.is_none() {
        warn!(
            vars = ?API_KEY_VARS,
            "No API key configured, upstream calls will be rejected"
        );
    }

    info!(
        base_url = config.upstream.base_url,
        chat_model = config.chat.model,
        scoring_model = config.scoring.model,
        origins = ?config.allowed_origins,
        "Configuration loaded"
    );

    let provider = Arc::new(OpenAiCompatClient::new(&config.upstream)?);
    let state = Arc::new(AppState::new(config.clone(), provider));

    // Build the HTTP router.
    let app = build_router(state);

    // Start the server.
    let listen_addr = cli.listen;
    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening on {listen_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
