// Pitch comparison server entry point.
//
// Startup sequence:
// 1. Initialize tracing
// 2. Load config
// 3. Build the external-service clients
// 4. Create mpsc channel between transport and app loop
// 5. Spawn WebSocket server task
// 6. Run app logic until shutdown

use pitch_compare::app;
use pitch_compare::config;
use pitch_compare::lookup::MlbLookupClient;
use pitch_compare::statcast::SavantClient;
use pitch_compare::ws_server;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Pitch comparison server starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: ws port {}, exports to {}",
        config.ws_port, config.export_dir
    );

    // 3. Build the external-service clients
    let identity = MlbLookupClient::from_config(&config.lookup)
        .context("failed to build identity lookup client")?;
    let source = SavantClient::from_config(&config.statcast)
        .context("failed to build statcast client")?;

    // 4. Create the transport channel and application state
    let (ws_tx, ws_rx) = mpsc::channel(64);
    let ws_port = config.ws_port;
    let app_state = app::AppState::new(config, identity, source);

    // 5. Spawn WebSocket server task
    let listener = ws_server::WsListener::bind(ws_port)
        .await
        .with_context(|| format!("failed to bind WebSocket server on port {ws_port}"))?;
    info!(
        "Dashboard endpoint listening on {}",
        listener.local_addr()?
    );
    let ws_handle = tokio::spawn(async move {
        if let Err(e) = ws_server::run(listener, ws_tx).await {
            error!("WebSocket server error: {}", e);
        }
    });

    // 6. Spawn app logic task and wait for Ctrl+C
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(ws_rx, app_state).await {
            error!("Application loop error: {}", e);
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    ws_handle.abort();
    app_handle.abort();

    info!("Pitch comparison server shut down cleanly");
    Ok(())
}

/// Initialize tracing to stderr with an env-filter override.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pitch_compare=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
