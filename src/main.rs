use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use vwap_panel::client::RemoteClient;
use vwap_panel::config::Config;
use vwap_panel::controller::DashboardController;
use vwap_panel::panel::{self, PanelState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Load config
    let config = if Path::new("panel.toml").exists() {
        Config::load(Path::new("panel.toml"))?
    } else {
        Config::from_env()
    };

    // Initialize logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .init();
    }

    info!("vwap-panel v{} starting", env!("CARGO_PKG_VERSION"));

    // --- Controller + polling loop ---
    let client = RemoteClient::new(config.api.base_url.clone());
    let controller = Arc::new(DashboardController::new(client, config.feeds));
    controller.spawn_poller(Duration::from_millis(config.panel.refresh_interval_ms));
    info!(
        api = %config.api.base_url,
        interval_ms = config.panel.refresh_interval_ms,
        "polling started"
    );

    // --- Panel server ---
    let state = PanelState {
        controller: controller.clone(),
    };
    let bind = config.panel.bind.clone();
    let server = tokio::spawn(async move {
        if let Err(e) = panel::serve(state, &bind).await {
            error!(error = %e, "panel server error");
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("shutting down...");
    controller.shutdown();
    server.abort();

    Ok(())
}
