//! Axum-served operator panel.
//!
//! Provides:
//!   GET  /                → HTML dashboard (auto-refresh 5s)
//!   GET  /api/state       → JSON UiState snapshot
//!   GET  /api/positions   → JSON positions passthrough
//!   POST /control/start   → start the strategy, redirect to /
//!   POST /control/stop    → stop the strategy, redirect to /
//!
//! All state machine behavior lives in the controller; this module only
//! renders snapshots and forwards operator actions.

use crate::client::StrategyApi;
use crate::controller::{DashboardController, UiState};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Redirect};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tracing::{error, info};

/// Shared state for the panel routes.
pub struct PanelState<C: StrategyApi> {
    pub controller: Arc<DashboardController<C>>,
}

impl<C: StrategyApi> Clone for PanelState<C> {
    fn clone(&self) -> Self {
        Self {
            controller: self.controller.clone(),
        }
    }
}

/// Build the Axum router.
pub fn build_router<C: StrategyApi + 'static>(state: PanelState<C>) -> Router {
    Router::new()
        .route("/", get(panel_html::<C>))
        .route("/api/state", get(api_state::<C>))
        .route("/api/positions", get(api_positions::<C>))
        .route("/control/start", post(control_start::<C>))
        .route("/control/stop", post(control_stop::<C>))
        .with_state(state)
}

/// Start the panel server.
pub async fn serve<C: StrategyApi + 'static>(
    state: PanelState<C>,
    bind_addr: &str,
) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = bind_addr, "panel listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// --- Handlers ---

async fn panel_html<C: StrategyApi + 'static>(
    State(state): State<PanelState<C>>,
) -> Html<String> {
    Html(render_page(&state.controller.snapshot().await))
}

async fn api_state<C: StrategyApi + 'static>(
    State(state): State<PanelState<C>>,
) -> Json<UiState> {
    Json(state.controller.snapshot().await)
}

async fn api_positions<C: StrategyApi + 'static>(
    State(state): State<PanelState<C>>,
) -> impl IntoResponse {
    match state.controller.positions().await {
        Ok(payload) => Json(payload).into_response(),
        Err(e) => {
            error!(error = %e, "positions fetch failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn control_start<C: StrategyApi + 'static>(
    State(state): State<PanelState<C>>,
) -> Redirect {
    state.controller.start().await;
    Redirect::to("/")
}

async fn control_stop<C: StrategyApi + 'static>(
    State(state): State<PanelState<C>>,
) -> Redirect {
    state.controller.stop().await;
    Redirect::to("/")
}

// --- HTML rendering ---

fn fmt_px(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => "N/A".to_string(),
    }
}

/// Render the dashboard page for a state snapshot.
pub fn render_page(state: &UiState) -> String {
    let error_banner = match &state.error {
        Some(err) => format!(r#"<div class="banner">{err}</div>"#),
        None => String::new(),
    };

    let (status_section, config_section) = match &state.status {
        Some(status) => {
            let (badge_class, badge_text) = if status.is_running {
                ("badge-running", "Running")
            } else {
                ("badge-stopped", "Stopped")
            };
            let start_disabled = if state.loading || status.is_running {
                " disabled"
            } else {
                ""
            };
            let stop_disabled = if state.loading || !status.is_running {
                " disabled"
            } else {
                ""
            };

            let status_section = format!(
                r#"<div class="cards">
  <div class="card"><div class="label">Status</div><div class="value"><span class="badge {badge_class}">{badge_text}</span></div></div>
  <div class="card"><div class="label">Engine</div><div class="value">{engine}</div></div>
</div>
<div class="controls">
  <form method="post" action="/control/start"><button class="btn btn-start"{start_disabled}>Start Strategy</button></form>
  <form method="post" action="/control/stop"><button class="btn btn-stop"{stop_disabled}>Stop Strategy</button></form>
</div>"#,
                engine = status.status,
            );

            let cfg = &status.config;
            let minutes = (cfg.timer_interval as f64 / 60.0).round() as u64;
            let config_section = format!(
                r#"<h2>Configuration</h2>
<div class="grid">
  <div class="item"><div class="label">VWAP Deviation</div><div class="value">{deviation}</div></div>
  <div class="item"><div class="label">Timer Interval</div><div class="value">{interval}s ({minutes}min)</div></div>
  <div class="item"><div class="label">Contract Size</div><div class="value">{size}</div></div>
  <div class="item"><div class="label">Instrument</div><div class="value">{instrument}</div></div>
</div>"#,
                deviation = cfg.vwap_deviation,
                interval = cfg.timer_interval,
                size = cfg.contract_size,
                instrument = cfg.instrument,
            );

            (status_section, config_section)
        }
        None => (
            r#"<div class="empty">Waiting for first status snapshot</div>"#.to_string(),
            String::new(),
        ),
    };

    // The VWAP card only renders once the engine has a computed VWAP.
    let vwap_section = match state.vwap.as_ref().filter(|v| v.vwap.is_some()) {
        Some(v) => format!(
            r#"<h2>VWAP</h2>
<div class="grid">
  <div class="item"><div class="label">Current VWAP</div><div class="value">{vwap}</div></div>
  <div class="item"><div class="label">Current Price</div><div class="value">{price}</div></div>
  <div class="item"><div class="label">Deviation</div><div class="value">{deviation}</div></div>
  <div class="item"><div class="label">Long Entry</div><div class="value long">{long}</div></div>
  <div class="item"><div class="label">Short Entry</div><div class="value short">{short}</div></div>
</div>"#,
            vwap = fmt_px(v.vwap),
            price = fmt_px(v.current_price),
            deviation = v.deviation,
            long = fmt_px(v.long_entry),
            short = fmt_px(v.short_entry),
        ),
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta http-equiv="refresh" content="5">
<title>VWAP Strategy Panel</title>
<style>
  * {{ margin: 0; padding: 0; box-sizing: border-box; }}
  body {{ font-family: 'SF Mono', 'Fira Code', monospace; background: #0d1117; color: #c9d1d9; padding: 20px; }}
  h1 {{ color: #58a6ff; margin-bottom: 20px; font-size: 1.4em; }}
  h2 {{ color: #8b949e; margin: 20px 0 10px 0; font-size: 1.1em; border-bottom: 1px solid #21262d; padding-bottom: 5px; }}
  .banner {{ background: #3d1d1d; border: 1px solid #e74c3c; color: #ff7b72; border-radius: 6px; padding: 10px 14px; margin-bottom: 15px; }}
  .cards {{ display: flex; gap: 15px; margin-bottom: 15px; flex-wrap: wrap; }}
  .card {{ background: #161b22; border: 1px solid #30363d; border-radius: 8px; padding: 15px 20px; min-width: 160px; }}
  .card .label {{ color: #8b949e; font-size: 0.75em; text-transform: uppercase; letter-spacing: 1px; }}
  .card .value {{ font-size: 1.5em; font-weight: bold; margin-top: 4px; }}
  .grid {{ display: grid; grid-template-columns: repeat(auto-fill, minmax(180px, 1fr)); gap: 10px; margin-bottom: 20px; }}
  .item {{ background: #161b22; border: 1px solid #30363d; border-radius: 6px; padding: 10px 14px; }}
  .item .label {{ color: #8b949e; font-size: 0.7em; text-transform: uppercase; }}
  .item .value {{ font-size: 1.1em; font-weight: bold; margin-top: 2px; }}
  .value.long {{ color: #2ecc71; }}
  .value.short {{ color: #e74c3c; }}
  .badge {{ display: inline-block; padding: 2px 8px; border-radius: 3px; font-size: 0.7em; font-weight: bold; }}
  .badge-running {{ background: #238636; color: #fff; }}
  .badge-stopped {{ background: #30363d; color: #8b949e; }}
  .controls {{ display: flex; gap: 10px; margin-bottom: 20px; }}
  .btn {{ padding: 8px 16px; border: none; border-radius: 6px; font-weight: bold; cursor: pointer; }}
  .btn:disabled {{ opacity: 0.4; cursor: not-allowed; }}
  .btn-start {{ background: #238636; color: #fff; }}
  .btn-stop {{ background: #da3633; color: #fff; }}
  .empty {{ color: #666; padding: 15px 0; }}
  .auto {{ color: #484f58; font-size: 0.7em; margin-top: 15px; }}
</style>
</head>
<body>
<h1>VWAP Strategy &mdash; Control Panel</h1>
{error_banner}
<h2>Strategy Status</h2>
{status_section}
{config_section}
{vwap_section}
<div class="auto">Auto-refresh 5s | API: /api/state, /api/positions</div>
</body>
</html>"#
    )
}
