//! Dashboard controller: the state machine between the panel and the
//! remote strategy engine.
//!
//! Owns the UI-visible state, refreshes it on a fixed timer, and sequences
//! start/stop mutations against the engine. The polling loop is a task owned
//! by the controller and aborted on shutdown; a request that resolves after
//! shutdown never touches the state.
//!
//! Each feed carries a failure policy: a `critical` feed's failures land in
//! the operator-facing error message, a `best-effort` feed's failures only
//! hit the log. Defaults keep status critical and VWAP best-effort.

use crate::client::{ClientError, ControlAction, StrategyApi, StrategyStatus, VwapSnapshot};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How a feed's failures are surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Criticality {
    /// Failures set the operator-facing error message.
    Critical,
    /// Failures are logged and otherwise swallowed.
    BestEffort,
}

/// Per-feed failure policy.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FeedPolicy {
    #[serde(default = "default_status_criticality")]
    pub status: Criticality,
    #[serde(default = "default_vwap_criticality")]
    pub vwap: Criticality,
}

fn default_status_criticality() -> Criticality {
    Criticality::Critical
}

fn default_vwap_criticality() -> Criticality {
    Criticality::BestEffort
}

impl Default for FeedPolicy {
    fn default() -> Self {
        Self {
            status: default_status_criticality(),
            vwap: default_vwap_criticality(),
        }
    }
}

/// State rendered by the panel. `loading` is true only while a start/stop
/// mutation is in flight, never during background polling. `error` holds
/// the most recent critical-feed or mutation failure.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UiState {
    pub status: Option<StrategyStatus>,
    pub vwap: Option<VwapSnapshot>,
    pub loading: bool,
    pub error: Option<String>,
}

struct Inner<C> {
    api: C,
    policy: FeedPolicy,
    state: Mutex<UiState>,
    closed: AtomicBool,
}

pub struct DashboardController<C: StrategyApi> {
    inner: Arc<Inner<C>>,
    poll_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl<C: StrategyApi + 'static> DashboardController<C> {
    pub fn new(api: C, policy: FeedPolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                policy,
                state: Mutex::new(UiState::default()),
                closed: AtomicBool::new(false),
            }),
            poll_task: std::sync::Mutex::new(None),
        }
    }

    /// Arm the polling loop. The first tick fires immediately (initial
    /// refresh of both feeds), then every `period` after that. Ticks are
    /// never gated on earlier ticks or on an in-flight mutation; overlapping
    /// responses resolve last-writer-wins.
    pub fn spawn_poller(&self, period: Duration) {
        let inner = self.inner.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                tokio::join!(inner.refresh_status(), inner.refresh_vwap());
            }
        });
        if let Ok(mut task) = self.poll_task.lock() {
            *task = Some(handle);
        }
    }

    pub async fn refresh_status(&self) {
        self.inner.refresh_status().await;
    }

    pub async fn refresh_vwap(&self) {
        self.inner.refresh_vwap().await;
    }

    /// Start the strategy. Returns false without issuing any request when a
    /// mutation is already in flight, the strategy is already running, or no
    /// status snapshot has arrived yet.
    pub async fn start(&self) -> bool {
        self.inner.mutate(ControlAction::Start).await
    }

    /// Stop the strategy. Guarded symmetrically to [`start`](Self::start).
    pub async fn stop(&self) -> bool {
        self.inner.mutate(ControlAction::Stop).await
    }

    pub async fn snapshot(&self) -> UiState {
        self.inner.state.lock().await.clone()
    }

    /// Positions passthrough for the panel's JSON endpoint. Not part of the
    /// polled state.
    pub async fn positions(&self) -> Result<serde_json::Value, ClientError> {
        self.inner.api.positions().await
    }

    /// Tear down the polling loop. Late-resolving requests become no-ops.
    pub fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        if let Ok(mut task) = self.poll_task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }
}

impl<C: StrategyApi> Drop for DashboardController<C> {
    fn drop(&mut self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        if let Ok(mut task) = self.poll_task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }
}

impl<C: StrategyApi> Inner<C> {
    /// Apply a state change unless the controller has been shut down.
    async fn apply<F: FnOnce(&mut UiState)>(&self, f: F) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        let mut state = self.state.lock().await;
        f(&mut state);
    }

    async fn refresh_status(&self) {
        match self.api.status().await {
            Ok(status) => {
                debug!(is_running = status.is_running, status = %status.status, "status refreshed");
                self.apply(|s| {
                    s.status = Some(status);
                    s.error = None;
                })
                .await;
            }
            Err(e) => {
                let msg = failure_message(&e, "Failed to fetch status");
                match self.policy.status {
                    Criticality::Critical => self.apply(|s| s.error = Some(msg)).await,
                    Criticality::BestEffort => warn!(error = %msg, "status refresh failed"),
                }
            }
        }
    }

    async fn refresh_vwap(&self) {
        match self.api.vwap().await {
            Ok(snap) => {
                debug!(vwap = ?snap.vwap, price = ?snap.current_price, "vwap refreshed");
                self.apply(|s| s.vwap = Some(snap)).await;
            }
            Err(e) => {
                let msg = failure_message(&e, "Failed to fetch VWAP");
                match self.policy.vwap {
                    Criticality::Critical => self.apply(|s| s.error = Some(msg)).await,
                    Criticality::BestEffort => warn!(error = %msg, "vwap refresh failed"),
                }
            }
        }
    }

    async fn mutate(&self, action: ControlAction) -> bool {
        {
            let mut state = self.state.lock().await;
            let running = state.status.as_ref().map(|s| s.is_running);
            let blocked = state.loading
                || match action {
                    ControlAction::Start => running != Some(false),
                    ControlAction::Stop => running != Some(true),
                };
            if blocked {
                debug!(action = action.as_str(), "mutation blocked");
                return false;
            }
            state.loading = true;
            state.error = None;
        }

        match self.api.control(action).await {
            Ok(ack) => {
                info!(
                    action = action.as_str(),
                    success = ack.success,
                    message = %ack.message,
                    "control ack"
                );
            }
            Err(e) => {
                let fallback = match action {
                    ControlAction::Start => "Failed to start strategy",
                    ControlAction::Stop => "Failed to stop strategy",
                };
                let msg = failure_message(&e, fallback);
                warn!(action = action.as_str(), error = %msg, "control request failed");
                self.apply(|s| s.error = Some(msg)).await;
            }
        }

        // Reconcile against remote truth. The refresh outcome is
        // authoritative over the mutation's recorded error.
        self.refresh_status().await;

        self.apply(|s| s.loading = false).await;
        true
    }
}

fn failure_message(err: &ClientError, fallback: &str) -> String {
    let msg = err.to_string();
    if msg.trim().is_empty() {
        fallback.to_string()
    } else {
        msg
    }
}
