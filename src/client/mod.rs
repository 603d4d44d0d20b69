//! Typed HTTP client for the strategy engine's REST API.
//!
//! Stateless: one reqwest client, every operation is a single
//! request/response against the configured base URL. No retries, no auth
//! headers, transport-default timeouts. Response bodies are decoded against
//! the expected schema at this boundary, so a bad payload surfaces as
//! `ClientError::Malformed` here instead of failing somewhere downstream.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Engine-side strategy parameters, reported with every status snapshot.
/// Read-only from the panel's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub vwap_deviation: f64,
    pub timer_interval: u64,
    pub contract_size: u32,
    pub instrument: String,
}

/// Authoritative remote state as of the last poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyStatus {
    pub is_running: bool,
    pub status: String,
    pub config: StrategyConfig,
}

/// VWAP snapshot. `vwap` stays None until the engine has computed one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VwapSnapshot {
    pub vwap: Option<f64>,
    pub current_price: Option<f64>,
    pub deviation: f64,
    pub long_entry: Option<f64>,
    pub short_entry: Option<f64>,
}

/// Ack from the control endpoint. The backend also echoes a status blob;
/// only the fields we act on are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlAck {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Start,
    Stop,
}

impl ControlAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlAction::Start => "start",
            ControlAction::Stop => "stop",
        }
    }
}

/// The five backend operations. The controller is written against this
/// trait; [`RemoteClient`] is the production implementation.
#[async_trait]
pub trait StrategyApi: Send + Sync {
    async fn status(&self) -> Result<StrategyStatus, ClientError>;
    async fn vwap(&self) -> Result<VwapSnapshot, ClientError>;
    async fn positions(&self) -> Result<serde_json::Value, ClientError>;
    async fn control(&self, action: ControlAction) -> Result<ControlAck, ClientError>;
}

#[async_trait]
impl<T: StrategyApi + ?Sized> StrategyApi for Arc<T> {
    async fn status(&self) -> Result<StrategyStatus, ClientError> {
        (**self).status().await
    }
    async fn vwap(&self) -> Result<VwapSnapshot, ClientError> {
        (**self).vwap().await
    }
    async fn positions(&self) -> Result<serde_json::Value, ClientError> {
        (**self).positions().await
    }
    async fn control(&self, action: ControlAction) -> Result<ControlAck, ClientError> {
        (**self).control(action).await
    }
}

/// HTTP client for the strategy engine REST API.
pub struct RemoteClient {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.get(&url).send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        decode_body(status, &body)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        decode_body(status, &body)
    }
}

/// Map a response to a typed record: non-2xx becomes `Api`, an undecodable
/// body becomes `Malformed`.
fn decode_body<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, ClientError> {
    if status >= 400 {
        return Err(ClientError::Api {
            status,
            body: body.to_string(),
        });
    }
    serde_json::from_str(body).map_err(|e| ClientError::Malformed(e.to_string()))
}

#[async_trait]
impl StrategyApi for RemoteClient {
    async fn status(&self) -> Result<StrategyStatus, ClientError> {
        self.get_json("/api/v1/strategy/status").await
    }

    async fn vwap(&self) -> Result<VwapSnapshot, ClientError> {
        self.get_json("/api/v1/strategy/vwap").await
    }

    async fn positions(&self) -> Result<serde_json::Value, ClientError> {
        self.get_json("/api/v1/strategy/positions").await
    }

    async fn control(&self, action: ControlAction) -> Result<ControlAck, ClientError> {
        let body = serde_json::json!({ "action": action.as_str() });
        debug!(action = action.as_str(), "sending control request");
        self.post_json("/api/v1/strategy/control", &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_status_payload() {
        let body = r#"{
            "is_running": false,
            "status": "idle",
            "config": {
                "vwap_deviation": 0.5,
                "timer_interval": 300,
                "contract_size": 1,
                "instrument": "ES"
            }
        }"#;
        let status: StrategyStatus = decode_body(200, body).unwrap();
        assert!(!status.is_running);
        assert_eq!(status.status, "idle");
        assert_eq!(status.config.timer_interval, 300);
        assert_eq!(status.config.instrument, "ES");
    }

    #[test]
    fn decodes_vwap_with_null_fields() {
        let body = r#"{
            "vwap": null,
            "current_price": null,
            "deviation": 0.5,
            "long_entry": null,
            "short_entry": null
        }"#;
        let snap: VwapSnapshot = decode_body(200, body).unwrap();
        assert!(snap.vwap.is_none());
        assert!(snap.long_entry.is_none());
        assert_eq!(snap.deviation, 0.5);
    }

    #[test]
    fn control_ack_ignores_extra_fields() {
        let body = r#"{"success": true, "message": "Strategy started", "status": {"is_running": true}}"#;
        let ack: ControlAck = decode_body(200, body).unwrap();
        assert!(ack.success);
        assert_eq!(ack.message, "Strategy started");
    }

    #[test]
    fn non_2xx_maps_to_api_error() {
        let err = decode_body::<StrategyStatus>(500, "engine offline").unwrap_err();
        match err {
            ClientError::Api { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "engine offline");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn bad_schema_maps_to_malformed() {
        let err = decode_body::<StrategyStatus>(200, r#"{"unexpected": 1}"#).unwrap_err();
        assert!(matches!(err, ClientError::Malformed(_)));
    }
}
