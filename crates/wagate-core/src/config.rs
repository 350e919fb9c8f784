// ── Runtime gateway configuration ──
//
// Describes *where* the gateway lives and how patient to be with it.
// Never touches disk: wagate-config builds a `GatewayConfig` and hands
// it in.

use std::time::Duration;

use url::Url;
use wagate_api::{ReconnectConfig, SocketEndpoint, TransportConfig};

use crate::error::CoreError;

/// API base URL used when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001/api";

/// Configuration for talking to a single gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// API base URL, including the `/api` prefix.
    pub api_base_url: Url,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// Backoff settings for the realtime socket.
    pub reconnect: ReconnectConfig,
}

impl GatewayConfig {
    pub fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            timeout: Duration::from_secs(30),
            reconnect: ReconnectConfig::default(),
        }
    }

    /// Parse `url` as the API base.
    pub fn from_url(url: &str) -> Result<Self, CoreError> {
        let api_base_url = Url::parse(url).map_err(|e| CoreError::Config {
            message: format!("invalid API base URL '{url}': {e}"),
        })?;
        Ok(Self::new(api_base_url))
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig::with_timeout(self.timeout)
    }

    /// Socket.IO endpoint derived from the API base URL.
    pub fn socket_endpoint(&self) -> Result<SocketEndpoint, CoreError> {
        Ok(SocketEndpoint::from_api_base(&self.api_base_url)?)
    }
}
