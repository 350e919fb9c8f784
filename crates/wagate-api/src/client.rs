// Gateway HTTP client
//
// Wraps `reqwest::Client` with base-URL path construction, bearer-token
// injection, and `{code, message, data}` envelope unwrapping. Endpoint
// groups (auth, devices, messages) are implemented as inherent methods in
// separate files to keep this module focused on transport mechanics.

use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::Envelope;
use crate::transport::TransportConfig;

/// Raw HTTP client for the gateway API.
///
/// All methods return unwrapped `data` payloads -- the envelope is stripped
/// before the caller sees it. The client holds no credentials of its own;
/// authenticated calls take the bearer token as an argument so that the
/// session layer stays the single owner of it.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: Url,
}

impl GatewayClient {
    /// Create a client for the API rooted at `base_url`
    /// (e.g. `http://localhost:3001/api`).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// Parse `base_url` and wrap an existing `reqwest::Client`.
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Url::parse(base_url)?;
        Ok(Self { http, base_url })
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL for an API path: `{base}/{path}`.
    ///
    /// The base URL's own path (usually `/api`) is preserved, which a plain
    /// `Url::join` would drop when the base lacks a trailing slash.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let full = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Ok(Url::parse(&full)?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    fn request(&self, method: Method, url: Url, token: Option<&SecretString>) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Send a GET request and unwrap the envelope's `data`.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        url: Url,
        token: Option<&SecretString>,
    ) -> Result<T, Error> {
        debug!("GET {}", url);
        let resp = self
            .request(Method::GET, url, token)
            .send()
            .await
            .map_err(Error::Transport)?;
        require_data(parse_envelope(resp).await?)
    }

    /// Send a POST request with a JSON body and unwrap the envelope's `data`.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        url: Url,
        token: Option<&SecretString>,
        body: &impl Serialize,
    ) -> Result<T, Error> {
        debug!("POST {}", url);
        let resp = self
            .request(Method::POST, url, token)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;
        require_data(parse_envelope(resp).await?)
    }

    /// Send a bodiless request whose response payload is not needed.
    pub(crate) async fn send_unit(
        &self,
        method: Method,
        url: Url,
        token: Option<&SecretString>,
    ) -> Result<(), Error> {
        debug!("{} {}", method, url);
        let resp = self
            .request(method, url, token)
            .send()
            .await
            .map_err(Error::Transport)?;
        let _: Envelope<serde_json::Value> = parse_envelope(resp).await?;
        Ok(())
    }
}

// ── Envelope handling ────────────────────────────────────────────────

/// Read the response body and decode the `{code, message, data}` envelope.
///
/// Non-2xx HTTP statuses and envelope codes >= 400 become errors carrying
/// the server's `message` when the body has one, and no message otherwise.
/// An empty body on a 2xx response is treated as an envelope with no data.
async fn parse_envelope<T: DeserializeOwned>(resp: reqwest::Response) -> Result<Envelope<T>, Error> {
    let status = resp.status();
    let body = resp.text().await.map_err(Error::Transport)?;

    if !status.is_success() {
        let message = server_message(&body);
        if message.is_none() {
            debug!(%status, "error response without a gateway message");
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication { message });
        }
        return Err(Error::Api {
            status: status.as_u16(),
            message,
        });
    }

    if body.trim().is_empty() {
        return Ok(Envelope {
            code: Some(status.as_u16()),
            message: None,
            data: None,
        });
    }

    let envelope: Envelope<T> =
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: body.clone(),
        })?;

    match envelope.code {
        Some(code) if code >= 400 => Err(Error::Api {
            status: code,
            message: envelope.message.filter(|m| !m.is_empty()),
        }),
        _ => Ok(envelope),
    }
}

fn require_data<T>(envelope: Envelope<T>) -> Result<T, Error> {
    envelope.data.ok_or_else(|| Error::MissingData {
        message: envelope.message.unwrap_or_else(|| "empty response".into()),
    })
}

/// Pull `message` out of an error body without committing to a data type.
fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(serde_json::Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_owned)
}
