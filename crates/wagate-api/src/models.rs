// Gateway API wire types
//
// Request bodies and response payloads for the gateway's JSON API. Every
// response is wrapped in the `Envelope<T>` shape; the client strips it
// before callers see the payload. Field names follow the gateway's
// camelCase convention via `rename_all`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};

// ── Response Envelope ────────────────────────────────────────────────

/// Standard gateway response envelope.
///
/// ```json
/// { "code": 200, "message": "ok", "data": { ... } }
/// ```
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

// ── Identifiers ──────────────────────────────────────────────────────

/// Numeric device identifier assigned by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub i64);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for DeviceId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// ── Auth ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<&'a str>,
}

/// Profile of the signed-in account, from `/auth/me` and the login payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// The gateway has served this both as a JSON number and a string.
    #[serde(default, deserialize_with = "string_or_number")]
    pub phone_number: Option<String>,
}

/// `data` payload of a successful login or registration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: UserProfile,
}

// ── Devices ──────────────────────────────────────────────────────────

/// Persisted connection status of a device session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceStatus {
    Pending,
    Connected,
    Disconnected,
    #[serde(other)]
    Unknown,
}

/// Status reported by the gateway's live session registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LiveStatus {
    Pending,
    Connected,
    NotFound,
    #[serde(other)]
    Unknown,
}

/// A messaging device session owned by the signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: DeviceId,
    pub user_id: i64,
    pub session_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    pub status: DeviceStatus,
    #[serde(default = "unknown_live_status")]
    pub live_status: LiveStatus,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default, rename = "hasQR")]
    pub has_qr: Option<bool>,
    /// `None` when the gateway sent a timestamp that is not RFC 3339.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn unknown_live_status() -> LiveStatus {
    LiveStatus::Unknown
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeviceRequest<'a> {
    pub session_name: &'a str,
}

/// Encoding requested from the QR endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum QrFormat {
    /// PNG data URL in `qrImage`.
    #[default]
    Image,
    /// Raw pairing string in `qr` only.
    Raw,
}

/// QR pairing state of a device session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceQr {
    pub session_name: String,
    pub is_connected: bool,
    #[serde(default)]
    pub qr: Option<String>,
    #[serde(default)]
    pub qr_image: Option<String>,
}

// ── Messages ─────────────────────────────────────────────────────────

/// Type-specific part of an outgoing message.
///
/// Flattened into [`SendMessageRequest`], so the `type` tag and the
/// payload fields sit next to `deviceId` and `to` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    Text {
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    Image {
        media_base64: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        mimetype: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Document {
        media_base64: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        mimetype: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
}

impl MessageContent {
    pub fn text(message: impl Into<String>) -> Self {
        Self::Text {
            message: message.into(),
        }
    }

    /// Wire name of the message type.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::Document { .. } => "document",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub device_id: DeviceId,
    pub to: String,
    #[serde(flatten)]
    pub content: MessageContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReceipt {
    pub message_id: String,
}

/// Whether a device is currently able to send messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCapability {
    pub can_send: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

// ── Helpers ──────────────────────────────────────────────────────────

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// RFC 3339 (what the gateway's ORM emits), or a SQL-style
/// `YYYY-MM-DD HH:MM:SS` taken as UTC. Anything else becomes `None`
/// rather than failing the whole payload.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<serde_json::Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let serde_json::Value::String(raw) = raw else {
        return Ok(None);
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    Ok(
        chrono::NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc()),
    )
}
