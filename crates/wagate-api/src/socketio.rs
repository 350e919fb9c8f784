//! Engine.IO v4 / Socket.IO v5 text framing.
//!
//! The gateway's notification channel is a Socket.IO server. Over the
//! websocket transport each text frame is one Engine.IO packet; Engine.IO
//! `message` packets carry one Socket.IO packet:
//!
//! ```text
//! 0{"sid":"..","pingInterval":25000,"pingTimeout":20000}   engine open
//! 2 / 3                                                    ping / pong
//! 40                                                       socket connect "/"
//! 42["qr",{"sessionName":"sales","qr":"2@abc"}]            socket event
//! ```
//!
//! Binary attachments are not used by the gateway and are rejected.

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::Error;

/// Engine.IO protocol revision spoken by this client.
pub const ENGINE_IO_VERSION: &str = "4";

const DEFAULT_NAMESPACE: &str = "/";

// ── Endpoint ─────────────────────────────────────────────────────────

/// Where to open the socket and which namespace to join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketEndpoint {
    pub url: Url,
    pub namespace: String,
}

impl SocketEndpoint {
    /// Derive the socket endpoint from the HTTP API base URL.
    ///
    /// The socket server is mounted at the API origin, not under the API
    /// prefix: the first `api` path segment is removed, and whatever path
    /// remains names the Socket.IO namespace. The scheme is switched to
    /// `ws`/`wss` and the Engine.IO query is appended.
    pub fn from_api_base(api_base: &Url) -> Result<Self, Error> {
        let mut segments: Vec<&str> = api_base
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();
        if let Some(pos) = segments.iter().position(|seg| *seg == "api") {
            segments.remove(pos);
        }
        let namespace = if segments.is_empty() {
            DEFAULT_NAMESPACE.to_owned()
        } else {
            format!("/{}", segments.join("/"))
        };

        let scheme = match api_base.scheme() {
            "https" | "wss" => "wss",
            "http" | "ws" => "ws",
            other => {
                return Err(Error::WebSocketConnect(format!(
                    "unsupported URL scheme for socket: {other}"
                )));
            }
        };
        let host = api_base
            .host_str()
            .ok_or_else(|| Error::WebSocketConnect("API base URL has no host".into()))?;
        let authority = match api_base.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_owned(),
        };

        let url = Url::parse(&format!(
            "{scheme}://{authority}/socket.io/?EIO={ENGINE_IO_VERSION}&transport=websocket"
        ))?;
        Ok(Self { url, namespace })
    }
}

// ── Engine.IO ────────────────────────────────────────────────────────

/// Session parameters sent by the server in the `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

/// One Engine.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn decode(frame: &str) -> Result<Self, Error> {
        let mut chars = frame.chars();
        let kind = chars
            .next()
            .ok_or_else(|| Error::Protocol("empty engine frame".into()))?;
        let rest = chars.as_str();
        match kind {
            '0' => serde_json::from_str(rest)
                .map(Self::Open)
                .map_err(|e| Error::Protocol(format!("bad open packet: {e}"))),
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping(rest.to_owned())),
            '3' => Ok(Self::Pong(rest.to_owned())),
            '4' => Ok(Self::Message(rest.to_owned())),
            '5' => Ok(Self::Upgrade),
            '6' => Ok(Self::Noop),
            other => Err(Error::Protocol(format!("unknown engine packet type {other:?}"))),
        }
    }

    /// Encode a client-originated packet. `Open` is server-only and
    /// encodes as its bare type digit.
    pub fn encode(&self) -> String {
        match self {
            Self::Open(_) => "0".into(),
            Self::Close => "1".into(),
            Self::Ping(data) => format!("2{data}"),
            Self::Pong(data) => format!("3{data}"),
            Self::Message(data) => format!("4{data}"),
            Self::Upgrade => "5".into(),
            Self::Noop => "6".into(),
        }
    }
}

// ── Socket.IO ────────────────────────────────────────────────────────

/// One Socket.IO packet, carried inside an Engine.IO `message`.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        ack_id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        ack_id: u64,
        args: Vec<Value>,
    },
    ConnectError {
        namespace: String,
        data: Option<Value>,
    },
}

impl SocketPacket {
    pub fn connect(namespace: &str) -> Self {
        Self::Connect {
            namespace: namespace.to_owned(),
            data: None,
        }
    }

    /// An event with a single argument, the shape `emit(name, arg)` produces.
    pub fn event(namespace: &str, name: &str, arg: Value) -> Self {
        Self::Event {
            namespace: namespace.to_owned(),
            ack_id: None,
            name: name.to_owned(),
            args: vec![arg],
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            Self::Connect { namespace, .. }
            | Self::Disconnect { namespace }
            | Self::Event { namespace, .. }
            | Self::Ack { namespace, .. }
            | Self::ConnectError { namespace, .. } => namespace,
        }
    }

    pub fn decode(payload: &str) -> Result<Self, Error> {
        let mut chars = payload.chars();
        let kind = chars
            .next()
            .ok_or_else(|| Error::Protocol("empty socket packet".into()))?;
        let mut rest = chars.as_str();

        if matches!(kind, '5' | '6') {
            return Err(Error::Protocol("binary socket packets are not supported".into()));
        }

        let namespace = if rest.starts_with('/') {
            let end = rest.find(',').unwrap_or(rest.len());
            let ns = &rest[..end];
            rest = rest.get(end + 1..).unwrap_or("");
            ns.to_owned()
        } else {
            DEFAULT_NAMESPACE.to_owned()
        };

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let ack_id = if digits > 0 {
            let id = rest[..digits]
                .parse::<u64>()
                .map_err(|e| Error::Protocol(format!("bad ack id: {e}")))?;
            rest = &rest[digits..];
            Some(id)
        } else {
            None
        };

        let data: Option<Value> = if rest.is_empty() {
            None
        } else {
            Some(
                serde_json::from_str(rest)
                    .map_err(|e| Error::Protocol(format!("bad socket payload: {e}")))?,
            )
        };

        match kind {
            '0' => Ok(Self::Connect { namespace, data }),
            '1' => Ok(Self::Disconnect { namespace }),
            '2' => {
                let mut args = match data {
                    Some(Value::Array(items)) => items,
                    _ => return Err(Error::Protocol("event payload is not an array".into())),
                };
                if args.is_empty() {
                    return Err(Error::Protocol("event without a name".into()));
                }
                let name = match args.remove(0) {
                    Value::String(name) => name,
                    other => {
                        return Err(Error::Protocol(format!("event name is not a string: {other}")));
                    }
                };
                Ok(Self::Event {
                    namespace,
                    ack_id,
                    name,
                    args,
                })
            }
            '3' => {
                let ack_id =
                    ack_id.ok_or_else(|| Error::Protocol("ack packet without an id".into()))?;
                let args = match data {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                };
                Ok(Self::Ack {
                    namespace,
                    ack_id,
                    args,
                })
            }
            '4' => Ok(Self::ConnectError { namespace, data }),
            other => Err(Error::Protocol(format!("unknown socket packet type {other:?}"))),
        }
    }

    pub fn encode(&self) -> String {
        let (kind, namespace) = match self {
            Self::Connect { namespace, .. } => ('0', namespace),
            Self::Disconnect { namespace } => ('1', namespace),
            Self::Event { namespace, .. } => ('2', namespace),
            Self::Ack { namespace, .. } => ('3', namespace),
            Self::ConnectError { namespace, .. } => ('4', namespace),
        };

        let mut out = String::new();
        out.push(kind);
        if namespace != DEFAULT_NAMESPACE {
            out.push_str(namespace);
            out.push(',');
        }

        match self {
            Self::Connect { data, .. } | Self::ConnectError { data, .. } => {
                if let Some(data) = data {
                    out.push_str(&data.to_string());
                }
            }
            Self::Disconnect { .. } => {}
            Self::Event {
                ack_id, name, args, ..
            } => {
                if let Some(id) = ack_id {
                    out.push_str(&id.to_string());
                }
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Value::String(name.clone()));
                items.extend(args.iter().cloned());
                out.push_str(&Value::Array(items).to_string());
            }
            Self::Ack { ack_id, args, .. } => {
                out.push_str(&ack_id.to_string());
                out.push_str(&Value::Array(args.clone()).to_string());
            }
        }
        out
    }

    /// Wrap this packet in an Engine.IO `message` frame.
    pub fn to_frame(&self) -> String {
        EnginePacket::Message(self.encode()).encode()
    }
}
