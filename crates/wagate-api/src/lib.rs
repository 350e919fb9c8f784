// wagate-api: Async Rust client for the messaging gateway (HTTP + Socket.IO)

pub mod auth;
pub mod client;
pub mod devices;
pub mod error;
pub mod messages;
pub mod models;
pub mod realtime;
pub mod socketio;
pub mod transport;

pub use client::GatewayClient;
pub use error::Error;
pub use models::{
    AuthPayload, Device, DeviceId, DeviceQr, DeviceStatus, LiveStatus, MessageContent,
    MessageReceipt, QrFormat, SendCapability, SendMessageRequest, UserProfile,
};
pub use realtime::{ConnectionUpdate, QrUpdate, RealtimeHandle, ReconnectConfig, ServerEvent};
pub use socketio::SocketEndpoint;
pub use transport::TransportConfig;
