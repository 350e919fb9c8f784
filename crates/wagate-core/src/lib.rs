// wagate-core: Session and resource services between wagate-api and consumers.

pub mod bootstrap;
pub mod config;
pub mod devices;
pub mod error;
pub mod guard;
pub mod media;
pub mod messages;
pub mod notifier;
mod resource;
pub mod session;
pub mod storage;
pub mod token;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bootstrap::{BootstrapOutcome, bootstrap};
pub use config::{DEFAULT_API_BASE_URL, GatewayConfig};
pub use devices::DeviceService;
pub use error::CoreError;
pub use guard::{DASHBOARD_PATH, LOGIN_PATH, Navigation, REGISTER_PATH, RouteGuard};
pub use messages::MessageService;
pub use notifier::{RealtimeNotifier, Subscription};
pub use session::{MeOutcome, SessionContext, SessionState};
pub use storage::{FileTokenStorage, MemoryTokenStorage, TOKEN_STORAGE_KEY, TokenStorage};

// Wire types consumers need alongside the services.
pub use wagate_api::{
    ConnectionUpdate, Device, DeviceId, DeviceQr, DeviceStatus, LiveStatus, MessageContent,
    MessageReceipt, QrFormat, QrUpdate, ReconnectConfig, SendCapability, SendMessageRequest,
    UserProfile,
};
