// ── Device service ──
//
// Wraps the device endpoints with the signed-in token and keeps a local,
// observable copy of the device list. Every successful mutation is
// followed by a full refetch; the list is only ever replaced wholesale.

use tokio::sync::watch;
use tracing::debug;
use wagate_api::{Device, DeviceId, DeviceQr, QrFormat};

use crate::error::CoreError;
use crate::resource::ResourceState;
use crate::session::SessionContext;

const FETCH_FAILED: &str = "Failed to fetch devices";
const CREATE_FAILED: &str = "Failed to create device";
const QR_FAILED: &str = "Failed to get QR code";
const DELETE_FAILED: &str = "Failed to delete device";
const RECONNECT_FAILED: &str = "Failed to reconnect device";

/// Device list plus `loading` / `error` state for one consumer.
#[derive(Debug)]
pub struct DeviceService {
    session: SessionContext,
    devices: watch::Sender<Vec<Device>>,
    state: ResourceState,
}

impl DeviceService {
    pub fn new(session: SessionContext) -> Self {
        let (devices, _) = watch::channel(Vec::new());
        Self {
            session,
            devices,
            state: ResourceState::new(),
        }
    }

    // ── Observation ──────────────────────────────────────────────────

    /// The last fetched device list.
    pub fn devices(&self) -> Vec<Device> {
        self.devices.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    /// Message from the most recent failed call, cleared when a tracked
    /// call starts.
    pub fn error(&self) -> Option<String> {
        self.state.error()
    }

    pub fn watch_devices(&self) -> watch::Receiver<Vec<Device>> {
        self.devices.subscribe()
    }

    pub fn watch_loading(&self) -> watch::Receiver<bool> {
        self.state.watch_loading()
    }

    pub fn watch_error(&self) -> watch::Receiver<Option<String>> {
        self.state.watch_error()
    }

    /// Look a device up in the cached list by numeric id or session name.
    pub fn find(&self, key: &str) -> Option<Device> {
        let by_id = key.parse::<i64>().ok().map(DeviceId);
        self.devices
            .borrow()
            .iter()
            .find(|d| Some(d.id) == by_id || d.session_name == key)
            .cloned()
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Fetch the device list and replace the local copy.
    pub async fn fetch_devices(&self) -> Result<Vec<Device>, CoreError> {
        let _loading = self.state.begin();
        self.refresh()
            .await
            .map_err(|e| self.state.fail(e, FETCH_FAILED))
    }

    /// Register a new device session, then refetch the list.
    pub async fn create_device(&self, session_name: &str) -> Result<Device, CoreError> {
        let _loading = self.state.begin();
        let result = async {
            let token = self.session.require_token()?;
            let device = self
                .session
                .client()
                .create_device(&token, session_name)
                .await?;
            debug!(id = %device.id, session = session_name, "device created");
            self.refresh().await?;
            Ok::<_, CoreError>(device)
        }
        .await;
        result.map_err(|e| self.state.fail(e, CREATE_FAILED))
    }

    /// Fetch the pairing QR for a device. Does not touch `loading`.
    pub async fn device_qr(&self, id: DeviceId, format: QrFormat) -> Result<DeviceQr, CoreError> {
        let result = async {
            let token = self.session.require_token()?;
            Ok::<_, CoreError>(self.session.client().device_qr(&token, id, format).await?)
        }
        .await;
        result.map_err(|e| self.state.fail(e, QR_FAILED))
    }

    /// Delete a device session, then refetch the list.
    pub async fn delete_device(&self, id: DeviceId) -> Result<(), CoreError> {
        let _loading = self.state.begin();
        let result = async {
            let token = self.session.require_token()?;
            self.session.client().delete_device(&token, id).await?;
            debug!(%id, "device deleted");
            self.refresh().await?;
            Ok::<_, CoreError>(())
        }
        .await;
        result.map_err(|e| self.state.fail(e, DELETE_FAILED))
    }

    /// Ask the gateway to restart a device session, then refetch the list.
    pub async fn reconnect_device(&self, id: DeviceId) -> Result<(), CoreError> {
        let _loading = self.state.begin();
        let result = async {
            let token = self.session.require_token()?;
            self.session.client().reconnect_device(&token, id).await?;
            debug!(%id, "device reconnect requested");
            self.refresh().await?;
            Ok::<_, CoreError>(())
        }
        .await;
        result.map_err(|e| self.state.fail(e, RECONNECT_FAILED))
    }

    async fn refresh(&self) -> Result<Vec<Device>, CoreError> {
        let token = self.session.require_token()?;
        let list = self.session.client().list_devices(&token).await?;
        debug!(count = list.len(), "device list refreshed");
        self.devices.send_replace(list.clone());
        Ok(list)
    }
}
