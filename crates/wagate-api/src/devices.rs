// Gateway device endpoints
//
// Device sessions: listing, creation, QR pairing lookup, deletion and
// reconnection. Every call requires the bearer token.

use reqwest::Method;
use secrecy::SecretString;
use tracing::debug;

use crate::client::GatewayClient;
use crate::error::Error;
use crate::models::{CreateDeviceRequest, Device, DeviceId, DeviceQr, QrFormat};

impl GatewayClient {
    /// List every device session owned by the token's account.
    ///
    /// `GET /devices`
    pub async fn list_devices(&self, token: &SecretString) -> Result<Vec<Device>, Error> {
        let url = self.api_url("devices")?;
        debug!("listing devices");
        self.get(url, Some(token)).await
    }

    /// Register a new device session under `session_name`.
    ///
    /// `POST /devices` with `{"sessionName": "..."}`
    pub async fn create_device(
        &self,
        token: &SecretString,
        session_name: &str,
    ) -> Result<Device, Error> {
        let url = self.api_url("devices")?;
        debug!(session_name, "creating device");
        self.post(url, Some(token), &CreateDeviceRequest { session_name })
            .await
    }

    /// Fetch the pairing QR for a device.
    ///
    /// `GET /devices/{id}/qr?format=image|raw`
    pub async fn device_qr(
        &self,
        token: &SecretString,
        id: DeviceId,
        format: QrFormat,
    ) -> Result<DeviceQr, Error> {
        let mut url = self.api_url(&format!("devices/{id}/qr"))?;
        url.query_pairs_mut()
            .append_pair("format", &format.to_string());
        self.get(url, Some(token)).await
    }

    /// Delete a device session.
    ///
    /// `DELETE /devices/{id}`
    pub async fn delete_device(&self, token: &SecretString, id: DeviceId) -> Result<(), Error> {
        let url = self.api_url(&format!("devices/{id}"))?;
        debug!(%id, "deleting device");
        self.send_unit(Method::DELETE, url, Some(token)).await
    }

    /// Ask the gateway to restart a device's messaging session.
    ///
    /// `POST /devices/{id}/reconnect`
    pub async fn reconnect_device(&self, token: &SecretString, id: DeviceId) -> Result<(), Error> {
        let url = self.api_url(&format!("devices/{id}/reconnect"))?;
        debug!(%id, "reconnecting device");
        self.send_unit(Method::POST, url, Some(token)).await
    }
}
