// Gateway message endpoints

use secrecy::SecretString;
use tracing::debug;

use crate::client::GatewayClient;
use crate::error::Error;
use crate::models::{DeviceId, MessageReceipt, SendCapability, SendMessageRequest};

impl GatewayClient {
    /// Send a text, image or document message through a device.
    ///
    /// `POST /messages/send-message`
    pub async fn send_message(
        &self,
        token: &SecretString,
        request: &SendMessageRequest,
    ) -> Result<MessageReceipt, Error> {
        let url = self.api_url("messages/send-message")?;
        debug!(
            device_id = %request.device_id,
            kind = request.content.kind(),
            "sending message"
        );
        self.post(url, Some(token), request).await
    }

    /// Check whether a device can currently send messages.
    ///
    /// `GET /messages/check/{deviceId}`
    pub async fn check_device(
        &self,
        token: &SecretString,
        id: DeviceId,
    ) -> Result<SendCapability, Error> {
        let url = self.api_url(&format!("messages/check/{id}"))?;
        self.get(url, Some(token)).await
    }
}
