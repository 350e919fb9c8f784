// ── Message service ──

use tokio::sync::watch;
use tracing::debug;
use wagate_api::{DeviceId, MessageReceipt, SendCapability, SendMessageRequest};

use crate::error::CoreError;
use crate::resource::ResourceState;
use crate::session::SessionContext;

const SEND_FAILED: &str = "Failed to send message";
const CHECK_FAILED: &str = "Failed to check device";

/// Sends messages through a device with `loading` / `error` tracking.
#[derive(Debug)]
pub struct MessageService {
    session: SessionContext,
    state: ResourceState,
}

impl MessageService {
    pub fn new(session: SessionContext) -> Self {
        Self {
            session,
            state: ResourceState::new(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.state.error()
    }

    pub fn watch_loading(&self) -> watch::Receiver<bool> {
        self.state.watch_loading()
    }

    pub fn watch_error(&self) -> watch::Receiver<Option<String>> {
        self.state.watch_error()
    }

    /// Send a text, image or document message.
    pub async fn send_message(
        &self,
        request: &SendMessageRequest,
    ) -> Result<MessageReceipt, CoreError> {
        let _loading = self.state.begin();
        let result = async {
            let token = self.session.require_token()?;
            let receipt = self.session.client().send_message(&token, request).await?;
            debug!(
                device = %request.device_id,
                kind = request.content.kind(),
                message_id = %receipt.message_id,
                "message sent"
            );
            Ok::<_, CoreError>(receipt)
        }
        .await;
        result.map_err(|e| self.state.fail(e, SEND_FAILED))
    }

    /// Ask whether a device can currently send. Does not touch `loading`.
    pub async fn check_device(&self, id: DeviceId) -> Result<SendCapability, CoreError> {
        let result = async {
            let token = self.session.require_token()?;
            Ok::<_, CoreError>(self.session.client().check_device(&token, id).await?)
        }
        .await;
        result.map_err(|e| self.state.fail(e, CHECK_FAILED))
    }
}
