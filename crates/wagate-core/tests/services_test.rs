#![allow(clippy::unwrap_used)]
// Device and message services against a wiremock gateway.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wagate_core::{
    CoreError, DeviceId, DeviceService, GatewayConfig, MemoryTokenStorage, MessageContent,
    MessageService, QrFormat, SendMessageRequest, SessionContext,
};

const TOKEN: &str = "header.payload.sig";

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, SessionContext) {
    let server = MockServer::start().await;
    let config = GatewayConfig::from_url(&format!("{}/api", server.uri())).unwrap();
    let session =
        SessionContext::from_config(&config, Arc::new(MemoryTokenStorage::with_token(TOKEN)))
            .unwrap();
    session.load_from_storage().unwrap();
    (server, session)
}

fn device(id: i64, name: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "userId": 4,
        "sessionName": name,
        "phoneNumber": null,
        "status": status,
        "liveStatus": "pending",
        "isOnline": false,
        "hasQR": true,
        "createdAt": "2025-10-01T00:00:00.000Z",
        "updatedAt": "2025-10-01T00:00:00.000Z"
    })
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "code": 200, "message": "ok", "data": data }))
}

fn fail(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({ "code": status, "message": message }))
}

fn session_names(service: &DeviceService) -> Vec<String> {
    service
        .devices()
        .into_iter()
        .map(|d| d.session_name)
        .collect()
}

// ── Devices ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_devices_replaces_list() {
    let (server, session) = setup().await;
    let service = DeviceService::new(session);

    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .and(header("authorization", "Bearer header.payload.sig"))
        .respond_with(ok(json!([device(1, "sales", "connected"), device(2, "ops", "pending")])))
        .mount(&server)
        .await;

    let list = service.fetch_devices().await.unwrap();

    assert_eq!(list.len(), 2);
    assert_eq!(session_names(&service), vec!["sales", "ops"]);
    assert!(!service.is_loading());
    assert_eq!(service.error(), None);
    assert_eq!(service.find("2").unwrap().session_name, "ops");
    assert_eq!(service.find("sales").unwrap().id, DeviceId(1));
    assert!(service.find("missing").is_none());
}

#[tokio::test]
async fn test_create_device_refetches_list() {
    let (server, session) = setup().await;
    let service = DeviceService::new(session);

    Mock::given(method("POST"))
        .and(path("/api/devices"))
        .and(body_json(json!({ "sessionName": "support" })))
        .respond_with(ok(device(3, "support", "pending")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ok(json!([device(1, "sales", "connected"), device(3, "support", "pending")])))
        .expect(1)
        .mount(&server)
        .await;

    let created = service.create_device("support").await.unwrap();

    assert_eq!(created.id, DeviceId(3));
    assert_eq!(session_names(&service), vec!["sales", "support"]);
    assert!(!service.is_loading());
}

#[tokio::test]
async fn test_delete_device_refetches_list() {
    let (server, session) = setup().await;
    let service = DeviceService::new(session);

    Mock::given(method("DELETE"))
        .and(path("/api/devices/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200, "message": "deleted", "data": null
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ok(json!([device(2, "ops", "pending")])))
        .expect(1)
        .mount(&server)
        .await;

    service.delete_device(DeviceId(1)).await.unwrap();
    assert_eq!(session_names(&service), vec!["ops"]);
    assert!(!service.is_loading());
}

#[tokio::test]
async fn test_reconnect_failure_records_server_message() {
    let (server, session) = setup().await;
    let service = DeviceService::new(session);

    Mock::given(method("POST"))
        .and(path("/api/devices/7/reconnect"))
        .respond_with(fail(404, "Device not found"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ok(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let err = service.reconnect_device(DeviceId(7)).await.unwrap_err();

    assert!(matches!(err, CoreError::NotFound { .. }));
    assert_eq!(service.error().as_deref(), Some("Device not found"));
    assert!(!service.is_loading());
}

#[tokio::test]
async fn test_fetch_failure_without_message_uses_generic_text() {
    let (server, session) = setup().await;
    let service = DeviceService::new(session);

    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{ truncated"))
        .mount(&server)
        .await;

    assert!(service.fetch_devices().await.is_err());
    assert_eq!(service.error().as_deref(), Some("Failed to fetch devices"));
    assert!(!service.is_loading());
}

#[tokio::test]
async fn test_successful_call_clears_previous_error() {
    let (server, session) = setup().await;
    let service = DeviceService::new(session);

    Mock::given(method("POST"))
        .and(path("/api/devices"))
        .respond_with(fail(409, "Session name already exists"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ok(json!([])))
        .mount(&server)
        .await;

    assert!(service.create_device("sales").await.is_err());
    assert_eq!(service.error().as_deref(), Some("Session name already exists"));
    assert!(!service.is_loading());

    service.fetch_devices().await.unwrap();
    assert_eq!(service.error(), None);
    assert!(!service.is_loading());
}

#[tokio::test]
async fn test_non_json_error_page_uses_generic_text() {
    let (server, session) = setup().await;
    let service = DeviceService::new(session);

    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let err = service.fetch_devices().await.unwrap_err();
    assert_eq!(err.server_message(), None);
    assert_eq!(service.error().as_deref(), Some("Failed to fetch devices"));
    assert!(!service.is_loading());
}

#[tokio::test]
async fn test_error_code_without_message_uses_generic_text() {
    let (server, session) = setup().await;
    let service = DeviceService::new(session);

    Mock::given(method("POST"))
        .and(path("/api/devices/4/reconnect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": 500, "data": null })))
        .mount(&server)
        .await;

    assert!(service.reconnect_device(DeviceId(4)).await.is_err());
    assert_eq!(service.error().as_deref(), Some("Failed to reconnect device"));
    assert!(!service.is_loading());
}

#[tokio::test]
async fn test_create_failure_clears_loading() {
    let (server, session) = setup().await;
    let service = DeviceService::new(session);

    Mock::given(method("POST"))
        .and(path("/api/devices"))
        .respond_with(fail(422, "sessionName is required"))
        .mount(&server)
        .await;

    let mut loading = service.watch_loading();
    assert!(service.create_device("").await.is_err());

    assert!(loading.has_changed().unwrap(), "create should raise loading");
    assert!(!*loading.borrow_and_update());
    assert_eq!(service.error().as_deref(), Some("sessionName is required"));
}

#[tokio::test]
async fn test_delete_failure_keeps_list_and_clears_loading() {
    let (server, session) = setup().await;
    let service = DeviceService::new(session);

    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ok(json!([device(1, "sales", "connected")])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/devices/1"))
        .respond_with(fail(500, "Failed to stop session"))
        .mount(&server)
        .await;

    service.fetch_devices().await.unwrap();
    assert!(service.delete_device(DeviceId(1)).await.is_err());

    assert!(!service.is_loading());
    assert_eq!(service.error().as_deref(), Some("Failed to stop session"));
    assert_eq!(session_names(&service), vec!["sales"]);
}

#[tokio::test]
async fn test_refetch_failure_after_mutation_is_reported() {
    let (server, session) = setup().await;
    let service = DeviceService::new(session);

    Mock::given(method("POST"))
        .and(path("/api/devices"))
        .respond_with(ok(device(3, "support", "pending")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ResponseTemplate::new(503).set_body_string(""))
        .expect(1)
        .mount(&server)
        .await;

    let err = service.create_device("support").await.unwrap_err();

    assert!(matches!(err, CoreError::Api { status: Some(503), .. }), "got {err:?}");
    assert_eq!(service.error().as_deref(), Some("Failed to create device"));
    assert!(!service.is_loading());
    assert!(service.devices().is_empty());
}

#[tokio::test]
async fn test_qr_lookup_records_error_but_not_loading() {
    let (server, session) = setup().await;
    let service = DeviceService::new(session);

    Mock::given(method("GET"))
        .and(path("/api/devices/3/qr"))
        .and(query_param("format", "image"))
        .respond_with(fail(400, "Device already connected"))
        .mount(&server)
        .await;

    let mut loading = service.watch_loading();
    let err = service
        .device_qr(DeviceId(3), QrFormat::Image)
        .await
        .unwrap_err();

    assert_eq!(err.server_message(), Some("Device already connected"));
    assert_eq!(service.error().as_deref(), Some("Device already connected"));
    assert!(!loading.has_changed().unwrap(), "QR lookup must not toggle loading");
}

#[tokio::test]
async fn test_qr_lookup_success() {
    let (server, session) = setup().await;
    let service = DeviceService::new(session);

    Mock::given(method("GET"))
        .and(path("/api/devices/3/qr"))
        .and(query_param("format", "image"))
        .respond_with(ok(json!({
            "sessionName": "sales",
            "isConnected": false,
            "qr": "2@xyz",
            "qrImage": "data:image/png;base64,iVBORw0KGgo="
        })))
        .mount(&server)
        .await;

    let qr = service.device_qr(DeviceId(3), QrFormat::default()).await.unwrap();
    let (mime, bytes) = wagate_core::media::decode_data_url(qr.qr_image.as_deref().unwrap()).unwrap();
    assert_eq!(mime, "image/png");
    assert_eq!(bytes.len(), 8);
}

// ── Messages ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_send_message_resolves_receipt() {
    let (server, session) = setup().await;
    let service = MessageService::new(session);

    Mock::given(method("POST"))
        .and(path("/api/messages/send-message"))
        .and(body_json(json!({ "deviceId": 1, "to": "+1555", "type": "text", "message": "hi" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200, "message": "ok", "data": { "messageId": "abc" }
        })))
        .mount(&server)
        .await;

    let receipt = service
        .send_message(&SendMessageRequest {
            device_id: DeviceId(1),
            to: "+1555".into(),
            content: MessageContent::text("hi"),
        })
        .await
        .unwrap();

    assert_eq!(receipt.message_id, "abc");
    assert!(!service.is_loading());
    assert_eq!(service.error(), None);
}

#[tokio::test]
async fn test_send_message_failure() {
    let (server, session) = setup().await;
    let service = MessageService::new(session);

    Mock::given(method("POST"))
        .and(path("/api/messages/send-message"))
        .respond_with(fail(400, "Device is not connected"))
        .mount(&server)
        .await;

    let result = service
        .send_message(&SendMessageRequest {
            device_id: DeviceId(2),
            to: "+1555".into(),
            content: MessageContent::text("hi"),
        })
        .await;

    assert!(result.is_err());
    assert_eq!(service.error().as_deref(), Some("Device is not connected"));
    assert!(!service.is_loading());
}

#[tokio::test]
async fn test_check_device() {
    let (server, session) = setup().await;
    let service = MessageService::new(session);

    Mock::given(method("GET"))
        .and(path("/api/messages/check/1"))
        .respond_with(ok(json!({ "canSend": true, "reason": null })))
        .mount(&server)
        .await;

    let check = service.check_device(DeviceId(1)).await.unwrap();
    assert!(check.can_send);
    assert_eq!(check.reason, None);
}
