#![allow(clippy::unwrap_used)]
// Session lifecycle against a wiremock gateway.

use std::sync::Arc;

use chrono::{Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wagate_core::{
    BootstrapOutcome, CoreError, GatewayConfig, MeOutcome, MemoryTokenStorage, Navigation,
    SessionContext, TokenStorage, bootstrap,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn jwt_expiring_in(delta: Duration) -> String {
    let claims = json!({ "sub": 4, "exp": (Utc::now() + delta).timestamp() });
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(b"gateway-secret"),
    )
    .unwrap()
}

async fn setup(storage: Arc<MemoryTokenStorage>) -> (MockServer, SessionContext) {
    let server = MockServer::start().await;
    let config = GatewayConfig::from_url(&format!("{}/api", server.uri())).unwrap();
    let session = SessionContext::from_config(&config, storage).unwrap();
    (server, session)
}

fn user_json() -> serde_json::Value {
    json!({ "id": 4, "name": "Ayu", "email": "ayu@example.com", "phoneNumber": "62811" })
}

/// Storage whose writes always fail, as with a read-only data dir.
struct ReadOnlyStorage;

impl TokenStorage for ReadOnlyStorage {
    fn load(&self) -> Result<Option<SecretString>, CoreError> {
        Ok(None)
    }

    fn store(&self, _token: &SecretString) -> Result<(), CoreError> {
        Err(CoreError::Storage {
            message: "read-only file system".into(),
        })
    }

    fn clear(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

// ── Login / register ────────────────────────────────────────────────

#[tokio::test]
async fn test_login_stores_token_and_user() {
    let storage = Arc::new(MemoryTokenStorage::new());
    let (server, session) = setup(Arc::clone(&storage)).await;
    let token = jwt_expiring_in(Duration::hours(2));

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200, "message": "ok", "data": { "token": token, "user": user_json() }
        })))
        .mount(&server)
        .await;

    let user = session
        .login("ayu@example.com", &SecretString::from("pw".to_string()))
        .await
        .unwrap();

    assert_eq!(user.name, "Ayu");
    assert_eq!(session.token().unwrap().expose_secret(), token);
    assert_eq!(session.user().unwrap().email, "ayu@example.com");
    assert_eq!(storage.load().unwrap().unwrap().expose_secret(), token);
    assert!(!session.is_token_expired());
}

#[tokio::test]
async fn test_login_with_unwritable_storage_stays_signed_out() {
    let server = MockServer::start().await;
    let config = GatewayConfig::from_url(&format!("{}/api", server.uri())).unwrap();
    let session = SessionContext::from_config(&config, Arc::new(ReadOnlyStorage)).unwrap();

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "message": "ok",
            "data": { "token": jwt_expiring_in(Duration::hours(2)), "user": user_json() }
        })))
        .mount(&server)
        .await;

    let err = session
        .login("ayu@example.com", &SecretString::from("pw".to_string()))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Storage { .. }), "got {err:?}");
    assert!(!session.is_authenticated());
    assert!(session.token().is_none());
    assert!(session.user().is_none());
}

#[tokio::test]
async fn test_login_failure_leaves_session_untouched() {
    let storage = Arc::new(MemoryTokenStorage::new());
    let (server, session) = setup(Arc::clone(&storage)).await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": 401, "message": "Invalid credentials"
        })))
        .mount(&server)
        .await;

    let err = session
        .login("ayu@example.com", &SecretString::from("wrong".to_string()))
        .await
        .unwrap_err();

    match err {
        CoreError::AuthenticationFailed { message } => {
            assert_eq!(message.as_deref(), Some("Invalid credentials"));
        }
        other => panic!("expected AuthenticationFailed, got {other:?}"),
    }
    assert!(!session.is_authenticated());
    assert!(storage.load().unwrap().is_none());
}

#[tokio::test]
async fn test_register_signs_in() {
    let storage = Arc::new(MemoryTokenStorage::new());
    let (server, session) = setup(Arc::clone(&storage)).await;

    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "code": 201, "message": "created", "data": { "token": "new.jwt.sig", "user": user_json() }
        })))
        .mount(&server)
        .await;

    let user = session
        .register(
            "Ayu",
            "ayu@example.com",
            &SecretString::from("pw".to_string()),
            None,
        )
        .await
        .unwrap();

    assert_eq!(user.id, 4);
    assert_eq!(storage.load().unwrap().unwrap().expose_secret(), "new.jwt.sig");
}

// ── fetch_me ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_me_refreshes_profile() {
    let token = jwt_expiring_in(Duration::hours(1));
    let (server, session) = setup(Arc::new(MemoryTokenStorage::with_token(token.clone()))).await;
    assert_ok!(session.load_from_storage());

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200, "message": "ok", "data": user_json()
        })))
        .expect(1)
        .mount(&server)
        .await;

    match session.fetch_me().await {
        MeOutcome::Refreshed(user) => assert_eq!(user.phone_number.as_deref(), Some("62811")),
        other => panic!("expected Refreshed, got {other:?}"),
    }
    assert_eq!(session.user().unwrap().id, 4);
}

#[tokio::test]
async fn test_fetch_me_failure_logs_out() {
    let storage = Arc::new(MemoryTokenStorage::with_token(jwt_expiring_in(Duration::hours(1))));
    let (server, session) = setup(Arc::clone(&storage)).await;
    assert_ok!(session.load_from_storage());

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert_eq!(
        session.fetch_me().await,
        MeOutcome::LoggedOut(Navigation::Redirect("/login"))
    );
    assert!(session.token().is_none());
    assert!(storage.load().unwrap().is_none());
}

// ── Bootstrap ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_bootstrap_restores_live_session() {
    let storage = Arc::new(MemoryTokenStorage::with_token(jwt_expiring_in(Duration::hours(1))));
    let (server, session) = setup(storage).await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200, "message": "ok", "data": user_json()
        })))
        .mount(&server)
        .await;

    assert_eq!(bootstrap(&session).await, BootstrapOutcome::Restored);
    assert_eq!(session.user().unwrap().name, "Ayu");
}

#[tokio::test]
async fn test_bootstrap_discards_expired_token_without_calling_gateway() {
    let storage = Arc::new(MemoryTokenStorage::with_token(jwt_expiring_in(Duration::hours(-1))));
    let (server, session) = setup(Arc::clone(&storage)).await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    assert_eq!(bootstrap(&session).await, BootstrapOutcome::Expired);
    assert!(storage.load().unwrap().is_none());
}

#[tokio::test]
async fn test_bootstrap_rejected_token() {
    let storage = Arc::new(MemoryTokenStorage::with_token(jwt_expiring_in(Duration::hours(1))));
    let (server, session) = setup(Arc::clone(&storage)).await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Token revoked" })))
        .mount(&server)
        .await;

    assert_eq!(bootstrap(&session).await, BootstrapOutcome::Rejected);
    assert!(!session.is_authenticated());
    assert!(storage.load().unwrap().is_none());
}

#[tokio::test]
async fn test_bootstrap_without_stored_token() {
    let (_server, session) = setup(Arc::new(MemoryTokenStorage::new())).await;
    assert_eq!(bootstrap(&session).await, BootstrapOutcome::NoSession);
}

#[tokio::test]
async fn test_resource_call_without_session_is_rejected_locally() {
    let (_server, session) = setup(Arc::new(MemoryTokenStorage::new())).await;
    let devices = wagate_core::DeviceService::new(session);
    let err = assert_err!(devices.fetch_devices().await);
    assert!(matches!(err, CoreError::NotAuthenticated));
}
