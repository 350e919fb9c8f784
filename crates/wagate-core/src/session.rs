// ── Session context ──
//
// Application-scoped owner of the bearer token and the signed-in user.
// Services read the token through a cheap clone of the context; only the
// session methods here write it. State lives in a `watch` channel so
// consumers can observe sign-in and sign-out.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use wagate_api::{AuthPayload, GatewayClient, UserProfile};

use crate::config::GatewayConfig;
use crate::error::CoreError;
use crate::guard::{LOGIN_PATH, Navigation};
use crate::storage::TokenStorage;
use crate::token;

// ── SessionState ─────────────────────────────────────────────────────

/// Snapshot of the current session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub token: Option<SecretString>,
    /// Only meaningful while `token` is present and unexpired.
    pub user: Option<UserProfile>,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

/// What [`SessionContext::fetch_me`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeOutcome {
    /// No token was held, so nothing was requested.
    Skipped,
    /// The profile was refreshed.
    Refreshed(UserProfile),
    /// The gateway rejected the session; it has been cleared.
    LoggedOut(Navigation),
}

// ── SessionContext ───────────────────────────────────────────────────

/// Cheaply cloneable handle to the shared session.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    client: GatewayClient,
    storage: Arc<dyn TokenStorage>,
    state: watch::Sender<SessionState>,
}

impl SessionContext {
    pub fn new(client: GatewayClient, storage: Arc<dyn TokenStorage>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            inner: Arc::new(SessionInner {
                client,
                storage,
                state,
            }),
        }
    }

    /// Build the HTTP client from `config` and wrap it in a fresh session.
    pub fn from_config(
        config: &GatewayConfig,
        storage: Arc<dyn TokenStorage>,
    ) -> Result<Self, CoreError> {
        let client = GatewayClient::new(config.api_base_url.clone(), &config.transport())?;
        Ok(Self::new(client, storage))
    }

    pub fn client(&self) -> &GatewayClient {
        &self.inner.client
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn token(&self) -> Option<SecretString> {
        self.inner.state.borrow().token.clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.inner.state.borrow().user.clone()
    }

    pub fn snapshot(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    /// Watch sign-in / sign-out transitions.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// The current token, or [`CoreError::NotAuthenticated`].
    pub(crate) fn require_token(&self) -> Result<SecretString, CoreError> {
        self.token().ok_or(CoreError::NotAuthenticated)
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Sign in with email and password.
    ///
    /// On success the token and profile replace whatever was held, and the
    /// token is persisted. Gateway errors are returned untouched.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<UserProfile, CoreError> {
        let payload = self.inner.client.login(email, password).await?;
        debug!(user_id = payload.user.id, "login accepted");
        self.establish(payload)
    }

    /// Create an account and sign in to it. Same contract as [`login`](Self::login).
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &SecretString,
        phone_number: Option<&str>,
    ) -> Result<UserProfile, CoreError> {
        let payload = self
            .inner
            .client
            .register(name, email, password, phone_number)
            .await?;
        debug!(user_id = payload.user.id, "registration accepted");
        self.establish(payload)
    }

    fn establish(&self, payload: AuthPayload) -> Result<UserProfile, CoreError> {
        let AuthPayload { token, user } = payload;
        let token = SecretString::from(token);
        // Persist before publishing so a storage failure leaves the
        // previous session untouched.
        self.inner.storage.store(&token)?;
        self.inner.state.send_replace(SessionState {
            token: Some(token),
            user: Some(user.clone()),
        });
        info!(email = %user.email, "signed in");
        Ok(user)
    }

    /// Copy a persisted token into memory. No-op when storage is empty.
    ///
    /// The profile is left as is; [`fetch_me`](Self::fetch_me) refreshes it.
    pub fn load_from_storage(&self) -> Result<bool, CoreError> {
        let Some(saved) = self.inner.storage.load()? else {
            return Ok(false);
        };
        self.inner.state.send_modify(|state| state.token = Some(saved));
        Ok(true)
    }

    /// Whether the held token is missing, unreadable, or past its `exp`.
    pub fn is_token_expired(&self) -> bool {
        self.is_token_expired_at(Utc::now())
    }

    pub fn is_token_expired_at(&self, now: DateTime<Utc>) -> bool {
        let state = self.inner.state.borrow();
        token::is_expired_at(state.token.as_ref().map(ExposeSecret::expose_secret), now)
    }

    /// Refresh the profile from `/auth/me`.
    ///
    /// Does nothing without a token. Any failure ends the session.
    pub async fn fetch_me(&self) -> MeOutcome {
        let Some(token) = self.token() else {
            return MeOutcome::Skipped;
        };
        match self.inner.client.me(&token).await {
            Ok(user) => {
                self.inner
                    .state
                    .send_modify(|state| state.user = Some(user.clone()));
                MeOutcome::Refreshed(user)
            }
            Err(e) => {
                warn!(error = %e, "profile refresh failed, signing out");
                MeOutcome::LoggedOut(self.logout())
            }
        }
    }

    /// Forget the token and profile, in memory and in storage.
    ///
    /// Always succeeds; a storage failure is logged. Returns the
    /// navigation to the login view.
    pub fn logout(&self) -> Navigation {
        self.inner.state.send_replace(SessionState::default());
        if let Err(e) = self.inner.storage.clear() {
            warn!(error = %e, "failed to clear stored token");
        }
        debug!("session cleared");
        Navigation::Redirect(LOGIN_PATH)
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("base_url", &self.inner.client.base_url().as_str())
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}
