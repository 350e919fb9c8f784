// Gateway auth endpoints
//
// Password login and registration return a bearer token plus the account
// profile; `/auth/me` re-reads the profile for an existing token.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::client::GatewayClient;
use crate::error::Error;
use crate::models::{AuthPayload, LoginRequest, RegisterRequest, UserProfile};

impl GatewayClient {
    /// Exchange email + password for a bearer token.
    ///
    /// `POST /auth/login`
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<AuthPayload, Error> {
        let url = self.api_url("auth/login")?;
        debug!(email, "logging in");
        let body = LoginRequest {
            email,
            password: password.expose_secret(),
        };
        self.post(url, None, &body).await
    }

    /// Create an account and sign in to it.
    ///
    /// `POST /auth/register`. The phone number is only sent when given.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &SecretString,
        phone_number: Option<&str>,
    ) -> Result<AuthPayload, Error> {
        let url = self.api_url("auth/register")?;
        debug!(email, "registering account");
        let body = RegisterRequest {
            name,
            email,
            password: password.expose_secret(),
            phone_number,
        };
        self.post(url, None, &body).await
    }

    /// Fetch the profile that owns `token`.
    ///
    /// `GET /auth/me`
    pub async fn me(&self, token: &SecretString) -> Result<UserProfile, Error> {
        let url = self.api_url("auth/me")?;
        self.get(url, Some(token)).await
    }
}
