// ── Route guard ──
//
// Decides, per navigation, whether the destination may be shown or the
// caller must go elsewhere. Paths are the gateway console's views; the
// CLI maps each command onto one of them.

use tracing::{debug, warn};

use crate::session::SessionContext;

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const DASHBOARD_PATH: &str = "/client/dashboard";

/// Views reachable without a session.
pub const PUBLIC_PATHS: [&str; 2] = [LOGIN_PATH, REGISTER_PATH];

/// Result of a guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Show the requested view.
    Proceed,
    /// Go to this path instead.
    Redirect(&'static str),
}

impl Navigation {
    pub fn redirect_target(self) -> Option<&'static str> {
        match self {
            Self::Proceed => None,
            Self::Redirect(path) => Some(path),
        }
    }
}

/// Exact match against [`PUBLIC_PATHS`]; `/login/` is protected.
pub fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
}

/// Path-based authentication gate.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    session: SessionContext,
}

impl RouteGuard {
    pub fn new(session: SessionContext) -> Self {
        Self { session }
    }

    /// Check a navigation to `path`.
    ///
    /// Reloads the token from storage first. A signed-in caller heading to
    /// a public view is sent to the dashboard; a caller without a valid
    /// token heading anywhere else is signed out and sent to login.
    pub fn check(&self, path: &str) -> Navigation {
        if let Err(e) = self.session.load_from_storage() {
            warn!(error = %e, "could not read stored token");
        }
        let valid = self.session.is_authenticated() && !self.session.is_token_expired();

        let outcome = if is_public(path) {
            if valid {
                Navigation::Redirect(DASHBOARD_PATH)
            } else {
                Navigation::Proceed
            }
        } else if valid {
            Navigation::Proceed
        } else {
            self.session.logout()
        };

        debug!(path, ?outcome, "route guard");
        outcome
    }
}
