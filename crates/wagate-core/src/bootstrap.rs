// ── Application start ──
//
// Restores a persisted session before anything else runs: expired tokens
// are discarded, live ones get their profile refreshed.

use tracing::{debug, warn};

use crate::session::{MeOutcome, SessionContext};

/// What bootstrap found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// Nothing stored; the caller starts signed out.
    NoSession,
    /// A stored token had expired and was cleared.
    Expired,
    /// The stored token was accepted and the profile refreshed.
    Restored,
    /// The gateway rejected the stored token; the session was cleared.
    Rejected,
}

/// Restore the session from storage and validate it against the gateway.
pub async fn bootstrap(session: &SessionContext) -> BootstrapOutcome {
    match session.load_from_storage() {
        Ok(true) => {}
        Ok(false) => return BootstrapOutcome::NoSession,
        Err(e) => {
            warn!(error = %e, "could not read stored token");
            return BootstrapOutcome::NoSession;
        }
    }

    if session.is_token_expired() {
        debug!("stored token expired");
        session.logout();
        return BootstrapOutcome::Expired;
    }

    match session.fetch_me().await {
        MeOutcome::Refreshed(user) => {
            debug!(user_id = user.id, "session restored");
            BootstrapOutcome::Restored
        }
        MeOutcome::LoggedOut(_) => BootstrapOutcome::Rejected,
        MeOutcome::Skipped => BootstrapOutcome::NoSession,
    }
}
