// ── Bearer token inspection ──
//
// The gateway issues JWTs. The client never verifies signatures; it only
// reads the `exp` claim to decide whether a stored token is still worth
// sending. Anything unreadable counts as expired.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{DecodingKey, Validation};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
struct Claims {
    exp: Option<f64>,
}

/// Claim checks switched off: only the payload is read.
fn inspect_only() -> Validation {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation
}

/// Decode the `exp` claim of a JWT without verifying it.
///
/// Returns `None` when the token is not a well-formed JWT, the payload is
/// not JSON, or it has no numeric `exp`.
pub fn decode_expiry(token: &str) -> Option<DateTime<Utc>> {
    let data =
        jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&[]), &inspect_only())
            .ok()?;
    let exp = data.claims.exp.filter(|e| e.is_finite())?;

    #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
    let millis = (exp * 1000.0) as i64;
    Utc.timestamp_millis_opt(millis).single()
}

/// Whether `token` should be treated as expired at `now`.
///
/// Fail-closed: a missing token, an undecodable token, or one without an
/// `exp` claim is expired. A token expiring exactly at `now` is still valid.
pub fn is_expired_at(token: Option<&str>, now: DateTime<Utc>) -> bool {
    match token.and_then(decode_expiry) {
        Some(expiry) => expiry < now,
        None => true,
    }
}

/// [`is_expired_at`] against the system clock.
pub fn is_expired(token: Option<&str>) -> bool {
    is_expired_at(token, Utc::now())
}

#[cfg(test)]
pub(crate) mod test_support {
    use jsonwebtoken::{EncodingKey, Header};

    /// Sign a JWT carrying the given claims with a throwaway secret.
    pub fn signed_test_jwt(claims: &serde_json::Value) -> String {
        jsonwebtoken::encode(&Header::default(), claims, &EncodingKey::from_secret(b"test"))
            .unwrap_or_default()
    }
}
