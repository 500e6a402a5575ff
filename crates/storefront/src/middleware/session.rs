//! Session middleware configuration.
//!
//! Carts live in the visitor's session. Sessions are held in a bounded
//! in-memory cache that evicts each record at its expiry date, and the
//! cookie carrying the session id is signed with the configured secret.

use secrecy::ExposeSecret;
use tower_sessions::cookie::{Key, SameSite, time::Duration};
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_moka_store::MokaStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "sillage_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Most sessions held at once. The least recently used are evicted first.
pub const SESSION_STORE_CAPACITY: u64 = 100_000;

/// The session secret could not be turned into a cookie signing key.
#[derive(Debug, thiserror::Error)]
#[error("invalid session signing key: {0}")]
pub struct SessionSetupError(String);

/// In-memory session store bounded by [`SESSION_STORE_CAPACITY`].
#[must_use]
pub fn create_session_store() -> MokaStore {
    MokaStore::new(Some(SESSION_STORE_CAPACITY))
}

/// Create the session layer backed by [`create_session_store`].
///
/// # Errors
///
/// Returns an error if the session secret is too short to derive a signing
/// key from.
pub fn create_session_layer(
    config: &StorefrontConfig,
) -> Result<SessionManagerLayer<MokaStore, SignedCookie>, SessionSetupError> {
    let key = Key::try_from(config.session_secret.expose_secret().as_bytes())
        .map_err(|e| SessionSetupError(e.to_string()))?;

    Ok(SessionManagerLayer::new(create_session_store())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(
            SESSION_EXPIRY_SECONDS,
        )))
        .with_secure(config.is_secure())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(key))
}
