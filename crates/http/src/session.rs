//! Session cookie configuration.

use sha2::{Digest, Sha512};
use time::Duration;
use tower_sessions::{
    cookie::{Key, SameSite},
    service::SignedCookie,
    Expiry, SessionManagerLayer, SessionStore,
};

use yelpcamp_kernel::settings::SessionSettings;

/// Session layer signing its `HttpOnly` cookie with a key derived from the configured secret.
pub fn session_layer<S>(store: S, settings: &SessionSettings) -> SessionManagerLayer<S, SignedCookie>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(settings.cookie_name.clone())
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_secure(settings.secure)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(settings.max_age_secs)))
        .with_signed(signing_key(&settings.secret))
}

/// 64-byte cookie signing key derived from an arbitrary-length secret
pub fn signing_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}
