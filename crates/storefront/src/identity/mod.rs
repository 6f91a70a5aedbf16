//! Visitor identity resolution.
//!
//! Carts are keyed server-side by a visitor id rather than an account, so the
//! storefront needs a stable identifier per browser. Resolution walks the
//! sources in priority order and back-fills the ones that were missing:
//!
//! 1. The `souk_visitor` cookie (survives session expiry)
//! 2. The server session (survives cookie clearing within a session)
//! 3. A freshly generated UUID v4
//!
//! When neither cookie nor session can be written the identity is ephemeral:
//! the cart works for the lifetime of the process but will not survive a
//! restart. That is deliberate - a broken cookie jar must never take the
//! cart down with it.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tower_sessions::Session;
use tracing::warn;
use uuid::Uuid;

use souk_core::VisitorId;

/// Cookie carrying the visitor id.
pub const VISITOR_COOKIE_NAME: &str = "souk_visitor";

/// Session key carrying the visitor id.
pub const VISITOR_SESSION_KEY: &str = "visitor_id";

/// Visitor cookie lifetime in seconds (one year).
pub const VISITOR_COOKIE_MAX_AGE_SECONDS: i64 = 365 * 24 * 60 * 60;

/// Where the resolved visitor id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    Cookie,
    Session,
    Generated,
}

/// A resolved visitor identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitorIdentity {
    pub id: VisitorId,
    #[serde(skip, default = "default_source")]
    pub source: IdentitySource,
    /// True when the id could not be persisted anywhere; the cart only
    /// lives as long as this identity does.
    #[serde(skip)]
    pub ephemeral: bool,
}

const fn default_source() -> IdentitySource {
    IdentitySource::Generated
}

impl VisitorIdentity {
    /// Resolve the visitor identity from the request's cookie value and
    /// session, back-filling whichever source was missing.
    ///
    /// Returns the identity plus whether the caller must (re)issue the
    /// visitor cookie on the response.
    pub async fn resolve(cookie_value: Option<&str>, session: &Session) -> (Self, bool) {
        let from_cookie = cookie_value.and_then(parse_visitor_id);
        let from_session: Option<VisitorId> = match session.get(VISITOR_SESSION_KEY).await {
            Ok(value) => value,
            Err(error) => {
                warn!(%error, "session read failed, falling back");
                None
            }
        };

        let (id, source) = match (from_cookie, from_session) {
            (Some(id), _) => (id, IdentitySource::Cookie),
            (None, Some(id)) => (id, IdentitySource::Session),
            (None, None) => (VisitorId::generate(), IdentitySource::Generated),
        };

        // Back-fill the session; a failure here degrades to ephemeral only
        // if the cookie also cannot carry the id (the caller issues it).
        let session_ok = match session.insert(VISITOR_SESSION_KEY, &id).await {
            Ok(()) => true,
            Err(error) => {
                warn!(%error, "session write failed, visitor id is cookie-only");
                false
            }
        };

        let needs_cookie = source != IdentitySource::Cookie;
        let identity = Self {
            id,
            source,
            // The cookie is issued by the caller; until then persistence
            // rests on the session alone.
            ephemeral: !session_ok && needs_cookie,
        };
        (identity, needs_cookie)
    }
}

/// Accept only well-formed UUIDs from the cookie; anything else is treated
/// as absent so a tampered cookie regenerates cleanly.
fn parse_visitor_id(raw: &str) -> Option<VisitorId> {
    Uuid::parse_str(raw).ok().map(|_| VisitorId::new(raw))
}

/// Stable non-identifying fingerprint of a browser, for log correlation.
///
/// Not an identity source: two browsers with the same headers collide, which
/// is fine for grouping log lines and useless for tracking.
#[must_use]
pub fn browser_fingerprint(user_agent: &str, accept_language: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_agent.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(accept_language.as_bytes());
    let digest = hasher.finalize();
    // First 8 bytes are plenty for correlation.
    hex_prefix(&digest, 8)
}

fn hex_prefix(bytes: &[u8], take: usize) -> String {
    bytes
        .iter()
        .take(take)
        .map(|b| format!("{b:02x}"))
        .collect()
}
