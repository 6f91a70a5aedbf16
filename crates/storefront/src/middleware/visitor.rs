//! Visitor identity middleware and extractor.
//!
//! Resolves the visitor id for each request (cookie, then session, then a
//! fresh UUID), back-fills missing stores, and re-issues the long-lived
//! visitor cookie when it was absent.

use axum::{
    extract::{FromRequestParts, Request},
    http::{HeaderValue, StatusCode, header, request::Parts},
    middleware::Next,
    response::Response,
};
use tower_sessions::Session;
use tracing::warn;

use crate::identity::{VISITOR_COOKIE_MAX_AGE_SECONDS, VISITOR_COOKIE_NAME, VisitorIdentity};

/// Extractor for the resolved visitor identity.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(Visitor(identity): Visitor) -> impl IntoResponse {
///     format!("cart for {}", identity.id)
/// }
/// ```
pub struct Visitor(pub VisitorIdentity);

impl<S> FromRequestParts<S> for Visitor
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<VisitorIdentity>()
            .cloned()
            .map(Self)
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Resolve the visitor identity and stash it in request extensions.
///
/// Must run below the session layer. When the cookie was missing (or the id
/// came from the session or was generated), a `Set-Cookie` for the visitor
/// id is appended to the response.
pub async fn visitor_middleware(request: Request, next: Next) -> Response {
    let cookie_value = request
        .headers()
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|cookies| cookie_param(cookies, VISITOR_COOKIE_NAME));

    let Some(session) = request.extensions().get::<Session>().cloned() else {
        // Session layer missing entirely; resolve against a throwaway
        // session so the request still gets an (ephemeral) identity.
        warn!("session layer absent, visitor identity is ephemeral");
        let store = std::sync::Arc::new(tower_sessions::MemoryStore::default());
        let session = Session::new(None, store, None);
        let (identity, needs_cookie) =
            VisitorIdentity::resolve(cookie_value.as_deref(), &session).await;
        return run_with_identity(request, next, identity, needs_cookie, false).await;
    };

    let (identity, needs_cookie) =
        VisitorIdentity::resolve(cookie_value.as_deref(), &session).await;
    let secure = request
        .uri()
        .scheme_str()
        .is_some_and(|scheme| scheme == "https");
    run_with_identity(request, next, identity, needs_cookie, secure).await
}

async fn run_with_identity(
    mut request: Request,
    next: Next,
    identity: VisitorIdentity,
    needs_cookie: bool,
    secure: bool,
) -> Response {
    let visitor_id = identity.id.clone();
    request.extensions_mut().insert(identity);

    let mut response = next.run(request).await;

    if needs_cookie {
        let mut cookie = format!(
            "{VISITOR_COOKIE_NAME}={visitor_id}; Max-Age={VISITOR_COOKIE_MAX_AGE_SECONDS}; \
             Path=/; SameSite=Lax; HttpOnly"
        );
        if secure {
            cookie.push_str("; Secure");
        }
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(error) => warn!(%error, "could not encode visitor cookie"),
        }
    }

    response
}

/// Pull one value out of a `Cookie:` header.
fn cookie_param(cookies: &str, name: &str) -> Option<String> {
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}
