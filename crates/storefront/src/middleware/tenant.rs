//! Tenant resolution middleware.
//!
//! Maps the request host to a store: `mint-and-co.souk.example` serves the
//! store whose slug is `mint-and-co`. The resolved store rides request
//! extensions as [`StoreContext`] so handlers and extractors never re-fetch
//! it (the API client caches the lookup anyway).

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{Span, warn};

use crate::api::ApiError;
use crate::api::types::StoreDto;
use crate::state::AppState;

/// The store serving the current request.
#[derive(Debug, Clone)]
pub struct StoreContext(pub StoreDto);

impl<S> FromRequestParts<S> for StoreContext
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Resolve the store for the request host and stash it in extensions.
///
/// Unknown hosts get a plain 404; backend failures during resolution get a
/// 502 so monitoring can tell the two apart.
pub async fn tenant_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let host = request
        .headers()
        .get(axum::http::header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();

    let Some(slug) = store_slug_for_host(
        host,
        &state.config().base_domain,
        state.config().default_store_slug.as_deref(),
    ) else {
        return (StatusCode::NOT_FOUND, "Unknown store").into_response();
    };

    let store = match state.api().get_store(&slug).await {
        Ok(store) => store,
        Err(ApiError::NotFound(_)) => {
            return (StatusCode::NOT_FOUND, "Unknown store").into_response();
        }
        Err(error) => {
            warn!(%error, slug = %slug, "store resolution failed");
            return (StatusCode::BAD_GATEWAY, "Store temporarily unavailable").into_response();
        }
    };

    Span::current().record("store_id", store.id.as_str());

    let mut request = request;
    request.extensions_mut().insert(StoreContext(store));
    next.run(request).await
}

/// Derive the store slug from the request host.
///
/// `slug.base_domain` wins; the bare base domain (and localhost during
/// development) falls back to the configured default store.
fn store_slug_for_host(
    host: &str,
    base_domain: &str,
    default_slug: Option<&str>,
) -> Option<String> {
    let host = host.split(':').next().unwrap_or(host);

    if let Some(prefix) = host.strip_suffix(base_domain) {
        if let Some(slug) = prefix.strip_suffix('.') {
            if !slug.is_empty() && !slug.contains('.') {
                return Some(slug.to_string());
            }
        } else if prefix.is_empty() {
            // Bare base domain
            return default_slug.map(String::from);
        }
    }

    if host == "localhost" || host == "127.0.0.1" {
        return default_slug.map(String::from);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subdomain_maps_to_slug() {
        let slug = store_slug_for_host("mint-and-co.souk.test:3000", "souk.test", None);
        assert_eq!(slug.as_deref(), Some("mint-and-co"));
    }

    #[test]
    fn test_bare_domain_uses_default() {
        let slug = store_slug_for_host("souk.test", "souk.test", Some("flagship"));
        assert_eq!(slug.as_deref(), Some("flagship"));
    }

    #[test]
    fn test_localhost_uses_default() {
        let slug = store_slug_for_host("localhost:3000", "souk.test", Some("flagship"));
        assert_eq!(slug.as_deref(), Some("flagship"));
    }

    #[test]
    fn test_unknown_host_has_no_store() {
        assert_eq!(store_slug_for_host("evil.example", "souk.test", None), None);
        assert_eq!(
            store_slug_for_host("a.b.souk.test", "souk.test", None),
            None,
            "nested subdomains do not resolve"
        );
    }

    #[test]
    fn test_suffix_match_requires_dot_boundary() {
        // "notsouk.test" ends with "souk.test" but is a different domain.
        assert_eq!(
            store_slug_for_host("notsouk.test", "souk.test", Some("flagship")),
            None
        );
    }
}
