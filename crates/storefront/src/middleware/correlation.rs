//! Request correlation middleware.
//!
//! Every request gets a correlation id and a browser fingerprint. The id is
//! the upstream `x-request-id` when a proxy supplied one, a fresh UUID v4
//! otherwise; the fingerprint is a non-identifying hash of stable browser
//! headers. Both land on the tracing span and the Sentry scope, and the id
//! is echoed on the response so shoppers can quote it in support requests.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use tracing::Span;
use uuid::Uuid;

use crate::identity::browser_fingerprint;

/// Header carrying the correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub async fn correlation_middleware(request: Request, next: Next) -> Response {
    let request_id = request_id_from(request.headers());
    let fingerprint = fingerprint_from(request.headers());

    Span::current().record("request_id", &request_id);
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
        scope.set_tag("browser_fingerprint", &fingerprint);
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// The upstream id when present and readable, a fresh UUID otherwise.
fn request_id_from(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|id| !id.is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from)
}

fn fingerprint_from(headers: &HeaderMap) -> String {
    let user_agent = header_str(headers, header::USER_AGENT);
    let accept_language = header_str(headers, header::ACCEPT_LANGUAGE);
    browser_fingerprint(user_agent, accept_language)
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> &str {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_request_id_is_kept() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("lb-0042"));
        assert_eq!(request_id_from(&headers), "lb-0042");
    }

    #[test]
    fn test_missing_request_id_gets_a_uuid() {
        let id = request_id_from(&HeaderMap::new());
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_empty_request_id_is_replaced() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static(""));
        let id = request_id_from(&headers);
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_fingerprint_follows_browser_headers() {
        let mut first = HeaderMap::new();
        first.insert(header::USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
        first.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US"));
        let mut second = first.clone();
        second.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("fr-FR"));

        assert_eq!(fingerprint_from(&first), fingerprint_from(&first.clone()));
        assert_ne!(fingerprint_from(&first), fingerprint_from(&second));
        // Headerless clients still get a stable bucket.
        assert_eq!(
            fingerprint_from(&HeaderMap::new()),
            fingerprint_from(&HeaderMap::new())
        );
    }
}
