use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::CallerContext;
use crate::rate_limit::RateLimiter;

/// Resolve the optional bearer token into a [`CallerContext`].
///
/// No `Authorization` header means an anonymous caller; a header that is
/// present but malformed, expired, or for a deleted account is rejected.
pub async fn auth_middleware(
    State(services): State<Arc<AppServices>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let caller = match extract_bearer(req.headers())? {
        None => CallerContext::anonymous(),
        Some(token) => {
            let identity = services.resources.resolve_identity(token)?;
            CallerContext::authenticated(identity)
        }
    };

    req.extensions_mut().insert(caller);
    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<Option<&str>, ApiError> {
    let Some(header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let header = header.to_str().map_err(|_| ApiError::unauthenticated())?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(ApiError::unauthenticated)?
        .trim();
    if token.is_empty() {
        return Err(ApiError::unauthenticated());
    }

    Ok(Some(token))
}

/// Reject clients that exceeded their request budget with 429.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = client_key(&req);
    if !limiter.check(&client) {
        tracing::warn!(client = %client, "rate limit exceeded");
        return Err(ApiError::RateLimited);
    }
    Ok(next.run(req).await)
}

/// First `X-Forwarded-For` hop, else the peer address.
fn client_key(req: &Request) -> String {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::HeaderValue;

    #[test]
    fn missing_header_is_anonymous() {
        assert!(matches!(extract_bearer(&HeaderMap::new()), Ok(None)));
    }

    #[test]
    fn non_bearer_header_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(matches!(
            extract_bearer(&headers),
            Err(ApiError::Unauthenticated(_))
        ));

        headers.insert("authorization", HeaderValue::from_static("Bearer   "));
        assert!(extract_bearer(&headers).is_err());
    }

    #[test]
    fn bearer_token_is_trimmed() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def "));
        assert_eq!(extract_bearer(&headers).unwrap(), Some("abc.def"));
    }

    #[test]
    fn client_key_prefers_forwarded_for() {
        let mut req = Request::new(Body::empty());
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 1], 4000))));
        assert_eq!(client_key(&req), "10.0.0.1");

        req.headers_mut().insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_key(&req), "203.0.113.7");
    }
}
