//! Anti-forgery enforcement for state-changing requests.
//!
//! Safe methods pass through unconditionally; the exemption is by method,
//! not by whether a token happens to be present. The token arrives either
//! in the `x-csrf-token` header or as a `_csrf` field in a JSON body.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, state::AppState};

pub const CSRF_HEADER_NAME: &str = "x-csrf-token";

/// Bodies larger than this cannot carry the fallback `_csrf` field; send
/// the header instead.
const CSRF_BODY_LIMIT: usize = 1 << 20;

pub async fn csrf(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.config.csrf_enabled || !is_state_changing(request.method()) {
        return Ok(next.run(request).await);
    }

    if let Some(token) = header_token(request.headers()) {
        if state.csrf.validate(&token).await {
            return Ok(next.run(request).await);
        }
        return Err(rejection());
    }

    // No header: buffer the body and look for the `_csrf` field, then put
    // the bytes back for the handler.
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, CSRF_BODY_LIMIT)
        .await
        .map_err(|_| rejection())?;

    let token = serde_json::from_slice::<serde_json::Value>(&bytes)
        .ok()
        .and_then(|value| {
            value
                .get("_csrf")
                .and_then(|t| t.as_str())
                .map(str::to_string)
        });

    let valid = match token {
        Some(token) => state.csrf.validate(&token).await,
        None => false,
    };

    if !valid {
        return Err(rejection());
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(request).await)
}

fn is_state_changing(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

fn header_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CSRF_HEADER_NAME)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// One rejection for missing, expired, and already-used tokens alike.
fn rejection() -> AppError {
    AppError::Forbidden("Request verification failed".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_changing_methods_are_guarded() {
        assert!(is_state_changing(&Method::POST));
        assert!(is_state_changing(&Method::PUT));
        assert!(is_state_changing(&Method::PATCH));
        assert!(is_state_changing(&Method::DELETE));
    }

    #[test]
    fn safe_methods_are_exempt() {
        assert!(!is_state_changing(&Method::GET));
        assert!(!is_state_changing(&Method::HEAD));
        assert!(!is_state_changing(&Method::OPTIONS));
    }

    #[test]
    fn header_token_ignores_blank_values() {
        let mut headers = HeaderMap::new();
        headers.insert(CSRF_HEADER_NAME, "  ".parse().unwrap());
        assert!(header_token(&headers).is_none());

        headers.insert(CSRF_HEADER_NAME, "abc123".parse().unwrap());
        assert_eq!(header_token(&headers).as_deref(), Some("abc123"));
    }
}
