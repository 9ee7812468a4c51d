//! Anti-forgery enforcement exercised through the real router. These tests
//! never reach the database: rejection happens in middleware, and the one
//! request that passes the check fails credential lookup afterwards.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

use shiptrace_backend::app::build_router;

mod support;

fn app(csrf_enabled: bool) -> axum::Router {
    let config = if csrf_enabled {
        support::test_config_with_csrf()
    } else {
        support::test_config()
    };
    build_router(support::test_state(support::lazy_pool(), config))
}

fn login_request() -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            r#"{"email":"someone@example.com","password":"irrelevant"}"#,
        ))
        .unwrap()
}

async fn issue_token(app: &axum::Router) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/csrf-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    json["csrf_token"].as_str().expect("token issued").to_string()
}

#[tokio::test]
async fn state_changing_request_without_token_is_rejected() {
    let app = app(true);
    let response = app.oneshot(login_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn token_fetch_is_exempt_because_it_is_a_safe_method() {
    let app = app(true);
    // Issuing a token requires no token; the exemption is the GET method.
    let _token = issue_token(&app).await;
}

#[tokio::test]
async fn header_token_is_accepted_exactly_once() {
    let app = app(true);
    let token = issue_token(&app).await;

    let mut request = login_request();
    request
        .headers_mut()
        .insert("x-csrf-token", token.parse().unwrap());
    let response = app.clone().oneshot(request).await.unwrap();
    // Past the anti-forgery check; the credential check fails afterwards.
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Replaying the same token is rejected before anything else runs.
    let mut replay = login_request();
    replay
        .headers_mut()
        .insert("x-csrf-token", token.parse().unwrap());
    let response = app.oneshot(replay).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn body_field_token_is_accepted() {
    let app = app(true);
    let token = issue_token(&app).await;

    let body = format!(
        r#"{{"email":"someone@example.com","password":"irrelevant","_csrf":"{}"}}"#,
        token
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forged_token_is_rejected() {
    let app = app(true);
    let mut request = login_request();
    request
        .headers_mut()
        .insert("x-csrf-token", "0".repeat(64).parse().unwrap());
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn disabled_flag_bypasses_the_check() {
    let app = app(false);
    let response = app.oneshot(login_request()).await.unwrap();
    // Straight through to the credential check.
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rejection_is_identical_for_missing_invalid_and_replayed_tokens() {
    let app = app(true);
    let token = issue_token(&app).await;

    // Consume the token once.
    let mut first = login_request();
    first
        .headers_mut()
        .insert("x-csrf-token", token.parse().unwrap());
    app.clone().oneshot(first).await.unwrap();

    let mut bodies = Vec::new();
    for token_value in [None, Some("deadbeef".to_string()), Some(token)] {
        let mut request = login_request();
        if let Some(value) = token_value {
            request
                .headers_mut()
                .insert("x-csrf-token", value.parse().unwrap());
        }
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        bodies.push(bytes);
    }
    assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));
}
