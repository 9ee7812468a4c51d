//! Router assembly: route groups and the shared middleware stack.

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers,
    middleware::{auth as auth_middleware, csrf, role_guard, role_guard::Resource},
    state::AppState,
};

pub fn build_router(state: AppState) -> Router {
    // No session required.
    let public_routes = Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/csrf-token", get(handlers::auth::csrf_token))
        .route(
            "/api/auth/forgot-password",
            post(handlers::password::forgot_password),
        )
        .route(
            "/api/auth/reset-password",
            post(handlers::password::reset_password),
        )
        .route(
            "/api/auth/security-questions",
            post(handlers::password::security_question_reset),
        )
        .route("/api/auth/oauth/start", get(handlers::oauth::start))
        .route("/api/auth/oauth/callback", get(handlers::oauth::callback));

    // Sessions that still owe a one-time code may reach these.
    let pending_routes = Router::new()
        .route("/api/auth/mfa/initiate", post(handlers::mfa::initiate))
        .route("/api/auth/mfa/verify", post(handlers::mfa::verify))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::auth_allow_pending,
        ));

    // Fully authenticated sessions only.
    let user_routes = Router::new()
        .route("/api/auth/me", get(handlers::auth::me))
        .route(
            "/api/auth/change-password",
            put(handlers::auth::change_password),
        )
        .route("/api/auth/mfa", put(handlers::auth::update_mfa))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::auth,
        ));

    // Admin surface; authentication runs first, then the resource guard.
    let admin_routes = Router::new()
        .route("/api/admin/users", get(handlers::admin::list_users))
        .route(
            "/api/admin/users/{id}/logout",
            post(handlers::admin::force_logout),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            Resource::AdminUsers,
            role_guard::require_resource,
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(pending_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state))
                .layer(axum_middleware::from_fn_with_state(
                    state.clone(),
                    csrf::csrf,
                )),
        )
        .with_state(state)
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_allow_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(csrf::CSRF_HEADER_NAME),
        ])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(24 * 60 * 60))
}
