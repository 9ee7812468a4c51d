//! Federated sign-in front door.
//!
//! The provider handshake (authorization code + PKCE) is delegated to the
//! `oauth2` strategy library; this module owns the state nonce binding the
//! redirect to the callback and the final step of turning an asserted
//! identity into a local account and session.

use axum::{
    extract::{Query, State},
    response::Redirect,
};
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;
use std::env;

use crate::{
    error::AppError,
    handlers::auth::{session_cookie_header, SetCookie},
    middleware::role_guard::landing_path,
    repositories::{session as session_repo, user as user_repo},
    state::AppState,
};

/// OAuth client type with auth and token endpoints set.
type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// Provider settings read from the environment. Defaults target Google;
/// any authorization-code provider with a JSON userinfo endpoint works.
pub struct OAuthProviderConfig {
    pub provider: String,
    pub client_id: ClientId,
    pub client_secret: ClientSecret,
    pub auth_url: AuthUrl,
    pub token_url: TokenUrl,
    pub redirect_url: RedirectUrl,
    pub userinfo_url: url::Url,
    pub scopes: Vec<String>,
}

impl OAuthProviderConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let provider = env::var("OAUTH_PROVIDER").unwrap_or_else(|_| "google".to_string());
        let client_id =
            env::var("OAUTH_CLIENT_ID").map_err(|_| anyhow::anyhow!("OAUTH_CLIENT_ID not set"))?;
        let client_secret = env::var("OAUTH_CLIENT_SECRET")
            .map_err(|_| anyhow::anyhow!("OAUTH_CLIENT_SECRET not set"))?;
        let redirect_uri = env::var("OAUTH_REDIRECT_URI")
            .unwrap_or_else(|_| "http://localhost:3000/api/auth/oauth/callback".to_string());
        let auth_url = env::var("OAUTH_AUTH_URL")
            .unwrap_or_else(|_| "https://accounts.google.com/o/oauth2/v2/auth".to_string());
        let token_url = env::var("OAUTH_TOKEN_URL")
            .unwrap_or_else(|_| "https://oauth2.googleapis.com/token".to_string());
        let userinfo_url = env::var("OAUTH_USERINFO_URL")
            .unwrap_or_else(|_| "https://www.googleapis.com/oauth2/v2/userinfo".to_string());
        let scopes = env::var("OAUTH_SCOPES")
            .unwrap_or_else(|_| "openid,email,profile".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            provider,
            client_id: ClientId::new(client_id),
            client_secret: ClientSecret::new(client_secret),
            auth_url: AuthUrl::new(auth_url)?,
            token_url: TokenUrl::new(token_url)?,
            redirect_url: RedirectUrl::new(redirect_uri)?,
            userinfo_url: url::Url::parse(&userinfo_url)?,
            scopes,
        })
    }
}

fn build_client(config: &OAuthProviderConfig) -> ConfiguredClient {
    BasicClient::new(config.client_id.clone())
        .set_client_secret(config.client_secret.clone())
        .set_auth_uri(config.auth_url.clone())
        .set_token_uri(config.token_url.clone())
        .set_redirect_uri(config.redirect_url.clone())
}

/// Identity asserted by the provider's userinfo endpoint.
#[derive(Debug, Deserialize)]
struct OAuthIdentity {
    sub: Option<String>,
    id: Option<String>,
    email: String,
    name: Option<String>,
}

impl OAuthIdentity {
    fn subject(&self) -> Option<&str> {
        self.sub.as_deref().or(self.id.as_deref())
    }
}

/// Begins the flow: issues a single-use state nonce bound to a PKCE
/// verifier and redirects to the provider.
pub async fn start(State(state): State<AppState>) -> Result<Redirect, AppError> {
    let config = provider_config()?;
    let client = build_client(&config);

    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

    let mut auth_request = client.authorize_url(CsrfToken::new_random);
    for scope in &config.scopes {
        auth_request = auth_request.add_scope(Scope::new(scope.clone()));
    }
    let (auth_url, csrf_state) = auth_request.set_pkce_challenge(pkce_challenge).url();

    state
        .oauth_states
        .store(csrf_state.secret(), pkce_verifier.secret().clone())
        .await
        .map_err(AppError::InternalServerError)?;

    Ok(Redirect::to(auth_url.as_str()))
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: String,
    pub state: String,
}

/// Finishes the flow: the state nonce is consumed (a replayed callback
/// finds nothing), the code is exchanged through the strategy library, and
/// the asserted identity becomes a local account and session.
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<OAuthCallbackQuery>,
) -> Result<(SetCookie, Redirect), AppError> {
    let config = provider_config()?;

    let verifier = state
        .oauth_states
        .consume(&query.state)
        .await
        .ok_or_else(authentication_failed)?;

    let http_client = reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| AppError::InternalServerError(e.into()))?;

    let client = build_client(&config);
    let token_result = client
        .exchange_code(AuthorizationCode::new(query.code))
        .set_pkce_verifier(PkceCodeVerifier::new(verifier))
        .request_async(&http_client)
        .await
        .map_err(|err| {
            tracing::warn!(error = %err, "OAuth code exchange failed");
            authentication_failed()
        })?;

    let identity: OAuthIdentity = http_client
        .get(config.userinfo_url.clone())
        .bearer_auth(token_result.access_token().secret())
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|err| {
            tracing::warn!(error = %err, "OAuth userinfo request failed");
            authentication_failed()
        })?
        .json()
        .await
        .map_err(|err| {
            tracing::warn!(error = %err, "OAuth userinfo response was not understood");
            authentication_failed()
        })?;

    let subject = identity.subject().ok_or_else(authentication_failed)?;
    let full_name = identity.name.clone().unwrap_or_else(|| identity.email.clone());

    let user = user_repo::upsert_oauth_user(
        &state.pool,
        &config.provider,
        subject,
        &identity.email,
        &full_name,
    )
    .await?;

    let session = session_repo::create_session(
        &state.pool,
        user.id,
        user.role,
        user.mfa_enabled,
        state.config.session_idle(),
    )
    .await?;

    let destination = format!("{}{}", state.config.frontend_url, landing_path(user.role));
    Ok((
        session_cookie_header(&state, &session.token),
        Redirect::to(&destination),
    ))
}

fn provider_config() -> Result<OAuthProviderConfig, AppError> {
    OAuthProviderConfig::from_env()
        .map_err(|_| AppError::NotFound("OAuth sign-in is not configured".into()))
}

fn authentication_failed() -> AppError {
    AppError::Unauthorized("Authentication failed".into())
}
