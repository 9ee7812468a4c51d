use sqlx::PgPool;
use std::sync::Arc;

use crate::config::Config;
use crate::services::csrf::CsrfTokenManager;
use crate::services::mfa::MfaChallengeService;
use crate::services::oauth_state::OAuthStateStore;
use crate::services::token_cache::{MemoryTokenCache, TokenCacheTrait};
use crate::utils::email::EmailService;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub token_cache: Arc<dyn TokenCacheTrait>,
    pub csrf: Arc<CsrfTokenManager>,
    pub mfa: Arc<MfaChallengeService>,
    pub oauth_states: Arc<OAuthStateStore>,
    pub email: Arc<EmailService>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> anyhow::Result<Self> {
        let token_cache: Arc<dyn TokenCacheTrait> = Arc::new(MemoryTokenCache::new());
        let csrf = Arc::new(CsrfTokenManager::new(
            token_cache.clone(),
            config.csrf_token_ttl(),
        ));
        let mfa = Arc::new(MfaChallengeService::new(config.mfa_code_ttl()));
        let oauth_states = Arc::new(OAuthStateStore::new(token_cache.clone()));
        let email = Arc::new(EmailService::new()?);

        Ok(Self {
            pool,
            config,
            token_cache,
            csrf,
            mfa,
            oauth_states,
            email,
        })
    }
}
