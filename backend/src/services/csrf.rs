//! Single-use anti-forgery tokens for state-changing requests.

use chrono::Duration;
use std::sync::Arc;

use crate::services::token_cache::TokenCacheTrait;
use crate::utils::security::generate_token;

/// Number of random bytes backing a CSRF token (256 bits).
const CSRF_TOKEN_BYTES: usize = 32;

pub struct CsrfTokenManager {
    cache: Arc<dyn TokenCacheTrait>,
    ttl: Duration,
}

impl CsrfTokenManager {
    pub fn new(cache: Arc<dyn TokenCacheTrait>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn issue(&self) -> anyhow::Result<String> {
        let token = generate_token(CSRF_TOKEN_BYTES);
        self.cache
            .put(&Self::key(&token), String::new(), self.ttl)
            .await?;
        Ok(token)
    }

    /// Consumes a token. A `true` result means the token existed, was
    /// unexpired, and has already been removed, so a replay of the same
    /// token fails. Missing, expired, already-used, and store-failure all
    /// collapse to `false`; callers reject without distinguishing them.
    pub async fn validate(&self, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }
        match self.cache.take(&Self::key(token)).await {
            Ok(found) => found.is_some(),
            Err(err) => {
                tracing::warn!(error = ?err, "CSRF token store unavailable, rejecting request");
                false
            }
        }
    }

    fn key(token: &str) -> String {
        format!("csrf:{}", token)
    }
}
