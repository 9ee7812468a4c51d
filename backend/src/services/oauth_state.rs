//! Single-use state nonces binding an authorization redirect to its
//! callback.

use chrono::Duration;
use std::sync::Arc;

use crate::services::token_cache::TokenCacheTrait;

/// How long a pending authorization redirect stays redeemable.
const STATE_TTL_MINUTES: i64 = 10;

pub struct OAuthStateStore {
    cache: Arc<dyn TokenCacheTrait>,
}

impl OAuthStateStore {
    pub fn new(cache: Arc<dyn TokenCacheTrait>) -> Self {
        Self { cache }
    }

    /// Records a state nonce issued at redirect time, keeping the PKCE
    /// verifier alongside it for the token exchange.
    pub async fn store(&self, state: &str, pkce_verifier: String) -> anyhow::Result<()> {
        self.cache
            .put(
                &Self::key(state),
                pkce_verifier,
                Duration::minutes(STATE_TTL_MINUTES),
            )
            .await
    }

    /// Consumes a state nonce, returning the stored verifier. The nonce is
    /// removed before it is handed back, so a replayed callback finds
    /// nothing.
    pub async fn consume(&self, state: &str) -> Option<String> {
        match self.cache.take(&Self::key(state)).await {
            Ok(verifier) => verifier,
            Err(err) => {
                tracing::warn!(error = ?err, "OAuth state store unavailable, rejecting callback");
                None
            }
        }
    }

    fn key(state: &str) -> String {
        format!("oauth-state:{}", state)
    }
}
