use serde::{Deserialize, Serialize};
use std::env;

use crate::utils::cookies::{CookieOptions, SameSite};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    /// Sliding idle timeout applied to sessions, in minutes.
    pub session_idle_minutes: i64,
    /// Lifetime of password reset tokens, in minutes.
    pub reset_token_ttl_minutes: i64,
    /// Whether anti-forgery tokens are required on state-changing requests.
    pub csrf_enabled: bool,
    pub csrf_token_ttl_minutes: i64,
    /// Lifetime of one-time MFA codes, in minutes.
    pub mfa_code_ttl_minutes: i64,
    /// Gates Secure cookies and suppresses dev-only code echoing.
    pub production_mode: bool,
    pub cookie_same_site: SameSite,
    pub cors_allow_origins: Vec<String>,
    pub frontend_url: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/shiptrace".to_string());

        let session_idle_minutes = parse_env("SESSION_IDLE_MINUTES", 60);
        let reset_token_ttl_minutes = parse_env("RESET_TOKEN_TTL_MINUTES", 15);
        let csrf_token_ttl_minutes = parse_env("CSRF_TOKEN_TTL_MINUTES", 30);
        let mfa_code_ttl_minutes = parse_env("MFA_CODE_TTL_MINUTES", 5);

        let csrf_enabled = env::var("CSRF_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let production_mode = env::var("PRODUCTION_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        // Cross-origin production deployments need SameSite=None; local
        // development defaults to Lax.
        let cookie_same_site = env::var("COOKIE_SAME_SITE")
            .ok()
            .and_then(|v| SameSite::parse(&v))
            .unwrap_or(if production_mode {
                SameSite::None
            } else {
                SameSite::Lax
            });

        let cors_allow_origins = env::var("CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:8000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());

        Ok(Config {
            database_url,
            session_idle_minutes,
            reset_token_ttl_minutes,
            csrf_enabled,
            csrf_token_ttl_minutes,
            mfa_code_ttl_minutes,
            production_mode,
            cookie_same_site,
            cors_allow_origins,
            frontend_url,
        })
    }

    pub fn session_idle(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session_idle_minutes)
    }

    pub fn reset_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.reset_token_ttl_minutes)
    }

    pub fn csrf_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.csrf_token_ttl_minutes)
    }

    pub fn mfa_code_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.mfa_code_ttl_minutes)
    }

    /// Cookie attributes derived from the deployment mode.
    pub fn cookie_options(&self) -> CookieOptions {
        CookieOptions {
            secure: self.production_mode,
            same_site: self.cookie_same_site,
        }
    }
}

fn parse_env(name: &str, default: i64) -> i64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> Config {
        Config {
            database_url: "postgres://test".into(),
            session_idle_minutes: 60,
            reset_token_ttl_minutes: 15,
            csrf_enabled: true,
            csrf_token_ttl_minutes: 30,
            mfa_code_ttl_minutes: 5,
            production_mode: false,
            cookie_same_site: SameSite::Lax,
            cors_allow_origins: vec!["http://localhost:8000".into()],
            frontend_url: "http://localhost:8000".into(),
        }
    }

    #[test]
    fn durations_reflect_configured_minutes() {
        let config = sample_config();
        assert_eq!(config.session_idle(), chrono::Duration::minutes(60));
        assert_eq!(config.reset_token_ttl(), chrono::Duration::minutes(15));
        assert_eq!(config.csrf_token_ttl(), chrono::Duration::minutes(30));
        assert_eq!(config.mfa_code_ttl(), chrono::Duration::minutes(5));
    }

    #[test]
    fn cookie_options_follow_production_mode() {
        let mut config = sample_config();
        assert!(!config.cookie_options().secure);
        config.production_mode = true;
        assert!(config.cookie_options().secure);
    }
}
