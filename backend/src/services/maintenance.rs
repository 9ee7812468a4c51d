//! Periodic cleanup of expired credentials.
//!
//! The sweep runs on a fixed interval independent of request traffic, with
//! a delayed first run, and is started and stopped explicitly by the
//! process entry point rather than as a side effect of first use.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::repositories::{password_reset as password_reset_repo, session as session_repo};
use crate::state::AppState;

/// Default sweep cadence.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

pub struct MaintenanceTask {
    handle: JoinHandle<()>,
}

impl MaintenanceTask {
    /// Spawns the sweep loop. The first run fires after one full interval.
    pub fn start(state: AppState, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                run_sweep(&state).await;
            }
        });
        Self { handle }
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

async fn run_sweep(state: &AppState) {
    match session_repo::cleanup_expired_sessions(&state.pool).await {
        Ok(count) if count > 0 => tracing::info!("Deleted {} expired sessions", count),
        Ok(_) => {}
        Err(err) => tracing::warn!(error = ?err, "Session cleanup failed"),
    }

    match password_reset_repo::delete_expired_tokens(&state.pool).await {
        Ok(count) if count > 0 => {
            tracing::info!("Deleted {} expired password reset tokens", count)
        }
        Ok(_) => {}
        Err(err) => tracing::warn!(error = ?err, "Password reset cleanup failed"),
    }

    match state.token_cache.sweep().await {
        Ok(count) if count > 0 => tracing::debug!("Swept {} expired cached tokens", count),
        Ok(_) => {}
        Err(err) => tracing::warn!(error = ?err, "Token cache sweep failed"),
    }

    let swept_challenges = state.mfa.sweep();
    if swept_challenges > 0 {
        tracing::debug!("Swept {} expired login challenges", swept_challenges);
    }
}
