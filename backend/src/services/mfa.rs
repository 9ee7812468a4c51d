//! One-time numeric login challenges with bounded verification attempts.
//!
//! Challenges live in process-local memory; like the anti-forgery tokens
//! they are not shared across server instances. See
//! [`crate::services::token_cache`] for the deployment boundary this
//! implies.

use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, Rng};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::utils::security::constant_time_eq;

/// A verification attempt past this count invalidates the challenge, even
/// when it carries the right code.
const MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone)]
struct MfaChallenge {
    code: String,
    expires_at: DateTime<Utc>,
    attempts: u32,
}

pub struct MfaChallengeService {
    challenges: Mutex<HashMap<Uuid, MfaChallenge>>,
    ttl: Duration,
}

impl MfaChallengeService {
    pub fn new(ttl: Duration) -> Self {
        Self {
            challenges: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Creates a challenge for a user and returns the code for out-of-band
    /// delivery. A prior challenge for the same user is replaced, which also
    /// resets its attempt counter. The user identity must come from a
    /// resolved session, never from a request body.
    pub fn initiate(&self, user_id: Uuid) -> String {
        let code = format!("{}", OsRng.gen_range(100_000..=999_999));
        let challenge = MfaChallenge {
            code: code.clone(),
            expires_at: Utc::now() + self.ttl,
            attempts: 0,
        };
        self.challenges
            .lock()
            .expect("mfa challenges poisoned")
            .insert(user_id, challenge);
        code
    }

    /// Verifies a submitted code. Every call consumes an attempt first;
    /// once the counter passes the limit the challenge is destroyed, so the
    /// sixth try fails even with the right code. Codes are compared without
    /// short-circuiting so timing does not reveal how many leading digits
    /// matched.
    pub fn verify(&self, user_id: Uuid, supplied_code: &str) -> bool {
        let mut challenges = self.challenges.lock().expect("mfa challenges poisoned");

        let Some(challenge) = challenges.get_mut(&user_id) else {
            return false;
        };

        if challenge.expires_at <= Utc::now() {
            challenges.remove(&user_id);
            return false;
        }

        challenge.attempts += 1;
        if challenge.attempts > MAX_ATTEMPTS {
            challenges.remove(&user_id);
            return false;
        }

        let matches = constant_time_eq(challenge.code.as_bytes(), supplied_code.trim().as_bytes());
        if matches {
            challenges.remove(&user_id);
        }
        matches
    }

    /// Drops the user's challenge outright, used when the session it was
    /// bound to goes away.
    pub fn discard(&self, user_id: Uuid) {
        self.challenges
            .lock()
            .expect("mfa challenges poisoned")
            .remove(&user_id);
    }

    /// Removes expired challenges, returning how many were dropped.
    pub fn sweep(&self) -> usize {
        let mut challenges = self.challenges.lock().expect("mfa challenges poisoned");
        let now = Utc::now();
        let before = challenges.len();
        challenges.retain(|_, challenge| challenge.expires_at > now);
        before - challenges.len()
    }
}
