use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;

    Ok(password_hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("Invalid password hash: {}", e))?;

    let argon2 = Argon2::default();
    let result = argon2.verify_password(password.as_bytes(), &parsed_hash);

    match result {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("Password verification error: {}", e)),
    }
}

/// Hashes a security-question answer after normalizing it, so minor
/// formatting differences at redemption time do not lock the user out.
pub fn hash_security_answer(answer: &str) -> anyhow::Result<String> {
    hash_password(&normalize_answer(answer))
}

/// Verifies a security-question answer against its stored hash.
pub fn verify_security_answer(answer: &str, hash: &str) -> anyhow::Result<bool> {
    verify_password(&normalize_answer(answer), hash)
}

fn normalize_answer(answer: &str) -> String {
    answer.trim().to_lowercase()
}
