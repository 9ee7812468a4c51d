//! Token generation, token hashing, and timing-safe comparison.

use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Generates a cryptographically random token of `byte_len` bytes,
/// hex-encoded (so the returned string is `2 * byte_len` characters).
pub fn generate_token(byte_len: usize) -> String {
    let mut bytes = vec![0u8; byte_len];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 hex digest of a token. Stored in place of raw reset tokens so a
/// database leak does not hand out redeemable secrets.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Compares two byte strings without short-circuiting.
///
/// Both operands are padded to the longer length before the XOR
/// accumulation, so neither the match prefix nor the length difference
/// shows up in the comparison time.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let len = a.len().max(b.len());
    let mut diff = (a.len() ^ b.len()) as u8;
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_token_is_hex_of_requested_length() {
        let token = generate_token(32);
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generate_token_is_not_repeatable() {
        assert_ne!(generate_token(32), generate_token(32));
    }

    #[test]
    fn hash_token_is_deterministic_and_distinct() {
        let hash1 = hash_token("reset-token-abc");
        let hash2 = hash_token("reset-token-abc");
        assert_eq!(hash1, hash2);
        assert_ne!(hash_token("reset-token-xyz"), hash1);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn constant_time_eq_matches_equal_inputs() {
        assert!(constant_time_eq(b"123456", b"123456"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn constant_time_eq_rejects_differing_inputs() {
        assert!(!constant_time_eq(b"123456", b"123457"));
        assert!(!constant_time_eq(b"123456", b"654321"));
    }

    #[test]
    fn constant_time_eq_rejects_length_mismatch() {
        assert!(!constant_time_eq(b"123456", b"12345"));
        assert!(!constant_time_eq(b"12345", b"123456"));
        assert!(!constant_time_eq(b"", b"1"));
    }
}
