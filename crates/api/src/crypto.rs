//! Hashing helpers for API keys and message-sender addresses.
//!
//! Raw secrets never touch the database; only SHA-256 digests are stored.

use sha2::{Digest, Sha256};

/// Prefix carried by every API key.
pub const API_KEY_PREFIX: &str = "gtk_";

/// Generate a new API key with the `gtk_` prefix.
pub fn generate_api_key() -> String {
    format!("{API_KEY_PREFIX}{}", uuid::Uuid::new_v4().simple())
}

/// SHA-256 hex digest of a token, used for storage and lookup.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Salted digest of a client address. Rate limiting counts rows by this value.
pub fn hash_ip(salt: &str, ip: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(ip.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_shape() {
        let key = generate_api_key();
        assert!(key.starts_with(API_KEY_PREFIX));
        assert_eq!(key.len(), API_KEY_PREFIX.len() + 32);
        assert_ne!(key, generate_api_key());
    }

    #[test]
    fn hash_token_is_stable_hex() {
        let h = hash_token("gtk_abc");
        assert_eq!(h.len(), 64);
        assert_eq!(h, hash_token("gtk_abc"));
        assert_ne!(h, hash_token("gtk_abd"));
    }

    #[test]
    fn hash_ip_depends_on_salt() {
        assert_eq!(hash_ip("s", "10.0.0.1"), hash_ip("s", "10.0.0.1"));
        assert_ne!(hash_ip("s", "10.0.0.1"), hash_ip("t", "10.0.0.1"));
        assert_ne!(hash_ip("s", "10.0.0.1"), hash_ip("s", "10.0.0.2"));
    }
}
