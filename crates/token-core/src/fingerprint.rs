//! Token fingerprints for revocation keys

use sha2::{Digest, Sha256};

/// Full SHA-256 fingerprint of a token string, hex encoded.
///
/// Revocation entries are keyed by the whole-token digest, so two distinct
/// tokens can never collide on a blacklist entry and the raw token never
/// appears in a backend key.
pub fn token_fingerprint(token: &str) -> String {
    use std::fmt::Write;

    let digest = Sha256::digest(token.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_full_sha256() {
        let fp = token_fingerprint("header.payload.signature");
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn fingerprint_depends_on_the_whole_token() {
        // Tokens sharing a long trailing substring must still map to
        // different entries.
        let suffix = "c".repeat(48);
        let a = token_fingerprint(&format!("a.{suffix}"));
        let b = token_fingerprint(&format!("b.{suffix}"));
        assert_ne!(a, b);
    }

    #[test]
    fn fingerprint_is_stable() {
        assert_eq!(token_fingerprint("token"), token_fingerprint("token"));
    }
}
