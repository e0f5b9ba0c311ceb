//! Content fingerprinting for change detection.
//!
//! A document is reprocessed only when the SHA-256 of its current bytes
//! differs from the fingerprint stored in the ledger. The hash is used for
//! cheap change detection, not for anything security-sensitive.

use sha2::{Digest, Sha256};

/// Hex SHA-256 digest of the given bytes. Deterministic, pure.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        assert_eq!(fingerprint(b"hello"), fingerprint(b"hello"));
    }

    #[test]
    fn test_distinguishes_content() {
        assert_ne!(fingerprint(b"hello"), fingerprint(b"hello "));
    }

    #[test]
    fn test_known_vector() {
        // SHA-256 of the empty string.
        assert_eq!(
            fingerprint(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
