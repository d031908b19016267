//! Content checksums for bundle code
//!
//! A bundle's checksum decides whether a cached copy still matches the
//! authoritative remote version. Timestamps alone are never trusted.

use sha2::{Digest, Sha256};

/// Number of hex characters shown in log lines
const SHORT_LEN: usize = 12;

/// Hash bundle code using SHA256, returning lowercase hex
pub fn compute_checksum(code: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_ref());
    hex::encode(hasher.finalize())
}

/// Abbreviated checksum for display
pub fn short_checksum(checksum: &str) -> &str {
    match checksum.char_indices().nth(SHORT_LEN) {
        Some((idx, _)) => &checksum[..idx],
        None => checksum,
    }
}

/// Compare two checksums, ignoring hex case
pub fn checksums_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_deterministic() {
        let a = compute_checksum("export default {}");
        let b = compute_checksum(b"export default {}");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn checksum_different_content() {
        assert_ne!(compute_checksum("bundle 1"), compute_checksum("bundle 2"));
    }

    #[test]
    fn checksum_known_vector() {
        assert_eq!(
            compute_checksum(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn short_checksum_truncates() {
        let full = compute_checksum("abc");
        assert_eq!(short_checksum(&full), &full[..12]);
        assert_eq!(short_checksum("abc"), "abc");
    }

    #[test]
    fn match_ignores_case() {
        assert!(checksums_match("ABCdef", "abcDEF"));
        assert!(!checksums_match("abc", "abd"));
    }
}
