//! Content-addressed search cache keys.

use sha2::{Digest, Sha256};

/// Compute the lookup key for a search query.
///
/// SHA-256 of the exact query bytes, hex encoded. Stable across processes.
pub fn query_hash(query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_stability() {
        assert_eq!(query_hash("collection:BILLS"), query_hash("collection:BILLS"));
    }

    #[test]
    fn test_hash_is_exact_text() {
        assert_ne!(query_hash("climate"), query_hash("climate "));
        assert_ne!(query_hash("Climate"), query_hash("climate"));
    }

    #[test]
    fn test_hash_known_vector() {
        assert_eq!(query_hash("abc"), "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
    }

    #[test]
    fn test_hash_format() {
        let hash = query_hash("congress:118");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
