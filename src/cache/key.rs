//! Cache key generation using SHA-256 hashes

use sha2::{Digest, Sha256};

/// Generate a deterministic cache key from an operation and its parameters.
///
/// The key is a SHA-256 hash of the operation name, scope, and sorted
/// parameters, so parameter order never produces a distinct key.
pub fn cache_key(operation: &str, scope: Option<&str>, params: &[(&str, &str)]) -> String {
    let mut hasher = Sha256::new();

    hasher.update(operation.as_bytes());
    hasher.update(b"|");

    if let Some(scope) = scope {
        hasher.update(scope.as_bytes());
    }
    hasher.update(b"|");

    let mut sorted_params: Vec<_> = params.iter().collect();
    sorted_params.sort_by_key(|(k, _)| *k);

    for (k, v) in sorted_params {
        hasher.update(k.as_bytes());
        hasher.update(b"=");
        hasher.update(v.as_bytes());
        hasher.update(b"&");
    }

    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_param_order_irrelevant() {
        let key1 = cache_key(
            "cost_by_service",
            Some("ten-1"),
            &[("window", "30d"), ("granularity", "day")],
        );
        let key2 = cache_key(
            "cost_by_service",
            Some("ten-1"),
            &[("granularity", "day"), ("window", "30d")],
        );

        assert_eq!(key1, key2);
    }

    #[test]
    fn test_cache_key_different_operations() {
        let key1 = cache_key("cost_by_service", Some("ten-1"), &[]);
        let key2 = cache_key("cost_by_compartment", Some("ten-1"), &[]);

        assert_ne!(key1, key2);
    }

    #[test]
    fn test_cache_key_different_scopes() {
        let key1 = cache_key("network_topology", Some("ten-1"), &[]);
        let key2 = cache_key("network_topology", Some("ten-2"), &[]);

        assert_ne!(key1, key2);
    }

    #[test]
    fn test_cache_key_no_scope() {
        let key1 = cache_key("regions", None, &[]);
        let key2 = cache_key("regions", None, &[]);

        assert_eq!(key1, key2);
    }
}
