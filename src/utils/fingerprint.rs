use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Content fingerprint of a fetched definition.
///
/// Definitions are never refreshed while a validator is alive. Fingerprints
/// let an operator compare what was loaded across restarts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DefinitionFingerprint {
    /// Canonical URL of the definition
    pub url: String,
    /// Business version, when the definition declares one
    pub version: Option<String>,
    /// Location the payload was fetched from
    pub location: String,
    /// SHA-256 hash of the raw payload
    pub content_hash: String,
    /// Timestamp when the payload was fetched
    pub fetched_at: chrono::DateTime<chrono::Utc>,
}

impl DefinitionFingerprint {
    pub fn new(
        url: impl Into<String>,
        version: Option<String>,
        location: impl Into<String>,
        content_hash: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            version,
            location: location.into(),
            content_hash: content_hash.into(),
            fetched_at: chrono::Utc::now(),
        }
    }

    /// Same definition with the same content, regardless of fetch time.
    pub fn matches(&self, other: &DefinitionFingerprint) -> bool {
        self.url == other.url
            && self.version == other.version
            && self.content_hash == other.content_hash
    }

    /// Get a short representation of the fingerprint for logging
    pub fn short_hash(&self) -> &str {
        self.content_hash.get(..8).unwrap_or(&self.content_hash)
    }
}

/// Hex encoded SHA-256 of a payload.
pub fn content_hash(contents: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(contents);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_matching_ignores_fetch_time() {
        let first = DefinitionFingerprint::new("http://x/sd", None, "a.json", "hash123");
        let second = DefinitionFingerprint::new("http://x/sd", None, "b.json", "hash123");
        let changed = DefinitionFingerprint::new("http://x/sd", None, "a.json", "hash456");

        assert!(first.matches(&second));
        assert!(!first.matches(&changed));
    }

    #[test]
    fn test_content_hash_differs_per_payload() {
        let hash = content_hash(b"test content");
        assert_eq!(hash.len(), 64);
        assert_ne!(hash, content_hash(b"different content"));

        let fingerprint = DefinitionFingerprint::new("u", None, "l", hash.clone());
        assert_eq!(fingerprint.short_hash(), &hash[..8]);
    }
}
