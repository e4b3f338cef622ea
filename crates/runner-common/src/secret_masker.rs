// Process-wide registry of secret values and their replacement in output.

use parking_lot::RwLock;
use std::sync::Arc;

/// Replacement text used when a secret is found.
pub const MASK: &str = "***";

/// A thread-safe secret masker that replaces registered secret values
/// in arbitrary strings with `***`.
///
/// The credential and the registration token are added the moment they
/// enter the process; every trace line passes through `mask_secrets`.
#[derive(Debug, Clone, Default)]
pub struct SecretMasker {
    inner: Arc<RwLock<Vec<String>>>,
}

impl SecretMasker {
    /// Create a new empty `SecretMasker`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a secret value. Empty or whitespace-only values are ignored.
    pub fn add_value(&self, secret: &str) {
        let trimmed = secret.trim();
        if trimmed.is_empty() {
            return;
        }

        let mut secrets = self.inner.write();
        if !secrets.iter().any(|s| s == trimmed) {
            secrets.push(trimmed.to_string());
            // Longest first, so a secret that contains another is masked whole.
            secrets.sort_by(|a, b| b.len().cmp(&a.len()));
        }
    }

    /// Replace all registered secret values in `input` with `***`.
    pub fn mask_secrets(&self, input: &str) -> String {
        let secrets = self.inner.read();

        let mut result = input.to_string();
        for secret in secrets.iter() {
            if result.contains(secret.as_str()) {
                result = result.replace(secret.as_str(), MASK);
            }
        }

        result
    }

    /// Returns the number of registered secrets.
    pub fn secret_count(&self) -> usize {
        self.inner.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_single_secret() {
        let masker = SecretMasker::new();
        masker.add_value("ghp_abc123");
        assert_eq!(
            masker.mask_secrets("Authorization: token ghp_abc123"),
            "Authorization: token ***"
        );
    }

    #[test]
    fn test_mask_overlapping_secrets() {
        let masker = SecretMasker::new();
        masker.add_value("tok");
        masker.add_value("token-value");
        assert_eq!(masker.mask_secrets("x token-value y tok"), "x *** y ***");
    }

    #[test]
    fn test_clones_share_registry() {
        let masker = SecretMasker::new();
        let clone = masker.clone();
        clone.add_value("shared");
        assert_eq!(masker.mask_secrets("a shared b"), "a *** b");
        assert_eq!(masker.secret_count(), 1);
    }

    #[test]
    fn test_empty_and_duplicate_ignored() {
        let masker = SecretMasker::new();
        masker.add_value("");
        masker.add_value("   ");
        masker.add_value("dup");
        masker.add_value(" dup ");
        assert_eq!(masker.secret_count(), 1);
        assert_eq!(masker.mask_secrets("hello world"), "hello world");
    }
}
