use serde::{Deserialize, Serialize};

use crate::ValidationResult;

/// Default nonce lifetime, one day in seconds.
pub const DEFAULT_NONCE_LIFETIME: i64 = 24 * 60 * 60;

/// Time configuration for nonce validity
///
/// A nonce is fresh during the first half of its lifetime and aged during
/// the second half. Past the lifetime it no longer verifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceTimeConfig {
    /// Issue time override (Unix timestamp); `None` uses the current time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    /// Lifetime in seconds
    pub lifetime: i64,
}

impl Default for NonceTimeConfig {
    fn default() -> Self {
        Self {
            start_time: None,
            lifetime: DEFAULT_NONCE_LIFETIME,
        }
    }
}

impl NonceTimeConfig {
    /// Creates a config with the given lifetime and no start time override.
    pub fn with_lifetime(lifetime: i64) -> Self {
        Self {
            start_time: None,
            lifetime,
        }
    }

    /// Length of the fresh window in seconds.
    pub fn fresh_window(&self) -> i64 {
        self.lifetime / 2
    }

    /// Classifies a nonce issued at `issued_at` as seen at `now`.
    pub fn classify(&self, issued_at: i64, now: i64) -> ValidationResult {
        let age = now - issued_at;
        if age < 0 || age >= self.lifetime {
            ValidationResult::Invalid
        } else if age < self.fresh_window() {
            ValidationResult::ValidFresh
        } else {
            ValidationResult::ValidAged
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lifetime_is_one_day() {
        let config = NonceTimeConfig::default();
        assert_eq!(config.lifetime, 86_400);
        assert_eq!(config.fresh_window(), 43_200);
        assert!(config.start_time.is_none());
    }

    #[test]
    fn test_classify_windows() {
        let config = NonceTimeConfig::with_lifetime(100);

        assert_eq!(config.classify(1_000, 1_000), ValidationResult::ValidFresh);
        assert_eq!(config.classify(1_000, 1_049), ValidationResult::ValidFresh);
        assert_eq!(config.classify(1_000, 1_050), ValidationResult::ValidAged);
        assert_eq!(config.classify(1_000, 1_099), ValidationResult::ValidAged);
        assert_eq!(config.classify(1_000, 1_100), ValidationResult::Invalid);
    }

    #[test]
    fn test_classify_rejects_future_issue_time() {
        let config = NonceTimeConfig::with_lifetime(100);
        assert_eq!(config.classify(2_000, 1_000), ValidationResult::Invalid);
    }
}
