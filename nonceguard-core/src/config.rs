//! Nonce configuration
//!
//! Values fall back to built-in defaults and can be overridden through
//! environment variables:
//!
//! - `NONCEGUARD_PREFIX` - namespace for session keys, context ids and field names
//! - `NONCEGUARD_LIFETIME` - nonce lifetime in seconds
//! - `NONCEGUARD_ERROR_MESSAGE` - message shown when verification fails

use serde::{Deserialize, Serialize};

use crate::{NonceError, NonceTimeConfig};

/// Default prefix for context ids, session namespace and field names.
pub const DEFAULT_PREFIX: &str = "NG_";

/// Default message shown when a nonce fails verification.
pub const DEFAULT_ERROR_MESSAGE: &str = "You are not supposed to be here!";

pub const PREFIX_ENV: &str = "NONCEGUARD_PREFIX";
pub const LIFETIME_ENV: &str = "NONCEGUARD_LIFETIME";
pub const ERROR_MESSAGE_ENV: &str = "NONCEGUARD_ERROR_MESSAGE";

/// Configuration shared by every action context of a process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceConfig {
    /// Prefix used for the session namespace, context ids and field names
    #[serde(default = "NonceConfig::default_prefix")]
    pub prefix: String,
    /// Nonce lifetime configuration
    #[serde(default)]
    pub time: NonceTimeConfig,
    /// User-visible message replacing the host's generic failure text
    #[serde(default = "NonceConfig::default_error_message")]
    pub error_message: String,
}

impl Default for NonceConfig {
    fn default() -> Self {
        Self {
            prefix: Self::default_prefix(),
            time: NonceTimeConfig::default(),
            error_message: Self::default_error_message(),
        }
    }
}

impl NonceConfig {
    /// Load configuration from environment variables, using defaults for
    /// anything unset.
    pub fn load() -> Result<Self, NonceError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides to an existing configuration.
    pub fn apply_env_overrides(&mut self) -> Result<(), NonceError> {
        self.apply_overrides_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides_with<F>(&mut self, lookup: F) -> Result<(), NonceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup(PREFIX_ENV) {
            if val.is_empty() {
                return Err(NonceError::InvalidConfig {
                    key: PREFIX_ENV.to_string(),
                    value: val,
                    reason: "prefix must not be empty".to_string(),
                });
            }
            self.prefix = val;
        }
        if let Some(val) = lookup(LIFETIME_ENV) {
            let lifetime = val.parse::<i64>().map_err(|e| NonceError::InvalidConfig {
                key: LIFETIME_ENV.to_string(),
                value: val.clone(),
                reason: format!("must be a number of seconds: {e}"),
            })?;
            if lifetime < 2 {
                return Err(NonceError::InvalidConfig {
                    key: LIFETIME_ENV.to_string(),
                    value: val,
                    reason: "lifetime must be at least 2 seconds".to_string(),
                });
            }
            self.time.lifetime = lifetime;
        }
        if let Some(val) = lookup(ERROR_MESSAGE_ENV) {
            self.error_message = val;
        }
        Ok(())
    }

    /// Sets the prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the nonce time configuration.
    pub fn with_time(mut self, time: NonceTimeConfig) -> Self {
        self.time = time;
        self
    }

    /// Sets the failure message.
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    /// Composite id handed to the token primitive for an action context.
    pub fn context_id(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Resolves a composite context id back to the context name.
    ///
    /// Returns `None` for ids that do not carry this configuration's prefix.
    pub fn context_name<'a>(&self, context_id: &'a str) -> Option<&'a str> {
        context_id.strip_prefix(self.prefix.as_str())
    }

    /// Request field carrying the nonce.
    pub fn field_name(&self) -> &str {
        &self.prefix
    }

    fn default_prefix() -> String {
        DEFAULT_PREFIX.to_string()
    }

    fn default_error_message() -> String {
        DEFAULT_ERROR_MESSAGE.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = NonceConfig::default();
        assert_eq!(config.prefix, "NG_");
        assert_eq!(config.time.lifetime, 86_400);
        assert_eq!(config.error_message, "You are not supposed to be here!");
    }

    #[test]
    fn test_context_id_round_trip() {
        let config = NonceConfig::default();
        let id = config.context_id("checkout");
        assert_eq!(id, "NG_checkout");
        assert_eq!(config.context_name(&id), Some("checkout"));
        assert_eq!(config.context_name("wp_rest"), None);
    }

    #[test]
    fn test_overrides() {
        let mut config = NonceConfig::default();
        config
            .apply_overrides_with(lookup_from(&[
                (PREFIX_ENV, "APP_"),
                (LIFETIME_ENV, "3600"),
                (ERROR_MESSAGE_ENV, "Link expired"),
            ]))
            .expect("Overrides should apply");

        assert_eq!(config.prefix, "APP_");
        assert_eq!(config.time.lifetime, 3600);
        assert_eq!(config.error_message, "Link expired");
        assert_eq!(config.field_name(), "APP_");
    }

    #[test]
    fn test_invalid_lifetime_override() {
        let mut config = NonceConfig::default();
        let err = config
            .apply_overrides_with(lookup_from(&[(LIFETIME_ENV, "a day")]))
            .expect_err("Non-numeric lifetime should be rejected");
        assert!(matches!(err, NonceError::InvalidConfig { ref key, .. } if key == LIFETIME_ENV));

        let err = config
            .apply_overrides_with(lookup_from(&[(LIFETIME_ENV, "1")]))
            .expect_err("Too short lifetime should be rejected");
        assert!(matches!(err, NonceError::InvalidConfig { .. }));
        assert_eq!(config.time.lifetime, 86_400);
    }

    #[test]
    fn test_empty_prefix_rejected() {
        let mut config = NonceConfig::default();
        let result = config.apply_overrides_with(lookup_from(&[(PREFIX_ENV, "")]));
        assert!(result.is_err());
        assert_eq!(config.prefix, "NG_");
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: NonceConfig =
            serde_json::from_str(r#"{"error_message": "Nope"}"#).expect("Should deserialize");
        assert_eq!(config.prefix, "NG_");
        assert_eq!(config.error_message, "Nope");
        assert_eq!(config.time, NonceTimeConfig::default());
    }
}
