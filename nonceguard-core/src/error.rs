use thiserror::Error;

/// Error type for nonceguard operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NonceError {
    // ===== Construction Errors =====
    /// A record for this action context already exists and the creation
    /// policy does not allow loading or overwriting it
    #[error("A nonce action with this context already exists: '{name}'")]
    DuplicateContext { name: String },

    /// A supplied validator is not a registered validator type, so it could
    /// not be resolved again during verification
    #[error("Validator '{identifier}' is not a registered validator type")]
    InvalidValidatorType { identifier: String },

    /// Token creation failed in the underlying primitive
    #[error("Failed to create nonce token: {reason}")]
    TokenCreation { reason: String },

    // ===== Registry Errors =====
    /// An identifier could not be resolved by the validator registry
    #[error("Unknown validator type '{identifier}'")]
    UnknownValidatorType { identifier: String },

    /// Two validator types were registered under the same identifier
    #[error("Validator type '{identifier}' is already registered")]
    DuplicateValidatorType { identifier: String },

    // ===== Verification Errors =====
    /// The nonce or one of its validators rejected the request
    #[error("{message}")]
    ValidationFailed { message: String },

    /// A persisted session record holds a value of the wrong shape
    #[error("Malformed session record for context '{context}', key '{key}': {reason}")]
    MalformedRecord {
        context: String,
        key: String,
        reason: String,
    },

    // ===== Configuration Errors =====
    /// A configuration value is invalid
    #[error("Invalid configuration for {key}: '{value}' ({reason})")]
    InvalidConfig {
        key: String,
        value: String,
        reason: String,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NonceError {
    /// Check if this error is due to an already existing context
    pub fn is_duplicate_context(&self) -> bool {
        matches!(self, NonceError::DuplicateContext { .. })
    }

    /// Check if this error comes from a validator type lookup
    pub fn is_validator_type_error(&self) -> bool {
        matches!(
            self,
            NonceError::InvalidValidatorType { .. }
                | NonceError::UnknownValidatorType { .. }
                | NonceError::DuplicateValidatorType { .. }
        )
    }

    /// Check if this error is a failed request verification
    pub fn is_validation_failed(&self) -> bool {
        matches!(self, NonceError::ValidationFailed { .. })
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        NonceError::Internal(msg.into())
    }

    /// Create a duplicate context error
    pub fn duplicate_context<S: Into<String>>(name: S) -> Self {
        NonceError::DuplicateContext { name: name.into() }
    }

    /// Create a validation failure carrying the user-visible message
    pub fn validation_failed<S: Into<String>>(message: S) -> Self {
        NonceError::ValidationFailed {
            message: message.into(),
        }
    }

    /// Create a malformed record error
    pub fn malformed_record(
        context: impl Into<String>,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        NonceError::MalformedRecord {
            context: context.into(),
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl From<biscuit_auth::error::Token> for NonceError {
    fn from(err: biscuit_auth::error::Token) -> Self {
        NonceError::TokenCreation {
            reason: err.to_string(),
        }
    }
}
