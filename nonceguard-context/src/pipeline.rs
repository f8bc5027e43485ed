use std::sync::Arc;

use nonceguard_core::{
    NonceConfig, Session, SessionStateStore, ValidationResult, VerificationHook,
};
use nonceguard_validator::ValidatorRegistry;
use tracing::{debug, error, warn};

/// Chains the host's cryptographic verification with the validators
/// registered for a context
///
/// The pipeline can only downgrade a result: an invalid raw result stays
/// invalid, a valid one becomes invalid when a validator rejects it, and is
/// otherwise returned unchanged (fresh stays fresh, aged stays aged).
#[derive(Debug, Clone)]
pub struct VerificationPipeline {
    config: Arc<NonceConfig>,
    registry: Arc<ValidatorRegistry>,
}

impl VerificationPipeline {
    /// Creates a pipeline resolving validators through `registry`.
    pub fn new(config: Arc<NonceConfig>, registry: Arc<ValidatorRegistry>) -> Self {
        Self { config, registry }
    }

    /// Post-processes the host's raw verification result.
    ///
    /// # Arguments
    /// * `session` - Session of the current request
    /// * `action_context_id` - Composite context id the host verified
    /// * `raw` - The host's verification result
    pub fn run(
        &self,
        session: &mut Session,
        action_context_id: &str,
        raw: ValidationResult,
    ) -> ValidationResult {
        if !raw.is_valid() {
            return ValidationResult::Invalid;
        }

        let Some(name) = self.config.context_name(action_context_id) else {
            debug!(action = %action_context_id, "not a nonceguard action, result unchanged");
            return raw;
        };

        let mut store = SessionStateStore::new(session, &self.config.prefix);
        let identifiers = match store.validators(name) {
            Ok(identifiers) => identifiers,
            Err(e) => {
                error!(context = %name, error = %e, "rejecting nonce with malformed validator list");
                return ValidationResult::Invalid;
            }
        };

        for identifier in &identifiers {
            let validator = match self.registry.instantiate(identifier) {
                Ok(validator) => validator,
                Err(e) => {
                    warn!(
                        context = %name,
                        validator = %identifier,
                        error = %e,
                        "skipping validator of unknown type"
                    );
                    continue;
                }
            };
            if !validator.validate(name, &mut store) {
                debug!(context = %name, validator = %identifier, "nonce rejected by validator");
                return ValidationResult::Invalid;
            }
        }

        raw
    }

    /// Wraps the pipeline as a host post-verification hook.
    pub fn into_hook(self) -> VerificationHook {
        Arc::new(
            move |session: &mut Session, action: &str, raw: ValidationResult| {
                self.run(session, action, raw)
            },
        )
    }
}
