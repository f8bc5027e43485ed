//! Registry of known validator types
//!
//! Validator identifiers come back from session state, which may have been
//! written by an older build or tampered with. Only identifiers present in
//! the registry are ever instantiated.

use std::collections::BTreeMap;
use std::fmt;

use nonceguard_core::NonceError;
use tracing::debug;

use crate::{OneTimeUseValidator, Validator, ValidatorType};

/// Constructor of a validator instance
pub type ValidatorFactory = fn() -> Box<dyn Validator>;

fn instantiate_default<V: ValidatorType>() -> Box<dyn Validator> {
    Box::new(V::default())
}

/// Identifier -> factory mapping of the validator types a process knows
///
/// Built once at startup and only read afterwards.
///
/// # Example
/// ```rust
/// use nonceguard_validator::{OneTimeUseValidator, ValidatorRegistry, ValidatorType};
///
/// let mut registry = ValidatorRegistry::new();
/// registry.load_implementations();
///
/// assert!(registry.is_known(OneTimeUseValidator::IDENTIFIER));
/// let validator = registry
///     .instantiate(OneTimeUseValidator::IDENTIFIER)
///     .expect("Built-in validator should resolve");
/// assert_eq!(validator.identifier(), "one-time-use");
/// ```
#[derive(Default, Clone)]
pub struct ValidatorRegistry {
    factories: BTreeMap<&'static str, ValidatorFactory>,
}

impl ValidatorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the built-in validator types.
    ///
    /// Safe to call more than once.
    pub fn load_implementations(&mut self) {
        self.factories
            .entry(OneTimeUseValidator::IDENTIFIER)
            .or_insert(instantiate_default::<OneTimeUseValidator>);
        debug!(validators = ?self.identifiers(), "validator implementations loaded");
    }

    /// Registers a validator type under its identifier.
    pub fn register<V: ValidatorType>(&mut self) -> Result<(), NonceError> {
        self.register_factory(V::IDENTIFIER, instantiate_default::<V>)
    }

    /// Registers a factory under `identifier`.
    ///
    /// # Errors
    /// [`NonceError::DuplicateValidatorType`] if the identifier is taken.
    pub fn register_factory(
        &mut self,
        identifier: &'static str,
        factory: ValidatorFactory,
    ) -> Result<(), NonceError> {
        if self.factories.contains_key(identifier) {
            return Err(NonceError::DuplicateValidatorType {
                identifier: identifier.to_string(),
            });
        }
        self.factories.insert(identifier, factory);
        Ok(())
    }

    /// Whether `identifier` names a registered validator type.
    pub fn is_known(&self, identifier: &str) -> bool {
        self.factories.contains_key(identifier)
    }

    /// Creates a validator instance for `identifier`.
    ///
    /// # Errors
    /// [`NonceError::UnknownValidatorType`] if the identifier is not registered.
    pub fn instantiate(&self, identifier: &str) -> Result<Box<dyn Validator>, NonceError> {
        self.factories
            .get(identifier)
            .map(|factory| factory())
            .ok_or_else(|| NonceError::UnknownValidatorType {
                identifier: identifier.to_string(),
            })
    }

    /// Registered identifiers, sorted.
    pub fn identifiers(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("validators", &self.identifiers())
            .finish()
    }
}
