use nonceguard_core::SessionStateStore;

/// Contract every pluggable validator satisfies
///
/// Validators are persisted by identifier, not by value: the session only
/// remembers which validator types were registered for a context, and a
/// fresh instance is resolved through the
/// [`ValidatorRegistry`](crate::ValidatorRegistry) for every verification.
/// Any state a validator needs across requests goes into the session
/// through the store it is handed, under the context it is called for.
pub trait Validator {
    /// Identifier persisted in the session and resolved by the registry.
    fn identifier(&self) -> &'static str;

    /// Called once when a new nonce is created for `context`.
    ///
    /// Never called when an existing nonce is reused. Returning `false`
    /// cancels the registration: the validator is not persisted and will not
    /// be consulted during verification.
    fn on_register(&self, context: &str, store: &mut SessionStateStore<'_>) -> bool;

    /// Called during verification of a nonce for `context`.
    ///
    /// Validators run in registration order; returning `false` marks the
    /// nonce invalid and skips the remaining validators.
    fn validate(&self, context: &str, store: &mut SessionStateStore<'_>) -> bool;
}

/// A validator type the registry can instantiate by identifier
pub trait ValidatorType: Validator + Default + 'static {
    /// Identifier persisted in the session for this type
    const IDENTIFIER: &'static str;
}
