use nonceguard_core::SessionStateStore;

use crate::{Validator, ValidatorType};

/// Session key of the one-time-use flag.
pub const ONCE_USED_KEY: &str = "once_used";

/// Lets a nonce pass custom validation only once per creation
///
/// The flag is reset every time a new nonce is created for the context, so
/// the limit applies per issued nonce even while the nonce itself is still
/// within its lifetime.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneTimeUseValidator;

impl ValidatorType for OneTimeUseValidator {
    const IDENTIFIER: &'static str = "one-time-use";
}

impl Validator for OneTimeUseValidator {
    fn identifier(&self) -> &'static str {
        Self::IDENTIFIER
    }

    fn on_register(&self, context: &str, store: &mut SessionStateStore<'_>) -> bool {
        store.set(context, ONCE_USED_KEY, false);
        true
    }

    fn validate(&self, context: &str, store: &mut SessionStateStore<'_>) -> bool {
        if store.get_bool(context, ONCE_USED_KEY) == Some(true) {
            return false;
        }
        store.set(context, ONCE_USED_KEY, true);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nonceguard_core::Session;

    #[test]
    fn test_passes_exactly_once() {
        let mut session = Session::new();
        let mut store = SessionStateStore::new(&mut session, "NG_");
        let validator = OneTimeUseValidator;

        assert!(validator.on_register("delete-post", &mut store));
        assert_eq!(store.get_bool("delete-post", ONCE_USED_KEY), Some(false));

        assert!(validator.validate("delete-post", &mut store));
        assert!(!validator.validate("delete-post", &mut store));
        assert!(!validator.validate("delete-post", &mut store));
    }

    #[test]
    fn test_registration_rearms_flag() {
        let mut session = Session::new();
        let mut store = SessionStateStore::new(&mut session, "NG_");
        let validator = OneTimeUseValidator;

        validator.on_register("delete-post", &mut store);
        assert!(validator.validate("delete-post", &mut store));

        validator.on_register("delete-post", &mut store);
        assert!(
            validator.validate("delete-post", &mut store),
            "A newly created nonce should pass once again"
        );
    }

    #[test]
    fn test_contexts_are_independent() {
        let mut session = Session::new();
        let mut store = SessionStateStore::new(&mut session, "NG_");
        let validator = OneTimeUseValidator;

        validator.on_register("a", &mut store);
        validator.on_register("b", &mut store);

        assert!(validator.validate("a", &mut store));
        assert!(validator.validate("b", &mut store));
        assert!(!validator.validate("a", &mut store));
    }
}
