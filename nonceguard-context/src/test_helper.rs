//! Test doubles for the host primitive and validators
//!
//! Only compiled for tests.

use std::cell::Cell;

use nonceguard_core::{
    NonceError, Session, SessionStateStore, TokenPrimitive, ValidationResult,
};
use nonceguard_validator::{Validator, ValidatorType};

use crate::{NonceRequest, RequestHost};

/// Session key written by [`CountingValidator`].
pub const COUNTER_KEY: &str = "validate_calls";

/// Primitive issuing sequential handles and reporting a fixed result for
/// handles of the verified context
pub struct CountingPrimitive {
    issued: Cell<u32>,
    result: ValidationResult,
    failing: bool,
}

impl CountingPrimitive {
    pub fn fresh() -> Self {
        Self::with_result(ValidationResult::ValidFresh)
    }

    pub fn aged() -> Self {
        Self::with_result(ValidationResult::ValidAged)
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::fresh()
        }
    }

    fn with_result(result: ValidationResult) -> Self {
        Self {
            issued: Cell::new(0),
            result,
            failing: false,
        }
    }

    /// Number of handles issued so far.
    pub fn issued(&self) -> u32 {
        self.issued.get()
    }
}

impl TokenPrimitive for CountingPrimitive {
    fn create_token(&self, context_id: &str) -> Result<String, NonceError> {
        if self.failing {
            return Err(NonceError::TokenCreation {
                reason: "primitive unavailable".to_string(),
            });
        }
        let next = self.issued.get() + 1;
        self.issued.set(next);
        Ok(format!("{context_id}#{next}"))
    }

    fn verify_token(&self, handle: &str, context_id: &str) -> ValidationResult {
        match handle.split_once('#') {
            Some((id, _)) if id == context_id => self.result,
            _ => ValidationResult::Invalid,
        }
    }

    fn set_lifetime(&mut self, _lifetime: i64) {}
}

/// Host over a fresh session and an empty standard request.
pub fn test_host<P: TokenPrimitive>(primitive: P) -> RequestHost<P> {
    RequestHost::new(primitive, Session::new(), NonceRequest::new())
}

/// Declines every registration
#[derive(Default)]
pub struct DecliningValidator;

impl ValidatorType for DecliningValidator {
    const IDENTIFIER: &'static str = "declining";
}

impl Validator for DecliningValidator {
    fn identifier(&self) -> &'static str {
        Self::IDENTIFIER
    }

    fn on_register(&self, _context: &str, _store: &mut SessionStateStore<'_>) -> bool {
        false
    }

    fn validate(&self, _context: &str, _store: &mut SessionStateStore<'_>) -> bool {
        true
    }
}

/// Rejects every verification
#[derive(Default)]
pub struct RejectingValidator;

impl ValidatorType for RejectingValidator {
    const IDENTIFIER: &'static str = "rejecting";
}

impl Validator for RejectingValidator {
    fn identifier(&self) -> &'static str {
        Self::IDENTIFIER
    }

    fn on_register(&self, _context: &str, _store: &mut SessionStateStore<'_>) -> bool {
        true
    }

    fn validate(&self, _context: &str, _store: &mut SessionStateStore<'_>) -> bool {
        false
    }
}

/// Accepts every verification and counts the calls in the session
#[derive(Default)]
pub struct CountingValidator;

impl ValidatorType for CountingValidator {
    const IDENTIFIER: &'static str = "counting";
}

impl Validator for CountingValidator {
    fn identifier(&self) -> &'static str {
        Self::IDENTIFIER
    }

    fn on_register(&self, _context: &str, _store: &mut SessionStateStore<'_>) -> bool {
        true
    }

    fn validate(&self, context: &str, store: &mut SessionStateStore<'_>) -> bool {
        let calls = store
            .get(context, COUNTER_KEY)
            .and_then(|value| value.as_u64())
            .unwrap_or(0);
        store.set(context, COUNTER_KEY, calls + 1);
        true
    }
}
