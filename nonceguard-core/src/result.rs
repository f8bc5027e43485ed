use std::fmt;

/// Tri-state outcome of nonce verification
///
/// A valid nonce is either fresh (issued within the first half of its
/// lifetime) or aged (issued within the second half). Custom validators can
/// only turn a valid outcome into [`ValidationResult::Invalid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationResult {
    /// The nonce did not verify
    Invalid,
    /// The nonce verified and was issued in the current half-lifetime window
    ValidFresh,
    /// The nonce verified but was issued in the previous half-lifetime window
    ValidAged,
}

impl ValidationResult {
    /// Whether the nonce was accepted, fresh or aged
    pub fn is_valid(self) -> bool {
        !matches!(self, ValidationResult::Invalid)
    }

    /// Whether the nonce was accepted within its first half-lifetime window
    pub fn is_fresh(self) -> bool {
        matches!(self, ValidationResult::ValidFresh)
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationResult::Invalid => write!(f, "invalid"),
            ValidationResult::ValidFresh => write!(f, "valid(fresh)"),
            ValidationResult::ValidAged => write!(f, "valid(aged)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity() {
        assert!(!ValidationResult::Invalid.is_valid());
        assert!(ValidationResult::ValidFresh.is_valid());
        assert!(ValidationResult::ValidAged.is_valid());
        assert!(ValidationResult::ValidFresh.is_fresh());
        assert!(!ValidationResult::ValidAged.is_fresh());
    }
}
