//! # nonceguard Validators
//!
//! Pluggable validators run after a nonce passed cryptographic
//! verification. A validator is registered for a context when its nonce is
//! created and consulted every time the nonce is verified through the host's
//! request verification path.
//!
//! ## Protocol
//!
//! - `on_register(context, store)` runs once per newly created nonce;
//!   returning `false` drops the validator for that nonce.
//! - `validate(context, store)` runs on every verification, in registration
//!   order; the first `false` makes the nonce invalid.
//!
//! ## Example
//!
//! ```rust
//! use nonceguard_core::{Session, SessionStateStore};
//! use nonceguard_validator::{OneTimeUseValidator, Validator};
//!
//! let mut session = Session::new();
//! let mut store = SessionStateStore::new(&mut session, "NG_");
//!
//! let once = OneTimeUseValidator;
//! assert!(once.on_register("delete-post", &mut store));
//! assert!(once.validate("delete-post", &mut store));
//! assert!(!once.validate("delete-post", &mut store));
//! ```

mod once;
mod protocol;
mod registry;

pub use once::{ONCE_USED_KEY, OneTimeUseValidator};
pub use protocol::{Validator, ValidatorType};
pub use registry::{ValidatorFactory, ValidatorRegistry};
