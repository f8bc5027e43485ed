//! # nonceguard Core
//!
//! Core utilities and types shared across the nonceguard crates.
//!
//! This crate provides:
//!
//! - The per-user session store holding action context records
//! - Nonce configuration and time windows
//! - The tri-state verification result
//! - Common error types
//! - The interfaces consumed from the host framework
//! - A Biscuit-backed nonce primitive

pub mod config;
pub mod error;
pub mod host;
pub mod primitive;
pub mod result;
pub mod session;
pub mod time;

pub use config::NonceConfig;
pub use error::NonceError;
pub use host::{
    HOST_FAILURE_TEXT, NonceHost, RequestKind, TextFilter, TokenPrimitive, VerificationHook,
};
pub use primitive::BiscuitNoncePrimitive;
pub use result::ValidationResult;
pub use session::{HANDLE_KEY, Session, SessionRecord, SessionStateStore, VALIDATORS_KEY};
pub use time::NonceTimeConfig;

// Re-export biscuit types that are needed for public API
pub use biscuit_auth::{KeyPair, PublicKey};
