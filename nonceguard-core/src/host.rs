//! Interfaces nonceguard consumes from the host framework
//!
//! The host owns the request, the session transport and the output stream.
//! nonceguard only needs the operations below.

use std::fmt;
use std::sync::Arc;

use crate::{NonceError, Session, ValidationResult};

/// The generic failure text hosts show when a nonce check fails.
pub const HOST_FAILURE_TEXT: &str = "Are you sure you want to do this?";

/// Which request verification path the host is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Standard (admin/form) request
    Admin,
    /// Asynchronous (ajax) request
    Ajax,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Admin => write!(f, "admin"),
            RequestKind::Ajax => write!(f, "ajax"),
        }
    }
}

/// Callback run by the host after its own nonce verification
///
/// Receives the session of the current request, the composite action context
/// id and the raw result; returns the post-processed result.
pub type VerificationHook =
    Arc<dyn Fn(&mut Session, &str, ValidationResult) -> ValidationResult + Send + Sync>;

/// Callback allowed to replace a user-visible host text
///
/// Returning `None` keeps the original text.
pub type TextFilter = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Cryptographic nonce primitive
pub trait TokenPrimitive {
    /// Creates a nonce for a composite context id.
    fn create_token(&self, context_id: &str) -> Result<String, NonceError>;

    /// Verifies a nonce against a composite context id.
    fn verify_token(&self, handle: &str, context_id: &str) -> ValidationResult;

    /// Changes the nonce lifetime in seconds.
    fn set_lifetime(&mut self, lifetime: i64);
}

/// Host framework adapter for one request
pub trait NonceHost {
    /// Session of the current end user.
    fn session_mut(&mut self) -> &mut Session;

    /// Makes sure a session is available for the current request.
    fn start_session(&mut self);

    /// Creates a nonce for a composite context id.
    fn create_token(&self, context_id: &str) -> Result<String, NonceError>;

    /// Verifies a nonce against a composite context id.
    fn verify_token(&self, handle: &str, context_id: &str) -> ValidationResult;

    /// Adds a fresh nonce for `context_id` to `base_url` under `field_prefix`.
    fn compose_nonce_url(
        &self,
        base_url: &str,
        context_id: &str,
        field_prefix: &str,
    ) -> Result<String, NonceError>;

    /// Renders the hidden form field(s) carrying a nonce for `context_id`.
    ///
    /// With `echo_to_output` the markup is also written to the response output.
    fn render_nonce_field(
        &mut self,
        context_id: &str,
        field_prefix: &str,
        include_referrer: bool,
        echo_to_output: bool,
    ) -> Result<String, NonceError>;

    /// Whether the current request is an ajax request.
    fn doing_ajax(&self) -> bool;

    /// Verifies the nonce carried by the current request.
    ///
    /// `field` names the request field holding the nonce; `None` uses the
    /// host default. The host runs its post-verification hooks for `kind`.
    /// With `die_on_failure`, an invalid result stops the request with
    /// [`NonceError::ValidationFailed`].
    fn verify_request_field(
        &mut self,
        kind: RequestKind,
        context_id: &str,
        field: Option<&str>,
        die_on_failure: bool,
    ) -> Result<ValidationResult, NonceError>;

    /// Changes the nonce lifetime in seconds.
    fn set_nonce_lifetime(&mut self, lifetime: i64);

    /// Registers a post-verification hook for a request kind.
    ///
    /// A hook registered again under the same `id` for the same kind
    /// replaces the earlier one and keeps its position.
    fn add_verification_hook(
        &mut self,
        kind: RequestKind,
        id: &'static str,
        hook: VerificationHook,
    );

    /// Registers a filter for user-visible host texts.
    ///
    /// A filter registered again under the same `id` replaces the earlier one.
    fn add_text_filter(&mut self, id: &'static str, filter: TextFilter);
}
