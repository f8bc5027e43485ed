//! Biscuit-backed nonce primitive
//!
//! Each nonce is a signed Biscuit token whose authority block binds it to a
//! composite context id, records when it was issued, and expires after the
//! configured lifetime:
//!
//! ```datalog
//! nonce_context(context_id);
//! issued_at(issued_at);
//! check if time($time), $time < expiration;
//! check if session(session_id);   // only when bound to a session
//! ```
//!
//! Verification reports the nonce as fresh during the first half of the
//! lifetime and as aged during the second half.

extern crate biscuit_auth as biscuit;

use biscuit::macros::{authorizer, biscuit, check, fact};
use biscuit::{Biscuit, KeyPair, PublicKey};
use chrono::Utc;
use tracing::{debug, info};

use crate::{NonceError, NonceTimeConfig, TokenPrimitive, ValidationResult};

/// Nonce primitive signing tokens with a Biscuit key pair
///
/// # Example
/// ```rust
/// use nonceguard_core::{BiscuitNoncePrimitive, KeyPair, NonceTimeConfig, TokenPrimitive};
///
/// let primitive = BiscuitNoncePrimitive::new(KeyPair::new(), NonceTimeConfig::default())
///     .bound_to_session("session-42");
///
/// let nonce = primitive.create_token("NG_checkout").expect("Failed to create nonce");
/// assert!(primitive.verify_token(&nonce, "NG_checkout").is_valid());
/// assert!(!primitive.verify_token(&nonce, "NG_delete-post").is_valid());
/// ```
pub struct BiscuitNoncePrimitive {
    keypair: KeyPair,
    time_config: NonceTimeConfig,
    session_id: Option<String>,
}

impl BiscuitNoncePrimitive {
    /// Creates a primitive signing with `keypair`.
    ///
    /// # Arguments
    /// * `keypair` - The keypair nonces are signed with
    /// * `time_config` - Lifetime of issued nonces and optional issue time override
    pub fn new(keypair: KeyPair, time_config: NonceTimeConfig) -> Self {
        Self {
            keypair,
            time_config,
            session_id: None,
        }
    }

    /// Binds issued nonces to a user session identifier.
    pub fn bound_to_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Changes the session identifier nonces are bound to.
    pub fn bind_session(&mut self, session_id: impl Into<String>) {
        self.session_id = Some(session_id.into());
    }

    /// Public key verifying the issued nonces.
    pub fn public_key(&self) -> PublicKey {
        self.keypair.public()
    }

    /// Current time configuration.
    pub fn time_config(&self) -> &NonceTimeConfig {
        &self.time_config
    }

    /// Runs the authorizer and returns the nonce issue time.
    fn authorize(&self, handle: &str, context_id: &str, now: i64) -> Result<i64, NonceError> {
        let token = Biscuit::from_base64(handle, self.keypair.public())?;
        let context_id = context_id.to_string();

        let mut authz = authorizer!(
            r#"
                time({now});
                check if nonce_context({context_id});
                allow if true;
            "#
        );

        if let Some(session) = self.session_id.clone() {
            authz = authz.fact(fact!(r#"session({session});"#))?;
        }

        let mut authz = authz.build(&token)?;
        authz.authorize()?;

        let issued: Vec<(i64,)> = authz.query("data($t) <- issued_at($t)")?;
        issued
            .first()
            .map(|(t,)| *t)
            .ok_or_else(|| NonceError::internal("nonce carries no issue time"))
    }
}

impl TokenPrimitive for BiscuitNoncePrimitive {
    fn create_token(&self, context_id: &str) -> Result<String, NonceError> {
        let issued_at = self
            .time_config
            .start_time
            .unwrap_or_else(|| Utc::now().timestamp());
        let expiration = issued_at + self.time_config.lifetime;
        let nonce_context = context_id.to_string();

        let mut builder = biscuit!(
            r#"
                nonce_context({nonce_context});
                issued_at({issued_at});
                check if time($time), $time < {expiration};
            "#
        );

        if let Some(session) = self.session_id.clone() {
            builder = builder.check(check!(
                r#"
                    check if session({session});
                "#
            ))?;
        }

        let token = builder.build(&self.keypair)?;
        let fingerprint = token
            .revocation_identifiers()
            .first()
            .map(hex::encode)
            .unwrap_or_default();
        info!(context = %context_id, nonce = %fingerprint, "nonce issued");

        Ok(token.to_base64()?)
    }

    fn verify_token(&self, handle: &str, context_id: &str) -> ValidationResult {
        let now = Utc::now().timestamp();
        match self.authorize(handle, context_id, now) {
            Ok(issued_at) => self.time_config.classify(issued_at, now),
            Err(e) => {
                debug!(context = %context_id, error = %e, "nonce rejected");
                ValidationResult::Invalid
            }
        }
    }

    fn set_lifetime(&mut self, lifetime: i64) {
        self.time_config.lifetime = lifetime;
    }
}
