//! # nonceguard Context
//!
//! Session-scoped, named action contexts on top of a host framework's
//! anti-CSRF nonce primitive.
//!
//! Every action context (`"checkout"`, `"delete-post"`, ...) owns at most one
//! live nonce per user session. Its record lives in the session under the
//! configured prefix:
//!
//! ```text
//! NG_/
//!   delete-post/
//!     handle      "<nonce>"
//!     validators  ["one-time-use"]
//!     once_used   false
//! ```
//!
//! Validators registered with a nonce run after the host verified it
//! cryptographically, through the [`VerificationPipeline`] that
//! [`NonceManager::install`] hooks into the host.
//!
//! ## Context options
//!
//! - [`ContextOption::NoOverwrite`]: create, or fail with
//!   [`NonceError::DuplicateContext`] if a nonce exists
//! - [`ContextOption::ForceLoad`]: reuse the existing nonce
//! - [`ContextOption::ForceCreate`]: always mint a new nonce
//!
//! ## Example
//!
//! ```rust
//! use nonceguard_context::{NonceManager, NonceRequest, RequestHost};
//! use nonceguard_core::{BiscuitNoncePrimitive, KeyPair, NonceTimeConfig, Session};
//! use nonceguard_validator::OneTimeUseValidator;
//!
//! let primitive = BiscuitNoncePrimitive::new(KeyPair::new(), NonceTimeConfig::default());
//! let mut host = RequestHost::new(primitive, Session::new(), NonceRequest::new());
//!
//! let manager = NonceManager::default();
//! manager.install(&mut host);
//!
//! let context = manager
//!     .new_nonce(&mut host, "delete-post", vec![Box::new(OneTimeUseValidator)])
//!     .expect("Failed to create nonce");
//!
//! // The next request carries the nonce back
//! host.set_request(NonceRequest::new().with_field(context.field_name(), context.handle()));
//! assert!(context.check_request(&mut host).is_ok());
//!
//! // A replay is rejected
//! assert!(context.check_request(&mut host).is_err());
//! ```

mod context;
mod host;
mod inspect;
mod manager;
mod pipeline;
#[cfg(test)]
mod test_helper;

pub use context::{ContextOption, TokenContext};
pub use host::{AJAX_NONCE_FIELD, DEFAULT_NONCE_FIELD, NonceRequest, REFERER_FIELD, RequestHost};
pub use inspect::{ContextInspectResult, inspect_context};
pub use manager::{FAILURE_TEXT_FILTER_ID, NonceManager, NonceManagerBuilder, PIPELINE_HOOK_ID};
pub use pipeline::VerificationPipeline;

// Re-export commonly needed types from core
pub use nonceguard_core::{NonceConfig, NonceError, NonceHost, Session, ValidationResult};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nonceguard_core::{BiscuitNoncePrimitive, KeyPair, NonceTimeConfig};
    use nonceguard_validator::OneTimeUseValidator;
    use url::Url;

    fn biscuit_host(request: NonceRequest) -> RequestHost<BiscuitNoncePrimitive> {
        let primitive = BiscuitNoncePrimitive::new(KeyPair::new(), NonceTimeConfig::default());
        RequestHost::new(primitive, Session::new(), request)
    }

    fn nonce_from_url(url: &str, field: &str) -> String {
        Url::parse(url)
            .expect("URL should parse")
            .query_pairs()
            .find(|(key, _)| key == field)
            .map(|(_, value)| value.into_owned())
            .expect("URL should carry a nonce")
    }

    #[test]
    fn test_checkout_scenario() {
        let manager = NonceManager::default();
        let mut host = biscuit_host(NonceRequest::new());
        manager.install(&mut host);

        let first = manager
            .start(&mut host, "checkout", ContextOption::NoOverwrite, Vec::new())
            .expect("First request should create the nonce");
        let h1 = first.handle().to_string();

        // Second request of the same session
        let loaded = manager
            .start(&mut host, "checkout", ContextOption::ForceLoad, Vec::new())
            .expect("Existing nonce should load");
        assert_eq!(loaded.handle(), h1);

        let duplicate = manager.start(&mut host, "checkout", ContextOption::NoOverwrite, Vec::new());
        assert!(duplicate.expect_err("Duplicate should be rejected").is_duplicate_context());

        let recreated = manager
            .start(&mut host, "checkout", ContextOption::ForceCreate, Vec::new())
            .expect("Forced creation should replace the nonce");
        assert_ne!(recreated.handle(), h1);
        assert_eq!(recreated.validate(&host), ValidationResult::ValidFresh);

        let record = inspect_context(host.session_mut(), manager.config(), "checkout")
            .expect("Inspection should work")
            .expect("Record should exist");
        assert_eq!(record.handle, recreated.handle());
    }

    #[test]
    fn test_delete_post_scenario() {
        let manager = NonceManager::default();
        let mut host = biscuit_host(NonceRequest::new());
        manager.install(&mut host);

        let context = manager
            .start(
                &mut host,
                "delete-post",
                ContextOption::NoOverwrite,
                vec![Box::new(OneTimeUseValidator)],
            )
            .expect("Nonce should be created");
        let url = context
            .create_url(&host, "https://example.com/wp-admin/post.php?post=7&action=trash")
            .expect("URL should compose");
        let nonce = nonce_from_url(&url, context.field_name());

        host.set_request(NonceRequest::new().with_field(context.field_name(), nonce));
        assert_eq!(
            context.validate_request(&mut host, None, false),
            Ok(ValidationResult::ValidFresh)
        );

        // Replaying the same link is rejected by the one-time validator
        assert_eq!(
            context.validate_request(&mut host, None, false),
            Ok(ValidationResult::Invalid)
        );
        let err = context
            .check_request(&mut host)
            .expect_err("Replay should stop the request");
        assert_eq!(err, NonceError::validation_failed(manager.config().error_message.clone()));
        assert!(err.is_validation_failed());
    }

    #[test]
    fn test_foreign_context_nonce_rejected() {
        let manager = NonceManager::default();
        let mut host = biscuit_host(NonceRequest::new());
        manager.install(&mut host);

        let checkout = manager
            .get_nonce(&mut host, "checkout")
            .expect("Nonce should be created");
        let delete = manager
            .get_nonce(&mut host, "delete-post")
            .expect("Nonce should be created");

        host.set_request(NonceRequest::new().with_field("NG_", checkout.handle()));
        assert_eq!(
            delete.validate_request(&mut host, None, false),
            Ok(ValidationResult::Invalid)
        );
        assert_eq!(
            checkout.validate_request(&mut host, None, false),
            Ok(ValidationResult::ValidFresh)
        );
    }

    #[test]
    fn test_ajax_request_with_rendered_field() {
        let manager = NonceManager::default();
        let mut host = biscuit_host(NonceRequest::new().with_referer("/cart"));
        manager.install(&mut host);

        let context = manager
            .get_nonce(&mut host, "add-to-cart")
            .expect("Nonce should be created");
        let markup = context
            .render_input_markup(&mut host)
            .expect("Field should render");
        assert_eq!(host.output(), markup);
        assert!(markup.contains(r#"name="NG_""#));
        assert!(markup.contains(r#"name="_http_referer" value="/cart""#));

        let nonce = markup
            .split(r#"value=""#)
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .expect("Markup should carry the nonce")
            .to_string();

        host.set_request(NonceRequest::ajax().with_field("custom_field", nonce));
        assert_eq!(
            context.validate_request(&mut host, Some("custom_field"), true),
            Ok(ValidationResult::ValidFresh)
        );
        assert_eq!(
            context.validate_request(&mut host, None, false),
            Ok(ValidationResult::Invalid),
            "The default field is empty on this request"
        );
    }

    #[test]
    fn test_install_applies_configured_lifetime() {
        let config = NonceConfig::default().with_time(NonceTimeConfig::with_lifetime(60));
        let manager = NonceManager::new(config);
        let primitive = BiscuitNoncePrimitive::new(
            KeyPair::new(),
            NonceTimeConfig {
                start_time: Some(Utc::now().timestamp() - 45),
                lifetime: NonceTimeConfig::default().lifetime,
            },
        );
        let mut host = RequestHost::new(primitive, Session::new(), NonceRequest::new());
        manager.install(&mut host);

        // Install applied the 60 second lifetime, so a 45 second old nonce is aged
        let context = manager
            .get_nonce(&mut host, "checkout")
            .expect("Nonce should be created");
        assert_eq!(context.validate(&host), ValidationResult::ValidAged);
    }
}
