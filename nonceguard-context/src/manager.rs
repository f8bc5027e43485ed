use std::sync::Arc;

use nonceguard_core::{
    HOST_FAILURE_TEXT, NonceConfig, NonceError, NonceHost, RequestKind, SessionStateStore,
};
use nonceguard_validator::{Validator, ValidatorFactory, ValidatorRegistry, ValidatorType};
use tracing::{debug, info};

use crate::context::{ContextOption, TokenContext};
use crate::pipeline::VerificationPipeline;

/// Id the verification pipeline is registered under on the host.
pub const PIPELINE_HOOK_ID: &str = "nonceguard-pipeline";

/// Id of the filter replacing the host's generic failure text.
pub const FAILURE_TEXT_FILTER_ID: &str = "nonceguard-failure-text";

/// Builder for a [`NonceManager`].
///
/// Built-in validator types are always available; custom types are
/// registered here, before the registry is frozen.
///
/// # Example
/// ```rust
/// use nonceguard_context::NonceManager;
/// use nonceguard_core::NonceConfig;
///
/// let manager = NonceManager::builder()
///     .config(NonceConfig::default().with_prefix("SHOP_"))
///     .build();
/// assert_eq!(manager.config().field_name(), "SHOP_");
/// assert!(manager.registry().is_known("one-time-use"));
/// ```
pub struct NonceManagerBuilder {
    config: NonceConfig,
    registry: ValidatorRegistry,
}

impl NonceManagerBuilder {
    fn new() -> Self {
        let mut registry = ValidatorRegistry::new();
        registry.load_implementations();
        Self {
            config: NonceConfig::default(),
            registry,
        }
    }

    /// Sets the configuration.
    pub fn config(mut self, config: NonceConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a custom validator type.
    pub fn register_validator<V: ValidatorType>(mut self) -> Result<Self, NonceError> {
        self.registry.register::<V>()?;
        Ok(self)
    }

    /// Registers a validator factory under `identifier`.
    pub fn register_factory(
        mut self,
        identifier: &'static str,
        factory: ValidatorFactory,
    ) -> Result<Self, NonceError> {
        self.registry.register_factory(identifier, factory)?;
        Ok(self)
    }

    pub fn build(self) -> NonceManager {
        NonceManager {
            config: Arc::new(self.config),
            registry: Arc::new(self.registry),
        }
    }
}

/// Entry point creating action contexts and wiring verification into a host
///
/// The configuration and the validator registry are shared read-only by
/// every context and by the pipeline hook registered on the host.
#[derive(Debug, Clone)]
pub struct NonceManager {
    config: Arc<NonceConfig>,
    registry: Arc<ValidatorRegistry>,
}

impl Default for NonceManager {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl NonceManager {
    /// Manager with `config` and the built-in validator types.
    pub fn new(config: NonceConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> NonceManagerBuilder {
        NonceManagerBuilder::new()
    }

    pub fn config(&self) -> &NonceConfig {
        &self.config
    }

    pub fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    /// The post-verification pipeline sharing this manager's registry.
    pub fn pipeline(&self) -> VerificationPipeline {
        VerificationPipeline::new(Arc::clone(&self.config), Arc::clone(&self.registry))
    }

    /// Bootstraps nonce handling on a host for the current request.
    ///
    /// Starts the session, applies the configured lifetime, replaces the
    /// host's generic failure text with the configured message and registers
    /// the pipeline for both the admin and the ajax verification paths.
    ///
    /// Installing again replaces the earlier hook and filter, so validators
    /// still run once per verification.
    pub fn install<H: NonceHost + ?Sized>(&self, host: &mut H) {
        host.start_session();
        host.set_nonce_lifetime(self.config.time.lifetime);

        let message = self.config.error_message.clone();
        host.add_text_filter(
            FAILURE_TEXT_FILTER_ID,
            Arc::new(move |text: &str| (text == HOST_FAILURE_TEXT).then(|| message.clone())),
        );

        let hook = self.pipeline().into_hook();
        host.add_verification_hook(RequestKind::Admin, PIPELINE_HOOK_ID, Arc::clone(&hook));
        host.add_verification_hook(RequestKind::Ajax, PIPELINE_HOOK_ID, hook);

        info!(
            prefix = %self.config.prefix,
            lifetime = self.config.time.lifetime,
            validators = ?self.registry.identifiers(),
            "nonce verification installed"
        );
    }

    /// Resolves the nonce of `name` under `option`.
    ///
    /// # Errors
    /// - [`NonceError::DuplicateContext`] with [`ContextOption::NoOverwrite`]
    ///   when a nonce exists
    /// - [`NonceError::InvalidValidatorType`] when a validator type is not
    ///   registered with this manager
    /// - [`NonceError::TokenCreation`] when the host cannot mint a nonce
    pub fn start<H: NonceHost + ?Sized>(
        &self,
        host: &mut H,
        name: &str,
        option: ContextOption,
        validators: Vec<Box<dyn Validator>>,
    ) -> Result<TokenContext, NonceError> {
        TokenContext::start(&self.config, &self.registry, host, name, option, validators)
    }

    /// The existing nonce of `name`, or a new one without validators.
    pub fn get_nonce<H: NonceHost + ?Sized>(
        &self,
        host: &mut H,
        name: &str,
    ) -> Result<TokenContext, NonceError> {
        self.start(host, name, ContextOption::ForceLoad, Vec::new())
    }

    /// A new nonce for `name`, replacing any existing one.
    pub fn new_nonce<H: NonceHost + ?Sized>(
        &self,
        host: &mut H,
        name: &str,
        validators: Vec<Box<dyn Validator>>,
    ) -> Result<TokenContext, NonceError> {
        self.start(host, name, ContextOption::ForceCreate, validators)
    }

    /// Drops the record of one context.
    pub fn reset_context<H: NonceHost + ?Sized>(&self, host: &mut H, name: &str) {
        SessionStateStore::new(host.session_mut(), &self.config.prefix).reset_context(name);
        debug!(context = %name, "nonce context reset");
    }

    /// Drops every context record of the session.
    pub fn reset_all<H: NonceHost + ?Sized>(&self, host: &mut H) {
        SessionStateStore::new(host.session_mut(), &self.config.prefix).reset_all();
        debug!(prefix = %self.config.prefix, "all nonce contexts reset");
    }
}
