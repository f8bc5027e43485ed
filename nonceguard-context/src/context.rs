use nonceguard_core::{
    HANDLE_KEY, NonceConfig, NonceError, NonceHost, RequestKind, SessionStateStore,
    VALIDATORS_KEY, ValidationResult,
};
use nonceguard_validator::{Validator, ValidatorRegistry};
use tracing::{debug, info};

/// Policy applied when a nonce is requested for a context that already has one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextOption {
    /// Fail with [`NonceError::DuplicateContext`] if a nonce exists
    #[default]
    NoOverwrite,
    /// Reuse the existing nonce; create one if none exists
    ForceLoad,
    /// Discard the existing record and create a new nonce
    ForceCreate,
}

/// A nonce resolved for one named action context
///
/// Created through [`NonceManager`](crate::NonceManager). A `TokenContext`
/// always carries a handle; construction fails otherwise.
///
/// | record exists? | `NoOverwrite` | `ForceLoad` | `ForceCreate` |
/// |---|---|---|---|
/// | no | create | create | create |
/// | yes | `DuplicateContext` | load handle | reset and create |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenContext {
    name: String,
    handle: String,
    option: ContextOption,
    context_id: String,
    field_name: String,
}

impl TokenContext {
    /// Resolves the nonce for `name` according to `option`.
    pub(crate) fn start<H: NonceHost + ?Sized>(
        config: &NonceConfig,
        registry: &ValidatorRegistry,
        host: &mut H,
        name: &str,
        option: ContextOption,
        validators: Vec<Box<dyn Validator>>,
    ) -> Result<Self, NonceError> {
        let mut store = SessionStateStore::new(host.session_mut(), &config.prefix);

        if store.has_record(name) {
            match option {
                ContextOption::NoOverwrite => return Err(NonceError::duplicate_context(name)),
                ContextOption::ForceLoad => {
                    // Only the handle is read, the validator list stays as stored
                    let handle = store.handle(name)?.ok_or_else(|| {
                        NonceError::internal(format!("record for '{name}' has no handle"))
                    })?;
                    debug!(context = %name, "reusing existing nonce");
                    return Ok(Self::resolved(config, name, handle, option));
                }
                ContextOption::ForceCreate => {
                    debug!(context = %name, "overwriting existing nonce");
                }
            }
        }

        // Every validator must be resolvable later, checked before any state changes
        if let Some(unknown) = validators
            .iter()
            .find(|validator| !registry.is_known(validator.identifier()))
        {
            return Err(NonceError::InvalidValidatorType {
                identifier: unknown.identifier().to_string(),
            });
        }

        store.reset_context(name);
        let mut registered: Vec<String> = Vec::with_capacity(validators.len());
        for validator in &validators {
            if validator.on_register(name, &mut store) {
                registered.push(validator.identifier().to_string());
            } else {
                debug!(
                    context = %name,
                    validator = %validator.identifier(),
                    "validator declined registration"
                );
            }
        }

        let context_id = config.context_id(name);
        let handle = host.create_token(&context_id)?;

        let mut store = SessionStateStore::new(host.session_mut(), &config.prefix);
        store.set(name, HANDLE_KEY, handle.clone());
        info!(context = %name, validators = ?registered, "nonce context created");
        store.set(name, VALIDATORS_KEY, registered);

        Ok(Self::resolved(config, name, handle, option))
    }

    fn resolved(config: &NonceConfig, name: &str, handle: String, option: ContextOption) -> Self {
        Self {
            name: name.to_string(),
            handle,
            option,
            context_id: config.context_id(name),
            field_name: config.field_name().to_string(),
        }
    }

    /// The action context name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The nonce handle.
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// The policy this context was resolved with.
    pub fn option(&self) -> ContextOption {
        self.option
    }

    /// Composite id the nonce is bound to (prefix + name).
    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// Request field the nonce is carried in.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Adds a nonce for this context to `base_url`.
    pub fn create_url<H: NonceHost + ?Sized>(
        &self,
        host: &H,
        base_url: &str,
    ) -> Result<String, NonceError> {
        host.compose_nonce_url(base_url, &self.context_id, &self.field_name)
    }

    /// Hidden input markup carrying a nonce and the referer.
    pub fn create_input_markup<H: NonceHost + ?Sized>(
        &self,
        host: &mut H,
    ) -> Result<String, NonceError> {
        host.render_nonce_field(&self.context_id, &self.field_name, true, false)
    }

    /// Like [`create_input_markup`](Self::create_input_markup), also writing
    /// the markup to the host output.
    pub fn render_input_markup<H: NonceHost + ?Sized>(
        &self,
        host: &mut H,
    ) -> Result<String, NonceError> {
        host.render_nonce_field(&self.context_id, &self.field_name, true, true)
    }

    /// Verifies the stored handle with the token primitive only.
    ///
    /// Custom validators are not consulted; they run on the request
    /// verification path.
    pub fn validate<H: NonceHost + ?Sized>(&self, host: &H) -> ValidationResult {
        host.verify_token(&self.handle, &self.context_id)
    }

    /// Verifies the nonce carried by the current request.
    ///
    /// Picks the ajax or standard path from the host's request detection.
    /// `field_name` defaults to this context's field. With `die_on_failure`,
    /// a rejected nonce is returned as [`NonceError::ValidationFailed`].
    pub fn validate_request<H: NonceHost + ?Sized>(
        &self,
        host: &mut H,
        field_name: Option<&str>,
        die_on_failure: bool,
    ) -> Result<ValidationResult, NonceError> {
        let kind = if host.doing_ajax() {
            RequestKind::Ajax
        } else {
            RequestKind::Admin
        };
        let field = field_name.unwrap_or(&self.field_name);
        host.verify_request_field(kind, &self.context_id, Some(field), die_on_failure)
    }

    /// Verifies the request nonce from the default field, stopping on failure.
    pub fn check_request<H: NonceHost + ?Sized>(
        &self,
        host: &mut H,
    ) -> Result<ValidationResult, NonceError> {
        self.validate_request(host, None, true)
    }
}
