//! In-process host adapter
//!
//! [`RequestHost`] implements the host interface for one request: it keeps
//! the user's session, the incoming request fields, an output buffer, and
//! the hooks and text filters registered by [`NonceManager::install`].
//!
//! [`NonceManager::install`]: crate::NonceManager::install

use std::borrow::Cow;
use std::collections::BTreeMap;

use nonceguard_core::{
    HOST_FAILURE_TEXT, NonceError, NonceHost, RequestKind, Session, TextFilter, TokenPrimitive,
    ValidationResult, VerificationHook,
};
use tracing::warn;
use url::form_urlencoded;

/// Default request field for standard requests.
pub const DEFAULT_NONCE_FIELD: &str = "_nonce";

/// Default request field for ajax requests, checked before [`DEFAULT_NONCE_FIELD`].
pub const AJAX_NONCE_FIELD: &str = "_ajax_nonce";

/// Hidden field carrying the referer of the rendering page.
pub const REFERER_FIELD: &str = "_http_referer";

/// The parts of an incoming request nonce verification looks at
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NonceRequest {
    fields: BTreeMap<String, String>,
    ajax: bool,
    referer: Option<String>,
}

impl NonceRequest {
    /// An empty standard request.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty ajax request.
    pub fn ajax() -> Self {
        Self {
            ajax: true,
            ..Self::default()
        }
    }

    /// Adds a request field (query or form).
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Sets the URI of the page the request is rendered for.
    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn is_ajax(&self) -> bool {
        self.ajax
    }

    pub fn referer(&self) -> Option<&str> {
        self.referer.as_deref()
    }
}

/// A post-verification hook and the id it was registered under
struct RegisteredHook {
    kind: RequestKind,
    id: &'static str,
    hook: VerificationHook,
}

/// Host adapter serving one request for one user session
pub struct RequestHost<P> {
    primitive: P,
    session: Session,
    session_started: bool,
    request: NonceRequest,
    output: String,
    hooks: Vec<RegisteredHook>,
    text_filters: Vec<(&'static str, TextFilter)>,
}

impl<P: TokenPrimitive> RequestHost<P> {
    /// Creates a host for `request` over the persisted `session`.
    pub fn new(primitive: P, session: Session, request: NonceRequest) -> Self {
        Self {
            primitive,
            session,
            session_started: false,
            request,
            output: String::new(),
            hooks: Vec::new(),
            text_filters: Vec::new(),
        }
    }

    /// Replaces the current request, keeping session, hooks and filters.
    pub fn set_request(&mut self, request: NonceRequest) {
        self.request = request;
        self.output.clear();
    }

    pub fn request(&self) -> &NonceRequest {
        &self.request
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Hands the session back for persisting.
    pub fn into_session(self) -> Session {
        self.session
    }

    pub fn is_session_started(&self) -> bool {
        self.session_started
    }

    /// Markup echoed during this request.
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn primitive(&self) -> &P {
        &self.primitive
    }

    /// Applies the registered text filters to a user-visible text.
    pub fn translate(&self, text: &str) -> String {
        self.text_filters
            .iter()
            .find_map(|(_, filter)| filter(text))
            .unwrap_or_else(|| text.to_string())
    }

    fn request_nonce(&self, kind: RequestKind, field: Option<&str>) -> Option<&str> {
        match (field, kind) {
            (Some(field), _) => self.request.field(field),
            (None, RequestKind::Ajax) => self
                .request
                .field(AJAX_NONCE_FIELD)
                .or_else(|| self.request.field(DEFAULT_NONCE_FIELD)),
            (None, RequestKind::Admin) => self.request.field(DEFAULT_NONCE_FIELD),
        }
    }
}

impl<P: TokenPrimitive> NonceHost for RequestHost<P> {
    fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    fn start_session(&mut self) {
        self.session_started = true;
    }

    fn create_token(&self, context_id: &str) -> Result<String, NonceError> {
        self.primitive.create_token(context_id)
    }

    fn verify_token(&self, handle: &str, context_id: &str) -> ValidationResult {
        self.primitive.verify_token(handle, context_id)
    }

    fn compose_nonce_url(
        &self,
        base_url: &str,
        context_id: &str,
        field_prefix: &str,
    ) -> Result<String, NonceError> {
        let nonce = self.primitive.create_token(context_id)?;

        let (base, fragment) = match base_url.split_once('#') {
            Some((base, fragment)) => (base, Some(fragment)),
            None => (base_url, None),
        };
        let (path, query) = base.split_once('?').unwrap_or((base, ""));

        // Other parameters are kept as written, an existing nonce pair is dropped
        let mut pairs: Vec<String> = query
            .split('&')
            .filter(|pair| !pair.is_empty() && !is_query_key(pair, field_prefix))
            .map(str::to_string)
            .collect();
        pairs.push(
            form_urlencoded::Serializer::new(String::new())
                .append_pair(field_prefix, &nonce)
                .finish(),
        );

        let mut url = format!("{path}?{}", pairs.join("&"));
        if let Some(fragment) = fragment {
            url.push('#');
            url.push_str(fragment);
        }
        Ok(url)
    }

    fn render_nonce_field(
        &mut self,
        context_id: &str,
        field_prefix: &str,
        include_referrer: bool,
        echo_to_output: bool,
    ) -> Result<String, NonceError> {
        let nonce = self.primitive.create_token(context_id)?;
        let field = escape_attr(field_prefix);

        let mut markup = format!(
            r#"<input type="hidden" id="{field}" name="{field}" value="{}" />"#,
            escape_attr(&nonce)
        );
        if include_referrer {
            if let Some(referer) = self.request.referer() {
                markup.push_str(&format!(
                    r#"<input type="hidden" name="{REFERER_FIELD}" value="{}" />"#,
                    escape_attr(referer)
                ));
            }
        }

        if echo_to_output {
            self.output.push_str(&markup);
        }
        Ok(markup)
    }

    fn doing_ajax(&self) -> bool {
        self.request.is_ajax()
    }

    fn verify_request_field(
        &mut self,
        kind: RequestKind,
        context_id: &str,
        field: Option<&str>,
        die_on_failure: bool,
    ) -> Result<ValidationResult, NonceError> {
        let raw = match self.request_nonce(kind, field) {
            Some(nonce) => self.primitive.verify_token(nonce, context_id),
            None => ValidationResult::Invalid,
        };

        let mut result = raw;
        for registered in self.hooks.iter().filter(|registered| registered.kind == kind) {
            result = (registered.hook)(&mut self.session, context_id, result);
        }

        if !result.is_valid() {
            warn!(action = %context_id, kind = %kind, raw = %raw, "request nonce rejected");
            if die_on_failure {
                return Err(NonceError::validation_failed(
                    self.translate(HOST_FAILURE_TEXT),
                ));
            }
        }
        Ok(result)
    }

    fn set_nonce_lifetime(&mut self, lifetime: i64) {
        self.primitive.set_lifetime(lifetime);
    }

    fn add_verification_hook(
        &mut self,
        kind: RequestKind,
        id: &'static str,
        hook: VerificationHook,
    ) {
        match self
            .hooks
            .iter_mut()
            .find(|registered| registered.kind == kind && registered.id == id)
        {
            Some(registered) => registered.hook = hook,
            None => self.hooks.push(RegisteredHook { kind, id, hook }),
        }
    }

    fn add_text_filter(&mut self, id: &'static str, filter: TextFilter) {
        match self.text_filters.iter_mut().find(|(filter_id, _)| *filter_id == id) {
            Some(entry) => entry.1 = filter,
            None => self.text_filters.push((id, filter)),
        }
    }
}

/// Whether a raw `key=value` query segment carries `key`.
fn is_query_key(pair: &str, key: &str) -> bool {
    form_urlencoded::parse(pair.as_bytes())
        .next()
        .is_some_and(|(pair_key, _)| pair_key == key)
}

/// Escapes a value for use inside a double-quoted HTML attribute.
fn escape_attr(value: &str) -> Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(value)
}
