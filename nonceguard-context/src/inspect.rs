use nonceguard_core::{
    HANDLE_KEY, NonceConfig, NonceError, Session, SessionStateStore, VALIDATORS_KEY,
};

/// Result of inspecting the stored record of an action context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextInspectResult {
    /// The action context name.
    pub name: String,
    /// Composite id the nonce is bound to.
    pub context_id: String,
    /// The stored nonce handle.
    pub handle: String,
    /// Identifiers of the validators registered for the nonce, in order.
    pub validators: Vec<String>,
    /// Keys written by validators next to the record.
    pub private_keys: Vec<String>,
}

/// Inspects the record of `name` without modifying the session.
///
/// The handle is not verified; use [`TokenContext::validate`] for that.
///
/// # Returns
/// `Ok(None)` when the context has no record, otherwise the snapshot
///
/// [`TokenContext::validate`]: crate::TokenContext::validate
pub fn inspect_context(
    session: &mut Session,
    config: &NonceConfig,
    name: &str,
) -> Result<Option<ContextInspectResult>, NonceError> {
    let mut store = SessionStateStore::new(session, &config.prefix);
    // Checked first so reading a missing context does not create it
    if !store.has_record(name) {
        return Ok(None);
    }

    let Some(record) = store.record(name)? else {
        return Ok(None);
    };
    let private_keys = store
        .keys(name)
        .into_iter()
        .filter(|key| key != HANDLE_KEY && key != VALIDATORS_KEY)
        .collect();

    Ok(Some(ContextInspectResult {
        name: name.to_string(),
        context_id: config.context_id(name),
        handle: record.handle,
        validators: record.validators,
        private_keys,
    }))
}
