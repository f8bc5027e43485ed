//! Per-user session state for action contexts
//!
//! The session is a JSON object persisted by the host between requests.
//! nonceguard keeps everything under a single namespace key, then one object
//! per action context name:
//!
//! ```text
//! { "<prefix>": { "<context name>": { "handle": "...", "validators": [...], ... } } }
//! ```
//!
//! Besides `handle` and `validators`, validators may keep private keys in the
//! same context object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::NonceError;

/// Session key holding the nonce handle of a context.
pub const HANDLE_KEY: &str = "handle";

/// Session key holding the ordered validator identifiers of a context.
pub const VALIDATORS_KEY: &str = "validators";

/// The persisted per-user session mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session(Map<String, Value>);

impl Session {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a top-level session value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Inserts a top-level session value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Removes a top-level session value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Session {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Typed view of the data every context record carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// The nonce handle created for the context
    pub handle: String,
    /// Identifiers of the registered validators, in registration order
    pub validators: Vec<String>,
}

/// Accessor for the namespaced context records of one session
///
/// Reads and writes lazily create the namespace and the context object, so a
/// missing key simply reads as absent.
pub struct SessionStateStore<'a> {
    session: &'a mut Session,
    namespace: &'a str,
}

impl<'a> SessionStateStore<'a> {
    /// Creates a store over `session` using `namespace` as the top-level key.
    pub fn new(session: &'a mut Session, namespace: &'a str) -> Self {
        Self { session, namespace }
    }

    /// The namespace key of this store.
    pub fn namespace(&self) -> &str {
        self.namespace
    }

    /// Whether `key` is set (and not null) for the context.
    pub fn has(&mut self, context: &str, key: &str) -> bool {
        self.context_mut(context)
            .get(key)
            .is_some_and(|value| !value.is_null())
    }

    /// Returns a copy of the value stored under `key` for the context.
    pub fn get(&mut self, context: &str, key: &str) -> Option<Value> {
        self.context_mut(context)
            .get(key)
            .filter(|value| !value.is_null())
            .cloned()
    }

    /// Returns the value under `key` if it is a boolean.
    pub fn get_bool(&mut self, context: &str, key: &str) -> Option<bool> {
        self.context_mut(context).get(key).and_then(Value::as_bool)
    }

    /// Stores `value` under `key` for the context.
    pub fn set(&mut self, context: &str, key: &str, value: impl Into<Value>) {
        self.context_mut(context)
            .insert(key.to_string(), value.into());
    }

    /// Clears all data of one context, leaving an empty record object.
    pub fn reset_context(&mut self, context: &str) {
        self.namespace_mut()
            .insert(context.to_string(), Value::Object(Map::new()));
    }

    /// Clears the data of every context.
    pub fn reset_all(&mut self) {
        self.session
            .insert(self.namespace, Value::Object(Map::new()));
    }

    /// Whether a record with a handle exists for the context.
    ///
    /// An object created by a lazy read does not count as a record.
    pub fn has_record(&self, context: &str) -> bool {
        self.session
            .get(self.namespace)
            .and_then(|ns| ns.get(context))
            .and_then(|record| record.get(HANDLE_KEY))
            .is_some_and(|handle| !handle.is_null())
    }

    /// Reads the nonce handle of a context without touching anything else.
    pub fn handle(&mut self, context: &str) -> Result<Option<String>, NonceError> {
        match self.get(context, HANDLE_KEY) {
            None => Ok(None),
            Some(Value::String(handle)) => Ok(Some(handle)),
            Some(other) => Err(NonceError::malformed_record(
                context,
                HANDLE_KEY,
                format!("expected a string, found {other}"),
            )),
        }
    }

    /// Reads the typed record of a context.
    ///
    /// Returns `Ok(None)` when no handle is stored.
    pub fn record(&mut self, context: &str) -> Result<Option<SessionRecord>, NonceError> {
        let Some(handle) = self.handle(context)? else {
            return Ok(None);
        };
        let validators = self.validators(context)?;
        Ok(Some(SessionRecord { handle, validators }))
    }

    /// Reads the ordered validator identifiers of a context.
    ///
    /// A missing list reads as empty; anything other than a list of strings
    /// is reported as a malformed record.
    pub fn validators(&mut self, context: &str) -> Result<Vec<String>, NonceError> {
        let Some(value) = self.get(context, VALIDATORS_KEY) else {
            return Ok(Vec::new());
        };
        let Value::Array(items) = value else {
            return Err(NonceError::malformed_record(
                context,
                VALIDATORS_KEY,
                "expected a list of validator identifiers",
            ));
        };
        items
            .into_iter()
            .map(|item| match item {
                Value::String(id) => Ok(id),
                other => Err(NonceError::malformed_record(
                    context,
                    VALIDATORS_KEY,
                    format!("expected a validator identifier, found {other}"),
                )),
            })
            .collect()
    }

    /// Keys stored for a context, in storage order.
    pub fn keys(&mut self, context: &str) -> Vec<String> {
        self.context_mut(context).keys().cloned().collect()
    }

    fn namespace_mut(&mut self) -> &mut Map<String, Value> {
        let namespace = self.namespace.to_string();
        ensure_object(
            self.session
                .0
                .entry(namespace)
                .or_insert_with(|| Value::Object(Map::new())),
        )
    }

    fn context_mut(&mut self, context: &str) -> &mut Map<String, Value> {
        ensure_object(
            self.namespace_mut()
                .entry(context.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
        )
    }
}

/// Replaces a non-object value with an empty object and returns the object.
fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => {
            *other = Value::Object(Map::new());
            ensure_object(other)
        }
    }
}
