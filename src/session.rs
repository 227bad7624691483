//! Session storage contract and the typed session-variable abstraction.
//!
//! The store itself is an external collaborator keyed by opaque strings over
//! JSON values; [`MemorySessionStore`] is the in-process default and the
//! test double. [`SessionVariable`] is the application-facing layer: a named
//! slot with an initial value, lazily seeded on first access, shared by all
//! instances using the same logical name.

use crate::context::RequestContext;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use tracing::warn;

/// Generic keyed storage for one client session.
///
/// Implementations own their concurrency; all methods take `&self`.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&self, key: &str, value: Value);

    fn is_set(&self, key: &str) -> bool;
}

/// Concurrent in-memory session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slots: DashMap<String, Value>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.slots.get(key).map(|v| v.clone())
    }

    fn set(&self, key: &str, value: Value) {
        self.slots.insert(key.to_string(), value);
    }

    fn is_set(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }
}

/// A typed, session-backed variable.
///
/// Two instances with the same logical name address the same underlying
/// session slot. Reading starts a session if none exists and seeds the slot
/// with the initial value; writing starts a session if needed and stores the
/// value. After session termination, access behaves as if no session ever
/// existed until a new one is lazily started.
pub struct SessionVariable<T> {
    name: String,
    initial: T,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SessionVariable<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub fn new(name: impl Into<String>, initial: T) -> Self {
        Self {
            name: name.into(),
            initial,
            _marker: PhantomData,
        }
    }

    /// Logical name of the underlying session slot.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read the stored value, seeding the slot with the initial value on
    /// first access within a session.
    pub fn get(&self, ctx: &RequestContext) -> T {
        let store = ctx.start_session();
        if !store.is_set(&self.name) {
            match serde_json::to_value(&self.initial) {
                Ok(v) => store.set(&self.name, v),
                Err(err) => {
                    warn!(slot = %self.name, error = %err, "session initial value not serializable");
                    return self.initial.clone();
                }
            }
        }
        store
            .get(&self.name)
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_else(|| self.initial.clone())
    }

    /// Store a value, starting a session if needed.
    pub fn set(&self, ctx: &RequestContext, value: &T) {
        let store = ctx.start_session();
        match serde_json::to_value(value) {
            Ok(v) => store.set(&self.name, v),
            Err(err) => {
                warn!(slot = %self.name, error = %err, "session value not serializable");
            }
        }
    }
}
