use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nyumba_domain::UserIdentity;

use crate::error::BackendError;

/// Opaque document payload - any JSON value.
pub type Document = serde_json::Value;

/// A stored document together with its id.
#[derive(Debug, Clone, PartialEq)]
pub struct DocRecord {
    pub id: String,
    pub data: Document,
}

/// A named document collection on the hosted backend.
#[async_trait]
pub trait Collection: Send + Sync + 'static {
    async fn read_all(&self) -> Result<Vec<DocRecord>, BackendError>;

    async fn read(&self, id: &str) -> Result<Option<DocRecord>, BackendError>;

    /// Store a new document under a generated id; returns the id.
    async fn add(&self, data: Document) -> Result<String, BackendError>;

    /// Write the document at `id`, creating it when absent.
    async fn update(&self, id: &str, data: Document) -> Result<(), BackendError>;

    async fn delete(&self, id: &str) -> Result<(), BackendError>;

    /// All documents whose top-level `field` equals `value`.
    async fn query_eq(&self, field: &str, value: &Document)
        -> Result<Vec<DocRecord>, BackendError>;
}

pub type AuthListener = Arc<dyn Fn(Option<UserIdentity>) + Send + Sync>;

/// The backend's authentication handle.
#[async_trait]
pub trait AuthGateway: Send + Sync + 'static {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<UserIdentity, BackendError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<UserIdentity, BackendError>;

    async fn sign_out(&self) -> Result<(), BackendError>;

    fn current_user(&self) -> Option<UserIdentity>;

    /// Subscribe to principal changes. The listener fires with the new
    /// principal on every sign-in and sign-out. Dropping the returned watch
    /// unsubscribes.
    fn on_auth_change(&self, listener: AuthListener) -> AuthWatch;
}

/// The hosted backend collaborator.
///
/// The readiness core treats this as an opaque service: a ready flag, an auth
/// handle, a map of named collections, and a server-side clock.
pub trait Backend: Send + Sync + 'static {
    fn is_ready(&self) -> bool;

    fn auth(&self) -> Option<Arc<dyn AuthGateway>>;

    fn collection(&self, name: &str) -> Option<Arc<dyn Collection>>;

    fn collection_names(&self) -> Vec<String>;

    fn server_timestamp(&self) -> DateTime<Utc>;
}

// ── Auth listener registry ───────────────────────────────────────────────────

struct ListenerSlots {
    next_id: u64,
    slots: Vec<(u64, AuthListener)>,
}

/// Shared fan-out list for auth-change listeners.
#[derive(Clone)]
pub struct AuthListeners {
    inner: Arc<Mutex<ListenerSlots>>,
}

impl Default for AuthListeners {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ListenerSlots {
                next_id: 0,
                slots: Vec::new(),
            })),
        }
    }
}

impl AuthListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: AuthListener) -> AuthWatch {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let id = guard.next_id;
        guard.next_id += 1;
        guard.slots.push((id, listener));
        AuthWatch {
            registry: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Invoke every listener with the new principal, in subscription order.
    pub fn emit(&self, user: Option<UserIdentity>) {
        let listeners: Vec<AuthListener> = {
            let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            guard.slots.iter().map(|(_, l)| l.clone()).collect()
        };
        for listener in listeners {
            listener(user.clone());
        }
    }
}

/// RAII auth-change subscription. Dropping it removes the listener.
pub struct AuthWatch {
    registry: Weak<Mutex<ListenerSlots>>,
    id: u64,
}

impl Drop for AuthWatch {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut guard = registry.lock().unwrap_or_else(|e| e.into_inner());
            guard.slots.retain(|(id, _)| *id != self.id);
        }
    }
}
