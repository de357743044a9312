use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nyumba_domain::{Listing, UserId, UserIdentity};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use crate::backend::{
    AuthGateway, AuthListener, AuthListeners, AuthWatch, Backend, Collection, DocRecord, Document,
};
use crate::error::BackendError;

/// Collections provisioned when a local backend opens.
const STANDARD_COLLECTIONS: &[&str] = &["houses", "bnbs", "favorites", "profiles", "bookings"];

/// An in-memory backend that simulates the hosted document database and auth
/// provider.
///
/// - Starts unopened: no auth handle, no collections, `is_ready()` false.
/// - `mark_open` provisions the standard collections and flips the ready flag.
/// - Performs no actual I/O.
pub struct LocalBackend {
    ready: AtomicBool,
    collections: RwLock<HashMap<String, Arc<LocalCollection>>>,
    auth: Arc<LocalAuthGateway>,
}

impl LocalBackend {
    /// A backend that has not finished initializing yet.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            ready: AtomicBool::new(false),
            collections: RwLock::new(HashMap::new()),
            auth: Arc::new(LocalAuthGateway::new()),
        })
    }

    /// A backend that is immediately usable.
    pub fn open() -> Arc<Self> {
        let backend = Self::new();
        backend.mark_open();
        backend
    }

    /// Provision the standard collections and report ready.
    pub fn mark_open(&self) {
        {
            let mut map = self.collections.write().unwrap_or_else(|e| e.into_inner());
            for name in STANDARD_COLLECTIONS {
                map.entry(name.to_string())
                    .or_insert_with(|| Arc::new(LocalCollection::new(name)));
            }
        }
        self.ready.store(true, Ordering::SeqCst);
        debug!("LocalBackend: open");
    }

    /// Concrete auth handle, for seeding demo accounts.
    pub fn auth_local(&self) -> Arc<LocalAuthGateway> {
        self.auth.clone()
    }

    /// Write listings into their kind's collection, keyed by listing id.
    pub async fn seed_listings(&self, listings: &[Listing]) -> Result<(), BackendError> {
        for listing in listings {
            let name = listing.kind.collection();
            let collection = self
                .collection(name)
                .ok_or_else(|| BackendError::UnknownCollection(name.to_string()))?;
            let doc = json!({
                "title": listing.title,
                "location": listing.location,
                "price": listing.price,
                "images": listing.images,
                "amenities": listing.amenities,
            });
            collection.update(listing.id.as_str(), doc).await?;
        }
        debug!(count = listings.len(), "LocalBackend: seeded listings");
        Ok(())
    }
}

impl Backend for LocalBackend {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn auth(&self) -> Option<Arc<dyn AuthGateway>> {
        if !self.is_ready() {
            return None;
        }
        Some(self.auth.clone() as Arc<dyn AuthGateway>)
    }

    fn collection(&self, name: &str) -> Option<Arc<dyn Collection>> {
        let map = self.collections.read().unwrap_or_else(|e| e.into_inner());
        map.get(name).map(|c| c.clone() as Arc<dyn Collection>)
    }

    fn collection_names(&self) -> Vec<String> {
        let map = self.collections.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = map.keys().cloned().collect();
        names.sort();
        names
    }

    fn server_timestamp(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ── Collections ──────────────────────────────────────────────────────────────

struct LocalCollection {
    name: String,
    docs: tokio::sync::RwLock<BTreeMap<String, Document>>,
}

impl LocalCollection {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            docs: tokio::sync::RwLock::new(BTreeMap::new()),
        }
    }
}

#[async_trait]
impl Collection for LocalCollection {
    async fn read_all(&self) -> Result<Vec<DocRecord>, BackendError> {
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .map(|(id, data)| DocRecord {
                id: id.clone(),
                data: data.clone(),
            })
            .collect())
    }

    async fn read(&self, id: &str) -> Result<Option<DocRecord>, BackendError> {
        let docs = self.docs.read().await;
        Ok(docs.get(id).map(|data| DocRecord {
            id: id.to_string(),
            data: data.clone(),
        }))
    }

    async fn add(&self, data: Document) -> Result<String, BackendError> {
        let id = Uuid::new_v4().to_string();
        let mut docs = self.docs.write().await;
        docs.insert(id.clone(), data);
        debug!(collection = %self.name, doc = %id, "LocalCollection: add");
        Ok(id)
    }

    async fn update(&self, id: &str, data: Document) -> Result<(), BackendError> {
        let mut docs = self.docs.write().await;
        docs.insert(id.to_string(), data);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), BackendError> {
        let mut docs = self.docs.write().await;
        if docs.remove(id).is_none() {
            return Err(BackendError::DocumentNotFound(format!(
                "{}/{}",
                self.name, id
            )));
        }
        Ok(())
    }

    async fn query_eq(
        &self,
        field: &str,
        value: &Document,
    ) -> Result<Vec<DocRecord>, BackendError> {
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .filter(|(_, data)| data.get(field) == Some(value))
            .map(|(id, data)| DocRecord {
                id: id.clone(),
                data: data.clone(),
            })
            .collect())
    }
}

// ── Auth ─────────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct Account {
    id: UserId,
    email: String,
    display_name: Option<String>,
    password_digest: String,
}

/// In-memory auth provider keyed by email, with sha-256 password digests.
pub struct LocalAuthGateway {
    accounts: Mutex<HashMap<String, Account>>,
    signed_in: Mutex<Option<UserIdentity>>,
    listeners: AuthListeners,
}

impl LocalAuthGateway {
    fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            signed_in: Mutex::new(None),
            listeners: AuthListeners::new(),
        }
    }

    fn digest(password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(password.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn set_signed_in(&self, user: Option<UserIdentity>) {
        {
            let mut guard = self.signed_in.lock().unwrap_or_else(|e| e.into_inner());
            *guard = user.clone();
        }
        self.listeners.emit(user);
    }
}

#[async_trait]
impl AuthGateway for LocalAuthGateway {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<UserIdentity, BackendError> {
        let account = {
            let mut accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
            if accounts.contains_key(email) {
                return Err(BackendError::AuthFailed(format!(
                    "email already registered: {email}"
                )));
            }
            let account = Account {
                id: UserId::new(Uuid::new_v4().to_string()),
                email: email.to_string(),
                display_name: display_name.map(str::to_string),
                password_digest: Self::digest(password),
            };
            accounts.insert(email.to_string(), account.clone());
            account
        };

        let user = UserIdentity {
            id: account.id,
            email: account.email,
            display_name: account.display_name,
        };
        self.set_signed_in(Some(user.clone()));
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<UserIdentity, BackendError> {
        let account = {
            let accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
            accounts.get(email).cloned()
        };
        let account = match account {
            Some(a) if a.password_digest == Self::digest(password) => a,
            _ => {
                return Err(BackendError::AuthFailed(format!(
                    "invalid credentials for {email}"
                )))
            }
        };

        let user = UserIdentity {
            id: account.id,
            email: account.email,
            display_name: account.display_name,
        };
        self.set_signed_in(Some(user.clone()));
        debug!(user = %user.id, "LocalAuthGateway: sign_in");
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.set_signed_in(None);
        debug!("LocalAuthGateway: sign_out");
        Ok(())
    }

    fn current_user(&self) -> Option<UserIdentity> {
        let guard = self.signed_in.lock().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }

    fn on_auth_change(&self, listener: AuthListener) -> AuthWatch {
        self.listeners.subscribe(listener)
    }
}
