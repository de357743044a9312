use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, RwLock, Weak};

use nyumba_backend::{Backend, BackendError, DocRecord};
use nyumba_domain::{
    AppState, DurableSession, FilterSpec, Listing, ListingId, ListingKind, Role, StatePatch,
    UserIdentity,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::durable::DurableStore;
use crate::error::StoreError;

/// Key of the serialized durable-session blob.
const SESSION_KEY: &str = "nyumba.session";

pub type StateListener = Arc<dyn Fn(&AppState) + Send + Sync>;

struct SubscriberSlots {
    next_id: u64,
    slots: Vec<(u64, StateListener)>,
}

/// Single source of truth for mutable application state.
///
/// All mutation goes through [`update`](StateStore::update); consumers read
/// cloned snapshots or subscribe to change notifications. The backend handle
/// is wired in after construction, which is what the state-readiness
/// predicate observes.
pub struct StateStore {
    state: RwLock<AppState>,
    subscribers: Arc<Mutex<SubscriberSlots>>,
    backend: RwLock<Option<Arc<dyn Backend>>>,
    durable: Arc<dyn DurableStore>,
}

impl StateStore {
    pub fn new(durable: Arc<dyn DurableStore>) -> Self {
        Self {
            state: RwLock::new(AppState::default()),
            subscribers: Arc::new(Mutex::new(SubscriberSlots {
                next_id: 0,
                slots: Vec::new(),
            })),
            backend: RwLock::new(None),
            durable,
        }
    }

    // ── Wiring ────────────────────────────────────────────────────────────────

    pub fn attach_backend(&self, backend: Arc<dyn Backend>) {
        let mut guard = self.backend.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(backend);
        debug!("StateStore: backend attached");
    }

    pub fn has_backend(&self) -> bool {
        let guard = self.backend.read().unwrap_or_else(|e| e.into_inner());
        guard.is_some()
    }

    fn backend(&self) -> Option<Arc<dyn Backend>> {
        let guard = self.backend.read().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    pub fn get_state(&self) -> AppState {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.clone()
    }

    /// Evaluate the filter predicates over a snapshot of the listings.
    ///
    /// Uses the stored filter spec unless an explicit one is given. Returns a
    /// new sequence preserving listing order; never mutates state.
    pub fn apply_filters(&self, explicit: Option<&FilterSpec>) -> Vec<Listing> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        let spec = explicit.unwrap_or(&state.filters);
        state
            .listings
            .iter()
            .filter(|l| spec.matches(l))
            .cloned()
            .collect()
    }

    // ── Mutation ──────────────────────────────────────────────────────────────

    /// Merge a partial update, persist the durable subset, notify everyone.
    ///
    /// Always notifies, even when the merged values equal the old ones: there
    /// is no dirty-checking, so callers can rely on one notification per call.
    pub fn update(&self, patch: StatePatch) {
        let snapshot = {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            state.apply(patch);
            state.clone()
        };
        self.persist_session(&snapshot);
        self.notify(&snapshot);
    }

    pub fn reset_filters(&self) {
        self.update(StatePatch::filters(FilterSpec::default()));
    }

    /// Symmetric toggle on the favorites set: removes when present, appends
    /// when absent. The local toggle always sticks; when a user is signed in
    /// the updated set is pushed to the backend, and a push failure is logged
    /// and surfaced through the error field without rolling back.
    pub async fn toggle_favorite(&self, id: ListingId) {
        let (favorites, user) = {
            let state = self.state.read().unwrap_or_else(|e| e.into_inner());
            let mut favorites = state.favorites.clone();
            match favorites.iter().position(|f| f == &id) {
                Some(pos) => {
                    favorites.remove(pos);
                }
                None => favorites.push(id.clone()),
            }
            (favorites, state.current_user.clone())
        };
        self.update(StatePatch::favorites(favorites.clone()));

        if let Some(user) = user {
            if let Err(err) = self.push_favorites(&user, &favorites).await {
                warn!(listing = %id, error = %err, "favorites sync failed; keeping local toggle");
                self.update(StatePatch::error(format!("favorites sync failed: {err}")));
            }
        }
    }

    async fn push_favorites(
        &self,
        user: &UserIdentity,
        favorites: &[ListingId],
    ) -> Result<(), StoreError> {
        let backend = self.backend().ok_or(BackendError::NotReady)?;
        let collection = backend
            .collection("favorites")
            .ok_or_else(|| BackendError::UnknownCollection("favorites".to_string()))?;
        let ids: Vec<&str> = favorites.iter().map(|f| f.as_str()).collect();
        collection
            .update(
                user.id.as_str(),
                json!({
                    "user_id": user.id.as_str(),
                    "listing_ids": ids,
                    "updated_at": backend.server_timestamp().to_rfc3339(),
                }),
            )
            .await?;
        Ok(())
    }

    // ── Refresh cycle ─────────────────────────────────────────────────────────

    /// Repopulate state from the backend: principal, listings, favorites.
    ///
    /// Any step failure is recorded into the error field and resets listings
    /// and favorites to empty, so a failed refresh never leaves stale data
    /// mixed with fresh. Overlapping calls are not serialized; whichever task
    /// resumes last owns the final listings and error fields
    /// (last-writer-wins).
    pub async fn initialize_state(&self) {
        if let Err(err) = self.refresh().await {
            warn!(error = %err, "state refresh failed; resetting collections");
            self.update(StatePatch {
                listings: Some(Vec::new()),
                favorites: Some(Vec::new()),
                error: Some(Some(err.to_string())),
                ..StatePatch::default()
            });
        }
    }

    async fn refresh(&self) -> Result<(), StoreError> {
        let backend = self.backend().ok_or(BackendError::NotReady)?;
        if !backend.is_ready() {
            return Err(BackendError::NotReady.into());
        }

        let user = backend.auth().and_then(|a| a.current_user());
        let role = match &user {
            Some(user) => Some(fetch_role(backend.as_ref(), user).await),
            None => None,
        };

        // House results land before short-stay results, as fetched.
        let mut listings = Vec::new();
        for kind in [ListingKind::House, ListingKind::Bnb] {
            let name = kind.collection();
            let collection = backend
                .collection(name)
                .ok_or_else(|| BackendError::UnknownCollection(name.to_string()))?;
            for record in collection.read_all().await? {
                listings.push(listing_from_doc(record, kind)?);
            }
        }

        let favorites = match &user {
            Some(user) => fetch_favorites(backend.as_ref(), user).await?,
            None => Vec::new(),
        };

        debug!(
            listings = listings.len(),
            favorites = favorites.len(),
            signed_in = user.is_some(),
            "state refreshed"
        );
        self.update(StatePatch {
            current_user: Some(user),
            role: Some(role),
            listings: Some(listings),
            favorites: Some(favorites),
            error: Some(None),
            ..StatePatch::default()
        });
        Ok(())
    }

    // ── Durable session ───────────────────────────────────────────────────────

    /// Eagerly rehydrate the durable subset, before any backend round trip.
    ///
    /// The restored copy is provisional: the backend's view wins at the next
    /// refresh. A missing or corrupt blob is ignored.
    pub fn restore_session(&self) {
        let blob = match self.durable.get(SESSION_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => return,
            Err(err) => {
                warn!(error = %err, "durable session unreadable; starting fresh");
                return;
            }
        };
        match serde_json::from_str::<DurableSession>(&blob) {
            Ok(session) => {
                let snapshot = {
                    let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
                    state.restore(session);
                    state.clone()
                };
                debug!("restored durable session");
                self.notify(&snapshot);
            }
            Err(err) => warn!(error = %err, "durable session corrupt; starting fresh"),
        }
    }

    fn persist_session(&self, snapshot: &AppState) {
        let session = snapshot.session();
        let blob = match serde_json::to_string(&session) {
            Ok(blob) => blob,
            Err(err) => {
                warn!(error = %err, "session serialization failed");
                return;
            }
        };
        if let Err(err) = self.durable.set(SESSION_KEY, &blob) {
            warn!(error = %err, "session persistence failed");
        }
    }

    // ── Subscription ──────────────────────────────────────────────────────────

    /// Register a change listener. Listeners run in subscription order on
    /// every update, each receiving the same merged snapshot. Dropping the
    /// returned subscription unsubscribes.
    pub fn subscribe(&self, listener: StateListener) -> Subscription {
        let mut guard = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        let id = guard.next_id;
        guard.next_id += 1;
        guard.slots.push((id, listener));
        Subscription {
            subscribers: Arc::downgrade(&self.subscribers),
            id,
        }
    }

    fn notify(&self, snapshot: &AppState) {
        let listeners: Vec<StateListener> = {
            let guard = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
            guard.slots.iter().map(|(_, l)| l.clone()).collect()
        };
        for listener in listeners {
            // A panicking listener must not prevent the others from observing
            // the new state.
            if catch_unwind(AssertUnwindSafe(|| listener(snapshot))).is_err() {
                warn!("state listener panicked during notification");
            }
        }
    }
}

/// RAII state subscription. Dropping it removes the listener.
pub struct Subscription {
    subscribers: Weak<Mutex<SubscriberSlots>>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            let mut guard = subscribers.lock().unwrap_or_else(|e| e.into_inner());
            guard.slots.retain(|(id, _)| *id != self.id);
        }
    }
}

// ── Document conversion ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ListingDoc {
    title: String,
    location: String,
    price: u64,
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    amenities: Vec<String>,
}

/// Tag a fetched document with its collection's kind.
fn listing_from_doc(record: DocRecord, kind: ListingKind) -> Result<Listing, StoreError> {
    let doc: ListingDoc = serde_json::from_value(record.data)?;
    Ok(Listing {
        id: ListingId::new(record.id),
        title: doc.title,
        location: doc.location,
        price: doc.price,
        kind,
        images: doc.images,
        amenities: doc.amenities,
    })
}

/// Role from the user's profile document; absent or malformed means `User`.
async fn fetch_role(backend: &dyn Backend, user: &UserIdentity) -> Role {
    let Some(profiles) = backend.collection("profiles") else {
        return Role::User;
    };
    let record = match profiles.read(user.id.as_str()).await {
        Ok(record) => record,
        Err(err) => {
            warn!(user = %user.id, error = %err, "profile read failed; defaulting role");
            return Role::User;
        }
    };
    record
        .and_then(|r| r.data.get("role").and_then(|v| v.as_str()).map(str::to_string))
        .and_then(|tag| Role::parse(&tag).ok())
        .unwrap_or(Role::User)
}

async fn fetch_favorites(
    backend: &dyn Backend,
    user: &UserIdentity,
) -> Result<Vec<ListingId>, StoreError> {
    let collection = backend
        .collection("favorites")
        .ok_or_else(|| BackendError::UnknownCollection("favorites".to_string()))?;
    let Some(record) = collection.read(user.id.as_str()).await? else {
        return Ok(Vec::new());
    };
    let ids = record
        .data
        .get("listing_ids")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str())
                .map(ListingId::new)
                .collect()
        })
        .unwrap_or_default();
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use nyumba_backend::{AuthGateway, Collection, LocalBackend};
    use nyumba_domain::UserId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::durable::MemoryDurable;

    fn listing(id: &str, kind: ListingKind, price: u64, location: &str) -> Listing {
        Listing {
            id: ListingId::new(id),
            title: id.to_string(),
            location: location.to_string(),
            price,
            kind,
            images: vec![],
            amenities: vec![],
        }
    }

    fn store() -> StateStore {
        StateStore::new(Arc::new(MemoryDurable::new()))
    }

    async fn seeded_backend() -> Arc<LocalBackend> {
        let backend = LocalBackend::open();
        backend
            .seed_listings(&[
                listing("h1", ListingKind::House, 500, "Nairobi"),
                listing("b1", ListingKind::Bnb, 80, "Mombasa"),
            ])
            .await
            .unwrap();
        backend
    }

    #[tokio::test]
    async fn update_always_notifies_in_subscription_order() {
        let store = store();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_a = seen.clone();
        let _sub_a = store.subscribe(Arc::new(move |_s: &AppState| {
            seen_a.lock().unwrap().push("a");
        }));
        let seen_b = seen.clone();
        let _sub_b = store.subscribe(Arc::new(move |_s: &AppState| {
            seen_b.lock().unwrap().push("b");
        }));

        let patch = StatePatch::filters(FilterSpec::default());
        store.update(patch.clone());
        store.update(patch); // identical values still notify

        assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "a", "b"]);
    }

    #[tokio::test]
    async fn panicking_listener_does_not_block_the_rest() {
        let store = store();
        let _bad = store.subscribe(Arc::new(|_s: &AppState| panic!("listener bug")));
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_in_listener = fired.clone();
        let _good = store.subscribe(Arc::new(move |_s: &AppState| {
            fired_in_listener.fetch_add(1, Ordering::SeqCst);
        }));

        store.update(StatePatch::clear_error());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dropped_subscription_stops_notifications() {
        let store = store();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_in_listener = fired.clone();
        let sub = store.subscribe(Arc::new(move |_s: &AppState| {
            fired_in_listener.fetch_add(1, Ordering::SeqCst);
        }));

        store.update(StatePatch::clear_error());
        drop(sub);
        store.update(StatePatch::clear_error());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn apply_filters_returns_subset_and_reset_restores_all() {
        let store = store();
        store.update(StatePatch::listings(vec![
            listing("h1", ListingKind::House, 500, "Nairobi"),
            listing("b1", ListingKind::Bnb, 80, "Mombasa"),
        ]));

        store.update(StatePatch::filters(FilterSpec {
            kind: Some(ListingKind::Bnb),
            ..FilterSpec::default()
        }));
        let matched = store.apply_filters(None);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id.as_str(), "b1");

        let explicit = store.apply_filters(Some(&FilterSpec {
            location: "nairobi".to_string(),
            ..FilterSpec::default()
        }));
        assert_eq!(explicit.len(), 1);
        assert_eq!(explicit[0].id.as_str(), "h1");

        store.reset_filters();
        let all = store.apply_filters(None);
        assert_eq!(all.len(), 2, "reset spec matches the full sequence");
        assert_eq!(store.get_state().listings.len(), 2, "listings never mutated");
    }

    #[tokio::test]
    async fn toggle_favorite_is_self_inverse() {
        let store = store();
        store.toggle_favorite(ListingId::new("h1")).await;
        store.toggle_favorite(ListingId::new("b1")).await;
        assert_eq!(
            store.get_state().favorites,
            vec![ListingId::new("h1"), ListingId::new("b1")]
        );

        store.toggle_favorite(ListingId::new("h1")).await;
        store.toggle_favorite(ListingId::new("h1")).await;
        assert_eq!(
            store.get_state().favorites,
            vec![ListingId::new("b1"), ListingId::new("h1")],
            "double toggle restores membership; re-adds append at the end"
        );
    }

    #[tokio::test]
    async fn toggle_favorite_pushes_to_backend_when_signed_in() {
        let store = store();
        let backend = seeded_backend().await;
        store.attach_backend(backend.clone());

        let auth = backend.auth().unwrap();
        let user = auth.sign_up("fav@b.co", "pw", None).await.unwrap();
        store.update(StatePatch::signed_in(user.clone(), Role::User));

        store.toggle_favorite(ListingId::new("b1")).await;

        let favorites = backend.collection("favorites").unwrap();
        let record = favorites.read(user.id.as_str()).await.unwrap().unwrap();
        assert_eq!(record.data["listing_ids"], json!(["b1"]));
        assert!(store.get_state().error.is_none());
    }

    #[tokio::test]
    async fn failed_favorite_push_keeps_local_toggle() {
        let store = store();
        // Signed in, but no backend wired: the push must fail.
        store.update(StatePatch::signed_in(
            UserIdentity {
                id: UserId::new("u1"),
                email: "u@b.co".to_string(),
                display_name: None,
            },
            Role::User,
        ));

        store.toggle_favorite(ListingId::new("h1")).await;

        let state = store.get_state();
        assert_eq!(state.favorites, vec![ListingId::new("h1")], "no rollback");
        assert!(state.error.is_some(), "failure surfaced through error field");
    }

    #[tokio::test]
    async fn durable_session_restores_before_any_backend_call() {
        let durable: Arc<dyn DurableStore> = Arc::new(MemoryDurable::new());

        let first = StateStore::new(durable.clone());
        first.update(StatePatch::signed_in(
            UserIdentity {
                id: UserId::new("u1"),
                email: "u@b.co".to_string(),
                display_name: Some("U".to_string()),
            },
            Role::Host,
        ));
        first.update(StatePatch::favorites(vec![
            ListingId::new("h1"),
            ListingId::new("b1"),
        ]));

        // Simulated restart: fresh store over the same durable blob, no backend.
        let second = StateStore::new(durable);
        second.restore_session();

        let state = second.get_state();
        assert_eq!(
            state.favorites,
            vec![ListingId::new("h1"), ListingId::new("b1")]
        );
        assert_eq!(state.current_user.unwrap().id, UserId::new("u1"));
        assert_eq!(state.role, Some(Role::Host));
        assert!(state.listings.is_empty(), "listings are never persisted");
    }

    #[tokio::test]
    async fn initialize_state_signed_out_fetches_listings_and_clears_favorites() {
        let store = store();
        store.attach_backend(seeded_backend().await);
        store.update(StatePatch::favorites(vec![ListingId::new("stale")]));

        store.initialize_state().await;

        let state = store.get_state();
        assert!(state.current_user.is_none());
        assert!(state.role.is_none());
        assert!(state.favorites.is_empty(), "unauthenticated clears favorites");
        assert!(state.error.is_none());
        let kinds: Vec<ListingKind> = state.listings.iter().map(|l| l.kind).collect();
        assert_eq!(kinds, vec![ListingKind::House, ListingKind::Bnb]);
    }

    #[tokio::test]
    async fn initialize_state_signed_in_loads_favorites_and_role() {
        let store = store();
        let backend = seeded_backend().await;
        store.attach_backend(backend.clone());

        let auth = backend.auth().unwrap();
        let user = auth.sign_up("host@b.co", "pw", None).await.unwrap();
        backend
            .collection("profiles")
            .unwrap()
            .update(user.id.as_str(), json!({"role": "host"}))
            .await
            .unwrap();
        backend
            .collection("favorites")
            .unwrap()
            .update(
                user.id.as_str(),
                json!({"user_id": user.id.as_str(), "listing_ids": ["b1"]}),
            )
            .await
            .unwrap();

        store.initialize_state().await;

        let state = store.get_state();
        assert_eq!(state.current_user.unwrap().id, user.id);
        assert_eq!(state.role, Some(Role::Host));
        assert_eq!(state.favorites, vec![ListingId::new("b1")]);
    }

    #[tokio::test]
    async fn initialize_state_failure_is_all_or_nothing() {
        struct FailingCollection;

        #[async_trait]
        impl Collection for FailingCollection {
            async fn read_all(&self) -> Result<Vec<DocRecord>, BackendError> {
                Err(BackendError::Internal("injected".to_string()))
            }
            async fn read(&self, _id: &str) -> Result<Option<DocRecord>, BackendError> {
                Err(BackendError::Internal("injected".to_string()))
            }
            async fn add(&self, _data: serde_json::Value) -> Result<String, BackendError> {
                Err(BackendError::Internal("injected".to_string()))
            }
            async fn update(
                &self,
                _id: &str,
                _data: serde_json::Value,
            ) -> Result<(), BackendError> {
                Err(BackendError::Internal("injected".to_string()))
            }
            async fn delete(&self, _id: &str) -> Result<(), BackendError> {
                Err(BackendError::Internal("injected".to_string()))
            }
            async fn query_eq(
                &self,
                _field: &str,
                _value: &serde_json::Value,
            ) -> Result<Vec<DocRecord>, BackendError> {
                Err(BackendError::Internal("injected".to_string()))
            }
        }

        struct HalfBrokenBackend {
            inner: Arc<LocalBackend>,
        }

        impl Backend for HalfBrokenBackend {
            fn is_ready(&self) -> bool {
                self.inner.is_ready()
            }
            fn auth(&self) -> Option<Arc<dyn AuthGateway>> {
                self.inner.auth()
            }
            fn collection(&self, name: &str) -> Option<Arc<dyn Collection>> {
                if name == "bnbs" {
                    Some(Arc::new(FailingCollection))
                } else {
                    self.inner.collection(name)
                }
            }
            fn collection_names(&self) -> Vec<String> {
                self.inner.collection_names()
            }
            fn server_timestamp(&self) -> DateTime<Utc> {
                self.inner.server_timestamp()
            }
        }

        let store = store();
        store.attach_backend(Arc::new(HalfBrokenBackend {
            inner: seeded_backend().await,
        }));
        store.update(StatePatch::favorites(vec![ListingId::new("old")]));

        store.initialize_state().await;

        let state = store.get_state();
        assert!(state.error.is_some());
        assert!(state.listings.is_empty(), "no house results survive a failed cycle");
        assert!(state.favorites.is_empty());
    }

    #[tokio::test]
    async fn initialize_state_without_backend_records_error() {
        let store = store();
        store.initialize_state().await;
        let state = store.get_state();
        assert!(state.error.is_some());
        assert!(state.listings.is_empty());
    }
}
