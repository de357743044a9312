use std::sync::Arc;

use nyumba_backend::Backend;
use nyumba_config::Settings;
use nyumba_ready::{ReadinessCoordinator, ServiceHandle};
use nyumba_store::{DurableStore, FileDurable, MemoryDurable, StateStore};
use tracing::warn;

use crate::auth::AuthManager;
use crate::ui::ConsoleUi;

/// The composed application: every collaborator, explicitly constructed and
/// shared by reference from one place.
pub struct App {
    pub coordinator: Arc<ReadinessCoordinator>,
    pub backend: Arc<dyn Backend>,
    pub store: Arc<StateStore>,
    pub auth: Arc<AuthManager>,
    pub ui: Arc<ConsoleUi>,
}

/// Composition root: build the store over the configured durable flavor,
/// restore the provisional session, register all four services, then run the
/// sequenced bring-up with the periodic monitor as backstop. Once the set is
/// ready, the first state refresh runs; a failed sequence leaves the monitor
/// converging in the background instead of failing the caller.
pub async fn bootstrap(settings: &Settings, backend: Arc<dyn Backend>) -> App {
    let durable: Arc<dyn DurableStore> = match &settings.durable_path {
        Some(path) => Arc::new(FileDurable::new(path)),
        None => Arc::new(MemoryDurable::new()),
    };
    let store = Arc::new(StateStore::new(durable));
    store.restore_session();

    let auth = Arc::new(AuthManager::new());
    let ui = Arc::new(ConsoleUi::new());
    let coordinator = Arc::new(ReadinessCoordinator::new(settings.timings.clone()));

    coordinator.register_service(ServiceHandle::Backend(backend.clone()));
    coordinator.register_service(ServiceHandle::State(store.clone()));
    coordinator.register_service(ServiceHandle::Auth(auth.clone()));
    coordinator.register_service(ServiceHandle::Ui(ui.clone()));

    coordinator.start_monitoring();
    if coordinator.initialize_in_sequence().await {
        store.initialize_state().await;
    } else {
        warn!("sequenced bring-up failed; monitor keeps converging in the background");
    }

    App {
        coordinator,
        backend,
        store,
        auth,
        ui,
    }
}
