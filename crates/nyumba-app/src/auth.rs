use std::sync::{Arc, Mutex};

use nyumba_backend::{AuthGateway, AuthWatch, Backend, BackendError};
use nyumba_domain::UserIdentity;
use nyumba_ready::AuthService;
use nyumba_store::StateStore;
use tracing::debug;

struct Wiring {
    backend: Arc<dyn Backend>,
    state: Arc<StateStore>,
    /// Keeps the auth-change subscription alive for the wiring lifetime.
    _watch: Option<AuthWatch>,
}

/// The application's auth service: a thin shell over the backend's auth
/// handle that refreshes application state whenever the principal changes.
///
/// Until [`attach`](AuthService::attach) wires in the backend and state
/// handles, every operation reports not-ready.
#[derive(Default)]
pub struct AuthManager {
    wiring: Mutex<Option<Wiring>>,
}

impl AuthManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn gateway(&self) -> Result<(Arc<dyn AuthGateway>, Arc<StateStore>), BackendError> {
        let guard = self.wiring.lock().unwrap_or_else(|e| e.into_inner());
        let wiring = guard.as_ref().ok_or(BackendError::NotReady)?;
        let gateway = wiring.backend.auth().ok_or(BackendError::NotReady)?;
        Ok((gateway, wiring.state.clone()))
    }

    /// Sign in and refresh state before returning, so callers observe the
    /// authenticated view. The auth-change listener fires a second refresh in
    /// the background; overlapping refreshes are last-writer-wins.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserIdentity, BackendError> {
        let (gateway, state) = self.gateway()?;
        let user = gateway.sign_in(email, password).await?;
        state.initialize_state().await;
        Ok(user)
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<UserIdentity, BackendError> {
        let (gateway, state) = self.gateway()?;
        let user = gateway.sign_up(email, password, display_name).await?;
        state.initialize_state().await;
        Ok(user)
    }

    pub async fn sign_out(&self) -> Result<(), BackendError> {
        let (gateway, state) = self.gateway()?;
        gateway.sign_out().await?;
        state.initialize_state().await;
        Ok(())
    }
}

impl AuthService for AuthManager {
    fn backend_ready(&self) -> bool {
        let guard = self.wiring.lock().unwrap_or_else(|e| e.into_inner());
        guard.as_ref().is_some_and(|w| w.backend.is_ready())
    }

    fn attach(&self, backend: Arc<dyn Backend>, state: Arc<StateStore>) {
        let watch = backend.auth().map(|gateway| {
            let state = state.clone();
            gateway.on_auth_change(Arc::new(move |_user| {
                let state = state.clone();
                tokio::spawn(async move {
                    state.initialize_state().await;
                });
            }))
        });
        let mut guard = self.wiring.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(Wiring {
            backend,
            state,
            _watch: watch,
        });
        debug!("AuthManager: wired");
    }

    fn is_attached(&self) -> bool {
        let guard = self.wiring.lock().unwrap_or_else(|e| e.into_inner());
        guard.is_some()
    }
}
