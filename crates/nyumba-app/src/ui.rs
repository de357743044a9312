use std::sync::{Arc, Mutex};

use nyumba_domain::AppState;
use nyumba_ready::UiService;
use nyumba_store::{StateStore, Subscription};
use tracing::info;

/// A minimal rendering surface: logs a one-line summary of every state
/// change. Stands in for the DOM layer, which the core only knows through
/// the [`UiService`] seam.
#[derive(Default)]
pub struct ConsoleUi {
    wiring: Mutex<Option<(Arc<StateStore>, Subscription)>>,
}

impl ConsoleUi {
    pub fn new() -> Self {
        Self::default()
    }

    fn render_line(state: &AppState) {
        info!(
            listings = state.listings.len(),
            favorites = state.favorites.len(),
            signed_in = state.current_user.is_some(),
            error = state.error.as_deref().unwrap_or(""),
            "render"
        );
    }
}

impl UiService for ConsoleUi {
    fn can_render(&self) -> bool {
        true
    }

    fn attach_state(&self, state: Arc<StateStore>) {
        let subscription = state.subscribe(Arc::new(Self::render_line));
        let mut guard = self.wiring.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some((state, subscription));
    }

    fn has_state(&self) -> bool {
        let guard = self.wiring.lock().unwrap_or_else(|e| e.into_inner());
        guard.is_some()
    }

    fn render(&self, state: &AppState) {
        Self::render_line(state);
    }
}
