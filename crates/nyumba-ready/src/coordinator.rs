use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use nyumba_backend::Backend;
use nyumba_config::CoordinatorTimings;
use nyumba_store::StateStore;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Instant};
use tracing::{debug, info, warn};

use crate::error::ReadyError;
use crate::services::{AuthService, ServiceHandle, ServiceName, UiService};
use crate::status::{ServiceStatus, StatusReport};

/// Notification fanned out on readiness transitions.
///
/// Derived from the same transition points as the one-shot callback queue,
/// which stays the canonical mechanism; this channel is a convenience for
/// external observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadyEvent {
    Service { name: ServiceName },
    All,
}

type ReadyCallback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Clone, Copy, Default)]
struct ReadyFlags {
    backend: bool,
    state: bool,
    auth: bool,
    ui: bool,
}

impl ReadyFlags {
    fn get(&self, name: ServiceName) -> bool {
        match name {
            ServiceName::Backend => self.backend,
            ServiceName::State => self.state,
            ServiceName::Auth => self.auth,
            ServiceName::Ui => self.ui,
        }
    }

    fn set(&mut self, name: ServiceName, value: bool) {
        match name {
            ServiceName::Backend => self.backend = value,
            ServiceName::State => self.state = value,
            ServiceName::Auth => self.auth = value,
            ServiceName::Ui => self.ui = value,
        }
    }

    fn all(&self) -> bool {
        self.backend && self.state && self.auth && self.ui
    }
}

struct Registry {
    backend: Option<Arc<dyn Backend>>,
    state: Option<Arc<StateStore>>,
    auth: Option<Arc<dyn AuthService>>,
    ui: Option<Arc<dyn UiService>>,
    ready: ReadyFlags,
    all_ready: bool,
    next_callback_id: u64,
    callbacks: Vec<(u64, ReadyCallback)>,
}

impl Registry {
    fn new() -> Self {
        Self {
            backend: None,
            state: None,
            auth: None,
            ui: None,
            ready: ReadyFlags::default(),
            all_ready: false,
            next_callback_id: 0,
            callbacks: Vec::new(),
        }
    }

    fn registered(&self, name: ServiceName) -> bool {
        match name {
            ServiceName::Backend => self.backend.is_some(),
            ServiceName::State => self.state.is_some(),
            ServiceName::Auth => self.auth.is_some(),
            ServiceName::Ui => self.ui.is_some(),
        }
    }

    /// The per-service readiness predicate over the registered instance.
    /// A missing instance is transient-not-ready, never an error.
    fn evaluate(&self, name: ServiceName) -> bool {
        match name {
            ServiceName::Backend => self.backend.as_ref().is_some_and(|b| {
                b.is_ready() && b.auth().is_some() && !b.collection_names().is_empty()
            }),
            ServiceName::State => self.state.as_ref().is_some_and(|s| s.has_backend()),
            ServiceName::Auth => self.auth.as_ref().is_some_and(|a| a.backend_ready()),
            ServiceName::Ui => self
                .ui
                .as_ref()
                .is_some_and(|u| u.can_render() && u.has_state()),
        }
    }
}

/// Tracks the fixed service set and signals when the whole set is usable.
///
/// Readiness is a pollable predicate with a push trigger: every registration
/// re-checks its service immediately, and the periodic monitor is the
/// correctness backstop, so event and poll detection cannot diverge. A ready
/// flag is monotonic for the registration lifetime; only [`reset`] clears it.
///
/// [`reset`]: ReadinessCoordinator::reset
pub struct ReadinessCoordinator {
    timings: CoordinatorTimings,
    registry: Arc<Mutex<Registry>>,
    events: broadcast::Sender<ReadyEvent>,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl ReadinessCoordinator {
    pub fn new(timings: CoordinatorTimings) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            timings,
            registry: Arc::new(Mutex::new(Registry::new())),
            events,
            monitor: Mutex::new(None),
        }
    }

    // ── Registration ──────────────────────────────────────────────────────────

    /// Store (or overwrite) a service instance and re-check it immediately.
    /// The instance may still be partially constructed; it simply stays
    /// not-ready until its predicate holds.
    pub fn register_service(&self, handle: ServiceHandle) {
        let name = handle.name();
        {
            let mut reg = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            match handle {
                ServiceHandle::Backend(backend) => reg.backend = Some(backend),
                ServiceHandle::State(state) => reg.state = Some(state),
                ServiceHandle::Auth(auth) => reg.auth = Some(auth),
                ServiceHandle::Ui(ui) => reg.ui = Some(ui),
            }
        }
        debug!(service = %name, "service registered");
        self.check_service(name);
    }

    // ── Readiness checks ──────────────────────────────────────────────────────

    /// Re-evaluate one service's predicate and return its ready flag.
    ///
    /// On a false-to-true transition this emits the per-service event and
    /// re-evaluates the aggregate.
    pub fn check_service(&self, name: ServiceName) -> bool {
        let transitioned = {
            let mut reg = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            if !reg.ready.get(name) && reg.evaluate(name) {
                reg.ready.set(name, true);
                true
            } else {
                false
            }
        };
        if transitioned {
            info!(service = %name, "service ready");
            let _ = self.events.send(ReadyEvent::Service { name });
            self.check_all_ready();
        }
        self.is_ready(name)
    }

    pub fn is_ready(&self, name: ServiceName) -> bool {
        let reg = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        reg.ready.get(name)
    }

    /// Aggregate check: AND over every tracked service's ready flag.
    ///
    /// On the false-to-true transition, fires every queued one-shot callback
    /// exactly once, emits the all-ready event, and tears down the monitor.
    pub fn check_all_ready(&self) -> bool {
        let fired = {
            let mut reg = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            if !reg.all_ready && reg.ready.all() {
                reg.all_ready = true;
                Some(std::mem::take(&mut reg.callbacks))
            } else {
                None
            }
        };
        let Some(callbacks) = fired else {
            return self.all_ready();
        };

        info!("all services ready");
        for (_, callback) in callbacks {
            run_callback(callback);
        }
        let _ = self.events.send(ReadyEvent::All);
        self.stop_monitor();
        true
    }

    pub fn all_ready(&self) -> bool {
        let reg = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        reg.all_ready
    }

    // ── Subscriptions ─────────────────────────────────────────────────────────

    /// Register a one-shot callback for the all-ready transition.
    ///
    /// Invoked immediately when the set is already ready. The returned guard
    /// can cancel a still-pending callback; dropping the guard does nothing.
    pub fn on_all_ready(&self, callback: impl FnOnce() + Send + 'static) -> OnReadyGuard {
        let mut reg = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        if reg.all_ready {
            drop(reg);
            run_callback(Box::new(callback));
            OnReadyGuard {
                registry: Weak::new(),
                id: 0,
            }
        } else {
            let id = reg.next_callback_id;
            reg.next_callback_id += 1;
            reg.callbacks.push((id, Box::new(callback)));
            OnReadyGuard {
                registry: Arc::downgrade(&self.registry),
                id,
            }
        }
    }

    /// The derived broadcast channel of readiness transitions.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ReadyEvent> {
        self.events.subscribe()
    }

    // ── Monitoring ────────────────────────────────────────────────────────────

    /// Sweep every service once, then keep sweeping on the poll interval
    /// until all-ready or the hard timeout, whichever first. Timing out is
    /// not an error: the final per-service status is logged and callers
    /// proceed with whatever subset is ready. No-op while a monitor is live.
    pub fn start_monitoring(self: &Arc<Self>) {
        let mut guard = self.monitor.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = guard.as_ref() {
            if !handle.is_finished() {
                return;
            }
        }
        let coordinator = Arc::clone(self);
        *guard = Some(tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = interval(coordinator.timings.poll_interval);
            loop {
                ticker.tick().await;
                if coordinator.sweep() {
                    debug!("monitor stopping: all services ready");
                    break;
                }
                if started.elapsed() >= coordinator.timings.monitor_timeout {
                    let report = coordinator.status();
                    warn!(
                        status = %serde_json::to_string(&report).unwrap_or_default(),
                        "readiness monitoring timed out; proceeding with the ready subset"
                    );
                    break;
                }
            }
        }));
    }

    /// One pass over every tracked service; returns the aggregate.
    pub fn sweep(&self) -> bool {
        for name in ServiceName::ALL {
            self.check_service(name);
        }
        self.all_ready()
    }

    fn stop_monitor(&self) {
        let handle = {
            let mut guard = self.monitor.lock().unwrap_or_else(|e| e.into_inner());
            guard.take()
        };
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    // ── Bounded waits ─────────────────────────────────────────────────────────

    /// Resolve once the service is ready, polling until the timeout.
    pub async fn wait_for_service(
        &self,
        name: ServiceName,
        timeout: Duration,
    ) -> Result<(), ReadyError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.check_service(name) {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(ReadyError::Timeout {
                    service: name.to_string(),
                });
            }
            sleep(self.timings.wait_poll.min(deadline - now)).await;
        }
    }

    /// Resolve once every service is ready, polling until the timeout.
    pub async fn wait_for_all(&self, timeout: Duration) -> Result<(), ReadyError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.sweep() {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(ReadyError::Timeout {
                    service: "all".to_string(),
                });
            }
            sleep(self.timings.wait_poll.min(deadline - now)).await;
        }
    }

    // ── Sequenced bring-up ────────────────────────────────────────────────────

    /// Explicit ordered bring-up: backend, then state wiring, then auth, then
    /// UI, then the full aggregate. Any step failure aborts the sequence and
    /// is reported as `false`, never thrown; the periodic monitor remains an
    /// independent path to the same end state.
    pub async fn initialize_in_sequence(&self) -> bool {
        if let Err(err) = self
            .wait_for_service(ServiceName::Backend, self.timings.backend_wait)
            .await
        {
            warn!(error = %err, "bring-up aborted");
            return false;
        }

        let (backend, state, auth, ui) = {
            let reg = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            (
                reg.backend.clone(),
                reg.state.clone(),
                reg.auth.clone(),
                reg.ui.clone(),
            )
        };
        let Some(backend) = backend else {
            warn!("bring-up aborted: backend not registered");
            return false;
        };

        let Some(state) = state else {
            warn!("bring-up aborted: state service not registered");
            return false;
        };
        state.attach_backend(backend.clone());
        self.check_service(ServiceName::State);

        let Some(auth) = auth else {
            warn!("bring-up aborted: auth service not registered");
            return false;
        };
        auth.attach(backend, state.clone());
        if let Err(err) = self
            .wait_for_service(ServiceName::Auth, self.timings.auth_wait)
            .await
        {
            warn!(error = %err, "bring-up aborted");
            return false;
        }

        let Some(ui) = ui else {
            warn!("bring-up aborted: ui service not registered");
            return false;
        };
        ui.attach_state(state);
        self.check_service(ServiceName::Ui);

        if let Err(err) = self.wait_for_all(self.timings.aggregate_wait).await {
            warn!(error = %err, "bring-up aborted");
            return false;
        }
        info!("sequenced bring-up complete");
        true
    }

    // ── Diagnostics ───────────────────────────────────────────────────────────

    pub fn status(&self) -> StatusReport {
        let reg = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        StatusReport {
            services: ServiceName::ALL
                .iter()
                .map(|&name| ServiceStatus {
                    name,
                    registered: reg.registered(name),
                    ready: reg.ready.get(name),
                })
                .collect(),
            all_ready: reg.all_ready,
        }
    }

    /// Clear every ready flag and the aggregate. Registered instances and
    /// queued callbacks are kept.
    pub fn reset(&self) {
        let mut reg = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        reg.ready = ReadyFlags::default();
        reg.all_ready = false;
        debug!("readiness flags reset");
    }
}

fn run_callback(callback: ReadyCallback) {
    if catch_unwind(AssertUnwindSafe(callback)).is_err() {
        warn!("all-ready subscriber panicked");
    }
}

/// Handle for a queued all-ready callback. [`cancel`](OnReadyGuard::cancel)
/// removes the callback before it fires; dropping the guard leaves it queued.
pub struct OnReadyGuard {
    registry: Weak<Mutex<Registry>>,
    id: u64,
}

impl OnReadyGuard {
    pub fn cancel(self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut reg = registry.lock().unwrap_or_else(|e| e.into_inner());
            reg.callbacks.retain(|(id, _)| *id != self.id);
        }
    }
}
