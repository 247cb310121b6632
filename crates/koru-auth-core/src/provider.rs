//! Per-instance authorization state
//!
//! An [`AuthProvider`] owns one [`ResolutionState`] and the params that
//! identify it. Every trigger (start, reload, param change) takes a new
//! generation; a resolution that settles after a newer trigger is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::config::AuthParams;
use crate::resolver::Resolver;
use crate::types::ResolutionState;
use crate::view::{AuthView, ConfigView};

/// Handle to a mounted provider. Clones share state.
#[derive(Clone)]
pub struct AuthProvider {
    inner: Arc<Inner>,
}

struct Inner {
    resolver: Resolver,
    params: RwLock<AuthParams>,
    generation: AtomicU64,
    state: watch::Sender<ResolutionState>,
}

impl std::fmt::Debug for AuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthProvider")
            .field("params", &self.params())
            .field("generation", &self.inner.generation.load(Ordering::SeqCst))
            .field("state", &self.state())
            .finish()
    }
}

impl AuthProvider {
    /// Create a provider in the `Loading` state. Nothing runs until
    /// [`start`](Self::start).
    pub fn new(resolver: Resolver, params: AuthParams) -> Self {
        let (state, _) = watch::channel(ResolutionState::Loading);
        Self {
            inner: Arc::new(Inner {
                resolver,
                params: RwLock::new(params),
                generation: AtomicU64::new(0),
                state,
            }),
        }
    }

    /// Create and start a provider
    pub fn mount(resolver: Resolver, params: AuthParams) -> (Self, JoinHandle<()>) {
        let provider = Self::new(resolver, params);
        let task = provider.start();
        (provider, task)
    }

    pub fn params(&self) -> AuthParams {
        self.inner.params.read().expect("params poisoned").clone()
    }

    /// Snapshot of the current state
    pub fn state(&self) -> ResolutionState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state transition
    pub fn subscribe(&self) -> watch::Receiver<ResolutionState> {
        self.inner.state.subscribe()
    }

    pub fn view(&self) -> AuthView {
        AuthView::from_state(&self.state())
    }

    pub fn config_view(&self) -> ConfigView {
        ConfigView::from_state(&self.state())
    }

    /// Begin a fresh resolution in the background.
    ///
    /// The returned task settles once the resolution is applied or discarded.
    pub fn start(&self) -> JoinHandle<()> {
        self.spawn_resolution(self.params())
    }

    /// Drop the cached authorization and resolve again.
    ///
    /// Supersedes any resolution in flight. Returns once this reload's
    /// result has been applied, or discarded by a later trigger. Dropping the
    /// returned future does not cancel the resolution.
    pub async fn reload(&self) {
        let params = self.params();
        self.inner
            .resolver
            .invalidate(&params.website_id, &params.app_id);
        if let Err(e) = self.spawn_resolution(params).await {
            error!(error = %e, "Authorization reload task failed");
        }
    }

    /// Replace the identifying params.
    ///
    /// Equal params are a no-op and return `None`; anything else starts a
    /// brand-new resolution.
    pub fn set_params(&self, params: AuthParams) -> Option<JoinHandle<()>> {
        {
            let mut current = self.inner.params.write().expect("params poisoned");
            if *current == params {
                return None;
            }
            *current = params.clone();
        }
        Some(self.spawn_resolution(params))
    }

    fn spawn_resolution(&self, params: AuthParams) -> JoinHandle<()> {
        let generation = self.inner.begin();
        let inner = self.inner.clone();
        tokio::spawn(async move { inner.settle(generation, params).await })
    }
}

impl Inner {
    /// Take the next generation and publish `Loading` under the state lock
    fn begin(&self) -> u64 {
        let mut generation = 0;
        self.state.send_modify(|state| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = ResolutionState::Loading;
        });
        generation
    }

    async fn settle(&self, generation: u64, params: AuthParams) {
        let result = self.resolver.resolve(&params).await;
        let (next, failure) = match result {
            Ok(data) => (ResolutionState::Resolved(Arc::new(data)), None),
            Err(e) => {
                let e = Arc::new(e);
                (ResolutionState::Failed(e.clone()), Some(e))
            }
        };

        // generation check and write happen under the same lock as `begin`
        let mut current = generation;
        let applied = self.state.send_if_modified(|state| {
            current = self.generation.load(Ordering::SeqCst);
            if current != generation {
                return false;
            }
            *state = next;
            true
        });

        if !applied {
            debug!(
                website_id = %params.website_id,
                app_id = %params.app_id,
                generation,
                current,
                "Discarding superseded authorization result"
            );
        } else if let Some(e) = failure {
            error!(
                website_id = %params.website_id,
                app_id = %params.app_id,
                error = %e,
                "Failed to authorize"
            );
        }
    }
}
