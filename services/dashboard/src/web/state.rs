//! services/dashboard/src/web/state.rs
//!
//! Defines the application's shared state: one timer store, its ticker and
//! the client caches, constructed once per process and handed to every handler.

use crate::config::Config;
use crate::store::{ProjectCache, TaskCache, TimerStore, TimerTicker};
use std::sync::Arc;
use tasktime_core::ports::{SessionService, TimeTrackingBackend};
use tracing::info;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: Arc<dyn SessionService>,
    pub store: Arc<TimerStore>,
    pub ticker: Arc<TimerTicker>,
    pub tasks: Arc<TaskCache>,
    pub projects: Arc<ProjectCache>,
}

impl AppState {
    /// Wires the store, ticker and caches to the given adapters.
    pub fn new(
        config: Arc<Config>,
        backend: Arc<dyn TimeTrackingBackend>,
        session: Arc<dyn SessionService>,
    ) -> Arc<Self> {
        let tasks = Arc::new(TaskCache::new(backend.clone(), config.remote_timeout));
        let projects = Arc::new(ProjectCache::new(backend.clone(), config.remote_timeout));
        let store = TimerStore::new(backend, session.clone(), tasks.clone(), config.remote_timeout);
        let ticker = TimerTicker::new(store.clone());

        Arc::new(Self {
            config,
            session,
            store,
            ticker,
            tasks,
            projects,
        })
    }

    /// Stops every ticker and clears client state. Used on shutdown.
    pub fn dispose(&self) {
        self.store.dispose();
        self.tasks.clear();
        self.projects.clear();
        info!("Application state disposed");
    }
}
