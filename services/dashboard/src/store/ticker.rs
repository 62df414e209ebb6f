//! services/dashboard/src/store/ticker.rs
//!
//! Drives `TimerStore::tick` once per second while a timer is running.
//!
//! Surfaces mount the ticker and hold the returned guard for as long as they
//! are shown. All surfaces of one store share a single ticking task: the first
//! mount spawns it and dropping the last guard cancels it, so elapsed time is
//! never counted twice.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::TimerStore;

const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Default)]
struct Mounts {
    count: usize,
    token: Option<CancellationToken>,
}

pub struct TimerTicker {
    store: Arc<TimerStore>,
    mounts: Mutex<Mounts>,
}

/// Keeps the ticker running while held. Dropping it unmounts the surface.
pub struct MountGuard {
    ticker: Arc<TimerTicker>,
}

impl Drop for MountGuard {
    fn drop(&mut self) {
        self.ticker.unmount();
    }
}

impl TimerTicker {
    pub fn new(store: Arc<TimerStore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            mounts: Mutex::new(Mounts::default()),
        })
    }

    /// Mounts a surface: resynchronizes the store once and makes sure the
    /// ticking task is running. Must be called from within a Tokio runtime.
    pub fn mount(self: &Arc<Self>) -> MountGuard {
        {
            let mut mounts = self.mounts.lock().unwrap_or_else(PoisonError::into_inner);
            mounts.count += 1;
            if mounts.token.is_none() {
                let token = self.store.shutdown_token().child_token();
                tokio::spawn(run(self.store.clone(), token.clone()));
                mounts.token = Some(token);
                info!("Timer ticker started");
            }
            debug!("Surface mounted ({} mounted)", mounts.count);
        }

        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.fetch_active_timer().await {
                warn!("Initial active timer fetch failed: {}", e);
            }
        });

        MountGuard {
            ticker: self.clone(),
        }
    }

    /// Number of surfaces currently mounted.
    pub fn mounted(&self) -> usize {
        self.mounts.lock().unwrap_or_else(PoisonError::into_inner).count
    }

    /// Whether a ticking task is currently alive.
    pub fn is_active(&self) -> bool {
        self.mounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .token
            .as_ref()
            .is_some_and(|t| !t.is_cancelled())
    }

    fn unmount(&self) {
        let mut mounts = self.mounts.lock().unwrap_or_else(PoisonError::into_inner);
        mounts.count = mounts.count.saturating_sub(1);
        debug!("Surface unmounted ({} mounted)", mounts.count);
        if mounts.count == 0 {
            if let Some(token) = mounts.token.take() {
                token.cancel();
                info!("Timer ticker stopped");
            }
        }
    }
}

/// Waits for a running entry, ticks once per second until it is gone, repeats.
async fn run(store: Arc<TimerStore>, token: CancellationToken) {
    let mut state = store.subscribe();
    loop {
        // Idle: no entry, nothing scheduled.
        while !state.borrow_and_update().is_running() {
            tokio::select! {
                _ = token.cancelled() => return,
                changed = state.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }

        let mut interval = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = interval.tick() => {
                    if !store.tick() {
                        break;
                    }
                }
                changed = state.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    if !state.borrow_and_update().is_running() {
                        break;
                    }
                }
            }
        }
    }
}
