//! services/dashboard/src/store/timer.rs
//!
//! The single authority, per session, for "is a timer running, for which task,
//! since when, and how much time has elapsed". Surfaces read snapshots through
//! a watch channel and never write the view themselves.

use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tasktime_core::domain::{ManualEntry, TimeEntry};
use tasktime_core::duration::{format_clock, format_human};
use tasktime_core::ports::{PortError, SessionService, TimeTrackingBackend};
use tasktime_core::title::resolve_title;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{with_timeout, Notice, TaskCache};

const NOTICE_CAPACITY: usize = 32;

//=========================================================================================
// Snapshot and Errors
//=========================================================================================

/// The view of the active timer that surfaces render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub entry: Option<TimeEntry>,
    /// Resolved once when the entry is fetched, not re-resolved afterwards.
    pub task_title: Option<String>,
    pub elapsed_seconds: u64,
    /// UI-only flag. Ticking continues while paused.
    pub paused: bool,
    pub is_loading: bool,
}

impl TimerSnapshot {
    pub fn is_running(&self) -> bool {
        self.entry.is_some()
    }

    pub fn clock(&self) -> String {
        format_clock(self.elapsed_seconds as i64)
    }

    pub fn human(&self) -> String {
        format_human(self.elapsed_seconds as i64)
    }

    fn clear_view(&mut self) {
        self.entry = None;
        self.task_title = None;
        self.elapsed_seconds = 0;
        self.paused = false;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Another start or stop is still in flight")]
    Busy,
    #[error("No user is signed in")]
    SignedOut,
    #[error("The timer store has been disposed")]
    Disposed,
    #[error(transparent)]
    Port(#[from] PortError),
}

//=========================================================================================
// The Store
//=========================================================================================

pub struct TimerStore {
    backend: Arc<dyn TimeTrackingBackend>,
    session: Arc<dyn SessionService>,
    tasks: Arc<TaskCache>,
    timeout: Duration,
    state: watch::Sender<TimerSnapshot>,
    notices: broadcast::Sender<Notice>,
    write_pending: AtomicBool,
    in_flight: AtomicUsize,
    /// Bumped by every local write so older fetches cannot overwrite it.
    epoch: AtomicU64,
    shutdown: CancellationToken,
}

impl TimerStore {
    pub fn new(
        backend: Arc<dyn TimeTrackingBackend>,
        session: Arc<dyn SessionService>,
        tasks: Arc<TaskCache>,
        timeout: Duration,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(TimerSnapshot::default());
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Arc::new(Self {
            backend,
            session,
            tasks,
            timeout,
            state,
            notices,
            write_pending: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            epoch: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.state.borrow().clone()
    }

    /// Receives every change to the snapshot.
    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.state.subscribe()
    }

    /// Receives notifications for failed writes.
    pub fn notifications(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Cancelled once the store is disposed.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    //-------------------------------------------------------------------------------------
    // Operations
    //-------------------------------------------------------------------------------------

    /// Replaces the view with the platform's current active entry.
    ///
    /// Failures are logged and leave the view untouched.
    pub async fn fetch_active_timer(&self) -> Result<(), StoreError> {
        let user_id = self.current_user().await?;
        let epoch = self.epoch.load(Ordering::SeqCst);

        let result = {
            let _loading = self.begin_loading();
            with_timeout(self.timeout, self.backend.active_entries(user_id)).await
        };
        let entries = result.map_err(|e| {
            warn!("Failed to fetch active timer, keeping current view: {}", e);
            StoreError::Port(e)
        })?;

        let active = latest_running(entries);
        let now = Utc::now();
        let applied = self.state.send_if_modified(|view| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            match active {
                Some(entry) => {
                    view.task_title = Some(resolve_title(self.tasks.as_ref(), &entry));
                    view.elapsed_seconds = entry.elapsed_at(now);
                    view.entry = Some(entry);
                    view.paused = false;
                }
                None => view.clear_view(),
            }
            true
        });
        if !applied {
            debug!("Discarded an active timer fetch overtaken by a later write");
        }
        Ok(())
    }

    /// Starts tracking `task_id` and resynchronizes from the platform.
    ///
    /// Nothing in the view changes until the platform confirms the start. The
    /// platform is responsible for closing any timer already running.
    pub async fn start_timer(
        &self,
        task_id: Uuid,
        description: Option<&str>,
    ) -> Result<Option<Uuid>, StoreError> {
        let _slot = self.claim_write_slot()?;
        let user_id = self
            .current_user()
            .await
            .map_err(|e| self.write_failed("start", e))?;

        let result = {
            let _loading = self.begin_loading();
            with_timeout(self.timeout, self.backend.start_timer(user_id, task_id, description)).await
        };
        let entry_id = result.map_err(|e| self.write_failed("start", e.into()))?;
        self.epoch.fetch_add(1, Ordering::SeqCst);
        info!("Timer started for task {}", task_id);

        if let Err(e) = self.fetch_active_timer().await {
            self.notify(Notice::warning(format!(
                "Timer started, but the display could not refresh: {}",
                e
            )));
        } else if self.snapshot().entry.as_ref().map(|e| e.task_id) != Some(task_id) {
            warn!("Platform reports a different active task after starting {}", task_id);
        }
        Ok(entry_id)
    }

    /// Stops the running timer. The view is cleared whatever the outcome.
    pub async fn stop_timer(&self) -> Result<(), StoreError> {
        let _slot = self.claim_write_slot()?;
        let result = match self.current_user().await {
            Ok(user_id) => {
                let _loading = self.begin_loading();
                with_timeout(self.timeout, self.backend.stop_timer(user_id))
                    .await
                    .map_err(StoreError::from)
            }
            Err(e) => Err(e),
        };

        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(TimerSnapshot::clear_view);

        match result {
            Ok(()) => {
                info!("Timer stopped");
                Ok(())
            }
            Err(e) => Err(self.write_failed("stop", e)),
        }
    }

    /// Advances the displayed elapsed time by one second if a timer is
    /// running. Returns whether it did.
    pub fn tick(&self) -> bool {
        self.state.send_if_modified(|view| {
            if view.entry.is_none() {
                return false;
            }
            view.elapsed_seconds += 1;
            true
        })
    }

    /// Records a retroactive entry. The active timer view is not affected.
    pub async fn add_manual_entry(&self, entry: ManualEntry) -> Result<TimeEntry, StoreError> {
        entry
            .validate()
            .map_err(|e| self.write_failed("record", e.into()))?;
        let user_id = self
            .current_user()
            .await
            .map_err(|e| self.write_failed("record", e))?;

        let created = with_timeout(self.timeout, self.backend.add_manual_entry(user_id, entry))
            .await
            .map_err(|e| self.write_failed("record", e.into()))?;
        info!(
            "Manual entry {} recorded for task {}",
            created.id, created.task_id
        );
        Ok(created)
    }

    /// Flips the UI-only paused flag of a running timer. Returns the new value.
    pub fn toggle_paused(&self) -> bool {
        self.state.send_if_modified(|view| {
            if view.entry.is_none() {
                return false;
            }
            view.paused = !view.paused;
            true
        });
        self.state.borrow().paused
    }

    /// Signs the user out and forgets every piece of client state.
    pub async fn sign_out(&self) -> Result<(), StoreError> {
        let result = with_timeout(self.timeout, self.session.sign_out()).await;
        self.reset();
        self.tasks.clear();
        result.map_err(StoreError::from)
    }

    /// Clears the view without any remote call.
    pub fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(TimerSnapshot::clear_view);
    }

    /// Tears the store down: cancels tickers bound to it and clears the view.
    /// Further operations fail with `StoreError::Disposed`.
    pub fn dispose(&self) {
        self.shutdown.cancel();
        self.reset();
    }

    //-------------------------------------------------------------------------------------
    // Helpers
    //-------------------------------------------------------------------------------------

    async fn current_user(&self) -> Result<Uuid, StoreError> {
        if self.is_disposed() {
            return Err(StoreError::Disposed);
        }
        with_timeout(self.timeout, self.session.current_user())
            .await?
            .ok_or(StoreError::SignedOut)
    }

    fn claim_write_slot(&self) -> Result<WriteSlot<'_>, StoreError> {
        if self.is_disposed() {
            return Err(StoreError::Disposed);
        }
        self.write_pending
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| {
                debug!("Ignoring start/stop request while another is pending");
                StoreError::Busy
            })?;
        Ok(WriteSlot(&self.write_pending))
    }

    fn begin_loading(&self) -> Loading<'_> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.sync_loading_flag();
        Loading(self)
    }

    fn sync_loading_flag(&self) {
        let loading = self.in_flight.load(Ordering::SeqCst) > 0;
        self.state.send_if_modified(|view| {
            let changed = view.is_loading != loading;
            view.is_loading = loading;
            changed
        });
    }

    /// Logs a failed write and tells every surface about it.
    fn write_failed(&self, action: &str, e: StoreError) -> StoreError {
        error!("Failed to {} timer entry: {}", action, e);
        let message = match &e {
            StoreError::Port(port) if port.is_transient() => {
                format!("Could not {} the timer, please try again: {}", action, e)
            }
            _ => format!("Could not {} the timer: {}", action, e),
        };
        self.notify(Notice::error(message));
        e
    }

    fn notify(&self, notice: Notice) {
        // No subscribers just means no surface is mounted.
        let _ = self.notices.send(notice);
    }
}

/// Picks the entry to display. More than one running entry breaks the
/// platform's invariant; the most recently started one wins.
fn latest_running(entries: Vec<TimeEntry>) -> Option<TimeEntry> {
    let running: Vec<TimeEntry> = entries.into_iter().filter(TimeEntry::is_running).collect();
    if running.len() > 1 {
        warn!(
            "Platform reported {} running entries; showing the most recently started",
            running.len()
        );
    }
    running.into_iter().max_by_key(|e| e.start_time)
}

struct WriteSlot<'a>(&'a AtomicBool);

impl Drop for WriteSlot<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct Loading<'a>(&'a TimerStore);

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.0.sync_loading_flag();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn running(start_offset_secs: i64) -> TimeEntry {
        TimeEntry {
            id: Uuid::new_v4(),
            task_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            start_time: Utc::now() - ChronoDuration::seconds(start_offset_secs),
            end_time: None,
            is_manual: false,
            description: None,
        }
    }

    #[test]
    fn latest_running_prefers_most_recent_start() {
        let older = running(600);
        let newer = running(60);
        let picked = latest_running(vec![older, newer.clone()]);
        assert_eq!(picked.map(|e| e.id), Some(newer.id));
    }

    #[test]
    fn latest_running_ignores_closed_entries() {
        let mut closed = running(30);
        closed.end_time = Some(Utc::now());
        assert!(latest_running(vec![closed]).is_none());
    }

    #[test]
    fn snapshot_renders_elapsed_time() {
        let snapshot = TimerSnapshot {
            entry: Some(running(0)),
            elapsed_seconds: 3661,
            ..Default::default()
        };
        assert_eq!(snapshot.clock(), "1:01:01");
        assert_eq!(snapshot.human(), "1h 1m 1s");
    }
}
