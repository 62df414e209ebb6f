//! services/dashboard/src/adapters/memory.rs
//!
//! An in-process implementation of the `TimeTrackingBackend` port. It honors the
//! same contract as the hosted platform (starting a timer closes any running one
//! atomically) and answers active-timer reads from its entry table directly.
//! Used by the test suites and by the demo mode of the `dashboard` binary.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tasktime_core::domain::{ManualEntry, Project, Task, TimeEntry};
use tasktime_core::ports::{PortError, PortResult, TimeTrackingBackend};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    entries: Vec<TimeEntry>,
    tasks: Vec<Task>,
    projects: Vec<Project>,
    failures: VecDeque<PortError>,
    targeted: HashMap<&'static str, VecDeque<PortError>>,
    calls: HashMap<&'static str, usize>,
    latency: Option<Duration>,
}

/// A backend that keeps everything in memory.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend preloaded with projects and tasks.
    pub fn with_catalog(projects: Vec<Project>, tasks: Vec<Task>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                projects,
                tasks,
                ..Default::default()
            }),
        }
    }

    /// Makes the next remote call (of any kind) fail with `error`.
    pub async fn fail_next(&self, error: PortError) {
        self.state.lock().await.failures.push_back(error);
    }

    /// Makes the next call of `operation` fail with `error`. Other calls are
    /// unaffected.
    pub async fn fail_next_call(&self, operation: &'static str, error: PortError) {
        self.state
            .lock()
            .await
            .targeted
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Delays every subsequent call by `latency`. `None` removes the delay.
    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.state.lock().await.latency = latency;
    }

    /// Inserts an entry as-is, bypassing the start/stop contract.
    pub async fn insert_entry(&self, entry: TimeEntry) {
        self.state.lock().await.entries.push(entry);
    }

    pub async fn entries(&self) -> Vec<TimeEntry> {
        self.state.lock().await.entries.clone()
    }

    pub async fn remove_task(&self, task_id: Uuid) {
        self.state.lock().await.tasks.retain(|t| t.id != task_id);
    }

    /// How many times `operation` has been called, failed calls included.
    pub async fn calls(&self, operation: &str) -> usize {
        self.state.lock().await.calls.get(operation).copied().unwrap_or(0)
    }

    /// Records the call, waits out any configured latency, then returns the
    /// queued failure if there is one.
    async fn enter(&self, operation: &'static str) -> PortResult<()> {
        let latency = {
            let mut state = self.state.lock().await;
            *state.calls.entry(operation).or_insert(0) += 1;
            state.latency
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let mut state = self.state.lock().await;
        let targeted = state
            .targeted
            .get_mut(operation)
            .and_then(VecDeque::pop_front);
        match targeted.or_else(|| state.failures.pop_front()) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TimeTrackingBackend for MemoryBackend {
    async fn active_entries(&self, user_id: Uuid) -> PortResult<Vec<TimeEntry>> {
        self.enter("active_entries").await?;
        let state = self.state.lock().await;
        Ok(state
            .entries
            .iter()
            .filter(|e| e.user_id == user_id && e.is_running())
            .cloned()
            .collect())
    }

    async fn start_timer(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        description: Option<&str>,
    ) -> PortResult<Option<Uuid>> {
        self.enter("start_timer").await?;
        let mut state = self.state.lock().await;
        if !state.tasks.iter().any(|t| t.id == task_id) {
            return Err(PortError::NotFound(format!("Task {} not found", task_id)));
        }

        let now = Utc::now();
        for entry in state
            .entries
            .iter_mut()
            .filter(|e| e.user_id == user_id && e.is_running())
        {
            entry.end_time = Some(now);
        }

        let id = Uuid::new_v4();
        state.entries.push(TimeEntry {
            id,
            task_id,
            user_id,
            start_time: now,
            end_time: None,
            is_manual: false,
            description: description.map(str::to_string),
        });
        Ok(Some(id))
    }

    async fn stop_timer(&self, user_id: Uuid) -> PortResult<()> {
        self.enter("stop_timer").await?;
        let now = Utc::now();
        let mut state = self.state.lock().await;
        for entry in state
            .entries
            .iter_mut()
            .filter(|e| e.user_id == user_id && e.is_running())
        {
            entry.end_time = Some(now);
        }
        Ok(())
    }

    async fn add_manual_entry(&self, user_id: Uuid, entry: ManualEntry) -> PortResult<TimeEntry> {
        self.enter("add_manual_entry").await?;
        entry.validate()?;
        let mut state = self.state.lock().await;
        if !state.tasks.iter().any(|t| t.id == entry.task_id) {
            return Err(PortError::NotFound(format!("Task {} not found", entry.task_id)));
        }

        let (start_time, end_time) = entry.interval();
        let created = TimeEntry {
            id: Uuid::new_v4(),
            task_id: entry.task_id,
            user_id,
            start_time,
            end_time: Some(end_time),
            is_manual: true,
            description: entry.description,
        };
        state.entries.push(created.clone());
        Ok(created)
    }

    async fn list_tasks(&self, _user_id: Uuid) -> PortResult<Vec<Task>> {
        self.enter("list_tasks").await?;
        Ok(self.state.lock().await.tasks.clone())
    }

    async fn list_projects(&self, _user_id: Uuid) -> PortResult<Vec<Project>> {
        self.enter("list_projects").await?;
        Ok(self.state.lock().await.projects.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasktime_core::domain::TaskStatus;

    fn catalog() -> (MemoryBackend, Uuid, Uuid) {
        let project_id = Uuid::new_v4();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let tasks = [first, second]
            .into_iter()
            .map(|id| Task {
                id,
                project_id,
                title: format!("task {}", id),
                status: TaskStatus::Todo,
            })
            .collect();
        (MemoryBackend::with_catalog(Vec::new(), tasks), first, second)
    }

    #[tokio::test]
    async fn start_closes_the_previous_running_entry() {
        let (backend, first, second) = catalog();
        let user = Uuid::new_v4();

        backend.start_timer(user, first, None).await.unwrap();
        backend.start_timer(user, second, Some("focus")).await.unwrap();

        let running = backend.active_entries(user).await.unwrap();
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].task_id, second);
        assert_eq!(backend.entries().await.len(), 2);
    }

    #[tokio::test]
    async fn queued_failure_applies_once() {
        let (backend, first, _) = catalog();
        let user = Uuid::new_v4();
        backend.fail_next(PortError::Unauthorized).await;

        assert_eq!(backend.start_timer(user, first, None).await, Err(PortError::Unauthorized));
        assert!(backend.start_timer(user, first, None).await.is_ok());
        assert_eq!(backend.calls("start_timer").await, 2);
    }

    #[tokio::test]
    async fn targeted_failure_skips_other_operations() {
        let (backend, first, _) = catalog();
        let user = Uuid::new_v4();
        backend
            .fail_next_call("active_entries", PortError::Timeout(10))
            .await;

        assert!(backend.start_timer(user, first, None).await.is_ok());
        assert_eq!(backend.active_entries(user).await, Err(PortError::Timeout(10)));
        assert_eq!(backend.active_entries(user).await.map(|e| e.len()), Ok(1));
    }

    #[tokio::test]
    async fn unknown_task_cannot_be_started() {
        let (backend, _, _) = catalog();
        let result = backend.start_timer(Uuid::new_v4(), Uuid::new_v4(), None).await;
        assert!(matches!(result, Err(PortError::NotFound(_))));
    }
}
