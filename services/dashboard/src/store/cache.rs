//! services/dashboard/src/store/cache.rs
//!
//! Wholesale client caches of remote collections. A refresh replaces the whole
//! collection; reads never reach the backend.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tasktime_core::domain::{Project, Task};
use tasktime_core::ports::{PortResult, TimeTrackingBackend};
use tasktime_core::title::TaskTitles;
use tracing::{info, warn};
use uuid::Uuid;

use super::with_timeout;

/// Cached task rows, used to label the active timer.
pub struct TaskCache {
    backend: Arc<dyn TimeTrackingBackend>,
    timeout: Duration,
    tasks: RwLock<Vec<Task>>,
}

impl TaskCache {
    pub fn new(backend: Arc<dyn TimeTrackingBackend>, timeout: Duration) -> Self {
        Self {
            backend,
            timeout,
            tasks: RwLock::new(Vec::new()),
        }
    }

    /// Re-fetches every task visible to `user_id`. On failure the previous
    /// contents stay in place.
    pub async fn refresh(&self, user_id: Uuid) -> PortResult<usize> {
        match with_timeout(self.timeout, self.backend.list_tasks(user_id)).await {
            Ok(tasks) => {
                let count = tasks.len();
                *self.tasks.write().unwrap_or_else(PoisonError::into_inner) = tasks;
                info!("Task cache refreshed with {} tasks", count);
                Ok(count)
            }
            Err(e) => {
                warn!("Task cache refresh failed, keeping previous contents: {}", e);
                Err(e)
            }
        }
    }

    pub fn get(&self, task_id: Uuid) -> Option<Task> {
        self.tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|t| t.id == task_id)
            .cloned()
    }

    pub fn all(&self) -> Vec<Task> {
        self.tasks.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn for_project(&self, project_id: Uuid) -> Vec<Task> {
        self.tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.tasks.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl TaskTitles for TaskCache {
    fn task_title(&self, task_id: Uuid) -> Option<String> {
        self.get(task_id).map(|t| t.title)
    }
}

/// Cached project rows.
pub struct ProjectCache {
    backend: Arc<dyn TimeTrackingBackend>,
    timeout: Duration,
    projects: RwLock<Vec<Project>>,
}

impl ProjectCache {
    pub fn new(backend: Arc<dyn TimeTrackingBackend>, timeout: Duration) -> Self {
        Self {
            backend,
            timeout,
            projects: RwLock::new(Vec::new()),
        }
    }

    pub async fn refresh(&self, user_id: Uuid) -> PortResult<usize> {
        match with_timeout(self.timeout, self.backend.list_projects(user_id)).await {
            Ok(projects) => {
                let count = projects.len();
                *self.projects.write().unwrap_or_else(PoisonError::into_inner) = projects;
                info!("Project cache refreshed with {} projects", count);
                Ok(count)
            }
            Err(e) => {
                warn!("Project cache refresh failed, keeping previous contents: {}", e);
                Err(e)
            }
        }
    }

    pub fn get(&self, project_id: Uuid) -> Option<Project> {
        self.projects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|p| p.id == project_id)
            .cloned()
    }

    pub fn all(&self) -> Vec<Project> {
        self.projects.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// The project's budget converted to whole seconds, if it has one.
    pub fn budget_seconds(&self, project_id: Uuid) -> Option<i64> {
        self.get(project_id).and_then(|p| p.budget_seconds())
    }

    pub fn clear(&self) {
        self.projects.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryBackend;
    use tasktime_core::domain::TaskStatus;
    use tasktime_core::ports::PortError;

    fn project(budget_hours: Option<f64>) -> Project {
        Project {
            id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            name: "Website".to_string(),
            budget_hours,
        }
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_tasks() {
        let task = Task {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: "Write report".to_string(),
            status: TaskStatus::InProgress,
        };
        let backend = Arc::new(MemoryBackend::with_catalog(Vec::new(), vec![task.clone()]));
        let cache = TaskCache::new(backend.clone(), Duration::from_secs(1));
        let user = Uuid::new_v4();

        assert_eq!(cache.refresh(user).await, Ok(1));
        backend.fail_next(PortError::Unexpected("offline".to_string())).await;
        assert!(cache.refresh(user).await.is_err());

        assert_eq!(cache.task_title(task.id).as_deref(), Some("Write report"));
        assert_eq!(cache.for_project(task.project_id).len(), 1);
    }

    #[tokio::test]
    async fn lookups_never_fetch() {
        let backend = Arc::new(MemoryBackend::new());
        let cache = TaskCache::new(backend.clone(), Duration::from_secs(1));

        assert!(cache.get(Uuid::new_v4()).is_none());
        assert_eq!(backend.calls("list_tasks").await, 0);
    }

    #[tokio::test]
    async fn budget_is_reported_in_seconds() {
        let with_budget = project(Some(1.5));
        let without = project(None);
        let backend = Arc::new(MemoryBackend::with_catalog(
            vec![with_budget.clone(), without.clone()],
            Vec::new(),
        ));
        let cache = ProjectCache::new(backend, Duration::from_secs(1));
        cache.refresh(Uuid::new_v4()).await.unwrap();

        assert_eq!(cache.budget_seconds(with_budget.id), Some(5400));
        assert_eq!(cache.budget_seconds(without.id), None);
        assert_eq!(cache.all().len(), 2);
    }
}
