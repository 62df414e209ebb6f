//! Shared fixtures for the dashboard integration tests.

#![allow(dead_code)]

use dashboard_lib::adapters::{MemoryBackend, StaticSession};
use dashboard_lib::store::{TaskCache, TimerStore};
use std::sync::Arc;
use std::time::Duration;
use tasktime_core::domain::{Project, Task, TaskStatus};
use uuid::Uuid;

pub const REPORT_TITLE: &str = "Write report";

pub struct Harness {
    pub backend: Arc<MemoryBackend>,
    pub session: Arc<StaticSession>,
    pub tasks: Arc<TaskCache>,
    pub store: Arc<TimerStore>,
    pub user: Uuid,
    pub project: Project,
    /// A task titled "Write report", present in the cache.
    pub report_task: Uuid,
}

pub fn catalog() -> (Project, Vec<Task>) {
    let project = Project {
        id: Uuid::new_v4(),
        workspace_id: Uuid::new_v4(),
        name: "Quarterly review".to_string(),
        budget_hours: Some(10.0),
    };
    let tasks = vec![
        Task {
            id: Uuid::new_v4(),
            project_id: project.id,
            title: REPORT_TITLE.to_string(),
            status: TaskStatus::InProgress,
        },
        Task {
            id: Uuid::new_v4(),
            project_id: project.id,
            title: "Prepare slides".to_string(),
            status: TaskStatus::Todo,
        },
    ];
    (project, tasks)
}

pub async fn harness() -> Harness {
    harness_with_timeout(Duration::from_secs(10)).await
}

/// A signed-in store over an in-memory backend with a warm task cache.
pub async fn harness_with_timeout(timeout: Duration) -> Harness {
    let (project, tasks) = catalog();
    let report_task = tasks[0].id;
    let backend = Arc::new(MemoryBackend::with_catalog(vec![project.clone()], tasks));
    let user = Uuid::new_v4();
    let session = Arc::new(StaticSession::new(Some(user)));
    let task_cache = Arc::new(TaskCache::new(backend.clone(), timeout));
    task_cache.refresh(user).await.expect("task cache loads");
    let store = TimerStore::new(backend.clone(), session.clone(), task_cache.clone(), timeout);

    Harness {
        backend,
        session,
        tasks: task_cache,
        store,
        user,
        project,
        report_task,
    }
}
