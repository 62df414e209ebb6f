//! services/dashboard/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST endpoints and the master
//! definition for the OpenAPI specification.

use crate::store::{Notice, NoticeLevel, StoreError};
use crate::web::protocol::TimerView;
use crate::web::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tasktime_core::domain::{ManualEntry, Project, Task, TimeEntry};
use tasktime_core::ports::PortError;
use tracing::{error, warn};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        get_timer_handler,
        start_timer_handler,
        stop_timer_handler,
        refresh_timer_handler,
        toggle_pause_handler,
        add_manual_entry_handler,
        list_tasks_handler,
        list_projects_handler,
        refresh_caches_handler,
        crate::web::auth::logout_handler,
    ),
    components(
        schemas(
            TimerView,
            StartTimerRequest,
            ManualEntryRequest,
            TimeEntryView,
            TaskView,
            ProjectView,
            CacheRefreshResponse,
            Notice,
            NoticeLevel
        )
    ),
    tags(
        (name = "Time Tracking Dashboard", description = "Timer and cache endpoints backing the dashboard surfaces.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct StartTimerRequest {
    pub task_id: Uuid,
    pub description: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ManualEntryRequest {
    pub task_id: Uuid,
    pub duration_seconds: i64,
    pub date: NaiveDate,
    pub description: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct TimeEntryView {
    pub id: Uuid,
    pub task_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_manual: bool,
    pub description: Option<String>,
}

impl From<TimeEntry> for TimeEntryView {
    fn from(entry: TimeEntry) -> Self {
        Self {
            id: entry.id,
            task_id: entry.task_id,
            start_time: entry.start_time,
            end_time: entry.end_time,
            is_manual: entry.is_manual,
            description: entry.description,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct TaskView {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub status: String,
}

impl From<Task> for TaskView {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            project_id: task.project_id,
            title: task.title,
            status: task.status.as_str().to_string(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ProjectView {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub budget_seconds: Option<i64>,
}

impl From<Project> for ProjectView {
    fn from(project: Project) -> Self {
        Self {
            budget_seconds: project.budget_seconds(),
            id: project.id,
            workspace_id: project.workspace_id,
            name: project.name,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct CacheRefreshResponse {
    pub tasks: usize,
    pub projects: usize,
}

type HandlerError = (StatusCode, String);

/// Maps store failures onto HTTP status codes.
fn store_error(e: StoreError) -> HandlerError {
    let status = match &e {
        StoreError::Busy => StatusCode::CONFLICT,
        StoreError::SignedOut => StatusCode::UNAUTHORIZED,
        StoreError::Disposed => StatusCode::SERVICE_UNAVAILABLE,
        StoreError::Port(port) => port_status(port),
    };
    (status, e.to_string())
}

fn port_status(e: &PortError) -> StatusCode {
    match e {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::Unauthorized => StatusCode::FORBIDDEN,
        PortError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        PortError::Invalid(_) => StatusCode::BAD_REQUEST,
        PortError::Unexpected(_) => StatusCode::BAD_GATEWAY,
    }
}

//=========================================================================================
// Timer Handlers
//=========================================================================================

/// Current state of the active timer.
#[utoipa::path(
    get,
    path = "/timer",
    responses((status = 200, description = "Current timer view", body = TimerView))
)]
pub async fn get_timer_handler(State(state): State<Arc<AppState>>) -> Json<TimerView> {
    Json(TimerView::from(&state.store.snapshot()))
}

/// Start tracking a task.
///
/// The platform closes any timer that is already running.
#[utoipa::path(
    post,
    path = "/timer/start",
    request_body = StartTimerRequest,
    responses(
        (status = 200, description = "Timer started", body = TimerView),
        (status = 403, description = "Not allowed to track this task"),
        (status = 409, description = "Another start or stop is in flight"),
        (status = 504, description = "The platform did not answer in time")
    )
)]
pub async fn start_timer_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StartTimerRequest>,
) -> Result<Json<TimerView>, HandlerError> {
    state
        .store
        .start_timer(req.task_id, req.description.as_deref())
        .await
        .map_err(store_error)?;
    Ok(Json(TimerView::from(&state.store.snapshot())))
}

/// Stop the running timer.
///
/// The returned view is always cleared. A failed remote stop is reported to
/// mounted surfaces as a notice.
#[utoipa::path(
    post,
    path = "/timer/stop",
    responses(
        (status = 200, description = "Timer cleared", body = TimerView),
        (status = 409, description = "Another start or stop is in flight")
    )
)]
pub async fn stop_timer_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TimerView>, HandlerError> {
    match state.store.stop_timer().await {
        Err(StoreError::Busy) => return Err(store_error(StoreError::Busy)),
        Err(e) => warn!("Stop reported a failure, view cleared anyway: {}", e),
        Ok(()) => {}
    }
    Ok(Json(TimerView::from(&state.store.snapshot())))
}

/// Re-read the active timer from the platform.
///
/// Read failures keep the current view and still answer 200.
#[utoipa::path(
    post,
    path = "/timer/refresh",
    responses((status = 200, description = "Timer view after the refresh", body = TimerView))
)]
pub async fn refresh_timer_handler(State(state): State<Arc<AppState>>) -> Json<TimerView> {
    if let Err(e) = state.store.fetch_active_timer().await {
        warn!("Timer refresh failed: {}", e);
    }
    Json(TimerView::from(&state.store.snapshot()))
}

/// Flip the display-only paused flag of the running timer.
#[utoipa::path(
    post,
    path = "/timer/pause",
    responses((status = 200, description = "Timer view after the toggle", body = TimerView))
)]
pub async fn toggle_pause_handler(State(state): State<Arc<AppState>>) -> Json<TimerView> {
    state.store.toggle_paused();
    Json(TimerView::from(&state.store.snapshot()))
}

/// Record time retroactively for a task.
#[utoipa::path(
    post,
    path = "/time-entries/manual",
    request_body = ManualEntryRequest,
    responses(
        (status = 201, description = "Entry recorded", body = TimeEntryView),
        (status = 400, description = "Invalid duration"),
        (status = 403, description = "Not allowed to track this task")
    )
)]
pub async fn add_manual_entry_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ManualEntryRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let entry = ManualEntry {
        task_id: req.task_id,
        duration_seconds: req.duration_seconds,
        date: req.date,
        description: req.description,
    };
    let created = state.store.add_manual_entry(entry).await.map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(TimeEntryView::from(created))))
}

//=========================================================================================
// Cache Handlers
//=========================================================================================

/// Tasks currently held in the client cache.
#[utoipa::path(
    get,
    path = "/tasks",
    responses((status = 200, description = "Cached tasks", body = [TaskView]))
)]
pub async fn list_tasks_handler(State(state): State<Arc<AppState>>) -> Json<Vec<TaskView>> {
    Json(state.tasks.all().into_iter().map(TaskView::from).collect())
}

/// Projects currently held in the client cache.
#[utoipa::path(
    get,
    path = "/projects",
    responses((status = 200, description = "Cached projects", body = [ProjectView]))
)]
pub async fn list_projects_handler(State(state): State<Arc<AppState>>) -> Json<Vec<ProjectView>> {
    Json(state.projects.all().into_iter().map(ProjectView::from).collect())
}

/// Re-fetch the task and project caches wholesale.
#[utoipa::path(
    post,
    path = "/caches/refresh",
    responses(
        (status = 200, description = "Caches replaced", body = CacheRefreshResponse),
        (status = 502, description = "The platform could not be read")
    )
)]
pub async fn refresh_caches_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<CacheRefreshResponse>, HandlerError> {
    let (tasks, projects) = tokio::join!(state.tasks.refresh(user_id), state.projects.refresh(user_id));
    let response = CacheRefreshResponse {
        tasks: tasks.map_err(|e| {
            error!("Task cache refresh failed: {:?}", e);
            (port_status(&e), e.to_string())
        })?,
        projects: projects.map_err(|e| {
            error!("Project cache refresh failed: {:?}", e);
            (port_status(&e), e.to_string())
        })?,
    };
    Ok(Json(response))
}
