//! services/dashboard/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of the
//! `TimeTrackingBackend` port that talks to the hosted platform's PostgreSQL
//! database through `sqlx`. Authorization is enforced by the platform's row-level
//! policies, so every call publishes the caller's identity first.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tasktime_core::domain::{ManualEntry, Project, Task, TaskStatus, TimeEntry};
use tasktime_core::ports::{PortError, PortResult, TimeTrackingBackend};
use tracing::debug;
use uuid::Uuid;

/// SQLSTATE raised when a row-level policy or grant rejects the caller.
const INSUFFICIENT_PRIVILEGE: &str = "42501";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `TimeTrackingBackend` port.
#[derive(Clone)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    /// Creates a new `PgBackend`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the bundled schema and timer procedures. Only meant for local
    /// development databases; the hosted platform manages its own schema.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Opens a transaction scoped to `user_id` so row-level policies apply.
    async fn begin_as(&self, user_id: Uuid) -> PortResult<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let claims = serde_json::json!({ "sub": user_id, "role": "authenticated" }).to_string();
        sqlx::query("SELECT set_config('request.jwt.claims', $1, true)")
            .bind(claims)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(tx)
    }
}

fn map_sqlx_error(e: sqlx::Error) -> PortError {
    match &e {
        sqlx::Error::RowNotFound => PortError::NotFound("row not found".to_string()),
        sqlx::Error::Database(db) if db.code().as_deref() == Some(INSUFFICIENT_PRIVILEGE) => {
            PortError::Unauthorized
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const TIME_ENTRY_COLUMNS: &str =
    "id, task_id, user_id, start_time, end_time, is_manual, description";

#[derive(FromRow)]
struct TimeEntryRecord {
    id: Uuid,
    task_id: Uuid,
    user_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    is_manual: bool,
    description: Option<String>,
}
impl TimeEntryRecord {
    fn to_domain(self) -> TimeEntry {
        TimeEntry {
            id: self.id,
            task_id: self.task_id,
            user_id: self.user_id,
            start_time: self.start_time,
            end_time: self.end_time,
            is_manual: self.is_manual,
            description: self.description,
        }
    }
}

#[derive(FromRow)]
struct TaskRecord {
    id: Uuid,
    project_id: Uuid,
    title: String,
    status: String,
}
impl TaskRecord {
    fn to_domain(self) -> Task {
        Task {
            id: self.id,
            project_id: self.project_id,
            title: self.title,
            status: TaskStatus::parse(&self.status),
        }
    }
}

#[derive(FromRow)]
struct ProjectRecord {
    id: Uuid,
    workspace_id: Uuid,
    name: String,
    budget_hours: Option<f64>,
}
impl ProjectRecord {
    fn to_domain(self) -> Project {
        Project {
            id: self.id,
            workspace_id: self.workspace_id,
            name: self.name,
            budget_hours: self.budget_hours,
        }
    }
}

//=========================================================================================
// `TimeTrackingBackend` Trait Implementation
//=========================================================================================

#[async_trait]
impl TimeTrackingBackend for PgBackend {
    async fn active_entries(&self, user_id: Uuid) -> PortResult<Vec<TimeEntry>> {
        let mut tx = self.begin_as(user_id).await?;

        let active_id = sqlx::query_scalar::<_, Option<Uuid>>(
            "SELECT active_timer_id FROM public.profiles WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .flatten();

        let Some(active_id) = active_id else {
            tx.commit().await.map_err(map_sqlx_error)?;
            return Ok(Vec::new());
        };

        // A pointer left behind by an already-closed entry reads as "no timer".
        let records = sqlx::query_as::<_, TimeEntryRecord>(&format!(
            "SELECT {} FROM public.time_entries WHERE id = $1 AND end_time IS NULL",
            TIME_ENTRY_COLUMNS
        ))
        .bind(active_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;

        debug!("Profile {} points at entry {} ({} open rows)", user_id, active_id, records.len());
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn start_timer(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        description: Option<&str>,
    ) -> PortResult<Option<Uuid>> {
        let mut tx = self.begin_as(user_id).await?;
        let entry_id = sqlx::query_scalar::<_, Option<Uuid>>("SELECT public.start_timer($1, $2)")
            .bind(task_id)
            .bind(description)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(entry_id)
    }

    async fn stop_timer(&self, user_id: Uuid) -> PortResult<()> {
        let mut tx = self.begin_as(user_id).await?;
        sqlx::query("SELECT public.stop_timer()")
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn add_manual_entry(&self, user_id: Uuid, entry: ManualEntry) -> PortResult<TimeEntry> {
        entry.validate()?;
        let (start_time, end_time) = entry.interval();

        let mut tx = self.begin_as(user_id).await?;
        let record = sqlx::query_as::<_, TimeEntryRecord>(&format!(
            "INSERT INTO public.time_entries (id, task_id, user_id, start_time, end_time, is_manual, description) \
             VALUES ($1, $2, $3, $4, $5, TRUE, $6) RETURNING {}",
            TIME_ENTRY_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(entry.task_id)
        .bind(user_id)
        .bind(start_time)
        .bind(end_time)
        .bind(entry.description.as_deref())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(record.to_domain())
    }

    async fn list_tasks(&self, user_id: Uuid) -> PortResult<Vec<Task>> {
        let mut tx = self.begin_as(user_id).await?;
        let records = sqlx::query_as::<_, TaskRecord>(
            "SELECT id, project_id, title, status FROM public.tasks ORDER BY created_at ASC",
        )
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_projects(&self, user_id: Uuid) -> PortResult<Vec<Project>> {
        let mut tx = self.begin_as(user_id).await?;
        let records = sqlx::query_as::<_, ProjectRecord>(
            "SELECT id, workspace_id, name, budget_hours FROM public.projects ORDER BY created_at ASC",
        )
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}
