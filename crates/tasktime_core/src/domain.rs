//! crates/tasktime_core/src/domain.rs
//!
//! Defines the core data structures mirrored from the hosted platform.
//! These structs are independent of any database driver or transport.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::ports::PortError;

/// One continuous tracking interval, owned by the remote store.
///
/// An absent `end_time` means the entry is still running. The platform keeps
/// at most one running entry per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: Uuid,
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_manual: bool,
    pub description: Option<String>,
}

impl TimeEntry {
    pub fn is_running(&self) -> bool {
        self.end_time.is_none()
    }

    /// Whole seconds between `start_time` and `now`, floored. Never negative.
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> u64 {
        let secs = (now - self.start_time).num_seconds();
        secs.max(0) as u64
    }
}

/// A task row as held by the client-side task cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }

    /// Parses the platform's column value. Unknown values read as `Todo`.
    pub fn parse(value: &str) -> Self {
        match value {
            "in_progress" => TaskStatus::InProgress,
            "done" => TaskStatus::Done,
            _ => TaskStatus::Todo,
        }
    }
}

/// A project row as held by the client-side project cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    /// Planned budget in hours, if the project has one.
    pub budget_hours: Option<f64>,
}

impl Project {
    /// The budget converted to whole seconds, if the project has one.
    pub fn budget_seconds(&self) -> Option<i64> {
        self.budget_hours.map(|hours| (hours * 3600.0).round() as i64)
    }
}

/// A retroactive entry submitted with a duration instead of start/stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualEntry {
    pub task_id: Uuid,
    pub duration_seconds: i64,
    pub date: NaiveDate,
    pub description: Option<String>,
}

impl ManualEntry {
    /// Rejects entries that cannot describe a real interval.
    pub fn validate(&self) -> Result<(), PortError> {
        if self.duration_seconds <= 0 {
            return Err(PortError::Invalid(format!(
                "duration must be positive, got {}s",
                self.duration_seconds
            )));
        }
        if self.duration_seconds > 24 * 3600 {
            return Err(PortError::Invalid("duration exceeds one day".to_string()));
        }
        Ok(())
    }

    /// The closed interval recorded for this entry: midnight UTC of `date`
    /// plus `duration_seconds`.
    pub fn interval(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.date.and_time(NaiveTime::MIN).and_utc();
        (start, start + Duration::seconds(self.duration_seconds))
    }
}
