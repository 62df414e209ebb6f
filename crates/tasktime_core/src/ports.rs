//! crates/tasktime_core/src/ports.rs
//!
//! Defines the service contracts (traits) the client core consumes.
//! The hosted platform owns authentication, storage, row-level authorization
//! and the timer procedures; these traits are the only way the core reaches it.

use async_trait::async_trait;
use uuid::Uuid;
use crate::domain::{ManualEntry, Project, Task, TimeEntry};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (database, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Remote call timed out after {0}s")]
    Timeout(u64),
    #[error("Invalid input: {0}")]
    Invalid(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// Transient failures may succeed on a later attempt; the rest will not.
    pub fn is_transient(&self) -> bool {
        matches!(self, PortError::Timeout(_) | PortError::Unexpected(_))
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Remote time-tracking operations exposed by the hosted platform.
///
/// Every method may fail with `PortError::Unauthorized` at any time, since
/// authorization is enforced remotely.
#[async_trait]
pub trait TimeTrackingBackend: Send + Sync {
    /// Reads the user's profile pointer to an active timer, then the entry it
    /// points at. Normally yields zero or one entries.
    async fn active_entries(&self, user_id: Uuid) -> PortResult<Vec<TimeEntry>>;

    /// Starts tracking `task_id`. The platform must close any entry already
    /// running for the same user in the same call.
    async fn start_timer(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        description: Option<&str>,
    ) -> PortResult<Option<Uuid>>;

    /// Closes the user's running entry by setting its end time.
    async fn stop_timer(&self, user_id: Uuid) -> PortResult<()>;

    /// Records a retroactive entry. The created entry has `is_manual = true`.
    async fn add_manual_entry(&self, user_id: Uuid, entry: ManualEntry) -> PortResult<TimeEntry>;

    async fn list_tasks(&self, user_id: Uuid) -> PortResult<Vec<Task>>;

    async fn list_projects(&self, user_id: Uuid) -> PortResult<Vec<Project>>;
}

/// Authentication session lookup.
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Returns the signed-in user, or `None` when nobody is signed in.
    async fn current_user(&self) -> PortResult<Option<Uuid>>;

    async fn sign_out(&self) -> PortResult<()>;
}
