//! services/dashboard/src/store/mod.rs
//!
//! Client-side state: the active timer store, its ticker, and the wholesale
//! task/project caches. All durable state lives on the hosted platform.

pub mod cache;
pub mod ticker;
pub mod timer;

pub use cache::{ProjectCache, TaskCache};
pub use ticker::{MountGuard, TimerTicker};
pub use timer::{StoreError, TimerSnapshot, TimerStore};

use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tasktime_core::ports::{PortError, PortResult};
use utoipa::ToSchema;

/// Bounds a remote call. Expiry surfaces as `PortError::Timeout`.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> PortResult<T>
where
    F: Future<Output = PortResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(PortError::Timeout(limit.as_secs())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Warning,
    Error,
}

/// A dismissible notification shown by every mounted surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }
}
