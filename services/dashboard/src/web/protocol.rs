//! services/dashboard/src/web/protocol.rs
//!
//! Defines the wire shapes shared by the REST endpoints and the WebSocket
//! surface protocol between browser surfaces and the dashboard.

use crate::store::{Notice, NoticeLevel, TimerSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Timer View
//=========================================================================================

/// What every surface renders for the active timer.
#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
pub struct TimerView {
    pub running: bool,
    pub entry_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub task_title: Option<String>,
    pub description: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_seconds: u64,
    /// `H:MM:SS`, or `M:SS` under an hour.
    pub clock: String,
    /// `Xh Ym Zs` with zero leading units dropped.
    pub human: String,
    pub paused: bool,
    pub is_loading: bool,
}

impl From<&TimerSnapshot> for TimerView {
    fn from(snapshot: &TimerSnapshot) -> Self {
        let entry = snapshot.entry.as_ref();
        Self {
            running: snapshot.is_running(),
            entry_id: entry.map(|e| e.id),
            task_id: entry.map(|e| e.task_id),
            task_title: snapshot.task_title.clone(),
            description: entry.and_then(|e| e.description.clone()),
            started_at: entry.map(|e| e.start_time),
            elapsed_seconds: snapshot.elapsed_seconds,
            clock: snapshot.clock(),
            human: snapshot.human(),
            paused: snapshot.paused,
            is_loading: snapshot.is_loading,
        }
    }
}

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Commands a mounted surface can send over its WebSocket.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Starts tracking a task; any running timer is closed by the platform.
    Start {
        task_id: Uuid,
        #[serde(default)]
        description: Option<String>,
    },

    /// Stops the running timer.
    Stop,

    /// Re-reads the active timer from the platform.
    Refresh,

    /// Flips the display-only paused flag.
    TogglePause,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Pushed to every mounted surface.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The timer view changed.
    Timer { timer: TimerView },

    /// A dismissible notification, typically a failed write.
    Notice { level: NoticeLevel, message: String },

    /// A command from this surface was rejected.
    Error { message: String },
}

impl From<Notice> for ServerMessage {
    fn from(notice: Notice) -> Self {
        ServerMessage::Notice {
            level: notice.level,
            message: notice.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_start_without_description() {
        let task_id = Uuid::new_v4();
        let msg: ClientMessage =
            serde_json::from_value(json!({ "type": "start", "task_id": task_id })).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Start {
                task_id,
                description: None
            }
        );
    }

    #[test]
    fn parses_unit_commands() {
        let msg: ClientMessage = serde_json::from_value(json!({ "type": "toggle_pause" })).unwrap();
        assert_eq!(msg, ClientMessage::TogglePause);
    }

    #[test]
    fn idle_view_renders_zero() {
        let view = TimerView::from(&TimerSnapshot::default());
        let value = serde_json::to_value(ServerMessage::Timer { timer: view }).unwrap();
        assert_eq!(value["type"], "timer");
        assert_eq!(value["timer"]["running"], false);
        assert_eq!(value["timer"]["clock"], "0:00");
        assert_eq!(value["timer"]["human"], "0s");
    }
}
