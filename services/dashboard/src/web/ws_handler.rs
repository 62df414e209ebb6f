//! services/dashboard/src/web/ws_handler.rs
//!
//! The entry point and control loop for one mounted surface. A connection
//! mounts the ticker for its lifetime, receives every timer change and
//! notification, and forwards the surface's commands to the store.

use crate::store::{StoreError, TimerStore};
use crate::web::{
    protocol::{ClientMessage, ServerMessage, TimerView},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tokio::sync::{broadcast::error::RecvError, Mutex};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Shared between the connection loop and the command tasks it spawns.
type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, user_id))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, user_id: Uuid) {
    info!("Surface connected for user: {}", user_id);

    // Held until the connection ends; the last surface to leave stops the ticker.
    let _mount = app_state.ticker.mount();

    let (sender, mut receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(sender));
    let mut timer_rx = app_state.store.subscribe();
    let mut notices = app_state.store.notifications();
    let shutdown = app_state.store.shutdown_token();

    let initial = TimerView::from(&*timer_rx.borrow_and_update());
    if send(&ws_sender, &ServerMessage::Timer { timer: initial }).await.is_err() {
        error!("Failed to send the initial timer view.");
        return;
    }

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Store disposed; closing surface.");
                break;
            }
            changed = timer_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let timer = TimerView::from(&*timer_rx.borrow_and_update());
                if send(&ws_sender, &ServerMessage::Timer { timer }).await.is_err() {
                    break;
                }
            }
            notice = notices.recv() => match notice {
                Ok(notice) => {
                    if send(&ws_sender, &ServerMessage::from(notice)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Surface missed {} notifications", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if handle_text_message(text.as_str(), &app_state, &ws_sender).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("Surface disconnected.");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket receive error: {}", e);
                    break;
                }
            },
        }
    }

    info!("Surface closed for user: {}", user_id);
}

/// Dispatches one `ClientMessage`.
///
/// Remote commands run in their own task so the loop keeps pushing snapshots
/// and reading frames while they are in flight. Only a failed send is
/// returned as an error.
async fn handle_text_message(
    text: &str,
    app_state: &Arc<AppState>,
    ws_sender: &WsSender,
) -> Result<(), axum::Error> {
    let command = match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::TogglePause) => {
            app_state.store.toggle_paused();
            return Ok(());
        }
        Ok(command) => command,
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
            let message = format!("Unrecognized message: {}", e);
            return send(ws_sender, &ServerMessage::Error { message }).await;
        }
    };

    tokio::spawn(run_command(app_state.store.clone(), command, ws_sender.clone()));
    Ok(())
}

async fn run_command(store: Arc<TimerStore>, command: ClientMessage, ws_sender: WsSender) {
    let outcome = match command {
        ClientMessage::Start { task_id, description } => {
            info!("Start requested for task {}", task_id);
            store.start_timer(task_id, description.as_deref()).await.map(|_| ())
        }
        ClientMessage::Stop => {
            info!("Stop requested.");
            store.stop_timer().await
        }
        ClientMessage::Refresh => store.fetch_active_timer().await,
        ClientMessage::TogglePause => {
            store.toggle_paused();
            Ok(())
        }
    };

    // Write failures already reached every surface as a notice.
    if let Err(e @ StoreError::Busy) = outcome {
        if send(&ws_sender, &ServerMessage::Error { message: e.to_string() }).await.is_err() {
            warn!("Surface went away before the busy reply could be sent.");
        }
    }
}

async fn send(ws_sender: &WsSender, message: &ServerMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(message).map_err(axum::Error::new)?;
    ws_sender.lock().await.send(Message::Text(json.into())).await
}
