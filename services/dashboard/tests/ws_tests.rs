//! The WebSocket surface, served on a loopback port and driven by a real client.

mod common;

use common::{catalog, REPORT_TITLE};
use dashboard_lib::adapters::{MemoryBackend, StaticSession};
use dashboard_lib::config::Config;
use dashboard_lib::web::{self, state::AppState};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tasktime_core::ports::PortError;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

struct Surface {
    client: Client,
    state: Arc<AppState>,
    backend: Arc<MemoryBackend>,
    report_task: Uuid,
}

async fn serve() -> (String, Arc<AppState>, Arc<MemoryBackend>, Uuid) {
    let config = Arc::new(Config::from_lookup(|_| None).unwrap());
    let (project, tasks) = catalog();
    let report_task = tasks[0].id;
    let backend = Arc::new(MemoryBackend::with_catalog(vec![project], tasks));
    let user = Uuid::new_v4();
    let session = Arc::new(StaticSession::new(Some(user)));
    let state = AppState::new(config, backend.clone(), session);
    state.tasks.refresh(user).await.unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());
    let router = web::router(state.clone());
    tokio::spawn(async move { axum::serve(listener, router).await });

    (url, state, backend, report_task)
}

async fn connect(url: &str) -> Client {
    let (client, _) = connect_async(url).await.unwrap();
    client
}

/// Connects one surface and waits until its mount-time fetch has settled.
async fn surface() -> Surface {
    let (url, state, backend, report_task) = serve().await;
    let mut client = connect(&url).await;
    let first = next_json(&mut client).await;
    assert_eq!(first["type"], json!("timer"));
    settle_mount_fetch(&state, &backend, 1).await;

    Surface {
        client,
        state,
        backend,
        report_task,
    }
}

async fn settle_mount_fetch(state: &AppState, backend: &MemoryBackend, mounts: usize) {
    timeout(WAIT, async {
        while backend.calls("active_entries").await < mounts || state.store.snapshot().is_loading {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

async fn next_json(client: &mut Client) -> Value {
    timeout(WAIT, async {
        loop {
            let frame = client.next().await.unwrap().unwrap();
            if let Ok(text) = frame.to_text() {
                if !text.is_empty() {
                    return serde_json::from_str::<Value>(text).unwrap();
                }
            }
        }
    })
    .await
    .unwrap()
}

/// Reads frames until one satisfies `matches`, returning it.
async fn wait_for(client: &mut Client, matches: impl Fn(&Value) -> bool) -> Value {
    loop {
        let message = next_json(client).await;
        if matches(&message) {
            return message;
        }
    }
}

async fn send_json(client: &mut Client, value: Value) {
    client.send(Message::Text(value.to_string().into())).await.unwrap();
}

fn is_timer(message: &Value) -> bool {
    message["type"] == json!("timer")
}

#[tokio::test]
async fn initial_push_renders_the_current_view() {
    let (url, _state, _backend, _) = serve().await;
    let mut client = connect(&url).await;

    let first = next_json(&mut client).await;

    assert_eq!(first["type"], json!("timer"));
    assert_eq!(first["timer"]["running"], json!(false));
    assert_eq!(first["timer"]["clock"], json!("0:00"));
}

#[tokio::test]
async fn start_command_pushes_the_running_view() {
    let mut s = surface().await;

    send_json(&mut s.client, json!({ "type": "start", "task_id": s.report_task })).await;
    let running = wait_for(&mut s.client, |m| is_timer(m) && m["timer"]["running"] == json!(true)).await;

    assert_eq!(running["timer"]["task_title"], json!(REPORT_TITLE));
    assert!(s.state.store.snapshot().is_running());
}

#[tokio::test]
async fn second_start_while_one_is_pending_is_rejected() {
    let mut s = surface().await;
    s.backend.set_latency(Some(Duration::from_millis(300))).await;

    let start = json!({ "type": "start", "task_id": s.report_task });
    send_json(&mut s.client, start.clone()).await;
    send_json(&mut s.client, start).await;

    let rejected = wait_for(&mut s.client, |m| m["type"] == json!("error")).await;
    assert!(rejected["message"].as_str().unwrap().contains("in flight"));
    wait_for(&mut s.client, |m| is_timer(m) && m["timer"]["running"] == json!(true)).await;

    assert_eq!(s.backend.calls("start_timer").await, 1);
    let running = s.backend.entries().await.into_iter().filter(|e| e.is_running()).count();
    assert_eq!(running, 1);
}

#[tokio::test]
async fn issuing_surface_sees_the_loading_state() {
    let mut s = surface().await;
    s.backend.set_latency(Some(Duration::from_millis(300))).await;

    send_json(&mut s.client, json!({ "type": "start", "task_id": s.report_task })).await;
    let loading = wait_for(&mut s.client, |m| is_timer(m) && m["timer"]["is_loading"] == json!(true)).await;
    assert_eq!(loading["timer"]["running"], json!(false));

    let settled = wait_for(&mut s.client, |m| {
        is_timer(m) && m["timer"]["running"] == json!(true) && m["timer"]["is_loading"] == json!(false)
    })
    .await;
    assert_eq!(settled["timer"]["task_title"], json!(REPORT_TITLE));
}

#[tokio::test]
async fn failed_writes_reach_every_surface_as_notices() {
    let (url, state, backend, report_task) = serve().await;
    let mut issuer = connect(&url).await;
    let mut watcher = connect(&url).await;
    next_json(&mut issuer).await;
    next_json(&mut watcher).await;
    settle_mount_fetch(&state, &backend, 2).await;
    backend.fail_next(PortError::Unauthorized).await;

    send_json(&mut issuer, json!({ "type": "start", "task_id": report_task })).await;

    for client in [&mut issuer, &mut watcher] {
        let notice = wait_for(client, |m| m["type"] == json!("notice")).await;
        assert_eq!(notice["level"], json!("error"));
    }
    assert!(!state.store.snapshot().is_running());
}

#[tokio::test]
async fn stop_and_pause_commands() {
    let mut s = surface().await;
    send_json(&mut s.client, json!({ "type": "start", "task_id": s.report_task })).await;
    wait_for(&mut s.client, |m| is_timer(m) && m["timer"]["running"] == json!(true)).await;

    send_json(&mut s.client, json!({ "type": "toggle_pause" })).await;
    wait_for(&mut s.client, |m| is_timer(m) && m["timer"]["paused"] == json!(true)).await;

    send_json(&mut s.client, json!({ "type": "stop" })).await;
    let stopped = wait_for(&mut s.client, |m| is_timer(m) && m["timer"]["running"] == json!(false)).await;
    assert_eq!(stopped["timer"]["elapsed_seconds"], json!(0));
    assert!(s.backend.entries().await.iter().all(|e| !e.is_running()));
}

#[tokio::test]
async fn unrecognized_commands_get_an_error_reply() {
    let mut s = surface().await;

    send_json(&mut s.client, json!({ "type": "rewind" })).await;
    let reply = wait_for(&mut s.client, |m| m["type"] == json!("error")).await;

    assert!(reply["message"].as_str().unwrap().starts_with("Unrecognized message"));
}

#[tokio::test]
async fn closing_the_last_surface_stops_the_ticker() {
    let s = surface().await;
    assert!(s.state.ticker.is_active());

    drop(s.client);

    timeout(WAIT, async {
        while s.state.ticker.is_active() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(s.state.ticker.mounted(), 0);
}
