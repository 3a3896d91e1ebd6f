//! In-process construction server used by the client tests.
//!
//! Serves the same two endpoints as the real service: a `/ws` socket that
//! replays a scripted frame sequence, and the `/reset_words` cleanup
//! route. Everything the server observes is recorded in a [`ServerLog`]
//! so tests can assert on wire traffic instead of client internals.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use tokio::sync::oneshot;

/// Frames played back to each connection, in order.
#[derive(Clone, Default)]
pub struct Script {
    pub frames: Vec<serde_json::Value>,
    /// Hold the socket open after the last frame until the client sends a
    /// stop control frame or hangs up. Without this the server closes as
    /// soon as the script is exhausted.
    pub await_stop: bool,
    /// Drop the socket with no close frame after the script, so the
    /// client sees a transport error instead of a clean server-side
    /// close.
    pub drop_without_close: bool,
}

/// Everything the fake server observed, shared with the test body.
#[derive(Default)]
pub struct ServerLog {
    /// First frame received on each connection (the submitted form).
    pub forms: Mutex<Vec<serde_json::Value>>,
    /// Raw bodies POSTed to `/reset_words`.
    pub resets: Mutex<Vec<String>>,
    /// Socket lifecycle in arrival order: "connect" / "disconnect".
    pub events: Mutex<Vec<&'static str>>,
    /// Stop control frames received.
    pub stops: AtomicUsize,
    /// High-water mark of concurrently open sockets.
    pub max_live: AtomicUsize,
    live: AtomicUsize,
}

struct ScriptedServer {
    script: Script,
    log: Arc<ServerLog>,
}

/// Bind an ephemeral port and serve the script. Dropping the returned
/// sender shuts the server down.
pub async fn spawn_scripted_server(script: Script) -> (u16, Arc<ServerLog>, oneshot::Sender<()>) {
    let log = Arc::new(ServerLog::default());
    let ctx = Arc::new(ScriptedServer {
        script,
        log: log.clone(),
    });
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/reset_words", post(reset_handler))
        .with_state(ctx);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
    });
    (port, log, shutdown_tx)
}

async fn ws_handler(
    State(ctx): State<Arc<ScriptedServer>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_script(socket, ctx))
}

async fn reset_handler(State(ctx): State<Arc<ScriptedServer>>, body: String) -> &'static str {
    ctx.log.resets.lock().unwrap().push(body);
    "ok"
}

async fn run_script(mut socket: WebSocket, ctx: Arc<ScriptedServer>) {
    let log = &ctx.log;
    let live = log.live.fetch_add(1, Ordering::SeqCst) + 1;
    log.max_live.fetch_max(live, Ordering::SeqCst);
    log.events.lock().unwrap().push("connect");

    // The client speaks first: its opening frame is the reading form.
    if let Some(Ok(Message::Text(text))) = socket.recv().await {
        if let Ok(form) = serde_json::from_str(&text) {
            log.forms.lock().unwrap().push(form);
        }
    }

    for frame in &ctx.script.frames {
        if socket
            .send(Message::Text(frame.to_string().into()))
            .await
            .is_err()
        {
            break;
        }
    }

    if ctx.script.await_stop {
        while let Some(Ok(msg)) = socket.recv().await {
            if let Message::Text(text) = msg {
                let stop = serde_json::from_str::<serde_json::Value>(&text)
                    .ok()
                    .and_then(|v| v.get("stop").and_then(|s| s.as_bool()));
                if stop == Some(true) {
                    log.stops.fetch_add(1, Ordering::SeqCst);
                    break;
                }
            }
        }
    }

    // Record the hangup before the socket goes away so event order is
    // settled by the time the client sees the connection end. An abrupt
    // drop skips the close frame and reads client-side as a transport
    // error rather than a server-side close.
    log.live.fetch_sub(1, Ordering::SeqCst);
    log.events.lock().unwrap().push("disconnect");
    if !ctx.script.drop_without_close {
        let _ = socket.send(Message::Close(None)).await;
    }
}
