use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::future;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use facestream_core::session::session_manager::SessionManager;
use facestream_core::session::transport::ConnectionIdAllocator;

use super::messages;
use super::registry::ConnectionRegistry;
use crate::session_driver;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub registry: Arc<ConnectionRegistry>,
    pub ids: Arc<ConnectionIdAllocator>,
    pub max_in_flight: usize,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(st): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, st))
}

async fn handle_socket(socket: WebSocket, st: AppState) {
    let id = st.ids.allocate();
    let (mut ws_tx, ws_rx) = socket.split();

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    st.registry.register(id, out_tx);

    let writer = tokio::spawn(async move {
        while let Some(text) = out_rx.recv().await {
            if ws_tx.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    // A read error or close frame ends the connection
    let inbound = ws_rx
        .take_while(|msg| future::ready(matches!(msg, Ok(m) if !matches!(m, Message::Close(_)))))
        .filter_map(|msg| future::ready(msg.ok().and_then(messages::frame_payload)));

    let stats = session_driver::drive(
        st.sessions.connect(id),
        Box::pin(inbound),
        st.max_in_flight,
    )
    .await;
    log::debug!("{id}: {stats:?}");

    st.registry.unregister(id);
    if let Err(e) = writer.await {
        log::warn!("{id}: writer task failed: {e}");
    }
}
