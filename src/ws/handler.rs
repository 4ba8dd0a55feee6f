//! WebSocket upgrade handler

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::game::{Outbound, PlayerId, SyncEngine};
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Failure on one connection's outbound path
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("WebSocket send failed: {0}")]
    Socket(#[from] axum::Error),
}

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.engine))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, engine: Arc<SyncEngine>) {
    let (ws_sink, mut ws_stream) = socket.split();

    let (outbound_tx, outbound_rx) = engine.outbound_channel();
    let player_id = engine.connect(outbound_tx);

    // Writer task: outbound queue -> WebSocket
    let writer_handle = tokio::spawn(run_writer(player_id, ws_sink, outbound_rx));

    // Reader loop: WebSocket -> engine
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMsg>(&text) {
                Ok(client_msg) => engine.handle_message(&player_id, client_msg),
                Err(e) => {
                    warn!(player_id = %player_id, error = %e, "Failed to parse client message");
                }
            },
            Ok(Message::Binary(_)) => {
                warn!(player_id = %player_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(player_id = %player_id, "Client initiated close");
                break;
            }
            Err(e) => {
                debug!(player_id = %player_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    engine.disconnect(&player_id);
    writer_handle.abort();
}

/// Drain one connection's outbound queue onto its socket.
///
/// Ends when the queue is closed (the connection was unregistered) or the
/// socket rejects a write.
async fn run_writer(
    player_id: PlayerId,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<Outbound>,
) {
    while let Some(msg) = outbound_rx.recv().await {
        if let Err(e) = send_msg(&mut ws_sink, &msg).await {
            match e {
                SessionError::Encode(_) => {
                    error!(player_id = %player_id, error = %e, "Dropping unencodable message");
                    continue;
                }
                SessionError::Socket(_) => {
                    debug!(player_id = %player_id, error = %e, "WebSocket send failed");
                    break;
                }
            }
        }
    }

    let _ = ws_sink.close().await;
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), SessionError> {
    let json = serde_json::to_string(msg)?;
    sink.send(Message::Text(json)).await?;
    Ok(())
}
