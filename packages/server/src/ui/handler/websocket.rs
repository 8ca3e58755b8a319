//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use tokio::sync::{mpsc, oneshot};

use crate::{
    domain::ConnectionId,
    usecase::{DisconnectError, LeaveOutcome},
    ui::state::AppState,
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Forwards encoded events from the connection's channel to its socket.
///
/// Ends when the channel closes or the socket refuses a frame.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = ConnectionId::generate();

    // Create a channel for this connection to receive events
    let (tx, rx) = mpsc::unbounded_channel();
    if let Err(e) = state
        .connect_participant_usecase
        .execute(connection_id.clone(), tx)
        .await
    {
        tracing::warn!("Rejecting connection: {}", e);
        return;
    }
    tracing::info!("Connection '{}' established", connection_id);

    let (sender, mut receiver) = socket.split();

    // Frames from one connection are handled in arrival order.
    // The loop stops between frames, never in the middle of a dispatch.
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
    let dispatcher = state.dispatcher.clone();
    let recv_connection_id = connection_id.clone();
    let mut recv_task = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                _ = &mut stop_rx => break,
                msg = receiver.next() => msg,
            };
            let Some(msg) = msg else { break };
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error on '{}': {}", recv_connection_id, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    dispatcher.dispatch(&recv_connection_id, text.as_str()).await;
                }
                Message::Binary(_) => {
                    tracing::debug!("Ignoring binary frame from '{}'", recv_connection_id);
                }
                Message::Close(_) => {
                    tracing::info!("Connection '{}' requested close", recv_connection_id);
                    break;
                }
                // Ping/pong is handled by the WebSocket protocol
                _ => {}
            }
        }
    });

    let mut send_task = pusher_loop(rx, sender);

    // If the socket closes, stop forwarding. If forwarding fails, let the
    // frame being dispatched finish before cleaning up.
    let socket_closed = tokio::select! {
        _ = &mut recv_task => true,
        _ = &mut send_task => false,
    };
    if socket_closed {
        send_task.abort();
    } else {
        let _ = stop_tx.send(());
        let _ = recv_task.await;
    }

    match state
        .disconnect_participant_usecase
        .execute(&connection_id)
        .await
    {
        Ok(LeaveOutcome::Left {
            room_id,
            room_deleted,
        }) => tracing::info!(
            "Connection '{}' closed, left room '{}' (deleted: {})",
            connection_id,
            room_id,
            room_deleted
        ),
        Ok(LeaveOutcome::NotInRoom) => {
            tracing::info!("Connection '{}' closed", connection_id)
        }
        Err(DisconnectError::ConnectionNotFound(id)) => {
            tracing::warn!("Connection '{}' was already unregistered", id)
        }
        Err(e) => tracing::error!("Failed to clean up connection '{}': {}", connection_id, e),
    }
}
