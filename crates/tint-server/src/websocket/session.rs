//! Per-socket read/write loops.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::connection::{ClientConnection, Outbound};
use crate::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL,
};
use crate::server::AppState;

/// An inbound socket event, reduced to what the session loop acts on.
#[derive(Debug)]
pub enum ConnectionEvent {
    /// A text or binary payload, as text.
    Observation(String),
    /// Answer to a liveness probe.
    Pong,
    /// Close frame or end of stream.
    Closed,
    /// Transport failure.
    Error(axum::Error),
    /// Frames the transport answers on its own.
    Ignored,
}

/// Map one read from the socket to a [`ConnectionEvent`].
///
/// Binary payloads are decoded as lossy UTF-8.
pub fn classify(frame: Option<Result<Message, axum::Error>>) -> ConnectionEvent {
    match frame {
        None | Some(Ok(Message::Close(_))) => ConnectionEvent::Closed,
        Some(Err(e)) => ConnectionEvent::Error(e),
        Some(Ok(Message::Text(text))) => ConnectionEvent::Observation(text.as_str().to_owned()),
        Some(Ok(Message::Binary(bytes))) => {
            ConnectionEvent::Observation(String::from_utf8_lossy(&bytes).into_owned())
        }
        Some(Ok(Message::Pong(_))) => ConnectionEvent::Pong,
        Some(Ok(Message::Ping(_))) => ConnectionEvent::Ignored,
    }
}

/// Entry point for an upgraded socket. Assigns a fresh connection ID.
pub async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = format!("conn_{}", Uuid::now_v7());
    run_session(socket, conn_id, state).await;
}

/// Drive one socket until it closes, errors, is terminated, or the server
/// shuts down.
///
/// 1. Spawns the writer task
/// 2. Joins the coordinator, which queues the current color
/// 3. Feeds inbound frames through the coordinator in arrival order
/// 4. Deregisters and stops the writer
#[instrument(skip_all, fields(conn_id = %conn_id))]
async fn run_session(socket: WebSocket, conn_id: String, state: AppState) {
    let (tx, rx) = mpsc::channel(state.config.send_queue_capacity.max(1));
    let cancel = state.shutdown.token().child_token();
    let connection = Arc::new(ClientConnection::new(conn_id.clone(), tx, cancel.clone()));

    let (sink, mut stream) = socket.split();
    let writer = tokio::spawn(write_loop(sink, rx, cancel.clone(), conn_id.clone()));

    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    if let Err(e) = state.coordinator.join(Arc::clone(&connection)) {
        warn!(conn_id = %conn_id, error = %e, "failed to send initial color");
        connection.terminate();
        let _ = writer.await;
        return;
    }
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);
    info!(
        conn_id = %conn_id,
        clients = state.coordinator.registry().connection_count(),
        "client connected"
    );

    loop {
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            frame = stream.next() => classify(frame),
        };
        match event {
            ConnectionEvent::Observation(text) => {
                if let Err(e) = state.coordinator.handle_observation(&text) {
                    warn!(conn_id = %conn_id, error = %e, "failed to process observation");
                }
            }
            ConnectionEvent::Pong => connection.mark_alive(),
            ConnectionEvent::Ignored => {}
            ConnectionEvent::Closed => {
                debug!(conn_id = %conn_id, "client closed connection");
                break;
            }
            ConnectionEvent::Error(e) => {
                warn!(conn_id = %conn_id, error = %e, "websocket transport error");
                break;
            }
        }
    }

    let _ = state.coordinator.leave(&conn_id);
    connection.terminate();
    let _ = writer.await;

    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(connection.age().as_secs_f64());
    info!(
        conn_id = %conn_id,
        dropped = connection.drop_count(),
        "client disconnected"
    );
}

/// Forward queued frames to the socket. Stops after a close frame, on a
/// write failure, or when `cancel` fires with nothing left to send.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Outbound>,
    cancel: CancellationToken,
    conn_id: String,
) {
    loop {
        let frame = tokio::select! {
            biased;
            frame = rx.recv() => frame,
            () = cancel.cancelled() => break,
        };
        let Some(frame) = frame else { break };

        let (message, last) = match frame {
            Outbound::Text(text) => (Message::Text(String::from(&*text).into()), false),
            Outbound::Ping => (Message::Ping(Bytes::new()), false),
            Outbound::Close => (Message::Close(None), true),
        };
        if let Err(e) = sink.send(message).await {
            debug!(conn_id = %conn_id, error = %e, "websocket write failed");
            cancel.cancel();
            break;
        }
        if last {
            break;
        }
    }
}
