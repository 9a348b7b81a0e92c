//! WebSocket client connection state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Lifecycle of a connection. Only moves forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// Upgraded but not yet joined to the registry.
    Connecting = 0,
    /// Joined; receives broadcasts.
    Open = 1,
    /// Disconnected, errored, or terminated. Terminal.
    Closed = 2,
}

impl ConnectionState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Connecting,
            1 => Self::Open,
            _ => Self::Closed,
        }
    }
}

/// A frame queued for the connection's writer task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outbound {
    /// JSON text frame.
    Text(Arc<str>),
    /// Liveness probe.
    Ping,
    /// Close handshake; the writer stops after sending it.
    Close,
}

/// Result of queueing a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendStatus {
    /// Handed to the writer task.
    Queued,
    /// The connection is not open; nothing was queued.
    NotReady,
    /// The queue was full or the writer is gone.
    Dropped,
}

/// Represents a connected WebSocket client.
pub struct ClientConnection {
    /// Unique connection ID.
    pub id: String,
    /// Send channel to the client's WebSocket write task.
    tx: mpsc::Sender<Outbound>,
    state: AtomicU8,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Whether the client has answered the last probe.
    is_alive: AtomicBool,
    /// When the last pong was received.
    last_pong: Mutex<Instant>,
    dropped_messages: AtomicU64,
    /// Cancelled on forced termination; stops both socket tasks.
    cancel: CancellationToken,
}

impl ClientConnection {
    /// Create a connection in the `Connecting` state, alive.
    pub fn new(id: String, tx: mpsc::Sender<Outbound>, cancel: CancellationToken) -> Self {
        let now = Instant::now();
        Self {
            id,
            tx,
            state: AtomicU8::new(ConnectionState::Connecting as u8),
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
            cancel,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether broadcasts should be written to this connection.
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// `Connecting → Open`. Returns `false` if the connection already closed.
    pub fn mark_open(&self) -> bool {
        self.state
            .compare_exchange(
                ConnectionState::Connecting as u8,
                ConnectionState::Open as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Move to `Closed`. Returns `true` if this call performed the transition.
    pub fn mark_closed(&self) -> bool {
        self.state.swap(ConnectionState::Closed as u8, Ordering::AcqRel)
            != ConnectionState::Closed as u8
    }

    /// Queue a text frame. Skipped unless the connection is open.
    pub fn send_text(&self, payload: Arc<str>) -> SendStatus {
        if !self.is_open() {
            return SendStatus::NotReady;
        }
        self.enqueue(Outbound::Text(payload))
    }

    /// Queue a liveness probe.
    pub fn ping(&self) -> SendStatus {
        if !self.is_open() {
            return SendStatus::NotReady;
        }
        self.enqueue(Outbound::Ping)
    }

    /// Close with a handshake: mark closed and ask the writer to send a
    /// close frame.
    pub fn close(&self) -> SendStatus {
        if !self.mark_closed() {
            return SendStatus::NotReady;
        }
        self.enqueue(Outbound::Close)
    }

    /// Drop the connection without a handshake.
    pub fn terminate(&self) {
        let _ = self.mark_closed();
        self.cancel.cancel();
    }

    /// Token cancelled when the connection is terminated or the server stops.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    fn enqueue(&self, frame: Outbound) -> SendStatus {
        if self.tx.try_send(frame).is_ok() {
            SendStatus::Queued
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            SendStatus::Dropped
        }
    }

    /// Total frames dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Mark the connection as alive (pong received).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Whether the client answered since the last probe.
    pub fn is_alive(&self) -> bool {
        self.is_alive.load(Ordering::Relaxed)
    }

    /// Check and reset the alive flag for the liveness sweep.
    ///
    /// Returns `true` if the connection was alive since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Duration since the last pong (or connection establishment).
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
