//! The set of live connections and fan-out over it.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::connection::{ClientConnection, SendStatus};
use crate::metrics::WS_BROADCAST_DROPS_TOTAL;

/// Per-recipient tally of one fan-out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Registry size at the moment of iteration.
    pub recipients: usize,
    /// Frames handed to writer tasks.
    pub queued: usize,
    /// Connections skipped because they were not open.
    pub skipped: usize,
    /// Frames lost to a full or closed queue.
    pub dropped: usize,
}

/// Connected clients indexed by connection ID.
///
/// Uses a blocking lock: every critical section is short and never awaits,
/// so fan-out completes without yielding.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, Arc<ClientConnection>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection. Replaces any entry with the same ID.
    pub fn add(&self, connection: Arc<ClientConnection>) {
        let mut conns = self.connections.write();
        if let Some(previous) = conns.insert(connection.id.clone(), connection) {
            warn!(conn_id = %previous.id, "replaced connection with duplicate id");
            previous.terminate();
        }
    }

    /// Remove a connection by ID.
    pub fn remove(&self, connection_id: &str) -> Option<Arc<ClientConnection>> {
        self.connections.write().remove(connection_id)
    }

    /// Remove a connection and drop its socket without a handshake.
    ///
    /// Returns `false` if the connection was already gone.
    pub fn terminate(&self, connection_id: &str) -> bool {
        match self.remove(connection_id) {
            Some(conn) => {
                conn.terminate();
                true
            }
            None => false,
        }
    }

    /// Whether the ID is registered.
    pub fn contains(&self, connection_id: &str) -> bool {
        self.connections.read().contains_key(connection_id)
    }

    /// Number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    /// Point-in-time copy of the members.
    pub fn snapshot(&self) -> Vec<Arc<ClientConnection>> {
        self.connections.read().values().cloned().collect()
    }

    /// Queue `payload` on every member.
    ///
    /// Holds the read lock for the whole pass, so membership cannot change
    /// mid-iteration. One member failing never affects the others.
    pub fn broadcast(&self, payload: &Arc<str>) -> BroadcastReport {
        let conns = self.connections.read();
        let mut report = BroadcastReport {
            recipients: conns.len(),
            ..BroadcastReport::default()
        };
        for conn in conns.values() {
            match conn.send_text(Arc::clone(payload)) {
                SendStatus::Queued => report.queued += 1,
                SendStatus::NotReady => {
                    debug!(conn_id = %conn.id, "skipping connection that is not open");
                    report.skipped += 1;
                }
                SendStatus::Dropped => {
                    counter!(WS_BROADCAST_DROPS_TOTAL).increment(1);
                    warn!(
                        conn_id = %conn.id,
                        total_drops = conn.drop_count(),
                        "failed to queue broadcast (channel full or closed)"
                    );
                    report.dropped += 1;
                }
            }
        }
        report
    }

    /// Close every member with a handshake and empty the registry.
    pub fn close_all(&self) -> usize {
        let drained: Vec<_> = self.connections.write().drain().collect();
        for (_, conn) in &drained {
            let _ = conn.close();
        }
        if !drained.is_empty() {
            info!(count = drained.len(), "closed all connections");
        }
        drained.len()
    }
}
