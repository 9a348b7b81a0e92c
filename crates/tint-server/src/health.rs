//! `/health` endpoint.

use serde::Serialize;
use std::time::Instant;

/// Health check response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// The shared color.
    pub current_color: String,
    /// Registered WebSocket connections.
    pub clients: usize,
    /// Seconds since the server started.
    pub uptime_secs: u64,
}

/// Build a health response from a read of live state.
pub fn health_check(start_time: Instant, current_color: String, clients: usize) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        current_color,
        clients,
        uptime_secs: start_time.elapsed().as_secs(),
    }
}
